//! Query-aggregation gateway over a document-search backend holding
//! single-cell genomic analysis data.
//!
//! Clients ask for typed entities (dashboards, analyses, lineage-tree
//! nodes, copy-number segments); the gateway translates each request into
//! one or more backend search queries, reshapes the flat documents into the
//! declared types, and resolves nested fields (tree children, per-cell
//! segs, ploidy) through further lookups over the same shared connection.
//!
//! # Architecture
//!
//! - [`query`]: translation from client arguments to backend query bodies
//! - [`mapping`]: declarative backend-field → client-field tables
//! - [`segs`]: run-length merge of fixed-width bins into segments
//! - [`tree`]: order-preserving resolution of child references
//! - [`Gateway`]: the operations, over an injected [`SearchBackend`]
//!
//! [`SearchBackend`]: cellgraph_backend::SearchBackend
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cellgraph_backend::HttpBackend;
//! use cellgraph_gateway::{Gateway, IndexRange};
//!
//! let backend = Arc::new(HttpBackend::new("http://localhost:9200"));
//! let gateway = Gateway::with_defaults(backend);
//!
//! let nodes = gateway.tree_nodes("ABC_123", IndexRange::new(0, 100)).await?;
//! ```

pub mod datasets;
pub mod entities;
pub mod error;
pub mod mapping;
pub mod query;
pub mod segs;
pub mod tree;

mod gateway;

pub use datasets::{dataset_name, DatasetKind};
pub use entities::{Analysis, Chromosome, Dashboard, NodeChild, Seg, SegRow, TreeNode};
pub use error::{GatewayError, Result};
pub use gateway::{Gateway, GatewayConfig, IndexRange, NodeSelector};
