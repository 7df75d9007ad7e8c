//! Search backend wire contract for cellgraph.
//!
//! This crate defines the query and result types exchanged with the
//! document-search backend that stores single-cell analysis data
//! (lineage trees, copy-number segments, QC metrics). These types are
//! used by:
//!
//! - The backend client adapter (HTTP client)
//! - The gateway's query translation layer (query builders)
//! - The gateway's result shaping layers (bucket and hit accessors)
//!
//! # Contract Overview
//!
//! The backend is a generic search index offering:
//!
//! - **Term / terms / range filters** combined under a boolean query
//! - **Terms aggregations** with key ordering and a size bound
//! - **Histogram aggregations** with a fixed bin interval
//! - **Min/max metric sub-aggregations**
//!
//! Any store offering these primitives is substitutable.
//!
//! # Example
//!
//! ```rust
//! use cellgraph_search_protocol::{Aggregation, FilterClause, SearchQuery, PAGE_SIZE};
//!
//! let query = SearchQuery::sized(PAGE_SIZE)
//!     .must(FilterClause::range("heatmap_order", 0, 100))
//!     .sort_asc("heatmap_order");
//! ```

mod query;
mod results;

pub use query::{Aggregation, BoolQuery, FilterClause, SearchQuery, SortOrder};
pub use results::{AggregationBucket, ResultShapeError, SearchResults};

/// Result-set cap used to approximate "fetch all" for document queries.
pub const PAGE_SIZE: usize = 50_000;

/// Bucket cap for unbounded terms aggregations (distinct dashboards,
/// chromosome ranges).
pub const TERMS_BUCKET_SIZE: usize = 50_000;

/// Fixed genomic bin width in coordinate units.
pub const BIN_WIDTH: i64 = 500_000;

/// Bucket cap for the per-chromosome terms aggregation in bin queries.
pub const BIN_CHROMOSOME_BUCKETS: usize = 50;

/// Sentinel ploidy state for cells with no QC record (or no QC dataset).
pub const PLOIDY_UNKNOWN: i64 = -1;
