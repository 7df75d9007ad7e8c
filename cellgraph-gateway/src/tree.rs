//! Tree resolution engine.
//!
//! A tree node document stores its children only as foreign-key references
//! (each child's raw identifier). Resolving a node therefore needs one
//! point lookup per reference against the same tree dataset. Lookups run
//! concurrently with a bounded fan-out, but the output always follows the
//! parent's reference-list order, never completion order.

use cellgraph_backend::SearchBackend;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::entities::{NodeChild, NodeRecord, TreeNode};
use crate::error::{GatewayError, Result};
use crate::{mapping, query};

/// Resolve every child reference of a node record into a full [`TreeNode`].
pub async fn resolve_node(
    backend: &dyn SearchBackend,
    dataset: &str,
    record: NodeRecord,
    concurrency: usize,
) -> Result<TreeNode> {
    let children = resolve_children(backend, dataset, &record.children, concurrency).await?;

    Ok(TreeNode {
        id: record.id,
        parent: record.parent,
        index: record.index,
        max_index: record.max_index,
        max_height: record.max_height,
        children,
    })
}

/// Resolve a list of child references, preserving their order.
pub async fn resolve_children(
    backend: &dyn SearchBackend,
    dataset: &str,
    references: &[String],
    concurrency: usize,
) -> Result<Vec<NodeChild>> {
    // `buffered` yields results in input order regardless of which lookup
    // completes first.
    let lookups: Vec<BoxFuture<'_, Result<NodeChild>>> = references
        .iter()
        .map(|reference| {
            let fut: BoxFuture<'_, Result<NodeChild>> =
                Box::pin(resolve_child(backend, dataset, reference));
            fut
        })
        .collect();

    stream::iter(lookups)
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

async fn resolve_child(
    backend: &dyn SearchBackend,
    dataset: &str,
    reference: &str,
) -> Result<NodeChild> {
    let results = backend
        .search(dataset, &query::tree_node_by_id(reference))
        .await?;

    let doc = results
        .hits
        .first()
        .ok_or_else(|| GatewayError::DanglingReference {
            dataset: dataset.to_string(),
            reference: reference.to_string(),
        })?;

    mapping::NODE_CHILD.map(dataset, doc)
}
