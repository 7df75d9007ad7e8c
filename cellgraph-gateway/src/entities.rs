//! Client-facing entities.
//!
//! All entities are read-only projections over backend documents,
//! constructed per request through the field mappings in
//! [`crate::mapping`]. Client JSON uses camelCase field names.

use serde::{Deserialize, Serialize};

/// A named grouping of analyses, derived from a terms aggregation over the
/// `dashboard` field. Never persisted by this layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: String,
    /// Analyses whose `dashboard` field equals this dashboard's id.
    pub analyses: Vec<Analysis>,
}

/// One genomic analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Name of the per-analysis segment dataset.
    pub segs_index: String,
    /// Name of the per-analysis tree dataset.
    pub tree_index: String,
    /// Owning dashboard id; the partition key for [`Dashboard::analyses`].
    pub dashboard: String,
}

/// One node of a cell-lineage tree, with children resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Underlying cell identifiers; a merged node carries several.
    pub id: Vec<String>,
    /// Parent reference; the sentinel `"root"` marks the tree root.
    pub parent: String,
    /// Position in the linearized heatmap ordering.
    pub index: i64,
    /// Maximum ordering index within this node's subtree.
    pub max_index: i64,
    /// Maximum height within this node's subtree.
    pub max_height: i64,
    /// Resolved children, in the parent's reference-list order.
    pub children: Vec<NodeChild>,
}

/// A resolved child reference of a tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeChild {
    pub id: String,
    pub index: i64,
    pub max_index: i64,
    pub max_height: i64,
}

/// Observed coordinate range of one chromosome within an analysis's segment
/// dataset, derived from min/max aggregations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chromosome {
    pub id: String,
    pub start: i64,
    pub end: i64,
}

/// Per-cell row of copy-number state across the genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegRow {
    pub id: String,
    pub index: i64,
    /// Ploidy state from the QC dataset, or -1 when unknown.
    pub ploidy: i64,
    pub segs: Vec<Seg>,
}

/// A contiguous genomic interval with a constant copy-number state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seg {
    pub chromosome: String,
    pub start: i64,
    /// Inclusive end coordinate.
    pub end: i64,
    pub state: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integer_median: Option<f64>,
}

/// Raw tree-node document after field mapping, before child resolution.
///
/// `children` holds unresolved foreign-key references into the same tree
/// dataset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: Vec<String>,
    pub parent: String,
    pub index: i64,
    pub max_index: i64,
    pub max_height: i64,
    #[serde(default)]
    pub children: Vec<String>,
}

/// Seg row identity fields after mapping, before segs/ploidy resolution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SegRowRecord {
    pub id: String,
    pub index: i64,
}
