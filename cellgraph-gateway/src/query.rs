//! Query translation layer.
//!
//! One builder per client operation, turning client arguments into backend
//! query bodies. Dataset selection stays with the caller; builders only
//! shape the request.

use cellgraph_search_protocol::{
    Aggregation, FilterClause, SearchQuery, BIN_CHROMOSOME_BUCKETS, BIN_WIDTH, PAGE_SIZE,
    TERMS_BUCKET_SIZE,
};
use serde_json::Value as JsonValue;

/// Sentinel parent value marking the tree root.
pub const ROOT_PARENT: &str = "root";

/// Primary ordering-index field on tree documents.
pub const ORDER_FIELD: &str = "heatmap_order";

/// Fallback ordering-index field for records lacking [`ORDER_FIELD`].
pub const ORDER_FALLBACK_FIELD: &str = "min_index";

/// Per-node raw identifier field, used for point lookups and child
/// references (distinct from the merged `cell_id` list).
pub const NODE_ID_FIELD: &str = "unmerged_id";

/// Fetch every analysis record.
pub fn all_analyses() -> SearchQuery {
    SearchQuery::sized(PAGE_SIZE)
}

/// Fetch every analysis record plus the distinct-dashboard buckets.
pub fn dashboards() -> SearchQuery {
    SearchQuery::sized(PAGE_SIZE).aggregate(
        "dashboards",
        Aggregation::terms("dashboard", TERMS_BUCKET_SIZE),
    )
}

/// Point lookup of one analysis within one dashboard.
pub fn analysis(analysis_id: &str, dashboard_id: &str) -> SearchQuery {
    SearchQuery::sized(1)
        .must(FilterClause::term("analysis_id", analysis_id))
        .must(FilterClause::term("dashboard", dashboard_id))
}

/// The unique node whose parent is the root sentinel.
pub fn tree_root() -> SearchQuery {
    SearchQuery::sized(1).filter(FilterClause::term("parent", ROOT_PARENT))
}

/// Point lookup of a node by its raw identifier.
pub fn tree_node_by_id(id: &str) -> SearchQuery {
    SearchQuery::sized(1).filter(FilterClause::term(NODE_ID_FIELD, id))
}

/// Point lookup of a node by an ordering-index field.
///
/// Callers query [`ORDER_FIELD`] first and retry with
/// [`ORDER_FALLBACK_FIELD`] on zero hits.
pub fn tree_node_by_index(field: &str, index: i64) -> SearchQuery {
    SearchQuery::sized(1).filter(FilterClause::term(field, index))
}

/// All nodes in an inclusive ordering-index range, ascending.
pub fn tree_nodes_in_range(min_index: i64, max_index: i64) -> SearchQuery {
    SearchQuery::sized(PAGE_SIZE)
        .must(FilterClause::range(ORDER_FIELD, min_index, max_index))
        .sort_asc(ORDER_FIELD)
}

/// Per-chromosome coordinate extents over a segment dataset.
pub fn chromosome_ranges() -> SearchQuery {
    SearchQuery::sized(0).aggregate(
        "chrom_ranges",
        Aggregation::terms("chrom_number", TERMS_BUCKET_SIZE)
            .order_by_key_asc()
            .sub("XMin", Aggregation::min("start"))
            .sub("XMax", Aggregation::max("end")),
    )
}

/// Tree rows for an explicit set of ordering indices, ascending.
pub fn rows_by_indices(indices: &[i64]) -> SearchQuery {
    let values: Vec<JsonValue> = indices.iter().map(|i| JsonValue::from(*i)).collect();
    SearchQuery::sized(PAGE_SIZE)
        .must(FilterClause::terms(ORDER_FIELD, values))
        .sort_asc(ORDER_FIELD)
}

/// Raw segment documents for one cell.
pub fn segs_for_cell(cell_id: &str) -> SearchQuery {
    SearchQuery::sized(PAGE_SIZE).filter(FilterClause::term("cell_id", cell_id))
}

/// QC record for one cell.
pub fn ploidy_for_cell(cell_id: &str) -> SearchQuery {
    SearchQuery::sized(1).filter(FilterClause::term("cell_id", cell_id))
}

/// Bin aggregation over a bins dataset, restricted to a set of cells:
/// chromosome buckets (ascending), fixed-width coordinate bins within each,
/// and the single majority state bucket within each bin.
pub fn clone_bins(cell_ids: &[String]) -> SearchQuery {
    let values: Vec<JsonValue> = cell_ids
        .iter()
        .map(|id| JsonValue::from(id.as_str()))
        .collect();

    SearchQuery::sized(0)
        .must(FilterClause::terms("cell_id", values))
        .aggregate(
            "chromosomes",
            Aggregation::terms("chrom_number", BIN_CHROMOSOME_BUCKETS)
                .order_by_key_asc()
                .sub(
                    "bins",
                    Aggregation::histogram("start", BIN_WIDTH)
                        .sub("state", Aggregation::terms("state", 1)),
                ),
        )
}
