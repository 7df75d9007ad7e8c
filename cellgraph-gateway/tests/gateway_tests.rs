//! End-to-end gateway tests against an in-memory search backend.
//!
//! The mock backend interprets the serialized query DSL (bool filters,
//! sort, terms/histogram/min/max aggregations) over per-dataset document
//! vectors, so these tests exercise query translation, field mapping, and
//! nested resolution together.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cellgraph_backend::{BackendError, SearchBackend};
use cellgraph_gateway::{
    Gateway, GatewayConfig, GatewayError, IndexRange, NodeSelector,
};
use cellgraph_search_protocol::{SearchQuery, SearchResults};
use serde_json::{json, Map as JsonMap, Value as JsonValue};

/// In-memory backend executing the gateway's query bodies over stored
/// documents. Records every searched dataset name.
#[derive(Debug, Default)]
struct MockBackend {
    datasets: HashMap<String, Vec<JsonValue>>,
    searched: Mutex<Vec<String>>,
}

impl MockBackend {
    fn new() -> Self {
        Self::default()
    }

    fn with_dataset(mut self, name: &str, docs: Vec<JsonValue>) -> Self {
        self.datasets.insert(name.to_string(), docs);
        self
    }

    fn searched_datasets(&self) -> Vec<String> {
        self.searched.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchBackend for MockBackend {
    async fn search(
        &self,
        dataset: &str,
        query: &SearchQuery,
    ) -> cellgraph_backend::Result<SearchResults> {
        self.searched.lock().unwrap().push(dataset.to_string());

        let docs = self
            .datasets
            .get(dataset)
            .ok_or_else(|| BackendError::Status {
                status: 404,
                dataset: dataset.to_string(),
                body: "no such dataset".to_string(),
            })?;

        let body = serde_json::to_value(query).expect("query serializes");

        let mut matched: Vec<JsonValue> = docs
            .iter()
            .filter(|doc| matches_query(doc, &body))
            .cloned()
            .collect();

        if let Some(sorts) = body.get("sort").and_then(JsonValue::as_array) {
            for sort in sorts.iter().rev() {
                let (field, _) = sort.as_object().unwrap().iter().next().unwrap();
                matched.sort_by_key(|doc| doc.get(field).and_then(JsonValue::as_i64));
            }
        }

        let aggregations = match body.get("aggs").and_then(JsonValue::as_object) {
            Some(aggs) => run_aggregations(&matched, aggs),
            None => JsonValue::Null,
        };

        let size = body["size"].as_u64().unwrap_or(10) as usize;
        matched.truncate(size);

        Ok(SearchResults::new(matched, aggregations))
    }

    async fn dataset_exists(&self, dataset: &str) -> cellgraph_backend::Result<bool> {
        Ok(self.datasets.contains_key(dataset))
    }
}

fn matches_query(doc: &JsonValue, body: &JsonValue) -> bool {
    let bool_query = match body.get("query").and_then(|q| q.get("bool")) {
        Some(b) => b,
        None => return true,
    };

    ["must", "filter"].iter().all(|section| {
        bool_query
            .get(section)
            .and_then(JsonValue::as_array)
            .map(|clauses| clauses.iter().all(|clause| matches_clause(doc, clause)))
            .unwrap_or(true)
    })
}

fn matches_clause(doc: &JsonValue, clause: &JsonValue) -> bool {
    if let Some(term) = clause.get("term").and_then(JsonValue::as_object) {
        let (field, value) = term.iter().next().unwrap();
        return doc.get(field) == Some(value);
    }
    if let Some(terms) = clause.get("terms").and_then(JsonValue::as_object) {
        let (field, values) = terms.iter().next().unwrap();
        return match (doc.get(field), values.as_array()) {
            (Some(actual), Some(candidates)) => candidates.contains(actual),
            _ => false,
        };
    }
    if let Some(range) = clause.get("range").and_then(JsonValue::as_object) {
        let (field, bounds) = range.iter().next().unwrap();
        let value = match doc.get(field).and_then(JsonValue::as_i64) {
            Some(v) => v,
            None => return false,
        };
        let gte = bounds["gte"].as_i64().unwrap_or(i64::MIN);
        let lte = bounds["lte"].as_i64().unwrap_or(i64::MAX);
        return value >= gte && value <= lte;
    }
    false
}

fn run_aggregations(docs: &[JsonValue], aggs: &JsonMap<String, JsonValue>) -> JsonValue {
    let mut out = JsonMap::new();

    for (name, spec) in aggs {
        let node = if let Some(terms) = spec.get("terms") {
            let field = terms["field"].as_str().unwrap();
            let key_asc = terms
                .get("order")
                .map(|o| o["_key"] == "asc")
                .unwrap_or(false);
            let size = terms["size"].as_u64().unwrap_or(10) as usize;
            bucket_aggregation(docs, spec, size, key_asc, |doc| doc.get(field).cloned())
        } else if let Some(histogram) = spec.get("histogram") {
            let field = histogram["field"].as_str().unwrap();
            let interval = histogram["interval"].as_i64().unwrap();
            bucket_aggregation(docs, spec, usize::MAX, true, |doc| {
                doc.get(field)
                    .and_then(JsonValue::as_i64)
                    .map(|v| json!((v / interval * interval) as f64))
            })
        } else if let Some(min) = spec.get("min") {
            metric_aggregation(docs, min["field"].as_str().unwrap(), f64::min)
        } else if let Some(max) = spec.get("max") {
            metric_aggregation(docs, max["field"].as_str().unwrap(), f64::max)
        } else {
            JsonValue::Null
        };
        out.insert(name.clone(), node);
    }

    JsonValue::Object(out)
}

fn bucket_aggregation(
    docs: &[JsonValue],
    spec: &JsonValue,
    size: usize,
    key_asc: bool,
    key_of: impl Fn(&JsonValue) -> Option<JsonValue>,
) -> JsonValue {
    let mut groups: Vec<(JsonValue, Vec<JsonValue>)> = Vec::new();
    for doc in docs {
        let key = match key_of(doc) {
            Some(k) => k,
            None => continue,
        };
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(doc.clone()),
            None => groups.push((key, vec![doc.clone()])),
        }
    }

    if key_asc {
        groups.sort_by(|(a, _), (b, _)| match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap(),
            _ => a.to_string().cmp(&b.to_string()),
        });
    } else {
        // Default bucket order: document count, descending.
        groups.sort_by(|(_, a), (_, b)| b.len().cmp(&a.len()));
    }
    groups.truncate(size);

    let sub_aggs = spec.get("aggs").and_then(JsonValue::as_object);
    let buckets: Vec<JsonValue> = groups
        .into_iter()
        .map(|(key, members)| {
            let mut bucket = JsonMap::new();
            bucket.insert("key".to_string(), key);
            bucket.insert("doc_count".to_string(), json!(members.len()));
            if let Some(subs) = sub_aggs {
                if let JsonValue::Object(entries) = run_aggregations(&members, subs) {
                    bucket.extend(entries);
                }
            }
            JsonValue::Object(bucket)
        })
        .collect();

    json!({ "buckets": buckets })
}

fn metric_aggregation(docs: &[JsonValue], field: &str, pick: fn(f64, f64) -> f64) -> JsonValue {
    let value = docs
        .iter()
        .filter_map(|doc| doc.get(field).and_then(JsonValue::as_f64))
        .reduce(pick);
    json!({ "value": value })
}

// -- fixtures ---------------------------------------------------------------

fn analysis_doc(id: &str, dashboard: &str) -> JsonValue {
    json!({
        "analysis_id": id,
        "title": format!("{id} title"),
        "description": format!("{id} description"),
        "segs_index": format!("ce00_{}_segs", id.to_lowercase()),
        "tree_index": format!("ce00_{}_tree", id.to_lowercase()),
        "dashboard": dashboard
    })
}

fn tree_docs() -> Vec<JsonValue> {
    // Stored deliberately out of heatmap order.
    vec![
        json!({
            "cell_id": "SA1-D",
            "unmerged_id": "N2",
            "parent": "N0",
            "heatmap_order": 2,
            "max_index": 2,
            "max_height": 1,
            "children": []
        }),
        json!({
            "cell_id": "SA1-A,SA1-B",
            "unmerged_id": "N0",
            "parent": "root",
            "heatmap_order": 0,
            "max_index": 2,
            "max_height": 2,
            "children": ["N1", "N2"]
        }),
        json!({
            "cell_id": "SA1-C",
            "unmerged_id": "N1",
            "parent": "N0",
            "heatmap_order": 1,
            "max_index": 1,
            "max_height": 1,
            "children": []
        }),
    ]
}

fn gateway_over(backend: MockBackend) -> (Gateway, Arc<MockBackend>) {
    let backend = Arc::new(backend);
    let gateway = Gateway::new(backend.clone(), GatewayConfig::default());
    (gateway, backend)
}

// -- tests ------------------------------------------------------------------

#[tokio::test]
async fn test_dashboards_partition_analyses() {
    let (gateway, _) = gateway_over(MockBackend::new().with_dataset(
        "analysis",
        vec![
            analysis_doc("A1", "D1"),
            analysis_doc("A2", "D1"),
            analysis_doc("B1", "D2"),
        ],
    ));

    let mut dashboards = gateway.dashboards().await.unwrap();
    dashboards.sort_by(|a, b| a.id.cmp(&b.id));

    assert_eq!(dashboards.len(), 2);
    assert_eq!(dashboards[0].id, "D1");
    assert_eq!(dashboards[1].id, "D2");

    // Every analysis under a dashboard carries that dashboard's id, and
    // each analysis appears under exactly one dashboard.
    let mut seen = Vec::new();
    for dashboard in &dashboards {
        for analysis in &dashboard.analyses {
            assert_eq!(analysis.dashboard, dashboard.id);
            seen.push(analysis.id.clone());
        }
    }
    seen.sort();
    assert_eq!(seen, vec!["A1", "A2", "B1"]);
}

#[tokio::test]
async fn test_analyses_returns_all_records() {
    let (gateway, _) = gateway_over(MockBackend::new().with_dataset(
        "analysis",
        vec![analysis_doc("A1", "D1"), analysis_doc("B1", "D2")],
    ));

    let analyses = gateway.analyses().await.unwrap();
    assert_eq!(analyses.len(), 2);
}

#[tokio::test]
async fn test_analysis_lookup_and_not_found() {
    let (gateway, _) = gateway_over(
        MockBackend::new().with_dataset("analysis", vec![analysis_doc("A1", "D1")]),
    );

    let found = gateway.analysis("A1", "D1").await.unwrap();
    assert_eq!(found.unwrap().id, "A1");

    // Same analysis id under the wrong dashboard is not-found, not an error.
    let missing = gateway.analysis("A1", "D2").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_tree_root_resolves_children_in_reference_order() {
    let (gateway, _) =
        gateway_over(MockBackend::new().with_dataset("ce00_abc_123_tree", tree_docs()));

    let root = gateway.tree_root("ABC_123").await.unwrap().unwrap();
    assert_eq!(root.id, vec!["SA1-A", "SA1-B"]);
    assert_eq!(root.parent, "root");
    assert_eq!(root.index, 0);

    let child_ids: Vec<&str> = root.children.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(child_ids, vec!["SA1-C", "SA1-D"]);
    assert_eq!(root.children[0].index, 1);
    assert_eq!(root.children[1].index, 2);
}

#[tokio::test]
async fn test_tree_node_by_id_and_index_agree() {
    let (gateway, _) =
        gateway_over(MockBackend::new().with_dataset("ce00_abc_123_tree", tree_docs()));

    let by_id = gateway
        .tree_node("ABC_123", NodeSelector::Id("N1".to_string()))
        .await
        .unwrap()
        .unwrap();
    let by_index = gateway
        .tree_node("ABC_123", NodeSelector::Index(1))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(by_id, by_index);
    assert_eq!(by_id.id, vec!["SA1-C"]);
}

#[tokio::test]
async fn test_tree_node_index_falls_back_to_min_index() {
    let (gateway, _) = gateway_over(MockBackend::new().with_dataset(
        "ce00_old_tree",
        vec![json!({
            "cell_id": "SA9-A",
            "unmerged_id": "M0",
            "parent": "root",
            "min_index": 5,
            "max_index": 5,
            "max_height": 0,
            "children": []
        })],
    ));

    let node = gateway
        .tree_node("OLD", NodeSelector::Index(5))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(node.index, 5);
}

#[tokio::test]
async fn test_tree_node_not_found() {
    let (gateway, _) =
        gateway_over(MockBackend::new().with_dataset("ce00_abc_123_tree", tree_docs()));

    let node = gateway
        .tree_node("ABC_123", NodeSelector::Index(99))
        .await
        .unwrap();
    assert!(node.is_none());
}

#[tokio::test]
async fn test_tree_nodes_range_inclusive_and_ordered() {
    let (gateway, _) =
        gateway_over(MockBackend::new().with_dataset("ce00_abc_123_tree", tree_docs()));

    let nodes = gateway
        .tree_nodes("ABC_123", IndexRange::new(0, 1))
        .await
        .unwrap();

    let indices: Vec<i64> = nodes.iter().map(|n| n.index).collect();
    assert_eq!(indices, vec![0, 1]);
}

#[tokio::test]
async fn test_dangling_child_reference_is_fatal() {
    let (gateway, _) = gateway_over(MockBackend::new().with_dataset(
        "ce00_bad_tree",
        vec![json!({
            "cell_id": "SA2-A",
            "unmerged_id": "R0",
            "parent": "root",
            "heatmap_order": 0,
            "max_index": 0,
            "max_height": 1,
            "children": ["MISSING"]
        })],
    ));

    let err = gateway.tree_root("BAD").await.unwrap_err();
    match err {
        GatewayError::DanglingReference { dataset, reference } => {
            assert_eq!(dataset, "ce00_bad_tree");
            assert_eq!(reference, "MISSING");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_chromosomes_aggregates_coordinate_extents() {
    let (gateway, _) = gateway_over(MockBackend::new().with_dataset(
        "ce00_abc_123_segs",
        vec![
            json!({ "cell_id": "SA1-C", "chrom_number": "2", "start": 1, "end": 700_000, "state": 2 }),
            json!({ "cell_id": "SA1-C", "chrom_number": "1", "start": 1, "end": 500_000, "state": 2 }),
            json!({ "cell_id": "SA1-D", "chrom_number": "1", "start": 500_001, "end": 1_000_000, "state": 3 }),
        ],
    ));

    let chromosomes = gateway.chromosomes("ABC_123").await.unwrap();
    assert_eq!(chromosomes.len(), 2);
    assert_eq!(chromosomes[0].id, "1");
    assert_eq!(chromosomes[0].start, 1);
    assert_eq!(chromosomes[0].end, 1_000_000);
    assert_eq!(chromosomes[1].id, "2");
}

#[tokio::test]
async fn test_segs_resolves_rows_with_ploidy() {
    let backend = MockBackend::new()
        .with_dataset("ce00_abc_123_tree", tree_docs())
        .with_dataset(
            "ce00_abc_123_segs",
            vec![
                json!({ "cell_id": "SA1-C", "chrom_number": "1", "start": 1, "end": 500_000,
                        "state": 2, "integer_median": 2.1 }),
                json!({ "cell_id": "SA1-D", "chrom_number": "1", "start": 1, "end": 500_000,
                        "state": 4 }),
            ],
        )
        .with_dataset(
            "ce00_abc_123_qc",
            vec![json!({ "cell_id": "SA1-C", "state_mode": 2 })],
        );
    let (gateway, _) = gateway_over(backend);

    let rows = gateway.segs("ABC_123", &[1, 2]).await.unwrap();
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].id, "SA1-C");
    assert_eq!(rows[0].ploidy, 2);
    assert_eq!(rows[0].segs.len(), 1);
    assert_eq!(rows[0].segs[0].integer_median, Some(2.1));

    // SA1-D has no QC record: sentinel ploidy, not an error.
    assert_eq!(rows[1].id, "SA1-D");
    assert_eq!(rows[1].ploidy, -1);
    assert_eq!(rows[1].segs[0].state, 4);
}

#[tokio::test]
async fn test_segs_without_qc_dataset_short_circuits() {
    let backend = MockBackend::new()
        .with_dataset("ce00_abc_123_tree", tree_docs())
        .with_dataset(
            "ce00_abc_123_segs",
            vec![json!({ "cell_id": "SA1-C", "chrom_number": "1", "start": 1, "end": 500_000,
                         "state": 2 })],
        );
    let (gateway, backend) = gateway_over(backend);

    let rows = gateway.segs("ABC_123", &[1]).await.unwrap();
    assert_eq!(rows[0].ploidy, -1);

    // The existence check must prevent any QC document search.
    assert!(!backend
        .searched_datasets()
        .iter()
        .any(|d| d == "ce00_abc_123_qc"));
}

#[tokio::test]
async fn test_clone_segs_reconstructs_merged_runs() {
    let backend = MockBackend::new()
        .with_dataset("ce00_abc_123_tree", tree_docs())
        .with_dataset(
            "ce00_abc_123_bins",
            vec![
                json!({ "cell_id": "SA1-C", "chrom_number": "1", "start": 0, "state": 2 }),
                json!({ "cell_id": "SA1-C", "chrom_number": "1", "start": 500_000, "state": 2 }),
                json!({ "cell_id": "SA1-D", "chrom_number": "1", "start": 1_000_000, "state": 3 }),
                // Different analysis cells must not contaminate the range.
                json!({ "cell_id": "OTHER", "chrom_number": "1", "start": 0, "state": 9 }),
            ],
        );
    let (gateway, _) = gateway_over(backend);

    let segs = gateway
        .clone_segs("ABC_123", IndexRange::new(1, 2))
        .await
        .unwrap();

    assert_eq!(segs.len(), 2);
    assert_eq!(
        (segs[0].start, segs[0].end, segs[0].state),
        (0, 1_000_000, 2)
    );
    assert_eq!(
        (segs[1].start, segs[1].end, segs[1].state),
        (1_000_001, 1_500_000, 3)
    );
}

#[tokio::test]
async fn test_has_ploidy_missing_dataset() {
    let (gateway, backend) = gateway_over(MockBackend::new());

    assert!(!gateway.has_ploidy("XYZ").await.unwrap());
    assert!(backend.searched_datasets().is_empty());
}

#[tokio::test]
async fn test_has_ploidy_present_dataset() {
    let (gateway, _) = gateway_over(
        MockBackend::new().with_dataset("ce00_xyz_qc", vec![json!({ "cell_id": "C" })]),
    );

    assert!(gateway.has_ploidy("XYZ").await.unwrap());
}

#[tokio::test]
async fn test_backend_transport_error_is_retryable() {
    // No datasets at all: searching yields a status error, which is not
    // retryable, but must surface as a backend error rather than any data
    // integrity variant.
    let (gateway, _) = gateway_over(MockBackend::new());

    let err = gateway.tree_root("ABC_123").await.unwrap_err();
    assert!(matches!(err, GatewayError::Backend(_)));
    assert!(!err.is_retryable());
}
