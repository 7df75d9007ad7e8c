//! Gateway entry point.
//!
//! [`Gateway`] owns the injected backend connection and exposes the
//! client-facing operations. Each operation translates its arguments into
//! backend queries, reshapes the primary results through the field
//! mappings, and drives the tree/segment engines for nested fields.

use std::sync::Arc;

use cellgraph_backend::SearchBackend;
use cellgraph_search_protocol::PLOIDY_UNKNOWN;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::datasets::{dataset_name, DatasetKind};
use crate::entities::{
    Analysis, Chromosome, Dashboard, NodeRecord, Seg, SegRow, SegRowRecord, TreeNode,
};
use crate::error::Result;
use crate::mapping::{self, PloidyRecord};
use crate::{query, segs, tree};

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Prefix of every per-analysis dataset name.
    pub dataset_prefix: String,
    /// Name of the dataset holding analysis records.
    pub analyses_dataset: String,
    /// Fan-out bound for nested lookups (children, per-cell segs/ploidy).
    pub lookup_concurrency: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            dataset_prefix: "ce00".to_string(),
            analyses_dataset: "analysis".to_string(),
            lookup_concurrency: 8,
        }
    }
}

impl GatewayConfig {
    /// Set the per-analysis dataset name prefix.
    pub fn with_dataset_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.dataset_prefix = prefix.into();
        self
    }

    /// Set the analyses dataset name.
    pub fn with_analyses_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.analyses_dataset = dataset.into();
        self
    }

    /// Set the nested-lookup concurrency bound.
    pub fn with_lookup_concurrency(mut self, concurrency: usize) -> Self {
        self.lookup_concurrency = concurrency;
        self
    }
}

/// Selector for a single tree node lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeSelector {
    /// Lookup by the node's raw identifier.
    Id(String),
    /// Lookup by ordering index.
    Index(i64),
}

/// Inclusive ordering-index range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub min: i64,
    pub max: i64,
}

impl IndexRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }
}

/// Query-aggregation gateway over the document-search backend.
#[derive(Debug, Clone)]
pub struct Gateway {
    backend: Arc<dyn SearchBackend>,
    config: GatewayConfig,
}

impl Gateway {
    /// Create a gateway over an injected backend connection.
    pub fn new(backend: Arc<dyn SearchBackend>, config: GatewayConfig) -> Self {
        Self { backend, config }
    }

    /// Gateway with default configuration.
    pub fn with_defaults(backend: Arc<dyn SearchBackend>) -> Self {
        Self::new(backend, GatewayConfig::default())
    }

    fn dataset(&self, analysis_id: &str, kind: DatasetKind) -> String {
        dataset_name(&self.config.dataset_prefix, analysis_id, kind)
    }

    /// All dashboards, each carrying the analyses whose `dashboard` field
    /// matches its id.
    pub async fn dashboards(&self) -> Result<Vec<Dashboard>> {
        let results = self
            .backend
            .search(&self.config.analyses_dataset, &query::dashboards())
            .await?;

        let pool: Vec<Analysis> = results
            .hits
            .iter()
            .map(|doc| mapping::ANALYSIS.map(&self.config.analyses_dataset, doc))
            .collect::<Result<_>>()?;

        let dashboards = results
            .buckets("dashboards")?
            .iter()
            .map(|bucket| {
                let id = bucket.key_string();
                let analyses = pool
                    .iter()
                    .filter(|analysis| analysis.dashboard == id)
                    .cloned()
                    .collect();
                Dashboard { id, analyses }
            })
            .collect();

        Ok(dashboards)
    }

    /// Every analysis record, unpartitioned.
    pub async fn analyses(&self) -> Result<Vec<Analysis>> {
        let results = self
            .backend
            .search(&self.config.analyses_dataset, &query::all_analyses())
            .await?;

        results
            .hits
            .iter()
            .map(|doc| mapping::ANALYSIS.map(&self.config.analyses_dataset, doc))
            .collect()
    }

    /// One analysis by id within a dashboard, or `None`.
    pub async fn analysis(
        &self,
        analysis_id: &str,
        dashboard_id: &str,
    ) -> Result<Option<Analysis>> {
        let results = self
            .backend
            .search(
                &self.config.analyses_dataset,
                &query::analysis(analysis_id, dashboard_id),
            )
            .await?;

        results
            .hits
            .first()
            .map(|doc| mapping::ANALYSIS.map(&self.config.analyses_dataset, doc))
            .transpose()
    }

    /// The root node of an analysis's lineage tree, or `None`.
    pub async fn tree_root(&self, analysis_id: &str) -> Result<Option<TreeNode>> {
        let dataset = self.dataset(analysis_id, DatasetKind::Tree);
        let results = self.backend.search(&dataset, &query::tree_root()).await?;

        self.resolve_first_node(&dataset, &results.hits).await
    }

    /// One tree node by id or ordering index, or `None`.
    ///
    /// Index lookups try the primary ordering field first, then retry on
    /// the fallback field for records that lack it.
    pub async fn tree_node(
        &self,
        analysis_id: &str,
        selector: NodeSelector,
    ) -> Result<Option<TreeNode>> {
        let dataset = self.dataset(analysis_id, DatasetKind::Tree);

        let hits = match selector {
            NodeSelector::Id(id) => {
                self.backend
                    .search(&dataset, &query::tree_node_by_id(&id))
                    .await?
                    .hits
            }
            NodeSelector::Index(index) => {
                let primary = self
                    .backend
                    .search(&dataset, &query::tree_node_by_index(query::ORDER_FIELD, index))
                    .await?;
                if primary.is_empty() {
                    self.backend
                        .search(
                            &dataset,
                            &query::tree_node_by_index(query::ORDER_FALLBACK_FIELD, index),
                        )
                        .await?
                        .hits
                } else {
                    primary.hits
                }
            }
        };

        self.resolve_first_node(&dataset, &hits).await
    }

    /// All tree nodes in an inclusive ordering-index range, ascending.
    pub async fn tree_nodes(
        &self,
        analysis_id: &str,
        range: IndexRange,
    ) -> Result<Vec<TreeNode>> {
        let dataset = self.dataset(analysis_id, DatasetKind::Tree);
        let results = self
            .backend
            .search(&dataset, &query::tree_nodes_in_range(range.min, range.max))
            .await?;

        let records: Vec<NodeRecord> = results
            .hits
            .iter()
            .map(|doc| mapping::TREE_NODE.map(&dataset, doc))
            .collect::<Result<_>>()?;

        let concurrency = self.config.lookup_concurrency;
        stream::iter(records.into_iter().map(|record| {
            let dataset = dataset.as_str();
            async move {
                tree::resolve_node(self.backend.as_ref(), dataset, record, concurrency).await
            }
        }))
        .buffered(concurrency.max(1))
        .try_collect()
        .await
    }

    /// Coordinate extents per chromosome in the segment dataset, ascending
    /// by chromosome key.
    pub async fn chromosomes(&self, analysis_id: &str) -> Result<Vec<Chromosome>> {
        let dataset = self.dataset(analysis_id, DatasetKind::Segs);
        let results = self
            .backend
            .search(&dataset, &query::chromosome_ranges())
            .await?;

        results
            .buckets("chrom_ranges")?
            .iter()
            .map(mapping::chromosome_from_bucket)
            .collect()
    }

    /// Per-cell seg rows for a set of ordering indices, with nested segs
    /// and ploidy resolved.
    pub async fn segs(&self, analysis_id: &str, indices: &[i64]) -> Result<Vec<SegRow>> {
        let tree_dataset = self.dataset(analysis_id, DatasetKind::Tree);
        let segs_dataset = self.dataset(analysis_id, DatasetKind::Segs);
        let qc_dataset = self.dataset(analysis_id, DatasetKind::Qc);

        let results = self
            .backend
            .search(&tree_dataset, &query::rows_by_indices(indices))
            .await?;

        let records: Vec<SegRowRecord> = results
            .hits
            .iter()
            .map(|doc| mapping::SEG_ROW.map(&tree_dataset, doc))
            .collect::<Result<_>>()?;

        // One existence check gates every per-cell QC lookup.
        let has_qc = self.backend.dataset_exists(&qc_dataset).await?;

        stream::iter(records.into_iter().map(|record| {
            let segs_dataset = segs_dataset.as_str();
            let qc_dataset = qc_dataset.as_str();
            async move {
                self.resolve_seg_row(segs_dataset, qc_dataset, has_qc, record)
                    .await
            }
        }))
        .buffered(self.config.lookup_concurrency.max(1))
        .try_collect()
        .await
    }

    /// Reconstructed clone-level segments for a node range: the range is
    /// resolved to cell ids, then their bins are aggregated and merged.
    pub async fn clone_segs(&self, analysis_id: &str, range: IndexRange) -> Result<Vec<Seg>> {
        let tree_dataset = self.dataset(analysis_id, DatasetKind::Tree);
        let bins_dataset = self.dataset(analysis_id, DatasetKind::Bins);

        let rows = self
            .backend
            .search(&tree_dataset, &query::tree_nodes_in_range(range.min, range.max))
            .await?;

        let cell_ids: Vec<String> = rows
            .hits
            .iter()
            .map(|doc| {
                mapping::SEG_ROW
                    .map(&tree_dataset, doc)
                    .map(|record: SegRowRecord| record.id)
            })
            .collect::<Result<_>>()?;

        tracing::debug!(
            analysis_id,
            cells = cell_ids.len(),
            "aggregating clone bins"
        );

        let bins = self
            .backend
            .search(&bins_dataset, &query::clone_bins(&cell_ids))
            .await?;

        segs::reconstruct_from_buckets(&bins.buckets("chromosomes")?)
    }

    /// Whether the analysis has a QC dataset (and therefore ploidy data).
    pub async fn has_ploidy(&self, analysis_id: &str) -> Result<bool> {
        let dataset = self.dataset(analysis_id, DatasetKind::Qc);
        Ok(self.backend.dataset_exists(&dataset).await?)
    }

    async fn resolve_first_node(
        &self,
        dataset: &str,
        hits: &[serde_json::Value],
    ) -> Result<Option<TreeNode>> {
        let doc = match hits.first() {
            Some(doc) => doc,
            None => return Ok(None),
        };

        let record: NodeRecord = mapping::TREE_NODE.map(dataset, doc)?;
        let node = tree::resolve_node(
            self.backend.as_ref(),
            dataset,
            record,
            self.config.lookup_concurrency,
        )
        .await?;

        Ok(Some(node))
    }

    async fn resolve_seg_row(
        &self,
        segs_dataset: &str,
        qc_dataset: &str,
        has_qc: bool,
        record: SegRowRecord,
    ) -> Result<SegRow> {
        let seg_results = self
            .backend
            .search(segs_dataset, &query::segs_for_cell(&record.id))
            .await?;

        let segs: Vec<Seg> = seg_results
            .hits
            .iter()
            .map(|doc| mapping::SEG.map(segs_dataset, doc))
            .collect::<Result<_>>()?;

        let ploidy = if has_qc {
            let qc_results = self
                .backend
                .search(qc_dataset, &query::ploidy_for_cell(&record.id))
                .await?;
            match qc_results.hits.first() {
                Some(doc) => {
                    let record: PloidyRecord = mapping::QC_PLOIDY.map(qc_dataset, doc)?;
                    record.ploidy
                }
                None => PLOIDY_UNKNOWN,
            }
        } else {
            PLOIDY_UNKNOWN
        };

        Ok(SegRow {
            id: record.id,
            index: record.index,
            ploidy,
            segs,
        })
    }
}
