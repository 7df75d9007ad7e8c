//! Per-analysis dataset naming.
//!
//! Every analysis owns derived datasets in the backend, named
//! `<prefix>_<lowercased analysis id>_<kind>`. Lower-casing happens here and
//! nowhere else, so callers can pass analysis ids in whatever case the
//! client supplied.

use std::fmt;

/// The kinds of per-analysis datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    /// Lineage tree nodes.
    Tree,
    /// Raw copy-number segments.
    Segs,
    /// Quality-control records (ploidy source). Optional per analysis.
    Qc,
    /// Fixed-width copy-number bins for clone-level aggregation.
    Bins,
}

impl DatasetKind {
    fn suffix(self) -> &'static str {
        match self {
            DatasetKind::Tree => "tree",
            DatasetKind::Segs => "segs",
            DatasetKind::Qc => "qc",
            DatasetKind::Bins => "bins",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Compute the backend dataset name for an analysis and kind.
pub fn dataset_name(prefix: &str, analysis_id: &str, kind: DatasetKind) -> String {
    format!("{}_{}_{}", prefix, analysis_id.to_lowercase(), kind.suffix())
}
