//! Search query bodies.
//!
//! [`SearchQuery`] serializes to the backend's JSON query DSL. Queries are
//! assembled through builder methods so the translation layer reads close to
//! the request it produces:
//!
//! ```rust
//! use cellgraph_search_protocol::{Aggregation, FilterClause, SearchQuery};
//!
//! let query = SearchQuery::sized(0).aggregate(
//!     "chrom_ranges",
//!     Aggregation::terms("chrom_number", 50_000)
//!         .order_by_key_asc()
//!         .sub("XMin", Aggregation::min("start"))
//!         .sub("XMax", Aggregation::max("end")),
//! );
//! ```

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

/// A single filter clause inside a boolean query.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    /// Exact-match filter on one field.
    Term { field: String, value: JsonValue },
    /// Multi-value exact-match filter (document matches any listed value).
    Terms { field: String, values: Vec<JsonValue> },
    /// Inclusive range filter.
    Range { field: String, gte: i64, lte: i64 },
}

impl FilterClause {
    /// Exact-match filter.
    pub fn term(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Multi-value exact-match filter.
    pub fn terms(field: impl Into<String>, values: Vec<JsonValue>) -> Self {
        Self::Terms {
            field: field.into(),
            values,
        }
    }

    /// Inclusive `[gte, lte]` range filter.
    pub fn range(field: impl Into<String>, gte: i64, lte: i64) -> Self {
        Self::Range {
            field: field.into(),
            gte,
            lte,
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            Self::Term { field, value } => json!({ "term": { (field.as_str()): value } }),
            Self::Terms { field, values } => json!({ "terms": { (field.as_str()): values } }),
            Self::Range { field, gte, lte } => {
                json!({ "range": { (field.as_str()): { "gte": gte, "lte": lte } } })
            }
        }
    }
}

impl Serialize for FilterClause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Boolean combination of filter clauses.
///
/// `must` clauses participate in scoring; `filter` clauses do not. The
/// gateway is read-only and never ranks by score, so the distinction only
/// preserves the backend's expected request shapes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BoolQuery {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<FilterClause>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<FilterClause>,
}

impl BoolQuery {
    fn is_empty(&self) -> bool {
        self.must.is_empty() && self.filter.is_empty()
    }
}

/// Sort direction for a sort specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Per-field sort specification, serialized as `{"field": {"order": "asc"}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    field: String,
    order: SortOrder,
}

impl Serialize for SortSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.field, &json!({ "order": self.order }))?;
        map.end()
    }
}

/// One aggregation node: a kind plus optional named sub-aggregations.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    kind: AggregationKind,
    subs: Vec<(String, Aggregation)>,
}

#[derive(Debug, Clone, PartialEq)]
enum AggregationKind {
    Terms {
        field: String,
        size: usize,
        key_order: Option<SortOrder>,
    },
    Histogram {
        field: String,
        interval: i64,
    },
    Min {
        field: String,
    },
    Max {
        field: String,
    },
}

impl Aggregation {
    /// Terms (bucket-per-distinct-value) aggregation with a size bound.
    pub fn terms(field: impl Into<String>, size: usize) -> Self {
        Self {
            kind: AggregationKind::Terms {
                field: field.into(),
                size,
                key_order: None,
            },
            subs: Vec::new(),
        }
    }

    /// Fixed-interval histogram aggregation.
    pub fn histogram(field: impl Into<String>, interval: i64) -> Self {
        Self {
            kind: AggregationKind::Histogram {
                field: field.into(),
                interval,
            },
            subs: Vec::new(),
        }
    }

    /// Min metric aggregation.
    pub fn min(field: impl Into<String>) -> Self {
        Self {
            kind: AggregationKind::Min {
                field: field.into(),
            },
            subs: Vec::new(),
        }
    }

    /// Max metric aggregation.
    pub fn max(field: impl Into<String>) -> Self {
        Self {
            kind: AggregationKind::Max {
                field: field.into(),
            },
            subs: Vec::new(),
        }
    }

    /// Order terms buckets ascending by key. Only meaningful for terms
    /// aggregations; ignored by the others.
    pub fn order_by_key_asc(mut self) -> Self {
        if let AggregationKind::Terms { key_order, .. } = &mut self.kind {
            *key_order = Some(SortOrder::Asc);
        }
        self
    }

    /// Attach a named sub-aggregation, evaluated within each bucket.
    pub fn sub(mut self, name: impl Into<String>, agg: Aggregation) -> Self {
        self.subs.push((name.into(), agg));
        self
    }

    fn to_json(&self) -> JsonValue {
        let mut node = match &self.kind {
            AggregationKind::Terms {
                field,
                size,
                key_order,
            } => {
                let mut terms = json!({ "field": field, "size": size });
                if let Some(order) = key_order {
                    terms["order"] = json!({ "_key": order });
                }
                json!({ "terms": terms })
            }
            AggregationKind::Histogram { field, interval } => {
                json!({ "histogram": { "field": field, "interval": interval } })
            }
            AggregationKind::Min { field } => json!({ "min": { "field": field } }),
            AggregationKind::Max { field } => json!({ "max": { "field": field } }),
        };
        if !self.subs.is_empty() {
            let mut subs = serde_json::Map::new();
            for (name, agg) in &self.subs {
                subs.insert(name.clone(), agg.to_json());
            }
            node["aggs"] = JsonValue::Object(subs);
        }
        node
    }
}

impl Serialize for Aggregation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// A complete search query body.
///
/// Serializes to the backend's request JSON: `size`, optional `sort`,
/// optional `query.bool`, optional named `aggs`.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    size: usize,
    sort: Vec<SortSpec>,
    clauses: BoolQuery,
    aggs: Vec<(String, Aggregation)>,
}

impl SearchQuery {
    /// Query returning up to `size` documents, no filters.
    pub fn sized(size: usize) -> Self {
        Self {
            size,
            sort: Vec::new(),
            clauses: BoolQuery::default(),
            aggs: Vec::new(),
        }
    }

    /// Add a `must` clause.
    pub fn must(mut self, clause: FilterClause) -> Self {
        self.clauses.must.push(clause);
        self
    }

    /// Add a non-scoring `filter` clause.
    pub fn filter(mut self, clause: FilterClause) -> Self {
        self.clauses.filter.push(clause);
        self
    }

    /// Sort ascending by `field`.
    pub fn sort_asc(mut self, field: impl Into<String>) -> Self {
        self.sort.push(SortSpec {
            field: field.into(),
            order: SortOrder::Asc,
        });
        self
    }

    /// Attach a named top-level aggregation.
    pub fn aggregate(mut self, name: impl Into<String>, agg: Aggregation) -> Self {
        self.aggs.push((name.into(), agg));
        self
    }

    /// The declared result-set size bound.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Serialize for SearchQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("size", &self.size)?;
        if !self.sort.is_empty() {
            map.serialize_entry("sort", &self.sort)?;
        }
        if !self.clauses.is_empty() {
            map.serialize_entry("query", &json!({ "bool": self.clauses }))?;
        }
        if !self.aggs.is_empty() {
            let mut aggs = serde_json::Map::new();
            for (name, agg) in &self.aggs {
                aggs.insert(name.clone(), agg.to_json());
            }
            map.serialize_entry("aggs", &aggs)?;
        }
        map.end()
    }
}
