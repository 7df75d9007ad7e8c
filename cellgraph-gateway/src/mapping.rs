//! Field mapping layer.
//!
//! Backend documents are flat and snake_cased; client entities are nested
//! and camelCased. The translation between them is declared once per entity
//! as a [`FieldMapping`] table and applied by one generic reshaping
//! function, so the mapping stays testable without any backend calls and no
//! resolver reads document fields ad hoc.
//!
//! Any new entity field must declare its source and transform here.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::{GatewayError, Result};

/// Value transform applied when copying a backend field to an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Copy the value as-is.
    Identity,
    /// Split a joined string on commas, trimming each element.
    CommaSeparatedList,
    /// Coerce a string or number to a string (chromosome identifiers are
    /// stored either way).
    Stringify,
    /// Round a number to the nearest integer.
    Round,
}

/// One row of an entity's mapping table.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// Backend document field.
    pub source: &'static str,
    /// Backend field consulted when `source` is absent from the record.
    pub fallback: Option<&'static str>,
    /// Client-facing field name (camelCase).
    pub target: &'static str,
    pub transform: Transform,
    /// Required fields make the document malformed when absent.
    pub required: bool,
}

impl FieldRule {
    pub const fn identity(source: &'static str, target: &'static str) -> Self {
        Self {
            source,
            fallback: None,
            target,
            transform: Transform::Identity,
            required: true,
        }
    }

    pub const fn identity_or(
        source: &'static str,
        fallback: &'static str,
        target: &'static str,
    ) -> Self {
        Self {
            source,
            fallback: Some(fallback),
            target,
            transform: Transform::Identity,
            required: true,
        }
    }

    pub const fn optional(source: &'static str, target: &'static str) -> Self {
        Self {
            source,
            fallback: None,
            target,
            transform: Transform::Identity,
            required: false,
        }
    }

    pub const fn comma_list(source: &'static str, target: &'static str) -> Self {
        Self {
            source,
            fallback: None,
            target,
            transform: Transform::CommaSeparatedList,
            required: true,
        }
    }

    pub const fn stringify(source: &'static str, target: &'static str) -> Self {
        Self {
            source,
            fallback: None,
            target,
            transform: Transform::Stringify,
            required: true,
        }
    }

    pub const fn round(source: &'static str, target: &'static str) -> Self {
        Self {
            source,
            fallback: None,
            target,
            transform: Transform::Round,
            required: true,
        }
    }
}

/// Declarative backend-document → client-entity mapping for one entity.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub entity: &'static str,
    pub rules: &'static [FieldRule],
}

impl FieldMapping {
    /// Reshape a backend document into the entity's client field layout.
    pub fn reshape(&self, dataset: &str, doc: &JsonValue) -> Result<JsonValue> {
        let mut out = JsonMap::with_capacity(self.rules.len());

        for rule in self.rules {
            let raw = field_of(doc, rule.source)
                .or_else(|| rule.fallback.and_then(|f| field_of(doc, f)));

            let raw = match raw {
                Some(value) => value,
                None if rule.required => {
                    return Err(self.malformed(
                        dataset,
                        format!("missing required field {}", rule.source),
                    ));
                }
                None => continue,
            };

            let value = self.transform(dataset, rule, raw)?;
            out.insert(rule.target.to_string(), value);
        }

        Ok(JsonValue::Object(out))
    }

    /// Reshape and deserialize into the typed entity.
    pub fn map<T: DeserializeOwned>(&self, dataset: &str, doc: &JsonValue) -> Result<T> {
        let reshaped = self.reshape(dataset, doc)?;
        serde_json::from_value(reshaped).map_err(|e| self.malformed(dataset, e.to_string()))
    }

    fn transform(&self, dataset: &str, rule: &FieldRule, value: &JsonValue) -> Result<JsonValue> {
        match rule.transform {
            Transform::Identity => Ok(value.clone()),
            Transform::CommaSeparatedList => {
                let joined = value.as_str().ok_or_else(|| {
                    self.malformed(dataset, format!("field {} is not a string", rule.source))
                })?;
                let items: Vec<JsonValue> = joined
                    .split(',')
                    .map(|item| JsonValue::String(item.trim().to_string()))
                    .collect();
                Ok(JsonValue::Array(items))
            }
            Transform::Stringify => match value {
                JsonValue::String(s) => Ok(JsonValue::String(s.clone())),
                JsonValue::Number(n) => Ok(JsonValue::String(n.to_string())),
                _ => Err(self.malformed(
                    dataset,
                    format!("field {} is neither string nor number", rule.source),
                )),
            },
            Transform::Round => {
                let n = value.as_f64().ok_or_else(|| {
                    self.malformed(dataset, format!("field {} is not a number", rule.source))
                })?;
                Ok(JsonValue::from(n.round() as i64))
            }
        }
    }

    fn malformed(&self, dataset: &str, message: String) -> GatewayError {
        GatewayError::MalformedDocument {
            entity: self.entity,
            dataset: dataset.to_string(),
            message,
        }
    }
}

fn field_of<'a>(doc: &'a JsonValue, name: &str) -> Option<&'a JsonValue> {
    doc.get(name).filter(|v| !v.is_null())
}

/// Analysis record from the analyses dataset.
pub const ANALYSIS: FieldMapping = FieldMapping {
    entity: "Analysis",
    rules: &[
        FieldRule::identity("analysis_id", "id"),
        FieldRule::identity("title", "title"),
        FieldRule::identity("description", "description"),
        FieldRule::identity("segs_index", "segsIndex"),
        FieldRule::identity("tree_index", "treeIndex"),
        FieldRule::identity("dashboard", "dashboard"),
    ],
};

/// Tree node from a per-analysis tree dataset. The merged `cell_id` list is
/// split into its underlying cell ids; records predating the primary
/// ordering field fall back to `min_index`.
pub const TREE_NODE: FieldMapping = FieldMapping {
    entity: "TreeNode",
    rules: &[
        FieldRule::comma_list("cell_id", "id"),
        FieldRule::identity("parent", "parent"),
        FieldRule::identity_or("heatmap_order", "min_index", "index"),
        FieldRule::identity("max_index", "maxIndex"),
        FieldRule::identity("max_height", "maxHeight"),
        FieldRule::optional("children", "children"),
    ],
};

/// Resolved child of a tree node. The child's `cell_id` stays a single
/// string here; only the parent view splits merged ids.
pub const NODE_CHILD: FieldMapping = FieldMapping {
    entity: "NodeChild",
    rules: &[
        FieldRule::identity("cell_id", "id"),
        FieldRule::identity_or("heatmap_order", "min_index", "index"),
        FieldRule::identity("max_index", "maxIndex"),
        FieldRule::identity("max_height", "maxHeight"),
    ],
};

/// Raw segment document from a per-analysis segs dataset.
pub const SEG: FieldMapping = FieldMapping {
    entity: "Seg",
    rules: &[
        FieldRule::stringify("chrom_number", "chromosome"),
        FieldRule::identity("start", "start"),
        FieldRule::identity("end", "end"),
        FieldRule::round("state", "state"),
        FieldRule::optional("integer_median", "integerMedian"),
    ],
};

/// Identity fields of a seg row (a tree document viewed as a per-cell row).
pub const SEG_ROW: FieldMapping = FieldMapping {
    entity: "SegRow",
    rules: &[
        FieldRule::identity("cell_id", "id"),
        FieldRule::identity_or("heatmap_order", "min_index", "index"),
    ],
};

/// Ploidy source field on a QC record.
pub const QC_PLOIDY: FieldMapping = FieldMapping {
    entity: "SegRowPloidy",
    rules: &[FieldRule::identity("state_mode", "ploidy")],
};

/// Deserialization target for [`QC_PLOIDY`].
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PloidyRecord {
    pub ploidy: i64,
}

/// Build a [`Chromosome`] from one `chrom_ranges` bucket: the bucket key
/// becomes the id, the `XMin`/`XMax` metric values the coordinate extent.
pub fn chromosome_from_bucket(
    bucket: &cellgraph_search_protocol::AggregationBucket,
) -> Result<crate::entities::Chromosome> {
    let metric = |name: &str| {
        bucket.metric(name).ok_or_else(|| {
            cellgraph_search_protocol::ResultShapeError::MissingAggregation {
                name: name.to_string(),
            }
        })
    };

    Ok(crate::entities::Chromosome {
        id: bucket.key_string(),
        start: metric("XMin")? as i64,
        end: metric("XMax")? as i64,
    })
}
