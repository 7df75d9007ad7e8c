//! Search result types.
//!
//! [`SearchResults`] is the parsed form of a backend search response: the
//! hit documents plus the aggregation tree. Aggregation buckets are walked
//! through [`AggregationBucket`] accessors rather than raw JSON indexing so
//! shape violations surface as typed [`ResultShapeError`]s.

use serde_json::Value as JsonValue;
use thiserror::Error;

/// A backend response that does not match the expected result shape.
#[derive(Debug, Error)]
pub enum ResultShapeError {
    /// Response body missing the `hits.hits` array.
    #[error("response has no hits section")]
    MissingHits,

    /// A named aggregation was requested but absent from the response.
    #[error("aggregation not found in response: {name}")]
    MissingAggregation { name: String },

    /// An aggregation is present but its buckets are not an array.
    #[error("aggregation {name} has malformed buckets")]
    MalformedBuckets { name: String },

    /// A bucket is missing its key.
    #[error("bucket in aggregation {name} has no key")]
    MissingBucketKey { name: String },
}

/// Parsed search response: hit source documents and aggregation payload.
#[derive(Debug, Clone)]
pub struct SearchResults {
    /// The `_source` document of each hit, in backend response order.
    pub hits: Vec<JsonValue>,
    /// The raw aggregation tree (`Null` when the query had no aggregations).
    pub aggregations: JsonValue,
}

impl SearchResults {
    /// Parse a raw backend response body.
    ///
    /// Expects the standard envelope: `hits.hits[]._source` for documents
    /// and a top-level `aggregations` object when aggregations were
    /// requested.
    pub fn from_response_body(body: JsonValue) -> Result<Self, ResultShapeError> {
        let hit_entries = body
            .get("hits")
            .and_then(|h| h.get("hits"))
            .and_then(JsonValue::as_array)
            .ok_or(ResultShapeError::MissingHits)?;

        let hits = hit_entries
            .iter()
            .map(|entry| entry.get("_source").cloned().unwrap_or(JsonValue::Null))
            .collect();

        let aggregations = body.get("aggregations").cloned().unwrap_or(JsonValue::Null);

        Ok(Self { hits, aggregations })
    }

    /// Construct results directly from documents and an aggregation tree.
    ///
    /// Used by in-memory backends in tests.
    pub fn new(hits: Vec<JsonValue>, aggregations: JsonValue) -> Self {
        Self { hits, aggregations }
    }

    /// True when the query matched no documents.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// The buckets of a named top-level bucket aggregation.
    pub fn buckets(&self, name: &str) -> Result<Vec<AggregationBucket>, ResultShapeError> {
        buckets_of(&self.aggregations, name)
    }
}

/// One bucket of a terms or histogram aggregation.
///
/// Holds the bucket key plus the full bucket object, so nested
/// sub-aggregations remain reachable.
#[derive(Debug, Clone)]
pub struct AggregationBucket {
    key: JsonValue,
    body: JsonValue,
}

impl AggregationBucket {
    /// The bucket key as a string, stringifying numeric keys.
    pub fn key_string(&self) -> String {
        match &self.key {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// The bucket key as an integer, when it is numeric.
    pub fn key_i64(&self) -> Option<i64> {
        // Histogram keys come back as floats even on integer fields.
        self.key
            .as_i64()
            .or_else(|| self.key.as_f64().map(|f| f as i64))
    }

    /// The bucket key as a float, when it is numeric.
    pub fn key_f64(&self) -> Option<f64> {
        self.key.as_f64()
    }

    /// The bucket's document count.
    pub fn doc_count(&self) -> u64 {
        self.body
            .get("doc_count")
            .and_then(JsonValue::as_u64)
            .unwrap_or(0)
    }

    /// The buckets of a named sub-aggregation within this bucket.
    pub fn sub_buckets(&self, name: &str) -> Result<Vec<AggregationBucket>, ResultShapeError> {
        buckets_of(&self.body, name)
    }

    /// The `value` of a named metric sub-aggregation (min/max).
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.body
            .get(name)
            .and_then(|m| m.get("value"))
            .and_then(JsonValue::as_f64)
    }
}

fn buckets_of(node: &JsonValue, name: &str) -> Result<Vec<AggregationBucket>, ResultShapeError> {
    let agg = node
        .get(name)
        .ok_or_else(|| ResultShapeError::MissingAggregation {
            name: name.to_string(),
        })?;

    let entries = agg
        .get("buckets")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| ResultShapeError::MalformedBuckets {
            name: name.to_string(),
        })?;

    entries
        .iter()
        .map(|entry| {
            let key = entry
                .get("key")
                .cloned()
                .ok_or_else(|| ResultShapeError::MissingBucketKey {
                    name: name.to_string(),
                })?;
            Ok(AggregationBucket {
                key,
                body: entry.clone(),
            })
        })
        .collect()
}
