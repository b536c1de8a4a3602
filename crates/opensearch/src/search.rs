//! Search request/response helpers.

use crate::error::OpenSearchError;
use serde::Serialize;
use serde_json::{json, Value};

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub id: String,
    pub score: Option<f64>,
    pub source: Value,
}

/// Parsed `_search` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub total: u64,
    pub hits: Vec<Hit>,
}

impl SearchResult {
    /// Hits flattened into records for table output: `_id`, `_score`, then source fields.
    pub fn to_records(&self) -> Vec<Value> {
        self.hits
            .iter()
            .map(|hit| {
                let mut record = serde_json::Map::new();
                record.insert("_id".to_string(), Value::String(hit.id.clone()));
                record.insert("_score".to_string(), json!(hit.score));
                match &hit.source {
                    Value::Object(fields) => {
                        for (k, v) in fields {
                            record.insert(k.clone(), v.clone());
                        }
                    }
                    Value::Null => {}
                    other => {
                        record.insert("_source".to_string(), other.clone());
                    }
                }
                Value::Object(record)
            })
            .collect()
    }

    pub(crate) fn from_response(path: &str, response: &Value) -> Result<Self, OpenSearchError> {
        let hits = response.get("hits").ok_or_else(|| unexpected(path, "missing 'hits'"))?;

        // 7.x+ reports {"value": n, "relation": ".."}, older clusters a bare number.
        let total = match hits.get("total") {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(obj) => obj.get("value").and_then(Value::as_u64).unwrap_or(0),
            None => 0,
        };

        let hits = hits
            .get("hits")
            .and_then(Value::as_array)
            .ok_or_else(|| unexpected(path, "missing 'hits.hits' array"))?
            .iter()
            .map(|hit| Hit {
                id: hit
                    .get("_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                score: hit.get("_score").and_then(Value::as_f64),
                source: hit.get("_source").cloned().unwrap_or(Value::Null),
            })
            .collect();

        Ok(Self { total, hits })
    }
}

/// Build a search body from an optional DSL object and size.
///
/// A DSL object that already has a top-level `query` key is used as the
/// whole body; anything else is treated as the query clause itself.
pub(crate) fn search_body(query: Option<&Value>, size: Option<usize>) -> Value {
    let mut body = match query {
        Some(Value::Object(map)) if map.contains_key("query") => Value::Object(map.clone()),
        Some(clause) => json!({ "query": clause }),
        None => json!({ "query": { "match_all": {} } }),
    };
    if let (Some(size), Some(obj)) = (size, body.as_object_mut()) {
        obj.insert("size".to_string(), json!(size));
    }
    body
}

/// Wrap a Lucene query string as a `query_string` clause.
pub fn query_string(q: &str) -> Value {
    json!({ "query_string": { "query": q } })
}

fn unexpected(path: &str, reason: &str) -> OpenSearchError {
    OpenSearchError::UnexpectedResponse {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
