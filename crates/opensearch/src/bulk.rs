//! Bulk request building and response parsing.

use crate::error::OpenSearchError;
use serde_json::{json, Value};

/// Default number of documents per `_bulk` request.
pub const DEFAULT_BULK_BATCH_SIZE: usize = 500;

/// Maximum number of item errors kept in a [`BulkReport`].
const MAX_REPORTED_ERRORS: usize = 10;

/// Options for [`crate::OpenSearchClient::bulk_index`].
#[derive(Debug, Clone)]
pub struct BulkOptions {
    /// Document field used as `_id`; auto-generated ids when `None`.
    pub id_field: Option<String>,
    /// Documents per `_bulk` request.
    pub batch_size: usize,
    /// Ask the cluster to refresh after the final batch.
    pub refresh: bool,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            id_field: None,
            batch_size: DEFAULT_BULK_BATCH_SIZE,
            refresh: false,
        }
    }
}

/// Outcome of a bulk load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub indexed: u64,
    pub failed: u64,
    pub batches: u64,
    /// First few item failures, formatted as `id: type: reason`.
    pub errors: Vec<String>,
}

impl BulkReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub(crate) fn merge(&mut self, other: BulkReport) {
        self.indexed += other.indexed;
        self.failed += other.failed;
        self.batches += other.batches;
        let room = MAX_REPORTED_ERRORS.saturating_sub(self.errors.len());
        self.errors.extend(other.errors.into_iter().take(room));
    }
}

/// Build an NDJSON `_bulk` body indexing `docs` into `index`.
///
/// `offset` is the position of `docs[0]` in the full seed set and is only
/// used in error messages.
pub fn build_bulk_body(
    index: &str,
    docs: &[Value],
    offset: usize,
    id_field: Option<&str>,
) -> Result<String, OpenSearchError> {
    let mut body = String::new();

    for (i, doc) in docs.iter().enumerate() {
        let obj = doc
            .as_object()
            .ok_or(OpenSearchError::NotADocument(offset + i))?;

        let id = id_field.and_then(|field| match obj.get(field) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        });

        let action = match id {
            Some(id) => json!({"index": {"_index": index, "_id": id}}),
            None => json!({"index": {"_index": index}}),
        };

        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(doc)?);
        body.push('\n');
    }

    Ok(body)
}

/// Summarise a `_bulk` response.
pub(crate) fn parse_bulk_response(response: &Value) -> Result<BulkReport, OpenSearchError> {
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| OpenSearchError::UnexpectedResponse {
            path: "/_bulk".to_string(),
            reason: "missing 'items' array".to_string(),
        })?;

    let mut report = BulkReport {
        batches: 1,
        ..Default::default()
    };

    for item in items {
        // Each item is keyed by its action name ("index", "create", ...).
        let Some(result) = item.as_object().and_then(|o| o.values().next()) else {
            continue;
        };

        let status = result.get("status").and_then(Value::as_u64).unwrap_or(0);
        if (200..300).contains(&status) {
            report.indexed += 1;
            continue;
        }

        report.failed += 1;
        if report.errors.len() < MAX_REPORTED_ERRORS {
            let id = result.get("_id").and_then(Value::as_str).unwrap_or("?");
            let error = result.get("error");
            let kind = error
                .and_then(|e| e.get("type"))
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let reason = error
                .and_then(|e| e.get("reason"))
                .and_then(Value::as_str)
                .unwrap_or("no reason given");
            report.errors.push(format!("{id}: {kind}: {reason}"));
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_bulk_body_with_ids() {
        let docs = vec![
            json!({"sku": "A-1", "qty": 2}),
            json!({"sku": 42, "qty": 1}),
            json!({"qty": 0}),
        ];
        let body = build_bulk_body("orders", &docs, 0, Some("sku")).unwrap();
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines.len(), 6);
        assert!(body.ends_with('\n'));
        assert_eq!(
            serde_json::from_str::<Value>(lines[0]).unwrap(),
            json!({"index": {"_index": "orders", "_id": "A-1"}})
        );
        assert_eq!(
            serde_json::from_str::<Value>(lines[2]).unwrap(),
            json!({"index": {"_index": "orders", "_id": "42"}})
        );
        // Missing id field falls back to an auto-generated id
        assert_eq!(
            serde_json::from_str::<Value>(lines[4]).unwrap(),
            json!({"index": {"_index": "orders"}})
        );
        // Source keeps the id field
        assert_eq!(
            serde_json::from_str::<Value>(lines[1]).unwrap(),
            json!({"sku": "A-1", "qty": 2})
        );
    }

    #[test]
    fn test_build_bulk_body_rejects_non_objects() {
        let docs = vec![json!({"ok": true}), json!([1, 2])];
        match build_bulk_body("orders", &docs, 10, None) {
            Err(OpenSearchError::NotADocument(idx)) => assert_eq!(idx, 11),
            other => panic!("expected NotADocument, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_bulk_response_counts_failures() {
        let response = json!({
            "took": 3,
            "errors": true,
            "items": [
                {"index": {"_id": "1", "status": 201}},
                {"index": {"_id": "2", "status": 200}},
                {"index": {"_id": "3", "status": 400, "error": {
                    "type": "mapper_parsing_exception",
                    "reason": "failed to parse field [qty]"
                }}}
            ]
        });
        let report = parse_bulk_response(&response).unwrap();
        assert_eq!(report.indexed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(
            report.errors,
            vec!["3: mapper_parsing_exception: failed to parse field [qty]"]
        );
        assert!(!report.is_success());
    }

    #[test]
    fn test_parse_bulk_response_requires_items() {
        assert!(parse_bulk_response(&json!({"errors": false})).is_err());
    }

    #[test]
    fn test_merge_caps_errors() {
        let mut total = BulkReport::default();
        for _ in 0..3 {
            total.merge(BulkReport {
                indexed: 1,
                failed: 5,
                batches: 1,
                errors: (0..5).map(|i| format!("e{i}")).collect(),
            });
        }
        assert_eq!(total.indexed, 3);
        assert_eq!(total.failed, 15);
        assert_eq!(total.batches, 3);
        assert_eq!(total.errors.len(), MAX_REPORTED_ERRORS);
    }
}
