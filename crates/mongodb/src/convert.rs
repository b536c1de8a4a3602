//! JSON <-> BSON conversion.

use crate::error::MongoError;
use bson::{Bson, Document};
use serde_json::Value;

/// Convert a seed document (Extended JSON accepted) into a BSON document.
///
/// `position` is the document's index in its seed file, used in errors.
pub fn json_to_document(value: &Value, position: usize) -> Result<Document, MongoError> {
    match value {
        Value::Object(map) => Ok(Document::try_from(map.clone())?),
        _ => Err(MongoError::NotADocument(position)),
    }
}

/// Convert an optional filter/projection/sort argument; `None` is an empty document.
pub fn json_to_filter(value: Option<&Value>, kind: &'static str) -> Result<Document, MongoError> {
    match value {
        None => Ok(Document::new()),
        Some(Value::Object(map)) => Ok(Document::try_from(map.clone())?),
        Some(_) => Err(MongoError::InvalidQuery { kind }),
    }
}

/// Render a BSON document as relaxed Extended JSON.
pub fn document_to_json(doc: Document) -> Value {
    Bson::Document(doc).into_relaxed_extjson()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use serde_json::json;

    #[test]
    fn test_plain_json_document() {
        let doc = json_to_document(&json!({"name": "alice", "age": 30, "tags": ["a"]}), 0).unwrap();
        assert_eq!(doc.get_str("name").unwrap(), "alice");
        assert_eq!(doc.get_i32("age").unwrap(), 30);
        assert_eq!(doc.get_array("tags").unwrap().len(), 1);
    }

    #[test]
    fn test_extended_json_types() {
        let doc = json_to_document(
            &json!({
                "_id": {"$oid": "64b7f0c2a1b2c3d4e5f60718"},
                "created_at": {"$date": "2024-01-01T00:00:00Z"}
            }),
            0,
        )
        .unwrap();

        assert_eq!(
            doc.get_object_id("_id").unwrap(),
            ObjectId::parse_str("64b7f0c2a1b2c3d4e5f60718").unwrap()
        );
        assert!(doc.get_datetime("created_at").is_ok());
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            json_to_document(&json!("nope"), 4),
            Err(MongoError::NotADocument(4))
        ));
    }

    #[test]
    fn test_filter_conversion() {
        assert!(json_to_filter(None, "filter").unwrap().is_empty());
        let filter = json_to_filter(Some(&json!({"age": {"$gt": 21}})), "filter").unwrap();
        assert!(filter.get_document("age").is_ok());
        assert!(matches!(
            json_to_filter(Some(&json!([1])), "sort"),
            Err(MongoError::InvalidQuery { kind: "sort" })
        ));
    }

    #[test]
    fn test_document_to_relaxed_json() {
        let oid = ObjectId::parse_str("64b7f0c2a1b2c3d4e5f60718").unwrap();
        let doc = bson::doc! {"_id": oid, "n": 5_i64, "name": "x"};
        let value = document_to_json(doc);
        assert_eq!(value["_id"], json!({"$oid": "64b7f0c2a1b2c3d4e5f60718"}));
        // relaxed mode keeps numbers as plain JSON numbers
        assert_eq!(value["n"], json!(5));
        assert_eq!(value["name"], "x");
    }
}
