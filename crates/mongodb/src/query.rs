//! Find query options.

use crate::convert::json_to_filter;
use crate::error::MongoError;
use bson::Document;
use serde_json::Value;

/// Parameters for [`crate::MongoSeeder::find`].
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    pub filter: Option<Value>,
    pub projection: Option<Value>,
    pub sort: Option<Value>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

/// A [`FindQuery`] converted to BSON.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResolvedFind {
    pub filter: Document,
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

impl FindQuery {
    pub(crate) fn resolve(&self) -> Result<ResolvedFind, MongoError> {
        Ok(ResolvedFind {
            filter: json_to_filter(self.filter.as_ref(), "filter")?,
            projection: self
                .projection
                .as_ref()
                .map(|p| json_to_filter(Some(p), "projection"))
                .transpose()?,
            sort: self
                .sort
                .as_ref()
                .map(|s| json_to_filter(Some(s), "sort"))
                .transpose()?,
            limit: self.limit,
            skip: self.skip,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_defaults() {
        let resolved = FindQuery::default().resolve().unwrap();
        assert!(resolved.filter.is_empty());
        assert!(resolved.projection.is_none());
        assert!(resolved.sort.is_none());
    }

    #[test]
    fn test_resolve_all_fields() {
        let query = FindQuery {
            filter: Some(json!({"status": "active"})),
            projection: Some(json!({"_id": 0, "name": 1})),
            sort: Some(json!({"created_at": -1})),
            limit: Some(10),
            skip: Some(5),
        };
        let resolved = query.resolve().unwrap();
        assert_eq!(resolved.filter.get_str("status").unwrap(), "active");
        assert_eq!(resolved.projection.unwrap().len(), 2);
        assert_eq!(resolved.sort.unwrap().get_i32("created_at").unwrap(), -1);
        assert_eq!(resolved.limit, Some(10));
        assert_eq!(resolved.skip, Some(5));
    }

    #[test]
    fn test_invalid_projection() {
        let query = FindQuery {
            projection: Some(json!("name")),
            ..Default::default()
        };
        assert!(matches!(
            query.resolve(),
            Err(MongoError::InvalidQuery { kind: "projection" })
        ));
    }
}
