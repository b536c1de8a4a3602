//! Seed-yaml document model.

use crate::error::SeedError;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value as YamlValue;
use std::path::Path;

/// Name of the unnamed scope holding the top-level `tables`.
pub const DEFAULT_SCOPE: &str = "default";

/// A parsed seed-yaml file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedDocument {
    #[serde(default)]
    pub vars: IndexMap<String, YamlValue>,
    #[serde(default)]
    pub tables: Vec<TableSeed>,
    #[serde(default)]
    pub databases: IndexMap<String, DatabaseSeed>,
}

/// Tables seeded into a database other than the connection's own.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSeed {
    #[serde(default)]
    pub vars: IndexMap<String, YamlValue>,
    #[serde(default)]
    pub tables: Vec<TableSeed>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSeed {
    pub table: String,
    /// Conflict target; accepts a single column or a list.
    #[serde(default, deserialize_with = "one_or_many")]
    pub upsert_key: Vec<String>,
    #[serde(default)]
    pub truncate: bool,
    #[serde(default)]
    pub rows: Vec<RowSeed>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RowSeed {
    /// Name other rows use in `@ref:NAME.COLUMN`.
    #[serde(rename = "ref", default)]
    pub name: Option<String>,
    #[serde(default)]
    pub values: IndexMap<String, YamlValue>,
}

impl SeedDocument {
    pub fn from_yaml(text: &str) -> Result<Self, SeedError> {
        // An empty file deserializes as `null`.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, SeedError> {
        let text = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len() + self.databases.values().map(|d| d.tables.len()).sum::<usize>()
    }
}

/// Render a `vars` block as strings; only scalars are accepted.
pub(crate) fn scalar_vars(
    vars: &IndexMap<String, YamlValue>,
) -> Result<IndexMap<String, String>, SeedError> {
    vars.iter()
        .map(|(name, value)| {
            let text = match value {
                YamlValue::String(s) => s.clone(),
                YamlValue::Number(n) => n.to_string(),
                YamlValue::Bool(b) => b.to_string(),
                _ => return Err(SeedError::InvalidVariable(name.clone())),
            };
            Ok((name.clone(), text))
        })
        .collect()
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(column)) => vec![column],
        Some(OneOrMany::Many(columns)) => columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_document() {
        let doc = SeedDocument::from_yaml(
            r#"
vars:
  tenant: acme
  max: 3
tables:
  - table: public.users
    upsert_key: email
    truncate: true
    rows:
      - ref: alice
        values:
          email: alice@acme.test
databases:
  analytics:
    vars: { region: eu }
    tables:
      - table: events
        rows:
          - values: { kind: signup }
"#,
        )
        .unwrap();

        assert_eq!(doc.tables[0].upsert_key, vec!["email"]);
        assert!(doc.tables[0].truncate);
        assert_eq!(doc.tables[0].rows[0].name.as_deref(), Some("alice"));
        assert_eq!(doc.databases["analytics"].tables[0].table, "events");
        assert_eq!(doc.table_count(), 2);

        let vars = scalar_vars(&doc.vars).unwrap();
        assert_eq!(vars["max"], "3");
    }

    #[test]
    fn test_upsert_key_list() {
        let doc = SeedDocument::from_yaml(
            "tables:\n  - table: t\n    upsert_key: [a, b]\n    rows: []\n",
        )
        .unwrap();
        assert_eq!(doc.tables[0].upsert_key, vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = SeedDocument::from_yaml("tables:\n  - table: t\n    rowz: []\n").unwrap_err();
        assert!(err.to_string().contains("rowz"));
    }

    #[test]
    fn test_non_scalar_var_rejected() {
        let doc = SeedDocument::from_yaml("vars:\n  list: [1, 2]\n").unwrap();
        assert!(matches!(
            scalar_vars(&doc.vars),
            Err(SeedError::InvalidVariable(name)) if name == "list"
        ));
    }

    #[test]
    fn test_empty_document() {
        let doc = SeedDocument::from_yaml("").unwrap();
        assert_eq!(doc.table_count(), 0);
    }
}
