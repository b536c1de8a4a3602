//! Compile a [`SeedDocument`] into per-database SQL scripts.
//!
//! Statements keep document order. A row named with `ref` can be pointed at
//! by later rows of the same scope with `@ref:NAME.COLUMN`, which becomes a
//! scalar subquery looking the row up by its table's upsert key:
//!
//! ```sql
//! (SELECT "id" FROM "public"."users" WHERE "email" = 'alice@acme.test' LIMIT 1)
//! ```

use super::document::{scalar_vars, SeedDocument, TableSeed, DEFAULT_SCOPE};
use super::plan::{DatabaseScript, SeedPlan, Statement};
use crate::error::SeedError;
use crate::sql::{quote_ident, quote_literal, quote_qualified, truncate_sql};
use envkit_core::Variables;
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use std::collections::{HashMap, HashSet};

const REF_PREFIX: &str = "@ref:";
const ESCAPED_REF_PREFIX: &str = "@@ref:";

/// Compile `doc`, with `overrides` (CLI `--var`) taking precedence over every
/// `vars` block. `only` restricts output to one scope.
pub fn compile(
    doc: &SeedDocument,
    overrides: &Variables,
    only: Option<&str>,
) -> Result<SeedPlan, SeedError> {
    if doc.databases.contains_key(DEFAULT_SCOPE) {
        return Err(SeedError::ReservedDatabaseName);
    }
    if let Some(name) = only {
        if name != DEFAULT_SCOPE && !doc.databases.contains_key(name) {
            return Err(SeedError::UnknownDatabase(name.to_string()));
        }
    }
    let wanted = |scope: &str| only.map_or(true, |name| name == scope);

    let mut base = Variables::new();
    base.define_interpolated(&scalar_vars(&doc.vars)?, overrides)
        .map_err(|source| SeedError::Interpolation {
            location: "vars".to_string(),
            source,
        })?;

    let mut scripts = Vec::new();

    if wanted(DEFAULT_SCOPE) {
        let script = ScopeCompiler::new(None, &base).compile(&doc.tables)?;
        if !script.statements.is_empty() {
            scripts.push(script);
        }
    }

    for (name, database) in &doc.databases {
        if !wanted(name) {
            continue;
        }
        let mut vars = base.clone();
        vars.define_interpolated(&scalar_vars(&database.vars)?, overrides)
            .map_err(|source| SeedError::Interpolation {
                location: format!("databases.{name}.vars"),
                source,
            })?;
        let script = ScopeCompiler::new(Some(name), &vars).compile(&database.tables)?;
        if !script.statements.is_empty() {
            scripts.push(script);
        }
    }

    Ok(SeedPlan { scripts })
}

/// A named row that later rows may reference.
struct RefTarget {
    table: String,
    quoted_table: String,
    /// `(quoted column, compiled value)` per upsert key column; empty when
    /// the table has no upsert key.
    key: Vec<(String, String)>,
}

struct ScopeCompiler<'a> {
    database: Option<&'a str>,
    vars: &'a Variables,
    declared: HashSet<String>,
    defined: HashMap<String, RefTarget>,
}

impl<'a> ScopeCompiler<'a> {
    fn new(database: Option<&'a str>, vars: &'a Variables) -> Self {
        Self {
            database,
            vars,
            declared: HashSet::new(),
            defined: HashMap::new(),
        }
    }

    fn location(&self, table: &str, row: usize) -> String {
        match self.database {
            Some(db) => format!("{db}:{table}[{row}]"),
            None => format!("{table}[{row}]"),
        }
    }

    fn compile(mut self, tables: &[TableSeed]) -> Result<DatabaseScript, SeedError> {
        for name in tables.iter().flat_map(|t| &t.rows).filter_map(|r| r.name.as_ref()) {
            if !self.declared.insert(name.clone()) {
                return Err(SeedError::DuplicateRef {
                    scope: self.database.unwrap_or(DEFAULT_SCOPE).to_string(),
                    name: name.clone(),
                });
            }
        }

        let mut statements = Vec::new();
        for table in tables {
            self.compile_table(table, &mut statements)?;
        }

        Ok(DatabaseScript {
            database: self.database.map(str::to_string),
            statements,
        })
    }

    fn compile_table(
        &mut self,
        table: &TableSeed,
        statements: &mut Vec<Statement>,
    ) -> Result<(), SeedError> {
        let table_name = self.interpolate(&table.table, &table.table)?;
        let quoted_table = quote_qualified(&table_name)?;
        let key_columns = table
            .upsert_key
            .iter()
            .map(|c| quote_column(c))
            .collect::<Result<Vec<_>, _>>()?;

        if table.truncate {
            statements.push(Statement {
                sql: truncate_sql(std::slice::from_ref(&table_name), true, false)?,
                origin: format!("{table_name} (truncate)"),
            });
        }

        for (index, row) in table.rows.iter().enumerate() {
            let location = self.location(&table_name, index);
            if row.values.is_empty() {
                return Err(SeedError::EmptyRow { location });
            }
            if let Some(missing) = table.upsert_key.iter().find(|k| !row.values.contains_key(*k)) {
                return Err(SeedError::MissingUpsertKey {
                    location,
                    column: missing.clone(),
                });
            }

            let mut columns = Vec::with_capacity(row.values.len());
            let mut values = Vec::with_capacity(row.values.len());
            for (column, value) in &row.values {
                columns.push(quote_column(column)?);
                values.push(self.compile_value(value, column, &location)?);
            }

            if let Some(name) = &row.name {
                let key = table
                    .upsert_key
                    .iter()
                    .zip(&key_columns)
                    .filter_map(|(raw, quoted)| {
                        let position = row.values.get_index_of(raw)?;
                        Some((quoted.clone(), values[position].clone()))
                    })
                    .collect();
                self.defined.insert(
                    name.clone(),
                    RefTarget {
                        table: table_name.clone(),
                        quoted_table: quoted_table.clone(),
                        key,
                    },
                );
            }

            statements.push(Statement {
                sql: insert_sql(&quoted_table, &columns, &values, &key_columns),
                origin: location,
            });
        }
        Ok(())
    }

    fn interpolate(&self, input: &str, location: &str) -> Result<String, SeedError> {
        self.vars
            .interpolate(input)
            .map_err(|source| SeedError::Interpolation {
                location: location.to_string(),
                source,
            })
    }

    fn compile_value(
        &self,
        value: &YamlValue,
        column: &str,
        location: &str,
    ) -> Result<String, SeedError> {
        let unsupported = |reason: &str| SeedError::UnsupportedValue {
            location: location.to_string(),
            column: column.to_string(),
            reason: reason.to_string(),
        };

        match value {
            YamlValue::Null => Ok("NULL".to_string()),
            YamlValue::Bool(true) => Ok("TRUE".to_string()),
            YamlValue::Bool(false) => Ok("FALSE".to_string()),
            YamlValue::Number(n) => match n.as_f64() {
                Some(f) if !f.is_finite() => Err(unsupported("non-finite number")),
                _ => Ok(n.to_string()),
            },
            YamlValue::String(raw) => {
                let text = self.interpolate(raw, location)?;
                if text.starts_with(ESCAPED_REF_PREFIX) {
                    Ok(quote_literal(&text[1..]))
                } else if let Some(reference) = text.strip_prefix(REF_PREFIX) {
                    self.reference(reference, &text, location)
                } else {
                    Ok(quote_literal(&text))
                }
            }
            YamlValue::Mapping(map) if map.len() == 1 && map.contains_key("sql") => {
                match map.get("sql") {
                    Some(YamlValue::String(expr)) => self.interpolate(expr, location),
                    _ => Err(unsupported("`sql` must be a string")),
                }
            }
            YamlValue::Mapping(_) | YamlValue::Sequence(_) => {
                let json = self.to_json(value, column, location)?;
                Ok(format!("{}::jsonb", quote_literal(&json.to_string())))
            }
            YamlValue::Tagged(_) => Err(unsupported("tagged YAML values are not supported")),
        }
    }

    /// Convert a YAML tree to JSON, interpolating string leaves.
    fn to_json(
        &self,
        value: &YamlValue,
        column: &str,
        location: &str,
    ) -> Result<JsonValue, SeedError> {
        let unsupported = |reason: &str| SeedError::UnsupportedValue {
            location: location.to_string(),
            column: column.to_string(),
            reason: reason.to_string(),
        };

        Ok(match value {
            YamlValue::Null => JsonValue::Null,
            YamlValue::Bool(b) => JsonValue::Bool(*b),
            YamlValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    JsonValue::from(i)
                } else if let Some(u) = n.as_u64() {
                    JsonValue::from(u)
                } else {
                    n.as_f64()
                        .and_then(serde_json::Number::from_f64)
                        .map(JsonValue::Number)
                        .ok_or_else(|| unsupported("non-finite number"))?
                }
            }
            YamlValue::String(s) => JsonValue::String(self.interpolate(s, location)?),
            YamlValue::Sequence(items) => JsonValue::Array(
                items
                    .iter()
                    .map(|item| self.to_json(item, column, location))
                    .collect::<Result<_, _>>()?,
            ),
            YamlValue::Mapping(map) => {
                let mut out = serde_json::Map::new();
                for (key, item) in map {
                    let key = match key {
                        YamlValue::String(s) => s.clone(),
                        YamlValue::Number(n) => n.to_string(),
                        YamlValue::Bool(b) => b.to_string(),
                        _ => return Err(unsupported("mapping keys must be scalars")),
                    };
                    out.insert(key, self.to_json(item, column, location)?);
                }
                JsonValue::Object(out)
            }
            YamlValue::Tagged(_) => return Err(unsupported("tagged YAML values are not supported")),
        })
    }

    fn reference(&self, reference: &str, raw: &str, location: &str) -> Result<String, SeedError> {
        let (name, column) = reference
            .split_once('.')
            .filter(|(name, column)| !name.is_empty() && !column.is_empty())
            .ok_or_else(|| SeedError::InvalidReference {
                location: location.to_string(),
                value: raw.to_string(),
            })?;

        let Some(target) = self.defined.get(name) else {
            return Err(if self.declared.contains(name) {
                SeedError::ForwardReference {
                    location: location.to_string(),
                    name: name.to_string(),
                }
            } else {
                SeedError::UnknownReference {
                    location: location.to_string(),
                    name: name.to_string(),
                }
            });
        };

        if target.key.is_empty() {
            return Err(SeedError::UnaddressableReference {
                location: location.to_string(),
                name: name.to_string(),
                table: target.table.clone(),
            });
        }

        let condition = target
            .key
            .iter()
            .map(|(col, value)| match value.as_str() {
                "NULL" => format!("{col} IS NULL"),
                _ => format!("{col} = {value}"),
            })
            .collect::<Vec<_>>()
            .join(" AND ");

        Ok(format!(
            "(SELECT {} FROM {} WHERE {} LIMIT 1)",
            quote_ident(column),
            target.quoted_table,
            condition
        ))
    }
}

fn quote_column(column: &str) -> Result<String, SeedError> {
    if column.trim().is_empty() {
        return Err(SeedError::InvalidIdentifier(column.to_string()));
    }
    Ok(quote_ident(column))
}

fn insert_sql(table: &str, columns: &[String], values: &[String], key_columns: &[String]) -> String {
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        values.join(", ")
    );

    if !key_columns.is_empty() {
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| !key_columns.contains(c))
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect();
        sql.push_str(&format!(" ON CONFLICT ({})", key_columns.join(", ")));
        if updates.is_empty() {
            sql.push_str(" DO NOTHING");
        } else {
            sql.push_str(&format!(" DO UPDATE SET {}", updates.join(", ")));
        }
    }

    sql.push(';');
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_yaml(yaml: &str) -> Result<SeedPlan, SeedError> {
        compile(&SeedDocument::from_yaml(yaml).unwrap(), &Variables::new(), None)
    }

    fn sqls(plan: &SeedPlan) -> Vec<&str> {
        plan.scripts
            .iter()
            .flat_map(|s| &s.statements)
            .map(|s| s.sql.as_str())
            .collect()
    }

    #[test]
    fn test_scalar_values() {
        let plan = compile_yaml(
            r#"
tables:
  - table: t
    rows:
      - values:
          a: null
          b: true
          c: 42
          d: 1.5
          e: "it's"
"#,
        )
        .unwrap();
        assert_eq!(
            sqls(&plan),
            vec![r#"INSERT INTO "t" ("a", "b", "c", "d", "e") VALUES (NULL, TRUE, 42, 1.5, 'it''s');"#]
        );
    }

    #[test]
    fn test_raw_sql_and_jsonb() {
        let plan = compile_yaml(
            r#"
vars: { theme: dark }
tables:
  - table: t
    rows:
      - values:
          created_at: { sql: "now()" }
          profile: { theme: "${theme}", tags: [a, 1] }
"#,
        )
        .unwrap();
        assert_eq!(
            sqls(&plan),
            vec![
                r#"INSERT INTO "t" ("created_at", "profile") VALUES (now(), '{"theme":"dark","tags":["a",1]}'::jsonb);"#
            ]
        );
    }

    #[test]
    fn test_upsert_clauses() {
        let plan = compile_yaml(
            r#"
tables:
  - table: public.users
    upsert_key: [email]
    rows:
      - values: { email: a@x.test, name: A }
      - values: { email: b@x.test }
"#,
        )
        .unwrap();
        assert_eq!(
            sqls(&plan),
            vec![
                r#"INSERT INTO "public"."users" ("email", "name") VALUES ('a@x.test', 'A') ON CONFLICT ("email") DO UPDATE SET "name" = EXCLUDED."name";"#,
                r#"INSERT INTO "public"."users" ("email") VALUES ('b@x.test') ON CONFLICT ("email") DO NOTHING;"#,
            ]
        );
    }

    #[test]
    fn test_reference_becomes_subquery() {
        let plan = compile_yaml(
            r#"
tables:
  - table: users
    upsert_key: email
    rows:
      - ref: alice
        values: { email: alice@x.test }
  - table: posts
    rows:
      - values:
          author_id: "@ref:alice.id"
          note: "@@ref:alice.id"
"#,
        )
        .unwrap();
        assert_eq!(
            sqls(&plan)[1],
            r#"INSERT INTO "posts" ("author_id", "note") VALUES ((SELECT "id" FROM "users" WHERE "email" = 'alice@x.test' LIMIT 1), '@ref:alice.id');"#
        );
    }

    #[test]
    fn test_reference_errors() {
        let forward = compile_yaml(
            r#"
tables:
  - table: posts
    rows:
      - values: { author_id: "@ref:alice.id" }
  - table: users
    upsert_key: email
    rows:
      - ref: alice
        values: { email: a }
"#,
        );
        assert!(matches!(forward, Err(SeedError::ForwardReference { name, .. }) if name == "alice"));

        let unknown = compile_yaml("tables:\n  - table: t\n    rows:\n      - values: { x: \"@ref:bob.id\" }\n");
        assert!(matches!(unknown, Err(SeedError::UnknownReference { .. })));

        let unaddressable = compile_yaml(
            r#"
tables:
  - table: users
    rows:
      - ref: alice
        values: { email: a }
      - values: { boss: "@ref:alice.id" }
"#,
        );
        assert!(matches!(
            unaddressable,
            Err(SeedError::UnaddressableReference { table, .. }) if table == "users"
        ));

        let invalid = compile_yaml("tables:\n  - table: t\n    rows:\n      - values: { x: \"@ref:alice\" }\n");
        assert!(matches!(invalid, Err(SeedError::InvalidReference { .. })));
    }

    #[test]
    fn test_duplicate_ref() {
        let err = compile_yaml(
            r#"
tables:
  - table: t
    rows:
      - { ref: a, values: { x: 1 } }
      - { ref: a, values: { x: 2 } }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SeedError::DuplicateRef { scope, name } if scope == "default" && name == "a"));
    }

    #[test]
    fn test_row_errors() {
        let empty = compile_yaml("tables:\n  - table: t\n    rows:\n      - values: {}\n");
        assert!(matches!(empty, Err(SeedError::EmptyRow { location }) if location == "t[0]"));

        let missing = compile_yaml(
            "tables:\n  - table: t\n    upsert_key: [id]\n    rows:\n      - values: { name: x }\n",
        );
        assert!(matches!(missing, Err(SeedError::MissingUpsertKey { column, .. }) if column == "id"));
    }

    #[test]
    fn test_truncate_precedes_rows() {
        let plan = compile_yaml(
            "tables:\n  - table: t\n    truncate: true\n    rows:\n      - values: { x: 1 }\n",
        )
        .unwrap();
        assert_eq!(
            sqls(&plan),
            vec![
                r#"TRUNCATE TABLE "t" CASCADE;"#,
                r#"INSERT INTO "t" ("x") VALUES (1);"#,
            ]
        );
    }
}
