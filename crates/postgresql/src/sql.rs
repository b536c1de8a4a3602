//! SQL text helpers: quoting and the small admin statements the CLI runs.

use crate::error::{PostgresError, SeedError};
use envkit_core::Variables;
use std::path::Path;

/// Quote a single identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a possibly schema-qualified name (`schema.table`) part by part.
pub fn quote_qualified(name: &str) -> Result<String, SeedError> {
    let parts: Vec<&str> = name.split('.').map(str::trim).collect();
    if parts.iter().any(|p| p.is_empty()) || parts.len() > 3 {
        return Err(SeedError::InvalidIdentifier(name.to_string()));
    }
    Ok(parts
        .into_iter()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join("."))
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Tables in `schema` with their planner row estimates.
pub fn list_tables_sql(schema: &str) -> String {
    format!(
        "SELECT t.table_name AS table_name, \
         GREATEST(COALESCE(c.reltuples, 0), 0)::bigint AS estimated_rows \
         FROM information_schema.tables t \
         LEFT JOIN pg_catalog.pg_namespace n ON n.nspname = t.table_schema \
         LEFT JOIN pg_catalog.pg_class c ON c.relname = t.table_name AND c.relnamespace = n.oid \
         WHERE t.table_type = 'BASE TABLE' AND t.table_schema = {} \
         ORDER BY t.table_name",
        quote_literal(schema)
    )
}

/// `TRUNCATE` for the given tables.
pub fn truncate_sql(
    tables: &[String],
    cascade: bool,
    restart_identity: bool,
) -> Result<String, SeedError> {
    if tables.is_empty() {
        return Err(SeedError::InvalidIdentifier(String::new()));
    }
    let names = tables
        .iter()
        .map(|t| quote_qualified(t))
        .collect::<Result<Vec<_>, _>>()?;
    let mut sql = format!("TRUNCATE TABLE {}", names.join(", "));
    if restart_identity {
        sql.push_str(" RESTART IDENTITY");
    }
    if cascade {
        sql.push_str(" CASCADE");
    }
    sql.push(';');
    Ok(sql)
}

/// Read a SQL script, interpolating `${var}` placeholders when `vars` is given.
pub fn load_script(path: &Path, vars: Option<&Variables>) -> Result<String, PostgresError> {
    let sql = std::fs::read_to_string(path)?;
    match vars {
        Some(vars) => Ok(vars.interpolate(&sql)?),
        None => Ok(sql),
    }
}
