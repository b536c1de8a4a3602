//! Seed document loading.
//!
//! Seed files hold the documents that get bulk-loaded into OpenSearch indices
//! and MongoDB collections. The format is picked from the file extension:
//!
//! - `.json` - a top-level array (one document per element) or a single object
//! - `.jsonl` / `.ndjson` - one JSON value per non-blank line
//! - `.yaml` / `.yml` - same shape as `.json`, written in YAML; a stream of
//!   `---`-separated documents contributes each of them in order

use crate::error::CoreError;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Supported seed file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    JsonLines,
    Yaml,
}

impl DocumentFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, CoreError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("json") => Ok(DocumentFormat::Json),
            Some("jsonl") | Some("ndjson") => Ok(DocumentFormat::JsonLines),
            Some("yaml") | Some("yml") => Ok(DocumentFormat::Yaml),
            _ => Err(CoreError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Load every document from a seed file.
pub fn load_documents(path: &Path) -> Result<Vec<Value>, CoreError> {
    let format = DocumentFormat::from_path(path)?;
    let text = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
    let documents = parse_documents(&text, format)?;
    tracing::debug!("Loaded {} documents from {:?}", documents.len(), path);
    Ok(documents)
}

/// Parse documents from text in the given format.
pub fn parse_documents(text: &str, format: DocumentFormat) -> Result<Vec<Value>, CoreError> {
    match format {
        DocumentFormat::Json => Ok(flatten_top_level(serde_json::from_str(text)?)),
        DocumentFormat::Yaml => {
            if text.trim().is_empty() {
                return Ok(Vec::new());
            }
            let mut documents = Vec::new();
            for document in serde_yaml::Deserializer::from_str(text) {
                documents.extend(flatten_top_level(Value::deserialize(document)?));
            }
            Ok(documents)
        }
        DocumentFormat::JsonLines => text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line).map_err(|source| CoreError::JsonLine {
                    line: idx + 1,
                    source,
                })
            })
            .collect(),
    }
}

fn flatten_top_level(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Interpret a CLI argument as either inline JSON or a path to a JSON file.
///
/// Text starting with `{` or `[` (after whitespace) is parsed directly.
pub fn load_json_value(arg: &str) -> Result<Value, CoreError> {
    let trimmed = arg.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(serde_json::from_str(arg)?);
    }

    let path = Path::new(arg);
    let text = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
    match DocumentFormat::from_path(path) {
        Ok(DocumentFormat::Yaml) => Ok(serde_yaml::from_str(&text)?),
        _ => Ok(serde_json::from_str(&text)?),
    }
}

/// List the seed files in a directory (non-recursive), sorted by name.
pub fn list_seed_files(dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| CoreError::io(dir, e))? {
        let entry = entry.map_err(|e| CoreError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() && DocumentFormat::from_path(&path).is_ok() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Target collection/index name for a seed file: its file stem.
pub fn collection_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("users.json")).unwrap(),
            DocumentFormat::Json
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("events.NDJSON")).unwrap(),
            DocumentFormat::JsonLines
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("seed.yml")).unwrap(),
            DocumentFormat::Yaml
        );
        assert!(matches!(
            DocumentFormat::from_path(Path::new("data.csv")),
            Err(CoreError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_parse_json_array_and_object() {
        let docs = parse_documents(r#"[{"a":1},{"a":2}]"#, DocumentFormat::Json).unwrap();
        assert_eq!(docs, vec![json!({"a": 1}), json!({"a": 2})]);

        let docs = parse_documents(r#"{"a":1}"#, DocumentFormat::Json).unwrap();
        assert_eq!(docs, vec![json!({"a": 1})]);
    }

    #[test]
    fn test_parse_json_lines_skips_blank_lines() {
        let text = "{\"a\":1}\n\n  \n{\"a\":2}\n";
        let docs = parse_documents(text, DocumentFormat::JsonLines).unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_parse_json_lines_reports_line_number() {
        let text = "{\"a\":1}\n\n{broken\n";
        match parse_documents(text, DocumentFormat::JsonLines) {
            Err(CoreError::JsonLine { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected JsonLine error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_yaml() {
        let text = "- name: alice\n  age: 30\n- name: bob\n  age: 25\n";
        let docs = parse_documents(text, DocumentFormat::Yaml).unwrap();
        assert_eq!(docs[1], json!({"name": "bob", "age": 25}));
        assert!(parse_documents("", DocumentFormat::Yaml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_yaml_document_stream() {
        let text = "name: alice\n---\n- name: bob\n- name: carol\n---\n";
        let docs = parse_documents(text, DocumentFormat::Yaml).unwrap();
        assert_eq!(
            docs,
            vec![
                json!({"name": "alice"}),
                json!({"name": "bob"}),
                json!({"name": "carol"})
            ]
        );
    }

    #[test]
    fn test_load_json_value_inline_and_file() {
        assert_eq!(
            load_json_value(r#"{"status":"active"}"#).unwrap(),
            json!({"status": "active"})
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("query.json");
        fs::write(&path, r#"{"match_all":{}}"#).unwrap();
        assert_eq!(
            load_json_value(path.to_str().unwrap()).unwrap(),
            json!({"match_all": {}})
        );
    }

    #[test]
    fn test_list_seed_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.jsonl"), "").unwrap();
        fs::write(dir.path().join("a.json"), "[]").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let files = list_seed_files(dir.path()).unwrap();
        let names: Vec<String> = files.iter().filter_map(|p| collection_name(p)).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
