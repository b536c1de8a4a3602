//! YAML configuration for virtual routes.
//!
//! A config path is either a single YAML file or a directory. Directories
//! load every `*.yaml`/`*.yml` file in sorted order: routes are concatenated,
//! `vars` are merged with later files winning, and the first file that sets
//! `info`, `base_path` or `cors` decides that setting.

use crate::error::VirtualError;
use envkit_core::DocumentFormat;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VirtualConfig {
    #[serde(default)]
    pub info: Option<ApiInfo>,
    #[serde(default)]
    pub base_path: Option<String>,
    #[serde(default)]
    pub cors: Option<bool>,
    #[serde(default)]
    pub vars: IndexMap<String, Value>,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiInfo {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Default for ApiInfo {
    fn default() -> Self {
        Self {
            title: default_title(),
            version: default_version(),
            description: None,
        }
    }
}

fn default_title() -> String {
    "api-virtual".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
    #[serde(default)]
    pub response: ResponseConfig,
    #[serde(default)]
    pub cases: Vec<CaseConfig>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl RouteConfig {
    /// Explicit id, or `METHOD path`.
    pub fn display_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.method.to_ascii_uppercase(), self.path))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseConfig {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
    /// Path relative to the config file; replaces `body` once loaded.
    #[serde(default)]
    pub body_file: Option<PathBuf>,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            status: default_status(),
            headers: IndexMap::new(),
            body: None,
            body_file: None,
        }
    }
}

fn default_status() -> u16 {
    200
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseConfig {
    #[serde(default)]
    pub when: MatchConfig,
    pub response: ResponseConfig,
}

/// Conditions on the request; every listed entry must match.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchConfig {
    #[serde(default)]
    pub params: IndexMap<String, Value>,
    #[serde(default)]
    pub query: IndexMap<String, Value>,
    #[serde(default)]
    pub headers: IndexMap<String, Value>,
    /// Top-level fields of a JSON request body.
    #[serde(default)]
    pub body: IndexMap<String, Value>,
}

impl VirtualConfig {
    /// Parse YAML text; `base_dir` anchors relative `body_file` paths.
    pub fn from_yaml(text: &str, source: &Path, base_dir: &Path) -> Result<Self, VirtualError> {
        let mut config: VirtualConfig = if text.trim().is_empty() {
            VirtualConfig::default()
        } else {
            serde_yaml::from_str(text).map_err(|source_err| VirtualError::Yaml {
                path: source.to_path_buf(),
                source: source_err,
            })?
        };

        for route in &mut config.routes {
            resolve_body_file(&mut route.response, base_dir)?;
            for case in &mut route.cases {
                resolve_body_file(&mut case.response, base_dir)?;
            }
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, VirtualError> {
        let text = std::fs::read_to_string(path).map_err(|e| VirtualError::io(path, e))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&text, path, base_dir)
    }

    /// Load a file or every YAML file in a directory.
    pub fn load(path: &Path) -> Result<Self, VirtualError> {
        let mut merged = VirtualConfig::default();
        for file in config_files(path)? {
            merged.merge(VirtualConfig::from_file(&file)?);
        }
        Ok(merged)
    }

    fn merge(&mut self, other: VirtualConfig) {
        if self.info.is_none() {
            self.info = other.info;
        }
        if self.base_path.is_none() {
            self.base_path = other.base_path;
        }
        if self.cors.is_none() {
            self.cors = other.cors;
        }
        self.vars.extend(other.vars);
        self.routes.extend(other.routes);
    }
}

/// Files making up a config path, in load order.
pub fn config_files(path: &Path) -> Result<Vec<PathBuf>, VirtualError> {
    if !path.is_dir() {
        if !path.exists() {
            return Err(VirtualError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "config path does not exist"),
            ));
        }
        return Ok(vec![path.to_path_buf()]);
    }

    let entries = std::fs::read_dir(path).map_err(|e| VirtualError::io(path, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| VirtualError::io(path, e))?;
        let file = entry.path();
        let is_yaml = file
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        if is_yaml && file.is_file() {
            files.push(file);
        }
    }

    if files.is_empty() {
        return Err(VirtualError::NoConfigFiles(path.to_path_buf()));
    }
    files.sort();
    Ok(files)
}

/// `body_file` paths referenced by the config files, resolved against each
/// file's directory. Files that do not parse are skipped.
pub fn body_files(files: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for file in files {
        let Ok(text) = std::fs::read_to_string(file) else {
            continue;
        };
        let Ok(doc) = serde_yaml::from_str::<serde_yaml::Value>(&text) else {
            continue;
        };
        let base_dir = file.parent().unwrap_or_else(|| Path::new("."));
        let routes = doc.get("routes").and_then(|r| r.as_sequence());
        for route in routes.into_iter().flatten() {
            let cases = route.get("cases").and_then(|c| c.as_sequence());
            let responses = std::iter::once(route.get("response"))
                .chain(cases.into_iter().flatten().map(|case| case.get("response")))
                .flatten();
            for response in responses {
                if let Some(relative) = response.get("body_file").and_then(|b| b.as_str()) {
                    let path = base_dir.join(relative);
                    if !found.contains(&path) {
                        found.push(path);
                    }
                }
            }
        }
    }
    found
}

fn resolve_body_file(response: &mut ResponseConfig, base_dir: &Path) -> Result<(), VirtualError> {
    let Some(relative) = response.body_file.take() else {
        return Ok(());
    };
    let path = base_dir.join(&relative);
    let text = std::fs::read_to_string(&path).map_err(|e| VirtualError::io(&path, e))?;

    let body: Value = match DocumentFormat::from_path(&path) {
        Ok(DocumentFormat::Json) => serde_json::from_str(&text).map_err(|e| VirtualError::BodyFile {
            path: path.clone(),
            source: e.into(),
        })?,
        Ok(DocumentFormat::Yaml) => serde_yaml::from_str(&text).map_err(|e| VirtualError::BodyFile {
            path: path.clone(),
            source: e.into(),
        })?,
        _ => Value::String(text),
    };
    response.body = Some(body);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_route_defaults() {
        let config = VirtualConfig::from_yaml(
            "routes:\n  - path: /ping\n",
            Path::new("inline.yaml"),
            Path::new("."),
        )
        .unwrap();
        let route = &config.routes[0];
        assert_eq!(route.method, "GET");
        assert_eq!(route.response.status, 200);
        assert_eq!(route.display_id(), "GET /ping");
        assert!(route.response.body.is_none());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = VirtualConfig::from_yaml(
            "routes:\n  - path: /ping\n    reponse: {}\n",
            Path::new("bad.yaml"),
            Path::new("."),
        )
        .unwrap_err();
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn test_body_file_formats() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("order.json"), r#"{"id": 7}"#).unwrap();
        std::fs::write(dir.path().join("list.yaml"), "- a\n- b\n").unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hello").unwrap();
        std::fs::write(
            dir.path().join("api.yaml"),
            r#"
routes:
  - path: /order
    response: { body_file: order.json }
  - path: /list
    response: { body_file: list.yaml }
  - path: /hello
    response: { body_file: hello.txt }
"#,
        )
        .unwrap();

        let config = VirtualConfig::load(&dir.path().join("api.yaml")).unwrap();
        assert_eq!(config.routes[0].response.body, Some(json!({"id": 7})));
        assert_eq!(config.routes[1].response.body, Some(json!(["a", "b"])));
        assert_eq!(config.routes[2].response.body, Some(json!("hello")));
        assert!(config.routes[0].response.body_file.is_none());
    }

    #[test]
    fn test_body_files_listed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.yaml");
        std::fs::write(
            &path,
            r#"
routes:
  - path: /orders
    response: { body_file: bodies/orders.json }
    cases:
      - when: { query: { empty: "1" } }
        response: { body_file: bodies/empty.json }
  - path: /health
    response: { body: ok }
"#,
        )
        .unwrap();

        assert_eq!(
            body_files(&[path]),
            vec![
                dir.path().join("bodies/orders.json"),
                dir.path().join("bodies/empty.json")
            ]
        );
    }

    #[test]
    fn test_directory_merge() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("01-base.yaml"),
            "info: { title: First }\nvars: { region: eu, tier: free }\nroutes:\n  - path: /a\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("02-more.yml"),
            "info: { title: Second }\nbase_path: /api\nvars: { tier: pro }\nroutes:\n  - path: /b\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let config = VirtualConfig::load(dir.path()).unwrap();
        assert_eq!(config.info.unwrap().title, "First");
        assert_eq!(config.base_path.as_deref(), Some("/api"));
        assert_eq!(config.vars["tier"], json!("pro"));
        assert_eq!(config.vars["region"], json!("eu"));
        let paths: Vec<&str> = config.routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/a", "/b"]);
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            config_files(dir.path()),
            Err(VirtualError::NoConfigFiles(_))
        ));
    }
}
