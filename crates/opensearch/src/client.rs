//! REST client for OpenSearch.

use crate::args::OpenSearchArgs;
use crate::bulk::{build_bulk_body, parse_bulk_response, BulkOptions, BulkReport};
use crate::error::OpenSearchError;
use crate::search::{search_body, SearchResult};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

enum Payload {
    Json(Value),
    NdJson(String),
}

/// OpenSearch REST client.
#[derive(Clone, Debug)]
pub struct OpenSearchClient {
    http: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl OpenSearchClient {
    /// Create a client for `base_url` with default settings.
    pub fn new(base_url: &str) -> Result<Self, OpenSearchError> {
        Self::build(base_url, false, Duration::from_secs(30))
    }

    /// Create a client from CLI connection arguments.
    pub fn from_args(args: &OpenSearchArgs) -> Result<Self, OpenSearchError> {
        let mut client = Self::build(
            &args.url,
            args.insecure,
            Duration::from_secs(args.timeout_secs),
        )?;
        if let Some(username) = &args.username {
            client = client.with_basic_auth(username, args.password.as_deref());
        }
        Ok(client)
    }

    fn build(base_url: &str, insecure: bool, timeout: Duration) -> Result<Self, OpenSearchError> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(OpenSearchError::Config(format!(
                "OpenSearch URL must start with http:// or https://, got '{base_url}'"
            )));
        }

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: None,
            password: None,
        })
    }

    /// Authenticate every request with HTTP basic auth.
    pub fn with_basic_auth(mut self, username: &str, password: Option<&str>) -> Self {
        self.username = Some(username.to_string());
        self.password = password.map(|p| p.to_string());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http.request(method, url);
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_ref()),
            None => builder,
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Option<Payload>,
    ) -> Result<reqwest::Response, OpenSearchError> {
        debug!("{} {}", method, path);
        let mut builder = self.request(method.clone(), path);
        builder = match payload {
            Some(Payload::Json(body)) => builder.json(&body),
            Some(Payload::NdJson(body)) => builder
                .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
                .body(body),
            None => builder,
        };
        Ok(builder.send().await?)
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        payload: Option<Payload>,
    ) -> Result<Value, OpenSearchError> {
        let response = self.send(method.clone(), path, payload).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(method, path, response).await);
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// `GET /_cluster/health`.
    pub async fn health(&self) -> Result<Value, OpenSearchError> {
        self.send_json(Method::GET, "/_cluster/health", None).await
    }

    /// List indices matching `pattern` (all indices when `None`), sorted by name.
    pub async fn list_indices(&self, pattern: Option<&str>) -> Result<Vec<Value>, OpenSearchError> {
        let path = match pattern {
            Some(p) => format!("/_cat/indices/{p}?format=json"),
            None => "/_cat/indices?format=json".to_string(),
        };
        let response = self.send_json(Method::GET, &path, None).await?;
        let mut indices = match response {
            Value::Array(items) => items,
            _ => {
                return Err(OpenSearchError::UnexpectedResponse {
                    path,
                    reason: "expected a JSON array".to_string(),
                })
            }
        };
        indices.sort_by(|a, b| {
            let name = |v: &Value| v.get("index").and_then(Value::as_str).unwrap_or("").to_string();
            name(a).cmp(&name(b))
        });
        Ok(indices)
    }

    /// Create an index, optionally with a settings/mappings body.
    pub async fn create_index(
        &self,
        name: &str,
        body: Option<&Value>,
    ) -> Result<Value, OpenSearchError> {
        info!("Creating index '{}'", name);
        self.send_json(
            Method::PUT,
            &format!("/{name}"),
            body.cloned().map(Payload::Json),
        )
        .await
    }

    /// Delete an index. Returns `Ok(false)` for a missing index when `ignore_missing`.
    pub async fn delete_index(
        &self,
        name: &str,
        ignore_missing: bool,
    ) -> Result<bool, OpenSearchError> {
        let path = format!("/{name}");
        let response = self.send(Method::DELETE, &path, None).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND && ignore_missing {
            debug!("Index '{}' does not exist, nothing to delete", name);
            return Ok(false);
        }
        if !status.is_success() {
            return Err(status_error(Method::DELETE, &path, response).await);
        }
        info!("Deleted index '{}'", name);
        Ok(true)
    }

    /// `HEAD /{name}`.
    pub async fn index_exists(&self, name: &str) -> Result<bool, OpenSearchError> {
        let path = format!("/{name}");
        let response = self.send(Method::HEAD, &path, None).await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(status_error(Method::HEAD, &path, response).await),
        }
    }

    /// `POST /{name}/_refresh`.
    pub async fn refresh(&self, name: &str) -> Result<(), OpenSearchError> {
        self.send_json(Method::POST, &format!("/{name}/_refresh"), None)
            .await?;
        Ok(())
    }

    /// Index `docs` into `index` through `_bulk`, in batches.
    pub async fn bulk_index(
        &self,
        index: &str,
        docs: &[Value],
        options: &BulkOptions,
    ) -> Result<BulkReport, OpenSearchError> {
        let batch_size = options.batch_size.max(1);
        let batch_count = docs.len().div_ceil(batch_size);
        let mut report = BulkReport::default();

        info!(
            "Indexing {} documents into '{}' (batch size: {})",
            docs.len(),
            index,
            batch_size
        );

        for (batch_idx, chunk) in docs.chunks(batch_size).enumerate() {
            let body = build_bulk_body(
                index,
                chunk,
                batch_idx * batch_size,
                options.id_field.as_deref(),
            )?;

            let last = batch_idx + 1 == batch_count;
            let path = if last && options.refresh {
                "/_bulk?refresh=true"
            } else {
                "/_bulk"
            };

            let response = self
                .send_json(Method::POST, path, Some(Payload::NdJson(body)))
                .await?;
            let batch_report = parse_bulk_response(&response)?;

            debug!(
                "Batch {} complete: {} indexed, {} failed",
                batch_idx + 1,
                batch_report.indexed,
                batch_report.failed
            );
            report.merge(batch_report);
        }

        info!(
            "Bulk load into '{}' complete: {} indexed, {} failed",
            index, report.indexed, report.failed
        );
        Ok(report)
    }

    /// Search `index` with a DSL query (or `match_all`).
    pub async fn search(
        &self,
        index: &str,
        query: Option<&Value>,
        size: Option<usize>,
    ) -> Result<SearchResult, OpenSearchError> {
        let path = format!("/{index}/_search");
        let body = search_body(query, size);
        debug!("Search body: {}", body);
        let response = self
            .send_json(Method::POST, &path, Some(Payload::Json(body)))
            .await?;
        SearchResult::from_response(&path, &response)
    }

    /// Count documents in `index` matching an optional query clause.
    pub async fn count(&self, index: &str, query: Option<&Value>) -> Result<u64, OpenSearchError> {
        let path = format!("/{index}/_count");
        let payload = query.map(|q| Payload::Json(search_body(Some(q), None)));
        let response = self.send_json(Method::POST, &path, payload).await?;
        response
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| OpenSearchError::UnexpectedResponse {
                path,
                reason: "missing 'count'".to_string(),
            })
    }
}

async fn status_error(method: Method, path: &str, response: reqwest::Response) -> OpenSearchError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    OpenSearchError::Status {
        status,
        method: method.to_string(),
        path: path.to_string(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OpenSearchClient::new("http://localhost:9200/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:9200");
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(matches!(
            OpenSearchClient::new("localhost:9200"),
            Err(OpenSearchError::Config(_))
        ));
    }

    #[test]
    fn test_from_args_with_auth() {
        let args = OpenSearchArgs {
            url: "https://search.local:9200".to_string(),
            username: Some("admin".to_string()),
            password: Some("admin".to_string()),
            insecure: true,
            timeout_secs: 5,
        };
        let client = OpenSearchClient::from_args(&args).unwrap();
        assert_eq!(client.username.as_deref(), Some("admin"));
        assert_eq!(client.password.as_deref(), Some("admin"));
    }
}
