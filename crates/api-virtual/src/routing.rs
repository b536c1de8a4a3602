//! Route table: path patterns, specificity ordering and case matching.

use crate::config::{ApiInfo, MatchConfig, ResponseConfig, RouteConfig, VirtualConfig};
use crate::error::VirtualError;
use crate::template::{stringify, RequestContext};
use axum::http::Method;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Param name under which a trailing `*` captures the rest of the path.
pub const WILDCARD_PARAM: &str = "wildcard";

const METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
}

/// A parsed route path such as `/orders/{id}/items/*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(path: &str) -> Result<Self, String> {
        if path.is_empty() {
            return Err("path is empty".to_string());
        }
        if !path.starts_with('/') {
            return Err(format!("path '{path}' must start with '/'"));
        }

        let parts: Vec<&str> = split_path(path).collect();
        let mut segments = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            let segment = if *part == "*" {
                if i + 1 != parts.len() {
                    return Err(format!("'*' is only allowed as the last segment of '{path}'"));
                }
                Segment::Wildcard
            } else if let Some(name) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                param_segment(name, path)?
            } else if let Some(name) = part.strip_prefix(':') {
                param_segment(name, path)?
            } else {
                Segment::Literal(part.to_string())
            };
            segments.push(segment);
        }
        Ok(Self { segments })
    }

    /// Prepend a base path such as `/api`.
    fn prefixed(&self, base: &PathPattern) -> PathPattern {
        let mut segments = base.segments.clone();
        segments.extend(self.segments.iter().cloned());
        PathPattern { segments }
    }

    /// Captured params when `path` matches.
    pub fn matches(&self, path: &str) -> Option<IndexMap<String, String>> {
        let parts: Vec<&str> = split_path(path).collect();
        let mut params = IndexMap::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Wildcard => {
                    params.insert(WILDCARD_PARAM.to_string(), parts[i.min(parts.len())..].join("/"));
                    return Some(params);
                }
                Segment::Literal(lit) => {
                    if parts.get(i) != Some(&lit.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(i)?;
                    params.insert(name.clone(), (*value).to_string());
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }

    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    pub fn wildcard_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Wildcard))
            .count()
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(name) => Some(name.as_str()),
                Segment::Wildcard => Some(WILDCARD_PARAM),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Path with parameter names erased; equal shapes match the same requests.
    fn shape(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(lit) => format!("/{lit}"),
                Segment::Param(_) => "/{}".to_string(),
                Segment::Wildcard => "/*".to_string(),
            })
            .collect()
    }

    /// OpenAPI form: `{param}` segments, wildcard as `{wildcard}`.
    pub fn openapi_path(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(lit) => format!("/{lit}"),
                Segment::Param(name) => format!("/{{{name}}}"),
                Segment::Wildcard => format!("/{{{WILDCARD_PARAM}}}"),
            })
            .collect()
    }
}

fn param_segment(name: &str, path: &str) -> Result<Segment, String> {
    if name.is_empty() {
        return Err(format!("empty parameter name in '{path}'"));
    }
    Ok(Segment::Param(name.to_string()))
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// A response as configured (body and headers still templated).
#[derive(Debug, Clone)]
pub struct ResponseTemplate {
    pub status: u16,
    pub headers: IndexMap<String, String>,
    pub body: Option<Value>,
}

impl From<&ResponseConfig> for ResponseTemplate {
    fn from(config: &ResponseConfig) -> Self {
        Self {
            status: config.status,
            headers: config.headers.clone(),
            body: config.body.clone(),
        }
    }
}

/// A conditional response.
#[derive(Debug, Clone)]
pub struct Case {
    pub when: MatchConfig,
    pub response: ResponseTemplate,
}

impl Case {
    pub fn matches(&self, ctx: &RequestContext) -> bool {
        let text_matches = |expected: &IndexMap<String, Value>, actual: &IndexMap<String, String>| {
            expected
                .iter()
                .all(|(k, v)| actual.get(k).is_some_and(|a| *a == stringify(v)))
        };

        let headers_match = self.when.headers.iter().all(|(k, v)| {
            ctx.headers
                .get(&k.to_ascii_lowercase())
                .is_some_and(|a| *a == stringify(v))
        });

        let body_matches = self.when.body.iter().all(|(k, expected)| {
            match ctx.body.as_ref().and_then(|b| b.get(k)) {
                Some(actual) => actual == expected || stringify(actual) == stringify(expected),
                None => false,
            }
        });

        text_matches(&self.when.params, &ctx.params)
            && text_matches(&self.when.query, &ctx.query)
            && headers_match
            && body_matches
    }
}

/// One servable route.
#[derive(Debug)]
pub struct Route {
    pub id: String,
    pub method: Method,
    /// Path as written in the config, without `base_path`.
    pub path: String,
    pub pattern: PathPattern,
    full_pattern: PathPattern,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub delay: Option<Duration>,
    pub response: ResponseTemplate,
    pub cases: Vec<Case>,
    hits: AtomicU64,
}

impl Route {
    fn from_config(config: &RouteConfig, base: &PathPattern) -> Result<Self, VirtualError> {
        let id = config.display_id();
        let method = parse_method(&config.method).map_err(|reason| VirtualError::invalid(&id, reason))?;
        let pattern = PathPattern::parse(&config.path).map_err(|reason| VirtualError::invalid(&id, reason))?;

        for status in std::iter::once(config.response.status)
            .chain(config.cases.iter().map(|c| c.response.status))
        {
            if !(100..=599).contains(&status) {
                return Err(VirtualError::invalid(
                    &id,
                    format!("status {status} is outside 100..=599"),
                ));
            }
        }

        Ok(Self {
            full_pattern: pattern.prefixed(base),
            id,
            method,
            path: config.path.clone(),
            pattern,
            summary: config.summary.clone(),
            tags: config.tags.clone(),
            delay: config.delay_ms.filter(|ms| *ms > 0).map(Duration::from_millis),
            response: ResponseTemplate::from(&config.response),
            cases: config
                .cases
                .iter()
                .map(|c| Case {
                    when: c.when.clone(),
                    response: ResponseTemplate::from(&c.response),
                })
                .collect(),
            hits: AtomicU64::new(0),
        })
    }

    /// First matching case, else the default response.
    pub fn select_response(&self, ctx: &RequestContext) -> &ResponseTemplate {
        self.cases
            .iter()
            .find(|case| case.matches(ctx))
            .map(|case| &case.response)
            .unwrap_or(&self.response)
    }

    pub fn record_hit(&self) -> u64 {
        self.hits.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

fn parse_method(raw: &str) -> Result<Method, String> {
    let upper = raw.trim().to_ascii_uppercase();
    if !METHODS.contains(&upper.as_str()) {
        return Err(format!("unsupported method '{raw}'"));
    }
    Method::from_bytes(upper.as_bytes()).map_err(|e| e.to_string())
}

/// Outcome of resolving a request against the table.
#[derive(Debug)]
pub enum Resolution<'a> {
    Matched {
        route: &'a Route,
        params: IndexMap<String, String>,
    },
    MethodNotAllowed {
        allow: Vec<Method>,
    },
    NotFound,
}

/// Validated, immutable set of routes.
#[derive(Debug)]
pub struct RouteTable {
    pub info: ApiInfo,
    pub base_path: String,
    pub cors: bool,
    pub vars: Map<String, Value>,
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn from_config(config: &VirtualConfig) -> Result<Self, VirtualError> {
        let base_path = normalize_base_path(config.base_path.as_deref());
        let base = PathPattern::parse(&base_path)
            .map_err(|reason| VirtualError::invalid("base_path", reason))?;

        let mut seen = HashSet::new();
        let mut routes = Vec::with_capacity(config.routes.len());
        for route_config in &config.routes {
            let route = Route::from_config(route_config, &base)?;
            let key = (route.method.clone(), route.pattern.shape());
            if !seen.insert(key) {
                return Err(VirtualError::invalid(
                    &route.id,
                    format!("duplicate route {} {}", route.method, route.path),
                ));
            }
            routes.push(route);
        }

        Ok(Self {
            info: config.info.clone().unwrap_or_default(),
            base_path,
            cors: config.cors.unwrap_or(false),
            vars: config.vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            routes,
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Pick the most specific route for `method` and `path`.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let candidates: Vec<(usize, &Route, IndexMap<String, String>)> = self
            .routes
            .iter()
            .enumerate()
            .filter_map(|(i, route)| route.full_pattern.matches(path).map(|p| (i, route, p)))
            .collect();

        if candidates.is_empty() {
            return Resolution::NotFound;
        }

        let best = |wanted: &Method| {
            candidates
                .iter()
                .filter(|(_, route, _)| route.method == *wanted)
                .min_by_key(|(i, route, _)| {
                    (
                        std::cmp::Reverse(route.full_pattern.literal_count()),
                        route.full_pattern.wildcard_count(),
                        *i,
                    )
                })
        };

        let found = best(method).or_else(|| (*method == Method::HEAD).then(|| best(&Method::GET)).flatten());
        if let Some((_, route, params)) = found {
            return Resolution::Matched {
                route: *route,
                params: params.clone(),
            };
        }

        let mut allow: Vec<Method> = Vec::new();
        for (_, route, _) in &candidates {
            if !allow.contains(&route.method) {
                allow.push(route.method.clone());
            }
        }
        if allow.contains(&Method::GET) && !allow.contains(&Method::HEAD) {
            allow.push(Method::HEAD);
        }
        Resolution::MethodNotAllowed { allow }
    }
}

fn normalize_base_path(base: Option<&str>) -> String {
    match base.map(|b| b.trim().trim_end_matches('/')) {
        None | Some("") => "/".to_string(),
        Some(b) if b.starts_with('/') => b.to_string(),
        Some(b) => format!("/{b}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn table(yaml: &str) -> Result<RouteTable, VirtualError> {
        let config = VirtualConfig::from_yaml(yaml, Path::new("test.yaml"), Path::new(".")).unwrap();
        RouteTable::from_config(&config)
    }

    fn matched_id(resolution: Resolution<'_>) -> String {
        match resolution {
            Resolution::Matched { route, .. } => route.id.clone(),
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_pattern_matching() {
        let pattern = PathPattern::parse("/orders/{id}/items/:item").unwrap();
        let params = pattern.matches("/orders/7/items/3").unwrap();
        assert_eq!(params["id"], "7");
        assert_eq!(params["item"], "3");
        assert!(pattern.matches("/orders/7/items").is_none());
        assert!(pattern.matches("/orders/7/items/3/extra").is_none());
        assert_eq!(pattern.openapi_path(), "/orders/{id}/items/{item}");
    }

    #[test]
    fn test_wildcard() {
        let pattern = PathPattern::parse("/files/*").unwrap();
        assert_eq!(pattern.matches("/files/a/b.txt").unwrap()[WILDCARD_PARAM], "a/b.txt");
        assert_eq!(pattern.matches("/files").unwrap()[WILDCARD_PARAM], "");
        assert!(PathPattern::parse("/files/*/x").is_err());
    }

    #[test]
    fn test_invalid_paths() {
        assert!(PathPattern::parse("").is_err());
        assert!(PathPattern::parse("orders").is_err());
        assert!(PathPattern::parse("/orders/{}").is_err());
    }

    #[test]
    fn test_specificity() {
        let table = table(
            r#"
routes:
  - { id: any, path: "/orders/*" }
  - { id: by-id, path: "/orders/{id}" }
  - { id: latest, path: /orders/latest }
  - { id: by-id-again, path: "/orders/:other", method: post }
"#,
        )
        .unwrap();
        assert_eq!(matched_id(table.resolve(&Method::GET, "/orders/latest")), "latest");
        assert_eq!(matched_id(table.resolve(&Method::GET, "/orders/9")), "by-id");
        assert_eq!(matched_id(table.resolve(&Method::GET, "/orders/9/lines")), "any");
        assert_eq!(matched_id(table.resolve(&Method::HEAD, "/orders/9")), "by-id");
    }

    #[test]
    fn test_method_not_allowed_and_not_found() {
        let table = table("routes:\n  - { path: /things, method: post }\n").unwrap();
        match table.resolve(&Method::GET, "/things") {
            Resolution::MethodNotAllowed { allow } => assert_eq!(allow, vec![Method::POST]),
            other => panic!("expected 405, got {other:?}"),
        }
        assert!(matches!(table.resolve(&Method::GET, "/other"), Resolution::NotFound));
    }

    #[test]
    fn test_base_path() {
        let table = table("base_path: /api/\nroutes:\n  - { id: ping, path: /ping }\n").unwrap();
        assert_eq!(table.base_path, "/api");
        assert_eq!(matched_id(table.resolve(&Method::GET, "/api/ping")), "ping");
        assert!(matches!(table.resolve(&Method::GET, "/ping"), Resolution::NotFound));
    }

    #[test]
    fn test_validation_errors() {
        let duplicate = table("routes:\n  - { path: \"/a/{x}\" }\n  - { id: second, path: \"/a/:y\" }\n");
        assert!(matches!(duplicate, Err(VirtualError::InvalidConfig { route, .. }) if route == "second"));

        let method = table("routes:\n  - { path: /a, method: TRACE }\n");
        assert!(matches!(method, Err(VirtualError::InvalidConfig { route, .. }) if route == "TRACE /a"));

        let status = table("routes:\n  - { id: s, path: /a, response: { status: 700 } }\n");
        assert!(matches!(status, Err(VirtualError::InvalidConfig { reason, .. }) if reason.contains("700")));

        let relative = table("routes:\n  - { id: r, path: a }\n");
        assert!(matches!(relative, Err(VirtualError::InvalidConfig { route, .. }) if route == "r"));
    }

    #[test]
    fn test_case_selection() {
        let table = table(
            r#"
routes:
  - path: "/orders/{id}"
    method: post
    response: { status: 200 }
    cases:
      - when: { params: { id: 404 } }
        response: { status: 404 }
      - when: { headers: { X-Mode: slow }, body: { express: true } }
        response: { status: 202 }
"#,
        )
        .unwrap();
        let route = &table.routes()[0];

        let mut ctx = RequestContext::default();
        ctx.params.insert("id".to_string(), "404".to_string());
        assert_eq!(route.select_response(&ctx).status, 404);

        ctx.params.insert("id".to_string(), "1".to_string());
        ctx.headers.insert("x-mode".to_string(), "slow".to_string());
        assert_eq!(route.select_response(&ctx).status, 200);

        ctx.body = Some(serde_json::json!({"express": true}));
        assert_eq!(route.select_response(&ctx).status, 202);
    }
}
