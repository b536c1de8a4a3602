//! `{{ expr }}` templates in response bodies and headers.
//!
//! | Expression      | Value                                      |
//! |-----------------|--------------------------------------------|
//! | `params.X`      | path parameter                             |
//! | `query.X`       | query string parameter                     |
//! | `headers.X`     | request header (lower-case name)           |
//! | `body`          | whole request body                         |
//! | `body.a.0.b`    | field path into a JSON request body        |
//! | `vars.X`        | config `vars` entry                        |
//! | `env.X`         | process environment variable               |
//! | `now`           | current time, RFC 3339 UTC                 |
//! | `timestamp`     | current time, unix milliseconds            |
//! | `uuid`          | random v4 UUID                             |
//! | `method`/`path` | request method and path                    |
//!
//! A string that is exactly one token takes the resolved value's JSON type.
//! Anything unresolved renders as an empty string, or `null` as a whole token.

use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Everything a template can see about the current request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub method: String,
    pub path: String,
    pub params: IndexMap<String, String>,
    pub query: IndexMap<String, String>,
    /// Keyed by lower-case header name.
    pub headers: IndexMap<String, String>,
    /// Parsed JSON body, or the raw text as a string.
    pub body: Option<Value>,
    pub vars: Map<String, Value>,
}

impl RequestContext {
    /// Parse a request body: JSON when it parses, otherwise text.
    pub fn parse_body(bytes: &[u8]) -> Option<Value> {
        if bytes.is_empty() {
            return None;
        }
        match serde_json::from_slice(bytes) {
            Ok(value) => Some(value),
            Err(_) => Some(Value::String(String::from_utf8_lossy(bytes).into_owned())),
        }
    }

    /// Resolve one expression, e.g. `params.id`.
    pub fn lookup(&self, expr: &str) -> Option<Value> {
        let expr = expr.trim();
        match expr {
            "now" => return Some(Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))),
            "timestamp" => return Some(Value::from(Utc::now().timestamp_millis())),
            "uuid" => return Some(Value::String(uuid::Uuid::new_v4().to_string())),
            "method" => return Some(Value::String(self.method.clone())),
            "path" => return Some(Value::String(self.path.clone())),
            "body" => return self.body.clone(),
            _ => {}
        }

        let (scope, rest) = expr.split_once('.')?;
        match scope {
            "params" => self.params.get(rest).cloned().map(Value::String),
            "query" => self.query.get(rest).cloned().map(Value::String),
            "headers" => self
                .headers
                .get(&rest.to_ascii_lowercase())
                .cloned()
                .map(Value::String),
            "vars" => self.vars.get(rest).cloned(),
            "env" => std::env::var(rest).ok().map(Value::String),
            "body" => self.body.as_ref().and_then(|b| walk(b, rest)).cloned(),
            _ => None,
        }
    }
}

/// Follow a dotted path through objects and arrays.
fn walk<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Render every string inside `template`.
pub fn render_value(template: &Value, ctx: &RequestContext) -> Value {
    match template {
        Value::String(s) => render_string(s, ctx),
        Value::Array(items) => Value::Array(items.iter().map(|v| render_value(v, ctx)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_value(v, ctx)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Render one string; a lone token keeps its value's type.
pub fn render_string(template: &str, ctx: &RequestContext) -> Value {
    if let Some(expr) = whole_token(template) {
        return ctx.lookup(expr).unwrap_or(Value::Null);
    }
    Value::String(render_text(template, ctx))
}

/// Render to text, e.g. for header values.
pub fn render_text(template: &str, ctx: &RequestContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);
        let expr = &rest[start + 2..start + 2 + len];
        if let Some(value) = ctx.lookup(expr) {
            out.push_str(&stringify(&value));
        }
        rest = &rest[start + 2 + len + 2..];
    }

    out.push_str(rest);
    out
}

/// Text form of a value: strings bare, `null` empty, the rest as JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn whole_token(template: &str) -> Option<&str> {
    let inner = template.trim().strip_prefix("{{")?.strip_suffix("}}")?;
    (!inner.contains("{{") && !inner.contains("}}")).then_some(inner)
}
