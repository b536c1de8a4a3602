//! OpenAPI 3.0.3 document and Swagger UI page for the current route table.

use crate::routing::{ResponseTemplate, Route, RouteTable};
use serde_json::{json, Map, Value};

const SWAGGER_UI_VERSION: &str = "5";

pub fn document(table: &RouteTable) -> Value {
    let mut paths = Map::new();
    for route in table.routes() {
        let entry = paths
            .entry(route.pattern.openapi_path())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(methods) = entry {
            methods.insert(route.method.as_str().to_ascii_lowercase(), operation(route));
        }
    }

    let mut info = json!({
        "title": table.info.title,
        "version": table.info.version,
    });
    if let Some(description) = &table.info.description {
        info["description"] = json!(description);
    }

    json!({
        "openapi": "3.0.3",
        "info": info,
        "servers": [{ "url": table.base_path }],
        "paths": paths,
    })
}

fn operation(route: &Route) -> Value {
    let mut op = Map::new();
    op.insert("operationId".to_string(), json!(route.id));
    if let Some(summary) = &route.summary {
        op.insert("summary".to_string(), json!(summary));
    }
    if !route.tags.is_empty() {
        op.insert("tags".to_string(), json!(route.tags));
    }

    let parameters: Vec<Value> = route
        .pattern
        .param_names()
        .into_iter()
        .map(|name| {
            json!({
                "name": name,
                "in": "path",
                "required": true,
                "schema": { "type": "string" },
            })
        })
        .collect();
    if !parameters.is_empty() {
        op.insert("parameters".to_string(), Value::Array(parameters));
    }

    let mut responses = Map::new();
    for template in std::iter::once(&route.response).chain(route.cases.iter().map(|c| &c.response)) {
        responses
            .entry(template.status.to_string())
            .or_insert_with(|| response_object(template));
    }
    op.insert("responses".to_string(), Value::Object(responses));

    Value::Object(op)
}

fn response_object(template: &ResponseTemplate) -> Value {
    let mut response = json!({ "description": status_description(template.status) });
    match &template.body {
        Some(Value::String(text)) => {
            response["content"] = json!({ "text/plain": { "example": text } });
        }
        Some(body) => {
            response["content"] = json!({ "application/json": { "example": body } });
        }
        None => {}
    }
    response
}

fn status_description(status: u16) -> String {
    axum::http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Response")
        .to_string()
}

/// Swagger UI page loading `spec_url`.
pub fn swagger_html(title: &str, spec_url: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>{title}</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@{v}/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@{v}/swagger-ui-bundle.js" crossorigin></script>
  <script>
    window.onload = () => {{
      window.ui = SwaggerUIBundle({{ url: "{spec_url}", dom_id: "#swagger-ui" }});
    }};
  </script>
</body>
</html>
"##,
        title = html_escape(title),
        v = SWAGGER_UI_VERSION,
        spec_url = spec_url,
    )
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
