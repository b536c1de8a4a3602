//! HTTP server: virtual routes, admin endpoints and OpenAPI docs.

use crate::args::ServeArgs;
use crate::error::VirtualError;
use crate::openapi;
use crate::reload::{spawn_watcher, ConfigSource};
use crate::routing::{Resolution, ResponseTemplate, RouteTable};
use crate::template::{render_text, render_value, RequestContext};
use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::header::{ALLOW, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Prefix for the server's own endpoints.
pub const ADMIN_PREFIX: &str = "/__virtual";

/// Shared server state; the route table is swapped whole on reload.
pub struct AppState {
    source: ConfigSource,
    table: RwLock<Arc<RouteTable>>,
    cors: bool,
    started: Instant,
}

impl AppState {
    pub fn new(source: ConfigSource, table: RouteTable) -> Self {
        Self {
            source,
            cors: table.cors,
            table: RwLock::new(Arc::new(table)),
            started: Instant::now(),
        }
    }

    /// Load the initial table from `source`.
    pub fn load(source: ConfigSource) -> Result<Self, VirtualError> {
        let table = source.load()?;
        Ok(Self::new(source, table))
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    pub async fn table(&self) -> Arc<RouteTable> {
        self.table.read().await.clone()
    }

    /// Reload from the source; on error the current table stays in place.
    pub async fn reload(&self) -> Result<usize, VirtualError> {
        let table = self.source.load()?;
        let count = table.len();
        *self.table.write().await = Arc::new(table);
        Ok(count)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = state.cors;
    let router = Router::new()
        .route(&format!("{ADMIN_PREFIX}/health"), get(health))
        .route(&format!("{ADMIN_PREFIX}/routes"), get(list_routes))
        .route(&format!("{ADMIN_PREFIX}/reload"), post(reload))
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(docs))
        .fallback(virtual_route)
        .with_state(state);

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<(), VirtualError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(VirtualError::Serve)
}

/// `api-virtual serve`: bind, optionally watch, serve until Ctrl-C.
pub async fn run(args: &ServeArgs) -> Result<(), VirtualError> {
    let state = Arc::new(AppState::load(ConfigSource::new(&args.config))?);
    let route_count = state.table().await.len();

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| VirtualError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!("Serving {} virtual routes on http://{}", route_count, addr);
    info!("OpenAPI docs at http://{}/docs", addr);

    let watcher = args.watch.then(|| {
        spawn_watcher(
            state.clone(),
            Duration::from_millis(args.poll_interval_ms.max(50)),
        )
    });

    let result = serve(listener, state, shutdown_signal()).await;
    if let Some(watcher) = watcher {
        watcher.abort();
    }
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down api-virtual");
}

/// One record per route, as listed by `/__virtual/routes` and `validate`.
pub fn route_records(table: &RouteTable) -> Vec<Value> {
    table
        .routes()
        .iter()
        .map(|route| {
            json!({
                "id": route.id,
                "method": route.method.as_str(),
                "path": route.path,
                "cases": route.cases.len(),
                "hits": route.hits(),
            })
        })
        .collect()
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let table = state.table().await;
    Json(json!({
        "status": "ok",
        "routes": table.len(),
        "uptime_secs": state.started.elapsed().as_secs(),
    }))
}

async fn list_routes(State(state): State<Arc<AppState>>) -> Json<Value> {
    let table = state.table().await;
    Json(json!({
        "base_path": table.base_path,
        "routes": route_records(&table),
    }))
}

async fn reload(State(state): State<Arc<AppState>>) -> Response {
    match state.reload().await {
        Ok(count) => {
            info!("Reloaded {} virtual routes on request", count);
            Json(json!({ "reloaded": true, "routes": count })).into_response()
        }
        Err(e) => {
            warn!("Forced reload failed: {}", e);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "reloaded": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn openapi_json(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(openapi::document(&*state.table().await))
}

async fn docs(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(openapi::swagger_html(&state.table().await.info.title, "/openapi.json"))
}

async fn virtual_route(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    Query(query): Query<IndexMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let table = state.table().await;
    let path = uri.path().to_string();

    let (route, params) = match table.resolve(&method, &path) {
        Resolution::Matched { route, params } => (route, params),
        Resolution::MethodNotAllowed { allow } => {
            info!("{} {} -> 405", method, path);
            let allow = allow.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
            let mut response = (
                StatusCode::METHOD_NOT_ALLOWED,
                Json(json!({ "error": "method not allowed", "method": method.as_str(), "path": path })),
            )
                .into_response();
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(ALLOW, value);
            }
            return response;
        }
        Resolution::NotFound => {
            info!("{} {} -> 404 (no route)", method, path);
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "no virtual route", "method": method.as_str(), "path": path })),
            )
                .into_response();
        }
    };

    route.record_hit();

    let ctx = RequestContext {
        method: method.to_string(),
        path: path.clone(),
        params,
        query,
        headers: headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect(),
        body: RequestContext::parse_body(&body),
        vars: table.vars.clone(),
    };

    if let Some(delay) = route.delay {
        tokio::time::sleep(delay).await;
    }

    let template = route.select_response(&ctx);
    let response = build_response(template, &ctx);
    info!("{} {} -> {} [{}]", method, path, response.status().as_u16(), route.id);
    response
}

fn build_response(template: &ResponseTemplate, ctx: &RequestContext) -> Response {
    let status = StatusCode::from_u16(template.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let (content_type, bytes) = match template.body.as_ref().map(|b| render_value(b, ctx)) {
        None => (None, Vec::new()),
        Some(Value::String(text)) => (Some("text/plain; charset=utf-8"), text.into_bytes()),
        Some(value) => (Some("application/json"), serde_json::to_vec(&value).unwrap_or_default()),
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;

    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }

    for (name, value) in &template.headers {
        let rendered = render_text(value, ctx);
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&rendered),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => warn!("Skipping invalid response header '{}: {}'", name, rendered),
        }
    }

    response
}
