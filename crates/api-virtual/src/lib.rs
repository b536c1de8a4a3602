//! Virtual API server driven by YAML route definitions.
//!
//! ```yaml
//! info: { title: Orders API, version: 1.0.0 }
//! base_path: /api
//! routes:
//!   - id: get-order
//!     path: /orders/{id}
//!     response:
//!       body: { id: "{{params.id}}", fetched_at: "{{now}}" }
//!     cases:
//!       - when: { params: { id: "404" } }
//!         response: { status: 404, body: { error: not found } }
//! ```
//!
//! Besides the configured routes the server exposes `/openapi.json`, a
//! Swagger UI at `/docs`, and admin endpoints under `/__virtual`
//! (`health`, `routes`, `reload`).

pub mod args;
pub mod config;
mod error;
pub mod openapi;
pub mod reload;
pub mod routing;
pub mod server;
pub mod template;

pub use args::{ConfigArgs, ServeArgs, VirtualCommand};
pub use config::VirtualConfig;
pub use error::VirtualError;
pub use reload::ConfigSource;
pub use routing::RouteTable;
pub use server::{route_records, router, serve, AppState};
