//! Shared building blocks for envkit.
//!
//! This crate provides the pieces every envkit backend needs:
//!
//! - [`documents`] - Loading seed documents from JSON, JSON Lines and YAML files
//! - [`interpolate`] - `${var}` interpolation with layered variable sources
//! - [`output`] - Rendering records as tables or JSON
//!
//! # Architecture
//!
//! ```text
//! envkit-core (this crate)
//!    │
//!    ├─── envkit-opensearch  (seed files, output rendering)
//!    ├─── envkit-mongodb     (seed files, output rendering)
//!    ├─── envkit-postgresql  (interpolation for seed-yaml and SQL scripts)
//!    └─── api-virtual        (variable maps)
//! ```

pub mod documents;
pub mod error;
pub mod interpolate;
pub mod output;

pub use documents::{
    collection_name, list_seed_files, load_documents, load_json_value, parse_documents,
    DocumentFormat,
};
pub use error::CoreError;
pub use interpolate::{parse_var_assignment, Variables};
pub use output::{render_records, render_value, OutputFormat, Tabular};
