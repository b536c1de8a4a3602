//! Declarative seed-yaml documents compiled into ordered SQL.

mod compile;
mod document;
mod plan;

pub use compile::compile;
pub use document::{DatabaseSeed, RowSeed, SeedDocument, TableSeed, DEFAULT_SCOPE};
pub use plan::{DatabaseScript, SeedPlan, SeedReport, Statement};

use crate::error::SeedError;
use envkit_core::Variables;
use std::path::Path;

/// Load `path` and compile it in one step.
pub fn compile_file(
    path: &Path,
    overrides: &Variables,
    only: Option<&str>,
) -> Result<SeedPlan, SeedError> {
    let doc = SeedDocument::from_file(path)?;
    tracing::debug!("Loaded seed document {:?} ({} tables)", path, doc.table_count());
    compile(&doc, overrides, only)
}
