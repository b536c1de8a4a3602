//! SQL executors.
//!
//! Two implementations share the [`SqlExecutor`] trait:
//!
//! - [`PsqlExecutor`] shells out to the `psql` CLI (the default, and what
//!   most test environments already have installed)
//! - [`NativeExecutor`] talks to the server with `tokio-postgres`

mod native;
mod psql;

use crate::connection::PgConnection;
use crate::error::PostgresError;
use async_trait::async_trait;
use clap::ValueEnum;
use envkit_core::Tabular;

pub use native::NativeExecutor;
pub use psql::{parse_unaligned, PsqlExecutor};

/// Rows returned by a query, every value as text (SQL NULL is empty).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_tabular(&self) -> Tabular {
        Tabular {
            columns: self.columns.clone(),
            rows: self.rows.clone(),
        }
    }
}

/// Runs SQL against one database.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Run a script of one or more statements, stopping at the first error.
    async fn execute_script(&self, sql: &str) -> Result<(), PostgresError>;

    /// Run a single query and collect its rows.
    async fn query(&self, sql: &str) -> Result<QueryResult, PostgresError>;

    /// Connection this executor targets.
    fn connection(&self) -> &PgConnection;
}

/// Executor selected with `--executor`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ExecutorKind {
    /// Shell out to psql
    #[default]
    Psql,
    /// Use the tokio-postgres driver
    Native,
}

/// Opens executors for a connection, e.g. once per seed database scope.
#[derive(Debug, Clone)]
pub struct ExecutorFactory {
    kind: ExecutorKind,
    psql_path: String,
}

impl ExecutorFactory {
    pub fn new(kind: ExecutorKind, psql_path: impl Into<String>) -> Self {
        Self {
            kind,
            psql_path: psql_path.into(),
        }
    }

    pub fn kind(&self) -> ExecutorKind {
        self.kind
    }

    pub async fn open(&self, connection: &PgConnection) -> Result<Box<dyn SqlExecutor>, PostgresError> {
        tracing::debug!("Opening {:?} executor for {}", self.kind, connection);
        match self.kind {
            ExecutorKind::Psql => Ok(Box::new(PsqlExecutor::new(
                self.psql_path.clone(),
                connection.clone(),
            ))),
            ExecutorKind::Native => Ok(Box::new(NativeExecutor::connect(connection.clone()).await?)),
        }
    }
}
