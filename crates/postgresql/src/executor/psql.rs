//! `psql` subprocess executor.

use super::{QueryResult, SqlExecutor};
use crate::connection::PgConnection;
use crate::error::PostgresError;
use async_trait::async_trait;
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Separates fields in unaligned output (ASCII unit separator).
const FIELD_SEPARATOR: char = '\u{1f}';
/// Separates records in unaligned output (ASCII record separator).
const RECORD_SEPARATOR: char = '\u{1e}';

/// Runs SQL through the `psql` CLI.
#[derive(Debug, Clone)]
pub struct PsqlExecutor {
    program: String,
    connection: PgConnection,
}

impl PsqlExecutor {
    pub fn new(program: impl Into<String>, connection: PgConnection) -> Self {
        Self {
            program: program.into(),
            connection,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--no-psqlrc")
            .arg("--quiet")
            .arg("--set=ON_ERROR_STOP=1")
            .arg(format!("--dbname={}", self.connection.as_str()))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Arguments used for a query, exposed for tests.
    fn query_args(sql: &str) -> Vec<String> {
        vec![
            "--no-align".to_string(),
            format!("--field-separator={FIELD_SEPARATOR}"),
            format!("--record-separator={RECORD_SEPARATOR}"),
            "--pset=footer=off".to_string(),
            format!("--command={sql}"),
        ]
    }

    fn check(&self, output: Output) -> Result<Output, PostgresError> {
        if output.status.success() {
            Ok(output)
        } else {
            Err(PostgresError::CommandFailed {
                program: self.program.clone(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn spawn_error(&self, source: std::io::Error) -> PostgresError {
        PostgresError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

#[async_trait]
impl SqlExecutor for PsqlExecutor {
    async fn execute_script(&self, sql: &str) -> Result<(), PostgresError> {
        debug!("psql script against {} ({} bytes)", self.connection, sql.len());

        let mut child = self
            .command()
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // psql interleaves reading the script with writing notices, so stdin
        // is fed from its own task while the output pipes are drained.
        let writer = child.stdin.take().map(|mut stdin| {
            let script = sql.as_bytes().to_vec();
            tokio::spawn(async move {
                stdin.write_all(&script).await?;
                stdin.shutdown().await
            })
        });

        let output = self.check(child.wait_with_output().await?)?;
        if let Some(writer) = writer {
            writer.await.map_err(std::io::Error::other)??;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            debug!("psql: {}", line);
        }
        Ok(())
    }

    async fn query(&self, sql: &str) -> Result<QueryResult, PostgresError> {
        debug!("psql query against {}: {}", self.connection, sql);

        let output = self
            .command()
            .stdin(Stdio::null())
            .args(Self::query_args(sql))
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        let output = self.check(output)?;

        Ok(parse_unaligned(&String::from_utf8_lossy(&output.stdout)))
    }

    fn connection(&self) -> &PgConnection {
        &self.connection
    }
}

/// Parse `psql --no-align` output produced with the executor's separators.
///
/// The first record is the header. Statements that return no rows (e.g.
/// `UPDATE`) produce no header, which yields an empty result.
pub fn parse_unaligned(stdout: &str) -> QueryResult {
    let mut records = stdout
        .trim_end_matches('\n')
        .split(RECORD_SEPARATOR)
        .map(|r| r.trim_start_matches('\n'))
        .filter(|r| !r.is_empty());

    let Some(header) = records.next() else {
        return QueryResult::default();
    };

    let columns: Vec<String> = header.split(FIELD_SEPARATOR).map(str::to_string).collect();
    let rows = records
        .map(|record| record.split(FIELD_SEPARATOR).map(str::to_string).collect())
        .collect();

    QueryResult { columns, rows }
}
