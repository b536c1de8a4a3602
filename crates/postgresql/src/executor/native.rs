//! `tokio-postgres` executor.

use super::{QueryResult, SqlExecutor};
use crate::connection::PgConnection;
use crate::error::PostgresError;
use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};
use tracing::{debug, error};

/// Runs SQL over a native driver connection.
pub struct NativeExecutor {
    client: Client,
    connection: PgConnection,
}

impl NativeExecutor {
    pub async fn connect(connection: PgConnection) -> Result<Self, PostgresError> {
        let (client, conn) = tokio_postgres::connect(connection.as_str(), NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                error!("PostgreSQL connection error: {}", e);
            }
        });

        debug!("Connected to {}", connection);
        Ok(Self { client, connection })
    }
}

#[async_trait]
impl SqlExecutor for NativeExecutor {
    async fn execute_script(&self, sql: &str) -> Result<(), PostgresError> {
        debug!("Executing script against {} ({} bytes)", self.connection, sql.len());
        self.client.batch_execute(sql).await?;
        Ok(())
    }

    async fn query(&self, sql: &str) -> Result<QueryResult, PostgresError> {
        debug!("Querying {}: {}", self.connection, sql);
        let messages = self.client.simple_query(sql).await?;
        Ok(collect_rows(&messages))
    }

    fn connection(&self) -> &PgConnection {
        &self.connection
    }
}

/// Rows of the last statement that produced any, with NULL as empty text.
fn collect_rows(messages: &[SimpleQueryMessage]) -> QueryResult {
    let mut result = QueryResult::default();
    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(columns) => {
                result = QueryResult {
                    columns: columns.iter().map(|c| c.name().to_string()).collect(),
                    rows: Vec::new(),
                };
            }
            SimpleQueryMessage::Row(row) => {
                if result.columns.is_empty() {
                    result.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                }
                let values = (0..row.len())
                    .map(|i| row.get(i).unwrap_or_default().to_string())
                    .collect();
                result.rows.push(values);
            }
            _ => {}
        }
    }
    result
}
