use super::document::DEFAULT_SCOPE;
use crate::connection::PgConnection;
use crate::error::PostgresError;
use crate::executor::ExecutorFactory;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// One compiled statement and the row it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub origin: String,
}

/// Statements for one database, applied in a single transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseScript {
    /// `None` targets the connection's own database.
    pub database: Option<String>,
    pub statements: Vec<Statement>,
}

impl DatabaseScript {
    pub fn label(&self) -> &str {
        self.database.as_deref().unwrap_or(DEFAULT_SCOPE)
    }

    pub fn render(&self) -> String {
        let mut out = String::from("BEGIN;\n");
        for statement in &self.statements {
            out.push_str("-- ");
            out.push_str(&statement.origin);
            out.push('\n');
            out.push_str(&statement.sql);
            out.push('\n');
        }
        out.push_str("COMMIT;\n");
        out
    }

    /// Connection for this script's database.
    pub fn target(&self, base: &PgConnection) -> PgConnection {
        match &self.database {
            Some(db) => base.with_database(db),
            None => base.clone(),
        }
    }
}

/// Compiled seed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedPlan {
    pub scripts: Vec<DatabaseScript>,
}

/// Summary of an applied plan.
#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    pub scripts_applied: usize,
    pub statements_applied: usize,
    pub total_duration: Duration,
}

impl SeedPlan {
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn statement_count(&self) -> usize {
        self.scripts.iter().map(|s| s.statements.len()).sum()
    }

    /// All scripts as one annotated SQL text, for `--dry-run`.
    pub fn render(&self) -> String {
        self.scripts
            .iter()
            .map(|script| format!("-- database: {}\n{}", script.label(), script.render()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run every script in order; stops at the first failure.
    pub async fn apply(
        &self,
        factory: &ExecutorFactory,
        base: &PgConnection,
    ) -> Result<SeedReport, PostgresError> {
        let start = Instant::now();
        let mut report = SeedReport::default();

        for script in &self.scripts {
            let target = script.target(base);
            info!(
                "Seeding database '{}' ({} statements) via {}",
                script.label(),
                script.statements.len(),
                target
            );
            let executor = factory.open(&target).await?;
            executor.execute_script(&script.render()).await?;
            debug!("Committed seed script for '{}'", script.label());

            report.scripts_applied += 1;
            report.statements_applied += script.statements.len();
        }

        report.total_duration = start.elapsed();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorKind;

    fn script(database: Option<&str>) -> DatabaseScript {
        DatabaseScript {
            database: database.map(str::to_string),
            statements: vec![Statement {
                sql: "INSERT INTO \"t\" (\"x\") VALUES (1);".to_string(),
                origin: "t[0]".to_string(),
            }],
        }
    }

    #[test]
    fn test_render() {
        assert_eq!(
            script(None).render(),
            "BEGIN;\n-- t[0]\nINSERT INTO \"t\" (\"x\") VALUES (1);\nCOMMIT;\n"
        );
        let plan = SeedPlan {
            scripts: vec![script(None), script(Some("analytics"))],
        };
        let text = plan.render();
        assert!(text.starts_with("-- database: default\nBEGIN;"));
        assert!(text.contains("-- database: analytics\nBEGIN;"));
        assert_eq!(plan.statement_count(), 2);
    }

    #[test]
    fn test_target_database() {
        let base = PgConnection::parse("postgres://u:p@db:5432/app").unwrap();
        assert_eq!(script(None).target(&base), base);
        assert_eq!(
            script(Some("analytics")).target(&base).database(),
            Some("analytics")
        );
    }

    #[tokio::test]
    async fn test_apply_stops_on_spawn_failure() {
        let base = PgConnection::parse("postgres://localhost/app").unwrap();
        let factory = ExecutorFactory::new(ExecutorKind::Psql, "/nonexistent/envkit-psql");
        let plan = SeedPlan {
            scripts: vec![script(None)],
        };
        let err = plan.apply(&factory, &base).await.unwrap_err();
        assert!(matches!(err, PostgresError::Spawn { .. }));
    }
}
