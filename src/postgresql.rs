//! `envkit postgres` commands.

use crate::cli::{PostgresCommand, PrismaSubcommand};
use crate::print_output;
use anyhow::Context;
use envkit_core::{parse_var_assignment, OutputFormat, Variables};
use envkit_postgresql::sql::{list_tables_sql, load_script, truncate_sql};
use envkit_postgresql::{compile_file, PostgresArgs, PrismaCommand, PrismaRunner};
use tracing::{info, warn};

pub async fn run(
    conn: &PostgresArgs,
    command: PostgresCommand,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let factory = conn.executor_factory();

    match command {
        PostgresCommand::Query { sql } => {
            let connection = conn.connection()?;
            let executor = factory.open(&connection).await?;
            let result = executor.query(&sql).await.context("Query failed")?;
            print_output(result.to_tabular().render(output)?);
        }
        PostgresCommand::Exec { file, vars } => {
            let vars = parse_vars(&vars)?;
            let script = load_script(&file, (!vars.is_empty()).then_some(&vars))
                .with_context(|| format!("Failed to load script {}", file.display()))?;
            let connection = conn.connection()?;
            let executor = factory.open(&connection).await?;
            executor
                .execute_script(&script)
                .await
                .with_context(|| format!("Script {} failed", file.display()))?;
            info!("Executed {}", file.display());
        }
        PostgresCommand::Tables { schema } => {
            let connection = conn.connection()?;
            let executor = factory.open(&connection).await?;
            let result = executor.query(&list_tables_sql(&schema)).await?;
            print_output(result.to_tabular().render(output)?);
        }
        PostgresCommand::Truncate {
            tables,
            cascade,
            restart_identity,
        } => {
            let sql = truncate_sql(&tables, cascade, restart_identity)?;
            let connection = conn.connection()?;
            let executor = factory.open(&connection).await?;
            executor.execute_script(&sql).await?;
            info!("Truncated {}", tables.join(", "));
        }
        PostgresCommand::Prisma { command } => {
            let (schema, command) = match command {
                PrismaSubcommand::Deploy(args) => (args.schema, PrismaCommand::Deploy),
                PrismaSubcommand::Reset(args) => (args.schema, PrismaCommand::Reset),
                PrismaSubcommand::Push {
                    args,
                    accept_data_loss,
                } => (args.schema, PrismaCommand::Push { accept_data_loss }),
                PrismaSubcommand::Generate(args) => (args.schema, PrismaCommand::Generate),
            };
            let mut runner = PrismaRunner::new(schema);
            if conn.database_url.is_some() {
                runner = runner.with_connection(conn.connection()?);
            }
            runner.run(command).await?;
        }
        PostgresCommand::SeedYaml {
            file,
            vars,
            only,
            dry_run,
        } => {
            let overrides = parse_vars(&vars)?;
            let plan = compile_file(&file, &overrides, only.as_deref())
                .with_context(|| format!("Failed to compile {}", file.display()))?;

            if plan.is_empty() {
                warn!("{} has no rows to seed", file.display());
                return Ok(());
            }
            if dry_run {
                print_output(plan.render());
                return Ok(());
            }

            let connection = conn.connection()?;
            let report = plan.apply(&factory, &connection).await?;
            info!(
                "Seeded {} statements across {} databases in {:?}",
                report.statements_applied, report.scripts_applied, report.total_duration
            );
        }
    }

    Ok(())
}

fn parse_vars(args: &[String]) -> anyhow::Result<Variables> {
    args.iter()
        .map(|arg| parse_var_assignment(arg).with_context(|| format!("Invalid --var '{arg}'")))
        .collect()
}
