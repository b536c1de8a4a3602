//! Prisma migration commands, run through `npx prisma`.

use crate::connection::PgConnection;
use crate::error::PostgresError;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Supported `prisma` subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrismaCommand {
    /// `prisma migrate deploy`
    Deploy,
    /// `prisma migrate reset --force --skip-seed`
    Reset,
    /// `prisma db push --skip-generate`
    Push { accept_data_loss: bool },
    /// `prisma generate`
    Generate,
}

impl PrismaCommand {
    pub fn args(&self) -> Vec<&'static str> {
        match self {
            PrismaCommand::Deploy => vec!["migrate", "deploy"],
            PrismaCommand::Reset => vec!["migrate", "reset", "--force", "--skip-seed"],
            PrismaCommand::Push { accept_data_loss } => {
                let mut args = vec!["db", "push", "--skip-generate"];
                if *accept_data_loss {
                    args.push("--accept-data-loss");
                }
                args
            }
            PrismaCommand::Generate => vec!["generate"],
        }
    }

    /// Whether the command talks to the database.
    pub fn needs_database(&self) -> bool {
        !matches!(self, PrismaCommand::Generate)
    }
}

/// Runs Prisma CLI commands against one schema file.
#[derive(Debug, Clone)]
pub struct PrismaRunner {
    npx: String,
    schema: PathBuf,
    connection: Option<PgConnection>,
}

impl PrismaRunner {
    pub fn new(schema: impl Into<PathBuf>) -> Self {
        Self {
            npx: "npx".to_string(),
            schema: schema.into(),
            connection: None,
        }
    }

    /// Export `DATABASE_URL` to the Prisma process.
    pub fn with_connection(mut self, connection: PgConnection) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn with_npx(mut self, npx: impl Into<String>) -> Self {
        self.npx = npx.into();
        self
    }

    /// Full argument list passed to `npx`.
    pub fn command_line(&self, command: PrismaCommand) -> Vec<String> {
        let mut args = vec!["--yes".to_string(), "prisma".to_string()];
        args.extend(command.args().into_iter().map(str::to_string));
        args.push("--schema".to_string());
        args.push(self.schema.display().to_string());
        args
    }

    pub async fn run(&self, command: PrismaCommand) -> Result<(), PostgresError> {
        if command.needs_database() && self.connection.is_none() {
            return Err(PostgresError::InvalidUrl(
                "DATABASE_URL is required for this prisma command".to_string(),
            ));
        }

        let args = self.command_line(command);
        info!("Running {} {}", self.npx, args.join(" "));

        let mut cmd = Command::new(&self.npx);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(connection) = &self.connection {
            cmd.env("DATABASE_URL", connection.as_str());
        }

        let mut child = cmd.spawn().map_err(|source| PostgresError::Spawn {
            program: self.npx.clone(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let forward = async {
            match stdout {
                Some(stdout) => forward_lines(stdout, |line| info!("prisma: {}", line)).await,
                None => Ok(0),
            }
        };
        let collect = async {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                stderr.read_to_end(&mut buf).await?;
            }
            Ok::<_, std::io::Error>(buf)
        };
        let (lines, stderr) = tokio::try_join!(forward, collect)?;
        let status = child.wait().await?;
        debug!("prisma wrote {} lines", lines);

        if !status.success() {
            return Err(PostgresError::CommandFailed {
                program: format!("{} prisma", self.npx),
                status: status.code(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Hand each non-blank line of `reader` to `on_line` as it arrives.
async fn forward_lines<R>(reader: R, mut on_line: impl FnMut(&str)) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut count = 0;
    while let Some(line) = lines.next_line().await? {
        if !line.trim().is_empty() {
            on_line(&line);
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let runner = PrismaRunner::new("prisma/schema.prisma");
        assert_eq!(
            runner.command_line(PrismaCommand::Deploy),
            vec!["--yes", "prisma", "migrate", "deploy", "--schema", "prisma/schema.prisma"]
        );
        assert_eq!(
            runner.command_line(PrismaCommand::Push { accept_data_loss: true }),
            vec![
                "--yes",
                "prisma",
                "db",
                "push",
                "--skip-generate",
                "--accept-data-loss",
                "--schema",
                "prisma/schema.prisma"
            ]
        );
    }

    #[test]
    fn test_needs_database() {
        assert!(PrismaCommand::Reset.needs_database());
        assert!(!PrismaCommand::Generate.needs_database());
    }

    #[tokio::test]
    async fn test_run_without_connection_fails_early() {
        let runner = PrismaRunner::new("schema.prisma").with_npx("/nonexistent/npx");
        let err = runner.run(PrismaCommand::Deploy).await.unwrap_err();
        assert!(matches!(err, PostgresError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_run_missing_npx() {
        let runner = PrismaRunner::new("schema.prisma").with_npx("/nonexistent/npx");
        let err = runner.run(PrismaCommand::Generate).await.unwrap_err();
        assert!(matches!(err, PostgresError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_forward_lines_as_they_arrive() {
        let reader = tokio_test::io::Builder::new()
            .read(b"Applying migration `001_init`\n\n")
            .wait(std::time::Duration::from_millis(20))
            .read(b"All migrations have been successfully applied.\n")
            .build();

        let mut seen = Vec::new();
        let count = forward_lines(reader, |line| seen.push(line.to_string()))
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            seen,
            vec![
                "Applying migration `001_init`",
                "All migrations have been successfully applied."
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_failure_carries_stderr() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let npx = dir.path().join("npx");
        std::fs::write(
            &npx,
            "#!/bin/sh\necho \"migrating $DATABASE_URL\"\necho 'P1001: unreachable' >&2\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&npx, std::fs::Permissions::from_mode(0o755)).unwrap();

        let conn = PgConnection::parse("postgres://localhost/app").unwrap();
        let runner = PrismaRunner::new("schema.prisma")
            .with_npx(npx.display().to_string())
            .with_connection(conn);
        match runner.run(PrismaCommand::Deploy).await {
            Err(PostgresError::CommandFailed { status, stderr, .. }) => {
                assert_eq!(status, Some(1));
                assert_eq!(stderr, "P1001: unreachable");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }
}
