//! `envkit api-virtual` commands.

use crate::print_output;
use anyhow::Context;
use api_virtual::{openapi, route_records, server, ConfigSource, VirtualCommand};
use envkit_core::{render_records, OutputFormat};
use tracing::info;

pub async fn run(command: VirtualCommand, output: OutputFormat) -> anyhow::Result<()> {
    match command {
        VirtualCommand::Serve(args) => server::run(&args).await?,
        VirtualCommand::Validate(args) => {
            let table = ConfigSource::new(&args.config)
                .load()
                .with_context(|| format!("Invalid config {}", args.config.display()))?;
            info!("{} routes loaded from {}", table.len(), args.config.display());
            print_output(render_records(&route_records(&table), output)?);
        }
        VirtualCommand::Openapi(args) => {
            let table = ConfigSource::new(&args.config)
                .load()
                .with_context(|| format!("Invalid config {}", args.config.display()))?;
            print_output(serde_json::to_string_pretty(&openapi::document(&table))?);
        }
    }
    Ok(())
}
