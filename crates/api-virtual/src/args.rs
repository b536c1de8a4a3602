use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum VirtualCommand {
    /// Serve the virtual API
    Serve(ServeArgs),
    /// Load and validate a config, then list its routes
    Validate(ConfigArgs),
    /// Print the generated OpenAPI document
    Openapi(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Config file, or directory of *.yaml/*.yml files
    #[arg(long, env = "API_VIRTUAL_CONFIG")]
    pub config: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Config file, or directory of *.yaml/*.yml files
    #[arg(long, env = "API_VIRTUAL_CONFIG")]
    pub config: PathBuf,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "API_VIRTUAL_PORT", default_value_t = 4010)]
    pub port: u16,

    /// Reload the config when its files change
    #[arg(long)]
    pub watch: bool,

    /// Polling interval for --watch, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,
}
