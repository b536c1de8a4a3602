//! CLI argument definitions for OpenSearch connections.

use clap::Args;

/// Connection settings shared by every `envkit opensearch` command.
#[derive(Args, Clone, Debug)]
pub struct OpenSearchArgs {
    /// OpenSearch base URL
    #[arg(
        long = "opensearch-url",
        env = "OPENSEARCH_URL",
        default_value = "http://localhost:9200"
    )]
    pub url: String,

    /// Basic auth username
    #[arg(long = "opensearch-username", env = "OPENSEARCH_USERNAME")]
    pub username: Option<String>,

    /// Basic auth password
    #[arg(long = "opensearch-password", env = "OPENSEARCH_PASSWORD")]
    pub password: Option<String>,

    /// Accept invalid TLS certificates (self-signed dev clusters)
    #[arg(long)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,
}
