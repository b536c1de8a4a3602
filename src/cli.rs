//! Command-line definitions.

use api_virtual::VirtualCommand;
use clap::{Parser, Subcommand};
use envkit_core::OutputFormat;
use envkit_mongodb::MongoArgs;
use envkit_opensearch::OpenSearchArgs;
use envkit_postgresql::PostgresArgs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "envkit")]
#[command(about = "Seed and query OpenSearch, MongoDB and Postgres test environments, and serve virtual APIs")]
#[command(long_about = None)]
pub struct Cli {
    /// Output format for query results
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Debug logging (when RUST_LOG is not set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// OpenSearch indices and documents
    Opensearch {
        #[command(flatten)]
        conn: OpenSearchArgs,

        #[command(subcommand)]
        command: OpenSearchCommand,
    },

    /// MongoDB collections and documents
    Mongodb {
        #[command(flatten)]
        conn: MongoArgs,

        #[command(subcommand)]
        command: MongoCommand,
    },

    /// Postgres queries, scripts, migrations and seed-yaml
    #[command(alias = "postgresql")]
    Postgres {
        #[command(flatten)]
        conn: PostgresArgs,

        #[command(subcommand)]
        command: PostgresCommand,
    },

    /// Virtual API server
    ApiVirtual {
        #[command(subcommand)]
        command: VirtualCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum OpenSearchCommand {
    /// Cluster health
    Health,

    /// List indices, optionally filtered by a pattern such as `logs-*`
    Indices { pattern: Option<String> },

    /// Create an index
    CreateIndex {
        name: String,

        /// Settings/mappings body: inline JSON or a JSON/YAML file
        #[arg(long)]
        body: Option<String>,
    },

    /// Delete an index
    DeleteIndex {
        name: String,

        /// Succeed when the index does not exist
        #[arg(long)]
        ignore_missing: bool,
    },

    /// Bulk-load documents from a seed file into an index
    Seed {
        index: String,

        /// Seed file (.json, .jsonl, .ndjson, .yaml, .yml)
        #[arg(long)]
        file: PathBuf,

        #[command(flatten)]
        load: IndexLoadArgs,
    },

    /// Bulk-load every seed file in a directory, one index per file stem
    SeedDir {
        dir: PathBuf,

        #[command(flatten)]
        load: IndexLoadArgs,
    },

    /// Search an index
    Search {
        index: String,

        /// Query DSL: inline JSON or a JSON/YAML file
        #[arg(long, conflicts_with = "q")]
        query: Option<String>,

        /// Lucene query string
        #[arg(long)]
        q: Option<String>,

        /// Maximum number of hits
        #[arg(long)]
        size: Option<usize>,
    },

    /// Count documents in an index
    Count {
        index: String,

        /// Query clause: inline JSON or a JSON/YAML file
        #[arg(long)]
        query: Option<String>,
    },

    /// Refresh an index
    Refresh { index: String },
}

#[derive(clap::Args, Debug, Clone)]
pub struct IndexLoadArgs {
    /// Document field to use as `_id`
    #[arg(long)]
    pub id_field: Option<String>,

    /// Documents per `_bulk` request
    #[arg(long, default_value_t = envkit_opensearch::DEFAULT_BULK_BATCH_SIZE)]
    pub batch_size: usize,

    /// Delete and recreate the index first
    #[arg(long)]
    pub recreate: bool,

    /// Refresh after the last batch
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Subcommand, Debug)]
pub enum MongoCommand {
    /// List collections with document counts
    Collections,

    /// Insert documents from a seed file into a collection
    Seed {
        collection: String,

        /// Seed file (.json, .jsonl, .ndjson, .yaml, .yml)
        #[arg(long)]
        file: PathBuf,

        /// Drop the collection first
        #[arg(long)]
        drop: bool,

        /// Documents per insert_many call
        #[arg(long, default_value_t = envkit_mongodb::DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },

    /// Seed every file in a directory, one collection per file stem
    SeedDir {
        dir: PathBuf,

        /// Drop each collection first
        #[arg(long)]
        drop: bool,

        /// Documents per insert_many call
        #[arg(long, default_value_t = envkit_mongodb::DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },

    /// Find documents
    Find {
        collection: String,

        /// Filter: inline JSON or a JSON/YAML file
        #[arg(long)]
        filter: Option<String>,

        /// Projection: inline JSON or a JSON/YAML file
        #[arg(long)]
        projection: Option<String>,

        /// Sort: inline JSON or a JSON/YAML file
        #[arg(long)]
        sort: Option<String>,

        #[arg(long)]
        limit: Option<i64>,

        #[arg(long)]
        skip: Option<u64>,
    },

    /// Count documents
    Count {
        collection: String,

        /// Filter: inline JSON or a JSON/YAML file
        #[arg(long)]
        filter: Option<String>,
    },

    /// Drop a collection
    Drop { collection: String },
}

#[derive(Subcommand, Debug)]
pub enum PostgresCommand {
    /// Run a query and print its rows
    Query { sql: String },

    /// Run a SQL script
    Exec {
        #[arg(long)]
        file: PathBuf,

        /// Interpolate ${KEY} placeholders (repeatable KEY=VALUE)
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
    },

    /// List tables in a schema
    Tables {
        #[arg(long, default_value = "public")]
        schema: String,
    },

    /// Truncate tables (comma-separated)
    Truncate {
        #[arg(value_delimiter = ',', required = true)]
        tables: Vec<String>,

        #[arg(long)]
        cascade: bool,

        /// Also reset sequences owned by the tables
        #[arg(long)]
        restart_identity: bool,
    },

    /// Run a Prisma CLI command
    Prisma {
        #[command(subcommand)]
        command: PrismaSubcommand,
    },

    /// Compile and apply a seed-yaml document
    SeedYaml {
        file: PathBuf,

        /// Override a variable (repeatable KEY=VALUE)
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,

        /// Only seed this database scope (`default` for top-level tables)
        #[arg(long)]
        only: Option<String>,

        /// Print the compiled SQL instead of running it
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum PrismaSubcommand {
    /// prisma migrate deploy
    Deploy(PrismaArgs),
    /// prisma migrate reset --force
    Reset(PrismaArgs),
    /// prisma db push
    Push {
        #[command(flatten)]
        args: PrismaArgs,

        #[arg(long)]
        accept_data_loss: bool,
    },
    /// prisma generate
    Generate(PrismaArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct PrismaArgs {
    /// Path to schema.prisma
    #[arg(long, default_value = "prisma/schema.prisma")]
    pub schema: PathBuf,
}
