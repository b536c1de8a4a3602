//! OpenSearch helpers for envkit.
//!
//! A thin REST client over `reqwest` that covers what test environments
//! need: cluster health, index lifecycle, bulk seeding and searching.
//!
//! # Example
//!
//! ```ignore
//! use envkit_opensearch::{BulkOptions, OpenSearchClient};
//!
//! let client = OpenSearchClient::new("http://localhost:9200")?;
//! let docs = envkit_core::load_documents("orders.jsonl".as_ref())?;
//! let report = client.bulk_index("orders", &docs, &BulkOptions::default()).await?;
//! println!("indexed {} documents", report.indexed);
//! ```

pub mod args;
mod bulk;
mod client;
mod error;
mod search;

pub use args::OpenSearchArgs;
pub use bulk::{build_bulk_body, BulkOptions, BulkReport, DEFAULT_BULK_BATCH_SIZE};
pub use client::OpenSearchClient;
pub use error::OpenSearchError;
pub use search::{query_string, Hit, SearchResult};
