//! `envkit opensearch` commands.

use crate::cli::{IndexLoadArgs, OpenSearchCommand};
use crate::print_output;
use anyhow::{bail, Context};
use envkit_core::{
    collection_name, list_seed_files, load_documents, load_json_value, render_records,
    render_value, OutputFormat,
};
use envkit_opensearch::{query_string, BulkOptions, BulkReport, OpenSearchArgs, OpenSearchClient};
use serde_json::{json, Value};
use std::path::Path;
use tracing::{info, warn};

pub async fn run(
    conn: &OpenSearchArgs,
    command: OpenSearchCommand,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let client = OpenSearchClient::from_args(conn).context("Failed to build OpenSearch client")?;

    match command {
        OpenSearchCommand::Health => {
            let health = client.health().await?;
            print_output(render_value(&health, output)?);
        }
        OpenSearchCommand::Indices { pattern } => {
            let indices = client.list_indices(pattern.as_deref()).await?;
            print_output(render_records(&indices, output)?);
        }
        OpenSearchCommand::CreateIndex { name, body } => {
            let body = body
                .as_deref()
                .map(load_json_value)
                .transpose()
                .context("Failed to load index body")?;
            let response = client.create_index(&name, body.as_ref()).await?;
            print_output(render_value(&response, output)?);
        }
        OpenSearchCommand::DeleteIndex {
            name,
            ignore_missing,
        } => {
            let deleted = client.delete_index(&name, ignore_missing).await?;
            print_output(render_value(
                &json!({ "index": name, "deleted": deleted }),
                output,
            )?);
        }
        OpenSearchCommand::Seed { index, file, load } => {
            let report = seed_file(&client, &index, &file, &load).await?;
            print_output(render_records(&[report_record(&index, &report)], output)?);
            ensure_success(&report)?;
        }
        OpenSearchCommand::SeedDir { dir, load } => {
            let files = list_seed_files(&dir)
                .with_context(|| format!("Failed to list seed files in {}", dir.display()))?;
            if files.is_empty() {
                warn!("No seed files found in {}", dir.display());
            }

            let mut records = Vec::new();
            let mut failed = false;
            for file in files {
                let Some(index) = collection_name(&file) else {
                    continue;
                };
                let report = seed_file(&client, &index, &file, &load).await?;
                failed |= !report.is_success();
                records.push(report_record(&index, &report));
            }
            print_output(render_records(&records, output)?);
            if failed {
                bail!("Some documents failed to index");
            }
        }
        OpenSearchCommand::Search {
            index,
            query,
            q,
            size,
        } => {
            let query = match (query, q) {
                (Some(query), _) => Some(
                    load_json_value(&query).context("Failed to load query")?,
                ),
                (None, Some(q)) => Some(query_string(&q)),
                (None, None) => None,
            };
            let result = client.search(&index, query.as_ref(), size).await?;
            info!("{} total hits, showing {}", result.total, result.hits.len());
            match output {
                OutputFormat::Json => print_output(serde_json::to_string_pretty(&result)?),
                OutputFormat::Table => {
                    print_output(render_records(&result.to_records(), output)?)
                }
            }
        }
        OpenSearchCommand::Count { index, query } => {
            let query = query
                .as_deref()
                .map(load_json_value)
                .transpose()
                .context("Failed to load query")?;
            let count = client.count(&index, query.as_ref()).await?;
            print_output(render_value(&json!({ "index": index, "count": count }), output)?);
        }
        OpenSearchCommand::Refresh { index } => {
            client.refresh(&index).await?;
            info!("Refreshed index '{}'", index);
        }
    }

    Ok(())
}

async fn seed_file(
    client: &OpenSearchClient,
    index: &str,
    file: &Path,
    load: &IndexLoadArgs,
) -> anyhow::Result<BulkReport> {
    let docs = load_documents(file)
        .with_context(|| format!("Failed to load documents from {}", file.display()))?;

    if load.recreate {
        client.delete_index(index, true).await?;
        client.create_index(index, None).await?;
    }

    let options = BulkOptions {
        id_field: load.id_field.clone(),
        batch_size: load.batch_size,
        refresh: load.refresh,
    };
    let report = client
        .bulk_index(index, &docs, &options)
        .await
        .with_context(|| format!("Bulk load into '{index}' failed"))?;

    for error in &report.errors {
        warn!("{}: {}", index, error);
    }
    Ok(report)
}

fn report_record(index: &str, report: &BulkReport) -> Value {
    json!({
        "index": index,
        "indexed": report.indexed,
        "failed": report.failed,
        "batches": report.batches,
    })
}

fn ensure_success(report: &BulkReport) -> anyhow::Result<()> {
    if !report.is_success() {
        bail!("{} documents failed to index", report.failed);
    }
    Ok(())
}
