//! `envkit mongodb` commands.

use crate::cli::MongoCommand;
use crate::print_output;
use anyhow::Context;
use envkit_core::{load_documents, load_json_value, render_records, render_value, OutputFormat};
use envkit_mongodb::{FindQuery, MongoArgs, MongoSeeder, SeedMetrics};
use serde_json::{json, Value};

pub async fn run(conn: &MongoArgs, command: MongoCommand, output: OutputFormat) -> anyhow::Result<()> {
    let seeder = MongoSeeder::connect(&conn.uri, &conn.database)
        .await
        .with_context(|| format!("Failed to connect to MongoDB database '{}'", conn.database))?;

    match command {
        MongoCommand::Collections => {
            let records: Vec<Value> = seeder
                .list_collections()
                .await?
                .into_iter()
                .map(|c| json!({ "collection": c.name, "documents": c.documents }))
                .collect();
            print_output(render_records(&records, output)?);
        }
        MongoCommand::Seed {
            collection,
            file,
            drop,
            batch_size,
        } => {
            let docs = load_documents(&file)
                .with_context(|| format!("Failed to load documents from {}", file.display()))?;
            let metrics = seeder
                .with_batch_size(batch_size)
                .seed(&collection, &docs, drop)
                .await
                .with_context(|| format!("Failed to seed collection '{collection}'"))?;
            print_output(render_records(&[metrics_record(&collection, &metrics)], output)?);
        }
        MongoCommand::SeedDir {
            dir,
            drop,
            batch_size,
        } => {
            let results = seeder
                .with_batch_size(batch_size)
                .seed_dir(&dir, drop)
                .await
                .with_context(|| format!("Failed to seed from {}", dir.display()))?;
            let records: Vec<Value> = results
                .iter()
                .map(|(name, metrics)| metrics_record(name, metrics))
                .collect();
            print_output(render_records(&records, output)?);
        }
        MongoCommand::Find {
            collection,
            filter,
            projection,
            sort,
            limit,
            skip,
        } => {
            let query = FindQuery {
                filter: parse_optional(filter.as_deref(), "filter")?,
                projection: parse_optional(projection.as_deref(), "projection")?,
                sort: parse_optional(sort.as_deref(), "sort")?,
                limit,
                skip,
            };
            let docs = seeder.find(&collection, &query).await?;
            print_output(render_records(&docs, output)?);
        }
        MongoCommand::Count { collection, filter } => {
            let filter = parse_optional(filter.as_deref(), "filter")?;
            let count = seeder.count(&collection, filter.as_ref()).await?;
            print_output(render_value(
                &json!({ "collection": collection, "count": count }),
                output,
            )?);
        }
        MongoCommand::Drop { collection } => {
            seeder.drop(&collection).await?;
        }
    }

    Ok(())
}

fn parse_optional(arg: Option<&str>, what: &str) -> anyhow::Result<Option<Value>> {
    arg.map(|a| load_json_value(a).with_context(|| format!("Failed to load {what}")))
        .transpose()
}

fn metrics_record(collection: &str, metrics: &SeedMetrics) -> Value {
    json!({
        "collection": collection,
        "inserted": metrics.documents_inserted,
        "batches": metrics.batch_count,
        "seconds": (metrics.total_duration.as_secs_f64() * 1000.0).round() / 1000.0,
        "docs_per_sec": metrics.docs_per_second().round(),
    })
}
