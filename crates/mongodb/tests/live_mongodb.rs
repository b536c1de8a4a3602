//! Seeder tests against a live MongoDB.
//!
//! Run with a server available at `MONGODB_URI` (default `mongodb://localhost:27017`):
//!
//! ```bash
//! cargo test -p envkit-mongodb -- --ignored
//! ```

use envkit_mongodb::{FindQuery, MongoSeeder};
use serde_json::json;

fn mongodb_uri() -> String {
    std::env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn test_seed_find_count_drop() {
    let seeder = MongoSeeder::connect(&mongodb_uri(), "envkit_test")
        .await
        .unwrap()
        .with_batch_size(2);

    let docs = vec![
        json!({"name": "alice", "age": 30}),
        json!({"name": "bob", "age": 25}),
        json!({"name": "carol", "age": 41}),
    ];
    let metrics = seeder.seed("people", &docs, true).await.unwrap();
    assert_eq!(metrics.documents_inserted, 3);
    assert_eq!(metrics.batch_count, 2);

    let adults = seeder
        .find(
            "people",
            &FindQuery {
                filter: Some(json!({"age": {"$gt": 26}})),
                projection: Some(json!({"_id": 0, "name": 1})),
                sort: Some(json!({"name": 1})),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(adults, vec![json!({"name": "alice"}), json!({"name": "carol"})]);

    assert_eq!(seeder.count("people", None).await.unwrap(), 3);

    // Seeding with drop_first replaces the contents
    seeder.seed("people", &docs[..1], true).await.unwrap();
    assert_eq!(seeder.count("people", None).await.unwrap(), 1);

    seeder.drop("people").await.unwrap();
    let names: Vec<String> = seeder
        .list_collections()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert!(!names.contains(&"people".to_string()));
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn test_seed_dir_uses_file_stems() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("tenants.json"), r#"[{"slug":"acme"}]"#).unwrap();
    std::fs::write(dir.path().join("events.jsonl"), "{\"kind\":\"a\"}\n{\"kind\":\"b\"}\n").unwrap();

    let seeder = MongoSeeder::connect(&mongodb_uri(), "envkit_test_dir")
        .await
        .unwrap();
    let results = seeder.seed_dir(dir.path(), true).await.unwrap();

    let summary: Vec<(String, u64)> = results
        .into_iter()
        .map(|(name, m)| (name, m.documents_inserted))
        .collect();
    assert_eq!(
        summary,
        vec![("events".to_string(), 2), ("tenants".to_string(), 1)]
    );

    seeder.drop("events").await.unwrap();
    seeder.drop("tenants").await.unwrap();
}
