//! Round-trip tests for batch CSV export

use rostra_common::events::EventBus;
use rostra_common::models::Identity;
use rostra_ir::services::{
    export_batch, parse_csv, CategoryRegistry, ExportError, SqliteBatchWriter, SubmissionConfig,
    SubmissionEngine,
};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

async fn setup_db() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().expect("tempdir");
    let pool = rostra_common::db::init_database(&dir.path().join("rostra.db"))
        .await
        .expect("init_database");
    (dir, pool)
}

fn config() -> SubmissionConfig {
    SubmissionConfig {
        id_column: "npi".to_string(),
        category_key: "enrollment_status".to_string(),
        tag_value: "termed".to_string(),
        batch_name: Some("export round trip".to_string()),
        notes: None,
        file_name: "upload.csv".to_string(),
    }
}

fn engine(pool: &SqlitePool) -> SubmissionEngine<SqliteBatchWriter> {
    SubmissionEngine::new(
        SqliteBatchWriter::new(pool.clone(), Duration::from_secs(10)),
        EventBus::new(16),
        2,
    )
}

#[tokio::test]
async fn export_round_trips_the_upload_as_a_multiset() {
    let (_dir, pool) = setup_db().await;
    let registry = CategoryRegistry::load(&pool).await.unwrap();

    let csv_text = "npi,provider_name,term_date\n\
        1111111111,\"Adams, Alice\",2024-01-31\n\
        2222222222,Brown Bob,2024-02-29\n\
        3333333333,Chen Carol,\n\
        4444444444,Diaz Dan,2024-04-30\n\
        5555555555,Evans Eve,2024-05-31\n";

    let parsed = parse_csv(csv_text.as_bytes()).unwrap();
    let original_rows = parsed.rows.clone();

    let batch = engine(&pool)
        .submit(parsed, &config(), &registry, &Identity::new(Uuid::new_v4(), "a@example.com"))
        .await
        .unwrap();

    let exported = export_batch(&pool, batch.id).await.unwrap();
    let reparsed = parse_csv(&exported).unwrap();

    // Same content as a multiset of row maps; column order may differ
    let mut expected: Vec<BTreeMap<String, String>> = original_rows;
    let mut actual: Vec<BTreeMap<String, String>> = reparsed.rows;
    expected.sort();
    actual.sort();
    assert_eq!(expected, actual);

    // Header set is the union of row keys
    let mut exported_headers = reparsed.headers.clone();
    exported_headers.sort();
    assert_eq!(exported_headers, vec!["npi", "provider_name", "term_date"]);
}

#[tokio::test]
async fn export_quotes_cells_that_need_it() {
    let (_dir, pool) = setup_db().await;
    let registry = CategoryRegistry::load(&pool).await.unwrap();

    let csv_text = "npi,provider_name\n1111111111,\"Smith, Jane\"\n";
    let parsed = parse_csv(csv_text.as_bytes()).unwrap();

    let batch = engine(&pool)
        .submit(parsed, &config(), &registry, &Identity::new(Uuid::new_v4(), "a@example.com"))
        .await
        .unwrap();

    let exported = export_batch(&pool, batch.id).await.unwrap();
    let reparsed = parse_csv(&exported).unwrap();
    assert_eq!(reparsed.rows[0]["provider_name"], "Smith, Jane");
}

#[tokio::test]
async fn export_of_unknown_batch_is_not_found() {
    let (_dir, pool) = setup_db().await;

    let err = export_batch(&pool, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ExportError::NotFound(_)));
}
