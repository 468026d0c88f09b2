//! Integration tests for the shared approval state machine
//!
//! Covers the entry-before-status ordering, the rejected-comment invariant,
//! conflict detection on non-pending subjects, and the structural audit
//! reference for both subject kinds.

use rostra_common::events::EventBus;
use rostra_common::models::{
    BulkBatch, EvidenceType, FieldObserved, Identity, IngestState, NewObservation,
    ReviewDecision, ReviewStatus, SubjectRef,
};
use rostra_ir::db::{batches, observations, reviews};
use rostra_ir::services::{ReviewEngine, ReviewError};
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

async fn setup_db() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().expect("tempdir");
    let pool = rostra_common::db::init_database(&dir.path().join("rostra.db"))
        .await
        .expect("init_database");
    (dir, pool)
}

fn reviewer() -> Identity {
    Identity::new(Uuid::new_v4(), "reviewer@example.com")
}

async fn seed_observation(pool: &SqlitePool) -> Uuid {
    let obs = NewObservation {
        provider_npi: "1234567890".to_string(),
        provider_name: "Dr. Jane Smith".to_string(),
        payer_name: Some("Acme Health".to_string()),
        field_observed: FieldObserved::TermDate,
        system_a_name: Some("CredentialHub".to_string()),
        system_a_value: Some("2024-06-30".to_string()),
        system_b_name: Some("PayerRoster".to_string()),
        system_b_value: Some("2024-09-30".to_string()),
        corrected_value: "2024-09-30".to_string(),
        evidence_type: EvidenceType::PayerPortal,
        evidence_notes: None,
    }
    .into_observation(Uuid::new_v4(), "analyst@example.com".to_string());

    observations::insert_observation(pool, &obs).await.unwrap();
    obs.id
}

async fn seed_batch(pool: &SqlitePool) -> Uuid {
    let batch = BulkBatch {
        id: Uuid::new_v4(),
        batch_name: "term_sweep.csv".to_string(),
        category_key: "review_cohort".to_string(),
        tag_value: "termination_sweep".to_string(),
        id_column_name: "npi".to_string(),
        record_count: 0,
        chunks_committed: 0,
        ingest_state: IngestState::Ingested,
        notes: None,
        submitted_by: Uuid::new_v4(),
        submitted_by_email: "analyst@example.com".to_string(),
        status: ReviewStatus::Pending,
        created_at: chrono::Utc::now(),
    };
    batches::insert_batch(pool, &batch).await.unwrap();
    batch.id
}

#[tokio::test]
async fn rejection_without_comment_is_refused_with_no_writes() {
    let (_dir, pool) = setup_db().await;
    let obs_id = seed_observation(&pool).await;
    let engine = ReviewEngine::new(pool.clone(), EventBus::new(16));

    let err = engine
        .review(
            SubjectRef::Observation(obs_id),
            ReviewDecision::Rejected,
            None,
            &reviewer(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::CommentRequired));

    // No entry, no status change
    let entries = reviews::list_for_subject(&pool, SubjectRef::Observation(obs_id))
        .await
        .unwrap();
    assert!(entries.is_empty());
    assert_eq!(
        observations::get_status(&pool, obs_id).await.unwrap(),
        Some(ReviewStatus::Pending)
    );
}

#[tokio::test]
async fn approval_with_empty_comment_succeeds() {
    let (_dir, pool) = setup_db().await;
    let obs_id = seed_observation(&pool).await;
    let engine = ReviewEngine::new(pool.clone(), EventBus::new(16));

    let entry = engine
        .review(
            SubjectRef::Observation(obs_id),
            ReviewDecision::Approved,
            Some("   ".to_string()),
            &reviewer(),
        )
        .await
        .unwrap();

    assert_eq!(entry.decision, ReviewDecision::Approved);
    assert_eq!(entry.comment, None);
    assert_eq!(entry.observation_id, Some(obs_id));
    assert_eq!(
        observations::get_status(&pool, obs_id).await.unwrap(),
        Some(ReviewStatus::Approved)
    );
}

#[tokio::test]
async fn rejecting_a_batch_logs_and_transitions_then_conflicts() {
    let (_dir, pool) = setup_db().await;
    let batch_id = seed_batch(&pool).await;
    let engine = ReviewEngine::new(pool.clone(), EventBus::new(16));

    let entry = engine
        .review(
            SubjectRef::Batch(batch_id),
            ReviewDecision::Rejected,
            Some("duplicate IDs".to_string()),
            &reviewer(),
        )
        .await
        .unwrap();

    // Structural batch reference, not a comment-text encoding
    assert_eq!(entry.batch_id, Some(batch_id));
    assert_eq!(entry.observation_id, None);
    assert_eq!(entry.comment.as_deref(), Some("duplicate IDs"));
    assert_eq!(
        batches::get_status(&pool, batch_id).await.unwrap(),
        Some(ReviewStatus::Rejected)
    );

    // A second attempt reports the existing decision
    let err = engine
        .review(
            SubjectRef::Batch(batch_id),
            ReviewDecision::Rejected,
            Some("still duplicated".to_string()),
            &reviewer(),
        )
        .await
        .unwrap_err();

    match err {
        ReviewError::Conflict {
            current,
            last_decision,
            ..
        } => {
            assert_eq!(current, ReviewStatus::Rejected);
            assert_eq!(last_decision, Some(ReviewDecision::Rejected));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // The refused second attempt appended nothing
    let entries = reviews::list_for_subject(&pool, SubjectRef::Batch(batch_id))
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn unknown_subject_is_not_found() {
    let (_dir, pool) = setup_db().await;
    let engine = ReviewEngine::new(pool.clone(), EventBus::new(16));

    let err = engine
        .review(
            SubjectRef::Observation(Uuid::new_v4()),
            ReviewDecision::Approved,
            None,
            &reviewer(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::NotFound { .. }));
}

#[tokio::test]
async fn audit_log_orders_newest_first() {
    let (_dir, pool) = setup_db().await;
    let first = seed_observation(&pool).await;
    let second = seed_observation(&pool).await;
    let engine = ReviewEngine::new(pool.clone(), EventBus::new(16));

    engine
        .review(
            SubjectRef::Observation(first),
            ReviewDecision::Approved,
            None,
            &reviewer(),
        )
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    engine
        .review(
            SubjectRef::Observation(second),
            ReviewDecision::Rejected,
            Some("stale snapshot".to_string()),
            &reviewer(),
        )
        .await
        .unwrap();

    let recent = reviews::list_recent(&pool, 10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].observation_id, Some(second));
    assert_eq!(recent[1].observation_id, Some(first));
    assert!(recent[0].created_at >= recent[1].created_at);
}
