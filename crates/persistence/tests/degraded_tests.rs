//! Writer behavior while the document backend is missing or failing.

mod common;

use serde_json::json;

use common::HarnessBuilder;
use strata_persistence::config::HealthConfig;
use strata_persistence::core::{DocumentBackend, RelationalBackend};
use strata_persistence::writer::WriteStatus;

fn eager_health() -> HealthConfig {
    HealthConfig {
        failure_threshold: 1,
        success_threshold: 1,
        probe_every: 2,
    }
}

#[tokio::test]
async fn test_without_document_backend_everything_is_relational() {
    let h = HarnessBuilder::new().without_documents().build().await;
    let report = h
        .pipeline
        .ingest_record(json!({"username": "a", "tags": ["x", "y"]}))
        .await
        .unwrap();

    let outcome = &report.outcome;
    assert!(outcome.degraded);
    assert!(outcome.relational.is_written());
    assert_eq!(outcome.document, WriteStatus::Skipped);
    assert!(outcome.split.document.is_empty());

    let row = h
        .relational
        .fetch_row(&report.sys_ingested_at)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row["tags"], json!(r#"["x","y"]"#));
    assert_eq!(h.pipeline.pipeline_stats().degraded_records, 1);
}

#[tokio::test]
async fn test_offline_store_degrades_then_recovers_on_probe() {
    let h = HarnessBuilder::new()
        .health(eager_health())
        .documents_offline()
        .build()
        .await;
    assert!(!h.pipeline.writer().document_available());

    let degraded = h
        .pipeline
        .ingest_record(json!({"username": "a", "tags": ["x"]}))
        .await
        .unwrap();
    assert!(degraded.outcome.degraded);
    assert_eq!(degraded.outcome.split.relational["tags"], json!(r#"["x"]"#));

    h.documents.set_offline(false);

    // Second write is the probe: the backend answers and takes the record.
    let recovered = h
        .pipeline
        .ingest_record(json!({"username": "a", "tags": ["y"]}))
        .await
        .unwrap();
    assert!(!recovered.outcome.degraded);
    assert!(recovered.outcome.document.is_written());
    assert!(!recovered.outcome.split.relational.contains_key("tags"));
    assert!(h.pipeline.writer().document_available());

    h.documents.set_offline(false);
    let joined = h
        .pipeline
        .fetch_joined(&recovered.sys_ingested_at)
        .await
        .unwrap();
    assert_eq!(joined.merged()["tags"], json!(["y"]));
    assert_eq!(h.documents.count().await.unwrap(), 1);
    assert_eq!(h.relational.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_repeated_document_failures_switch_to_relational_only() {
    let h = HarnessBuilder::new()
        .health(HealthConfig {
            failure_threshold: 2,
            success_threshold: 1,
            probe_every: 100,
        })
        .build()
        .await;
    h.documents.set_offline(true);

    for _ in 0..2 {
        let report = h
            .pipeline
            .ingest_record(json!({"username": "a", "tags": ["x"]}))
            .await
            .unwrap();
        assert!(report.outcome.document.is_failed());
        assert!(report.outcome.relational.is_written());
        assert!(report.outcome.degraded);
        assert_eq!(report.outcome.split.relational["tags"], json!(r#"["x"]"#));
    }

    let report = h
        .pipeline
        .ingest_record(json!({"username": "a", "tags": ["x"]}))
        .await
        .unwrap();
    assert!(report.outcome.degraded);
    assert_eq!(report.outcome.document, WriteStatus::Skipped);

    let stats = h.pipeline.pipeline_stats();
    assert_eq!(stats.document_failures, 2);
    assert_eq!(stats.degraded_records, 3);
    assert_eq!(stats.relational_inserts, 3);
}

#[tokio::test]
async fn test_failed_document_write_keeps_document_fields() {
    let h = HarnessBuilder::new()
        .health(HealthConfig {
            failure_threshold: 5,
            success_threshold: 1,
            probe_every: 100,
        })
        .build()
        .await;
    h.documents.set_offline(true);

    let report = h
        .pipeline
        .ingest_record(json!({"username": "a", "tags": ["x"], "meta": {"k": 1}}))
        .await
        .unwrap();
    assert!(report.outcome.document.is_failed());
    assert!(report.outcome.relational.is_written());
    assert!(report.outcome.degraded);
    assert!(h.pipeline.writer().document_available());

    h.documents.set_offline(false);
    let joined = h
        .pipeline
        .fetch_joined(&report.sys_ingested_at)
        .await
        .unwrap();
    assert!(joined.document.is_none());
    let merged = joined.merged();
    assert_eq!(merged["username"], json!("a"));
    assert_eq!(merged["tags"], json!(r#"["x"]"#));
    assert_eq!(merged["meta"], json!(r#"{"k":1}"#));
    assert_eq!(h.documents.count().await.unwrap(), 0);
}
