//! End-to-end ingestion tests over SQLite and the in-process document store.

mod common;

use serde_json::json;

use common::{device_record, harness};
use strata_persistence::core::{DocumentBackend, RelationalBackend};
use strata_persistence::types::{Placement, PlacementReason, SemanticType};

// ============================================================================
// Placement
// ============================================================================

#[tokio::test]
async fn test_email_in_95_percent_of_records_is_relational() {
    let h = harness().await;

    let mut last_key = String::new();
    for i in 0..1000 {
        let mut record = json!({"username": format!("user{}", i)});
        if i % 20 != 0 {
            record["email"] = json!(format!("user{}@example.com", i));
        }
        last_key = h.pipeline.ingest_record(record).await.unwrap().sys_ingested_at;
    }

    let email = h.pipeline.field("email").unwrap();
    assert_eq!(email.appearances, 950);
    assert_eq!(email.frequency, 95.0);
    assert_eq!(email.type_stability, 100.0);
    assert_eq!(email.dominant_type, SemanticType::Email);
    assert_eq!(email.placement, Placement::Relational);
    assert_eq!(email.reason, PlacementReason::HighFrequencyStableType);
    assert!(!email.is_unique);

    let columns = h.relational.columns().await.unwrap();
    assert_eq!(columns.iter().filter(|c| c.name == "email").count(), 1);
    assert_eq!(h.relational.count().await.unwrap(), 1000);

    let row = h.relational.fetch_row(&last_key).await.unwrap().unwrap();
    assert_eq!(row["email"], json!("user999@example.com"));
}

#[tokio::test]
async fn test_type_drift_keeps_field_in_documents() {
    let h = harness().await;
    for i in 0..20 {
        let reading = if i % 2 == 0 {
            json!(i)
        } else {
            json!(format!("r{}", i))
        };
        h.pipeline
            .ingest_record(json!({"username": "probe", "reading": reading}))
            .await
            .unwrap();
    }

    let reading = h.pipeline.field("reading").unwrap();
    assert_eq!(reading.frequency, 100.0);
    assert_eq!(reading.type_stability, 50.0);
    assert_eq!(reading.dominant_type, SemanticType::Integer);
    assert_eq!(reading.placement, Placement::Document);
    assert_eq!(reading.reason, PlacementReason::TypeDrifting);

    let columns = h.relational.columns().await.unwrap();
    assert!(!columns.iter().any(|c| c.name == "reading"));
}

#[tokio::test]
async fn test_mandatory_fields_are_always_in_both() {
    let h = harness().await;
    let report = h
        .pipeline
        .ingest_record(json!({"username": "a", "t_stamp": "2024-01-01T00:00:00Z"}))
        .await
        .unwrap();

    let split = &report.outcome.split;
    for field in ["username", "t_stamp", "sys_ingested_at"] {
        assert!(split.relational.contains_key(field), "{} in relational", field);
        assert!(split.document.contains_key(field), "{} in document", field);
    }

    let summary = h.pipeline.placement_summary();
    assert_eq!(summary.both, vec!["sys_ingested_at", "t_stamp", "username"]);
}

// ============================================================================
// Normalization
// ============================================================================

#[tokio::test]
async fn test_key_variants_converge_on_one_field() {
    let h = harness().await;
    let records = [
        json!({"userName": "a", "IPAddress": "10.0.0.1"}),
        json!({"user_name": "b", "ip_addr": "10.0.0.2"}),
        json!({"USER-NAME": "c", "ip": "10.0.0.3"}),
    ];
    for record in records {
        h.pipeline.ingest_record(record).await.unwrap();
    }

    let names: Vec<String> = h
        .pipeline
        .field_report()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, vec!["ip_address", "sys_ingested_at", "t_stamp", "username"]);

    let ip = h.pipeline.field("ip_address").unwrap();
    assert_eq!(ip.appearances, 3);
    assert_eq!(ip.dominant_type, SemanticType::IpAddress);

    let rules = h.pipeline.metadata().normalization_rules();
    assert_eq!(rules.get("userName").map(String::as_str), Some("username"));
    assert_eq!(rules.get("USER-NAME").map(String::as_str), Some("username"));
    assert_eq!(rules.get("IPAddress").map(String::as_str), Some("ip_address"));
}

// ============================================================================
// Schema evolution
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingestion_adds_each_column_once() {
    let h = harness().await;

    let mut handles = Vec::new();
    for task in 0..8 {
        let pipeline = h.pipeline.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..25 {
                pipeline
                    .ingest_record(device_record(task * 25 + i))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(h.relational.count().await.unwrap(), 200);
    let columns = h.relational.columns().await.unwrap();
    for name in ["battery", "network"] {
        assert_eq!(columns.iter().filter(|c| c.name == name).count(), 1);
    }

    let stats = h.pipeline.pipeline_stats();
    assert_eq!(stats.accepted, 200);
    assert_eq!(stats.relational_inserts, 200);
    assert_eq!(stats.columns_added, 2);
    assert_eq!(h.pipeline.metadata().total_records_seen(), 200);
}

#[tokio::test]
async fn test_conflicting_value_is_stored_as_text() {
    let h = harness().await;
    let mut first_key = String::new();
    for i in 0..15 {
        let report = h
            .pipeline
            .ingest_record(json!({"username": "a", "battery": 80}))
            .await
            .unwrap();
        if i == 0 {
            first_key = report.sys_ingested_at;
        }
    }

    let report = h
        .pipeline
        .ingest_record(json!({"username": "a", "battery": "low"}))
        .await
        .unwrap();
    assert!(report.outcome.relational.is_written());

    let battery = h.pipeline.field("battery").unwrap();
    assert_eq!(battery.type_stability, 93.75);
    assert_eq!(battery.placement, Placement::Relational);

    let row = h
        .relational
        .fetch_row(&report.sys_ingested_at)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row["battery"], json!("low"));

    // Earlier records were written to the document side while the field
    // was still warming up.
    let first = h.pipeline.fetch_joined(&first_key).await.unwrap();
    assert_eq!(first.document.unwrap()["battery"], json!(80));
}

#[tokio::test]
async fn test_numeric_looking_text_keeps_its_exact_value() {
    let h = harness().await;
    for _ in 0..12 {
        h.pipeline
            .ingest_record(json!({"username": "a", "code": 7, "active": true}))
            .await
            .unwrap();
    }
    assert_eq!(h.pipeline.field("code").unwrap().placement, Placement::Relational);
    assert_eq!(h.pipeline.field("active").unwrap().placement, Placement::Relational);

    let report = h
        .pipeline
        .ingest_record(json!({"username": "a", "code": "007", "active": "1"}))
        .await
        .unwrap();
    assert!(report.outcome.relational.is_written());

    let joined = h.pipeline.fetch_joined(&report.sys_ingested_at).await.unwrap();
    let merged = joined.merged();
    assert_eq!(merged["code"], json!("007"));
    assert_eq!(merged["active"], json!("1"));
}

#[tokio::test]
async fn test_unique_identifier_is_enforced_once_promoted() {
    let h = harness().await;
    let sessions: Vec<String> = (0..20).map(|_| uuid::Uuid::new_v4().to_string()).collect();
    for session in &sessions {
        h.pipeline
            .ingest_record(json!({"username": "a", "sessionId": session}))
            .await
            .unwrap();
    }

    let session = h.pipeline.field("session_id").unwrap();
    assert!(session.is_unique);
    assert!(session.should_index);
    assert_eq!(session.placement, Placement::Relational);

    let report = h
        .pipeline
        .ingest_record(json!({"username": "b", "session_id": sessions[15]}))
        .await
        .unwrap();
    assert!(report.outcome.relational.is_failed());
    assert!(report.outcome.document.is_written());
    assert_eq!(h.pipeline.pipeline_stats().relational_failures, 1);
}

// ============================================================================
// Join
// ============================================================================

#[tokio::test]
async fn test_nested_values_rejoin_by_ingestion_timestamp() {
    let h = harness().await;
    let report = h
        .pipeline
        .ingest_record(json!({
            "username": "alice",
            "payload": {"steps": [1, 2, 3]},
        }))
        .await
        .unwrap();

    let joined = h.pipeline.fetch_joined(&report.sys_ingested_at).await.unwrap();
    let relational = joined.relational.as_ref().unwrap();
    assert_eq!(relational["username"], json!("alice"));
    assert!(!relational.contains_key("payload"));

    let merged = joined.merged();
    assert_eq!(merged["payload"], json!({"steps": [1, 2, 3]}));
    assert_eq!(merged["sys_ingested_at"], json!(report.sys_ingested_at));

    assert_eq!(h.documents.count().await.unwrap(), 1);
    assert!(h.pipeline.fetch_joined("1999-01-01T00:00:00.000000Z").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_records_leave_no_trace() {
    let h = harness().await;
    let batch = h
        .pipeline
        .ingest_batch(vec![
            json!({"email": "orphan@example.com"}),
            json!(42),
            json!({"username": null}),
        ])
        .await;
    assert_eq!(batch.malformed, 3);
    assert_eq!(batch.accepted, 0);

    assert_eq!(h.relational.count().await.unwrap(), 0);
    assert_eq!(h.documents.count().await.unwrap(), 0);
    assert!(h.pipeline.field("email").is_none());
    assert_eq!(h.pipeline.metadata().total_records_seen(), 0);
}
