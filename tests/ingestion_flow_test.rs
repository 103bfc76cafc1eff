//! End-to-end ingestion scenarios over the in-memory backends

use chrono::{DateTime, TimeZone, Utc};
use fake::faker::filesystem::en::FileName;
use fake::Fake;
use sluice::adapters::memory::{
    MemoryBlobStore, MemoryPublisher, MemoryRecordStore, MemoryTable, MemoryTableStore,
};
use sluice::adapters::BlobStore;
use sluice::core::clock::{Clock, ManualClock};
use sluice::core::ingest::{
    create_strategy, IngestOutcome, IngestSettings, IngestionOrchestrator, LoadStrategyKind,
};
use sluice::core::ledger::{StatusLedger, DEFAULT_COLLECTION};
use sluice::core::notify::{topic_path, Notifier};
use sluice::domain::{BlobUri, BucketName, FileId, SluiceError, TableTarget, FILE_NAME_ATTRIBUTE};
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;

const CSV: &str = "hash,size,stripped_size,weight,number,version,merkle_root,timestamp,timestamp_month,nonce,bits,coinbase_param,transaction_count\n\
00ab,285,285,1140,0,1,4a5e,1231006505,2009-01-01,2083236893,1d00ffff,04ff,1\n\
00cd,215,215,860,1,1,0e3e,1231469665,2009-01-01,2573394689,1d00ffff,0401,1\n";

fn success_topic() -> String {
    topic_path("devshell-1", "ingest-success")
}

fn error_topic() -> String {
    topic_path("devshell-1", "ingest-errors")
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 2, 6, 30, 0).unwrap()
}

struct Pipeline {
    blobs: Arc<MemoryBlobStore>,
    tables: Arc<MemoryTableStore>,
    records: Arc<MemoryRecordStore>,
    publisher: Arc<MemoryPublisher>,
    clock: Arc<ManualClock>,
    orchestrator: IngestionOrchestrator,
}

fn pipeline(kind: LoadStrategyKind) -> Pipeline {
    let blobs = Arc::new(MemoryBlobStore::new());
    let tables = Arc::new(MemoryTableStore::with_blobs(blobs.clone()));
    let records = Arc::new(MemoryRecordStore::new());
    let publisher = Arc::new(MemoryPublisher::new());
    let clock = Arc::new(ManualClock::new(t0()));

    let orchestrator = IngestionOrchestrator::new(
        StatusLedger::new(records.clone(), DEFAULT_COLLECTION),
        create_strategy(kind, blobs.clone(), tables.clone(), Duration::from_secs(5)),
        Notifier::new(publisher.clone(), success_topic(), error_topic()),
        IngestSettings {
            dataset: "chain".to_string(),
            table_prefix: "dc".to_string(),
        },
        clock.clone(),
    );

    Pipeline {
        blobs,
        tables,
        records,
        publisher,
        clock,
        orchestrator,
    }
}

impl Pipeline {
    fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

fn bucket() -> BucketName {
    BucketName::new("bkt").unwrap()
}

fn file(name: &str) -> FileId {
    FileId::new(name).unwrap()
}

#[tokio::test]
async fn test_new_file_is_recorded_and_announced() {
    let p = pipeline(LoadStrategyKind::ExternalTable);
    let file_id = file("a.csv");

    let outcome = p.orchestrator.ingest(&bucket(), &file_id).await.unwrap();

    let IngestOutcome::Loaded(report) = outcome else {
        panic!("expected a load, got {outcome:?}");
    };
    assert_eq!(report.target.to_string(), "chain.dc_20240402063000");
    assert_eq!(
        p.tables.table(&report.target),
        Some(MemoryTable::External {
            source: BlobUri::parse("gs://bkt/a.csv").unwrap()
        })
    );

    let record = p.orchestrator.ledger().get(&file_id).await.unwrap().unwrap();
    assert_eq!(record.success, Some(true));
    assert_eq!(record.when, Some(t0()));
    assert!(record.error_message.is_none());
    assert!(record.duplication_attempts.is_empty());
    assert_eq!(p.records.write_count(), 1);

    let messages = p.publisher.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].topic, success_topic());
    assert_eq!(
        messages[0].data,
        "File 'a.csv' streamed into chain.dc_20240402063000"
    );
    assert_eq!(
        messages[0].attributes.get(FILE_NAME_ATTRIBUTE).map(String::as_str),
        Some("a.csv")
    );
}

#[tokio::test]
async fn test_redelivery_after_success_only_records_the_attempt() {
    let p = pipeline(LoadStrategyKind::ExternalTable);
    let file_id = file("a.csv");
    p.orchestrator.ingest(&bucket(), &file_id).await.unwrap();
    let loads_before = p.tables.calls().len();

    p.clock.advance(Duration::from_secs(90));
    let t2 = p.clock_now();
    let outcome = p.orchestrator.ingest(&bucket(), &file_id).await.unwrap();

    assert_eq!(outcome, IngestOutcome::Duplicate);
    assert_eq!(p.tables.calls().len(), loads_before);
    assert_eq!(p.publisher.messages().len(), 1);

    let record = p.orchestrator.ledger().get(&file_id).await.unwrap().unwrap();
    assert_eq!(record.success, Some(true));
    assert_eq!(record.when, Some(t0()));
    assert_eq!(record.duplication_attempts, vec![t2]);
}

#[tokio::test]
async fn test_duplicate_attempts_are_newest_first() {
    let p = pipeline(LoadStrategyKind::ExternalTable);
    let file_id = file("a.csv");
    p.orchestrator.ingest(&bucket(), &file_id).await.unwrap();

    p.clock.advance(Duration::from_secs(60));
    let first = p.clock_now();
    p.orchestrator.ingest(&bucket(), &file_id).await.unwrap();

    p.clock.advance(Duration::from_secs(60));
    let second = p.clock_now();
    p.orchestrator.ingest(&bucket(), &file_id).await.unwrap();

    let record = p.orchestrator.ledger().get(&file_id).await.unwrap().unwrap();
    assert_eq!(record.duplication_attempts, vec![second, first]);
    assert_eq!(p.tables.table_count(), 1);
}

#[tokio::test]
async fn test_load_failure_is_recorded_and_published_with_the_same_message() {
    let p = pipeline(LoadStrategyKind::ExternalTable);
    p.tables.fail_with("quota exceeded");
    let file_id = file("a.csv");

    let outcome = p.orchestrator.ingest(&bucket(), &file_id).await.unwrap();

    let IngestOutcome::Failed { message } = outcome else {
        panic!("expected a failure, got {outcome:?}");
    };
    assert!(message.starts_with("Error ingesting file 'a.csv'. Cause: "));
    assert!(message.contains("quota exceeded"));

    let record = p.orchestrator.ledger().get(&file_id).await.unwrap().unwrap();
    assert_eq!(record.success, Some(false));
    assert_eq!(record.error_message.as_deref(), Some(message.as_str()));

    let messages = p.publisher.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].topic, error_topic());
    assert_eq!(messages[0].data, message);
}

#[tokio::test]
async fn test_failed_file_is_retried_and_overwritten() {
    let p = pipeline(LoadStrategyKind::ExternalTable);
    let file_id = file("a.csv");
    p.tables.fail_with("backend unavailable");
    p.orchestrator.ingest(&bucket(), &file_id).await.unwrap();

    let mut recovered = pipeline(LoadStrategyKind::ExternalTable);
    // Same ledger, healthy tables
    recovered.orchestrator = IngestionOrchestrator::new(
        StatusLedger::new(p.records.clone(), DEFAULT_COLLECTION),
        create_strategy(
            LoadStrategyKind::ExternalTable,
            recovered.blobs.clone(),
            recovered.tables.clone(),
            Duration::from_secs(5),
        ),
        Notifier::new(recovered.publisher.clone(), success_topic(), error_topic()),
        IngestSettings {
            dataset: "chain".to_string(),
            table_prefix: "dc".to_string(),
        },
        recovered.clock.clone(),
    );

    recovered.clock.advance(Duration::from_secs(3600));
    let outcome = recovered.orchestrator.ingest(&bucket(), &file_id).await.unwrap();
    assert!(matches!(outcome, IngestOutcome::Loaded(_)));

    let record = recovered.orchestrator.ledger().get(&file_id).await.unwrap().unwrap();
    assert_eq!(record.success, Some(true));
    assert!(record.error_message.is_none());
    assert_eq!(recovered.publisher.messages_on(&success_topic()).len(), 1);
}

#[tokio::test]
async fn test_bulk_load_counts_rows_after_header() {
    let p = pipeline(LoadStrategyKind::BulkLoad);
    let file_id = file("blocks.csv");
    p.blobs.put(BlobUri::new(bucket(), file_id.clone()), CSV);

    let outcome = p.orchestrator.ingest(&bucket(), &file_id).await.unwrap();

    let IngestOutcome::Loaded(report) = outcome else {
        panic!("expected a load, got {outcome:?}");
    };
    assert_eq!(report.rows, Some(2));
    assert!(matches!(
        p.tables.table(&report.target),
        Some(MemoryTable::Loaded { rows: 2, .. })
    ));
}

#[tokio::test]
async fn test_bulk_load_of_missing_file_fails_without_creating_a_table() {
    let p = pipeline(LoadStrategyKind::BulkLoad);
    let file_id = file("missing.csv");

    let outcome = p.orchestrator.ingest(&bucket(), &file_id).await.unwrap();

    assert!(matches!(outcome, IngestOutcome::Failed { .. }));
    assert_eq!(p.tables.table_count(), 0);
    assert_eq!(p.publisher.messages_on(&error_topic()).len(), 1);
}

#[tokio::test]
async fn test_streaming_insert_appends_to_base_table() {
    let p = pipeline(LoadStrategyKind::StreamingInsert);
    let file_id = file("block-0.json");
    p.blobs.put(
        BlobUri::new(bucket(), file_id.clone()),
        r#"{"hash": "00ab", "number": "0", "transaction_count": "1"}"#,
    );

    let outcome = p.orchestrator.ingest(&bucket(), &file_id).await.unwrap();

    let IngestOutcome::Loaded(report) = outcome else {
        panic!("expected a load, got {outcome:?}");
    };
    assert_eq!(report.target, TableTarget::base("chain", "dc"));
    match p.tables.table(&report.target) {
        Some(MemoryTable::Streaming { rows }) => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].row_id, "block-0.json");
        }
        other => panic!("expected a streaming table, got {other:?}"),
    }
}

#[tokio::test]
async fn test_streaming_row_errors_become_a_recorded_failure() {
    let p = pipeline(LoadStrategyKind::StreamingInsert);
    let file_id = file("block-1.json");
    p.blobs.put(
        BlobUri::new(bucket(), file_id.clone()),
        r#"{"hash": "00cd", "difficulty": "1"}"#,
    );

    let outcome = p.orchestrator.ingest(&bucket(), &file_id).await.unwrap();

    let IngestOutcome::Failed { message } = outcome else {
        panic!("expected a failure, got {outcome:?}");
    };
    assert!(message.contains("no such field: difficulty"));
    let record = p.orchestrator.ledger().get(&file_id).await.unwrap().unwrap();
    assert_eq!(record.success, Some(false));
}

#[test_case(LoadStrategyKind::ExternalTable ; "external table")]
#[test_case(LoadStrategyKind::BulkLoad ; "bulk load")]
#[test_case(LoadStrategyKind::StreamingInsert ; "streaming insert")]
#[tokio::test]
async fn test_ledger_outage_stops_before_loading(kind: LoadStrategyKind) {
    let p = pipeline(kind);
    p.records.fail_with("connection reset");

    let result = p.orchestrator.ingest(&bucket(), &file("a.csv")).await;

    assert!(matches!(result, Err(SluiceError::StoreUnavailable(_))));
    assert!(p.tables.calls().is_empty());
    assert!(p.publisher.messages().is_empty());
}

#[tokio::test]
async fn test_publish_failure_surfaces_after_the_ledger_write() {
    let p = pipeline(LoadStrategyKind::ExternalTable);
    p.publisher.fail_with("topic not found");
    let file_id = file("a.csv");

    let result = p.orchestrator.ingest(&bucket(), &file_id).await;

    assert!(matches!(result, Err(SluiceError::Publish(_))));
    let record = p.orchestrator.ledger().get(&file_id).await.unwrap().unwrap();
    assert_eq!(record.success, Some(true));
}

#[tokio::test]
async fn test_every_new_file_gets_one_write_and_one_publish() {
    let p = pipeline(LoadStrategyKind::ExternalTable);

    let mut names: Vec<String> = (0..8).map(|_| FileName().fake()).collect();
    names.sort();
    names.dedup();

    for name in &names {
        p.clock.advance(Duration::from_secs(1));
        let outcome = p.orchestrator.ingest(&bucket(), &file(name)).await.unwrap();
        assert!(matches!(outcome, IngestOutcome::Loaded(_)));
    }

    assert_eq!(p.records.write_count(), names.len());
    assert_eq!(p.publisher.messages_on(&success_topic()).len(), names.len());
    assert_eq!(p.tables.table_count(), names.len());
}

#[tokio::test]
async fn test_blob_store_is_untouched_by_external_tables() {
    let p = pipeline(LoadStrategyKind::ExternalTable);
    let uri = BlobUri::new(bucket(), file("a.csv"));
    p.blobs.put(uri.clone(), CSV);

    p.orchestrator.ingest(&bucket(), &file("a.csv")).await.unwrap();

    assert!(p.blobs.head(&uri).await.unwrap().is_some());
}
