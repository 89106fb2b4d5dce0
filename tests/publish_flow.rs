//! Integration tests for the publish/fetch orchestration.
//!
//! These drive the `Publisher` over the in-memory store, verifying the
//! run shape (one batch, one flush), the round-trip property, and the
//! URL scenarios.

use std::sync::Arc;

use regpages::core::types::ObjectKey;
use regpages::core::{PublishConfig, RawConfig};
use regpages::git::GitError;
use regpages::store::{FailOn, MockOperation, MockStore, StoreError};
use regpages::sync::{Publisher, UploadEntry};

fn config(custom_domain: Option<&str>) -> PublishConfig {
    PublishConfig::resolve(
        RawConfig {
            repository: Some("acme/site".into()),
            path_prefix: Some("reports".into()),
            custom_domain: custom_domain.map(str::to_string),
            ..RawConfig::default()
        },
        Some("tok".into()),
    )
    .unwrap()
}

fn publisher(custom_domain: Option<&str>) -> (Publisher, MockStore) {
    let store = MockStore::new();
    (
        Publisher::new(&config(custom_domain), Arc::new(store.clone())),
        store,
    )
}

fn entry(dir: &tempfile::TempDir, name: &str, key: &str, bytes: &[u8]) -> UploadEntry {
    let source = dir.path().join(name);
    std::fs::write(&source, bytes).unwrap();
    UploadEntry {
        source,
        key: ObjectKey::new(key).unwrap(),
    }
}

#[tokio::test]
async fn publish_then_fetch_round_trips_bytes() {
    let (publisher, _store) = publisher(None);
    let sources = tempfile::tempdir().unwrap();
    let item = entry(&sources, "sample.png", "build123/sample.png", b"pixel-data");

    let report = publisher.publish("build123", &[item]).await.unwrap();
    assert_eq!(report.uploaded, 1);
    assert_eq!(report.report_url, "https://acme.github.io/site/build123");

    let fetched_dir = tempfile::tempdir().unwrap();
    let results = publisher.fetch("build123", fetched_dir.path()).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(
        std::fs::read(fetched_dir.path().join("sample.png")).unwrap(),
        b"pixel-data"
    );
}

#[tokio::test]
async fn custom_domain_controls_the_report_url() {
    let (publisher, _store) = publisher(Some("regs.example.com"));
    let report = publisher.publish("build123", &[]).await.unwrap();
    assert_eq!(report.report_url, "https://regs.example.com/build123");
}

#[tokio::test]
async fn empty_publish_still_flushes_a_commit() {
    let (publisher, store) = publisher(None);
    publisher.publish("build123", &[]).await.unwrap();

    assert_eq!(store.commits(), vec!["build123".to_string()]);
    assert_eq!(
        store.operations(),
        vec![
            MockOperation::BeginBatch,
            MockOperation::CommitBatch {
                label: "build123".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn one_publish_is_one_batch_flush() {
    let (publisher, store) = publisher(None);
    let sources = tempfile::tempdir().unwrap();
    let items = vec![
        entry(&sources, "a.png", "b1/a.png", b"a"),
        entry(&sources, "b.png", "b1/b.png", b"b"),
        entry(&sources, "c.png", "b1/c.png", b"c"),
    ];

    publisher.publish("b1", &items).await.unwrap();

    let operations = store.operations();
    assert_eq!(operations.first(), Some(&MockOperation::BeginBatch));
    let commits = operations
        .iter()
        .filter(|op| matches!(op, MockOperation::CommitBatch { .. }))
        .count();
    assert_eq!(commits, 1);
    assert_eq!(operations.len(), 5); // begin + 3 uploads + commit
}

#[tokio::test]
async fn repeated_publishes_with_disjoint_keys_accumulate() {
    let (publisher, store) = publisher(None);
    let sources = tempfile::tempdir().unwrap();

    let first = entry(&sources, "a.png", "build123/a.png", b"a");
    publisher.publish("build123", &[first]).await.unwrap();

    let second = entry(&sources, "b.png", "build123/b.png", b"b");
    publisher.publish("build123", &[second]).await.unwrap();

    assert_eq!(store.commits().len(), 2);
    assert_eq!(
        store.committed_keys(),
        vec![
            ObjectKey::new("build123/a.png").unwrap(),
            ObjectKey::new("build123/b.png").unwrap(),
        ]
    );
}

#[tokio::test]
async fn fetch_of_an_absent_label_is_empty_not_an_error() {
    let (publisher, _store) = publisher(None);
    let dir = tempfile::tempdir().unwrap();
    let results = publisher.fetch("never-published", dir.path()).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn fetch_preserves_paths_below_the_label() {
    let (publisher, store) = publisher(None);
    store.insert_object(
        ObjectKey::new("build123/dir_a/sample01.png").unwrap(),
        b"nested".to_vec(),
    );

    let dir = tempfile::tempdir().unwrap();
    publisher.fetch("build123", dir.path()).await.unwrap();

    assert_eq!(
        std::fs::read(dir.path().join("dir_a/sample01.png")).unwrap(),
        b"nested"
    );
}

#[tokio::test]
async fn rejected_push_fails_the_run_and_leaves_the_store_unchanged() {
    let (publisher, store) = publisher(None);
    store.insert_object(ObjectKey::new("older/kept.png").unwrap(), b"old".to_vec());
    store.set_fail_on(FailOn::CommitBatch(StoreError::Git(
        GitError::PushRejected {
            branch: "gh-pages".into(),
            reason: "non-fast-forward".into(),
        },
    )));

    let sources = tempfile::tempdir().unwrap();
    let item = entry(&sources, "late.png", "build9/late.png", b"late");
    let err = publisher.publish("build9", &[item]).await.unwrap_err();
    assert!(err.to_string().contains("rejected"));

    // Nothing from the failed batch landed.
    assert_eq!(
        store.committed_keys(),
        vec![ObjectKey::new("older/kept.png").unwrap()]
    );
    assert!(store.commits().is_empty());
}

#[tokio::test]
async fn upload_failure_aborts_before_any_flush() {
    let (publisher, store) = publisher(None);
    store.set_fail_on(FailOn::Upload(StoreError::Other("disk full".into())));

    let sources = tempfile::tempdir().unwrap();
    let item = entry(&sources, "a.png", "b1/a.png", b"a");
    publisher.publish("b1", &[item]).await.unwrap_err();

    let flushed = store
        .operations()
        .iter()
        .any(|op| matches!(op, MockOperation::CommitBatch { .. }));
    assert!(!flushed);
    assert!(store.commits().is_empty());
}
