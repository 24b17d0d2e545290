use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::TryStreamExt;

use blobmove_core::engine::{TransferEngine, TransferStatus};
use blobmove_core::errors::{ActivityError, ActivityResult};
use blobmove_core::memory::MemoryStore;
use blobmove_core::store::{ByteStream, ObjectRef, SourceStore};

fn stores() -> (Arc<MemoryStore>, Arc<MemoryStore>) {
    (
        Arc::new(MemoryStore::new("landing")),
        Arc::new(MemoryStore::new("lake")),
    )
}

#[tokio::test]
async fn copies_objects_and_preserves_relative_names() -> Result<()> {
    let (source, destination) = stores();
    source.insert("src/a.txt", "alpha");
    source.insert("src/b/c.txt", "nested");

    let engine = TransferEngine::new(source.clone(), destination.clone());
    let result = engine.copy_all("src", "dst").await?;

    assert_eq!(result.total, 2);
    assert_eq!(result.succeeded, 2);
    assert_eq!(result.failed, 0);
    assert_eq!(result.succeeded + result.failed, result.outcomes.len());
    assert_eq!(destination.get("dst/a.txt").unwrap(), "alpha");
    assert_eq!(destination.get("dst/b/c.txt").unwrap(), "nested");
    assert_eq!(result.bytes_copied, 11);
    Ok(())
}

#[tokio::test]
async fn empty_prefix_is_a_successful_empty_run() -> Result<()> {
    let (source, destination) = stores();

    let engine = TransferEngine::new(source, destination);
    let result = engine.copy_all("nothing/here", "dst").await?;

    assert_eq!(result.total, 0);
    assert!(result.outcomes.is_empty());
    assert_eq!(result.succeeded + result.failed, result.total);
    Ok(())
}

#[tokio::test]
async fn mid_read_failure_does_not_abort_the_batch() -> Result<()> {
    let (source, destination) = stores();
    source.insert("in/a.txt", "first");
    source.insert("in/b.txt", "second");
    source.insert("in/c.txt", "third");
    source.fail_next_read("in/b.txt");

    let engine = TransferEngine::new(source.clone(), destination.clone());
    let result = engine.copy_all("in", "out").await?;

    assert_eq!(result.total, 3);
    assert_eq!(result.succeeded, 2);
    assert_eq!(result.failed, 1);

    let failed: Vec<_> = result
        .outcomes
        .iter()
        .filter(|o| !o.succeeded())
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].task.source.path, "in/b.txt");

    // Later objects still landed.
    assert_eq!(destination.get("out/a.txt").unwrap(), "first");
    assert_eq!(destination.get("out/c.txt").unwrap(), "third");
    assert!(destination.get("out/b.txt").is_none());
    Ok(())
}

#[tokio::test]
async fn object_vanishing_after_listing_reads_as_not_found() -> Result<()> {
    let (source, _) = stores();
    source.insert("in/a.txt", "keep");
    source.insert("in/gone.txt", "doomed");

    let objects = source.list("in").await?;
    let stale = objects
        .iter()
        .find(|o| o.path == "in/gone.txt")
        .unwrap()
        .clone();
    source.delete_prefix("in/gone.txt").await?;

    let err = source.open_read_stream(&stale).await.map(|_| ()).unwrap_err();
    assert!(matches!(err, ActivityError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn prefix_matching_an_object_copies_to_destination_prefix_unchanged() -> Result<()> {
    let (source, destination) = stores();
    source.insert("in/report.csv", "totals");

    let engine = TransferEngine::new(source, destination.clone());
    let result = engine.copy_all("in/report.csv", "out/report.csv").await?;

    assert_eq!(result.total, 1);
    assert_eq!(result.outcomes[0].task.destination_path, "out/report.csv");
    assert_eq!(destination.get("out/report.csv").unwrap(), "totals");
    Ok(())
}

#[tokio::test]
async fn round_trip_preserves_bytes_exactly() -> Result<()> {
    let store = Arc::new(MemoryStore::new("echo"));
    let payload: ByteStream = Box::pin(futures::stream::once(async {
        Ok(bytes::Bytes::from_static(b"hello"))
    }));

    use blobmove_core::store::DestinationStore;
    let written = store.write_stream("echo/sample.txt", payload).await?;
    assert_eq!(written, 5);

    let objects = store.list("echo").await?;
    assert_eq!(objects.len(), 1);
    let stream = store.open_read_stream(&objects[0]).await?;
    let chunks: Vec<bytes::Bytes> = stream.try_collect().await?;
    let body: Vec<u8> = chunks.concat();
    assert_eq!(body, b"hello");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_run_keeps_one_outcome_per_object() -> Result<()> {
    let source = Arc::new(MemoryStore::new("landing").with_latency(Duration::from_millis(3)));
    let destination = Arc::new(MemoryStore::new("lake").with_latency(Duration::from_millis(3)));
    for i in 0..24 {
        source.insert(format!("in/obj-{i:02}.bin"), format!("payload {i}"));
    }
    source.fail_next_read("in/obj-07.bin");

    let engine = TransferEngine::new(source.clone(), destination.clone()).with_parallelism(8);
    let result = engine.copy_all("in", "out").await?;

    assert_eq!(result.total, 24);
    assert_eq!(result.outcomes.len(), 24);
    assert_eq!(result.succeeded + result.failed, result.total);
    assert_eq!(result.failed, 1);

    // No dropped or duplicated outcomes, and order matches enumeration.
    let paths: Vec<&str> = result
        .outcomes
        .iter()
        .map(|o| o.task.source.path.as_str())
        .collect();
    let mut sorted = paths.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 24);
    assert_eq!(paths, sorted, "outcomes should stay in enumeration order");
    Ok(())
}

struct DeadSource;

#[async_trait::async_trait]
impl SourceStore for DeadSource {
    async fn list(&self, _prefix: &str) -> ActivityResult<Vec<ObjectRef>> {
        Err(ActivityError::connection("container unreachable"))
    }

    async fn open_read_stream(&self, _object: &ObjectRef) -> ActivityResult<ByteStream> {
        Err(ActivityError::connection("container unreachable"))
    }

    async fn delete_prefix(&self, _prefix: &str) -> ActivityResult<u64> {
        Err(ActivityError::connection("container unreachable"))
    }
}

#[tokio::test]
async fn listing_failure_fails_the_whole_run() {
    let destination = Arc::new(MemoryStore::new("lake"));
    let engine = TransferEngine::new(Arc::new(DeadSource), destination);

    let err = engine.copy_all("in", "out").await.unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, ActivityError::Connection(_)));
}

#[tokio::test]
async fn write_rejection_is_recorded_per_item() -> Result<()> {
    let (source, _) = stores();
    source.insert("in/a.txt", "ok");
    source.insert("in/b.txt", "ok too");

    struct RejectingDestination;

    #[async_trait::async_trait]
    impl blobmove_core::store::DestinationStore for RejectingDestination {
        async fn write_stream(&self, path: &str, _stream: ByteStream) -> ActivityResult<u64> {
            Err(ActivityError::write(format!("{path}: quota exceeded")))
        }

        async fn exists(&self, _path: &str) -> ActivityResult<bool> {
            Ok(false)
        }

        async fn delete(&self, _path: &str) -> ActivityResult<()> {
            Ok(())
        }
    }

    let engine = TransferEngine::new(source, Arc::new(RejectingDestination));
    let result = engine.copy_all("in", "out").await?;

    assert_eq!(result.total, 2);
    assert_eq!(result.failed, 2);
    for outcome in &result.outcomes {
        assert!(matches!(
            outcome.status,
            TransferStatus::Failed(ActivityError::Write(_))
        ));
    }
    Ok(())
}
