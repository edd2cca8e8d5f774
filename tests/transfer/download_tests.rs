// Download runs end to end

use bucketsync::fs::ObjectStore;
use bucketsync::sync::{
    enumerate_remote, Concurrency, Orchestrator, RunOptions, RunRequest, RunState,
    TransferExecutor, TransferItem, TransferResult,
};
use bucketsync::SyncError;
use std::fs;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;

use crate::support::FakeStore;

fn download(prefix: &str, local: &str) -> RunRequest {
    RunRequest {
        mode: "download".to_string(),
        source_root: prefix.to_string(),
        destination_root: local.to_string(),
        ignore_patterns: Vec::new(),
    }
}

#[tokio::test]
async fn test_download_mirrors_keys_under_local_root() {
    let local = TempDir::new().unwrap();
    let out = local.path().join("out");
    let store = Arc::new(FakeStore::with_objects(&[
        ("a/b.txt", b"first file".as_slice()),
        ("a/c.txt", b"second, longer file".as_slice()),
        ("z/other.txt", b"not under prefix".as_slice()),
    ]));

    let mut orchestrator = Orchestrator::new(store.clone(), RunOptions::default());
    let result = orchestrator
        .run(&download("a", &out.display().to_string()))
        .await
        .unwrap();

    assert_eq!(orchestrator.state(), RunState::Done);
    assert_eq!(result.succeeded(), 2);
    assert_eq!(fs::read(out.join("a/b.txt")).unwrap(), b"first file");
    assert_eq!(fs::read(out.join("a/c.txt")).unwrap(), b"second, longer file");
    assert!(!out.join("z").exists());
    assert!(result.locations().is_empty());
}

#[tokio::test]
async fn test_download_follows_every_page() {
    let local = TempDir::new().unwrap();
    let names: Vec<String> = (0..5).map(|i| format!("logs/day{}.log", i)).collect();
    let objects: Vec<(&str, &[u8])> = names.iter().map(|n| (n.as_str(), n.as_bytes())).collect();
    let store = Arc::new(FakeStore::with_objects(&objects));

    let options = RunOptions {
        page_size: 2,
        download_concurrency: Concurrency::limited(4),
        ..RunOptions::default()
    };
    let mut orchestrator = Orchestrator::new(store.clone(), options);
    let result = orchestrator
        .run(&download("logs", &local.path().display().to_string()))
        .await
        .unwrap();

    assert_eq!(result.outcomes.len(), 5);
    assert_eq!(store.lists.load(Ordering::SeqCst), 3);
    for name in &names {
        assert_eq!(fs::read(local.path().join(name)).unwrap(), name.as_bytes());
    }

    let keys: Vec<&str> = result
        .outcomes
        .iter()
        .map(|o| match &o.item {
            TransferItem::Object(entry) => entry.key.as_str(),
            other => panic!("unexpected item {:?}", other),
        })
        .collect();
    assert_eq!(keys, names.iter().map(String::as_str).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_failed_get_is_per_item() {
    let local = TempDir::new().unwrap();
    let store = FakeStore {
        fail_gets: ["docs/broken.txt".to_string()].into_iter().collect(),
        ..FakeStore::default()
    };
    store.insert_all(&[
        ("docs/broken.txt", b"never written".as_slice()),
        ("docs/fine.txt", b"ok".as_slice()),
    ]);
    let store = Arc::new(store);

    let mut orchestrator = Orchestrator::new(store.clone(), RunOptions::default());
    let result = orchestrator
        .run(&download("docs", &local.path().display().to_string()))
        .await
        .unwrap();

    assert_eq!(result.failed(), 1);
    match &result.outcomes[0].result {
        TransferResult::Failed { cause } => assert!(cause.contains("injected get failure")),
        other => panic!("unexpected result {:?}", other),
    }
    match &result.outcomes[1].result {
        TransferResult::Downloaded { path, bytes } => {
            assert_eq!(*bytes, 2);
            assert_eq!(fs::read(path).unwrap(), b"ok");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_prefix_downloads_nothing() {
    let local = TempDir::new().unwrap();
    let store = Arc::new(FakeStore::with_objects(&[("keep/a.txt", b"a".as_slice())]));

    let mut orchestrator = Orchestrator::new(store.clone(), RunOptions::default());
    let result = orchestrator
        .run(&download("missing", &local.path().display().to_string()))
        .await
        .unwrap();

    assert!(result.outcomes.is_empty());
    assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    assert_eq!(store.lists.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_executor_downloads_explicit_entries() {
    let local = TempDir::new().unwrap();
    let store = Arc::new(FakeStore::with_objects(&[
        ("x/1.bin", b"\x00\x01\x02\x03\x04".as_slice()),
        ("x/2.bin", b"".as_slice()),
    ]));

    let mut listing = enumerate_remote(store.as_ref(), "x", 10);
    let entries = listing.collect_all().await.unwrap();
    assert_eq!(listing.pages_fetched(), 1);

    let executor = TransferExecutor::new(store.clone());
    let outcomes = executor.download_entries(entries, local.path()).await;

    assert!(outcomes.iter().all(|o| o.is_success()));
    assert_eq!(fs::read(local.path().join("x/1.bin")).unwrap(), b"\x00\x01\x02\x03\x04");
    assert_eq!(fs::read(local.path().join("x/2.bin")).unwrap(), b"");
}

/// Store whose listing always fails.
struct BrokenListing(FakeStore);

#[async_trait::async_trait]
impl ObjectStore for BrokenListing {
    async fn put(&self, request: bucketsync::fs::PutRequest) -> anyhow::Result<String> {
        self.0.put(request).await
    }

    async fn get(&self, key: &str) -> anyhow::Result<bucketsync::fs::ByteStream> {
        self.0.get(key).await
    }

    async fn list_page(
        &self,
        _prefix: &str,
        _continuation: Option<&str>,
        _page_size: usize,
    ) -> anyhow::Result<bucketsync::fs::ListPage> {
        anyhow::bail!("access denied")
    }

    fn bucket(&self) -> &str {
        "broken"
    }
}

#[tokio::test]
async fn test_listing_failure_is_fatal() {
    let local = TempDir::new().unwrap();
    let mut orchestrator =
        Orchestrator::new(Arc::new(BrokenListing(FakeStore::new())), RunOptions::default());

    let err = orchestrator
        .run(&download("any", &local.path().display().to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Enumeration { .. }));
    assert!(format!("{:#}", anyhow::Error::from(err)).contains("access denied"));
    assert_eq!(orchestrator.state(), RunState::Failed);
}
