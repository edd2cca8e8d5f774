// Mode selection and run lifecycle

use bucketsync::fs::Mode;
use bucketsync::report::write_outputs;
use bucketsync::sync::{Orchestrator, RunOptions, RunRequest, RunState};
use bucketsync::SyncError;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;

use crate::support::{write_tree, FakeStore};

#[tokio::test]
async fn test_unknown_mode_touches_nothing() {
    let source = TempDir::new().unwrap();
    write_tree(source.path(), &[("a.txt", "a")]);
    let store = Arc::new(FakeStore::with_objects(&[("a.txt", b"a".as_slice())]));

    for mode in ["sync", "", "UPLOAD", "up load"] {
        let mut orchestrator = Orchestrator::new(store.clone(), RunOptions::default());
        let request = RunRequest {
            mode: mode.to_string(),
            source_root: source.path().display().to_string(),
            ..RunRequest::default()
        };

        let err = orchestrator.run(&request).await.unwrap_err();
        assert!(matches!(&err, SyncError::Mode { mode: m } if m == mode));
        assert_eq!(orchestrator.state(), RunState::Failed);
    }

    assert_eq!(store.transfer_calls(), 0);
    assert_eq!(store.lists.load(Ordering::SeqCst), 0);
}

#[test]
fn test_mode_parsing_is_exact() {
    assert_eq!("upload".parse::<Mode>().unwrap(), Mode::Upload);
    assert_eq!("download".parse::<Mode>().unwrap(), Mode::Download);
    assert!(" upload".parse::<Mode>().is_err());
    assert!("Download".parse::<Mode>().is_err());
}

#[tokio::test]
async fn test_upload_outputs_follow_run() {
    let source = TempDir::new().unwrap();
    write_tree(source.path(), &[("one.txt", "1"), ("two.txt", "2")]);
    let store = Arc::new(FakeStore::failing_puts(&["rel/two.txt"]));

    let mut orchestrator = Orchestrator::new(store.clone(), RunOptions::default());
    let result = orchestrator
        .run(&RunRequest {
            mode: "upload".to_string(),
            source_root: source.path().display().to_string(),
            destination_root: "rel".to_string(),
            ignore_patterns: Vec::new(),
        })
        .await
        .unwrap();

    let mut out = Vec::new();
    write_outputs(&result, &mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "object_key=rel\nobject_locations=[\"https://fake.test/rel/one.txt\"]\n"
    );
}
