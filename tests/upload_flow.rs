//! End-to-end upload runs against the scripted platform.

mod common;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gc_transfer::sockets::{Binding, ExistingReference, ExistingSocketValue, ResolvedValue};
use gc_transfer::uploads::{SessionState, StateObserver};
use gc_transfer::{
    ApiError, Cancellation, CaseTarget, Client, Socket, SocketCatalog, SocketValueSpec,
    SuperKind, UploadOutcome, UploadRunOutcome,
};

use common::{scripted_config, ScriptedPlatform};

fn write_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"imaging data").unwrap();
    path
}

#[tokio::test]
async fn test_ten_uploads_respect_bound() {
    let dir = tempfile::tempdir().unwrap();
    let platform = ScriptedPlatform::new();

    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (a, p) = (active.clone(), peak.clone());
    let observer: StateObserver = Arc::new(move |_id, state| match state {
        SessionState::Transferring => {
            let now = a.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
        }
        SessionState::Completed | SessionState::Failed => {
            a.fetch_sub(1, Ordering::SeqCst);
        }
        _ => {}
    });

    let client = Client::with_transport(&scripted_config(3), platform.transport())
        .unwrap()
        .with_upload_observer(observer);

    let sockets: Vec<Socket> = (0..10)
        .map(|i| Socket::new(format!("ct-{i}"), "Image", SuperKind::Image).required())
        .collect();
    let target = CaseTarget::new_archive_item(
        "https://gc.test/api/v1/archives/a/",
        SocketCatalog::new(sockets),
    );
    let specs: Vec<SocketValueSpec> = (0..10)
        .map(|i| {
            SocketValueSpec::from_files(
                format!("ct-{i}"),
                [
                    write_file(dir.path(), &format!("scan{i}_a.dcm")),
                    write_file(dir.path(), &format!("scan{i}_b.dcm")),
                ],
            )
        })
        .collect();

    let case = client
        .create_case(&specs, &target, &Cancellation::new())
        .await
        .unwrap();

    assert_eq!(peak.load(Ordering::SeqCst), 3);
    assert_eq!(case.expected_sockets.len(), 10);
    assert!(case.is_processed());
    assert_eq!(platform.call_count("POST /api/v1/uploads/"), 20);
    assert_eq!(platform.call_count("PUT /put/"), 20);
    assert_eq!(platform.call_count("POST /api/v1/cases/upload-sessions/"), 10);
    assert_eq!(platform.call_count("POST /api/v1/archives/items/"), 1);
}

#[tokio::test]
async fn test_cancel_mid_run_keeps_completed_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let platform = ScriptedPlatform::new();
    let cancel = Cancellation::new();

    // Cancel as soon as the first session completes.
    let trigger = cancel.clone();
    let observer: StateObserver = Arc::new(move |_id, state| {
        if state == SessionState::Completed {
            trigger.trigger();
        }
    });

    let client = Client::with_transport(&scripted_config(2), platform.transport())
        .unwrap()
        .with_upload_observer(observer);

    let names = ["fast", "slow1", "slow2", "slow3"];
    let target = CaseTarget::new_archive_item(
        "https://gc.test/api/v1/archives/a/",
        SocketCatalog::new(names.map(|n| Socket::new(n, "Anything", SuperKind::File))),
    );
    let specs: Vec<SocketValueSpec> = names
        .iter()
        .map(|n| SocketValueSpec::from_files(*n, [write_file(dir.path(), &format!("{n}.json"))]))
        .collect();

    let outcome = client.run_upload(&specs, &target, &cancel).await.unwrap();

    match outcome {
        UploadRunOutcome::Partial {
            completed,
            failures,
        } => {
            assert_eq!(completed.len(), 1);
            assert_eq!(completed[0].socket_slug, "fast");
            assert_eq!(failures.len(), 3);
            assert!(failures
                .iter()
                .all(|f| matches!(f.outcome, UploadOutcome::Cancelled)));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    // slow2 and slow3 never started.
    assert_eq!(platform.call_count("POST /api/v1/uploads/"), 2);
}

#[tokio::test]
async fn test_failed_upload_leaves_siblings_usable() {
    let dir = tempfile::tempdir().unwrap();
    let platform = ScriptedPlatform::new();
    let client = Client::with_transport(&scripted_config(2), platform.transport()).unwrap();

    let target = CaseTarget::new_archive_item(
        "https://gc.test/api/v1/archives/a/",
        SocketCatalog::new([
            Socket::new("report", "PDF", SuperKind::File),
            Socket::new("ct", "Image", SuperKind::Image),
        ]),
    );
    let specs = vec![
        SocketValueSpec::from_files("report", [write_file(dir.path(), "bad-report.pdf")]),
        SocketValueSpec::from_files("ct", [write_file(dir.path(), "scan.mha")]),
    ];

    let outcome = client
        .run_upload(&specs, &target, &Cancellation::new())
        .await
        .unwrap();

    let UploadRunOutcome::Partial {
        completed,
        failures,
    } = outcome
    else {
        panic!("expected a partial outcome");
    };
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].socket_slug, "ct");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].socket_slug, "report");
    assert!(matches!(
        failures[0].outcome,
        UploadOutcome::Failed(ApiError::Client { status: 400, .. })
    ));

    // Only the failed spec is retried, against the same target.
    let retry = vec![SocketValueSpec::from_files(
        "report",
        [write_file(dir.path(), "report.pdf")],
    )];
    let outcome = client
        .run_upload(&retry, &target, &Cancellation::new())
        .await
        .unwrap();
    assert!(outcome.is_complete());
}

#[tokio::test]
async fn test_existing_file_value_is_downloaded_and_uploaded_again() {
    let platform = ScriptedPlatform::new();
    let client = Client::with_transport(&scripted_config(2), platform.transport()).unwrap();
    let target = CaseTarget::archive_item(
        "item-9",
        SocketCatalog::new([Socket::new("report", "PDF", SuperKind::File)]),
    );

    let existing = ExistingSocketValue {
        socket_slug: "report".into(),
        image: None,
        file: Some("https://gc.test/media/components/11/report.pdf".into()),
        value: None,
    };
    let specs = vec![SocketValueSpec::from_existing(
        "report",
        ExistingReference::SocketValue(existing),
    )];

    let outcome = client
        .run_upload(&specs, &target, &Cancellation::new())
        .await
        .unwrap();
    let UploadRunOutcome::Complete(resolution) = outcome else {
        panic!("expected a complete outcome");
    };
    assert_eq!(
        resolution.values(),
        &[ResolvedValue::new(
            "report",
            Binding::UserUpload("https://gc.test/api/v1/uploads/report.pdf/".into())
        )]
    );

    assert_eq!(platform.call_count("GET /media/components/11/report.pdf"), 1);
    assert_eq!(platform.call_count("POST /api/v1/uploads/"), 1);
    assert_eq!(platform.call_count("PUT /put/report.pdf/"), 1);
    let calls = platform.calls.lock().unwrap();
    assert!(calls[0].starts_with("GET /media/"));
}
