//! Case finalization checks against the scripted platform.

mod common;

use gc_transfer::sockets::Binding;
use gc_transfer::{
    AlgorithmInterface, ApiError, Cancellation, CaseResolution, CaseTarget, Client,
    ResolvedValue, Socket, SocketCatalog, SocketValueSpec, SuperKind, ValidationError,
};
use serde_json::json;

use common::{scripted_config, ScriptedPlatform};

fn catalog() -> SocketCatalog {
    SocketCatalog::new([
        Socket::new("ct", "Image", SuperKind::Image).required(),
        Socket::new("age", "Integer", SuperKind::Value).required(),
        Socket::new("sex", "String", SuperKind::Value).required(),
    ])
}

#[tokio::test]
async fn test_missing_required_socket_makes_no_calls() {
    let platform = ScriptedPlatform::new();
    let client = Client::with_transport(&scripted_config(2), platform.transport()).unwrap();
    let target = CaseTarget::new_archive_item("https://gc.test/api/v1/archives/a/", catalog());

    let resolution = CaseResolution::new(vec![
        ResolvedValue::new("age", Binding::Value(json!(54))),
        ResolvedValue::new("sex", Binding::Value(json!("F"))),
    ]);
    let err = client
        .finalize(&target, resolution, &Cancellation::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::MissingSocket(ref slug)) if slug == "ct"
    ));
    assert!(platform.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_conflicting_specs_make_no_calls() {
    let platform = ScriptedPlatform::new();
    let client = Client::with_transport(&scripted_config(2), platform.transport()).unwrap();
    let target = CaseTarget::new_archive_item("https://gc.test/api/v1/archives/a/", catalog());

    let both = vec![SocketValueSpec::from_value("age", json!(54)).with_files(["/tmp/age.json"])];
    let err = client
        .run_upload(&both, &target, &Cancellation::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::MultiplePayloads { .. })
    ));

    let duplicate = vec![
        SocketValueSpec::from_value("age", json!(54)),
        SocketValueSpec::from_value("age", json!(55)),
    ];
    let err = client
        .run_upload(&duplicate, &target, &Cancellation::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::DuplicateSocket(_))
    ));

    assert!(platform.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_job_inputs_must_match_an_interface() {
    let platform = ScriptedPlatform::new();
    let client = Client::with_transport(&scripted_config(2), platform.transport()).unwrap();
    let target = CaseTarget::algorithm_job(
        "https://gc.test/api/v1/algorithms/a/",
        vec![AlgorithmInterface::new(vec![
            Socket::new("age", "Integer", SuperKind::Value),
            Socket::new("sex", "String", SuperKind::Value),
        ])],
    );

    let err = client
        .run_upload(
            &[SocketValueSpec::from_value("age", json!(54))],
            &target,
            &Cancellation::new(),
        )
        .await
        .unwrap_err();

    match err {
        ApiError::Validation(ValidationError::NoMatchingInterface { given, closest }) => {
            assert_eq!(given, vec!["age".to_string()]);
            assert_eq!(closest, Some(vec!["age".to_string(), "sex".to_string()]));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(platform.calls.lock().unwrap().is_empty());
}
