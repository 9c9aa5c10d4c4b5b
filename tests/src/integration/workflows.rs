//! End-to-end workflow scenarios.
//!
//! Each test wires the real orchestrator, state machine, correlation
//! registry, and dispatcher over one in-memory bus, with the scripted
//! mock registry on the other side.

use crate::integration::mock_registry::{MockRegistry, RegistryBehavior};
use diia_id::{
    BusGateway, CorrelationRegistry, CreateOutcome, EventDispatcher, IdentifierStateMachine,
    IdentifierStore, ProcessCode, SigningConfig, SigningOptions, SigningOrchestrator,
    TimeoutConfig,
};
use signing_bus::InMemoryEventBus;
use signing_types::entities::{
    FileToHash, IdentifierKey, LifecycleState, SignAlgo, SignedFileHash,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

struct Harness {
    store: Arc<IdentifierStore>,
    registry: Arc<CorrelationRegistry>,
    orchestrator: Arc<SigningOrchestrator>,
    _dispatcher: JoinHandle<()>,
    _registry_task: JoinHandle<()>,
}

fn test_config() -> SigningConfig {
    let timeout = Duration::from_millis(400);
    SigningConfig {
        timeouts: TimeoutConfig {
            certificate_create: timeout,
            certificate_revoke: timeout,
            hash_files: timeout,
            init_signing: timeout,
            integrity_check: timeout,
        },
    }
}

fn start(behavior: RegistryBehavior) -> Harness {
    crate::init_tracing();

    let bus = Arc::new(InMemoryEventBus::new());
    let store = Arc::new(IdentifierStore::new());
    let state_machine = IdentifierStateMachine::new(store.clone());
    let registry = CorrelationRegistry::new();

    // Both subscribe on construction, before anything is published.
    let dispatcher = EventDispatcher::new(&bus, registry.clone()).spawn();
    let registry_task = MockRegistry::new(bus.clone(), behavior).spawn();

    let gateway = Arc::new(BusGateway::new(bus));
    let orchestrator = Arc::new(
        SigningOrchestrator::new(
            store.clone(),
            state_machine,
            registry.clone(),
            gateway,
            test_config(),
        )
        .expect("valid config"),
    );

    Harness {
        store,
        registry,
        orchestrator,
        _dispatcher: dispatcher,
        _registry_task: registry_task,
    }
}

fn file(name: &str) -> FileToHash {
    FileToHash {
        name: name.into(),
        file: format!("{name}-content"),
        is_require_internal_sign: None,
    }
}

fn signed(name: &str) -> SignedFileHash {
    SignedFileHash {
        name: name.into(),
        hash: format!("{name}-hash"),
        signature: format!("{name}-sig"),
    }
}

async fn create(harness: &Harness) -> CreateOutcome {
    harness
        .orchestrator
        .create_identifier("u1", "m1", SignAlgo::Dstu, "p1")
        .await
        .expect("creation failed")
}

#[tokio::test]
async fn test_create_identifier_end_to_end() {
    let harness = start(RegistryBehavior::default());

    let outcome = create(&harness).await;
    let CreateOutcome::Created(record) = outcome else {
        panic!("expected creation, got {outcome:?}");
    };

    assert_eq!(record.state, LifecycleState::Active);
    assert_eq!(record.certificate_serial_number.as_deref(), Some("S1"));
    assert_eq!(record.identifier.as_deref(), Some("diia-u1"));
    assert!(record.expiration_date.is_some());
    assert!(harness
        .orchestrator
        .check_identifier_availability("u1", "m1", SignAlgo::Dstu));
}

#[tokio::test]
async fn test_concurrent_creates_yield_one_active() {
    let harness = start(RegistryBehavior {
        create_delay: Some(Duration::from_millis(100)),
        ..RegistryBehavior::default()
    });

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let orchestrator = harness.orchestrator.clone();
        tasks.push(tokio::spawn(async move {
            orchestrator
                .create_identifier("u1", "m1", SignAlgo::Dstu, "p1")
                .await
        }));
    }

    let mut created = 0;
    let mut rejected = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(CreateOutcome::Created(_)) => created += 1,
            // Losers either see the in-flight reservation or, if they run
            // after the winner committed, an invalid transition.
            Ok(CreateOutcome::CreationInProgress) => rejected += 1,
            Err(err) => {
                assert_eq!(err.process_code(), ProcessCode::InvalidTransition);
                rejected += 1;
            }
        }
    }

    assert_eq!(created, 1);
    assert_eq!(rejected, 7);

    let key = IdentifierKey::new("u1", "m1", SignAlgo::Dstu);
    assert_eq!(harness.store.effective_state(&key), LifecycleState::Active);
}

#[tokio::test]
async fn test_create_error_maps_to_no_valid_certificate() {
    let harness = start(RegistryBehavior {
        create_error: Some((404, "certificate not found".into())),
        ..RegistryBehavior::default()
    });

    let err = harness
        .orchestrator
        .create_identifier("u1", "m1", SignAlgo::Dstu, "p1")
        .await
        .unwrap_err();
    assert_eq!(err.process_code(), ProcessCode::NoValidCertificate);

    let key = IdentifierKey::new("u1", "m1", SignAlgo::Dstu);
    assert_eq!(harness.store.effective_state(&key), LifecycleState::None);
}

#[tokio::test]
async fn test_delete_with_silent_revoke_still_deletes() {
    let harness = start(RegistryBehavior {
        silent_revoke: true,
        ..RegistryBehavior::default()
    });
    create(&harness).await;

    let deleted = harness
        .orchestrator
        .delete_identifier("u1", "m1")
        .await
        .unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].state, LifecycleState::Deleted);
    assert!(deleted[0].revocation_error.is_some());
    assert!(deleted[0].deleted_at.is_some());

    // Terminal record frees the key; a fresh creation succeeds.
    let outcome = create(&harness).await;
    assert!(matches!(outcome, CreateOutcome::Created(_)));
}

#[tokio::test]
async fn test_partial_hash_response_is_integrity_violation() {
    let harness = start(RegistryBehavior {
        drop_last_hash: true,
        ..RegistryBehavior::default()
    });
    create(&harness).await;

    let err = harness
        .orchestrator
        .hash_files_to_sign("u1", "m1", SignAlgo::Dstu, &[file("a"), file("b")])
        .await
        .unwrap_err();
    assert_eq!(
        err.process_code(),
        ProcessCode::SignedDocumentsIntegrityViolated
    );
}

#[tokio::test]
async fn test_hash_request_is_idempotent() {
    let harness = start(RegistryBehavior::default());
    create(&harness).await;

    let files = [file("a"), file("b")];
    let first = harness
        .orchestrator
        .hash_files_to_sign("u1", "m1", SignAlgo::Dstu, &files)
        .await
        .unwrap();
    let second = harness
        .orchestrator
        .hash_files_to_sign("u1", "m1", SignAlgo::Dstu, &files)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first[0].name, "a");
    assert_eq!(first[1].name, "b");
}

#[tokio::test]
async fn test_hash_and_sign_flow() {
    let harness = start(RegistryBehavior::default());
    create(&harness).await;

    let hashes = harness
        .orchestrator
        .hash_and_sign(
            "u1",
            "m1",
            SignAlgo::Dstu,
            &[file("contract.pdf")],
            SigningOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(hashes.len(), 1);

    // Signing leaves the identifier's lifecycle untouched.
    let key = IdentifierKey::new("u1", "m1", SignAlgo::Dstu);
    assert_eq!(harness.store.effective_state(&key), LifecycleState::Active);
}

#[tokio::test]
async fn test_signing_timeout_surfaces_without_retry() {
    let harness = start(RegistryBehavior {
        silent_signing: true,
        ..RegistryBehavior::default()
    });
    create(&harness).await;

    let err = harness
        .orchestrator
        .init_hashes_signing("u1", "m1", SignAlgo::Dstu, SigningOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.process_code(), ProcessCode::SigningTimedOut);
}

#[tokio::test]
async fn test_validate_reports_failing_file() {
    let harness = start(RegistryBehavior {
        failing_files: vec!["b".into()],
        ..RegistryBehavior::default()
    });
    create(&harness).await;

    let validation = harness
        .orchestrator
        .validate_hash_signatures(
            "u1",
            "m1",
            SignAlgo::Dstu,
            &[signed("a"), signed("b")],
            None,
        )
        .await
        .unwrap();

    assert!(!validation.is_valid);
    assert_eq!(validation.failing_files, vec!["b".to_string()]);

    let all_valid = harness
        .orchestrator
        .are_signed_file_hashes_valid("u1", "m1", SignAlgo::Dstu, &[signed("a")])
        .await
        .unwrap();
    assert!(all_valid);
}

#[tokio::test]
async fn test_duplicate_responses_consumed_exactly_once() {
    let harness = start(RegistryBehavior {
        duplicate_responses: true,
        ..RegistryBehavior::default()
    });

    let outcome = create(&harness).await;
    assert!(matches!(outcome, CreateOutcome::Created(_)));

    // Let the duplicate delivery arrive and be dropped.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.registry.pending_count(), 0);
    assert!(
        harness
            .registry
            .stats()
            .total_dropped
            .load(Ordering::Relaxed)
            >= 1
    );
}

#[tokio::test]
async fn test_signing_without_identifier_is_not_found() {
    let harness = start(RegistryBehavior::default());

    let err = harness
        .orchestrator
        .hash_files_to_sign("u1", "m1", SignAlgo::Dstu, &[file("a")])
        .await
        .unwrap_err();
    assert_eq!(err.process_code(), ProcessCode::IdentifierNotFound);
}
