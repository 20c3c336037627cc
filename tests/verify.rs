//! Integration tests for dochub-verify.
//!
//! Most tests run against a local `mockito` server standing in for the
//! extraction service. The live test at the bottom talks to a real service
//! and is gated behind `DOCHUB_E2E_ENDPOINT`.
//!
//! Run with:
//!   cargo test --test verify -- --nocapture
//!
//! Against a running service:
//!   DOCHUB_E2E_ENDPOINT=http://localhost:8000/analyze-images cargo test --test verify live_ -- --nocapture

use dochub_verify::{
    load_document, Document, FailureReason, Field, Phase, SubmissionProgressCallback,
    VerificationOutcome, Verifier, VerifierConfig, VerifyError,
};
use mockito::Matcher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

// ── Test helpers ─────────────────────────────────────────────────────────────

const PATH: &str = "/analyze-images";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("dochub_verify=debug")
        .with_test_writer()
        .try_init();
}

fn config_for(endpoint: &str) -> VerifierConfig {
    assert_ok!(VerifierConfig::builder()
        .endpoint(endpoint)
        .timeout(Duration::from_secs(5))
        .build())
}

fn verifier_for(server: &mockito::ServerGuard) -> Verifier {
    init_tracing();
    let endpoint = format!("{}{}", server.url(), PATH);
    assert_ok!(Verifier::new(&config_for(&endpoint)))
}

fn png(name: &str) -> Document {
    // PNG signature plus padding; the service is mocked so content is opaque.
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.extend_from_slice(&[0u8; 32]);
    Document::new(name, "image/png", data)
}

fn pdf(name: &str) -> Document {
    Document::new(name, "application/pdf", &b"%PDF-1.7\n%%EOF\n"[..])
}

/// Local service that accepts connections and never answers.
///
/// Returns its address, the number of connections accepted so far, and the
/// accept task (abort it at the end of the test).
async fn silent_service() -> (
    std::net::SocketAddr,
    Arc<AtomicUsize>,
    tokio::task::JoinHandle<()>,
) {
    let listener = assert_ok!(tokio::net::TcpListener::bind("127.0.0.1:0").await);
    let addr = assert_ok!(listener.local_addr());
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    let holder = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((sock, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(sock);
        }
    });
    (addr, accepted, holder)
}

/// Skip this test unless a live extraction service endpoint is configured.
macro_rules! live_skip_unless_ready {
    () => {{
        match std::env::var("DOCHUB_E2E_ENDPOINT") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => {
                println!("SKIP: set DOCHUB_E2E_ENDPOINT to run live tests");
                return;
            }
        }
    }};
}

// ── Response shapes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn single_object_becomes_one_record() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"name":"Ada","surname":"Lovelace","date_of_birth":"1815-12-10",
                "name_confidence":0.98,"surname_confidence":0.95,"date_of_birth_confidence":0.9}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let mut v = verifier_for(&server);
    v.add([png("passport.png")]);
    let outcome = assert_ok!(v.submit().await);

    mock.assert_async().await;
    let records = outcome.results().expect("results");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name(), "Ada");
    assert_eq!(records[0].surname(), "Lovelace");
    assert_eq!(records[0].date_of_birth(), "1815-12-10");
    assert!((records[0].confidence(Field::Name) - 0.98).abs() < 1e-9);
    assert_eq!(v.phase(), Phase::Succeeded);
}

#[tokio::test]
async fn array_keeps_service_order() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body(
            r#"[{"name":"First","surname":"One","date_of_birth":"2000-01-01"},
                {"name":"Second","surname":"Two","date_of_birth":"unknown"}]"#,
        )
        .create_async()
        .await;

    let mut v = verifier_for(&server);
    v.add([png("front.png"), pdf("back.pdf")]);
    let outcome = assert_ok!(v.submit().await);

    let records = outcome.results().expect("results");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name(), "First");
    assert_eq!(records[1].name(), "Second");
    assert!(records[1].is_unknown(Field::DateOfBirth));
    assert_eq!(records[1].confidence(Field::DateOfBirth), 0.0);
}

#[tokio::test]
async fn error_envelope_is_analysis_message() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body(r#"{"error":"No identity document detected"}"#)
        .create_async()
        .await;

    let mut v = verifier_for(&server);
    v.add([png("cat.png")]);
    let outcome = assert_ok!(v.submit().await);

    assert_eq!(
        outcome,
        VerificationOutcome::AnalysisMessage("No identity document detected".into())
    );
    assert_eq!(v.phase(), Phase::Failed);
}

#[tokio::test]
async fn empty_array_is_empty_phase() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let mut v = verifier_for(&server);
    v.add([png("blank.png")]);
    let outcome = assert_ok!(v.submit().await);

    assert_eq!(outcome, VerificationOutcome::Results(vec![]));
    assert_eq!(v.phase(), Phase::Empty);
}

#[tokio::test]
async fn fenced_json_body_is_unwrapped() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body("```json\n{\"name\":\"Grace\",\"surname\":\"Hopper\",\"date_of_birth\":\"1906-12-09\"}\n```")
        .create_async()
        .await;

    let mut v = verifier_for(&server);
    v.add([png("id.png")]);
    let outcome = assert_ok!(v.submit().await);
    assert_eq!(outcome.results().expect("results")[0].surname(), "Hopper");
}

#[tokio::test]
async fn legacy_keys_read_only_when_enabled() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body(r#"{"name":"Alan","lastname":"Turing","dob":"1912-06-23"}"#)
        .expect(2)
        .create_async()
        .await;
    let endpoint = format!("{}{}", server.url(), PATH);

    let mut plain = assert_ok!(Verifier::new(&config_for(&endpoint)));
    plain.add([png("a.png")]);
    let outcome = assert_ok!(plain.submit().await);
    assert_eq!(outcome.results().expect("results")[0].surname(), "");

    let config = assert_ok!(VerifierConfig::builder()
        .endpoint(&endpoint)
        .legacy_aliases(true)
        .build());
    let mut legacy = assert_ok!(Verifier::new(&config));
    legacy.add([png("a.png")]);
    let outcome = assert_ok!(legacy.submit().await);
    let record = &outcome.results().expect("results")[0];
    assert_eq!(record.surname(), "Turing");
    assert_eq!(record.date_of_birth(), "1912-06-23");
}

// ── Request format ───────────────────────────────────────────────────────────

#[tokio::test]
async fn request_is_multipart_with_files_and_prompt() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_header(
            "content-type",
            Matcher::Regex(r"^multipart/form-data; boundary=.+".into()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="files"; filename="front\.png""#.into()),
            Matcher::Regex(r#"name="files"; filename="back\.pdf""#.into()),
            Matcher::Regex(r#"name="prompt"\r\n\r\nread the card\r\n"#.into()),
        ]))
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let config = assert_ok!(VerifierConfig::builder()
        .endpoint(format!("{}{}", server.url(), PATH))
        .prompt("read the card")
        .build());
    let mut v = assert_ok!(Verifier::new(&config));
    v.add([png("front.png"), pdf("back.pdf")]);
    assert_ok!(v.submit().await);

    mock.assert_async().await;
}

#[tokio::test]
async fn empty_prompt_field_is_still_sent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_body(Matcher::Regex(r#"name="prompt"\r\n\r\n\r\n"#.into()))
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let mut v = verifier_for(&server);
    v.add([png("a.png")]);
    assert_ok!(v.submit().await);
    mock.assert_async().await;
}

#[tokio::test]
async fn empty_batch_makes_no_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .expect(0)
        .create_async()
        .await;

    let mut v = verifier_for(&server);
    let err = assert_err!(v.submit().await);
    assert!(matches!(err, VerifyError::EmptyBatch));
    assert_eq!(v.phase(), Phase::Idle);

    mock.assert_async().await;
}

#[tokio::test]
async fn rejected_files_are_not_uploaded() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_body(Matcher::Regex(r#"filename="ok\.png""#.into()))
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let config = assert_ok!(VerifierConfig::builder()
        .endpoint(format!("{}{}", server.url(), PATH))
        .max_bytes(64)
        .build());
    let mut v = assert_ok!(Verifier::new(&config));
    let report = v.add([
        png("ok.png"),
        Document::new("huge.png", "image/png", vec![0u8; 65]),
        Document::new("notes.txt", "text/plain", &b"hi"[..]),
    ]);
    assert_eq!(report.accepted, 1);
    assert_eq!(report.rejections.len(), 2);
    assert_eq!(v.batch().len(), 1);

    assert_ok!(v.submit().await);
    mock.assert_async().await;
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn http_500_is_server_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let mut v = verifier_for(&server);
    v.add([png("a.png")]);
    let outcome = assert_ok!(v.submit().await);

    assert_eq!(
        outcome,
        VerificationOutcome::Failure(FailureReason::Server { status: 500 })
    );
    assert_eq!(outcome.message().as_deref(), Some("server error"));
    assert_eq!(v.phase(), Phase::Failed);
    assert_eq!(v.batch().len(), 1, "failure must not touch the batch");
}

#[tokio::test]
async fn non_json_body_is_verification_failed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html>gateway</html>")
        .create_async()
        .await;

    let mut v = verifier_for(&server);
    v.add([png("a.png")]);
    let outcome = assert_ok!(v.submit().await);

    assert!(matches!(
        outcome,
        VerificationOutcome::Failure(FailureReason::MalformedResponse { .. })
    ));
    assert_eq!(outcome.message().as_deref(), Some("verification failed"));
}

#[tokio::test]
async fn unresponsive_service_times_out() {
    init_tracing();
    let (addr, _accepted, holder) = silent_service().await;

    let config = assert_ok!(VerifierConfig::builder()
        .endpoint(format!("http://{addr}{PATH}"))
        .timeout(Duration::from_millis(300))
        .build());
    let mut v = assert_ok!(Verifier::new(&config));
    v.add([png("a.png")]);

    let started = std::time::Instant::now();
    let outcome = assert_ok!(v.submit().await);
    assert!(started.elapsed() < Duration::from_secs(5));

    assert!(
        matches!(outcome, VerificationOutcome::Failure(FailureReason::Timeout { .. })),
        "got {outcome:?}"
    );
    assert_eq!(outcome.message().as_deref(), Some("timeout"));
    assert_eq!(v.phase(), Phase::Failed);
    holder.abort();
}

#[tokio::test]
async fn dropped_submit_does_not_block_the_next_one() {
    init_tracing();
    let (addr, accepted, holder) = silent_service().await;

    let config = assert_ok!(VerifierConfig::builder()
        .endpoint(format!("http://{addr}{PATH}"))
        .timeout(Duration::from_secs(30))
        .build());
    let mut v = assert_ok!(Verifier::new(&config));
    v.add([png("a.png")]);

    // The caller gives up long before the request deadline.
    assert_err!(tokio::time::timeout(Duration::from_millis(200), v.submit()).await);
    assert_eq!(v.phase(), Phase::Idle);
    assert!(v.state().in_flight().is_none());
    assert!(v.outcome().is_none());

    // A new submission goes out instead of failing with SubmitInProgress.
    match tokio::time::timeout(Duration::from_millis(200), v.submit()).await {
        Err(_elapsed) => {}
        Ok(result) => panic!("second submit returned early: {result:?}"),
    }
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
    assert_eq!(v.phase(), Phase::Idle);
    assert_eq!(v.batch().len(), 1);
    holder.abort();
}

#[tokio::test]
async fn url_inputs_use_configured_download_timeout() {
    init_tracing();
    let (addr, _accepted, holder) = silent_service().await;

    let config = assert_ok!(VerifierConfig::builder()
        .download_timeout_secs(1)
        .build());
    let v = assert_ok!(Verifier::new(&config));
    let url = format!("http://{addr}/scans/id.png");

    let results = v.load_documents(std::slice::from_ref(&url)).await;
    assert_eq!(results.len(), 1);
    match &results[0] {
        Err(VerifyError::DownloadTimeout { secs, .. }) => assert_eq!(*secs, 1),
        other => panic!("expected download timeout, got {other:?}"),
    }
    holder.abort();
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    init_tracing();
    // Reserve a port, then free it so nothing is listening.
    let addr = {
        let listener = assert_ok!(std::net::TcpListener::bind("127.0.0.1:0"));
        assert_ok!(listener.local_addr())
    };

    let mut v = assert_ok!(Verifier::new(&config_for(&format!("http://{addr}{PATH}"))));
    v.add([png("a.png")]);
    let outcome = assert_ok!(v.submit().await);

    assert!(
        matches!(outcome, VerificationOutcome::Failure(FailureReason::Network { .. })),
        "got {outcome:?}"
    );
    assert_eq!(outcome.message().as_deref(), Some("network error"));
}

// ── Workflow ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn late_result_after_removal_is_discarded() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body(r#"{"name":"Late","surname":"Reply","date_of_birth":"1999-09-09"}"#)
        .create_async()
        .await;

    let mut v = verifier_for(&server);
    v.add([png("a.png"), png("b.png")]);

    let pending = assert_ok!(v.begin_submit());
    assert_eq!(v.phase(), Phase::Submitting);
    assert!(matches!(v.begin_submit(), Err(VerifyError::SubmitInProgress)));

    let handle = tokio::spawn(pending.run());
    assert_ok!(v.remove(0));
    let (ticket, outcome) = assert_ok!(handle.await);

    assert!(outcome.results().is_some());
    assert!(!v.complete_submit(ticket, outcome));
    assert_eq!(v.phase(), Phase::Idle);
    assert!(v.outcome().is_none());
    assert_eq!(v.batch().len(), 1);
}

#[tokio::test]
async fn new_submission_replaces_previous_outcome() {
    let mut server = mockito::Server::new_async().await;
    let fail = server
        .mock("POST", PATH)
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let mut v = verifier_for(&server);
    v.add([png("a.png")]);
    let first = assert_ok!(v.submit().await);
    assert!(first.is_failure());
    fail.assert_async().await;
    fail.remove_async().await;

    let _ok = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body(r#"{"name":"N","surname":"S","date_of_birth":"2001-01-01"}"#)
        .create_async()
        .await;

    let second = assert_ok!(v.submit().await);
    assert!(second.results().is_some());
    assert_eq!(v.phase(), Phase::Succeeded);
    assert_eq!(v.outcome(), Some(&second));
}

#[tokio::test]
async fn progress_callback_sees_start_and_finish() {
    #[derive(Default)]
    struct Recorder {
        starts: AtomicUsize,
        seen: Mutex<Vec<(usize, u64)>>,
        finished: AtomicUsize,
    }
    impl SubmissionProgressCallback for Recorder {
        fn on_submit_start(&self, documents: usize, total_bytes: u64) {
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((documents, total_bytes));
        }
        fn on_submit_complete(&self, _outcome: &VerificationOutcome, _elapsed: Duration) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let recorder = Arc::new(Recorder::default());
    let config = assert_ok!(VerifierConfig::builder()
        .endpoint(format!("{}{}", server.url(), PATH))
        .progress_callback(recorder.clone())
        .build());
    let mut v = assert_ok!(Verifier::new(&config));
    v.add([png("a.png"), pdf("b.pdf")]);
    let expected_bytes = v.batch().total_bytes();
    assert_ok!(v.submit().await);

    assert_eq!(recorder.starts.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.finished.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.seen.lock().unwrap()[0], (2, expected_bytes));
}

// ── Loader → batch → submit ──────────────────────────────────────────────────

#[tokio::test]
async fn loaded_file_is_sniffed_and_uploaded() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_body(Matcher::Regex(r#"filename="scan\.bin"\r\nContent-Type: application/pdf"#.into()))
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let dir = assert_ok!(tempfile::tempdir());
    let path = dir.path().join("scan.bin");
    assert_ok!(std::fs::write(&path, b"%PDF-1.4\nbody\n%%EOF\n"));

    let doc = assert_ok!(load_document(path.to_str().expect("utf-8 path"), 10).await);
    assert_eq!(doc.mime_type(), "application/pdf");

    let mut v = verifier_for(&server);
    assert_eq!(v.add([doc]).accepted, 1);
    assert_ok!(v.submit().await);
    mock.assert_async().await;
}

// ── Live service ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn live_service_answers_with_a_known_shape() {
    let endpoint = live_skip_unless_ready!();
    init_tracing();

    let config = assert_ok!(VerifierConfig::builder()
        .endpoint(endpoint)
        .timeout(Duration::from_secs(60))
        .build());
    let mut v = assert_ok!(Verifier::new(&config));
    v.add([png("probe.png")]);
    let outcome = assert_ok!(v.submit().await);

    println!("live outcome: {outcome:?}");
    assert!(matches!(
        v.phase(),
        Phase::Succeeded | Phase::Empty | Phase::Failed
    ));
}
