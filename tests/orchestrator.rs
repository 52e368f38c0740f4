//! Integration tests: full submissions against a mock analysis service.
//!
//! Every test stands up its own `mockito` server, so they run offline and in
//! parallel. Progress timings are shortened so the upload-mode tests settle
//! quickly.

use mockito::{Matcher, Server};
use nocap::{
    AnalysisMode, AnalysisResult, ClientConfig, ImageFileCamera, ImageVerdict, NoCapError,
    Observer, Orchestrator, StaticCredential, SubmissionObserver, SubmissionState, TextVariant,
    Verdict,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn config_for(server: &Server) -> ClientConfig {
    ClientConfig::builder()
        .base_url(server.url())
        .tick_interval_ms(10)
        .success_display_ms(50)
        .build()
        .unwrap()
}

fn orchestrator_for(server: &Server) -> Orchestrator {
    Orchestrator::new(config_for(server)).unwrap()
}

fn signed_in() -> StaticCredential {
    StaticCredential::new("tok")
}

/// Records every event the orchestrator emits.
#[derive(Default)]
struct Recorder {
    states: Mutex<Vec<SubmissionState>>,
    progress: Mutex<Vec<u8>>,
    errors: Mutex<Vec<String>>,
}

impl SubmissionObserver for Recorder {
    fn on_state_change(&self, _mode: AnalysisMode, state: SubmissionState) {
        self.states.lock().unwrap().push(state);
    }
    fn on_progress(&self, percent: u8) {
        self.progress.lock().unwrap().push(percent);
    }
    fn on_error(&self, error: &NoCapError) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}

// ── Text-family modes ────────────────────────────────────────────────────────

#[tokio::test]
async fn text_label_0_is_cap() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/mode/text")
        .match_header("authorization", "Bearer tok")
        .match_body(Matcher::Json(json!({ "text": "The sky is green" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"label":"LABEL_0","score":0.87}"#)
        .create_async()
        .await;

    let mut o = orchestrator_for(&server);
    o.set_text("The sky is green");
    let result = o.submit(&signed_in()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(
        result,
        AnalysisResult::Score {
            label: Some(Verdict::Cap),
            score: 0.87
        }
    );
    assert_eq!(o.state(), SubmissionState::Success);
    assert_eq!(o.result(), Some(&result));
    assert!(o.error().is_none());
    // Text modes never show progress.
    assert_eq!(o.progress(), 0);
}

#[tokio::test]
async fn website_label_1_is_fax() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/mode/website")
        .match_header("authorization", "Bearer tok")
        .match_body(Matcher::Json(json!({ "url": "http://example.com" })))
        .with_status(200)
        .with_body(r#"{"label":"LABEL_1","score":0.63}"#)
        .create_async()
        .await;

    let mut o = orchestrator_for(&server);
    assert_eq!(o.toggle(TextVariant::Website), AnalysisMode::Website);
    o.set_text("http://example.com");
    let result = o.submit(&signed_in()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.label(), Some(Verdict::Fax));
    assert_eq!(result.confidence_percent(), Some(63.0));
}

#[tokio::test]
async fn deep_dive_narrative_is_verbatim() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/mode/deep_dive")
        .match_body(Matcher::Json(json!({ "text": "claim text" })))
        .with_status(200)
        .with_body(r#"{"response":"This claim is unsupported by evidence."}"#)
        .create_async()
        .await;

    let mut o = orchestrator_for(&server);
    o.toggle(TextVariant::DeepDive);
    o.set_text("claim text");
    let result = o.submit(&signed_in()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(
        result,
        AnalysisResult::Narrative {
            text: "This claim is unsupported by evidence.".into()
        }
    );
}

#[tokio::test]
async fn deep_dive_and_website_are_exclusive() {
    let mut server = Server::new_async().await;
    let website = server
        .mock("POST", "/mode/website")
        .expect(0)
        .create_async()
        .await;
    let deep = server
        .mock("POST", "/mode/deep_dive")
        .with_status(200)
        .with_body(r#"{"response":"ok"}"#)
        .expect(1)
        .create_async()
        .await;

    let mut o = orchestrator_for(&server);
    o.toggle(TextVariant::Website);
    o.toggle(TextVariant::DeepDive);
    assert!(o.selector().is_deep_dive());
    assert!(!o.selector().is_website());

    o.set_text("claim");
    o.submit(&signed_in()).await.unwrap();

    website.assert_async().await;
    deep.assert_async().await;
}

// ── Authentication ───────────────────────────────────────────────────────────

#[tokio::test]
async fn signed_out_never_reaches_the_network() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let recorder = Arc::new(Recorder::default());
    let mut o = orchestrator_for(&server).with_observer(recorder.clone() as Observer);
    o.select_mode(AnalysisMode::Document);
    o.set_media(nocap::MediaFile::new(b"hi".to_vec(), "a.txt", "text/plain"))
        .unwrap();

    let err = o.submit(&StaticCredential::signed_out()).await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, NoCapError::AuthRequired { .. }));
    assert_eq!(o.state(), SubmissionState::Failed);
    assert_eq!(o.progress(), 0);
    assert_eq!(recorder.errors.lock().unwrap().len(), 1);
}

// ── Upload modes ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn document_server_error_fails_and_resets_progress() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/mode/file")
        .with_status(500)
        .with_body(r#"{"error":"Model error","details":"CUDA out of memory"}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("claim.txt");
    std::fs::write(&path, "the earth is flat").unwrap();

    let recorder = Arc::new(Recorder::default());
    let mut o = orchestrator_for(&server).with_observer(recorder.clone() as Observer);
    o.select_mode(AnalysisMode::Document);
    o.choose_file(&path).await.unwrap();

    let err = o.submit(&signed_in()).await.unwrap_err();

    mock.assert_async().await;
    match err {
        NoCapError::AnalysisFailed { status, ref detail } => {
            assert_eq!(status, 500);
            assert_eq!(detail.as_deref(), Some("Model error: CUDA out of memory"));
        }
        other => panic!("expected AnalysisFailed, got {other:?}"),
    }
    assert_eq!(o.state(), SubmissionState::Failed);
    assert_eq!(o.progress(), 0);
    assert!(o.error().unwrap().contains("500"));
    assert!(o.result().is_none());
    assert_eq!(
        *recorder.states.lock().unwrap(),
        vec![
            SubmissionState::Preparing,
            SubmissionState::Submitting,
            SubmissionState::AwaitingResponse,
            SubmissionState::Failed,
        ]
    );
    // Settled to zero whether or not a tick fired before the response.
    assert!(matches!(recorder.progress.lock().unwrap().last(), None | Some(&0)));
}

#[tokio::test]
async fn unreachable_service_is_a_transport_failure() {
    // Reserve a port, then free it so nothing is listening there.
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let config = ClientConfig::builder()
        .base_url(format!("http://127.0.0.1:{port}"))
        .tick_interval_ms(10)
        .build()
        .unwrap();

    let recorder = Arc::new(Recorder::default());
    let mut o = Orchestrator::new(config)
        .unwrap()
        .with_observer(recorder.clone() as Observer);
    o.select_mode(AnalysisMode::Document);
    o.set_media(nocap::MediaFile::new(b"hi".to_vec(), "a.txt", "text/plain"))
        .unwrap();

    let err = o.submit(&signed_in()).await.unwrap_err();

    assert!(
        matches!(err, NoCapError::Transport { ref endpoint, .. } if endpoint == "/mode/file"),
        "got {err:?}"
    );
    assert_eq!(o.state(), SubmissionState::Failed);
    assert_eq!(o.progress(), 0);
    assert!(o.error().is_some());
    assert_eq!(
        recorder.states.lock().unwrap().last(),
        Some(&SubmissionState::Failed)
    );
}

#[tokio::test]
async fn missing_document_is_reported_not_submitted() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let recorder = Arc::new(Recorder::default());
    let mut o = orchestrator_for(&server).with_observer(recorder.clone() as Observer);
    o.select_mode(AnalysisMode::Document);

    let err = o.choose_file("/no/such/report.pdf").await.unwrap_err();
    assert!(matches!(err, NoCapError::FileNotFound { .. }));
    assert!(o.error().unwrap().contains("report.pdf"));
    assert_eq!(recorder.errors.lock().unwrap().len(), 1);

    o.submit(&signed_in()).await.unwrap_err();
    mock.assert_async().await;
}

#[tokio::test]
async fn document_uploads_as_multipart_file_field() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/mode/file")
        .match_header("authorization", "Bearer tok")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data; boundary=".into()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="file"; filename="claim.txt""#.into()),
            Matcher::Regex("the earth is flat".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"label":"LABEL_0","score":0.99}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("claim.txt");
    std::fs::write(&path, "the earth is flat").unwrap();

    let recorder = Arc::new(Recorder::default());
    let mut o = orchestrator_for(&server).with_observer(recorder.clone() as Observer);
    o.select_mode(AnalysisMode::Document);
    o.choose_file(&path).await.unwrap();
    let result = o.submit(&signed_in()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.label(), Some(Verdict::Cap));
    assert_eq!(o.progress(), 100);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(o.progress(), 0);

    let seen = recorder.progress.lock().unwrap().clone();
    let settled = seen.iter().position(|&p| p == 100).unwrap();
    assert!(seen[..=settled].windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert_eq!(seen.last(), Some(&0));
}

#[tokio::test]
async fn document_picker_rejects_images() {
    let server = Server::new_async().await;
    let mut o = orchestrator_for(&server);
    o.select_mode(AnalysisMode::Document);
    let err = o.choose_file("holiday.png").await.unwrap_err();
    assert!(matches!(err, NoCapError::UnsupportedFile { .. }));
    assert!(!o.can_submit());
}

#[tokio::test]
async fn camera_still_scores_machine_generated() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/mode/image_mode")
        .match_header("authorization", "Bearer tok")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({ "filename": "camera-photo.jpg" })),
            Matcher::Regex(r#""image":"data:image/jpeg;base64,"#.into()),
        ]))
        .with_status(200)
        .with_body(r#"{"human":0.2,"machine":0.8}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let still = dir.path().join("frame.png");
    image::RgbImage::from_pixel(8, 6, image::Rgb([200, 40, 40]))
        .save(&still)
        .unwrap();

    let mut o = orchestrator_for(&server);
    o.select_mode(AnalysisMode::Image);
    o.capture_from_camera(Arc::new(ImageFileCamera::new(&still)))
        .await
        .unwrap();
    assert!(o
        .preview()
        .unwrap()
        .starts_with("data:image/jpeg;base64,"));

    let result = o.submit(&signed_in()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.image_verdict(), Some(ImageVerdict::MachineGenerated));
    assert!(result.to_string().contains("machine-generated"));
}

#[tokio::test]
async fn missing_camera_source_lands_in_error_slot() {
    let server = Server::new_async().await;
    let mut o = orchestrator_for(&server);
    o.select_mode(AnalysisMode::Image);
    let err = o
        .capture_from_camera(Arc::new(ImageFileCamera::new("/nonexistent/frame.png")))
        .await
        .unwrap_err();
    assert!(matches!(err, NoCapError::MediaAccess { .. }));
    assert!(o.error().is_some());
    assert!(!o.can_submit());
}

// ── Response shape ───────────────────────────────────────────────────────────

#[tokio::test]
async fn unexpected_body_is_a_decode_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/mode/text")
        .with_status(200)
        .with_body(r#"{"verdict":"cap"}"#)
        .create_async()
        .await;

    let mut o = orchestrator_for(&server);
    o.set_text("claim");
    let err = o.submit(&signed_in()).await.unwrap_err();
    assert!(matches!(err, NoCapError::Decode { .. }));
    assert_eq!(o.state(), SubmissionState::Failed);
}

#[tokio::test]
async fn unmapped_label_keeps_score_without_verdict() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/mode/text")
        .with_status(200)
        .with_body(r#"{"label":"LABEL_2","score":0.5}"#)
        .create_async()
        .await;

    let mut o = orchestrator_for(&server);
    o.set_text("claim");
    let result = o.submit(&signed_in()).await.unwrap();
    assert_eq!(result.label(), None);
    assert_eq!(result.confidence_percent(), Some(50.0));
}

#[tokio::test]
async fn resubmit_after_failure_starts_clean() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/mode/text")
        .with_status(200)
        .with_body(r#"{"label":"LABEL_1","score":0.9}"#)
        .expect(1)
        .create_async()
        .await;

    let mut o = orchestrator_for(&server);
    o.set_text("claim");
    o.submit(&StaticCredential::signed_out()).await.unwrap_err();
    assert_eq!(o.state(), SubmissionState::Failed);
    assert!(o.error().is_some());

    let result = o.submit(&signed_in()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.label(), Some(Verdict::Fax));
    assert_eq!(o.state(), SubmissionState::Success);
    assert!(o.error().is_none());
}
