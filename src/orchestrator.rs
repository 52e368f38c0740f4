//! The submission orchestrator: mode, inputs, state machine, outcome.
//!
//! ## State machine
//!
//! ```text
//!          submit (input present)
//!  Idle ───────────────▶ Preparing ──encode ok──▶ Submitting ──token ok──▶ AwaitingResponse
//!   ▲                       │                        │                        │      │
//!   │                   DecodeError            AuthRequired               non-2xx   2xx
//!   │                       ▼                        ▼                    /transport  ▼
//!   └──── next action ── Failed ◀─────────────────────────────────────────────┘   Success
//! ```
//!
//! Success and Failed are not sticky: the next mode switch or submit moves
//! back to Idle first. Only one submission can be in flight because
//! [`Orchestrator::submit`] borrows the orchestrator mutably for its whole
//! duration.

use crate::config::ClientConfig;
use crate::credential::CredentialSupplier;
use crate::error::NoCapError;
use crate::mode::{AnalysisMode, ModeSelector, TextVariant};
use crate::output::AnalysisResult;
use crate::pipeline::capture::{self, CameraDevice, FileAccept, MediaFile};
use crate::pipeline::dispatch::Dispatcher;
use crate::pipeline::encode::{self, RawInput};
use crate::pipeline::normalize;
use crate::progress::{NoopObserver, Observer, ProgressTracker};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where a submission is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    Idle,
    Preparing,
    Submitting,
    AwaitingResponse,
    Success,
    Failed,
}

impl SubmissionState {
    /// Whether a submission is currently running.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            SubmissionState::Preparing
                | SubmissionState::Submitting
                | SubmissionState::AwaitingResponse
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SubmissionState::Success | SubmissionState::Failed)
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(self, next: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Idle, Preparing)
                | (Preparing, Submitting)
                | (Preparing, Failed)
                | (Submitting, AwaitingResponse)
                | (Submitting, Failed)
                | (AwaitingResponse, Success)
                | (AwaitingResponse, Failed)
                | (Success, Idle)
                | (Failed, Idle)
        )
    }
}

/// Drives one user's analysis submissions.
pub struct Orchestrator {
    dispatcher: Dispatcher,
    selector: ModeSelector,
    text: String,
    image: Option<MediaFile>,
    /// Located path or in-memory file; bytes are read when encoding.
    document: Option<RawInput>,
    preview: Option<String>,
    state: SubmissionState,
    result: Option<AnalysisResult>,
    error: Option<String>,
    progress: ProgressTracker,
    observer: Observer,
}

impl Orchestrator {
    pub fn new(config: ClientConfig) -> Result<Self, NoCapError> {
        let observer: Observer = Arc::new(NoopObserver);
        Ok(Self {
            dispatcher: Dispatcher::new(config)?,
            selector: ModeSelector::default(),
            text: String::new(),
            image: None,
            document: None,
            preview: None,
            state: SubmissionState::Idle,
            result: None,
            error: None,
            progress: ProgressTracker::new(Arc::clone(&observer)),
            observer,
        })
    }

    /// Route state, progress, result and error events to `observer`.
    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.progress = ProgressTracker::new(Arc::clone(&observer));
        self.observer = observer;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn mode(&self) -> AnalysisMode {
        self.selector.active()
    }

    pub fn selector(&self) -> &ModeSelector {
        &self.selector
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    /// Current progress percentage (always 0 for modes without progress).
    pub fn progress(&self) -> u8 {
        self.progress.value()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// The single user-visible error message slot.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// `data:` URL preview of the file or capture for the active upload mode.
    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn config(&self) -> &ClientConfig {
        self.dispatcher.config()
    }

    /// Whether the active mode's required raw input is present.
    pub fn can_submit(&self) -> bool {
        self.missing_input().is_none()
    }

    // ── Mode selection ───────────────────────────────────────────────────

    /// Make `mode` active, clearing any stale outcome.
    pub fn select_mode(&mut self, mode: AnalysisMode) {
        self.begin_action();
        self.selector.select(mode);
        self.clear_outcome();
        self.refresh_preview();
        debug!("Mode selected: {}", mode);
    }

    /// Flip the Deep Dive / Website refinement of the text flow.
    pub fn toggle(&mut self, variant: TextVariant) -> AnalysisMode {
        self.begin_action();
        let mode = self.selector.toggle(variant);
        self.clear_outcome();
        self.refresh_preview();
        debug!("Mode toggled to {}", mode);
        mode
    }

    // ── Inputs ───────────────────────────────────────────────────────────

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Pick a file for the active upload mode.
    ///
    /// Images are read now so a preview can be shown. Documents are only
    /// located; their bytes are read when the submission is encoded.
    pub async fn choose_file(&mut self, path: impl AsRef<Path>) -> Result<(), NoCapError> {
        let path = path.as_ref();
        let picked = match self.mode() {
            AnalysisMode::Image => capture::pick_file(path, FileAccept::Images)
                .await
                .map(RawInput::Media),
            AnalysisMode::Document => capture::locate_file(path, FileAccept::Documents)
                .await
                .map(|()| RawInput::Path(path.to_path_buf())),
            mode => Err(NoCapError::Validation(format!(
                "{mode} mode does not take a file"
            ))),
        };
        match picked {
            Ok(input) => self.store_upload(input),
            Err(e) => Err(self.report(e)),
        }
    }

    /// Capture a still from `device` as the image to analyse.
    ///
    /// A camera failure lands in the error slot like any other error; the
    /// device is released either way.
    pub async fn capture_from_camera(
        &mut self,
        device: Arc<dyn CameraDevice>,
    ) -> Result<(), NoCapError> {
        if self.mode() != AnalysisMode::Image {
            let e = NoCapError::Validation(format!(
                "camera capture is only available in image mode, not {}",
                self.mode()
            ));
            return Err(self.report(e));
        }
        match capture::capture_still(device).await {
            Ok(file) => self.set_media(file),
            Err(e) => Err(self.report(e)),
        }
    }

    /// Use an in-memory file or capture for the active upload mode.
    pub fn set_media(&mut self, file: MediaFile) -> Result<(), NoCapError> {
        self.store_upload(RawInput::Media(file))
    }

    // ── Submission ───────────────────────────────────────────────────────

    /// Run one submission for the active mode.
    ///
    /// A fresh credential is requested from `credentials` right before the
    /// request. Any error is also stored in [`Self::error`].
    pub async fn submit(
        &mut self,
        credentials: &dyn CredentialSupplier,
    ) -> Result<AnalysisResult, NoCapError> {
        self.begin_action();
        let mode = self.mode();

        if let Some(missing) = self.missing_input() {
            warn!("Submit blocked in {} mode: {}", mode, missing);
            return Err(self.report(NoCapError::Validation(missing)));
        }

        let start = Instant::now();
        info!("Starting {} submission", mode);

        // ── Preparing ────────────────────────────────────────────────────
        self.transition(SubmissionState::Preparing);
        self.clear_outcome();

        let Some(raw) = self.raw_input() else {
            return self.fail(NoCapError::Validation(format!("no input for {mode} mode")));
        };
        let payload = match encode::encode_payload(mode, raw).await {
            Ok(p) => p,
            Err(e) => return self.fail(e),
        };

        // ── Submitting ───────────────────────────────────────────────────
        self.transition(SubmissionState::Submitting);
        let ticks = mode
            .has_progress()
            .then(|| self.progress.start(self.dispatcher.config()));

        let credential = credentials.current_token().await;
        if credential.is_some() {
            self.transition(SubmissionState::AwaitingResponse);
        }

        // ── AwaitingResponse ─────────────────────────────────────────────
        let outcome = match self
            .dispatcher
            .dispatch(mode, &payload, credential.as_ref())
            .await
        {
            Ok(raw) => normalize::normalize(mode, &raw.body),
            Err(e) => Err(e),
        };
        drop(credential);

        match outcome {
            Ok(result) => {
                if let Some(t) = ticks {
                    t.succeed(self.dispatcher.config().success_display());
                }
                self.transition(SubmissionState::Success);
                info!(
                    "{} submission complete in {}ms",
                    mode,
                    start.elapsed().as_millis()
                );
                self.observer.on_result(&result);
                self.result = Some(result.clone());
                Ok(result)
            }
            Err(e) => {
                if let Some(t) = ticks {
                    t.fail();
                }
                self.fail(e)
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────────────

    /// Describe what the active mode is missing, if anything.
    fn missing_input(&self) -> Option<String> {
        match self.mode() {
            m if m.uses_text_input() => self
                .text
                .trim()
                .is_empty()
                .then(|| "please enter some text to check".to_string()),
            AnalysisMode::Image => self
                .image
                .is_none()
                .then(|| "choose an image or take a photo first".to_string()),
            AnalysisMode::Document => self
                .document
                .is_none()
                .then(|| "choose a document first".to_string()),
            _ => None,
        }
    }

    /// The active mode's input, or `None` when it has none yet.
    fn raw_input(&self) -> Option<RawInput> {
        match self.mode() {
            AnalysisMode::Image => self.image.clone().map(RawInput::Media),
            AnalysisMode::Document => self.document.clone(),
            _ => Some(RawInput::Text(self.text.clone())),
        }
    }

    fn store_upload(&mut self, input: RawInput) -> Result<(), NoCapError> {
        match (self.mode(), input) {
            (AnalysisMode::Image, RawInput::Media(file)) => {
                debug!("Image set: {} ({} bytes)", file.filename, file.len());
                self.image = Some(file);
            }
            (AnalysisMode::Document, RawInput::Path(path)) => {
                debug!("Document located: {}", path.display());
                self.document = Some(RawInput::Path(path));
            }
            (AnalysisMode::Document, RawInput::Media(file)) => {
                debug!("Document set: {} ({} bytes)", file.filename, file.len());
                self.document = Some(RawInput::Media(file));
            }
            (mode, _) => {
                return Err(self.report(NoCapError::Validation(format!(
                    "{mode} mode does not take this input"
                ))))
            }
        }
        self.begin_action();
        self.clear_outcome();
        self.refresh_preview();
        Ok(())
    }

    fn refresh_preview(&mut self) {
        self.preview = match self.mode() {
            AnalysisMode::Image => self.image.as_ref().map(MediaFile::data_url),
            _ => None,
        };
    }

    /// Leave a terminal state before handling the next user action.
    fn begin_action(&mut self) {
        if self.state.is_terminal() {
            self.transition(SubmissionState::Idle);
            self.progress.reset();
        } else if self.state.is_busy() {
            // Only reachable when a submit future was dropped mid-flight.
            warn!("Abandoned {:?} submission; returning to Idle", self.state);
            self.state = SubmissionState::Idle;
            self.progress.reset();
            self.observer
                .on_state_change(self.mode(), SubmissionState::Idle);
        }
    }

    fn clear_outcome(&mut self) {
        self.result = None;
        self.error = None;
    }

    fn transition(&mut self, next: SubmissionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} → {:?}",
            self.state,
            next
        );
        debug!("{:?} → {:?}", self.state, next);
        self.state = next;
        self.observer.on_state_change(self.mode(), next);
    }

    /// Put an error that did not come from a submission into the error slot.
    fn report(&mut self, e: NoCapError) -> NoCapError {
        warn!("{} input rejected: {}", self.mode(), e);
        self.error = Some(e.to_string());
        self.observer.on_error(&e);
        e
    }

    fn fail(&mut self, e: NoCapError) -> Result<AnalysisResult, NoCapError> {
        warn!("{} submission failed: {}", self.mode(), e);
        self.transition(SubmissionState::Failed);
        self.error = Some(e.to_string());
        self.observer.on_error(&e);
        Err(e)
    }
}
