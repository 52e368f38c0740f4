//! # nocap
//!
//! Submit text, URLs, documents, or images to a Fax/Cap classification
//! service and get back one normalized verdict.
//!
//! ## Modes
//!
//! | Mode | Input | Endpoint | Result |
//! |------|-------|----------|--------|
//! | Text | text box | `/mode/text` | Fax/Cap + score |
//! | Deep Dive | text box | `/mode/deep_dive` | narrative |
//! | Website | text box (URL) | `/mode/website` | Fax/Cap + score |
//! | Document | `.txt`/`.pdf` | `/mode/file` | Fax/Cap + score |
//! | Image | picture or camera still | `/mode/image_mode` | human/machine scores |
//!
//! ## Pipeline Overview
//!
//! ```text
//! input
//!  │
//!  ├─ 1. Select   pick exactly one mode (Deep Dive / Website are exclusive)
//!  ├─ 2. Capture  read a file, or grab one camera frame and release the device
//!  ├─ 3. Encode   text / URL / multipart bytes / base64 data URL
//!  ├─ 4. Auth     fetch a fresh bearer token from the injected supplier
//!  ├─ 5. Send     one POST, simulated progress for uploads
//!  └─ 6. Shape    LABEL_1 → Fax, LABEL_0 → Cap, image majority, narrative
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nocap::{AnalysisMode, ClientConfig, Orchestrator, StaticCredential};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut orchestrator = Orchestrator::new(ClientConfig::from_env()?)?;
//!     orchestrator.select_mode(AnalysisMode::Text);
//!     orchestrator.set_text("The sky is green");
//!
//!     let result = orchestrator.submit(&StaticCredential::new("id-token")).await?;
//!     println!("{result}");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `nocap` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod credential;
pub mod error;
pub mod mode;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ClientConfig, ClientConfigBuilder};
pub use credential::{Credential, CredentialSupplier, EnvCredential, StaticCredential};
pub use error::NoCapError;
pub use mode::{AnalysisMode, ModeSelector, TextVariant};
pub use orchestrator::{Orchestrator, SubmissionState};
pub use output::{AnalysisResult, ImageVerdict, Narrative, Verdict};
pub use pipeline::capture::{
    capture_still, locate_file, pick_file, CameraDevice, CaptureSession, FileAccept,
    ImageFileCamera, MediaFile, MediaStream,
};
pub use pipeline::dispatch::{Dispatcher, RawResponse};
pub use pipeline::encode::{encode_payload, RawInput, SubmissionPayload};
pub use pipeline::normalize::normalize;
pub use progress::{NoopObserver, Observer, ProgressTracker, SubmissionObserver, TickGuard};
