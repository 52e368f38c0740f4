//! Pipeline stages for one analysis submission.
//!
//! Each submodule implements exactly one step, so each is independently
//! testable and the orchestrator only wires them together.
//!
//! ## Data Flow
//!
//! ```text
//! capture ──▶ encode ──▶ dispatch ──▶ normalize
//! (camera/   (payload)   (HTTP +      (result
//!  file)                  bearer)      model)
//! ```
//!
//! 1. [`capture`]: camera stills and picked files; device work runs in
//!    `spawn_blocking` with guaranteed release
//! 2. [`encode`]: mode-specific wire payloads (text, URL, multipart
//!    bytes, base64 data URL)
//! 3. [`dispatch`]: the single authenticated HTTP attempt; the only stage
//!    with network I/O
//! 4. [`normalize`]: response schemas → [`crate::output::AnalysisResult`]

pub mod capture;
pub mod dispatch;
pub mod encode;
pub mod normalize;
