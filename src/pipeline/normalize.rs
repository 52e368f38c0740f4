//! Result normalization: mode-specific response bodies → [`AnalysisResult`].
//!
//! | Mode | Body | Result |
//! |------|------|--------|
//! | Text / Website / Document | `{label, score}` | `Score` |
//! | Image | `{human, machine[, image_url]}` | `DualScore` + majority verdict |
//! | Deep Dive | `{response}` | `Narrative`, verbatim |
//!
//! Only `LABEL_1` and `LABEL_0` map to a verdict. Anything else is left
//! unset rather than guessed; which way an unknown label should fall is a
//! question for the service owners, not the client.

use crate::error::NoCapError;
use crate::mode::AnalysisMode;
use crate::output::{AnalysisResult, ImageVerdict, Verdict};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct ScoreBody {
    #[serde(default)]
    label: Option<String>,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct DualScoreBody {
    human: f64,
    machine: f64,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NarrativeBody {
    response: String,
}

/// Map a raw classifier label to a verdict.
pub fn map_label(label: &str) -> Option<Verdict> {
    match label {
        "LABEL_1" => Some(Verdict::Fax),
        "LABEL_0" => Some(Verdict::Cap),
        _ => None,
    }
}

/// Normalize a successful response body for `mode`.
///
/// A body that does not match the mode's schema is a
/// [`NoCapError::Decode`].
pub fn normalize(mode: AnalysisMode, body: &[u8]) -> Result<AnalysisResult, NoCapError> {
    let what = format!("{mode} response");
    let result = match mode {
        AnalysisMode::Text | AnalysisMode::Website | AnalysisMode::Document => {
            let b: ScoreBody =
                serde_json::from_slice(body).map_err(|e| NoCapError::decode(&what, e))?;
            let label = b.label.as_deref().and_then(map_label);
            if label.is_none() {
                warn!("Unmapped classifier label {:?}; leaving verdict unset", b.label);
            }
            AnalysisResult::Score {
                label,
                score: b.score,
            }
        }
        AnalysisMode::Image => {
            let b: DualScoreBody =
                serde_json::from_slice(body).map_err(|e| NoCapError::decode(&what, e))?;
            AnalysisResult::DualScore {
                human: b.human,
                machine: b.machine,
                verdict: ImageVerdict::from_scores(b.human, b.machine),
                image_url: b.image_url,
            }
        }
        AnalysisMode::DeepDive => {
            let b: NarrativeBody =
                serde_json::from_slice(body).map_err(|e| NoCapError::decode(&what, e))?;
            AnalysisResult::Narrative { text: b.response }
        }
    };
    debug!("Normalized {} result: {:?}", mode, result);
    Ok(result)
}
