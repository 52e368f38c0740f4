//! Normalized analysis results.
//!
//! Three response schemas come back from the service; they are folded into
//! one [`AnalysisResult`] so a front end renders a single model.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The Fax/Cap call for a score-style result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// True / factual (`LABEL_1`).
    Fax,
    /// False / made up (`LABEL_0`).
    Cap,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Fax => f.write_str("Fax"),
            Verdict::Cap => f.write_str("Cap"),
        }
    }
}

/// Majority call derived from an image's human/machine scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageVerdict {
    HumanGenerated,
    MachineGenerated,
}

impl ImageVerdict {
    /// `HumanGenerated` only when `human` strictly beats `machine`.
    pub fn from_scores(human: f64, machine: f64) -> Self {
        if human > machine {
            ImageVerdict::HumanGenerated
        } else {
            ImageVerdict::MachineGenerated
        }
    }
}

impl fmt::Display for ImageVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageVerdict::HumanGenerated => f.write_str("human-generated"),
            ImageVerdict::MachineGenerated => f.write_str("machine-generated"),
        }
    }
}

/// A mode-appropriate analysis outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AnalysisResult {
    /// Text, Website and Document modes.
    ///
    /// `label` is `None` when the service returned a label other than
    /// `LABEL_0`/`LABEL_1`.
    Score { label: Option<Verdict>, score: f64 },
    /// Image mode.
    DualScore {
        human: f64,
        machine: f64,
        verdict: ImageVerdict,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
    },
    /// Deep Dive mode.
    Narrative { text: String },
}

impl AnalysisResult {
    /// The Fax/Cap label, for score results that have one.
    pub fn label(&self) -> Option<Verdict> {
        match self {
            AnalysisResult::Score { label, .. } => *label,
            _ => None,
        }
    }

    /// Score as a percentage rounded to two decimals, for score results.
    pub fn confidence_percent(&self) -> Option<f64> {
        match self {
            AnalysisResult::Score { score, .. } => Some((score * 10_000.0).round() / 100.0),
            _ => None,
        }
    }

    /// Majority verdict, for image results.
    pub fn image_verdict(&self) -> Option<ImageVerdict> {
        match self {
            AnalysisResult::DualScore { verdict, .. } => Some(*verdict),
            _ => None,
        }
    }

    /// Deep-dive narrative, for narrative results.
    pub fn narrative(&self) -> Option<Narrative<'_>> {
        match self {
            AnalysisResult::Narrative { text } => Some(Narrative(text)),
            _ => None,
        }
    }
}

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisResult::Score { label, score } => {
                if let Some(l) = label {
                    writeln!(f, "That's total {l}")?;
                }
                write!(f, "{:.2}% sure about this one", score * 100.0)
            }
            AnalysisResult::DualScore {
                human,
                machine,
                verdict,
                ..
            } => write!(
                f,
                "Human score: {human}\nMachine score: {machine}\nVerdict: {verdict}"
            ),
            AnalysisResult::Narrative { text } => f.write_str(text),
        }
    }
}

static RE_ANSWER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?si)<answer>\s*(.*?)\s*</answer>").unwrap());

static RE_SOURCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?si)<sources>\s*(.*?)\s*</sources>").unwrap());

/// Borrowed view of a deep-dive narrative.
///
/// The service is prompted to answer as
/// `<answer>True/False</answer><sources>[…]</sources>`, but nothing enforces
/// it, so both accessors are optional and the raw text stays authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Narrative<'a>(&'a str);

impl<'a> Narrative<'a> {
    pub fn text(&self) -> &'a str {
        self.0
    }

    /// Contents of the `<answer>` section, if present.
    pub fn answer(&self) -> Option<&'a str> {
        RE_ANSWER
            .captures(self.0)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    /// Sources listed in the `<sources>` section, split on commas/newlines.
    pub fn sources(&self) -> Vec<&'a str> {
        let Some(body) = RE_SOURCES.captures(self.0).and_then(|c| c.get(1)) else {
            return Vec::new();
        };
        body.as_str()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split([',', '\n'])
            .map(|s| s.trim().trim_matches('"'))
            .filter(|s| !s.is_empty())
            .collect()
    }
}
