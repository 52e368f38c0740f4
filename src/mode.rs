//! Analysis modes and the mode selector.
//!
//! The text flow has two optional refinements, Deep Dive and Website. They
//! are mutually exclusive, so they live in a single [`TextVariant`] and
//! "both on" cannot be expressed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which refinement of the text flow is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextVariant {
    /// Plain Fax/Cap classification of the text. (default)
    #[default]
    Plain,
    /// Narrative, web-backed investigation of the claim.
    DeepDive,
    /// The text is a URL whose page headline gets classified.
    Website,
}

/// One of the five supported analysis flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Text,
    DeepDive,
    Website,
    Image,
    Document,
}

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 5] = [
        AnalysisMode::Text,
        AnalysisMode::DeepDive,
        AnalysisMode::Website,
        AnalysisMode::Image,
        AnalysisMode::Document,
    ];

    /// Endpoint path on the inference service.
    pub fn endpoint(self) -> &'static str {
        match self {
            AnalysisMode::Text => "/mode/text",
            AnalysisMode::DeepDive => "/mode/deep_dive",
            AnalysisMode::Website => "/mode/website",
            AnalysisMode::Document => "/mode/file",
            AnalysisMode::Image => "/mode/image_mode",
        }
    }

    /// Whether submissions in this mode drive the simulated progress bar.
    ///
    /// Only the upload modes carry a payload large enough to be worth it.
    pub fn has_progress(self) -> bool {
        matches!(self, AnalysisMode::Image | AnalysisMode::Document)
    }

    /// Whether this mode reads its input from the shared text box.
    pub fn uses_text_input(self) -> bool {
        matches!(
            self,
            AnalysisMode::Text | AnalysisMode::DeepDive | AnalysisMode::Website
        )
    }

    /// The text-flow refinement this mode corresponds to, if any.
    pub fn text_variant(self) -> Option<TextVariant> {
        match self {
            AnalysisMode::Text => Some(TextVariant::Plain),
            AnalysisMode::DeepDive => Some(TextVariant::DeepDive),
            AnalysisMode::Website => Some(TextVariant::Website),
            AnalysisMode::Image | AnalysisMode::Document => None,
        }
    }
}

impl From<TextVariant> for AnalysisMode {
    fn from(v: TextVariant) -> Self {
        match v {
            TextVariant::Plain => AnalysisMode::Text,
            TextVariant::DeepDive => AnalysisMode::DeepDive,
            TextVariant::Website => AnalysisMode::Website,
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisMode::Text => "text",
            AnalysisMode::DeepDive => "deep-dive",
            AnalysisMode::Website => "website",
            AnalysisMode::Image => "image",
            AnalysisMode::Document => "document",
        };
        f.write_str(s)
    }
}

/// The page a user is on: the text flow (with its variant) or an upload flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "page", content = "variant", rename_all = "snake_case")]
enum Page {
    Text(TextVariant),
    Image,
    Document,
}

/// Tracks the single active [`AnalysisMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSelector {
    page: Page,
}

impl Default for ModeSelector {
    fn default() -> Self {
        Self {
            page: Page::Text(TextVariant::Plain),
        }
    }
}

impl ModeSelector {
    pub fn new(mode: AnalysisMode) -> Self {
        let mut s = Self::default();
        s.select(mode);
        s
    }

    /// The currently active mode.
    pub fn active(&self) -> AnalysisMode {
        match self.page {
            Page::Text(v) => v.into(),
            Page::Image => AnalysisMode::Image,
            Page::Document => AnalysisMode::Document,
        }
    }

    /// Make `target` the active mode.
    ///
    /// Selecting Deep Dive replaces Website and vice versa.
    pub fn select(&mut self, target: AnalysisMode) {
        self.page = match target {
            AnalysisMode::Image => Page::Image,
            AnalysisMode::Document => Page::Document,
            text => Page::Text(text.text_variant().unwrap_or_default()),
        };
    }

    /// Flip a text-flow refinement the way the Deep Dive / Website buttons do.
    ///
    /// Toggling the active variant turns it off (back to plain text);
    /// toggling the other one switches to it. Outside the text flow this
    /// enters the text flow with the requested variant.
    pub fn toggle(&mut self, variant: TextVariant) -> AnalysisMode {
        self.page = match self.page {
            Page::Text(current) if current == variant => Page::Text(TextVariant::Plain),
            _ => Page::Text(variant),
        };
        self.active()
    }

    pub fn is_deep_dive(&self) -> bool {
        self.page == Page::Text(TextVariant::DeepDive)
    }

    pub fn is_website(&self) -> bool {
        self.page == Page::Text(TextVariant::Website)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_plain_text() {
        let s = ModeSelector::default();
        assert_eq!(s.active(), AnalysisMode::Text);
        assert!(!s.is_deep_dive());
        assert!(!s.is_website());
    }

    #[test]
    fn deep_dive_and_website_never_both_active() {
        let mut s = ModeSelector::default();
        let sequence = [
            AnalysisMode::DeepDive,
            AnalysisMode::Website,
            AnalysisMode::DeepDive,
            AnalysisMode::Image,
            AnalysisMode::Website,
            AnalysisMode::Text,
            AnalysisMode::Document,
        ];
        for m in sequence {
            s.select(m);
            assert_eq!(s.active(), m);
            assert!(!(s.is_deep_dive() && s.is_website()));
        }
    }

    #[test]
    fn toggle_matches_button_semantics() {
        let mut s = ModeSelector::default();
        assert_eq!(s.toggle(TextVariant::DeepDive), AnalysisMode::DeepDive);
        assert_eq!(s.toggle(TextVariant::Website), AnalysisMode::Website);
        assert!(!s.is_deep_dive());
        assert_eq!(s.toggle(TextVariant::Website), AnalysisMode::Text);
        assert!(!s.is_website());
    }

    #[test]
    fn toggle_from_upload_page_enters_text_flow() {
        let mut s = ModeSelector::new(AnalysisMode::Image);
        assert_eq!(s.toggle(TextVariant::DeepDive), AnalysisMode::DeepDive);
    }

    #[test]
    fn endpoints() {
        assert_eq!(AnalysisMode::Text.endpoint(), "/mode/text");
        assert_eq!(AnalysisMode::DeepDive.endpoint(), "/mode/deep_dive");
        assert_eq!(AnalysisMode::Website.endpoint(), "/mode/website");
        assert_eq!(AnalysisMode::Document.endpoint(), "/mode/file");
        assert_eq!(AnalysisMode::Image.endpoint(), "/mode/image_mode");
    }

    #[test]
    fn only_upload_modes_have_progress() {
        let with: Vec<_> = AnalysisMode::ALL
            .into_iter()
            .filter(|m| m.has_progress())
            .collect();
        assert_eq!(with, vec![AnalysisMode::Image, AnalysisMode::Document]);
    }
}
