//! Payload encoding: raw user input → wire representation for a mode.
//!
//! Text and URLs go out verbatim (no URL validation here; the service
//! decides what it accepts). Documents travel as untouched multipart bytes.
//! Images are sent as JSON, so the whole file becomes a base64 `data:` URL
//! paired with its original filename.

use crate::error::NoCapError;
use crate::mode::AnalysisMode;
use crate::pipeline::capture::MediaFile;
use std::path::PathBuf;
use tracing::debug;

/// Raw, not-yet-encoded input for a submission.
#[derive(Debug, Clone)]
pub enum RawInput {
    /// Text box contents (plain text, deep-dive claim, or URL).
    Text(String),
    /// A file or camera capture already held in memory.
    Media(MediaFile),
    /// A file on disk, read at encode time.
    Path(PathBuf),
}

/// Wire-ready payload, keyed by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionPayload {
    Text(String),
    Url(String),
    File {
        bytes: Vec<u8>,
        filename: String,
        mime: String,
    },
    ImageBase64 {
        data: String,
        filename: String,
    },
}

impl SubmissionPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            SubmissionPayload::Text(_) => "text",
            SubmissionPayload::Url(_) => "url",
            SubmissionPayload::File { .. } => "file",
            SubmissionPayload::ImageBase64 { .. } => "image-base64",
        }
    }

    /// Whether this payload has the shape `mode` sends.
    pub fn fits(&self, mode: AnalysisMode) -> bool {
        matches!(
            (mode, self),
            (AnalysisMode::Text | AnalysisMode::DeepDive, SubmissionPayload::Text(_))
                | (AnalysisMode::Website, SubmissionPayload::Url(_))
                | (AnalysisMode::Document, SubmissionPayload::File { .. })
                | (AnalysisMode::Image, SubmissionPayload::ImageBase64 { .. })
        )
    }
}

/// Encode `input` for `mode`.
///
/// Resolves with the complete payload or fails; never returns a partial
/// encoding. Read failures are [`NoCapError::Decode`].
pub async fn encode_payload(
    mode: AnalysisMode,
    input: RawInput,
) -> Result<SubmissionPayload, NoCapError> {
    match (mode, input) {
        (AnalysisMode::Text | AnalysisMode::DeepDive, RawInput::Text(t)) => {
            Ok(SubmissionPayload::Text(t))
        }
        (AnalysisMode::Website, RawInput::Text(url)) => Ok(SubmissionPayload::Url(url)),
        (AnalysisMode::Document, input) => {
            let file = load_media(input).await?;
            debug!("Document payload: {} ({} bytes)", file.filename, file.len());
            Ok(SubmissionPayload::File {
                bytes: file.bytes,
                filename: file.filename,
                mime: file.mime,
            })
        }
        (AnalysisMode::Image, input) => {
            let file = load_media(input).await?;
            let data = encode_image(&file);
            debug!(
                "Image payload: {} → {} bytes base64",
                file.filename,
                data.len()
            );
            Ok(SubmissionPayload::ImageBase64 {
                data,
                filename: file.filename,
            })
        }
        (mode, _) => Err(NoCapError::Validation(format!(
            "{mode} mode needs text input"
        ))),
    }
}

/// Base64 `data:` URL for an image, as the image endpoint expects.
pub fn encode_image(file: &MediaFile) -> String {
    file.data_url()
}

async fn load_media(input: RawInput) -> Result<MediaFile, NoCapError> {
    match input {
        RawInput::Media(file) => Ok(file),
        RawInput::Path(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| NoCapError::decode(format!("file '{}'", path.display()), e))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let mime = crate::pipeline::capture::mime_for_path(&path);
            Ok(MediaFile::new(bytes, filename, mime))
        }
        RawInput::Text(_) => Err(NoCapError::Validation(
            "a file or camera capture is required".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    #[tokio::test]
    async fn text_modes_pass_verbatim() {
        let p = encode_payload(AnalysisMode::Text, RawInput::Text("The sky is green".into()))
            .await
            .unwrap();
        assert_eq!(p, SubmissionPayload::Text("The sky is green".into()));

        let p = encode_payload(AnalysisMode::Website, RawInput::Text("not a url".into()))
            .await
            .unwrap();
        assert_eq!(p, SubmissionPayload::Url("not a url".into()));
        assert!(p.fits(AnalysisMode::Website));
        assert!(!p.fits(AnalysisMode::Text));
    }

    #[tokio::test]
    async fn image_becomes_data_url_with_filename() {
        let file = MediaFile::new(vec![0xFF, 0xD8, 0xFF], "camera-photo.jpg", "image/jpeg");
        let p = encode_payload(AnalysisMode::Image, RawInput::Media(file))
            .await
            .unwrap();
        match p {
            SubmissionPayload::ImageBase64 { data, filename } => {
                assert_eq!(filename, "camera-photo.jpg");
                let (prefix, b64) = data.split_once(',').unwrap();
                assert_eq!(prefix, "data:image/jpeg;base64");
                assert_eq!(STANDARD.decode(b64).unwrap(), vec![0xFF, 0xD8, 0xFF]);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn document_bytes_are_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"%PDF-1.4 fake").unwrap();

        let p = encode_payload(AnalysisMode::Document, RawInput::Path(path))
            .await
            .unwrap();
        assert_eq!(
            p,
            SubmissionPayload::File {
                bytes: b"%PDF-1.4 fake".to_vec(),
                filename: "report.pdf".into(),
                mime: "application/pdf".into(),
            }
        );
    }

    #[tokio::test]
    async fn unreadable_file_is_decode_error() {
        let err = encode_payload(
            AnalysisMode::Document,
            RawInput::Path("/no/such/report.pdf".into()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, NoCapError::Decode { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn mismatched_input_is_validation_error() {
        let err = encode_payload(AnalysisMode::Image, RawInput::Text("hi".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, NoCapError::Validation(_)));

        let file = MediaFile::new(vec![1], "a.png", "image/png");
        let err = encode_payload(AnalysisMode::Text, RawInput::Media(file))
            .await
            .unwrap_err();
        assert!(matches!(err, NoCapError::Validation(_)));
    }
}
