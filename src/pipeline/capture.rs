//! Media capture: still frames from a camera, or a file picked from disk.
//!
//! ## Device lifetime
//!
//! A camera stream is owned by a [`CaptureSession`] for exactly one frame.
//! The session stops every track when it is released *or* dropped, so an
//! early `?`, a decode failure, or a panic on the blocking thread all leave
//! the device free. Tracks are stopped once per acquisition, never twice.
//!
//! ## Why spawn_blocking?
//!
//! Real video backends block while the sensor warms up and while frames are
//! copied out. [`capture_still`] runs the whole acquire → grab → release
//! sequence on Tokio's blocking pool so the caller sees one atomic async
//! operation that yields either a JPEG or an error, with the device already
//! released in both cases.

use crate::error::NoCapError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops, DynamicImage, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Filename given to camera captures.
pub const CAMERA_FILENAME: &str = "camera-photo.jpg";

// ── Media files ──────────────────────────────────────────────────────────

/// A binary image or document ready for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime: String,
}

impl MediaFile {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            mime: mime.into(),
        }
    }

    /// A `data:` URL of the file, for previews.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Guess a MIME type from the file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Which files a picker offers for the active mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAccept {
    /// `image/*`
    Images,
    /// `.txt,.pdf`
    Documents,
    /// No filtering.
    Any,
}

impl FileAccept {
    pub fn allows(self, path: &Path) -> bool {
        let mime = mime_for_path(path);
        match self {
            FileAccept::Images => mime.starts_with("image/"),
            FileAccept::Documents => matches!(mime, "text/plain" | "application/pdf"),
            FileAccept::Any => true,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            FileAccept::Images => "image/*",
            FileAccept::Documents => ".txt, .pdf",
            FileAccept::Any => "*",
        }
    }
}

/// Check a user-chosen file against the accept filter without reading it.
///
/// Documents are only located at pick time; their bytes are read when the
/// submission is encoded.
pub async fn locate_file(path: impl AsRef<Path>, accept: FileAccept) -> Result<(), NoCapError> {
    let path = path.as_ref();
    check_accept(path, accept)?;
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(NoCapError::decode(
            format!("file '{}'", path.display()),
            "not a regular file",
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(NoCapError::FileNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(NoCapError::decode(format!("file '{}'", path.display()), e)),
    }
}

fn check_accept(path: &Path, accept: FileAccept) -> Result<(), NoCapError> {
    if accept.allows(path) {
        Ok(())
    } else {
        Err(NoCapError::UnsupportedFile {
            path: path.to_path_buf(),
            accept: accept.describe().to_string(),
        })
    }
}

/// Read a user-chosen file, applying the picker's accept filter.
pub async fn pick_file(path: impl AsRef<Path>, accept: FileAccept) -> Result<MediaFile, NoCapError> {
    let path = path.as_ref();
    check_accept(path, accept)?;

    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => NoCapError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => NoCapError::decode(format!("file '{}'", path.display()), e),
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    debug!("Picked {} ({} bytes)", filename, bytes.len());
    Ok(MediaFile::new(bytes, filename, mime_for_path(path)))
}

// ── Camera devices ───────────────────────────────────────────────────────

/// A video input that can be opened for exclusive use.
pub trait CameraDevice: Send + Sync {
    /// Acquire the device. Fails with [`NoCapError::MediaAccess`] when
    /// permission is denied or no device exists; no handle is held then.
    fn open(&self) -> Result<Box<dyn MediaStream>, NoCapError>;
}

/// A live stream on an acquired device.
pub trait MediaStream: Send {
    /// Native `(width, height)` of the video track.
    fn resolution(&self) -> (u32, u32);

    /// Read the current frame.
    fn read_frame(&mut self) -> Result<RgbImage, NoCapError>;

    /// Stop every track and release the device.
    fn stop_tracks(&mut self);
}

/// Owns a [`MediaStream`] for a single capture.
pub struct CaptureSession {
    stream: Box<dyn MediaStream>,
    released: bool,
}

impl CaptureSession {
    pub fn acquire(device: &dyn CameraDevice) -> Result<Self, NoCapError> {
        let stream = device.open()?;
        Ok(Self {
            stream,
            released: false,
        })
    }

    /// Draw one frame onto a raster the size of the device's native resolution.
    pub fn grab_frame(&mut self) -> Result<RgbImage, NoCapError> {
        let (width, height) = self.stream.resolution();
        if width == 0 || height == 0 {
            return Err(NoCapError::MediaAccess {
                detail: "device reported no video dimensions".into(),
            });
        }

        let frame = self.stream.read_frame()?;
        if frame.dimensions() == (width, height) {
            Ok(frame)
        } else {
            debug!(
                "Scaling {}x{} frame to native {}x{}",
                frame.width(),
                frame.height(),
                width,
                height
            );
            Ok(imageops::resize(
                &frame,
                width,
                height,
                imageops::FilterType::Triangle,
            ))
        }
    }

    /// Stop all tracks now.
    pub fn release(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if !self.released {
            self.released = true;
            self.stream.stop_tracks();
            debug!("Camera tracks stopped");
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Acquire `device`, grab one frame as JPEG, and release the device.
pub async fn capture_still(device: Arc<dyn CameraDevice>) -> Result<MediaFile, NoCapError> {
    info!("Capturing still frame from camera");

    let frame = tokio::task::spawn_blocking(move || {
        let mut session = CaptureSession::acquire(device.as_ref())?;
        let frame = session.grab_frame();
        session.release();
        frame
    })
    .await
    .map_err(|e| NoCapError::MediaAccess {
        detail: format!("capture task panicked: {e}"),
    })?;

    let frame = match frame {
        Ok(f) => f,
        Err(e) => {
            warn!("Camera capture failed: {}", e);
            return Err(e);
        }
    };

    let jpeg = encode_jpeg(frame)?;
    info!("Captured {} byte JPEG", jpeg.len());
    Ok(MediaFile::new(jpeg, CAMERA_FILENAME, "image/jpeg"))
}

fn encode_jpeg(frame: RgbImage) -> Result<Vec<u8>, NoCapError> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(frame)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .map_err(|e| NoCapError::decode("camera frame", e))?;
    Ok(buf)
}

// ── File-backed camera ───────────────────────────────────────────────────

/// A virtual camera whose only frame is a still image on disk.
///
/// Useful on headless machines where a snapshot tool writes the sensor
/// image to a file, and in tests.
#[derive(Debug, Clone)]
pub struct ImageFileCamera {
    path: PathBuf,
}

impl ImageFileCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CameraDevice for ImageFileCamera {
    fn open(&self) -> Result<Box<dyn MediaStream>, NoCapError> {
        let img = image::open(&self.path).map_err(|e| NoCapError::MediaAccess {
            detail: format!("no usable video source at '{}': {e}", self.path.display()),
        })?;
        Ok(Box::new(StillStream {
            frame: Some(img.to_rgb8()),
        }))
    }
}

struct StillStream {
    frame: Option<RgbImage>,
}

impl MediaStream for StillStream {
    fn resolution(&self) -> (u32, u32) {
        self.frame.as_ref().map(|f| f.dimensions()).unwrap_or((0, 0))
    }

    fn read_frame(&mut self) -> Result<RgbImage, NoCapError> {
        self.frame.clone().ok_or_else(|| NoCapError::MediaAccess {
            detail: "stream already stopped".into(),
        })
    }

    fn stop_tracks(&mut self) {
        self.frame = None;
    }
}
