//! Evidence bundles: the images and audio offered as proof that a step was
//! performed.
//!
//! Media types are a closed enumeration. Anything outside it is rejected when
//! the bundle is built, so the analyzer never sees an unsupported payload.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("{kind} media type {media_type} supplied as {expected} evidence")]
    WrongKind {
        media_type: MediaType,
        kind: MediaKind,
        expected: MediaKind,
    },

    #[error("Evidence file {path} is unreadable: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Broad category of a media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// Supported evidence media types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Jpeg,
    Png,
    Webp,
    Mp3,
    Wav,
}

impl MediaType {
    /// Parse a MIME string (case-insensitive, parameters ignored).
    pub fn from_mime(mime: &str) -> Result<Self, EvidenceError> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "image/jpeg" | "image/jpg" => Ok(MediaType::Jpeg),
            "image/png" => Ok(MediaType::Png),
            "image/webp" => Ok(MediaType::Webp),
            "audio/mpeg" | "audio/mp3" => Ok(MediaType::Mp3),
            "audio/wav" | "audio/wave" | "audio/x-wav" => Ok(MediaType::Wav),
            _ => Err(EvidenceError::UnsupportedMediaType(mime.to_string())),
        }
    }

    /// Infer the media type from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, EvidenceError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| EvidenceError::UnsupportedMediaType(path.display().to_string()))?;

        match ext.as_str() {
            "jpg" | "jpeg" => Ok(MediaType::Jpeg),
            "png" => Ok(MediaType::Png),
            "webp" => Ok(MediaType::Webp),
            "mp3" => Ok(MediaType::Mp3),
            "wav" => Ok(MediaType::Wav),
            _ => Err(EvidenceError::UnsupportedMediaType(format!(".{}", ext))),
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Webp => "image/webp",
            MediaType::Mp3 => "audio/mpeg",
            MediaType::Wav => "audio/wav",
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            MediaType::Jpeg | MediaType::Png | MediaType::Webp => MediaKind::Image,
            MediaType::Mp3 | MediaType::Wav => MediaKind::Audio,
        }
    }

    /// Short format name used by `input_audio` request parts.
    pub fn audio_format(&self) -> Option<&'static str> {
        match self {
            MediaType::Mp3 => Some("mp3"),
            MediaType::Wav => Some("wav"),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// One binary evidence payload with its validated media type.
#[derive(Clone, PartialEq, Eq)]
pub struct EvidenceBlob {
    media_type: MediaType,
    data: Vec<u8>,
}

impl EvidenceBlob {
    pub fn new(media_type: MediaType, data: Vec<u8>) -> Self {
        Self { media_type, data }
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.data)
    }

    /// `data:` URL suitable for an `image_url` content part.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type.mime(), self.to_base64())
    }

    /// Hex SHA-256 of the payload, for logs and audit trails.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.data))
    }
}

impl fmt::Debug for EvidenceBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvidenceBlob")
            .field("media_type", &self.media_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Images and audio supplied for one verification call.
///
/// # Invariants
/// - Every blob in `images` has `MediaKind::Image`
/// - Every blob in `audio` has `MediaKind::Audio`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceBundle {
    images: Vec<EvidenceBlob>,
    audio: Vec<EvidenceBlob>,
}

impl EvidenceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an image, rejecting non-image media types.
    pub fn push_image(&mut self, blob: EvidenceBlob) -> Result<(), EvidenceError> {
        Self::check_kind(&blob, MediaKind::Image)?;
        self.images.push(blob);
        Ok(())
    }

    /// Append an audio clip, rejecting non-audio media types.
    pub fn push_audio(&mut self, blob: EvidenceBlob) -> Result<(), EvidenceError> {
        Self::check_kind(&blob, MediaKind::Audio)?;
        self.audio.push(blob);
        Ok(())
    }

    /// Builder form of [`push_image`](Self::push_image).
    pub fn with_image(mut self, blob: EvidenceBlob) -> Result<Self, EvidenceError> {
        self.push_image(blob)?;
        Ok(self)
    }

    /// Builder form of [`push_audio`](Self::push_audio).
    pub fn with_audio(mut self, blob: EvidenceBlob) -> Result<Self, EvidenceError> {
        self.push_audio(blob)?;
        Ok(self)
    }

    fn check_kind(blob: &EvidenceBlob, expected: MediaKind) -> Result<(), EvidenceError> {
        let kind = blob.media_type.kind();
        if kind != expected {
            return Err(EvidenceError::WrongKind {
                media_type: blob.media_type,
                kind,
                expected,
            });
        }
        Ok(())
    }

    /// Read evidence files from disk.
    ///
    /// Files that cannot be read or carry an unsupported extension are skipped
    /// and returned alongside the bundle, so the caller can still run the
    /// verification on the evidence that did load.
    pub async fn from_paths<P: AsRef<Path>>(
        image_paths: &[P],
        audio_paths: &[P],
    ) -> (Self, Vec<EvidenceError>) {
        let mut bundle = Self::new();
        let mut errors = Vec::new();

        for path in image_paths {
            match read_blob(path.as_ref()).await {
                Ok(blob) => {
                    if let Err(e) = bundle.push_image(blob) {
                        errors.push(e);
                    }
                }
                Err(e) => errors.push(e),
            }
        }

        for path in audio_paths {
            match read_blob(path.as_ref()).await {
                Ok(blob) => {
                    if let Err(e) = bundle.push_audio(blob) {
                        errors.push(e);
                    }
                }
                Err(e) => errors.push(e),
            }
        }

        for e in &errors {
            tracing::warn!("Skipping evidence: {}", e);
        }

        (bundle, errors)
    }

    pub fn images(&self) -> &[EvidenceBlob] {
        &self.images
    }

    pub fn audio(&self) -> &[EvidenceBlob] {
        &self.audio
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.audio.is_empty()
    }

    /// Short fingerprints of every blob, images first.
    pub fn fingerprints(&self) -> Vec<String> {
        self.images
            .iter()
            .chain(self.audio.iter())
            .map(|b| b.fingerprint()[..12].to_string())
            .collect()
    }
}

async fn read_blob(path: &Path) -> Result<EvidenceBlob, EvidenceError> {
    let media_type = MediaType::from_path(path)?;
    let data = tokio::fs::read(path)
        .await
        .map_err(|source| EvidenceError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(EvidenceBlob::new(media_type, data))
}
