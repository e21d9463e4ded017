use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use tempfile::TempPath;

const IMAGE_MEDIA_PREFIX: &str = "image/";
const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// A file offered for selection, before the media-type check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl ImageCandidate {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Declares the media type from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|value| value.to_str())
            .filter(|value| !value.is_empty())
            .unwrap_or("upload")
            .to_string();
        let media_type = media_type_for_path(path).unwrap_or(FALLBACK_MEDIA_TYPE);
        Ok(Self::new(file_name, media_type, bytes))
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with(IMAGE_MEDIA_PREFIX)
    }
}

pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

/// What the transport sends. Bytes are shared so the upload worker can hold a
/// copy without touching the controller's selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Arc<[u8]>,
}

/// A local file mirroring the selected image, removed when the handle drops.
#[derive(Debug)]
pub struct PreviewHandle {
    path: TempPath,
}

impl PreviewHandle {
    fn create(dir: &Path, media_type: &str, bytes: &[u8]) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create preview dir {}", dir.display()))?;
        let suffix = format!(".{}", extension_for_media_type(media_type));
        let mut file = tempfile::Builder::new()
            .prefix("ecolens-preview-")
            .suffix(&suffix)
            .tempfile_in(dir)
            .with_context(|| format!("failed to create preview in {}", dir.display()))?;
        file.write_all(bytes).context("failed writing preview bytes")?;
        file.flush()?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An accepted selection. Only constructible from image media.
#[derive(Debug)]
pub struct SelectedImage {
    upload: ImageUpload,
    sha256: String,
    preview: PreviewHandle,
}

impl SelectedImage {
    pub fn create(candidate: ImageCandidate, preview_dir: &Path) -> Result<Self> {
        if !candidate.is_image() {
            bail!(
                "{} is not image media ({})",
                candidate.file_name,
                candidate.media_type
            );
        }
        let preview = PreviewHandle::create(preview_dir, &candidate.media_type, &candidate.bytes)?;
        let sha256 = hex::encode(Sha256::digest(&candidate.bytes));
        Ok(Self {
            upload: ImageUpload {
                file_name: candidate.file_name,
                media_type: candidate.media_type,
                bytes: Arc::from(candidate.bytes),
            },
            sha256,
            preview,
        })
    }

    pub fn upload(&self) -> &ImageUpload {
        &self.upload
    }

    pub fn file_name(&self) -> &str {
        &self.upload.file_name
    }

    pub fn media_type(&self) -> &str {
        &self.upload.media_type
    }

    pub fn byte_len(&self) -> usize {
        self.upload.bytes.len()
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn preview_path(&self) -> &Path {
        self.preview.path()
    }
}

fn extension_for_media_type(media_type: &str) -> String {
    let subtype = media_type
        .strip_prefix(IMAGE_MEDIA_PREFIX)
        .unwrap_or_default()
        .split(|ch: char| ch == ';' || ch == '+')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match subtype.as_str() {
        "jpeg" => "jpg".to_string(),
        "" => "img".to_string(),
        other if other.chars().all(|ch| ch.is_ascii_alphanumeric()) => other.to_string(),
        _ => "img".to_string(),
    }
}
