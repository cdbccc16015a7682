use std::path::Path;

use image::ImageFormat;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Image encodings that can be placed on a PDF page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }
}

/// A user-selected file waiting to be converted.
#[derive(Debug, Clone)]
pub struct ImageSource {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageSource {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Reads a file from disk. The MIME type comes from the extension when it
    /// names a known image format, otherwise from the file's magic bytes.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mime = ImageFormat::from_path(path)
            .or_else(|_| image::guess_format(&bytes))
            .map(|format| format.to_mime_type())
            .unwrap_or(FALLBACK_MIME);

        Ok(Self::new(name, mime, bytes))
    }

    pub fn kind(&self) -> Option<ImageKind> {
        ImageKind::from_mime(&self.mime)
    }

    pub fn is_image(&self) -> bool {
        self.mime.trim().to_ascii_lowercase().starts_with("image/")
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }
}
