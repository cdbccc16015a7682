use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Unsupported image format: {mime} ({name})")]
    UnsupportedFormat { name: String, mime: String },

    #[error("Invalid JPEG data in {name}: {reason}")]
    InvalidJpeg { name: String, reason: &'static str },

    #[error("Failed to decode image {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("No images selected")]
    NothingToConvert,

    #[error("None of the selected images could be embedded")]
    NoPages,

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Please select only image files.")]
    NoImageFiles,

    #[error("Index {index} out of range for {len} queued images")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No drag in progress")]
    NoDragInProgress,
}
