//! Turns JPEG and PNG images into PDF documents, one page per image, each
//! page sized to the image's pixel dimensions.

pub mod builder;
pub mod compress;
pub mod convert;
pub mod embed;
pub mod error;
pub mod queue;
pub mod source;
pub mod wasm;

pub use builder::{create_merged_pdf, create_single_page_pdf, MergedPdf, PdfBuilder};
pub use compress::compress_pdf;
pub use convert::{convert, convert_with_progress, ConvertOptions, PdfOutput, Stage};
pub use error::{ConvertError, QueueError};
pub use queue::ImageQueue;
pub use source::{ImageKind, ImageSource};
