use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::builder::{create_merged_pdf, create_single_page_pdf};
use crate::compress::compress_pdf;
use crate::error::ConvertError;
use crate::source::ImageSource;

pub const MERGED_FILE_NAME: &str = "merged.pdf";
const DEFAULT_STEM: &str = "image";

lazy_static! {
    static ref UNSAFE_FILE_CHARS: Regex = Regex::new(r#"[^A-Za-z0-9._-]+"#).unwrap();
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Put every image on its own page of a single document.
    pub merge: bool,
    /// Run the re-save compression pass on each output.
    pub compress: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Processing,
    Compressing,
    Complete,
}

impl Stage {
    pub fn message(self) -> &'static str {
        match self {
            Stage::Processing => "Processing...",
            Stage::Compressing => "Compressing PDF...",
            Stage::Complete => "Conversion complete!",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PdfOutput {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub fn convert(
    sources: &[ImageSource],
    options: ConvertOptions,
) -> Result<Vec<PdfOutput>, ConvertError> {
    convert_with_progress(sources, options, |_| {})
}

/// Runs the whole pipeline, calling `progress` as each stage starts.
pub fn convert_with_progress<F>(
    sources: &[ImageSource],
    options: ConvertOptions,
    mut progress: F,
) -> Result<Vec<PdfOutput>, ConvertError>
where
    F: FnMut(Stage),
{
    if sources.is_empty() {
        return Err(ConvertError::NothingToConvert);
    }

    let mut report = |stage: Stage| {
        log::info!("{}", stage.message());
        progress(stage);
    };

    report(Stage::Processing);
    let mut outputs = if options.merge {
        let merged = create_merged_pdf(sources)?;
        if !merged.skipped.is_empty() {
            log::warn!(
                "Merged {} pages, skipped {}: {}",
                merged.page_count,
                merged.skipped.len(),
                merged.skipped.join(", ")
            );
        }
        vec![PdfOutput {
            file_name: MERGED_FILE_NAME.to_string(),
            bytes: merged.bytes,
        }]
    } else {
        let mut used = HashSet::new();
        sources
            .iter()
            .map(|source| {
                Ok(PdfOutput {
                    file_name: unique_file_name(source.stem(), &mut used),
                    bytes: create_single_page_pdf(source)?,
                })
            })
            .collect::<Result<Vec<_>, ConvertError>>()?
    };

    if options.compress {
        report(Stage::Compressing);
        for output in &mut outputs {
            output.bytes = compress_pdf(std::mem::take(&mut output.bytes));
        }
    }

    report(Stage::Complete);
    Ok(outputs)
}

fn sanitize_stem(stem: &str) -> String {
    let cleaned = UNSAFE_FILE_CHARS.replace_all(stem.trim(), "_");
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');
    if cleaned.is_empty() {
        DEFAULT_STEM.to_string()
    } else {
        cleaned.to_string()
    }
}

fn unique_file_name(stem: &str, used: &mut HashSet<String>) -> String {
    let base = sanitize_stem(stem);
    let mut candidate = format!("{}.pdf", base);
    let mut n = 2;
    while !used.insert(candidate.clone()) {
        candidate = format!("{}-{}.pdf", base, n);
        n += 1;
    }
    candidate
}
