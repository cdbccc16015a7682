use lopdf::Document;

fn recompress(input: &[u8]) -> Result<Vec<u8>, lopdf::Error> {
    let mut doc = Document::load_mem(input)?;
    doc.compress();

    let mut buffer = Vec::with_capacity(input.len());
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

/// Re-saves `input` with Flate-compressed streams.
///
/// This never fails: if the document cannot be re-saved, or the result is no
/// smaller, the original bytes come back unchanged.
pub fn compress_pdf(input: Vec<u8>) -> Vec<u8> {
    match recompress(&input) {
        Ok(output) if output.len() < input.len() => {
            log::info!(
                "Compressed PDF from {} to {} bytes",
                input.len(),
                output.len()
            );
            output
        }
        Ok(output) => {
            log::debug!(
                "Re-saved PDF is not smaller ({} >= {} bytes), keeping original",
                output.len(),
                input.len()
            );
            input
        }
        Err(e) => {
            log::warn!("Compression failed, returning original PDF: {}", e);
            input
        }
    }
}
