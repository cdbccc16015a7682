use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use rayon::prelude::*;

use crate::embed::{prepare_image, PreparedImage};
use crate::error::ConvertError;
use crate::source::ImageSource;

const PRODUCER: &str = concat!("image-to-pdf-rust ", env!("CARGO_PKG_VERSION"));

/// Builds a PDF where every page holds exactly one image at its native size
/// (one pixel per point).
#[derive(Debug)]
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn add_image_page(&mut self, source: &ImageSource) -> Result<ObjectId, ConvertError> {
        let prepared = prepare_image(source)?;
        self.add_page(prepared)
    }

    /// Appends a page sized to the image and draws the image over all of it.
    pub fn add_page(&mut self, image: PreparedImage) -> Result<ObjectId, ConvertError> {
        let width = Object::Integer(i64::from(image.width));
        let height = Object::Integer(i64::from(image.height));
        let image_id = image.insert_into(&mut self.doc);
        let xobject_name = format!("Im{}", self.page_ids.len());

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width.clone(),
                        Object::Integer(0),
                        Object::Integer(0),
                        height.clone(),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(xobject_name.clone().into_bytes())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.encode()?));

        let mut xobjects = Dictionary::new();
        xobjects.set(xobject_name, Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(self.pages_id));
        page.set(
            "MediaBox",
            Object::Array(vec![Object::Integer(0), Object::Integer(0), width, height]),
        );
        page.set("Contents", Object::Reference(content_id));
        page.set("Resources", Object::Dictionary(resources));

        let page_id = self.doc.add_object(page);
        self.page_ids.push(page_id);
        Ok(page_id)
    }

    /// Writes the page tree and catalog and serializes the document.
    pub fn finish(mut self) -> Result<Vec<u8>, ConvertError> {
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set(
            "Kids",
            Object::Array(self.page_ids.iter().copied().map(Object::Reference).collect()),
        );
        pages.set("Count", Object::Integer(self.page_ids.len() as i64));
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.doc.add_object(catalog);

        let mut info = Dictionary::new();
        info.set("Producer", Object::string_literal(PRODUCER));
        let info_id = self.doc.add_object(info);

        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc.trailer.set("Info", Object::Reference(info_id));

        let mut buffer = Vec::new();
        self.doc.save_to(&mut buffer)?;
        Ok(buffer)
    }
}

/// Result of merging several images into one document.
#[derive(Debug)]
pub struct MergedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Names of inputs skipped because their format is not supported.
    pub skipped: Vec<String>,
}

/// One image, one page. Unsupported formats are an error.
pub fn create_single_page_pdf(source: &ImageSource) -> Result<Vec<u8>, ConvertError> {
    let mut builder = PdfBuilder::new();
    builder.add_image_page(source)?;
    builder.finish()
}

/// One page per image, in the order given. Inputs in an unsupported format
/// are skipped with a warning; any other failure aborts the merge.
pub fn create_merged_pdf(sources: &[ImageSource]) -> Result<MergedPdf, ConvertError> {
    // Decoding and deflating is independent per image; par_iter keeps order.
    let prepared: Vec<_> = sources.par_iter().map(prepare_image).collect();

    let mut builder = PdfBuilder::new();
    let mut skipped = Vec::new();
    for (source, image) in sources.iter().zip(prepared) {
        match image {
            Ok(image) => {
                builder.add_page(image)?;
            }
            Err(ConvertError::UnsupportedFormat { name, mime }) => {
                log::warn!("Skipping unsupported image format: {} ({})", mime, name);
                skipped.push(source.name.clone());
            }
            Err(e) => return Err(e),
        }
    }

    if builder.page_count() == 0 {
        return Err(ConvertError::NoPages);
    }

    let page_count = builder.page_count();
    Ok(MergedPdf {
        bytes: builder.finish()?,
        page_count,
        skipped,
    })
}
