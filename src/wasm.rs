//! Browser bindings. The page forwards file-picker and drag-and-drop events
//! to [`ImageQueueHandle`] and re-renders its preview from `names()`.

use js_sys::{Array, Object, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::convert::{self, ConvertOptions, PdfOutput};
use crate::queue::ImageQueue;
use crate::source::ImageSource;

fn conversion_error(e: impl std::fmt::Display) -> JsError {
    web_sys::console::error_1(&format!("Error: {}", e).into());
    JsError::new(&format!("Error during conversion: {}", e))
}

fn status(message: &str) {
    web_sys::console::log_1(&message.into());
}

#[wasm_bindgen]
#[derive(Debug, Default)]
pub struct ImageQueueHandle {
    queue: ImageQueue,
}

#[wasm_bindgen]
impl ImageQueueHandle {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one picked or dropped batch. `contents` holds one `Uint8Array`
    /// per name. Returns how many files were queued.
    #[wasm_bindgen(js_name = addFiles)]
    pub fn add_files(
        &mut self,
        names: Vec<String>,
        mimes: Vec<String>,
        contents: Array,
    ) -> Result<usize, JsError> {
        let contents: Vec<_> = contents
            .iter()
            .map(|data| data.dyn_into::<Uint8Array>().ok().map(|a| a.to_vec()))
            .collect();
        let batch = collect_batch(names, mimes, contents).map_err(|e| JsError::new(&e))?;

        Ok(self.queue.add(batch)?)
    }

    pub fn remove(&mut self, index: usize) -> Result<(), JsError> {
        self.queue.remove(index)?;
        Ok(())
    }

    #[wasm_bindgen(js_name = beginDrag)]
    pub fn begin_drag(&mut self, index: usize) -> Result<(), JsError> {
        Ok(self.queue.begin_drag(index)?)
    }

    #[wasm_bindgen(js_name = dropOn)]
    pub fn drop_on(&mut self, index: usize) -> Result<bool, JsError> {
        Ok(self.queue.drop_on(index)?)
    }

    #[wasm_bindgen(js_name = endDrag)]
    pub fn end_drag(&mut self) {
        self.queue.end_drag();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[wasm_bindgen(js_name = isEmpty)]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.queue.names()
    }

    /// Returns `[{ fileName, bytes }]`, one entry per generated PDF.
    pub fn convert(&self, merge: bool, compress: bool) -> Result<Array, JsError> {
        let outputs = self.run(merge, compress)?;
        let result = Array::new();
        for output in outputs {
            let entry = Object::new();
            set(&entry, "fileName", &output.file_name.into())?;
            set(&entry, "bytes", &Uint8Array::from(output.bytes.as_slice()).into())?;
            result.push(&entry);
        }
        Ok(result)
    }

    #[wasm_bindgen(js_name = convertAndDownload)]
    pub fn convert_and_download(&self, merge: bool, compress: bool) -> Result<(), JsError> {
        for output in self.run(merge, compress)? {
            download_pdf(&output.bytes, &output.file_name).map_err(|e| {
                JsError::new(&format!("Download failed: {:?}", e))
            })?;
        }
        Ok(())
    }
}

impl ImageQueueHandle {
    fn run(&self, merge: bool, compress: bool) -> Result<Vec<PdfOutput>, JsError> {
        let options = ConvertOptions { merge, compress };
        convert::convert_with_progress(self.queue.items(), options, |stage| {
            status(stage.message())
        })
        .map_err(conversion_error)
    }
}

/// Pairs up the parallel arrays handed over from JS. `None` marks an entry
/// that was not a `Uint8Array`; nothing is queued if any entry is bad.
fn collect_batch(
    names: Vec<String>,
    mimes: Vec<String>,
    contents: Vec<Option<Vec<u8>>>,
) -> Result<Vec<ImageSource>, String> {
    if names.len() != mimes.len() || names.len() != contents.len() {
        return Err("names, mimes and contents differ in length".to_string());
    }

    names
        .into_iter()
        .zip(mimes)
        .zip(contents)
        .map(|((name, mime), bytes)| match bytes {
            Some(bytes) => Ok(ImageSource::new(name, mime, bytes)),
            None => Err(format!("{} is not a Uint8Array", name)),
        })
        .collect()
}

fn set(target: &Object, key: &str, value: &JsValue) -> Result<(), JsError> {
    Reflect::set(target, &key.into(), value)
        .map(|_| ())
        .map_err(|e| JsError::new(&format!("{:?}", e)))
}

/// Saves `bytes` through a temporary `<a download>` link.
#[wasm_bindgen(js_name = downloadPdf)]
pub fn download_pdf(bytes: &[u8], file_name: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("no document body"))?;

    let parts = Array::new();
    parts.push(&Uint8Array::from(bytes));
    let options = web_sys::BlobPropertyBag::new();
    options.set_type("application/pdf");
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let link: web_sys::HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
    link.set_href(&url);
    link.set_download(file_name);
    body.append_child(&link)?;
    link.click();
    body.remove_child(&link)?;
    // The object URL stays alive: revoking it right after click() cancels
    // the download in Firefox and Safari.
    Ok(())
}

/// Converts images given as parallel arrays in one call.
#[wasm_bindgen(js_name = imagesToPdf)]
pub fn images_to_pdf(
    names: Vec<String>,
    mimes: Vec<String>,
    contents: Array,
    merge: bool,
    compress: bool,
) -> Result<Array, JsError> {
    let mut handle = ImageQueueHandle::new();
    handle.add_files(names, mimes, contents)?;
    handle.convert(merge, compress)
}

#[wasm_bindgen(js_name = compressPdf)]
pub fn compress_pdf(input: &[u8]) -> Vec<u8> {
    crate::compress::compress_pdf(input.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn batch_pairs_names_with_contents() {
        let batch = collect_batch(
            strings(&["a.png", "b.jpg"]),
            strings(&["image/png", "image/jpeg"]),
            vec![Some(vec![1]), Some(vec![2, 3])],
        )
        .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1].name, "b.jpg");
        assert_eq!(batch[1].mime, "image/jpeg");
        assert_eq!(batch[1].bytes, vec![2, 3]);
    }

    #[test]
    fn batch_rejects_entries_without_bytes() {
        let err = collect_batch(
            strings(&["a.png", "b.png"]),
            strings(&["image/png", "image/png"]),
            vec![Some(vec![1]), None],
        )
        .unwrap_err();
        assert_eq!(err, "b.png is not a Uint8Array");
    }

    #[test]
    fn batch_rejects_mismatched_lengths() {
        let err = collect_batch(strings(&["a.png"]), strings(&[]), vec![Some(vec![])]).unwrap_err();
        assert!(err.contains("differ in length"));
    }
}
