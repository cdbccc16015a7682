//! The ordered list of images waiting to be converted.
//!
//! Items are added in batches (a file-picker selection or a drop), removed
//! individually and reordered by dragging one item onto another.

use crate::error::QueueError;
use crate::source::ImageSource;

#[derive(Debug, Default)]
pub struct ImageQueue {
    items: Vec<ImageSource>,
    dragging: Option<usize>,
}

impl ImageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether there is anything to convert.
    pub fn can_convert(&self) -> bool {
        !self.is_empty()
    }

    pub fn items(&self) -> &[ImageSource] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageSource> {
        self.items.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(|s| s.name.clone()).collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.dragging = None;
    }

    /// Appends the image files of `batch`, dropping everything else.
    /// A batch without a single image is rejected and leaves the queue as is.
    pub fn add<I>(&mut self, batch: I) -> Result<usize, QueueError>
    where
        I: IntoIterator<Item = ImageSource>,
    {
        let (images, others): (Vec<_>, Vec<_>) =
            batch.into_iter().partition(ImageSource::is_image);

        for other in &others {
            log::debug!("Ignoring non-image file {} ({})", other.name, other.mime);
        }
        if images.is_empty() {
            return Err(QueueError::NoImageFiles);
        }

        let added = images.len();
        self.items.extend(images);
        Ok(added)
    }

    pub fn remove(&mut self, index: usize) -> Result<ImageSource, QueueError> {
        self.check_index(index)?;
        self.dragging = None;
        Ok(self.items.remove(index))
    }

    /// Takes the item at `from` out of the list and reinserts it at `to`.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), QueueError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from != to {
            let item = self.items.remove(from);
            self.items.insert(to, item);
        }
        Ok(())
    }

    pub fn begin_drag(&mut self, index: usize) -> Result<(), QueueError> {
        self.check_index(index)?;
        self.dragging = Some(index);
        Ok(())
    }

    pub fn dragging(&self) -> Option<usize> {
        self.dragging
    }

    /// Drops the dragged item onto `target`. Returns whether the order changed.
    pub fn drop_on(&mut self, target: usize) -> Result<bool, QueueError> {
        let from = self.dragging.ok_or(QueueError::NoDragInProgress)?;
        self.check_index(target)?;
        self.dragging = None;

        if from == target {
            return Ok(false);
        }
        self.move_item(from, target)?;
        Ok(true)
    }

    pub fn end_drag(&mut self) {
        self.dragging = None;
    }

    fn check_index(&self, index: usize) -> Result<(), QueueError> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(QueueError::IndexOutOfRange {
                index,
                len: self.items.len(),
            })
        }
    }
}
