//! Extracted image records and the per-session image store.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::GalleryError;

/// Stable session id of an image: its 0-based position in the extraction response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub u32);

impl ImageId {
    /// Position of the image in the original extraction order.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// 1-based number shown to users and used in file names.
    pub fn ordinal(self) -> u32 {
        self.0 + 1
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.ordinal())
    }
}

/// Raw image as delivered by the extraction service, before an id is assigned.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Encoded image bytes (png, jpeg, ...)
    pub data: Vec<u8>,
    /// File extension reported by the backend, without the dot
    pub extension: String,
}

/// One extracted raster image with its geometry and stable session id.
///
/// Records are immutable once created; the encoded bytes are shared so the
/// record can be cloned cheaply into download plans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    id: ImageId,
    width: u32,
    height: u32,
    data: Arc<[u8]>,
    extension: String,
}

impl ImageRecord {
    /// Create a record, rejecting zero-sized images.
    pub fn new(
        id: ImageId,
        width: u32,
        height: u32,
        data: impl Into<Arc<[u8]>>,
        extension: impl Into<String>,
    ) -> Result<Self, GalleryError> {
        if width == 0 || height == 0 {
            return Err(GalleryError::InvalidDimensions { id, width, height });
        }
        Ok(Self {
            id,
            width,
            height,
            data: data.into(),
            extension: extension.into(),
        })
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel area used for ranking and filtering.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }
}

/// The ordered, immutable image list of one extraction response.
#[derive(Debug, Clone, Default)]
pub struct ImageStore {
    images: Vec<ImageRecord>,
}

impl ImageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from backend payloads, assigning ids by position.
    pub fn from_payloads(payloads: Vec<ImagePayload>) -> Result<Self, GalleryError> {
        let images = payloads
            .into_iter()
            .enumerate()
            .map(|(index, payload)| {
                ImageRecord::new(
                    ImageId(index as u32),
                    payload.width,
                    payload.height,
                    payload.data,
                    payload.extension,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { images })
    }

    /// Look up an image by id.
    pub fn get(&self, id: ImageId) -> Option<&ImageRecord> {
        self.images.get(id.index()).filter(|image| image.id == id)
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn as_slice(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageRecord> {
        self.images.iter()
    }
}
