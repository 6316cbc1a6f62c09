//! Error types for gallery state operations.

use thiserror::Error;

use crate::image::ImageId;

/// Errors that can occur while building or mutating gallery state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GalleryError {
    /// Image reported with a zero width or height
    #[error("Invalid dimensions {width}x{height} for image {id}")]
    InvalidDimensions {
        /// The offending image
        id: ImageId,
        /// Reported width
        width: u32,
        /// Reported height
        height: u32,
    },

    /// Filter threshold outside of 0..=100
    #[error("Filter threshold {0} is out of range (0-100)")]
    ThresholdOutOfRange(u32),

    /// Id does not belong to the current session
    #[error("Image {0} is not part of the current session")]
    UnknownImage(ImageId),

    /// Id was soft-deleted earlier in the session
    #[error("Image {0} has been deleted")]
    DeletedImage(ImageId),
}
