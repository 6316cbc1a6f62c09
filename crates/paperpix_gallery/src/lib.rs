//! paperpix_gallery - client-side gallery state for extracted paper images
//!
//! This crate holds the rules that govern image ids, selection, soft deletion,
//! sort order and the percentile-based size filter. It performs no I/O;
//! presentation goes through the [`GalleryView`] trait.

mod controller;
mod debounce;
mod download;
mod error;
mod filter;
mod image;
mod selection;
mod session;
mod sort;

#[cfg(test)]
mod tests;

pub use controller::{ClickOutcome, GalleryController, GalleryView, NullView, RequestToken};
pub use debounce::Debouncer;
pub use download::{
    archive_filename, image_filename, resolve_targets, sanitize_title, DownloadPlan,
    DEFAULT_TITLE, MAX_TITLE_CHARS,
};
pub use error::GalleryError;
pub use filter::{compute_visible, cutoff_area, FilterThreshold};
pub use image::{ImageId, ImagePayload, ImageRecord, ImageStore};
pub use selection::{DeletionTracker, SelectionTracker};
pub use session::GallerySession;
pub use sort::{project, SortMode};
