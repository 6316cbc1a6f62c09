//! Percentile-based visibility filter.
//!
//! The threshold hides the given percentage of the smallest images of the
//! session. The cutoff is computed over every image of the session, deleted
//! ones included, so deleting images never shifts the cutoff.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::GalleryError;
use crate::image::{ImageId, ImageRecord};

/// Percentage of lowest-area images to hide, always within 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct FilterThreshold(u8);

impl FilterThreshold {
    /// Threshold that shows every image.
    pub const SHOW_ALL: Self = Self(0);

    /// Threshold that hides every image.
    pub const HIDE_ALL: Self = Self(100);

    /// Default: hide the bottom 20%.
    pub const DEFAULT: Self = Self(20);

    /// Create a threshold, rejecting values above 100.
    pub fn new(percent: u32) -> Result<Self, GalleryError> {
        if percent > 100 {
            return Err(GalleryError::ThresholdOutOfRange(percent));
        }
        Ok(Self(percent as u8))
    }

    pub fn percent(self) -> u32 {
        u32::from(self.0)
    }

    /// Slider tooltip text.
    pub fn label(self) -> String {
        if self.0 == 0 {
            "Show All".to_string()
        } else {
            format!("Hide Bottom {}%", self.0)
        }
    }
}

impl Default for FilterThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for FilterThreshold {
    type Error = GalleryError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FilterThreshold> for u32 {
    fn from(threshold: FilterThreshold) -> Self {
        threshold.percent()
    }
}

/// Area cutoff for the given threshold.
///
/// Returns `Some(0)` when nothing is hidden by size, `Some(area)` for the
/// inclusive lower bound, and `None` when the cutoff index runs past the end
/// of the sorted areas (threshold 100), meaning every image is hidden.
pub fn cutoff_area(images: &[ImageRecord], threshold: FilterThreshold) -> Option<u64> {
    if threshold.percent() == 0 {
        return Some(0);
    }

    let mut areas: Vec<u64> = images.iter().map(ImageRecord::area).collect();
    areas.sort_unstable();

    let cutoff_index = areas.len() * threshold.percent() as usize / 100;
    areas.get(cutoff_index).copied()
}

/// Ids of the images that should be shown.
///
/// Pure and idempotent; safe to call on every slider tick.
pub fn compute_visible(
    images: &[ImageRecord],
    threshold: FilterThreshold,
    deleted: &BTreeSet<ImageId>,
) -> BTreeSet<ImageId> {
    let Some(cutoff) = cutoff_area(images, threshold) else {
        log::trace!("Threshold {}% hides every image", threshold.percent());
        return BTreeSet::new();
    };

    images
        .iter()
        .filter(|image| image.area() >= cutoff && !deleted.contains(&image.id()))
        .map(ImageRecord::id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images_with_areas(areas: &[u32]) -> Vec<ImageRecord> {
        areas
            .iter()
            .enumerate()
            .map(|(i, &area)| {
                ImageRecord::new(ImageId(i as u32), area, 1, Vec::<u8>::new(), "png").unwrap()
            })
            .collect()
    }

    fn ids(raw: &[u32]) -> BTreeSet<ImageId> {
        raw.iter().copied().map(ImageId).collect()
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(FilterThreshold::new(100).is_ok());
        assert_eq!(
            FilterThreshold::new(101),
            Err(GalleryError::ThresholdOutOfRange(101))
        );
        assert_eq!(FilterThreshold::default().percent(), 20);
    }

    #[test]
    fn test_threshold_label() {
        assert_eq!(FilterThreshold::SHOW_ALL.label(), "Show All");
        assert_eq!(FilterThreshold::new(35).unwrap().label(), "Hide Bottom 35%");
    }

    #[test]
    fn test_twenty_percent_hides_smallest() {
        let images = images_with_areas(&[10, 20, 30, 40, 50]);
        let threshold = FilterThreshold::new(20).unwrap();
        assert_eq!(cutoff_area(&images, threshold), Some(20));
        assert_eq!(
            compute_visible(&images, threshold, &BTreeSet::new()),
            ids(&[1, 2, 3, 4])
        );
    }

    #[test]
    fn test_hundred_percent_hides_everything() {
        let images = images_with_areas(&[10, 20, 30, 40, 50]);
        assert_eq!(cutoff_area(&images, FilterThreshold::HIDE_ALL), None);
        assert!(compute_visible(&images, FilterThreshold::HIDE_ALL, &BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_zero_shows_all_but_deleted() {
        let images = images_with_areas(&[5, 1, 3]);
        let visible = compute_visible(&images, FilterThreshold::SHOW_ALL, &ids(&[1]));
        assert_eq!(visible, ids(&[0, 2]));
    }

    #[test]
    fn test_ties_at_cutoff_are_kept() {
        // cutoff index 2 lands on the shared area 10
        let images = images_with_areas(&[10, 10, 10, 10, 50]);
        let threshold = FilterThreshold::new(50).unwrap();
        let visible = compute_visible(&images, threshold, &BTreeSet::new());
        assert_eq!(visible.len(), 5);
    }

    #[test]
    fn test_cutoff_uses_deleted_images_too() {
        let images = images_with_areas(&[10, 20, 30, 40, 50]);
        let threshold = FilterThreshold::new(20).unwrap();
        // Deleting the smallest image must not move the cutoff up to 30
        let visible = compute_visible(&images, threshold, &ids(&[0]));
        assert_eq!(visible, ids(&[1, 2, 3, 4]));
    }

    #[test]
    fn test_empty_session() {
        assert!(compute_visible(&[], FilterThreshold::DEFAULT, &BTreeSet::new()).is_empty());
        assert!(compute_visible(&[], FilterThreshold::SHOW_ALL, &BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_threshold_try_from() {
        assert_eq!(FilterThreshold::try_from(42u32).unwrap().percent(), 42);
        assert!(FilterThreshold::try_from(250u32).is_err());
    }
}
