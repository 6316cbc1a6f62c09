//! Display ordering of the session images.

use serde::{Deserialize, Serialize};

use crate::image::ImageRecord;

/// Gallery sort mode, cycled by the sort button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Extraction order
    #[default]
    Original,
    /// Smallest area first
    AreaAscending,
    /// Largest area first
    AreaDescending,
}

impl SortMode {
    /// The mode that follows this one in the cycle.
    pub fn next(self) -> Self {
        match self {
            SortMode::Original => SortMode::AreaAscending,
            SortMode::AreaAscending => SortMode::AreaDescending,
            SortMode::AreaDescending => SortMode::Original,
        }
    }

    /// Get the display name for this mode.
    pub fn name(self) -> &'static str {
        match self {
            SortMode::Original => "Original order",
            SortMode::AreaAscending => "Smallest first",
            SortMode::AreaDescending => "Largest first",
        }
    }

    /// Get all modes in cycle order.
    pub fn all() -> &'static [SortMode] {
        &[
            SortMode::Original,
            SortMode::AreaAscending,
            SortMode::AreaDescending,
        ]
    }
}

/// Project the images into display order.
///
/// The input is left untouched. Area modes use a stable sort so images with
/// equal area keep their extraction order.
pub fn project(images: &[ImageRecord], mode: SortMode) -> Vec<&ImageRecord> {
    let mut ordered: Vec<&ImageRecord> = images.iter().collect();
    match mode {
        SortMode::Original => {}
        SortMode::AreaAscending => ordered.sort_by_key(|image| image.area()),
        SortMode::AreaDescending => {
            ordered.sort_by_key(|image| std::cmp::Reverse(image.area()));
        }
    }
    ordered
}
