//! Per-extraction gallery state.
//!
//! [`GallerySession`] holds everything the gallery knows about the current
//! extraction: the image list, selection, deletion, filter threshold and sort
//! mode. Its mutating methods enforce the selection/deletion invariants; the
//! derived views (visible set, display order, download targets) are computed
//! on demand so they can never go stale.

use std::collections::BTreeSet;

use crate::download::{resolve_targets, sanitize_title, DownloadPlan};
use crate::error::GalleryError;
use crate::filter::{compute_visible, FilterThreshold};
use crate::image::{ImageId, ImageRecord, ImageStore};
use crate::selection::{DeletionTracker, SelectionTracker};
use crate::sort::{project, SortMode};

/// Gallery state of one extraction.
#[derive(Debug, Clone)]
pub struct GallerySession {
    images: ImageStore,
    title: String,
    selection: SelectionTracker,
    deletion: DeletionTracker,
    threshold: FilterThreshold,
    sort_mode: SortMode,
}

impl Default for GallerySession {
    fn default() -> Self {
        Self::new(FilterThreshold::default(), SortMode::default())
    }
}

impl GallerySession {
    /// Create an empty session with the given view settings.
    pub fn new(threshold: FilterThreshold, sort_mode: SortMode) -> Self {
        Self {
            images: ImageStore::new(),
            title: sanitize_title(None),
            selection: SelectionTracker::new(),
            deletion: DeletionTracker::new(),
            threshold,
            sort_mode,
        }
    }

    /// Replace the image list with a new extraction.
    ///
    /// Selection, anchor and deletion are cleared. Threshold and sort mode are
    /// kept across extractions.
    pub fn replace_images(&mut self, title: Option<&str>, images: ImageStore) {
        self.images = images;
        self.title = sanitize_title(title);
        self.selection.clear();
        self.deletion.clear();
    }

    /// Drop the image list and every per-image state.
    pub fn clear(&mut self) {
        self.replace_images(None, ImageStore::new());
    }

    pub fn images(&self) -> &[ImageRecord] {
        self.images.as_slice()
    }

    pub fn image(&self, id: ImageId) -> Option<&ImageRecord> {
        self.images.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Sanitized title used for file names.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn threshold(&self) -> FilterThreshold {
        self.threshold
    }

    /// Change the filter threshold. Selection and anchor are kept.
    pub fn set_threshold(&mut self, threshold: FilterThreshold) {
        self.threshold = threshold;
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    /// Change the sort mode. The display order changes, so selection and
    /// anchor are cleared.
    pub fn set_sort_mode(&mut self, mode: SortMode) {
        self.sort_mode = mode;
        self.selection.clear();
    }

    pub fn selected(&self) -> &BTreeSet<ImageId> {
        self.selection.ids()
    }

    pub fn deleted(&self) -> &BTreeSet<ImageId> {
        self.deletion.ids()
    }

    pub fn anchor(&self) -> Option<ImageId> {
        self.selection.anchor()
    }

    /// Ids currently shown by the filter, deleted ids excluded.
    pub fn visible(&self) -> BTreeSet<ImageId> {
        compute_visible(self.images(), self.threshold, self.deletion.ids())
    }

    /// Non-deleted images in display order, hidden ones included.
    pub fn display_order(&self) -> Vec<&ImageRecord> {
        project(self.images(), self.sort_mode)
            .into_iter()
            .filter(|image| !self.deletion.contains(image.id()))
            .collect()
    }

    /// Ids of the visible images in display order.
    pub fn visual_order(&self) -> Vec<ImageId> {
        let visible = self.visible();
        project(self.images(), self.sort_mode)
            .into_iter()
            .map(ImageRecord::id)
            .filter(|id| visible.contains(id))
            .collect()
    }

    /// Check that `id` may take part in selection.
    fn ensure_selectable(&self, id: ImageId) -> Result<(), GalleryError> {
        if !self.images.contains(id) {
            return Err(GalleryError::UnknownImage(id));
        }
        if self.deletion.contains(id) {
            return Err(GalleryError::DeletedImage(id));
        }
        Ok(())
    }

    /// Flip selection of `id`. Returns true if it is selected afterwards.
    pub fn toggle(&mut self, id: ImageId) -> Result<bool, GalleryError> {
        self.ensure_selectable(id)?;
        Ok(self.selection.toggle(id))
    }

    /// Additively select the visual span between `anchor` and `target`.
    pub fn select_range(
        &mut self,
        anchor: ImageId,
        target: ImageId,
    ) -> Result<Vec<ImageId>, GalleryError> {
        self.ensure_selectable(target)?;
        let order = self.visual_order();
        Ok(self.selection.select_range(anchor, target, &order))
    }

    /// Handle a click on a selection control.
    ///
    /// With `range` set and an anchor present the span is selected, otherwise
    /// the id is toggled. The anchor moves to `id` in both cases. Returns
    /// whether `id` is selected afterwards.
    pub fn selection_click(&mut self, id: ImageId, range: bool) -> Result<bool, GalleryError> {
        match (range, self.selection.anchor()) {
            (true, Some(anchor)) => {
                self.select_range(anchor, id)?;
            }
            _ => {
                self.toggle(id)?;
            }
        }
        self.selection.set_anchor(id);
        Ok(self.selection.contains(id))
    }

    /// Move the selection into the deletion set.
    ///
    /// Returns the newly deleted ids; empty when nothing was selected.
    pub fn delete_selected(&mut self) -> BTreeSet<ImageId> {
        if self.selection.is_empty() {
            return BTreeSet::new();
        }
        let selected = self.selection.take();
        self.deletion.extend(selected)
    }

    /// Images the download action applies to right now.
    pub fn download_targets(&self) -> Vec<&ImageRecord> {
        let order = self.display_order();
        resolve_targets(
            self.images(),
            &order,
            self.selection.ids(),
            self.deletion.ids(),
            &self.visible(),
        )
    }

    /// Delivery plan for the current download targets.
    pub fn download_plan(&self) -> DownloadPlan<'_> {
        DownloadPlan::new(&self.title, self.download_targets())
    }

    /// Delivery plan for a single image (direct download on click).
    pub fn single_download(&self, id: ImageId) -> Result<DownloadPlan<'_>, GalleryError> {
        self.ensure_selectable(id)?;
        let image = self.images.get(id).ok_or(GalleryError::UnknownImage(id))?;
        Ok(DownloadPlan::new(&self.title, vec![image]))
    }
}
