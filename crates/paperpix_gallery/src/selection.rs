//! Selection and deletion bookkeeping.
//!
//! Both trackers only deal in [`ImageId`]s. Whether an id is allowed to be
//! selected (not deleted, part of the session) is decided by the caller that
//! owns both trackers, see `GalleryController`.

use std::collections::BTreeSet;

use crate::image::ImageId;

/// Currently selected images plus the anchor used for range selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionTracker {
    selected: BTreeSet<ImageId>,
    anchor: Option<ImageId>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `id`. Returns true if the id is selected afterwards.
    pub fn toggle(&mut self, id: ImageId) -> bool {
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    /// Add every id in the inclusive span between `anchor` and `target` as they
    /// appear in `visual_order`.
    ///
    /// Additive: nothing is ever deselected. When either endpoint is missing
    /// from `visual_order` only the target is toggled. Returns the ids that
    /// were newly selected (or toggled).
    pub fn select_range(
        &mut self,
        anchor: ImageId,
        target: ImageId,
        visual_order: &[ImageId],
    ) -> Vec<ImageId> {
        let start = visual_order.iter().position(|&id| id == anchor);
        let end = visual_order.iter().position(|&id| id == target);

        let (Some(start), Some(end)) = (start, end) else {
            log::debug!(
                "Range endpoint {} or {} not visible, toggling {} only",
                anchor,
                target,
                target
            );
            self.toggle(target);
            return vec![target];
        };

        let (low, high) = (start.min(end), start.max(end));
        visual_order[low..=high]
            .iter()
            .copied()
            .filter(|&id| self.selected.insert(id))
            .collect()
    }

    pub fn set_anchor(&mut self, id: ImageId) {
        self.anchor = Some(id);
    }

    pub fn anchor(&self) -> Option<ImageId> {
        self.anchor
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.selected.contains(&id)
    }

    pub fn ids(&self) -> &BTreeSet<ImageId> {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Drop the selection and the anchor, returning the previously selected ids.
    pub fn take(&mut self) -> BTreeSet<ImageId> {
        self.anchor = None;
        std::mem::take(&mut self.selected)
    }

    /// Clear selection and anchor.
    pub fn clear(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }
}

/// Images soft-deleted for the rest of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionTracker {
    deleted: BTreeSet<ImageId>,
}

impl DeletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark ids deleted. Returns the ids that were not deleted before.
    pub fn extend(&mut self, ids: impl IntoIterator<Item = ImageId>) -> BTreeSet<ImageId> {
        ids.into_iter().filter(|&id| self.deleted.insert(id)).collect()
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.deleted.contains(&id)
    }

    pub fn ids(&self) -> &BTreeSet<ImageId> {
        &self.deleted
    }

    pub fn len(&self) -> usize {
        self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty()
    }

    /// Only called on a full session reset.
    pub fn clear(&mut self) {
        self.deleted.clear();
    }
}
