//! Gallery controller: applies user actions to a [`GallerySession`] and
//! tells the injected [`GalleryView`] what to repaint.
//!
//! The controller owns the session, the view, the threshold debouncer and the
//! request counter that lets stale extraction responses be discarded.

use std::collections::BTreeSet;

use web_time::Instant;

use crate::debounce::Debouncer;
use crate::download::DownloadPlan;
use crate::error::GalleryError;
use crate::filter::FilterThreshold;
use crate::image::{ImageId, ImagePayload, ImageRecord, ImageStore};
use crate::session::GallerySession;
use crate::sort::SortMode;

/// Presentation callbacks invoked by the controller.
///
/// Every method has an empty default so a view only implements what it
/// renders.
pub trait GalleryView {
    /// The gallery was cleared (a new extraction started).
    fn reset(&mut self) {}

    /// The interactive view must be rebuilt with these images, in display
    /// order. Deleted images are not included.
    fn rebuild(&mut self, _ordered: &[&ImageRecord]) {}

    /// The extraction returned no images.
    fn show_empty(&mut self) {}

    /// Show exactly the `visible` ids, hide the rest.
    fn apply_visibility(&mut self, _visible: &BTreeSet<ImageId>, _threshold: FilterThreshold) {}

    /// Selection membership changed.
    fn selection_changed(&mut self, _selected: &BTreeSet<ImageId>) {}

    /// These ids were just soft-deleted.
    fn images_deleted(&mut self, _deleted: &BTreeSet<ImageId>) {}

    /// The sort mode changed (before the rebuild).
    fn sort_mode_changed(&mut self, _mode: SortMode) {}
}

/// View that renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullView;

impl GalleryView for NullView {}

/// Identifies one extraction request; only the latest one may load images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// What a click on the image itself resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The click changed selection; `selected` is the id's new membership
    Selection {
        /// Whether the clicked id is selected afterwards
        selected: bool,
    },
    /// Nothing selected and no range modifier: download the image directly
    Download(ImageId),
}

/// Orchestrates gallery state transitions.
#[derive(Debug)]
pub struct GalleryController<V: GalleryView> {
    session: GallerySession,
    view: V,
    threshold_input: Debouncer<FilterThreshold>,
    last_request: u64,
}

impl<V: GalleryView> GalleryController<V> {
    /// Create a controller with default settings.
    pub fn new(view: V) -> Self {
        Self::with_settings(view, FilterThreshold::default(), SortMode::default())
    }

    /// Create a controller with an initial threshold and sort mode.
    pub fn with_settings(view: V, threshold: FilterThreshold, sort_mode: SortMode) -> Self {
        Self {
            session: GallerySession::new(threshold, sort_mode),
            view,
            threshold_input: Debouncer::new(),
            last_request: 0,
        }
    }

    /// Replace the threshold debouncer (e.g. for a custom delay).
    pub fn with_debouncer(mut self, debouncer: Debouncer<FilterThreshold>) -> Self {
        self.threshold_input = debouncer;
        self
    }

    pub fn session(&self) -> &GallerySession {
        &self.session
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    // ------------------------------------------------------------------
    // Extraction lifecycle
    // ------------------------------------------------------------------

    /// Start a new extraction request.
    ///
    /// The gallery is cleared and every earlier token becomes stale.
    pub fn begin_request(&mut self) -> RequestToken {
        self.last_request += 1;
        self.session.clear();
        self.threshold_input.cancel();
        self.view.reset();
        log::debug!("Started extraction request {}", self.last_request);
        RequestToken(self.last_request)
    }

    /// Whether `token` belongs to the latest request.
    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.last_request
    }

    /// Load the images of a finished extraction.
    ///
    /// Returns `Ok(false)` and leaves the state untouched when the token is
    /// stale. Ids are assigned by position in `payloads`.
    pub fn load(
        &mut self,
        token: RequestToken,
        title: Option<&str>,
        payloads: Vec<ImagePayload>,
    ) -> Result<bool, GalleryError> {
        if !self.is_current(token) {
            log::warn!(
                "Discarding stale extraction response {} (latest is {})",
                token.0,
                self.last_request
            );
            return Ok(false);
        }

        let store = ImageStore::from_payloads(payloads)?;
        log::info!("Loaded {} images", store.len());
        self.session.replace_images(title, store);
        self.rebuild();
        Ok(true)
    }

    /// Rebuild the whole view from the session.
    fn rebuild(&mut self) {
        if self.session.is_empty() {
            self.view.show_empty();
            return;
        }
        let ordered = self.session.display_order();
        self.view.rebuild(&ordered);
        self.view.selection_changed(self.session.selected());
        self.refresh_visibility();
    }

    fn refresh_visibility(&mut self) {
        let visible = self.session.visible();
        self.view.apply_visibility(&visible, self.session.threshold());
    }

    // ------------------------------------------------------------------
    // Filter
    // ------------------------------------------------------------------

    /// Apply a threshold immediately, dropping any pending slider input.
    pub fn set_threshold(&mut self, threshold: FilterThreshold) {
        self.threshold_input.cancel();
        self.apply_threshold(threshold);
    }

    fn apply_threshold(&mut self, threshold: FilterThreshold) {
        log::debug!("Filter threshold -> {}%", threshold.percent());
        self.session.set_threshold(threshold);
        self.refresh_visibility();
    }

    /// Record slider input; it takes effect once the input goes quiet.
    pub fn input_threshold(&mut self, threshold: FilterThreshold) {
        self.input_threshold_at(threshold, Instant::now());
    }

    /// Like [`Self::input_threshold`] with an explicit timestamp.
    pub fn input_threshold_at(&mut self, threshold: FilterThreshold, now: Instant) {
        self.threshold_input.push_at(threshold, now);
    }

    /// Apply pending slider input whose quiet period has elapsed.
    ///
    /// Returns true if the threshold changed. Call this from the event loop.
    pub fn poll(&mut self) -> bool {
        self.poll_at(Instant::now())
    }

    /// Like [`Self::poll`] with an explicit timestamp.
    pub fn poll_at(&mut self, now: Instant) -> bool {
        match self.threshold_input.poll_at(now) {
            Some(threshold) => {
                self.apply_threshold(threshold);
                true
            }
            None => false,
        }
    }

    /// Whether slider input is waiting for its quiet period.
    pub fn has_pending_input(&self) -> bool {
        self.threshold_input.is_pending()
    }

    // ------------------------------------------------------------------
    // Sort
    // ------------------------------------------------------------------

    /// Advance to the next sort mode and rebuild.
    pub fn cycle_sort(&mut self) -> SortMode {
        let next = self.session.sort_mode().next();
        self.set_sort_mode(next);
        next
    }

    /// Switch sort mode; selection and anchor are cleared and the view rebuilt.
    pub fn set_sort_mode(&mut self, mode: SortMode) {
        log::debug!("Sort mode -> {:?}", mode);
        self.session.set_sort_mode(mode);
        self.view.sort_mode_changed(mode);
        self.rebuild();
    }

    // ------------------------------------------------------------------
    // Selection & deletion
    // ------------------------------------------------------------------

    /// Flip selection of `id` without moving the anchor.
    pub fn toggle(&mut self, id: ImageId) -> Result<bool, GalleryError> {
        let selected = self.session.toggle(id)?;
        self.view.selection_changed(self.session.selected());
        Ok(selected)
    }

    /// Additively select the visual span between `anchor` and `target`.
    pub fn select_range(
        &mut self,
        anchor: ImageId,
        target: ImageId,
    ) -> Result<Vec<ImageId>, GalleryError> {
        let added = self.session.select_range(anchor, target)?;
        self.view.selection_changed(self.session.selected());
        Ok(added)
    }

    /// Click on a checkbox or card: toggle, or range-select when `range` is
    /// held and an anchor exists.
    pub fn selection_click(&mut self, id: ImageId, range: bool) -> Result<bool, GalleryError> {
        let selected = self.session.selection_click(id, range)?;
        self.view.selection_changed(self.session.selected());
        Ok(selected)
    }

    /// Click on the image itself.
    ///
    /// Acts as a selection click while anything is selected or `range` is
    /// held; otherwise asks for a direct download of the image.
    pub fn smart_click(&mut self, id: ImageId, range: bool) -> Result<ClickOutcome, GalleryError> {
        if range || !self.session.selected().is_empty() {
            let selected = self.selection_click(id, range)?;
            return Ok(ClickOutcome::Selection { selected });
        }
        if self.session.deleted().contains(&id) {
            return Err(GalleryError::DeletedImage(id));
        }
        if self.session.image(id).is_none() {
            return Err(GalleryError::UnknownImage(id));
        }
        Ok(ClickOutcome::Download(id))
    }

    /// Soft-delete the selection. Returns the newly deleted ids.
    pub fn delete_selected(&mut self) -> BTreeSet<ImageId> {
        let deleted = self.session.delete_selected();
        if deleted.is_empty() {
            return deleted;
        }
        log::info!("Deleted {} images", deleted.len());
        self.view.images_deleted(&deleted);
        self.view.selection_changed(self.session.selected());
        self.refresh_visibility();
        deleted
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn visible(&self) -> BTreeSet<ImageId> {
        self.session.visible()
    }

    pub fn visible_count(&self) -> usize {
        self.session.visible().len()
    }

    pub fn visual_order(&self) -> Vec<ImageId> {
        self.session.visual_order()
    }

    pub fn selected(&self) -> &BTreeSet<ImageId> {
        self.session.selected()
    }

    pub fn deleted(&self) -> &BTreeSet<ImageId> {
        self.session.deleted()
    }

    pub fn anchor(&self) -> Option<ImageId> {
        self.session.anchor()
    }

    pub fn threshold(&self) -> FilterThreshold {
        self.session.threshold()
    }

    pub fn sort_mode(&self) -> SortMode {
        self.session.sort_mode()
    }

    /// Label of the bulk download button.
    pub fn download_label(&self) -> String {
        match self.session.selected().len() {
            0 => "Download All".to_string(),
            n => format!("Download Selected ({})", n),
        }
    }

    /// Whether the delete action is available.
    pub fn can_delete(&self) -> bool {
        !self.session.selected().is_empty()
    }

    /// Delivery plan for the bulk download button.
    pub fn download_plan(&self) -> DownloadPlan<'_> {
        self.session.download_plan()
    }

    /// Delivery plan for a direct single-image download.
    pub fn single_download(&self, id: ImageId) -> Result<DownloadPlan<'_>, GalleryError> {
        self.session.single_download(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// View that records what the controller asked it to do.
    #[derive(Debug, Default)]
    struct RecordingView {
        resets: usize,
        rebuilt: Vec<Vec<ImageId>>,
        empty: usize,
        visible: Option<BTreeSet<ImageId>>,
        selected: BTreeSet<ImageId>,
        deleted: Vec<BTreeSet<ImageId>>,
    }

    impl GalleryView for RecordingView {
        fn reset(&mut self) {
            self.resets += 1;
        }

        fn rebuild(&mut self, ordered: &[&ImageRecord]) {
            self.rebuilt.push(ordered.iter().map(|img| img.id()).collect());
        }

        fn show_empty(&mut self) {
            self.empty += 1;
        }

        fn apply_visibility(&mut self, visible: &BTreeSet<ImageId>, _threshold: FilterThreshold) {
            self.visible = Some(visible.clone());
        }

        fn selection_changed(&mut self, selected: &BTreeSet<ImageId>) {
            self.selected = selected.clone();
        }

        fn images_deleted(&mut self, deleted: &BTreeSet<ImageId>) {
            self.deleted.push(deleted.clone());
        }
    }

    fn payloads(areas: &[u32]) -> Vec<ImagePayload> {
        areas
            .iter()
            .map(|&area| ImagePayload {
                width: area,
                height: 1,
                data: vec![0xAB],
                extension: "png".to_string(),
            })
            .collect()
    }

    fn loaded(areas: &[u32]) -> GalleryController<RecordingView> {
        let mut controller = GalleryController::new(RecordingView::default());
        let token = controller.begin_request();
        assert!(controller.load(token, Some("paper"), payloads(areas)).unwrap());
        controller
    }

    fn ids(raw: &[u32]) -> BTreeSet<ImageId> {
        raw.iter().copied().map(ImageId).collect()
    }

    #[test]
    fn test_load_rebuilds_and_filters() {
        let controller = loaded(&[10, 20, 30, 40, 50]);
        let view = controller.view();
        assert_eq!(view.resets, 1);
        assert_eq!(view.rebuilt.len(), 1);
        assert_eq!(view.visible, Some(ids(&[1, 2, 3, 4])));
        assert_eq!(controller.visible_count(), 4);
    }

    #[test]
    fn test_empty_extraction_shows_empty_state() {
        let controller = loaded(&[]);
        assert_eq!(controller.view().empty, 1);
        assert!(controller.view().rebuilt.is_empty());
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut controller = GalleryController::new(RecordingView::default());
        let first = controller.begin_request();
        let second = controller.begin_request();

        assert!(controller.load(second, Some("new"), payloads(&[1, 2])).unwrap());
        assert!(!controller.load(first, Some("old"), payloads(&[5, 6, 7])).unwrap());
        assert_eq!(controller.session().images().len(), 2);
        assert_eq!(controller.session().title(), "new");
    }

    #[test]
    fn test_debounced_threshold() {
        let mut controller = loaded(&[10, 20, 30, 40, 50]);
        let start = Instant::now();
        controller.input_threshold_at(FilterThreshold::new(80).unwrap(), start);
        controller.input_threshold_at(
            FilterThreshold::SHOW_ALL,
            start + std::time::Duration::from_millis(5),
        );

        assert!(!controller.poll_at(start + std::time::Duration::from_millis(10)));
        assert_eq!(controller.threshold(), FilterThreshold::DEFAULT);

        assert!(controller.poll_at(start + std::time::Duration::from_millis(40)));
        assert_eq!(controller.threshold(), FilterThreshold::SHOW_ALL);
        assert_eq!(controller.view().visible, Some(ids(&[0, 1, 2, 3, 4])));
    }

    #[test]
    fn test_cycle_sort_rebuilds_and_clears_selection() {
        let mut controller = loaded(&[30, 10, 20]);
        controller.set_threshold(FilterThreshold::SHOW_ALL);
        controller.selection_click(ImageId(0), false).unwrap();

        assert_eq!(controller.cycle_sort(), SortMode::AreaAscending);
        assert!(controller.selected().is_empty());
        assert_eq!(controller.anchor(), None);
        assert_eq!(
            controller.view().rebuilt.last().unwrap(),
            &vec![ImageId(1), ImageId(2), ImageId(0)]
        );
    }

    #[test]
    fn test_smart_click() {
        let mut controller = loaded(&[10, 20, 30]);
        assert_eq!(
            controller.smart_click(ImageId(2), false).unwrap(),
            ClickOutcome::Download(ImageId(2))
        );
        assert_eq!(
            controller.smart_click(ImageId(2), true).unwrap(),
            ClickOutcome::Selection { selected: true }
        );
        // selection mode active: plain click selects too
        assert_eq!(
            controller.smart_click(ImageId(1), false).unwrap(),
            ClickOutcome::Selection { selected: true }
        );
    }

    #[test]
    fn test_delete_notifies_view() {
        let mut controller = loaded(&[10, 20, 30]);
        controller.set_threshold(FilterThreshold::SHOW_ALL);
        controller.toggle(ImageId(1)).unwrap();
        assert_eq!(controller.download_label(), "Download Selected (1)");
        assert!(controller.can_delete());

        let deleted = controller.delete_selected();
        assert_eq!(deleted, ids(&[1]));
        assert_eq!(controller.view().deleted, vec![ids(&[1])]);
        assert!(controller.view().selected.is_empty());
        assert_eq!(controller.view().visible, Some(ids(&[0, 2])));
        assert_eq!(controller.download_label(), "Download All");
        assert!(controller.delete_selected().is_empty());
    }

    #[test]
    fn test_begin_request_clears_gallery() {
        let mut controller = loaded(&[10, 20]);
        controller.set_sort_mode(SortMode::AreaDescending);
        controller.begin_request();
        assert!(controller.session().is_empty());
        assert_eq!(controller.sort_mode(), SortMode::AreaDescending);
        assert_eq!(controller.view().resets, 2);
    }
}
