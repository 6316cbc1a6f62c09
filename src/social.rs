//! Trending board ("hall of fame") and liking gallery images.

use paperpix_gallery::ImageRecord;

use crate::api::{
    LikeReceipt, LikeUpload, SocialService, TrendingId, TrendingImage, TrendingPeriod,
    mime_for_extension,
};
use crate::constants::MIN_SHORTCUT_DOI_LEN;
use crate::error::{AppError, Notice};
use crate::storage::{KeyValueStore, LikedIds};

/// DOI sent with likes of images that did not come from a DOI lookup.
const MANUAL_UPLOAD_DOI: &str = "manual_upload";

/// One rendered line of the board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendingRow<'a> {
    /// 1-based
    pub rank: usize,
    pub image: &'a TrendingImage,
    pub liked: bool,
    pub shortcut: Option<&'a str>,
}

/// Trending images for one period plus what this client already liked.
#[derive(Debug, Clone, Default)]
pub struct TrendingBoard {
    period: TrendingPeriod,
    images: Vec<TrendingImage>,
    liked: LikedIds,
    dirty: bool,
}

impl TrendingBoard {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        Self {
            liked: LikedIds::load(store),
            ..Self::default()
        }
    }

    pub fn period(&self) -> TrendingPeriod {
        self.period
    }

    /// Switch period; the board must be fetched again when it changed.
    pub fn set_period(&mut self, period: TrendingPeriod) -> bool {
        if self.period == period {
            return false;
        }
        self.period = period;
        self.dirty = true;
        true
    }

    pub fn images(&self) -> &[TrendingImage] {
        &self.images
    }

    pub fn is_liked(&self, id: &TrendingId) -> bool {
        self.liked.contains(id)
    }

    pub fn liked(&self) -> &LikedIds {
        &self.liked
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Fetch only when a like changed the ranking or nothing is loaded yet.
    pub fn needs_refresh(&self) -> bool {
        self.dirty || self.images.is_empty()
    }

    /// Reload the board for the current period. Returns the number of entries.
    pub fn refresh(&mut self, service: &dyn SocialService) -> Result<usize, AppError> {
        let images = service.trending(self.period)?;
        log::info!(
            "Loaded {} trending images for period {}",
            images.len(),
            self.period
        );
        self.images = images;
        self.dirty = false;
        Ok(self.images.len())
    }

    /// Entries in rank order with what the board shows next to each.
    pub fn rows(&self) -> Vec<TrendingRow<'_>> {
        self.images
            .iter()
            .enumerate()
            .map(|(index, image)| TrendingRow {
                rank: index + 1,
                liked: self.liked.contains(&image.id),
                shortcut: doi_shortcut(image),
                image,
            })
            .collect()
    }

    /// Like a board entry.
    ///
    /// The count goes up locally before the request is made. Returns
    /// `Ok(false)` without contacting the server when the id was already
    /// liked. The id is only persisted once the server accepted the vote.
    pub fn vote(
        &mut self,
        id: &TrendingId,
        service: &dyn SocialService,
        store: &mut dyn KeyValueStore,
    ) -> Result<bool, AppError> {
        if self.liked.contains(id) {
            log::debug!("Trending image {} already liked", id);
            return Ok(false);
        }

        if let Some(image) = self.images.iter_mut().find(|image| image.id == *id) {
            image.likes += 1;
        }
        self.dirty = true;

        let likes = service.vote(id)?;
        if let Some(likes) = likes {
            if let Some(image) = self.images.iter_mut().find(|image| image.id == *id) {
                image.likes = likes;
            }
        }
        self.liked.insert(id.clone());
        self.liked.save(store)?;
        Ok(true)
    }

    /// Submit a gallery image to the board.
    ///
    /// `doi` is whatever the DOI field holds; an empty one is sent as
    /// `manual_upload`.
    pub fn like_image(
        &mut self,
        image: &ImageRecord,
        doi: Option<&str>,
        country: &str,
        service: &dyn SocialService,
        store: &mut dyn KeyValueStore,
    ) -> Result<LikeReceipt, AppError> {
        let upload = like_upload(image, doi, country);
        let receipt = service.like(&upload)?;
        if let Some(id) = &receipt.id {
            if self.liked.insert(id.clone()) {
                self.liked.save(store)?;
            }
        }
        self.dirty = true;
        log::info!("Liked image {} as {:?}", image.id(), receipt.id);
        Ok(receipt)
    }
}

/// Multipart body for liking `image`.
pub fn like_upload(image: &ImageRecord, doi: Option<&str>, country: &str) -> LikeUpload {
    let doi = doi
        .map(str::trim)
        .filter(|doi| !doi.is_empty())
        .unwrap_or(MANUAL_UPLOAD_DOI);
    LikeUpload {
        filename: format!("image.{}", image.extension()),
        mime: mime_for_extension(image.extension()),
        bytes: image.data().to_vec(),
        doi: doi.to_string(),
        country: country.to_string(),
    }
}

/// DOI behind the "extract from this paper" pill, if the entry has a usable one.
pub fn doi_shortcut(image: &TrendingImage) -> Option<&str> {
    image
        .doi
        .as_deref()
        .filter(|doi| doi.chars().count() > MIN_SHORTCUT_DOI_LEN)
}

/// Notice shown after a like attempt.
pub fn like_notice(result: &Result<LikeReceipt, AppError>) -> Notice {
    match result {
        Ok(_) => Notice::success("Added to Hall of Fame! 🏆"),
        Err(e) => {
            log::warn!("Like failed: {}", e);
            Notice::error("Failed to like image.")
        }
    }
}

/// Notice shown when the board could not be loaded.
pub fn trending_notice(error: &AppError) -> Notice {
    match error {
        AppError::Network(_) => Notice::error("Network error."),
        _ => Notice::error("Failed to load."),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use paperpix_gallery::ImageId;

    use super::*;
    use crate::storage::MemoryStore;

    #[derive(Default)]
    struct FakeSocial {
        board: Vec<TrendingImage>,
        votes: RefCell<Vec<TrendingId>>,
        likes: RefCell<Vec<LikeUpload>>,
        fail: bool,
    }

    impl SocialService for FakeSocial {
        fn trending(&self, _period: TrendingPeriod) -> Result<Vec<TrendingImage>, AppError> {
            if self.fail {
                return Err(AppError::Network("offline".to_string()));
            }
            Ok(self.board.clone())
        }

        fn vote(&self, id: &TrendingId) -> Result<Option<i64>, AppError> {
            if self.fail {
                return Err(AppError::backend("Vote failed"));
            }
            self.votes.borrow_mut().push(id.clone());
            Ok(None)
        }

        fn like(&self, upload: &LikeUpload) -> Result<LikeReceipt, AppError> {
            if self.fail {
                return Err(AppError::backend("nope"));
            }
            self.likes.borrow_mut().push(upload.clone());
            Ok(LikeReceipt {
                id: Some(TrendingId::Number(77)),
                likes: Some(1),
                message: None,
            })
        }
    }

    fn entry(id: i64, likes: i64, doi: Option<&str>) -> TrendingImage {
        TrendingImage {
            id: TrendingId::Number(id),
            likes,
            doi: doi.map(str::to_string),
            url: None,
        }
    }

    fn social() -> FakeSocial {
        FakeSocial {
            board: vec![entry(1, 10, Some("10.1000/a")), entry(2, 3, None)],
            ..FakeSocial::default()
        }
    }

    #[test]
    fn test_refresh_only_when_needed() {
        let service = social();
        let mut board = TrendingBoard::default();
        assert!(board.needs_refresh());
        board.refresh(&service).unwrap();
        assert!(!board.needs_refresh());

        assert!(board.set_period(TrendingPeriod::Week));
        assert!(board.needs_refresh());
        assert!(!board.set_period(TrendingPeriod::Week));
    }

    #[test]
    fn test_rows_mark_liked_entries() {
        let service = social();
        let mut store = MemoryStore::new();
        store.set(crate::constants::LIKED_IDS_KEY, "[\"2\"]").unwrap();
        let mut board = TrendingBoard::load(&store);
        assert_eq!(board.refresh(&service).unwrap(), 2);

        let rows = board.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].image.likes, 10);
        assert!(!rows[0].liked);
        assert_eq!(rows[0].shortcut, Some("10.1000/a"));
        assert_eq!(rows[1].rank, 2);
        assert!(rows[1].liked);
        assert_eq!(rows[1].shortcut, None);
    }

    #[test]
    fn test_empty_board_has_no_rows() {
        let service = FakeSocial::default();
        let mut board = TrendingBoard::default();
        assert_eq!(board.refresh(&service).unwrap(), 0);
        assert!(board.rows().is_empty());
        assert!(board.needs_refresh());
    }

    #[test]
    fn test_vote_is_optimistic_and_remembered() {
        let service = social();
        let mut store = MemoryStore::new();
        let mut board = TrendingBoard::load(&store);
        board.refresh(&service).unwrap();

        let id = TrendingId::Number(2);
        assert!(board.vote(&id, &service, &mut store).unwrap());
        assert_eq!(board.images()[1].likes, 4);
        assert!(board.is_dirty());
        assert!(board.is_liked(&id));

        // Second vote never reaches the server
        assert!(!board.vote(&id, &service, &mut store).unwrap());
        assert_eq!(service.votes.borrow().len(), 1);

        let reloaded = TrendingBoard::load(&store);
        assert!(reloaded.is_liked(&TrendingId::from("2")));
    }

    #[test]
    fn test_failed_vote_is_not_persisted() {
        let mut store = MemoryStore::new();
        let mut board = TrendingBoard::default();
        board.images = vec![entry(5, 0, None)];
        let failing = FakeSocial {
            fail: true,
            ..FakeSocial::default()
        };

        let id = TrendingId::Number(5);
        assert!(board.vote(&id, &failing, &mut store).is_err());
        assert_eq!(board.images()[0].likes, 1);
        assert!(!TrendingBoard::load(&store).is_liked(&id));
    }

    #[test]
    fn test_like_image_builds_upload() {
        let service = social();
        let mut store = MemoryStore::new();
        let mut board = TrendingBoard::default();
        let image = ImageRecord::new(ImageId(0), 4, 4, vec![1, 2, 3], "jpg").unwrap();

        let result = board.like_image(&image, Some(" "), "DK", &service, &mut store);
        assert_eq!(like_notice(&result).message, "Added to Hall of Fame! 🏆");

        let likes = service.likes.borrow();
        assert_eq!(likes[0].filename, "image.jpg");
        assert_eq!(likes[0].mime, "image/jpeg");
        assert_eq!(likes[0].doi, "manual_upload");
        assert_eq!(likes[0].country, "DK");
        assert_eq!(likes[0].bytes, vec![1, 2, 3]);
        assert!(board.is_liked(&TrendingId::Number(77)));
        assert!(board.is_dirty());
    }

    #[test]
    fn test_failed_like_notice() {
        let failing = FakeSocial {
            fail: true,
            ..FakeSocial::default()
        };
        let mut store = MemoryStore::new();
        let image = ImageRecord::new(ImageId(0), 1, 1, vec![0], "png").unwrap();
        let result =
            TrendingBoard::default().like_image(&image, Some("10.1/x"), "DK", &failing, &mut store);
        assert_eq!(like_notice(&result).message, "Failed to like image.");
    }

    #[test]
    fn test_doi_shortcut_needs_real_doi() {
        assert_eq!(doi_shortcut(&entry(1, 0, Some("10.1000/a"))), Some("10.1000/a"));
        assert_eq!(doi_shortcut(&entry(1, 0, Some("10.1a"))), None);
        assert_eq!(doi_shortcut(&entry(1, 0, None)), None);
    }

    #[test]
    fn test_trending_notices() {
        let offline = AppError::Network("offline".to_string());
        assert_eq!(trending_notice(&offline).message, "Network error.");
        assert_eq!(trending_notice(&AppError::backend("x")).message, "Failed to load.");
    }
}
