//! One user's extraction session: request lifecycle, notices and history.
//!
//! [`Session`] wraps the gallery controller with everything around a request:
//! input validation, stale-response handling, the status notice, the recent
//! DOI history and the score event sent after a successful extraction.

use paperpix_gallery::{GalleryController, GalleryView, RequestToken};

use crate::api::{Extraction, ExtractionService, PdfUpload, validate_doi};
use crate::config::AppConfig;
use crate::constants::UPLOAD_HISTORY_SENTINEL;
use crate::error::{AppError, Notice};
use crate::realtime::Outbound;
use crate::storage::{KeyValueStore, SearchHistory};

/// What an extraction request was started from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionSource {
    Doi(String),
    Upload { filename: String },
}

impl ExtractionSource {
    /// Identifier recorded in the history; uploads use a sentinel that is
    /// never stored.
    pub fn identifier(&self) -> &str {
        match self {
            ExtractionSource::Doi(doi) => doi,
            ExtractionSource::Upload { .. } => UPLOAD_HISTORY_SENTINEL,
        }
    }
}

/// A request that has been started but not finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExtraction {
    token: RequestToken,
    source: ExtractionSource,
}

impl PendingExtraction {
    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub fn source(&self) -> &ExtractionSource {
        &self.source
    }
}

/// How a finished request was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A newer request was started meanwhile; the response was dropped
    Stale,
    /// Images are in the gallery
    Loaded {
        images: usize,
        /// Score event to send on the realtime channel
        score: Option<Outbound>,
    },
    /// The request failed; the notice says why
    Failed,
}

/// Extraction flow around one gallery: requests, notices and recent history.
pub struct Session<V: GalleryView> {
    config: AppConfig,
    gallery: GalleryController<V>,
    history: SearchHistory,
    store: Box<dyn KeyValueStore>,
    notice: Option<Notice>,
    /// Contents of the DOI field, used for rescue links and likes
    doi_field: String,
    pdf: Option<Vec<u8>>,
}

impl<V: GalleryView> Session<V> {
    pub fn new(view: V, config: AppConfig, store: Box<dyn KeyValueStore>) -> Self {
        let gallery = GalleryController::with_settings(
            view,
            config.preferences.filter_threshold,
            config.preferences.sort_mode,
        );
        let history = SearchHistory::load(store.as_ref());
        Self {
            config,
            gallery,
            history,
            store,
            notice: None,
            doi_field: String::new(),
            pdf: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn gallery(&self) -> &GalleryController<V> {
        &self.gallery
    }

    pub fn gallery_mut(&mut self) -> &mut GalleryController<V> {
        &mut self.gallery
    }

    pub fn store_mut(&mut self) -> &mut dyn KeyValueStore {
        self.store.as_mut()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Show a notice produced outside the extraction flow (likes, trending).
    pub fn show_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn doi_field(&self) -> &str {
        &self.doi_field
    }

    /// The source PDF of the last extraction, when the server sent it.
    pub fn pdf(&self) -> Option<&[u8]> {
        self.pdf.as_deref()
    }

    pub fn history(&self) -> &SearchHistory {
        &self.history
    }

    /// Drop a DOI from the recent history.
    pub fn remove_history(&mut self, doi: &str) -> Result<bool, AppError> {
        if !self.history.remove(doi) {
            return Ok(false);
        }
        self.history.save(self.store.as_mut())?;
        Ok(true)
    }

    fn reject(&mut self, error: AppError) -> AppError {
        log::warn!("{}", error);
        self.notice = Some(Notice::error(error.to_string()));
        error
    }

    fn start(&mut self, source: ExtractionSource) -> PendingExtraction {
        let token = self.gallery.begin_request();
        self.notice = None;
        self.pdf = None;
        log::info!("Extraction {} started for {:?}", token.value(), source);
        PendingExtraction { token, source }
    }

    /// Validate the DOI field and start a request for it.
    pub fn begin_doi(&mut self, raw: &str) -> Result<PendingExtraction, AppError> {
        self.doi_field = raw.trim().to_string();
        let doi = match validate_doi(raw) {
            Ok(doi) => doi.to_string(),
            Err(e) => return Err(self.reject(e.into())),
        };
        Ok(self.start(ExtractionSource::Doi(doi)))
    }

    /// Validate a picked file and start an upload request for it.
    pub fn begin_upload(&mut self, upload: &PdfUpload) -> Result<PendingExtraction, AppError> {
        if let Err(e) = upload.validate() {
            return Err(self.reject(e.into()));
        }
        Ok(self.start(ExtractionSource::Upload {
            filename: upload.filename.clone(),
        }))
    }

    /// Apply the result of a request started with `begin_*`.
    pub fn finish(
        &mut self,
        pending: PendingExtraction,
        result: Result<Extraction, AppError>,
    ) -> Outcome {
        if !self.gallery.is_current(pending.token) {
            log::warn!(
                "Ignoring response to superseded extraction {}",
                pending.token.value()
            );
            return Outcome::Stale;
        }

        let extraction = match result {
            Ok(extraction) => extraction,
            Err(e) => {
                if matches!(e, AppError::Protected { .. }) {
                    self.remember(&pending.source);
                }
                self.fail(&e, &pending.source);
                return Outcome::Failed;
            }
        };

        let count = extraction.reported_count;
        if let Err(e) = self.gallery.load(
            pending.token,
            extraction.title.as_deref(),
            extraction.images,
        ) {
            self.fail(&AppError::from(e), &pending.source);
            return Outcome::Failed;
        }

        self.pdf = extraction.pdf;
        self.notice = Some(Notice::success(format!(
            "Successfully extracted {} images!",
            count
        )));
        self.remember(&pending.source);

        let score = (count > 0).then(|| Outbound::Score {
            country: self.config.country.clone(),
        });
        Outcome::Loaded {
            images: self.gallery.session().images().len(),
            score,
        }
    }

    fn fail(&mut self, error: &AppError, source: &ExtractionSource) {
        log::warn!("Extraction failed: {}", error);
        let doi = Some(self.doi_field.as_str()).filter(|doi| !doi.is_empty());
        let mut notice = Notice::from_error(error, doi);
        if let AppError::Network(_) = error {
            notice.message = match source {
                ExtractionSource::Doi(_) => "Network error or timeout.".to_string(),
                ExtractionSource::Upload { .. } => "Error uploading file.".to_string(),
            };
        }
        self.notice = Some(notice);
    }

    fn remember(&mut self, source: &ExtractionSource) {
        if !self.history.record(source.identifier()) {
            return;
        }
        if let Err(e) = self.history.save(self.store.as_mut()) {
            log::warn!("Failed to save search history: {}", e);
        }
    }

    /// Run a DOI extraction end to end.
    pub fn extract_doi(
        &mut self,
        raw: &str,
        service: &dyn ExtractionService,
    ) -> Result<Outcome, AppError> {
        let pending = self.begin_doi(raw)?;
        let result = service.process_doi(pending.source().identifier());
        Ok(self.finish(pending, result))
    }

    /// Run a PDF upload extraction end to end.
    pub fn extract_upload(
        &mut self,
        upload: &PdfUpload,
        service: &dyn ExtractionService,
    ) -> Result<Outcome, AppError> {
        let pending = self.begin_upload(upload)?;
        let result = service.upload_pdf(upload);
        Ok(self.finish(pending, result))
    }
}
