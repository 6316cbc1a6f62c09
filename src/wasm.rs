//! Browser bindings.
//!
//! The page script performs the HTTP requests and hands the response bodies
//! to [`WebApp`]; gallery rules, notices, history and the chat channel live
//! on the Rust side.

use std::cell::RefCell;
use std::rc::Rc;

use paperpix_gallery::{ClickOutcome, FilterThreshold, ImageId, NullView};
use serde_json::json;
use wasm_bindgen::prelude::*;

use crate::api::{Extraction, ExtractionResponse, PdfUpload, display_doi};
use crate::archive::{self, DownloadArtifact};
use crate::chat::ChatPanel;
use crate::config::AppConfig;
use crate::error::{AppError, NoticeKind};
use crate::realtime::{Outbound, RealtimeEvent, WebRealtime};
use crate::session::{Outcome, PendingExtraction, Session};
use crate::storage::{KeyValueStore, LocalStorage, MemoryStore};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    let config = AppConfig::load_from_local_storage().unwrap_or_default();
    if let Some(level) = config.preferences.log_level.to_level_filter().to_level() {
        if let Err(e) = console_log::init_with_level(level) {
            web_sys::console::log_1(&format!("Logger already set: {}", e).into());
        }
    }
    log::info!("paperpix WASM started");
}

/// Origin of the page, which is also the API server.
fn page_origin() -> Option<String> {
    web_sys::window()?.location().origin().ok()
}

fn open_store() -> Box<dyn KeyValueStore> {
    match LocalStorage::open() {
        Ok(store) => Box::new(store),
        Err(e) => {
            log::warn!("State will not persist: {}", e);
            Box::new(MemoryStore::new())
        }
    }
}

/// A file ready to hand to the browser.
#[wasm_bindgen]
pub struct WebDownload {
    artifact: DownloadArtifact,
}

#[wasm_bindgen]
impl WebDownload {
    pub fn filename(&self) -> String {
        self.artifact.filename.clone()
    }

    pub fn mime(&self) -> String {
        self.artifact.mime.clone()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.artifact.bytes.clone()
    }
}

fn to_download(artifact: Option<DownloadArtifact>) -> Option<WebDownload> {
    artifact.map(|artifact| WebDownload { artifact })
}

/// Extraction session and gallery.
#[wasm_bindgen]
pub struct WebApp {
    session: Session<NullView>,
    pending: Vec<PendingExtraction>,
    /// Where score events go after a successful extraction
    chat: Option<WebChat>,
}

#[wasm_bindgen]
impl WebApp {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WebApp {
        let mut config = AppConfig::load_from_local_storage().unwrap_or_default();
        if let Some(origin) = page_origin() {
            config.server_url = origin;
        }
        WebApp {
            session: Session::new(NullView, config, open_store()),
            pending: Vec::new(),
            chat: None,
        }
    }

    /// Send score events through `chat`.
    pub fn attach_chat(&mut self, chat: &WebChat) {
        self.chat = Some(chat.clone());
    }

    /// Validate the DOI and start a request; returns the request token.
    pub fn begin_doi(&mut self, doi: &str) -> Result<u64, JsError> {
        let pending = self.session.begin_doi(doi)?;
        let token = pending.token().value();
        self.pending.push(pending);
        Ok(token)
    }

    /// Validate a picked file and start an upload; returns the request token.
    pub fn begin_upload(
        &mut self,
        filename: &str,
        content_type: Option<String>,
    ) -> Result<u64, JsError> {
        let upload = PdfUpload::new(filename, content_type, Vec::new());
        let pending = self.session.begin_upload(&upload)?;
        let token = pending.token().value();
        self.pending.push(pending);
        Ok(token)
    }

    fn take_pending(&mut self, token: u64) -> Option<PendingExtraction> {
        let index = self.pending.iter().position(|p| p.token().value() == token)?;
        Some(self.pending.remove(index))
    }

    fn complete(&mut self, token: u64, result: Result<Extraction, AppError>) -> bool {
        let Some(pending) = self.take_pending(token) else {
            log::warn!("No pending request {}", token);
            return false;
        };
        match self.session.finish(pending, result) {
            Outcome::Loaded { score, .. } => {
                if let (Some(score), Some(chat)) = (score, &self.chat) {
                    chat.deliver(&score);
                }
                true
            }
            Outcome::Stale | Outcome::Failed => false,
        }
    }

    /// Feed the response of `/api/process` or `/api/upload`. Returns whether
    /// images were loaded.
    pub fn finish(&mut self, token: u64, http_ok: bool, body: &str) -> bool {
        let result = serde_json::from_str::<ExtractionResponse>(body)
            .map_err(AppError::from)
            .and_then(|response| response.into_extraction(http_ok));
        self.complete(token, result)
    }

    /// The request never got a response.
    pub fn fail(&mut self, token: u64, message: &str) {
        self.complete(token, Err(AppError::Network(message.to_string())));
    }

    pub fn notice_message(&self) -> Option<String> {
        self.session.notice().map(|n| n.message.clone())
    }

    pub fn notice_kind(&self) -> Option<String> {
        self.session.notice().map(|n| {
            match n.kind {
                NoticeKind::Success => "success",
                NoticeKind::Info => "info",
                NoticeKind::Error => "error",
            }
            .to_string()
        })
    }

    pub fn rescue_link(&self) -> Option<String> {
        self.session.notice().and_then(|n| n.rescue_link.clone())
    }

    pub fn dismiss_notice(&mut self) {
        self.session.dismiss_notice();
    }

    /// Recent DOIs as shown in the history chips.
    pub fn history(&self) -> Vec<String> {
        self.session
            .history()
            .entries()
            .iter()
            .map(|doi| display_doi(doi).to_string())
            .collect()
    }

    pub fn remove_history(&mut self, doi: &str) -> Result<bool, JsError> {
        Ok(self.session.remove_history(doi)?)
    }

    pub fn title(&self) -> String {
        self.session.gallery().session().title().to_string()
    }

    pub fn pdf(&self) -> Option<Vec<u8>> {
        self.session.pdf().map(<[u8]>::to_vec)
    }

    /// Non-deleted images in display order with their flags, as JSON.
    pub fn images_json(&self) -> String {
        let gallery = self.session.gallery();
        let visible = gallery.visible();
        let rows: Vec<_> = gallery
            .session()
            .display_order()
            .into_iter()
            .map(|image| {
                json!({
                    "id": image.id().0,
                    "width": image.width(),
                    "height": image.height(),
                    "ext": image.extension(),
                    "visible": visible.contains(&image.id()),
                    "selected": gallery.selected().contains(&image.id()),
                })
            })
            .collect();
        serde_json::Value::Array(rows).to_string()
    }

    pub fn image_bytes(&self, id: u32) -> Option<Vec<u8>> {
        self.session
            .gallery()
            .session()
            .image(ImageId(id))
            .map(|image| image.data().to_vec())
    }

    pub fn set_threshold(&mut self, percent: u32) -> Result<(), JsError> {
        let threshold = FilterThreshold::new(percent)?;
        self.session.gallery_mut().set_threshold(threshold);
        Ok(())
    }

    /// Slider input; applied by `poll` once the input settles.
    pub fn input_threshold(&mut self, percent: u32) -> Result<(), JsError> {
        let threshold = FilterThreshold::new(percent)?;
        self.session.gallery_mut().input_threshold(threshold);
        Ok(())
    }

    pub fn poll(&mut self) -> bool {
        self.session.gallery_mut().poll()
    }

    /// Remember the current threshold and sort mode for the next visit.
    pub fn save_settings(&self) -> Result<(), JsError> {
        let gallery = self.session.gallery();
        let mut config = self.session.config().clone();
        config.preferences.filter_threshold = gallery.threshold();
        config.preferences.sort_mode = gallery.sort_mode();
        config.save_to_local_storage()?;
        Ok(())
    }

    pub fn threshold_label(&self) -> String {
        self.session.gallery().threshold().label()
    }

    pub fn visible_count(&self) -> usize {
        self.session.gallery().visible_count()
    }

    /// Advance the sort mode; returns its name.
    pub fn cycle_sort(&mut self) -> String {
        self.session.gallery_mut().cycle_sort().name().to_string()
    }

    pub fn toggle(&mut self, id: u32) -> Result<bool, JsError> {
        Ok(self.session.gallery_mut().toggle(ImageId(id))?)
    }

    pub fn selection_click(&mut self, id: u32, range: bool) -> Result<bool, JsError> {
        Ok(self.session.gallery_mut().selection_click(ImageId(id), range)?)
    }

    /// Click on the image itself: selects, or returns the image to download.
    pub fn click(&mut self, id: u32, range: bool) -> Result<Option<WebDownload>, JsError> {
        match self.session.gallery_mut().smart_click(ImageId(id), range)? {
            ClickOutcome::Selection { .. } => Ok(None),
            ClickOutcome::Download(id) => {
                let plan = self.session.gallery().single_download(id)?;
                Ok(to_download(archive::package(&plan)?))
            }
        }
    }

    pub fn delete_selected(&mut self) -> Vec<u32> {
        self.session
            .gallery_mut()
            .delete_selected()
            .into_iter()
            .map(|id| id.0)
            .collect()
    }

    pub fn can_delete(&self) -> bool {
        self.session.gallery().can_delete()
    }

    pub fn download_label(&self) -> String {
        self.session.gallery().download_label()
    }

    pub fn download(&self) -> Result<Option<WebDownload>, JsError> {
        let plan = self.session.gallery().download_plan();
        Ok(to_download(archive::package(&plan)?))
    }
}

impl Default for WebApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Chat drawer and its channel.
///
/// Every method takes `&self`, so the event callback may read the panel
/// while a method is running.
#[wasm_bindgen]
#[derive(Clone)]
pub struct WebChat {
    panel: Rc<RefCell<ChatPanel>>,
    channel: Rc<RefCell<Option<WebRealtime>>>,
}

#[wasm_bindgen]
impl WebChat {
    #[wasm_bindgen(constructor)]
    pub fn new(country: &str) -> WebChat {
        WebChat {
            panel: Rc::new(RefCell::new(ChatPanel::new(country))),
            channel: Rc::new(RefCell::new(None)),
        }
    }

    /// Open the channel. `on_change` is called with the event kind
    /// (`status`, `message` or `error`) after every event.
    pub fn connect(&self, on_change: js_sys::Function) -> Result<(), JsError> {
        let server = page_origin().ok_or_else(|| JsError::new("No page origin"))?;
        let panel = Rc::clone(&self.panel);
        let channel = WebRealtime::connect(&server, move |event: RealtimeEvent| {
            let kind = match &event {
                RealtimeEvent::Status(_) => "status",
                RealtimeEvent::Message(_) => "message",
                RealtimeEvent::Error(_) => "error",
            };
            panel.borrow_mut().handle(event);
            if let Err(e) = on_change.call1(&JsValue::NULL, &JsValue::from_str(kind)) {
                log::warn!("Chat callback failed: {:?}", e);
            }
        })?;
        *self.channel.borrow_mut() = Some(channel);
        Ok(())
    }

    pub fn disconnect(&self) {
        if let Some(channel) = self.channel.borrow_mut().take() {
            channel.close();
        }
    }

    fn deliver(&self, message: &Outbound) {
        let result = match self.channel.borrow().as_ref() {
            Some(channel) => channel.send(message),
            None => Err(AppError::Disconnected),
        };
        if let Err(e) = result {
            log::debug!("Not sent ({}): {:?}", e, message);
        }
    }

    pub fn send(&self, text: &str) -> Result<(), JsError> {
        let message = self.panel.borrow().compose(text)?;
        match self.channel.borrow().as_ref() {
            Some(channel) => Ok(channel.send(&message)?),
            None => Err(AppError::Disconnected.into()),
        }
    }

    pub fn set_country(&self, country: &str) {
        self.panel.borrow_mut().set_country(country);
    }

    pub fn status(&self) -> String {
        self.panel.borrow().status().label().to_string()
    }

    /// Flip the drawer; returns whether it is open.
    pub fn toggle(&self) -> bool {
        self.panel.borrow_mut().toggle()
    }

    pub fn unread_badge(&self) -> Option<String> {
        self.panel.borrow().unread_badge()
    }

    pub fn online_text(&self) -> Option<String> {
        self.panel.borrow().online_text()
    }

    pub fn distribution(&self) -> Option<String> {
        self.panel.borrow().distribution().map(str::to_string)
    }

    pub fn messages_json(&self) -> Result<String, JsError> {
        Ok(serde_json::to_string(self.panel.borrow().messages())?)
    }

    /// Leaderboard rows with their rank badge, as JSON.
    pub fn leaderboard_json(&self) -> String {
        let panel = self.panel.borrow();
        let rows: Vec<_> = panel
            .ranked()
            .into_iter()
            .map(|(badge, entry)| {
                json!({
                    "rank": badge,
                    "country": entry.country,
                    "score": entry.score,
                    "chats": entry.chats,
                })
            })
            .collect();
        serde_json::Value::Array(rows).to_string()
    }
}
