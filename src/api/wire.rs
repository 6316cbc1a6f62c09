//! JSON bodies exchanged with the extraction server.

use std::fmt;
use std::str::FromStr;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use paperpix_gallery::ImagePayload;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, ValidationError};

const STATUS_SUCCESS: &str = "success";
const STATUS_MANUAL_LINK: &str = "manual_link";

/// Extension used when neither the entry nor its data URL names one.
const FALLBACK_EXTENSION: &str = "png";

/// Body of `POST /api/process`.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessRequest<'a> {
    pub doi: &'a str,
}

/// One image as the server sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct WireImage {
    /// `data:image/<ext>;base64,<payload>` URL or a bare base64 payload
    pub base64: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub ext: Option<String>,
    /// Encoded size in bytes
    #[serde(default)]
    pub size: Option<u64>,
}

impl WireImage {
    /// Decode the payload into gallery input. `index` is only used for the
    /// error message.
    pub fn decode(self, index: usize) -> Result<ImagePayload, AppError> {
        let (mime_ext, payload) = split_data_url(&self.base64);
        let data = STANDARD
            .decode(payload.trim())
            .map_err(|e| AppError::Decode {
                index,
                message: e.to_string(),
            })?;
        let extension = self
            .ext
            .filter(|ext| !ext.is_empty())
            .or_else(|| mime_ext.map(str::to_string))
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

        Ok(ImagePayload {
            width: self.width,
            height: self.height,
            data,
            extension,
        })
    }
}

/// Split a `data:image/<ext>;base64,<payload>` URL into the extension named by
/// its MIME type and the payload. Anything else is returned as a bare payload.
pub fn split_data_url(raw: &str) -> (Option<&str>, &str) {
    let Some(rest) = raw.strip_prefix("data:") else {
        return (None, raw);
    };
    match rest.split_once(',') {
        Some((meta, payload)) => {
            let ext = meta
                .split(';')
                .next()
                .and_then(|mime| mime.strip_prefix("image/"))
                .filter(|ext| !ext.is_empty());
            (ext, payload)
        }
        None => (None, raw),
    }
}

/// MIME type for an image extension.
pub fn mime_for_extension(ext: &str) -> String {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        other => format!("image/{}", other),
    }
}

/// `detail` may be a string or (for request validation errors) structured JSON.
fn detail_text(detail: Option<Value>) -> Option<String> {
    match detail? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

fn check_status(status: &str, detail: Option<Value>, fallback: &str) -> Result<(), AppError> {
    if status == STATUS_SUCCESS {
        Ok(())
    } else {
        Err(AppError::backend(
            detail_text(detail).unwrap_or_else(|| fallback.to_string()),
        ))
    }
}

/// Response of `/api/process` and `/api/upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub images: Vec<WireImage>,
    pub title: Option<String>,
    pub count: Option<usize>,
    pub image_count: Option<usize>,
    pub doi: Option<String>,
    pub pdf_base64: Option<String>,
    pub pdf_url: Option<String>,
    pub detail: Option<Value>,
}

/// A successful extraction, decoded and ready for the gallery.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub title: Option<String>,
    pub images: Vec<ImagePayload>,
    /// Image count reported by the server (`count`, else `image_count`)
    pub reported_count: usize,
    pub doi: Option<String>,
    /// The source PDF, when the server echoed it back
    pub pdf: Option<Vec<u8>>,
}

impl ExtractionResponse {
    /// Interpret the response. `http_ok` is whether the status code was 2xx;
    /// a success body under an error code is still a failure.
    pub fn into_extraction(self, http_ok: bool) -> Result<Extraction, AppError> {
        if self.status == STATUS_MANUAL_LINK {
            return Err(AppError::Protected {
                pdf_url: self.pdf_url,
            });
        }
        if !http_ok || self.status != STATUS_SUCCESS {
            return Err(AppError::backend(
                detail_text(self.detail).unwrap_or_else(|| "Error".to_string()),
            ));
        }

        let images = self
            .images
            .into_iter()
            .enumerate()
            .map(|(index, image)| image.decode(index))
            .collect::<Result<Vec<_>, _>>()?;

        let pdf = self.pdf_base64.and_then(|encoded| {
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| log::warn!("Ignoring undecodable PDF echo: {}", e))
                .ok()
        });

        Ok(Extraction {
            title: self.title,
            reported_count: self.count.or(self.image_count).unwrap_or(0),
            images,
            doi: self.doi,
            pdf,
        })
    }
}

/// Time window of the trending board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendingPeriod {
    #[default]
    All,
    Week,
    Month,
    Year,
}

impl TrendingPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            TrendingPeriod::All => "all",
            TrendingPeriod::Week => "week",
            TrendingPeriod::Month => "month",
            TrendingPeriod::Year => "year",
        }
    }

    pub fn all() -> &'static [TrendingPeriod] {
        &[
            TrendingPeriod::All,
            TrendingPeriod::Week,
            TrendingPeriod::Month,
            TrendingPeriod::Year,
        ]
    }
}

impl fmt::Display for TrendingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrendingPeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|period| period.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownPeriod(s.to_string()))
    }
}

/// Server-side id of a trending image. Older rows use numbers, newer ones
/// strings; the original form is kept when sending it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrendingId {
    Number(i64),
    Text(String),
}

impl fmt::Display for TrendingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendingId::Number(n) => write!(f, "{}", n),
            TrendingId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for TrendingId {
    fn from(n: i64) -> Self {
        TrendingId::Number(n)
    }
}

impl From<&str> for TrendingId {
    fn from(s: &str) -> Self {
        TrendingId::Text(s.to_string())
    }
}

/// One entry of the trending board.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrendingImage {
    pub id: TrendingId,
    #[serde(default)]
    pub likes: i64,
    pub doi: Option<String>,
    pub url: Option<String>,
}

/// Response of `GET /api/trending`.
#[derive(Debug, Clone, Deserialize)]
pub struct TrendingResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub images: Vec<TrendingImage>,
    pub detail: Option<Value>,
}

impl TrendingResponse {
    pub fn into_images(self) -> Result<Vec<TrendingImage>, AppError> {
        check_status(&self.status, self.detail, "Failed to load trending images")?;
        Ok(self.images)
    }
}

/// Body of `POST /api/vote`.
#[derive(Debug, Clone, Serialize)]
pub struct VoteRequest<'a> {
    pub id: &'a TrendingId,
}

/// Response of `POST /api/vote`.
#[derive(Debug, Clone, Deserialize)]
pub struct VoteResponse {
    #[serde(default)]
    pub status: String,
    pub likes: Option<i64>,
    pub detail: Option<Value>,
}

impl VoteResponse {
    /// New like count, if the server reported one.
    pub fn into_likes(self) -> Result<Option<i64>, AppError> {
        check_status(&self.status, self.detail, "Vote failed")?;
        Ok(self.likes)
    }
}

/// Response of `POST /api/like`.
#[derive(Debug, Clone, Deserialize)]
pub struct LikeResponse {
    #[serde(default)]
    pub status: String,
    pub id: Option<TrendingId>,
    pub likes: Option<i64>,
    pub msg: Option<String>,
    pub detail: Option<Value>,
}

/// What the server did with a liked gallery image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeReceipt {
    pub id: Option<TrendingId>,
    pub likes: Option<i64>,
    pub message: Option<String>,
}

impl LikeResponse {
    pub fn into_receipt(self) -> Result<LikeReceipt, AppError> {
        check_status(&self.status, self.detail, "Failed to like image.")?;
        Ok(LikeReceipt {
            id: self.id,
            likes: self.likes,
            message: self.msg,
        })
    }
}
