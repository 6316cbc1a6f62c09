//! Blocking HTTP client for the server endpoints (native only).

use reqwest::blocking::{Client, Response, multipart};
use serde::de::DeserializeOwned;

use crate::constants::HTTP_TIMEOUT;
use crate::error::AppError;

use super::transport::{ExtractionService, LikeUpload, PdfUpload, SocialService};
use super::wire::{
    Extraction, ExtractionResponse, LikeReceipt, LikeResponse, ProcessRequest, TrendingId,
    TrendingImage, TrendingPeriod, TrendingResponse, VoteRequest, VoteResponse,
};

fn network(e: reqwest::Error) -> AppError {
    AppError::Network(e.to_string())
}

/// Talks to one paperpix server.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    client: Client,
}

impl HttpClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(network)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Whether the status was 2xx, and the parsed body.
    fn read_json<T: DeserializeOwned>(response: Response) -> Result<(bool, T), AppError> {
        let status = response.status();
        log::debug!("{} {}", status, response.url());
        let body = response
            .json::<T>()
            .map_err(|e| AppError::Network(format!("Invalid response ({}): {}", status, e)))?;
        Ok((status.is_success(), body))
    }
}

impl ExtractionService for HttpClient {
    fn process_doi(&self, doi: &str) -> Result<Extraction, AppError> {
        log::info!("Requesting extraction for DOI {}", doi);
        let response = self
            .client
            .post(self.endpoint("/api/process"))
            .json(&ProcessRequest { doi })
            .send()
            .map_err(network)?;
        let (ok, body) = Self::read_json::<ExtractionResponse>(response)?;
        body.into_extraction(ok)
    }

    fn upload_pdf(&self, upload: &PdfUpload) -> Result<Extraction, AppError> {
        log::info!(
            "Uploading {} ({} bytes) for extraction",
            upload.filename,
            upload.bytes.len()
        );
        let part = multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.filename.clone())
            .mime_str(upload.content_type.as_deref().unwrap_or("application/pdf"))
            .map_err(network)?;
        let form = multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(self.endpoint("/api/upload"))
            .multipart(form)
            .send()
            .map_err(network)?;
        let (ok, body) = Self::read_json::<ExtractionResponse>(response)?;
        body.into_extraction(ok)
    }
}

impl SocialService for HttpClient {
    fn trending(&self, period: TrendingPeriod) -> Result<Vec<TrendingImage>, AppError> {
        let response = self
            .client
            .get(self.endpoint("/api/trending"))
            .query(&[("period", period.as_str())])
            .send()
            .map_err(network)?;
        let (_, body) = Self::read_json::<TrendingResponse>(response)?;
        body.into_images()
    }

    fn vote(&self, id: &TrendingId) -> Result<Option<i64>, AppError> {
        let response = self
            .client
            .post(self.endpoint("/api/vote"))
            .json(&VoteRequest { id })
            .send()
            .map_err(network)?;
        let (_, body) = Self::read_json::<VoteResponse>(response)?;
        body.into_likes()
    }

    fn like(&self, upload: &LikeUpload) -> Result<LikeReceipt, AppError> {
        let part = multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.filename.clone())
            .mime_str(&upload.mime)
            .map_err(network)?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("doi", upload.doi.clone())
            .text("country", upload.country.clone());
        let response = self
            .client
            .post(self.endpoint("/api/like"))
            .multipart(form)
            .send()
            .map_err(network)?;
        let (_, body) = Self::read_json::<LikeResponse>(response)?;
        body.into_receipt()
    }
}
