//! Request/response layer for the extraction server.

#[cfg(not(target_arch = "wasm32"))]
mod http;
mod transport;
mod wire;

#[cfg(not(target_arch = "wasm32"))]
pub use http::HttpClient;
pub use transport::{
    ExtractionService, LikeUpload, PdfUpload, SocialService, display_doi, validate_doi,
};
pub use wire::{
    Extraction, ExtractionResponse, LikeReceipt, LikeResponse, ProcessRequest, TrendingId,
    TrendingImage, TrendingPeriod, TrendingResponse, VoteRequest, VoteResponse, WireImage,
    mime_for_extension, split_data_url,
};
