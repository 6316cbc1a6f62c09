//! Error types and user-facing notices for the client.

use paperpix_gallery::GalleryError;
use thiserror::Error;

use crate::constants::DOI_RESOLVER;

/// Input rejected before anything is sent to the server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The DOI field was empty or whitespace
    #[error("Please enter a DOI")]
    EmptyDoi,

    /// The uploaded file is not a PDF
    #[error("Please upload a PDF file (got '{name}')")]
    NotPdf {
        /// Name of the rejected file
        name: String,
    },

    /// A chat message was blank after trimming
    #[error("Message is empty")]
    EmptyMessage,

    /// Trending period not one of all/week/month/year
    #[error("Unknown trending period '{0}'")]
    UnknownPeriod(String),
}

/// Errors that can occur while talking to the server or handling its data.
#[derive(Error, Debug)]
pub enum AppError {
    /// The request never produced a usable response
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a failure status
    #[error("{detail}")]
    Backend {
        /// Message reported by the server
        detail: String,
    },

    /// The paper could not be fetched automatically
    #[error("Protected Paper. Please download manually.")]
    Protected {
        /// Direct PDF link when the server found one
        pdf_url: Option<String>,
    },

    /// Input rejected locally
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Gallery state rejected the data or action
    #[error(transparent)]
    Gallery(#[from] GalleryError),

    /// An image payload was not valid base64
    #[error("Invalid image payload for image {index}: {message}")]
    Decode {
        /// Position of the image in the response
        index: usize,
        /// Decoder message
        message: String,
    },

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing the download archive failed
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server URL could not be parsed
    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The realtime channel is not connected
    #[error("Realtime channel is not connected")]
    Disconnected,

    /// Persistent storage failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppError {
    /// Create a backend error from a server `detail` message.
    pub fn backend(detail: impl Into<String>) -> Self {
        Self::Backend {
            detail: detail.into(),
        }
    }

    /// Whether the failure came from the network or the server rather than
    /// from local input.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            AppError::Network(_) | AppError::Backend { .. } | AppError::Protected { .. }
        )
    }
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Error,
}

/// A dismissible status message, optionally with a link out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    /// Where the user can fetch the paper themselves
    pub rescue_link: Option<String>,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
            rescue_link: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
            rescue_link: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
            rescue_link: None,
        }
    }

    /// Build the notice shown for a failed request.
    ///
    /// Remote failures get a rescue link when the DOI is known. A protected
    /// paper prefers the direct PDF link the server found.
    pub fn from_error(error: &AppError, doi: Option<&str>) -> Self {
        let link = match error {
            AppError::Protected {
                pdf_url: Some(url),
            } => Some(url.clone()),
            e if e.is_remote() => doi.map(rescue_link),
            _ => None,
        };
        Self {
            kind: NoticeKind::Error,
            message: error.to_string(),
            rescue_link: link,
        }
    }
}

/// Resolver link for a DOI.
pub fn rescue_link(doi: &str) -> String {
    format!("{}{}", DOI_RESOLVER, doi.trim())
}
