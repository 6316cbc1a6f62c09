//! paperpix - pull the figures out of a research paper
//!
//! Client for a paper image-extraction server. Given a DOI or an uploaded
//! PDF the server returns the embedded raster images; this crate loads them
//! into a filterable, sortable gallery (see `paperpix_gallery`), packages
//! downloads, keeps the recent DOI history, and drives the trending board and
//! the realtime chat channel. Runs natively as a CLI and in the browser.

pub mod api;
pub mod archive;
pub mod chat;
pub mod config;
pub mod constants;
pub mod error;
pub mod realtime;
pub mod session;
pub mod social;
pub mod storage;

pub use config::AppConfig;
pub use error::{AppError, Notice, NoticeKind, ValidationError};
pub use session::{Outcome, Session};

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
