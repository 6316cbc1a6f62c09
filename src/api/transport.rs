//! Service traits for the extraction and social endpoints, plus the input
//! checks that run before a request is sent.

use crate::error::{AppError, ValidationError};

use super::wire::{Extraction, LikeReceipt, TrendingId, TrendingImage, TrendingPeriod};

/// A PDF picked by the user for upload.
#[derive(Debug, Clone)]
pub struct PdfUpload {
    pub filename: String,
    /// MIME type reported by the picker, if any
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl PdfUpload {
    pub fn new(filename: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            bytes,
        }
    }

    /// Accept files named `*.pdf` or typed `application/pdf`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let typed_pdf = self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf"));
        let named_pdf = self.filename.to_ascii_lowercase().ends_with(".pdf");
        if typed_pdf || named_pdf {
            Ok(())
        } else {
            Err(ValidationError::NotPdf {
                name: self.filename.clone(),
            })
        }
    }
}

/// A gallery image submitted to the hall of fame.
#[derive(Debug, Clone)]
pub struct LikeUpload {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub doi: String,
    pub country: String,
}

/// Extraction endpoints.
pub trait ExtractionService {
    /// Fetch the paper behind `doi` and extract its images.
    fn process_doi(&self, doi: &str) -> Result<Extraction, AppError>;

    /// Extract images from an uploaded PDF.
    fn upload_pdf(&self, upload: &PdfUpload) -> Result<Extraction, AppError>;
}

/// Trending board endpoints.
pub trait SocialService {
    fn trending(&self, period: TrendingPeriod) -> Result<Vec<TrendingImage>, AppError>;

    /// Add one like; returns the new count when the server reports it.
    fn vote(&self, id: &TrendingId) -> Result<Option<i64>, AppError>;

    fn like(&self, upload: &LikeUpload) -> Result<LikeReceipt, AppError>;
}

/// Trim a DOI and reject it when empty.
pub fn validate_doi(raw: &str) -> Result<&str, ValidationError> {
    let doi = raw.trim();
    if doi.is_empty() {
        Err(ValidationError::EmptyDoi)
    } else {
        Ok(doi)
    }
}

/// DOI as shown in history chips: a leading `http(s)://`, `dx.` and
/// `doi.org/` prefix is dropped (case-insensitive).
pub fn display_doi(doi: &str) -> &str {
    fn strip_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
        let head = s.get(..prefix.len())?;
        head.eq_ignore_ascii_case(prefix)
            .then(|| &s[prefix.len()..])
    }

    let rest = strip_ci(doi, "https://")
        .or_else(|| strip_ci(doi, "http://"))
        .unwrap_or(doi);
    let rest = strip_ci(rest, "dx.").unwrap_or(rest);
    strip_ci(rest, "doi.org/").unwrap_or(doi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_doi_trims() {
        assert_eq!(validate_doi("  10.1000/xyz \n"), Ok("10.1000/xyz"));
        assert_eq!(validate_doi("   "), Err(ValidationError::EmptyDoi));
    }

    #[test]
    fn test_pdf_upload_validation() {
        assert!(PdfUpload::new("paper.PDF", None, vec![]).validate().is_ok());
        assert!(
            PdfUpload::new("blob", Some("application/pdf".to_string()), vec![])
                .validate()
                .is_ok()
        );
        assert_eq!(
            PdfUpload::new("notes.txt", Some("text/plain".to_string()), vec![]).validate(),
            Err(ValidationError::NotPdf {
                name: "notes.txt".to_string()
            })
        );
    }

    #[test]
    fn test_display_doi_strips_resolver() {
        assert_eq!(display_doi("https://doi.org/10.1/abc"), "10.1/abc");
        assert_eq!(display_doi("http://dx.doi.org/10.1/abc"), "10.1/abc");
        assert_eq!(display_doi("DOI.ORG/10.1/abc"), "10.1/abc");
        assert_eq!(display_doi("10.1/abc"), "10.1/abc");
    }

    #[test]
    fn test_display_doi_needs_resolver_host() {
        // Scheme alone is not stripped
        assert_eq!(display_doi("https://example.org/x"), "https://example.org/x");
        assert_eq!(display_doi("dx.example"), "dx.example");
    }
}
