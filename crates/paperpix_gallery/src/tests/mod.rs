//! Scenario and property tests for the gallery state machine.
//!
//! These run whole user flows through [`crate::GallerySession`] and
//! [`crate::GalleryController`] rather than single helpers.

mod property_tests;

use crate::{FilterThreshold, GallerySession, ImagePayload, ImageStore, SortMode};

/// Session whose images have the given areas (width = area, height = 1).
fn session_with_areas(areas: &[u32], threshold: u32) -> GallerySession {
    let payloads = areas
        .iter()
        .map(|&area| ImagePayload {
            width: area,
            height: 1,
            data: vec![0],
            extension: "png".to_string(),
        })
        .collect();
    let mut session =
        GallerySession::new(FilterThreshold::new(threshold).unwrap(), SortMode::Original);
    session.replace_images(Some("paper"), ImageStore::from_payloads(payloads).unwrap());
    session
}
