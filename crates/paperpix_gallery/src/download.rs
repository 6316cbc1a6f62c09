//! Download target resolution and file naming.

use std::collections::BTreeSet;

use crate::image::{ImageId, ImageRecord};

/// Title used when the backend does not provide one.
pub const DEFAULT_TITLE: &str = "paper";

/// Maximum length of a sanitized title, in characters.
pub const MAX_TITLE_CHARS: usize = 100;

/// Characters that are not allowed in file names on at least one major OS.
const UNSAFE_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Make a backend-provided title safe to use in file names.
///
/// Every run of unsafe characters collapses into a single `_`; the result is
/// truncated to [`MAX_TITLE_CHARS`] characters. Unicode is kept as is.
pub fn sanitize_title(raw: Option<&str>) -> String {
    let raw = match raw {
        Some(title) if !title.is_empty() => title,
        _ => DEFAULT_TITLE,
    };

    let mut safe = String::with_capacity(raw.len());
    let mut in_unsafe_run = false;
    for c in raw.chars() {
        if UNSAFE_FILENAME_CHARS.contains(&c) {
            if !in_unsafe_run {
                safe.push('_');
            }
            in_unsafe_run = true;
        } else {
            safe.push(c);
            in_unsafe_run = false;
        }
    }

    safe.chars().take(MAX_TITLE_CHARS).collect()
}

/// File name of a single image: `{title}_{NNN}.{ext}` with a 1-based index.
pub fn image_filename(title: &str, image: &ImageRecord) -> String {
    format!(
        "{}_{:03}.{}",
        title,
        image.id().ordinal(),
        image.extension()
    )
}

/// File name of the archive holding several images.
pub fn archive_filename(title: &str) -> String {
    format!("{}_images.zip", title)
}

/// Images a download action applies to.
///
/// A non-empty selection always wins, in extraction order, regardless of the
/// current filter or sort. Otherwise every visible image is taken, in the
/// given display order.
pub fn resolve_targets<'a>(
    images: &'a [ImageRecord],
    display_order: &[&'a ImageRecord],
    selection: &BTreeSet<ImageId>,
    deletion: &BTreeSet<ImageId>,
    visible: &BTreeSet<ImageId>,
) -> Vec<&'a ImageRecord> {
    if !selection.is_empty() {
        return images
            .iter()
            .filter(|image| selection.contains(&image.id()))
            .collect();
    }

    display_order
        .iter()
        .copied()
        .filter(|image| visible.contains(&image.id()) && !deletion.contains(&image.id()))
        .collect()
}

/// How the resolved targets are delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadPlan<'a> {
    /// Nothing to download
    Empty,
    /// Deliver one file directly
    Single {
        /// Suggested file name
        filename: String,
        /// The image to deliver
        image: &'a ImageRecord,
    },
    /// Package several files into one archive
    Archive {
        /// Archive file name
        filename: String,
        /// Folder inside the archive holding the entries
        folder: String,
        /// Entry file names paired with their images
        entries: Vec<(String, &'a ImageRecord)>,
    },
}

impl<'a> DownloadPlan<'a> {
    /// Build the plan for the given targets.
    pub fn new(title: &str, targets: Vec<&'a ImageRecord>) -> Self {
        match targets.len() {
            0 => DownloadPlan::Empty,
            1 => DownloadPlan::Single {
                filename: image_filename(title, targets[0]),
                image: targets[0],
            },
            _ => DownloadPlan::Archive {
                filename: archive_filename(title),
                folder: title.to_string(),
                entries: targets
                    .into_iter()
                    .map(|image| (image_filename(title, image), image))
                    .collect(),
            },
        }
    }

    /// Number of images in the plan.
    pub fn len(&self) -> usize {
        match self {
            DownloadPlan::Empty => 0,
            DownloadPlan::Single { .. } => 1,
            DownloadPlan::Archive { entries, .. } => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, DownloadPlan::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: u32, ext: &str) -> ImageRecord {
        ImageRecord::new(ImageId(id), 10, 10, Vec::<u8>::new(), ext).unwrap()
    }

    fn set(raw: &[u32]) -> BTreeSet<ImageId> {
        raw.iter().copied().map(ImageId).collect()
    }

    #[test]
    fn test_sanitize_replaces_runs() {
        assert_eq!(sanitize_title(Some("A/B: <C>? \"D\"")), "A_B_ _C_ _D_");
        assert_eq!(sanitize_title(Some("a\\|*b")), "a_b");
    }

    #[test]
    fn test_sanitize_keeps_unicode_and_truncates() {
        assert_eq!(sanitize_title(Some("논문 제목")), "논문 제목");
        let long: String = "é".repeat(150);
        let safe = sanitize_title(Some(&long));
        assert_eq!(safe.chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn test_sanitize_default() {
        assert_eq!(sanitize_title(None), "paper");
        assert_eq!(sanitize_title(Some("")), "paper");
    }

    #[test]
    fn test_filenames() {
        assert_eq!(image_filename("paper", &image(0, "png")), "paper_001.png");
        assert_eq!(image_filename("x", &image(122, "jpeg")), "x_123.jpeg");
        assert_eq!(image_filename("x", &image(1233, "jpeg")), "x_1234.jpeg");
        assert_eq!(archive_filename("paper"), "paper_images.zip");
    }

    #[test]
    fn test_selection_wins_over_filter() {
        let images = vec![image(0, "png"), image(1, "png"), image(2, "png")];
        let order: Vec<_> = images.iter().rev().collect();
        // id 0 is selected but hidden by the filter
        let targets = resolve_targets(&images, &order, &set(&[2, 0]), &set(&[]), &set(&[1, 2]));
        let ids: Vec<_> = targets.iter().map(|img| img.id().0).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn test_visible_targets_follow_display_order() {
        let images = vec![image(0, "png"), image(1, "png"), image(2, "png")];
        let order: Vec<_> = images.iter().rev().collect();
        let targets = resolve_targets(&images, &order, &set(&[]), &set(&[1]), &set(&[0, 1, 2]));
        let ids: Vec<_> = targets.iter().map(|img| img.id().0).collect();
        assert_eq!(ids, vec![2, 0]);
    }

    #[test]
    fn test_plan_shapes() {
        let images = vec![image(0, "png"), image(1, "jpeg")];
        assert!(DownloadPlan::new("t", vec![]).is_empty());

        match DownloadPlan::new("t", vec![&images[1]]) {
            DownloadPlan::Single { filename, .. } => assert_eq!(filename, "t_002.jpeg"),
            other => panic!("unexpected plan {:?}", other),
        }

        let plan = DownloadPlan::new("t", images.iter().collect());
        assert_eq!(plan.len(), 2);
        match plan {
            DownloadPlan::Archive {
                filename,
                folder,
                entries,
            } => {
                assert_eq!(filename, "t_images.zip");
                assert_eq!(folder, "t");
                assert_eq!(entries[0].0, "t_001.png");
                assert_eq!(entries[1].0, "t_002.jpeg");
            }
            other => panic!("unexpected plan {:?}", other),
        }
    }
}
