//! Turn a gallery download plan into bytes ready to save.
//!
//! A single image is delivered as-is; several images are packed into an
//! in-memory ZIP with every entry under one folder.

use std::io::{Cursor, Write};

use paperpix_gallery::{DownloadPlan, ImageRecord};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::api::mime_for_extension;
use crate::error::AppError;

/// A finished download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadArtifact {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Build the artifact for `plan`; `None` when there is nothing to download.
pub fn package(plan: &DownloadPlan<'_>) -> Result<Option<DownloadArtifact>, AppError> {
    match plan {
        DownloadPlan::Empty => Ok(None),
        DownloadPlan::Single { filename, image } => Ok(Some(DownloadArtifact {
            filename: filename.clone(),
            mime: mime_for_extension(image.extension()),
            bytes: image.data().to_vec(),
        })),
        DownloadPlan::Archive {
            filename,
            folder,
            entries,
        } => {
            let bytes = build_archive(folder, entries)?;
            log::info!("Packed {} images into {}", entries.len(), filename);
            Ok(Some(DownloadArtifact {
                filename: filename.clone(),
                mime: "application/zip".to_string(),
                bytes,
            }))
        }
    }
}

fn build_archive(folder: &str, entries: &[(String, &ImageRecord)]) -> Result<Vec<u8>, AppError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.add_directory(format!("{}/", folder), options)?;
    for (name, image) in entries {
        writer.start_file(format!("{}/{}", folder, name), options)?;
        writer.write_all(image.data())?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Write the artifact into `dir` and return the file path (native only).
#[cfg(not(target_arch = "wasm32"))]
pub fn save_to_dir(
    artifact: &DownloadArtifact,
    dir: &std::path::Path,
) -> Result<std::path::PathBuf, AppError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&artifact.filename);
    std::fs::write(&path, &artifact.bytes)?;
    log::info!("Saved {:?} ({} bytes)", path, artifact.bytes.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use paperpix_gallery::ImageId;
    use zip::ZipArchive;

    use super::*;

    fn image(id: u32, ext: &str, data: &[u8]) -> ImageRecord {
        ImageRecord::new(ImageId(id), 2, 2, data.to_vec(), ext).unwrap()
    }

    #[test]
    fn test_empty_plan_has_no_artifact() {
        assert_eq!(package(&DownloadPlan::Empty).unwrap(), None);
    }

    #[test]
    fn test_single_image_delivered_as_is() {
        let img = image(4, "jpg", &[9, 8, 7]);
        let plan = DownloadPlan::new("paper", vec![&img]);
        let artifact = package(&plan).unwrap().unwrap();
        assert_eq!(artifact.filename, "paper_005.jpg");
        assert_eq!(artifact.mime, "image/jpeg");
        assert_eq!(artifact.bytes, vec![9, 8, 7]);
    }

    #[test]
    fn test_archive_entries_live_in_title_folder() {
        let a = image(0, "png", &[1]);
        let b = image(2, "png", &[2, 2]);
        let plan = DownloadPlan::new("Nets", vec![&a, &b]);
        let artifact = package(&plan).unwrap().unwrap();
        assert_eq!(artifact.filename, "Nets_images.zip");
        assert_eq!(artifact.mime, "application/zip");

        let mut zip = ZipArchive::new(Cursor::new(artifact.bytes)).unwrap();
        let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["Nets/", "Nets/Nets_001.png", "Nets/Nets_003.png"]);

        let mut contents = Vec::new();
        zip.by_name("Nets/Nets_003.png")
            .unwrap()
            .read_to_end(&mut contents)
            .unwrap();
        assert_eq!(contents, vec![2, 2]);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_save_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = DownloadArtifact {
            filename: "x_001.png".to_string(),
            mime: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        };
        let path = save_to_dir(&artifact, dir.path()).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3]);
    }
}
