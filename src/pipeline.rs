use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Supported image extensions.
const IMAGE_EXTENSIONS: &[&str] = &[
    // EXIF + IPTC + XMP in segments
    "jpg", "jpeg",
    // EXIF (eXIf chunk) + XMP (iTXt)
    "png",
    // EXIF + XMP in RIFF chunks
    "webp",
    // EXIF in IFD0
    "tif", "tiff",
];

/// Container family of an image file, determined by its extension.
///
/// The family decides where metadata lives and which flows can write it back:
/// - **JPEG** carries EXIF (APP1), XMP (APP1), and IPTC (APP13) segments.
/// - **PNG** and **WebP** carry EXIF and XMP chunks.
/// - **TIFF** stores EXIF inline in its IFDs; EXIF blocks cannot be re-embedded.
///
/// # Example
///
/// ```rust
/// use exif_scrub::pipeline::ImageKind;
/// use std::path::Path;
///
/// let kind = ImageKind::from_path(Path::new("photo.JPG"));
/// assert_eq!(kind, Some(ImageKind::Jpeg));
///
/// assert_eq!(ImageKind::from_path(Path::new("notes.txt")), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageKind {
    Jpeg,
    Png,
    WebP,
    Tiff,
}

impl ImageKind {
    /// Determine the image kind from a file path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Whether an EXIF block can be embedded into this container.
    pub fn supports_exif_embedding(self) -> bool {
        !matches!(self, Self::Tiff)
    }
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks). Only files with supported image extensions
/// are included (see [`ImageKind`] for the full list).
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// `dir/photo.jpg` → `dir/<prefix>photo.jpg`.
pub fn clean_path(path: &Path, prefix: &str) -> PathBuf {
    let name = file_name(path);
    path.with_file_name(format!("{prefix}{name}"))
}

/// `dir/photo.jpg` → `dir/photo.jpg-map.html`.
pub fn map_path(path: &Path) -> PathBuf {
    with_suffix(path, "-map.html")
}

/// `dir/photo.jpg` → `dir/photo.jpg-log.csv`.
pub fn log_csv_path(path: &Path) -> PathBuf {
    with_suffix(path, "-log.csv")
}

/// `dir/photo.jpg` → `dir/photo.jpg-metadata.csv`.
pub fn metadata_csv_path(path: &Path) -> PathBuf {
    with_suffix(path, "-metadata.csv")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let name = file_name(path);
    path.with_file_name(format!("{name}{suffix}"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // ── ImageKind::from_path ──────────────────────────────────────────

    #[test]
    fn image_kind_jpeg() {
        assert_eq!(ImageKind::from_path(Path::new("photo.jpg")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("photo.jpeg")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("PHOTO.JPG")), Some(ImageKind::Jpeg));
    }

    #[test]
    fn image_kind_others() {
        assert_eq!(ImageKind::from_path(Path::new("image.png")), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_path(Path::new("image.webp")), Some(ImageKind::WebP));
        assert_eq!(ImageKind::from_path(Path::new("scan.tif")), Some(ImageKind::Tiff));
        assert_eq!(ImageKind::from_path(Path::new("scan.TIFF")), Some(ImageKind::Tiff));
    }

    #[test]
    fn image_kind_unsupported() {
        assert_eq!(ImageKind::from_path(Path::new("doc.pdf")), None);
        assert_eq!(ImageKind::from_path(Path::new("photo.heic")), None);
        assert_eq!(ImageKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn exif_embedding_support() {
        assert!(ImageKind::Jpeg.supports_exif_embedding());
        assert!(ImageKind::Png.supports_exif_embedding());
        assert!(ImageKind::WebP.supports_exif_embedding());
        assert!(!ImageKind::Tiff.supports_exif_embedding());
    }

    // ── output naming ────────────────────────────────────────────────

    #[test]
    fn output_paths_sit_next_to_source() {
        let src = Path::new("/photos/trip/IMG_0001.jpg");
        assert_eq!(clean_path(src, "clean-"), PathBuf::from("/photos/trip/clean-IMG_0001.jpg"));
        assert_eq!(map_path(src), PathBuf::from("/photos/trip/IMG_0001.jpg-map.html"));
        assert_eq!(log_csv_path(src), PathBuf::from("/photos/trip/IMG_0001.jpg-log.csv"));
        assert_eq!(
            metadata_csv_path(src),
            PathBuf::from("/photos/trip/IMG_0001.jpg-metadata.csv")
        );
    }

    #[test]
    fn output_paths_relative() {
        assert_eq!(clean_path(Path::new("a.png"), "x-"), PathBuf::from("x-a.png"));
        assert_eq!(map_path(Path::new("a.png")), PathBuf::from("a.png-map.html"));
    }

    // ── collect_images ───────────────────────────────────────────────

    #[test]
    fn collect_images_single_file() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("test.jpg");
        fs::write(&jpg, b"fake").unwrap();

        let images = collect_images(&[jpg.clone()]);
        assert_eq!(images, vec![jpg]);
    }

    #[test]
    fn collect_images_skips_unsupported() {
        let dir = TempDir::new().unwrap();
        let txt = dir.path().join("readme.txt");
        fs::write(&txt, b"hello").unwrap();

        assert!(collect_images(&[txt]).is_empty());
    }

    #[test]
    fn collect_images_directory_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        fs::write(dir.path().join("a.jpg"), b"fake").unwrap();
        fs::write(sub.join("b.png"), b"fake").unwrap();
        fs::write(sub.join("c.txt"), b"fake").unwrap();

        let images = collect_images(&[dir.path().to_path_buf()]);
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn collect_images_nonexistent_path() {
        let images = collect_images(&[PathBuf::from("/nonexistent/path")]);
        assert!(images.is_empty());
    }
}
