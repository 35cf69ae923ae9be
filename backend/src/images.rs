//! Derived image variants for uploaded media.
//!
//! Every upload gets a fixed set of resized derivatives, produced from a
//! static table of (variant, resize mode) pairs. Derivatives live next to
//! the source file as `<stem>_<variant>.<codec>`, so serializers can
//! reconstruct all URLs from the source path alone. WebP is always
//! encoded; AVIF only when the `avif` feature is compiled in.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::DynamicImage;
use rayon::prelude::*;
use thiserror::Error;

use common::model::image::{ImageSet, ImageVariant};

#[derive(Debug, Error)]
pub enum DerivativeError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid media path: {0}")]
    InvalidPath(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    Thumb,
    Small,
    Medium,
    Large,
}

impl Variant {
    pub fn suffix(self) -> &'static str {
        match self {
            Variant::Thumb => "thumb",
            Variant::Small => "small",
            Variant::Medium => "medium",
            Variant::Large => "large",
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum ResizeMode {
    /// Cover-crop to exactly width x height.
    Fill(u32, u32),
    /// Scale to the given width, preserving aspect ratio.
    FitWidth(u32),
}

struct VariantSpec {
    variant: Variant,
    mode: ResizeMode,
    #[cfg_attr(not(feature = "avif"), allow(dead_code))]
    avif_quality: u8,
}

/// The full derivative table. One entry per size; each is encoded in
/// every available codec.
const VARIANTS: [VariantSpec; 4] = [
    VariantSpec {
        variant: Variant::Thumb,
        mode: ResizeMode::Fill(250, 250),
        avif_quality: 80,
    },
    VariantSpec {
        variant: Variant::Small,
        mode: ResizeMode::FitWidth(320),
        avif_quality: 80,
    },
    VariantSpec {
        variant: Variant::Medium,
        mode: ResizeMode::FitWidth(768),
        avif_quality: 82,
    },
    VariantSpec {
        variant: Variant::Large,
        mode: ResizeMode::FitWidth(1280),
        avif_quality: 85,
    },
];

/// Path of one derivative relative to the media root, e.g.
/// `recipes/hero/borscht.jpg` -> `recipes/hero/borscht_thumb.webp`.
pub fn variant_rel_path(source_rel: &str, variant: Variant, ext: &str) -> String {
    let path = Path::new(source_rel);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = format!("{stem}_{}.{ext}", variant.suffix());
    match path.parent() {
        Some(parent) if parent != Path::new("") => {
            format!("{}/{file}", parent.to_string_lossy())
        }
        _ => file,
    }
}

fn resize(source: &DynamicImage, mode: ResizeMode) -> DynamicImage {
    match mode {
        ResizeMode::Fill(w, h) => source.resize_to_fill(w, h, FilterType::Lanczos3),
        ResizeMode::FitWidth(w) => {
            let height = (u64::from(w) * u64::from(source.height())
                / u64::from(source.width().max(1))) as u32;
            source.resize_exact(w, height.max(1), FilterType::Lanczos3)
        }
    }
}

/// Generates every derivative for the given source image. Variants are
/// encoded in parallel; existing files are overwritten.
pub fn generate_derivatives(media_root: &Path, source_rel: &str) -> Result<(), DerivativeError> {
    if source_rel.contains("..") {
        return Err(DerivativeError::InvalidPath(source_rel.to_string()));
    }
    let source_path = media_root.join(source_rel);
    let source = image::open(&source_path)?;

    VARIANTS
        .par_iter()
        .try_for_each(|spec| encode_variant(media_root, source_rel, &source, spec))
}

fn encode_variant(
    media_root: &Path,
    source_rel: &str,
    source: &DynamicImage,
    spec: &VariantSpec,
) -> Result<(), DerivativeError> {
    let resized = resize(source, spec.mode);

    let webp_path = media_root.join(variant_rel_path(source_rel, spec.variant, "webp"));
    if let Some(parent) = webp_path.parent() {
        fs::create_dir_all(parent)?;
    }
    resized.save_with_format(&webp_path, image::ImageFormat::WebP)?;

    #[cfg(feature = "avif")]
    {
        use image::codecs::avif::AvifEncoder;
        let avif_path = media_root.join(variant_rel_path(source_rel, spec.variant, "avif"));
        let file = fs::File::create(&avif_path)?;
        let encoder = AvifEncoder::new_with_speed_quality(file, 6, spec.avif_quality);
        resized.write_with_encoder(encoder)?;
    }

    Ok(())
}

/// URL set for a stored image, derived purely from the naming convention.
/// `None` when the record carries no image.
pub fn image_set(media_base_url: &str, source_rel: Option<&str>) -> Option<ImageSet> {
    let source_rel = source_rel.filter(|rel| !rel.is_empty())?;
    let url = |rel: &str| format!("{media_base_url}/{rel}");

    let variant = |v: Variant| {
        Some(ImageVariant {
            avif: cfg!(feature = "avif").then(|| url(&variant_rel_path(source_rel, v, "avif"))),
            webp: Some(url(&variant_rel_path(source_rel, v, "webp"))),
        })
    };

    Some(ImageSet {
        original: Some(url(source_rel)),
        thumb: variant(Variant::Thumb),
        small: variant(Variant::Small),
        medium: variant(Variant::Medium),
        large: variant(Variant::Large),
    })
}

/// Media-relative storage path for a fresh upload.
pub fn upload_rel_path(subdir: &str, original_name: &str) -> String {
    let ext = Path::new(original_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .filter(|e| matches!(e.as_str(), "png" | "jpg" | "jpeg" | "webp"))
        .unwrap_or_else(|| "jpg".to_string());
    format!(
        "{subdir}/{}.{ext}",
        uuid::Uuid::new_v4().simple()
    )
}

pub fn store_upload(
    media_root: &Path,
    rel_path: &str,
    bytes: &[u8],
) -> Result<PathBuf, DerivativeError> {
    if rel_path.contains("..") {
        return Err(DerivativeError::InvalidPath(rel_path.to_string()));
    }
    let path = media_root.join(rel_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, bytes)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_paths_follow_convention() {
        assert_eq!(
            variant_rel_path("recipes/hero/borscht.jpg", Variant::Thumb, "webp"),
            "recipes/hero/borscht_thumb.webp"
        );
        assert_eq!(
            variant_rel_path("logo.png", Variant::Large, "avif"),
            "logo_large.avif"
        );
    }

    #[test]
    fn image_set_absent_without_source() {
        assert!(image_set("http://m", None).is_none());
        assert!(image_set("http://m", Some("")).is_none());
    }

    #[test]
    fn image_set_urls_are_built_from_convention() {
        let set = image_set("http://m", Some("recipes/hero/a.jpg")).unwrap();
        assert_eq!(set.original.as_deref(), Some("http://m/recipes/hero/a.jpg"));
        let thumb = set.thumb.unwrap();
        assert_eq!(
            thumb.webp.as_deref(),
            Some("http://m/recipes/hero/a_thumb.webp")
        );
        if cfg!(feature = "avif") {
            assert!(thumb.avif.is_some());
        } else {
            assert!(thumb.avif.is_none());
        }
    }

    #[test]
    fn derivatives_are_written_next_to_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let media_root = dir.path();
        std::fs::create_dir_all(media_root.join("recipes/hero")).unwrap();
        let img = image::DynamicImage::new_rgb8(64, 48);
        img.save(media_root.join("recipes/hero/test.png")).unwrap();

        generate_derivatives(media_root, "recipes/hero/test.png").unwrap();

        for variant in ["thumb", "small", "medium", "large"] {
            assert!(
                media_root
                    .join(format!("recipes/hero/test_{variant}.webp"))
                    .exists(),
                "missing {variant}"
            );
        }
    }

    #[test]
    fn traversal_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = generate_derivatives(dir.path(), "../escape.png");
        assert!(matches!(err, Err(DerivativeError::InvalidPath(_))));
    }
}
