// src/tasks/images.rs

//! `images`: optimize images into the output tree.
//!
//! Results are cached by content hash, so unchanged images are never
//! optimized twice. PNGs are re-encoded losslessly at maximum compression
//! unless an external optimizer is configured; the smaller encoding wins.

use std::path::{Path, PathBuf};

use image::ImageFormat;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use tracing::debug;

use crate::context::BuildContext;
use crate::errors::{TaskError, TransformError};
use crate::exec::{ToolVars, render_command, run_tool};
use crate::paths::AssetClass;
use crate::pipeline::{Pipeline, SourceFile, SourceSet, Transform};

pub fn run(ctx: &BuildContext) -> Result<(), TaskError> {
    let images = ctx.class(AssetClass::Images);
    let files = SourceSet::new(&ctx.root).glob(&images.input).read()?;

    Pipeline::named("images")
        .stage(CachedOptimize::new(ctx))
        .run(files, &ctx.output_dir(AssetClass::Images), ctx)?
        .into_result()
        .map(drop)
}

pub struct CachedOptimize {
    cache_dir: PathBuf,
    optimizer: Option<String>,
}

impl CachedOptimize {
    pub fn new(ctx: &BuildContext) -> Self {
        Self {
            cache_dir: ctx.resolve(&ctx.config.images.cache_dir),
            optimizer: ctx.config.images.optimizer.clone(),
        }
    }

    fn optimize(&self, file: &SourceFile, ctx: &BuildContext) -> Result<Vec<u8>, TransformError> {
        if let Some(command) = &self.optimizer {
            let vars = ToolVars {
                file: Some(&file.path),
                ..ToolVars::default()
            };
            let out = run_tool(&render_command(command, &vars), &file.contents, &ctx.root, &[])?;
            return Ok(smaller(out, &file.contents));
        }

        match ImageFormat::from_path(&file.rel) {
            Ok(ImageFormat::Png) => recompress_png(&file.contents),
            _ => Ok(file.contents.clone()),
        }
    }
}

impl Transform for CachedOptimize {
    fn name(&self) -> &str {
        "imagemin"
    }

    fn apply(&self, mut file: SourceFile, ctx: &BuildContext) -> Result<SourceFile, TransformError> {
        let cached = self.cache_path(&file);

        if cached.is_file() {
            debug!(file = %file.rel.display(), "image cache hit");
            file.contents = std::fs::read(&cached)?;
            return Ok(file);
        }

        let optimized = self.optimize(&file, ctx)?;
        std::fs::create_dir_all(&self.cache_dir)?;
        write_atomic(&cached, &optimized)?;

        file.contents = optimized;
        Ok(file)
    }
}

impl CachedOptimize {
    /// Cache entry for `file`: keyed by its contents and by the optimizer
    /// that produced the result.
    fn cache_path(&self, file: &SourceFile) -> PathBuf {
        let mut hasher = blake3::Hasher::new();
        match &self.optimizer {
            Some(command) => hasher.update(b"tool\0").update(command.as_bytes()),
            None => hasher.update(b"builtin\0"),
        };
        hasher.update(b"\0").update(&file.contents);
        let key = hasher.finalize().to_hex();

        let ext = file
            .rel
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        self.cache_dir.join(format!("{key}.{ext}"))
    }
}

/// Write through a sibling temp file so readers never see a partial entry.
fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.tmp", std::process::id()));
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path).inspect_err(|_| {
        let _ = std::fs::remove_file(&tmp);
    })
}

/// Lossless PNG re-encode; returns the input when it is already smaller.
pub fn recompress_png(bytes: &[u8]) -> Result<Vec<u8>, TransformError> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder)?;
    Ok(smaller(out, bytes))
}

fn smaller(candidate: Vec<u8>, original: &[u8]) -> Vec<u8> {
    if !candidate.is_empty() && candidate.len() < original.len() {
        candidate
    } else {
        original.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn noisy_png() -> Vec<u8> {
        let img = ImageBuffer::from_fn(32, 32, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgba([255u8, 0, 0, 255])
            } else {
                Rgba([0u8, 0, 255, 255])
            }
        });
        let mut out = Vec::new();
        let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Fast, FilterType::NoFilter);
        image::DynamicImage::ImageRgba8(img)
            .write_with_encoder(encoder)
            .unwrap();
        out
    }

    #[test]
    fn recompressed_png_decodes_to_the_same_pixels() {
        let original = noisy_png();
        let optimized = recompress_png(&original).unwrap();

        assert!(optimized.len() <= original.len());
        let a = image::load_from_memory(&original).unwrap().to_rgba8();
        let b = image::load_from_memory(&optimized).unwrap().to_rgba8();
        assert_eq!(a, b);
    }

    fn optimizer(cache_dir: &Path, command: Option<&str>) -> CachedOptimize {
        CachedOptimize {
            cache_dir: cache_dir.to_path_buf(),
            optimizer: command.map(str::to_string),
        }
    }

    #[test]
    fn cache_key_depends_on_the_optimizer() {
        let dir = tempfile::tempdir().unwrap();
        let file = SourceFile::new("app/images/a.png", "a.png", noisy_png());

        let builtin = optimizer(dir.path(), None).cache_path(&file);
        let svgo = optimizer(dir.path(), Some("svgo -i -")).cache_path(&file);
        let pngquant = optimizer(dir.path(), Some("pngquant -")).cache_path(&file);

        assert_ne!(builtin, svgo);
        assert_ne!(svgo, pngquant);
        assert_eq!(builtin, optimizer(dir.path(), None).cache_path(&file));
        assert_eq!(builtin.extension().unwrap(), "png");
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("entry.png");

        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"second");
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn invalid_png_is_an_error() {
        assert!(matches!(
            recompress_png(b"not a png"),
            Err(TransformError::Image(_))
        ));
    }
}
