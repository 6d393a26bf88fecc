// src/tasks/build.rs

//! `build`: report the size of the output tree once every production task
//! has finished.

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::info;
use walkdir::WalkDir;

use crate::context::BuildContext;
use crate::errors::TaskError;

/// Total and (optionally) gzipped size of a directory tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeSize {
    pub files: usize,
    pub bytes: u64,
    pub gzip_bytes: Option<u64>,
}

pub fn run(ctx: &BuildContext) -> Result<(), TaskError> {
    let dist = ctx.resolve(&ctx.config.project.dist_dir);
    let size = measure(&dist, ctx.config.build.gzip)?;

    match size.gzip_bytes {
        Some(gz) => info!(
            files = size.files,
            size = %human(size.bytes),
            gzip = %human(gz),
            "build complete"
        ),
        None => info!(files = size.files, size = %human(size.bytes), "build complete"),
    }
    Ok(())
}

/// Walk `dir` and add up file sizes. A missing directory measures zero.
pub fn measure(dir: &std::path::Path, gzip: bool) -> Result<TreeSize, TaskError> {
    let mut size = TreeSize {
        gzip_bytes: gzip.then_some(0),
        ..TreeSize::default()
    };
    if !dir.is_dir() {
        return Ok(size);
    }

    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| TaskError::Other(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let contents = std::fs::read(entry.path()).map_err(|e| TaskError::io(entry.path(), e))?;
        size.files += 1;
        size.bytes += contents.len() as u64;
        if let Some(total) = size.gzip_bytes.as_mut() {
            *total += gzipped_len(&contents).map_err(|e| TaskError::io(entry.path(), e))?;
        }
    }
    Ok(size)
}

fn gzipped_len(contents: &[u8]) -> std::io::Result<u64> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(contents)?;
    Ok(encoder.finish()?.len() as u64)
}

fn human(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "kB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}
