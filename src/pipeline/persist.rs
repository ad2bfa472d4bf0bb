//! Output writing and working-folder cleanup.
//!
//! The output document is written atomically (temp file in the target
//! directory, then rename) so an interrupted run never leaves a half-written
//! file. Cleanup then removes every non-image file from the working folder,
//! leaving only the PNGs the document links to.

use crate::error::TexImgError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Extensions that survive the working-folder sweep.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp"];

/// `<stem><suffix>.<ext>` next to `input`; inputs without an extension get `.md`.
pub fn output_path_for(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "md".to_string());
    input.with_file_name(format!("{stem}{suffix}.{ext}"))
}

/// Write `content` to `path`, replacing any existing file in one step.
pub fn write_output(path: &Path, content: &str) -> Result<(), TexImgError> {
    let write_err = |source| TexImgError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    info!("New markdown file generated at {}", path.display());
    Ok(())
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Delete every regular non-image file directly inside `dir`.
///
/// Files listed in `keep` are never removed, even when they live in `dir`.
/// Subdirectories are left alone. Returns the removed paths, sorted.
pub fn clean_work_dir(dir: &Path, keep: &[&Path]) -> Result<Vec<PathBuf>, TexImgError> {
    let cleanup_err = |path: &Path, source| TexImgError::CleanupFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut doomed = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| cleanup_err(dir, e))? {
        let entry = entry.map_err(|e| cleanup_err(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| cleanup_err(&path, e))?;

        if !file_type.is_file() || is_image_file(&path) {
            continue;
        }
        if keep.iter().any(|k| same_file(k, &path)) {
            debug!("Keeping {}", path.display());
            continue;
        }
        doomed.push(path);
    }
    doomed.sort();

    for path in &doomed {
        debug!("Removing {}", path.display());
        std::fs::remove_file(path).map_err(|e| cleanup_err(path, e))?;
    }

    info!(
        "Removed {} intermediate file(s) from {}",
        doomed.len(),
        dir.display()
    );
    Ok(doomed)
}
