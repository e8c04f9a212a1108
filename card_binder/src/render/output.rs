//! Writing a rendered binder to its output directory

use super::{RenderedBinder, IMAGE_ASSET_DIR, STYLESHEET};
use crate::config::OutputMode;
use crate::error::OutputWriteError;
use std::fs;
use std::path::Path;

/// Manifest file written next to the pages
pub const MANIFEST_FILE_NAME: &str = "binder.json";

/// Check that `dir` can receive a binder under `mode` without writing anything
pub fn check_output_dir(dir: &Path, mode: OutputMode) -> Result<(), OutputWriteError> {
    if !dir.exists() {
        return Ok(());
    }
    if !dir.is_dir() {
        return Err(OutputWriteError::NotADirectory(dir.to_path_buf()));
    }
    if mode == OutputMode::RequireEmpty {
        let mut entries = fs::read_dir(dir).map_err(|e| OutputWriteError::io(dir, e))?;
        if entries.next().is_some() {
            return Err(OutputWriteError::NotEmpty(dir.to_path_buf()));
        }
    }
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), OutputWriteError> {
    fs::write(path, contents).map_err(|e| OutputWriteError::io(path, e))
}

/// Remove pages left over from an earlier, longer binder in the same directory
fn remove_stale_pages(dir: &Path, rendered: &RenderedBinder) -> Result<(), OutputWriteError> {
    let entries = fs::read_dir(dir).map_err(|e| OutputWriteError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| OutputWriteError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().to_string();
        let is_page = name.starts_with("binder") && name.ends_with(".html");
        if is_page && !rendered.pages.iter().any(|p| p.file_name == name) {
            log::debug!("Removing stale page {}", name);
            fs::remove_file(entry.path()).map_err(|e| OutputWriteError::io(entry.path(), e))?;
        }
    }
    Ok(())
}

/// Write pages, index, stylesheet, images and `binder.json` into `dir`.
///
/// Returns the number of files written.
pub fn write_binder(
    dir: &Path,
    rendered: &RenderedBinder,
    mode: OutputMode,
) -> Result<usize, OutputWriteError> {
    check_output_dir(dir, mode)?;

    let image_dir = dir.join(IMAGE_ASSET_DIR);
    fs::create_dir_all(&image_dir).map_err(|e| OutputWriteError::io(&image_dir, e))?;
    if mode == OutputMode::Overwrite {
        remove_stale_pages(dir, rendered)?;
    }

    let mut written = 0;
    for page in &rendered.pages {
        write_file(&dir.join(&page.file_name), page.html.as_bytes())?;
        written += 1;
    }
    write_file(&dir.join("index.html"), rendered.index.as_bytes())?;
    write_file(&dir.join("assets").join("styles.css"), STYLESHEET.as_bytes())?;
    write_file(&dir.join(MANIFEST_FILE_NAME), rendered.binder_json.as_bytes())?;
    written += 3;

    for asset in &rendered.manifest {
        let dest = image_dir.join(&asset.file_name);
        fs::copy(&asset.source, &dest).map_err(|e| OutputWriteError::io(&asset.source, e))?;
        written += 1;
    }

    log::info!("Wrote {} files to {}", written, dir.display());
    Ok(written)
}
