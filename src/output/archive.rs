//! Output directory lifecycle and the topic archive

use crate::output::OutputResult;
use std::fs::File;
use std::path::Path;

/// Name of the directory inside the archive
pub const ARCHIVE_ROOT: &str = "files";

/// Removes the files directly inside the output directory, creating it if missing
///
/// Subdirectories are left in place.
pub fn wipe_output_dir(dir: &Path) -> OutputResult<()> {
    if dir.exists() {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                std::fs::remove_file(entry.path())?;
            } else {
                tracing::debug!("Keeping {} in output directory", entry.path().display());
            }
        }
        tracing::debug!("Cleared output directory {}", dir.display());
    }
    std::fs::create_dir_all(dir)?;
    Ok(())
}

/// Bundles the output directory into a tar archive under `files/`
///
/// # Arguments
///
/// * `dir` - Directory holding the topic files
/// * `archive_path` - Archive to create; replaced if it exists
pub fn create_tar_archive(dir: &Path, archive_path: &Path) -> OutputResult<()> {
    if let Some(parent) = archive_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(archive_path)?;
    let mut builder = tar::Builder::new(file);
    builder.append_dir_all(ARCHIVE_ROOT, dir)?;
    builder.finish()?;

    tracing::info!("Archive created at {}", archive_path.display());
    Ok(())
}
