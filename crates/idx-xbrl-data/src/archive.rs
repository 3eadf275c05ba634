//! Zip archive extraction.

use crate::error::{DataError, Result};
use crate::model::{DownloadedArchive, ExtractedDocuments};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::ZipArchive;

/// Bytes inspected when sniffing for an HTML error page.
const SNIFF_LEN: usize = 512;

/// Settings for [`extract`].
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Largest total uncompressed size accepted, in bytes
    pub max_extracted_bytes: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_extracted_bytes: 1024 * 1024 * 1024,
        }
    }
}

/// Unpack a downloaded archive into `dest_dir`.
///
/// Entries are flattened to their file names. Directory entries, entries with
/// unsafe names and repeated names are skipped. On failure `dest_dir` is
/// removed before returning.
///
/// # Errors
/// - [`DataError::NotAnArchive`] when the file is empty or is an HTML/XML page
/// - [`DataError::Zip`] when the zip structure is corrupt
/// - [`DataError::EmptyArchive`] when no file could be extracted
/// - [`DataError::ExtractedTooLarge`] when the uncompressed size exceeds the cap
pub fn extract(
    archive: &DownloadedArchive,
    dest_dir: &Path,
    config: &ExtractConfig,
) -> Result<ExtractedDocuments> {
    info!(ticker = %archive.ticker, path = %archive.path.display(), "extracting archive");

    let files = extract_zip(&archive.path, dest_dir, config).inspect_err(|_| {
        if let Err(e) = std::fs::remove_dir_all(dest_dir)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(dir = %dest_dir.display(), error = %e, "could not clean extraction directory");
        }
    })?;

    info!(ticker = %archive.ticker, files = files.len(), "extracted archive");
    Ok(ExtractedDocuments {
        ticker: archive.ticker.clone(),
        dir: dest_dir.to_path_buf(),
        files,
    })
}

/// Unpack the zip at `path` into `dest_dir`, returning the sorted file paths.
pub fn extract_zip(path: &Path, dest_dir: &Path, config: &ExtractConfig) -> Result<Vec<PathBuf>> {
    sniff_archive(path)?;

    let mut zip = ZipArchive::new(BufReader::new(File::open(path)?))?;
    std::fs::create_dir_all(dest_dir)?;

    let mut seen = HashSet::new();
    let mut files = Vec::new();
    let mut total: u64 = 0;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }

        let Some(name) = entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(ToOwned::to_owned))
        else {
            warn!(entry = entry.name(), "skipping archive entry with unsafe name");
            continue;
        };
        if !seen.insert(name.clone()) {
            debug!(entry = entry.name(), "skipping duplicate archive entry");
            continue;
        }

        let target = dest_dir.join(&name);
        let mut out = File::create(&target)?;
        let remaining = config.max_extracted_bytes.saturating_sub(total);
        let mut limited = (&mut entry).take(remaining.saturating_add(1));
        total += std::io::copy(&mut limited, &mut out)?;
        if total > config.max_extracted_bytes {
            return Err(DataError::ExtractedTooLarge {
                limit: config.max_extracted_bytes,
            });
        }
        files.push(target);
    }

    if files.is_empty() {
        return Err(DataError::EmptyArchive);
    }
    files.sort();
    Ok(files)
}

/// Reject files that are obviously not zip archives.
fn sniff_archive(path: &Path) -> Result<()> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    File::open(path)?
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut head)?;

    match head.iter().find(|b| !b.is_ascii_whitespace()) {
        None => Err(DataError::NotAnArchive("file is empty".to_string())),
        Some(b'<') => Err(DataError::NotAnArchive(
            "server returned an HTML/XML page instead of a zip archive".to_string(),
        )),
        Some(_) => Ok(()),
    }
}
