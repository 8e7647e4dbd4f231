//! Zip extraction for learning packages.
//!
//! Entries that would land outside the destination fail the whole
//! extraction; hidden and blank-segment entries are skipped.

use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Unsafe entry in archive: {0}")]
    UnsafeEntry(String),
}

impl From<zip::result::ZipError> for ExtractError {
    fn from(e: zip::result::ZipError) -> Self {
        match e {
            zip::result::ZipError::Io(e) => Self::Io(e),
            other => Self::Archive(other.to_string()),
        }
    }
}

/// Information about an extracted file
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    /// Path relative to extraction root
    pub relative_path: PathBuf,
    /// Absolute path on disk
    pub absolute_path: PathBuf,
}

/// Whether an archive entry name is a hidden or control entry.
///
/// Any `/`-separated segment that starts with `.` or is blank marks the
/// entry as hidden (`.git/config`, `__MACOSX/._x`, `a//b`).
pub fn is_hidden_entry(name: &str) -> bool {
    name.split('/')
        .any(|segment| segment.trim().is_empty() || segment.starts_with('.'))
}

/// Extract a zip archive read from `reader` into `dest_dir`.
///
/// # Errors
///
/// Returns [`ExtractError::Archive`] if the stream is not a readable zip,
/// [`ExtractError::UnsafeEntry`] if an entry escapes `dest_dir`, and
/// [`ExtractError::Io`] if a write fails. Partial output is left in place
/// for the caller to discard.
pub fn extract_zip<R: Read + Seek>(
    reader: R,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    extract_zip_with_progress(reader, dest_dir, |_, _| {})
}

/// Like [`extract_zip`], calling `progress(done, total)` after every entry.
///
/// # Errors
///
/// See [`extract_zip`].
pub fn extract_zip_with_progress<R: Read + Seek>(
    reader: R,
    dest_dir: &Path,
    mut progress: impl FnMut(u64, u64),
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let mut archive = ZipArchive::new(reader)?;

    fs::create_dir_all(dest_dir)?;
    let total = archive.len() as u64;
    let mut extracted_files = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let name = file.name().to_string();
        progress(i as u64 + 1, total);

        // Zip Slip: reject anything that is absolute or climbs out of dest.
        let Some(relative_path) = file.enclosed_name() else {
            return Err(ExtractError::UnsafeEntry(name));
        };
        let absolute_path = dest_dir.join(&relative_path);
        if !absolute_path.starts_with(dest_dir) {
            return Err(ExtractError::UnsafeEntry(name));
        }

        if file.is_dir() {
            continue;
        }
        if is_hidden_entry(&name) {
            tracing::debug!(entry = %name, "skipping hidden entry");
            continue;
        }

        if let Some(p) = absolute_path.parent() {
            fs::create_dir_all(p)?;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut file, &mut outfile)?;
        tracing::debug!(entry = %relative_path.display(), "extracted");

        extracted_files.push(ExtractedFile {
            relative_path,
            absolute_path,
        });
    }

    Ok(extracted_files)
}

/// Extract a zip archive from a file on disk.
///
/// # Errors
///
/// See [`extract_zip`]; opening `archive_path` may also fail with
/// [`ExtractError::Io`].
pub fn extract_zip_file(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    extract_zip(io::BufReader::new(file), dest_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    fn archive(entries: &[(&str, &[u8])]) -> Cursor<Vec<u8>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            if name.ends_with('/') {
                writer
                    .add_directory(*name, SimpleFileOptions::default())
                    .unwrap();
            } else {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        let mut cursor = writer.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn test_hidden_entries() {
        assert!(is_hidden_entry(".hidden"));
        assert!(is_hidden_entry("assets/.DS_Store"));
        assert!(is_hidden_entry("a//b"));
        assert!(is_hidden_entry(" /b"));
        assert!(!is_hidden_entry("assets/icon.png"));
        assert!(!is_hidden_entry("content-units.json"));
    }

    #[test]
    fn test_extract_mirrors_tree() {
        let dir = tempdir().unwrap();
        let src = archive(&[
            ("assets/", b""),
            ("assets/img/icon.png", b"png"),
            ("content-units.json", b"{}"),
            (".git/config", b"secret"),
        ]);

        let files = extract_zip(src, dir.path()).unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(
            fs::read(dir.path().join("assets/img/icon.png")).unwrap(),
            b"png"
        );
        assert!(!dir.path().join(".git").exists());
    }

    #[test]
    fn test_rejects_traversal() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out");
        let src = archive(&[("../evil.txt", b"x")]);

        let err = extract_zip(src, &dest).unwrap_err();
        assert!(matches!(err, ExtractError::UnsafeEntry(name) if name == "../evil.txt"));
        assert!(!dir.path().join("evil.txt").exists());
    }

    #[test]
    fn test_not_a_zip() {
        let dir = tempdir().unwrap();
        let err = extract_zip(Cursor::new(b"hello".to_vec()), dir.path()).unwrap_err();
        assert!(matches!(err, ExtractError::Archive(_)));
    }

    #[test]
    fn test_progress_reports_every_entry() {
        let dir = tempdir().unwrap();
        let src = archive(&[("a.txt", b"a"), ("b.txt", b"b")]);
        let mut seen = Vec::new();
        extract_zip_with_progress(src, dir.path(), |done, total| seen.push((done, total))).unwrap();
        assert_eq!(seen, vec![(1, 2), (2, 2)]);
    }
}
