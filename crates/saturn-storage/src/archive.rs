//! ZIP archive extraction and packing.
//!
//! Submissions travel as ZIP archives. Extraction guards against zip-slip:
//! any entry whose resolved path would land outside the destination root
//! is rejected before anything is written.

use crate::error::StorageError;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Result of extracting an archive: either it was accepted and written to
/// `root`, or it was rejected (malformed ZIP or a path-escaping entry) and
/// nothing outside `root` was touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Accepted,
    Rejected,
}

/// Extract `data` (a ZIP archive) into `root`, creating parent directories
/// as needed. Directory entries are escape-checked like any other entry,
/// then skipped — only their presence in the archive is validated, their
/// content is not extracted separately (`create_dir_all` on file entries
/// covers it).
pub fn extract_archive(data: &[u8], root: &Path) -> Result<ArchiveOutcome, StorageError> {
    let mut reader = match zip::ZipArchive::new(Cursor::new(data)) {
        Ok(reader) => reader,
        Err(_) => return Ok(ArchiveOutcome::Rejected),
    };

    for i in 0..reader.len() {
        let mut entry = reader.by_index(i)?;
        let entry_name = match entry.enclosed_name() {
            Some(name) => name.to_path_buf(),
            None => return Ok(ArchiveOutcome::Rejected),
        };
        let local = root.join(&entry_name);

        if !path_within(&local, root) {
            return Ok(ArchiveOutcome::Rejected);
        }

        if entry.is_dir() {
            continue;
        }

        if let Some(parent) = local.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = std::fs::File::create(&local)?;
        std::io::copy(&mut entry, &mut out)?;
    }

    Ok(ArchiveOutcome::Accepted)
}

/// Pack every regular file under `root` into a ZIP archive, using paths
/// relative to `root` as entry names.
pub fn pack_archive(root: &Path) -> Result<Vec<u8>, StorageError> {
    let mut buf = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let name = relative.to_string_lossy().replace('\\', "/");
            writer.start_file(name, options)?;
            let mut file = std::fs::File::open(entry.path())?;
            std::io::copy(&mut file, &mut writer)?;
        }
        writer.finish()?;
    }
    Ok(buf)
}

/// Download `bucket/name`, extract it into `root`. Returns whether the
/// archive was accepted so the caller can finish the task as rejected
/// (`accepted: false`) without treating a malformed submission as a
/// retryable error.
pub async fn get_archive(
    storage: &dyn crate::client::StorageClient,
    bucket: &str,
    name: &str,
    root: &Path,
) -> Result<ArchiveOutcome, StorageError> {
    let data = storage.get_file(bucket, name).await?;
    extract_archive(&data, root)
}

/// Pack `root` into a ZIP archive and upload it to `bucket/name`.
pub async fn put_archive(
    storage: &dyn crate::client::StorageClient,
    bucket: &str,
    name: &str,
    root: &Path,
) -> Result<(), StorageError> {
    let data = pack_archive(root)?;
    storage.upload_file(bucket, name, data).await
}

fn path_within(candidate: &Path, root: &Path) -> bool {
    let candidate = normalize(candidate);
    let root = normalize(root);
    candidate.starts_with(&root)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        use std::path::Component;
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}
