//! Archive extraction for Go distributions.
//!
//! Go ships `.tar.gz` archives for Unix hosts and `.zip` for Windows, each
//! with a single `go/` directory at the top. Entries are resolved lexically
//! against the destination and anything that would land outside it is
//! refused before a single byte of that entry is written.

use flate2::read::GzDecoder;
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};

use super::package::ArchiveKind;
use super::progress::Progress;
use crate::errors::ExtractError;

/// Extracts `archive` into `destination`, picking the format by suffix.
///
/// # Errors
///
/// Returns an error if the suffix is unknown, the archive is corrupt, an
/// entry escapes the destination, or a file cannot be written.
pub fn extract(destination: &Path, archive: &Path, progress: &Progress) -> Result<(), ExtractError> {
    match ArchiveKind::from_path(archive) {
        Some(ArchiveKind::TarGz) => extract_tar_gz(destination, archive, progress),
        Some(ArchiveKind::Zip) => extract_zip(destination, archive, progress),
        None => Err(ExtractError::UnknownFormat {
            path: archive.to_path_buf(),
        }),
    }
}

/// Extracts a tar.gz archive. Progress is a running byte count.
///
/// # Errors
///
/// See [`extract`].
pub fn extract_tar_gz(
    destination: &Path,
    archive_path: &Path,
    progress: &Progress,
) -> Result<(), ExtractError> {
    create_dir(destination)?;

    let file = File::open(archive_path).map_err(|e| ExtractError::io(archive_path, e))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    let corrupt = |e: std::io::Error| ExtractError::Corrupt {
        path: archive_path.to_path_buf(),
        message: e.to_string(),
    };

    for entry in archive.entries().map_err(corrupt)? {
        let mut entry = entry.map_err(corrupt)?;
        let name = entry.path().map_err(corrupt)?.to_string_lossy().into_owned();
        let Some(output_path) = resolve_entry(destination, &name)? else {
            continue;
        };

        let entry_type = entry.header().entry_type();
        match entry_type {
            EntryType::Directory => create_dir(&output_path)?,
            EntryType::Regular | EntryType::Continuous => {
                let mode = entry.header().mode().ok();
                write_file(&output_path, &mut entry, mode, progress)?;
            }
            EntryType::Symlink | EntryType::Link => {
                tracing::debug!(entry = %name, "skipping link entry");
            }
            other => {
                tracing::debug!(entry = %name, kind = ?other, "skipping special entry");
            }
        }
    }

    Ok(())
}

/// Extracts a zip archive. Progress is proportional to the total
/// uncompressed size.
///
/// # Errors
///
/// See [`extract`].
pub fn extract_zip(
    destination: &Path,
    archive_path: &Path,
    progress: &Progress,
) -> Result<(), ExtractError> {
    let corrupt = |e: zip::result::ZipError| ExtractError::Corrupt {
        path: archive_path.to_path_buf(),
        message: e.to_string(),
    };

    let file = File::open(archive_path).map_err(|e| ExtractError::io(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(corrupt)?;
    create_dir(destination)?;

    let mut total = 0u64;
    for i in 0..archive.len() {
        total += archive.by_index(i).map_err(corrupt)?.size();
    }
    progress.set_total(total);

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(corrupt)?;
        let name = entry.name().to_string();
        let Some(output_path) = resolve_entry(destination, &name)? else {
            continue;
        };

        if entry.is_dir() {
            create_dir(&output_path)?;
        } else if entry.is_symlink() {
            tracing::debug!(entry = %name, "skipping link entry");
        } else {
            let mode = entry.unix_mode();
            write_file(&output_path, &mut entry, mode, progress)?;
        }
    }

    Ok(())
}

/// Resolves an entry name against `destination`.
///
/// Returns `Ok(None)` for entries that name the destination itself (`./`).
fn resolve_entry(destination: &Path, name: &str) -> Result<Option<PathBuf>, ExtractError> {
    let traversal = || ExtractError::PathTraversal {
        entry: name.to_string(),
    };

    let mut relative = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !relative.pop() {
                    return Err(traversal());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(traversal()),
        }
    }

    // Backslashes are separators inside zip files written on Windows.
    if name.contains('\\') && name.split('\\').any(|part| part == "..") {
        return Err(traversal());
    }

    if relative.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(destination.join(relative)))
    }
}

fn create_dir(path: &Path) -> Result<(), ExtractError> {
    std::fs::create_dir_all(path).map_err(|e| ExtractError::io(path, e))
}

fn write_file(
    path: &Path,
    reader: &mut impl std::io::Read,
    mode: Option<u32>,
    progress: &Progress,
) -> Result<(), ExtractError> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    let file = File::create(path).map_err(|e| ExtractError::io(path, e))?;
    let mut writer = progress.writer(file);
    std::io::copy(reader, &mut writer).map_err(|e| ExtractError::io(path, e))?;
    set_mode(path, mode)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: Option<u32>) -> Result<(), ExtractError> {
    use std::os::unix::fs::PermissionsExt;

    let Some(mode) = mode else {
        return Ok(());
    };
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o777))
        .map_err(|e| ExtractError::io(path, e))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn set_mode(_path: &Path, _mode: Option<u32>) -> Result<(), ExtractError> {
    Ok(())
}

/// Returns the single directory an archive unpacked into.
///
/// # Errors
///
/// Returns `UnexpectedLayout` unless `dir` holds exactly one directory.
pub fn single_top_level_dir(dir: &Path) -> Result<PathBuf, ExtractError> {
    let entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| ExtractError::io(dir, e))?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .collect();

    match entries.as_slice() {
        [only] if only.is_dir() => Ok(only.clone()),
        [] => Err(ExtractError::UnexpectedLayout {
            path: dir.to_path_buf(),
            message: "archive is empty".to_string(),
        }),
        _ => Err(ExtractError::UnexpectedLayout {
            path: dir.to_path_buf(),
            message: format!("expected one top-level directory, found {} entries", entries.len()),
        }),
    }
}
