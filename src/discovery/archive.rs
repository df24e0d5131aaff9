//! Turns a scan path into a plain directory to walk
//!
//! Directories are used in place. Zip and tar archives are unpacked next to the
//! archive into `extracted_zip` / `extracted_tar`.

use crate::error::{ResolverError, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

pub const ZIP_EXTRACT_DIR: &str = "extracted_zip";
pub const TAR_EXTRACT_DIR: &str = "extracted_tar";

const MACOS_METADATA_PREFIX: &str = "__MACOSX";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveKind {
    fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_lowercase();
        if name.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if name.ends_with(".tar") {
            Some(ArchiveKind::Tar)
        } else {
            None
        }
    }
}

/// Returns a directory holding the project to scan.
///
/// # Errors
///
/// - `ScanPathNotFound` when `scan_path` does not exist
/// - `UnsupportedArchive` for files that are not zip/tar/tar.gz/tgz
/// - `Archive` / `Io` when unpacking fails
pub fn extract_root(scan_path: &Path) -> Result<PathBuf> {
    if scan_path.is_dir() {
        return Ok(scan_path.to_path_buf());
    }
    if !scan_path.exists() {
        return Err(ResolverError::ScanPathNotFound(scan_path.to_path_buf()));
    }

    let kind = ArchiveKind::from_path(scan_path)
        .ok_or_else(|| ResolverError::UnsupportedArchive(scan_path.to_path_buf()))?;

    let parent = scan_path.parent().unwrap_or_else(|| Path::new("."));
    let target = match kind {
        ArchiveKind::Zip => parent.join(ZIP_EXTRACT_DIR),
        ArchiveKind::Tar | ArchiveKind::TarGz => parent.join(TAR_EXTRACT_DIR),
    };
    fs::create_dir_all(&target).map_err(|e| ResolverError::io(&target, e))?;

    info!(archive = %scan_path.display(), target = %target.display(), "Extracting archive");

    match kind {
        ArchiveKind::Zip => extract_zip(scan_path, &target)?,
        ArchiveKind::Tar => {
            let file = File::open(scan_path).map_err(|e| ResolverError::io(scan_path, e))?;
            extract_tar(scan_path, file, &target)?
        }
        ArchiveKind::TarGz => {
            let file = File::open(scan_path).map_err(|e| ResolverError::io(scan_path, e))?;
            extract_tar(scan_path, GzDecoder::new(file), &target)?
        }
    }

    Ok(target)
}

fn extract_tar<R: Read>(archive_path: &Path, reader: R, target: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|e| ResolverError::archive(archive_path, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| ResolverError::archive(archive_path, e))?;
        // unpack_in refuses entries that would land outside the target
        let unpacked = entry
            .unpack_in(target)
            .map_err(|e| ResolverError::archive(archive_path, e))?;
        if !unpacked {
            let name = entry
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            warn!(entry = %name, "Skipping tar entry outside extraction directory");
        }
    }

    Ok(())
}

fn extract_zip(archive_path: &Path, target: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| ResolverError::io(archive_path, e))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| ResolverError::archive(archive_path, e))?;

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    let prefix = common_root_dir(&names);
    if let Some(prefix) = &prefix {
        debug!(prefix = %prefix, "Stripping shared top-level directory from zip entries");
    }

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ResolverError::archive(archive_path, e))?;
        let name = entry.name().to_string();

        if name.starts_with(MACOS_METADATA_PREFIX) {
            continue;
        }

        let relative = match &prefix {
            Some(p) => name
                .strip_prefix(p.as_str())
                .map(|rest| rest.trim_start_matches('/'))
                .unwrap_or(&name),
            None => name.as_str(),
        };
        if relative.is_empty() {
            continue;
        }

        let relative = Path::new(relative);
        if !is_safe_relative(relative) {
            warn!(entry = %name, "Skipping zip entry with unsafe path");
            continue;
        }
        let out_path = target.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| ResolverError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ResolverError::io(parent, e))?;
        }
        let mut out_file = File::create(&out_path).map_err(|e| ResolverError::io(&out_path, e))?;
        io::copy(&mut entry, &mut out_file).map_err(|e| ResolverError::io(&out_path, e))?;
    }

    Ok(())
}

/// Returns the single top-level directory shared by every entry, if any
fn common_root_dir(names: &[String]) -> Option<String> {
    let mut root: Option<&str> = None;

    for name in names.iter().filter(|n| !n.starts_with(MACOS_METADATA_PREFIX)) {
        let (first, rest) = name.split_once('/')?;
        if first.is_empty() {
            return None;
        }
        // A bare top-level file means there is no wrapping directory
        if rest.is_empty() && !name.ends_with('/') {
            return None;
        }
        match root {
            None => root = Some(first),
            Some(r) if r == first => {}
            Some(_) => return None,
        }
    }

    root.map(|r| format!("{}/", r))
}

fn is_safe_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
