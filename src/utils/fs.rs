use crate::result::{ForgeError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn relative_to<'a>(path: &'a Path, base: &Path) -> Result<&'a Path> {
    path.strip_prefix(base)
        .map_err(|e| ForgeError::Io(io::Error::new(io::ErrorKind::InvalidInput, e)))
}

/// Removes a directory tree if it exists. Returns whether anything was removed.
pub fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    if path.is_dir() {
        fs::remove_dir_all(path)?;
        log::debug!("Removed {}", path.display());
        return Ok(true);
    }
    Ok(false)
}

/// Copies a directory tree, preserving symbolic links as links.
pub fn copy_dir_all(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| ForgeError::Io(e.into()))?;
        let target = dest.join(relative_to(entry.path(), src)?);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    let link = fs::read_link(src)?;
    if dest.symlink_metadata().is_ok() {
        fs::remove_file(dest)?;
    }
    std::os::unix::fs::symlink(link, dest)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    fs::copy(src, dest)?;
    Ok(())
}

/// Copies a file or bundle into `dest_dir`, replacing an existing entry of the same name.
pub fn copy_into(src: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let name = src
        .file_name()
        .ok_or_else(|| ForgeError::config(format!("Path has no file name: {}", src.display())))?;
    let target = dest_dir.join(name);

    if let Ok(meta) = target.symlink_metadata() {
        if meta.is_dir() {
            fs::remove_dir_all(&target)?;
        } else {
            fs::remove_file(&target)?;
        }
    }

    if src.is_dir() {
        copy_dir_all(src, &target)?;
    } else {
        fs::copy(src, &target)?;
    }
    Ok(target)
}

/// Copies the tree under `src` into `dest`, resolving symbolic links so that
/// `dest` holds real files and directories. Returns the number of files copied.
///
/// A dangling link is an error.
pub fn copy_dereferenced(src: &Path, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest)?;
    if !src.is_dir() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| ForgeError::Io(e.into()))?;
        let target = dest.join(relative_to(entry.path(), src)?);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}
