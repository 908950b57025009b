use crate::result::Result;
use crate::utils::fs::copy_dereferenced;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Public headers copied into a scratch `Headers` directory with links resolved.
///
/// The scratch directory is removed when this value is dropped, whether the
/// merge that used it succeeded or not.
pub struct ScratchHeaders {
    _dir: TempDir,
    headers: PathBuf,
}

impl ScratchHeaders {
    pub fn prepare(public_headers: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("xcforge-headers-")
            .tempdir()?;
        let headers = dir.path().join("Headers");
        let count = copy_dereferenced(public_headers, &headers)?;

        if count == 0 {
            log::warn!("No public headers found in {}", public_headers.display());
        } else {
            log::debug!(
                "Copied {} headers from {} to {}",
                count,
                public_headers.display(),
                headers.display()
            );
        }

        Ok(Self { _dir: dir, headers })
    }

    pub fn path(&self) -> &Path {
        &self.headers
    }
}
