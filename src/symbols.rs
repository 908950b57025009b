use crate::artifact;
use crate::build::Sdk;
use crate::result::{ForgeError, Result};
use crate::utils::fs::{copy_into, remove_dir_if_exists};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every `*.dSYM` bundle below `dir`, without descending into bundles.
pub fn find_dsyms(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    let mut walker = WalkDir::new(dir).sort_by_file_name().into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|e| ForgeError::Io(e.into()))?;
        if entry.file_type().is_dir() && entry.path().extension().is_some_and(|e| e == "dSYM") {
            found.push(entry.path().to_path_buf());
            walker.skip_current_dir();
        }
    }
    Ok(found)
}

/** Copies debug-symbol bundles out of the build tree
 *
 * `destination` is cleared first, then each SDK's bundles land in
 * `destination/<sdk>/`. SDKs without symbols are skipped silently.
 */
pub fn collect(
    destination: &Path,
    build_root: &Path,
    configuration: &str,
    sdks: &[Sdk],
) -> Result<Vec<PathBuf>> {
    remove_dir_if_exists(destination)?;

    let mut collected = Vec::new();
    for &sdk in sdks {
        let dsyms = find_dsyms(&artifact::products_dir(build_root, configuration, sdk))?;
        if dsyms.is_empty() {
            log::debug!("No dSYMs for {}", sdk);
            continue;
        }

        let sdk_dir = destination.join(sdk.as_str());
        fs::create_dir_all(&sdk_dir)?;
        for dsym in dsyms {
            collected.push(copy_into(&dsym, &sdk_dir)?);
        }
    }

    log::info!(
        "Collected {} dSYM bundles into {}",
        collected.len(),
        destination.display()
    );
    Ok(collected)
}
