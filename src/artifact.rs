//! Deterministic paths of the products `xcodebuild` leaves under `SYMROOT`.

use crate::build::{Linkage, Sdk};
use std::path::{Path, PathBuf};

/// `<build_root>/<configuration>-<sdk>`, or `<build_root>/<configuration>` for macOS.
pub fn products_dir(build_root: &Path, configuration: &str, sdk: Sdk) -> PathBuf {
    match sdk {
        Sdk::MacOsx => build_root.join(configuration),
        _ => build_root.join(format!("{}-{}", configuration, sdk.as_str())),
    }
}

/// File or bundle name of a module's binary for the given linkage.
pub fn product_name(binary_id: &str, linkage: Linkage) -> String {
    match linkage {
        Linkage::Static => format!("lib{}.a", binary_id),
        Linkage::Dynamic => format!("{}.framework", binary_id),
    }
}

/// Expected location of one slice's binary. Existence is checked by callers.
pub fn slice_path(
    build_root: &Path,
    configuration: &str,
    sdk: Sdk,
    module_root: &str,
    binary_id: &str,
    linkage: Linkage,
) -> PathBuf {
    products_dir(build_root, configuration, sdk)
        .join(module_root)
        .join(product_name(binary_id, linkage))
}

pub fn xcframework_path(build_root: &Path, binary_id: &str) -> PathBuf {
    build_root.join(format!("{}.xcframework", binary_id))
}
