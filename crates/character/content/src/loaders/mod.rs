//! Content loaders for reading catalog data from files.
//!
//! Loaders convert RON files into the catalog types in [`crate::catalog`].
//! Each loader also exposes the built-in starter catalog compiled into the
//! crate, so hosts and tests work without a data directory.

pub mod cyberware;
pub mod gear;
pub mod qualities;

pub use cyberware::CyberwareLoader;
pub use gear::GearLoader;
pub use qualities::QualityLoader;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
