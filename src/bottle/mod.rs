//! Bottle installation: safe extraction, then relocation of every placeholder token in
//! both Mach-O binaries and plain text files.

pub mod extract;
pub mod macho;
pub mod placeholder;

use crate::error::Result;
use crate::store::VersionHandle;
use std::path::Path;

/// Extract `archive_path` into `version.path()` and relocate the result in place.
/// `version.path()` must already exist and be empty.
pub fn install(archive_path: &Path, version: &VersionHandle) -> Result<()> {
    let dest = version.path();
    extract::extract(archive_path, &dest)?;

    let prefix = &version.store.root;
    let cellar = version.store.cellar_path();
    let library = prefix.join("Library");

    macho::relocate_tree(&dest, prefix, &cellar).map_err(crate::error::KegError::Other)?;
    placeholder::rewrite_tree(&dest, prefix, &cellar, &library).map_err(crate::error::KegError::Other)?;

    Ok(())
}
