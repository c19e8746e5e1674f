//! Safe tar.gz extraction into the Cellar. Every entry is checked against the
//! destination directory before being written: no absolute paths, no `..` escapes
//! through either a regular name or a symlink/hardlink target, setuid/setgid stripped,
//! and permissions masked down to a known-safe range.

use crate::error::{KegError, Result};
use flate2::read::GzDecoder;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};

/// Extract `archive_path` (gzip-compressed tar) into `dest`, which must already exist.
/// Returns the number of entries written.
pub fn extract(archive_path: &Path, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest)?;
    let file = fs::File::open(archive_path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);
    archive.set_preserve_permissions(false);
    archive.set_unpack_xattrs(false);

    let mut written = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let raw_path = entry.path()?.into_owned();

        let Some(safe_rel) = safe_relative_path(&raw_path) else {
            return Err(KegError::UnsafeArchiveEntry {
                entry: raw_path.display().to_string(),
                reason: "path escapes destination".to_string(),
            });
        };

        if !matches!(
            entry.header().entry_type(),
            EntryType::Regular | EntryType::Directory | EntryType::Symlink | EntryType::Link
        ) {
            return Err(KegError::UnsafeArchiveEntry {
                entry: raw_path.display().to_string(),
                reason: format!("unsupported entry type: {:?}", entry.header().entry_type()),
            });
        }

        if matches!(entry.header().entry_type(), EntryType::Symlink | EntryType::Link) {
            if let Some(link_name) = entry.link_name()? {
                if !is_safe_link_target(&safe_rel, &link_name) {
                    return Err(KegError::UnsafeArchiveEntry {
                        entry: raw_path.display().to_string(),
                        reason: format!("link target escapes destination: {}", link_name.display()),
                    });
                }
            }
        }

        let mode = entry.header().mode().unwrap_or(0o644);
        let is_dir = entry.header().entry_type().is_dir();
        entry.header_mut().set_mode(sanitize_mode(mode, is_dir));

        let target = dest.join(&safe_rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&target)?;
        written += 1;
    }

    Ok(written)
}

/// Reject absolute paths and normalize `.`/`..` components, refusing any path whose
/// normalized form starts with `..` (would land outside `dest`).
fn safe_relative_path(raw: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

/// A symlink/hardlink target is safe if it's relative and, once resolved against the
/// entry's own directory, doesn't climb above the extraction root.
fn is_safe_link_target(entry_rel_path: &Path, link_target: &Path) -> bool {
    if link_target.is_absolute() {
        return false;
    }
    let entry_dir = entry_rel_path.parent().unwrap_or_else(|| Path::new(""));
    let mut resolved = PathBuf::new();
    for component in entry_dir.components().chain(link_target.components()) {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    return false;
                }
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

/// Mask permissions to a known-safe range: strip setuid/setgid/sticky, cap at 0755,
/// clear every exec bit on files the owner can't execute, always grant the owner rw.
fn sanitize_mode(mode: u32, is_dir: bool) -> u32 {
    let mut m = mode & 0o777;
    m &= 0o755;
    if !is_dir && m & 0o100 == 0 {
        m &= !0o111;
    }
    m |= 0o600;
    if is_dir {
        m |= 0o100;
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_relative_path_rejects_absolute() {
        assert_eq!(safe_relative_path(Path::new("/etc/passwd")), None);
    }

    #[test]
    fn test_safe_relative_path_rejects_escape() {
        assert_eq!(safe_relative_path(Path::new("../../etc/passwd")), None);
    }

    #[test]
    fn test_safe_relative_path_normalizes() {
        assert_eq!(
            safe_relative_path(Path::new("bin/./wget")),
            Some(PathBuf::from("bin/wget"))
        );
    }

    #[test]
    fn test_link_target_rejects_absolute() {
        assert!(!is_safe_link_target(Path::new("lib/foo.dylib"), Path::new("/usr/lib/bar")));
    }

    #[test]
    fn test_link_target_rejects_escape() {
        assert!(!is_safe_link_target(
            Path::new("lib/foo.dylib"),
            Path::new("../../../etc/passwd")
        ));
    }

    #[test]
    fn test_link_target_allows_sibling() {
        assert!(is_safe_link_target(Path::new("lib/foo.dylib"), Path::new("foo.1.dylib")));
    }

    #[test]
    fn test_sanitize_mode_clears_setuid_and_caps() {
        assert_eq!(sanitize_mode(0o4777, false) & 0o4000, 0);
        assert_eq!(sanitize_mode(0o777, false) & 0o777, 0o755 | 0o600 & 0o777);
    }

    #[test]
    fn test_sanitize_mode_clears_exec_when_owner_cant_exec() {
        let m = sanitize_mode(0o644 | 0o011, false);
        assert_eq!(m & 0o111, 0);
    }

    #[test]
    fn test_extract_rejects_fifo_entry() {
        use std::io::Write as _;
        use tar::{Builder, Header};

        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("bottle.tar.gz");

        let tar_bytes = {
            let mut builder = Builder::new(Vec::new());
            let mut header = Header::new_gnu();
            header.set_path("fifo").unwrap();
            header.set_size(0);
            header.set_entry_type(EntryType::Fifo);
            header.set_cksum();
            builder.append(&header, std::io::empty()).unwrap();
            builder.into_inner().unwrap()
        };

        let gz_bytes = {
            let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&tar_bytes).unwrap();
            encoder.finish().unwrap()
        };
        fs::write(&archive_path, gz_bytes).unwrap();

        let dest = dir.path().join("dest");
        let err = extract(&archive_path, &dest).unwrap_err();
        assert!(matches!(err, KegError::UnsafeArchiveEntry { .. }));
    }
}
