//! The on-disk store layout: `Cellar/opt/bin/download/cache` under a root resolved from
//! `BREW_PY_CELLAR`, plus the `PackageHandle`/`VersionHandle` primitives used by every
//! other module.

use crate::error::{KegError, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolve the store root from `BREW_PY_CELLAR`. Per the environment contract, an unset
/// variable is a fatal configuration error (the caller maps `KegError::StoreNotConfigured`
/// to exit code 42).
pub fn detect_root() -> Result<PathBuf> {
    match std::env::var("BREW_PY_CELLAR") {
        Ok(v) if !v.is_empty() => Ok(PathBuf::from(v)),
        _ => Err(KegError::StoreNotConfigured),
    }
}

/// A handle onto the store root, exposing the pure path functions from the data model.
#[derive(Debug, Clone)]
pub struct Store {
    pub root: PathBuf,
}

impl Store {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn open() -> Result<Self> {
        Ok(Self::new(detect_root()?))
    }

    pub fn cellar_path(&self) -> PathBuf {
        self.root.join("Cellar")
    }

    pub fn opt_path(&self) -> PathBuf {
        self.root.join("opt")
    }

    pub fn bin_path(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn download_path(&self) -> PathBuf {
        self.root.join("download")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn install_path(&self, pkg: &str) -> PathBuf {
        self.cellar_path().join(pkg)
    }

    pub fn install_path_version(&self, pkg: &str, version: &str) -> PathBuf {
        self.install_path(pkg).join(version)
    }

    pub fn recipe_path(&self, pkg: &str, version: &str) -> PathBuf {
        self.install_path_version(pkg, version)
            .join(".brew")
            .join(format!("{pkg}.rb"))
    }

    pub fn digest_path(&self, pkg: &str, version: &str) -> PathBuf {
        self.install_path_version(pkg, version)
            .join(".brew")
            .join("digest")
    }

    pub fn download_archive_path(&self, pkg: &str, tag: &str) -> PathBuf {
        self.download_path().join(format!("{pkg}-{tag}.tar.gz"))
    }

    /// Render a path relative to the store root, for log output.
    pub fn short_path(&self, p: &Path) -> PathBuf {
        p.strip_prefix(&self.root).unwrap_or(p).to_path_buf()
    }

    /// Every version directory under `Cellar/<pkg>` that contains `.brew/<pkg>.rb`.
    /// Half-extracted directories are silently skipped.
    pub fn versions_of(&self, pkg: &str) -> Vec<String> {
        let dir = self.install_path(pkg);
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut versions: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                if name.starts_with('.') {
                    return None;
                }
                if self.recipe_path(pkg, &name).exists() {
                    Some(name)
                } else {
                    None
                }
            })
            .collect();
        versions.sort_by(|a, b| compare_versions(a, b));
        versions
    }

    /// Every package name with at least one enumerable version.
    pub fn installed_names(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.cellar_path()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                if name.starts_with('.') {
                    return None;
                }
                if self.versions_of(&name).is_empty() {
                    None
                } else {
                    Some(name)
                }
            })
            .collect();
        names.sort();
        names
    }

    pub fn installed_packages(&self) -> Vec<PackageHandle> {
        self.installed_names()
            .into_iter()
            .map(|name| self.package(&name))
            .collect()
    }

    pub fn package(&self, name: &str) -> PackageHandle {
        PackageHandle::new(self.clone(), name.to_string())
    }

    /// Which package names, out of `keys`, have no enumerable versions at all.
    pub fn missing(&self, keys: &[String]) -> Vec<String> {
        keys.iter()
            .filter(|k| self.versions_of(k).is_empty())
            .cloned()
            .collect()
    }
}

/// Sort key: numeric-dotted components compared numerically, falling back to
/// lexicographic — matches the teacher's `compare_versions`.
pub fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    let a_parts: Vec<u64> = a.split('.').filter_map(|s| s.parse().ok()).collect();
    let b_parts: Vec<u64> = b.split('.').filter_map(|s| s.parse().ok()).collect();

    for i in 0..a_parts.len().max(b_parts.len()) {
        let ap = a_parts.get(i).unwrap_or(&0);
        let bp = b_parts.get(i).unwrap_or(&0);
        match ap.cmp(bp) {
            std::cmp::Ordering::Equal => continue,
            other => return other,
        }
    }
    a.cmp(b)
}

/// An owned, single-command view of one package's state in the store. Not cached across
/// mutations — callers discard and rebuild after any write.
#[derive(Debug, Clone)]
pub struct PackageHandle {
    pub store: Store,
    pub name: String,
}

impl PackageHandle {
    fn new(store: Store, name: String) -> Self {
        Self { store, name }
    }

    pub fn path(&self) -> PathBuf {
        self.store.install_path(&self.name)
    }

    pub fn versions(&self) -> Vec<String> {
        self.store.versions_of(&self.name)
    }

    /// The version `opt/<pkg>` currently points to, if any and if the link resolves
    /// under `Cellar/<pkg>/`.
    pub fn active_version(&self) -> Option<String> {
        let opt_link = self.store.opt_path().join(&self.name);
        let target = fs::read_link(&opt_link).ok()?;
        let resolved = if target.is_absolute() {
            target
        } else {
            opt_link.parent().unwrap_or(&opt_link).join(&target)
        };
        let cellar_prefix = self.path();
        resolved
            .strip_prefix(&cellar_prefix)
            .ok()
            .and_then(|rest| rest.components().next())
            .map(|c| c.as_os_str().to_string_lossy().to_string())
    }

    fn flag_path(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    pub fn is_pinned(&self) -> bool {
        self.flag_path(".pinned").exists()
    }

    pub fn is_primary(&self) -> bool {
        self.flag_path(".primary").exists()
    }

    pub fn set_pinned(&self, pinned: bool) -> Result<()> {
        let path = self.flag_path(".pinned");
        if pinned {
            fs::create_dir_all(self.path())?;
            fs::write(path, b"")?;
        } else if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn set_primary(&self, primary: bool) -> Result<()> {
        let path = self.flag_path(".primary");
        if primary {
            fs::create_dir_all(self.path())?;
            fs::write(path, b"")?;
        } else if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn version(&self, version: &str) -> VersionHandle {
        VersionHandle {
            store: self.store.clone(),
            pkg: self.name.clone(),
            version: version.to_string(),
        }
    }

    /// Every `bin/<exe>` symlink in the store whose two-hop target resolves into this
    /// package's opt-link.
    pub fn bin_links(&self) -> HashSet<PathBuf> {
        let opt_link = self.store.opt_path().join(&self.name);
        let bin_dir = self.store.bin_path();
        let Ok(entries) = fs::read_dir(&bin_dir) else {
            return HashSet::new();
        };
        entries
            .filter_map(|e| e.ok())
            .filter(|e| {
                fs::read_link(e.path())
                    .ok()
                    .map(|target| {
                        let resolved = if target.is_absolute() {
                            target
                        } else {
                            bin_dir.join(&target)
                        };
                        resolved.starts_with(&opt_link)
                    })
                    .unwrap_or(false)
            })
            .map(|e| e.path())
            .collect()
    }
}

/// A single installed `(pkg, version)`.
#[derive(Debug, Clone)]
pub struct VersionHandle {
    pub store: Store,
    pub pkg: String,
    pub version: String,
}

impl VersionHandle {
    pub fn path(&self) -> PathBuf {
        self.store.install_path_version(&self.pkg, &self.version)
    }

    pub fn recipe_path(&self) -> PathBuf {
        self.store.recipe_path(&self.pkg, &self.version)
    }

    pub fn digest_path(&self) -> PathBuf {
        self.store.digest_path(&self.pkg, &self.version)
    }

    pub fn digest(&self) -> Option<String> {
        fs::read_to_string(self.digest_path())
            .ok()
            .map(|s| s.trim().to_string())
    }

    pub fn set_digest(&self, digest: &str) -> Result<()> {
        let path = self.digest_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, digest)?;
        Ok(())
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.path().join("bin")
    }

    /// Every user-executable regular file under `<ver>/bin/`.
    pub fn executables(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.bin_dir()) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .filter(|e| {
                use std::os::unix::fs::PermissionsExt;
                e.metadata()
                    .map(|m| m.is_file() && m.permissions().mode() & 0o100 != 0)
                    .unwrap_or(false)
            })
            .filter_map(|e| e.file_name().into_string().ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.2.0", "1.10.0"), std::cmp::Ordering::Less);
        assert_eq!(compare_versions("2.0", "1.9.9"), std::cmp::Ordering::Greater);
        assert_eq!(compare_versions("1.0", "1.0"), std::cmp::Ordering::Equal);
    }

    #[test]
    fn test_versions_require_recipe() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().to_path_buf());

        let half = store.install_path_version("wget", "1.0");
        fs::create_dir_all(&half).unwrap();

        let full = store.install_path_version("wget", "1.1");
        fs::create_dir_all(full.join(".brew")).unwrap();
        fs::write(full.join(".brew").join("wget.rb"), "class Wget < Formula\nend\n").unwrap();

        assert_eq!(store.versions_of("wget"), vec!["1.1".to_string()]);
    }

    #[test]
    fn test_pin_primary_flags() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().to_path_buf());
        let pkg = store.package("wget");

        assert!(!pkg.is_pinned());
        pkg.set_pinned(true).unwrap();
        assert!(pkg.is_pinned());
        pkg.set_pinned(false).unwrap();
        assert!(!pkg.is_pinned());

        pkg.set_primary(true).unwrap();
        assert!(pkg.is_primary());
    }
}
