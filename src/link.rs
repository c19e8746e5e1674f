//! Two-hop symlink indirection: `opt/<pkg>` points at the active `Cellar/<pkg>/<version>`,
//! and `bin/<exe>` points at `opt/<pkg>/bin/<exe>`. Upgrading a package only ever rewrites
//! the opt-link; bin-links are untouched as long as the executable name doesn't change.

use crate::error::Result;
use crate::store::{PackageHandle, Store, VersionHandle};
use std::fs;
use std::path::{Path, PathBuf};

/// Create or repoint `opt/<pkg>` at `<version>`, relative to the store root.
pub fn optlink(version: &VersionHandle) -> Result<()> {
    let opt_dir = version.store.opt_path();
    fs::create_dir_all(&opt_dir)?;
    let link = opt_dir.join(&version.pkg);
    let target = relative_target(&link, &version.path());
    replace_symlink(&link, &target)?;
    Ok(())
}

/// Remove `opt/<pkg>` entirely, e.g. as the last step of an uninstall.
pub fn unoptlink(pkg: &PackageHandle) -> Result<()> {
    let link = pkg.store.opt_path().join(&pkg.name);
    if is_symlink(&link) {
        fs::remove_file(&link)?;
    }
    Ok(())
}

/// Symlink every executable under `<version>/bin/` into `bin/`, skipping any name that
/// already resolves to a *different* package's opt-link (first install wins).
pub fn link_bins(version: &VersionHandle) -> Result<Vec<String>> {
    let store = &version.store;
    let bin_dir = store.bin_path();
    fs::create_dir_all(&bin_dir)?;

    let mut linked = Vec::new();
    for exe in version.executables() {
        let link = bin_dir.join(&exe);
        let opt_target = store.opt_path().join(&version.pkg).join("bin").join(&exe);

        if let Ok(existing) = fs::read_link(&link) {
            let resolved = resolve_relative(&link, &existing);
            let expected_opt = store.opt_path().join(&version.pkg);
            if resolved.starts_with(&expected_opt) {
                // already ours, nothing to do
            } else if resolved.starts_with(store.opt_path()) {
                // another package already claims this name
                continue;
            }
        }

        let target = relative_target(&link, &opt_target);
        replace_symlink(&link, &target)?;
        linked.push(exe);
    }
    Ok(linked)
}

/// Remove every `bin/<exe>` symlink owned by this package.
pub fn unlink_bins(pkg: &PackageHandle) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for link in pkg.bin_links() {
        fs::remove_file(&link)?;
        removed.push(link);
    }
    Ok(removed)
}

/// Switch `opt/<pkg>` to a different already-installed version without touching bin-links,
/// used by the `switch` verb.
pub fn switch_version(version: &VersionHandle) -> Result<()> {
    optlink(version)
}

fn is_symlink(p: &Path) -> bool {
    fs::symlink_metadata(p)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

fn resolve_relative(link: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        target.to_path_buf()
    } else {
        link.parent().unwrap_or(link).join(target)
    }
}

/// Build the relative path from `link`'s parent directory to `target`, matching the
/// teacher's depth-counting approach in `create_relative_symlink`.
fn relative_target(link: &Path, target: &Path) -> PathBuf {
    let link_dir = link.parent().unwrap_or(link);
    let mut link_components: Vec<_> = link_dir.components().collect();
    let mut target_components: Vec<_> = target.components().collect();

    let mut common = 0;
    while common < link_components.len()
        && common < target_components.len()
        && link_components[common] == target_components[common]
    {
        common += 1;
    }
    link_components.drain(..common);
    target_components.drain(..common);

    let mut result = PathBuf::new();
    for _ in &link_components {
        result.push("..");
    }
    for comp in target_components {
        result.push(comp);
    }
    result
}

fn replace_symlink(link: &Path, target: &Path) -> Result<()> {
    if is_symlink(link) {
        if fs::read_link(link).ok().as_deref() == Some(target) {
            return Ok(());
        }
        fs::remove_file(link)?;
    } else if link.exists() {
        // a real file occupies the name, never overwritten
        return Ok(());
    }
    #[cfg(unix)]
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_version(root: &Path, pkg: &str, version: &str) -> VersionHandle {
        let store = Store::new(root.to_path_buf());
        let v = store.package(pkg).version(version);
        let bin = v.bin_dir();
        fs::create_dir_all(&bin).unwrap();
        fs::create_dir_all(v.path().join(".brew")).unwrap();
        fs::write(v.recipe_path(), "class Foo < Formula\nend\n").unwrap();
        let exe = bin.join(pkg);
        fs::write(&exe, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
        }
        v
    }

    #[test]
    fn test_optlink_and_bin_link() {
        let dir = tempfile::tempdir().unwrap();
        let version = make_version(dir.path(), "wget", "1.0");

        optlink(&version).unwrap();
        let opt_link = version.store.opt_path().join("wget");
        assert!(is_symlink(&opt_link));
        let resolved = resolve_relative(&opt_link, &fs::read_link(&opt_link).unwrap());
        assert_eq!(resolved, version.path());

        let linked = link_bins(&version).unwrap();
        assert_eq!(linked, vec!["wget".to_string()]);
        let bin_link = version.store.bin_path().join("wget");
        assert!(is_symlink(&bin_link));
    }

    #[test]
    fn test_bin_link_first_wins() {
        let dir = tempfile::tempdir().unwrap();
        let a = make_version(dir.path(), "pkg-a", "1.0");
        let b = make_version(dir.path(), "pkg-b", "1.0");
        // simulate a colliding executable name by writing a second "pkg-a" exe under pkg-b
        fs::write(b.bin_dir().join("pkg-a"), "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(b.bin_dir().join("pkg-a"), fs::Permissions::from_mode(0o755))
                .unwrap();
        }

        optlink(&a).unwrap();
        optlink(&b).unwrap();
        link_bins(&a).unwrap();
        let second = link_bins(&b).unwrap();
        assert!(!second.contains(&"pkg-a".to_string()));
    }

    #[test]
    fn test_unoptlink_removes_link() {
        let dir = tempfile::tempdir().unwrap();
        let version = make_version(dir.path(), "wget", "1.0");
        optlink(&version).unwrap();
        let pkg = version.store.package("wget");
        unoptlink(&pkg).unwrap();
        assert!(!version.store.opt_path().join("wget").exists());
    }
}
