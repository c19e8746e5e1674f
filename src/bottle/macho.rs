//! Mach-O binary relocation: normalize install names and dependency references to
//! `@loader_path`-relative paths so bottled binaries stay relocatable wherever the store
//! root ends up, delete every rpath baked in by the bottling host, then re-sign ad-hoc so
//! Gatekeeper doesn't reject the now-modified binary.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

const PREFIX_TOKEN: &str = "@@HOMEBREW_PREFIX@@";
const CELLAR_TOKEN: &str = "@@HOMEBREW_CELLAR@@";

/// Rewrite every Mach-O file under `version_dir` to reference its dependencies via
/// `@loader_path`-relative paths, then re-sign. Each file is independent, so this fans
/// out across `rayon`'s global pool.
pub fn relocate_tree(version_dir: &Path, prefix: &Path, cellar: &Path) -> Result<()> {
    let files = find_mach_o_files(version_dir)?;
    files
        .par_iter()
        .map(|file| relocate_file(file, prefix, cellar))
        .collect::<Result<Vec<()>>>()?;
    Ok(())
}

fn find_mach_o_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let all_files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .max_open(64)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.path().to_path_buf())
        .collect();

    Ok(all_files
        .into_par_iter()
        .filter(|path| is_mach_o(path).unwrap_or(false))
        .collect())
}

fn is_mach_o(path: &Path) -> Result<bool> {
    use std::io::Read;
    let mut file = match fs::File::open(path) {
        Ok(f) => f,
        Err(_) => return Ok(false),
    };
    let mut bytes = [0u8; 4];
    if file.read_exact(&mut bytes).is_err() {
        return Ok(false);
    }
    let magic = u32::from_ne_bytes(bytes);
    Ok(matches!(
        magic,
        0xfeedface | 0xfeedfacf | 0xcefaedfe | 0xcffaedfe
    ))
}

fn relocate_file(path: &Path, prefix: &Path, cellar: &Path) -> Result<()> {
    let rpaths = read_rpaths(path)?;
    rewrite_dependency_paths(path, prefix, cellar, &rpaths)?;

    if path.extension().map(|e| e == "dylib").unwrap_or(false) {
        fix_library_id(path)?;
    }

    delete_all_rpaths(path, &rpaths)?;
    codesign_ad_hoc(path)?;
    Ok(())
}

/// Resolve one `otool -L` entry to the absolute on-disk file it names. Returns `None` for
/// plain absolute system paths (left alone) and for placeholder/loader-relative
/// references that don't resolve to anything on disk (warned and skipped).
fn resolve_dependency_reference(
    reference: &str,
    file: &Path,
    prefix: &Path,
    cellar: &Path,
    rpaths: &[String],
) -> Option<PathBuf> {
    let prefix_str = prefix.to_str()?;
    let cellar_str = cellar.to_str()?;

    let candidate = if let Some(rest) = reference.strip_prefix(PREFIX_TOKEN) {
        PathBuf::from(format!("{prefix_str}{rest}"))
    } else if let Some(rest) = reference.strip_prefix(CELLAR_TOKEN) {
        PathBuf::from(format!("{cellar_str}{rest}"))
    } else if let Some(rest) = reference.strip_prefix("@loader_path/") {
        file.parent().unwrap_or(file).join(rest)
    } else if let Some(rest) = reference.strip_prefix("@rpath/") {
        rpaths
            .iter()
            .map(|rpath| rpath_base(rpath, file).join(rest))
            .find(|p| p.exists())?
    } else {
        return None;
    };

    if !candidate.exists() {
        tracing::warn!(
            "cannot resolve dependency reference {reference} in {}: no such file",
            file.display()
        );
        return None;
    }

    Some(via_opt_path(&candidate, prefix, cellar).unwrap_or(candidate))
}

fn rpath_base(rpath: &str, file: &Path) -> PathBuf {
    if let Some(rest) = rpath.strip_prefix("@loader_path/") {
        file.parent().unwrap_or(file).join(rest)
    } else {
        PathBuf::from(rpath)
    }
}

/// If `resolved` lives under `<cellar>/<pkg>/<version>/...`, prefer the stable
/// `opt/<pkg>/...` form so the relative reference this produces still resolves after that
/// dependency gets upgraded to a different version directory.
fn via_opt_path(resolved: &Path, prefix: &Path, cellar: &Path) -> Option<PathBuf> {
    let rest = resolved.strip_prefix(cellar).ok()?;
    let mut parts = rest.components();
    let pkg = parts.next()?;
    parts.next()?; // version component, not part of the opt path
    let remainder: PathBuf = parts.collect();
    let candidate = prefix.join("opt").join(pkg).join(&remainder);
    candidate.exists().then_some(candidate)
}

/// Build the relative path from `file`'s own directory to `target`, for use after
/// `@loader_path/`.
fn relative_from(file: &Path, target: &Path) -> PathBuf {
    let base = file.parent().unwrap_or(file);
    let mut base_components: Vec<_> = base.components().collect();
    let mut target_components: Vec<_> = target.components().collect();

    let mut common = 0;
    while common < base_components.len()
        && common < target_components.len()
        && base_components[common] == target_components[common]
    {
        common += 1;
    }
    base_components.drain(..common);
    target_components.drain(..common);

    let mut result = PathBuf::new();
    for _ in &base_components {
        result.push("..");
    }
    for comp in target_components {
        result.push(comp);
    }
    result
}

fn rewrite_dependency_paths(path: &Path, prefix: &Path, cellar: &Path, rpaths: &[String]) -> Result<()> {
    let output = Command::new("otool")
        .arg("-L")
        .arg(path)
        .output()
        .context("failed to run otool -L")?;
    let otool_output = String::from_utf8_lossy(&output.stdout);

    let mut changes: Vec<(String, String)> = Vec::new();
    for line in otool_output.lines().skip(1) {
        let line = line.trim();
        let Some(old_ref) = line.split('(').next().map(str::trim) else {
            continue;
        };
        if old_ref.is_empty() {
            continue;
        }
        let Some(resolved) = resolve_dependency_reference(old_ref, path, prefix, cellar, rpaths) else {
            continue;
        };
        let new_ref = format!("@loader_path/{}", relative_from(path, &resolved).display());
        changes.push((old_ref.to_string(), new_ref));
    }

    if changes.is_empty() {
        return Ok(());
    }
    let mut args: Vec<&str> = Vec::with_capacity(changes.len() * 3);
    for (old, new) in &changes {
        args.push("-change");
        args.push(old);
        args.push(new);
    }
    run_install_name_tool(&args, path)?;
    Ok(())
}

/// Normalize the library's own install name (`LC_ID_DYLIB`) to `@loader_path/<basename>`.
fn fix_library_id(path: &Path) -> Result<()> {
    let output = Command::new("otool")
        .arg("-D")
        .arg(path)
        .output()
        .context("failed to run otool -D")?;
    let otool_output = String::from_utf8_lossy(&output.stdout);
    let Some(old_id) = otool_output.lines().nth(1).map(str::trim) else {
        return Ok(());
    };
    let Some(basename) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(());
    };
    let new_id = format!("@loader_path/{basename}");
    if old_id != new_id {
        run_install_name_tool(&["-id", &new_id], path)?;
    }
    Ok(())
}

/// Parse every `LC_RPATH` entry, in load-command order, before any of them get deleted.
fn read_rpaths(path: &Path) -> Result<Vec<String>> {
    let output = Command::new("otool")
        .arg("-l")
        .arg(path)
        .output()
        .context("failed to run otool -l")?;
    let text = String::from_utf8_lossy(&output.stdout);

    let mut rpaths = Vec::new();
    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        if line.trim() != "cmd LC_RPATH" {
            continue;
        }
        for l in lines.by_ref().take(2) {
            if let Some(path_val) = l.trim().strip_prefix("path ") {
                let rpath = path_val.split(" (offset").next().unwrap_or(path_val).trim();
                rpaths.push(rpath.to_string());
                break;
            }
        }
    }
    Ok(rpaths)
}

/// Delete every rpath unconditionally. A stale rpath from the bottling host would
/// otherwise shadow the loader-relative references just rewritten above.
fn delete_all_rpaths(path: &Path, rpaths: &[String]) -> Result<()> {
    for rpath in rpaths {
        let _ = Command::new("install_name_tool")
            .arg("-delete_rpath")
            .arg(rpath)
            .arg(path)
            .output();
    }
    Ok(())
}

fn codesign_ad_hoc(path: &Path) -> Result<()> {
    let output = Command::new("codesign")
        .args(["--force", "--sign", "-"])
        .arg(path)
        .output();
    if let Ok(output) = output {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.contains("warning:") {
                tracing::warn!("ad-hoc codesign failed for {}: {}", path.display(), stderr);
            }
        }
    }
    Ok(())
}

fn run_install_name_tool(args: &[&str], path: &Path) -> Result<()> {
    let output = Command::new("install_name_tool")
        .args(args)
        .arg(path)
        .output()
        .context("failed to run install_name_tool")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.contains("warning:") {
            tracing::warn!("install_name_tool failed for {}: {}", path.display(), stderr);
        }
    }
    Ok(())
}
