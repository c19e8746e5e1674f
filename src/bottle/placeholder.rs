//! Placeholder substitution in non-binary files (shell wrappers, `.pc` files, `.la`
//! files) that carry the same `@@HOMEBREW_PREFIX@@`/`@@HOMEBREW_CELLAR@@`/
//! `@@HOMEBREW_LIBRARY@@` tokens as Mach-O binaries, but as plain text. Mach-O files are
//! skipped here; those go through [`super::macho`].

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

const TOKENS: &[&str] = &[
    "@@HOMEBREW_PREFIX@@",
    "@@HOMEBREW_CELLAR@@",
    "@@HOMEBREW_LIBRARY@@",
];

/// Matches any `@@HOMEBREW_<KEY>@@` token, known or not, so an unrecognized one can be
/// reported rather than silently passed through (or silently missed).
fn re_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@@HOMEBREW_[A-Z_]+@@").unwrap())
}

/// Walk `version_dir`, rewriting any text file containing a placeholder token. Writes go
/// through a sibling `.brew-repl` temp file and an atomic rename so a crash mid-rewrite
/// never leaves a half-written file in place.
pub fn rewrite_tree(version_dir: &Path, prefix: &Path, cellar: &Path, library: &Path) -> Result<usize> {
    let prefix = prefix.to_string_lossy();
    let cellar = cellar.to_string_lossy();
    let library = library.to_string_lossy();

    let mut rewritten = 0;
    for entry in WalkDir::new(version_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let Ok(bytes) = fs::read(path) else { continue };
        if is_binary(&bytes) {
            continue;
        }
        let Ok(text) = String::from_utf8(bytes) else {
            continue;
        };
        let mut has_known = false;
        for m in re_placeholder().find_iter(&text) {
            if TOKENS.contains(&m.as_str()) {
                has_known = true;
            } else {
                tracing::warn!("unrecognized placeholder {} in {}", m.as_str(), path.display());
            }
        }
        if !has_known {
            continue;
        }

        let replaced = text
            .replace("@@HOMEBREW_PREFIX@@", prefix.as_ref())
            .replace("@@HOMEBREW_CELLAR@@", cellar.as_ref())
            .replace("@@HOMEBREW_LIBRARY@@", library.as_ref());

        write_atomic(path, &replaced)?;
        rewritten += 1;
    }
    Ok(rewritten)
}

fn is_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(8192).any(|&b| b == 0)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp: PathBuf = path.with_extension(match path.extension() {
        Some(ext) => format!("{}.brew-repl", ext.to_string_lossy()),
        None => "brew-repl".to_string(),
    });
    let perms = fs::metadata(path).ok().map(|m| m.permissions());

    fs::write(&tmp, contents).with_context(|| format!("writing {}", tmp.display()))?;
    if let Some(perms) = perms {
        fs::set_permissions(&tmp, perms)?;
    }
    fs::rename(&tmp, path).with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
