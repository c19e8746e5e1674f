//! `config.ini` loading: the `[install]` and `[cleanup]` sections that govern default
//! link behavior and cache eviction age.

use crate::error::{KegError, Result};
use ini::Ini;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_INI: &str = "\
[install]
link_bin_primary = yes
link_bin_dependency = no

[cleanup]
download = 21d
cache = 5d
auth = 365d
";

#[derive(Debug, Clone)]
pub struct Config {
    pub link_bin_primary: bool,
    pub link_bin_dependency: bool,
    pub cleanup_download: Duration,
    pub cleanup_cache: Duration,
    pub cleanup_auth: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            link_bin_primary: true,
            link_bin_dependency: false,
            cleanup_download: parse_duration("21d").unwrap(),
            cleanup_cache: parse_duration("5d").unwrap(),
            cleanup_auth: parse_duration("365d").unwrap(),
        }
    }
}

impl Config {
    /// Load `<root>/config.ini`, writing the defaults shown in the module docs if the
    /// file doesn't exist yet.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join("config.ini");
        if !path.exists() {
            std::fs::write(&path, DEFAULT_INI)?;
        }
        Self::from_path(&path)
    }

    fn from_path(path: &PathBuf) -> Result<Self> {
        let ini = Ini::load_from_file(path)
            .map_err(|e| KegError::ConfigError(format!("{}: {e}", path.display())))?;

        let mut cfg = Config::default();

        if let Some(section) = ini.section(Some("install")) {
            if let Some(v) = section.get("link_bin_primary") {
                cfg.link_bin_primary = parse_bool(v)?;
            }
            if let Some(v) = section.get("link_bin_dependency") {
                cfg.link_bin_dependency = parse_bool(v)?;
            }
        }

        if let Some(section) = ini.section(Some("cleanup")) {
            if let Some(v) = section.get("download") {
                cfg.cleanup_download = parse_duration(v)?;
            }
            if let Some(v) = section.get("cache") {
                cfg.cleanup_cache = parse_duration(v)?;
            }
            if let Some(v) = section.get("auth") {
                cfg.cleanup_auth = parse_duration(v)?;
            }
        }

        Ok(cfg)
    }
}

fn parse_bool(v: &str) -> Result<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" | "on" => Ok(true),
        "no" | "false" | "0" | "off" => Ok(false),
        other => Err(KegError::ConfigError(format!("not a boolean: {other}"))),
    }
}

/// Parse a duration string: an integer followed by `s|m|h|d`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let (digits, suffix) = s.split_at(s.len().saturating_sub(1));
    let n: u64 = digits
        .parse()
        .map_err(|_| KegError::ConfigError(format!("bad duration: {s}")))?;
    let secs = match suffix {
        "s" => n,
        "m" => n * 60,
        "h" => n * 3600,
        "d" => n * 86400,
        other => {
            return Err(KegError::ConfigError(format!(
                "bad duration suffix: {other}"
            )));
        }
    };
    Ok(Duration::from_secs(secs))
}
