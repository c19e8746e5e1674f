//! Machine profile detection: the facts the formula parser (`formula.rs`) evaluates
//! `on_<block>`/`depends_on ... if` clauses against, plus bottle-tag detection for the
//! downloader.

use anyhow::{Context, Result};
use std::process::Command;

/// macOS codename -> version table, oldest first. Order matters for the `_or_older`/
/// `_or_newer` lexicographic comparisons in `formula.rs`.
pub const ALL_OS: &[(&str, &str)] = &[
    ("yosemite", "10.10"),
    ("el_capitan", "10.11"),
    ("sierra", "10.12"),
    ("high_sierra", "10.13"),
    ("mojave", "10.14"),
    ("catalina", "10.15"),
    ("big_sur", "11"),
    ("monterey", "12"),
    ("ventura", "13"),
    ("sonoma", "14"),
    ("sequoia", "15"),
    ("tahoe", "26"),
];

pub fn codename_version(name: &str) -> Option<&'static str> {
    ALL_OS.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
}

/// The current machine's profile, as consulted by the formula parser. Threaded through
/// explicitly rather than read from globals (unlike the Python original's `Arch` class
/// attributes), so tests can construct arbitrary profiles.
#[derive(Debug, Clone)]
pub struct MachineProfile {
    pub is_mac: bool,
    pub is_arm: bool,
    /// e.g. "14.5", "11", "10.13"
    pub os_version: String,
    pub clang_version: Vec<u32>,
    pub gcc_version: Vec<u32>,
    pub xcode_version: Vec<u32>,
}

impl MachineProfile {
    /// Detect the real machine profile by shelling out to `sw_vers`/`clang`/`gcc`/
    /// `xcodebuild`. Missing tools are treated as version `[0]`.
    pub fn detect() -> Result<Self> {
        let is_mac = cfg!(target_os = "macos");
        let is_arm = std::env::consts::ARCH == "aarch64";
        let os_version = if is_mac {
            macos_version().unwrap_or_else(|_| "0".to_string())
        } else {
            "0".to_string()
        };

        Ok(Self {
            is_mac,
            is_arm,
            os_version,
            clang_version: probe_version("clang", &["--version"], r"clang-([\d.]+)")
                .unwrap_or_default(),
            gcc_version: probe_version("gcc", &["-v"], r"gcc version ([\d.]+)").unwrap_or_default(),
            xcode_version: probe_version("xcodebuild", &["-version"], r"Xcode ([\d.]+)")
                .unwrap_or_default(),
        })
    }

    pub fn has_xcode_version(&self, min: &[u32]) -> bool {
        if self.xcode_version.is_empty() {
            return min.is_empty() || min.iter().all(|&x| x == 0);
        }
        self.xcode_version.as_slice() >= min
    }
}

fn probe_version(bin: &str, args: &[&str], pattern: &str) -> Result<Vec<u32>> {
    let output = Command::new(bin).args(args).output();
    let Ok(output) = output else {
        return Ok(vec![0]);
    };
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let re = regex::Regex::new(pattern).context("bad version regex")?;
    let Some(caps) = re.captures(&text) else {
        return Ok(vec![0]);
    };
    Ok(caps[1]
        .split('.')
        .filter_map(|s| s.parse().ok())
        .collect())
}

#[cfg(target_os = "macos")]
fn macos_version() -> Result<String> {
    let output = Command::new("sw_vers")
        .arg("-productVersion")
        .output()
        .context("Failed to run sw_vers")?;
    let version = String::from_utf8(output.stdout)
        .context("Invalid UTF-8 in sw_vers output")?
        .trim()
        .to_string();
    // "10.15.7" -> "10.15"; "14.5" -> "14" to match Arch.ALL_OS's major-only keys above 10.x
    let parts: Vec<&str> = version.split('.').collect();
    if parts.first() == Some(&"10") {
        Ok(format!("10.{}", parts.get(1).copied().unwrap_or("0")))
    } else {
        Ok(parts.first().copied().unwrap_or("0").to_string())
    }
}

#[cfg(not(target_os = "macos"))]
fn macos_version() -> Result<String> {
    anyhow::bail!("not macOS")
}

/// Detect the platform tag used to select a bottle file from the formula API response
/// (`[arm64_]<codename>`).
pub fn detect_bottle_tag(profile: &MachineProfile) -> Result<String> {
    if !profile.is_mac {
        anyhow::bail!("unsupported platform: Mach-O bottles require macOS");
    }
    let codename = ALL_OS
        .iter()
        .find(|(_, v)| *v == profile.os_version)
        .map(|(n, _)| *n)
        .unwrap_or("sonoma");
    let prefix = if profile.is_arm { "arm64_" } else { "" };
    Ok(format!("{prefix}{codename}"))
}

/// Detect the OCI platform key (`<cpu>|<os>|macOS <x.y>`).
pub fn detect_ghcr_platform(profile: &MachineProfile) -> String {
    let cpu = if profile.is_arm { "arm64" } else { "amd64" };
    let os = if profile.is_mac { "darwin" } else { "linux" };
    format!("{cpu}|{os}|macOS {}", profile.os_version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codename_table_ordered() {
        assert_eq!(codename_version("sonoma"), Some("14"));
        assert_eq!(codename_version("yosemite"), Some("10.10"));
        assert_eq!(codename_version("nonexistent"), None);
    }

    #[test]
    fn test_bottle_tag() {
        let profile = MachineProfile {
            is_mac: true,
            is_arm: true,
            os_version: "14".to_string(),
            clang_version: vec![],
            gcc_version: vec![],
            xcode_version: vec![],
        };
        assert_eq!(detect_bottle_tag(&profile).unwrap(), "arm64_sonoma");
    }

    #[test]
    fn test_ghcr_platform() {
        let profile = MachineProfile {
            is_mac: true,
            is_arm: false,
            os_version: "13".to_string(),
            clang_version: vec![],
            gcc_version: vec![],
            xcode_version: vec![],
        };
        assert_eq!(detect_ghcr_platform(&profile), "amd64|darwin|macOS 13");
    }
}
