//! A line-oriented parser for the dependency-relevant subset of the recipe file syntax
//! stored at `.brew/<pkg>.rb` inside an installed keg: `depends_on`, `uses_from_macos`,
//! and the `on_<block> do ... end` conditionals that gate them by architecture or OS
//! version. Anything outside that subset (install steps, resources, tests) is skipped.
//! A bare `depends_on :<sym>` or `depends_on <action>: <token>` names a platform
//! requirement rather than a dependency; unmet ones are recorded in `invalid_arch`.

use crate::error::{KegError, Result};
use crate::platform::MachineProfile;
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyKind {
    Required,
    /// Build-time only: `:build` and `:test` targets both map here, since neither
    /// belongs in the runtime dependency graph.
    Build,
    Optional,
    Recommended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub kind: DependencyKind,
}

#[derive(Debug, Clone, Default)]
pub struct Formula {
    pub name: String,
    pub dependencies: Vec<Dependency>,
    pub homepage: Option<String>,
    pub keg_only_reason: Option<String>,
    /// Unmet platform requirements (`depends_on :<sym>` / `depends_on <action>: <token>`),
    /// as human-readable reasons. Non-empty means this recipe can't actually run here.
    pub invalid_arch: Vec<String>,
}

fn re_class() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^class\s+(\w+)\s*<\s*Formula"#).unwrap())
}

fn re_homepage() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*homepage\s+"([^"]*)""#).unwrap())
}

fn re_keg_only() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*keg_only\s+(?::(\w+)|"([^"]*)")"#).unwrap())
}

/// `on_<kind> [args] do` — `args` is captured raw (everything between the block name and
/// the trailing `do`) so `eval_on_block` can parse it per-kind: a bare `:symbol`
/// (`on_arch :arm`), a comma-separated clause list (`on_system :linux, macos: :sonoma`),
/// or nothing at all (`on_macos do`).
fn re_block_open() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*on_(\w+)(?:\s+(.+?))?\s+do\b"#).unwrap())
}

fn re_block_close() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*end\b"#).unwrap())
}

fn re_depends() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*depends_on\s+"([^"]+)"(?:\s*=>\s*:(\w+))?(?:\s+if\s+(.+))?"#).unwrap()
    })
}

/// `depends_on :<sym>` or `depends_on <action>: (:<sym>|"<str>")` — a platform
/// requirement, not a dependency. Distinct from [`re_depends`], which only matches a
/// quoted package name as the first argument.
fn re_depends_requirement() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*depends_on\s+(?:(\w+):\s*(?::(\w+)|"([^"]*)")|:(\w+))\s*$"#).unwrap()
    })
}

fn re_uses() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*uses_from_macos\s+"([^"]+)"(?:\s*=>\s*:(\w+))?(?:\s*,\s*since:\s*:(\w+))?"#)
            .unwrap()
    })
}

fn version_parts(v: &str) -> Vec<u32> {
    v.split('.').filter_map(|s| s.parse().ok()).collect()
}

fn version_at_least(current: &str, min: &str) -> bool {
    version_parts(current) >= version_parts(min)
}

/// Evaluate a bare `on_<codename>[_or_older|_or_newer]` token against the running
/// machine. Plain `on_<codename>` means exact equality; the `_or_older`/`_or_newer`
/// suffixes switch to an ordered comparison. Returns `None` if `codename` isn't in the
/// table at all, so the caller can fall back to the "unrecognized block" default.
fn eval_codename_clause(raw: &str, profile: &MachineProfile) -> Option<bool> {
    let (codename, older, newer) = if let Some(c) = raw.strip_suffix("_or_older") {
        (c, true, false)
    } else if let Some(c) = raw.strip_suffix("_or_newer") {
        (c, false, true)
    } else {
        (raw, false, false)
    };
    let target = crate::platform::codename_version(codename)?;
    if !profile.is_mac {
        return Some(false);
    }
    let current = version_parts(&profile.os_version);
    let target = version_parts(target);
    Some(if older {
        current <= target
    } else if newer {
        current >= target
    } else {
        current == target
    })
}

/// Evaluate one comma-separated `on_system` clause: `:linux`, `:macos`, or
/// `macos: :<codename>[_or_older|_or_newer]`.
fn eval_system_clause(clause: &str, profile: &MachineProfile) -> bool {
    let clause = clause.trim();
    if let Some(rest) = clause.strip_prefix("macos:") {
        let codename = rest.trim().trim_start_matches(':').trim();
        return eval_codename_clause(codename, profile).unwrap_or(false);
    }
    match clause.trim_start_matches(':') {
        "linux" => !profile.is_mac,
        "macos" => profile.is_mac,
        other => {
            tracing::warn!("unrecognized on_system clause: {other}");
            true
        }
    }
}

/// Evaluate an `on_<block>` header against the running machine. An unrecognized block
/// warns and evaluates to true, matching the conservative bias toward over-inclusion
/// rather than silently dropping a dependency a real-world recipe needs.
fn eval_on_block(kind: &str, arg: Option<&str>, profile: &MachineProfile) -> bool {
    match kind {
        "macos" => profile.is_mac,
        "linux" => !profile.is_mac,
        "arm" => profile.is_arm,
        "intel" => profile.is_mac && !profile.is_arm,
        "arch" => match arg.map(|a| a.trim().trim_start_matches(':')) {
            Some("arm") => profile.is_arm,
            Some("intel") => !profile.is_arm,
            other => {
                tracing::warn!("unrecognized on_arch argument: {other:?}");
                true
            }
        },
        "system" => arg
            .map(|a| a.split(',').any(|clause| eval_system_clause(clause, profile)))
            .unwrap_or(false),
        other => eval_codename_clause(other, profile).unwrap_or_else(|| {
            tracing::warn!("unrecognized on_ block: on_{other}");
            true
        }),
    }
}

/// Evaluate a `depends_on "x" if <cond>` trailing condition. Supports the handful of
/// forms the recipe corpus actually uses: `build.with?`/`build.without?` against the
/// caller-selected option set, and `MacOS.version >= :codename` comparisons.
fn eval_if_condition(cond: &str, profile: &MachineProfile, options: &HashSet<String>) -> bool {
    let cond = cond.trim().trim_end_matches(|c| c == '\n' || c == '\r');

    if let Some(opt) = cond
        .strip_prefix("build.with?(\"")
        .or_else(|| cond.strip_prefix("build.with? \""))
    {
        let opt = opt.trim_end_matches(['"', ')']);
        return options.contains(opt);
    }
    if let Some(opt) = cond
        .strip_prefix("build.without?(\"")
        .or_else(|| cond.strip_prefix("build.without? \""))
    {
        let opt = opt.trim_end_matches(['"', ')']);
        return !options.contains(opt);
    }
    if let Some(rest) = cond.strip_prefix("MacOS.version >= :") {
        let codename = rest.trim();
        if let Some(min) = crate::platform::codename_version(codename) {
            return profile.is_mac && version_at_least(&profile.os_version, min);
        }
    }
    if let Some(rest) = cond.strip_prefix("MacOS.version <= :") {
        let codename = rest.trim();
        if let Some(max) = crate::platform::codename_version(codename) {
            return profile.is_mac && !version_at_least(&profile.os_version, max) || profile.os_version == max;
        }
    }
    // unrecognized guard: conservatively include the dependency rather than silently
    // dropping something real-world recipes need.
    true
}

/// Evaluate a bare `depends_on :xcode`-style platform requirement.
fn eval_bare_requirement(sym: &str, profile: &MachineProfile) -> Option<String> {
    match sym {
        "macos" if !profile.is_mac => Some("requires macOS".to_string()),
        "linux" if profile.is_mac => Some("requires Linux".to_string()),
        "xcode" if profile.is_mac && profile.xcode_version.iter().all(|&v| v == 0) => {
            Some("requires Xcode".to_string())
        }
        _ => None,
    }
}

/// Evaluate a `depends_on <action>: <token>`-style platform requirement.
fn eval_action_requirement(action: &str, value: &str, profile: &MachineProfile) -> Option<String> {
    match action {
        "arch" => match value {
            "arm64" if !profile.is_arm => Some("requires arm64".to_string()),
            "x86_64" if profile.is_arm => Some("requires x86_64".to_string()),
            _ => None,
        },
        "macos" => {
            if !profile.is_mac {
                return Some(format!("requires macOS {value}"));
            }
            let min = crate::platform::codename_version(value)?;
            if version_parts(&profile.os_version) < version_parts(min) {
                Some(format!("requires macOS {value} or newer"))
            } else {
                None
            }
        }
        "maximum_macos" => {
            if !profile.is_mac {
                return None;
            }
            let max = crate::platform::codename_version(value)?;
            if version_parts(&profile.os_version) > version_parts(max) {
                Some(format!("requires macOS {value} or older"))
            } else {
                None
            }
        }
        "xcode" => {
            if profile.is_mac && profile.xcode_version < version_parts(value) {
                Some(format!("requires Xcode {value}"))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn eval_platform_requirement(caps: &Captures, profile: &MachineProfile) -> Option<String> {
    if let Some(sym) = caps.get(4) {
        return eval_bare_requirement(sym.as_str(), profile);
    }
    let action = caps.get(1)?.as_str();
    let value = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str())?;
    eval_action_requirement(action, value, profile)
}

/// Parse the recipe text into a [`Formula`], resolving every conditional against
/// `profile` and `options` so the result only contains dependencies that actually apply.
pub fn parse(text: &str, profile: &MachineProfile, options: &HashSet<String>) -> Result<Formula> {
    let mut formula = Formula::default();
    // stack of whether each enclosing on_<block> is currently active
    let mut block_stack: Vec<bool> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') || trimmed.is_empty() {
            continue;
        }

        if let Some(caps) = re_class().captures(line) {
            formula.name = caps[1].to_string();
            continue;
        }

        if let Some(caps) = re_block_open().captures(line) {
            let active = block_stack.iter().all(|b| *b);
            let this_block = eval_on_block(&caps[1], caps.get(2).map(|m| m.as_str()), profile);
            block_stack.push(active && this_block);
            continue;
        }
        if re_block_close().is_match(line) {
            block_stack.pop();
            continue;
        }

        let active = block_stack.iter().all(|b| *b);
        if !active {
            continue;
        }

        if let Some(caps) = re_homepage().captures(line) {
            formula.homepage = Some(caps[1].to_string());
            continue;
        }
        if let Some(caps) = re_keg_only().captures(line) {
            let reason = caps
                .get(1)
                .map(|m| m.as_str().to_string())
                .or_else(|| caps.get(2).map(|m| m.as_str().to_string()));
            formula.keg_only_reason = reason;
            continue;
        }
        if let Some(caps) = re_uses().captures(line) {
            let name = caps[1].to_string();
            let target = caps.get(2).map(|m| m.as_str());
            if matches!(target, Some("build") | Some("test") | Some("optional")) {
                continue;
            }
            let since = caps.get(3).map(|m| m.as_str());
            let include = if !profile.is_mac {
                true
            } else if let Some(codename) = since {
                crate::platform::codename_version(codename)
                    .map(|min| version_parts(&profile.os_version) < version_parts(min))
                    .unwrap_or(false)
            } else {
                false
            };
            if include {
                formula.dependencies.push(Dependency {
                    name,
                    kind: DependencyKind::Required,
                });
            }
            continue;
        }
        if let Some(caps) = re_depends().captures(line) {
            let name = caps[1].to_string();
            let kind = match caps.get(2).map(|m| m.as_str()) {
                Some("build") => DependencyKind::Build,
                Some("test") => DependencyKind::Build,
                Some("optional") => DependencyKind::Optional,
                Some("recommended") => DependencyKind::Recommended,
                _ => DependencyKind::Required,
            };
            if let Some(cond) = caps.get(3) {
                if !eval_if_condition(cond.as_str(), profile, options) {
                    continue;
                }
            }
            formula.dependencies.push(Dependency { name, kind });
            continue;
        }
        if let Some(caps) = re_depends_requirement().captures(line) {
            if let Some(reason) = eval_platform_requirement(&caps, profile) {
                formula.invalid_arch.push(reason);
            }
        }
    }

    if formula.name.is_empty() {
        return Err(KegError::Other(anyhow::anyhow!(
            "recipe has no `class ... < Formula` declaration"
        )));
    }

    Ok(formula)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac_profile(version: &str, arm: bool) -> MachineProfile {
        MachineProfile {
            is_mac: true,
            is_arm: arm,
            os_version: version.to_string(),
            clang_version: vec![],
            gcc_version: vec![],
            xcode_version: vec![],
        }
    }

    fn linux_profile() -> MachineProfile {
        MachineProfile {
            is_mac: false,
            is_arm: false,
            os_version: "0".to_string(),
            clang_version: vec![],
            gcc_version: vec![],
            xcode_version: vec![],
        }
    }

    #[test]
    fn test_basic_depends_on() {
        let text = "class Wget < Formula\n  homepage \"https://example.com\"\n  depends_on \"openssl\"\n  depends_on \"pkg-config\" => :build\nend\n";
        let formula = parse(text, &mac_profile("14", false), &HashSet::new()).unwrap();
        assert_eq!(formula.name, "Wget");
        assert_eq!(formula.homepage.as_deref(), Some("https://example.com"));
        assert_eq!(formula.dependencies.len(), 2);
        assert_eq!(formula.dependencies[0].kind, DependencyKind::Required);
        assert_eq!(formula.dependencies[1].kind, DependencyKind::Build);
    }

    #[test]
    fn test_on_arm_block_filters_dependency() {
        let text = "class Foo < Formula\n  on_arm do\n    depends_on \"arm-only\"\n  end\n  on_intel do\n    depends_on \"intel-only\"\n  end\nend\n";
        let arm = parse(text, &mac_profile("14", true), &HashSet::new()).unwrap();
        assert_eq!(arm.dependencies.len(), 1);
        assert_eq!(arm.dependencies[0].name, "arm-only");

        let intel = parse(text, &mac_profile("14", false), &HashSet::new()).unwrap();
        assert_eq!(intel.dependencies.len(), 1);
        assert_eq!(intel.dependencies[0].name, "intel-only");
    }

    #[test]
    fn test_on_arch_block() {
        let text = "class Foo < Formula\n  on_arch :arm do\n    depends_on \"arm-only\"\n  end\n  on_arch :intel do\n    depends_on \"intel-only\"\n  end\nend\n";
        let arm = parse(text, &mac_profile("14", true), &HashSet::new()).unwrap();
        assert_eq!(arm.dependencies.len(), 1);
        assert_eq!(arm.dependencies[0].name, "arm-only");

        let intel = parse(text, &mac_profile("14", false), &HashSet::new()).unwrap();
        assert_eq!(intel.dependencies.len(), 1);
        assert_eq!(intel.dependencies[0].name, "intel-only");
    }

    #[test]
    fn test_on_system_any_clause_matches() {
        let text = "class Foo < Formula\n  on_system :linux, macos: :sonoma_or_newer do\n    depends_on \"modern\"\n  end\nend\n";
        let linux = parse(text, &linux_profile(), &HashSet::new()).unwrap();
        assert_eq!(linux.dependencies.len(), 1);

        let old_mac = parse(text, &mac_profile("12", false), &HashSet::new()).unwrap();
        assert!(old_mac.dependencies.is_empty());

        let new_mac = parse(text, &mac_profile("15", false), &HashSet::new()).unwrap();
        assert_eq!(new_mac.dependencies.len(), 1);
    }

    #[test]
    fn test_on_codename_block_is_exact_not_minimum() {
        let text = "class Foo < Formula\n  on_sonoma do\n    depends_on \"sonoma-only\"\n  end\nend\n";
        let sonoma = parse(text, &mac_profile("14", false), &HashSet::new()).unwrap();
        assert_eq!(sonoma.dependencies.len(), 1);

        let sequoia = parse(text, &mac_profile("15", false), &HashSet::new()).unwrap();
        assert!(sequoia.dependencies.is_empty(), "on_sonoma should not match a newer OS");
    }

    #[test]
    fn test_on_codename_or_newer_suffix() {
        let text = "class Foo < Formula\n  on_sonoma_or_newer do\n    depends_on \"modern-only\"\n  end\nend\n";
        let sequoia = parse(text, &mac_profile("15", false), &HashSet::new()).unwrap();
        assert_eq!(sequoia.dependencies.len(), 1);

        let ventura = parse(text, &mac_profile("13", false), &HashSet::new()).unwrap();
        assert!(ventura.dependencies.is_empty());
    }

    #[test]
    fn test_macos_version_guard() {
        let text = "class Foo < Formula\n  depends_on \"new-lib\" if MacOS.version >= :sonoma\nend\n";
        let old = parse(text, &mac_profile("12", false), &HashSet::new()).unwrap();
        assert!(old.dependencies.is_empty());

        let new = parse(text, &mac_profile("14", false), &HashSet::new()).unwrap();
        assert_eq!(new.dependencies.len(), 1);
    }

    #[test]
    fn test_build_with_option() {
        let text = "class Foo < Formula\n  depends_on \"extra\" if build.with?(\"extra\")\nend\n";
        let without = parse(text, &mac_profile("14", false), &HashSet::new()).unwrap();
        assert!(without.dependencies.is_empty());

        let mut opts = HashSet::new();
        opts.insert("extra".to_string());
        let with = parse(text, &mac_profile("14", false), &opts).unwrap();
        assert_eq!(with.dependencies.len(), 1);
    }

    #[test]
    fn test_test_target_is_build_time_only() {
        let text = "class Foo < Formula\n  depends_on \"check\" => :test\nend\n";
        let formula = parse(text, &mac_profile("14", false), &HashSet::new()).unwrap();
        assert_eq!(formula.dependencies[0].kind, DependencyKind::Build);
    }

    #[test]
    fn test_uses_from_macos_always_included_on_linux() {
        let text = "class Foo < Formula\n  uses_from_macos \"zlib\"\nend\n";
        let formula = parse(text, &linux_profile(), &HashSet::new()).unwrap();
        assert_eq!(formula.dependencies.len(), 1);
        assert_eq!(formula.dependencies[0].name, "zlib");
    }

    #[test]
    fn test_uses_from_macos_skipped_on_macos_without_since() {
        let text = "class Foo < Formula\n  uses_from_macos \"zlib\"\nend\n";
        let formula = parse(text, &mac_profile("14", false), &HashSet::new()).unwrap();
        assert!(formula.dependencies.is_empty());
    }

    #[test]
    fn test_uses_from_macos_since_clause() {
        let text = "class Foo < Formula\n  uses_from_macos \"libffi\", since: :catalina\nend\n";
        let old = parse(text, &mac_profile("10.13", false), &HashSet::new()).unwrap();
        assert_eq!(old.dependencies.len(), 1);

        let new = parse(text, &mac_profile("14", false), &HashSet::new()).unwrap();
        assert!(new.dependencies.is_empty());
    }

    #[test]
    fn test_uses_from_macos_skips_build_target() {
        let text = "class Foo < Formula\n  uses_from_macos \"zlib\" => :build\nend\n";
        let formula = parse(text, &linux_profile(), &HashSet::new()).unwrap();
        assert!(formula.dependencies.is_empty());
    }

    #[test]
    fn test_depends_on_bare_symbol_requirement() {
        let text = "class Foo < Formula\n  depends_on :linux\nend\n";
        let formula = parse(text, &mac_profile("14", false), &HashSet::new()).unwrap();
        assert!(formula.dependencies.is_empty());
        assert_eq!(formula.invalid_arch, vec!["requires Linux".to_string()]);
    }

    #[test]
    fn test_depends_on_xcode_requirement_unmet_without_xcode() {
        let text = "class Foo < Formula\n  depends_on :xcode\nend\n";
        let formula = parse(text, &mac_profile("14", false), &HashSet::new()).unwrap();
        assert_eq!(formula.invalid_arch, vec!["requires Xcode".to_string()]);
    }

    #[test]
    fn test_depends_on_action_arch_requirement() {
        let text = "class Foo < Formula\n  depends_on arch: :arm64\nend\n";
        let intel = parse(text, &mac_profile("14", false), &HashSet::new()).unwrap();
        assert_eq!(intel.invalid_arch, vec!["requires arm64".to_string()]);

        let arm = parse(text, &mac_profile("14", true), &HashSet::new()).unwrap();
        assert!(arm.invalid_arch.is_empty());
    }

    #[test]
    fn test_depends_on_action_macos_version_requirement() {
        let text = "class Foo < Formula\n  depends_on macos: :sonoma\nend\n";
        let old = parse(text, &mac_profile("12", false), &HashSet::new()).unwrap();
        assert_eq!(old.invalid_arch.len(), 1);

        let new = parse(text, &mac_profile("14", false), &HashSet::new()).unwrap();
        assert!(new.invalid_arch.is_empty());
    }
}
