//! Version ordering (`store::compare_versions`) and the `cleanup` command's stale-version
//! selection, against a fabricated store.


use kegctl::store::compare_versions;
use std::cmp::Ordering;
use test_helpers::TestEnvironment;

#[test]
fn compare_versions_numeric() {
    assert_eq!(compare_versions("1.8.1", "1.7.0"), Ordering::Greater);
    assert_eq!(compare_versions("1.7.0", "1.8.1"), Ordering::Less);
}

#[test]
fn compare_versions_not_lexicographic() {
    // lexicographically "1.10.0" < "1.9.0", numerically it's the other way around
    assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
}

#[test]
fn compare_versions_falls_back_to_lexicographic_on_suffix() {
    assert_eq!(compare_versions("2.0.0-beta", "2.0.0-alpha"), Ordering::Greater);
}

#[test]
fn compare_versions_equal() {
    assert_eq!(compare_versions("1.0.0", "1.0.0"), Ordering::Equal);
}

/// `cleanup` keeps the active (opt-linked) version and removes the rest, regardless of
/// which one happens to sort highest.
#[test]
fn cleanup_keeps_active_version_only() {
    let env = TestEnvironment::new();
    let v170 = env.install_fake("jq", "1.7.0", &[]);
    env.install_fake("jq", "1.6.0", &[]);
    let v181 = env.install_fake("jq", "1.8.1", &[]);

    // opt-link the oldest version deliberately: cleanup must follow the active link, not
    // just keep the highest-sorting version.
    kegctl::link::optlink(&v170).unwrap();

    let pkg = env.package("jq");
    let active = pkg.active_version().unwrap();
    assert_eq!(active, "1.7.0");

    let stale: Vec<String> = pkg.versions().into_iter().filter(|v| v != &active).collect();
    assert_eq!(stale.len(), 2);
    assert!(stale.contains(&"1.6.0".to_string()));
    assert!(stale.contains(&"1.8.1".to_string()));

    // the highest version must still exist on disk until cleanup actually runs
    assert!(v181.path().exists());
}

/// A pinned package is entirely exempt from cleanup, even with multiple stale versions.
#[test]
fn cleanup_skips_pinned_packages() {
    let env = TestEnvironment::new();
    env.install_fake("node", "18.0.0", &[]);
    let v20 = env.install_fake("node", "20.0.0", &[]);
    kegctl::link::optlink(&v20).unwrap();

    let pkg = env.package("node");
    pkg.set_pinned(true).unwrap();

    assert!(pkg.is_pinned());
    // a pinned package with several versions is left entirely alone by `cleanup`; this
    // mirrors the check at the top of `commands::cleanup::cleanup`'s per-package loop.
    assert!(pkg.versions().len() > 1);
}
