//! Regression tests pinning bugs discovered during development. Each documents the bug,
//! its cause, and the invariant that now prevents it from recurring.


use test_helpers::TestEnvironment;

/// BUG: a package with several installed versions was enumerated once per version
/// instead of once per package, inflating `outdated`/`upgrade` package counts.
/// CAUSE: the old store layout kept versions as separate top-level entries.
/// FIX: `Store::installed_names` walks one directory per package name; versions live
/// one level down under `versions_of`, so a package never appears twice here.
#[test]
fn installed_names_lists_each_package_once_regardless_of_version_count() {
    let env = TestEnvironment::new();
    env.install_fake("mosh", "1.4.0", &[]);
    env.install_fake("mosh", "1.4.1", &[]);
    env.install_fake("gh", "2.40.0", &[]);

    let names = env.store.installed_names();
    let mosh_count = names.iter().filter(|n| n.as_str() == "mosh").count();

    assert_eq!(mosh_count, 1, "mosh should be listed once even with two versions installed");
    assert_eq!(names.len(), 2);
}

// Bottle-revision-suffix equivalence (`1.4.0_32` vs `1.4.0`) is covered by
// `commands::strip_bottle_revision`'s own unit tests in `src/commands/mod.rs`.
