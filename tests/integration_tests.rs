//! End-to-end scenarios exercised against a fabricated store (no network, no real
//! bottles) — the store/link/graph machinery wired together the way a command module
//! would drive it.


use kegctl::commands::Context;
use kegctl::{Api, Config, MachineProfile};
use std::collections::HashSet;
use test_helpers::TestEnvironment;

fn context_for(env: &TestEnvironment) -> Context {
    Context {
        store: env.store.clone(),
        api: Api::new().unwrap(),
        cache: kegctl::Cache::new(env.root().join("cache"), std::time::Duration::from_secs(3600), std::time::Duration::from_secs(3600)),
        config: Config::default(),
        profile: MachineProfile {
            is_mac: false,
            is_arm: false,
            os_version: "0".to_string(),
            clang_version: vec![],
            gcc_version: vec![],
            xcode_version: vec![],
        },
    }
}

/// Scenario 1: install & link. `wget` depends on `openssl@3` and `libidn2`; after linking
/// all three, the opt-link and bin-link chain resolves and only `wget` is primary.
#[test]
fn scenario_install_and_link() {
    let env = TestEnvironment::new();
    env.install_fake("openssl@3", "3.3.0", &[]);
    env.install_fake("libidn2", "2.3.7", &[]);
    let wget = env.install_fake("wget", "1.24.5", &["openssl@3", "libidn2"]);

    let pkg = env.package("wget");
    pkg.set_primary(true).unwrap();

    kegctl::link::optlink(&wget).unwrap();
    kegctl::link::link_bins(&wget).unwrap();

    assert_eq!(pkg.active_version().as_deref(), Some("1.24.5"));
    assert!(pkg.bin_links().iter().any(|p| p.ends_with("wget")));
    assert!(pkg.is_primary());
    assert!(!env.package("openssl@3").is_primary());

    let ctx = context_for(&env);
    let graph = ctx.build_graph();
    assert_eq!(graph.direct_dependencies("wget"), HashSet::from(["openssl@3".to_string(), "libidn2".to_string()]));
}

/// Scenario 2: uninstalling `wget` must keep `openssl@3` since `curl` still needs it, and
/// must not warn since nothing depends on `wget` itself.
#[test]
fn scenario_uninstall_respects_shared_dependency() {
    let env = TestEnvironment::new();
    env.install_fake("openssl@3", "3.3.0", &[]);
    env.install_fake("libidn2", "2.3.7", &[]);
    env.install_fake("wget", "1.24.5", &["openssl@3", "libidn2"]);
    env.install_fake("curl", "8.9.0", &["openssl@3"]);

    let ctx = context_for(&env);
    let graph = ctx.build_graph();

    let delete = HashSet::from(["wget".to_string()]);
    let plan = graph.collect_uninstall(&delete, &HashSet::new(), false, &|_| false);

    assert_eq!(plan.removed, HashSet::from(["wget".to_string(), "libidn2".to_string()]));
    assert_eq!(plan.skipped, HashSet::from(["openssl@3".to_string()]));
    assert!(plan.warnings.is_empty());
}

/// Scenario 4: switching between two installed versions of the same package preserves
/// whether bin-links were present.
#[test]
fn scenario_switch_preserves_bin_link_presence() {
    let env = TestEnvironment::new();
    let v311 = env.install_fake("python@3.11", "3.11.9", &[]);
    let v312 = env.install_fake("python@3.12", "3.12.4", &[]);

    kegctl::link::optlink(&v311).unwrap();
    kegctl::link::link_bins(&v311).unwrap();

    let pkg = env.package("python@3.11");
    assert!(!pkg.bin_links().is_empty());

    // a real `switch` unlinks the old alias and relinks the new one; exercise the two
    // link-manager calls directly since `python@3.11`/`python@3.12` are distinct packages
    // in this fixture (the real formula shares one versioned Cellar entry).
    kegctl::link::unlink_bins(&pkg).unwrap();
    kegctl::link::unoptlink(&pkg).unwrap();
    kegctl::link::optlink(&v312).unwrap();
    kegctl::link::link_bins(&v312).unwrap();

    assert_eq!(env.package("python@3.12").active_version().as_deref(), Some("3.12.4"));
    assert!(!env.package("python@3.12").bin_links().is_empty());
    assert!(env.package("python@3.11").bin_links().is_empty());
}

/// Scenario 5: a tarball entry escaping the destination via `..` must be rejected and must
/// not leave partial output behind in the destination.
#[test]
fn scenario_archive_escape_is_rejected() {
    use std::io::Write;

    let env = TestEnvironment::new();
    let archive_path = env.root().join("evil.tar.gz");
    {
        let file = std::fs::File::create(&archive_path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(4);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "../evil", &b"boo!"[..]).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    let dest = env.root().join("Cellar").join("evil").join("1.0");
    std::fs::create_dir_all(&dest).unwrap();

    let result = kegctl::bottle::extract::extract(&archive_path, &dest);
    assert!(result.is_err());
    assert!(std::fs::read_dir(&dest).unwrap().next().is_none());
}

/// `obsolete(S) is a superset of S`, and nothing is its own dependency.
#[test]
fn graph_invariants_hold() {
    let env = TestEnvironment::new();
    env.install_fake("a", "1.0", &["b"]);
    env.install_fake("b", "1.0", &[]);

    let ctx = context_for(&env);
    let graph = ctx.build_graph();

    let s = HashSet::from(["a".to_string()]);
    assert!(graph.obsolete(&s).is_superset(&s));
    assert!(!graph.get_all(&s, false).contains("a"));
}
