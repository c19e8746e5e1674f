pub mod cleanup;
pub mod deps;
pub mod export;
pub mod fetch;
pub mod home;
pub mod info;
pub mod install;
pub mod leaves;
pub mod link;
pub mod list;
pub mod missing;
pub mod outdated;
pub mod pin;
pub mod switch;
pub mod toggle;
pub mod uninstall;
pub mod unlink;
pub mod unpin;
pub mod upgrade;
pub mod uses;

use crate::api::Api;
use crate::cache::Cache;
use crate::config::Config;
use crate::error::Result;
use crate::platform::MachineProfile;
use crate::store::Store;

/// Everything a command needs: the store root, HTTP client, response cache, config and
/// the detected machine profile. Built once in `main` and passed by reference.
pub struct Context {
    pub store: Store,
    pub api: Api,
    pub cache: Cache,
    pub config: Config,
    pub profile: MachineProfile,
}

impl Context {
    pub fn new() -> Result<Self> {
        let store = Store::open()?;
        let config = Config::load(&store.root)?;
        let cache = Cache::new(store.cache_path(), config.cleanup_cache, config.cleanup_auth);
        let api = Api::new()?;
        let profile = MachineProfile::detect().map_err(crate::error::KegError::Other)?;
        Ok(Self {
            store,
            api,
            cache,
            config,
            profile,
        })
    }

    /// Build the offline dependency graph from every recipe currently in the store.
    pub fn build_graph(&self) -> crate::graph::DependencyGraph {
        use std::collections::{HashMap, HashSet};

        let mut edges: HashMap<String, HashSet<String>> = HashMap::new();
        for pkg in self.store.installed_packages() {
            let mut deps = HashSet::new();
            if let Some(version) = pkg.active_version().or_else(|| pkg.versions().into_iter().next()) {
                let recipe_path = self.store.recipe_path(&pkg.name, &version);
                if let Ok(text) = std::fs::read_to_string(&recipe_path) {
                    if let Ok(formula) = crate::formula::parse(&text, &self.profile, &HashSet::new()) {
                        deps.extend(
                            formula
                                .dependencies
                                .into_iter()
                                .filter(|d| {
                                    !matches!(
                                        d.kind,
                                        crate::formula::DependencyKind::Build
                                            | crate::formula::DependencyKind::Optional
                                    )
                                })
                                .map(|d| d.name),
                        );
                    }
                }
            }
            edges.insert(pkg.name.clone(), deps);
        }
        crate::graph::DependencyGraph::build(edges)
    }
}

/// Render a synthesized recipe from an API formula response, grounded on the subset of
/// syntax `formula::parse` understands. This is the text written to `.brew/<pkg>.rb` so
/// later commands (deps/uses/leaves/missing/uninstall) can rebuild the graph offline.
pub fn synthesize_recipe(formula: &crate::api::Formula) -> String {
    let class_name = formula
        .name
        .split(['-', '@'])
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<String>();

    let mut out = format!("class {class_name} < Formula\n");
    if let Some(homepage) = &formula.homepage {
        out.push_str(&format!("  homepage \"{homepage}\"\n"));
    }
    if formula.keg_only {
        out.push_str("  keg_only :provided_by_macos\n");
    }
    for dep in &formula.dependencies {
        out.push_str(&format!("  depends_on \"{dep}\"\n"));
    }
    for dep in &formula.build_dependencies {
        out.push_str(&format!("  depends_on \"{dep}\" => :build\n"));
    }
    out.push_str("end\n");
    out
}

/// Strip a trailing bottle revision (`"_NN"`) from a version string, so `outdated`/
/// `upgrade` compare the part that actually changes between releases. Only the last
/// underscore-separated segment counts, and only if it's all digits — `"python_3.11"`
/// and `"foo_bar"` are untouched.
pub(crate) fn strip_bottle_revision(version: &str) -> &str {
    match version.rfind('_') {
        Some(pos) if version[pos + 1..].chars().all(|c| c.is_ascii_digit()) && pos + 1 < version.len() => {
            &version[..pos]
        }
        _ => version,
    }
}
