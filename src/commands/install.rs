//! The `install` verb: resolve transitive dependencies via the formula API, download
//! bottles, then extract/relocate/link in reverse topological order so dependencies are
//! always on disk before their dependents.

use crate::api::Formula;
use crate::bottle;
use crate::commands::Context;
use crate::download;
use crate::error::{ErrorSummary, KegError, Result};
use colored::Colorize;
use std::collections::{HashMap, HashSet, VecDeque};

/// Fetch `roots` and every transitive (non-build) dependency, returning the formulae and
/// a reverse-topological install order (dependencies before dependents).
async fn resolve_dependencies(ctx: &Context, roots: &[String]) -> Result<(HashMap<String, Formula>, Vec<String>)> {
    let mut all: HashMap<String, Formula> = HashMap::new();
    let mut queue: VecDeque<String> = roots.iter().cloned().collect();
    let mut seen: HashSet<String> = HashSet::new();

    while let Some(name) = queue.pop_front() {
        if !seen.insert(name.clone()) {
            continue;
        }
        let formula = ctx.api.fetch_formula(&name, &ctx.cache).await?;
        for dep in &formula.dependencies {
            if !seen.contains(dep) {
                queue.push_back(dep.clone());
            }
        }
        all.insert(formula.name.clone(), formula);
    }

    let order = topological_order(&all)?;
    Ok((all, order))
}

fn topological_order(formulae: &HashMap<String, Formula>) -> Result<Vec<String>> {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for (name, formula) in formulae {
        in_degree.entry(name.as_str()).or_insert(0);
        for dep in &formula.dependencies {
            if formulae.contains_key(dep) {
                dependents.entry(dep.as_str()).or_default().push(name.as_str());
                *in_degree.entry(name.as_str()).or_insert(0) += 1;
            }
        }
    }

    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter_map(|(&n, &c)| (c == 0).then_some(n))
        .collect();
    let mut order = Vec::with_capacity(formulae.len());

    while let Some(name) = queue.pop_front() {
        order.push(name.to_string());
        if let Some(deps) = dependents.get(name) {
            for &dependent in deps {
                let count = in_degree.get_mut(dependent).unwrap();
                *count -= 1;
                if *count == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    if order.len() != formulae.len() {
        return Err(KegError::Other(anyhow::anyhow!("circular dependency detected")));
    }
    Ok(order)
}

pub async fn install(ctx: &Context, names: &[String], force: bool) -> Result<()> {
    println!("Resolving dependencies...");
    let (all_formulae, order) = resolve_dependencies(ctx, names).await?;
    let requested: HashSet<&str> = names.iter().map(|s| s.as_str()).collect();

    let to_install: Vec<&Formula> = order
        .iter()
        .filter_map(|name| all_formulae.get(name))
        .filter(|f| force || f.versions.stable.as_deref() != ctx.store.package(&f.name).active_version().as_deref())
        .collect();

    if to_install.is_empty() {
        println!("{} already installed", "✓".green());
        return Ok(());
    }

    println!(
        "{} formulae to install: {}",
        to_install.len().to_string().bold(),
        to_install.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(", ").cyan()
    );

    let formulae: Vec<Formula> = to_install.iter().map(|f| (*f).clone()).collect();
    let downloaded = download::download_bottles(&ctx.store, &ctx.cache, &formulae, &ctx.profile, false).await?;
    let download_map: HashMap<String, std::path::PathBuf> = downloaded.into_iter().collect();

    let mut errors = ErrorSummary::new();

    for formula in &to_install {
        let Some(archive_path) = download_map.get(&formula.name) else {
            errors.push(&formula.name, "no bottle available");
            continue;
        };
        let new_version = match &formula.versions.stable {
            Some(v) => v.clone(),
            None => {
                errors.push(&formula.name, "no stable version");
                continue;
            }
        };

        let pkg = ctx.store.package(&formula.name);
        let version = pkg.version(&new_version);
        std::fs::create_dir_all(version.path())?;

        if let Err(e) = bottle::install(archive_path, &version) {
            errors.push(&formula.name, e);
            continue;
        }

        std::fs::create_dir_all(version.path().join(".brew"))?;
        std::fs::write(version.recipe_path(), crate::commands::synthesize_recipe(formula))?;
        if let Some(bottle) = formula.bottle.as_ref().and_then(|b| b.stable.as_ref()) {
            if let Some(tag) = bottle.files.keys().next() {
                if let Some(file) = bottle.files.get(tag) {
                    let _ = version.set_digest(&file.sha256);
                }
            }
        }

        let is_primary = requested.contains(formula.name.as_str());
        pkg.set_primary(is_primary)?;

        if !formula.keg_only {
            let should_link_bins = if is_primary { ctx.config.link_bin_primary } else { ctx.config.link_bin_dependency };
            crate::link::optlink(&version)?;
            if should_link_bins {
                let linked = crate::link::link_bins(&version)?;
                println!("    ├ linked {} files", linked.len().to_string().dimmed());
            }
        } else {
            println!("    ├ {} is keg-only (not linked to prefix)", formula.name.dimmed());
        }

        println!("    └ installed {} {}", formula.name.bold().green(), new_version.dimmed());
    }

    if !errors.is_empty() {
        eprintln!("{errors}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formula_with_deps(name: &str, deps: &[&str]) -> Formula {
        Formula {
            name: name.to_string(),
            full_name: name.to_string(),
            desc: None,
            homepage: None,
            versions: crate::api::Versions::default(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            build_dependencies: Vec::new(),
            bottle: None,
            keg_only: false,
            keg_only_reason: None,
        }
    }

    #[test]
    fn topological_order_respects_simple_chain() {
        let mut formulae = HashMap::new();
        formulae.insert("a".to_string(), formula_with_deps("a", &["b"]));
        formulae.insert("b".to_string(), formula_with_deps("b", &["c"]));
        formulae.insert("c".to_string(), formula_with_deps("c", &[]));

        let order = topological_order(&formulae).unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("c") < pos("b"));
        assert!(pos("b") < pos("a"));
    }

    #[test]
    fn topological_order_handles_diamond() {
        let mut formulae = HashMap::new();
        formulae.insert("a".to_string(), formula_with_deps("a", &["b", "c"]));
        formulae.insert("b".to_string(), formula_with_deps("b", &["d"]));
        formulae.insert("c".to_string(), formula_with_deps("c", &["d"]));
        formulae.insert("d".to_string(), formula_with_deps("d", &[]));

        let order = topological_order(&formulae).unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("d") < pos("b"));
        assert!(pos("d") < pos("c"));
        assert!(pos("b") < pos("a"));
        assert!(pos("c") < pos("a"));
    }

    #[test]
    fn topological_order_rejects_cycles() {
        let mut formulae = HashMap::new();
        formulae.insert("a".to_string(), formula_with_deps("a", &["b"]));
        formulae.insert("b".to_string(), formula_with_deps("b", &["c"]));
        formulae.insert("c".to_string(), formula_with_deps("c", &["a"]));

        assert!(topological_order(&formulae).is_err());
    }

    #[test]
    fn topological_order_ignores_deps_outside_the_set() {
        // a build dependency or an already-installed package not fetched this round
        // shouldn't block the sort.
        let mut formulae = HashMap::new();
        formulae.insert("a".to_string(), formula_with_deps("a", &["not-fetched"]));
        let order = topological_order(&formulae).unwrap();
        assert_eq!(order, vec!["a".to_string()]);
    }
}
