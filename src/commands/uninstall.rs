//! The `uninstall` verb: plan an orphan-aware removal with `DependencyGraph::collect_uninstall`,
//! then unlink and delete everything the plan marks as `removed`.

use crate::commands::Context;
use crate::error::{ErrorSummary, Result};
use colored::Colorize;
use std::collections::HashSet;

pub fn uninstall(ctx: &Context, names: &[String], force: bool, no_dependencies: bool) -> Result<()> {
    let graph = ctx.build_graph();
    let delete: HashSet<String> = names.iter().cloned().collect();

    let unknown: Vec<&String> = names.iter().filter(|n| !graph.contains(n)).collect();
    for name in &unknown {
        println!("{} {} is not installed", "⚠".yellow(), name.bold());
    }
    if unknown.len() == names.len() {
        return Ok(());
    }

    let is_primary = |p: &str| ctx.store.package(p).is_primary() && !delete.contains(p);
    let plan = graph.collect_uninstall(&delete, &HashSet::new(), no_dependencies, &is_primary);

    if !plan.warnings.is_empty() && !force {
        let mut warnings: Vec<_> = plan.warnings.into_iter().collect();
        warnings.sort();
        println!(
            "{} refusing to uninstall, still required by: {}",
            "✗".red(),
            warnings.join(", ").bold()
        );
        println!("  run with --force to uninstall anyway");
        return Ok(());
    }

    let mut errors = ErrorSummary::new();
    let mut removed: Vec<_> = plan.removed.into_iter().collect();
    removed.sort();

    for name in &removed {
        let pkg = ctx.store.package(name);
        if pkg.is_pinned() && !force {
            println!("{} {} is pinned, skipping", "⚠".yellow(), name.bold());
            continue;
        }

        if let Err(e) = crate::link::unlink_bins(&pkg) {
            errors.push(name, e);
        }
        if let Err(e) = crate::link::unoptlink(&pkg) {
            errors.push(name, e);
        }
        if let Err(e) = std::fs::remove_dir_all(pkg.path()) {
            errors.push(name, e);
            continue;
        }

        println!("{} uninstalled {}", "✓".green(), name.bold());
    }

    if !plan.skipped.is_empty() {
        let mut skipped: Vec<_> = plan.skipped.into_iter().collect();
        skipped.sort();
        println!("{} kept as dependencies: {}", "ℹ".blue(), skipped.join(", ").dimmed());
    }

    if !errors.is_empty() {
        eprintln!("{errors}");
    }

    Ok(())
}
