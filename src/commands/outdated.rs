//! The `outdated` verb: compare each installed package's active version against the
//! latest stable version the formula API advertises.

use crate::commands::Context;
use crate::error::Result;
use colored::Colorize;
use std::io::IsTerminal;

pub async fn outdated(ctx: &Context, quiet: bool) -> Result<()> {
    let is_tty = std::io::stdout().is_terminal();
    let show_versions = is_tty && !quiet;

    let packages = ctx.store.installed_packages();
    if packages.is_empty() {
        return Ok(());
    }

    let mut stale = Vec::new();
    for pkg in &packages {
        if pkg.is_pinned() {
            continue;
        }
        let Some(installed) = pkg.active_version() else {
            continue;
        };
        let Ok(formula) = ctx.api.fetch_formula(&pkg.name, &ctx.cache).await else {
            continue;
        };
        let Some(latest) = &formula.versions.stable else {
            continue;
        };
        let installed_base = crate::commands::strip_bottle_revision(&installed);
        let latest_base = crate::commands::strip_bottle_revision(latest);
        if installed_base != latest_base {
            stale.push((pkg.name.clone(), installed, latest.clone()));
        }
    }

    if stale.is_empty() {
        return Ok(());
    }

    for (name, installed, latest) in &stale {
        if show_versions {
            println!("{} ({}) < {}", name.bold().green(), installed.dimmed(), latest.cyan());
        } else {
            println!("{name}");
        }
    }

    if show_versions {
        let count = stale.len();
        println!(
            "{} outdated {} found",
            count.to_string().bold(),
            if count == 1 { "package" } else { "packages" }
        );
    }

    Ok(())
}
