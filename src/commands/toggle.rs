//! The `toggle` verb: let versioned aliases of the same formula (`node`, `node@20`,
//! `node@22`, ...) share `bin/` without colliding — only one alias's executables are ever
//! linked at a time.

use crate::commands::Context;
use crate::error::Result;
use colored::Colorize;

fn base_name(name: &str) -> &str {
    name.split('@').next().unwrap_or(name)
}

pub fn toggle(ctx: &Context, name: &str) -> Result<()> {
    let base = base_name(name);
    let aliases: Vec<String> = ctx
        .store
        .installed_names()
        .into_iter()
        .filter(|n| base_name(n) == base)
        .collect();

    let holder = aliases.iter().find(|n| {
        n.as_str() != name && !ctx.store.package(n).bin_links().is_empty()
    });

    if let Some(holder) = holder {
        let pkg = ctx.store.package(holder);
        crate::link::unlink_bins(&pkg)?;
        println!("{} dropped bin-links for {}", "✓".green(), holder.bold());
        return Ok(());
    }

    let pkg = ctx.store.package(name);
    let Some(active) = pkg.active_version() else {
        println!("{} {} is not linked, nothing to activate", "⚠".yellow(), name.bold());
        return Ok(());
    };
    let version = pkg.version(&active);
    let linked = crate::link::link_bins(&version)?;
    println!(
        "{} activated bin-links for {} ({} files)",
        "✓".green(),
        name.bold(),
        linked.len().to_string().dimmed()
    );
    Ok(())
}
