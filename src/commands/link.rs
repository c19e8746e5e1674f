//! The `link` verb: point `opt/<pkg>` at a version and, unless keg-only, publish its
//! executables into `bin/`.

use crate::commands::Context;
use crate::error::Result;
use colored::Colorize;

pub fn link(ctx: &Context, names: &[String], force: bool) -> Result<()> {
    for name in names {
        let pkg = ctx.store.package(name);
        let versions = pkg.versions();
        if versions.is_empty() {
            println!("{} {} is not installed", "⚠".yellow(), name.bold());
            continue;
        }
        let Some(target) = pkg.active_version().or_else(|| versions.last().cloned()) else {
            continue;
        };
        let version = pkg.version(&target);

        if !force {
            let recipe = std::fs::read_to_string(version.recipe_path()).unwrap_or_default();
            if recipe.contains("keg_only") {
                println!("{} {} is keg-only and cannot be linked", "⚠".yellow(), name.bold());
                println!("  run with --force to link anyway");
                continue;
            }
        }

        crate::link::optlink(&version)?;
        let linked = crate::link::link_bins(&version)?;
        println!(
            "{} linked {} ({} files)",
            "✓".green(),
            name.bold(),
            linked.len().to_string().dimmed()
        );
    }

    Ok(())
}
