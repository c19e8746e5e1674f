//! The `unlink` verb: remove a package's `opt` and `bin` links without touching the Cellar.

use crate::commands::Context;
use crate::error::Result;
use colored::Colorize;

pub fn unlink(ctx: &Context, names: &[String]) -> Result<()> {
    for name in names {
        let pkg = ctx.store.package(name);
        if pkg.versions().is_empty() {
            println!("{} {} is not installed", "⚠".yellow(), name.bold());
            continue;
        }

        let unlinked = crate::link::unlink_bins(&pkg)?;
        crate::link::unoptlink(&pkg)?;

        println!(
            "{} unlinked {} ({} files)",
            "✓".green(),
            name.bold(),
            unlinked.len().to_string().dimmed()
        );
    }

    Ok(())
}
