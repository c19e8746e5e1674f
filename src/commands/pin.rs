//! The `pin` verb: mark a package exempt from `upgrade`, via the `.pinned` flag file.

use crate::commands::Context;
use crate::error::Result;
use colored::Colorize;

pub fn pin(ctx: &Context, names: &[String]) -> Result<()> {
    for name in names {
        let pkg = ctx.store.package(name);
        if pkg.versions().is_empty() {
            println!("{} {} is not installed", "⚠".yellow(), name.bold());
            continue;
        }
        if pkg.is_pinned() {
            println!("{} is already pinned", name.bold());
            continue;
        }
        pkg.set_pinned(true)?;
        println!("{} pinned {}", "✓".green(), name.bold().green());
    }
    Ok(())
}
