//! The `unpin` verb: clear the `.pinned` flag so `upgrade` considers the package again.

use crate::commands::Context;
use crate::error::Result;
use colored::Colorize;

pub fn unpin(ctx: &Context, names: &[String]) -> Result<()> {
    for name in names {
        let pkg = ctx.store.package(name);
        if !pkg.is_pinned() {
            println!("{} is not pinned", name.bold());
            continue;
        }
        pkg.set_pinned(false)?;
        println!("{} unpinned {}", "✓".green(), name.bold().green());
    }
    Ok(())
}
