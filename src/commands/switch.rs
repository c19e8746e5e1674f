//! The `switch` verb: atomically move a package's active version, preserving whether it
//! had bin-links.

use crate::commands::Context;
use crate::error::{KegError, Result};
use colored::Colorize;

pub fn switch(ctx: &Context, name: &str, version: &str) -> Result<()> {
    let pkg = ctx.store.package(name);
    if !pkg.versions().contains(&version.to_string()) {
        return Err(KegError::UnknownPackage(format!("{name}@{version}")));
    }

    let had_bins = !pkg.bin_links().is_empty();

    crate::link::unlink_bins(&pkg)?;
    crate::link::unoptlink(&pkg)?;

    let target = pkg.version(version);
    crate::link::optlink(&target)?;
    if had_bins {
        crate::link::link_bins(&target)?;
    }

    println!("{} switched {} to {}", "✓".green(), name.bold(), version.cyan());
    Ok(())
}
