//! The `uses` verb: installed packages whose recipe directly depends on the named one.

use crate::commands::Context;
use crate::error::Result;
use colored::Colorize;
use std::io::IsTerminal;

pub fn uses(ctx: &Context, name: &str) -> Result<()> {
    let is_tty = std::io::stdout().is_terminal();
    let graph = ctx.build_graph();
    let dependents = graph.dependents_of(name);

    if dependents.is_empty() {
        if is_tty {
            println!("{} nothing depends on '{name}'", "✓".green());
        }
        return Ok(());
    }

    let mut sorted: Vec<_> = dependents.into_iter().collect();
    sorted.sort();

    if is_tty {
        println!(
            "{} found {} packages that depend on {}:",
            "✓".green(),
            sorted.len().to_string().bold(),
            name.cyan()
        );
    }
    for dep in &sorted {
        println!("{dep}");
    }

    Ok(())
}
