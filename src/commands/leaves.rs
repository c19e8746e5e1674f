//! The `leaves` verb: installed packages nothing else depends on.

use crate::commands::Context;
use crate::error::Result;
use colored::Colorize;
use std::io::IsTerminal;

pub fn leaves(ctx: &Context) -> Result<()> {
    let is_tty = std::io::stdout().is_terminal();
    let graph = ctx.build_graph();
    let mut leaves: Vec<_> = graph.user_leaves().into_iter().collect();
    leaves.sort();

    if is_tty {
        println!("{}", "==> Leaf packages".bold().green());
        println!("(packages not required by other packages)");
        println!();
    }

    if leaves.is_empty() {
        if is_tty {
            println!("No leaf packages found");
        }
        return Ok(());
    }

    for name in &leaves {
        if is_tty {
            println!("{}", name.cyan());
        } else {
            println!("{name}");
        }
    }

    if is_tty {
        println!();
        println!("{} {} leaf packages", "ℹ".blue(), leaves.len().to_string().bold());
    }

    Ok(())
}
