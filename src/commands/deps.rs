//! The `deps` verb: direct or transitive dependencies of an installed package, read
//! straight off the offline graph rebuilt from on-disk recipes.

use crate::commands::Context;
use crate::error::Result;
use colored::Colorize;
use std::collections::HashSet;
use std::io::IsTerminal;

pub fn deps(ctx: &Context, name: &str, tree: bool, direct: bool) -> Result<()> {
    let is_tty = std::io::stdout().is_terminal();
    let graph = ctx.build_graph();

    let deps: HashSet<String> = if direct {
        graph.direct_dependencies(name)
    } else {
        let mut targets = HashSet::new();
        targets.insert(name.to_string());
        graph.get_all(&targets, false)
    };

    if deps.is_empty() {
        if is_tty {
            println!("{} no dependencies", "✓".green());
        }
        return Ok(());
    }

    let mut sorted: Vec<_> = deps.into_iter().collect();
    sorted.sort();
    let len = sorted.len();
    for (i, dep) in sorted.iter().enumerate() {
        if is_tty {
            if tree {
                let prefix = if i == len - 1 { "└─" } else { "├─" };
                println!("{prefix} {}", dep.cyan());
            } else {
                println!("{}", dep.cyan());
            }
        } else {
            println!("{dep}");
        }
    }

    Ok(())
}
