//! The `missing` verb: dependencies a recipe names that aren't themselves installed.

use crate::commands::Context;
use crate::error::Result;
use colored::Colorize;

pub fn missing(ctx: &Context, names: &[String]) -> Result<()> {
    let graph = ctx.build_graph();

    let targets: Vec<String> = if names.is_empty() {
        ctx.store.installed_names()
    } else {
        names.to_vec()
    };

    if targets.is_empty() {
        println!("No packages installed");
        return Ok(());
    }

    let mut has_missing = false;
    for name in &targets {
        if !names.is_empty() && !graph.contains(name) {
            println!("{} {} is not installed", "⚠".yellow(), name.bold());
            continue;
        }
        let deps = graph.direct_dependencies(name);
        let missing: Vec<_> = deps.iter().filter(|d| !graph.contains(d)).collect();
        if !missing.is_empty() {
            has_missing = true;
            println!("{} {} is missing dependencies:", "✗".red(), name.bold());
            for dep in missing {
                println!("  {}", dep.cyan());
            }
        }
    }

    if !has_missing {
        println!("{} no missing dependencies found", "✓".green());
    }

    Ok(())
}
