//! The `list` verb: enumerate installed packages, annotated with pinned/primary flags.

use crate::commands::Context;
use crate::error::Result;
use colored::Colorize;
use std::io::IsTerminal;

fn format_columns(names: &[String]) -> String {
    if names.is_empty() {
        return String::new();
    }
    let term_width = if std::io::stdout().is_terminal() {
        term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
    } else {
        80
    };
    let max_len = names.iter().map(|s| s.len()).max().unwrap_or(0);
    let col_width = max_len + 2;
    let num_cols = (term_width / col_width).max(1);

    let mut result = String::new();
    for (i, name) in names.iter().enumerate() {
        result.push_str(name);
        if (i + 1) % num_cols == 0 {
            result.push('\n');
        } else if i < names.len() - 1 {
            result.push_str(&" ".repeat(col_width - name.len()));
        }
    }
    if !names.is_empty() && names.len() % num_cols != 0 {
        result.push('\n');
    }
    result
}

pub fn list(ctx: &Context, show_versions: bool, json: bool, quiet: bool, columns: bool) -> Result<()> {
    let is_tty = std::io::stdout().is_terminal();
    let use_quiet = quiet || (!is_tty && !json && !show_versions && !columns);
    let use_columns = if columns {
        true
    } else if show_versions || use_quiet {
        false
    } else {
        is_tty
    };

    let packages = ctx.store.installed_packages();

    if json {
        #[derive(serde::Serialize)]
        struct PackageInfo {
            name: String,
            versions: Vec<String>,
            pinned: bool,
            primary: bool,
        }
        let list: Vec<PackageInfo> = packages
            .iter()
            .map(|p| PackageInfo {
                name: p.name.clone(),
                versions: p.versions(),
                pinned: p.is_pinned(),
                primary: p.is_primary(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    if packages.is_empty() {
        if is_tty {
            println!("No packages installed");
        }
        return Ok(());
    }

    let names: Vec<String> = packages.iter().map(|p| p.name.clone()).collect();

    if use_quiet {
        for name in &names {
            println!("{name}");
        }
        return Ok(());
    }

    if is_tty {
        println!("Installed packages:");
        println!();
    }

    if use_columns {
        if show_versions {
            let formatted: Vec<String> = packages
                .iter()
                .map(|p| format!("{} {}", p.name, p.versions().join(", ")))
                .collect();
            print!("{}", format_columns(&formatted));
        } else {
            print!("{}", format_columns(&names));
        }
    } else {
        for pkg in &packages {
            if show_versions {
                println!(
                    "{} {}",
                    pkg.name.bold().green(),
                    pkg.versions().join(", ").dimmed()
                );
            } else {
                println!("{}", pkg.name.bold().green());
            }
            if pkg.is_pinned() {
                println!("  {}", "pinned".yellow());
            }
        }
    }

    if is_tty {
        println!(
            "{} {} packages installed",
            "✓".green(),
            packages.len().to_string().bold()
        );
    }

    Ok(())
}
