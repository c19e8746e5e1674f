use crate::commands::Context;
use crate::download;
use crate::error::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;

/// Download bottles for the named formulae without installing them.
pub async fn fetch(ctx: &Context, names: &[String]) -> Result<()> {
    let is_tty = std::io::stdout().is_terminal();

    let spinner = if is_tty {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        pb.set_message(format!("Fetching {} formulae...", names.len()));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut formulae = Vec::new();
    for name in names {
        match ctx.api.fetch_formula(name, &ctx.cache).await {
            Ok(formula) => {
                let has_bottle = formula
                    .bottle
                    .as_ref()
                    .and_then(|b| b.stable.as_ref())
                    .is_some();
                if has_bottle {
                    formulae.push(formula);
                } else {
                    println!("{} no bottle available for {}", "⚠".yellow(), name.bold());
                }
            }
            Err(e) => println!("{} failed to fetch {}: {e}", "✗".red(), name.bold()),
        }
    }

    spinner.finish_and_clear();

    if formulae.is_empty() {
        println!("No formulae to download");
        return Ok(());
    }

    let results =
        download::download_bottles(&ctx.store, &ctx.cache, &formulae, &ctx.profile, !is_tty).await?;

    println!(
        "{} downloaded {} bottles to {}",
        "✓".green(),
        results.len().to_string().bold(),
        ctx.store.short_path(&ctx.store.download_path()).display()
    );
    for (name, path) in results {
        println!("  {} {}", name.bold().green(), path.display());
    }

    Ok(())
}
