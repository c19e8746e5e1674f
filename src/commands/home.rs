use crate::commands::Context;
use crate::error::Result;
use colored::Colorize;

/// Open a formula's homepage in the default browser.
pub async fn home(ctx: &Context, name: &str) -> Result<()> {
    let formula = ctx.api.fetch_formula(name, &ctx.cache).await?;

    match &formula.homepage {
        Some(url) if !url.is_empty() => {
            println!("  {}: {}", "Homepage".dimmed(), url.cyan());
            let status = std::process::Command::new("open").arg(url).status();
            match status {
                Ok(s) if s.success() => println!("  {} opened in browser", "✓".green()),
                _ => {
                    println!("  {} could not open browser automatically", "⚠".yellow());
                    println!("  Please visit: {url}");
                }
            }
        }
        _ => {
            println!("  {} no homepage available for {}", "⚠".yellow(), name.bold());
        }
    }

    Ok(())
}
