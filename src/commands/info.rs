use crate::commands::Context;
use crate::error::Result;
use colored::Colorize;

/// Print formula metadata plus local install state: which versions are on disk, which
/// one is active, and whether the package is pinned.
pub async fn info(ctx: &Context, name: &str, json: bool) -> Result<()> {
    let formula = ctx.api.fetch_formula(name, &ctx.cache).await?;
    let pkg = ctx.store.package(name);
    let installed = pkg.versions();

    if json {
        let json_str = serde_json::to_string_pretty(&formula)?;
        println!("{json_str}");
        return Ok(());
    }

    println!("{}", format!("==> {}", formula.name).bold().green());
    if let Some(desc) = &formula.desc {
        println!("{desc}");
    }
    if let Some(homepage) = &formula.homepage {
        println!("{}: {homepage}", "Homepage".bold());
    }
    if let Some(stable) = &formula.versions.stable {
        println!("{}: {stable}", "Latest stable".bold());
    }

    if formula.keg_only {
        if let Some(reason) = &formula.keg_only_reason {
            let reason_display = match reason.reason.as_str() {
                ":provided_by_macos" => "provided by macOS",
                ":shadowed_by_macos" => "shadowed by macOS",
                ":versioned_formula" => "versioned formula",
                _ => &reason.reason,
            };
            println!("{}: {reason_display}", "Keg-only".bold().yellow());
        } else {
            println!("{}: yes", "Keg-only".bold().yellow());
        }
    }

    if installed.is_empty() {
        println!("{}: not installed", "Installed".bold());
    } else {
        let active = pkg.active_version();
        println!("{}:", "Installed".bold());
        for version in &installed {
            let marker = if Some(version) == active.as_ref() {
                "*".green()
            } else {
                " ".normal()
            };
            println!("  {marker} {version}");
        }
        if pkg.is_pinned() {
            println!("  {}", "pinned".yellow());
        }
    }

    if !formula.dependencies.is_empty() {
        println!("{}: {}", "Dependencies".bold(), formula.dependencies.join(", "));
    }
    if !formula.build_dependencies.is_empty() {
        println!(
            "{}: {}",
            "Build dependencies".bold(),
            formula.build_dependencies.join(", ")
        );
    }

    Ok(())
}
