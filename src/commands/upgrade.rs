//! The `upgrade` verb: replace each outdated, unpinned package's active version with the
//! latest bottle, preserving its primary/keg-only/bin-link state.

use crate::commands::Context;
use crate::download;
use crate::error::{ErrorSummary, Result};
use colored::Colorize;
use std::collections::HashMap;

async fn outdated_candidates(ctx: &Context, names: &[String]) -> Vec<crate::api::Formula> {
    let targets: Vec<String> = if names.is_empty() {
        ctx.store.installed_names()
    } else {
        names.to_vec()
    };

    let mut candidates = Vec::new();
    for name in targets {
        let pkg = ctx.store.package(&name);
        if pkg.is_pinned() {
            continue;
        }
        let Some(installed) = pkg.active_version() else {
            continue;
        };
        let Ok(formula) = ctx.api.fetch_formula(&name, &ctx.cache).await else {
            continue;
        };
        let Some(latest) = &formula.versions.stable else {
            continue;
        };
        let installed_base = crate::commands::strip_bottle_revision(&installed);
        let latest_base = crate::commands::strip_bottle_revision(latest);
        if installed_base != latest_base {
            candidates.push(formula);
        }
    }
    candidates
}

pub async fn upgrade(ctx: &Context, names: &[String]) -> Result<()> {
    let candidates = outdated_candidates(ctx, names).await;

    if candidates.is_empty() {
        println!("{} all packages are up to date", "✓".green());
        return Ok(());
    }

    println!(
        "{} outdated: {}",
        candidates.len().to_string().bold(),
        candidates.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(", ").cyan()
    );

    let downloaded = download::download_bottles(&ctx.store, &ctx.cache, &candidates, &ctx.profile, false).await?;
    let download_map: HashMap<String, std::path::PathBuf> = downloaded.into_iter().collect();

    let mut errors = ErrorSummary::new();

    for formula in &candidates {
        let Some(archive_path) = download_map.get(&formula.name) else {
            errors.push(&formula.name, "no bottle available");
            continue;
        };
        let Some(new_version) = formula.versions.stable.clone() else {
            continue;
        };

        let pkg = ctx.store.package(&formula.name);
        let old_version = pkg.active_version();
        let had_bins = !pkg.bin_links().is_empty();
        let is_primary = pkg.is_primary();

        let version = pkg.version(&new_version);
        std::fs::create_dir_all(version.path())?;

        if let Err(e) = crate::bottle::install(archive_path, &version) {
            errors.push(&formula.name, e);
            continue;
        }
        std::fs::create_dir_all(version.path().join(".brew"))?;
        std::fs::write(version.recipe_path(), crate::commands::synthesize_recipe(formula))?;

        if let Some(old) = &old_version {
            let _ = crate::link::unlink_bins(&pkg);
            let _ = crate::link::unoptlink(&pkg);
            let old_handle = pkg.version(old);
            let _ = std::fs::remove_dir_all(old_handle.path());
        }

        if !formula.keg_only {
            crate::link::optlink(&version)?;
            if had_bins || old_version.is_none() {
                crate::link::link_bins(&version)?;
            }
        }
        pkg.set_primary(is_primary)?;

        println!(
            "{} upgraded {} {} -> {}",
            "✓".green(),
            formula.name.bold(),
            old_version.unwrap_or_default().dimmed(),
            new_version.cyan()
        );
    }

    if !errors.is_empty() {
        eprintln!("{errors}");
    }

    Ok(())
}
