//! The `cleanup` verb: remove inactive installed versions, keeping each package's active
//! (opt-linked) version and skipping pinned packages entirely.

use crate::commands::Context;
use crate::error::{ErrorSummary, Result};
use colored::Colorize;

pub fn cleanup(ctx: &Context, names: &[String], dry_run: bool) -> Result<()> {
    let targets: Vec<String> = if names.is_empty() {
        ctx.store.installed_names()
    } else {
        names.to_vec()
    };

    if dry_run {
        println!("{} dry run, no files will be removed", "ℹ".blue());
    }

    let mut errors = ErrorSummary::new();
    let mut total_removed = 0u64;
    let mut total_space_freed = 0u64;

    for name in &targets {
        let pkg = ctx.store.package(name);
        let versions = pkg.versions();
        if versions.len() <= 1 {
            continue;
        }
        if pkg.is_pinned() {
            continue;
        }

        let active = pkg.active_version();
        let stale: Vec<&String> = versions
            .iter()
            .filter(|v| Some((*v).as_str()) != active.as_deref())
            .collect();

        for version in stale {
            let handle = pkg.version(version);
            let size = calculate_dir_size(&handle.path());
            total_space_freed += size;

            if dry_run {
                println!(
                    "  would remove {} {} ({})",
                    name.cyan(),
                    version.dimmed(),
                    format_size(size).dimmed()
                );
            } else {
                println!("  removing {} {} ({})", name.cyan(), version.dimmed(), format_size(size).dimmed());
                if let Err(e) = std::fs::remove_dir_all(handle.path()) {
                    errors.push(format!("{name}@{version}"), e);
                    continue;
                }
            }
            total_removed += 1;
        }
    }

    if !errors.is_empty() {
        eprintln!("{errors}");
    }

    if total_removed == 0 {
        println!("{} no old versions to remove", "✓".green());
    } else if dry_run {
        println!(
            "{} would remove {} old versions ({})",
            "ℹ".blue(),
            total_removed.to_string().bold(),
            format_size(total_space_freed).bold()
        );
    } else {
        println!(
            "{} removed {} old versions, freed {}",
            "✓".green().bold(),
            total_removed.to_string().bold(),
            format_size(total_space_freed).bold()
        );
    }

    Ok(())
}

fn calculate_dir_size(path: &std::path::Path) -> u64 {
    if !path.exists() {
        return 0;
    }
    walkdir::WalkDir::new(path)
        .follow_links(false)
        .max_open(64)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
