//! Library crate backing the `keg` CLI: a standalone, client-side installer for
//! precompiled macOS bottles, independent of any package manager's own toolchain.
//!
//! # Architecture
//!
//! - **store**: on-disk layout (`Cellar`/`opt`/`bin`/`download`/`cache`) and the
//!   `PackageHandle`/`VersionHandle` primitives every other module builds on
//! - **link**: the two-hop `opt/<pkg>` + `bin/<exe>` symlink indirection
//! - **graph**: dependency closures, `autoremove` candidates, uninstall planning
//! - **formula**: the recipe-file dependency parser
//! - **bottle**: archive extraction, Mach-O relocation, placeholder rewriting
//! - **api**: the formula metadata API client
//! - **cache**: on-disk response caching with per-category TTLs
//! - **download**: bottle archive downloads from the registry
//! - **config**: `config.ini` loading
//! - **platform**: machine profile detection
//! - **error**: unified error type and the accumulate-then-flush error summary

pub mod api;
pub mod bottle;
pub mod cache;
pub mod commands;
pub mod config;
pub mod download;
pub mod error;
pub mod formula;
pub mod graph;
pub mod link;
pub mod platform;
pub mod store;

pub use api::{Api, Bottle, Formula, Versions};
pub use cache::Cache;
pub use config::Config;
pub use error::{ErrorSummary, KegError, Result};
pub use graph::{DependencyGraph, UninstallPlan};
pub use platform::MachineProfile;
pub use store::{PackageHandle, Store, VersionHandle};
