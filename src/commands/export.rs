//! The `export` verb: print one line per primary (explicitly requested) package, for
//! reproducing the install set elsewhere.

use crate::commands::Context;
use crate::error::Result;

pub fn export(ctx: &Context, with_versions: bool) -> Result<()> {
    let mut packages: Vec<_> = ctx
        .store
        .installed_packages()
        .into_iter()
        .filter(|p| p.is_primary())
        .collect();
    packages.sort_by(|a, b| a.name.cmp(&b.name));

    for pkg in &packages {
        if with_versions {
            if let Some(version) = pkg.active_version() {
                println!("{}@{}", pkg.name, version);
                continue;
            }
        }
        println!("{}", pkg.name);
    }

    Ok(())
}
