//! CLI implementation for `spackdev info`

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::output::{print_detail, print_status};
use crate::core::area::AreaLayout;
use crate::core::package_info::PackageLists;

/// Execute the info command
pub fn execute(path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("{} does not exist", path.display());
        }
    }
    let layout = AreaLayout::discover(path).context("Unable to find a development area")?;
    let lists = PackageLists::load(&layout).context("Failed to read package information")?;

    print_status(&format!("development area {}", layout.base().display()));
    print_list("requested packages:", lists.requested.iter().map(ToString::to_string));
    print_list("additional dependent packages:", lists.additional.iter().map(ToString::to_string));
    print_list("collected dependencies:", lists.external.iter().cloned());
    Ok(())
}

fn print_list(heading: &str, items: impl Iterator<Item = String>) {
    print_status(heading);
    for item in items {
        print_detail(&item);
    }
}
