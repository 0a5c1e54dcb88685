//! CLI implementation for `spackdev getdeps`

use anyhow::{Context, Result};

use crate::cli::output::print_status;
use crate::core::area::AreaLayout;
use crate::core::config::GlobalConfig;
use crate::core::init::install_dependencies;
use crate::core::package_info::PersistedState;
use crate::infra::dirs::SpackdevDirs;
use crate::infra::process::EnvOverlay;
use crate::infra::spack::SpackCli;

/// Execute the getdeps command
pub fn execute() -> Result<()> {
    let config = GlobalConfig::load(&SpackdevDirs::new()).context("Failed to load configuration")?;
    let layout = AreaLayout::discover(None).context("Unable to find a development area")?;
    let PersistedState { lists, graph } =
        PersistedState::load(&layout).context("Failed to read package information")?;

    print_status(&format!(
        "requesting install of dependencies for: {}",
        lists.dev_package_names().join(" ")
    ));
    let spack = SpackCli::new(config.spack(), EnvOverlay::new());
    install_dependencies(&lists, &graph, &spack).context("Failed to install dependencies")?;
    Ok(())
}
