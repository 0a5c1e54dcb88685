//! CLI implementation for `spackdev stage`

use anyhow::{Context, Result};

use crate::cli::output::{create_spinner, print_status};
use crate::core::area::AreaLayout;
use crate::core::config::GlobalConfig;
use crate::core::package_info::PersistedState;
use crate::core::stage::{stage_packages, StageOutcome};
use crate::infra::dirs::SpackdevDirs;
use crate::infra::process::EnvOverlay;
use crate::infra::spack::SpackCli;

/// Execute the stage command
pub fn execute(packages: &[String]) -> Result<()> {
    let config = GlobalConfig::load(&SpackdevDirs::new()).context("Failed to load configuration")?;
    let layout = AreaLayout::discover(None).context("Unable to find a development area")?;
    let PersistedState { lists, graph } =
        PersistedState::load(&layout).context("Failed to read package information")?;
    let spack = SpackCli::new(config.spack(), EnvOverlay::new());

    let spinner = create_spinner("staging sources");
    let staged = stage_packages(&layout, &lists, &graph, packages, &spack);
    spinner.finish_and_clear();

    for (package, outcome) in staged.context("Staging failed")? {
        match outcome {
            StageOutcome::Staged(dir) => {
                print_status(&format!("staged {package} in {}", dir.display()));
            }
            StageOutcome::AlreadyStaged(_) => {
                print_status(&format!("{package} is already staged: skipping"));
            }
        }
    }
    Ok(())
}
