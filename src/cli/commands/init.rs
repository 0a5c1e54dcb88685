//! CLI implementation for `spackdev init`

use std::process::ExitCode;

use anyhow::{Context, Result};

use super::InitArgs;
use crate::cli::output::{create_spinner, print_block, print_status};
use crate::core::build_system::{MAKE_GENERATOR, NINJA_GENERATOR};
use crate::core::config::GlobalConfig;
use crate::core::environment::Environment;
use crate::core::init::{run_init, InitEvent, InitOptions, InitOutcome, SpecTreeMode, StopReason};
use crate::core::package_ref::PackageRef;
use crate::infra::dirs::SpackdevDirs;
use crate::infra::spack::SpackCli;

/// Execute the init command
pub fn execute(args: &InitArgs) -> Result<ExitCode> {
    let config = GlobalConfig::load(&SpackdevDirs::new()).context("Failed to load configuration")?;
    let options = init_options(args, &config)?;
    let ambient = Environment::from_process();
    let cwd = std::env::current_dir().context("Failed to determine the working directory")?;
    let spack = config.spack().to_string();

    let mut spinner = None;
    let outcome = run_init(
        &options,
        &ambient,
        &cwd,
        |overlay| SpackCli::new(spack, overlay),
        &mut |event| report(&event, &mut spinner),
    );
    if let Some(pb) = spinner.take() {
        pb.finish_and_clear();
    }

    match outcome.context("Initialization failed")? {
        InitOutcome::Complete(layout) => {
            print_status(&format!("initialization of {} complete;", layout.base().display()));
            print_status(&format!("source {} to begin.", layout.env_script().display()));
            Ok(ExitCode::SUCCESS)
        }
        InitOutcome::Stopped(_, StopReason::SpecTreesPrinted) => Ok(ExitCode::FAILURE),
        InitOutcome::Stopped(_, StopReason::DependenciesSkipped) => {
            print_status("Dependencies will not be built, the development area is incomplete.");
            print_status("Use spackdev init --resume to complete initialization.");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Translate command-line arguments into pipeline options
fn init_options(args: &InitArgs, config: &GlobalConfig) -> Result<InitOptions> {
    let packages = args
        .packages
        .iter()
        .map(|descriptor| descriptor.parse::<PackageRef>())
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid package argument")?;

    let generator = if args.make {
        MAKE_GENERATOR.to_string()
    } else if args.ninja {
        NINJA_GENERATOR.to_string()
    } else {
        args.generator
            .clone()
            .unwrap_or_else(|| config.generator().to_string())
    };

    let spec_tree = if args.print_spec_tree_and_exit {
        Some(SpecTreeMode::PrintAndExit)
    } else if args.print_spec_tree {
        Some(SpecTreeMode::Print)
    } else {
        None
    };

    let launcher = std::env::current_exe()
        .map(|exe| exe.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "spackdev".to_string());

    Ok(InitOptions {
        packages,
        resume: args.resume,
        dag_file: args.dag_file.clone(),
        no_stage: args.no_stage,
        no_dependencies: args.no_dependencies,
        generator,
        override_generator: args.override_generator,
        force: args.force,
        base_dir: args.base_dir.clone(),
        default_selector: config
            .default_selector(args.default_branch.as_deref(), args.default_tag.as_deref()),
        spec_tree,
        cmake: config.cmake().to_string(),
        launcher,
    })
}

/// Render one pipeline event as status output
///
/// Long-running phases get a spinner that is replaced by the next event.
fn report(event: &InitEvent, spinner: &mut Option<indicatif::ProgressBar>) {
    if let Some(pb) = spinner.take() {
        pb.finish_and_clear();
    }
    match event {
        InitEvent::Resuming => print_status("resuming initialization from saved state"),
        InitEvent::Calculating => {
            *spinner = Some(create_spinner("calculating package information"));
        }
        InitEvent::Requested { packages, dag_file } => {
            print_status(&format!("requested packages: {}", packages.join(" ")));
            if let Some(file) = dag_file {
                print_status(&format!("from DAG file {}", file.display()));
            }
        }
        InitEvent::Additional(packages) => {
            print_status(&format!("additional dependent packages: {}", packages.join(" ")));
        }
        InitEvent::SpecTrees(trees) => {
            print_status("development spec trees:");
            print_block(trees);
        }
        InitEvent::Staging(packages) => {
            *spinner = Some(create_spinner(&format!("staging sources for {}", packages.join(" "))));
        }
        InitEvent::InstallingDependencies(packages) => {
            print_status(&format!("installing dependencies for {}", packages.join(" ")));
        }
        InitEvent::CreatingEnvironment(package) => {
            print_status(&format!("creating environment for {package}"));
        }
        InitEvent::GeneratingCmakeLists => print_status("generating CMakeLists.txt"),
        InitEvent::InitializingBuildArea => {
            *spinner = Some(create_spinner("initializing build area"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::package_ref::VersionSelector;

    #[test]
    fn test_generator_shortcuts() {
        let config = GlobalConfig::default();
        let ninja = InitArgs {
            packages: vec!["art".to_string()],
            ninja: true,
            ..InitArgs::default()
        };
        assert_eq!(init_options(&ninja, &config).unwrap().generator, "Ninja");

        let plain = InitArgs {
            packages: vec!["art".to_string()],
            ..InitArgs::default()
        };
        assert_eq!(init_options(&plain, &config).unwrap().generator, config.generator());
    }

    #[test]
    fn test_descriptors_and_selector() {
        let config = GlobalConfig::default();
        let args = InitArgs {
            packages: vec!["art@v3".to_string(), "cetlib".to_string()],
            default_tag: Some("v1".to_string()),
            print_spec_tree: true,
            ..InitArgs::default()
        };
        let options = init_options(&args, &config).unwrap();
        assert_eq!(options.packages[0].selector(), Some(&VersionSelector::Tag("v3".to_string())));
        assert_eq!(options.packages[1].selector(), None);
        assert_eq!(options.default_selector, VersionSelector::Tag("v1".to_string()));
        assert_eq!(options.spec_tree, Some(SpecTreeMode::Print));
    }

    #[test]
    fn test_bad_descriptor() {
        let args = InitArgs {
            packages: vec!["@v3".to_string()],
            ..InitArgs::default()
        };
        assert!(init_options(&args, &GlobalConfig::default()).is_err());
    }
}
