//! Development area initialization
//!
//! Runs the whole pipeline: prepare the area, compute or reload the package
//! information, stage sources, install dependencies, write tool wrappers and
//! environments, generate the superbuild and bootstrap it. Progress is
//! reported through [`InitEvent`]s; nothing here prints.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::area::{prepare_area, AreaLayout, PrepareOptions, ENV_BASE, ENV_PREFIX};
use crate::core::build_system::BuildSystem;
use crate::core::closure::{compute_closure, unrelated_roots};
use crate::core::environment::{Environment, EnvironmentArtifacts};
use crate::core::graph::DependencyGraph;
use crate::core::install_args::{format_dependencies_for_install, install_args_for_package};
use crate::core::package_info::{PackageLists, PersistedState};
use crate::core::package_ref::{PackageRef, VersionSelector};
use crate::core::path_rewrite::PathRewriter;
use crate::core::plan::write_plan;
use crate::core::stage::stage_packages;
use crate::core::superbuild::render_cmakelists;
use crate::core::tree::format_spec_trees;
use crate::core::wrappers;
use crate::error::{ConfigError, Result};
use crate::infra::cmake;
use crate::infra::filesystem;
use crate::infra::process::EnvOverlay;
use crate::infra::spack::PackageManager;

/// Variable telling package recipes which generator the area uses
pub const ENV_GENERATOR: &str = "SPACKDEV_GENERATOR";

/// Whether and how development spec trees are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecTreeMode {
    /// Print the trees and continue
    Print,
    /// Print the trees and stop
    PrintAndExit,
}

/// Options for `init`
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Requested package descriptors
    pub packages: Vec<PackageRef>,
    /// Continue an interrupted initialization
    pub resume: bool,
    /// File of install specs to concretize instead of the package names
    pub dag_file: Option<PathBuf>,
    /// Leave sources unstaged
    pub no_stage: bool,
    /// Stop before installing dependencies
    pub no_dependencies: bool,
    /// CMake generator for the superbuild
    pub generator: String,
    /// Force the generator on every package
    pub override_generator: bool,
    /// Accept a non-empty base directory
    pub force: bool,
    /// Base directory of the area
    pub base_dir: Option<PathBuf>,
    /// Selector for packages given without one
    pub default_selector: VersionSelector,
    /// Spec tree printing
    pub spec_tree: Option<SpecTreeMode>,
    /// CMake executable used to bootstrap the superbuild
    pub cmake: String,
    /// Program the command shims invoke for `build-env`
    pub launcher: String,
}

/// Progress of the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitEvent {
    /// Package information is read back from the area
    Resuming,
    /// Package information is being computed
    Calculating,
    /// Requested packages, and the DAG file they came from
    Requested {
        packages: Vec<String>,
        dag_file: Option<PathBuf>,
    },
    /// Packages pulled in between requested ones
    Additional(Vec<String>),
    /// Rendered development spec trees
    SpecTrees(String),
    /// Sources are being staged
    Staging(Vec<String>),
    /// Dependencies of the development packages are being installed
    InstallingDependencies(Vec<String>),
    /// An environment is being created for a package
    CreatingEnvironment(String),
    /// The superbuild description is being written
    GeneratingCmakeLists,
    /// The superbuild is being configured
    InitializingBuildArea,
}

/// Why initialization stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Spec trees were printed with [`SpecTreeMode::PrintAndExit`]
    SpecTreesPrinted,
    /// Dependencies were not installed; the area is incomplete
    DependenciesSkipped,
}

/// Result of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// The area is ready
    Complete(AreaLayout),
    /// The pipeline stopped before completion
    Stopped(AreaLayout, StopReason),
}

/// Check option combinations the argument parser cannot express
pub fn validate_options(options: &InitOptions) -> Result<(), ConfigError> {
    if options.resume && (!options.packages.is_empty() || options.dag_file.is_some()) {
        return Err(ConfigError::InvalidArguments {
            message: "--resume is incompatible with --dag-file or package arguments".to_string(),
        });
    }
    if !options.resume && options.packages.is_empty() {
        return Err(ConfigError::InvalidArguments {
            message: "no packages specified: name at least one package to develop, or use --resume"
                .to_string(),
        });
    }
    for (index, package) in options.packages.iter().enumerate() {
        if options.packages[..index].iter().any(|p| p.name() == package.name()) {
            return Err(ConfigError::DuplicatePackage {
                name: package.name().to_string(),
            });
        }
    }
    Ok(())
}

/// Overlay for every subprocess of the pipeline
///
/// `SPACKDEV_*` variables of an enclosing area are dropped and the new area
/// and generator are exported.
pub fn pipeline_overlay(ambient: &Environment, layout: &AreaLayout, generator: &str) -> EnvOverlay {
    ambient
        .iter()
        .filter(|(name, _)| name.starts_with(ENV_PREFIX))
        .fold(EnvOverlay::new(), |overlay, (name, _)| overlay.without_var(name))
        .with_var(ENV_BASE, layout.base().to_string_lossy())
        .with_var(ENV_GENERATOR, generator)
}

/// Read the install specs of a DAG file
pub fn read_dag_file(path: &Path) -> Result<Vec<String>> {
    let content = filesystem::read_file(path)?;
    Ok(content.split_whitespace().map(str::to_string).collect())
}

/// Concretize, compute the closure and persist the package information
pub fn calculate_package_info(
    options: &InitOptions,
    layout: &AreaLayout,
    pm: &dyn PackageManager,
) -> Result<PersistedState> {
    let default = Some(&options.default_selector);
    let requested: Vec<PackageRef> = options
        .packages
        .iter()
        .cloned()
        .map(|r| r.or_default_selector(default))
        .collect();
    let requested_names: Vec<String> = requested.iter().map(|r| r.name().to_string()).collect();

    let specs = match &options.dag_file {
        Some(path) => read_dag_file(path)?,
        None => requested_names.clone(),
    };
    let graph = pm.concretize(&specs)?;
    let closure = compute_closure(&requested_names, &graph)?;

    let additional: Vec<PackageRef> = closure
        .additional
        .iter()
        .map(|name| PackageRef::new(name.as_str()).or_default_selector(default))
        .collect();

    let mut dev_names = requested_names;
    dev_names.extend(closure.additional.iter().cloned());
    let mut external = closure.external;
    for root in unrelated_roots(&dev_names, &graph) {
        if !external.contains(&root) {
            external.push(root);
        }
    }

    let state = PersistedState {
        lists: PackageLists {
            requested,
            additional,
            external,
        },
        graph,
    };
    state.save(layout)?;
    Ok(state)
}

/// Build environment of one development package, redirected to the area
///
/// The package manager's environment is stripped of session noise and of
/// everything identical to `ambient`, `SPACK_PREFIX` points at the area's
/// install root, and every value is rewritten with `rewriter`.
pub fn capture_package_environment(
    pm: &dyn PackageManager,
    spec: &str,
    ambient: &Environment,
    layout: &AreaLayout,
    rewriter: &PathRewriter,
) -> Result<Environment> {
    let mut env = pm.build_environment(spec)?.sanitize(true, ambient);
    if env.get("SPACK_PREFIX").is_some() {
        env.insert("SPACK_PREFIX", layout.install_dir().to_string_lossy());
    }
    Ok(env.map_values(|value| rewriter.rewrite(value)))
}

/// Environment users source to enter the area
pub fn area_environment(ambient: &Environment, layout: &AreaLayout) -> Environment {
    let mut env = ambient.sanitize(false, ambient);
    env.insert(ENV_BASE, layout.base().to_string_lossy());
    let bin = layout.aux_bin_dir();
    let path = match ambient.get("PATH") {
        Some(path) if !path.is_empty() => format!("{}:{path}", bin.display()),
        _ => bin.display().to_string(),
    };
    env.insert("PATH", path);
    env
}

fn node_spec(graph: &DependencyGraph, package: &str) -> Result<String, ConfigError> {
    graph
        .node(package)
        .map(install_args_for_package)
        .ok_or_else(|| ConfigError::UnknownPackage {
            name: package.to_string(),
        })
}

/// Run the initialization pipeline
///
/// `make_pm` receives the subprocess overlay of the new area and returns the
/// package manager used for every later step.
#[allow(clippy::too_many_lines)]
pub fn run_init<P, F>(
    options: &InitOptions,
    ambient: &Environment,
    cwd: &Path,
    make_pm: F,
    report: &mut dyn FnMut(InitEvent),
) -> Result<InitOutcome>
where
    P: PackageManager,
    F: FnOnce(EnvOverlay) -> P,
{
    validate_options(options)?;

    let layout = prepare_area(
        &PrepareOptions {
            base_dir: options.base_dir.clone(),
            force: options.force,
            resume: options.resume,
        },
        ambient.get(ENV_BASE),
        cwd,
    )?;

    let build_system = BuildSystem::new(&options.generator, options.override_generator)?;
    let overlay = pipeline_overlay(ambient, &layout, build_system.generator());
    let pm = make_pm(overlay.clone());

    let state = if options.resume {
        report(InitEvent::Resuming);
        PersistedState::load(&layout)?
    } else {
        report(InitEvent::Calculating);
        calculate_package_info(options, &layout, &pm)?
    };
    let PersistedState { lists, graph } = state;
    report(InitEvent::Requested {
        packages: lists.requested.iter().map(|r| r.name().to_string()).collect(),
        dag_file: options.dag_file.clone(),
    });
    if !lists.additional.is_empty() {
        report(InitEvent::Additional(
            lists.additional.iter().map(|r| r.name().to_string()).collect(),
        ));
    }

    let dev_packages = lists.dev_package_names();
    let specs = dev_packages
        .iter()
        .map(|package| Ok((package.clone(), node_spec(&graph, package)?)))
        .collect::<Result<BTreeMap<String, String>, ConfigError>>()?;

    if let Some(mode) = options.spec_tree {
        report(InitEvent::SpecTrees(format_spec_trees(&dev_packages, &graph)));
        if mode == SpecTreeMode::PrintAndExit {
            return Ok(InitOutcome::Stopped(layout, StopReason::SpecTreesPrinted));
        }
    }

    if !options.no_stage {
        report(InitEvent::Staging(dev_packages.clone()));
        stage_packages(&layout, &lists, &graph, &[], &pm)?;
    }

    if options.no_dependencies {
        return Ok(InitOutcome::Stopped(layout, StopReason::DependenciesSkipped));
    }

    report(InitEvent::InstallingDependencies(dev_packages.clone()));
    install_dependencies(&lists, &graph, &pm)?;

    let linked = wrappers::link_global_tools(&layout, &graph, &pm)?;
    tracing::debug!("Linked global tools: {linked:?}");

    let mut rewriter = PathRewriter::new(
        &pm.install_root()?,
        &layout.stage_root(),
        layout.install_dir(),
        layout.build_dir(),
    );
    rewriter.set_active_packages(&dev_packages);

    let mut environments = BTreeMap::new();
    for package in &dev_packages {
        report(InitEvent::CreatingEnvironment(package.clone()));
        let mut env =
            capture_package_environment(&pm, &specs[package], ambient, &layout, &rewriter)?;
        wrappers::write_compiler_wrappers(&layout, package, &mut env)?;
        wrappers::write_command_shims(
            &layout,
            package,
            &options.launcher,
            build_system.build_command(),
        )?;
        EnvironmentArtifacts::new(layout.package_env_dir(package)).write(&env)?;
        environments.insert(package.clone(), env);
    }
    EnvironmentArtifacts::new(layout.aux_env_dir()).write(&area_environment(ambient, &layout))?;

    report(InitEvent::GeneratingCmakeLists);
    let mut args_by_package = BTreeMap::new();
    for (package, env) in &environments {
        args_by_package.insert(package.clone(), pm.cmake_args(&specs[package], env)?);
    }
    let description = write_plan(
        &dev_packages,
        &graph,
        &build_system,
        &mut rewriter,
        &args_by_package,
        &layout,
    )?;
    filesystem::write_file(&layout.cmakelists_path(), &render_cmakelists(&description))?;

    report(InitEvent::InitializingBuildArea);
    let output = cmake::bootstrap(
        &options.cmake,
        &layout,
        build_system.generator(),
        overlay,
        options.no_stage,
    )?;
    tracing::info!("{}", output.stdout_lossy().trim_end());

    Ok(InitOutcome::Complete(layout))
}

/// Install the prebuilt dependencies recorded for an area
pub fn install_dependencies(
    lists: &PackageLists,
    graph: &DependencyGraph,
    pm: &dyn PackageManager,
) -> Result<()> {
    let dev_packages = lists.dev_package_names();
    for request in format_dependencies_for_install(&dev_packages, &lists.external, graph) {
        tracing::debug!("Installing dependency {}", request.package);
        pm.install(&request.args)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct EnvOnly(Environment);

    impl PackageManager for EnvOnly {
        fn concretize(&self, _: &[String]) -> Result<DependencyGraph> {
            unreachable!()
        }
        fn install_root(&self) -> Result<PathBuf> {
            unreachable!()
        }
        fn install_prefix(&self, _: &str) -> Result<PathBuf> {
            unreachable!()
        }
        fn install(&self, _: &[String]) -> Result<()> {
            unreachable!()
        }
        fn stage(&self, _: &str, _: &Path) -> Result<()> {
            unreachable!()
        }
        fn build_environment(&self, _: &str) -> Result<Environment> {
            Ok(self.0.clone())
        }
        fn cmake_args(&self, _: &str, _: &Environment) -> Result<Vec<String>> {
            unreachable!()
        }
    }

    fn env(pairs: &[(&str, &str)]) -> Environment {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn options(packages: &[&str]) -> InitOptions {
        InitOptions {
            packages: packages.iter().map(|p| p.parse().unwrap()).collect(),
            resume: false,
            dag_file: None,
            no_stage: false,
            no_dependencies: false,
            generator: "Unix Makefiles".to_string(),
            override_generator: false,
            force: false,
            base_dir: None,
            default_selector: VersionSelector::Branch("develop".to_string()),
            spec_tree: None,
            cmake: "cmake".to_string(),
            launcher: "spackdev".to_string(),
        }
    }

    #[test]
    fn test_resume_excludes_packages() {
        let mut opts = options(&["art"]);
        opts.resume = true;
        assert!(validate_options(&opts).is_err());

        let mut opts = options(&[]);
        opts.resume = true;
        opts.dag_file = Some(PathBuf::from("dag"));
        assert!(validate_options(&opts).is_err());

        let mut opts = options(&[]);
        opts.resume = true;
        assert!(validate_options(&opts).is_ok());
    }

    #[test]
    fn test_packages_required_without_resume() {
        assert!(validate_options(&options(&[])).is_err());
        assert!(validate_options(&options(&["art"])).is_ok());
    }

    #[test]
    fn test_duplicate_packages_rejected() {
        let result = validate_options(&options(&["art", "canvas", "art@v1"]));
        assert!(matches!(
            result,
            Err(ConfigError::DuplicatePackage { ref name }) if name == "art"
        ));
        assert!(validate_options(&options(&["art", "canvas"])).is_ok());
    }

    #[test]
    fn test_pipeline_overlay() {
        let ambient = env(&[("SPACKDEV_BASE", "/old"), ("SPACKDEV_EXTRA", "x"), ("PATH", "/bin")]);
        let overlay = pipeline_overlay(&ambient, &AreaLayout::new("/area"), "Ninja");
        assert_eq!(overlay.get(ENV_BASE), Some("/area"));
        assert_eq!(overlay.get(ENV_GENERATOR), Some("Ninja"));
        assert_eq!(overlay.get("SPACKDEV_EXTRA"), None);
        assert_eq!(overlay.get("PATH"), None);
    }

    #[test]
    fn test_captured_environment_redirected() {
        let layout = AreaLayout::new("/area");
        let mut rewriter = PathRewriter::new(
            Path::new("/spack/opt"),
            &layout.stage_root(),
            layout.install_dir(),
            layout.build_dir(),
        );
        rewriter.set_active_packages(&["art"]);
        let pm = EnvOnly(env(&[
            ("SPACK_PREFIX", "/spack/opt/x/art/1-h"),
            ("CMAKE_PREFIX_PATH", "/spack/opt/x/art/1-h:/spack/opt/x/boost/1-h"),
            ("HOME", "/home/dev"),
            ("EDITOR", "vi"),
        ]));
        let ambient = env(&[("EDITOR", "vi")]);

        let captured =
            capture_package_environment(&pm, "art@1", &ambient, &layout, &rewriter).unwrap();
        assert_eq!(captured.get("SPACK_PREFIX"), Some("/area/install"));
        assert_eq!(
            captured.get("CMAKE_PREFIX_PATH"),
            Some("/area/install/art:/spack/opt/x/boost/1-h")
        );
        assert_eq!(captured.get("HOME"), None);
        assert_eq!(captured.get("EDITOR"), None);
    }

    #[test]
    fn test_area_environment() {
        let ambient = env(&[("PATH", "/usr/bin"), ("TERM", "xterm"), ("LANG", "C")]);
        let area = area_environment(&ambient, &AreaLayout::new("/area"));
        assert_eq!(area.get(ENV_BASE), Some("/area"));
        assert_eq!(area.get("PATH"), Some("/area/spackdev-aux/bin:/usr/bin"));
        assert_eq!(area.get("LANG"), Some("C"));
        assert_eq!(area.get("TERM"), None);
    }

    #[test]
    fn test_install_dependencies_skips_dev_packages() {
        struct Recorder(RefCell<Vec<Vec<String>>>);
        impl PackageManager for Recorder {
            fn concretize(&self, _: &[String]) -> Result<DependencyGraph> {
                unreachable!()
            }
            fn install_root(&self) -> Result<PathBuf> {
                unreachable!()
            }
            fn install_prefix(&self, _: &str) -> Result<PathBuf> {
                unreachable!()
            }
            fn install(&self, args: &[String]) -> Result<()> {
                self.0.borrow_mut().push(args.to_vec());
                Ok(())
            }
            fn stage(&self, _: &str, _: &Path) -> Result<()> {
                unreachable!()
            }
            fn build_environment(&self, _: &str) -> Result<Environment> {
                unreachable!()
            }
            fn cmake_args(&self, _: &str, _: &Environment) -> Result<Vec<String>> {
                unreachable!()
            }
        }

        let g = crate::core::graph::tests::graph(&[("art", &["boost"]), ("boost", &[])]);
        let lists = PackageLists {
            requested: vec![PackageRef::new("art")],
            additional: Vec::new(),
            external: vec!["boost".to_string()],
        };
        let pm = Recorder(RefCell::new(Vec::new()));
        install_dependencies(&lists, &g, &pm).unwrap();
        assert_eq!(*pm.0.borrow(), [vec!["boost@1.0".to_string()]]);
    }
}
