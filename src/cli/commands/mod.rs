//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build_env;
pub mod getdeps;
pub mod info;
pub mod init;
pub mod stage;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Subcommand};

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a development area for the given packages
    Init(InitArgs),

    /// Stage sources of development packages into srcs/
    Stage {
        /// Packages to stage (all development packages if not specified)
        packages: Vec<String>,
    },

    /// Install the prebuilt dependencies of the development area
    Getdeps,

    /// Describe a development area
    Info {
        /// Area to describe (located from the environment if not specified)
        path: Option<PathBuf>,
    },

    /// Run a command in the build environment of a package
    BuildEnv {
        /// Change to the package's build directory first
        #[arg(long)]
        cd: bool,

        /// Show the package name in the prompt of an interactive bash
        #[arg(long)]
        prompt: bool,

        /// Development package
        package: String,

        /// Command and arguments (an interactive shell if not specified)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

/// Arguments of `spackdev init`
#[derive(Args, Debug, Default)]
pub struct InitArgs {
    /// Packages to develop: name, name@tag or name^branch
    pub packages: Vec<String>,

    /// Continue an interrupted initialization
    #[arg(long)]
    pub resume: bool,

    /// File of install specs to concretize instead of the package names
    #[arg(long, value_name = "FILE")]
    pub dag_file: Option<PathBuf>,

    /// Do not stage sources
    #[arg(long)]
    pub no_stage: bool,

    /// Stop before installing dependencies
    #[arg(long)]
    pub no_dependencies: bool,

    /// Use Unix Makefiles
    #[arg(short = 'm', long, group = "generator_choice")]
    pub make: bool,

    /// Use Ninja
    #[arg(short = 'n', long, group = "generator_choice")]
    pub ninja: bool,

    /// CMake generator to use
    #[arg(short = 'G', long, group = "generator_choice", value_name = "GENERATOR")]
    pub generator: Option<String>,

    /// Use the chosen generator for every package, ignoring their own
    #[arg(long)]
    pub override_generator: bool,

    /// Initialize in a non-empty directory, clearing previous area state
    #[arg(short, long)]
    pub force: bool,

    /// Base directory of the area
    #[arg(short, long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Branch for packages given without a tag or branch
    #[arg(long, value_name = "BRANCH", conflicts_with = "default_tag")]
    pub default_branch: Option<String>,

    /// Tag for packages given without a tag or branch
    #[arg(long, value_name = "TAG")]
    pub default_tag: Option<String>,

    /// Print the dependency trees of the development packages
    #[arg(short = 'p', long, conflicts_with = "print_spec_tree_and_exit")]
    pub print_spec_tree: bool,

    /// Print the dependency trees of the development packages and stop
    #[arg(short = 'P', long)]
    pub print_spec_tree_and_exit: bool,
}

impl Commands {
    /// Execute the command
    pub fn run(self) -> Result<ExitCode> {
        match self {
            Commands::Init(args) => init::execute(&args),
            Commands::Stage { packages } => stage::execute(&packages).map(|()| ExitCode::SUCCESS),
            Commands::Getdeps => getdeps::execute().map(|()| ExitCode::SUCCESS),
            Commands::Info { path } => info::execute(path.as_deref()).map(|()| ExitCode::SUCCESS),
            Commands::BuildEnv {
                cd,
                prompt,
                package,
                command,
            } => build_env::execute(package, command, cd, prompt),
        }
    }
}
