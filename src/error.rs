//! Error types for spackdev
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
///
/// Always fatal: the command exits non-zero with the diagnostic.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Requested package has no node in the dependency graph
    #[error("Unable to find spec for specified package '{name}'")]
    UnknownPackage { name: String },

    /// Package is not part of the development area
    #[error("'{name}' is not in the list of development area packages ({known})")]
    NotADevPackage { name: String, known: String },

    /// Generator string names no supported primary generator
    #[error(
        "Invalid generator '{generator}': primary generator must be either \"Unix Makefiles\" or \"Ninja\""
    )]
    InvalidGenerator { generator: String },

    /// Persisted package list written by an obsolete release
    #[error(
        "'{path}' is in an obsolete (unsafe) format: re-run 'spackdev init' or initialize a new development area"
    )]
    ObsoletePackageList { path: PathBuf },

    /// Persisted package list is missing or truncated
    #[error("Package list '{path}' is missing or truncated: {reason}")]
    InvalidPackageList { path: PathBuf, reason: String },

    /// No development area could be located
    #[error(
        "Unable to find a development area{}: source spackdev-aux/env/env.sh or run from the parent of spackdev-aux/",
        .path.as_ref().map(|p| format!(" ({})", p.display())).unwrap_or_default()
    )]
    AreaNotFound { path: Option<PathBuf> },

    /// Base directory already in use
    #[error("Refusing to use non-empty directory {path}. Use --force to initialize anyway")]
    DirectoryNotEmpty { path: PathBuf },

    /// Base directory cannot be created
    #[error("{path} is not a directory or its parent does not exist")]
    InvalidBaseDir { path: PathBuf },

    /// Environment already belongs to a development area
    #[error("Current environment is already aware of a development area ({base})")]
    AlreadyInArea { base: String },

    /// Package named more than once on the command line
    #[error("Package '{name}' specified more than once")]
    DuplicatePackage { name: String },

    /// Mutually exclusive options were combined
    #[error("{message}")]
    InvalidArguments { message: String },

    /// Global config file is unreadable
    #[error("Failed to parse config file '{path}': {error}")]
    ConfigFile { path: PathBuf, error: String },
}

/// Errors from external programs (package manager, build tool)
#[derive(Error, Debug)]
pub enum ExternalToolError {
    /// Program could not be started
    #[error("Failed to execute '{program}': {error}")]
    SpawnFailed { program: String, error: String },

    /// Program exited unsuccessfully
    #[error("'{command}' failed with status {status}{}", format_output(.stderr))]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// Program produced output we could not interpret
    #[error("Unexpected output from '{command}': {error}")]
    BadOutput { command: String, error: String },
}

fn format_output(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{trimmed}")
    }
}

/// Resume requested but required artifacts are missing
#[derive(Error, Debug)]
pub enum PartialStateError {
    /// Package list or specs directory missing
    #[error("--resume specified, but required {missing} missing: redo from start")]
    MissingArtifacts { missing: String },

    /// A dependency graph fragment is absent
    #[error("Dependency graph fragment for '{package}' missing: re-run 'spackdev init' or initialize a new development area")]
    MissingFragment { package: String },

    /// Fragments do not match the recorded fingerprint
    #[error("Dependency graph fragments in '{path}' were modified or are incomplete: redo from start")]
    FingerprintMismatch { path: PathBuf },
}

/// Package descriptor parse errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackageRefError {
    /// Descriptor has no package name
    #[error("Invalid package descriptor '{descriptor}': missing package name")]
    MissingName { descriptor: String },

    /// Descriptor has a selector marker but no value
    #[error("Invalid package descriptor '{descriptor}': empty tag or branch")]
    EmptySelector { descriptor: String },
}

/// Dependency graph errors
#[derive(Error, Debug)]
pub enum GraphError {
    /// Edge points to a package with no node
    #[error("Missing dependency: '{dependency}' required by '{package}'")]
    MissingDependency { package: String, dependency: String },

    /// Package manager output could not be decoded
    #[error("Failed to parse dependency graph: {0}")]
    Parse(String),

    /// Graph fragment could not be decoded
    #[error("Failed to parse dependency graph fragment '{path}': {error}")]
    Fragment { path: PathBuf, error: String },
}

/// Build plan generation errors
#[derive(Error, Debug)]
pub enum PlanError {
    /// Leaf removal stalled
    #[error("Circular or inconsistent dependencies among development packages: {}", .remaining.join(", "))]
    CircularDependency { remaining: Vec<String> },

    /// Development package is unknown to the graph
    #[error("Unable to find spec for development package '{package}'")]
    UnknownPackage { package: String },

    /// Development package listed twice
    #[error("Development package '{package}' listed more than once")]
    DuplicatePackage { package: String },

    /// Generator selected by a package is unusable
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Environment persistence errors
#[derive(Error, Debug)]
pub enum EnvironmentError {
    /// Package environment not found
    #[error("Unable to find environment for '{package}': not a package being developed?")]
    NotFound { package: String },

    /// Binary environment could not be encoded or decoded
    #[error("Failed to (de)serialize environment '{path}': {error}")]
    Serialize { path: PathBuf, error: String },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Failed to move, link or chmod a path
    #[error("Failed to {operation} '{path}': {error}")]
    Operation {
        operation: &'static str,
        path: PathBuf,
        error: String,
    },
}

/// Source checkout errors
#[derive(Error, Debug)]
pub enum GitError {
    /// Requested tag or branch does not exist
    #[error("Ref {reference} not found in repository '{}'", .repo.display())]
    RefNotFound { repo: PathBuf, reference: String },

    /// Ref exists but does not lead to a commit
    #[error("Failed to resolve {reference} to a commit: {error}")]
    ResolveFailed { reference: String, error: String },

    /// git CLI failed
    #[error(transparent)]
    Tool(#[from] ExternalToolError),
}

/// Top-level spackdev error type
#[derive(Error, Debug)]
pub enum SpackdevError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// External tool error
    #[error(transparent)]
    ExternalTool(#[from] ExternalToolError),

    /// Source checkout error
    #[error(transparent)]
    Git(#[from] GitError),

    /// Partial state error
    #[error(transparent)]
    PartialState(#[from] PartialStateError),

    /// Package descriptor error
    #[error(transparent)]
    PackageRef(#[from] PackageRefError),

    /// Dependency graph error
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Plan error
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Environment error
    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    /// Filesystem error
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Result alias for library operations
pub type Result<T, E = SpackdevError> = std::result::Result<T, E>;
