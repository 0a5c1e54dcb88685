//! Output formatting and progress indicators
//!
//! User-facing status lines and spinners. Status lines go to stdout with a
//! `==>` prefix; warnings and errors go to stderr. `--quiet` silences
//! everything except errors.

use std::sync::atomic::{AtomicBool, Ordering};

use indicatif::{ProgressBar, ProgressStyle};

static QUIET: AtomicBool = AtomicBool::new(false);

/// Status message prefixes
pub mod status {
    /// Progress message prefix
    pub const MESSAGE: &str = "==>";

    /// Warning prefix
    pub const WARNING: &str = "==> Warning:";

    /// Error prefix
    pub const ERROR: &str = "==> Error:";
}

/// Output settings chosen on the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Suppress everything but errors
    pub quiet: bool,
}

impl OutputConfig {
    /// Settings from the global flags
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Make these settings visible to the printing functions
    pub fn apply_global(self) {
        QUIET.store(self.quiet, Ordering::Relaxed);
    }
}

/// Whether status output is suppressed
pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Print a `==> message` status line
pub fn print_status(message: &str) {
    if !is_quiet() {
        println!("{} {message}", status::MESSAGE);
    }
}

/// Print an indented detail line
pub fn print_detail(message: &str) {
    if !is_quiet() {
        println!("    {message}");
    }
}

/// Print a block of text as is
pub fn print_block(text: &str) {
    if !is_quiet() {
        print!("{text}");
        if !text.ends_with('\n') {
            println!();
        }
    }
}

/// Print a warning to stderr
pub fn print_warning(message: &str) {
    if !is_quiet() {
        eprintln!("{} {message}", status::WARNING);
    }
}

/// Print an error with its chain of causes to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("    caused by: {cause}");
    }
}

/// Create a spinner for operations with unknown duration
///
/// Hidden when output is quiet.
pub fn create_spinner(message: &str) -> ProgressBar {
    if is_quiet() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.blue} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
