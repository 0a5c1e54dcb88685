//! Infrastructure layer
//!
//! Handles all I/O operations: filesystem and external processes.
//! This module is the only place where side effects occur.

pub mod cmake;
pub mod dirs;
pub mod filesystem;
pub mod git;
pub mod process;
pub mod spack;
