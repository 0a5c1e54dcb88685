//! spackdev - develop several interdependent packages as one build
//!
//! This library sets up a development area in which a chosen set of
//! packages is checked out, configured and built together as a CMake
//! superbuild, against dependencies installed by the spack package manager.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Business logic of the development area
//! - [`infra`] - Infrastructure layer (filesystem, processes, external tools)
//! - [`error`] - Error types and handling

pub mod cli;
pub mod core;
pub mod error;
pub mod infra;
