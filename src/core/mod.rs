//! Core business logic module
//!
//! This module contains the logic of the development area. External tools
//! are reached through [`crate::infra`].
//!
//! # Submodules
//!
//! - [`package_ref`] - Package descriptors with optional tag or branch
//! - [`graph`] - Concretized dependency graph
//! - [`closure`] - Development set closure and external dependencies
//! - [`path_rewrite`] - Redirecting install and stage paths into the area
//! - [`environment`] - Build environments and their persisted forms
//! - [`package_info`] - Persisted package lists and graph fragments
//! - [`build_system`] - Generator and build tool selection
//! - [`plan`] - Superbuild node description
//! - [`superbuild`] - Top-level CMakeLists.txt rendering
//! - [`install_args`] - Pinned install specs for dependencies
//! - [`wrappers`] - Tool links, command shims and compiler wrappers
//! - [`tree`] - Dependency tree printing
//! - [`area`] - Development area layout and discovery
//! - [`config`] - Global configuration
//! - [`stage`] - Source staging
//! - [`init`] - Initialization pipeline
//! - [`build_env`] - Running commands in a package environment

pub mod area;
pub mod build_env;
pub mod build_system;
pub mod closure;
pub mod config;
pub mod environment;
pub mod graph;
pub mod init;
pub mod install_args;
pub mod package_info;
pub mod package_ref;
pub mod path_rewrite;
pub mod plan;
pub mod stage;
pub mod superbuild;
pub mod tree;
pub mod wrappers;
