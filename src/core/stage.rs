//! Source staging
//!
//! Development package sources are fetched by the package manager into
//! `spackdev-aux/tmp/<pkg>` and then moved into `srcs/<pkg>`. Requested tags
//! and branches are checked out afterwards.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::area::AreaLayout;
use crate::core::graph::DependencyGraph;
use crate::core::install_args::install_args_for_package;
use crate::core::package_info::PackageLists;
use crate::core::package_ref::VersionSelector;
use crate::error::{ConfigError, ExternalToolError, Result};
use crate::infra::filesystem;
use crate::infra::git::{self, CheckoutOutcome};
use crate::infra::spack::PackageManager;

/// Subdirectory the package manager uses for expanded archives
const EXPANDED_ARCHIVE_DIR: &str = "spack-expanded-archive";

/// Result of staging one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Sources were fetched into the given directory
    Staged(PathBuf),
    /// Sources already present
    AlreadyStaged(PathBuf),
}

/// Tag or branch overrides for fetching, keyed by package name
pub fn fetch_overrides(lists: &PackageLists) -> BTreeMap<String, VersionSelector> {
    lists
        .dev_packages()
        .filter_map(|r| Some((r.name().to_string(), r.selector()?.clone())))
        .collect()
}

/// Check that every name is a development package of the area
pub fn validate_packages(names: &[String], lists: &PackageLists) -> Result<(), ConfigError> {
    let known = lists.dev_package_names();
    match names.iter().find(|name| !known.contains(name)) {
        Some(name) => Err(ConfigError::NotADevPackage {
            name: name.clone(),
            known: known.join(" "),
        }),
        None => Ok(()),
    }
}

/// Stage `names`, or every development package when `names` is empty
pub fn stage_packages(
    layout: &AreaLayout,
    lists: &PackageLists,
    graph: &DependencyGraph,
    names: &[String],
    pm: &dyn PackageManager,
) -> Result<Vec<(String, StageOutcome)>> {
    validate_packages(names, lists)?;
    let packages = if names.is_empty() {
        lists.dev_package_names()
    } else {
        names.to_vec()
    };
    let overrides = fetch_overrides(lists);

    filesystem::create_dir_all(&layout.srcs_dir())?;
    packages
        .into_iter()
        .map(|package| {
            let outcome = stage_package(layout, graph, &package, overrides.get(&package), pm)?;
            Ok((package, outcome))
        })
        .collect()
}

/// Stage one package into `srcs/<package>`
pub fn stage_package(
    layout: &AreaLayout,
    graph: &DependencyGraph,
    package: &str,
    selector: Option<&VersionSelector>,
    pm: &dyn PackageManager,
) -> Result<StageOutcome> {
    let dest = layout.package_src_dir(package);
    if dest.exists() {
        tracing::info!("Package {package} is already staged for development: skipping");
        return Ok(StageOutcome::AlreadyStaged(dest));
    }

    let node = graph.node(package).ok_or_else(|| ConfigError::UnknownPackage {
        name: package.to_string(),
    })?;
    let stage_dir = layout.package_stage_dir(package);
    filesystem::remove_dir_all(&stage_dir)?;
    filesystem::create_dir_all(&stage_dir)?;

    tracing::info!("Staging {package} for development");
    pm.stage(&install_args_for_package(node), &stage_dir)?;
    consolidate(&stage_dir, &dest)?;

    if let Some(selector) = selector {
        match git::checkout_selector(&dest, selector)? {
            CheckoutOutcome::CheckedOut => {}
            CheckoutOutcome::NotARepository => tracing::warn!(
                "Unable to check out {selector} for {package}: sources are not a git working tree; \
                 falling back to version {} as concretized",
                node.version
            ),
        }
    }
    Ok(StageOutcome::Staged(dest))
}

/// Move staged contents into `dest`
///
/// A single entry becomes `dest` itself; several entries are moved into a
/// new `dest` directory.
fn consolidate(stage_dir: &Path, dest: &Path) -> Result<()> {
    let expanded = stage_dir.join(EXPANDED_ARCHIVE_DIR);
    let content_dir = if expanded.is_dir() { expanded } else { stage_dir.to_path_buf() };

    let entries = filesystem::list_dir(&content_dir)?;
    match entries.as_slice() {
        [] => Err(ExternalToolError::BadOutput {
            command: "stage".to_string(),
            error: format!("no sources in {}", content_dir.display()),
        }
        .into()),
        [single] => {
            tracing::debug!("Moving {} to {}", single.display(), dest.display());
            Ok(filesystem::rename(single, dest)?)
        }
        several => {
            filesystem::create_dir_all(dest)?;
            for entry in several {
                let Some(name) = entry.file_name() else { continue };
                tracing::debug!("Moving {} to {}", entry.display(), dest.display());
                filesystem::rename(entry, &dest.join(name))?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::environment::Environment;
    use crate::core::graph::tests::graph;
    use crate::core::package_ref::PackageRef;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Stages a fixed set of files and records the specs it was asked for
    struct FakeStager {
        files: Vec<&'static str>,
        staged: RefCell<Vec<String>>,
    }

    impl FakeStager {
        fn new(files: &[&'static str]) -> Self {
            Self {
                files: files.to_vec(),
                staged: RefCell::new(Vec::new()),
            }
        }
    }

    impl PackageManager for FakeStager {
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
        fn stage(&self, spec: &str, path: &Path) -> Result<()> {
            self.staged.borrow_mut().push(spec.to_string());
            for file in &self.files {
                filesystem::write_file(&path.join(file), spec)?;
            }
            Ok(())
        }
        fn build_environment(&self, _: &str) -> Result<Environment> {
            unreachable!()
        }
        fn cmake_args(&self, _: &str, _: &Environment) -> Result<Vec<String>> {
            unreachable!()
        }
    }

    fn lists() -> PackageLists {
        PackageLists {
            requested: vec![
                PackageRef::new("art"),
                PackageRef::with_selector("cetlib", VersionSelector::Tag("v3".to_string())),
            ],
            additional: vec![PackageRef::new("canvas")],
            external: vec!["boost".to_string()],
        }
    }

    fn area_graph() -> DependencyGraph {
        graph(&[
            ("art", &["canvas"]),
            ("canvas", &["cetlib"]),
            ("cetlib", &["boost"]),
            ("boost", &[]),
        ])
    }

    #[test]
    fn test_fetch_overrides_side_table() {
        let overrides = fetch_overrides(&lists());
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides["cetlib"], VersionSelector::Tag("v3".to_string()));
    }

    #[test]
    fn test_unknown_name_rejected() {
        let err = validate_packages(&["boost".to_string()], &lists()).unwrap_err();
        assert!(matches!(err, ConfigError::NotADevPackage { ref name, .. } if name == "boost"));
        assert!(err.to_string().contains("art cetlib canvas"));
    }

    #[test]
    fn test_single_entry_becomes_source_dir() {
        let dir = TempDir::new().unwrap();
        let layout = AreaLayout::new(dir.path());
        let pm = FakeStager::new(&["art-3.1/CMakeLists.txt"]);

        let staged =
            stage_packages(&layout, &lists(), &area_graph(), &["art".to_string()], &pm).unwrap();
        assert_eq!(
            staged,
            [("art".to_string(), StageOutcome::Staged(layout.package_src_dir("art")))]
        );
        assert!(layout.package_src_dir("art").join("CMakeLists.txt").is_file());
        assert_eq!(*pm.staged.borrow(), ["art@1.0"]);
    }

    #[test]
    fn test_several_entries_consolidated() {
        let dir = TempDir::new().unwrap();
        let layout = AreaLayout::new(dir.path());
        let pm = FakeStager::new(&[
            "spack-expanded-archive/CMakeLists.txt",
            "spack-expanded-archive/src/a.cc",
        ]);

        stage_packages(&layout, &lists(), &area_graph(), &["canvas".to_string()], &pm).unwrap();
        let src = layout.package_src_dir("canvas");
        assert!(src.join("CMakeLists.txt").is_file());
        assert!(src.join("src/a.cc").is_file());
    }

    #[test]
    fn test_already_staged_skipped() {
        let dir = TempDir::new().unwrap();
        let layout = AreaLayout::new(dir.path());
        filesystem::create_dir_all(&layout.package_src_dir("art")).unwrap();
        let pm = FakeStager::new(&["x"]);

        let staged =
            stage_packages(&layout, &lists(), &area_graph(), &["art".to_string()], &pm).unwrap();
        assert!(matches!(staged[0].1, StageOutcome::AlreadyStaged(_)));
        assert!(pm.staged.borrow().is_empty());
    }

    #[test]
    fn test_selector_on_plain_sources_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let layout = AreaLayout::new(dir.path());
        let pm = FakeStager::new(&["a", "b"]);

        let staged = stage_packages(&layout, &lists(), &area_graph(), &[], &pm).unwrap();
        let names: Vec<&str> = staged.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["art", "cetlib", "canvas"]);
        assert!(layout.package_src_dir("cetlib").join("a").is_file());
    }
}
