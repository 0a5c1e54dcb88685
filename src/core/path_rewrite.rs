//! Canonical path redirection
//!
//! Packages under development are built and installed inside the development
//! area, but environments and build arguments computed by the package manager
//! point at its own install tree and stage directory. The rewriter finds those
//! canonical paths for the currently active packages and redirects them to
//! `<base>/install/<pkg>` and `<base>/build/<pkg>`.
//!
//! Canonical paths must follow the layout
//! `<root>/<any number of components>/<package>/<one component>`, which holds
//! for install path schemes ending in `${PACKAGE}/${VERSION}-${HASH}` and for
//! the per-package stage directories created under the area's tmp directory.

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use regex::Regex;

/// Which canonical tree a path belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Package manager install tree
    Install,
    /// Package manager stage directory
    Stage,
}

/// Redirection targets for one active package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRewriteRule {
    /// Package name
    pub package: String,
    /// Replacement for canonical install paths
    pub install_target: PathBuf,
    /// Replacement for canonical stage paths
    pub build_target: PathBuf,
}

impl PathRewriteRule {
    /// Target for the given kind of canonical path
    pub fn target(&self, kind: PathKind) -> &Path {
        match kind {
            PathKind::Install => &self.install_target,
            PathKind::Stage => &self.build_target,
        }
    }
}

/// A canonical path found in a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    /// Byte range of the canonical path (boundary character excluded)
    pub range: Range<usize>,
    /// Package the path belongs to
    pub package: String,
    /// Canonical tree matched
    pub kind: PathKind,
}

#[derive(Debug)]
struct Matchers {
    install: Regex,
    stage: Regex,
}

/// Rewrites canonical install and stage paths for a set of active packages
#[derive(Debug)]
pub struct PathRewriter {
    install_root: String,
    stage_root: String,
    dev_install: PathBuf,
    dev_build: PathBuf,
    rules: BTreeMap<String, PathRewriteRule>,
    matchers: Option<Matchers>,
}

impl PathRewriter {
    /// Create a rewriter with no active packages
    ///
    /// `install_root` and `stage_root` are the package manager's canonical
    /// locations; `dev_install` and `dev_build` the area's replacements.
    pub fn new(
        install_root: &Path,
        stage_root: &Path,
        dev_install: PathBuf,
        dev_build: PathBuf,
    ) -> Self {
        Self {
            install_root: trim_trailing_slash(install_root),
            stage_root: trim_trailing_slash(stage_root),
            dev_install,
            dev_build,
            rules: BTreeMap::new(),
            matchers: None,
        }
    }

    /// Replace the active package set, rebuilding rules and matchers
    pub fn set_active_packages<S: AsRef<str>>(&mut self, names: &[S]) {
        let mut sorted: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
        sorted.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        sorted.dedup();

        self.rules = sorted
            .iter()
            .map(|name| {
                let rule = PathRewriteRule {
                    package: (*name).to_string(),
                    install_target: self.dev_install.join(name),
                    build_target: self.dev_build.join(name),
                };
                ((*name).to_string(), rule)
            })
            .collect();

        self.matchers = if sorted.is_empty() {
            None
        } else {
            let alternation = sorted
                .iter()
                .map(|name| regex::escape(name))
                .collect::<Vec<_>>()
                .join("|");
            Some(Matchers {
                install: canonical_matcher(&self.install_root, &alternation),
                stage: canonical_matcher(&self.stage_root, &alternation),
            })
        };
    }

    /// Rules for the active packages, keyed by package name
    pub fn rules(&self) -> &BTreeMap<String, PathRewriteRule> {
        &self.rules
    }

    /// Locate canonical paths of active packages, in text order
    pub fn find_matches(&self, text: &str) -> Vec<PathMatch> {
        let Some(matchers) = &self.matchers else {
            return Vec::new();
        };

        let mut found: Vec<PathMatch> = [
            (&matchers.install, PathKind::Install),
            (&matchers.stage, PathKind::Stage),
        ]
        .into_iter()
        .flat_map(|(regex, kind)| {
            regex.captures_iter(text).filter_map(move |caps| {
                let path = caps.name("path")?;
                let package = caps.name("pkg")?;
                Some(PathMatch {
                    range: path.range(),
                    package: package.as_str().to_string(),
                    kind,
                })
            })
        })
        .collect();

        found.sort_by_key(|m| m.range.start);
        let mut result: Vec<PathMatch> = Vec::with_capacity(found.len());
        for candidate in found {
            if result
                .last()
                .map_or(true, |last| candidate.range.start >= last.range.end)
            {
                result.push(candidate);
            }
        }
        result
    }

    /// Rewrite every canonical path of an active package in `text`
    pub fn rewrite(&self, text: &str) -> String {
        let matches = self.find_matches(text);
        if matches.is_empty() {
            return text.to_string();
        }

        let mut output = String::with_capacity(text.len());
        let mut cursor = 0;
        for m in matches {
            output.push_str(&text[cursor..m.range.start]);
            match self.rules.get(&m.package) {
                Some(rule) => output.push_str(&rule.target(m.kind).to_string_lossy()),
                None => output.push_str(&text[m.range.clone()]),
            }
            cursor = m.range.end;
        }
        output.push_str(&text[cursor..]);
        output
    }
}

fn trim_trailing_slash(path: &Path) -> String {
    let s = path.to_string_lossy();
    let trimmed = s.trim_end_matches('/');
    if trimmed.is_empty() {
        s.into_owned()
    } else {
        trimmed.to_string()
    }
}

/// `<root>/<subpath>/<pkg>/<component>`, preceded by start of text or a separator
fn canonical_matcher(root: &str, alternation: &str) -> Regex {
    let pattern = format!(
        r#"(?:^|[=\s;:"'])(?P<path>{root}/(?:[^;:"'=\s]*?/)*?(?P<pkg>{alternation})/[^;:"'/=\s]*)"#,
        root = regex::escape(root),
    );
    Regex::new(&pattern).expect("escaped canonical path pattern is valid")
}
