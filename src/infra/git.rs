//! Source revision checkout
//!
//! After the package manager stages a version-controlled package, the
//! requested tag or branch is resolved with gix and checked out in place.
//! gix does not switch worktrees to a ref, so fetching and the checkout
//! itself go through the `git` CLI.

use std::path::Path;

use crate::core::package_ref::VersionSelector;
use crate::error::GitError;
use crate::infra::process::Invocation;

/// Outcome of a checkout attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Requested revision is checked out
    CheckedOut,
    /// Sources are not a git working tree
    NotARepository,
}

/// Check out `selector` in the git working tree at `repo`
///
/// Fetching tags from `origin` is best effort; the ref must exist afterwards.
pub fn checkout_selector(
    repo: &Path,
    selector: &VersionSelector,
) -> Result<CheckoutOutcome, GitError> {
    let Ok(repository) = gix::open(repo) else {
        return Ok(CheckoutOutcome::NotARepository);
    };

    let git = |args: &[&str]| {
        Invocation::new("git")
            .arg("-C")
            .arg(repo.to_string_lossy())
            .args(args.iter().copied())
    };

    if repository.find_remote("origin").is_ok() {
        let fetched = git(&["fetch", "--tags", "origin"]).allow_failure().output()?;
        if !fetched.success() {
            tracing::debug!("git fetch in {} failed: {}", repo.display(), fetched.stderr.trim());
        }
    }

    let target = match selector {
        VersionSelector::Tag(tag) => {
            resolve_ref(&repository, repo, selector, &[format!("refs/tags/{tag}")])?;
            format!("tags/{tag}")
        }
        VersionSelector::Branch(branch) => {
            let candidates = [
                format!("refs/heads/{branch}"),
                format!("refs/remotes/origin/{branch}"),
            ];
            resolve_ref(&repository, repo, selector, &candidates)?;
            branch.clone()
        }
    };

    git(&["checkout", "--quiet", target.as_str()]).output()?;
    tracing::info!("Checked out {selector} in {}", repo.display());
    Ok(CheckoutOutcome::CheckedOut)
}

/// Find the first of `candidates` and peel it to a commit
fn resolve_ref(
    repository: &gix::Repository,
    repo: &Path,
    selector: &VersionSelector,
    candidates: &[String],
) -> Result<(), GitError> {
    let Some(mut reference) = candidates
        .iter()
        .find_map(|name| repository.find_reference(name.as_str()).ok())
    else {
        return Err(GitError::RefNotFound {
            repo: repo.to_path_buf(),
            reference: candidates.join(" or "),
        });
    };

    let commit = reference.peel_to_commit().map_err(|e| GitError::ResolveFailed {
        reference: selector.to_string(),
        error: e.to_string(),
    })?;
    tracing::debug!("{selector} resolves to {} in {}", commit.id, repo.display());
    Ok(())
}
