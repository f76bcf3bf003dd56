//! Removing one worktree safely.
//!
//! Order matters and is fixed:
//! 1. Remove top-level symlinks that point outside the worktree (best effort).
//! 2. Deinitialize submodules when `.gitmodules` exists; a failure stops here.
//! 3. `git worktree remove`, forced when submodules exist or force was asked for.

use std::path::{Path, PathBuf};

use ansi_str::AnsiStr;

use crate::git::{GitBackend, GitError};
use crate::path::{is_within, resolve_link_target};

/// Why a removal failed, in words a user can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum FailureReason {
    #[strum(serialize = "has submodules (try force delete)")]
    HasSubmodules,
    #[strum(serialize = "has uncommitted changes")]
    UncommittedChanges,
    #[strum(serialize = "not a valid worktree")]
    NotAWorktree,
    #[strum(serialize = "deletion failed")]
    Failed,
}

impl FailureReason {
    /// Map git's error text onto a reason. Unrecognized text maps to [`FailureReason::Failed`].
    pub fn from_git_output(output: &str) -> Self {
        if output.contains("submodules") {
            FailureReason::HasSubmodules
        } else if output.contains("modified or untracked files") {
            FailureReason::UncommittedChanges
        } else if output.contains("is not a working tree") {
            FailureReason::NotAWorktree
        } else {
            FailureReason::Failed
        }
    }

    pub fn from_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<GitError>().and_then(GitError::git_output) {
            Some(output) => Self::from_git_output(output),
            None => Self::from_git_output(&format!("{err:#}")),
        }
    }
}

/// A worktree to delete, captured by value when the deletion is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionTarget {
    pub path: PathBuf,
    pub branch: Option<String>,
}

/// Result of running the protocol on one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionResult {
    pub target: DeletionTarget,
    pub outcome: Result<(), DeletionFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionFailure {
    pub reason: FailureReason,
    /// Full error text for the error line
    pub detail: String,
}

impl DeletionFailure {
    /// Keeps git's own words when the error wraps a git invocation.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let detail = match err.downcast_ref::<GitError>().and_then(GitError::git_output) {
            Some(output) => output.trim().to_string(),
            None => format!("{err:#}").ansi_strip().trim().to_string(),
        };
        Self {
            reason: FailureReason::from_error(err),
            detail,
        }
    }
}

/// Remove top-level symlinks in `worktree` whose targets lie outside it.
///
/// Errors are logged and skipped. Returns the links removed.
pub fn sweep_external_symlinks(worktree: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(worktree) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot scan {} for symlinks: {e}", worktree.display());
            return Vec::new();
        }
    };

    let mut removed = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Cannot read entry in {}: {e}", worktree.display());
                continue;
            }
        };
        let is_symlink = entry.file_type().is_ok_and(|t| t.is_symlink());
        if !is_symlink {
            continue;
        }

        let link = entry.path();
        let target = match std::fs::read_link(&link) {
            Ok(target) => target,
            Err(e) => {
                log::warn!("Cannot read symlink {}: {e}", link.display());
                continue;
            }
        };
        let resolved = resolve_link_target(&link, &target);
        if is_within(&resolved, worktree) {
            continue;
        }

        match std::fs::remove_file(&link) {
            Ok(()) => {
                log::debug!(
                    "Removed external symlink {} -> {}",
                    link.display(),
                    resolved.display()
                );
                removed.push(link);
            }
            Err(e) => log::warn!("Cannot remove symlink {}: {e}", link.display()),
        }
    }
    removed
}

/// Delete the worktree at `path`.
pub fn delete_worktree(git: &dyn GitBackend, path: &Path, force: bool) -> anyhow::Result<()> {
    sweep_external_symlinks(path);

    let has_submodules = path.join(".gitmodules").exists();
    if has_submodules {
        git.deinit_submodules(path)?;
    }

    git.remove_worktree(path, force || has_submodules)?;
    Ok(())
}

/// Run [`delete_worktree`] and package the outcome for the view.
pub fn delete_target(git: &dyn GitBackend, target: DeletionTarget, force: bool) -> DeletionResult {
    let outcome = delete_worktree(git, &target.path, force).map_err(|e| {
        log::warn!("Deleting {} failed: {e:#}", target.path.display());
        DeletionFailure::from_error(&e)
    });
    DeletionResult { target, outcome }
}
