//! Arbor error types and formatting
//!
//! - **`GitError`** - A typed enum for domain errors that can be pattern-matched
//!   and tested. Use `.into()` to convert to `anyhow::Error` while preserving the
//!   type for pattern matching. Display produces styled output for users.
//!
//! Errors raised while a dispatched command runs never escape as panics; the
//! executor flattens them into the result message with `{:#}`.

use std::path::PathBuf;

use color_print::{cformat, cwrite};

use crate::path::format_path_for_display;
use crate::styling::{ERROR_EMOJI, HINT_EMOJI};

/// Domain errors for git and worktree operations.
///
/// Each variant stores the data needed to construct a user-facing error message.
/// Variants wrapping a git invocation keep git's own output verbatim in `error`
/// so callers can classify it (see [`GitError::git_output`]).
///
/// ```ignore
/// return Err(GitError::BranchNotFound { branch: "feature".into() }.into());
///
/// if let Some(GitError::NotARepository { path }) = err.downcast_ref() {
///     println!("{} is not a repository", path.display());
/// }
/// ```
#[derive(Debug, Clone)]
pub enum GitError {
    NotARepository {
        path: PathBuf,
    },
    CommandFailed {
        command: String,
        error: String,
    },
    BranchNotFound {
        branch: String,
    },
    BranchAlreadyExists {
        branch: String,
    },
    NoWorktreeForBranch {
        branch: String,
    },
    WorktreePathExists {
        path: PathBuf,
    },
    WorktreeCreationFailed {
        branch: String,
        base_branch: Option<String>,
        error: String,
    },
    WorktreeRemovalFailed {
        path: PathBuf,
        error: String,
    },
    SubmoduleDeinitFailed {
        path: PathBuf,
        error: String,
    },
    MergeFailed {
        source_branch: String,
        target_branch: String,
        error: String,
    },
    ParseError {
        message: String,
    },
    Other {
        message: String,
    },
}

impl GitError {
    /// Raw output of the failing git invocation, if this error wraps one.
    pub fn git_output(&self) -> Option<&str> {
        match self {
            GitError::CommandFailed { error, .. }
            | GitError::WorktreeCreationFailed { error, .. }
            | GitError::WorktreeRemovalFailed { error, .. }
            | GitError::SubmoduleDeinitFailed { error, .. }
            | GitError::MergeFailed { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl std::error::Error for GitError {}

impl std::fmt::Display for GitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitError::NotARepository { path } => {
                let path_display = format_path_for_display(path);
                cwrite!(
                    f,
                    "{ERROR_EMOJI} <red>Not a git repository: <bold>{path_display}</></>\n\n{HINT_EMOJI} <dim>Run arbor from inside a repository or pass -C with the repository path</>"
                )
            }

            GitError::CommandFailed { command, error } => {
                let header = cformat!("{ERROR_EMOJI} <red><bold>{command}</> failed</>");
                write!(f, "{}", format_error_block(header, error))
            }

            GitError::BranchNotFound { branch } => {
                cwrite!(f, "{ERROR_EMOJI} <red>Branch <bold>{branch}</> not found</>")
            }

            GitError::BranchAlreadyExists { branch } => {
                cwrite!(
                    f,
                    "{ERROR_EMOJI} <red>Branch <bold>{branch}</> already exists</>\n\n{HINT_EMOJI} <dim>Create from an existing branch instead</>"
                )
            }

            GitError::NoWorktreeForBranch { branch } => {
                cwrite!(
                    f,
                    "{ERROR_EMOJI} <red>No worktree has <bold>{branch}</> checked out</>"
                )
            }

            GitError::WorktreePathExists { path } => {
                let path_display = format_path_for_display(path);
                cwrite!(
                    f,
                    "{ERROR_EMOJI} <red>Directory already exists: <bold>{path_display}</></>\n\n{HINT_EMOJI} <dim>Remove the directory or use a different branch name</>"
                )
            }

            GitError::WorktreeCreationFailed {
                branch,
                base_branch,
                error,
            } => {
                let base_suffix = base_branch
                    .as_ref()
                    .map(|base| cformat!(" from base <bold>{base}</>"))
                    .unwrap_or_default();
                let header = cformat!(
                    "{ERROR_EMOJI} <red>Failed to create worktree for <bold>{branch}</>{base_suffix}</>"
                );
                write!(f, "{}", format_error_block(header, error))
            }

            GitError::WorktreeRemovalFailed { path, error } => {
                let path_display = format_path_for_display(path);
                let header = cformat!(
                    "{ERROR_EMOJI} <red>Failed to remove worktree at <bold>{path_display}</></>"
                );
                write!(f, "{}", format_error_block(header, error))
            }

            GitError::SubmoduleDeinitFailed { path, error } => {
                let path_display = format_path_for_display(path);
                let header = cformat!(
                    "{ERROR_EMOJI} <red>Failed to deinitialize submodules in <bold>{path_display}</></>"
                );
                write!(f, "{}", format_error_block(header, error))
            }

            GitError::MergeFailed {
                source_branch,
                target_branch,
                error,
            } => {
                let header = cformat!(
                    "{ERROR_EMOJI} <red>Merging <bold>{source_branch}</> into <bold>{target_branch}</> failed</>"
                );
                write!(f, "{}", format_error_block(header, error))
            }

            GitError::ParseError { message } | GitError::Other { message } => {
                cwrite!(f, "{ERROR_EMOJI} <red>{message}</>")
            }
        }
    }
}

/// Format an error with header and indented git output
fn format_error_block(header: String, error: &str) -> String {
    let trimmed = error.trim();
    if trimmed.is_empty() {
        header
    } else {
        let body: Vec<String> = trimmed.lines().map(|line| format!("  {line}")).collect();
        format!("{header}\n{}", body.join("\n"))
    }
}
