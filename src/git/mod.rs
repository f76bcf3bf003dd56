//! Git operations and repository management

use std::path::{Path, PathBuf};

// Submodules
mod error;
mod parse;
mod repository;

#[cfg(test)]
pub(crate) mod fake;

// Re-exports from submodules
pub use error::GitError;
pub use repository::Repository;

/// Worktree information as reported by `git worktree list --porcelain`
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    pub head: String,
    pub branch: Option<String>,
    pub bare: bool,
    pub detached: bool,
    pub locked: Option<String>,
    pub prunable: Option<String>,
}

/// A list of worktrees with automatic bare worktree filtering and primary identification.
///
/// This type ensures:
/// - Bare worktrees are filtered out (only worktrees with working trees are included)
/// - The primary worktree is always identifiable (first non-bare worktree)
/// - Construction fails if no valid worktrees exist
#[derive(Debug, Clone)]
pub struct WorktreeList {
    worktrees: Vec<WorktreeInfo>,
}

impl WorktreeList {
    /// Create from raw worktrees, filtering bare entries and identifying primary.
    pub fn from_raw(raw_worktrees: Vec<WorktreeInfo>) -> Result<Self, GitError> {
        let worktrees: Vec<_> = raw_worktrees.into_iter().filter(|wt| !wt.bare).collect();

        if worktrees.is_empty() {
            return Err(GitError::Other {
                message: "No worktrees found".to_string(),
            });
        }

        Ok(Self { worktrees })
    }

    /// Get the primary worktree (first non-bare worktree).
    pub fn primary(&self) -> &WorktreeInfo {
        &self.worktrees[0]
    }

    /// Get all worktrees (non-bare only).
    pub fn all(&self) -> &[WorktreeInfo] {
        &self.worktrees
    }

    pub fn len(&self) -> usize {
        self.worktrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worktrees.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorktreeInfo> {
        self.worktrees.iter()
    }

    /// The worktree that has `branch` checked out, if any.
    pub fn find_branch(&self, branch: &str) -> Option<&WorktreeInfo> {
        self.worktrees
            .iter()
            .find(|wt| wt.branch.as_deref() == Some(branch))
    }
}

impl IntoIterator for WorktreeList {
    type Item = WorktreeInfo;
    type IntoIter = std::vec::IntoIter<WorktreeInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.worktrees.into_iter()
    }
}

/// Counts of changed paths from `git status --porcelain`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkingTreeCounts {
    pub staged: usize,
    pub modified: usize,
    pub untracked: usize,
}

impl WorkingTreeCounts {
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.modified == 0 && self.untracked == 0
    }
}

/// Local status of one worktree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchStatus {
    pub path: PathBuf,
    pub counts: WorkingTreeCounts,
    /// Commits on HEAD not reachable from any remote-tracking ref
    pub unpushed_commits: usize,
    /// Commits on the branch not on the default branch; `None` when not computed
    pub unique_commits: Option<usize>,
    /// The configured upstream was deleted on the remote
    pub upstream_gone: bool,
    pub has_submodules: bool,
}

/// A local branch, as offered by the create flow's pickers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    pub name: String,
    pub worktree_path: Option<PathBuf>,
    /// Working tree of the worktree holding this branch is clean (true when none holds it)
    pub is_clean: bool,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub branch: String,
    /// Start point for a new branch
    pub base: Option<String>,
    pub new_branch: bool,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    pub path: PathBuf,
    pub branch: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    pub source: String,
    pub target: String,
    pub squash: bool,
    /// Commit message for squash merges
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub target_path: PathBuf,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    pub base: String,
    pub head: String,
    /// One-line commit summaries in `base..head`, newest first
    pub commits: Vec<String>,
    pub diffstat: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub output: String,
}

/// Queries and mutations the application needs from git.
///
/// [`Repository`] implements this by shelling out to the `git` binary. Every
/// method blocks; callers run them on worker threads.
pub trait GitBackend: Send + Sync {
    fn list_worktrees(&self) -> anyhow::Result<WorktreeList>;

    /// Root of the worktree the process was started in.
    fn current_worktree(&self) -> anyhow::Result<PathBuf>;

    fn default_branch(&self) -> anyhow::Result<String>;

    /// Status for each worktree, in input order.
    fn branch_statuses(
        &self,
        worktrees: &[WorktreeInfo],
        default_branch: &str,
    ) -> anyhow::Result<Vec<BranchStatus>>;

    fn list_branches(&self) -> anyhow::Result<Vec<BranchInfo>>;

    fn create_worktree(&self, request: &CreateRequest) -> anyhow::Result<CreateOutcome>;

    /// Run `git worktree remove`, returning git's output.
    fn remove_worktree(&self, path: &Path, force: bool) -> anyhow::Result<String>;

    fn deinit_submodules(&self, path: &Path) -> anyhow::Result<()>;

    /// Prune metadata for worktrees whose directories are gone, returning their paths.
    fn prune_worktrees(&self) -> anyhow::Result<Vec<PathBuf>>;

    fn compare(&self, base: &str, head: &str) -> anyhow::Result<Comparison>;

    fn merge(&self, request: &MergeRequest) -> anyhow::Result<MergeOutcome>;

    /// Run a shell command inside `path`.
    fn run_in(&self, path: &Path, command: &str) -> anyhow::Result<CommandOutput>;

    /// Staged and unstaged changes of the worktree at `path`, as a patch.
    fn diff_for_commit(&self, path: &Path) -> anyhow::Result<String>;

    /// Stage everything and commit, returning the new commit's summary line.
    fn commit_all(&self, path: &Path, message: &str) -> anyhow::Result<String>;
}
