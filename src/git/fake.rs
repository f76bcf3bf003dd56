//! In-memory [`GitBackend`] that records every call.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{
    BranchInfo, BranchStatus, CommandOutput, Comparison, CreateOutcome, CreateRequest, GitBackend,
    GitError, MergeOutcome, MergeRequest, WorktreeInfo, WorktreeList,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Deinit(PathBuf),
    Remove { path: PathBuf, force: bool },
    Create(String),
    Merge(String, String),
    RunIn(PathBuf),
    Commit(PathBuf),
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    pub worktrees: Vec<WorktreeInfo>,
    pub current: PathBuf,
    pub statuses: HashMap<PathBuf, BranchStatus>,
    pub branches: Vec<BranchInfo>,
    /// Paths whose removal fails with the given git output
    pub remove_failures: HashMap<PathBuf, String>,
    pub deinit_failures: HashSet<PathBuf>,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn with_worktrees(worktrees: &[(&str, Option<&str>)]) -> Self {
        let worktrees: Vec<WorktreeInfo> = worktrees
            .iter()
            .map(|(path, branch)| WorktreeInfo {
                path: PathBuf::from(path),
                head: "0123456789abcdef".to_string(),
                branch: branch.map(str::to_string),
                bare: false,
                detached: branch.is_none(),
                locked: None,
                prunable: None,
            })
            .collect();
        let current = worktrees
            .first()
            .map(|wt| wt.path.clone())
            .unwrap_or_default();
        Self {
            worktrees,
            current,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl GitBackend for FakeBackend {
    fn list_worktrees(&self) -> anyhow::Result<WorktreeList> {
        Ok(WorktreeList::from_raw(self.worktrees.clone())?)
    }

    fn current_worktree(&self) -> anyhow::Result<PathBuf> {
        Ok(self.current.clone())
    }

    fn default_branch(&self) -> anyhow::Result<String> {
        Ok("main".to_string())
    }

    fn branch_statuses(
        &self,
        worktrees: &[WorktreeInfo],
        _default_branch: &str,
    ) -> anyhow::Result<Vec<BranchStatus>> {
        Ok(worktrees
            .iter()
            .map(|wt| {
                self.statuses.get(&wt.path).cloned().unwrap_or(BranchStatus {
                    path: wt.path.clone(),
                    unique_commits: Some(1),
                    ..BranchStatus::default()
                })
            })
            .collect())
    }

    fn list_branches(&self) -> anyhow::Result<Vec<BranchInfo>> {
        Ok(self.branches.clone())
    }

    fn create_worktree(&self, request: &CreateRequest) -> anyhow::Result<CreateOutcome> {
        self.record(Call::Create(request.branch.clone()));
        Ok(CreateOutcome {
            path: request.path.clone(),
            branch: request.branch.clone(),
            warnings: Vec::new(),
        })
    }

    fn remove_worktree(&self, path: &Path, force: bool) -> anyhow::Result<String> {
        self.record(Call::Remove {
            path: path.to_path_buf(),
            force,
        });
        match self.remove_failures.get(path) {
            Some(error) => Err(GitError::WorktreeRemovalFailed {
                path: path.to_path_buf(),
                error: error.clone(),
            }
            .into()),
            None => Ok(String::new()),
        }
    }

    fn deinit_submodules(&self, path: &Path) -> anyhow::Result<()> {
        self.record(Call::Deinit(path.to_path_buf()));
        if self.deinit_failures.contains(path) {
            return Err(GitError::SubmoduleDeinitFailed {
                path: path.to_path_buf(),
                error: "fatal: could not deinit".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn prune_worktrees(&self) -> anyhow::Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    fn compare(&self, base: &str, head: &str) -> anyhow::Result<Comparison> {
        Ok(Comparison {
            base: base.to_string(),
            head: head.to_string(),
            commits: vec!["abc1234 Add feature".to_string()],
            diffstat: vec![" 1 file changed, 1 insertion(+)".to_string()],
        })
    }

    fn merge(&self, request: &MergeRequest) -> anyhow::Result<MergeOutcome> {
        self.record(Call::Merge(request.source.clone(), request.target.clone()));
        Ok(MergeOutcome {
            target_path: self.current.clone(),
            summary: format!("Merged {} into {}", request.source, request.target),
        })
    }

    fn run_in(&self, path: &Path, command: &str) -> anyhow::Result<CommandOutput> {
        self.record(Call::RunIn(path.to_path_buf()));
        Ok(CommandOutput {
            success: true,
            output: command.to_string(),
        })
    }

    fn diff_for_commit(&self, _path: &Path) -> anyhow::Result<String> {
        Ok("M  src/lib.rs".to_string())
    }

    fn commit_all(&self, path: &Path, message: &str) -> anyhow::Result<String> {
        self.record(Call::Commit(path.to_path_buf()));
        Ok(format!("abc1234 {message}"))
    }
}
