use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;
use rayon::prelude::*;

use super::parse::{parse_count, parse_status_counts, parse_worktree_list};
use super::{
    BranchInfo, BranchStatus, CommandOutput, Comparison, CreateOutcome, CreateRequest, GitBackend,
    GitError, MergeOutcome, MergeRequest, WorkingTreeCounts, WorktreeInfo, WorktreeList,
};

/// Repository context for git operations.
///
/// Every command runs with `path` as its working directory, so a
/// `Repository` pointed at a linked worktree sees that worktree's HEAD and
/// status while sharing refs with the rest of the repository.
#[derive(Debug, Clone)]
pub struct Repository {
    path: PathBuf,
}

impl Repository {
    /// Create a repository context at the specified path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a repository context for the current directory.
    pub fn current() -> Self {
        Self::at(".")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify this path is inside a git work tree.
    pub fn ensure_repository(&self) -> Result<(), GitError> {
        match self.run_command(&["rev-parse", "--is-inside-work-tree"]) {
            Ok(out) if out.trim() == "true" => Ok(()),
            _ => Err(GitError::NotARepository {
                path: dunce::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone()),
            }),
        }
    }

    /// Run a git command in this repository's context, returning stdout.
    pub fn run_command(&self, args: &[&str]) -> Result<String, GitError> {
        log::debug!("$ git {} [{}]", args.join(" "), self.path.display());

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .map_err(|e| GitError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                error: format!("failed to execute git: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let error = if stderr.trim().is_empty() {
                stdout.into_owned()
            } else {
                stderr.into_owned()
            };
            log::debug!("  ! {}", error.trim());
            return Err(GitError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                error,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Whether `git` exits successfully, for yes/no questions.
    fn succeeds(&self, args: &[&str]) -> bool {
        self.run_command(args).is_ok()
    }

    fn branch_exists(&self, branch: &str) -> bool {
        self.succeeds(&[
            "rev-parse",
            "--verify",
            "--quiet",
            &format!("refs/heads/{branch}"),
        ])
    }

    fn has_remotes(&self) -> bool {
        self.run_command(&["remote"])
            .map(|out| !out.trim().is_empty())
            .unwrap_or(false)
    }

    /// Collect status for one worktree. Missing directories report as clean.
    fn status_for(wt: &WorktreeInfo, default_branch: &str, has_remotes: bool) -> BranchStatus {
        if !wt.path.exists() {
            return BranchStatus {
                path: wt.path.clone(),
                ..BranchStatus::default()
            };
        }

        let repo = Repository::at(&wt.path);
        let counts = repo
            .run_command(&["status", "--porcelain"])
            .map(|out| parse_status_counts(&out))
            .unwrap_or_else(|e| {
                log::warn!("status failed for {}: {e}", wt.path.display());
                WorkingTreeCounts::default()
            });

        let unpushed_commits = if has_remotes {
            repo.run_command(&["rev-list", "--count", "HEAD", "--not", "--remotes"])
                .ok()
                .and_then(|out| parse_count(&out).ok())
                .unwrap_or(0)
        } else {
            0
        };

        let unique_commits = wt.branch.as_deref().and_then(|branch| {
            if branch == default_branch {
                return None;
            }
            repo.run_command(&["rev-list", "--count", &format!("{default_branch}..{branch}")])
                .ok()
                .and_then(|out| parse_count(&out).ok())
        });

        let upstream_gone = wt.branch.as_deref().is_some_and(|branch| {
            repo.run_command(&[
                "for-each-ref",
                "--format=%(upstream:track)",
                &format!("refs/heads/{branch}"),
            ])
            .is_ok_and(|out| out.contains("[gone]"))
        });

        BranchStatus {
            path: wt.path.clone(),
            counts,
            unpushed_commits,
            unique_commits,
            upstream_gone,
            has_submodules: wt.path.join(".gitmodules").exists(),
        }
    }

    /// Directory to run repository-wide commands from: the primary worktree.
    fn primary_path(&self) -> anyhow::Result<PathBuf> {
        Ok(self.list_worktrees()?.primary().path.clone())
    }
}

impl GitBackend for Repository {
    fn list_worktrees(&self) -> anyhow::Result<WorktreeList> {
        let output = self.run_command(&["worktree", "list", "--porcelain"])?;
        Ok(WorktreeList::from_raw(parse_worktree_list(&output)?)?)
    }

    fn current_worktree(&self) -> anyhow::Result<PathBuf> {
        let output = self.run_command(&["rev-parse", "--show-toplevel"])?;
        let root = PathBuf::from(output.trim());
        Ok(dunce::canonicalize(&root).unwrap_or(root))
    }

    fn default_branch(&self) -> anyhow::Result<String> {
        if let Ok(out) = self.run_command(&["symbolic-ref", "--short", "refs/remotes/origin/HEAD"]) {
            let remote_head = out.trim();
            let branch = remote_head.strip_prefix("origin/").unwrap_or(remote_head);
            if !branch.is_empty() && self.branch_exists(branch) {
                return Ok(branch.to_string());
            }
        }

        for candidate in ["main", "master"] {
            if self.branch_exists(candidate) {
                return Ok(candidate.to_string());
            }
        }

        self.list_worktrees()?
            .primary()
            .branch
            .clone()
            .ok_or_else(|| {
                GitError::Other {
                    message: "Could not determine the default branch".to_string(),
                }
                .into()
            })
    }

    fn branch_statuses(
        &self,
        worktrees: &[WorktreeInfo],
        default_branch: &str,
    ) -> anyhow::Result<Vec<BranchStatus>> {
        let has_remotes = self.has_remotes();
        Ok(worktrees
            .par_iter()
            .map(|wt| Self::status_for(wt, default_branch, has_remotes))
            .collect())
    }

    fn list_branches(&self) -> anyhow::Result<Vec<BranchInfo>> {
        let output = self.run_command(&[
            "for-each-ref",
            "--sort=-committerdate",
            "--format=%(refname:short)",
            "refs/heads/",
        ])?;
        let worktrees = self.list_worktrees()?;
        let current = self.current_worktree().ok();

        let names: Vec<&str> = output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        Ok(names
            .par_iter()
            .map(|name| {
                let worktree_path = worktrees.find_branch(name).map(|wt| wt.path.clone());
                let is_clean = match &worktree_path {
                    Some(path) if path.exists() => Repository::at(path)
                        .run_command(&["status", "--porcelain"])
                        .map(|out| parse_status_counts(&out).is_clean())
                        .unwrap_or(true),
                    _ => true,
                };
                let is_current = match (&worktree_path, &current) {
                    (Some(path), Some(current)) => {
                        dunce::canonicalize(path).is_ok_and(|p| &p == current)
                    }
                    _ => false,
                };
                BranchInfo {
                    name: name.to_string(),
                    worktree_path,
                    is_clean,
                    is_current,
                }
            })
            .collect())
    }

    fn create_worktree(&self, request: &CreateRequest) -> anyhow::Result<CreateOutcome> {
        let CreateRequest {
            branch,
            base,
            new_branch,
            path,
        } = request;

        if path.exists() {
            return Err(GitError::WorktreePathExists { path: path.clone() }.into());
        }

        let path_str = path.to_string_lossy();
        let mut args = vec!["worktree", "add"];
        if *new_branch {
            if self.branch_exists(branch) {
                return Err(GitError::BranchAlreadyExists {
                    branch: branch.clone(),
                }
                .into());
            }
            args.extend(["-b", branch.as_str(), &*path_str]);
            if let Some(base) = base {
                args.push(base);
            }
        } else {
            if !self.branch_exists(branch) {
                return Err(GitError::BranchNotFound {
                    branch: branch.clone(),
                }
                .into());
            }
            args.extend([&*path_str, branch.as_str()]);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        self.run_command(&args)
            .map_err(|e| GitError::WorktreeCreationFailed {
                branch: branch.clone(),
                base_branch: base.clone(),
                error: e.git_output().unwrap_or_default().to_string(),
            })?;

        let mut warnings = Vec::new();
        if *new_branch
            && let Some(base) = base
            && self.has_remotes()
        {
            let unpushed = self
                .run_command(&["rev-list", "--count", base, "--not", "--remotes"])
                .ok()
                .and_then(|out| parse_count(&out).ok())
                .unwrap_or(0);
            if unpushed > 0 {
                warnings.push(format!(
                    "Base branch {base} has {unpushed} unpushed commit{}",
                    if unpushed == 1 { "" } else { "s" }
                ));
            }
        }

        let path = dunce::canonicalize(path).unwrap_or_else(|_| path.clone());
        Ok(CreateOutcome {
            path,
            branch: branch.clone(),
            warnings,
        })
    }

    fn remove_worktree(&self, path: &Path, force: bool) -> anyhow::Result<String> {
        let path_str = path.to_string_lossy();
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(&path_str);

        let repo = Repository::at(self.primary_path()?);
        repo.run_command(&args).map_err(|e| {
            GitError::WorktreeRemovalFailed {
                path: path.to_path_buf(),
                error: e.git_output().unwrap_or_default().to_string(),
            }
            .into()
        })
    }

    fn deinit_submodules(&self, path: &Path) -> anyhow::Result<()> {
        Repository::at(path)
            .run_command(&["submodule", "deinit", "--all", "--force"])
            .map_err(|e| GitError::SubmoduleDeinitFailed {
                path: path.to_path_buf(),
                error: e.git_output().unwrap_or_default().to_string(),
            })?;
        Ok(())
    }

    fn prune_worktrees(&self) -> anyhow::Result<Vec<PathBuf>> {
        let output = self.run_command(&["worktree", "list", "--porcelain"])?;
        let prunable: Vec<PathBuf> = parse_worktree_list(&output)?
            .into_iter()
            .filter(|wt| wt.prunable.is_some())
            .map(|wt| wt.path)
            .collect();

        self.run_command(&["worktree", "prune"])?;
        Ok(prunable)
    }

    fn compare(&self, base: &str, head: &str) -> anyhow::Result<Comparison> {
        let commits = self
            .run_command(&["log", "--oneline", "--no-decorate", &format!("{base}..{head}")])?
            .lines()
            .map(str::to_string)
            .collect();
        let diffstat = self
            .run_command(&["diff", "--stat", &format!("{base}...{head}")])?
            .lines()
            .map(str::to_string)
            .collect();

        Ok(Comparison {
            base: base.to_string(),
            head: head.to_string(),
            commits,
            diffstat,
        })
    }

    fn merge(&self, request: &MergeRequest) -> anyhow::Result<MergeOutcome> {
        let worktrees = self.list_worktrees()?;
        let Some(target_wt) = worktrees.find_branch(&request.target) else {
            return Err(GitError::NoWorktreeForBranch {
                branch: request.target.clone(),
            }
            .into());
        };
        let target_path = target_wt.path.clone();
        let repo = Repository::at(&target_path);

        let merge_failed = |e: GitError| GitError::MergeFailed {
            source_branch: request.source.clone(),
            target_branch: request.target.clone(),
            error: e.git_output().unwrap_or_default().to_string(),
        };

        let summary = if request.squash {
            if let Err(e) = repo.run_command(&["merge", "--squash", &request.source]) {
                let _ = repo.run_command(&["reset", "--merge"]);
                return Err(merge_failed(e).into());
            }
            let message = request
                .message
                .clone()
                .unwrap_or_else(|| format!("Squash merge {}", request.source));
            repo.run_command(&["commit", "-m", &message])
                .map_err(merge_failed)?;
            format!("Squashed {} into {}", request.source, request.target)
        } else {
            match repo.run_command(&["merge", "--no-edit", &request.source]) {
                Ok(out) => out
                    .lines()
                    .find(|l| !l.trim().is_empty())
                    .unwrap_or("Merged")
                    .trim()
                    .to_string(),
                Err(e) => {
                    let _ = repo.run_command(&["merge", "--abort"]);
                    return Err(merge_failed(e).into());
                }
            }
        };

        Ok(MergeOutcome {
            target_path,
            summary,
        })
    }

    fn run_in(&self, path: &Path, command: &str) -> anyhow::Result<CommandOutput> {
        log::debug!("$ {command} [{}]", path.display());

        #[cfg(windows)]
        let mut cmd = {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd
        };
        #[cfg(not(windows))]
        let mut cmd = {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        };

        let output = cmd
            .current_dir(path)
            .output()
            .with_context(|| format!("Failed to run {command}"))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(CommandOutput {
            success: output.status.success(),
            output: text.trim_end().to_string(),
        })
    }

    fn diff_for_commit(&self, path: &Path) -> anyhow::Result<String> {
        let repo = Repository::at(path);
        let stat = repo.run_command(&["status", "--short"])?;
        let diff = repo
            .run_command(&["diff", "HEAD"])
            .or_else(|_| repo.run_command(&["diff", "--cached"]))?;
        Ok(format!("{stat}\n{diff}"))
    }

    fn commit_all(&self, path: &Path, message: &str) -> anyhow::Result<String> {
        let repo = Repository::at(path);
        repo.run_command(&["add", "-A"])?;
        repo.run_command(&["commit", "-m", message])?;
        let summary = repo.run_command(&["log", "-1", "--oneline", "--no-decorate"])?;
        Ok(summary.trim().to_string())
    }
}
