//! Point-in-time snapshots of every worktree and its status.
//!
//! A [`Snapshot`] is never mutated after it is published: a refresh builds a
//! new one and the [`Registry`] swaps the `Arc`. GitHub data arrives later
//! and is folded in by building yet another snapshot, provided it was
//! computed for the generation still on display.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::git::{BranchStatus, GitBackend, WorktreeInfo};
use crate::path::dir_name;

/// Why a worktree is considered safe to clean up
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StaleReason {
    PrMerged,
    PrClosed,
    NoUniqueCommits,
    UpstreamGone,
}

impl StaleReason {
    pub fn describe(self) -> &'static str {
        match self {
            StaleReason::PrMerged => "PR merged",
            StaleReason::PrClosed => "PR closed",
            StaleReason::NoUniqueCommits => "no unique commits",
            StaleReason::UpstreamGone => "upstream branch deleted",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum PrState {
    Open,
    Merged,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub state: PrState,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum CiStatus {
    Passed,
    Failed,
    Pending,
    /// The PR has no checks configured
    #[strum(serialize = "none")]
    NoChecks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum BranchState {
    #[default]
    Active,
    Stale,
}

/// One worktree as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worktree {
    pub name: String,
    pub path: PathBuf,
    pub branch: Option<String>,
    pub head: String,
    pub is_current: bool,
    pub is_main: bool,
    pub locked: bool,
    pub prunable: bool,
    pub staged: usize,
    pub modified: usize,
    pub untracked: usize,
    pub unpushed_commits: usize,
    pub unique_commits: Option<usize>,
    pub upstream_gone: bool,
    pub has_submodules: bool,
    pub branch_status: BranchState,
    pub stale_reason: Option<StaleReason>,
    pub pr: Option<PullRequest>,
    pub ci: Option<CiStatus>,
}

impl Worktree {
    pub fn from_parts(
        info: &WorktreeInfo,
        status: Option<&BranchStatus>,
        is_current: bool,
        is_main: bool,
    ) -> Self {
        let status = status.cloned().unwrap_or_default();
        let mut wt = Self {
            name: dir_name(&info.path),
            path: info.path.clone(),
            branch: info.branch.clone(),
            head: info.head.chars().take(8).collect(),
            is_current,
            is_main,
            locked: info.locked.is_some(),
            prunable: info.prunable.is_some(),
            staged: status.counts.staged,
            modified: status.counts.modified,
            untracked: status.counts.untracked,
            unpushed_commits: status.unpushed_commits,
            unique_commits: status.unique_commits,
            upstream_gone: status.upstream_gone,
            has_submodules: status.has_submodules,
            branch_status: BranchState::Active,
            stale_reason: None,
            pr: None,
            ci: None,
        };
        wt.reclassify();
        wt
    }

    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.modified == 0 && self.untracked == 0
    }

    /// Label for lists: the branch, or the directory name when detached.
    pub fn label(&self) -> &str {
        self.branch.as_deref().unwrap_or(&self.name)
    }

    fn reclassify(&mut self) {
        self.stale_reason = classify(self);
        self.branch_status = if self.stale_reason.is_some() {
            BranchState::Stale
        } else {
            BranchState::Active
        };
    }
}

/// Staleness of a worktree; the current and main worktrees are never stale.
pub fn classify(wt: &Worktree) -> Option<StaleReason> {
    if wt.is_current || wt.is_main {
        return None;
    }
    match wt.pr.as_ref().map(|pr| pr.state) {
        Some(PrState::Merged) => return Some(StaleReason::PrMerged),
        Some(PrState::Closed) => return Some(StaleReason::PrClosed),
        _ => {}
    }
    if wt.upstream_gone {
        return Some(StaleReason::UpstreamGone);
    }
    if wt.branch.is_some() && wt.unique_commits == Some(0) {
        return Some(StaleReason::NoUniqueCommits);
    }
    None
}

/// GitHub data computed for one snapshot generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitHubEnrichment {
    pub generation: u64,
    /// Keyed by branch name
    pub prs: HashMap<String, PullRequest>,
    pub ci: HashMap<String, CiStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub generation: u64,
    pub worktrees: Vec<Worktree>,
    pub default_branch: String,
    /// Primary worktree
    pub repo_root: PathBuf,
    pub refreshed_at: DateTime<Local>,
}

impl Snapshot {
    /// Read worktrees and their status from `backend`.
    ///
    /// The generation is assigned when the snapshot is published.
    pub fn load(backend: &dyn GitBackend) -> anyhow::Result<Self> {
        let list = backend.list_worktrees()?;
        let current = backend.current_worktree()?;
        let default_branch = backend.default_branch()?;
        let statuses = backend.branch_statuses(list.all(), &default_branch)?;
        let by_path: HashMap<&Path, &BranchStatus> =
            statuses.iter().map(|s| (s.path.as_path(), s)).collect();

        let repo_root = list.primary().path.clone();
        let worktrees = list
            .iter()
            .map(|info| {
                let is_current = same_path(&info.path, &current);
                let is_main = info.path == repo_root;
                Worktree::from_parts(
                    info,
                    by_path.get(info.path.as_path()).copied(),
                    is_current,
                    is_main,
                )
            })
            .collect();

        Ok(Self {
            generation: 0,
            worktrees,
            default_branch,
            repo_root,
            refreshed_at: Local::now(),
        })
    }

    pub fn empty() -> Self {
        Self {
            generation: 0,
            worktrees: Vec::new(),
            default_branch: String::new(),
            repo_root: PathBuf::new(),
            refreshed_at: Local::now(),
        }
    }

    pub fn current(&self) -> Option<&Worktree> {
        self.worktrees.iter().find(|wt| wt.is_current)
    }

    pub fn find(&self, path: &Path) -> Option<&Worktree> {
        self.worktrees.iter().find(|wt| wt.path == path)
    }

    pub fn find_branch(&self, branch: &str) -> Option<&Worktree> {
        self.worktrees
            .iter()
            .find(|wt| wt.branch.as_deref() == Some(branch))
    }

    pub fn stale(&self) -> Vec<Worktree> {
        self.worktrees
            .iter()
            .filter(|wt| wt.stale_reason.is_some())
            .cloned()
            .collect()
    }

    /// Branch names eligible for GitHub lookups (the main worktree is skipped).
    pub fn enrichable_branches(&self) -> Vec<String> {
        self.worktrees
            .iter()
            .filter(|wt| !wt.is_main)
            .filter_map(|wt| wt.branch.clone())
            .collect()
    }

    /// New snapshot with GitHub data applied and staleness recomputed.
    pub fn enriched(&self, enrichment: &GitHubEnrichment) -> Self {
        let mut next = self.clone();
        for wt in &mut next.worktrees {
            let Some(branch) = wt.branch.as_deref() else {
                continue;
            };
            if let Some(pr) = enrichment.prs.get(branch) {
                wt.pr = Some(pr.clone());
            }
            if let Some(ci) = enrichment.ci.get(branch) {
                wt.ci = Some(*ci);
            }
            wt.reclassify();
        }
        next
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    a == b
        || match (dunce::canonicalize(a), dunce::canonicalize(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
}

/// Holder of the published snapshot.
#[derive(Debug, Clone)]
pub struct Registry {
    snapshot: Arc<Snapshot>,
    last_generation: u64,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            snapshot: Arc::new(Snapshot::empty()),
            last_generation: 0,
        }
    }
}

impl Registry {
    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    pub fn generation(&self) -> u64 {
        self.snapshot.generation
    }

    pub fn is_loaded(&self) -> bool {
        self.last_generation > 0
    }

    /// Publish a freshly loaded snapshot under the next generation number.
    pub fn publish(&mut self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        self.last_generation += 1;
        snapshot.generation = self.last_generation;
        self.snapshot = Arc::new(snapshot);
        Arc::clone(&self.snapshot)
    }

    /// Fold GitHub data into the current snapshot.
    ///
    /// Returns false, leaving the snapshot untouched, when the data was
    /// computed for an older generation.
    pub fn apply_enrichment(&mut self, enrichment: &GitHubEnrichment) -> bool {
        if enrichment.generation != self.snapshot.generation {
            log::debug!(
                "Dropping GitHub data for generation {} (current {})",
                enrichment.generation,
                self.snapshot.generation
            );
            return false;
        }
        self.snapshot = Arc::new(self.snapshot.enriched(enrichment));
        true
    }
}
