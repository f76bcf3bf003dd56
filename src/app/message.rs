//! Everything that can arrive at the model.

use std::path::PathBuf;

use crossterm::event::KeyEvent;

use super::deletion::{DeletionFailure, DeletionResult};
use crate::actions::Action;
use crate::config::LoadedConfig;
use crate::git::{BranchInfo, Comparison, CreateOutcome, MergeOutcome};
use crate::github::Availability;
use crate::registry::{GitHubEnrichment, Snapshot};

#[derive(Debug)]
pub enum Event {
    Input(KeyEvent),
    Resize(u16, u16),
    Message(Msg),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    /// Advances the spinner while work is in flight
    Spinner,
    /// Background refresh while the setting is on
    AutoRefresh,
}

/// Result of a merge plus the optional removal of the merged worktree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub outcome: MergeOutcome,
    /// `None` when removal was not requested
    pub removal: Option<Result<(), String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForEachResult {
    pub label: String,
    pub path: PathBuf,
    pub success: bool,
    pub output: String,
}

/// Completion of a dispatched command. Failures are flattened to strings.
#[derive(Debug)]
pub enum Msg {
    WorktreesLoaded {
        request: u64,
        result: Result<Snapshot, String>,
    },
    GitHubChecked(Availability),
    GitHubEnriched(GitHubEnrichment),
    BranchesLoaded(Result<Vec<BranchInfo>, String>),
    WorktreeCreated(Result<CreateOutcome, String>),
    WorktreesDeleted(Vec<DeletionResult>),
    CleanupItemDeleted {
        index: usize,
        result: Result<(), DeletionFailure>,
    },
    WorktreesPruned(Result<Vec<PathBuf>, String>),
    ComparisonLoaded {
        base: String,
        head: String,
        result: Result<Comparison, String>,
    },
    BranchMerged(Result<MergeReport, String>),
    ForEachFinished(Vec<ForEachResult>),
    CommitMessageGenerated(Result<String, String>),
    Committed(Result<String, String>),
    ActionsResolved {
        path: PathBuf,
        actions: Vec<Action>,
    },
    ActionExecuted(Result<String, String>),
    PullRequestOpened(Result<(), String>),
    ConfigLoaded(Result<LoadedConfig, String>),
    ConfigSaved(Result<PathBuf, String>),
    DirectiveWritten(Result<Option<String>, String>),
    Tick(TickKind),
}
