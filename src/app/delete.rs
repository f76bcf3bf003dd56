//! Deleting one worktree, or several picked from a list.
//!
//! Multi-select is keyed by path so a refresh that reorders the list cannot
//! move a check mark onto a different worktree.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent};

use super::command::Command;
use super::deletion::{DeletionResult, DeletionTarget};
use super::selection::{SelectionSet, follow_scroll};
use super::{BusyOp, Model, View};
use crate::registry::{Snapshot, Worktree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStep {
    Selection,
    Confirm,
    Deleting,
    Complete,
}

#[derive(Debug)]
pub struct DeleteState {
    pub step: DeleteStep,
    /// Set for single deletion
    pub target: Option<DeletionTarget>,
    /// Deletable worktrees offered in multi-select
    pub candidates: Vec<Worktree>,
    pub selected: SelectionSet<PathBuf>,
    pub cursor: usize,
    pub scroll: usize,
    pub force_delete: bool,
    pub results: Vec<DeletionResult>,
}

fn deletable(wt: &Worktree) -> bool {
    !wt.is_current && !wt.is_main
}

impl DeleteState {
    pub fn is_multi(&self) -> bool {
        self.target.is_none()
    }

    /// What the confirmation applies to.
    pub fn targets(&self) -> Vec<DeletionTarget> {
        match &self.target {
            Some(target) => vec![target.clone()],
            None => self
                .candidates
                .iter()
                .filter(|wt| self.selected.contains(&wt.path))
                .map(|wt| DeletionTarget {
                    path: wt.path.clone(),
                    branch: wt.branch.clone(),
                })
                .collect(),
        }
    }

    /// Rebuild the candidate list from a new snapshot, keeping marks on
    /// worktrees that still exist.
    pub fn sync_candidates(&mut self, snapshot: &Snapshot) {
        if !self.is_multi() || self.step != DeleteStep::Selection {
            return;
        }
        self.candidates = snapshot
            .worktrees
            .iter()
            .filter(|wt| deletable(wt))
            .cloned()
            .collect();
        let candidates = &self.candidates;
        self.selected
            .retain(|path| candidates.iter().any(|wt| &wt.path == path));
        self.cursor = self.cursor.min(self.candidates.len().saturating_sub(1));
    }

    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_err()).count()
    }
}

pub(super) fn enter_single(model: &mut Model) {
    let Some(wt) = model.selected_worktree() else {
        return;
    };
    if wt.is_current {
        model.notice = Some("Cannot delete the worktree you are in".to_string());
        return;
    }
    if wt.is_main {
        model.notice = Some("Cannot delete the main worktree".to_string());
        return;
    }
    let target = DeletionTarget {
        path: wt.path.clone(),
        branch: wt.branch.clone(),
    };
    model.view = View::Delete(DeleteState {
        step: DeleteStep::Confirm,
        target: Some(target),
        candidates: Vec::new(),
        selected: SelectionSet::new(),
        cursor: 0,
        scroll: 0,
        force_delete: false,
        results: Vec::new(),
    });
}

pub(super) fn enter_multi(model: &mut Model) {
    let candidates: Vec<Worktree> = model
        .snapshot()
        .worktrees
        .iter()
        .filter(|wt| deletable(wt))
        .cloned()
        .collect();
    if candidates.is_empty() {
        model.notice = Some("No worktrees to delete".to_string());
        return;
    }
    model.view = View::Delete(DeleteState {
        step: DeleteStep::Selection,
        target: None,
        candidates,
        selected: SelectionSet::new(),
        cursor: 0,
        scroll: 0,
        force_delete: false,
        results: Vec::new(),
    });
}

pub(super) fn on_key(model: &mut Model, mut state: DeleteState, key: KeyEvent) -> (View, Vec<Command>) {
    match state.step {
        DeleteStep::Selection => match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                state.cursor = state.cursor.saturating_sub(1);
                state.scroll =
                    follow_scroll(state.cursor, state.scroll, model.list_window(), state.candidates.len());
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if state.cursor + 1 < state.candidates.len() {
                    state.cursor += 1;
                }
                state.scroll =
                    follow_scroll(state.cursor, state.scroll, model.list_window(), state.candidates.len());
            }
            KeyCode::Char(' ') => {
                if let Some(wt) = state.candidates.get(state.cursor) {
                    state.selected.toggle(wt.path.clone());
                }
            }
            KeyCode::Enter => {
                if state.selected.is_empty() {
                    model.notice = Some("Select at least one worktree".to_string());
                } else {
                    state.step = DeleteStep::Confirm;
                }
            }
            KeyCode::Esc | KeyCode::Char('q') => return (View::Dashboard, Vec::new()),
            _ => {}
        },
        DeleteStep::Confirm => match key.code {
            KeyCode::Char('f') => state.force_delete = !state.force_delete,
            KeyCode::Char('y') | KeyCode::Enter => {
                let targets = state.targets();
                if targets.is_empty() {
                    state.step = DeleteStep::Selection;
                    return (View::Delete(state), Vec::new());
                }
                state.step = DeleteStep::Deleting;
                let commands = model.start(
                    BusyOp::Delete,
                    Command::DeleteWorktrees {
                        targets,
                        force: state.force_delete,
                    },
                );
                return (View::Delete(state), commands);
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                if state.is_multi() {
                    state.step = DeleteStep::Selection;
                } else {
                    return (View::Dashboard, Vec::new());
                }
            }
            _ => {}
        },
        DeleteStep::Deleting => {}
        DeleteStep::Complete => return (View::Dashboard, Vec::new()),
    }
    (View::Delete(state), Vec::new())
}

pub(super) fn on_deleted(
    model: &mut Model,
    mut state: DeleteState,
    results: Vec<DeletionResult>,
) -> (View, Vec<Command>) {
    model.busy = None;
    let commands = model.refresh();

    if !state.is_multi()
        && let Some(failure) = results.first().and_then(|r| r.outcome.as_ref().err())
    {
        model.last_error = Some(format!("Delete failed: {} ({})", failure.reason, failure.detail));
        return (View::Dashboard, commands);
    }

    state.results = results;
    state.step = DeleteStep::Complete;
    (View::Delete(state), commands)
}
