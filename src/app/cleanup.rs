//! Bulk removal of stale worktrees.
//!
//! The stale list is copied when the view opens, so indices into it stay
//! valid for the life of the view. Deletion runs one worktree at a time in
//! ascending index order; each result is recorded before the next item is
//! dispatched, and a failure never stops the run.

use std::collections::BTreeMap;

use crossterm::event::{KeyCode, KeyEvent};

use super::command::Command;
use super::deletion::{DeletionTarget, FailureReason};
use super::selection::{SelectionSet, follow_scroll};
use super::{BusyOp, Model, View};
use crate::registry::{PrState, StaleReason, Worktree};

/// Cursor row for the "force delete" toggle above the list.
pub const FORCE_ROW: isize = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupStep {
    Selecting,
    Running,
    /// Finished with at least one failure
    Summary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupState {
    pub step: CleanupStep,
    pub stale_worktrees: Vec<Worktree>,
    pub selected: SelectionSet<usize>,
    /// `FORCE_ROW` or an index into `stale_worktrees`
    pub cursor: isize,
    pub scroll: usize,
    pub force_delete: bool,
    pub deleted: SelectionSet<usize>,
    pub failed: BTreeMap<usize, FailureReason>,
    pub current_index: Option<usize>,
    pub total_cleaned: usize,
    pub total_failed: usize,
    pub confirmed: bool,
    pub in_progress: bool,
}

/// Whether a stale worktree starts out checked.
///
/// Only merged work with nothing uncommitted qualifies; everything else,
/// including clean branches without unique commits, starts unchecked.
pub fn is_preselected(wt: &Worktree) -> bool {
    wt.stale_reason == Some(StaleReason::PrMerged)
        && wt.pr.as_ref().is_some_and(|pr| pr.state == PrState::Merged)
        && wt.staged == 0
        && wt.modified == 0
        && wt.untracked == 0
}

impl CleanupState {
    pub fn new(stale: Vec<Worktree>) -> Self {
        let stale_worktrees: Vec<Worktree> = stale
            .into_iter()
            .filter(|wt| !wt.is_current && !wt.is_main)
            .collect();
        let selected = stale_worktrees
            .iter()
            .enumerate()
            .filter(|(_, wt)| is_preselected(wt))
            .map(|(i, _)| i)
            .collect();

        Self {
            step: CleanupStep::Selecting,
            stale_worktrees,
            selected,
            cursor: FORCE_ROW,
            scroll: 0,
            force_delete: false,
            deleted: SelectionSet::new(),
            failed: BTreeMap::new(),
            current_index: None,
            total_cleaned: 0,
            total_failed: 0,
            confirmed: false,
            in_progress: false,
        }
    }

    /// Move the cursor, clamping to `[FORCE_ROW, len - 1]`.
    pub fn move_cursor(&mut self, delta: isize, window: usize) {
        let last = self.stale_worktrees.len() as isize - 1;
        self.cursor = (self.cursor + delta).clamp(FORCE_ROW, last.max(FORCE_ROW));
        if self.cursor >= 0 {
            self.scroll = follow_scroll(
                self.cursor as usize,
                self.scroll,
                window,
                self.stale_worktrees.len(),
            );
        } else {
            self.scroll = 0;
        }
    }

    /// Toggle the row under the cursor. Ignored once the selection is frozen.
    pub fn toggle(&mut self) {
        if self.confirmed {
            return;
        }
        if self.cursor == FORCE_ROW {
            self.force_delete = !self.force_delete;
        } else if let Ok(index) = usize::try_from(self.cursor)
            && index < self.stale_worktrees.len()
        {
            self.selected.toggle(index);
        }
    }

    /// Freeze the selection and start deleting.
    ///
    /// Returns `None` (and changes nothing) when nothing is selected.
    pub fn confirm(&mut self) -> Option<Command> {
        if self.confirmed || self.selected.is_empty() {
            return None;
        }
        if self
            .selected
            .iter()
            .any(|&i| self.stale_worktrees[i].has_submodules)
        {
            self.force_delete = true;
        }
        self.confirmed = true;
        self.in_progress = true;
        self.step = CleanupStep::Running;
        self.next_command()
    }

    /// Selected indices not yet attempted, ascending.
    pub fn pending(&self) -> Vec<usize> {
        self.selected
            .iter()
            .copied()
            .filter(|i| !self.deleted.contains(i) && !self.failed.contains_key(i))
            .collect()
    }

    /// `(done, total)` where total counts only selected worktrees.
    pub fn progress(&self) -> (usize, usize) {
        (self.total_cleaned + self.total_failed, self.selected.len())
    }

    fn next_command(&mut self) -> Option<Command> {
        let index = *self.pending().first()?;
        self.current_index = Some(index);
        let wt = &self.stale_worktrees[index];
        Some(Command::CleanupDelete {
            index,
            target: DeletionTarget {
                path: wt.path.clone(),
                branch: wt.branch.clone(),
            },
            force: self.force_delete || wt.has_submodules,
        })
    }

    /// Record one item's outcome and return the next deletion, if any.
    pub fn record(&mut self, index: usize, outcome: Result<(), FailureReason>) -> Option<Command> {
        if !self.in_progress || self.current_index != Some(index) {
            log::warn!("Ignoring cleanup result for index {index}");
            return None;
        }
        match outcome {
            Ok(()) => {
                self.deleted.insert(index);
                self.total_cleaned += 1;
            }
            Err(reason) => {
                self.failed.insert(index, reason);
                self.total_failed += 1;
            }
        }
        self.current_index = None;

        let next = self.next_command();
        if next.is_none() {
            self.in_progress = false;
            self.step = if self.total_failed > 0 {
                CleanupStep::Summary
            } else {
                CleanupStep::Selecting
            };
        }
        next
    }

    /// Failed worktrees with their reasons, in index order.
    pub fn failures(&self) -> Vec<(&Worktree, FailureReason)> {
        self.failed
            .iter()
            .map(|(&i, &reason)| (&self.stale_worktrees[i], reason))
            .collect()
    }
}

/// Open the cleanup view, or explain why not.
pub(super) fn enter(model: &mut Model) -> Vec<Command> {
    let state = CleanupState::new(model.registry.snapshot().stale());
    if state.stale_worktrees.is_empty() {
        model.notice = Some("No stale worktrees to clean up".to_string());
        return Vec::new();
    }
    model.view = View::Cleanup(state);
    Vec::new()
}

pub(super) fn on_key(model: &mut Model, mut state: CleanupState, key: KeyEvent) -> (View, Vec<Command>) {
    let window = model.list_window();
    match state.step {
        CleanupStep::Selecting => match key.code {
            KeyCode::Up | KeyCode::Char('k') => state.move_cursor(-1, window),
            KeyCode::Down | KeyCode::Char('j') => state.move_cursor(1, window),
            KeyCode::Char(' ') => state.toggle(),
            KeyCode::Enter => {
                if let Some(command) = state.confirm() {
                    model.busy = Some(BusyOp::Cleanup);
                    let mut commands = vec![command];
                    commands.extend(model.spinner_tick());
                    return (View::Cleanup(state), commands);
                }
            }
            KeyCode::Esc | KeyCode::Char('q') => return (View::Dashboard, Vec::new()),
            _ => {}
        },
        // Input is ignored while deleting
        CleanupStep::Running => {}
        CleanupStep::Summary => return (View::Dashboard, Vec::new()),
    }
    (View::Cleanup(state), Vec::new())
}

pub(super) fn on_item_deleted(
    model: &mut Model,
    mut state: CleanupState,
    index: usize,
    outcome: Result<(), FailureReason>,
) -> (View, Vec<Command>) {
    if let Some(next) = state.record(index, outcome) {
        return (View::Cleanup(state), vec![next]);
    }
    if state.in_progress {
        return (View::Cleanup(state), Vec::new());
    }

    model.busy = None;
    let mut commands = model.refresh();
    let (cleaned, total) = (state.total_cleaned, state.selected.len());
    if state.step == CleanupStep::Summary {
        return (View::Cleanup(state), commands);
    }
    model.notice = Some(format!(
        "Removed {cleaned} of {total} worktree{}",
        if total == 1 { "" } else { "s" }
    ));
    commands.extend(model.spinner_tick());
    (View::Dashboard, commands)
}
