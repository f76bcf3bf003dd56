//! Compare the selected worktree's branch against a base branch.

use crossterm::event::{KeyCode, KeyEvent};

use super::command::Command;
use super::message::Msg;
use super::selection::ListPicker;
use super::{Model, View};
use crate::git::Comparison;

#[derive(Debug)]
pub enum CompareStep {
    LoadingBranches,
    PickBase(ListPicker),
    Loading { base: String },
    Result { comparison: Comparison, scroll: usize },
}

#[derive(Debug)]
pub struct CompareState {
    pub head: String,
    pub step: CompareStep,
}

impl CompareState {
    pub(super) fn is_loading(&self) -> bool {
        matches!(
            self.step,
            CompareStep::LoadingBranches | CompareStep::Loading { .. }
        )
    }

    /// Whether a comparison of `base..head` is the one this view is waiting for.
    fn awaits(&self, base: &str, head: &str) -> bool {
        matches!(&self.step, CompareStep::Loading { base: waiting } if waiting == base)
            && self.head == head
    }
}

/// Lines of a comparison as shown in the result view.
pub fn result_lines(comparison: &Comparison) -> Vec<String> {
    let mut lines = Vec::new();
    if comparison.commits.is_empty() {
        lines.push(format!(
            "{} has no commits that are not in {}",
            comparison.head, comparison.base
        ));
    } else {
        lines.push(format!(
            "{} commit{} in {} not in {}:",
            comparison.commits.len(),
            if comparison.commits.len() == 1 { "" } else { "s" },
            comparison.head,
            comparison.base
        ));
        lines.extend(comparison.commits.iter().map(|c| format!("  {c}")));
    }
    if !comparison.diffstat.is_empty() {
        lines.push(String::new());
        lines.extend(comparison.diffstat.iter().cloned());
    }
    lines
}

pub(super) fn enter(model: &mut Model) -> Vec<Command> {
    let Some(head) = model.selected_worktree().and_then(|wt| wt.branch.clone()) else {
        model.notice = Some("Selected worktree has no branch".to_string());
        return Vec::new();
    };
    model.view = View::Compare(CompareState {
        head,
        step: CompareStep::LoadingBranches,
    });
    let mut commands = vec![Command::LoadBranches];
    commands.extend(model.spinner_tick());
    commands
}

pub(super) fn on_key(model: &mut Model, mut state: CompareState, key: KeyEvent) -> (View, Vec<Command>) {
    let window = model.list_window();
    match &mut state.step {
        CompareStep::LoadingBranches | CompareStep::Loading { .. } => {
            if key.code == KeyCode::Esc {
                return (View::Dashboard, Vec::new());
            }
        }
        CompareStep::PickBase(picker) => match key.code {
            KeyCode::Enter => {
                if let Some(base) = picker.selected_item().map(str::to_string) {
                    let head = state.head.clone();
                    state.step = CompareStep::Loading { base: base.clone() };
                    let mut commands = vec![Command::CompareBranches { base, head }];
                    commands.extend(model.spinner_tick());
                    return (View::Compare(state), commands);
                }
            }
            KeyCode::Esc => return (View::Dashboard, Vec::new()),
            _ => {
                picker.handle_key(key);
            }
        },
        CompareStep::Result { comparison, scroll } => {
            let max = result_lines(comparison).len().saturating_sub(window);
            match key.code {
                KeyCode::Up | KeyCode::Char('k') => *scroll = scroll.saturating_sub(1),
                KeyCode::Down | KeyCode::Char('j') => *scroll = (*scroll + 1).min(max),
                KeyCode::PageUp => *scroll = scroll.saturating_sub(window),
                KeyCode::PageDown => *scroll = (*scroll + window).min(max),
                _ => return (View::Dashboard, Vec::new()),
            }
        }
    }
    (View::Compare(state), Vec::new())
}

pub(super) fn on_message(model: &mut Model, mut state: CompareState, msg: Msg) -> (View, Vec<Command>) {
    match msg {
        Msg::BranchesLoaded(_) if !matches!(state.step, CompareStep::LoadingBranches) => {
            log::debug!("Compare dropping branch list; not waiting for one");
            (View::Compare(state), Vec::new())
        }
        Msg::ComparisonLoaded { base, head, .. } if !state.awaits(&base, &head) => {
            log::debug!("Compare dropping stale result for {base}..{head}");
            (View::Compare(state), Vec::new())
        }
        Msg::BranchesLoaded(Ok(branches)) => {
            let names: Vec<String> = branches
                .into_iter()
                .map(|b| b.name)
                .filter(|name| *name != state.head)
                .collect();
            if names.is_empty() {
                model.notice = Some("No other branches to compare against".to_string());
                return (View::Dashboard, Vec::new());
            }
            let default_branch = model.snapshot().default_branch.clone();
            let picker = ListPicker::new(names, Some(default_branch.as_str()), model.list_window());
            state.step = CompareStep::PickBase(picker);
            (View::Compare(state), Vec::new())
        }
        Msg::ComparisonLoaded {
            result: Ok(comparison),
            ..
        } => {
            state.step = CompareStep::Result {
                comparison,
                scroll: 0,
            };
            (View::Compare(state), Vec::new())
        }
        Msg::BranchesLoaded(Err(e)) | Msg::ComparisonLoaded { result: Err(e), .. } => {
            model.last_error = Some(e);
            (View::Dashboard, Vec::new())
        }
        other => {
            log::debug!("Compare ignoring {other:?}");
            (View::Compare(state), Vec::new())
        }
    }
}
