//! Merge the selected worktree's branch into another checked-out branch.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent};

use super::command::Command;
use super::deletion::DeletionTarget;
use super::message::MergeReport;
use super::selection::ListPicker;
use super::{BusyOp, Model, View};
use crate::git::MergeRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStep {
    PickTarget,
    Options,
    Confirm,
    Merging,
    Complete,
}

/// Rows of the options step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, strum::Display)]
pub enum MergeOption {
    #[strum(serialize = "Squash commits")]
    Squash,
    #[strum(serialize = "Remove worktree after merge")]
    RemoveWorktree,
}

#[derive(Debug)]
pub struct MergeState {
    pub step: MergeStep,
    pub source: String,
    pub source_path: PathBuf,
    /// Removing the source is not offered for the worktree we run in
    pub can_remove: bool,
    pub picker: ListPicker,
    pub target: String,
    pub squash: bool,
    pub remove_after: bool,
    pub option_cursor: usize,
    pub report: Option<MergeReport>,
}

impl MergeState {
    pub fn option_enabled(&self, option: MergeOption) -> bool {
        match option {
            MergeOption::Squash => self.squash,
            MergeOption::RemoveWorktree => self.remove_after,
        }
    }

    fn toggle_option(&mut self) -> Result<(), &'static str> {
        use strum::IntoEnumIterator;

        match MergeOption::iter().nth(self.option_cursor) {
            Some(MergeOption::Squash) => self.squash = !self.squash,
            Some(MergeOption::RemoveWorktree) => {
                if !self.can_remove {
                    return Err("Cannot remove the worktree you are in or the main worktree");
                }
                self.remove_after = !self.remove_after;
            }
            None => {}
        }
        Ok(())
    }
}

pub(super) fn enter(model: &mut Model) {
    let Some(wt) = model.selected_worktree() else {
        return;
    };
    let Some(source) = wt.branch.clone() else {
        model.notice = Some("Selected worktree has no branch".to_string());
        return;
    };
    let source_path = wt.path.clone();
    let can_remove = !wt.is_current && !wt.is_main;

    let snapshot = model.snapshot();
    let targets: Vec<String> = snapshot
        .worktrees
        .iter()
        .filter_map(|wt| wt.branch.clone())
        .filter(|branch| *branch != source)
        .collect();
    if targets.is_empty() {
        model.notice = Some("No other checked-out branch to merge into".to_string());
        return;
    }
    let picker = ListPicker::new(
        targets,
        Some(snapshot.default_branch.as_str()),
        model.list_window(),
    );
    model.view = View::Merge(MergeState {
        step: MergeStep::PickTarget,
        source,
        source_path,
        can_remove,
        picker,
        target: String::new(),
        squash: false,
        remove_after: false,
        option_cursor: 0,
        report: None,
    });
}

pub(super) fn on_key(model: &mut Model, mut state: MergeState, key: KeyEvent) -> (View, Vec<Command>) {
    match state.step {
        MergeStep::PickTarget => match key.code {
            KeyCode::Enter => {
                if let Some(target) = state.picker.selected_item() {
                    state.target = target.to_string();
                    state.step = MergeStep::Options;
                }
            }
            KeyCode::Esc => return (View::Dashboard, Vec::new()),
            _ => {
                state.picker.handle_key(key);
            }
        },
        MergeStep::Options => match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                state.option_cursor = state.option_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                state.option_cursor = (state.option_cursor + 1).min(1);
            }
            KeyCode::Char(' ') => {
                if let Err(reason) = state.toggle_option() {
                    model.notice = Some(reason.to_string());
                }
            }
            KeyCode::Enter => state.step = MergeStep::Confirm,
            KeyCode::Esc => state.step = MergeStep::PickTarget,
            _ => {}
        },
        MergeStep::Confirm => match key.code {
            KeyCode::Enter | KeyCode::Char('y') => {
                let request = MergeRequest {
                    source: state.source.clone(),
                    target: state.target.clone(),
                    squash: state.squash,
                    message: None,
                };
                let remove_source = state.remove_after.then(|| DeletionTarget {
                    path: state.source_path.clone(),
                    branch: Some(state.source.clone()),
                });
                state.step = MergeStep::Merging;
                let commands = model.start(
                    BusyOp::Merge,
                    Command::MergeBranch {
                        request,
                        remove_source,
                        ai: model.config.config.ai.clone(),
                    },
                );
                return (View::Merge(state), commands);
            }
            KeyCode::Esc | KeyCode::Char('n') => state.step = MergeStep::Options,
            _ => {}
        },
        MergeStep::Merging => {}
        MergeStep::Complete => return (View::Dashboard, Vec::new()),
    }
    (View::Merge(state), Vec::new())
}

pub(super) fn on_merged(
    model: &mut Model,
    mut state: MergeState,
    result: Result<MergeReport, String>,
) -> (View, Vec<Command>) {
    model.busy = None;
    let commands = model.refresh();
    match result {
        Ok(report) => {
            state.report = Some(report);
            state.step = MergeStep::Complete;
            (View::Merge(state), commands)
        }
        Err(e) => {
            model.last_error = Some(e);
            (View::Dashboard, commands)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{ch, default_model, has_refresh, key, run};
    use super::super::{Event, Msg};
    use super::*;
    use crate::git::MergeOutcome;

    fn merge_state(model: &Model) -> &MergeState {
        match &model.view {
            View::Merge(state) => state,
            other => panic!("expected merge view, got {other:?}"),
        }
    }

    #[test]
    fn test_merge_into_default_branch_with_removal() {
        let (model, _) = run(default_model(), [key(KeyCode::Down), ch('m')]);
        let state = merge_state(&model);
        assert_eq!(state.source, "feature");
        assert_eq!(state.picker.selected_item(), Some("main"));

        let (model, commands) = run(
            model,
            [
                key(KeyCode::Enter),
                ch(' '),
                key(KeyCode::Down),
                ch(' '),
                key(KeyCode::Enter),
                ch('y'),
            ],
        );
        assert_eq!(model.busy, Some(BusyOp::Merge));
        match &commands[0] {
            Command::MergeBranch {
                request,
                remove_source,
                ..
            } => {
                assert_eq!(request.source, "feature");
                assert_eq!(request.target, "main");
                assert!(request.squash);
                assert_eq!(
                    remove_source.as_ref().map(|t| t.path.clone()),
                    Some(PathBuf::from("/repo.worktrees/feature"))
                );
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_current_worktree_cannot_be_removed_after_merge() {
        let (model, _) = run(
            default_model(),
            [ch('m'), key(KeyCode::Enter), key(KeyCode::Down), ch(' ')],
        );
        let state = merge_state(&model);
        assert!(!state.remove_after);
        assert!(model.notice.is_some());
    }

    #[test]
    fn test_merge_result_refreshes_either_way() {
        let events = || {
            [
                key(KeyCode::Down),
                ch('m'),
                key(KeyCode::Enter),
                key(KeyCode::Enter),
                ch('y'),
            ]
        };
        let (model, _) = run(default_model(), events());
        let (model, commands) = model.update(Event::Message(Msg::BranchMerged(Err(
            "CONFLICT (content)".into(),
        ))));
        assert!(has_refresh(&commands));
        assert!(matches!(model.view, View::Dashboard));
        assert!(model.busy.is_none());

        let (model, _) = run(default_model(), events());
        let (model, commands) = model.update(Event::Message(Msg::BranchMerged(Ok(MergeReport {
            outcome: MergeOutcome {
                target_path: PathBuf::from("/repo"),
                summary: "Fast-forward".into(),
            },
            removal: None,
        }))));
        assert!(has_refresh(&commands));
        assert_eq!(merge_state(&model).step, MergeStep::Complete);
    }
}
