//! Run one shell command in every worktree.

use crossterm::event::{KeyCode, KeyEvent};

use super::command::{Command, ForEachTarget};
use super::message::ForEachResult;
use super::selection::{TextInput, follow_scroll};
use super::{Model, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForEachStep {
    Input,
    Running,
    Results,
}

#[derive(Debug)]
pub struct ForEachState {
    pub step: ForEachStep,
    pub input: TextInput,
    pub results: Vec<ForEachResult>,
    pub cursor: usize,
    pub scroll: usize,
}

impl ForEachState {
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}

pub(super) fn enter(model: &mut Model) {
    model.view = View::ForEach(ForEachState {
        step: ForEachStep::Input,
        input: TextInput::default(),
        results: Vec::new(),
        cursor: 0,
        scroll: 0,
    });
}

pub(super) fn on_key(model: &mut Model, mut state: ForEachState, key: KeyEvent) -> (View, Vec<Command>) {
    match state.step {
        ForEachStep::Input => match key.code {
            KeyCode::Enter => {
                let command = state.input.value().trim().to_string();
                if command.is_empty() {
                    return (View::ForEach(state), Vec::new());
                }
                let targets: Vec<ForEachTarget> = model
                    .snapshot()
                    .worktrees
                    .iter()
                    .map(|wt| ForEachTarget {
                        label: wt.label().to_string(),
                        path: wt.path.clone(),
                    })
                    .collect();
                state.step = ForEachStep::Running;
                let mut commands = vec![Command::ForEach { targets, command }];
                commands.extend(model.spinner_tick());
                return (View::ForEach(state), commands);
            }
            KeyCode::Esc => return (View::Dashboard, Vec::new()),
            _ => {
                state.input.handle_key(key);
            }
        },
        ForEachStep::Running => {}
        ForEachStep::Results => match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                state.cursor = state.cursor.saturating_sub(1);
                state.scroll = follow_scroll(
                    state.cursor,
                    state.scroll,
                    model.list_window(),
                    state.results.len(),
                );
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if state.cursor + 1 < state.results.len() {
                    state.cursor += 1;
                }
                state.scroll = follow_scroll(
                    state.cursor,
                    state.scroll,
                    model.list_window(),
                    state.results.len(),
                );
            }
            KeyCode::Enter => {
                // Edit and run again
                state.step = ForEachStep::Input;
            }
            _ => return (View::Dashboard, Vec::new()),
        },
    }
    (View::ForEach(state), Vec::new())
}

pub(super) fn on_finished(
    _model: &mut Model,
    mut state: ForEachState,
    results: Vec<ForEachResult>,
) -> (View, Vec<Command>) {
    state.results = results;
    state.cursor = 0;
    state.scroll = 0;
    state.step = ForEachStep::Results;
    (View::ForEach(state), Vec::new())
}
