//! First-run setup: choose where new worktrees go and write the config file.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent};

use super::command::Command;
use super::selection::TextInput;
use super::{Model, View};
use crate::config::{ArborConfig, validate_worktree_dir};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStep {
    Welcome,
    WorktreeDir,
    Confirm,
    Saving,
    Done,
}

#[derive(Debug)]
pub struct InitState {
    pub step: InitStep,
    /// Settings other than the worktree directory are kept as loaded
    pub config: ArborConfig,
    pub input: TextInput,
    pub error: Option<String>,
    pub saved_to: Option<PathBuf>,
}

impl InitState {
    pub fn new(config: &ArborConfig) -> Self {
        Self {
            step: InitStep::Welcome,
            config: config.clone(),
            input: TextInput::with_value(config.worktree_dir.clone()),
            error: None,
            saved_to: None,
        }
    }

    /// Example path for the template being edited.
    pub fn preview(&self, model: &Model) -> String {
        let config = ArborConfig {
            worktree_dir: self.input.value().trim().to_string(),
            ..self.config.clone()
        };
        let root = &model.snapshot().repo_root;
        crate::path::format_path_for_display(&config.worktree_path_for(root, "feature/example"))
    }
}

pub(super) fn enter(model: &mut Model) {
    model.view = View::Init(InitState::new(&model.config.config));
}

pub(super) fn on_key(model: &mut Model, mut state: InitState, key: KeyEvent) -> (View, Vec<Command>) {
    match state.step {
        InitStep::Welcome => match key.code {
            KeyCode::Enter => state.step = InitStep::WorktreeDir,
            KeyCode::Esc | KeyCode::Char('q') => {
                if !model.config.initialized {
                    model.notice = Some("Setup skipped; press I to run it later".to_string());
                }
                return (View::Dashboard, Vec::new());
            }
            _ => {}
        },
        InitStep::WorktreeDir => match key.code {
            KeyCode::Enter => {
                let template = state.input.value().trim().to_string();
                match validate_worktree_dir(&template) {
                    Ok(()) => {
                        state.config.worktree_dir = template;
                        state.error = None;
                        state.step = InitStep::Confirm;
                    }
                    Err(e) => state.error = Some(e.to_string()),
                }
            }
            KeyCode::Esc => state.step = InitStep::Welcome,
            _ => {
                if state.input.handle_key(key) {
                    state.error = None;
                }
            }
        },
        InitStep::Confirm => match key.code {
            KeyCode::Enter | KeyCode::Char('y') => {
                state.step = InitStep::Saving;
                let mut commands = vec![Command::SaveConfig(state.config.clone())];
                commands.extend(model.spinner_tick());
                return (View::Init(state), commands);
            }
            KeyCode::Esc | KeyCode::Char('n') => state.step = InitStep::WorktreeDir,
            _ => {}
        },
        InitStep::Saving => {}
        InitStep::Done => return (View::Dashboard, Vec::new()),
    }
    (View::Init(state), Vec::new())
}

pub(super) fn on_saved(
    model: &mut Model,
    mut state: InitState,
    result: Result<PathBuf, String>,
) -> (View, Vec<Command>) {
    match result {
        Ok(path) => {
            model.config.config = state.config.clone();
            model.config.path = Some(path.clone());
            model.config.initialized = true;
            state.saved_to = Some(path);
            state.step = InitStep::Done;
        }
        Err(e) => {
            state.error = Some(format!("Could not save configuration: {e}"));
            state.step = InitStep::Confirm;
        }
    }
    (View::Init(state), Vec::new())
}
