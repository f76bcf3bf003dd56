//! Read-only view of the loaded configuration.

use crossterm::event::{KeyCode, KeyEvent};

use super::command::Command;
use super::{Model, View};
use crate::config::LoadedConfig;
use crate::path::format_path_for_display;

#[derive(Debug)]
pub struct ConfigState {
    pub loaded: LoadedConfig,
    pub loading: bool,
}

impl ConfigState {
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let config = &self.loaded.config;
        let file = match &self.loaded.path {
            Some(path) if self.loaded.initialized => format_path_for_display(path),
            Some(path) => format!("{} (not created)", format_path_for_display(path)),
            None => "(no config directory)".to_string(),
        };
        let ai = match &config.ai.command {
            Some(command) if config.ai.args.is_empty() => command.clone(),
            Some(command) => format!("{command} {}", config.ai.args.join(" ")),
            None => "(not set)".to_string(),
        };
        vec![
            ("file", file),
            ("worktree-dir", config.worktree_dir.clone()),
            (
                "post-create",
                config
                    .post_create
                    .clone()
                    .unwrap_or_else(|| "(not set)".to_string()),
            ),
            ("github", config.github.to_string()),
            ("ai", ai),
        ]
    }
}

pub(super) fn enter(model: &mut Model) {
    model.view = View::Config(ConfigState {
        loaded: model.config.clone(),
        loading: false,
    });
}

pub(super) fn on_key(model: &mut Model, mut state: ConfigState, key: KeyEvent) -> (View, Vec<Command>) {
    match key.code {
        KeyCode::Char('r') if !state.loading => {
            state.loading = true;
            let mut commands = vec![Command::LoadConfig];
            commands.extend(model.spinner_tick());
            (View::Config(state), commands)
        }
        KeyCode::Esc | KeyCode::Char('q') => (View::Dashboard, Vec::new()),
        _ => (View::Config(state), Vec::new()),
    }
}

pub(super) fn on_loaded(
    model: &mut Model,
    mut state: ConfigState,
    result: Result<LoadedConfig, String>,
) -> (View, Vec<Command>) {
    state.loading = false;
    match result {
        Ok(loaded) => {
            model.config = loaded.clone();
            state.loaded = loaded;
            model.notice = Some("Configuration reloaded".to_string());
        }
        Err(e) => model.last_error = Some(format!("Could not load configuration: {e}")),
    }
    (View::Config(state), Vec::new())
}
