//! Session toggles. Changes take effect when the view is closed.

use crossterm::event::{KeyCode, KeyEvent};
use strum::IntoEnumIterator;

use super::command::Command;
use super::{Model, Settings, View};
use crate::github::Availability;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, strum::Display)]
pub enum SettingItem {
    #[strum(serialize = "GitHub pull request status")]
    GitHub,
    #[strum(serialize = "CI status")]
    Ci,
    #[strum(serialize = "Refresh every 30 seconds")]
    AutoRefresh,
}

#[derive(Debug)]
pub struct SettingsState {
    pub github: bool,
    pub ci: bool,
    pub auto_refresh: bool,
    pub cursor: usize,
}

impl SettingsState {
    pub fn value(&self, item: SettingItem) -> bool {
        match item {
            SettingItem::GitHub => self.github,
            SettingItem::Ci => self.ci,
            SettingItem::AutoRefresh => self.auto_refresh,
        }
    }

    fn toggle(&mut self) {
        match SettingItem::iter().nth(self.cursor) {
            Some(SettingItem::GitHub) => self.github = !self.github,
            Some(SettingItem::Ci) => self.ci = !self.ci,
            Some(SettingItem::AutoRefresh) => self.auto_refresh = !self.auto_refresh,
            None => {}
        }
    }
}

pub(super) fn enter(model: &mut Model) {
    let Settings {
        github,
        ci,
        auto_refresh,
    } = model.settings;
    model.view = View::Settings(SettingsState {
        github,
        ci,
        auto_refresh,
        cursor: 0,
    });
}

pub(super) fn on_key(model: &mut Model, mut state: SettingsState, key: KeyEvent) -> (View, Vec<Command>) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => state.cursor = state.cursor.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => {
            state.cursor = (state.cursor + 1).min(SettingItem::iter().count() - 1);
        }
        KeyCode::Char(' ') | KeyCode::Enter => state.toggle(),
        KeyCode::Esc | KeyCode::Char('q') => return (View::Dashboard, apply(model, &state)),
        _ => {}
    }
    (View::Settings(state), Vec::new())
}

fn apply(model: &mut Model, state: &SettingsState) -> Vec<Command> {
    let previous = model.settings;
    model.settings = Settings {
        github: state.github,
        ci: state.ci,
        auto_refresh: state.auto_refresh,
    };
    log::debug!("Settings changed from {previous:?} to {:?}", model.settings);

    let mut commands = Vec::new();
    if state.github && !previous.github {
        if model.github != Availability::Available {
            model.github = Availability::Unchecked;
            commands.push(Command::CheckGitHub);
        }
        commands.extend(model.refresh());
        commands.extend(model.spinner_tick());
    } else if state.github && state.ci && !previous.ci {
        commands.extend(model.enrich());
    }
    if state.auto_refresh && !previous.auto_refresh {
        commands.extend(model.auto_refresh_tick());
    }
    commands
}
