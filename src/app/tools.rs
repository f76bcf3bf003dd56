//! Maintenance actions that don't need their own screen.

use crossterm::event::{KeyCode, KeyEvent};
use strum::IntoEnumIterator;

use super::command::Command;
use super::message::Msg;
use super::{BusyOp, Model, View};
use crate::github::Availability;
use crate::path::format_path_for_display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, strum::Display)]
pub enum ToolItem {
    #[strum(serialize = "Prune stale worktree metadata")]
    Prune,
    #[strum(serialize = "Open pull request in browser")]
    OpenPullRequest,
    #[strum(serialize = "Open selected worktree in…")]
    OpenIn,
    #[strum(serialize = "Refresh GitHub status")]
    RefreshGitHub,
}

#[derive(Debug, Default)]
pub struct ToolsState {
    pub cursor: usize,
    pub running: Option<ToolItem>,
    pub result: Option<Vec<String>>,
}

impl ToolsState {
    pub(super) fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn selected(&self) -> Option<ToolItem> {
        ToolItem::iter().nth(self.cursor)
    }
}

pub(super) fn enter(model: &mut Model) {
    model.view = View::Tools(ToolsState::default());
}

pub(super) fn on_key(model: &mut Model, mut state: ToolsState, key: KeyEvent) -> (View, Vec<Command>) {
    if state.is_running() {
        return (View::Tools(state), Vec::new());
    }
    if state.result.is_some() {
        state.result = None;
        return (View::Tools(state), Vec::new());
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => state.cursor = state.cursor.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => {
            state.cursor = (state.cursor + 1).min(ToolItem::iter().count() - 1);
        }
        KeyCode::Enter => {
            if let Some(item) = state.selected() {
                return run(model, state, item);
            }
        }
        KeyCode::Esc | KeyCode::Char('q') => return (View::Dashboard, Vec::new()),
        _ => {}
    }
    (View::Tools(state), Vec::new())
}

fn run(model: &mut Model, mut state: ToolsState, item: ToolItem) -> (View, Vec<Command>) {
    match item {
        ToolItem::Prune => {
            if model.reject_if_busy() {
                return (View::Tools(state), Vec::new());
            }
            state.running = Some(item);
            let commands = model.start(BusyOp::Prune, Command::PruneWorktrees);
            (View::Tools(state), commands)
        }
        ToolItem::OpenPullRequest => {
            let commands = super::dashboard::open_pull_request(model);
            if !commands.is_empty() {
                state.running = Some(item);
            }
            (View::Tools(state), commands)
        }
        ToolItem::OpenIn => {
            let commands = super::dashboard::open_in(model);
            (View::Dashboard, commands)
        }
        ToolItem::RefreshGitHub => {
            if !model.settings.github {
                model.notice = Some("GitHub status is turned off in settings".to_string());
                return (View::Tools(state), Vec::new());
            }
            model.github = Availability::Unchecked;
            let mut commands = model.refresh();
            commands.push(Command::CheckGitHub);
            commands.extend(model.spinner_tick());
            (View::Dashboard, commands)
        }
    }
}

pub(super) fn on_message(model: &mut Model, mut state: ToolsState, msg: Msg) -> (View, Vec<Command>) {
    state.running = None;
    let mut commands = Vec::new();
    let lines = match msg {
        Msg::WorktreesPruned(result) => {
            model.busy = None;
            commands = model.refresh();
            match result {
                Ok(pruned) if pruned.is_empty() => vec!["Nothing to prune".to_string()],
                Ok(pruned) => {
                    let mut lines = vec![format!(
                        "Pruned {} stale worktree entr{}",
                        pruned.len(),
                        if pruned.len() == 1 { "y" } else { "ies" }
                    )];
                    lines.extend(
                        pruned
                            .iter()
                            .map(|path| format!("  {}", format_path_for_display(path))),
                    );
                    lines
                }
                Err(e) => vec![format!("Prune failed: {e}")],
            }
        }
        Msg::PullRequestOpened(Ok(())) => vec!["Opened pull request in browser".to_string()],
        Msg::PullRequestOpened(Err(e)) => vec![format!("Could not open pull request: {e}")],
        other => {
            log::debug!("Tools ignoring {other:?}");
            return (View::Tools(state), commands);
        }
    };
    state.result = Some(lines);
    (View::Tools(state), commands)
}
