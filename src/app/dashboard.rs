//! Keys on the worktree list, including the help and "open in" overlays.

use crossterm::event::{KeyCode, KeyEvent};

use super::command::Command;
use super::{Modal, Model, View};
use crate::actions::ActionKind;
use crate::directive::Directive;
use crate::github::Availability;

pub(super) fn on_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    if model.show_help {
        model.show_help = false;
        return Vec::new();
    }
    if model.modal.is_some() {
        return on_modal_key(model, key);
    }

    let len = model.snapshot().worktrees.len();
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            model.cursor = model.cursor.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if model.cursor + 1 < len {
                model.cursor += 1;
            }
        }
        KeyCode::Home => model.cursor = 0,
        KeyCode::End => model.cursor = len.saturating_sub(1),
        KeyCode::Enter => return switch(model),
        KeyCode::Char('?') => model.show_help = true,
        KeyCode::Char('q') | KeyCode::Esc => model.should_quit = true,
        KeyCode::Char('r') => {
            let mut commands = model.refresh();
            commands.extend(model.spinner_tick());
            return commands;
        }
        KeyCode::Char('n') if !model.reject_if_busy() => return super::create::enter(model),
        KeyCode::Char('d') if !model.reject_if_busy() => super::delete::enter_single(model),
        KeyCode::Char('D') if !model.reject_if_busy() => super::delete::enter_multi(model),
        KeyCode::Char('c') if !model.reject_if_busy() => return super::cleanup::enter(model),
        KeyCode::Char('m') if !model.reject_if_busy() => super::merge::enter(model),
        KeyCode::Char('s') if !model.reject_if_busy() => super::step_commit::enter(model),
        KeyCode::Char('C') => return super::compare::enter(model),
        KeyCode::Char('f') => super::for_each::enter(model),
        KeyCode::Char('t') => super::tools::enter(model),
        KeyCode::Char('g') => super::config_view::enter(model),
        KeyCode::Char('S') => super::settings::enter(model),
        KeyCode::Char('I') => super::init::enter(model),
        KeyCode::Char('o') => return open_in(model),
        KeyCode::Char('p') => return open_pull_request(model),
        _ => {}
    }
    Vec::new()
}

/// Write a `cd` directive for the selected worktree; the model quits once it lands.
fn switch(model: &mut Model) -> Vec<Command> {
    match model.selected_worktree() {
        Some(wt) => vec![Command::WriteDirective(Directive::cd(wt.path.clone()))],
        None => Vec::new(),
    }
}

/// Look up "open in" targets for the selected worktree.
pub(super) fn open_in(model: &mut Model) -> Vec<Command> {
    let Some(path) = model.selected_worktree().map(|wt| wt.path.clone()) else {
        return Vec::new();
    };
    model.modal = Some(Modal::Loading("Finding apps".to_string()));
    let mut commands = vec![Command::ResolveActions { path }];
    commands.extend(model.spinner_tick());
    commands
}

pub(super) fn open_pull_request(model: &mut Model) -> Vec<Command> {
    if model.github != Availability::Available {
        model.notice = Some("GitHub CLI is not available".to_string());
        return Vec::new();
    }
    let Some(wt) = model.selected_worktree() else {
        return Vec::new();
    };
    match wt.pr.as_ref().and(wt.branch.clone()) {
        Some(branch) => vec![Command::OpenPullRequest { branch }],
        None => {
            model.notice = Some("No pull request for this branch".to_string());
            Vec::new()
        }
    }
}

fn on_modal_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    let Some(Modal::OpenIn {
        path,
        actions,
        cursor,
    }) = &mut model.modal
    else {
        // Loading: only dismissal
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
            model.modal = None;
        }
        return Vec::new();
    };

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => *cursor = cursor.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => {
            if *cursor + 1 < actions.len() {
                *cursor += 1;
            }
        }
        KeyCode::Esc | KeyCode::Char('q') => model.modal = None,
        KeyCode::Enter => {
            let Some(action) = actions.get(*cursor).cloned() else {
                return Vec::new();
            };
            let path = path.clone();
            model.modal = None;
            // Terminal programs need this terminal, so they run after exit.
            if action.kind == ActionKind::Shell {
                return vec![Command::WriteDirective(Directive::cd_and_run(
                    path,
                    action.shell_line(),
                ))];
            }
            return vec![Command::ExecuteAction { action, path }];
        }
        _ => {}
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::super::tests::{ch, default_model, key, run};
    use super::super::{BusyOp, Msg};
    use super::*;
    use crate::actions::Action;
    use std::path::PathBuf;

    #[test]
    fn test_enter_writes_cd_directive() {
        let (_, commands) = run(default_model(), [key(KeyCode::Down), key(KeyCode::Enter)]);
        match &commands[..] {
            [Command::WriteDirective(directive)] => {
                assert_eq!(directive.render(), "cd /repo.worktrees/feature");
            }
            other => panic!("unexpected commands {other:?}"),
        }
    }

    #[test]
    fn test_cursor_clamps_at_ends() {
        let (model, _) = run(default_model(), [key(KeyCode::Up)]);
        assert_eq!(model.cursor, 0);
        let (model, _) = run(model, (0..10).map(|_| key(KeyCode::Down)));
        assert_eq!(model.cursor, 2);
    }

    #[test]
    fn test_destructive_keys_rejected_while_busy() {
        let mut model = default_model();
        model.busy = Some(BusyOp::Cleanup);
        for c in ['n', 'd', 'D', 'c', 'm', 's'] {
            let (next, commands) = run(model, [ch(c)]);
            assert!(matches!(next.view, View::Dashboard), "{c} left the dashboard");
            assert!(commands.is_empty());
            assert_eq!(
                next.notice.as_deref(),
                Some("Wait for the running cleanup to finish")
            );
            model = next;
        }
    }

    #[test]
    fn test_help_overlay_swallows_next_key() {
        let (model, _) = run(default_model(), [ch('?')]);
        assert!(model.show_help);
        let (model, _) = run(model, [ch('q')]);
        assert!(!model.show_help);
        assert!(!model.should_quit);
    }

    #[test]
    fn test_open_in_flow() {
        let (model, commands) = run(default_model(), [ch('o')]);
        assert!(matches!(model.modal, Some(Modal::Loading(_))));
        assert!(matches!(commands[0], Command::ResolveActions { .. }));

        let vim = Action {
            name: "vim".into(),
            command: "vim".into(),
            args: Vec::new(),
            kind: ActionKind::Shell,
            available: true,
        };
        let (model, _) = model.update(super::super::Event::Message(Msg::ActionsResolved {
            path: PathBuf::from("/repo"),
            actions: vec![vim],
        }));
        assert!(matches!(model.modal, Some(Modal::OpenIn { .. })));

        let (model, commands) = run(model, [key(KeyCode::Enter)]);
        assert!(model.modal.is_none());
        match &commands[..] {
            [Command::WriteDirective(directive)] => {
                assert_eq!(directive.render(), "cd /repo && vim .");
            }
            other => panic!("unexpected commands {other:?}"),
        }
    }

    #[test]
    fn test_dismissed_loading_ignores_late_actions() {
        let (model, _) = run(default_model(), [ch('o'), key(KeyCode::Esc)]);
        assert!(model.modal.is_none());
        let (model, _) = model.update(super::super::Event::Message(Msg::ActionsResolved {
            path: PathBuf::from("/repo"),
            actions: Vec::new(),
        }));
        assert!(model.modal.is_none());
        assert!(!model.should_quit);
    }

    #[test]
    fn test_pull_request_needs_github() {
        let (model, commands) = run(default_model(), [ch('p')]);
        assert!(commands.is_empty());
        assert_eq!(model.notice.as_deref(), Some("GitHub CLI is not available"));
    }
}
