//! Stage everything in the selected worktree and commit it.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::command::Command;
use super::message::Msg;
use super::selection::TextInput;
use super::{BusyOp, Model, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStep {
    Message,
    Generating,
    Committing,
    Complete,
}

#[derive(Debug)]
pub struct StepCommitState {
    pub step: CommitStep,
    pub path: PathBuf,
    pub label: String,
    /// Subject line
    pub input: TextInput,
    /// Body of a generated message, appended on commit
    pub body: Option<String>,
    /// Shown under the input; the input stays editable
    pub error: Option<String>,
    pub summary: Option<String>,
}

impl StepCommitState {
    pub(super) fn is_waiting(&self) -> bool {
        matches!(self.step, CommitStep::Generating | CommitStep::Committing)
    }

    /// Full commit message: subject plus any generated body.
    pub fn message(&self) -> String {
        let subject = self.input.value().trim();
        match self.body.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
            Some(body) => format!("{subject}\n\n{body}"),
            None => subject.to_string(),
        }
    }

    fn set_generated(&mut self, message: &str) {
        let message = message.trim();
        let (subject, body) = match message.split_once('\n') {
            Some((subject, body)) => (subject.trim(), Some(body.trim().to_string())),
            None => (message, None),
        };
        self.input.set(subject);
        self.body = body.filter(|b| !b.is_empty());
    }
}

pub(super) fn enter(model: &mut Model) {
    let Some(wt) = model.selected_worktree() else {
        return;
    };
    if wt.is_clean() {
        model.notice = Some(format!("Nothing to commit in {}", wt.label()));
        return;
    }
    let state = StepCommitState {
        step: CommitStep::Message,
        path: wt.path.clone(),
        label: wt.label().to_string(),
        input: TextInput::default(),
        body: None,
        error: None,
        summary: None,
    };
    model.view = View::StepCommit(state);
}

pub(super) fn on_key(model: &mut Model, mut state: StepCommitState, key: KeyEvent) -> (View, Vec<Command>) {
    match state.step {
        CommitStep::Message => {
            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('g') {
                state.error = None;
                state.step = CommitStep::Generating;
                let mut commands = vec![Command::GenerateCommitMessage {
                    path: state.path.clone(),
                    ai: model.config.config.ai.clone(),
                }];
                commands.extend(model.spinner_tick());
                return (View::StepCommit(state), commands);
            }
            match key.code {
                KeyCode::Enter => {
                    if state.input.value().trim().is_empty() {
                        state.error = Some("Commit message cannot be empty".to_string());
                        return (View::StepCommit(state), Vec::new());
                    }
                    if model.reject_if_busy() {
                        return (View::StepCommit(state), Vec::new());
                    }
                    state.error = None;
                    state.step = CommitStep::Committing;
                    let commands = model.start(
                        BusyOp::Commit,
                        Command::Commit {
                            path: state.path.clone(),
                            message: state.message(),
                        },
                    );
                    return (View::StepCommit(state), commands);
                }
                KeyCode::Esc => return (View::Dashboard, Vec::new()),
                _ => {
                    if state.input.handle_key(key) {
                        state.error = None;
                    }
                }
            }
        }
        CommitStep::Generating => {
            // Stop waiting; the late message is dropped with the view
            if key.code == KeyCode::Esc {
                state.step = CommitStep::Message;
            }
        }
        CommitStep::Committing => {}
        CommitStep::Complete => return (View::Dashboard, Vec::new()),
    }
    (View::StepCommit(state), Vec::new())
}

pub(super) fn on_message(model: &mut Model, mut state: StepCommitState, msg: Msg) -> (View, Vec<Command>) {
    match msg {
        Msg::CommitMessageGenerated(result) => {
            if state.step != CommitStep::Generating {
                log::debug!("Dropping generated commit message; no longer waiting");
                return (View::StepCommit(state), Vec::new());
            }
            state.step = CommitStep::Message;
            match result {
                Ok(message) => state.set_generated(&message),
                Err(e) => state.error = Some(format!("Could not generate a message: {e}")),
            }
            (View::StepCommit(state), Vec::new())
        }
        Msg::Committed(result) => {
            model.busy = None;
            let commands = model.refresh();
            match result {
                Ok(summary) => {
                    state.summary = Some(summary);
                    state.step = CommitStep::Complete;
                }
                Err(e) => {
                    state.error = Some(e);
                    state.step = CommitStep::Message;
                }
            }
            (View::StepCommit(state), commands)
        }
        other => {
            log::debug!("Commit ignoring {other:?}");
            (View::StepCommit(state), Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{ch, has_refresh, key, main_worktree, model_with, run};
    use super::super::Event;
    use super::*;
    use crate::registry::tests::worktree;

    fn dirty_model() -> Model {
        let mut feature = worktree("feature");
        feature.modified = 2;
        model_with(vec![main_worktree(), feature])
    }

    fn commit_state(model: &Model) -> &StepCommitState {
        match &model.view {
            View::StepCommit(state) => state,
            other => panic!("expected commit view, got {other:?}"),
        }
    }

    fn ctrl(c: char) -> Event {
        Event::Input(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    #[test]
    fn test_clean_worktree_has_nothing_to_commit() {
        let (model, _) = run(dirty_model(), [ch('s')]);
        assert!(matches!(model.view, View::Dashboard));
        assert_eq!(model.notice.as_deref(), Some("Nothing to commit in main"));
    }

    #[test]
    fn test_manual_message_commits() {
        let mut events = vec![key(KeyCode::Down), ch('s')];
        events.extend("Fix login".chars().map(ch));
        events.push(key(KeyCode::Enter));
        let (model, commands) = run(dirty_model(), events);

        assert_eq!(model.busy, Some(BusyOp::Commit));
        match &commands[0] {
            Command::Commit { path, message } => {
                assert_eq!(path, &PathBuf::from("/repo.worktrees/feature"));
                assert_eq!(message, "Fix login");
            }
            other => panic!("unexpected command {other:?}"),
        }

        let (model, commands) =
            model.update(Event::Message(Msg::Committed(Ok("abc1234 Fix login".into()))));
        assert!(has_refresh(&commands));
        assert!(model.busy.is_none());
        let state = commit_state(&model);
        assert_eq!(state.step, CommitStep::Complete);
        assert_eq!(state.summary.as_deref(), Some("abc1234 Fix login"));
    }

    #[test]
    fn test_empty_message_is_rejected() {
        let (model, commands) = run(
            dirty_model(),
            [key(KeyCode::Down), ch('s'), ch(' '), key(KeyCode::Enter)],
        );
        assert!(commands.is_empty());
        let state = commit_state(&model);
        assert_eq!(state.step, CommitStep::Message);
        assert_eq!(state.error.as_deref(), Some("Commit message cannot be empty"));
    }

    #[test]
    fn test_generated_message_fills_subject_and_body() {
        let (model, commands) = run(dirty_model(), [key(KeyCode::Down), ch('s'), ctrl('g')]);
        assert!(matches!(commands[0], Command::GenerateCommitMessage { .. }));
        assert_eq!(commit_state(&model).step, CommitStep::Generating);

        let (model, _) = model.update(Event::Message(Msg::CommitMessageGenerated(Ok(
            "Add login form\n\nValidates email before submit.\n".into(),
        ))));
        let state = commit_state(&model);
        assert_eq!(state.step, CommitStep::Message);
        assert_eq!(state.input.value(), "Add login form");
        assert_eq!(
            state.message(),
            "Add login form\n\nValidates email before submit."
        );
    }

    #[test]
    fn test_generation_failure_keeps_input_editable() {
        let (model, _) = run(
            dirty_model(),
            [key(KeyCode::Down), ch('s'), ch('W'), ctrl('g')],
        );
        let (model, _) = model.update(Event::Message(Msg::CommitMessageGenerated(Err(
            "no AI command configured".into(),
        ))));
        let state = commit_state(&model);
        assert_eq!(state.step, CommitStep::Message);
        assert_eq!(
            state.error.as_deref(),
            Some("Could not generate a message: no AI command configured")
        );
        assert_eq!(state.input.value(), "W");

        let (model, _) = run(model, [ch('i')]);
        let state = commit_state(&model);
        assert_eq!(state.input.value(), "Wi");
        assert!(state.error.is_none());
    }

    #[test]
    fn test_commit_failure_returns_to_input() {
        let (model, _) = run(
            dirty_model(),
            [key(KeyCode::Down), ch('s'), ch('x'), key(KeyCode::Enter)],
        );
        let (model, commands) = model.update(Event::Message(Msg::Committed(Err(
            "pre-commit hook failed".into(),
        ))));
        assert!(has_refresh(&commands));
        let state = commit_state(&model);
        assert_eq!(state.step, CommitStep::Message);
        assert_eq!(state.error.as_deref(), Some("pre-commit hook failed"));
    }
}
