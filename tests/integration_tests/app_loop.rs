//! The model driven by the real dispatcher against a real repository.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arbor::actions::SystemActionResolver;
use arbor::app::create::CreateStep;
use arbor::app::delete::DeleteStep;
use arbor::app::{Dispatcher, Event, Model, Services, View};
use arbor::config::{ArborConfig, LoadedConfig};
use arbor::directive::DirectiveWriter;
use arbor::git::Repository;
use arbor::github::GhCli;
use crossbeam_channel::Receiver;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rstest::rstest;

use crate::common::{TestRepo, repo};

struct Harness {
    model: Option<Model>,
    dispatcher: Dispatcher,
    rx: Receiver<Event>,
}

impl Harness {
    fn start(repo: &TestRepo) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let services = Services {
            git: Arc::new(Repository::at(repo.root_path())),
            github: Arc::new(GhCli::disabled(repo.root_path())),
            actions: Arc::new(SystemActionResolver),
            directives: DirectiveWriter::new(None),
            config_path: None,
        };
        let dispatcher = Dispatcher::new(services, tx);
        let config = LoadedConfig {
            config: ArborConfig::default(),
            path: None,
            initialized: true,
        };
        let mut model = Model::new(config, false);
        dispatcher.dispatch_all(model.init());

        let mut harness = Self {
            model: Some(model),
            dispatcher,
            rx,
        };
        harness.wait_until(|model| !model.snapshot().worktrees.is_empty());
        harness
    }

    fn model(&self) -> &Model {
        self.model.as_ref().unwrap()
    }

    fn apply(&mut self, event: Event) {
        let (model, commands) = self.model.take().unwrap().update(event);
        self.model = Some(model);
        self.dispatcher.dispatch_all(commands);
    }

    fn press(&mut self, code: KeyCode) {
        self.apply(Event::Input(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.press(KeyCode::Char(c));
        }
    }

    /// Feed completions to the model until `done` holds.
    fn wait_until(&mut self, done: impl Fn(&Model) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(30);
        while !done(self.model()) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = self
                .rx
                .recv_timeout(remaining)
                .unwrap_or_else(|_| panic!("timed out; model is {:?}", self.model().view));
            self.apply(event);
        }
    }
}

#[rstest]
fn test_startup_loads_repository(repo: TestRepo) {
    repo.add_worktree("feature/auth");
    let harness = Harness::start(&repo);

    let model = harness.model();
    assert!(model.fatal.is_none());
    assert_eq!(model.snapshot().worktrees.len(), 2);
    assert_eq!(model.snapshot().default_branch, "main");
    // Cursor starts on the worktree arbor was launched from
    assert!(model.selected_worktree().unwrap().is_main);
}

#[rstest]
fn test_create_flow_shows_new_worktree(repo: TestRepo) {
    let mut harness = Harness::start(&repo);

    harness.press(KeyCode::Char('n'));
    harness.wait_until(|model| {
        matches!(&model.view, View::Create(state) if state.branches.is_some())
    });
    harness.press(KeyCode::Enter);
    harness.type_text("feature/new");
    harness.press(KeyCode::Enter);
    harness.press(KeyCode::Enter);
    harness.press(KeyCode::Enter);

    harness.wait_until(|model| {
        matches!(&model.view, View::Create(state) if state.step == CreateStep::Complete)
            && model.snapshot().find_branch("feature/new").is_some()
    });
    let created = harness.model().snapshot().find_branch("feature/new").unwrap();
    assert_eq!(created.path, repo.worktree_path("feature/new"));
    assert!(created.path.exists());
    assert!(harness.model().busy.is_none());
}

#[rstest]
fn test_delete_flow_removes_worktree(repo: TestRepo) {
    let feature = repo.add_worktree("feature/old");
    let mut harness = Harness::start(&repo);

    harness.press(KeyCode::Down);
    assert_eq!(
        harness.model().selected_worktree().unwrap().branch.as_deref(),
        Some("feature/old")
    );
    harness.press(KeyCode::Char('d'));
    harness.press(KeyCode::Char('y'));

    harness.wait_until(|model| {
        matches!(&model.view, View::Delete(state) if state.step == DeleteStep::Complete)
            && model.snapshot().find_branch("feature/old").is_none()
    });
    assert!(!feature.exists());
    assert_eq!(harness.model().snapshot().worktrees.len(), 1);
}

#[rstest]
fn test_dirty_delete_reports_reason(repo: TestRepo) {
    let feature = repo.add_worktree("feature/wip");
    std::fs::write(feature.join("draft.txt"), "unsaved").unwrap();
    let mut harness = Harness::start(&repo);

    harness.press(KeyCode::Down);
    harness.press(KeyCode::Char('d'));
    harness.press(KeyCode::Char('y'));

    harness.wait_until(|model| matches!(model.view, View::Dashboard) && model.busy.is_none());
    assert!(feature.exists());
    assert!(harness.model().snapshot().find_branch("feature/wip").is_some());
    let error = harness.model().last_error.clone().unwrap_or_default();
    assert!(error.contains("has uncommitted changes"), "{error}");
}
