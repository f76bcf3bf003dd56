//! New worktree flow: pick new or existing branch, name it, choose a base,
//! confirm, create.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent};

use super::command::Command;
use super::message::Msg;
use super::selection::{ListPicker, TextInput};
use super::{BusyOp, Model, View};
use crate::directive::Directive;
use crate::git::{BranchInfo, CreateOutcome, CreateRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStep {
    BranchMode,
    BranchName,
    ExistingBranch,
    BaseBranch,
    Confirm,
    Creating,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    NewBranch,
    ExistingBranch,
}

#[derive(Debug)]
pub struct CreateState {
    pub step: CreateStep,
    pub mode: CreateMode,
    /// `None` until the branch list arrives
    pub branches: Option<Vec<BranchInfo>>,
    /// Branch of the worktree selected when the flow opened
    pub suggested_base: Option<String>,
    pub name_input: TextInput,
    pub name_error: Option<String>,
    pub picker: Option<ListPicker>,
    pub branch_name: String,
    pub base_branch: Option<String>,
    /// Base branch with local changes awaiting an explicit `y`
    pub dirty_warning: Option<String>,
    pub path: PathBuf,
    pub outcome: Option<CreateOutcome>,
}

impl CreateState {
    fn new(suggested_base: Option<String>) -> Self {
        Self {
            step: CreateStep::BranchMode,
            mode: CreateMode::NewBranch,
            branches: None,
            suggested_base,
            name_input: TextInput::default(),
            name_error: None,
            picker: None,
            branch_name: String::new(),
            base_branch: None,
            dirty_warning: None,
            path: PathBuf::new(),
            outcome: None,
        }
    }

    pub(super) fn is_waiting(&self) -> bool {
        self.step == CreateStep::Creating || self.branches.is_none()
    }

    fn branch(&self, name: &str) -> Option<&BranchInfo> {
        self.branches
            .as_deref()
            .and_then(|branches| branches.iter().find(|b| b.name == name))
    }
}

/// Pick the base branch to offer first.
///
/// The suggestion wins if it still exists; then the checked-out branch,
/// then `main` or `master`, then whatever comes first.
pub fn resolve_base(branches: &[BranchInfo], suggested: Option<&str>) -> Option<String> {
    let exists = |name: &str| branches.iter().any(|b| b.name == name);
    suggested
        .filter(|name| exists(name))
        .map(str::to_string)
        .or_else(|| {
            branches
                .iter()
                .find(|b| b.is_current)
                .map(|b| b.name.clone())
        })
        .or_else(|| {
            ["main", "master"]
                .into_iter()
                .find(|name| exists(name))
                .map(str::to_string)
        })
        .or_else(|| branches.first().map(|b| b.name.clone()))
}

/// Check a new branch name.
///
/// This is a practical subset of `git check-ref-format`; git has the final say.
pub fn validate_branch_name(name: &str, branches: &[BranchInfo]) -> Result<(), String> {
    if name.is_empty() {
        return Err("Branch name cannot be empty".to_string());
    }
    if name.chars().any(char::is_whitespace) {
        return Err("Branch name cannot contain spaces".to_string());
    }
    if name.contains("..") {
        return Err("Branch name cannot contain '..'".to_string());
    }
    if name.starts_with('-') {
        return Err("Branch name cannot start with '-'".to_string());
    }
    if name.ends_with('/') || name.ends_with(".lock") {
        return Err("Branch name cannot end with '/' or '.lock'".to_string());
    }
    if branches.iter().any(|b| b.name == name) {
        return Err(format!("Branch {name} already exists"));
    }
    Ok(())
}

pub(super) fn enter(model: &mut Model) -> Vec<Command> {
    let suggested = model.selected_worktree().and_then(|wt| wt.branch.clone());
    model.view = View::Create(CreateState::new(suggested));
    let mut commands = vec![Command::LoadBranches];
    commands.extend(model.spinner_tick());
    commands
}

pub(super) fn on_key(model: &mut Model, mut state: CreateState, key: KeyEvent) -> (View, Vec<Command>) {
    let window = model.list_window();
    match state.step {
        CreateStep::BranchMode => match key.code {
            KeyCode::Up | KeyCode::Down | KeyCode::Char('k') | KeyCode::Char('j') | KeyCode::Tab => {
                state.mode = match state.mode {
                    CreateMode::NewBranch => CreateMode::ExistingBranch,
                    CreateMode::ExistingBranch => CreateMode::NewBranch,
                };
            }
            KeyCode::Enter => match (state.mode, state.branches.as_deref()) {
                (_, None) => model.notice = Some("Still loading branches".to_string()),
                (CreateMode::NewBranch, Some(_)) => state.step = CreateStep::BranchName,
                (CreateMode::ExistingBranch, Some(branches)) => {
                    let free: Vec<String> = branches
                        .iter()
                        .filter(|b| b.worktree_path.is_none())
                        .map(|b| b.name.clone())
                        .collect();
                    if free.is_empty() {
                        model.notice = Some("Every branch already has a worktree".to_string());
                    } else {
                        state.picker = Some(ListPicker::new(free, None, window));
                        state.step = CreateStep::ExistingBranch;
                    }
                }
            },
            KeyCode::Esc | KeyCode::Char('q') => return (View::Dashboard, Vec::new()),
            _ => {}
        },
        CreateStep::BranchName => match key.code {
            KeyCode::Enter => {
                let name = state.name_input.value().trim().to_string();
                let branches = state.branches.as_deref().unwrap_or_default();
                match validate_branch_name(&name, branches) {
                    Ok(()) => {
                        let names = branches.iter().map(|b| b.name.clone()).collect();
                        let preferred = resolve_base(branches, state.suggested_base.as_deref());
                        state.picker = Some(ListPicker::new(names, preferred.as_deref(), window));
                        state.branch_name = name;
                        state.name_error = None;
                        state.dirty_warning = None;
                        state.step = CreateStep::BaseBranch;
                    }
                    Err(e) => state.name_error = Some(e),
                }
            }
            KeyCode::Esc => state.step = CreateStep::BranchMode,
            _ => {
                if state.name_input.handle_key(key) {
                    state.name_error = None;
                }
            }
        },
        CreateStep::ExistingBranch => match key.code {
            KeyCode::Enter => {
                if let Some(branch) = state.picker.as_ref().and_then(|p| p.selected_item()) {
                    state.branch_name = branch.to_string();
                    state.base_branch = None;
                    state.path = target_path(model, &state.branch_name);
                    state.step = CreateStep::Confirm;
                }
            }
            KeyCode::Esc => state.step = CreateStep::BranchMode,
            _ => {
                if let Some(picker) = &mut state.picker {
                    picker.handle_key(key);
                }
            }
        },
        CreateStep::BaseBranch => on_base_key(model, &mut state, key),
        CreateStep::Confirm => match key.code {
            KeyCode::Enter | KeyCode::Char('y') => {
                let request = CreateRequest {
                    branch: state.branch_name.clone(),
                    base: state.base_branch.clone(),
                    new_branch: state.mode == CreateMode::NewBranch,
                    path: state.path.clone(),
                };
                state.step = CreateStep::Creating;
                let post_create = model.config.config.post_create.clone();
                let commands = model.start(
                    BusyOp::Create,
                    Command::CreateWorktree {
                        request,
                        post_create,
                    },
                );
                return (View::Create(state), commands);
            }
            KeyCode::Esc | KeyCode::Char('n') => {
                state.step = match state.mode {
                    CreateMode::NewBranch => CreateStep::BaseBranch,
                    CreateMode::ExistingBranch => CreateStep::ExistingBranch,
                };
            }
            _ => {}
        },
        CreateStep::Creating => {}
        CreateStep::Complete => match key.code {
            KeyCode::Char('s') => {
                if let Some(outcome) = &state.outcome {
                    let directive = Directive::cd(outcome.path.clone());
                    return (View::Create(state), vec![Command::WriteDirective(directive)]);
                }
            }
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') => {
                return (View::Dashboard, Vec::new());
            }
            _ => {}
        },
    }
    (View::Create(state), Vec::new())
}

fn on_base_key(model: &mut Model, state: &mut CreateState, key: KeyEvent) {
    if state.dirty_warning.is_some() && key.code == KeyCode::Char('y') {
        state.base_branch = state.dirty_warning.take();
        state.path = target_path(model, &state.branch_name);
        state.step = CreateStep::Confirm;
        return;
    }

    match key.code {
        KeyCode::Enter => {
            let Some(base) = state
                .picker
                .as_ref()
                .and_then(|p| p.selected_item())
                .map(str::to_string)
            else {
                return;
            };
            let dirty = state.branch(&base).is_some_and(|b| !b.is_clean);
            if dirty {
                // Selecting it again without `y` keeps the warning up.
                state.dirty_warning = Some(base);
                return;
            }
            state.base_branch = Some(base);
            state.path = target_path(model, &state.branch_name);
            state.step = CreateStep::Confirm;
        }
        KeyCode::Esc => {
            state.dirty_warning = None;
            state.step = CreateStep::BranchName;
        }
        _ => {
            let Some(picker) = &mut state.picker else {
                return;
            };
            let before = picker.selected_item().map(str::to_string);
            picker.handle_key(key);
            if picker.selected_item().map(str::to_string) != before {
                state.dirty_warning = None;
            }
        }
    }
}

fn target_path(model: &Model, branch: &str) -> PathBuf {
    model
        .config
        .config
        .worktree_path_for(&model.snapshot().repo_root, branch)
}

pub(super) fn on_message(model: &mut Model, mut state: CreateState, msg: Msg) -> (View, Vec<Command>) {
    match msg {
        Msg::BranchesLoaded(Ok(branches)) => {
            state.branches = Some(branches);
            (View::Create(state), Vec::new())
        }
        Msg::BranchesLoaded(Err(e)) => {
            model.last_error = Some(format!("Cannot list branches: {e}"));
            (View::Dashboard, Vec::new())
        }
        Msg::WorktreeCreated(result) => {
            model.busy = None;
            let commands = model.refresh();
            match result {
                Ok(outcome) => {
                    state.outcome = Some(outcome);
                    state.step = CreateStep::Complete;
                    (View::Create(state), commands)
                }
                Err(e) => {
                    model.last_error = Some(e);
                    (View::Dashboard, commands)
                }
            }
        }
        other => {
            log::debug!("Create ignoring {other:?}");
            (View::Create(state), Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{ch, default_model, has_refresh, key, run};
    use super::super::Event;
    use super::*;
    use rstest::rstest;

    fn branch(name: &str, is_clean: bool, is_current: bool) -> BranchInfo {
        BranchInfo {
            name: name.to_string(),
            worktree_path: None,
            is_clean,
            is_current,
        }
    }

    fn branches() -> Vec<BranchInfo> {
        vec![
            branch("develop", true, false),
            branch("main", true, true),
            branch("wip", false, false),
        ]
    }

    #[rstest]
    #[case::suggestion_exists(Some("develop"), "develop")]
    #[case::suggestion_gone(Some("deleted"), "main")]
    #[case::no_suggestion(None, "main")]
    fn test_resolve_base(#[case] suggested: Option<&str>, #[case] expected: &str) {
        assert_eq!(resolve_base(&branches(), suggested).as_deref(), Some(expected));
    }

    #[test]
    fn test_resolve_base_fallback_order() {
        let without_current = vec![branch("alpha", true, false), branch("master", true, false)];
        assert_eq!(resolve_base(&without_current, None).as_deref(), Some("master"));

        let only_other = vec![branch("alpha", true, false), branch("beta", true, false)];
        assert_eq!(resolve_base(&only_other, Some("zeta")).as_deref(), Some("alpha"));

        assert_eq!(resolve_base(&[], Some("main")), None);
    }

    #[rstest]
    #[case::ok("feature/login", true)]
    #[case::empty("", false)]
    #[case::space("my branch", false)]
    #[case::dots("a..b", false)]
    #[case::dash("-x", false)]
    #[case::slash("feature/", false)]
    #[case::lock("x.lock", false)]
    #[case::exists("develop", false)]
    fn test_validate_branch_name(#[case] name: &str, #[case] ok: bool) {
        assert_eq!(validate_branch_name(name, &branches()).is_ok(), ok);
    }

    fn loaded(events: impl IntoIterator<Item = Event>) -> (Model, Vec<Command>) {
        let (model, commands) = run(default_model(), [ch('n')]);
        assert!(matches!(commands[0], Command::LoadBranches));
        let (model, _) = model.update(Event::Message(Msg::BranchesLoaded(Ok(branches()))));
        run(model, events)
    }

    fn typed(name: &str) -> Vec<Event> {
        name.chars().map(ch).collect()
    }

    fn create_state(model: &Model) -> &CreateState {
        match &model.view {
            View::Create(state) => state,
            other => panic!("expected create view, got {other:?}"),
        }
    }

    #[test]
    fn test_new_branch_flow_creates_at_configured_path() {
        let mut events = vec![key(KeyCode::Enter)];
        events.extend(typed("feature/x"));
        events.push(key(KeyCode::Enter));
        let (model, _) = loaded(events);
        let state = create_state(&model);
        assert_eq!(state.step, CreateStep::BaseBranch);
        // Suggested base was "main" (selected worktree), still present
        assert_eq!(state.picker.as_ref().unwrap().selected_item(), Some("main"));

        let (model, commands) = run(model, [key(KeyCode::Enter), key(KeyCode::Enter)]);
        assert_eq!(model.busy, Some(BusyOp::Create));
        match &commands[0] {
            Command::CreateWorktree { request, .. } => {
                assert_eq!(request.branch, "feature/x");
                assert_eq!(request.base.as_deref(), Some("main"));
                assert!(request.new_branch);
                assert_eq!(request.path, PathBuf::from("/repo.worktrees/feature-x"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_invalid_name_stays_on_step() {
        let mut events = vec![key(KeyCode::Enter)];
        events.extend(typed("a..b"));
        events.push(key(KeyCode::Enter));
        let (model, _) = loaded(events);
        let state = create_state(&model);
        assert_eq!(state.step, CreateStep::BranchName);
        assert_eq!(state.name_error.as_deref(), Some("Branch name cannot contain '..'"));
    }

    #[test]
    fn test_dirty_base_needs_explicit_accept() {
        let mut events = vec![key(KeyCode::Enter)];
        events.extend(typed("x"));
        events.push(key(KeyCode::Enter));
        // main -> wip
        events.push(key(KeyCode::Down));
        events.push(key(KeyCode::Enter));
        let (model, _) = loaded(events);
        let state = create_state(&model);
        assert_eq!(state.step, CreateStep::BaseBranch);
        assert_eq!(state.dirty_warning.as_deref(), Some("wip"));

        // Selecting the same branch again does not advance
        let (model, _) = run(model, [key(KeyCode::Enter)]);
        assert_eq!(create_state(&model).step, CreateStep::BaseBranch);

        let (model, _) = run(model, [ch('y')]);
        let state = create_state(&model);
        assert_eq!(state.step, CreateStep::Confirm);
        assert_eq!(state.base_branch.as_deref(), Some("wip"));
    }

    #[test]
    fn test_moving_clears_dirty_warning() {
        let mut events = vec![key(KeyCode::Enter)];
        events.extend(typed("x"));
        events.extend([
            key(KeyCode::Enter),
            key(KeyCode::Down),
            key(KeyCode::Enter),
            key(KeyCode::Up),
        ]);
        let (model, _) = loaded(events);
        assert_eq!(create_state(&model).dirty_warning, None);
    }

    #[test]
    fn test_existing_branch_lists_only_free_branches() {
        let (model, _) = run(default_model(), [ch('n')]);
        let mut taken = branch("main", true, true);
        taken.worktree_path = Some(PathBuf::from("/repo"));
        let (model, _) = model.update(Event::Message(Msg::BranchesLoaded(Ok(vec![
            taken,
            branch("old", true, false),
        ]))));
        let (model, _) = run(model, [key(KeyCode::Down), key(KeyCode::Enter)]);
        let state = create_state(&model);
        assert_eq!(state.step, CreateStep::ExistingBranch);
        assert_eq!(state.picker.as_ref().unwrap().visible_len(), 1);

        let (model, commands) = run(model, [key(KeyCode::Enter), ch('y')]);
        match &commands[0] {
            Command::CreateWorktree { request, .. } => {
                assert_eq!(request.branch, "old");
                assert!(!request.new_branch);
                assert_eq!(request.base, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(create_state(&model).step, CreateStep::Creating);
    }

    #[test]
    fn test_failure_returns_to_dashboard_and_refreshes() {
        let mut events = vec![key(KeyCode::Enter)];
        events.extend(typed("x"));
        events.extend([key(KeyCode::Enter), key(KeyCode::Enter), key(KeyCode::Enter)]);
        let (model, _) = loaded(events);
        let (model, commands) = model.update(Event::Message(Msg::WorktreeCreated(Err(
            "fatal: 'x' is already checked out".to_string(),
        ))));
        assert!(matches!(model.view, View::Dashboard));
        assert!(has_refresh(&commands));
        assert!(model.busy.is_none());
        assert!(model.last_error.unwrap().contains("already checked out"));
    }

    #[test]
    fn test_success_shows_warnings_and_can_switch() {
        let mut events = vec![key(KeyCode::Enter)];
        events.extend(typed("x"));
        events.extend([key(KeyCode::Enter), key(KeyCode::Enter), key(KeyCode::Enter)]);
        let (model, _) = loaded(events);
        let (model, commands) = model.update(Event::Message(Msg::WorktreeCreated(Ok(
            CreateOutcome {
                path: PathBuf::from("/repo.worktrees/x"),
                branch: "x".into(),
                warnings: vec!["main has 2 unpushed commits".into()],
            },
        ))));
        assert!(has_refresh(&commands));
        assert_eq!(create_state(&model).step, CreateStep::Complete);

        let (_, commands) = run(model, [ch('s')]);
        assert!(matches!(&commands[..], [Command::WriteDirective(_)]));
    }
}
