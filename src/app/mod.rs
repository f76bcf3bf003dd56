//! The application model.
//!
//! [`Model::update`] is the only place state changes. It takes one [`Event`]
//! and returns the next model plus the [`Command`]s to dispatch; it never
//! blocks and never performs I/O. Each non-dashboard view owns a sub-state in
//! its [`View`] variant, so leaving a view drops its state.

use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

pub mod cleanup;
mod command;
pub mod compare;
pub mod config_view;
pub mod create;
mod dashboard;
pub mod delete;
pub mod deletion;
pub mod for_each;
pub mod init;
pub mod merge;
mod message;
pub mod selection;
pub mod settings;
pub mod step_commit;
pub mod tools;

pub use command::{Command, Dispatcher, ForEachTarget, Services};
pub use message::{Event, ForEachResult, MergeReport, Msg, TickKind};

use crate::actions::Action;
use crate::config::LoadedConfig;
use crate::github::Availability;
use crate::registry::{Registry, Snapshot, Worktree};
use cleanup::CleanupState;
use compare::CompareState;
use config_view::ConfigState;
use create::CreateState;
use delete::DeleteState;
use for_each::ForEachState;
use init::InitState;
use merge::MergeState;
use settings::SettingsState;
use step_commit::StepCommitState;
use tools::ToolsState;

pub const SPINNER_INTERVAL: Duration = Duration::from_millis(100);
pub const AUTO_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// The active screen and its sub-state.
#[derive(Debug, Default)]
pub enum View {
    #[default]
    Dashboard,
    Create(CreateState),
    Delete(DeleteState),
    Init(InitState),
    Config(ConfigState),
    Tools(ToolsState),
    Cleanup(CleanupState),
    Compare(CompareState),
    Merge(MergeState),
    ForEach(ForEachState),
    StepCommit(StepCommitState),
    Settings(SettingsState),
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Dashboard => "Worktrees",
            View::Create(_) => "New worktree",
            View::Delete(_) => "Delete worktree",
            View::Init(_) => "Setup",
            View::Config(_) => "Configuration",
            View::Tools(_) => "Tools",
            View::Cleanup(_) => "Clean up stale worktrees",
            View::Compare(_) => "Compare",
            View::Merge(_) => "Merge",
            View::ForEach(_) => "Run in every worktree",
            View::StepCommit(_) => "Commit",
            View::Settings(_) => "Settings",
        }
    }

    /// Whether the view is waiting on a command it dispatched.
    fn is_waiting(&self) -> bool {
        match self {
            View::Dashboard => false,
            View::Create(state) => state.is_waiting(),
            View::Delete(state) => state.step == delete::DeleteStep::Deleting,
            View::Init(state) => state.step == init::InitStep::Saving,
            View::Config(state) => state.loading,
            View::Tools(state) => state.is_running(),
            View::Cleanup(state) => state.in_progress,
            View::Compare(state) => state.is_loading(),
            View::Merge(state) => state.step == merge::MergeStep::Merging,
            View::ForEach(state) => state.step == for_each::ForEachStep::Running,
            View::StepCommit(state) => state.is_waiting(),
            View::Settings(_) => false,
        }
    }
}

/// Destructive operation in flight. New destructive actions are refused until it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum BusyOp {
    Create,
    Delete,
    Cleanup,
    Merge,
    Commit,
    Prune,
}

/// Overlays drawn on top of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    OpenIn {
        path: PathBuf,
        actions: Vec<Action>,
        cursor: usize,
    },
    Loading(String),
}

/// Toggles that last for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub github: bool,
    pub ci: bool,
    pub auto_refresh: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Spinner {
    pub frame: usize,
    armed: bool,
}

#[derive(Debug)]
pub struct Model {
    pub view: View,
    pub registry: Registry,
    pub config: LoadedConfig,
    /// Index into the snapshot's worktrees
    pub cursor: usize,
    pub show_help: bool,
    pub modal: Option<Modal>,
    /// One-shot status line, cleared by the next key
    pub notice: Option<String>,
    /// One-shot error line, cleared by the next key
    pub last_error: Option<String>,
    /// Unrecoverable startup failure; the error screen replaces every view
    pub fatal: Option<String>,
    pub busy: Option<BusyOp>,
    pub github: Availability,
    pub settings: Settings,
    pub spinner: Spinner,
    auto_refresh_armed: bool,
    refresh_requested: u64,
    refresh_applied: u64,
    /// Terminal size as (columns, rows)
    pub viewport: (u16, u16),
    pub should_quit: bool,
    /// Printed after the terminal is restored
    pub exit_output: Option<String>,
}

impl Model {
    pub fn new(config: LoadedConfig, github_enabled: bool) -> Self {
        let github = github_enabled && config.config.github;
        let view = if config.initialized {
            View::Dashboard
        } else {
            View::Init(InitState::new(&config.config))
        };
        Self {
            view,
            registry: Registry::default(),
            config,
            cursor: 0,
            show_help: false,
            modal: None,
            notice: None,
            last_error: None,
            fatal: None,
            busy: None,
            github: if github {
                Availability::Unchecked
            } else {
                Availability::Unavailable
            },
            settings: Settings {
                github,
                ci: github,
                auto_refresh: false,
            },
            spinner: Spinner::default(),
            auto_refresh_armed: false,
            refresh_requested: 0,
            refresh_applied: 0,
            viewport: (80, 24),
            should_quit: false,
            exit_output: None,
        }
    }

    /// Commands to dispatch at startup.
    pub fn init(&mut self) -> Vec<Command> {
        let mut commands = self.refresh();
        if self.settings.github {
            commands.push(Command::CheckGitHub);
        }
        commands.extend(self.spinner_tick());
        commands
    }

    pub fn update(mut self, event: Event) -> (Self, Vec<Command>) {
        let commands = match event {
            Event::Input(key) => self.on_key(key),
            Event::Resize(columns, rows) => {
                self.viewport = (columns, rows);
                Vec::new()
            }
            Event::Message(msg) => self.on_message(msg),
        };
        (self, commands)
    }

    pub fn snapshot(&self) -> &Snapshot {
        self.registry.snapshot()
    }

    pub fn selected_worktree(&self) -> Option<&Worktree> {
        self.snapshot().worktrees.get(self.cursor)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_applied < self.refresh_requested
    }

    /// Whether anything the user is waiting on is in flight.
    pub fn is_working(&self) -> bool {
        self.busy.is_some()
            || self.is_refreshing()
            || matches!(self.modal, Some(Modal::Loading(_)))
            || self.view.is_waiting()
    }

    /// Rows available to scrolling lists.
    pub fn list_window(&self) -> usize {
        usize::from(self.viewport.1).saturating_sub(8).max(3)
    }

    /// Request a new snapshot. Always dispatched, even if one is in flight,
    /// since the earlier one may predate a mutation.
    pub(crate) fn refresh(&mut self) -> Vec<Command> {
        self.refresh_requested += 1;
        vec![Command::RefreshWorktrees {
            request: self.refresh_requested,
        }]
    }

    /// Arm the spinner unless a tick is already outstanding.
    pub(crate) fn spinner_tick(&mut self) -> Option<Command> {
        if self.spinner.armed {
            return None;
        }
        self.spinner.armed = true;
        Some(Command::Tick {
            after: SPINNER_INTERVAL,
            kind: TickKind::Spinner,
        })
    }

    pub(crate) fn auto_refresh_tick(&mut self) -> Option<Command> {
        if self.auto_refresh_armed || !self.settings.auto_refresh {
            return None;
        }
        self.auto_refresh_armed = true;
        Some(Command::Tick {
            after: AUTO_REFRESH_INTERVAL,
            kind: TickKind::AutoRefresh,
        })
    }

    /// Start a long operation: mark it busy and make sure the spinner runs.
    pub(crate) fn start(&mut self, op: BusyOp, command: Command) -> Vec<Command> {
        self.busy = Some(op);
        let mut commands = vec![command];
        commands.extend(self.spinner_tick());
        commands
    }

    /// Refuse a destructive action while another is running.
    pub(crate) fn reject_if_busy(&mut self) -> bool {
        match self.busy {
            Some(op) => {
                self.notice = Some(format!("Wait for the running {op} to finish"));
                true
            }
            None => false,
        }
    }

    fn enrich(&self) -> Option<Command> {
        (self.settings.github && self.github == Availability::Available && self.registry.is_loaded())
            .then(|| Command::EnrichGitHub {
                snapshot: self.registry.snapshot().clone(),
                ci: self.settings.ci,
            })
    }

    fn on_key(&mut self, key: KeyEvent) -> Vec<Command> {
        if key.kind == KeyEventKind::Release {
            return Vec::new();
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Vec::new();
        }
        self.notice = None;
        self.last_error = None;

        if self.fatal.is_some() {
            self.should_quit = true;
            return Vec::new();
        }

        let (view, commands) = match std::mem::take(&mut self.view) {
            View::Dashboard => {
                let commands = dashboard::on_key(self, key);
                (std::mem::take(&mut self.view), commands)
            }
            View::Create(state) => create::on_key(self, state, key),
            View::Delete(state) => delete::on_key(self, state, key),
            View::Init(state) => init::on_key(self, state, key),
            View::Config(state) => config_view::on_key(self, state, key),
            View::Tools(state) => tools::on_key(self, state, key),
            View::Cleanup(state) => cleanup::on_key(self, state, key),
            View::Compare(state) => compare::on_key(self, state, key),
            View::Merge(state) => merge::on_key(self, state, key),
            View::ForEach(state) => for_each::on_key(self, state, key),
            View::StepCommit(state) => step_commit::on_key(self, state, key),
            View::Settings(state) => settings::on_key(self, state, key),
        };
        self.view = view;
        commands
    }

    fn on_message(&mut self, msg: Msg) -> Vec<Command> {
        match msg {
            Msg::WorktreesLoaded { request, result } => self.on_worktrees_loaded(request, result),
            Msg::GitHubChecked(availability) => {
                self.github = availability;
                log::debug!("GitHub availability: {availability}");
                self.enrich().into_iter().collect()
            }
            Msg::GitHubEnriched(enrichment) => {
                self.registry.apply_enrichment(&enrichment);
                Vec::new()
            }
            Msg::Tick(TickKind::Spinner) => {
                self.spinner.armed = false;
                self.spinner.frame = self.spinner.frame.wrapping_add(1);
                if self.is_working() {
                    self.spinner_tick().into_iter().collect()
                } else {
                    Vec::new()
                }
            }
            Msg::Tick(TickKind::AutoRefresh) => {
                self.auto_refresh_armed = false;
                let mut commands = Vec::new();
                if !self.settings.auto_refresh {
                    return commands;
                }
                if matches!(self.view, View::Dashboard)
                    && self.busy.is_none()
                    && !self.is_refreshing()
                {
                    commands.extend(self.refresh());
                }
                commands.extend(self.auto_refresh_tick());
                commands
            }
            msg => self.route(msg),
        }
    }

    fn on_worktrees_loaded(&mut self, request: u64, result: Result<Snapshot, String>) -> Vec<Command> {
        if request < self.refresh_applied {
            log::debug!("Dropping refresh {request}; {} already applied", self.refresh_applied);
            return Vec::new();
        }
        self.refresh_applied = request;

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                if self.registry.is_loaded() {
                    self.last_error = Some(format!("Refresh failed: {e}"));
                } else {
                    self.fatal = Some(e);
                }
                return Vec::new();
            }
        };

        let first_load = !self.registry.is_loaded();
        let previous = self.selected_worktree().map(|wt| wt.path.clone());
        let snapshot = self.registry.publish(snapshot);

        let follow = if first_load {
            snapshot.worktrees.iter().position(|wt| wt.is_current)
        } else {
            previous.and_then(|path| snapshot.worktrees.iter().position(|wt| wt.path == path))
        };
        self.cursor = follow.unwrap_or(self.cursor);
        self.cursor = self.cursor.min(snapshot.worktrees.len().saturating_sub(1));

        if let View::Delete(state) = &mut self.view {
            state.sync_candidates(&snapshot);
        }

        self.enrich().into_iter().collect()
    }

    /// Deliver a command result to the view that asked for it.
    fn route(&mut self, msg: Msg) -> Vec<Command> {
        let (view, commands) = match (std::mem::take(&mut self.view), msg) {
            (View::Create(state), msg @ (Msg::BranchesLoaded(_) | Msg::WorktreeCreated(_))) => {
                create::on_message(self, state, msg)
            }
            (View::Delete(state), Msg::WorktreesDeleted(results)) => {
                delete::on_deleted(self, state, results)
            }
            (View::Cleanup(state), Msg::CleanupItemDeleted { index, result }) => {
                cleanup::on_item_deleted(self, state, index, result.map_err(|f| f.reason))
            }
            (View::Compare(state), msg @ (Msg::BranchesLoaded(_) | Msg::ComparisonLoaded { .. })) => {
                compare::on_message(self, state, msg)
            }
            (View::Merge(state), Msg::BranchMerged(result)) => merge::on_merged(self, state, result),
            (View::ForEach(state), Msg::ForEachFinished(results)) => {
                for_each::on_finished(self, state, results)
            }
            (
                View::StepCommit(state),
                msg @ (Msg::CommitMessageGenerated(_) | Msg::Committed(_)),
            ) => step_commit::on_message(self, state, msg),
            (View::Tools(state), msg @ (Msg::WorktreesPruned(_) | Msg::PullRequestOpened(_)))
                if state.is_running() =>
            {
                tools::on_message(self, state, msg)
            }
            (View::Config(state), Msg::ConfigLoaded(result)) => {
                config_view::on_loaded(self, state, result)
            }
            (View::Init(state), Msg::ConfigSaved(result)) => init::on_saved(self, state, result),
            (view, msg) => {
                self.view = view;
                let commands = self.on_background(msg);
                (std::mem::take(&mut self.view), commands)
            }
        };
        self.view = view;
        commands
    }

    /// Results not owned by the active view.
    fn on_background(&mut self, msg: Msg) -> Vec<Command> {
        match msg {
            Msg::ActionsResolved { path, actions } => {
                if matches!(self.modal, Some(Modal::Loading(_))) {
                    if actions.is_empty() {
                        self.modal = None;
                        self.notice = Some("No supported apps found".to_string());
                    } else {
                        self.modal = Some(Modal::OpenIn {
                            path,
                            actions,
                            cursor: 0,
                        });
                    }
                }
                Vec::new()
            }
            Msg::ActionExecuted(result) | Msg::Committed(result) => {
                self.busy = self.busy.filter(|op| *op != BusyOp::Commit);
                match result {
                    Ok(message) => self.notice = Some(message),
                    Err(e) => self.last_error = Some(e),
                }
                Vec::new()
            }
            Msg::PullRequestOpened(result) => {
                match result {
                    Ok(()) => self.notice = Some("Opened pull request in browser".to_string()),
                    Err(e) => self.last_error = Some(e),
                }
                Vec::new()
            }
            Msg::DirectiveWritten(result) => {
                match result {
                    Ok(pending) => {
                        self.exit_output = pending;
                        self.should_quit = true;
                    }
                    Err(e) => self.last_error = Some(e),
                }
                Vec::new()
            }
            Msg::ConfigLoaded(Ok(config)) => {
                self.config = config;
                Vec::new()
            }
            Msg::ConfigLoaded(Err(e)) => {
                self.last_error = Some(e);
                Vec::new()
            }
            // Mutations whose view is gone still change the repository.
            Msg::WorktreeCreated(_)
            | Msg::WorktreesDeleted(_)
            | Msg::CleanupItemDeleted { .. }
            | Msg::WorktreesPruned(_)
            | Msg::BranchMerged(_) => {
                log::debug!("Mutation finished outside its view: {msg:?}");
                self.busy = None;
                self.refresh()
            }
            msg => {
                log::debug!("Ignoring {msg:?} in {}", self.view.title());
                Vec::new()
            }
        }
    }
}
