//! Side effects requested by the model, and the dispatcher that runs them.
//!
//! A [`Command`] is plain data captured at dispatch time. [`Services::execute`]
//! turns one command into exactly one [`Msg`]; the [`Dispatcher`] runs it on
//! the rayon pool and sends the message back to the owner loop.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use rayon::prelude::*;

use super::deletion::{
    DeletionFailure, DeletionResult, DeletionTarget, delete_target, delete_worktree,
};
use super::message::{Event, ForEachResult, MergeReport, Msg, TickKind};
use crate::actions::{Action, ActionResolver};
use crate::config::{AiConfig, ArborConfig};
use crate::directive::{Directive, DirectiveWriter};
use crate::git::{CreateOutcome, CreateRequest, GitBackend, MergeRequest};
use crate::github::{Availability, GitHubProvider};
use crate::llm;
use crate::registry::{GitHubEnrichment, Snapshot};

/// One worktree a [`Command::ForEach`] runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForEachTarget {
    pub label: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub enum Command {
    RefreshWorktrees {
        request: u64,
    },
    CheckGitHub,
    EnrichGitHub {
        snapshot: Arc<Snapshot>,
        ci: bool,
    },
    LoadBranches,
    CreateWorktree {
        request: CreateRequest,
        post_create: Option<String>,
    },
    DeleteWorktrees {
        targets: Vec<DeletionTarget>,
        force: bool,
    },
    CleanupDelete {
        index: usize,
        target: DeletionTarget,
        force: bool,
    },
    PruneWorktrees,
    CompareBranches {
        base: String,
        head: String,
    },
    MergeBranch {
        request: MergeRequest,
        remove_source: Option<DeletionTarget>,
        ai: AiConfig,
    },
    ForEach {
        targets: Vec<ForEachTarget>,
        command: String,
    },
    GenerateCommitMessage {
        path: PathBuf,
        ai: AiConfig,
    },
    Commit {
        path: PathBuf,
        message: String,
    },
    ResolveActions {
        path: PathBuf,
    },
    ExecuteAction {
        action: Action,
        path: PathBuf,
    },
    OpenPullRequest {
        branch: String,
    },
    LoadConfig,
    SaveConfig(ArborConfig),
    WriteDirective(Directive),
    Tick {
        after: Duration,
        kind: TickKind,
    },
}

impl Command {
    /// The message this command resolves to when it fails outright.
    pub fn failure(&self, error: String) -> Msg {
        match self {
            Command::RefreshWorktrees { request } => Msg::WorktreesLoaded {
                request: *request,
                result: Err(error),
            },
            Command::CheckGitHub => Msg::GitHubChecked(Availability::Unavailable),
            Command::EnrichGitHub { snapshot, .. } => Msg::GitHubEnriched(GitHubEnrichment {
                generation: snapshot.generation,
                ..GitHubEnrichment::default()
            }),
            Command::LoadBranches => Msg::BranchesLoaded(Err(error)),
            Command::CreateWorktree { .. } => Msg::WorktreeCreated(Err(error)),
            Command::DeleteWorktrees { targets, .. } => Msg::WorktreesDeleted(
                targets
                    .iter()
                    .map(|target| DeletionResult {
                        target: target.clone(),
                        outcome: Err(DeletionFailure::from_error(&anyhow::anyhow!(
                            error.clone()
                        ))),
                    })
                    .collect(),
            ),
            Command::CleanupDelete { index, .. } => Msg::CleanupItemDeleted {
                index: *index,
                result: Err(DeletionFailure::from_error(&anyhow::anyhow!(error))),
            },
            Command::PruneWorktrees => Msg::WorktreesPruned(Err(error)),
            Command::CompareBranches { base, head } => Msg::ComparisonLoaded {
                base: base.clone(),
                head: head.clone(),
                result: Err(error),
            },
            Command::MergeBranch { .. } => Msg::BranchMerged(Err(error)),
            Command::ForEach { targets, .. } => Msg::ForEachFinished(
                targets
                    .iter()
                    .map(|target| ForEachResult {
                        label: target.label.clone(),
                        path: target.path.clone(),
                        success: false,
                        output: error.clone(),
                    })
                    .collect(),
            ),
            Command::GenerateCommitMessage { .. } => Msg::CommitMessageGenerated(Err(error)),
            Command::Commit { .. } => Msg::Committed(Err(error)),
            Command::ResolveActions { path } => Msg::ActionsResolved {
                path: path.clone(),
                actions: Vec::new(),
            },
            Command::ExecuteAction { .. } => Msg::ActionExecuted(Err(error)),
            Command::OpenPullRequest { .. } => Msg::PullRequestOpened(Err(error)),
            Command::LoadConfig => Msg::ConfigLoaded(Err(error)),
            Command::SaveConfig(_) => Msg::ConfigSaved(Err(error)),
            Command::WriteDirective(_) => Msg::DirectiveWritten(Err(error)),
            Command::Tick { kind, .. } => Msg::Tick(*kind),
        }
    }
}

/// The collaborators commands run against.
pub struct Services {
    pub git: Arc<dyn GitBackend>,
    pub github: Arc<dyn GitHubProvider>,
    pub actions: Arc<dyn ActionResolver>,
    pub directives: DirectiveWriter,
    pub config_path: Option<PathBuf>,
}

fn flatten<T>(result: anyhow::Result<T>) -> Result<T, String> {
    result.map_err(|e| format!("{e:#}"))
}

impl Services {
    /// Run `command` to completion on the calling thread.
    pub fn execute(&self, command: Command) -> Msg {
        match command {
            Command::RefreshWorktrees { request } => Msg::WorktreesLoaded {
                request,
                result: flatten(Snapshot::load(self.git.as_ref())),
            },
            Command::CheckGitHub => Msg::GitHubChecked(self.github.check()),
            Command::EnrichGitHub { snapshot, ci } => {
                let branches = snapshot.enrichable_branches();
                let prs = self.github.pr_status(&branches);
                let ci = if ci {
                    self.github.ci_status(&branches)
                } else {
                    Default::default()
                };
                Msg::GitHubEnriched(GitHubEnrichment {
                    generation: snapshot.generation,
                    prs,
                    ci,
                })
            }
            Command::LoadBranches => Msg::BranchesLoaded(flatten(self.git.list_branches())),
            Command::CreateWorktree {
                request,
                post_create,
            } => Msg::WorktreeCreated(flatten(self.create(&request, post_create.as_deref()))),
            Command::DeleteWorktrees { targets, force } => Msg::WorktreesDeleted(
                targets
                    .into_iter()
                    .map(|target| delete_target(self.git.as_ref(), target, force))
                    .collect(),
            ),
            Command::CleanupDelete {
                index,
                target,
                force,
            } => Msg::CleanupItemDeleted {
                index,
                result: delete_target(self.git.as_ref(), target, force).outcome,
            },
            Command::PruneWorktrees => Msg::WorktreesPruned(flatten(self.git.prune_worktrees())),
            Command::CompareBranches { base, head } => {
                let result = flatten(self.git.compare(&base, &head));
                Msg::ComparisonLoaded { base, head, result }
            }
            Command::MergeBranch {
                request,
                remove_source,
                ai,
            } => Msg::BranchMerged(flatten(self.merge(request, remove_source, &ai))),
            Command::ForEach { targets, command } => {
                Msg::ForEachFinished(self.for_each(&targets, &command))
            }
            Command::GenerateCommitMessage { path, ai } => Msg::CommitMessageGenerated(flatten(
                self.git
                    .diff_for_commit(&path)
                    .and_then(|diff| llm::generate_commit_message(&diff, &ai)),
            )),
            Command::Commit { path, message } => {
                Msg::Committed(flatten(self.git.commit_all(&path, &message)))
            }
            Command::ResolveActions { path } => {
                let actions = self.actions.resolve(&path);
                Msg::ActionsResolved { path, actions }
            }
            Command::ExecuteAction { action, path } => Msg::ActionExecuted(flatten(
                self.actions
                    .execute(&action, &path)
                    .map(|()| format!("Opened in {}", action.name)),
            )),
            Command::OpenPullRequest { branch } => {
                Msg::PullRequestOpened(flatten(self.github.open_pr_in_browser(&branch)))
            }
            Command::LoadConfig => Msg::ConfigLoaded(
                ArborConfig::load_from(self.config_path.as_deref()).map_err(|e| e.to_string()),
            ),
            Command::SaveConfig(config) => Msg::ConfigSaved(flatten(self.save_config(&config))),
            Command::WriteDirective(directive) => {
                Msg::DirectiveWritten(flatten(self.directives.write(&directive)))
            }
            Command::Tick { after, kind } => {
                std::thread::sleep(after);
                Msg::Tick(kind)
            }
        }
    }

    fn create(
        &self,
        request: &CreateRequest,
        post_create: Option<&str>,
    ) -> anyhow::Result<CreateOutcome> {
        let mut outcome = self.git.create_worktree(request)?;
        if let Some(command) = post_create.filter(|c| !c.trim().is_empty()) {
            match self.git.run_in(&outcome.path, command) {
                Ok(output) if output.success => {}
                Ok(output) => outcome.warnings.push(format!(
                    "post-create command failed: {}",
                    last_line(&output.output)
                )),
                Err(e) => outcome
                    .warnings
                    .push(format!("post-create command failed: {e:#}")),
            }
        }
        Ok(outcome)
    }

    fn merge(
        &self,
        mut request: MergeRequest,
        remove_source: Option<DeletionTarget>,
        ai: &AiConfig,
    ) -> anyhow::Result<MergeReport> {
        if request.squash && request.message.is_none() {
            let subjects = self
                .git
                .compare(&request.target, &request.source)
                .map(|c| c.commits)
                .unwrap_or_else(|e| {
                    log::warn!("Cannot list commits for squash message: {e:#}");
                    Vec::new()
                });
            request.message = Some(llm::generate_squash_message(
                &request.source,
                &request.target,
                &subjects,
                ai,
            ));
        }

        let outcome = self.git.merge(&request)?;
        let removal = remove_source.map(|target| {
            flatten(delete_worktree(self.git.as_ref(), &target.path, false))
        });
        Ok(MergeReport { outcome, removal })
    }

    fn for_each(&self, targets: &[ForEachTarget], command: &str) -> Vec<ForEachResult> {
        targets
            .par_iter()
            .map(|target| match self.git.run_in(&target.path, command) {
                Ok(output) => ForEachResult {
                    label: target.label.clone(),
                    path: target.path.clone(),
                    success: output.success,
                    output: output.output,
                },
                Err(e) => ForEachResult {
                    label: target.label.clone(),
                    path: target.path.clone(),
                    success: false,
                    output: format!("{e:#}"),
                },
            })
            .collect()
    }

    fn save_config(&self, config: &ArborConfig) -> anyhow::Result<PathBuf> {
        let Some(path) = self.config_path.as_deref() else {
            anyhow::bail!("No configuration directory on this system");
        };
        config.save_to(path)?;
        Ok(path.to_path_buf())
    }
}

fn last_line(output: &str) -> &str {
    output
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("no output")
        .trim()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("command panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("command panicked: {s}")
    } else {
        "command panicked".to_string()
    }
}

/// Runs commands off the owner thread and reports each completion as an [`Event`].
#[derive(Clone)]
pub struct Dispatcher {
    services: Arc<Services>,
    tx: Sender<Event>,
}

impl Dispatcher {
    pub fn new(services: Services, tx: Sender<Event>) -> Self {
        Self {
            services: Arc::new(services),
            tx,
        }
    }

    pub fn dispatch(&self, command: Command) {
        let tx = self.tx.clone();

        // Ticks only sleep; keep them off the pool so they never wait behind git.
        if let Command::Tick { after, kind } = command {
            std::thread::spawn(move || {
                std::thread::sleep(after);
                let _ = tx.send(Event::Message(Msg::Tick(kind)));
            });
            return;
        }

        let services = Arc::clone(&self.services);
        rayon::spawn(move || {
            let fallback = command.clone();
            let msg = match panic::catch_unwind(AssertUnwindSafe(|| services.execute(command))) {
                Ok(msg) => msg,
                Err(payload) => {
                    let error = panic_message(payload.as_ref());
                    log::warn!("{error} ({fallback:?})");
                    fallback.failure(error)
                }
            };
            // The receiver is gone only after the loop has exited.
            let _ = tx.send(Event::Message(msg));
        });
    }

    pub fn dispatch_all(&self, commands: impl IntoIterator<Item = Command>) {
        for command in commands {
            self.dispatch(command);
        }
    }
}
