//! Pull request and CI status from GitHub, via the `gh` CLI.
//!
//! Everything here degrades to "no data": a missing or unauthenticated `gh`
//! means enrichment is skipped, never that a refresh fails.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, bail};
use rayon::prelude::*;
use serde::Deserialize;

use crate::registry::{CiStatus, PullRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Availability {
    Available,
    Unavailable,
    Unchecked,
}

/// Source of PR and CI state for branches.
pub trait GitHubProvider: Send + Sync {
    /// Last known availability; `Unchecked` until [`GitHubProvider::check`] runs.
    fn availability(&self) -> Availability;

    /// Probe whether lookups can work (CLI installed and authenticated).
    fn check(&self) -> Availability;

    /// Most recent PR for each branch that has one.
    fn pr_status(&self, branches: &[String]) -> HashMap<String, PullRequest>;

    /// CI rollup for each branch that has a PR with checks.
    fn ci_status(&self, branches: &[String]) -> HashMap<String, CiStatus>;

    fn open_pr_in_browser(&self, branch: &str) -> anyhow::Result<()>;
}

/// [`GitHubProvider`] backed by the `gh` command.
pub struct GhCli {
    repo_dir: PathBuf,
    /// Set by `--no-github`; never checked
    disabled: bool,
    availability: Mutex<Availability>,
}

impl GhCli {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            disabled: false,
            availability: Mutex::new(Availability::Unchecked),
        }
    }

    /// A provider that reports itself unavailable, for `--no-github`.
    pub fn disabled(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            disabled: true,
            availability: Mutex::new(Availability::Unavailable),
        }
    }

    fn detect(&self) -> Availability {
        if which::which("gh").is_err() {
            log::debug!("gh not found on PATH");
            return Availability::Unavailable;
        }
        match self.run(&["auth", "status"]) {
            Ok(_) => Availability::Available,
            Err(e) => {
                log::debug!("gh not authenticated: {e:#}");
                Availability::Unavailable
            }
        }
    }

    fn store(&self, availability: Availability) {
        *self.availability.lock().unwrap_or_else(PoisonError::into_inner) = availability;
    }

    fn run(&self, args: &[&str]) -> anyhow::Result<String> {
        log::debug!("$ gh {}", args.join(" "));
        let output = Command::new("gh")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .context("Failed to execute gh")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("gh {} failed: {}", args.first().unwrap_or(&""), stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn pr_for_branch(&self, branch: &str) -> Option<PullRequest> {
        match self.run(&[
            "pr",
            "list",
            "--head",
            branch,
            "--state",
            "all",
            "--limit",
            "1",
            "--json",
            "number,state,url",
        ]) {
            Ok(out) => parse_pr_list(&out)
                .map_err(|e| log::warn!("Unparseable gh pr list output for {branch}: {e:#}"))
                .ok()
                .flatten(),
            Err(e) => {
                log::warn!("PR lookup failed for {branch}: {e:#}");
                None
            }
        }
    }

    fn checks_for_branch(&self, branch: &str) -> Option<CiStatus> {
        let output = Command::new("gh")
            .args(["pr", "checks", branch, "--json", "bucket"])
            .current_dir(&self.repo_dir)
            .output()
            .map_err(|e| log::warn!("gh pr checks failed to start: {e}"))
            .ok()?;

        // `gh pr checks` exits non-zero while checks fail or are pending, so
        // parse stdout regardless of status.
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("no checks reported") {
                return Some(CiStatus::NoChecks);
            }
            return None;
        }
        parse_checks(&stdout)
            .map_err(|e| log::warn!("Unparseable gh pr checks output for {branch}: {e:#}"))
            .ok()
    }
}

impl GitHubProvider for GhCli {
    fn availability(&self) -> Availability {
        *self.availability.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Asks `gh` again on every call, so installing or logging in mid-session is picked up.
    fn check(&self) -> Availability {
        if self.disabled {
            return Availability::Unavailable;
        }
        let availability = self.detect();
        self.store(availability);
        availability
    }

    fn pr_status(&self, branches: &[String]) -> HashMap<String, PullRequest> {
        if self.availability() != Availability::Available {
            return HashMap::new();
        }
        branches
            .par_iter()
            .filter_map(|branch| self.pr_for_branch(branch).map(|pr| (branch.clone(), pr)))
            .collect()
    }

    fn ci_status(&self, branches: &[String]) -> HashMap<String, CiStatus> {
        if self.availability() != Availability::Available {
            return HashMap::new();
        }
        branches
            .par_iter()
            .filter_map(|branch| self.checks_for_branch(branch).map(|ci| (branch.clone(), ci)))
            .collect()
    }

    fn open_pr_in_browser(&self, branch: &str) -> anyhow::Result<()> {
        if self.availability() == Availability::Unavailable {
            bail!("GitHub CLI is not available");
        }
        self.run(&["pr", "view", branch, "--web"])?;
        Ok(())
    }
}

/// First entry of `gh pr list --json number,state,url`.
pub(crate) fn parse_pr_list(json: &str) -> anyhow::Result<Option<PullRequest>> {
    let prs: Vec<PullRequest> = serde_json::from_str(json)?;
    Ok(prs.into_iter().next())
}

/// Roll `gh pr checks --json bucket` up into one status.
///
/// Any failure wins, then anything pending; skipped checks count as passing.
pub(crate) fn parse_checks(json: &str) -> anyhow::Result<CiStatus> {
    #[derive(Deserialize)]
    struct Check {
        bucket: String,
    }

    let checks: Vec<Check> = serde_json::from_str(json)?;
    if checks.is_empty() {
        return Ok(CiStatus::NoChecks);
    }
    if checks
        .iter()
        .any(|c| matches!(c.bucket.as_str(), "fail" | "cancel"))
    {
        return Ok(CiStatus::Failed);
    }
    if checks.iter().any(|c| c.bucket == "pending") {
        return Ok(CiStatus::Pending);
    }
    Ok(CiStatus::Passed)
}
