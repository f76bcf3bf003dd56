//! Commit messages drafted by an external AI CLI.
//!
//! The configured command receives the prompt as its final argument and
//! prints the message on stdout.

use std::process;

use anyhow::{Context, bail};

use crate::config::AiConfig;

/// Diffs larger than this are cut before they reach the prompt.
const MAX_DIFF_CHARS: usize = 20_000;

/// Draft a commit message for the changes in `diff`.
pub fn generate_commit_message(diff: &str, ai: &AiConfig) -> anyhow::Result<String> {
    let Some(command) = ai.command.as_deref().filter(|c| !c.trim().is_empty()) else {
        bail!("No AI command configured; set [ai] command in the config file");
    };
    if diff.trim().is_empty() {
        bail!("Nothing to commit");
    }

    let prompt = format!(
        "Write a git commit message for the following changes. Use a concise subject line \
         (under 72 characters), then a blank line and a short body if needed. \
         Output only the commit message without any explanation.\n\n{}",
        truncate_diff(diff)
    );
    run_ai(command, &ai.args, &prompt)
}

/// Commit message for squashing `source` into `target`.
///
/// Falls back to a deterministic summary when no AI command is configured or
/// it fails.
pub fn generate_squash_message(
    source: &str,
    target: &str,
    subjects: &[String],
    ai: &AiConfig,
) -> String {
    if let Some(command) = ai.command.as_deref().filter(|c| !c.trim().is_empty()) {
        let mut context = format!("Squashing branch {source} into {target}\n\nCommits being combined:\n");
        for subject in subjects.iter().rev() {
            context.push_str(&format!("- {subject}\n"));
        }
        let prompt = format!(
            "{context}\nGenerate a conventional commit message (feat/fix/docs/style/refactor) \
             that combines these changes into one cohesive message. Output only the commit \
             message without any explanation."
        );
        match run_ai(command, &ai.args, &prompt) {
            Ok(message) => return message,
            Err(e) => log::warn!("AI squash message failed, using summary: {e:#}"),
        }
    }

    let mut message = format!("Squash merge {source} into {target}\n");
    if !subjects.is_empty() {
        message.push_str("\nCombined commits:\n");
        // Oldest first
        for subject in subjects.iter().rev() {
            message.push_str(&format!("- {subject}\n"));
        }
    }
    message
}

fn run_ai(command: &str, args: &[String], prompt: &str) -> anyhow::Result<String> {
    log::debug!("$ {command} {} <prompt>", args.join(" "));
    let output = process::Command::new(command)
        .args(args)
        .arg(prompt)
        .output()
        .with_context(|| format!("Failed to run {command}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{command} failed: {}", stderr.trim());
    }

    let message = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    if message.is_empty() {
        bail!("{command} returned an empty message");
    }
    Ok(message)
}

fn truncate_diff(diff: &str) -> &str {
    if diff.len() <= MAX_DIFF_CHARS {
        return diff;
    }
    let mut end = MAX_DIFF_CHARS;
    while !diff.is_char_boundary(end) {
        end -= 1;
    }
    &diff[..end]
}
