//! Turn a [`Model`] into styled lines. Nothing here mutates state.

use ansi_str::AnsiStr;
use anstyle::Style;
use color_print::cformat;
use strum::IntoEnumIterator;

use crate::app::cleanup::{CleanupState, CleanupStep, FORCE_ROW};
use crate::app::compare::{CompareState, CompareStep, result_lines};
use crate::app::config_view::ConfigState;
use crate::app::create::{CreateMode, CreateState, CreateStep};
use crate::app::delete::{DeleteState, DeleteStep};
use crate::app::for_each::{ForEachState, ForEachStep};
use crate::app::init::{InitState, InitStep};
use crate::app::merge::{MergeOption, MergeState, MergeStep};
use crate::app::selection::{ListPicker, TextInput};
use crate::app::settings::{SettingItem, SettingsState};
use crate::app::step_commit::{CommitStep, StepCommitState};
use crate::app::tools::{ToolItem, ToolsState};
use crate::app::{Modal, Model, View};
use crate::path::{format_path_for_display, relative_display};
use crate::registry::{CiStatus, PrState, Worktree};
use crate::styling::{
    BOLD, CURRENT, CYAN, CYAN_BOLD, ERROR, ERROR_EMOJI, GRAY, GREEN, HINT, SELECTED,
    SPINNER_FRAMES, SUCCESS_EMOJI, WARNING, WARNING_EMOJI, pad_to_width, truncate_to_width,
};

/// Error lines kept in the footer before the rest are counted.
const MAX_ERROR_LINES: usize = 4;

/// Key reference shown by `?`.
const HELP: &[(&str, &str)] = &[
    ("↑/↓ j/k", "move"),
    ("enter", "switch to worktree"),
    ("n", "new worktree"),
    ("d / D", "delete one / several"),
    ("c", "clean up stale worktrees"),
    ("C", "compare with another branch"),
    ("m", "merge into another branch"),
    ("s", "commit all changes"),
    ("f", "run a command in every worktree"),
    ("o", "open in editor or app"),
    ("p", "open pull request"),
    ("t", "tools"),
    ("g", "configuration"),
    ("S", "settings"),
    ("I", "setup"),
    ("r", "refresh"),
    ("q / esc", "quit"),
];

fn styled(style: Style, text: impl std::fmt::Display) -> String {
    format!("{style}{text}{style:#}")
}

fn checkbox(checked: bool) -> &'static str {
    if checked { "[x]" } else { "[ ]" }
}

/// Every line of the screen, fitted to the viewport.
pub fn frame(model: &Model) -> Vec<String> {
    let (columns, rows) = model.viewport;
    let width = usize::from(columns);
    let rows = usize::from(rows).max(3);

    let mut body = Vec::new();
    if let Some(error) = &model.fatal {
        body.push(cformat!("{ERROR_EMOJI} <red,bold>Cannot read worktrees</>"));
        body.push(String::new());
        body.extend(error.lines().map(|line| styled(ERROR, line)));
        body.push(String::new());
        body.push(styled(HINT, "Press any key to exit"));
        return fit(vec![header(model)], body, Vec::new(), width, rows);
    }

    match &model.view {
        View::Dashboard if model.show_help => help(&mut body),
        View::Dashboard => {
            dashboard(model, &mut body);
            if let Some(modal) = &model.modal {
                render_modal(modal, model, &mut body);
            }
        }
        View::Create(state) => create(state, model, &mut body),
        View::Delete(state) => delete(state, model, &mut body),
        View::Init(state) => init(state, model, &mut body),
        View::Config(state) => config(state, &mut body),
        View::Tools(state) => tools(state, model, &mut body),
        View::Cleanup(state) => cleanup(state, model, &mut body),
        View::Compare(state) => compare(state, model, &mut body),
        View::Merge(state) => merge(state, model, &mut body),
        View::ForEach(state) => for_each(state, model, &mut body),
        View::StepCommit(state) => step_commit(state, model, &mut body),
        View::Settings(state) => settings(state, &mut body),
    }

    fit(vec![header(model)], body, footer(model), width, rows)
}

fn fit(
    head: Vec<String>,
    body: Vec<String>,
    foot: Vec<String>,
    width: usize,
    rows: usize,
) -> Vec<String> {
    let room = rows.saturating_sub(head.len() + foot.len());
    let mut lines = head;
    lines.push(String::new());
    lines.extend(body.into_iter().take(room.saturating_sub(1)));
    lines.extend(foot);
    lines
        .iter()
        .map(|line| truncate_to_width(line, width))
        .collect()
}

fn spinner(model: &Model) -> &'static str {
    SPINNER_FRAMES[model.spinner.frame % SPINNER_FRAMES.len()]
}

fn header(model: &Model) -> String {
    let mut line = format!("{} {}", styled(CYAN_BOLD, "arbor"), styled(BOLD, model.view.title()));
    if model.is_working() {
        line.push_str(&format!(" {}", styled(CYAN, spinner(model))));
    }
    if let Some(op) = model.busy {
        line.push_str(&format!(" {}", styled(GRAY, format!("{op} running"))));
    }
    if model.registry.is_loaded() {
        let snapshot = model.snapshot();
        line.push_str(&format!(
            "  {}",
            styled(
                GRAY,
                format!(
                    "{} worktrees · updated {}",
                    snapshot.worktrees.len(),
                    snapshot.refreshed_at.format("%H:%M:%S")
                )
            )
        ));
    }
    line
}

/// Plain, non-empty lines of a message that may carry styling or an emoji of its own.
fn message_lines(text: &str) -> Vec<String> {
    let plain = text.ansi_strip();
    plain
        .trim()
        .trim_start_matches(ERROR_EMOJI)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn footer(model: &Model) -> Vec<String> {
    let mut lines = vec![String::new()];
    if let Some(error) = &model.last_error {
        let mut error_lines = message_lines(error).into_iter();
        let first = error_lines.next().unwrap_or_default();
        let rest: Vec<String> = error_lines.collect();
        lines.push(format!("{ERROR_EMOJI} {}", styled(ERROR, first)));
        let shown = rest.len().min(MAX_ERROR_LINES - 1);
        lines.extend(rest[..shown].iter().map(|line| styled(ERROR, format!("   {line}"))));
        if rest.len() > shown {
            lines.push(styled(GRAY, format!("   … {} more lines", rest.len() - shown)));
        }
    } else if let Some(notice) = &model.notice {
        lines.extend(message_lines(notice).iter().map(|line| styled(WARNING, line)));
    } else {
        lines.push(String::new());
    }
    lines.push(styled(HINT, key_hints(model)));
    lines
}

fn key_hints(model: &Model) -> &'static str {
    match &model.view {
        View::Dashboard if model.show_help => "any key: close help",
        View::Dashboard if model.modal.is_some() => "↑/↓ choose · enter open · esc close",
        View::Dashboard => "enter switch · n new · d delete · c clean up · ? help · q quit",
        View::Create(_) => "enter continue · esc back",
        View::Delete(state) => match state.step {
            DeleteStep::Selection => "space toggle · enter continue · esc cancel",
            DeleteStep::Confirm => "y delete · f toggle force · n cancel",
            _ => "any key: back",
        },
        View::Cleanup(state) => match state.step {
            CleanupStep::Selecting => "space toggle · enter delete selected · esc back",
            CleanupStep::Running => "deleting…",
            CleanupStep::Summary => "any key: back",
        },
        View::Merge(_) => "enter continue · space toggle · esc back",
        View::Compare(_) | View::ForEach(_) => "↑/↓ scroll · esc back",
        View::StepCommit(_) => "enter commit · ctrl-g generate message · esc back",
        View::Tools(_) => "enter run · esc back",
        View::Config(_) => "r reload · esc back",
        View::Settings(_) => "space toggle · esc apply",
        View::Init(_) => "enter continue · esc back",
    }
}

fn help(out: &mut Vec<String>) {
    out.push(styled(BOLD, "Keys"));
    for (key, action) in HELP {
        out.push(format!("  {}  {action}", styled(CYAN, pad_to_width(key, 10))));
    }
}

fn status_cells(wt: &Worktree) -> String {
    let mut cells = Vec::new();
    if wt.staged > 0 {
        cells.push(styled(GREEN, format!("+{}", wt.staged)));
    }
    if wt.modified > 0 {
        cells.push(styled(WARNING, format!("~{}", wt.modified)));
    }
    if wt.untracked > 0 {
        cells.push(styled(GRAY, format!("?{}", wt.untracked)));
    }
    if wt.unpushed_commits > 0 {
        cells.push(styled(CYAN, format!("↑{}", wt.unpushed_commits)));
    }
    if let Some(pr) = &wt.pr {
        let style = match pr.state {
            PrState::Open => GREEN,
            PrState::Merged => CYAN,
            PrState::Closed => GRAY,
        };
        cells.push(styled(style, format!("#{} {}", pr.number, pr.state)));
    }
    if let Some(ci) = wt.ci {
        let style = match ci {
            CiStatus::Passed => GREEN,
            CiStatus::Failed => ERROR,
            CiStatus::Pending => WARNING,
            CiStatus::NoChecks => GRAY,
        };
        cells.push(styled(style, format!("ci {ci}")));
    }
    if let Some(reason) = wt.stale_reason {
        cells.push(styled(WARNING, format!("stale: {}", reason.describe())));
    }
    cells.join(" ")
}

fn worktree_row(wt: &Worktree, selected: bool, root: &std::path::Path) -> String {
    let marker = if wt.is_current { "●" } else { " " };
    let label = pad_to_width(wt.label(), 24);
    let label = if wt.is_current {
        styled(CURRENT, label)
    } else {
        label
    };
    let path = styled(GRAY, pad_to_width(&relative_display(&wt.path, root), 32));
    let row = format!("{marker} {label} {path} {}", status_cells(wt));
    if selected { styled(SELECTED, row) } else { row }
}

fn dashboard(model: &Model, out: &mut Vec<String>) {
    if !model.registry.is_loaded() {
        out.push(format!("{} Loading worktrees", styled(CYAN, spinner(model))));
        return;
    }
    let snapshot = model.snapshot();
    let window = model.list_window();
    let scroll = crate::app::selection::follow_scroll(model.cursor, 0, window, snapshot.worktrees.len());
    for (i, wt) in snapshot
        .worktrees
        .iter()
        .enumerate()
        .skip(scroll)
        .take(window)
    {
        out.push(worktree_row(wt, i == model.cursor, &snapshot.repo_root));
    }
}

fn render_modal(modal: &Modal, model: &Model, out: &mut Vec<String>) {
    out.push(String::new());
    match modal {
        Modal::Loading(label) => {
            out.push(format!("{} {label}", styled(CYAN, spinner(model))));
        }
        Modal::OpenIn {
            path,
            actions,
            cursor,
        } => {
            out.push(styled(BOLD, format!("Open {} in", format_path_for_display(path))));
            for (i, action) in actions.iter().enumerate() {
                let row = format!("  {}", action.name);
                out.push(if i == *cursor { styled(SELECTED, row) } else { row });
            }
        }
    }
}

fn input_line(label: &str, input: &TextInput) -> String {
    let value = input.value();
    let at = value
        .char_indices()
        .nth(input.cursor())
        .map(|(i, _)| i)
        .unwrap_or(value.len());
    let (before, after) = value.split_at(at);
    format!("{}: {before}{}{after}", styled(BOLD, label), styled(SELECTED, " "))
}

fn picker_lines(picker: &ListPicker, out: &mut Vec<String>) {
    if !picker.filter().is_empty() {
        out.push(styled(GRAY, format!("filter: {}", picker.filter())));
    }
    if picker.is_empty() {
        out.push(styled(HINT, "  no matches"));
    }
    for (item, selected) in picker.window_rows() {
        let row = format!("  {item}");
        out.push(if selected { styled(SELECTED, row) } else { row });
    }
}

fn waiting(model: &Model, label: &str, out: &mut Vec<String>) {
    out.push(format!("{} {label}", styled(CYAN, spinner(model))));
}

fn create(state: &CreateState, model: &Model, out: &mut Vec<String>) {
    if state.branches.is_none() {
        return waiting(model, "Loading branches", out);
    }
    match state.step {
        CreateStep::BranchMode => {
            for (mode, label) in [
                (CreateMode::NewBranch, "Create a new branch"),
                (CreateMode::ExistingBranch, "Check out an existing branch"),
            ] {
                let row = format!("  {label}");
                out.push(if mode == state.mode { styled(SELECTED, row) } else { row });
            }
        }
        CreateStep::BranchName => {
            out.push(input_line("Branch name", &state.name_input));
            if let Some(error) = &state.name_error {
                out.push(styled(ERROR, error));
            }
        }
        CreateStep::ExistingBranch | CreateStep::BaseBranch => {
            let title = if state.step == CreateStep::BaseBranch {
                format!("Base for {}", state.branch_name)
            } else {
                "Branch to check out".to_string()
            };
            out.push(styled(BOLD, title));
            if let Some(picker) = &state.picker {
                picker_lines(picker, out);
            }
            if let Some(branch) = &state.dirty_warning {
                out.push(String::new());
                out.push(format!(
                    "{WARNING_EMOJI} {}",
                    styled(
                        WARNING,
                        format!("{branch} has uncommitted changes; they will not be included. Press y to continue")
                    )
                ));
            }
        }
        CreateStep::Confirm => {
            out.push(format!("Branch: {}", styled(BOLD, &state.branch_name)));
            if let Some(base) = &state.base_branch {
                out.push(format!("From:   {base}"));
            }
            out.push(format!("Path:   {}", format_path_for_display(&state.path)));
            out.push(String::new());
            out.push("Create this worktree? (y/n)".to_string());
        }
        CreateStep::Creating => waiting(model, "Creating worktree", out),
        CreateStep::Complete => {
            if let Some(outcome) = &state.outcome {
                out.push(format!(
                    "{SUCCESS_EMOJI} {}",
                    styled(
                        GREEN,
                        format!(
                            "Created {} at {}",
                            outcome.branch,
                            format_path_for_display(&outcome.path)
                        )
                    )
                ));
                for warning in &outcome.warnings {
                    out.push(format!("{WARNING_EMOJI} {}", styled(WARNING, warning)));
                }
            }
            out.push(String::new());
            out.push(styled(HINT, "enter: back · s: switch to it"));
        }
    }
}

fn delete(state: &DeleteState, model: &Model, out: &mut Vec<String>) {
    match state.step {
        DeleteStep::Selection => {
            let window = model.list_window();
            for (i, wt) in state
                .candidates
                .iter()
                .enumerate()
                .skip(state.scroll)
                .take(window)
            {
                let row = format!("{} {}", checkbox(state.selected.contains(&wt.path)), wt.label());
                out.push(if i == state.cursor { styled(SELECTED, row) } else { row });
            }
        }
        DeleteStep::Confirm => {
            out.push(styled(BOLD, "Delete these worktrees?"));
            for target in state.targets() {
                let branch = target.branch.as_deref().unwrap_or("(detached)");
                out.push(format!(
                    "  {branch} {}",
                    styled(GRAY, format_path_for_display(&target.path))
                ));
            }
            out.push(String::new());
            out.push(format!("{} force delete", checkbox(state.force_delete)));
        }
        DeleteStep::Deleting => waiting(model, "Deleting", out),
        DeleteStep::Complete => {
            for result in &state.results {
                let branch = result.target.branch.as_deref().unwrap_or("(detached)");
                out.push(match &result.outcome {
                    Ok(()) => format!("{} {branch}", styled(GREEN, "✓")),
                    Err(failure) => format!(
                        "{} {branch}: {}",
                        styled(ERROR, "✗"),
                        styled(ERROR, failure.reason)
                    ),
                });
            }
        }
    }
}

/// Progress line for a running cleanup; the total counts only checked worktrees.
pub fn cleanup_progress(state: &CleanupState) -> String {
    let (done, total) = state.progress();
    format!("Cleaning up {done}/{total}")
}

fn cleanup(state: &CleanupState, model: &Model, out: &mut Vec<String>) {
    if state.step == CleanupStep::Summary {
        out.push(format!(
            "{ERROR_EMOJI} {}",
            styled(
                ERROR,
                format!(
                    "Removed {} of {} worktree(s); these failed:",
                    state.total_cleaned,
                    state.selected.len()
                )
            )
        ));
        for (wt, reason) in state.failures() {
            out.push(format!("  {} {}", wt.label(), styled(ERROR, reason)));
        }
        return;
    }

    if state.step == CleanupStep::Running {
        out.push(format!("{} {}", styled(CYAN, spinner(model)), cleanup_progress(state)));
    } else {
        out.push(styled(GRAY, format!("{} selected", state.selected.len())));
    }
    let force = format!("{} force delete", checkbox(state.force_delete));
    out.push(if state.cursor == FORCE_ROW { styled(SELECTED, force) } else { force });
    out.push(String::new());

    for (i, wt) in state
        .stale_worktrees
        .iter()
        .enumerate()
        .skip(state.scroll)
        .take(model.list_window())
    {
        let mark = if state.deleted.contains(&i) {
            styled(GREEN, " ✓ ")
        } else if let Some(reason) = state.failed.get(&i) {
            styled(ERROR, format!(" ✗ {reason}"))
        } else if state.current_index == Some(i) {
            styled(CYAN, format!(" {} ", spinner(model)))
        } else {
            checkbox(state.selected.contains(&i)).to_string()
        };
        let reason = wt.stale_reason.map(|r| r.describe()).unwrap_or_default();
        let row = format!("{mark} {} {}", pad_to_width(wt.label(), 24), styled(GRAY, reason));
        let highlighted = usize::try_from(state.cursor).is_ok_and(|c| c == i);
        out.push(if highlighted { styled(SELECTED, row) } else { row });
    }
}

fn compare(state: &CompareState, model: &Model, out: &mut Vec<String>) {
    match &state.step {
        CompareStep::LoadingBranches => waiting(model, "Loading branches", out),
        CompareStep::PickBase(picker) => {
            out.push(styled(BOLD, format!("Compare {} against", state.head)));
            picker_lines(picker, out);
        }
        CompareStep::Loading { .. } => waiting(model, "Comparing", out),
        CompareStep::Result { comparison, scroll } => {
            out.extend(
                result_lines(comparison)
                    .into_iter()
                    .skip(*scroll)
                    .take(model.list_window()),
            );
        }
    }
}

fn merge(state: &MergeState, model: &Model, out: &mut Vec<String>) {
    match state.step {
        MergeStep::PickTarget => {
            out.push(styled(BOLD, format!("Merge {} into", state.source)));
            picker_lines(&state.picker, out);
        }
        MergeStep::Options => {
            out.push(styled(BOLD, format!("Merge {} into {}", state.source, state.target)));
            for (i, option) in MergeOption::iter().enumerate() {
                let disabled = option == MergeOption::RemoveWorktree && !state.can_remove;
                let mut row = format!("{} {option}", checkbox(state.option_enabled(option)));
                if disabled {
                    row = styled(HINT, row);
                }
                out.push(if i == state.option_cursor { styled(SELECTED, row) } else { row });
            }
        }
        MergeStep::Confirm => {
            out.push(format!(
                "Merge {} into {}{}?",
                styled(BOLD, &state.source),
                styled(BOLD, &state.target),
                if state.squash { " as one commit" } else { "" }
            ));
            if state.remove_after {
                out.push(format!(
                    "then remove {}",
                    format_path_for_display(&state.source_path)
                ));
            }
            out.push("(y/n)".to_string());
        }
        MergeStep::Merging => waiting(model, "Merging", out),
        MergeStep::Complete => {
            let Some(report) = &state.report else {
                return;
            };
            out.push(format!(
                "{SUCCESS_EMOJI} {}",
                styled(GREEN, format!("Merged {} into {}", state.source, state.target))
            ));
            out.extend(report.outcome.summary.lines().map(|l| styled(GRAY, l)));
            match &report.removal {
                Some(Ok(())) => out.push(styled(GREEN, "Removed the merged worktree")),
                Some(Err(e)) => out.push(format!(
                    "{WARNING_EMOJI} {}",
                    styled(WARNING, format!("Worktree kept: {e}"))
                )),
                None => {}
            }
        }
    }
}

fn for_each(state: &ForEachState, model: &Model, out: &mut Vec<String>) {
    match state.step {
        ForEachStep::Input => out.push(input_line("Command", &state.input)),
        ForEachStep::Running => waiting(model, &format!("Running {}", state.input.value()), out),
        ForEachStep::Results => {
            out.push(styled(
                GRAY,
                format!(
                    "{} succeeded, {} failed",
                    state.results.len() - state.failures(),
                    state.failures()
                ),
            ));
            for (i, result) in state
                .results
                .iter()
                .enumerate()
                .skip(state.scroll)
                .take(model.list_window())
            {
                let mark = if result.success {
                    styled(GREEN, "✓")
                } else {
                    styled(ERROR, "✗")
                };
                let row = format!("{mark} {}", styled(BOLD, &result.label));
                out.push(if i == state.cursor { styled(SELECTED, row) } else { row });
                if i == state.cursor {
                    out.extend(result.output.lines().map(|line| format!("    {line}")));
                }
            }
        }
    }
}

fn step_commit(state: &StepCommitState, model: &Model, out: &mut Vec<String>) {
    out.push(styled(GRAY, format!("Commit all changes in {}", state.label)));
    match state.step {
        CommitStep::Message => {
            out.push(input_line("Message", &state.input));
            if let Some(body) = &state.body {
                out.extend(body.lines().map(|line| styled(GRAY, format!("  {line}"))));
            }
            if let Some(error) = &state.error {
                out.push(styled(ERROR, error));
            }
        }
        CommitStep::Generating => waiting(model, "Generating message", out),
        CommitStep::Committing => waiting(model, "Committing", out),
        CommitStep::Complete => {
            if let Some(summary) = &state.summary {
                out.push(format!("{SUCCESS_EMOJI} {}", styled(GREEN, summary)));
            }
        }
    }
}

fn tools(state: &ToolsState, model: &Model, out: &mut Vec<String>) {
    if let Some(item) = state.running {
        return waiting(model, &item.to_string(), out);
    }
    if let Some(lines) = &state.result {
        out.extend(lines.iter().cloned());
        return;
    }
    for (i, item) in ToolItem::iter().enumerate() {
        let row = format!("  {item}");
        out.push(if i == state.cursor { styled(SELECTED, row) } else { row });
    }
}

fn config(state: &ConfigState, out: &mut Vec<String>) {
    for (key, value) in state.rows() {
        out.push(format!("{} {value}", styled(BOLD, pad_to_width(key, 14))));
    }
    if state.loading {
        out.push(styled(HINT, "reloading…"));
    }
}

fn settings(state: &SettingsState, out: &mut Vec<String>) {
    for (i, item) in SettingItem::iter().enumerate() {
        let row = format!("{} {item}", checkbox(state.value(item)));
        out.push(if i == state.cursor { styled(SELECTED, row) } else { row });
    }
}

fn init(state: &InitState, model: &Model, out: &mut Vec<String>) {
    match state.step {
        InitStep::Welcome => {
            out.push(styled(BOLD, "Welcome to arbor"));
            out.push("No configuration file was found. Choose where new worktrees go.".to_string());
            out.push(styled(HINT, "enter: continue · esc: skip"));
        }
        InitStep::WorktreeDir => {
            out.push(input_line("Worktree directory", &state.input));
            out.push(styled(GRAY, format!("e.g. {}", state.preview(model))));
            out.push(styled(HINT, "{repo} and {branch} are replaced; the path is relative to the repository"));
            if let Some(error) = &state.error {
                out.push(styled(ERROR, error));
            }
        }
        InitStep::Confirm => {
            out.push(format!("worktree-dir = {}", styled(BOLD, &state.config.worktree_dir)));
            out.push("Save this configuration? (y/n)".to_string());
            if let Some(error) = &state.error {
                out.push(styled(ERROR, error));
            }
        }
        InitStep::Saving => waiting(model, "Saving", out),
        InitStep::Done => {
            let path = state
                .saved_to
                .as_deref()
                .map(format_path_for_display)
                .unwrap_or_default();
            out.push(format!("{SUCCESS_EMOJI} {}", styled(GREEN, format!("Saved {path}"))));
        }
    }
}
