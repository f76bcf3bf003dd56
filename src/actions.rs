//! "Open in…" targets for a worktree.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, bail};

/// How an action is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Detached GUI program; receives the worktree path as its last argument.
    Gui,
    /// Terminal emulator started with the worktree as its working directory.
    Terminal,
    /// Program that needs this terminal; handed to the shell after exit.
    Shell,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub kind: ActionKind,
    pub available: bool,
}

impl Action {
    fn new(name: &str, command: &str, args: &[&str], kind: ActionKind) -> Self {
        Self {
            name: name.to_string(),
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            kind,
            available: false,
        }
    }

    /// Shell command line for [`ActionKind::Shell`] actions.
    pub fn shell_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .chain(std::iter::once("."))
            .map(|part| shell_escape::escape(part.into()).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub trait ActionResolver: Send + Sync {
    /// Actions usable for `path`, limited to those installed on this host.
    fn resolve(&self, path: &Path) -> Vec<Action>;

    fn execute(&self, action: &Action, path: &Path) -> anyhow::Result<()>;
}

/// Resolves the user's editor plus a fixed catalog of common tools.
#[derive(Debug, Default)]
pub struct SystemActionResolver;

impl SystemActionResolver {
    fn catalog() -> Vec<Action> {
        let mut catalog = vec![
            Action::new("VS Code", "code", &[], ActionKind::Gui),
            Action::new("Cursor", "cursor", &[], ActionKind::Gui),
            Action::new("Zed", "zed", &[], ActionKind::Gui),
        ];

        #[cfg(target_os = "macos")]
        {
            catalog.push(Action::new("Finder", "open", &[], ActionKind::Gui));
            catalog.push(Action::new("Terminal", "open", &["-a", "Terminal"], ActionKind::Gui));
        }
        #[cfg(windows)]
        {
            catalog.push(Action::new("Explorer", "explorer", &[], ActionKind::Gui));
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            catalog.push(Action::new("File manager", "xdg-open", &[], ActionKind::Gui));
            if let Some(terminal) = ["x-terminal-emulator", "gnome-terminal", "konsole", "kitty", "alacritty", "wezterm"]
                .into_iter()
                .find(|t| which::which(t).is_ok())
            {
                catalog.push(Action::new("Terminal", terminal, &[], ActionKind::Terminal));
            }
        }

        catalog
    }

    /// `$VISUAL`, then `$EDITOR`, split into program and arguments.
    fn editor_from_env() -> Option<Action> {
        let (var, value) = ["VISUAL", "EDITOR"]
            .into_iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()).map(|v| (var, v)))?;
        editor_action(var, &value)
    }
}

/// Build the editor action from an environment value such as `code --wait`.
pub(crate) fn editor_action(var: &str, value: &str) -> Option<Action> {
    let mut parts = shlex::split(value)?;
    if parts.is_empty() {
        return None;
    }
    let command = parts.remove(0);
    let program = Path::new(&command)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| command.clone());
    let kind = if is_terminal_editor(&program) {
        ActionKind::Shell
    } else {
        ActionKind::Gui
    };
    Some(Action {
        name: format!("Editor (${var}: {program})"),
        command,
        args: parts,
        kind,
        available: false,
    })
}

fn is_terminal_editor(program: &str) -> bool {
    matches!(
        program,
        "vi" | "vim" | "nvim" | "nano" | "emacs" | "hx" | "helix" | "micro" | "kak" | "ed"
    )
}

impl ActionResolver for SystemActionResolver {
    fn resolve(&self, _path: &Path) -> Vec<Action> {
        Self::editor_from_env()
            .into_iter()
            .chain(Self::catalog())
            .map(|mut action| {
                action.available = which::which(&action.command).is_ok();
                action
            })
            .filter(|action| action.available)
            .collect()
    }

    fn execute(&self, action: &Action, path: &Path) -> anyhow::Result<()> {
        log::debug!("Launching {} for {}", action.name, path.display());
        let mut cmd = Command::new(&action.command);
        cmd.args(&action.args)
            .current_dir(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        match action.kind {
            ActionKind::Gui => {
                cmd.arg(path);
            }
            ActionKind::Terminal => {}
            ActionKind::Shell => bail!("{} runs in this terminal after exit", action.name),
        }

        cmd.spawn()
            .with_context(|| format!("Failed to launch {}", action.command))?;
        Ok(())
    }
}
