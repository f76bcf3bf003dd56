//! Shell directives: instructions for the parent shell to run after arbor exits.
//!
//! A process cannot change its parent's working directory, so "switch to this
//! worktree" is expressed as a line of shell (`cd '/path'`) that a wrapper
//! function evaluates. The wrapper passes `--directive-file`; without it the
//! directive is printed once the terminal has been restored.

use std::path::{Path, PathBuf};

use anyhow::Context;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub path: PathBuf,
    /// Command to run after changing directory, already shell-quoted
    pub command: Option<String>,
}

impl Directive {
    pub fn cd(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            command: None,
        }
    }

    pub fn cd_and_run(path: impl Into<PathBuf>, command: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            command: Some(command.into()),
        }
    }

    pub fn render(&self) -> String {
        let path = self.path.to_string_lossy();
        let mut script = format!("cd {}", shell_escape::escape(path));
        if let Some(command) = &self.command {
            script.push_str(" && ");
            script.push_str(command);
        }
        script
    }
}

/// Where directives go.
#[derive(Debug, Clone, Default)]
pub struct DirectiveWriter {
    file: Option<PathBuf>,
}

impl DirectiveWriter {
    pub fn new(file: Option<PathBuf>) -> Self {
        Self { file }
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Write the directive file, or hand back the text to print after exit.
    pub fn write(&self, directive: &Directive) -> anyhow::Result<Option<String>> {
        let script = directive.render();
        match &self.file {
            Some(file) => {
                std::fs::write(file, format!("{script}\n"))
                    .with_context(|| format!("Failed to write directive to {}", file.display()))?;
                log::debug!("Wrote directive to {}: {script}", file.display());
                Ok(None)
            }
            None => Ok(Some(script)),
        }
    }
}
