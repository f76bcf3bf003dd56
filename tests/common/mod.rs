//! Throw-away git repositories for integration tests.

use std::path::{Path, PathBuf};
use std::process::Command;

use rstest::fixture;
use tempfile::TempDir;

pub struct TestRepo {
    // Held for its Drop; every path below lives inside it.
    _temp_dir: TempDir,
    root: PathBuf,
    worktrees_dir: PathBuf,
}

impl TestRepo {
    /// An empty repository on `main` with a local identity.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        // Canonical so paths compare equal to what git reports
        let base = dunce::canonicalize(temp_dir.path()).unwrap();
        let root = base.join("repo");
        std::fs::create_dir(&root).unwrap();

        let repo = Self {
            _temp_dir: temp_dir,
            worktrees_dir: base.join("repo.worktrees"),
            root,
        };
        repo.run_git(&["init", "--quiet", "--initial-branch=main"]);
        repo.run_git(&["config", "user.name", "Test User"]);
        repo.run_git(&["config", "user.email", "test@example.com"]);
        repo.run_git(&["config", "commit.gpgsign", "false"]);
        repo
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Where `add_worktree` puts the worktree for `branch`.
    pub fn worktree_path(&self, branch: &str) -> PathBuf {
        self.worktrees_dir.join(branch.replace('/', "-"))
    }

    pub fn git_command(&self, dir: &Path) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(dir)
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("GIT_TERMINAL_PROMPT", "0")
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE");
        cmd
    }

    pub fn run_git_in(&self, dir: &Path, args: &[&str]) -> String {
        let output = self.git_command(dir).args(args).output().unwrap();
        assert!(
            output.status.success(),
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    pub fn run_git(&self, args: &[&str]) -> String {
        self.run_git_in(&self.root, args)
    }

    /// Write `file` in `dir` and commit it.
    pub fn commit_in(&self, dir: &Path, file: &str, contents: &str, message: &str) {
        std::fs::write(dir.join(file), contents).unwrap();
        self.run_git_in(dir, &["add", file]);
        self.run_git_in(dir, &["commit", "--quiet", "-m", message]);
    }

    pub fn commit(&self, message: &str) {
        let file = format!("{}.txt", message.to_lowercase().replace(' ', "-"));
        self.commit_in(&self.root, &file, message, message);
    }

    /// Add a worktree on a new branch off `main`.
    pub fn add_worktree(&self, branch: &str) -> PathBuf {
        let path = self.worktree_path(branch);
        self.run_git(&[
            "worktree",
            "add",
            "--quiet",
            "-b",
            branch,
            &path.to_string_lossy(),
            "main",
        ]);
        path
    }
}

#[fixture]
pub fn repo() -> TestRepo {
    let repo = TestRepo::new();
    repo.commit("Initial commit");
    repo
}
