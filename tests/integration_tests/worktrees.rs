use arbor::git::{CreateRequest, GitBackend, Repository};
use arbor::registry::{Snapshot, StaleReason};
use rstest::rstest;

use crate::common::{TestRepo, repo};

#[rstest]
fn test_snapshot_lists_primary_and_linked(repo: TestRepo) {
    let feature = repo.add_worktree("feature/auth");

    let snapshot = Snapshot::load(&Repository::at(repo.root_path())).unwrap();
    assert_eq!(snapshot.default_branch, "main");
    assert_eq!(snapshot.repo_root, repo.root_path());
    assert_eq!(snapshot.worktrees.len(), 2);

    let main = &snapshot.worktrees[0];
    assert_eq!(main.branch.as_deref(), Some("main"));
    assert!(main.is_main);
    assert!(main.is_current);
    assert_eq!(main.stale_reason, None);

    let linked = snapshot.find_branch("feature/auth").unwrap();
    assert_eq!(linked.path, feature);
    assert_eq!(linked.name, "feature-auth");
    assert!(!linked.is_main);
    assert!(!linked.is_current);
    // A fresh branch has nothing of its own yet
    assert_eq!(linked.unique_commits, Some(0));
    assert_eq!(linked.stale_reason, Some(StaleReason::NoUniqueCommits));
}

#[rstest]
fn test_status_counts_and_unique_commits(repo: TestRepo) {
    let feature = repo.add_worktree("feature/auth");
    repo.commit_in(&feature, "auth.rs", "fn login() {}", "Add login");
    std::fs::write(feature.join("notes.txt"), "scratch").unwrap();
    std::fs::write(feature.join("auth.rs"), "fn login() { todo!() }").unwrap();

    let snapshot = Snapshot::load(&Repository::at(repo.root_path())).unwrap();
    let linked = snapshot.find_branch("feature/auth").unwrap();
    assert_eq!(linked.unique_commits, Some(1));
    assert_eq!(linked.untracked, 1);
    assert_eq!(linked.modified, 1);
    assert_eq!(linked.staged, 0);
    assert!(!linked.is_clean());
    assert_eq!(linked.stale_reason, None);
}

#[rstest]
fn test_current_worktree_follows_working_directory(repo: TestRepo) {
    let feature = repo.add_worktree("feature/auth");

    let snapshot = Snapshot::load(&Repository::at(&feature)).unwrap();
    let current = snapshot.current().unwrap();
    assert_eq!(current.branch.as_deref(), Some("feature/auth"));
    // The current worktree is never offered for cleanup
    assert_eq!(current.stale_reason, None);
    assert!(!snapshot.find_branch("main").unwrap().is_current);
    assert_eq!(snapshot.repo_root, repo.root_path());
}

#[rstest]
fn test_created_worktree_appears_after_refresh(repo: TestRepo) {
    let git = Repository::at(repo.root_path());
    let path = repo.worktree_path("feature/new");

    let outcome = git
        .create_worktree(&CreateRequest {
            branch: "feature/new".into(),
            base: Some("main".into()),
            new_branch: true,
            path: path.clone(),
        })
        .unwrap();
    assert_eq!(outcome.path, path);
    assert_eq!(outcome.branch, "feature/new");
    assert!(outcome.warnings.is_empty());

    let snapshot = Snapshot::load(&git).unwrap();
    let created = snapshot.find(&path).unwrap();
    assert_eq!(created.branch.as_deref(), Some("feature/new"));
}

#[rstest]
fn test_create_from_existing_branch(repo: TestRepo) {
    repo.run_git(&["branch", "topic"]);
    let git = Repository::at(repo.root_path());
    let path = repo.worktree_path("topic");

    git.create_worktree(&CreateRequest {
        branch: "topic".into(),
        base: None,
        new_branch: false,
        path: path.clone(),
    })
    .unwrap();

    let head = repo.run_git_in(&path, &["branch", "--show-current"]);
    assert_eq!(head.trim(), "topic");
}

#[rstest]
fn test_create_rejects_existing_branch_and_path(repo: TestRepo) {
    let existing = repo.add_worktree("feature/auth");
    let git = Repository::at(repo.root_path());

    let taken_branch = git.create_worktree(&CreateRequest {
        branch: "feature/auth".into(),
        base: Some("main".into()),
        new_branch: true,
        path: repo.worktree_path("elsewhere"),
    });
    assert!(taken_branch.is_err());
    assert!(!repo.worktree_path("elsewhere").exists());

    let taken_path = git.create_worktree(&CreateRequest {
        branch: "feature/other".into(),
        base: Some("main".into()),
        new_branch: true,
        path: existing,
    });
    assert!(taken_path.is_err());
    assert_eq!(Snapshot::load(&git).unwrap().worktrees.len(), 2);
}

#[rstest]
fn test_prune_reports_missing_worktrees(repo: TestRepo) {
    let gone = repo.add_worktree("feature/gone");
    std::fs::remove_dir_all(&gone).unwrap();
    let git = Repository::at(repo.root_path());

    assert_eq!(git.prune_worktrees().unwrap(), vec![gone]);
    assert!(git.prune_worktrees().unwrap().is_empty());
    assert_eq!(Snapshot::load(&git).unwrap().worktrees.len(), 1);
}

#[rstest]
fn test_run_in_captures_output_and_status(repo: TestRepo) {
    let git = Repository::at(repo.root_path());

    let ok = git.run_in(repo.root_path(), "echo hello").unwrap();
    assert!(ok.success);
    assert_eq!(ok.output, "hello");

    let failed = git.run_in(repo.root_path(), "echo oops >&2; exit 3").unwrap();
    assert!(!failed.success);
    assert_eq!(failed.output, "oops");
}
