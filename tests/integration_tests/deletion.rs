use arbor::app::deletion::{
    DeletionTarget, FailureReason, delete_target, delete_worktree, sweep_external_symlinks,
};
use arbor::git::Repository;
use arbor::registry::Snapshot;
use rstest::rstest;

use crate::common::{TestRepo, repo};

fn target(path: &std::path::Path, branch: &str) -> DeletionTarget {
    DeletionTarget {
        path: path.to_path_buf(),
        branch: Some(branch.to_string()),
    }
}

#[rstest]
fn test_deleted_worktree_disappears_after_refresh(repo: TestRepo) {
    let feature = repo.add_worktree("feature/done");
    let git = Repository::at(repo.root_path());
    assert!(Snapshot::load(&git).unwrap().find(&feature).is_some());

    delete_worktree(&git, &feature, false).unwrap();

    assert!(!feature.exists());
    let snapshot = Snapshot::load(&git).unwrap();
    assert!(snapshot.find(&feature).is_none());
    assert_eq!(snapshot.worktrees.len(), 1);
    // The branch itself is kept
    repo.run_git(&["rev-parse", "--verify", "refs/heads/feature/done"]);
}

#[rstest]
fn test_dirty_worktree_needs_force(repo: TestRepo) {
    let feature = repo.add_worktree("feature/wip");
    std::fs::write(feature.join("draft.txt"), "unsaved").unwrap();
    let git = Repository::at(repo.root_path());

    let result = delete_target(&git, target(&feature, "feature/wip"), false);
    let failure = result.outcome.unwrap_err();
    assert_eq!(failure.reason, FailureReason::UncommittedChanges);
    assert!(failure.detail.contains("modified or untracked files"));
    assert!(feature.join("draft.txt").exists());

    let result = delete_target(&git, target(&feature, "feature/wip"), true);
    assert_eq!(result.outcome, Ok(()));
    assert_eq!(result.target.branch.as_deref(), Some("feature/wip"));
    assert!(!feature.exists());
}

#[rstest]
fn test_plain_directory_is_not_a_worktree(repo: TestRepo) {
    let stray = repo.worktree_path("stray");
    std::fs::create_dir_all(&stray).unwrap();
    let git = Repository::at(repo.root_path());

    let result = delete_target(&git, target(&stray, "stray"), false);
    assert_eq!(
        result.outcome.unwrap_err().reason,
        FailureReason::NotAWorktree
    );
    assert!(stray.exists());
}

#[cfg(unix)]
#[rstest]
fn test_sweep_removes_only_external_links(repo: TestRepo) {
    use std::os::unix::fs::symlink;

    let feature = repo.add_worktree("feature/links");
    let shared = repo.worktree_path("shared-cache");
    std::fs::create_dir_all(&shared).unwrap();
    std::fs::write(shared.join("data.bin"), "keep me").unwrap();
    std::fs::write(feature.join("local.txt"), "inside").unwrap();

    symlink(&shared, feature.join("cache")).unwrap();
    symlink("local.txt", feature.join("alias.txt")).unwrap();

    let removed = sweep_external_symlinks(&feature);
    assert_eq!(removed, vec![feature.join("cache")]);
    assert!(feature.join("alias.txt").exists());
    // Only the link goes, never what it points at
    assert!(shared.join("data.bin").exists());
}

#[cfg(unix)]
#[rstest]
fn test_external_link_does_not_block_deletion(repo: TestRepo) {
    let feature = repo.add_worktree("feature/linked");
    let shared = repo.worktree_path("shared-node-modules");
    std::fs::create_dir_all(&shared).unwrap();
    std::fs::write(shared.join("pkg.json"), "{}").unwrap();
    std::os::unix::fs::symlink(&shared, feature.join("node_modules")).unwrap();

    let git = Repository::at(repo.root_path());
    delete_worktree(&git, &feature, false).unwrap();

    assert!(!feature.exists());
    assert!(shared.join("pkg.json").exists());
}

#[rstest]
fn test_sweep_of_missing_directory_is_empty(repo: TestRepo) {
    assert!(sweep_external_symlinks(&repo.worktree_path("nowhere")).is_empty());
}
