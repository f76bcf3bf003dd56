use arbor::git::{GitBackend, MergeRequest, Repository};
use arbor::registry::{Snapshot, StaleReason};
use rstest::rstest;

use crate::common::{TestRepo, repo};

fn merge_request(source: &str, squash: bool, message: Option<&str>) -> MergeRequest {
    MergeRequest {
        source: source.to_string(),
        target: "main".to_string(),
        squash,
        message: message.map(str::to_string),
    }
}

#[rstest]
fn test_list_branches_marks_worktrees(repo: TestRepo) {
    let feature = repo.add_worktree("feature/auth");
    std::fs::write(feature.join("wip.txt"), "dirty").unwrap();
    repo.run_git(&["branch", "spare"]);

    let branches = Repository::at(repo.root_path()).list_branches().unwrap();
    let mut names: Vec<&str> = branches.iter().map(|b| b.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["feature/auth", "main", "spare"]);

    let find = |name: &str| branches.iter().find(|b| b.name == name).unwrap();
    assert!(find("main").is_current);
    assert_eq!(find("feature/auth").worktree_path.as_deref(), Some(feature.as_path()));
    assert!(!find("feature/auth").is_clean);
    assert_eq!(find("spare").worktree_path, None);
    assert!(find("spare").is_clean);
}

#[rstest]
fn test_compare_lists_commits_and_diffstat(repo: TestRepo) {
    let feature = repo.add_worktree("feature/auth");
    repo.commit_in(&feature, "auth.rs", "fn login() {}\n", "Add login");
    repo.commit_in(&feature, "session.rs", "fn logout() {}\n", "Add logout");

    let comparison = Repository::at(repo.root_path())
        .compare("main", "feature/auth")
        .unwrap();
    assert_eq!(comparison.base, "main");
    assert_eq!(comparison.head, "feature/auth");
    assert_eq!(comparison.commits.len(), 2);
    assert!(comparison.commits[0].ends_with("Add logout"));
    assert!(comparison.commits[1].ends_with("Add login"));
    assert!(comparison.diffstat.iter().any(|l| l.contains("auth.rs")));
    assert!(comparison.diffstat.last().unwrap().contains("2 files changed"));
}

#[rstest]
fn test_merge_makes_source_stale(repo: TestRepo) {
    let feature = repo.add_worktree("feature/auth");
    repo.commit_in(&feature, "auth.rs", "fn login() {}\n", "Add login");
    let git = Repository::at(repo.root_path());

    let before = Snapshot::load(&git).unwrap();
    assert_eq!(before.find_branch("feature/auth").unwrap().stale_reason, None);

    let outcome = git.merge(&merge_request("feature/auth", false, None)).unwrap();
    assert_eq!(outcome.target_path, repo.root_path());
    assert!(repo.root_path().join("auth.rs").exists());

    let after = Snapshot::load(&git).unwrap();
    assert_eq!(
        after.find_branch("feature/auth").unwrap().stale_reason,
        Some(StaleReason::NoUniqueCommits)
    );
}

#[rstest]
fn test_squash_merge_uses_message(repo: TestRepo) {
    let feature = repo.add_worktree("feature/auth");
    repo.commit_in(&feature, "auth.rs", "fn login() {}\n", "Add login");
    repo.commit_in(&feature, "session.rs", "fn logout() {}\n", "Add logout");
    let git = Repository::at(repo.root_path());

    let outcome = git
        .merge(&merge_request("feature/auth", true, Some("Add authentication")))
        .unwrap();
    assert_eq!(outcome.summary, "Squashed feature/auth into main");

    let subject = repo.run_git(&["log", "-1", "--format=%s"]);
    assert_eq!(subject.trim(), "Add authentication");
    let parents = repo.run_git(&["log", "-1", "--format=%p"]);
    assert_eq!(parents.split_whitespace().count(), 1);
}

#[rstest]
fn test_conflicting_merge_is_aborted(repo: TestRepo) {
    let feature = repo.add_worktree("feature/conflict");
    repo.commit_in(&feature, "shared.txt", "from feature\n", "Feature edit");
    repo.commit_in(repo.root_path(), "shared.txt", "from main\n", "Main edit");
    let git = Repository::at(repo.root_path());

    let err = git
        .merge(&merge_request("feature/conflict", false, None))
        .unwrap_err();
    assert!(format!("{err:#}").contains("feature/conflict"));

    // The target worktree is left as it was
    let status = repo.run_git(&["status", "--porcelain"]);
    assert_eq!(status, "");
    let contents = std::fs::read_to_string(repo.root_path().join("shared.txt")).unwrap();
    assert_eq!(contents, "from main\n");
}

#[rstest]
fn test_merge_needs_target_worktree(repo: TestRepo) {
    repo.add_worktree("feature/auth");
    let git = Repository::at(repo.root_path());

    let request = MergeRequest {
        target: "release".to_string(),
        ..merge_request("feature/auth", false, None)
    };
    repo.run_git(&["branch", "release"]);
    assert!(git.merge(&request).is_err());
}

#[rstest]
fn test_commit_all_includes_untracked(repo: TestRepo) {
    let feature = repo.add_worktree("feature/auth");
    std::fs::write(feature.join("auth.rs"), "fn login() {}\n").unwrap();
    let git = Repository::at(repo.root_path());

    let diff = git.diff_for_commit(&feature).unwrap();
    assert!(diff.contains("auth.rs"));

    let summary = git.commit_all(&feature, "Add login").unwrap();
    assert!(summary.ends_with("Add login"));
    assert_eq!(repo.run_git_in(&feature, &["status", "--porcelain"]), "");

    let snapshot = Snapshot::load(&git).unwrap();
    assert_eq!(snapshot.find(&feature).unwrap().unique_commits, Some(1));
}
