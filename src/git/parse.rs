//! Parsers for git's porcelain output.

use std::path::PathBuf;

use super::{GitError, WorkingTreeCounts, WorktreeInfo};

/// Parse `git worktree list --porcelain`.
///
/// Records are separated by blank lines; each starts with a `worktree` line.
pub(crate) fn parse_worktree_list(output: &str) -> Result<Vec<WorktreeInfo>, GitError> {
    let mut worktrees = Vec::new();
    let mut current: Option<WorktreeInfo> = None;

    for line in output.lines() {
        if line.is_empty() {
            if let Some(wt) = current.take() {
                worktrees.push(wt);
            }
            continue;
        }

        let (key, value) = match line.split_once(' ') {
            Some((key, value)) => (key, Some(value)),
            None => (line, None),
        };

        if key == "worktree" {
            let Some(path) = value else {
                return Err(GitError::ParseError {
                    message: "worktree line without a path".to_string(),
                });
            };
            if let Some(wt) = current.take() {
                worktrees.push(wt);
            }
            current = Some(WorktreeInfo {
                path: PathBuf::from(path),
                head: String::new(),
                branch: None,
                bare: false,
                detached: false,
                locked: None,
                prunable: None,
            });
            continue;
        }

        let Some(wt) = current.as_mut() else {
            return Err(GitError::ParseError {
                message: format!("unexpected line before first worktree: {line}"),
            });
        };

        match key {
            "HEAD" => wt.head = value.unwrap_or_default().to_string(),
            "branch" => {
                let branch_ref = value.unwrap_or_default();
                let branch = branch_ref.strip_prefix("refs/heads/").unwrap_or(branch_ref);
                wt.branch = Some(branch.to_string());
            }
            "bare" => wt.bare = true,
            "detached" => wt.detached = true,
            "locked" => wt.locked = Some(value.unwrap_or_default().to_string()),
            "prunable" => wt.prunable = Some(value.unwrap_or_default().to_string()),
            _ => {}
        }
    }

    if let Some(wt) = current.take() {
        worktrees.push(wt);
    }

    Ok(worktrees)
}

/// Count staged, modified, and untracked entries in `git status --porcelain`.
///
/// A path staged and then modified again counts once in each bucket.
pub(crate) fn parse_status_counts(output: &str) -> WorkingTreeCounts {
    let mut counts = WorkingTreeCounts::default();

    for line in output.lines() {
        let bytes = line.as_bytes();
        if bytes.len() < 2 {
            continue;
        }
        let index_status = bytes[0] as char;
        let worktree_status = bytes[1] as char;

        if index_status == '?' && worktree_status == '?' {
            counts.untracked += 1;
            continue;
        }
        if index_status == '!' {
            continue;
        }
        if index_status != ' ' {
            counts.staged += 1;
        }
        if worktree_status != ' ' {
            counts.modified += 1;
        }
    }

    counts
}

/// Parse a `git rev-list --count` result.
pub(crate) fn parse_count(output: &str) -> Result<usize, GitError> {
    output
        .trim()
        .parse()
        .map_err(|_| GitError::ParseError {
            message: format!("expected a commit count, got {:?}", output.trim()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_worktree_list() {
        let output = "worktree /repo\n\
HEAD 1111111111111111111111111111111111111111\n\
branch refs/heads/main\n\
\n\
worktree /repo.worktrees/feature-x\n\
HEAD 2222222222222222222222222222222222222222\n\
branch refs/heads/feature/x\n\
locked\n\
\n\
worktree /repo.worktrees/gone\n\
HEAD 3333333333333333333333333333333333333333\n\
detached\n\
prunable gitdir file points to non-existent location\n";

        let worktrees = parse_worktree_list(output).unwrap();
        assert_eq!(worktrees.len(), 3);

        assert_eq!(worktrees[0].path, PathBuf::from("/repo"));
        assert_eq!(worktrees[0].branch.as_deref(), Some("main"));
        assert!(!worktrees[0].detached);

        assert_eq!(worktrees[1].branch.as_deref(), Some("feature/x"));
        assert_eq!(worktrees[1].locked.as_deref(), Some(""));

        assert!(worktrees[2].detached);
        assert_eq!(worktrees[2].branch, None);
        assert_eq!(
            worktrees[2].prunable.as_deref(),
            Some("gitdir file points to non-existent location")
        );
    }

    #[test]
    fn test_parse_worktree_list_bare_and_spaces() {
        let output = "worktree /srv/my repo.git\nbare\n\nworktree /srv/my repo/main\nHEAD abc\nbranch refs/heads/main\n";
        let worktrees = parse_worktree_list(output).unwrap();
        assert_eq!(worktrees.len(), 2);
        assert!(worktrees[0].bare);
        assert_eq!(worktrees[1].path, PathBuf::from("/srv/my repo/main"));
    }

    #[test]
    fn test_parse_worktree_list_rejects_orphan_lines() {
        let err = parse_worktree_list("HEAD abc\n").unwrap_err();
        assert!(matches!(err, GitError::ParseError { .. }));
    }

    #[test]
    fn test_parse_status_counts() {
        let output = "M  staged.rs\n M modified.rs\nMM both.rs\nA  added.rs\n?? new.txt\n?? other.txt\nR  old.rs -> new.rs\n";
        let counts = parse_status_counts(output);
        assert_eq!(
            counts,
            WorkingTreeCounts {
                staged: 4,
                modified: 2,
                untracked: 2,
            }
        );
    }

    #[test]
    fn test_parse_status_counts_clean() {
        assert!(parse_status_counts("").is_clean());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("3\n").unwrap(), 3);
        assert!(parse_count("abc").is_err());
    }
}
