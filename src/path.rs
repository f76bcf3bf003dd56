use std::path::{Component, Path, PathBuf};

use normalize_path::NormalizePath;

/// Format a filesystem path for user-facing output.
///
/// When the path lives under the user's home directory, it is shown with a
/// leading `~` (e.g., `/Users/alex/projects/wt` -> `~/projects/wt`). Paths
/// outside home are returned unchanged.
pub fn format_path_for_display(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(stripped) = path.strip_prefix(&home)
    {
        if stripped.as_os_str().is_empty() {
            return "~".to_string();
        }

        let mut display_path = PathBuf::from("~");
        display_path.push(stripped);
        return display_path.display().to_string();
    }

    path.display().to_string()
}

/// Replace path separators in a branch name so it forms a single path segment.
pub fn sanitize_branch_name(branch: &str) -> String {
    branch.replace(['/', '\\'], "-")
}

/// Resolve `relative` against `base` and collapse `.`/`..` components lexically.
///
/// The target usually does not exist yet, so this never touches the filesystem.
pub fn resolve_relative(base: &Path, relative: &str) -> PathBuf {
    base.join(relative).normalize()
}

/// Whether `candidate` lies inside `root` (or is `root` itself).
///
/// Both sides go through [`canonicalize_existing`] so that symlinked temp
/// directories (e.g. `/var` vs `/private/var`) compare equal, even when
/// `candidate` is a dangling target.
pub fn is_within(candidate: &Path, root: &Path) -> bool {
    canonicalize_existing(candidate).starts_with(canonicalize_existing(root))
}

/// Canonicalize the longest existing prefix of `path` and re-attach the rest.
///
/// `.` and `..` are collapsed lexically before anything is resolved.
pub fn canonicalize_existing(path: &Path) -> PathBuf {
    let path = path.normalize();
    let mut missing = Vec::new();
    let mut existing = path.as_path();
    loop {
        if let Ok(canonical) = dunce::canonicalize(existing) {
            return missing.iter().rev().fold(canonical, |acc, name| acc.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return path,
        }
    }
}

/// Absolute target of a symlink, resolved relative to the link's directory.
pub fn resolve_link_target(link: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        return target.normalize();
    }
    let parent = link.parent().unwrap_or_else(|| Path::new("/"));
    parent.join(target).normalize()
}

/// Short name for a worktree directory: its final path component.
pub fn dir_name(path: &Path) -> String {
    path.components()
        .rev()
        .find_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .unwrap_or_else(|| path.display().to_string())
}

/// Path relative to `base` for compact display, falling back to `~` shortening.
pub fn relative_display(path: &Path, base: &Path) -> String {
    match pathdiff::diff_paths(path, base) {
        Some(rel) if !rel.as_os_str().is_empty() && !rel.starts_with("../..") => {
            rel.display().to_string()
        }
        _ => format_path_for_display(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortens_path_under_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };

        let path = home.join("projects").join("wt");
        let formatted = format_path_for_display(&path);

        assert!(
            formatted.starts_with('~'),
            "Expected tilde prefix, got {formatted}"
        );
        assert!(formatted.ends_with("wt"));
    }

    #[test]
    fn shows_home_as_tilde() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(format_path_for_display(&home), "~");
    }

    #[test]
    fn leaves_non_home_paths_unchanged() {
        let path = PathBuf::from("/tmp/arbor-non-home-path");
        assert_eq!(format_path_for_display(&path), path.display().to_string());
    }

    #[test]
    fn sanitizes_branch_separators() {
        assert_eq!(sanitize_branch_name("feature/sub/task"), "feature-sub-task");
        assert_eq!(sanitize_branch_name("feature\\foo"), "feature-foo");
        assert_eq!(sanitize_branch_name("main"), "main");
    }

    #[test]
    fn resolves_parent_components() {
        let resolved = resolve_relative(Path::new("/src/app"), "../app.worktrees/feature");
        assert_eq!(resolved, PathBuf::from("/src/app.worktrees/feature"));
    }

    #[test]
    fn resolves_relative_link_targets() {
        let link = Path::new("/wt/feature/node_modules");
        assert_eq!(
            resolve_link_target(link, Path::new("../../main/node_modules")),
            PathBuf::from("/main/node_modules")
        );
        assert_eq!(
            resolve_link_target(link, Path::new("/opt/cache")),
            PathBuf::from("/opt/cache")
        );
    }

    #[test]
    fn within_checks_prefix_components() {
        assert!(is_within(Path::new("/wt/feature/src"), Path::new("/wt/feature")));
        assert!(!is_within(Path::new("/wt/feature-2"), Path::new("/wt/feature")));
        assert!(!is_within(Path::new("/main/cache"), Path::new("/wt/feature")));
    }

    #[test]
    fn canonicalizes_up_to_first_missing_component() {
        let dir = tempfile::tempdir().unwrap();
        let real = dunce::canonicalize(dir.path()).unwrap();
        assert_eq!(
            canonicalize_existing(&dir.path().join("missing/../gone/file")),
            real.join("gone/file")
        );
    }

    #[test]
    #[cfg(unix)]
    fn dangling_target_under_symlinked_root_is_within() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir(&real).unwrap();
        let alias = dir.path().join("alias");
        std::os::unix::fs::symlink(&real, &alias).unwrap();

        // Root spelled through the symlink, target spelled through the real path
        assert!(is_within(&real.join("build/out"), &alias));
        assert!(is_within(&alias.join("build/out"), &real));
        assert!(!is_within(&dir.path().join("elsewhere"), &alias));
    }

    #[test]
    fn dir_name_takes_last_component() {
        assert_eq!(dir_name(Path::new("/a/b/feature-x")), "feature-x");
        assert_eq!(dir_name(Path::new("/a/b/feature-x/")), "feature-x");
    }

    #[test]
    fn relative_display_prefers_short_paths() {
        assert_eq!(
            relative_display(Path::new("/src/app.worktrees/x"), Path::new("/src/app")),
            "../app.worktrees/x"
        );
    }
}
