mod app_loop;
mod branches;
mod deletion;
mod worktrees;
