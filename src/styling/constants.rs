//! Style constants and emojis for the dashboard and error output.
//!
//! Messages built with `color-print` use tags (`<red>`, `<yellow>`, `<dim>`,
//! `<cyan>`, `<green>`); rows composed cell by cell use the `anstyle`
//! constants below, which map onto the same colors.

use anstyle::{AnsiColor, Color, Style};

// ============================================================================
// Semantic Style Constants
// ============================================================================

/// Error style (red)
pub const ERROR: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red)));

/// Warning style (yellow)
pub const WARNING: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow)));

/// Hint style (dimmed)
pub const HINT: Style = Style::new().dimmed();

/// Cyan style, used for progress and headings
pub const CYAN: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));

/// Cyan bold style
pub const CYAN_BOLD: Style = Style::new()
    .fg_color(Some(Color::Ansi(AnsiColor::Cyan)))
    .bold();

/// Green style
pub const GREEN: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));

/// Gray style for secondary/metadata text
pub const GRAY: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack)));

/// Bold
pub const BOLD: Style = Style::new().bold();

/// Highlighted row under the cursor
pub const SELECTED: Style = Style::new().invert();

/// The worktree the process runs from
pub const CURRENT: Style = Style::new()
    .bold()
    .fg_color(Some(Color::Ansi(AnsiColor::Magenta)));

// ============================================================================
// Message Emojis
// ============================================================================

/// Success emoji: `cformat!("{SUCCESS_EMOJI} <green>message</>");`
pub const SUCCESS_EMOJI: &str = "✅";

/// Error emoji: `cformat!("{ERROR_EMOJI} <red>message</>");`
pub const ERROR_EMOJI: &str = "❌";

/// Warning emoji: `cformat!("{WARNING_EMOJI} <yellow>message</>");`
pub const WARNING_EMOJI: &str = "🟡";

/// Hint emoji: `cformat!("{HINT_EMOJI} <dim>message</>");`
pub const HINT_EMOJI: &str = "💡";

/// Spinner frames, advanced once per tick
pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
