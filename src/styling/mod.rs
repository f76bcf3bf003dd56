//! Consolidated styling module for terminal output.
//!
//! This module provides:
//! - Semantic style constants and message emojis
//! - Width-aware helpers for fitting styled text into terminal rows

mod constants;

pub use constants::*;

use ansi_str::AnsiStr;
use unicode_width::UnicodeWidthStr;

/// Display width of a string, ignoring ANSI escape sequences.
pub fn visible_width(s: &str) -> usize {
    s.ansi_strip().width()
}

/// Truncate styled text so its visible width does not exceed `max_width`.
///
/// Escape sequences are preserved; an ellipsis marks the cut.
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    if visible_width(s) <= max_width {
        return s.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let plain = s.ansi_strip();
    let mut width = 0;
    let mut chars = 0;
    for ch in plain.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + w > max_width - 1 {
            break;
        }
        width += w;
        chars += 1;
    }
    format!("{}…\x1b[0m", s.ansi_cut(..chars))
}

/// Pad styled text with spaces up to `width` visible columns.
pub fn pad_to_width(s: &str, width: usize) -> String {
    let visible = visible_width(s);
    if visible >= width {
        s.to_string()
    } else {
        format!("{s}{}", " ".repeat(width - visible))
    }
}
