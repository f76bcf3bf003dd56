//! List navigation primitives shared by the views.
//!
//! Multi-select lists keep a [`SelectionSet`] next to a separate cursor:
//! moving never toggles and toggling never moves. Single-select pickers use
//! [`ListPicker`], which filters as the user types and re-centres its scroll
//! offset whenever the visible set changes.

use std::collections::BTreeSet;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Ordered set of selected items, keyed by a stable identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSet<K: Ord> {
    items: BTreeSet<K>,
}

impl<K: Ord> Default for SelectionSet<K> {
    fn default() -> Self {
        Self {
            items: BTreeSet::new(),
        }
    }
}

impl<K: Ord> SelectionSet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `key`, returning whether it is now selected.
    pub fn toggle(&mut self, key: K) -> bool {
        if self.items.remove(&key) {
            false
        } else {
            self.items.insert(key);
            true
        }
    }

    pub fn insert(&mut self, key: K) {
        self.items.insert(key);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.items.contains(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.items.iter()
    }

    pub fn retain(&mut self, keep: impl FnMut(&K) -> bool) {
        self.items.retain(keep);
    }
}

impl<K: Ord> FromIterator<K> for SelectionSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Scroll offset that puts `selected` in the middle of a `window`-row viewport.
pub fn centered_scroll(selected: usize, window: usize, total: usize) -> usize {
    if window == 0 || total <= window {
        return 0;
    }
    selected.saturating_sub(window / 2).min(total - window)
}

/// Smallest change to `scroll` that keeps `selected` visible.
pub fn follow_scroll(selected: usize, scroll: usize, window: usize, total: usize) -> usize {
    if window == 0 || total <= window {
        return 0;
    }
    let scroll = if selected < scroll {
        selected
    } else if selected >= scroll + window {
        selected + 1 - window
    } else {
        scroll
    };
    scroll.min(total - window)
}

/// Filterable single-select list of strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPicker {
    items: Vec<String>,
    filter: String,
    /// Indices into `items` matching `filter`
    visible: Vec<usize>,
    /// Position within `visible`
    selected: usize,
    scroll: usize,
    window: usize,
}

impl ListPicker {
    /// Build a picker with `preferred` selected (when present) and centred.
    pub fn new(items: Vec<String>, preferred: Option<&str>, window: usize) -> Self {
        let visible = (0..items.len()).collect();
        let mut picker = Self {
            items,
            filter: String::new(),
            visible,
            selected: 0,
            scroll: 0,
            window: window.max(1),
        };
        if let Some(preferred) = preferred {
            picker.select_item(preferred);
        }
        picker.recenter();
        picker
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn selected_item(&self) -> Option<&str> {
        self.visible
            .get(self.selected)
            .map(|&i| self.items[i].as_str())
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Rows currently in the viewport as `(item, is_selected)`.
    pub fn window_rows(&self) -> impl Iterator<Item = (&str, bool)> {
        self.visible
            .iter()
            .enumerate()
            .skip(self.scroll)
            .take(self.window)
            .map(|(pos, &i)| (self.items[i].as_str(), pos == self.selected))
    }

    pub fn move_by(&mut self, delta: isize) {
        if self.visible.is_empty() {
            return;
        }
        let last = self.visible.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(last);
        self.scroll = follow_scroll(self.selected, self.scroll, self.window, self.visible.len());
    }

    pub fn push_filter(&mut self, ch: char) {
        self.filter.push(ch);
        self.refilter();
    }

    pub fn pop_filter(&mut self) -> bool {
        let popped = self.filter.pop().is_some();
        if popped {
            self.refilter();
        }
        popped
    }

    /// Apply a navigation or filter key. Returns false for keys it ignores.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Up => self.move_by(-1),
            KeyCode::Down => self.move_by(1),
            KeyCode::PageUp => self.move_by(-(self.window as isize)),
            KeyCode::PageDown => self.move_by(self.window as isize),
            KeyCode::Backspace => return self.pop_filter(),
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.push_filter(ch)
            }
            _ => return false,
        }
        true
    }

    fn select_item(&mut self, item: &str) {
        if let Some(pos) = self.visible.iter().position(|&i| self.items[i] == item) {
            self.selected = pos;
        }
    }

    fn refilter(&mut self) {
        let keep = self.selected_item().map(str::to_string);
        let needle = self.filter.to_lowercase();
        self.visible = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect();
        self.selected = 0;
        if let Some(keep) = keep {
            self.select_item(&keep);
        }
        self.recenter();
    }

    fn recenter(&mut self) {
        self.scroll = centered_scroll(self.selected, self.window, self.visible.len());
    }
}

/// Single-line text input with a character cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set(&mut self, value: impl Into<String>) {
        *self = Self::with_value(value);
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    /// Apply an editing key. Returns false for keys it ignores.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let len = self.value.chars().count();
        match key.code {
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let end = self.byte_offset(self.cursor);
                self.value.replace_range(..end, "");
                self.cursor = 0;
            }
            KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => return false,
            KeyCode::Char(ch) => {
                let at = self.byte_offset(self.cursor);
                self.value.insert(at, ch);
                self.cursor += 1;
            }
            KeyCode::Backspace => {
                if self.cursor == 0 {
                    return true;
                }
                self.cursor -= 1;
                let at = self.byte_offset(self.cursor);
                self.value.remove(at);
            }
            KeyCode::Delete => {
                if self.cursor < len {
                    let at = self.byte_offset(self.cursor);
                    self.value.remove(at);
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(len),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = len,
            _ => return false,
        }
        true
    }
}
