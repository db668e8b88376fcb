//! Keyboard shortcuts.
//!
//! A key press is reduced to a canonical chord string: modifier names in
//! alphabetical order (`alt`, `ctrl`, `meta`, `mod`, `shift`) followed by the
//! lowercase key, joined with `+`. The platform's primary modifier is spelled
//! `mod`, so `"mod+b"` matches Ctrl+B on Linux and Cmd+B on macOS.

use std::collections::HashMap;

use thiserror::Error;

use super::document::{ElementKind, Mark};

/// Which physical modifier plays the role of `mod`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModKey {
    #[default]
    Ctrl,
    Meta,
}

impl ModKey {
    /// Meta on macOS, Ctrl everywhere else.
    pub fn for_platform() -> Self {
        if cfg!(target_os = "macos") {
            Self::Meta
        } else {
            Self::Ctrl
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPress {
    /// Key name as reported by the input layer (`"b"`, `"Enter"`, `" "`).
    /// Shortcut chords expect the unshifted key, e.g. `"7"` for mod+shift+7.
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
}

impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Ctrl or Meta held; such presses never insert text.
    pub fn has_command_modifier(&self) -> bool {
        self.ctrl || self.meta
    }
}

fn normalize_key(key: &str) -> String {
    match key {
        " " => "space".to_string(),
        other => other.to_lowercase(),
    }
}

pub fn canonical_chord(press: &KeyPress, mod_key: ModKey) -> String {
    let (is_mod, other, other_name) = match mod_key {
        ModKey::Ctrl => (press.ctrl, press.meta, "meta"),
        ModKey::Meta => (press.meta, press.ctrl, "ctrl"),
    };
    let mut parts: Vec<&str> = Vec::with_capacity(5);
    if press.alt {
        parts.push("alt");
    }
    if other {
        parts.push(other_name);
    }
    if is_mod {
        parts.push("mod");
    }
    if press.shift {
        parts.push("shift");
    }
    parts.sort_unstable();
    let key = normalize_key(&press.key);
    let mut chord = parts.join("+");
    if !chord.is_empty() {
        chord.push('+');
    }
    chord.push_str(&key);
    chord
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChordError {
    #[error("empty chord")]
    Empty,

    #[error("chord '{0}' has no key")]
    MissingKey(String),

    #[error("chord '{0}' has more than one key")]
    MultipleKeys(String),
}

const MODIFIERS: [&str; 5] = ["alt", "ctrl", "meta", "mod", "shift"];

/// Normalize a binding string such as `"Shift+Mod+Z"` to its canonical form
/// (`"mod+shift+z"`).
pub fn parse_chord(chord: &str) -> Result<String, ChordError> {
    let trimmed = chord.trim();
    if trimmed.is_empty() {
        return Err(ChordError::Empty);
    }
    let mut modifiers: Vec<&'static str> = Vec::new();
    let mut key: Option<String> = None;
    for part in trimmed.split('+').map(str::trim) {
        let lower = part.to_lowercase();
        let alias = match lower.as_str() {
            "control" => "ctrl",
            "cmd" | "command" => "meta",
            "option" => "alt",
            other => other,
        };
        if let Some(m) = MODIFIERS.iter().find(|m| **m == alias) {
            if !modifiers.contains(m) {
                modifiers.push(*m);
            }
        } else if part.is_empty() {
            return Err(ChordError::MissingKey(chord.to_string()));
        } else if key.is_some() {
            return Err(ChordError::MultipleKeys(chord.to_string()));
        } else {
            key = Some(normalize_key(part));
        }
    }
    let key = key.ok_or_else(|| ChordError::MissingKey(chord.to_string()))?;
    modifiers.sort_unstable();
    let mut out = modifiers.join("+");
    if !out.is_empty() {
        out.push('+');
    }
    out.push_str(&key);
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorAction {
    ToggleMark(Mark),
    ToggleBlock(ElementKind),
    Undo,
    Redo,
    Send,
    LineBreak,
}

#[derive(Debug, Clone)]
pub struct Keymap {
    mod_key: ModKey,
    bindings: HashMap<String, EditorAction>,
}

impl Default for Keymap {
    fn default() -> Self {
        Self::default_bindings()
    }
}

impl Keymap {
    pub fn empty(mod_key: ModKey) -> Self {
        Self {
            mod_key,
            bindings: HashMap::new(),
        }
    }

    /// Chords in the table are already canonical.
    pub fn default_bindings() -> Self {
        let mut map = Self::empty(ModKey::for_platform());
        let defaults = [
            ("mod+b", EditorAction::ToggleMark(Mark::Bold)),
            ("mod+i", EditorAction::ToggleMark(Mark::Italic)),
            ("mod+u", EditorAction::ToggleMark(Mark::Underline)),
            ("mod+`", EditorAction::ToggleMark(Mark::Code)),
            ("mod+z", EditorAction::Undo),
            ("mod+shift+z", EditorAction::Redo),
            ("mod+y", EditorAction::Redo),
            ("mod+shift+7", EditorAction::ToggleBlock(ElementKind::NumberedList)),
            ("mod+shift+8", EditorAction::ToggleBlock(ElementKind::BulletedList)),
            ("mod+shift+9", EditorAction::ToggleBlock(ElementKind::BlockQuote)),
            ("alt+mod+1", EditorAction::ToggleBlock(ElementKind::HeadingOne)),
            ("alt+mod+2", EditorAction::ToggleBlock(ElementKind::HeadingTwo)),
            ("enter", EditorAction::Send),
            ("shift+enter", EditorAction::LineBreak),
        ];
        for (chord, action) in defaults {
            map.bindings.insert(chord.to_string(), action);
        }
        map
    }

    pub fn with_mod_key(mut self, mod_key: ModKey) -> Self {
        self.mod_key = mod_key;
        self
    }

    pub fn mod_key(&self) -> ModKey {
        self.mod_key
    }

    /// Bind `chord`, replacing any previous action. Returns the canonical
    /// chord that was bound.
    pub fn bind(&mut self, chord: &str, action: EditorAction) -> Result<String, ChordError> {
        let canonical = parse_chord(chord)?;
        self.bindings.insert(canonical.clone(), action);
        Ok(canonical)
    }

    pub fn unbind(&mut self, chord: &str) -> Result<Option<EditorAction>, ChordError> {
        Ok(self.bindings.remove(&parse_chord(chord)?))
    }

    pub fn lookup(&self, press: &KeyPress) -> Option<&EditorAction> {
        self.bindings.get(&canonical_chord(press, self.mod_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_sort_before_key() {
        let press = KeyPress::new("Z").shift().ctrl();
        assert_eq!(canonical_chord(&press, ModKey::Ctrl), "mod+shift+z");
        assert_eq!(canonical_chord(&press, ModKey::Meta), "ctrl+shift+z");

        let press = KeyPress::new("1").alt().meta();
        assert_eq!(canonical_chord(&press, ModKey::Meta), "alt+mod+1");
        assert_eq!(canonical_chord(&KeyPress::new(" "), ModKey::Ctrl), "space");
        assert_eq!(canonical_chord(&KeyPress::new("Enter"), ModKey::Ctrl), "enter");
    }

    #[test]
    fn parse_normalizes_order_and_case() {
        assert_eq!(parse_chord("Shift+Mod+Z").unwrap(), "mod+shift+z");
        assert_eq!(parse_chord(" mod + ` ").unwrap(), "mod+`");
        assert_eq!(parse_chord("cmd+alt+1").unwrap(), "alt+meta+1");
        assert_eq!(parse_chord("").unwrap_err(), ChordError::Empty);
        assert!(matches!(parse_chord("mod+shift"), Err(ChordError::MissingKey(_))));
        assert!(matches!(parse_chord("a+b"), Err(ChordError::MultipleKeys(_))));
    }

    #[test]
    fn default_bindings_resolve_for_both_platforms() {
        let ctrl = Keymap::default_bindings().with_mod_key(ModKey::Ctrl);
        assert_eq!(
            ctrl.lookup(&KeyPress::new("b").ctrl()),
            Some(&EditorAction::ToggleMark(Mark::Bold))
        );
        assert_eq!(ctrl.lookup(&KeyPress::new("b").meta()), None);

        let meta = Keymap::default_bindings().with_mod_key(ModKey::Meta);
        assert_eq!(
            meta.lookup(&KeyPress::new("z").meta().shift()),
            Some(&EditorAction::Redo)
        );
        assert_eq!(
            meta.lookup(&KeyPress::new("8").meta().shift()),
            Some(&EditorAction::ToggleBlock(ElementKind::BulletedList))
        );
        assert_eq!(meta.lookup(&KeyPress::new("Enter")), Some(&EditorAction::Send));
        assert_eq!(
            meta.lookup(&KeyPress::new("Enter").shift()),
            Some(&EditorAction::LineBreak)
        );
    }

    #[test]
    fn default_chords_are_canonical() {
        let map = Keymap::default_bindings();
        for chord in map.bindings.keys() {
            assert_eq!(&parse_chord(chord).unwrap(), chord);
        }
    }

    #[test]
    fn bind_replaces_existing() {
        let mut map = Keymap::empty(ModKey::Ctrl);
        assert_eq!(map.bind("Mod+K", EditorAction::Undo).unwrap(), "mod+k");
        map.bind("mod+k", EditorAction::Redo).unwrap();
        assert_eq!(map.lookup(&KeyPress::new("k").ctrl()), Some(&EditorAction::Redo));
        assert_eq!(map.unbind("mod+k").unwrap(), Some(EditorAction::Redo));
    }
}
