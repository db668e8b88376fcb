//! Rich-text composer.
//!
//! [`Editor`] owns a [`Document`], a selection confined to one text block and
//! an undo history. Keyboard input goes through [`Editor::handle_key`], which
//! resolves shortcuts via the [`Keymap`] and turns a plain Enter into
//! [`KeyOutcome::Send`] carrying the serialized HTML.

pub mod document;
pub mod keymap;
mod runs;
pub mod serialize;

pub use self::document::{Document, Element, ElementKind, Mark, Marks, Node, Path, Text};
pub use self::keymap::{
    ChordError, EditorAction, KeyPress, Keymap, ModKey, canonical_chord, parse_chord,
};
pub use self::serialize::to_html;

use self::runs::Run;

const HISTORY_LIMIT: usize = 100;

/// Cursor or range inside a single text block, in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub block: Path,
    pub anchor: usize,
    pub focus: usize,
}

impl Selection {
    pub fn collapsed(block: Path, offset: usize) -> Self {
        Self {
            block,
            anchor: offset,
            focus: offset,
        }
    }

    pub fn range(block: Path, anchor: usize, focus: usize) -> Self {
        Self {
            block,
            anchor,
            focus,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn start(&self) -> usize {
        self.anchor.min(self.focus)
    }

    pub fn end(&self) -> usize {
        self.anchor.max(self.focus)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled,
    Send(String),
    Unhandled,
}

#[derive(Debug, Clone)]
struct Snapshot {
    doc: Document,
    selection: Selection,
}

#[derive(Debug, Clone)]
pub struct Editor {
    doc: Document,
    selection: Selection,
    /// Marks toggled at a collapsed cursor, applied to the next insert.
    pending_marks: Option<Marks>,
    keymap: Keymap,
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self::with_keymap(Keymap::default_bindings())
    }

    pub fn with_keymap(keymap: Keymap) -> Self {
        Self {
            doc: Document::default(),
            selection: Selection::collapsed(vec![0], 0),
            pending_marks: None,
            keymap,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    /// Start from an existing value with the cursor at its end.
    pub fn from_document(doc: Document) -> Self {
        let mut editor = Self::new();
        editor.doc = doc;
        editor.ensure_text_block();
        editor.move_to_end();
        editor
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn keymap_mut(&mut self) -> &mut Keymap {
        &mut self.keymap
    }

    pub fn html(&self) -> String {
        to_html(&self.doc)
    }

    pub fn plain_text(&self) -> String {
        self.doc.plain_text()
    }

    pub fn is_blank(&self) -> bool {
        self.doc.is_blank()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Move the selection. Offsets are clamped to the block; returns `false`
    /// when `block` is not a text block.
    pub fn set_selection(&mut self, selection: Selection) -> bool {
        let Some(el) = self.doc.element(&selection.block) else {
            return false;
        };
        if !el.is_text_block() {
            return false;
        }
        let len = runs::char_len(&runs::flatten(&el.children));
        self.selection = Selection {
            anchor: selection.anchor.min(len),
            focus: selection.focus.min(len),
            block: selection.block,
        };
        self.pending_marks = None;
        true
    }

    pub fn move_to_end(&mut self) {
        if let Some(last) = self.doc.text_blocks().pop() {
            let len = self
                .doc
                .element(&last)
                .map_or(0, |el| runs::char_len(&runs::flatten(&el.children)));
            self.selection = Selection::collapsed(last, len);
            self.pending_marks = None;
        }
    }

    /// Select the whole current block.
    pub fn select_block(&mut self) {
        let len = runs::char_len(&self.runs());
        self.selection = Selection::range(self.selection.block.clone(), 0, len);
        self.pending_marks = None;
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Replace the selection with `text`. A single space may trigger list
    /// autoformat.
    pub fn insert_text(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let before = self.snapshot();
        self.insert_raw(text);
        if text == " " {
            self.autoformat();
        }
        self.commit(before)
    }

    pub fn insert_line_break(&mut self) -> bool {
        let before = self.snapshot();
        self.insert_raw("\n");
        self.commit(before)
    }

    pub fn delete_backward(&mut self) -> bool {
        let before = self.snapshot();
        let (start, end) = (self.selection.start(), self.selection.end());
        let path = self.selection.block.clone();

        if start < end || start > 0 {
            let from = if start < end { start } else { start - 1 };
            let mut runs = self.runs();
            runs::delete(&mut runs, from, end);
            self.set_runs(runs);
            self.selection = Selection::collapsed(path, from);
        } else if self.enclosing_list(&path).is_some() {
            if let Some(lifted) = self.unwrap_list_item(&path) {
                self.selection = Selection::collapsed(lifted, 0);
            }
        } else if self
            .doc
            .element(&path)
            .is_some_and(|el| el.kind != ElementKind::Paragraph)
        {
            if let Some(el) = self.doc.element_mut(&path) {
                el.kind = ElementKind::Paragraph;
            }
        } else {
            self.merge_into_previous();
        }
        self.commit(before)
    }

    /// Toggle `mark` over the selection. At a collapsed cursor the mark is
    /// held for the next insert instead.
    pub fn toggle_mark(&mut self, mark: Mark) -> bool {
        let (start, end) = (self.selection.start(), self.selection.end());
        let mut runs = self.runs();
        if start == end {
            let mut marks = self.marks_at_cursor(&runs);
            marks.set(mark, !marks.has(mark));
            self.pending_marks = Some(marks);
            return true;
        }
        let before = self.snapshot();
        let on = !runs::all_in_range(&runs, start, end, |r| r.marks.has(mark));
        runs::update_range(&mut runs, start, end, |r| r.marks.set(mark, on));
        self.set_runs(runs);
        self.commit(before)
    }

    pub fn is_mark_active(&self, mark: Mark) -> bool {
        let runs = self.runs();
        let (start, end) = (self.selection.start(), self.selection.end());
        if start == end {
            self.marks_at_cursor(&runs).has(mark)
        } else {
            runs::all_in_range(&runs, start, end, |r| r.marks.has(mark))
        }
    }

    /// Lists wrap or unwrap the block; other kinds switch the block's type,
    /// toggling back to a paragraph when it already has that type.
    pub fn toggle_block(&mut self, kind: ElementKind) -> bool {
        let before = self.snapshot();
        let path = self.selection.block.clone();

        let new_path = if kind.is_list() {
            match self.enclosing_list(&path) {
                Some(current) if current == kind => self.unwrap_list_item(&path),
                Some(_) => {
                    let list_path = &path[..path.len() - 2];
                    if let Some(list) = self.doc.element_mut(list_path) {
                        list.kind = kind;
                    }
                    Some(path)
                }
                None => Some(self.wrap_in_list(&path, kind)),
            }
        } else {
            match kind {
                ElementKind::ListItem | ElementKind::Link | ElementKind::Unknown(_) => None,
                kind => {
                    if let Some(el) = self.doc.element_mut(&path) {
                        el.kind = if el.kind == kind {
                            ElementKind::Paragraph
                        } else {
                            kind
                        };
                    }
                    Some(path)
                }
            }
        };

        if let Some(block) = new_path {
            self.selection.block = block;
        }
        self.commit(before)
    }

    pub fn is_block_active(&self, kind: &ElementKind) -> bool {
        let path = &self.selection.block;
        if kind.is_list() {
            return self.enclosing_list(path).as_ref() == Some(kind);
        }
        self.doc.element(path).is_some_and(|el| el.kind == *kind)
    }

    /// Wrap the selection in a link to `url`. At a collapsed cursor, insert
    /// `text` (or the URL itself) as a new link instead.
    pub fn insert_link(&mut self, url: &str, text: Option<&str>) -> bool {
        let url = url.trim();
        if url.is_empty() {
            return false;
        }
        let before = self.snapshot();
        let (start, end) = (self.selection.start(), self.selection.end());
        let mut runs = self.runs();

        if start < end {
            runs::update_range(&mut runs, start, end, |r| r.link = Some(url.to_string()));
            self.set_runs(runs);
        } else {
            let label = text.filter(|t| !t.is_empty()).unwrap_or(url);
            let marks = self.marks_at_cursor(&runs);
            runs::insert(&mut runs, start, Run::new(label, marks, Some(url.to_string())));
            self.set_runs(runs);
            let caret = start + label.chars().count();
            self.selection = Selection::collapsed(self.selection.block.clone(), caret);
        }
        self.pending_marks = None;
        self.commit(before)
    }

    /// Paste plain text. A bare `http(s)://` URL becomes a link.
    pub fn paste(&mut self, text: &str) -> bool {
        let normalized = text.replace("\r\n", "\n");
        let trimmed = normalized.trim();
        if is_bare_url(trimmed) {
            return self.insert_link(trimmed, None);
        }
        if normalized.is_empty() {
            return false;
        }
        let before = self.snapshot();
        self.insert_raw(&normalized);
        self.commit(before)
    }

    pub fn undo(&mut self) -> bool {
        let Some(prev) = self.undo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.redo_stack.push(current);
        self.restore(prev);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.undo_stack.push(current);
        self.restore(next);
        true
    }

    /// Reset to one empty paragraph and drop the history.
    pub fn clear(&mut self) {
        self.doc = Document::default();
        self.selection = Selection::collapsed(vec![0], 0);
        self.pending_marks = None;
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Serialize and clear, or `None` when there is nothing to send.
    pub fn take_html(&mut self) -> Option<String> {
        if self.is_blank() {
            return None;
        }
        let html = self.html();
        self.clear();
        Some(html)
    }

    // -----------------------------------------------------------------------
    // Keyboard
    // -----------------------------------------------------------------------

    pub fn handle_key(&mut self, press: &KeyPress) -> KeyOutcome {
        if let Some(action) = self.keymap.lookup(press).cloned() {
            return self.apply(action);
        }
        if press.has_command_modifier() {
            return KeyOutcome::Unhandled;
        }
        match press.key.as_str() {
            "Backspace" | "backspace" => {
                self.delete_backward();
                KeyOutcome::Handled
            }
            key if key.chars().count() == 1 => {
                self.insert_text(key);
                KeyOutcome::Handled
            }
            _ => KeyOutcome::Unhandled,
        }
    }

    pub fn apply(&mut self, action: EditorAction) -> KeyOutcome {
        match action {
            EditorAction::ToggleMark(mark) => {
                self.toggle_mark(mark);
            }
            EditorAction::ToggleBlock(kind) => {
                self.toggle_block(kind);
            }
            EditorAction::Undo => {
                self.undo();
            }
            EditorAction::Redo => {
                self.redo();
            }
            EditorAction::LineBreak => {
                self.insert_line_break();
            }
            EditorAction::Send => {
                return self.take_html().map_or(KeyOutcome::Handled, KeyOutcome::Send);
            }
        }
        KeyOutcome::Handled
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn runs(&self) -> Vec<Run> {
        self.doc
            .element(&self.selection.block)
            .map(|el| runs::flatten(&el.children))
            .unwrap_or_default()
    }

    fn set_runs(&mut self, runs: Vec<Run>) {
        if let Some(el) = self.doc.element_mut(&self.selection.block) {
            el.children = runs::rebuild(runs);
        }
    }

    fn marks_at_cursor(&self, runs: &[Run]) -> Marks {
        self.pending_marks.unwrap_or_else(|| {
            runs::run_before(runs, self.selection.start())
                .map(|r| r.marks)
                .unwrap_or_default()
        })
    }

    fn insert_raw(&mut self, text: &str) {
        let (start, end) = (self.selection.start(), self.selection.end());
        let mut runs = self.runs();
        let marks = self.marks_at_cursor(&runs);
        self.pending_marks = None;
        runs::delete(&mut runs, start, end);
        let link = runs::link_inside(&runs, start);
        runs::insert(&mut runs, start, Run::new(text, marks, link));
        self.set_runs(runs);
        let caret = start + text.chars().count();
        self.selection = Selection::collapsed(self.selection.block.clone(), caret);
    }

    /// `1. `, `- ` or `* ` typed at the start of a top-level paragraph turns
    /// it into a list item.
    fn autoformat(&mut self) -> bool {
        if !self.selection.is_collapsed() {
            return false;
        }
        let path = self.selection.block.clone();
        let Some(block) = self.doc.element(&path) else {
            return false;
        };
        if block.kind != ElementKind::Paragraph || self.enclosing_list(&path).is_some() {
            return false;
        }
        let mut runs = runs::flatten(&block.children);
        let caret = self.selection.focus;
        let prefix: String = runs::plain(&runs).chars().take(caret).collect();
        let kind = match prefix.as_str() {
            "1. " => ElementKind::NumberedList,
            "- " | "* " => ElementKind::BulletedList,
            _ => return false,
        };
        runs::delete(&mut runs, 0, caret);
        self.set_runs(runs);
        let block = self.wrap_in_list(&path, kind);
        self.selection = Selection::collapsed(block, 0);
        true
    }

    /// Kind of the list whose item directly holds the block at `path`.
    fn enclosing_list(&self, path: &[usize]) -> Option<ElementKind> {
        let n = path.len();
        if n < 3 {
            return None;
        }
        let item = self.doc.element(&path[..n - 1])?;
        let list = self.doc.element(&path[..n - 2])?;
        (item.kind == ElementKind::ListItem && list.kind.is_list()).then(|| list.kind.clone())
    }

    /// Replace the block at `path` with `list > list-item > block`, joining
    /// neighbouring lists of the same kind. Returns the block's new path.
    fn wrap_in_list(&mut self, path: &[usize], kind: ElementKind) -> Path {
        let Some((&idx, parent)) = path.split_last() else {
            return path.to_vec();
        };
        let Some(siblings) = self.doc.children_mut(parent) else {
            return path.to_vec();
        };
        if idx >= siblings.len() {
            return path.to_vec();
        }

        let same_kind = |node: &Node| matches!(node, Node::Element(el) if el.kind == kind);
        let block = siblings.remove(idx);
        let item: Node = Element::new(ElementKind::ListItem, vec![block]).into();

        let (list_idx, item_idx) = match siblings[..idx].last_mut() {
            Some(Node::Element(prev)) if prev.kind == kind => {
                prev.children.push(item);
                (idx - 1, prev.children.len() - 1)
            }
            _ => {
                siblings.insert(idx, Element::new(kind.clone(), vec![item]).into());
                (idx, 0)
            }
        };

        if siblings.get(list_idx + 1).is_some_and(same_kind) {
            let next = siblings.remove(list_idx + 1);
            if let (Node::Element(next), Some(list)) = (next, siblings[list_idx].as_element_mut()) {
                list.children.extend(next.children);
            }
        }

        let mut new_path = parent.to_vec();
        new_path.extend([list_idx, item_idx, 0]);
        new_path
    }

    /// Lift the item holding the block at `path` out of its list, splitting
    /// the list around it. Returns the block's new path.
    fn unwrap_list_item(&mut self, path: &[usize]) -> Option<Path> {
        let n = path.len();
        if n < 3 {
            return None;
        }
        let (list_parent, list_idx, item_idx, child_idx) =
            (&path[..n - 3], path[n - 3], path[n - 2], path[n - 1]);
        let siblings = self.doc.children_mut(list_parent)?;
        let Some(Node::Element(list)) = siblings.get(list_idx) else {
            return None;
        };
        if !list.kind.is_list() || item_idx >= list.children.len() {
            return None;
        }
        let Node::Element(list) = siblings.remove(list_idx) else {
            return None;
        };

        let mut items = list.children;
        let after = items.split_off(item_idx + 1);
        let lifted = match items.pop() {
            Some(Node::Element(item)) => item.children,
            Some(other) => vec![other],
            None => Vec::new(),
        };

        let mut replacement: Vec<Node> = Vec::new();
        if !items.is_empty() {
            replacement.push(Element::new(list.kind.clone(), items).into());
        }
        let lifted_at = list_idx + replacement.len();
        replacement.extend(lifted);
        if !after.is_empty() {
            replacement.push(Element::new(list.kind, after).into());
        }
        siblings.splice(list_idx..list_idx, replacement);

        let mut new_path = list_parent.to_vec();
        new_path.push(lifted_at + child_idx);
        Some(new_path)
    }

    fn merge_into_previous(&mut self) {
        let path = self.selection.block.clone();
        let blocks = self.doc.text_blocks();
        let Some(pos) = blocks.iter().position(|p| *p == path) else {
            return;
        };
        let Some(prev) = pos.checked_sub(1).map(|i| blocks[i].clone()) else {
            return;
        };

        let tail = self.runs();
        self.selection = Selection::collapsed(prev.clone(), 0);
        let mut runs = self.runs();
        let caret = runs::char_len(&runs);
        runs.extend(tail);
        self.set_runs(runs);
        self.remove_node(&path);
        self.selection = Selection::collapsed(prev, caret);
    }

    /// Remove the node at `path` and any ancestors left empty.
    fn remove_node(&mut self, path: &[usize]) {
        let mut path = path.to_vec();
        while let Some(idx) = path.pop() {
            let Some(siblings) = self.doc.children_mut(&path) else {
                break;
            };
            if idx < siblings.len() {
                siblings.remove(idx);
            }
            if path.is_empty() || !siblings.is_empty() {
                break;
            }
        }
        self.ensure_text_block();
    }

    fn ensure_text_block(&mut self) {
        if self.doc.text_blocks().is_empty() {
            self.doc
                .children
                .push(Element::paragraph(vec![Text::default().into()]).into());
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            doc: self.doc.clone(),
            selection: self.selection.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.doc = snapshot.doc;
        self.selection = snapshot.selection;
        self.pending_marks = None;
    }

    /// Record `before` as an undo step if the document changed.
    fn commit(&mut self, before: Snapshot) -> bool {
        if before.doc == self.doc {
            return false;
        }
        self.undo_stack.push(before);
        if self.undo_stack.len() > HISTORY_LIMIT {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        true
    }
}

fn is_bare_url(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"));
    matches!(rest, Some(r) if !r.is_empty()) && !s.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> Editor {
        Editor::with_keymap(Keymap::default_bindings().with_mod_key(ModKey::Ctrl))
    }

    fn type_str(ed: &mut Editor, s: &str) {
        for c in s.chars() {
            ed.handle_key(&KeyPress::new(c.to_string()));
        }
    }

    #[test]
    fn typing_builds_a_paragraph() {
        let mut ed = editor();
        type_str(&mut ed, "hi <b>");
        assert_eq!(ed.html(), "<p>hi &lt;b&gt;</p>");
        assert_eq!(ed.selection().focus, 6);
    }

    #[test]
    fn backspace_deletes_and_merges() {
        let mut ed = editor();
        type_str(&mut ed, "ab");
        ed.handle_key(&KeyPress::new("Backspace"));
        assert_eq!(ed.plain_text(), "a");

        ed.doc.children.push(Element::paragraph(vec![Text::plain("cd").into()]).into());
        assert!(ed.set_selection(Selection::collapsed(vec![1], 0)));
        ed.delete_backward();
        assert_eq!(ed.html(), "<p>acd</p>");
        assert_eq!(ed.selection(), &Selection::collapsed(vec![0], 1));
    }

    #[test]
    fn bold_at_cursor_applies_to_next_text() {
        let mut ed = editor();
        type_str(&mut ed, "a");
        ed.handle_key(&KeyPress::new("b").ctrl());
        assert!(ed.is_mark_active(Mark::Bold));
        type_str(&mut ed, "b");
        assert_eq!(ed.html(), "<p>a<strong>b</strong></p>");
    }

    #[test]
    fn toggle_mark_over_range_twice_restores() {
        let mut ed = editor();
        type_str(&mut ed, "hello");
        ed.set_selection(Selection::range(vec![0], 0, 5));
        ed.toggle_mark(Mark::Italic);
        assert_eq!(ed.html(), "<p><em>hello</em></p>");
        ed.toggle_mark(Mark::Italic);
        assert_eq!(ed.html(), "<p>hello</p>");
    }

    #[test]
    fn headings_toggle_back_to_paragraph() {
        let mut ed = editor();
        type_str(&mut ed, "t");
        ed.handle_key(&KeyPress::new("1").ctrl().alt());
        assert_eq!(ed.html(), "<h1>t</h1>");
        ed.handle_key(&KeyPress::new("1").ctrl().alt());
        assert_eq!(ed.html(), "<p>t</p>");
    }

    #[test]
    fn list_toggle_wraps_and_unwraps() {
        let mut ed = editor();
        type_str(&mut ed, "x");
        ed.handle_key(&KeyPress::new("8").ctrl().shift());
        assert_eq!(ed.html(), "<ul><li><p>x</p></li></ul>");
        assert!(ed.is_block_active(&ElementKind::BulletedList));

        ed.toggle_block(ElementKind::NumberedList);
        assert_eq!(ed.html(), "<ol><li><p>x</p></li></ol>");

        ed.toggle_block(ElementKind::NumberedList);
        assert_eq!(ed.html(), "<p>x</p>");
        assert_eq!(ed.selection().block, vec![0]);
    }

    #[test]
    fn unwrap_splits_list_around_item() {
        let item = |s: &str| -> Node {
            Element::new(
                ElementKind::ListItem,
                vec![Element::paragraph(vec![Text::plain(s).into()]).into()],
            )
            .into()
        };
        let doc = Document::new(vec![
            Element::new(ElementKind::BulletedList, vec![item("a"), item("b"), item("c")]).into(),
        ]);
        let mut ed = Editor::from_document(doc);
        ed.set_selection(Selection::collapsed(vec![0, 1, 0], 0));
        ed.delete_backward();
        assert_eq!(
            ed.html(),
            "<ul><li><p>a</p></li></ul><p>b</p><ul><li><p>c</p></li></ul>"
        );
        assert_eq!(ed.selection().block, vec![1]);
    }

    #[test]
    fn undo_and_redo_step_through_history() {
        let mut ed = editor();
        type_str(&mut ed, "ab");
        assert!(ed.can_undo());
        ed.handle_key(&KeyPress::new("z").ctrl());
        assert_eq!(ed.plain_text(), "a");
        ed.handle_key(&KeyPress::new("z").ctrl().shift());
        assert_eq!(ed.plain_text(), "ab");
        ed.handle_key(&KeyPress::new("z").ctrl());
        ed.handle_key(&KeyPress::new("y").ctrl());
        assert_eq!(ed.plain_text(), "ab");
        assert!(!ed.redo());
    }

    #[test]
    fn link_wraps_selection() {
        let mut ed = editor();
        type_str(&mut ed, "see docs");
        ed.set_selection(Selection::range(vec![0], 4, 8));
        assert!(ed.insert_link("https://docs.example", None));
        assert_eq!(
            ed.html(),
            "<p>see <a href=\"https://docs.example\" target=\"_blank\" \
             rel=\"noopener noreferrer\">docs</a></p>"
        );
    }

    #[test]
    fn pasted_url_becomes_link() {
        let mut ed = editor();
        ed.paste("  https://a.example/x  ");
        let link = ed.document().element(&[0, 0]).cloned();
        assert_eq!(link.and_then(|l| l.url), Some("https://a.example/x".to_string()));
        type_str(&mut ed, "!");
        // typing at the link's end stays outside it
        assert!(ed.html().ends_with("</a>!</p>"));

        let mut ed = editor();
        ed.paste("not a url\r\nline two");
        assert_eq!(ed.plain_text(), "not a url\nline two");
    }

    #[test]
    fn unbound_command_chords_are_unhandled() {
        let mut ed = editor();
        assert_eq!(ed.handle_key(&KeyPress::new("k").ctrl()), KeyOutcome::Unhandled);
        assert_eq!(ed.handle_key(&KeyPress::new("ArrowLeft")), KeyOutcome::Unhandled);
        assert!(ed.is_blank());
    }

    #[test]
    fn bare_url_detection() {
        assert!(is_bare_url("https://a.example"));
        assert!(is_bare_url("HTTP://a.example/x?y=1"));
        assert!(!is_bare_url("https://"));
        assert!(!is_bare_url("see https://a.example"));
        assert!(!is_bare_url("ftp://a.example"));
    }
}
