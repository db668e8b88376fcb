//! Flat view of a text block's inline content.
//!
//! Editing works on a list of runs (text + marks + optional link URL) with
//! character offsets, then rebuilds the block's children from it. Rebuilding
//! merges neighbours with identical formatting and regroups link runs, so the
//! tree stays normalized no matter how often a block is split.

use super::document::{Element, ElementKind, Marks, Node, Text};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Run {
    pub text: String,
    pub marks: Marks,
    pub link: Option<String>,
}

impl Run {
    pub fn new(text: impl Into<String>, marks: Marks, link: Option<String>) -> Self {
        Self {
            text: text.into(),
            marks,
            link,
        }
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn same_format(&self, other: &Run) -> bool {
        self.marks == other.marks && self.link == other.link
    }
}

pub(crate) fn flatten(children: &[Node]) -> Vec<Run> {
    fn walk(nodes: &[Node], link: Option<&str>, out: &mut Vec<Run>) {
        for node in nodes {
            match node {
                Node::Text(t) => {
                    out.push(Run::new(t.text.clone(), t.marks(), link.map(str::to_string)));
                }
                Node::Element(el) if el.kind == ElementKind::Link => {
                    walk(&el.children, el.url.as_deref().or(link), out);
                }
                Node::Element(el) => walk(&el.children, link, out),
            }
        }
    }
    let mut out = Vec::new();
    walk(children, None, &mut out);
    out
}

pub(crate) fn rebuild(runs: Vec<Run>) -> Vec<Node> {
    let mut merged: Vec<Run> = Vec::new();
    for run in runs.into_iter().filter(|r| !r.text.is_empty()) {
        match merged.last_mut() {
            Some(last) if last.same_format(&run) => last.text.push_str(&run.text),
            _ => merged.push(run),
        }
    }

    let mut nodes: Vec<Node> = Vec::new();
    for run in merged {
        let text = Text::with_marks(run.text, run.marks);
        match run.link {
            None => nodes.push(text.into()),
            Some(url) => match nodes.last_mut() {
                Some(Node::Element(el))
                    if el.kind == ElementKind::Link && el.url.as_deref() == Some(url.as_str()) =>
                {
                    el.children.push(text.into());
                }
                _ => nodes.push(Element::link(url, vec![text.into()]).into()),
            },
        }
    }
    if nodes.is_empty() {
        nodes.push(Text::default().into());
    }
    nodes
}

pub(crate) fn char_len(runs: &[Run]) -> usize {
    runs.iter().map(Run::len).sum()
}

pub(crate) fn plain(runs: &[Run]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

fn byte_index(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

/// Ensure a run boundary at `offset`; returns the index of the first run
/// starting at or after it.
pub(crate) fn split_at(runs: &mut Vec<Run>, offset: usize) -> usize {
    let mut start = 0;
    for i in 0..runs.len() {
        let len = runs[i].len();
        if offset == start {
            return i;
        }
        if offset < start + len {
            let at = byte_index(&runs[i].text, offset - start);
            let tail = runs[i].text.split_off(at);
            let mut right = runs[i].clone();
            right.text = tail;
            runs.insert(i + 1, right);
            return i + 1;
        }
        start += len;
    }
    runs.len()
}

pub(crate) fn insert(runs: &mut Vec<Run>, offset: usize, run: Run) {
    let idx = split_at(runs, offset);
    runs.insert(idx, run);
}

pub(crate) fn delete(runs: &mut Vec<Run>, start: usize, end: usize) {
    if start >= end {
        return;
    }
    let lo = split_at(runs, start);
    let hi = split_at(runs, end);
    runs.drain(lo..hi);
}

/// Apply `f` to every run covering `start..end`.
pub(crate) fn update_range(
    runs: &mut Vec<Run>,
    start: usize,
    end: usize,
    mut f: impl FnMut(&mut Run),
) {
    if start >= end {
        return;
    }
    let lo = split_at(runs, start);
    let hi = split_at(runs, end);
    for run in &mut runs[lo..hi] {
        f(run);
    }
}

pub(crate) fn all_in_range(
    runs: &[Run],
    start: usize,
    end: usize,
    pred: impl Fn(&Run) -> bool,
) -> bool {
    let mut pos = 0;
    let mut any = false;
    for run in runs {
        let len = run.len();
        if pos < end && pos + len > start && len > 0 {
            any = true;
            if !pred(run) {
                return false;
            }
        }
        pos += len;
    }
    any
}

/// The run a character typed at `offset` continues: the one ending there,
/// or the first run when at the very start.
pub(crate) fn run_before(runs: &[Run], offset: usize) -> Option<&Run> {
    let mut pos = 0;
    let mut first = None;
    for run in runs.iter().filter(|r| !r.text.is_empty()) {
        first.get_or_insert(run);
        let len = run.len();
        if offset > pos && offset <= pos + len {
            return Some(run);
        }
        pos += len;
    }
    if offset == 0 { first } else { None }
}

/// Link URL when `offset` sits strictly inside a link, so text typed there
/// extends it. At a link's edge new text stays outside.
pub(crate) fn link_inside(runs: &[Run], offset: usize) -> Option<String> {
    let mut pos = 0;
    let mut before: Option<&Run> = None;
    let mut after: Option<&Run> = None;
    for run in runs {
        let len = run.len();
        if len == 0 {
            continue;
        }
        if pos < offset && offset < pos + len {
            return run.link.clone();
        }
        if pos + len == offset {
            before = Some(run);
        }
        if pos == offset && after.is_none() {
            after = Some(run);
        }
        pos += len;
    }
    match (before, after) {
        (Some(b), Some(a)) if b.link.is_some() && b.link == a.link => b.link.clone(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::document::Mark;

    fn bold() -> Marks {
        let mut m = Marks::default();
        m.set(Mark::Bold, true);
        m
    }

    #[test]
    fn split_and_merge_round_trip() {
        let mut runs = vec![Run::new("hello", Marks::default(), None)];
        update_range(&mut runs, 1, 3, |r| r.marks = bold());
        assert_eq!(runs.len(), 3);
        assert_eq!(plain(&runs), "hello");

        update_range(&mut runs, 0, 5, |r| r.marks = Marks::default());
        let nodes = rebuild(runs);
        assert_eq!(nodes, vec![Node::Text(Text::plain("hello"))]);
    }

    #[test]
    fn delete_spans_runs() {
        let mut runs = vec![
            Run::new("ab", Marks::default(), None),
            Run::new("cd", bold(), None),
            Run::new("ef", Marks::default(), None),
        ];
        delete(&mut runs, 1, 5);
        assert_eq!(plain(&runs), "af");
        assert_eq!(rebuild(runs), vec![Node::Text(Text::plain("af"))]);
    }

    #[test]
    fn multibyte_offsets_are_chars() {
        let mut runs = vec![Run::new("héllo", Marks::default(), None)];
        insert(&mut runs, 2, Run::new("X", Marks::default(), None));
        assert_eq!(plain(&runs), "héXllo");
        assert_eq!(char_len(&runs), 6);
    }

    #[test]
    fn link_runs_regroup() {
        let url = Some("https://a.example".to_string());
        let runs = vec![
            Run::new("go ", Marks::default(), None),
            Run::new("he", Marks::default(), url.clone()),
            Run::new("re", bold(), url.clone()),
        ];
        let nodes = rebuild(runs);
        assert_eq!(nodes.len(), 2);
        let Node::Element(link) = &nodes[1] else {
            panic!("expected link element");
        };
        assert_eq!(link.children.len(), 2);
        assert_eq!(flatten(&nodes)[2].link, url);
    }

    #[test]
    fn typing_at_link_edge_stays_outside() {
        let url = Some("https://a.example".to_string());
        let runs = vec![
            Run::new("ab", Marks::default(), None),
            Run::new("cd", Marks::default(), url.clone()),
        ];
        assert_eq!(link_inside(&runs, 4), None);
        assert_eq!(link_inside(&runs, 2), None);
        assert_eq!(link_inside(&runs, 3), url);
    }

    #[test]
    fn empty_block_rebuilds_to_empty_text() {
        assert_eq!(rebuild(Vec::new()), vec![Node::Text(Text::default())]);
    }
}
