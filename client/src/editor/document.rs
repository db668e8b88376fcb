//! Composer document tree.
//!
//! JSON layout matches the editor value the web composer produces: a bare
//! array of nodes, where elements carry a `type` tag plus `children` and text
//! leaves carry `text` plus boolean mark flags.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementKind {
    Paragraph,
    HeadingOne,
    HeadingTwo,
    BlockQuote,
    CodeBlock,
    BulletedList,
    NumberedList,
    ListItem,
    Link,
    Unknown(String),
}

impl ElementKind {
    pub fn is_list(&self) -> bool {
        matches!(self, Self::BulletedList | Self::NumberedList)
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Link)
    }
}

impl From<String> for ElementKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "paragraph" => Self::Paragraph,
            "heading-one" => Self::HeadingOne,
            "heading-two" => Self::HeadingTwo,
            "block-quote" => Self::BlockQuote,
            "code-block" => Self::CodeBlock,
            "bulleted-list" => Self::BulletedList,
            "numbered-list" => Self::NumberedList,
            "list-item" => Self::ListItem,
            "link" => Self::Link,
            _ => Self::Unknown(tag),
        }
    }
}

impl From<ElementKind> for String {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Paragraph => "paragraph".to_string(),
            ElementKind::HeadingOne => "heading-one".to_string(),
            ElementKind::HeadingTwo => "heading-two".to_string(),
            ElementKind::BlockQuote => "block-quote".to_string(),
            ElementKind::CodeBlock => "code-block".to_string(),
            ElementKind::BulletedList => "bulleted-list".to_string(),
            ElementKind::NumberedList => "numbered-list".to_string(),
            ElementKind::ListItem => "list-item".to_string(),
            ElementKind::Link => "link".to_string(),
            ElementKind::Unknown(tag) => tag,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from(self.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Code,
}

/// The mark flags of a text run, detached from its text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Marks {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub code: bool,
}

impl Marks {
    pub fn has(&self, mark: Mark) -> bool {
        match mark {
            Mark::Bold => self.bold,
            Mark::Italic => self.italic,
            Mark::Underline => self.underline,
            Mark::Code => self.code,
        }
    }

    pub fn set(&mut self, mark: Mark, on: bool) {
        match mark {
            Mark::Bold => self.bold = on,
            Mark::Italic => self.italic = on,
            Mark::Underline => self.underline = on,
            Mark::Code => self.code = on,
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
}

impl Text {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_marks(text: impl Into<String>, marks: Marks) -> Self {
        Self {
            text: text.into(),
            bold: marks.bold,
            italic: marks.italic,
            underline: marks.underline,
            code: marks.code,
        }
    }

    pub fn marked(mut self, mark: Mark) -> Self {
        let mut marks = self.marks();
        marks.set(mark, true);
        self.bold = marks.bold;
        self.italic = marks.italic;
        self.underline = marks.underline;
        self.code = marks.code;
        self
    }

    pub fn marks(&self) -> Marks {
        Marks {
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            code: self.code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(kind: ElementKind, children: Vec<Node>) -> Self {
        Self {
            kind,
            url: None,
            children,
        }
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Self::new(ElementKind::Paragraph, children)
    }

    pub fn link(url: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            kind: ElementKind::Link,
            url: Some(url.into()),
            children,
        }
    }

    /// A block whose children are all inline (text or links). The cursor
    /// lives inside these.
    pub fn is_text_block(&self) -> bool {
        if self.kind.is_inline() || self.kind.is_list() || self.kind == ElementKind::ListItem {
            return false;
        }
        self.children.iter().all(|child| match child {
            Node::Text(_) => true,
            Node::Element(el) => el.kind.is_inline(),
        })
    }
}

/// Element or text leaf. Elements are tried first; a leaf has no `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Element(Element),
    Text(Text),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(el) => Some(el),
            Self::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(el) => Some(el),
            Self::Text(_) => None,
        }
    }

    fn push_text(&self, out: &mut String) {
        match self {
            Self::Text(t) => out.push_str(&t.text),
            Self::Element(el) => {
                for child in &el.children {
                    child.push_text(out);
                }
            }
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Self::Element(el)
    }
}

impl From<Text> for Node {
    fn from(t: Text) -> Self {
        Self::Text(t)
    }
}

/// Path of child indexes from the document root.
pub type Path = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub children: Vec<Node>,
}

impl Default for Document {
    /// One empty paragraph.
    fn default() -> Self {
        Self {
            children: vec![Element::paragraph(vec![Text::default().into()]).into()],
        }
    }
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn get(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for idx in rest {
            node = node.as_element()?.children.get(*idx)?;
        }
        Some(node)
    }

    pub fn get_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get_mut(*first)?;
        for idx in rest {
            node = node.as_element_mut()?.children.get_mut(*idx)?;
        }
        Some(node)
    }

    pub fn element(&self, path: &[usize]) -> Option<&Element> {
        self.get(path)?.as_element()
    }

    pub fn element_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        self.get_mut(path)?.as_element_mut()
    }

    /// Children of the node at `path`; the empty path is the root.
    pub fn children_mut(&mut self, path: &[usize]) -> Option<&mut Vec<Node>> {
        if path.is_empty() {
            return Some(&mut self.children);
        }
        Some(&mut self.element_mut(path)?.children)
    }

    /// Paths of every text block, in document order.
    pub fn text_blocks(&self) -> Vec<Path> {
        fn walk(nodes: &[Node], prefix: &mut Path, out: &mut Vec<Path>) {
            for (i, node) in nodes.iter().enumerate() {
                let Node::Element(el) = node else { continue };
                prefix.push(i);
                if el.is_text_block() {
                    out.push(prefix.clone());
                } else if !el.kind.is_inline() {
                    walk(&el.children, prefix, out);
                }
                prefix.pop();
            }
        }
        let mut out = Vec::new();
        walk(&self.children, &mut Vec::new(), &mut out);
        out
    }

    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            node.push_text(&mut out);
        }
        out
    }

    /// Nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.plain_text().trim().is_empty()
    }
}
