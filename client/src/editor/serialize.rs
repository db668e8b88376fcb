//! Document to HTML, as sent in `message:send`.

use super::document::{Document, Element, ElementKind, Node, Text};

const SAFE_SCHEMES: [&str; 3] = ["http://", "https://", "mailto:"];

pub fn to_html(doc: &Document) -> String {
    let mut out = String::new();
    for node in &doc.children {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => write_text(text, out),
        Node::Element(el) => write_element(el, out),
    }
}

fn write_element(el: &Element, out: &mut String) {
    let tag = match &el.kind {
        ElementKind::Paragraph => "p",
        ElementKind::HeadingOne => "h1",
        ElementKind::HeadingTwo => "h2",
        ElementKind::BlockQuote => "blockquote",
        ElementKind::CodeBlock => "pre",
        ElementKind::BulletedList => "ul",
        ElementKind::NumberedList => "ol",
        ElementKind::ListItem => "li",
        ElementKind::Link => {
            let href = safe_href(el.url.as_deref().unwrap_or_default());
            out.push_str("<a href=\"");
            out.push_str(&escape(href));
            out.push_str("\" target=\"_blank\" rel=\"noopener noreferrer\">");
            write_children(el, out);
            out.push_str("</a>");
            return;
        }
        ElementKind::Unknown(_) => "p",
    };
    out.push('<');
    out.push_str(tag);
    out.push('>');
    write_children(el, out);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn write_children(el: &Element, out: &mut String) {
    for child in &el.children {
        write_node(child, out);
    }
}

fn write_text(text: &Text, out: &mut String) {
    let mut html = escape(&text.text).replace('\n', "<br>");
    // innermost first
    for (on, tag) in [
        (text.code, "code"),
        (text.underline, "u"),
        (text.italic, "em"),
        (text.bold, "strong"),
    ] {
        if on {
            html = format!("<{tag}>{html}</{tag}>");
        }
    }
    out.push_str(&html);
}

/// Only web and mail links survive; anything else (`javascript:`, relative
/// paths, data URIs) becomes `#`.
pub fn safe_href(url: &str) -> &str {
    let trimmed = url.trim();
    let lower = trimmed.to_ascii_lowercase();
    if SAFE_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        trimmed
    } else {
        "#"
    }
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::document::Mark;

    fn para(children: Vec<Node>) -> Node {
        Element::paragraph(children).into()
    }

    #[test]
    fn bold_run_in_bulleted_list() {
        let doc = Document::new(vec![
            Element::new(
                ElementKind::BulletedList,
                vec![
                    Element::new(
                        ElementKind::ListItem,
                        vec![para(vec![Text::plain("text").marked(Mark::Bold).into()])],
                    )
                    .into(),
                ],
            )
            .into(),
        ]);
        assert_eq!(to_html(&doc), "<ul><li><p><strong>text</strong></p></li></ul>");
    }

    #[test]
    fn text_is_escaped() {
        let doc = Document::new(vec![para(vec![Text::plain("<b>\"a\" & 'b'</b>").into()])]);
        assert_eq!(
            to_html(&doc),
            "<p>&lt;b&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/b&gt;</p>"
        );
    }

    #[test]
    fn nested_marks_and_breaks() {
        let text = Text::plain("a\nb")
            .marked(Mark::Bold)
            .marked(Mark::Italic)
            .marked(Mark::Code);
        let doc = Document::new(vec![para(vec![text.into()])]);
        assert_eq!(
            to_html(&doc),
            "<p><strong><em><code>a<br>b</code></em></strong></p>"
        );
    }

    #[test]
    fn links_are_sanitized() {
        let link = |url: &str| {
            Document::new(vec![para(vec![
                Element::link(url, vec![Text::plain("x").into()]).into(),
            ])])
        };
        assert_eq!(
            to_html(&link("https://a.example/?q=1&r=\"2\"")),
            "<p><a href=\"https://a.example/?q=1&amp;r=&quot;2&quot;\" target=\"_blank\" \
             rel=\"noopener noreferrer\">x</a></p>"
        );
        assert!(to_html(&link("javascript:alert(1)")).contains("href=\"#\""));
        assert!(to_html(&link("  JavaScript:alert(1)")).contains("href=\"#\""));
        assert!(to_html(&link("mailto:a@b.example")).contains("href=\"mailto:a@b.example\""));
    }

    #[test]
    fn block_tags_and_unknown_fallback() {
        let doc = Document::new(vec![
            Element::new(ElementKind::HeadingOne, vec![Text::plain("h").into()]).into(),
            Element::new(ElementKind::BlockQuote, vec![Text::plain("q").into()]).into(),
            Element::new(ElementKind::CodeBlock, vec![Text::plain("c").into()]).into(),
            Element::new(
                ElementKind::Unknown("mention".into()),
                vec![Text::plain("m").into()],
            )
            .into(),
        ]);
        assert_eq!(
            to_html(&doc),
            "<h1>h</h1><blockquote>q</blockquote><pre>c</pre><p>m</p>"
        );
    }

    #[test]
    fn empty_document_is_empty_paragraph() {
        assert_eq!(to_html(&Document::default()), "<p></p>");
    }
}
