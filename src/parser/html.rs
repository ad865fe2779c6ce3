use std::borrow::Cow;

use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;

/// Elements that never have a closing tag in HTML.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Start tags that implicitly end an open `<p>`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "menu",
    "nav", "ol", "p", "pre", "section", "table", "ul",
];

/// An open `<p>` inside one of these is out of reach of later start tags.
const PARAGRAPH_SCOPE: &[&str] = &["button", "table", "td", "th", "caption", "object", "template"];

#[derive(Debug, Clone)]
enum NodeKind {
    Root,
    Element { name: String, attrs: Vec<(String, String)> },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    children: Vec<usize>,
}

/// A rendered tiddler, parsed into an element tree. Lenient the way a
/// browser is: unclosed elements are closed by their parent's end tag, stray
/// end tags are ignored and HTML entities are resolved.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

/// Borrowed handle to one element of a `Document`.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    doc: &'a Document,
    idx: usize,
}

impl Document {
    pub fn parse(html: &str) -> Result<Self, quick_xml::Error> {
        let html = escape_stray_lt(html);
        let mut reader = Reader::from_str(&html);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        let mut doc = Document {
            nodes: vec![Node { kind: NodeKind::Root, children: Vec::new() }],
        };
        // Open elements, innermost last. The root never leaves.
        let mut stack: Vec<usize> = vec![0];

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let (name, attrs) = element_parts(&e);
                    doc.close_paragraph_before(&name, &mut stack);
                    let is_void = VOID_ELEMENTS.contains(&name.as_str());
                    let idx = doc.push(*stack.last().unwrap_or(&0), NodeKind::Element { name, attrs });
                    if !is_void {
                        stack.push(idx);
                    }
                }
                Event::Empty(e) => {
                    let (name, attrs) = element_parts(&e);
                    doc.close_paragraph_before(&name, &mut stack);
                    doc.push(*stack.last().unwrap_or(&0), NodeKind::Element { name, attrs });
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                    let open = stack
                        .iter()
                        .rposition(|&i| matches!(&doc.nodes[i].kind, NodeKind::Element { name: n, .. } if *n == name));
                    if let Some(pos) = open {
                        stack.truncate(pos.max(1));
                    }
                }
                Event::Text(e) => {
                    let text = unescape_text(&e);
                    if !text.is_empty() {
                        doc.push(*stack.last().unwrap_or(&0), NodeKind::Text(text));
                    }
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    doc.push(*stack.last().unwrap_or(&0), NodeKind::Text(text));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(doc)
    }

    fn element_name(&self, idx: usize) -> Option<&str> {
        match &self.nodes[idx].kind {
            NodeKind::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    /// A block-level start tag ends the innermost open paragraph, as in a browser.
    fn close_paragraph_before(&self, tag: &str, stack: &mut Vec<usize>) {
        if !CLOSES_PARAGRAPH.contains(&tag) {
            return;
        }
        for pos in (1..stack.len()).rev() {
            match self.element_name(stack[pos]) {
                Some("p") => {
                    stack.truncate(pos);
                    return;
                }
                Some(name) if PARAGRAPH_SCOPE.contains(&name) => return,
                _ => {}
            }
        }
    }

    fn push(&mut self, parent: usize, kind: NodeKind) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node { kind, children: Vec::new() });
        self.nodes[parent].children.push(idx);
        idx
    }

    fn element(&self, idx: usize) -> Element<'_> {
        Element { doc: self, idx }
    }

    /// Document order walk over every element under `idx`, excluding `idx`.
    fn descendants(&self, idx: usize) -> impl Iterator<Item = Element<'_>> + '_ {
        let mut pending: Vec<usize> = self.nodes[idx].children.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            while let Some(i) = pending.pop() {
                pending.extend(self.nodes[i].children.iter().rev().copied());
                if matches!(self.nodes[i].kind, NodeKind::Element { .. }) {
                    return Some(self.element(i));
                }
            }
            None
        })
    }

    pub fn find(&self, selector: &Selector) -> Option<Element<'_>> {
        self.descendants(0).find(|e| selector.matches(e))
    }

    pub fn find_all<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = Element<'a>> + 'a {
        self.descendants(0).filter(move |e| selector.matches(e))
    }
}

impl<'a> Element<'a> {
    fn parts(&self) -> (&'a str, &'a [(String, String)]) {
        match &self.doc.nodes[self.idx].kind {
            NodeKind::Element { name, attrs } => (name.as_str(), attrs.as_slice()),
            _ => ("", &[]),
        }
    }

    pub fn name(&self) -> &'a str {
        self.parts().0
    }

    pub fn attr(&self, key: &str) -> Option<&'a str> {
        self.parts()
            .1
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn find(&self, selector: &Selector) -> Option<Element<'a>> {
        self.doc.descendants(self.idx).find(|e| selector.matches(e))
    }

    pub fn find_all(self, selector: &'a Selector) -> impl Iterator<Item = Element<'a>> + 'a {
        self.doc.descendants(self.idx).filter(move |e| selector.matches(e))
    }

    /// All text under this element, concatenated as-is.
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut pending = vec![self.idx];
        while let Some(i) = pending.pop() {
            let node = &self.doc.nodes[i];
            if let NodeKind::Text(t) = &node.kind {
                out.push_str(t);
            }
            pending.extend(node.children.iter().rev().copied());
        }
        out
    }
}

/// Tag/class/id filter, the subset of CSS selectors the note markup needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selector {
    pub tag: Option<&'static str>,
    pub class: Option<&'static str>,
    pub id: Option<&'static str>,
}

impl Selector {
    pub const fn tag(tag: &'static str) -> Self {
        Selector { tag: Some(tag), class: None, id: None }
    }

    pub const fn class(class: &'static str) -> Self {
        Selector { tag: None, class: Some(class), id: None }
    }

    pub const fn tag_class(tag: &'static str, class: &'static str) -> Self {
        Selector { tag: Some(tag), class: Some(class), id: None }
    }

    pub const fn tag_id(tag: &'static str, id: &'static str) -> Self {
        Selector { tag: Some(tag), class: None, id: Some(id) }
    }

    pub fn matches(&self, el: &Element<'_>) -> bool {
        self.tag.map_or(true, |t| el.name() == t)
            && self.class.map_or(true, |c| el.has_class(c))
            && self.id.map_or(true, |id| el.attr("id") == Some(id))
    }
}

fn element_parts(e: &BytesStart<'_>) -> (String, Vec<(String, String)>) {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
    let attrs = e
        .html_attributes()
        .filter_map(Result::ok)
        .map(|a| {
            let key = String::from_utf8_lossy(a.key.as_ref()).to_ascii_lowercase();
            let value = match a.unescape_value() {
                Ok(v) => v.into_owned(),
                Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
            };
            (key, value)
        })
        .collect();
    (name, attrs)
}

/// Escape every `<` that cannot start a tag, so text like `1 < 2` survives
/// tokenizing.
fn escape_stray_lt(html: &str) -> Cow<'_, str> {
    if !html.contains('<') {
        return Cow::Borrowed(html);
    }
    let mut out = String::with_capacity(html.len());
    let mut chars = html.chars().peekable();
    while let Some(c) = chars.next() {
        let starts_tag = chars
            .peek()
            .is_some_and(|n| n.is_ascii_alphabetic() || matches!(n, '/' | '!' | '?'));
        if c == '<' && !starts_tag {
            out.push_str("&lt;");
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

fn unescape_text(e: &BytesText<'_>) -> String {
    match e.unescape_with(resolve_html5_entity) {
        Ok(t) => t.into_owned(),
        // Unknown entity or bare ampersand: keep the source text.
        Err(_) => String::from_utf8_lossy(e).into_owned(),
    }
}
