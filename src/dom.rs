use crate::error::CanvasError;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fmt;

/// Minimal in-memory document tree: enough element/attribute surface for the
/// render and export paths to run headless, with no host document behind it.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl ToString) {
        let value = value.to_string();
        for slot in &mut self.attrs {
            if slot.0 == name {
                slot.1 = value;
                return;
            }
        }
        self.attrs.push((name.to_string(), value));
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn attrs_mut(&mut self) -> impl Iterator<Item = &mut (String, String)> {
        self.attrs.iter_mut()
    }

    /// Builder form of [`Element::set_attr`].
    pub fn set(mut self, name: &str, value: impl ToString) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn add(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn text(mut self, content: &str) -> Self {
        self.children.push(Node::Text(content.to_string()));
        self
    }

    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// Depth-first document-order lookup.
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.attr("id") == Some(id) {
            return Some(self);
        }
        self.child_elements()
            .find_map(|child| child.find_by_id(id))
    }

    pub fn descendants_named<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for child in self.child_elements() {
            if child.name == name {
                out.push(child);
            }
            child.descendants_named(name, out);
        }
    }

    /// Parse a standalone markup fragment; the first root element wins.
    /// Declarations, doctypes, and processing instructions are skipped.
    pub fn parse(input: &str) -> Result<Element, CanvasError> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    stack.push(element_from_tag(e));
                }
                Ok(Event::Empty(ref e)) => {
                    let element = element_from_tag(e);
                    match stack.last_mut() {
                        Some(parent) => parent.push(Node::Element(element)),
                        None => return Ok(element),
                    }
                }
                Ok(Event::Text(ref e)) => {
                    let text = unescape_xml(&e.decode().unwrap_or_default());
                    if !text.is_empty()
                        && let Some(parent) = stack.last_mut()
                    {
                        parent.push(Node::Text(text));
                    }
                }
                Ok(Event::CData(ref e)) => {
                    let text = String::from_utf8_lossy(e).to_string();
                    if let Some(parent) = stack.last_mut() {
                        parent.push(Node::Text(text));
                    }
                }
                Ok(Event::Comment(ref e)) => {
                    let text = e.decode().unwrap_or_default().to_string();
                    if let Some(parent) = stack.last_mut() {
                        parent.push(Node::Comment(text));
                    }
                }
                Ok(Event::End(_)) => {
                    let Some(element) = stack.pop() else {
                        return Err(CanvasError::Markup("unbalanced end tag".to_string()));
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.push(Node::Element(element)),
                        None => return Ok(element),
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(CanvasError::Markup(e.to_string())),
            }
            buf.clear();
        }

        Err(CanvasError::Markup("no root element".to_string()))
    }
}

fn element_from_tag(tag: &quick_xml::events::BytesStart<'_>) -> Element {
    let mut element = Element::new(&String::from_utf8_lossy(tag.name().as_ref()));
    for attr in tag.attributes().filter_map(|attr| attr.ok()) {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = unescape_xml(&String::from_utf8_lossy(&attr.value));
        element.attrs.push((key, value));
    }
    element
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for (key, value) in &self.attrs {
            write!(f, " {}=\"{}\"", key, escape_xml(value))?;
        }
        if self.children.is_empty() {
            return write!(f, "/>");
        }
        write!(f, ">")?;
        for child in &self.children {
            match child {
                Node::Element(element) => write!(f, "{element}")?,
                Node::Text(text) => write!(f, "{}", escape_xml(text))?,
                Node::Comment(text) => write!(f, "<!--{text}-->")?,
            }
        }
        write!(f, "</{}>", self.name)
    }
}

/// XML 1.0 valid char ranges: 0x09, 0x0A, 0x0D, 0x20..=0xD7FF,
/// 0xE000..=0xFFFD, 0x10000..=0x10FFFF.
fn is_valid_xml_char(c: char) -> bool {
    matches!(
        c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if !is_valid_xml_char(c) {
            continue;
        }
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_serializes() {
        let svg = Element::new("svg")
            .set("width", 100)
            .add(Element::new("circle").set("r", "5"))
            .text("hi");
        assert_eq!(
            svg.to_string(),
            r#"<svg width="100"><circle r="5"/>hi</svg>"#
        );
    }

    #[test]
    fn parse_round_trips_nested_markup() {
        let input = r#"<g transform="translate(1,2)"><defs><linearGradient id="grad1"/></defs><rect fill="url(#grad1)"/></g>"#;
        let element = Element::parse(input).unwrap();
        assert_eq!(element.to_string(), input);
    }

    #[test]
    fn parse_reports_broken_markup() {
        assert!(Element::parse("<svg><rect></svg>").is_err());
        assert!(Element::parse("just text").is_err());
    }

    #[test]
    fn find_by_id_walks_depth_first() {
        let tree = Element::new("svg").add(
            Element::new("defs").add(Element::new("clipPath").set("id", "clip-a")),
        );
        assert_eq!(tree.find_by_id("clip-a").unwrap().name, "clipPath");
        assert!(tree.find_by_id("clip-b").is_none());
    }

    #[test]
    fn descendants_named_is_document_order() {
        let tree = Element::new("svg")
            .add(Element::new("g").add(Element::new("image").set("href", "a.svg")))
            .add(Element::new("image").set("href", "b.svg"));
        let mut images = Vec::new();
        tree.descendants_named("image", &mut images);
        let hrefs: Vec<_> = images.iter().filter_map(|e| e.attr("href")).collect();
        assert_eq!(hrefs, vec!["a.svg", "b.svg"]);
    }

    #[test]
    fn escapes_attribute_values_and_text() {
        let el = Element::new("text").set("data-x", "a&b").text("<raw>");
        assert_eq!(
            el.to_string(),
            r#"<text data-x="a&amp;b">&lt;raw&gt;</text>"#
        );
    }

    #[test]
    fn drops_invalid_control_chars() {
        assert_eq!(escape_xml("A\u{0007}B"), "AB");
    }
}
