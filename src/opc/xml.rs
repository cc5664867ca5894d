//! Minimal owned XML tree used for pretty-printing package items.
//!
//! Parsing uses quick-xml events and builds the tree with an explicit element
//! stack. Text and attribute values are kept in their escaped source form, so
//! serialization never has to re-escape anything and a parse/serialize cycle
//! is stable.

use crate::opc::constants::pretty;
use crate::opc::error::{OpcError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// A node inside an element's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    /// Character data, escaped as it appeared in the source
    Text(String),
    /// Raw CDATA section content
    CData(String),
    /// Raw comment content
    Comment(String),
    /// Raw processing instruction content (target and data)
    Pi(String),
}

impl XmlNode {
    fn is_character_data(&self) -> bool {
        matches!(self, XmlNode::Text(_) | XmlNode::CData(_))
    }

    fn is_blank_text(&self) -> bool {
        matches!(self, XmlNode::Text(text) if text.bytes().all(|b| b.is_ascii_whitespace()))
    }

    /// Get the element inside this node, if it is one.
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// An XML element with its attributes and content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified tag name, including any prefix
    name: String,
    /// Attributes in source order; values are escaped
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Qualified tag name, e.g. `"p:sldMaster"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag name with any namespace prefix removed.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// Get the (escaped) value of the attribute with the given qualified name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn push_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((name.into(), value.into()));
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<XmlNode> {
        &mut self.children
    }

    pub fn push_child(&mut self, child: XmlNode) {
        self.children.push(child);
    }

    /// Iterate over the child nodes that are elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// An element is "mixed" when any of its content is character data.
    /// Mixed content is written inline, without added indentation.
    fn is_mixed(&self) -> bool {
        self.children.iter().any(XmlNode::is_character_data)
    }

    /// Drop whitespace-only text between child nodes.
    ///
    /// Text-only content (e.g. `<t> </t>`) is significant and left alone.
    fn strip_blank_text(&mut self) {
        let has_markup = self
            .children
            .iter()
            .any(|child| !matches!(child, XmlNode::Text(_)));
        if has_markup {
            self.children.retain(|child| !child.is_blank_text());
        }
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = std::str::from_utf8(start.name().as_ref())?.to_string();
        let mut element = XmlElement::new(name);

        for attr in start.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?;
            let value = std::str::from_utf8(&attr.value)?;
            // Values are re-emitted double-quoted; a single-quoted source value
            // may legally contain '"'.
            element.push_attribute(key, value.replace('"', "&quot;"));
        }

        Ok(element)
    }

    fn write_pretty(&self, out: &mut String, depth: usize, indent: bool) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(value);
            out.push('"');
        }

        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');

        let indent_children = indent && !self.is_mixed();
        for child in &self.children {
            if indent_children {
                out.push('\n');
                push_indent(out, depth + 1);
            }
            write_node(child, out, depth + 1, indent_children);
        }
        if indent_children {
            out.push('\n');
            push_indent(out, depth);
        }

        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// A parsed XML document: the root element plus any comments, processing
/// instructions, or doctype surrounding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    prolog: Vec<XmlNode>,
    doctype: Option<String>,
    root: XmlElement,
    epilog: Vec<XmlNode>,
}

impl XmlDocument {
    /// Parse a well-formed XML blob.
    ///
    /// # Errors
    /// Returns [`OpcError::MalformedXml`] (with an empty uri) if the blob is
    /// not well-formed, is not UTF-8, or has no root element.
    pub fn parse(blob: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(blob);
        reader.config_mut().check_end_names = true;

        let mut prolog = Vec::new();
        let mut doctype = None;
        let mut epilog = Vec::new();
        let mut root: Option<XmlElement> = None;
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut buf = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf)?;
            match event {
                Event::Start(ref e) => {
                    if stack.is_empty() && root.is_some() {
                        return Err(OpcError::malformed("more than one root element"));
                    }
                    stack.push(XmlElement::from_start(e)?);
                },
                Event::Empty(ref e) => {
                    let element = XmlElement::from_start(e)?;
                    match stack.last_mut() {
                        Some(parent) => parent.push_child(XmlNode::Element(element)),
                        None if root.is_none() => root = Some(element),
                        None => return Err(OpcError::malformed("more than one root element")),
                    }
                },
                Event::End(_) => {
                    let mut element = stack
                        .pop()
                        .ok_or_else(|| OpcError::malformed("unexpected end tag"))?;
                    element.strip_blank_text();
                    match stack.last_mut() {
                        Some(parent) => parent.push_child(XmlNode::Element(element)),
                        None => root = Some(element),
                    }
                },
                Event::Text(ref t) => {
                    let text = std::str::from_utf8(t)?;
                    match stack.last_mut() {
                        Some(parent) => push_text(parent, text),
                        None if is_blank_outside_root(text) => {},
                        None => return Err(OpcError::malformed("text outside of root element")),
                    }
                },
                Event::GeneralRef(ref r) => {
                    let name = std::str::from_utf8(r)?;
                    let parent = stack
                        .last_mut()
                        .ok_or_else(|| OpcError::malformed("entity outside of root element"))?;
                    push_text(parent, &format!("&{};", name));
                },
                Event::CData(ref c) => {
                    let text = std::str::from_utf8(c)?.to_string();
                    let parent = stack
                        .last_mut()
                        .ok_or_else(|| OpcError::malformed("CDATA outside of root element"))?;
                    parent.push_child(XmlNode::CData(text));
                },
                Event::Comment(ref c) => {
                    let node = XmlNode::Comment(std::str::from_utf8(c)?.to_string());
                    place_misc(node, &mut stack, &root, &mut prolog, &mut epilog);
                },
                Event::PI(ref p) => {
                    let node = XmlNode::Pi(std::str::from_utf8(p)?.to_string());
                    place_misc(node, &mut stack, &root, &mut prolog, &mut epilog);
                },
                Event::DocType(ref d) => {
                    doctype = Some(std::str::from_utf8(d)?.trim().to_string());
                },
                Event::Eof => break,
                // The declaration is always regenerated on output
                _ => {},
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(OpcError::malformed("unexpected end of document"));
        }
        let root = root.ok_or_else(|| OpcError::malformed("no root element found"))?;

        Ok(Self {
            prolog,
            doctype,
            root,
            epilog,
        })
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut XmlElement {
        &mut self.root
    }

    /// Serialize with an `standalone='yes'` UTF-8 declaration, two-space
    /// indentation of element-only content, and a trailing newline.
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::with_capacity(4096);
        out.push_str(pretty::XML_DECLARATION);
        out.push('\n');

        if let Some(doctype) = &self.doctype {
            out.push_str("<!DOCTYPE ");
            out.push_str(doctype);
            out.push_str(">\n");
        }
        for node in &self.prolog {
            write_node(node, &mut out, 0, true);
            out.push('\n');
        }

        self.root.write_pretty(&mut out, 0, true);
        out.push('\n');

        for node in &self.epilog {
            write_node(node, &mut out, 0, true);
            out.push('\n');
        }

        out
    }

    pub fn to_pretty_bytes(&self) -> Vec<u8> {
        self.to_pretty_string().into_bytes()
    }
}

/// Append text to `parent`, merging with a preceding text node so that
/// text split around entity references stays a single node.
fn push_text(parent: &mut XmlElement, text: &str) {
    if let Some(XmlNode::Text(existing)) = parent.children.last_mut() {
        existing.push_str(text);
    } else {
        parent.push_child(XmlNode::Text(text.to_string()));
    }
}

fn place_misc(
    node: XmlNode,
    stack: &mut [XmlElement],
    root: &Option<XmlElement>,
    prolog: &mut Vec<XmlNode>,
    epilog: &mut Vec<XmlNode>,
) {
    match stack.last_mut() {
        Some(parent) => parent.push_child(node),
        None if root.is_none() => prolog.push(node),
        None => epilog.push(node),
    }
}

fn write_node(node: &XmlNode, out: &mut String, depth: usize, indent: bool) {
    match node {
        XmlNode::Element(element) => element.write_pretty(out, depth, indent),
        XmlNode::Text(text) => out.push_str(text),
        XmlNode::CData(text) => {
            out.push_str("<![CDATA[");
            out.push_str(text);
            out.push_str("]]>");
        },
        XmlNode::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        },
        XmlNode::Pi(text) => {
            out.push_str("<?");
            out.push_str(text);
            out.push_str("?>");
        },
    }
}

/// Whitespace, or a byte-order mark, may surround the root element.
fn is_blank_outside_root(text: &str) -> bool {
    text.chars().all(|c| c.is_whitespace() || c == '\u{feff}')
}

#[inline]
fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(pretty::INDENT);
    }
}
