use std::{
    fmt,
    io::{BufRead, Write},
};

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Reader, Writer,
};

use super::{error::XmlError, pattern::SearchPattern, types::NodeId};

/// A single element stored in the [XmlTree] arena.
#[derive(Debug, Clone, PartialEq)]
struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Element {
    fn new(start: &BytesStart<'_>, parent: Option<NodeId>) -> Result<Self, XmlError> {
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            attributes.push((
                String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
                attribute.unescape_value()?.into_owned(),
            ));
        }
        Ok(Element {
            tag: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            text: None,
            parent,
            children: Vec::new(),
        })
    }
}

/// An owned XML element tree.
///
/// Elements live in a flat arena and know both their parent and their
/// children, so removing a subtree or walking up to the root never requires a
/// search. Ids are assigned in document order while parsing, and are never
/// reused: a removed subtree simply becomes unreachable from the root.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlTree {
    nodes: Vec<Element>,
}

/// The root element always occupies the first slot of the arena
const ROOT: NodeId = 0;

impl XmlTree {
    /// Parse a document from a buffered reader.
    ///
    /// Only the text preceding the first child of an element is kept, which
    /// is what leaf values in a save look like. Whitespace only text is
    /// discarded.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, XmlError> {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(true);
        let mut nodes: Vec<Element> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(start) => {
                    let id = Self::push_element(&mut nodes, &stack, &start)?;
                    stack.push(id);
                }
                Event::Empty(start) => {
                    Self::push_element(&mut nodes, &stack, &start)?;
                }
                Event::End(_) => {
                    if stack.pop().is_none() {
                        return Err(XmlError::Malformed("closing tag without an opening tag"));
                    }
                }
                Event::Text(text) => {
                    if let Some(&id) = stack.last() {
                        let text = text.unescape()?;
                        Self::append_text(&mut nodes[id], &text);
                    }
                }
                Event::CData(data) => {
                    if let Some(&id) = stack.last() {
                        let data = data.into_inner();
                        Self::append_text(&mut nodes[id], &String::from_utf8_lossy(&data));
                    }
                }
                Event::Eof => break,
                // declarations, comments, processing instructions and doctypes carry no data for us
                _ => {}
            }
            buf.clear();
        }
        if !stack.is_empty() {
            return Err(XmlError::Malformed("document ended with unclosed elements"));
        }
        if nodes.is_empty() {
            return Err(XmlError::Malformed("document has no root element"));
        }
        Ok(XmlTree { nodes })
    }

    /// Parse a document held in memory
    pub fn parse_str(contents: &str) -> Result<Self, XmlError> {
        Self::parse(contents.as_bytes())
    }

    fn push_element(
        nodes: &mut Vec<Element>,
        stack: &[NodeId],
        start: &BytesStart<'_>,
    ) -> Result<NodeId, XmlError> {
        let parent = stack.last().copied();
        if parent.is_none() && !nodes.is_empty() {
            return Err(XmlError::Malformed("document has more than one root element"));
        }
        let id = nodes.len();
        nodes.push(Element::new(start, parent)?);
        if let Some(parent) = parent {
            nodes[parent].children.push(id);
        }
        Ok(id)
    }

    fn append_text(element: &mut Element, text: &str) {
        // text after the first child is a tail, not the element's own value
        if !element.children.is_empty() || text.is_empty() {
            return;
        }
        match &mut element.text {
            Some(existing) => existing.push_str(text),
            None => element.text = Some(text.to_owned()),
        }
    }

    /// The document element
    pub fn root(&self) -> ElementRef<'_> {
        self.element(ROOT)
    }

    /// Get a handle to an element by its id.
    ///
    /// # Panics
    ///
    /// Panics if the id did not come from this tree
    pub fn element(&self, id: NodeId) -> ElementRef<'_> {
        assert!(id < self.nodes.len(), "node {} is not part of this tree", id);
        ElementRef { tree: self, id }
    }

    /// Shortcut for searching from the root element
    pub fn find(&self, pattern: &SearchPattern) -> Option<ElementRef<'_>> {
        self.root().find(pattern)
    }

    /// Shortcut for searching from the root element
    pub fn find_all(&self, pattern: &SearchPattern) -> Vec<ElementRef<'_>> {
        self.root().find_all(pattern)
    }

    /// Detach an element, and with it the whole subtree, from its parent.
    /// Returns false if the element has no parent, which is the case for the
    /// root and for elements that were already removed.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.nodes.get_mut(id).and_then(|e| e.parent.take()) else {
            return false;
        };
        self.nodes[parent].children.retain(|child| *child != id);
        true
    }

    /// Checks whether the element can still be reached from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == ROOT {
                return true;
            }
            match self.nodes.get(current).and_then(|e| e.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Number of elements reachable from the root
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            count += 1;
            stack.extend(self.nodes[id].children.iter().copied());
        }
        count
    }

    /// The chain of tags from the root down to the element, like
    /// `savegame > game > world`.
    pub fn lineage(&self, id: NodeId) -> String {
        let mut tags = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current.and_then(|id| self.nodes.get(id)) {
            tags.push(node.tag.as_str());
            current = node.parent;
        }
        tags.reverse();
        tags.join(" > ")
    }

    /// Serialize the attached part of the tree
    pub fn write<W: Write>(&self, output: W) -> Result<(), XmlError> {
        let mut writer = Writer::new_with_indent(output, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        self.write_element(&mut writer, ROOT)?;
        writer.into_inner().flush()?;
        Ok(())
    }

    fn write_element<W: Write>(&self, writer: &mut Writer<W>, id: NodeId) -> Result<(), XmlError> {
        let element = &self.nodes[id];
        let mut start = BytesStart::new(element.tag.as_str());
        for (key, value) in &element.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if element.text.is_none() && element.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;
        if let Some(text) = &element.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for &child in &element.children {
            self.write_element(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(element.tag.as_str())))?;
        Ok(())
    }
}

/// A borrowed handle to one element of an [XmlTree].
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    tree: &'a XmlTree,
    id: NodeId,
}

impl<'a> ElementRef<'a> {
    fn node(&self) -> &'a Element {
        &self.tree.nodes[self.id]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a XmlTree {
        self.tree
    }

    pub fn tag(&self) -> &'a str {
        &self.node().tag
    }

    /// The text content of the element, if it has any
    pub fn text(&self) -> Option<&'a str> {
        self.node().text.as_deref()
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.node()
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn parent(&self) -> Option<ElementRef<'a>> {
        self.node().parent.map(|id| self.tree.element(id))
    }

    pub fn children(&self) -> impl DoubleEndedIterator<Item = ElementRef<'a>> + 'a {
        let tree = self.tree;
        self.node()
            .children
            .iter()
            .map(move |&id| ElementRef { tree, id })
    }

    /// The first element matching the pattern, in document order
    pub fn find(&self, pattern: &SearchPattern) -> Option<ElementRef<'a>> {
        pattern
            .select(*self)
            .first()
            .map(|&id| self.tree.element(id))
    }

    /// Every element matching the pattern, in document order
    pub fn find_all(&self, pattern: &SearchPattern) -> Vec<ElementRef<'a>> {
        pattern
            .select(*self)
            .into_iter()
            .map(|id| self.tree.element(id))
            .collect()
    }

    /// The text of the first element matching the pattern.
    /// Returns None both when there is no such element and when it is empty.
    pub fn find_text(&self, pattern: &SearchPattern) -> Option<&'a str> {
        self.find(pattern).and_then(|e| e.text())
    }
}

impl fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRef")
            .field("id", &self.id)
            .field("tag", &self.tag())
            .finish()
    }
}

impl PartialEq for ElementRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}
