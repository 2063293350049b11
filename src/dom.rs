//! Headless element tree for panel rendering.
//!
//! Nodes live in an arena indexed by [`NodeId`]; detaching a subtree leaves
//! its nodes in the arena, so stale ids held by pending work remain safe to
//! poke at. Markup is parsed with `quick-xml` and serialized back with the
//! same escaping rules.

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::markup::{decode_entities, resolve_entity};

/// Errors raised while parsing markup into a tree.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The underlying parser rejected the input.
    #[error("markup syntax error: {0}")]
    Syntax(String),

    /// An element was still open when the input ended.
    #[error("unclosed element <{0}>")]
    Unclosed(String),
}

/// Handle to a node in a [`Document`] arena.
///
/// Ids stay valid for the lifetime of the document, including after the
/// node has been detached from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Playback state of a loading indicator attached to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinnerState {
    Running,
    Paused,
}

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        hidden: bool,
        spinner: Option<SpinnerState>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Elements serialized in self-closing form.
const VOID_TAGS: &[&str] = &["img", "br", "hr", "input", "meta", "link"];

/// An arena-backed element tree.
///
/// The root node is a synthetic container: serializing it emits only its
/// children, so a document can hold any number of top-level elements.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        let root = Node {
            data: NodeData::Element {
                tag: String::new(),
                attrs: Vec::new(),
                hidden: false,
                spinner: None,
            },
            parent: None,
            children: Vec::new(),
        };
        Document {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// Parses markup into a new document.
    ///
    /// The input must be well-formed; any number of top-level elements is
    /// accepted. Unknown entity references are kept verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the markup is malformed or an element is
    /// left unclosed.
    pub fn parse(markup: &str) -> Result<Self, ParseError> {
        let mut doc = Document::new();
        let root = doc.root;
        doc.parse_into(root, markup)?;
        Ok(doc)
    }

    /// The synthetic root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Creates a detached element node.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeData::Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
            hidden: false,
            spinner: None,
        })
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeData::Text(text.to_string()))
    }

    /// Appends `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Inserts `node` immediately before `reference` under the reference's
    /// parent. Does nothing when the reference is detached.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        let Some(parent) = self.nodes[reference.0].parent else {
            return;
        };
        self.detach(node);
        let pos = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == reference);
        match pos {
            Some(pos) => {
                self.nodes[node.0].parent = Some(parent);
                self.nodes[parent.0].children.insert(pos, node);
            }
            None => self.append(parent, node),
        }
    }

    /// Detaches `node` from its parent. The subtree stays in the arena and
    /// its ids remain usable.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    /// Detaches and returns all children of `node`.
    pub fn take_children(&mut self, node: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for &child in &children {
            self.nodes[child.0].parent = None;
        }
        children
    }

    /// Deep-copies the subtree rooted at `node`; the copy starts detached.
    pub fn clone_subtree(&mut self, node: NodeId) -> NodeId {
        let data = self.nodes[node.0].data.clone();
        let copy = self.push_node(data);
        let children = self.nodes[node.0].children.clone();
        for child in children {
            let child_copy = self.clone_subtree(child);
            self.append(copy, child_copy);
        }
        copy
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Element tag name, or `None` for text nodes.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    /// Text node content, or `None` for elements.
    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => Some(text),
            NodeData::Element { .. } => None,
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            NodeData::Text(_) => None,
        }
    }

    /// Sets an attribute, replacing any existing value. No-op on text nodes.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[node.0].data {
            match attrs.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[node.0].data {
            attrs.retain(|(key, _)| key != name);
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attr(node, "class")
            .map(|value| value.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let value = match self.attr(node, "class") {
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.set_attr(node, "class", &value);
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        let Some(existing) = self.attr(node, "class") else {
            return;
        };
        let value = existing
            .split_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr(node, "class", &value);
    }

    pub fn is_hidden(&self, node: NodeId) -> bool {
        match &self.nodes[node.0].data {
            NodeData::Element { hidden, .. } => *hidden,
            NodeData::Text(_) => false,
        }
    }

    pub fn set_hidden(&mut self, node: NodeId, hidden: bool) {
        if let NodeData::Element { hidden: flag, .. } = &mut self.nodes[node.0].data {
            *flag = hidden;
        }
    }

    pub fn spinner(&self, node: NodeId) -> Option<SpinnerState> {
        match &self.nodes[node.0].data {
            NodeData::Element { spinner, .. } => *spinner,
            NodeData::Text(_) => None,
        }
    }

    pub fn set_spinner(&mut self, node: NodeId, state: Option<SpinnerState>) {
        if let NodeData::Element { spinner, .. } = &mut self.nodes[node.0].data {
            *spinner = state;
        }
    }

    /// Replaces the node's children with a single text node.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) {
        self.take_children(node);
        let child = self.create_text(text);
        self.append(node, child);
    }

    /// All nodes of the subtree rooted at `node`, preorder, `node` first.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            out.push(current);
            for &child in self.nodes[current.0].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// First node under `from` (inclusive) carrying `class`.
    pub fn find_class(&self, from: NodeId, class: &str) -> Option<NodeId> {
        self.descendants(from)
            .into_iter()
            .find(|&n| self.has_class(n, class))
    }

    /// All nodes under `from` (inclusive) carrying `class`.
    pub fn find_all_class(&self, from: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(from)
            .into_iter()
            .filter(|&n| self.has_class(n, class))
            .collect()
    }

    /// All elements under `from` (inclusive) with the given tag name.
    pub fn find_all_tag(&self, from: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(from)
            .into_iter()
            .filter(|&n| self.tag(n) == Some(tag))
            .collect()
    }

    /// First node under `from` (inclusive) whose `id` attribute matches.
    pub fn find_by_id(&self, from: NodeId, id: &str) -> Option<NodeId> {
        self.descendants(from)
            .into_iter()
            .find(|&n| self.attr(n, "id") == Some(id))
    }

    /// Parses `markup` and appends its top-level nodes under `parent`.
    ///
    /// Malformed markup degrades to a single text node holding the raw
    /// input, so host-supplied content can never corrupt the tree.
    pub fn append_fragment(&mut self, parent: NodeId, markup: &str) {
        let mut fragment = Document::new();
        let fragment_root = fragment.root;
        match fragment.parse_into(fragment_root, markup) {
            Ok(()) => {
                let top_level = fragment.children(fragment_root).to_vec();
                for node in top_level {
                    let copy = self.graft(&fragment, node);
                    self.append(parent, copy);
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "fragment rejected, inserting as text");
                let text = self.create_text(markup);
                self.append(parent, text);
            }
        }
    }

    /// Recreates a subtree of `src` inside this arena; returns the detached copy.
    fn graft(&mut self, src: &Document, node: NodeId) -> NodeId {
        let copy = self.push_node(src.nodes[node.0].data.clone());
        for &child in &src.nodes[node.0].children {
            let child_copy = self.graft(src, child);
            self.append(copy, child_copy);
        }
        copy
    }

    fn parse_into(&mut self, parent: NodeId, markup: &str) -> Result<(), ParseError> {
        let mut reader = Reader::from_str(markup);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<NodeId> = vec![parent];
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let node = self.element_from_start(&e)?;
                    let top = *stack.last().unwrap_or(&parent);
                    self.append(top, node);
                    stack.push(node);
                }
                Ok(Event::Empty(e)) => {
                    let node = self.element_from_start(&e)?;
                    let top = *stack.last().unwrap_or(&parent);
                    self.append(top, node);
                }
                Ok(Event::End(_)) => {
                    // Name mismatches are rejected by the reader itself.
                    if stack.len() > 1 {
                        stack.pop();
                    }
                }
                Ok(Event::Text(e)) => {
                    let text = e
                        .decode()
                        .map_err(|err| ParseError::Syntax(err.to_string()))?;
                    let node = self.create_text(&text);
                    let top = *stack.last().unwrap_or(&parent);
                    self.append(top, node);
                }
                Ok(Event::GeneralRef(e)) => {
                    let name = String::from_utf8_lossy(e.as_ref()).into_owned();
                    let text = match resolve_entity(&name) {
                        Some(ch) => ch.to_string(),
                        None => format!("&{name};"),
                    };
                    let node = self.create_text(&text);
                    let top = *stack.last().unwrap_or(&parent);
                    self.append(top, node);
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    let node = self.create_text(&text);
                    let top = *stack.last().unwrap_or(&parent);
                    self.append(top, node);
                }
                Ok(Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_)) => {}
                Ok(Event::Eof) => break,
                Err(err) => return Err(ParseError::Syntax(err.to_string())),
            }
        }

        if stack.len() > 1 {
            let unclosed = stack
                .last()
                .and_then(|&n| self.tag(n))
                .unwrap_or_default()
                .to_string();
            return Err(ParseError::Unclosed(unclosed));
        }
        Ok(())
    }

    fn element_from_start(
        &mut self,
        e: &quick_xml::events::BytesStart<'_>,
    ) -> Result<NodeId, ParseError> {
        let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| ParseError::Syntax(err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let raw = String::from_utf8_lossy(&attr.value);
            attrs.push((key, decode_entities(&raw)));
        }
        Ok(self.push_node(NodeData::Element {
            tag,
            attrs,
            hidden: false,
            spinner: None,
        }))
    }

    /// Serializes the subtree rooted at `node` back to markup.
    ///
    /// The hidden flag is rendered as a `display: none` inline style merged
    /// ahead of any explicit `style` attribute; spinner state becomes a
    /// `data-spinner` attribute.
    pub fn serialize(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.serialize_node(node, &mut out);
        out
    }

    fn serialize_node(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => out.push_str(&partial_escape(text)),
            NodeData::Element {
                tag,
                attrs,
                hidden,
                spinner,
            } => {
                if tag.is_empty() {
                    for &child in &self.nodes[node.0].children {
                        self.serialize_node(child, out);
                    }
                    return;
                }

                out.push('<');
                out.push_str(tag);
                let mut wrote_style = false;
                for (key, value) in attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    if key == "style" && *hidden {
                        out.push_str("display: none; ");
                        wrote_style = true;
                    }
                    out.push_str(&escape(value.as_str()));
                    out.push('"');
                }
                if *hidden && !wrote_style {
                    out.push_str(" style=\"display: none\"");
                }
                match spinner {
                    Some(SpinnerState::Running) => out.push_str(" data-spinner=\"running\""),
                    Some(SpinnerState::Paused) => out.push_str(" data-spinner=\"paused\""),
                    None => {}
                }

                if VOID_TAGS.contains(&tag.as_str()) && self.nodes[node.0].children.is_empty() {
                    out.push_str(" />");
                    return;
                }
                out.push('>');
                for &child in &self.nodes[node.0].children {
                    self.serialize_node(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}
