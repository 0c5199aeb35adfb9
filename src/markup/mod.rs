//! Markup tree for utterance annotation
//!
//! An arena-backed, ordered tree mirroring the element hierarchy of a
//! MaryXML-style document: document, voice, paragraph, sentence, phrase,
//! token, syllable, phone and boundary nodes, each carrying string attributes.
//! The acoustic pipeline mutates attributes in place and never restructures
//! the tree.

mod nested;

pub use nested::NodeSpec;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Phone symbol attribute on segments
pub const ATTR_PHONE: &str = "p";
/// Segment duration: seconds before normalization, integer milliseconds after
pub const ATTR_DURATION: &str = "d";
/// Cumulative segment end time in seconds
pub const ATTR_END: &str = "end";
/// Unit tag written by the duration normalizer
pub const ATTR_DURATION_UNIT: &str = "d-unit";
/// Locale attribute on the document root (or any ancestor of a syllable)
pub const ATTR_LANG: &str = "xml:lang";
/// F0 target list, e.g. `(0,120) (50,135)`
pub const ATTR_F0: &str = "f0";
/// Break strength on boundaries
pub const ATTR_BREAKINDEX: &str = "breakindex";
/// Pause duration on boundaries, milliseconds
pub const ATTR_BOUNDARY_DURATION: &str = "duration";
/// Voice name on voice elements
pub const ATTR_VOICE_NAME: &str = "name";
/// Syllable transcription, used in diagnostics
pub const ATTR_SYLLABLE_PH: &str = "ph";

/// Handle to a node inside a [`MarkupTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena index of the node
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Element kinds of the markup tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Voice,
    Paragraph,
    Sentence,
    Phrase,
    Token,
    Syllable,
    Phone,
    Boundary,
    Other(String),
}

impl NodeKind {
    /// Element tag used in the serialized form
    pub fn tag(&self) -> &str {
        match self {
            NodeKind::Document => "maryxml",
            NodeKind::Voice => "voice",
            NodeKind::Paragraph => "p",
            NodeKind::Sentence => "s",
            NodeKind::Phrase => "phrase",
            NodeKind::Token => "t",
            NodeKind::Syllable => "syllable",
            NodeKind::Phone => "ph",
            NodeKind::Boundary => "boundary",
            NodeKind::Other(tag) => tag,
        }
    }

    /// Map an element tag back to its kind; unknown tags become `Other`
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "maryxml" => NodeKind::Document,
            "voice" => NodeKind::Voice,
            "p" => NodeKind::Paragraph,
            "s" => NodeKind::Sentence,
            "phrase" => NodeKind::Phrase,
            "t" => NodeKind::Token,
            "syllable" => NodeKind::Syllable,
            "ph" => NodeKind::Phone,
            "boundary" => NodeKind::Boundary,
            other => NodeKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    attributes: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Ordered, rooted markup tree
#[derive(Debug, Clone)]
pub struct MarkupTree {
    nodes: Vec<Node>,
}

impl MarkupTree {
    /// Create a tree holding only a root of the given kind
    pub fn new(root_kind: NodeKind) -> Self {
        Self {
            nodes: vec![Node {
                kind: root_kind,
                attributes: BTreeMap::new(),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Create an empty document root tagged with a locale
    pub fn document(locale: &str) -> Self {
        let mut tree = Self::new(NodeKind::Document);
        let root = tree.root();
        tree.set_attribute(root, ATTR_LANG, locale);
        tree
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].children.is_empty()
    }

    /// Append a new last child under `parent`
    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            attributes: BTreeMap::new(),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.0].attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self, id: NodeId) -> &BTreeMap<String, String> {
        &self.nodes[id.0].attributes
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        self.nodes[id.0]
            .attributes
            .insert(name.to_string(), value.into());
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.nodes[id.0].attributes.remove(name)
    }

    /// Attribute on the node itself or its nearest ancestor carrying it
    pub fn inherited_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(value) = self.attribute(node, name) {
                return Some(value);
            }
            current = self.parent(node);
        }
        None
    }

    /// Locale declared on the document root
    pub fn locale(&self) -> Option<&str> {
        self.attribute(self.root(), ATTR_LANG)
    }

    /// All nodes below `id` in document order, `id` itself excluded
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { tree: self, stack }
    }

    /// Document-order walk over the whole tree yielding only the given kinds.
    ///
    /// Nodes of other kinds are stepped through transparently, so syllables
    /// nested at any depth below tokens and phrases are found.
    pub fn walk<'a>(&'a self, kinds: &'a [NodeKind]) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(self.root())
            .filter(move |&id| kinds.contains(self.kind(id)))
    }

    /// Descendants of `id` of one kind, in document order
    pub fn descendants_of_kind<'a>(
        &'a self,
        id: NodeId,
        kind: &'a NodeKind,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(id).filter(move |&n| self.kind(n) == kind)
    }

    /// First node of a kind in document order
    pub fn first_of_kind(&self, kind: &NodeKind) -> Option<NodeId> {
        self.descendants_of_kind(self.root(), kind).next()
    }
}

/// Pre-order iterator returned by [`MarkupTree::descendants`]
pub struct Descendants<'a> {
    tree: &'a MarkupTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}
