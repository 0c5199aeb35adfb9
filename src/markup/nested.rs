//! Nested, serializable form of the markup tree
//!
//! Used to build trees in tests and to exchange annotated utterances as JSON
//! with the CLI. This is a plain structural mirror of the arena, not a markup
//! parser.

use super::{MarkupTree, NodeId, NodeKind, ATTR_BREAKINDEX, ATTR_LANG, ATTR_PHONE};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One element with its attributes and children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            tag: kind.tag().to_string(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Document root with locale
    pub fn document(locale: &str, children: Vec<NodeSpec>) -> Self {
        Self::new(NodeKind::Document)
            .with_attr(ATTR_LANG, locale)
            .with_children(children)
    }

    pub fn syllable(phones: Vec<NodeSpec>) -> Self {
        Self::new(NodeKind::Syllable).with_children(phones)
    }

    pub fn phone(symbol: &str) -> Self {
        Self::new(NodeKind::Phone).with_attr(ATTR_PHONE, symbol)
    }

    pub fn boundary(breakindex: u8) -> Self {
        Self::new(NodeKind::Boundary).with_attr(ATTR_BREAKINDEX, breakindex.to_string())
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<NodeSpec>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn kind(&self) -> NodeKind {
        NodeKind::from_tag(&self.tag)
    }
}

impl MarkupTree {
    /// Build an arena tree from its nested form
    pub fn from_spec(spec: &NodeSpec) -> Self {
        let mut tree = MarkupTree::new(spec.kind());
        let root = tree.root();
        for (name, value) in &spec.attributes {
            tree.set_attribute(root, name, value.as_str());
        }
        for child in &spec.children {
            tree.append_spec(root, child);
        }
        tree
    }

    /// Append a nested subtree below `parent`, returning the subtree root
    pub fn append_spec(&mut self, parent: NodeId, spec: &NodeSpec) -> NodeId {
        let id = self.append(parent, spec.kind());
        for (name, value) in &spec.attributes {
            self.set_attribute(id, name, value.as_str());
        }
        for child in &spec.children {
            self.append_spec(id, child);
        }
        id
    }

    /// Nested form of the whole tree
    pub fn to_spec(&self) -> NodeSpec {
        self.subtree_spec(self.root())
    }

    fn subtree_spec(&self, id: NodeId) -> NodeSpec {
        NodeSpec {
            tag: self.kind(id).tag().to_string(),
            attributes: self.attributes(id).clone(),
            children: self
                .children(id)
                .iter()
                .map(|&child| self.subtree_spec(child))
                .collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let spec: NodeSpec = serde_json::from_str(json)
            .map_err(|e| Error::Markup(format!("Invalid tree JSON: {}", e)))?;
        Ok(Self::from_spec(&spec))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_spec())
            .map_err(|e| Error::Markup(format!("Failed to serialize tree: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_spec_preserves_structure() {
        let spec = NodeSpec::document(
            "en-US",
            vec![
                NodeSpec::syllable(vec![NodeSpec::phone("k"), NodeSpec::phone("a")]),
                NodeSpec::boundary(4),
            ],
        );
        let tree = MarkupTree::from_spec(&spec);
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.locale(), Some("en-US"));
        assert_eq!(tree.to_spec(), spec);
    }

    #[test]
    fn test_json_with_unknown_tags() {
        let json = concat!(
            r#"{"tag":"maryxml","children":[{"tag":"mtu","#,
            r#""children":[{"tag":"syllable"}]}]}"#
        );
        let tree = MarkupTree::from_json(json).unwrap();
        let kinds = [NodeKind::Syllable];
        assert_eq!(tree.walk(&kinds).count(), 1);
    }

    #[test]
    fn test_invalid_json_is_markup_error() {
        let err = MarkupTree::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Markup(_)));
    }
}
