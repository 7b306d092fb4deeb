//! Detached node trees.
//!
//! A `Fragment` is what an edit inserts: an ordered list of sibling nodes that
//! belongs to no document. Importing copies it into a target document, so one
//! fragment can be applied to any number of document clones.

use crate::document::{Attribute, Document, NodeId, NodeKind};
use crate::error::XmlError;

const WRAPPER_ELEMENT: &str = "confscope-fragment";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentNode {
    Element {
        name: String,
        attributes: Vec<Attribute>,
        children: Vec<FragmentNode>,
    },
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    nodes: Vec<FragmentNode>,
}

impl Fragment {
    pub fn new(nodes: Vec<FragmentNode>) -> Self {
        Self { nodes }
    }

    /// Parse markup that may hold several top-level siblings and bare text,
    /// e.g. `<a/>text<![CDATA[x]]>`.
    pub fn parse(markup: &str) -> Result<Self, XmlError> {
        let wrapped = format!("<{WRAPPER_ELEMENT}>{markup}</{WRAPPER_ELEMENT}>");
        let doc = Document::parse(&wrapped)?;
        let wrapper = doc.document_element().ok_or(XmlError::MissingRoot)?;
        Ok(doc.export_children(wrapper))
    }

    pub fn nodes(&self) -> &[FragmentNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Concatenated text and CDATA content, descending into elements.
    pub fn text(&self) -> String {
        fn collect(nodes: &[FragmentNode], out: &mut String) {
            for node in nodes {
                match node {
                    FragmentNode::Text(text) | FragmentNode::CData(text) => out.push_str(text),
                    FragmentNode::Element { children, .. } => collect(children, out),
                    FragmentNode::Comment(_) | FragmentNode::ProcessingInstruction(_) => {}
                }
            }
        }

        let mut out = String::new();
        collect(&self.nodes, &mut out);
        out
    }

    /// True when the fragment contains nothing but text (no elements, CDATA
    /// sections or comments).
    pub fn is_plain_text(&self) -> bool {
        self.nodes
            .iter()
            .all(|node| matches!(node, FragmentNode::Text(_)))
    }
}

impl Document {
    pub fn export_node(&self, id: NodeId) -> Option<FragmentNode> {
        let node = match self.kind(id) {
            NodeKind::Document => return None,
            NodeKind::Element { name, attributes } => FragmentNode::Element {
                name: name.clone(),
                attributes: attributes.clone(),
                children: self
                    .children(id)
                    .iter()
                    .filter_map(|child| self.export_node(*child))
                    .collect(),
            },
            NodeKind::Text(text) => FragmentNode::Text(text.clone()),
            NodeKind::CData(text) => FragmentNode::CData(text.clone()),
            NodeKind::Comment(text) => FragmentNode::Comment(text.clone()),
            NodeKind::ProcessingInstruction(text) => {
                FragmentNode::ProcessingInstruction(text.clone())
            }
        };
        Some(node)
    }

    /// Capture the children of `id` as a detached fragment.
    pub fn export_children(&self, id: NodeId) -> Fragment {
        Fragment::new(
            self.children(id)
                .iter()
                .filter_map(|child| self.export_node(*child))
                .collect(),
        )
    }

    fn import_node(&mut self, node: &FragmentNode) -> NodeId {
        match node {
            FragmentNode::Element {
                name,
                attributes,
                children,
            } => {
                let element = self.create_node(NodeKind::Element {
                    name: name.clone(),
                    attributes: attributes.clone(),
                });
                for child in children {
                    let child = self.import_node(child);
                    self.append_child(element, child);
                }
                element
            }
            FragmentNode::Text(text) => self.create_node(NodeKind::Text(text.clone())),
            FragmentNode::CData(text) => self.create_node(NodeKind::CData(text.clone())),
            FragmentNode::Comment(text) => self.create_node(NodeKind::Comment(text.clone())),
            FragmentNode::ProcessingInstruction(text) => {
                self.create_node(NodeKind::ProcessingInstruction(text.clone()))
            }
        }
    }

    /// Append copies of the fragment's nodes to `parent`'s children.
    pub fn append_fragment(&mut self, parent: NodeId, fragment: &Fragment) -> Vec<NodeId> {
        fragment
            .nodes()
            .iter()
            .map(|node| {
                let id = self.import_node(node);
                self.append_child(parent, id);
                id
            })
            .collect()
    }

    /// Replace `target` by copies of the fragment's nodes, at the same
    /// position among its siblings.
    pub fn replace_with_fragment(
        &mut self,
        target: NodeId,
        fragment: &Fragment,
    ) -> Result<Vec<NodeId>, XmlError> {
        if self.parent(target).is_none() {
            return Err(XmlError::Detached { node: target });
        }
        let mut inserted = Vec::with_capacity(fragment.nodes().len());
        for node in fragment.nodes() {
            let id = self.import_node(node);
            self.insert_before(target, id)?;
            inserted.push(id);
        }
        self.detach(target);
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_siblings() {
        let fragment = Fragment::parse(r#"<a x="1"><b/></a>text<![CDATA[<c>]]>"#).unwrap();
        assert_eq!(
            fragment.nodes(),
            &[
                FragmentNode::Element {
                    name: "a".to_string(),
                    attributes: vec![Attribute::new("x", "1")],
                    children: vec![FragmentNode::Element {
                        name: "b".to_string(),
                        attributes: vec![],
                        children: vec![],
                    }],
                },
                FragmentNode::Text("text".to_string()),
                FragmentNode::CData("<c>".to_string()),
            ]
        );
        assert_eq!(fragment.text(), "text<c>");
        assert!(!fragment.is_plain_text());
    }

    #[test]
    fn empty_markup_is_an_empty_fragment() {
        assert!(Fragment::parse("").unwrap().is_empty());
    }

    #[test]
    fn rejects_unbalanced_markup() {
        assert!(Fragment::parse("<a>").is_err());
        assert!(Fragment::parse("a & b").is_err());
    }

    #[test]
    fn replace_keeps_sibling_order() {
        let mut doc = Document::parse("<r><a/><b/><c/></r>").unwrap();
        let r = doc.document_element().unwrap();
        let b = doc.children(r)[1];
        let fragment = Fragment::parse("<x/><y/>").unwrap();
        doc.replace_with_fragment(b, &fragment).unwrap();
        assert_eq!(doc.inner_xml(r).unwrap(), "<a/><x/><y/><c/>");
    }

    #[test]
    fn append_imports_independent_copies() {
        let mut doc = Document::parse("<r/>").unwrap();
        let r = doc.document_element().unwrap();
        let fragment = Fragment::parse("<x/>").unwrap();
        let first = doc.append_fragment(r, &fragment);
        let second = doc.append_fragment(r, &fragment);
        assert_ne!(first, second);
        assert_eq!(doc.inner_xml(r).unwrap(), "<x/><x/>");
    }
}
