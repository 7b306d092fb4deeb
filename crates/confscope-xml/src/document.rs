//! Arena document model.
//!
//! Nodes live in a flat `Vec` and refer to each other by `NodeId`. Detaching a
//! node only unlinks it from its parent; the slot stays allocated (and
//! unreachable) until the document is dropped. Documents are short-lived edit
//! buffers, so we never compact.

use std::fmt;

use crate::error::XmlError;
use crate::parse::{parse_document, ParseOptions};

pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Index of a node inside its owning `Document`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        split_qname(&self.name).0
    }

    pub fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }

    /// `xmlns` / `xmlns:p` declarations are not attributes as far as queries
    /// are concerned.
    pub fn is_namespace_declaration(&self) -> bool {
        self.name == "xmlns" || self.prefix() == Some("xmlns")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element {
        name: String,
        attributes: Vec<Attribute>,
    },
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Default for XmlDeclaration {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            encoding: Some("utf-8".to_string()),
            standalone: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    declaration: Option<XmlDeclaration>,
    doctype: Option<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document: just the document node, no root element yet.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            declaration: None,
            doctype: None,
        }
    }

    pub fn parse(text: &str) -> Result<Self, XmlError> {
        parse_document(text, ParseOptions::default())
    }

    pub fn parse_with(text: &str, options: ParseOptions) -> Result<Self, XmlError> {
        parse_document(text, options)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|id| self.is_element(*id))
    }

    pub fn declaration(&self) -> Option<&XmlDeclaration> {
        self.declaration.as_ref()
    }

    pub fn set_declaration(&mut self, declaration: Option<XmlDeclaration>) {
        self.declaration = declaration;
    }

    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    pub fn set_doctype(&mut self, doctype: Option<String>) {
        self.doctype = doctype;
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element { .. })
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Child elements only, in document order.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.is_element(*child))
    }

    /// Child elements with the given qualified name.
    pub fn child_elements_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.child_elements(id)
            .filter(move |child| self.name(*child) == Some(name))
    }

    /// Preorder descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Rank of every reachable node in document order; detached nodes get
    /// `usize::MAX`.
    pub fn document_order(&self) -> Vec<usize> {
        let mut order = vec![usize::MAX; self.nodes.len()];
        order[self.root().index()] = 0;
        for (rank, id) in self.descendants(self.root()).into_iter().enumerate() {
            order[id.index()] = rank + 1;
        }
        order
    }

    /// Qualified name of an element.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.name(id).map(|name| split_qname(name).1)
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match self.kind(id) {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Resolve `prefix` (or the default namespace for `None`) in the scope of
    /// element `id`.
    pub fn lookup_namespace(&self, id: NodeId, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        let declaration = match prefix {
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        };
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(uri) = self.attribute(node, &declaration) {
                // `xmlns=""` undeclares the default namespace.
                return (!uri.is_empty()).then_some(uri);
            }
            current = self.parent(node);
        }
        None
    }

    /// Namespace URI of an element, resolved through in-scope declarations.
    pub fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        let name = self.name(id)?;
        self.lookup_namespace(id, split_qname(name).0)
    }

    /// XPath string-value: concatenated text of all descendant text and CDATA
    /// nodes for documents/elements, the content itself for leaf nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Text(text)
            | NodeKind::CData(text)
            | NodeKind::Comment(text)
            | NodeKind::ProcessingInstruction(text) => text.clone(),
            NodeKind::Document | NodeKind::Element { .. } => {
                let mut out = String::new();
                for node in self.descendants(id) {
                    if let NodeKind::Text(text) | NodeKind::CData(text) = self.kind(node) {
                        out.push_str(text);
                    }
                }
                out
            }
        }
    }

    // ========================================================================
    // Construction
    // ========================================================================

    pub(crate) fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.create_node(NodeKind::Element {
            name: name.into(),
            attributes: Vec::new(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.create_node(NodeKind::Text(text.into()))
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Set an attribute, appending it after the existing ones. An attribute
    /// with the same name is dropped first, so the new value wins.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), XmlError> {
        let attributes = self.attributes_mut(id)?;
        let name = name.into();
        attributes.retain(|attr| attr.name != name);
        attributes.push(Attribute {
            name,
            value: value.into(),
        });
        Ok(())
    }

    /// Change the value of an existing attribute in place. Returns `false`
    /// when the element has no such attribute.
    pub fn set_attribute_value(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<bool, XmlError> {
        let attributes = self.attributes_mut(id)?;
        match attributes.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => {
                attr.value = value.into();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<bool, XmlError> {
        let attributes = self.attributes_mut(id)?;
        let before = attributes.len();
        attributes.retain(|attr| attr.name != name);
        Ok(attributes.len() != before)
    }

    fn attributes_mut(&mut self, id: NodeId) -> Result<&mut Vec<Attribute>, XmlError> {
        match &mut self.nodes[id.index()].kind {
            NodeKind::Element { attributes, .. } => Ok(attributes),
            _ => Err(XmlError::NotAnElement { node: id }),
        }
    }

    /// Unlink `id` from its parent. No-op for nodes that are already detached.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|child| *child != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Insert `child` as the sibling immediately before `reference`.
    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) -> Result<(), XmlError> {
        let parent = self
            .parent(reference)
            .ok_or(XmlError::Detached { node: reference })?;
        self.detach(child);
        let siblings = &mut self.nodes[parent.index()].children;
        let position = siblings
            .iter()
            .position(|sibling| *sibling == reference)
            .unwrap_or(siblings.len());
        siblings.insert(position, child);
        self.nodes[child.index()].parent = Some(parent);
        Ok(())
    }
}

/// Split `p:local` into `(Some("p"), "local")`.
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}
