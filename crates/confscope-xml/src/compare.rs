//! Structural equality.
//!
//! Two elements are equal when their names match, their attribute sets match
//! (order ignored) and their significant children match pairwise. Significant
//! children are elements, CDATA sections and text that is not whitespace-only;
//! adjacent text nodes count as one, since the writer emits them as one run,
//! and text is compared trimmed. Comments and processing instructions are
//! ignored.

use crate::document::{Document, NodeId, NodeKind};

/// Compare the document elements of two documents.
pub fn documents_equal(left: &Document, right: &Document) -> bool {
    match (left.document_element(), right.document_element()) {
        (Some(a), Some(b)) => nodes_equal(left, a, right, b),
        (None, None) => true,
        _ => false,
    }
}

pub fn nodes_equal(left: &Document, a: NodeId, right: &Document, b: NodeId) -> bool {
    match (left.kind(a), right.kind(b)) {
        (
            NodeKind::Element {
                name: name_a,
                attributes: attrs_a,
            },
            NodeKind::Element {
                name: name_b,
                attributes: attrs_b,
            },
        ) => {
            if name_a != name_b || attrs_a.len() != attrs_b.len() {
                return false;
            }
            let same_attributes = attrs_a.iter().all(|attr| {
                attrs_b
                    .iter()
                    .any(|other| other.name == attr.name && other.value == attr.value)
            });
            if !same_attributes {
                return false;
            }
            let children_a = significant_children(left, a);
            let children_b = significant_children(right, b);
            children_a.len() == children_b.len()
                && children_a
                    .iter()
                    .zip(children_b.iter())
                    .all(|(x, y)| match (x, y) {
                        (Child::Node(x), Child::Node(y)) => nodes_equal(left, *x, right, *y),
                        (Child::Text(x), Child::Text(y)) => x.trim() == y.trim(),
                        _ => false,
                    })
        }
        (NodeKind::Text(x), NodeKind::Text(y)) => x.trim() == y.trim(),
        (NodeKind::CData(x), NodeKind::CData(y)) => x == y,
        (NodeKind::Document, NodeKind::Document) => documents_equal(left, right),
        _ => false,
    }
}

enum Child {
    Node(NodeId),
    /// A run of adjacent text nodes, concatenated.
    Text(String),
}

fn significant_children(doc: &Document, id: NodeId) -> Vec<Child> {
    let mut out: Vec<Child> = Vec::new();
    let mut in_text_run = false;
    for child in doc.children(id) {
        match doc.kind(*child) {
            NodeKind::Text(text) => {
                match out.last_mut() {
                    Some(Child::Text(run)) if in_text_run => run.push_str(text),
                    _ => out.push(Child::Text(text.clone())),
                }
                in_text_run = true;
            }
            NodeKind::Element { .. } | NodeKind::CData(_) => {
                out.push(Child::Node(*child));
                in_text_run = false;
            }
            _ => in_text_run = false,
        }
    }
    out.retain(|child| !matches!(child, Child::Text(text) if text.trim().is_empty()));
    out
}
