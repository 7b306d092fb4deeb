use thiserror::Error;

use crate::document::NodeId;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML at byte {position}: {source}")]
    Syntax {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },
    #[error("invalid UTF-8 in XML at byte {position}")]
    Utf8 { position: usize },
    #[error("document has no root element")]
    MissingRoot,
    #[error("document has more than one root element (second root: <{name}>)")]
    MultipleRoots { name: String },
    #[error("text content outside the root element at byte {position}")]
    TextOutsideRoot { position: usize },
    #[error("closing tag without a matching start tag at byte {position}")]
    UnexpectedEnd { position: usize },
    #[error("element <{name}> is never closed")]
    Unclosed { name: String },
    #[error("node {node} is not an element")]
    NotAnElement { node: NodeId },
    #[error("node {node} has no parent")]
    Detached { node: NodeId },
    #[error("failed to write XML: {0}")]
    Write(#[source] quick_xml::Error),
    #[error("invalid query `{query}`: {message}")]
    Query { query: String, message: String },
}
