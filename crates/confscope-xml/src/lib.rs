//! Confscope XML engine
//!
//! A small, owned XML document model tuned for scripted edits:
//!
//! - `document`: arena of nodes addressed by `NodeId` (cheap deep `Clone`)
//! - `parse` / `write`: `quick-xml` backed reader and writer
//! - `fragment`: detached node trees used as edit payloads
//! - `query`: an XPath 1.0 subset (location paths, predicates, unions)
//! - `compare`: structural equality that ignores attribute order and
//!   insignificant whitespace
//!
//! Every operation here is synchronous and allocation-local; a `Document` is
//! `Send + Sync` so read-only documents can be shared across worker threads
//! while each worker mutates its own clone.

pub mod compare;
pub mod document;
pub mod error;
pub mod fragment;
pub mod parse;
pub mod query;
pub mod write;

pub use compare::{documents_equal, nodes_equal};
pub use document::{Attribute, Document, NodeId, NodeKind, XmlDeclaration};
pub use error::XmlError;
pub use fragment::{Fragment, FragmentNode};
pub use parse::ParseOptions;
pub use query::{Match, NamespaceMap, Query};
