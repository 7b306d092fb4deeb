//! Path queries: a practical subset of XPath 1.0.
//!
//! Supported:
//! - absolute and relative location paths, `//`, `.`, `..`
//! - axes `child`, `descendant`, `descendant-or-self`, `self`, `parent`,
//!   `attribute` (and the `@` abbreviation)
//! - name tests with namespace prefixes, `*`, `p:*`, `node()`, `text()`,
//!   `comment()`
//! - predicates: positions (`[2]`), comparisons (`= != < <= > >=`), `and`,
//!   `or`, string/number literals, nested paths and the functions `not`,
//!   `position`, `last`, `count`, `contains`, `starts-with`
//! - unions with `|`
//!
//! A query is compiled once (prefixes resolved, arity checked) and then
//! evaluated against any number of documents.

mod eval;
mod parser;

use std::collections::BTreeMap;

use crate::document::{Document, NodeId};
use crate::error::XmlError;

/// Namespace prefix → URI bindings available to a query.
pub type NamespaceMap = BTreeMap<String, String>;

/// One query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Match {
    Node(NodeId),
    Attribute { element: NodeId, name: String },
}

impl Match {
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Match::Node(id) => Some(*id),
            Match::Attribute { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Path(LocationPath),
    Union(Vec<Expr>),
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Literal(String),
    Number(f64),
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    Not,
    Position,
    Last,
    Count,
    Contains,
    StartsWith,
}

impl Function {
    fn name(self) -> &'static str {
        match self {
            Function::Not => "not",
            Function::Position => "position",
            Function::Last => "last",
            Function::Count => "count",
            Function::Contains => "contains",
            Function::StartsWith => "starts-with",
        }
    }

    fn arity(self) -> usize {
        match self {
            Function::Position | Function::Last => 0,
            Function::Not | Function::Count => 1,
            Function::Contains | Function::StartsWith => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LocationPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    pub(crate) fn new(axis: Axis, test: NodeTest) -> Self {
        Self {
            axis,
            test,
            predicates: Vec::new(),
        }
    }

    /// The step `//` abbreviates.
    pub(crate) fn descendant_or_self() -> Self {
        Self::new(Axis::DescendantOrSelf, NodeTest::Node)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    SelfAxis,
    Parent,
    Attribute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeTest {
    AnyName,
    NamespaceWildcard {
        prefix: String,
        uri: String,
    },
    Name {
        prefix: Option<String>,
        local: String,
        /// Filled in at compile time from the namespace table.
        uri: Option<String>,
    },
    Node,
    Text,
    Comment,
}

/// A compiled path query.
#[derive(Debug, Clone)]
pub struct Query {
    source: String,
    expr: Expr,
}

impl Query {
    /// Compile a query without namespace bindings.
    pub fn parse(text: &str) -> Result<Self, XmlError> {
        Self::compile(text, &NamespaceMap::new())
    }

    /// Compile a query, resolving prefixes against `namespaces`.
    pub fn compile(text: &str, namespaces: &NamespaceMap) -> Result<Self, XmlError> {
        let error = |message: String| XmlError::Query {
            query: text.to_string(),
            message,
        };
        let mut expr = parser::parse_query(text).map_err(error)?;
        resolve(&mut expr, namespaces).map_err(error)?;
        if !selects_nodes(&expr) {
            return Err(error("query must select nodes".to_string()));
        }
        Ok(Self {
            source: text.to_string(),
            expr,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluate against `context` (usually the document element). Results are
    /// in document order without duplicates.
    pub fn select(&self, doc: &Document, context: NodeId) -> Vec<Match> {
        eval::Evaluator::new(doc).select(&self.expr, context)
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn selects_nodes(expr: &Expr) -> bool {
    match expr {
        Expr::Path(_) => true,
        Expr::Union(members) => members.iter().all(selects_nodes),
        _ => false,
    }
}

fn resolve(expr: &mut Expr, namespaces: &NamespaceMap) -> Result<(), String> {
    match expr {
        Expr::Path(path) => {
            for step in &mut path.steps {
                resolve_test(&mut step.test, namespaces)?;
                for predicate in &mut step.predicates {
                    resolve(predicate, namespaces)?;
                }
            }
        }
        Expr::Union(members) => {
            for member in members.iter_mut() {
                if !selects_nodes(member) {
                    return Err("union operands must be location paths".to_string());
                }
                resolve(member, namespaces)?;
            }
        }
        Expr::Or(left, right) | Expr::And(left, right) => {
            resolve(left, namespaces)?;
            resolve(right, namespaces)?;
        }
        Expr::Compare { left, right, .. } => {
            resolve(left, namespaces)?;
            resolve(right, namespaces)?;
        }
        Expr::Call { function, args } => {
            if args.len() != function.arity() {
                return Err(format!(
                    "{}() takes {} argument(s), got {}",
                    function.name(),
                    function.arity(),
                    args.len()
                ));
            }
            if *function == Function::Count && !selects_nodes(&args[0]) {
                return Err("count() expects a location path".to_string());
            }
            for arg in args.iter_mut() {
                resolve(arg, namespaces)?;
            }
        }
        Expr::Literal(_) | Expr::Number(_) => {}
    }
    Ok(())
}

fn resolve_test(test: &mut NodeTest, namespaces: &NamespaceMap) -> Result<(), String> {
    let lookup = |prefix: &str| -> Result<String, String> {
        if prefix == "xml" {
            return Ok(crate::document::XML_NAMESPACE.to_string());
        }
        namespaces
            .get(prefix)
            .cloned()
            .ok_or_else(|| format!("undeclared namespace prefix `{prefix}`"))
    };
    match test {
        NodeTest::Name {
            prefix: Some(prefix),
            uri,
            ..
        } => *uri = Some(lookup(prefix)?),
        NodeTest::NamespaceWildcard { prefix, uri } => *uri = lookup(prefix)?,
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests;
