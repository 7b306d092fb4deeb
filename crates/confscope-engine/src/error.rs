use confscope_xml::{Document, NodeId, XmlError};
use thiserror::Error;

use crate::scope::{describe_scope, ScopeMap};

/// A malformed manifest. Raised while the transformer is being built, never
/// while documents are being transformed.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("manifest is not well-formed")]
    Manifest(#[source] XmlError),
    #[error("<{element}> is missing required attribute `{attribute}`")]
    MissingAttribute { element: String, attribute: String },
    #[error("alias `{name}` is declared more than once")]
    DuplicateAlias { name: String },
    #[error("unknown alias `{name}`")]
    UnknownAlias { name: String },
    #[error("path `{path}` takes no parameter, but `{parameter}` was given")]
    UnexpectedParameter { path: String, parameter: String },
    #[error("query path is empty")]
    EmptyPath,
    #[error("cannot compile query `{path}`")]
    InvalidQuery {
        path: String,
        #[source]
        source: XmlError,
    },
    #[error("unsupported command <{element}>")]
    UnsupportedCommand { element: String },
    #[error("invalid markup fragment `{markup}`")]
    InvalidFragment {
        markup: String,
        #[source]
        source: XmlError,
    },
    #[error("<{element}> has no name")]
    MissingName { element: String },
    #[error("scope value `{name}` is not inside a dimension")]
    MissingHost { name: String },
    #[error("dimension `{dimension}` declares no values")]
    EmptySections { dimension: String },
    #[error("dimension `{dimension}` is nested inside itself")]
    DuplicateDimension { dimension: String },
    #[error("manifest declares no dimensions")]
    NoDimensions,
    #[error("in {fragment}")]
    InManifest {
        fragment: String,
        #[source]
        source: Box<ConfigurationError>,
    },
}

impl ConfigurationError {
    /// Attach the manifest markup the error came from.
    pub(crate) fn in_manifest(self, fragment: String) -> Self {
        match self {
            already @ ConfigurationError::InManifest { .. } => already,
            other => ConfigurationError::InManifest {
                fragment,
                source: Box::new(other),
            },
        }
    }

    /// The underlying error, skipping manifest context.
    pub fn root(&self) -> &ConfigurationError {
        match self {
            ConfigurationError::InManifest { source, .. } => source.root(),
            other => other,
        }
    }
}

/// A command that could not be applied to one document copy.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("{command} matched {target}, which is not an element")]
    InvalidTarget { command: String, target: String },
    #[error("{command}: replacement value is not well-formed markup")]
    InvalidFragment {
        command: String,
        #[source]
        source: XmlError,
    },
    #[error("{command} would leave the document {problem}")]
    DocumentElement { command: String, problem: String },
    #[error("{command} failed")]
    Document {
        command: String,
        #[source]
        source: XmlError,
    },
}

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("transform failed for scope {scope}")]
    Apply {
        scope: String,
        #[source]
        source: ApplyError,
    },
    #[error("output for scope {scope} was rejected")]
    Sink {
        scope: String,
        #[source]
        source: SinkError,
    },
}

impl TransformError {
    pub(crate) fn apply(scope: &ScopeMap, source: ApplyError) -> Self {
        TransformError::Apply {
            scope: describe_scope(scope),
            source,
        }
    }

    pub(crate) fn sink(scope: &ScopeMap, source: SinkError) -> Self {
        TransformError::Sink {
            scope: describe_scope(scope),
            source,
        }
    }
}

/// Full markup of a manifest element, for command diagnostics.
pub(crate) fn element_markup(doc: &Document, id: NodeId) -> String {
    doc.outer_xml(id).unwrap_or_else(|_| start_tag(doc, id))
}

/// `<name attr="...">` without content, for scope diagnostics where the
/// whole subtree would be too long.
pub(crate) fn start_tag(doc: &Document, id: NodeId) -> String {
    let mut out = format!("<{}", doc.name(id).unwrap_or("?"));
    for attr in doc.attributes(id) {
        out.push_str(&format!(" {}=\"{}\"", attr.name, attr.value));
    }
    out.push('>');
    out
}
