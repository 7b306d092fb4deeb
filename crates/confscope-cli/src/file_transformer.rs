//! Files in, files out.
//!
//! Each leaf's document is written to `output_dir/<rendered output name>`,
//! unless a structurally equal document is already there, so unchanged
//! outputs keep their timestamps.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use confscope_engine::{
    describe_scope, render_output_name, ConfigurationError, ManifestVocabulary, ScopeMap,
    TransformError, Transformer,
};
use confscope_xml::{documents_equal, Document, XmlDeclaration, XmlError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileTransformError {
    #[error("input file {} does not exist", .path.display())]
    MissingInput { path: PathBuf },
    #[error("cannot read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not well-formed XML", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: XmlError,
    },
    #[error("invalid manifest")]
    Manifest(#[from] ConfigurationError),
    #[error("scopes {first} and {second} both render to {}", .path.display())]
    DuplicateOutput {
        path: PathBuf,
        first: String,
        second: String,
    },
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("cannot serialize {}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: XmlError,
    },
    #[error("cannot write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStatus {
    Written,
    /// An equal document was already on disk.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub scope_map: ScopeMap,
    pub status: OutputStatus,
}

#[derive(Debug, Clone, Default)]
pub struct TransformReport {
    /// Sorted by path.
    pub outputs: Vec<OutputFile>,
}

impl TransformReport {
    pub fn written(&self) -> impl Iterator<Item = &OutputFile> {
        self.outputs
            .iter()
            .filter(|output| output.status == OutputStatus::Written)
    }

    pub fn unchanged(&self) -> impl Iterator<Item = &OutputFile> {
        self.outputs
            .iter()
            .filter(|output| output.status == OutputStatus::Unchanged)
    }
}

pub fn transform_files(
    master_path: &Path,
    manifest_path: &Path,
    output_dir: &Path,
    parallel: bool,
    vocabulary: &ManifestVocabulary,
) -> Result<TransformReport, FileTransformError> {
    let master = load_document(master_path)?;
    let manifest = load_document(manifest_path)?;
    let transformer = Transformer::from_manifest(&manifest, vocabulary, parallel)?;
    check_distinct_outputs(&transformer, output_dir)?;

    let outputs = Mutex::new(Vec::with_capacity(transformer.leaves().len()));
    transformer.apply(&master, parallel, |template, scope_map, document| {
        let path = output_dir.join(render_output_name(template, scope_map));
        let status = write_if_changed(&path, document)?;
        let output = OutputFile {
            path,
            scope_map: scope_map.clone(),
            status,
        };
        outputs
            .lock()
            .map_err(|_| "output list lock poisoned")?
            .push(output);
        Ok(())
    })?;

    let mut outputs = outputs
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    outputs.sort_by(|a, b| a.path.cmp(&b.path));
    let report = TransformReport { outputs };
    tracing::info!(
        written = report.written().count(),
        unchanged = report.unchanged().count(),
        "outputs processed"
    );
    Ok(report)
}

/// Every leaf must render to its own path, otherwise leaves would overwrite
/// each other (and race when run in parallel).
fn check_distinct_outputs(
    transformer: &Transformer,
    output_dir: &Path,
) -> Result<(), FileTransformError> {
    let mut seen: BTreeMap<PathBuf, String> = BTreeMap::new();
    for leaf in transformer.leaves() {
        let scope_map = leaf.scope_map().cloned().unwrap_or_default();
        let path = output_dir.join(render_output_name(transformer.output_template(), &scope_map));
        let scope = describe_scope(&scope_map);
        if let Some(first) = seen.get(&path) {
            return Err(FileTransformError::DuplicateOutput {
                path,
                first: first.clone(),
                second: scope,
            });
        }
        seen.insert(path, scope);
    }
    Ok(())
}

fn load_document(path: &Path) -> Result<Document, FileTransformError> {
    if !path.is_file() {
        return Err(FileTransformError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path).map_err(|source| FileTransformError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Document::parse(&text).map_err(|source| FileTransformError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `document` to `path` (indented, UTF-8, with an XML declaration)
/// unless the file already holds a structurally equal document. A previous
/// file that cannot be read or parsed is overwritten.
pub fn write_if_changed(path: &Path, mut document: Document) -> Result<OutputStatus, FileTransformError> {
    if path.exists() {
        match std::fs::read_to_string(path) {
            Ok(text) => match Document::parse(&text) {
                Ok(existing) if documents_equal(&existing, &document) => {
                    tracing::debug!(path = %path.display(), "output unchanged");
                    return Ok(OutputStatus::Unchanged);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "replacing malformed output")
                }
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "replacing unreadable output")
            }
        }
    }

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| FileTransformError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let declaration = XmlDeclaration {
        encoding: Some("utf-8".to_string()),
        ..document.declaration().cloned().unwrap_or_default()
    };
    document.set_declaration(Some(declaration));
    let text = document
        .to_xml_string(true)
        .map_err(|source| FileTransformError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
    std::fs::write(path, text).map_err(|source| FileTransformError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "output written");
    Ok(OutputStatus::Written)
}
