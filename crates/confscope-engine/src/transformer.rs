//! Manifest → scope tree → one transformed document per leaf.

use std::sync::Arc;

use confscope_xml::{Document, NodeId};
use rayon::prelude::*;

use crate::command::EditCommand;
use crate::error::{start_tag, ConfigurationError, SinkError, TransformError};
use crate::query_alias::QueryAliasTable;
use crate::scope::{describe_scope, ScopeCommandSet, ScopeMap};
use crate::vocabulary::ManifestVocabulary;

/// One transformed copy of the master document.
#[derive(Debug, Clone)]
pub struct ScopedDocument {
    /// Output template with the scope values filled in.
    pub output_name: String,
    pub scope_map: ScopeMap,
    pub document: Document,
}

/// Replace every `{dimension}` in `template` by its value in `scope`.
/// Placeholders without a matching dimension are left as they are.
pub fn render_output_name(template: &str, scope: &ScopeMap) -> String {
    scope.iter().fold(template.to_string(), |name, (dimension, value)| {
        name.replace(&format!("{{{dimension}}}"), value)
    })
}

/// Map over `items` serially or on the rayon pool. Results keep input order
/// either way; the first error wins.
fn map_ordered<T, R, E, F>(parallel: bool, items: &[T], f: F) -> Result<Vec<R>, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T) -> Result<R, E> + Sync + Send,
{
    if parallel {
        items.par_iter().map(f).collect()
    } else {
        items.iter().map(f).collect()
    }
}

#[derive(Debug)]
pub struct Transformer {
    output_template: String,
    aliases: QueryAliasTable,
    leaves: Vec<Arc<ScopeCommandSet>>,
}

/// Read-only state shared by the build walk.
struct Builder<'a> {
    doc: &'a Document,
    vocabulary: &'a ManifestVocabulary,
    aliases: &'a QueryAliasTable,
    parallel: bool,
}

impl Transformer {
    pub fn from_manifest_str(
        text: &str,
        vocabulary: &ManifestVocabulary,
        parallel: bool,
    ) -> Result<Self, ConfigurationError> {
        let doc = Document::parse(text).map_err(ConfigurationError::Manifest)?;
        Self::from_manifest(&doc, vocabulary, parallel)
    }

    /// Compile a manifest. With `parallel`, sibling scopes are compiled on
    /// the rayon pool; the leaf order is the same either way.
    pub fn from_manifest(
        doc: &Document,
        vocabulary: &ManifestVocabulary,
        parallel: bool,
    ) -> Result<Self, ConfigurationError> {
        let root = doc
            .document_element()
            .ok_or(ConfigurationError::Manifest(confscope_xml::XmlError::MissingRoot))?;
        let root_name = doc.name(root).unwrap_or_default();

        let output_template = doc
            .attribute(root, &vocabulary.output_format_attribute)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigurationError::MissingAttribute {
                element: root_name.to_string(),
                attribute: vocabulary.output_format_attribute.clone(),
            })?
            .to_string();

        let aliases = match doc
            .child_elements_named(root, &vocabulary.path_table_element)
            .next()
        {
            Some(table) => QueryAliasTable::from_manifest(doc, table, vocabulary)?,
            None => QueryAliasTable::literal_only(),
        };

        let dimensions: Vec<NodeId> = doc
            .child_elements_named(root, &vocabulary.sections_element)
            .collect();
        if dimensions.is_empty() {
            return Err(ConfigurationError::NoDimensions);
        }

        let builder = Builder {
            doc,
            vocabulary,
            aliases: &aliases,
            parallel,
        };
        let leaves = builder.dimensions(&dimensions, None)?;

        tracing::info!(
            leaves = leaves.len(),
            aliases = aliases.len(),
            parallel,
            "manifest compiled"
        );
        Ok(Self {
            output_template,
            aliases,
            leaves,
        })
    }

    pub fn output_template(&self) -> &str {
        &self.output_template
    }

    pub fn aliases(&self) -> &QueryAliasTable {
        &self.aliases
    }

    /// Leaf scopes in manifest order.
    pub fn leaves(&self) -> &[Arc<ScopeCommandSet>] {
        &self.leaves
    }

    /// Transform a copy of `master` for every leaf and hand each result to
    /// `sink(output_template, scope_map, document)`. Serial mode visits the
    /// leaves in order; parallel mode runs them on the rayon pool.
    pub fn apply<F>(&self, master: &Document, parallel: bool, sink: F) -> Result<(), TransformError>
    where
        F: Fn(&str, &ScopeMap, Document) -> Result<(), SinkError> + Sync + Send,
    {
        let run = |leaf: &Arc<ScopeCommandSet>| -> Result<(), TransformError> {
            let (scope_map, document) = self.apply_leaf(master, leaf)?;
            sink(&self.output_template, &scope_map, document)
                .map_err(|source| TransformError::sink(&scope_map, source))
        };
        if parallel {
            self.leaves.par_iter().try_for_each(run)
        } else {
            self.leaves.iter().try_for_each(run)
        }
    }

    /// Collect every leaf's result, in leaf order.
    pub fn transform(
        &self,
        master: &Document,
        parallel: bool,
    ) -> Result<Vec<ScopedDocument>, TransformError> {
        let results = map_ordered(parallel, &self.leaves, |leaf| -> Result<_, TransformError> {
            let (scope_map, document) = self.apply_leaf(master, leaf)?;
            Ok(ScopedDocument {
                output_name: render_output_name(&self.output_template, &scope_map),
                scope_map,
                document,
            })
        })?;
        tracing::info!(outputs = results.len(), parallel, "transform finished");
        Ok(results)
    }

    fn apply_leaf(
        &self,
        master: &Document,
        leaf: &ScopeCommandSet,
    ) -> Result<(ScopeMap, Document), TransformError> {
        let mut document = master.clone();
        let fallback = leaf.scope_map().cloned().unwrap_or_default();
        let scope_map = leaf
            .apply(&mut document)
            .map_err(|source| TransformError::apply(&fallback, source))?
            .unwrap_or(fallback);
        tracing::debug!(
            scope = %describe_scope(&scope_map),
            commands = leaf.chain_len(),
            "leaf transformed"
        );
        Ok((scope_map, document))
    }
}

impl Builder<'_> {
    fn dimensions(
        &self,
        elements: &[NodeId],
        parent: Option<Arc<ScopeCommandSet>>,
    ) -> Result<Vec<Arc<ScopeCommandSet>>, ConfigurationError> {
        let groups = map_ordered(self.parallel, elements, |element| {
            self.dimension(*element, parent.clone())
        })?;
        Ok(groups.into_iter().flatten().collect())
    }

    fn dimension(
        &self,
        element: NodeId,
        parent: Option<Arc<ScopeCommandSet>>,
    ) -> Result<Vec<Arc<ScopeCommandSet>>, ConfigurationError> {
        let doc = self.doc;
        let name = doc
            .attribute(element, &self.vocabulary.sections_name_attribute)
            .unwrap_or_default();
        let commands = self.commands(element)?;
        let dimension = ScopeCommandSet::dimension(name, parent, commands)
            .map_err(|err| err.in_manifest(start_tag(doc, element)))?;
        let dimension = Arc::new(dimension);

        let values: Vec<NodeId> = doc
            .child_elements_named(element, &self.vocabulary.section_element)
            .collect();
        if values.is_empty() {
            return Err(ConfigurationError::EmptySections {
                dimension: name.to_string(),
            }
            .in_manifest(start_tag(doc, element)));
        }

        let groups = map_ordered(self.parallel, &values, |value| {
            self.value(*value, dimension.clone())
        })?;
        Ok(groups.into_iter().flatten().collect())
    }

    fn value(
        &self,
        element: NodeId,
        host: Arc<ScopeCommandSet>,
    ) -> Result<Vec<Arc<ScopeCommandSet>>, ConfigurationError> {
        let doc = self.doc;
        let name = doc
            .attribute(element, &self.vocabulary.section_name_attribute)
            .unwrap_or_default();
        let commands = self.commands(element)?;
        let node = ScopeCommandSet::value(name, Some(host), commands)
            .map_err(|err| err.in_manifest(start_tag(doc, element)))?;
        let node = Arc::new(node);

        let nested: Vec<NodeId> = doc
            .child_elements_named(element, &self.vocabulary.sections_element)
            .collect();
        if nested.is_empty() {
            return Ok(vec![node]);
        }
        self.dimensions(&nested, Some(node))
    }

    /// Commands of every `<transform>` block directly under `scope`, in
    /// document order.
    fn commands(&self, scope: NodeId) -> Result<Vec<EditCommand>, ConfigurationError> {
        let doc = self.doc;
        doc.child_elements_named(scope, &self.vocabulary.transform_element)
            .flat_map(|block| doc.child_elements(block))
            .map(|element| EditCommand::from_manifest(doc, element, self.aliases, self.vocabulary))
            .collect()
    }
}
