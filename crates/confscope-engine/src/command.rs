//! Edit commands: compiled `<add>`, `<remove>` and `<update>` manifest entries.
//!
//! A command is plain data. It is compiled once and then applied to every
//! document copy that needs it, so it never holds on to a document.

use confscope_xml::{Document, Fragment, FragmentNode, Match, NodeId, Query};

use crate::error::{element_markup, ApplyError, ConfigurationError};
use crate::query_alias::QueryAliasTable;
use crate::vocabulary::ManifestVocabulary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Add,
    Remove,
    Update,
}

/// Where a command applies.
#[derive(Debug, Clone)]
pub struct Target {
    path: String,
    query: Query,
    source: String,
}

impl Target {
    pub fn new(path: impl Into<String>, query: Query, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query,
            source: source.into(),
        }
    }

    /// The resolved query path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Manifest markup the command was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Replacement value of an update: the raw text for attribute targets and a
/// fragment for node targets.
#[derive(Debug, Clone)]
pub struct CommandValue {
    text: String,
    /// `None` when the text is not well-formed markup; that only becomes an
    /// error if the command ends up replacing a node.
    fragment: Option<Fragment>,
}

impl CommandValue {
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let fragment = Fragment::parse(&text).ok();
        Self { text, fragment }
    }

    pub fn from_fragment(fragment: Fragment) -> Self {
        Self {
            text: fragment.text(),
            fragment: Some(fragment),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn fragment(&self) -> Option<&Fragment> {
        self.fragment.as_ref()
    }
}

#[derive(Debug, Clone)]
pub enum EditCommand {
    /// Set an attribute on every matched element.
    AddAttribute {
        target: Target,
        name: String,
        value: String,
    },
    /// Append content to every matched element.
    AddContent { target: Target, content: Fragment },
    Remove { target: Target },
    Update { target: Target, value: CommandValue },
}

impl EditCommand {
    /// Compile one command element. Errors carry the element's markup.
    pub fn from_manifest(
        doc: &Document,
        element: NodeId,
        aliases: &QueryAliasTable,
        vocabulary: &ManifestVocabulary,
    ) -> Result<Self, ConfigurationError> {
        let source = element_markup(doc, element);
        Self::compile(doc, element, aliases, vocabulary, source.clone())
            .map_err(|err| err.in_manifest(source))
    }

    fn compile(
        doc: &Document,
        element: NodeId,
        aliases: &QueryAliasTable,
        vocabulary: &ManifestVocabulary,
        source: String,
    ) -> Result<Self, ConfigurationError> {
        let element_name = doc.name(element).unwrap_or_default();
        let kind = if element_name == vocabulary.add_element {
            EditKind::Add
        } else if element_name == vocabulary.remove_element {
            EditKind::Remove
        } else if element_name == vocabulary.update_element {
            EditKind::Update
        } else {
            return Err(ConfigurationError::UnsupportedCommand {
                element: element_name.to_string(),
            });
        };

        let attribute = |name: &str| doc.attribute(element, name).filter(|value| !value.is_empty());
        let token = attribute(&vocabulary.command_path_attribute).ok_or_else(|| {
            ConfigurationError::MissingAttribute {
                element: element_name.to_string(),
                attribute: vocabulary.command_path_attribute.clone(),
            }
        })?;
        let parameter = attribute(&vocabulary.command_parameter_attribute);
        let (path, query) = aliases.compile(token, parameter)?;
        let target = Target::new(path, query, source);
        let explicit_value = attribute(&vocabulary.command_value_attribute);

        let command = match kind {
            EditKind::Remove => EditCommand::Remove { target },
            EditKind::Add => match attribute(&vocabulary.command_name_attribute) {
                Some(name) => EditCommand::AddAttribute {
                    target,
                    name: name.to_string(),
                    value: explicit_value
                        .map(str::to_string)
                        .unwrap_or_else(|| doc.text_content(element)),
                },
                None => {
                    let content = match explicit_value {
                        Some(markup) => Fragment::parse(markup).map_err(|source| {
                            ConfigurationError::InvalidFragment {
                                markup: markup.to_string(),
                                source,
                            }
                        })?,
                        None => doc.export_children(element),
                    };
                    EditCommand::AddContent { target, content }
                }
            },
            EditKind::Update => EditCommand::Update {
                target,
                value: match explicit_value {
                    Some(text) => CommandValue::from_text(text),
                    None => CommandValue::from_fragment(doc.export_children(element)),
                },
            },
        };
        Ok(command)
    }

    pub fn kind(&self) -> EditKind {
        match self {
            EditCommand::AddAttribute { .. } | EditCommand::AddContent { .. } => EditKind::Add,
            EditCommand::Remove { .. } => EditKind::Remove,
            EditCommand::Update { .. } => EditKind::Update,
        }
    }

    pub fn target(&self) -> &Target {
        match self {
            EditCommand::AddAttribute { target, .. }
            | EditCommand::AddContent { target, .. }
            | EditCommand::Remove { target }
            | EditCommand::Update { target, .. } => target,
        }
    }

    /// Attribute name for Add in attribute mode.
    pub fn attribute_name(&self) -> Option<&str> {
        match self {
            EditCommand::AddAttribute { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Apply to every match of the target path, evaluated from the document
    /// element. Returns the number of matches; zero matches is not an error.
    pub fn apply(&self, doc: &mut Document) -> Result<usize, ApplyError> {
        let target = self.target();
        let Some(context) = doc.document_element() else {
            return Ok(0);
        };
        let matches = target.query.select(doc, context);
        if matches.is_empty() {
            tracing::debug!(path = %target.path, kind = ?self.kind(), "no matches, command skipped");
            return Ok(0);
        }
        for hit in &matches {
            self.apply_to(doc, hit)?;
        }
        tracing::debug!(path = %target.path, kind = ?self.kind(), matches = matches.len(), "command applied");
        Ok(matches.len())
    }

    fn apply_to(&self, doc: &mut Document, hit: &Match) -> Result<(), ApplyError> {
        let target = self.target();
        let xml_error = |source| ApplyError::Document {
            command: target.source.clone(),
            source,
        };
        match (self, hit) {
            (EditCommand::AddAttribute { name, value, .. }, Match::Node(id)) if doc.is_element(*id) => {
                doc.set_attribute(*id, name.as_str(), value.as_str())
                    .map_err(xml_error)?;
            }
            (EditCommand::AddContent { content, .. }, Match::Node(id)) if doc.is_element(*id) => {
                doc.append_fragment(*id, content);
            }
            (EditCommand::AddAttribute { .. } | EditCommand::AddContent { .. }, _) => {
                return Err(ApplyError::InvalidTarget {
                    command: target.source.clone(),
                    target: describe_match(doc, hit),
                });
            }
            (EditCommand::Remove { .. }, Match::Node(id)) => {
                check_top_level(doc, *id, &[]).map_err(|problem| ApplyError::DocumentElement {
                    command: target.source.clone(),
                    problem,
                })?;
                doc.detach(*id);
            }
            (EditCommand::Remove { .. }, Match::Attribute { element, name }) => {
                doc.remove_attribute(*element, name).map_err(xml_error)?;
            }
            (EditCommand::Update { value, .. }, Match::Node(id)) => {
                let fragment = match value.fragment() {
                    Some(fragment) => fragment,
                    None => {
                        let source = Fragment::parse(value.text()).err().unwrap_or(
                            confscope_xml::XmlError::MissingRoot,
                        );
                        return Err(ApplyError::InvalidFragment {
                            command: target.source.clone(),
                            source,
                        });
                    }
                };
                check_top_level(doc, *id, fragment.nodes()).map_err(|problem| {
                    ApplyError::DocumentElement {
                        command: target.source.clone(),
                        problem,
                    }
                })?;
                doc.replace_with_fragment(*id, fragment).map_err(xml_error)?;
            }
            (EditCommand::Update { value, .. }, Match::Attribute { element, name }) => {
                doc.set_attribute_value(*element, name, value.text())
                    .map_err(xml_error)?;
            }
        }
        Ok(())
    }
}

/// A top-level node may only be replaced by `replacement` if the document
/// still ends up with exactly one root element and no top-level text.
fn check_top_level(
    doc: &Document,
    target: NodeId,
    replacement: &[FragmentNode],
) -> Result<(), String> {
    if doc.parent(target) != Some(doc.root()) {
        return Ok(());
    }
    if replacement
        .iter()
        .any(|node| matches!(node, FragmentNode::Text(_) | FragmentNode::CData(_)))
    {
        return Err("with text outside the root element".to_string());
    }
    let remaining = doc
        .child_elements(doc.root())
        .filter(|child| *child != target)
        .count();
    let inserted = replacement
        .iter()
        .filter(|node| matches!(node, FragmentNode::Element { .. }))
        .count();
    match remaining + inserted {
        1 => Ok(()),
        0 => Err("without a root element".to_string()),
        roots => Err(format!("with {roots} root elements")),
    }
}

fn describe_match(doc: &Document, hit: &Match) -> String {
    match hit {
        Match::Node(id) => match doc.kind(*id) {
            confscope_xml::NodeKind::Document => "the document node".to_string(),
            confscope_xml::NodeKind::Text(_) => "a text node".to_string(),
            confscope_xml::NodeKind::CData(_) => "a CDATA section".to_string(),
            confscope_xml::NodeKind::Comment(_) => "a comment".to_string(),
            confscope_xml::NodeKind::ProcessingInstruction(_) => {
                "a processing instruction".to_string()
            }
            confscope_xml::NodeKind::Element { name, .. } => format!("<{name}>"),
        },
        Match::Attribute { name, .. } => format!("attribute `{name}`"),
    }
}
