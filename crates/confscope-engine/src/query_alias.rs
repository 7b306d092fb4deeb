//! Query alias table: short names for long paths.
//!
//! A token that starts with the alias indicator (`#` by default) names an
//! alias; anything else is a literal path. Either may contain the parameter
//! placeholder (`{parameter}` by default), which is replaced by the
//! command's `param` value.

use std::collections::BTreeMap;

use confscope_xml::{Document, NamespaceMap, NodeId, Query};

use crate::error::{element_markup, ConfigurationError};
use crate::vocabulary::ManifestVocabulary;

pub const DEFAULT_ALIAS_INDICATOR: &str = "#";
pub const DEFAULT_PARAMETER_PLACEHOLDER: &str = "{parameter}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    name: String,
    path: String,
    has_placeholder: bool,
}

impl PathTemplate {
    /// `has_placeholder` is fixed here by a plain substring check.
    pub fn new(name: impl Into<String>, path: impl Into<String>, placeholder: Option<&str>) -> Self {
        let path = path.into();
        let has_placeholder = placeholder.is_some_and(|token| path.contains(token));
        Self {
            name: name.into(),
            path,
            has_placeholder,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn has_placeholder(&self) -> bool {
        self.has_placeholder
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryAliasTable {
    indicator: Option<String>,
    placeholder: Option<String>,
    aliases: BTreeMap<String, PathTemplate>,
    namespaces: NamespaceMap,
}

impl QueryAliasTable {
    /// A table with aliasing and parameters disabled: every token is a
    /// literal path and parameters are rejected.
    pub fn literal_only() -> Self {
        Self::default()
    }

    pub fn new(indicator: Option<String>, placeholder: Option<String>) -> Self {
        Self {
            indicator: indicator.filter(|value| !value.is_empty()),
            placeholder: placeholder.filter(|value| !value.is_empty()),
            aliases: BTreeMap::new(),
            namespaces: NamespaceMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            Some(DEFAULT_ALIAS_INDICATOR.to_string()),
            Some(DEFAULT_PARAMETER_PLACEHOLDER.to_string()),
        )
    }

    /// Read a path table element:
    ///
    /// ```xml
    /// <path indicator="#" parameter="{parameter}">
    ///   <namespace prefix="p">urn:example</namespace>
    ///   <add name="setting" path="/configuration/appSettings/add[@key='{parameter}']"/>
    /// </path>
    /// ```
    ///
    /// Missing or empty `indicator`/`parameter` attributes fall back to the
    /// defaults.
    pub fn from_manifest(
        doc: &Document,
        element: NodeId,
        vocabulary: &ManifestVocabulary,
    ) -> Result<Self, ConfigurationError> {
        let setting = |attribute: &str, default: &str| {
            doc.attribute(element, attribute)
                .filter(|value| !value.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        let mut table = Self::new(
            Some(setting(
                &vocabulary.alias_indicator_attribute,
                DEFAULT_ALIAS_INDICATOR,
            )),
            Some(setting(
                &vocabulary.parameter_placeholder_attribute,
                DEFAULT_PARAMETER_PLACEHOLDER,
            )),
        );

        for child in doc.child_elements(element) {
            let name = doc.name(child).unwrap_or_default();
            let required = |attribute: &str| {
                doc.attribute(child, attribute)
                    .filter(|value| !value.is_empty())
                    .ok_or_else(|| ConfigurationError::MissingAttribute {
                        element: name.to_string(),
                        attribute: attribute.to_string(),
                    })
            };
            let entry = if name == vocabulary.namespace_element {
                required(&vocabulary.namespace_prefix_attribute).map(|prefix| {
                    table.add_namespace(prefix, doc.text_content(child).trim());
                })
            } else if name == vocabulary.alias_element {
                required(&vocabulary.alias_name_attribute).and_then(|alias| {
                    let path = required(&vocabulary.alias_path_attribute)?;
                    table.add_alias(alias, path)
                })
            } else {
                tracing::debug!(element = name, "ignoring unknown path table entry");
                Ok(())
            };
            entry.map_err(|err| err.in_manifest(element_markup(doc, child)))?;
        }

        tracing::debug!(
            aliases = table.aliases.len(),
            namespaces = table.namespaces.len(),
            "query alias table loaded"
        );
        Ok(table)
    }

    /// Register an alias. Names are unique within a table.
    pub fn add_alias(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> Result<(), ConfigurationError> {
        let template = PathTemplate::new(name, path, self.placeholder.as_deref());
        if self.aliases.contains_key(template.name()) {
            return Err(ConfigurationError::DuplicateAlias {
                name: template.name().to_string(),
            });
        }
        self.aliases.insert(template.name().to_string(), template);
        Ok(())
    }

    pub fn add_namespace(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.namespaces.insert(prefix.into(), uri.into());
    }

    pub fn indicator(&self) -> Option<&str> {
        self.indicator.as_deref()
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    pub fn namespaces(&self) -> &NamespaceMap {
        &self.namespaces
    }

    pub fn get(&self, name: &str) -> Option<&PathTemplate> {
        self.aliases.get(name)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Turn an alias or literal token into a query path, substituting
    /// `parameter` for every placeholder occurrence.
    pub fn resolve(&self, token: &str, parameter: Option<&str>) -> Result<String, ConfigurationError> {
        if token.is_empty() {
            return Err(ConfigurationError::EmptyPath);
        }
        let parameter = parameter.unwrap_or_default();

        let (path, has_placeholder) = match self.alias_name(token) {
            Some(name) => {
                let template = self
                    .aliases
                    .get(name)
                    .ok_or_else(|| ConfigurationError::UnknownAlias {
                        name: name.to_string(),
                    })?;
                (template.path(), template.has_placeholder())
            }
            // Literal paths accept a parameter whenever placeholders are enabled.
            None => (token, self.placeholder.is_some()),
        };

        let resolved = match (&self.placeholder, has_placeholder) {
            (Some(placeholder), true) => path.replace(placeholder.as_str(), parameter),
            _ if !parameter.is_empty() => {
                return Err(ConfigurationError::UnexpectedParameter {
                    path: path.to_string(),
                    parameter: parameter.to_string(),
                })
            }
            _ => path.to_string(),
        };
        if resolved.trim().is_empty() {
            return Err(ConfigurationError::EmptyPath);
        }
        Ok(resolved)
    }

    /// [`resolve`](Self::resolve), then compile against the namespace table.
    pub fn compile(
        &self,
        token: &str,
        parameter: Option<&str>,
    ) -> Result<(String, Query), ConfigurationError> {
        let path = self.resolve(token, parameter)?;
        let query = Query::compile(&path, &self.namespaces).map_err(|source| {
            ConfigurationError::InvalidQuery {
                path: path.clone(),
                source,
            }
        })?;
        Ok((path, query))
    }

    fn alias_name<'t>(&self, token: &'t str) -> Option<&'t str> {
        token.strip_prefix(self.indicator.as_deref()?)
    }
}
