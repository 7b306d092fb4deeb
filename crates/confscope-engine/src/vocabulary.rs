//! Element and attribute names the manifest reader looks for.
//!
//! Every name can be changed, either from a JSON object (missing keys keep
//! their defaults) or per field from `CONFSCOPE_<FIELD>` environment
//! variables, e.g. `CONFSCOPE_SECTIONS_ELEMENT=dimension`.

use serde::{Deserialize, Serialize};

/// Prefix of the environment variables read by [`ManifestVocabulary::with_env_overrides`].
pub const ENV_PREFIX: &str = "CONFSCOPE_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestVocabulary {
    /// Attribute of the manifest root holding the output name template.
    pub output_format_attribute: String,

    pub path_table_element: String,
    pub alias_indicator_attribute: String,
    pub parameter_placeholder_attribute: String,
    pub alias_name_attribute: String,
    pub alias_path_attribute: String,
    pub alias_element: String,
    pub namespace_element: String,
    pub namespace_prefix_attribute: String,

    pub transform_element: String,
    pub update_element: String,
    pub remove_element: String,
    pub add_element: String,
    pub command_path_attribute: String,
    pub command_parameter_attribute: String,
    /// Attribute name for Add in attribute mode.
    pub command_name_attribute: String,
    pub command_value_attribute: String,

    /// A scope dimension, e.g. `environment`.
    pub sections_element: String,
    pub sections_name_attribute: String,
    /// A value along a dimension, e.g. `prod`.
    pub section_element: String,
    pub section_name_attribute: String,
}

impl Default for ManifestVocabulary {
    fn default() -> Self {
        Self {
            output_format_attribute: "outputFormat".to_string(),
            path_table_element: "path".to_string(),
            alias_indicator_attribute: "indicator".to_string(),
            parameter_placeholder_attribute: "parameter".to_string(),
            alias_name_attribute: "name".to_string(),
            alias_path_attribute: "path".to_string(),
            alias_element: "add".to_string(),
            namespace_element: "namespace".to_string(),
            namespace_prefix_attribute: "prefix".to_string(),
            transform_element: "transform".to_string(),
            update_element: "update".to_string(),
            remove_element: "remove".to_string(),
            add_element: "add".to_string(),
            command_path_attribute: "path".to_string(),
            command_parameter_attribute: "param".to_string(),
            command_name_attribute: "name".to_string(),
            command_value_attribute: "value".to_string(),
            sections_element: "sections".to_string(),
            sections_name_attribute: "name".to_string(),
            section_element: "section".to_string(),
            section_name_attribute: "name".to_string(),
        }
    }
}

impl ManifestVocabulary {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Apply `CONFSCOPE_<FIELD>` overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key/value source. Keys are the upper-cased
    /// field names with [`ENV_PREFIX`] prepended; empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        for (field, slot) in self.fields_mut() {
            let key = format!("{ENV_PREFIX}{}", field.to_uppercase());
            if let Some(value) = lookup(&key).filter(|value| !value.is_empty()) {
                tracing::debug!(%key, %value, "manifest vocabulary override");
                *slot = value;
            }
        }
        self
    }

    fn fields_mut(&mut self) -> [(&'static str, &mut String); 21] {
        [
            ("output_format_attribute", &mut self.output_format_attribute),
            ("path_table_element", &mut self.path_table_element),
            ("alias_indicator_attribute", &mut self.alias_indicator_attribute),
            (
                "parameter_placeholder_attribute",
                &mut self.parameter_placeholder_attribute,
            ),
            ("alias_name_attribute", &mut self.alias_name_attribute),
            ("alias_path_attribute", &mut self.alias_path_attribute),
            ("alias_element", &mut self.alias_element),
            ("namespace_element", &mut self.namespace_element),
            ("namespace_prefix_attribute", &mut self.namespace_prefix_attribute),
            ("transform_element", &mut self.transform_element),
            ("update_element", &mut self.update_element),
            ("remove_element", &mut self.remove_element),
            ("add_element", &mut self.add_element),
            ("command_path_attribute", &mut self.command_path_attribute),
            (
                "command_parameter_attribute",
                &mut self.command_parameter_attribute,
            ),
            ("command_name_attribute", &mut self.command_name_attribute),
            ("command_value_attribute", &mut self.command_value_attribute),
            ("sections_element", &mut self.sections_element),
            ("sections_name_attribute", &mut self.sections_name_attribute),
            ("section_element", &mut self.section_element),
            ("section_name_attribute", &mut self.section_name_attribute),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_the_stock_manifest_shape() {
        let vocabulary = ManifestVocabulary::default();
        assert_eq!(vocabulary.output_format_attribute, "outputFormat");
        assert_eq!(vocabulary.alias_element, "add");
        assert_eq!(vocabulary.command_parameter_attribute, "param");
        assert_eq!(vocabulary.sections_element, "sections");
        assert_eq!(vocabulary.section_element, "section");
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let vocabulary =
            ManifestVocabulary::from_json_str(r#"{ "sections_element": "dimension" }"#).unwrap();
        assert_eq!(vocabulary.sections_element, "dimension");
        assert_eq!(vocabulary.section_element, "section");
    }

    #[test]
    fn overrides_use_prefixed_upper_case_keys() {
        let env: HashMap<&str, &str> = [
            ("CONFSCOPE_SECTION_ELEMENT", "value"),
            ("CONFSCOPE_TRANSFORM_ELEMENT", ""),
        ]
        .into_iter()
        .collect();
        let vocabulary = ManifestVocabulary::default()
            .with_overrides(|key| env.get(key).map(|value| value.to_string()));
        assert_eq!(vocabulary.section_element, "value");
        assert_eq!(vocabulary.transform_element, "transform");
    }
}
