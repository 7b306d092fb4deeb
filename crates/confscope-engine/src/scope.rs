//! The scope tree.
//!
//! Dimension nodes (`<sections name="environment">`) alternate with value
//! nodes (`<section name="prod">`). Each node owns its commands and points at
//! its parent; nothing points down, so the tree is just the set of leaves
//! plus the ancestors they keep alive.

use std::collections::BTreeMap;
use std::sync::Arc;

use confscope_xml::Document;

use crate::command::EditCommand;
use crate::error::{ApplyError, ConfigurationError};

/// Dimension name → value name for one scope combination.
pub type ScopeMap = BTreeMap<String, String>;

/// `environment=prod, region=east`
pub fn describe_scope(scope: &ScopeMap) -> String {
    if scope.is_empty() {
        return "(root)".to_string();
    }
    scope
        .iter()
        .map(|(dimension, value)| format!("{dimension}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Dimension,
    Value,
}

#[derive(Debug)]
pub struct ScopeCommandSet {
    name: String,
    kind: ScopeKind,
    parent: Option<Arc<ScopeCommandSet>>,
    commands: Vec<EditCommand>,
    scope_map: Option<ScopeMap>,
}

impl ScopeCommandSet {
    /// A dimension node. `parent` is the enclosing value node, if any.
    pub fn dimension(
        name: impl Into<String>,
        parent: Option<Arc<ScopeCommandSet>>,
        commands: Vec<EditCommand>,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigurationError::MissingName {
                element: "dimension".to_string(),
            });
        }
        let repeated = parent
            .as_deref()
            .into_iter()
            .flat_map(ScopeCommandSet::chain)
            .any(|ancestor| ancestor.kind == ScopeKind::Dimension && ancestor.name == name);
        if repeated {
            return Err(ConfigurationError::DuplicateDimension { dimension: name });
        }
        Ok(Self {
            name,
            kind: ScopeKind::Dimension,
            parent,
            commands,
            scope_map: None,
        })
    }

    /// A value node inside dimension `host`. Its scope map is the one
    /// inherited from the enclosing value node plus `host = name`.
    pub fn value(
        name: impl Into<String>,
        host: Option<Arc<ScopeCommandSet>>,
        commands: Vec<EditCommand>,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigurationError::MissingName {
                element: "value".to_string(),
            });
        }
        let host = match host {
            Some(host) if host.kind == ScopeKind::Dimension => host,
            _ => return Err(ConfigurationError::MissingHost { name }),
        };
        let mut scope_map = host
            .parent
            .as_ref()
            .and_then(|value| value.scope_map.clone())
            .unwrap_or_default();
        scope_map.insert(host.name.clone(), name.clone());
        Ok(Self {
            name,
            kind: ScopeKind::Value,
            parent: Some(host),
            commands,
            scope_map: Some(scope_map),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<&Arc<ScopeCommandSet>> {
        self.parent.as_ref()
    }

    pub fn commands(&self) -> &[EditCommand] {
        &self.commands
    }

    /// `None` for dimension nodes.
    pub fn scope_map(&self) -> Option<&ScopeMap> {
        self.scope_map.as_ref()
    }

    /// This node and its ancestors, root first.
    pub fn chain(&self) -> Vec<&ScopeCommandSet> {
        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(node) = current {
            chain.push(node);
            current = node.parent.as_deref();
        }
        chain.reverse();
        chain
    }

    /// Number of commands along the chain.
    pub fn chain_len(&self) -> usize {
        self.chain().iter().map(|node| node.commands.len()).sum()
    }

    /// Apply the ancestors' commands, root first, then this node's own in
    /// declaration order. Returns this node's scope map.
    pub fn apply(&self, doc: &mut Document) -> Result<Option<ScopeMap>, ApplyError> {
        if let Some(parent) = &self.parent {
            parent.apply(doc)?;
        }
        for command in &self.commands {
            command.apply(doc)?;
        }
        Ok(self.scope_map.clone())
    }
}
