//! Message definition lookup
//!
//! Names and expected sizes come from an external catalog. The engine only
//! asks for them when decorating rows and never caches them beyond the sort
//! key of the current view.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::FrameId;

/// Definition of one message as known to the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDefinition {
    /// Human-readable message name
    pub name: String,
    /// Expected payload length in bytes
    pub size: usize,
}

/// Source of message names and expected payload sizes
pub trait DefinitionProvider: fmt::Debug + Send + Sync {
    /// Look up the definition for an identifier
    fn definition(&self, id: FrameId) -> Option<MessageDefinition>;
}

/// Provider that knows no messages; every row falls back to its synthesized name
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDefinitions;

impl DefinitionProvider for NoDefinitions {
    fn definition(&self, _id: FrameId) -> Option<MessageDefinition> {
        None
    }
}

/// In-memory catalog keyed by identifier
#[derive(Debug, Clone, Default)]
pub struct DefinitionCatalog {
    messages: HashMap<FrameId, MessageDefinition>,
}

impl DefinitionCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a definition
    pub fn insert(&mut self, id: FrameId, name: impl Into<String>, size: usize) {
        self.messages.insert(
            id,
            MessageDefinition {
                name: name.into(),
                size,
            },
        );
    }

    /// Remove a definition
    pub fn remove(&mut self, id: FrameId) -> Option<MessageDefinition> {
        self.messages.remove(&id)
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl DefinitionProvider for DefinitionCatalog {
    fn definition(&self, id: FrameId) -> Option<MessageDefinition> {
        self.messages.get(&id).cloned()
    }
}

impl FromIterator<(FrameId, MessageDefinition)> for DefinitionCatalog {
    fn from_iter<I: IntoIterator<Item = (FrameId, MessageDefinition)>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}
