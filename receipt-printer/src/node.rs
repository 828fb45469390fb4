//! Command nodes and node documents
//!
//! A node is one formatting instruction: a name, a parameter map and an
//! optional text payload. A document is an ordered list of nodes that a host
//! can load from JSON and replay through a [`Formatter`](crate::Formatter).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PrintResult;

/// Node parameters, keyed by parameter name
pub type Params = HashMap<String, String>;

/// One formatting instruction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandNode {
    pub name: String,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub payload: String,
}

impl CommandNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set the text payload
    pub fn payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }
}

/// An ordered list of nodes forming one print job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDocument {
    /// Spooler document name
    #[serde(default = "default_document_name")]
    pub document: String,

    /// Send `ESC @` before the first node
    #[serde(default = "default_init")]
    pub init: bool,

    #[serde(default)]
    pub nodes: Vec<CommandNode>,
}

fn default_document_name() -> String {
    "Receipt".to_string()
}

fn default_init() -> bool {
    true
}

impl NodeDocument {
    pub fn new(nodes: Vec<CommandNode>) -> Self {
        Self {
            document: default_document_name(),
            init: default_init(),
            nodes,
        }
    }

    /// Parse a document from JSON
    pub fn from_json(json: &str) -> PrintResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
