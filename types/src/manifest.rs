//! Inputs to the vocabulary builder that come from outside the engine:
//! panels currently visible on screen and third-party panel manifests.

use serde::{Deserialize, Serialize};

use crate::ids::PanelId;

/// Manifest schema version this engine understands.
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestIntent {
    pub name: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub params_schema: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelManifest {
    pub version: u32,
    pub panel_id: PanelId,
    pub title: String,
    #[serde(default)]
    pub intents: Vec<ManifestIntent>,
}

impl PanelManifest {
    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.version == MANIFEST_VERSION
    }
}

/// A panel or badge currently on screen, by id and display title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisiblePanel {
    pub id: PanelId,
    pub title: String,
}

impl VisiblePanel {
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: PanelId::new(id),
            title: title.into(),
        }
    }
}
