use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::export::ExportFormat;
use crate::paste::TableLayout;

/// Editor settings. Every field has a default, so a config file only needs
/// the keys it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Title of chapters added at the playhead.
    pub default_title: String,
    /// Cue shown on the player timeline while the list is empty.
    pub placeholder_cue: String,
    /// Format used by the "copy" action.
    pub copy_format: ExportFormat,
    pub paste: TableLayout,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_title: "New chapter".to_string(),
            placeholder_cue: "Chapter".to_string(),
            copy_format: ExportFormat::List,
            paste: TableLayout::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config = serde_json::from_str(json)?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        let config = Self::from_json(&json)
            .with_context(|| format!("Invalid config: {}", path.as_ref().display()))?;
        log::info!("Loaded editor config from {}", path.as_ref().display());
        Ok(config)
    }
}
