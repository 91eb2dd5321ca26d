use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::chapters::ChapterList;
use crate::export::EpisodeTags;

pub const SESSION_VERSION: u8 = 1;

/// A saved editing session: the chapter text plus the media it belongs to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub version: u8,
    pub source: Option<PathBuf>,
    #[serde(with = "humantime_serde", default)]
    pub duration: Option<Duration>,
    /// Chapters in the editor's line format, flagged lines included.
    pub list: String,
    #[serde(default, skip_serializing_if = "EpisodeTags::is_empty")]
    pub tags: EpisodeTags,
}

impl Session {
    pub fn capture(chapters: &ChapterList, source: Option<PathBuf>) -> Self {
        Self {
            version: SESSION_VERSION,
            source,
            duration: chapters.duration().map(Duration::from_millis),
            list: chapters.export_as_list(),
            tags: EpisodeTags::default(),
        }
    }

    pub fn with_tags(mut self, tags: EpisodeTags) -> Self {
        self.tags = tags;
        self
    }

    /// Loads the session into `chapters` with a single notification for the
    /// chapter text.
    pub fn restore(&self, chapters: &ChapterList) {
        if let Some(duration) = self.duration {
            chapters.set_duration(duration.as_millis().try_into().unwrap_or(u64::MAX));
        }
        chapters.replace_from_text(&self.list);
    }

    /// Writes the session as JSON, replacing `path` atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        file.write_all(&serde_json::to_vec_pretty(self)?)?;
        file.persist(path)
            .with_context(|| format!("Failed to write session: {}", path.display()))?;

        log::info!("Saved session to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session: {}", path.display()))?;
        let session: Session = serde_json::from_str(&json)
            .with_context(|| format!("Invalid session file: {}", path.display()))?;

        if session.version != SESSION_VERSION {
            anyhow::bail!(
                "Unsupported session version {} in {}",
                session.version,
                path.display()
            );
        }
        log::info!("Loaded session from {}", path.display());
        Ok(session)
    }
}
