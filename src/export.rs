use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::chapter::Chapter;
use crate::chapters::render_list;
use crate::mkv::to_matroska_xml;
use crate::player::cue_track;
use crate::timecode::{format_timestamp, ms_to_seconds};

pub const PODCAST_NAMESPACE_VERSION: &str = "1.2.0";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// The editor's own line format.
    List,
    /// Podlove Simple Chapters as JSON.
    Podlove,
    /// Podcasting 2.0 `podcast:chapters` JSON.
    PodcastNamespace,
    #[serde(rename = "webvtt")]
    WebVtt,
    Matroska,
}

#[derive(Debug, Serialize)]
struct PodloveChapter<'a> {
    start: String,
    title: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceChapter<'a> {
    start_time: f64,
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct NamespaceDocument<'a> {
    version: &'static str,
    chapters: Vec<NamespaceChapter<'a>>,
}

/// Renders `chapters` in `format`. Only the editor list keeps flagged
/// chapters; every other format drops them.
pub fn export(
    chapters: &[Chapter],
    duration_ms: Option<u64>,
    format: ExportFormat,
) -> anyhow::Result<String> {
    let output = match format {
        ExportFormat::List => render_list(chapters),
        ExportFormat::Podlove => {
            let entries: Vec<PodloveChapter> = valid(chapters)
                .map(|c| PodloveChapter {
                    start: format_timestamp(c.start, true),
                    title: &c.title,
                })
                .collect();
            serde_json::to_string_pretty(&entries)?
        }
        ExportFormat::PodcastNamespace => {
            let document = NamespaceDocument {
                version: PODCAST_NAMESPACE_VERSION,
                chapters: valid(chapters)
                    .map(|c| NamespaceChapter {
                        start_time: ms_to_seconds(c.start),
                        title: &c.title,
                    })
                    .collect(),
            };
            serde_json::to_string_pretty(&document)?
        }
        ExportFormat::WebVtt => web_vtt(chapters, duration_ms),
        ExportFormat::Matroska => to_matroska_xml(chapters)?,
    };
    log::debug!("Exported {} chapters as {:?}", chapters.len(), format);
    Ok(output)
}

fn valid(chapters: &[Chapter]) -> impl Iterator<Item = &Chapter> {
    chapters.iter().filter(|c| c.is_valid())
}

fn web_vtt(chapters: &[Chapter], duration_ms: Option<u64>) -> String {
    let mut out = String::from("WEBVTT\n");
    let cues = if chapters.is_empty() {
        Vec::new()
    } else {
        cue_track(chapters, duration_ms, "")
    };
    for (i, cue) in cues.iter().enumerate() {
        let _ = write!(
            &mut out,
            "\n{}\n{} --> {}\n{}\n",
            i + 1,
            format_timestamp(cue.start_ms, true),
            format_timestamp(cue.end_ms, true),
            cue.text
        );
    }
    out
}

/// Chapter frame for the tag writer: element id, span and title. The binary
/// layout is the writer's business.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFrame {
    pub element_id: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub title: String,
}

pub fn tag_frames(chapters: &[Chapter]) -> Vec<TagFrame> {
    valid(chapters)
        .enumerate()
        .map(|(i, c)| TagFrame {
            element_id: format!("chp{}", i),
            start_ms: c.start,
            end_ms: c.end,
            title: c.title.clone(),
        })
        .collect()
}

/// Episode-level tag fields written next to the chapter frames.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EpisodeTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub copyright: Option<String>,
    pub publisher: Option<String>,
    pub release_time: Option<String>,
    pub recording_time: Option<String>,
    pub user_defined_url: Option<String>,
    pub podcast_description: Option<String>,
    pub encoded_by: Option<String>,
}

impl EpisodeTags {
    /// Filled fields as `(frame id, value)` pairs in ID3v2.4 terms.
    pub fn frames(&self) -> Vec<(&'static str, &str)> {
        [
            ("TIT2", &self.title),
            ("TPE1", &self.artist),
            ("TCOP", &self.copyright),
            ("TPUB", &self.publisher),
            ("TDRL", &self.release_time),
            ("TDRC", &self.recording_time),
            ("WXXX", &self.user_defined_url),
            ("TDES", &self.podcast_description),
            ("TENC", &self.encoded_by),
        ]
        .into_iter()
        .filter_map(|(frame, value)| {
            let value = value.as_deref()?.trim();
            (!value.is_empty()).then_some((frame, value))
        })
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.frames().is_empty()
    }
}
