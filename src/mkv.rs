use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_xml_rs::de::from_str;

use crate::chapter::Chapter;
use crate::timecode::{format_matroska, parse_matroska};

/// Root of a Matroska chapter file as written by `mkvextract chapters`.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct Chapters {
    #[serde(rename = "EditionEntry")]
    edition_entry: EditionEntry,
}

impl From<Chapters> for Vec<ChapterAtom> {
    fn from(chapters: Chapters) -> Self {
        chapters.edition_entry.chapters
    }
}

impl Chapters {
    pub fn num_chapters(&self) -> usize {
        self.edition_entry.chapters.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChapterAtom> {
        self.edition_entry.chapters.iter()
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct EditionEntry {
    #[serde(rename = "ChapterAtom", default)]
    chapters: Vec<ChapterAtom>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChapterAtom {
    #[serde(rename = "ChapterTimeStart")]
    pub start_time: String,

    #[serde(rename = "ChapterTimeEnd")]
    pub end_time: Option<String>,

    #[serde(rename = "ChapterDisplay")]
    pub display: ChapterDisplay,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChapterDisplay {
    #[serde(rename = "ChapterString")]
    pub title: String,
}

pub fn parse_chapter_xml(xml: &str) -> anyhow::Result<Chapters> {
    let chapters: Chapters = from_str(xml)?;
    Ok(chapters)
}

/// Reads chapter metadata found in a loaded file as `(start_ms, title)` pairs,
/// ready for [`crate::ChapterList::replace_all`].
pub fn parse_matroska_xml(xml: &str) -> anyhow::Result<Vec<(i64, String)>> {
    let chapters = parse_chapter_xml(xml).context("Invalid Matroska chapter XML")?;
    log::debug!("Matroska file lists {} chapters", chapters.num_chapters());

    chapters
        .iter()
        .map(|atom| -> anyhow::Result<(i64, String)> {
            let start = parse_matroska(&atom.start_time).with_context(|| {
                format!(
                    "Bad ChapterTimeStart {:?} for {:?}",
                    atom.start_time, atom.display.title
                )
            })?;
            let start = i64::try_from(start).context("ChapterTimeStart out of range")?;
            Ok((start, atom.display.title.clone()))
        })
        .collect()
}

/// Renders the unflagged chapters as a Matroska chapter file.
pub fn to_matroska_xml(chapters: &[Chapter]) -> anyhow::Result<String> {
    let atoms = chapters
        .iter()
        .filter(|c| c.is_valid())
        .map(|c| ChapterAtom {
            start_time: format_matroska(c.start),
            end_time: Some(format_matroska(c.end)),
            display: ChapterDisplay {
                title: c.title.clone(),
            },
        })
        .collect();
    let chapters = Chapters {
        edition_entry: EditionEntry { chapters: atoms },
    };

    let xml = serde_xml_rs::to_string(&chapters)?;
    Ok(xml)
}
