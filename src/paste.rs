use anyhow::Context;
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};

use crate::chapter::single_line_title;

/// Which columns of a pasted spreadsheet hold the chapter time and title.
///
/// The defaults match the marker export of common podcast recording sheets:
/// a header row, the timecode in column 8 and the note in column 19.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLayout {
    pub time_column: usize,
    pub title_column: usize,
    pub min_columns: usize,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            time_column: 8,
            title_column: 19,
            min_columns: 20,
        }
    }
}

/// Turns clipboard contents into editor lines.
///
/// Tabular data with a header row and at least `layout.min_columns` columns
/// becomes one `<time> <title>` line per data row, with the first row pinned
/// to `00:00:00`. Other text is returned unchanged. Returns `None` when the
/// clipboard does not parse, in which case nothing should be pasted.
pub fn import_clipboard(data: &str, layout: &TableLayout) -> Option<String> {
    let rows = match parse_table(data) {
        Ok(rows) => rows,
        Err(err) => {
            log::warn!("Ignoring pasted data: {:#}", err);
            return None;
        }
    };
    let is_table = rows.len() >= 2 && rows[0].len() >= layout.min_columns;
    if !is_table {
        return Some(data.to_string());
    }

    let mut lines = Vec::with_capacity(rows.len() - 1);
    for (i, row) in rows.iter().enumerate().skip(1) {
        let (Some(time), Some(title)) = (row.get(layout.time_column), row.get(layout.title_column))
        else {
            log::debug!("Skipping pasted row {} with {} columns", i, row.len());
            continue;
        };

        let time = if lines.is_empty() {
            "00:00:00".to_string()
        } else {
            // frames or sub-fields after the seconds are dropped
            time.trim().split(':').take(3).collect::<Vec<_>>().join(":")
        };
        lines.push(format!("{} {}", time, single_line_title(title)));
    }

    log::info!("Imported {} chapters from pasted table", lines.len());
    Some(lines.join("\n"))
}

// Tab separated when the data has any tab, comma separated otherwise.
fn parse_table(data: &str) -> anyhow::Result<Vec<StringRecord>> {
    // "" escapes keep the count even; an odd count is an unclosed quote
    if data.matches('"').count() % 2 != 0 {
        anyhow::bail!("unbalanced quotes");
    }

    let delimiter = if data.contains('\t') { b'\t' } else { b',' };
    let rows = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_bytes())
        .into_records()
        .collect::<Result<Vec<_>, _>>()
        .context("Malformed table")?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(time: &str, note: &str) -> String {
        let mut fields = vec![String::new(); 20];
        fields[8] = time.to_string();
        fields[19] = note.to_string();
        fields.join("\t")
    }

    #[test]
    fn test_plain_text_passes_through() {
        let text = "00:00:00 Intro\n00:01:30 Chapter 2";
        assert_eq!(import_clipboard(text, &TableLayout::default()).as_deref(), Some(text));
    }

    #[test]
    fn test_marker_table() {
        let data = [
            row("Time", "Note"),
            row("00:00:03:12", "Intro"),
            row("00:01:30:05", "Chapter 2"),
            row("00:10:00:00", " Outro "),
        ]
        .join("\n");

        assert_eq!(
            import_clipboard(&data, &TableLayout::default()).as_deref(),
            Some("00:00:00 Intro\n00:01:30 Chapter 2\n00:10:00 Outro")
        );
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let data = [row("Time", "Note"), "too\tshort".to_string(), row("00:00:10", "Intro")].join("\n");
        assert_eq!(
            import_clipboard(&data, &TableLayout::default()).as_deref(),
            Some("00:00:00 Intro")
        );
    }

    #[test]
    fn test_comma_separated_with_quotes() {
        let layout = TableLayout {
            time_column: 0,
            title_column: 1,
            min_columns: 2,
        };
        let data = "time,title\n00:00:00,Intro\n00:02:00,\"Questions, answers and \"\"more\"\"\"";
        assert_eq!(
            import_clipboard(data, &layout).as_deref(),
            Some("00:00:00 Intro\n00:02:00 Questions, answers and \"more\"")
        );
    }

    #[test]
    fn test_quoted_newline_stays_in_its_row() {
        let data = [
            row("Time", "Note"),
            row("00:00:03:12", "\"Intro\nwith notes\""),
            row("00:01:30:05", "Chapter 2"),
        ]
        .join("\n");

        assert_eq!(
            import_clipboard(&data, &TableLayout::default()).as_deref(),
            Some("00:00:00 Intro with notes\n00:01:30 Chapter 2")
        );
    }

    #[test]
    fn test_unclosed_quote_is_rejected() {
        let data = [row("Time", "Note"), row("00:00:00", "\"Intro")].join("\n");
        assert_eq!(import_clipboard(&data, &TableLayout::default()), None);
    }
}
