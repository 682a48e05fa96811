//! Segment table - the delimited handoff file read by the cutting tool
//!
//! ```text
//! from_timestamp,to_timestamp,file,short_description
//! 00:01:00,00:02:00,0001.mp4,Intro and agenda
//! ```
//!
//! Rows are written in `sequence_index` order. Descriptions holding the
//! delimiter, a quote or a line break are quoted with inner quotes doubled.

use crate::error::{Error, Result};
use crate::time::{parse_clock, Timestamp};
use crate::types::{NormalizedSegment, SegmentCandidate};

pub const HEADER: [&str; 4] = ["from_timestamp", "to_timestamp", "file", "short_description"];
const DELIMITER: char = ',';

/// One parsed row of a segment table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// 1-based line number in the source text
    pub line: usize,
    pub from: Timestamp,
    pub to: Timestamp,
    pub file: String,
    pub description: String,
}

impl TableRow {
    pub fn to_candidate(&self) -> SegmentCandidate {
        SegmentCandidate::new(self.from, self.to, self.description.clone())
    }
}

/// Render segments as a segment table. Output is byte-identical for equal
/// input.
pub fn write_table(segments: &[NormalizedSegment], extension: &str) -> String {
    let mut out = HEADER.join(",");
    out.push('\n');
    for segment in segments {
        out.push_str(&segment.start.to_table_string());
        out.push(DELIMITER);
        out.push_str(&segment.end.to_table_string());
        out.push(DELIMITER);
        out.push_str(&quote_field(&segment.file_name(extension)));
        out.push(DELIMITER);
        out.push_str(&quote_field(&segment.description));
        out.push('\n');
    }
    out
}

/// Parse a segment table. The header row is required; `file` and
/// `short_description` may be empty.
pub fn parse_table(raw: &str) -> Result<Vec<TableRow>> {
    let text = raw.trim_start_matches('\u{feff}');
    let records = split_records(text)?;

    let mut records = records.into_iter();
    let Some((header_line, header)) = records.next() else {
        return Err(Error::MalformedTable {
            line: 1,
            reason: "missing header row".to_string(),
        });
    };
    let header: Vec<&str> = header.iter().map(|h| h.trim()).collect();
    if header.len() < 2 || header[..2] != HEADER[..2] {
        return Err(Error::MalformedTable {
            line: header_line,
            reason: format!("expected header '{}', found '{}'", HEADER.join(","), header.join(",")),
        });
    }
    let column = |name: &str| header.iter().position(|h| *h == name);
    let file_col = column(HEADER[2]);
    let description_col = column(HEADER[3]);

    let mut rows = Vec::new();
    for (line, fields) in records {
        if fields.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let malformed = |reason: String| Error::MalformedTable { line, reason };
        let field = |idx: Option<usize>| {
            idx.and_then(|i| fields.get(i))
                .map(|f| f.trim().to_string())
                .unwrap_or_default()
        };
        // An unquoted comma in a trailing description spills into extra fields.
        let description = match description_col {
            Some(col) if col + 1 == header.len() && fields.len() > header.len() => {
                fields[col..].join(",").trim().to_string()
            }
            _ if fields.len() > header.len() => {
                return Err(malformed(format!(
                    "{} fields but the header has {}",
                    fields.len(),
                    header.len()
                )));
            }
            col => field(col),
        };

        let from = parse_clock(&field(Some(0)))
            .map_err(|err| malformed(format!("bad from_timestamp: {:#}", err)))?;
        let to = parse_clock(&field(Some(1)))
            .map_err(|err| malformed(format!("bad to_timestamp: {:#}", err)))?;

        rows.push(TableRow {
            line,
            from,
            to,
            file: field(file_col),
            description,
        });
    }
    Ok(rows)
}

/// Inverse of [`write_table`]: rows in order, indexed `1..=N`.
pub fn read_segments(raw: &str) -> Result<Vec<NormalizedSegment>> {
    Ok(parse_table(raw)?
        .into_iter()
        .enumerate()
        .map(|(idx, row)| NormalizedSegment {
            sequence_index: idx + 1,
            start: row.from,
            end: row.to,
            description: row.description,
        })
        .collect())
}

fn quote_field(value: &str) -> String {
    if value.contains([DELIMITER, '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Splits text into records of fields, honouring quoted fields that span
/// lines. Each record carries the line number it starts on.
fn split_records(text: &str) -> Result<Vec<(usize, Vec<String>)>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut record_line = 1usize;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(ch);
                }
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            DELIMITER => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                fields.push(std::mem::take(&mut field));
                records.push((record_line, std::mem::take(&mut fields)));
                line += 1;
                record_line = line;
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err(Error::MalformedTable {
            line: record_line,
            reason: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push((record_line, fields));
    }
    Ok(records)
}
