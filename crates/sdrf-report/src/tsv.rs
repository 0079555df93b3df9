//! Tab-separated SDRF text.
//!
//! Values are escaped so that every record is exactly one line and every
//! field is delimited by exactly one tab: backslash, tab, newline and
//! carriage return become `\\`, `\t`, `\n` and `\r`.

use std::borrow::Cow;
use std::collections::BTreeMap;

use sdrf_model::{AnnotatorError, Result, SdrfTable};

pub fn escape_value(value: &str) -> Cow<'_, str> {
    if !value.contains(['\\', '\t', '\n', '\r']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 4);
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// Reverses [`escape_value`]. Unknown escapes are kept verbatim.
pub fn unescape_value(value: &str) -> Cow<'_, str> {
    if !value.contains('\\') {
        return Cow::Borrowed(value);
    }
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            unescaped.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => unescaped.push('\\'),
            Some('t') => unescaped.push('\t'),
            Some('n') => unescaped.push('\n'),
            Some('r') => unescaped.push('\r'),
            Some(other) => {
                unescaped.push('\\');
                unescaped.push(other);
            }
            None => unescaped.push('\\'),
        }
    }
    Cow::Owned(unescaped)
}

/// Writes the header line and one line per row, each terminated by `\n`.
///
/// A table without headers renders as the empty string.
pub fn to_tsv(table: &SdrfTable) -> String {
    if table.headers.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    push_line(&mut out, table.headers.iter().map(String::as_str));
    for row in &table.rows {
        push_line(
            &mut out,
            table
                .headers
                .iter()
                .map(|header| row.get(header).map_or("", String::as_str)),
        );
    }
    out
}

fn push_line<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (idx, field) in fields.enumerate() {
        if idx > 0 {
            out.push('\t');
        }
        out.push_str(&escape_value(field));
    }
    out.push('\n');
}

/// Parses text produced by [`to_tsv`].
///
/// Every data line must have as many fields as the header line. A trailing
/// `\r` on a line (CRLF files) is ignored.
pub fn parse_tsv(text: &str) -> Result<SdrfTable> {
    if text.is_empty() {
        return Ok(SdrfTable::default());
    }
    let body = text.strip_suffix('\n').unwrap_or(text);
    let mut lines = body.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line));

    let header_line = lines.next().unwrap_or_default();
    let headers: Vec<String> = header_line
        .split('\t')
        .map(|field| unescape_value(field).into_owned())
        .collect();
    let mut table = SdrfTable::new(headers)?;

    for (idx, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != table.headers.len() {
            return Err(AnnotatorError::validation(format!(
                "SDRF line {} has {} fields, expected {}",
                idx + 2,
                fields.len(),
                table.headers.len()
            )));
        }
        let row: BTreeMap<String, String> = table
            .headers
            .iter()
            .zip(fields)
            .map(|(header, field)| (header.clone(), unescape_value(field).into_owned()))
            .collect();
        table.push_row(row)?;
    }
    Ok(table)
}
