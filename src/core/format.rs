//! Purpose: Frozen per-stream schema and single-line parsing.
//! Exports: `LineFormat`, `collapse_separator_runs`, `parse_date_pattern`.
//! Role: Applies a fixed column-type sequence to raw lines, producing `Row`s.
//! Invariants: A constructed `LineFormat` is non-empty and never mutated.
//! Invariants: Timestamp validation is a gate, not a conversion; values stay text.

use time::format_description::OwnedFormatItem;
use time::parsing::Parsed;

use crate::core::column::ColumnType;
use crate::core::error::{Error, ErrorKind};
use crate::core::row::Row;

/// The frozen, ordered column-type schema applied to every line of a stream.
#[derive(Clone, Debug)]
pub struct LineFormat {
    columns: Vec<ColumnType>,
    separator: char,
    date_items: Option<OwnedFormatItem>,
    number_count: usize,
    text_count: usize,
    timestamp_count: usize,
}

impl LineFormat {
    /// Builds a format from a format string over the alphabet `[dfs ]`.
    /// Spaces are accepted and skipped; any other character is a usage error.
    /// An empty `date_format` disables timestamp parsing entirely.
    pub fn new(format_str: &str, separator: char, date_format: &str) -> Result<Self, Error> {
        let mut columns = Vec::with_capacity(format_str.len());
        for code in format_str.chars() {
            if code == ' ' {
                continue;
            }
            let column = ColumnType::from_code(code).ok_or_else(|| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!(
                        "format string {format_str:?} doesn't match syntax `[dfs ]*`"
                    ))
                    .with_hint("Use `f` for numbers, `s` for text, `d` for timestamps.")
            })?;
            columns.push(column);
        }
        if columns.is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("format string declares no columns"));
        }
        Ok(Self::from_columns(
            columns,
            separator,
            parse_date_pattern(date_format)?,
        ))
    }

    /// Infallible constructor for callers that already hold validated columns
    /// (the streaming parser freezes inferred formats through here).
    pub(crate) fn from_columns(
        columns: Vec<ColumnType>,
        separator: char,
        date_items: Option<OwnedFormatItem>,
    ) -> Self {
        let number_count = columns
            .iter()
            .filter(|c| **c == ColumnType::Number)
            .count();
        let text_count = columns.iter().filter(|c| **c == ColumnType::Text).count();
        let timestamp_count = columns
            .iter()
            .filter(|c| **c == ColumnType::Timestamp)
            .count();
        Self {
            columns,
            separator,
            date_items,
            number_count,
            text_count,
            timestamp_count,
        }
    }

    /// Renders the column codes back into a format string.
    pub fn format_string(&self) -> String {
        self.columns.iter().map(|c| c.code()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn number_count(&self) -> usize {
        self.number_count
    }

    pub fn text_count(&self) -> usize {
        self.text_count
    }

    pub fn timestamp_count(&self) -> usize {
        self.timestamp_count
    }

    pub fn has_numbers(&self) -> bool {
        self.number_count > 0
    }

    pub fn has_texts(&self) -> bool {
        self.text_count > 0
    }

    pub fn has_timestamps(&self) -> bool {
        self.timestamp_count > 0
    }

    /// Parses one raw line into a typed row.
    ///
    /// Runs of two or more separators collapse to one before splitting.
    /// Fewer fields than declared columns is a parse error; excess trailing
    /// fields are ignored.
    pub fn parse_line(&self, line: &str) -> Result<Row, Error> {
        let collapsed = collapse_separator_runs(line, self.separator);
        let fields: Vec<&str> = collapsed.trim().split(self.separator).collect();

        if fields.len() < self.columns.len() {
            return Err(Error::new(ErrorKind::Parse).with_message(format!(
                "line has {} fields, format declares {} columns",
                fields.len(),
                self.columns.len()
            )));
        }

        let mut row = Row::default();
        for (column, field) in self.columns.iter().zip(fields.iter()) {
            let value = field.trim();
            match column {
                ColumnType::Text => row.texts.push(value.to_string()),
                ColumnType::Number => {
                    let number: f64 = value.parse().map_err(|err| {
                        Error::new(ErrorKind::Parse)
                            .with_message(format!("couldn't convert {value:?} to a number"))
                            .with_source(err)
                    })?;
                    row.numbers.push(number);
                }
                ColumnType::Timestamp => {
                    let Some(items) = &self.date_items else {
                        return Err(Error::new(ErrorKind::Parse)
                            .with_message(format!(
                                "timestamp column declared but no date format configured \
                                 (value: {value:?})"
                            ))
                            .with_hint("Pass --date-format with a time format description."));
                    };
                    // Validation gate only: the items must consume the whole
                    // field, mirroring the sealed `Parsable::parse`.
                    let remaining =
                        Parsed::new().parse_item(value.as_bytes(), items).map_err(|err| {
                            Error::new(ErrorKind::Parse)
                                .with_message(format!("couldn't convert {value:?} to a timestamp"))
                                .with_source(err)
                        })?;
                    if !remaining.is_empty() {
                        return Err(Error::new(ErrorKind::Parse).with_message(format!(
                            "couldn't convert {value:?} to a timestamp"
                        )));
                    }
                    row.timestamps.push(value.to_string());
                }
            }
        }
        Ok(row)
    }
}

/// Collapses every run of two or more `separator` chars into a single one.
/// Tolerates ragged or padded delimiters in otherwise regular input.
pub fn collapse_separator_runs(line: &str, separator: char) -> String {
    let mut out = String::with_capacity(line.len());
    let mut previous_was_separator = false;
    for c in line.chars() {
        if c == separator {
            if !previous_was_separator {
                out.push(c);
            }
            previous_was_separator = true;
        } else {
            out.push(c);
            previous_was_separator = false;
        }
    }
    out
}

/// Parses a user-supplied date pattern into reusable format items.
/// An empty pattern means timestamp detection is opt-out (`None`).
pub fn parse_date_pattern(date_format: &str) -> Result<Option<OwnedFormatItem>, Error> {
    if date_format.is_empty() {
        return Ok(None);
    }
    let items = time::format_description::parse_owned::<2>(date_format).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("invalid date format {date_format:?}"))
            .with_hint("Use a time format description like `[year]-[month]-[day]`.")
            .with_source(err)
    })?;
    Ok(Some(items))
}
