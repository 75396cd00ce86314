//! Purpose: Derive the most specific format string a single line satisfies.
//! Exports: `infer_line_format`.
//! Invariants: Numeric detection outranks timestamp detection; timestamp
//! detection requires a configured date pattern and a non-empty field.

use time::format_description::OwnedFormatItem;
use time::parsing::Parsed;

use crate::core::format::collapse_separator_runs;

/// Classifies every field of `line` and concatenates the one-character codes.
/// With `date_items` absent, every non-numeric field falls back to `s`;
/// timestamp detection is opt-in.
pub fn infer_line_format(
    line: &str,
    separator: char,
    date_items: Option<&OwnedFormatItem>,
) -> String {
    let collapsed = collapse_separator_runs(line, separator);
    let mut format = String::new();
    for field in collapsed.trim().split(separator) {
        let value = field.trim();
        if value.parse::<f64>().is_ok() {
            format.push('f');
        } else if !value.is_empty()
            && date_items.is_some_and(|items| {
                Parsed::new()
                    .parse_item(value.as_bytes(), items)
                    .is_ok_and(|remaining| remaining.is_empty())
            })
        {
            format.push('d');
        } else {
            format.push('s');
        }
    }
    format
}
