//! Purpose: Stream rows to the writer as line-delimited JSON.
//! Exports: `JsonOutput`.
//! Invariants: One JSON object per row, in input order; no buffering.

use std::io::Write;

use tokio::sync::mpsc;

use crate::core::error::{Error, ErrorKind};
use crate::core::row::Row;
use crate::output::{Capabilities, Render, RenderOptions, write_io_error};

pub struct JsonOutput;

impl Render for JsonOutput {
    fn name(&self) -> &'static str {
        "json"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            streaming: true,
            interactive: false,
        }
    }

    fn render(
        &self,
        mut rows: mpsc::Receiver<Row>,
        options: &RenderOptions,
        out: &mut dyn Write,
    ) -> Result<(), Error> {
        while let Some(row) = rows.blocking_recv() {
            let text = if options.pretty {
                serde_json::to_string_pretty(&row)
            } else {
                serde_json::to_string(&row)
            }
            .map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to serialize row")
                    .with_source(err)
            })?;
            writeln!(out, "{text}").map_err(write_io_error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::JsonOutput;
    use crate::core::row::Row;
    use crate::output::{Render, RenderOptions};
    use tokio::sync::mpsc;

    fn rows_channel(rows: Vec<Row>) -> mpsc::Receiver<Row> {
        let (tx, rx) = mpsc::channel(rows.len().max(1));
        for row in rows {
            tx.try_send(row).unwrap();
        }
        rx
    }

    #[test]
    fn emits_one_json_object_per_row() {
        let rows = vec![
            Row {
                numbers: vec![1.0],
                texts: vec!["hello".to_string()],
                timestamps: vec![],
            },
            Row {
                numbers: vec![2.0],
                texts: vec!["world".to_string()],
                timestamps: vec![],
            },
        ];
        let mut out = Vec::new();
        JsonOutput
            .render(rows_channel(rows), &RenderOptions::default(), &mut out)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["numbers"][0], 1.0);
        assert_eq!(first["texts"][0], "hello");
    }

    #[test]
    fn pretty_output_is_still_valid_json() {
        let rows = vec![Row {
            numbers: vec![1.5],
            texts: vec![],
            timestamps: vec![],
        }];
        let options = RenderOptions {
            pretty: true,
            ..RenderOptions::default()
        };
        let mut out = Vec::new();
        JsonOutput.render(rows_channel(rows), &options, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["numbers"][0], 1.5);
    }
}
