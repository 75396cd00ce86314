//! Purpose: Orchestrate buffering, majority-vote format freezing, and row emission.
//! Exports: `StreamParser`, `StreamStats`, `DEFAULT_SAMPLE_LINES`.
//! Role: Single-producer/single-consumer pipeline stage between a line source
//! and a rendering back end.
//! Invariants: Sampled lines are replayed before any post-sample line is
//! parsed; output order matches input order.
//! Invariants: The output channel closes exactly once, when input is drained.
//! Invariants: Parse failures drop the line and continue; they never halt the stream.

use time::format_description::OwnedFormatItem;
use tokio::sync::mpsc;

use crate::core::column::ColumnType;
use crate::core::error::Error;
use crate::core::format::{LineFormat, parse_date_pattern};
use crate::core::infer::infer_line_format;
use crate::core::row::Row;

/// How many head-of-stream lines are buffered before the format freezes.
pub const DEFAULT_SAMPLE_LINES: usize = 5;

/// Counters for dropped-line observability. Dropped lines produce no row by
/// contract; the counters exist so malformed input is debuggable.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StreamStats {
    pub emitted: u64,
    pub dropped: u64,
}

/// Streaming parser over a single input sequence of raw lines.
///
/// Starts `Unresolved` unless an explicit format is supplied; freezes one
/// `LineFormat` from the inference sample and applies it to every line,
/// including the sample itself.
#[derive(Clone, Debug)]
pub struct StreamParser {
    separator: char,
    date_format: String,
    date_items: Option<OwnedFormatItem>,
    explicit_format: Option<LineFormat>,
    sample_lines: usize,
}

impl StreamParser {
    /// Fails with a usage error when `date_format` is not a valid time
    /// format description.
    pub fn new(separator: char, date_format: &str) -> Result<Self, Error> {
        Ok(Self {
            separator,
            date_format: date_format.to_string(),
            date_items: parse_date_pattern(date_format)?,
            explicit_format: None,
            sample_lines: DEFAULT_SAMPLE_LINES,
        })
    }

    /// Skips inference entirely. Fails with a usage error when `format_str`
    /// violates the `[dfs ]*` grammar, before the pipeline starts.
    pub fn with_format(mut self, format_str: &str) -> Result<Self, Error> {
        self.explicit_format = Some(LineFormat::new(
            format_str,
            self.separator,
            &self.date_format,
        )?);
        Ok(self)
    }

    pub fn with_sample_lines(mut self, sample_lines: usize) -> Self {
        self.sample_lines = sample_lines;
        self
    }

    /// Consumes `input` to completion, emitting one row per parseable line.
    /// Closing the input channel is the sole termination signal; the output
    /// channel closes when this future resolves and the sender drops.
    pub async fn run(self, mut input: mpsc::Receiver<String>, output: mpsc::Sender<Row>) -> StreamStats {
        let mut stats = StreamStats::default();
        let mut frozen = self.explicit_format.clone();
        let mut sample: Vec<String> = Vec::new();

        while let Some(line) = input.recv().await {
            match &frozen {
                Some(format) => {
                    if !self.emit(format, &line, &output, &mut stats).await {
                        return stats;
                    }
                }
                None => {
                    sample.push(line);
                    if sample.len() >= self.sample_lines {
                        let format = self.freeze(&sample);
                        tracing::debug!(format = %format.format_string(), "line format frozen");
                        for buffered in sample.drain(..) {
                            if !self.emit(&format, &buffered, &output, &mut stats).await {
                                return stats;
                            }
                        }
                        frozen = Some(format);
                    }
                }
            }
        }

        // Stream shorter than the sample bound: freeze from the partial
        // sample and replay it identically to the full-sample case.
        if frozen.is_none() && !sample.is_empty() {
            let format = self.freeze(&sample);
            tracing::debug!(format = %format.format_string(), "line format frozen (partial sample)");
            for buffered in sample.drain(..) {
                if !self.emit(&format, &buffered, &output, &mut stats).await {
                    return stats;
                }
            }
        }

        if stats.dropped > 0 {
            tracing::warn!(dropped = stats.dropped, emitted = stats.emitted, "dropped unparseable lines");
        }
        stats
    }

    /// Majority vote over the sampled lines. Ties break deterministically in
    /// favor of the format that first appeared in the sample.
    fn freeze(&self, sample: &[String]) -> LineFormat {
        let mut tally: Vec<(String, usize)> = Vec::new();
        for line in sample {
            let format = infer_line_format(line, self.separator, self.date_items.as_ref());
            match tally.iter_mut().find(|(known, _)| *known == format) {
                Some((_, count)) => *count += 1,
                None => tally.push((format, 1)),
            }
        }

        let mut winner = "";
        let mut best = 0;
        for (format, count) in &tally {
            if *count > best {
                best = *count;
                winner = format;
            }
        }

        let columns: Vec<ColumnType> = winner.chars().filter_map(ColumnType::from_code).collect();
        LineFormat::from_columns(columns, self.separator, self.date_items.clone())
    }

    /// Returns false when the consumer went away and the stage should stop.
    async fn emit(
        &self,
        format: &LineFormat,
        line: &str,
        output: &mpsc::Sender<Row>,
        stats: &mut StreamStats,
    ) -> bool {
        match format.parse_line(line) {
            Ok(row) => {
                if output.send(row).await.is_err() {
                    return false;
                }
                stats.emitted += 1;
            }
            Err(err) => {
                stats.dropped += 1;
                tracing::debug!(line, error = %err, "dropped line");
            }
        }
        true
    }
}
