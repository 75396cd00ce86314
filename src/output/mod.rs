//! Purpose: Rendering back ends that consume typed rows.
//! Exports: `Render`, `Capabilities`, `RenderOptions`, `Registry`.
//! Role: Boundary between the parsing core and presentation; back ends are
//! looked up by name from an explicit registry built once at startup.
//! Invariants: The registry holds no global state; it is constructed in
//! `main` and passed by reference.

pub mod chartjs;
pub mod d3;
pub mod json;

use std::collections::BTreeMap;
use std::io::Write;

use tokio::sync::mpsc;

use crate::core::error::{Error, ErrorKind};
use crate::core::row::Row;

#[derive(Clone, Copy, Debug)]
pub struct Capabilities {
    /// Emits rows as they arrive instead of buffering the whole stream.
    pub streaming: bool,
    /// Produces a page meant for a browser rather than machine consumption.
    pub interactive: bool,
}

/// Presentation options shared across back ends; each back end reads the
/// subset it understands.
#[derive(Clone, Debug, Default)]
pub struct RenderOptions {
    pub pretty: bool,
    pub title: String,
    pub chart_type: Option<String>,
    pub x_label: String,
    pub y_label: String,
    pub zero_based: bool,
    pub scale: String,
    pub color: String,
}

pub trait Render {
    fn name(&self) -> &'static str;
    fn capabilities(&self) -> Capabilities;
    /// Consumes the row channel to completion. Runs on a plain thread while
    /// the runtime drives the producers, so receiving blocks.
    fn render(
        &self,
        rows: mpsc::Receiver<Row>,
        options: &RenderOptions,
        out: &mut dyn Write,
    ) -> Result<(), Error>;
}

/// Explicit name-to-back-end mapping, constructed once at process start.
pub struct Registry {
    backends: BTreeMap<&'static str, Box<dyn Render>>,
}

impl Registry {
    pub fn builtin() -> Self {
        let mut backends: BTreeMap<&'static str, Box<dyn Render>> = BTreeMap::new();
        for backend in [
            Box::new(json::JsonOutput) as Box<dyn Render>,
            Box::new(chartjs::ChartJsOutput),
            Box::new(d3::D3Output),
        ] {
            backends.insert(backend.name(), backend);
        }
        Self { backends }
    }

    pub fn get(&self, name: &str) -> Result<&dyn Render, Error> {
        self.backends
            .get(name)
            .map(|backend| backend.as_ref())
            .ok_or_else(|| {
                Error::new(ErrorKind::NotFound)
                    .with_message(format!("unknown output {name:?}"))
                    .with_hint(format!("Available outputs: {}.", self.names().join(", ")))
            })
    }

    /// Sorted back-end names (BTreeMap iteration order).
    pub fn names(&self) -> Vec<&'static str> {
        self.backends.keys().copied().collect()
    }
}

pub(crate) fn write_io_error(err: std::io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("failed to write output")
        .with_source(err)
}

/// Escapes text destined for an HTML element body or attribute.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Makes serialized JSON safe to embed inside a `<script>` block.
pub(crate) fn escape_json_for_script(json: &str) -> String {
    json.replace("</", "<\\/")
}
