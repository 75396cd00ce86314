//! Purpose: `chartpipe` CLI entry point.
//! Role: Binary crate root; parses args, wires the pipeline, renders output.
//! Invariants: The pipeline is reader → parser → renderer, each owning its
//! stage; channels are the only shared state.
//! Invariants: Process exit code is derived from `core::to_exit_code`.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use chartpipe::core::{
    DEFAULT_SAMPLE_LINES, Error, ErrorKind, Row, StreamParser, to_exit_code,
};
use chartpipe::input;
use chartpipe::output::{Registry, RenderOptions};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Parser)]
#[command(
    name = "chartpipe",
    version,
    about = "Chart delimiter-separated data from a file or stdin"
)]
struct Cli {
    /// Input file; reads stdin when omitted.
    file: Option<PathBuf>,

    /// Output back end.
    #[arg(short, long, default_value = "chartjs")]
    output: String,

    /// Column separator; accepts the two-character escape `\t`.
    #[arg(short, long, default_value = "\t")]
    separator: String,

    /// Date format as a time format description, e.g. `[year]-[month]-[day]`.
    /// Empty disables timestamp detection.
    #[arg(long, default_value = "")]
    date_format: String,

    /// Explicit line format over `[dfs]`, e.g. `fsd`; skips inference.
    #[arg(short, long)]
    format: Option<String>,

    /// How many head-of-stream lines to sample before freezing the format.
    #[arg(long, default_value_t = DEFAULT_SAMPLE_LINES)]
    sample_lines: usize,

    /// Write output to this path instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Pretty-print JSON output (json back end).
    #[arg(long)]
    pretty: bool,

    /// Chart title (chartjs, d3).
    #[arg(long, default_value = "")]
    title: String,

    /// Chart type; chartjs defaults to line, d3 to bar.
    #[arg(long)]
    chart_type: Option<String>,

    /// X axis label (chartjs, d3).
    #[arg(long, default_value = "")]
    x_label: String,

    /// Y axis label (chartjs, d3).
    #[arg(long, default_value = "")]
    y_label: String,

    /// Make the y axis begin at zero (chartjs).
    #[arg(long)]
    zero_based: bool,

    /// Y axis scale: linear or logarithmic (chartjs).
    #[arg(long, default_value = "linear")]
    scale: String,

    /// Override the chart color, e.g. `red` or `#ff0000` (chartjs, d3).
    #[arg(long, default_value = "")]
    color: String,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("chartpipe: {err}");
        if let Some(hint) = err.hint() {
            eprintln!("hint: {hint}");
        }
        std::process::exit(to_exit_code(err.kind()));
    }
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();

    let separator = parse_separator(&cli.separator)?;
    if cli.sample_lines == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--sample-lines must be greater than zero"));
    }

    let registry = Registry::builtin();
    let backend = registry.get(&cli.output)?;
    let options = RenderOptions {
        pretty: cli.pretty,
        title: cli.title,
        chart_type: cli.chart_type,
        x_label: cli.x_label,
        y_label: cli.y_label,
        zero_based: cli.zero_based,
        scale: cli.scale,
        color: cli.color,
    };

    let mut parser =
        StreamParser::new(separator, &cli.date_format)?.with_sample_lines(cli.sample_lines);
    if let Some(format) = &cli.format {
        parser = parser.with_format(format)?;
    }

    // Open both ends before starting the pipeline so configuration errors
    // surface without consuming any input.
    let reader = input::open_source(cli.file.as_deref())?;
    let mut out = open_output(cli.out.as_deref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to start runtime")
                .with_source(err)
        })?;

    let (line_tx, line_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
    let (row_tx, row_rx) = mpsc::channel::<Row>(CHANNEL_CAPACITY);

    let reader_task = runtime.spawn_blocking(move || input::read_lines(reader, line_tx));
    let parser_task = runtime.spawn(parser.run(line_rx, row_tx));

    // The renderer runs on this thread while the runtime drives the producers.
    if let Err(err) = backend.render(row_rx, &options, out.as_mut()) {
        // Don't wait for a reader that may be blocked on an open stdin.
        runtime.shutdown_background();
        return Err(err);
    }
    out.flush().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to flush output")
            .with_source(err)
    })?;

    let stats = runtime.block_on(parser_task).map_err(join_error)?;
    runtime.block_on(reader_task).map_err(join_error)??;
    tracing::info!(emitted = stats.emitted, dropped = stats.dropped, "stream complete");
    Ok(())
}

fn join_error(err: tokio::task::JoinError) -> Error {
    Error::new(ErrorKind::Internal)
        .with_message("pipeline stage panicked")
        .with_source(err)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Accepts a single character, or `\t` as typed in a shell.
fn parse_separator(raw: &str) -> Result<char, Error> {
    if raw == "\\t" {
        return Ok('\t');
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(separator), None) => Ok(separator),
        _ => Err(Error::new(ErrorKind::Usage)
            .with_message(format!("separator must be a single character, got {raw:?}"))),
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, Error> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to create output file")
                    .with_path(path)
                    .with_source(err)
            })?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(std::io::stdout())),
    }
}
