//! Purpose: Feed raw lines from a file or stdin into the parsing pipeline.
//! Exports: `open_source`, `read_lines`.
//! Role: Blocking read loop intended for `tokio::task::spawn_blocking`.
//! Invariants: File-open failures are hard errors before the pipeline starts.
//! Invariants: The line channel closes when the source is exhausted or the
//! consumer goes away; nothing is sent after that.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use tokio::sync::mpsc;

use crate::core::error::{Error, ErrorKind};

/// Opens the line source: a file when `path` is given, otherwise stdin.
pub fn open_source(path: Option<&Path>) -> Result<Box<dyn Read + Send>, Error> {
    match path {
        Some(path) => {
            let file = File::open(path).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to open input file")
                    .with_path(path)
                    .with_source(err)
            })?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(std::io::stdin())),
    }
}

/// Reads `reader` line by line, sending owned strings into `lines`.
/// Returns the number of lines read. A mid-stream read error terminates the
/// stream and is surfaced to the caller after drain.
pub fn read_lines(reader: Box<dyn Read + Send>, lines: mpsc::Sender<String>) -> Result<u64, Error> {
    let mut count = 0u64;
    for line in BufReader::new(reader).lines() {
        let line = line.map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read input")
                .with_line(count + 1)
                .with_source(err)
        })?;
        if lines.blocking_send(line).is_err() {
            // Consumer closed early; stop reading.
            break;
        }
        count += 1;
    }
    Ok(count)
}
