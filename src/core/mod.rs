//! Purpose: Streaming line-format inference and typed-row parsing.
//! Exports: `ColumnType`, `LineFormat`, `Row`, `StreamParser`, errors.
//! Role: The parsing core; knows nothing about the CLI or rendering.
//! Invariants: A frozen `LineFormat` is immutable for the life of a stream.

pub mod column;
pub mod error;
pub mod format;
pub mod infer;
pub mod row;
pub mod stream;

pub use column::ColumnType;
pub use error::{Error, ErrorKind, to_exit_code};
pub use format::LineFormat;
pub use infer::infer_line_format;
pub use row::Row;
pub use stream::{DEFAULT_SAMPLE_LINES, StreamParser, StreamStats};
