//! Purpose: Shared library crate behind the `chartpipe` CLI and tests.
//! Exports: `core` (column types, line formats, inference, streaming parser),
//! `input` (line sources), `output` (rendering back ends).
//! Role: Internal library backing the binary; not yet a stable public SDK.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod core;
pub mod input;
pub mod output;
