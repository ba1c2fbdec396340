//! Error model shared by every wavetree component.
//!
//! The source library returns a bare `int` status from almost every call
//! and leans on `ERROR(...)` logging for diagnosis. This port follows the
//! convention used across this codebase's library crates: an opaque
//! [`anyhow::Error`] carrying a human-readable message, built through a
//! small set of constructor functions instead of a matchable enum, so
//! callers `?`-propagate freely and tests assert on the message or on
//! `is_err()` rather than on a variant.

use std::fmt;
use std::io;

/// Crate-wide result alias.
pub type Result<T> = anyhow::Result<T>;

/// Illegal index, out-of-range depth, or a null/uninitialised tree.
pub fn bad_arg(msg: impl fmt::Display) -> anyhow::Error {
    anyhow::anyhow!("bad argument: {msg}")
}

/// A value-change or death was asked for a coefficient not in `S_v`.
pub fn not_active(depth: u32, index: usize) -> anyhow::Error {
    anyhow::anyhow!("coefficient ({depth}, {index}) is not active")
}

/// A birth was asked for a node not in `S_b`.
pub fn not_attachable(depth: u32, index: usize) -> anyhow::Error {
    anyhow::anyhow!("coefficient ({depth}, {index}) is not attachable")
}

/// A move's destination is already active.
pub fn occupied(depth: u32, index: usize) -> anyhow::Error {
    anyhow::anyhow!("move destination ({depth}, {index}) is already occupied")
}

/// `commit`/`undo` called with no pending edit.
pub fn nothing_pending() -> anyhow::Error {
    anyhow::anyhow!("no pending edit to commit or undo")
}

/// A bounded container (chain history) is at capacity.
pub fn full() -> anyhow::Error {
    anyhow::anyhow!("container is full")
}

/// A user-supplied reader/writer failed with an underlying [`io::Error`].
pub fn io_failure(intent: impl fmt::Display, source: io::Error) -> anyhow::Error {
    anyhow::Error::new(source).context(format!("I/O failure during {intent}"))
}

/// A user-supplied reader/writer returned a short count with no
/// underlying OS error.
pub fn short_io(intent: impl fmt::Display) -> anyhow::Error {
    anyhow::anyhow!("I/O failure during {intent}: short read or write")
}

/// Persisted data did not match the expected schema.
pub fn format_error(msg: impl fmt::Display) -> anyhow::Error {
    anyhow::anyhow!("format error: {msg}")
}

/// A chooser was asked to pick a depth but every depth is empty.
pub fn all_empty() -> anyhow::Error {
    anyhow::anyhow!("no non-empty depths available")
}

/// A chooser was asked to pick within a depth that has no entries.
pub fn empty_depth(depth: u32) -> anyhow::Error {
    anyhow::anyhow!("depth {depth} is empty")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_stable_for_assertions() {
        let e = not_active(2, 5);
        assert_eq!(e.to_string(), "coefficient (2, 5) is not active");
    }

    #[test]
    fn bad_arg_formats_message() {
        let e = bad_arg("depth -1 out of range");
        assert!(e.to_string().contains("depth -1"));
    }
}
