//! Error model, binary I/O primitives, and ordered multiset containers
//! shared by every wavetree crate.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod error;
pub mod gfmt;
pub mod io;
pub mod oset;

pub use error::{
    all_empty, bad_arg, empty_depth, format_error, full, io_failure, not_active, not_attachable,
    nothing_pending, occupied, short_io, Result,
};
pub use gfmt::format_g;
pub use io::{BinaryReader, BinaryWriter, ReadOutcome};
pub use oset::{Inserted, OrderedMultisetInt, OrderedMultisetIntDouble, Removed, DEPTH_SIZE};
