//! Append-only, capacity-bounded, replayable log of wavetree edits.
//!
//! Ported from `wavetree/chain_history.c`: a `ChainHistory` records every
//! accepted-or-not edit a sampler applies to a `Wavetree`, well enough to
//! reconstruct the coefficient trajectory from the log alone, without
//! holding onto the original tree.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod chain_history;

pub use chain_history::{ChainHistory, ChainStep, ChainStepKind, StepHeader, StepPayload};
