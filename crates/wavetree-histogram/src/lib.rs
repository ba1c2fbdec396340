//! Per-coefficient sample and acceptance histograms for a trans-dimensional
//! chain.
//!
//! Ported from `wavetree/coefficient_histogram.c`: as a sampler visits a
//! coefficient, it reports the value it took and whether a birth/death/
//! value proposal touching it was accepted. This crate folds those
//! reports into running value-distribution bins, a Welford mean/std, and
//! plain proposal/acceptance counters, independent of the tree itself.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod histogram;
pub mod mapper;

pub use histogram::CoefficientHistogram;
pub use mapper::{IdentityMapper, IndexMapper};
