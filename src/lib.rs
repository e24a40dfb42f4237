//! `dmx-bins` library crate.
//!
//! Piecewise-constant dispersion-measure (DMX) modelling support:
//!
//! - group TOAs into DMX bins that contain both frequency bands (`segment`)
//! - install the bins as model parameters (`model`)
//! - summarize fitted bins with mean-subtracted values and uncertainties (`summary`)
//! - report per-bin TOA coverage (`report`)
//!
//! The binary (`dmx`) is a thin wrapper around this library so core logic is
//! testable without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod model;
pub mod report;
pub mod segment;
pub mod summary;
