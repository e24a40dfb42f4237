//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - observations (`Toa`)
//! - bins and segmentation outputs (`Bin`, `Segmentation`)
//! - run settings (`Strategy`, `SegmentConfig`)

pub mod types;

pub use types::*;
