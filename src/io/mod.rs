//! Input/output helpers.
//!
//! - TOA CSV ingest + validation (`ingest`)
//! - `dmxparse.out` and TOA CSV exports (`export`)
//! - fitted-model JSON read/write (`fit`)

pub mod export;
pub mod fit;
pub mod ingest;

pub use export::*;
pub use fit::*;
pub use ingest::*;
