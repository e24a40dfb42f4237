//! Model-side view of DMX bins.
//!
//! - parameter naming and the collaborator contract (`params`)
//! - installing a segmentation as parameters (`install`)

pub mod install;
pub mod params;

pub use install::*;
pub use params::*;
