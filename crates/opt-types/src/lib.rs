//! # opt-types
//!
//! Shared vocabulary for Optimist: bounds, tagged points, the parameter and
//! experiment capabilities, the observation dataset, run events and the
//! error type every crate in the workspace returns.

pub mod bounds;
pub mod dataset;
pub mod errors;
pub mod events;
pub mod experiment;
pub mod parameter;
pub mod point;

pub use bounds::*;
pub use dataset::*;
pub use errors::*;
pub use events::*;
pub use experiment::*;
pub use parameter::*;
pub use point::*;
