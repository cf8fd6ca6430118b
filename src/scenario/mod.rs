//! Scenario model consumed by the compiler.
//!
//! The scenario arrives already merged; the compiler only reads it.
mod load;
mod types;

pub use load::{load_scenario, parse_scenario, validate_scenario};
pub use types::*;
