//! Scenario-to-JMX compiler.
//!
//! A scenario is resolved against the target JMeter release once per
//! compile; each feature family then renders through the emitter bound to its
//! capability level, and the assembled plan serializes byte-stably.
pub mod assemble;
pub mod capability;
pub mod emit;
pub mod error;
pub mod jmx;
pub mod readback;
pub mod scenario;
pub mod settings;
