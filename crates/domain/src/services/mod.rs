//! Shared service helpers: the subscription registry and telemetry wiring.

pub mod registry;
pub mod telemetry;

pub use registry::*;
pub use telemetry::*;
