//! Domain-level building blocks shared across the API and notifier crates:
//! environment configuration, the webhook payload model, address and
//! contact validation, the subscription registry and telemetry setup.

pub mod config;
pub mod model;
pub mod services;

pub use model::*;
pub use services::*;
