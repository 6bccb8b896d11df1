//! Discrete-time simulator of an energy-distribution pipeline with a lossy
//! telemetry channel and per-tick CSV logging.

/// Stochastic communication link model.
pub mod channel;
pub mod config;
pub mod error;
/// Reference pipeline components, handlers and scenario wiring.
pub mod grid;
pub mod model;
/// Scheduling loop, handler dispatch and data logging.
pub mod sim;

pub use error::{HandlerError, SimError, SimResult};
