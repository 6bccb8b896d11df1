//! Reference energy pipeline: generator → transmitter → substation → distributor →
//! prosumer → smart meter → aggregator → utility.
//!
//! The engine does not depend on anything here; this module supplies simple
//! observable models so a scenario produces a meaningful time series.

pub mod handlers;
pub mod profile;
pub mod scenario;
pub mod schemas;

pub use handlers::{MeteringHandler, PowerFlowHandler, Reading, SupplyHandler, TelemetryHandler};
pub use scenario::{build_registry, build_scenario, build_topology};
