/// Fixed-step tick clock.
pub mod clock;
/// Per-type CSV snapshot sinks.
pub mod datalog;
pub mod engine;
/// Connection handler contract and dispatch table.
pub mod handler;
pub mod report;

pub use clock::{Clock, Tick};
pub use datalog::DataLog;
pub use engine::{RunSummary, SimulationEngine};
pub use handler::{ConnectionHandler, HandlerRegistry, HandlerRegistryBuilder};
