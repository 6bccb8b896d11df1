//! Grid data model: typed attribute values, declared schemas, components and topology.

pub mod component;
pub mod schema;
pub mod topology;
pub mod value;

pub use component::{Attributes, Component, ComponentKey, Connection, Params};
pub use schema::{Field, Schema};
pub use topology::Topology;
pub use value::{FieldKind, Value};
