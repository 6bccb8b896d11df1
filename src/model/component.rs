use indexmap::IndexMap;

use super::value::Value;

/// Attribute bag shared by components and connection parameters.
pub type Attributes = IndexMap<String, Value>;

/// Connection parameter bag.
pub type Params = Attributes;

/// Index of a component inside a [`super::Topology`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKey(pub(crate) usize);

impl ComponentKey {
    pub fn index(self) -> usize {
        self.0
    }
}

/// An entity of the grid identified by a type tag and an instance id.
///
/// The engine only reads its attributes for logging; handlers mutate them.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    kind: String,
    id: String,
    attributes: Attributes,
}

impl Component {
    pub fn new(kind: impl Into<String>, id: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            attributes,
        }
    }

    /// Type tag, e.g. `"transmitter"`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Instance identity, unique within the topology.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Numeric attribute as `f64`, or `0.0` when absent or non-numeric.
    pub fn get_f64(&self, name: &str) -> f64 {
        self.get(name).and_then(Value::as_f64).unwrap_or(0.0)
    }

    /// Integer attribute, or `0` when absent or not an integer.
    pub fn get_i64(&self, name: &str) -> i64 {
        self.get(name).and_then(Value::as_i64).unwrap_or(0)
    }

    /// Sets an attribute, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attributes.insert(name.into(), value.into())
    }

    /// Adds `delta` to a float attribute, treating an absent one as `0.0`.
    pub fn add_f64(&mut self, name: &str, delta: f64) {
        let current = self.get_f64(name);
        self.set(name, current + delta);
    }

    /// Adds `delta` to an integer attribute, treating an absent one as `0`.
    /// Saturates at the `i64` bounds.
    pub fn add_i64(&mut self, name: &str, delta: i64) {
        let current = self.get_i64(name);
        self.set(name, current.saturating_add(delta));
    }

    /// `type/id` label used in diagnostics.
    pub fn label(&self) -> String {
        format!("{}/{}", self.kind, self.id)
    }
}

/// A typed, directed link between two components with a mutable parameter bag.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub(crate) source: ComponentKey,
    pub(crate) target: ComponentKey,
    pub params: Params,
}

impl Connection {
    pub fn source(&self) -> ComponentKey {
        self.source
    }

    pub fn target(&self) -> ComponentKey {
        self.target
    }
}
