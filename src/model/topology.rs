//! Component arena and typed connection lists.

use indexmap::IndexMap;

use super::component::{Attributes, Component, ComponentKey, Connection, Params};
use super::schema::Schema;
use super::value::Value;
use crate::error::{SimError, SimResult};

/// The wired grid: components and connections grouped by type in declaration order.
///
/// Components live in a flat arena addressed by [`ComponentKey`]; connections
/// refer to them by key so handlers can borrow source and target mutably at
/// the same time.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    components: Vec<Component>,
    component_schemas: IndexMap<String, Schema>,
    components_by_type: IndexMap<String, Vec<ComponentKey>>,
    connection_schemas: IndexMap<String, Schema>,
    connections_by_type: IndexMap<String, Vec<Connection>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a component type and the schema of its observable attributes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the type is already declared.
    pub fn declare_component_type(&mut self, kind: &str, schema: Schema) -> SimResult<()> {
        if self.component_schemas.contains_key(kind) {
            return Err(SimError::invalid(
                "component_type",
                format!("\"{kind}\" declared twice"),
            ));
        }
        self.component_schemas.insert(kind.to_string(), schema);
        self.components_by_type.insert(kind.to_string(), Vec::new());
        Ok(())
    }

    /// Declares a connection type and the schema of its parameter bag.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the type is already declared.
    pub fn declare_connection_type(&mut self, kind: &str, schema: Schema) -> SimResult<()> {
        if self.connection_schemas.contains_key(kind) {
            return Err(SimError::invalid(
                "connection_type",
                format!("\"{kind}\" declared twice"),
            ));
        }
        self.connection_schemas.insert(kind.to_string(), schema);
        self.connections_by_type.insert(kind.to_string(), Vec::new());
        Ok(())
    }

    /// Adds a component whose attributes start at schema defaults and are then
    /// overridden by `overrides`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for an undeclared type or a duplicate id,
    /// and `Schema` if an override does not fit the declared schema.
    pub fn add_component<'a>(
        &mut self,
        kind: &str,
        id: &str,
        overrides: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> SimResult<ComponentKey> {
        let schema = self
            .component_schemas
            .get(kind)
            .ok_or_else(|| SimError::invalid("component_type", format!("\"{kind}\" not declared")))?;
        let attributes = overlay(schema.defaults(), overrides);
        schema.validate(&format!("{kind}/{id}"), &attributes)?;

        if self.find(kind, id).is_some() {
            return Err(SimError::invalid(
                "component_id",
                format!("\"{kind}/{id}\" already exists"),
            ));
        }

        let key = ComponentKey(self.components.len());
        self.components.push(Component::new(kind, id, attributes));
        if let Some(keys) = self.components_by_type.get_mut(kind) {
            keys.push(key);
        }
        Ok(key)
    }

    /// Connects `source` to `target` under connection type `kind`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for an undeclared type, an unknown key, or a
    /// self-loop, and `Schema` if a parameter does not fit the declared schema.
    pub fn connect<'a>(
        &mut self,
        kind: &str,
        source: ComponentKey,
        target: ComponentKey,
        overrides: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> SimResult<()> {
        let schema = self.connection_schemas.get(kind).ok_or_else(|| {
            SimError::invalid("connection_type", format!("\"{kind}\" not declared"))
        })?;
        for key in [source, target] {
            if key.0 >= self.components.len() {
                return Err(SimError::invalid(
                    "component_key",
                    format!("{} is not in this topology", key.0),
                ));
            }
        }
        if source == target {
            return Err(SimError::invalid(
                "connection",
                format!("\"{kind}\" connects a component to itself"),
            ));
        }
        let params = overlay(schema.defaults(), overrides);
        schema.validate(kind, &params)?;

        if let Some(list) = self.connections_by_type.get_mut(kind) {
            list.push(Connection {
                source,
                target,
                params,
            });
        }
        Ok(())
    }

    /// Looks up a component key by type and id.
    pub fn find(&self, kind: &str, id: &str) -> Option<ComponentKey> {
        self.components_by_type
            .get(kind)?
            .iter()
            .copied()
            .find(|key| self.components[key.0].id() == id)
    }

    /// The component behind `key`, or `None` if the key belongs to another topology.
    pub fn component(&self, key: ComponentKey) -> Option<&Component> {
        self.components.get(key.0)
    }

    pub fn component_mut(&mut self, key: ComponentKey) -> Option<&mut Component> {
        self.components.get_mut(key.0)
    }

    /// Component types with their schemas, in declaration order.
    pub fn component_schemas(&self) -> &IndexMap<String, Schema> {
        &self.component_schemas
    }

    /// Connection types with their schemas, in declaration order.
    pub fn connection_schemas(&self) -> &IndexMap<String, Schema> {
        &self.connection_schemas
    }

    /// Components of one type, in declaration order.
    pub fn components_of<'a>(&'a self, kind: &str) -> impl Iterator<Item = &'a Component> + 'a {
        self.components_by_type
            .get(kind)
            .into_iter()
            .flatten()
            .map(|key| &self.components[key.0])
    }

    pub fn components_by_type(&self) -> &IndexMap<String, Vec<ComponentKey>> {
        &self.components_by_type
    }

    pub fn connections_by_type(&self) -> &IndexMap<String, Vec<Connection>> {
        &self.connections_by_type
    }

    /// Number of components per declared type.
    pub fn component_counts(&self) -> impl Iterator<Item = (&str, usize)> {
        self.components_by_type
            .iter()
            .map(|(kind, keys)| (kind.as_str(), keys.len()))
    }

    /// Total number of connections of all types.
    pub fn connection_count(&self) -> usize {
        self.connections_by_type.values().map(Vec::len).sum()
    }

    /// Calls `f` with `(source, target, params)` for every connection of `kind`,
    /// in declaration order, stopping at the first error.
    ///
    /// Returns the number of connections visited.
    pub fn try_for_each_connection<E>(
        &mut self,
        kind: &str,
        mut f: impl FnMut(&mut Component, &mut Component, &mut Params) -> Result<(), E>,
    ) -> Result<usize, E> {
        let Some(connections) = self.connections_by_type.get_mut(kind) else {
            return Ok(0);
        };
        let mut visited = 0;
        for connection in connections.iter_mut() {
            let (source, target) =
                pair_mut(&mut self.components, connection.source.0, connection.target.0);
            f(source, target, &mut connection.params)?;
            visited += 1;
        }
        Ok(visited)
    }
}

/// Disjoint mutable borrows of two distinct arena slots.
fn pair_mut(components: &mut [Component], a: usize, b: usize) -> (&mut Component, &mut Component) {
    debug_assert_ne!(a, b, "self-loops are rejected by Topology::connect");
    if a < b {
        let (head, tail) = components.split_at_mut(b);
        (&mut head[a], &mut tail[0])
    } else {
        let (head, tail) = components.split_at_mut(a);
        (&mut tail[0], &mut head[b])
    }
}

fn overlay<'a>(
    mut attrs: Attributes,
    overrides: impl IntoIterator<Item = (&'a str, Value)>,
) -> Attributes {
    for (name, value) in overrides {
        attrs.insert(name.to_string(), value);
    }
    attrs
}
