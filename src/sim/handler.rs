//! Connection handler contract and the per-type dispatch table.

use indexmap::IndexMap;

use crate::error::{HandlerError, SimError, SimResult};
use crate::model::{Component, Params};

/// Transfer logic for one connection type.
///
/// Invoked exactly once per connection per tick, in dispatch order. All effects
/// are side effects on `source`, `target` and `params`; an error aborts the run.
pub trait ConnectionHandler {
    /// Called once at the start of every run, before the first tick.
    ///
    /// Handlers keeping per-tick bookkeeping clear it here so a second run on
    /// the same engine starts from tick 0 again.
    fn begin_run(&mut self) {}

    fn handle(
        &mut self,
        source: &mut Component,
        target: &mut Component,
        params: &mut Params,
        tick: u64,
    ) -> Result<(), HandlerError>;
}

impl<F> ConnectionHandler for F
where
    F: FnMut(&mut Component, &mut Component, &mut Params, u64) -> Result<(), HandlerError>,
{
    fn handle(
        &mut self,
        source: &mut Component,
        target: &mut Component,
        params: &mut Params,
        tick: u64,
    ) -> Result<(), HandlerError> {
        (*self)(source, target, params, tick)
    }
}

/// Dispatch table from connection type to handler.
///
/// Keys are fixed once the registry is built; iteration follows registration
/// order, which is the engine's dispatch order.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: IndexMap<String, Box<dyn ConnectionHandler>>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Registered connection types, in dispatch order.
    pub fn connection_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn contains(&self, connection_type: &str) -> bool {
        self.handlers.contains_key(connection_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Notifies every handler that a new run is starting.
    pub(crate) fn begin_run(&mut self) {
        for handler in self.handlers.values_mut() {
            handler.begin_run();
        }
    }

    /// Handler at dispatch position `index` with its connection type.
    pub(crate) fn get_index_mut(
        &mut self,
        index: usize,
    ) -> Option<(&str, &mut Box<dyn ConnectionHandler>)> {
        self.handlers
            .get_index_mut(index)
            .map(|(kind, handler)| (kind.as_str(), handler))
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.handlers.keys()).finish()
    }
}

/// Collects handlers before freezing them into a [`HandlerRegistry`].
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: IndexMap<String, Box<dyn ConnectionHandler>>,
    duplicate: Option<String>,
}

impl HandlerRegistryBuilder {
    /// Registers `handler` for `connection_type`.
    ///
    /// Registering a type twice is reported by [`Self::build`].
    pub fn register(
        mut self,
        connection_type: impl Into<String>,
        handler: impl ConnectionHandler + 'static,
    ) -> Self {
        let connection_type = connection_type.into();
        if self.handlers.contains_key(&connection_type) {
            self.duplicate.get_or_insert(connection_type);
        } else {
            self.handlers.insert(connection_type, Box::new(handler));
        }
        self
    }

    /// Freezes the table.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if any connection type was registered twice.
    pub fn build(self) -> SimResult<HandlerRegistry> {
        if let Some(kind) = self.duplicate {
            return Err(SimError::invalid(
                "handler_registry",
                format!("connection type \"{kind}\" registered more than once"),
            ));
        }
        Ok(HandlerRegistry {
            handlers: self.handlers,
        })
    }
}
