//! Per-type CSV sinks receiving one snapshot row per entity per tick.

use std::fs::File;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{SimError, SimResult};
use crate::model::{Schema, Topology};

type Sink = csv::Writer<File>;

#[derive(Debug)]
enum State {
    Uninitialized,
    Open {
        components: IndexMap<String, Sink>,
        connections: IndexMap<String, Sink>,
    },
    Closed,
}

/// Append-only time series of component and connection state, one CSV file per type.
///
/// Component sinks have columns `tick,id,<schema fields>`; connection sinks have
/// `tick,source,target,<schema fields>`. Sinks are opened once by
/// [`DataLog::initialize_sinks`] and closed once by [`DataLog::close_sinks`];
/// dropping a log with open sinks flushes them.
#[derive(Debug)]
pub struct DataLog {
    dir: PathBuf,
    state: State,
    rows_written: u64,
}

impl DataLog {
    /// Creates a log writing into `dir`. No file is touched until initialization.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            state: State::Uninitialized,
            rows_written: 0,
        }
    }

    /// Path of the sink for entity type `kind`.
    pub fn sink_path(&self, kind: &str) -> PathBuf {
        self.dir.join(format!("{kind}.csv"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open { .. })
    }

    /// Total data rows written across all sinks.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Validates every entity against its type's schema, then opens one sink per
    /// declared component type and connection type and writes its header row.
    ///
    /// # Errors
    ///
    /// - `PreconditionViolation` if called more than once
    /// - `Schema` if an entity does not match its declared schema
    /// - `InvalidParameter` if a component type and a connection type share a name
    /// - `Io`/`Csv` if a sink cannot be created
    pub fn initialize_sinks(&mut self, topology: &Topology) -> SimResult<()> {
        if !matches!(self.state, State::Uninitialized) {
            return Err(SimError::PreconditionViolation(
                "data log sinks are initialized at most once per run".into(),
            ));
        }

        validate_topology(topology)?;

        for kind in topology.connection_schemas().keys() {
            if topology.component_schemas().contains_key(kind) {
                return Err(SimError::invalid(
                    "sink",
                    format!("\"{kind}\" names both a component and a connection type"),
                ));
            }
        }

        let mut components = IndexMap::new();
        for (kind, schema) in topology.component_schemas() {
            let sink = self.open_sink(kind, ["tick", "id"], schema)?;
            components.insert(kind.clone(), sink);
        }

        let mut connections = IndexMap::new();
        for (kind, schema) in topology.connection_schemas() {
            let sink = self.open_sink(kind, ["tick", "source", "target"], schema)?;
            connections.insert(kind.clone(), sink);
        }

        debug!(
            dir = %self.dir.display(),
            component_sinks = components.len(),
            connection_sinks = connections.len(),
            "data log sinks opened"
        );
        self.state = State::Open {
            components,
            connections,
        };
        Ok(())
    }

    fn open_sink<const N: usize>(
        &self,
        kind: &str,
        leading: [&str; N],
        schema: &Schema,
    ) -> SimResult<Sink> {
        let mut sink = csv::WriterBuilder::new().from_path(self.sink_path(kind))?;
        sink.write_record(leading.into_iter().chain(schema.names()))?;
        Ok(sink)
    }

    /// Writes one row per component and one row per connection for `tick`.
    ///
    /// # Errors
    ///
    /// - `PreconditionViolation` before initialization or after closure
    /// - `Schema` if a handler left an entity out of line with its schema
    /// - `Csv` if a row cannot be written
    pub fn log_tick(&mut self, tick: u64, topology: &Topology) -> SimResult<()> {
        let (components, connections) = match &mut self.state {
            State::Open {
                components,
                connections,
            } => (components, connections),
            State::Uninitialized => {
                return Err(SimError::PreconditionViolation(
                    "log_tick called before initialize_sinks".into(),
                ));
            }
            State::Closed => {
                return Err(SimError::PreconditionViolation(
                    "log_tick called after close_sinks".into(),
                ));
            }
        };

        let tick_cell = tick.to_string();
        let mut rows = 0;

        for (kind, schema) in topology.component_schemas() {
            let Some(sink) = components.get_mut(kind) else {
                return Err(SimError::PreconditionViolation(format!(
                    "no sink opened for component type \"{kind}\""
                )));
            };
            for component in topology.components_of(kind) {
                schema.validate(&component.label(), component.attributes())?;
                let mut record = vec![tick_cell.clone(), component.id().to_string()];
                record.extend(
                    schema
                        .names()
                        .map(|name| component.attributes()[name].to_string()),
                );
                sink.write_record(&record)?;
                rows += 1;
            }
        }

        for (kind, schema) in topology.connection_schemas() {
            let Some(sink) = connections.get_mut(kind) else {
                return Err(SimError::PreconditionViolation(format!(
                    "no sink opened for connection type \"{kind}\""
                )));
            };
            for connection in topology.connections_by_type().get(kind).into_iter().flatten() {
                schema.validate(kind, &connection.params)?;
                let (Some(source), Some(target)) = (
                    topology.component(connection.source()),
                    topology.component(connection.target()),
                ) else {
                    return Err(SimError::PreconditionViolation(format!(
                        "\"{kind}\" connection refers to a component outside the topology"
                    )));
                };
                let mut record = vec![
                    tick_cell.clone(),
                    source.id().to_string(),
                    target.id().to_string(),
                ];
                record.extend(
                    schema
                        .names()
                        .map(|name| connection.params[name].to_string()),
                );
                sink.write_record(&record)?;
                rows += 1;
            }
        }

        self.rows_written += rows;
        Ok(())
    }

    /// Flushes and releases every sink.
    ///
    /// # Errors
    ///
    /// `PreconditionViolation` unless the sinks are currently open; `Io` if a
    /// flush fails (the remaining sinks are still released).
    pub fn close_sinks(&mut self) -> SimResult<()> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Open {
                components,
                connections,
            } => {
                let mut first_error = None;
                for (kind, mut sink) in components.into_iter().chain(connections) {
                    if let Err(e) = sink.flush() {
                        warn!(sink = %kind, error = %e, "failed to flush sink");
                        first_error.get_or_insert(e);
                    }
                }
                debug!(dir = %self.dir.display(), rows = self.rows_written, "data log sinks closed");
                match first_error {
                    Some(e) => Err(e.into()),
                    None => Ok(()),
                }
            }
            State::Uninitialized => {
                self.state = State::Uninitialized;
                Err(SimError::PreconditionViolation(
                    "close_sinks called before initialize_sinks".into(),
                ))
            }
            State::Closed => Err(SimError::PreconditionViolation(
                "data log sinks already closed".into(),
            )),
        }
    }
}

impl Drop for DataLog {
    fn drop(&mut self) {
        if self.is_open() {
            if let Err(e) = self.close_sinks() {
                warn!(error = %e, "data log dropped with sinks that failed to close");
            }
        }
    }
}

fn validate_topology(topology: &Topology) -> SimResult<()> {
    for (kind, schema) in topology.component_schemas() {
        for component in topology.components_of(kind) {
            schema.validate(&component.label(), component.attributes())?;
        }
    }
    for (kind, schema) in topology.connection_schemas() {
        for connection in topology.connections_by_type().get(kind).into_iter().flatten() {
            schema.validate(kind, &connection.params)?;
        }
    }
    Ok(())
}
