//! Fixed-step simulation engine that dispatches connection handlers and logs every tick.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::{debug, info, trace, warn};

use super::clock::Clock;
use super::datalog::DataLog;
use super::handler::HandlerRegistry;
use super::report;
use crate::error::{SimError, SimResult};
use crate::model::Topology;

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Number of ticks dispatched and logged.
    pub ticks: u64,
    /// Handler invocations per registered connection type, in dispatch order.
    pub dispatches: IndexMap<String, u64>,
    /// Connection types present in the topology with no registered handler.
    pub skipped_types: Vec<String>,
    /// Data rows written across all sinks.
    pub rows_written: u64,
    pub output_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Wall-clock time spent in the run.
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Run Summary ---")?;
        writeln!(f, "Output: {}", self.output_dir.display())?;
        writeln!(f, "Ticks: {}", self.ticks)?;
        for (kind, count) in &self.dispatches {
            writeln!(f, "  {kind}: {count} dispatches")?;
        }
        for kind in &self.skipped_types {
            writeln!(f, "  {kind}: no handler, skipped")?;
        }
        writeln!(f, "Rows written: {}", self.rows_written)?;
        write!(f, "Elapsed: {:.3}s", self.elapsed.as_secs_f64())
    }
}

/// Owns the topology and the handler table and drives the tick loop.
///
/// Each tick dispatches every registered connection type in registration
/// order, each connection of a type in declaration order, and only then
/// snapshots the whole topology into the data log.
#[derive(Debug)]
pub struct SimulationEngine {
    topology: Topology,
    handlers: HandlerRegistry,
}

impl SimulationEngine {
    pub fn new(topology: Topology, handlers: HandlerRegistry) -> Self {
        Self { topology, handlers }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Consumes the engine, returning the topology in its final state.
    pub fn into_topology(self) -> Topology {
        self.topology
    }

    /// Connection types with at least one connection in the topology that no
    /// handler is registered for.
    pub fn unhandled_connection_types(&self) -> Vec<String> {
        self.topology
            .connections_by_type()
            .iter()
            .filter(|(kind, connections)| {
                !connections.is_empty() && !self.handlers.contains(kind)
            })
            .map(|(kind, _)| kind.clone())
            .collect()
    }

    /// Runs the simulation for `duration` in steps of `timestep`, writing the run
    /// report and per-type sinks under `output_dir`.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` if `timestep <= 0` or `duration < 0`; nothing is written
    /// - `Handler` if a connection handler fails; sinks are closed and the report
    ///   keeps only its start block
    /// - `Schema`, `Io` or `Csv` from the data log or the report
    pub fn run(
        &mut self,
        duration: f64,
        timestep: f64,
        output_dir: impl AsRef<Path>,
    ) -> SimResult<RunSummary> {
        let mut clock = Clock::new(duration, timestep)?;
        let output_dir = output_dir.as_ref().to_path_buf();

        fs::create_dir_all(&output_dir)?;
        let started_at = Utc::now();
        let wall = Instant::now();
        let report_path = report::write_start(&output_dir, started_at, &self.topology)?;

        let mut log = DataLog::new(&output_dir);
        log.initialize_sinks(&self.topology)?;

        self.handlers.begin_run();
        let skipped_types = self.unhandled_connection_types();
        for kind in &skipped_types {
            warn!(connection_type = %kind, "no handler registered; connections of this type are skipped");
        }

        info!(
            duration,
            timestep,
            ticks = clock.total_ticks(),
            output = %output_dir.display(),
            "simulation started"
        );

        let mut dispatches: IndexMap<String, u64> = self
            .handlers
            .connection_types()
            .map(|kind| (kind.to_string(), 0))
            .collect();

        let ticks = match self.run_ticks(&mut clock, &mut log, &mut dispatches) {
            Ok(ticks) => ticks,
            Err(e) => {
                if let Err(close_err) = log.close_sinks() {
                    warn!(error = %close_err, "failed to close sinks after aborted run");
                }
                return Err(e);
            }
        };
        log.close_sinks()?;

        let ended_at = Utc::now();
        let elapsed = wall.elapsed();
        report::write_end(&report_path, ended_at, elapsed)?;

        info!(ticks, rows = log.rows_written(), elapsed_s = elapsed.as_secs_f64(), "simulation finished");

        Ok(RunSummary {
            ticks,
            dispatches,
            skipped_types,
            rows_written: log.rows_written(),
            output_dir,
            started_at,
            ended_at,
            elapsed,
        })
    }

    fn run_ticks(
        &mut self,
        clock: &mut Clock,
        log: &mut DataLog,
        dispatches: &mut IndexMap<String, u64>,
    ) -> SimResult<u64> {
        let mut ticks = 0;
        while let Some(tick) = clock.tick() {
            for index in 0..self.handlers.len() {
                let Some((kind, handler)) = self.handlers.get_index_mut(index) else {
                    continue;
                };
                let count = self
                    .topology
                    .try_for_each_connection(kind, |source, target, params| {
                        trace!(
                            tick = tick.index,
                            connection_type = kind,
                            source = source.id(),
                            target = target.id(),
                            "dispatch"
                        );
                        handler.handle(source, target, params, tick.index)
                    })
                    .map_err(|source| SimError::Handler {
                        connection_type: kind.to_string(),
                        tick: tick.index,
                        source,
                    })?;
                if let Some(total) = dispatches.get_mut(kind) {
                    *total += count as u64;
                }
            }

            log.log_tick(tick.index, &self.topology)?;
            debug!(tick = tick.index, time = tick.time, "tick complete");
            ticks += 1;
        }
        Ok(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::model::{Component, Field, Params, Schema, Value};
    use crate::sim::ConnectionHandler;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn two_stage() -> Topology {
        let mut topo = Topology::new();
        topo.declare_component_type("source", Schema::new(vec![Field::float("level")]).unwrap())
            .unwrap();
        topo.declare_component_type("sink", Schema::new(vec![Field::float("level")]).unwrap())
            .unwrap();
        topo.declare_connection_type("source_to_sink", Schema::empty()).unwrap();
        let a = topo.add_component("source", "A", [("level", Value::Float(2.0))]).unwrap();
        let b = topo.add_component("sink", "B", []).unwrap();
        topo.connect("source_to_sink", a, b, []).unwrap();
        topo
    }

    #[test]
    fn invalid_timestep_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("run");
        let mut engine = SimulationEngine::new(two_stage(), HandlerRegistry::default());

        let err = engine.run(10.0, 0.0, &out).unwrap_err();
        assert!(err.is_invalid_parameter());
        assert!(engine.run(-1.0, 1.0, &out).unwrap_err().is_invalid_parameter());
        assert!(!out.exists());
    }

    #[test]
    fn dispatch_precedes_logging_within_a_tick() {
        let dir = tempfile::tempdir().unwrap();
        let handlers = HandlerRegistry::builder()
            .register(
                "source_to_sink",
                |s: &mut Component, t: &mut Component, _: &mut Params, _: u64| {
                    t.add_f64("level", s.get_f64("level"));
                    Ok::<(), HandlerError>(())
                },
            )
            .build()
            .unwrap();
        let mut engine = SimulationEngine::new(two_stage(), handlers);

        let summary = engine.run(3.0, 1.0, dir.path()).unwrap();
        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.dispatches["source_to_sink"], 3);

        let mut rdr = csv::Reader::from_path(dir.path().join("sink.csv")).unwrap();
        let levels: Vec<String> = rdr.records().map(|r| r.unwrap()[2].to_string()).collect();
        assert_eq!(levels, vec!["2", "4", "6"]);
    }

    #[test]
    fn handler_error_aborts_and_closes_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in_handler = Rc::clone(&seen);
        let handlers = HandlerRegistry::builder()
            .register(
                "source_to_sink",
                move |_: &mut Component, _: &mut Component, _: &mut Params, tick: u64| {
                    seen_in_handler.borrow_mut().push(tick);
                    if tick == 2 {
                        return Err::<(), HandlerError>("meter offline".into());
                    }
                    Ok(())
                },
            )
            .build()
            .unwrap();
        let mut engine = SimulationEngine::new(two_stage(), handlers);

        let err = engine.run(10.0, 1.0, dir.path()).unwrap_err();
        assert!(matches!(err, SimError::Handler { tick: 2, .. }));
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);

        let report = fs::read_to_string(dir.path().join(report::REPORT_FILE)).unwrap();
        assert!(report.contains("Simulation started at"));
        assert!(!report.contains("Simulation ended at"));

        let mut rdr = csv::Reader::from_path(dir.path().join("source.csv")).unwrap();
        assert_eq!(rdr.records().count(), 2);
    }

    #[test]
    fn unhandled_types_are_reported_not_dispatched() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = SimulationEngine::new(two_stage(), HandlerRegistry::default());
        assert_eq!(engine.unhandled_connection_types(), vec!["source_to_sink"]);

        let summary = engine.run(2.0, 1.0, dir.path()).unwrap();
        assert!(summary.dispatches.is_empty());
        assert_eq!(summary.skipped_types, vec!["source_to_sink"]);
        assert_eq!(summary.ticks, 2);
    }

    #[test]
    fn declared_type_without_connections_is_not_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut topo = two_stage();
        topo.declare_connection_type("sink_to_source", Schema::empty()).unwrap();
        let mut engine = SimulationEngine::new(topo, HandlerRegistry::default());
        assert_eq!(engine.unhandled_connection_types(), vec!["source_to_sink"]);

        let summary = engine.run(1.0, 1.0, dir.path()).unwrap();
        assert_eq!(summary.skipped_types, vec!["source_to_sink"]);
    }

    struct Counting {
        starts: Rc<RefCell<u32>>,
        ticks: Rc<RefCell<Vec<u64>>>,
    }

    impl ConnectionHandler for Counting {
        fn begin_run(&mut self) {
            *self.starts.borrow_mut() += 1;
        }

        fn handle(
            &mut self,
            _: &mut Component,
            _: &mut Component,
            _: &mut Params,
            tick: u64,
        ) -> Result<(), HandlerError> {
            self.ticks.borrow_mut().push(tick);
            Ok(())
        }
    }

    #[test]
    fn every_run_starts_handlers_afresh() {
        let dir = tempfile::tempdir().unwrap();
        let starts = Rc::new(RefCell::new(0));
        let ticks = Rc::new(RefCell::new(Vec::new()));
        let handlers = HandlerRegistry::builder()
            .register(
                "source_to_sink",
                Counting {
                    starts: Rc::clone(&starts),
                    ticks: Rc::clone(&ticks),
                },
            )
            .build()
            .unwrap();
        let mut engine = SimulationEngine::new(two_stage(), handlers);

        engine.run(2.0, 1.0, dir.path().join("a")).unwrap();
        engine.run(2.0, 1.0, dir.path().join("b")).unwrap();
        assert_eq!(*starts.borrow(), 2);
        assert_eq!(*ticks.borrow(), vec![0, 1, 0, 1]);
    }

    #[test]
    fn invalid_parameters_do_not_start_handlers() {
        let dir = tempfile::tempdir().unwrap();
        let starts = Rc::new(RefCell::new(0));
        let handlers = HandlerRegistry::builder()
            .register(
                "source_to_sink",
                Counting {
                    starts: Rc::clone(&starts),
                    ticks: Rc::new(RefCell::new(Vec::new())),
                },
            )
            .build()
            .unwrap();
        let mut engine = SimulationEngine::new(two_stage(), handlers);

        assert!(engine.run(1.0, 0.0, dir.path()).is_err());
        assert_eq!(*starts.borrow(), 0);
    }
}
