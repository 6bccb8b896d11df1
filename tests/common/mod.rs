//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use grid_sim::HandlerError;
use grid_sim::model::{Component, Field, Params, Schema, Topology, Value};
use grid_sim::sim::HandlerRegistryBuilder;

/// Ordered record of `(connection_type, source_id, target_id, tick)` dispatches.
pub type CallLog = Rc<RefCell<Vec<(String, String, String, u64)>>>;

/// Two transmitters feeding one substation, which feeds one distributor.
///
/// Declares a third connection type, `distributor_to_prosumer`, with one
/// connection so tests can leave it unregistered.
pub fn small_grid() -> Topology {
    let stage = || Schema::new(vec![Field::float("input_kw"), Field::int("visits")]).unwrap();
    let link = || Schema::new(vec![Field::float("flow_kw")]).unwrap();

    let mut topo = Topology::new();
    for kind in ["transmitter", "substation", "distributor", "prosumer"] {
        topo.declare_component_type(kind, stage()).unwrap();
    }
    for kind in [
        "transmitter_to_substation",
        "substation_to_distributor",
        "distributor_to_prosumer",
    ] {
        topo.declare_connection_type(kind, link()).unwrap();
    }

    let t1 = topo
        .add_component("transmitter", "T1", [("input_kw", Value::Float(4.0))])
        .unwrap();
    let t2 = topo
        .add_component("transmitter", "T2", [("input_kw", Value::Float(6.0))])
        .unwrap();
    let s1 = topo.add_component("substation", "S1", []).unwrap();
    let d1 = topo.add_component("distributor", "D1", []).unwrap();
    let h1 = topo.add_component("prosumer", "H1", []).unwrap();

    topo.connect("transmitter_to_substation", t1, s1, []).unwrap();
    topo.connect("transmitter_to_substation", t2, s1, []).unwrap();
    topo.connect("substation_to_distributor", s1, d1, []).unwrap();
    topo.connect("distributor_to_prosumer", d1, h1, []).unwrap();
    topo
}

/// Registers a handler for `kind` that records each call and bumps the
/// target's `visits` counter.
pub fn recording(
    builder: HandlerRegistryBuilder,
    kind: &'static str,
    calls: &CallLog,
) -> HandlerRegistryBuilder {
    let calls = Rc::clone(calls);
    builder.register(
        kind,
        move |source: &mut Component, target: &mut Component, params: &mut Params, tick: u64| {
            calls.borrow_mut().push((
                kind.to_string(),
                source.id().to_string(),
                target.id().to_string(),
                tick,
            ));
            let flow = source.get_f64("input_kw");
            params.insert("flow_kw".into(), Value::Float(flow));
            target.add_i64("visits", 1);
            Ok::<(), HandlerError>(())
        },
    )
}

/// Reads a CSV sink into `(headers, rows)`.
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut rdr = csv::Reader::from_path(path).expect("sink should exist");
    let headers = rdr
        .headers()
        .expect("sink should have a header")
        .iter()
        .map(String::from)
        .collect();
    let rows = rdr
        .records()
        .map(|r| r.expect("row should parse").iter().map(String::from).collect())
        .collect();
    (headers, rows)
}
