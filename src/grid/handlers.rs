//! Reference transfer logic for the seven pipeline connection types.

use std::collections::HashSet;

use crate::channel::CommunicationChannel;
use crate::error::HandlerError;
use crate::model::{Component, Params, Value};
use crate::sim::ConnectionHandler;

use super::profile::{GenerationProfile, daylight_frac};

/// Remembers which entities were already touched during the current tick.
///
/// Targets fed by several connections accumulate their inputs; the first visit
/// in a tick clears what the previous tick left behind.
#[derive(Debug, Default, Clone)]
pub struct TickTracker {
    tick: Option<u64>,
    seen: HashSet<String>,
}

impl TickTracker {
    /// Returns `true` the first time `label` is seen during `tick`.
    pub fn first_visit(&mut self, tick: u64, label: String) -> bool {
        if self.tick != Some(tick) {
            self.tick = Some(tick);
            self.seen.clear();
        }
        self.seen.insert(label)
    }

    /// Forgets the current tick so the next visit is always a first one.
    pub fn reset(&mut self) {
        self.tick = None;
        self.seen.clear();
    }
}

fn param_f64(params: &Params, name: &str) -> f64 {
    params.get(name).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Moves `share` of the source's `output_kw` into the target's `input_kw`.
///
/// The target's `output_kw` becomes `input_kw * efficiency`. With a generation
/// profile attached, the source's `output_kw` is first refreshed from its
/// `capacity_kw` once per tick.
#[derive(Debug, Default)]
pub struct PowerFlowHandler {
    generation: Option<GenerationProfile>,
    sources: TickTracker,
    targets: TickTracker,
}

impl PowerFlowHandler {
    /// Flow between two intermediate stages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flow out of generators whose output follows `profile`.
    pub fn from_generators(profile: GenerationProfile) -> Self {
        Self {
            generation: Some(profile),
            ..Self::default()
        }
    }
}

impl ConnectionHandler for PowerFlowHandler {
    fn begin_run(&mut self) {
        self.sources.reset();
        self.targets.reset();
    }

    fn handle(
        &mut self,
        source: &mut Component,
        target: &mut Component,
        params: &mut Params,
        tick: u64,
    ) -> Result<(), HandlerError> {
        if let Some(profile) = &mut self.generation {
            if self.sources.first_visit(tick, source.label()) {
                let output = source.get_f64("capacity_kw") * profile.factor(source.kind(), tick);
                source.set("output_kw", output);
            }
        }

        let flow = source.get_f64("output_kw") * param_f64(params, "share");
        params.insert("flow_kw".into(), Value::Float(flow));

        if self.targets.first_visit(tick, target.label()) {
            target.set("input_kw", 0.0);
        }
        target.add_f64("input_kw", flow);
        let output = target.get_f64("input_kw") * target.get_f64("efficiency");
        target.set("output_kw", output);
        Ok(())
    }
}

/// Delivers distributor output to prosumers and refreshes their rooftop solar.
///
/// `net_kw = demand_kw - solar_kw`; negative values mean the prosumer exports.
#[derive(Debug)]
pub struct SupplyHandler {
    steps_per_day: u64,
    targets: TickTracker,
}

impl SupplyHandler {
    pub fn new(steps_per_day: u64) -> Self {
        Self {
            steps_per_day,
            targets: TickTracker::default(),
        }
    }
}

impl ConnectionHandler for SupplyHandler {
    fn begin_run(&mut self) {
        self.targets.reset();
    }

    fn handle(
        &mut self,
        source: &mut Component,
        target: &mut Component,
        params: &mut Params,
        tick: u64,
    ) -> Result<(), HandlerError> {
        if self.targets.first_visit(tick, target.label()) {
            let solar = target.get_f64("solar_capacity_kw") * daylight_frac(tick, self.steps_per_day);
            target.set("solar_kw", solar);
            target.set("net_kw", target.get_f64("demand_kw") - solar);
            target.set("supplied_kw", 0.0);
        }

        let flow = source.get_f64("output_kw") * param_f64(params, "share");
        params.insert("flow_kw".into(), Value::Float(flow));
        target.add_f64("supplied_kw", flow);
        Ok(())
    }
}

/// Copies a prosumer's net load into its smart meter and integrates energy.
#[derive(Debug)]
pub struct MeteringHandler {
    hours_per_tick: f64,
}

impl MeteringHandler {
    pub fn new(hours_per_tick: f64) -> Self {
        Self { hours_per_tick }
    }
}

impl ConnectionHandler for MeteringHandler {
    fn handle(
        &mut self,
        source: &mut Component,
        target: &mut Component,
        params: &mut Params,
        _tick: u64,
    ) -> Result<(), HandlerError> {
        let net = source.get_f64("net_kw");
        target.set("reading_kw", net);
        target.add_f64("energy_kwh", net * self.hours_per_tick);
        params.insert("flow_kw".into(), Value::Float(net));
        Ok(())
    }
}

/// A telemetry packet moved over a [`CommunicationChannel`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub tick: u64,
    pub sender: String,
    pub kw: f64,
}

/// Sends one reading per connection per tick over a lossy channel.
///
/// A reading counts as delivered only if both the sender's `transmit` and the
/// receiver's `receive` succeed. Delivered readings add to the target's
/// `total_kw` and `received` counter; lost ones bump the `dropped` counter.
#[derive(Debug)]
pub struct TelemetryHandler {
    channel: CommunicationChannel<Reading>,
    payload_field: &'static str,
    received_field: &'static str,
    dropped_field: &'static str,
    targets: TickTracker,
}

impl TelemetryHandler {
    /// Meter readings (`reading_kw`) into aggregators.
    pub fn meter_to_aggregator(channel: CommunicationChannel<Reading>) -> Self {
        Self::new(channel, "reading_kw", "readings_received", "readings_dropped")
    }

    /// Aggregated totals (`total_kw`) into the utility.
    pub fn aggregator_to_utility(channel: CommunicationChannel<Reading>) -> Self {
        Self::new(channel, "total_kw", "reports_received", "reports_dropped")
    }

    fn new(
        channel: CommunicationChannel<Reading>,
        payload_field: &'static str,
        received_field: &'static str,
        dropped_field: &'static str,
    ) -> Self {
        Self {
            channel,
            payload_field,
            received_field,
            dropped_field,
            targets: TickTracker::default(),
        }
    }

    pub fn channel(&self) -> &CommunicationChannel<Reading> {
        &self.channel
    }
}

impl ConnectionHandler for TelemetryHandler {
    fn begin_run(&mut self) {
        self.targets.reset();
    }

    fn handle(
        &mut self,
        source: &mut Component,
        target: &mut Component,
        params: &mut Params,
        tick: u64,
    ) -> Result<(), HandlerError> {
        if self.targets.first_visit(tick, target.label()) {
            target.set("total_kw", 0.0);
        }

        let reading = Reading {
            tick,
            sender: source.id().to_string(),
            kw: source.get_f64(self.payload_field),
        };
        let kw = reading.kw;
        let delivered = self.channel.transmit(reading.clone()) && self.channel.receive(reading);

        if delivered {
            target.add_f64("total_kw", kw);
            target.add_i64(self.received_field, 1);
        } else {
            target.add_i64(self.dropped_field, 1);
        }
        params.insert("delivered".into(), Value::Bool(delivered));
        params.insert("payload_kw".into(), Value::Float(kw));
        Ok(())
    }
}
