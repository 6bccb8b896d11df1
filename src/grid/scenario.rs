//! Builds the reference pipeline topology and its handlers from a scenario config.

use crate::channel::CommunicationChannel;
use crate::config::ScenarioConfig;
use crate::error::SimResult;
use crate::model::{ComponentKey, Topology, Value};
use crate::sim::HandlerRegistry;

use super::handlers::{MeteringHandler, PowerFlowHandler, SupplyHandler, TelemetryHandler};
use super::profile::GenerationProfile;
use super::schemas::*;

/// Seed offsets so each random source draws an independent stream.
const WIND_SEED_OFFSET: u64 = 11;
const METER_LINK_SEED_OFFSET: u64 = 23;
const UTILITY_LINK_SEED_OFFSET: u64 = 57;

/// Wires generators through to the utility and registers a handler for every
/// connection type, in pipeline order.
///
/// Stages are fully meshed with even shares; each prosumer gets one smart
/// meter, prosumers are spread round-robin over distributors and meters over
/// aggregators, and every aggregator reports to a single utility.
///
/// # Errors
///
/// Returns `InvalidParameter` if a channel reliability is outside `[0, 1]`.
pub fn build_scenario(cfg: &ScenarioConfig) -> SimResult<(Topology, HandlerRegistry)> {
    let topology = build_topology(cfg)?;
    let registry = build_registry(cfg)?;
    Ok((topology, registry))
}

/// Builds only the topology half of [`build_scenario`].
pub fn build_topology(cfg: &ScenarioConfig) -> SimResult<Topology> {
    let g = &cfg.grid;
    let mut topo = Topology::new();
    declare_all(&mut topo)?;

    let mut generators = Vec::new();
    for (kind, prefix, count, capacity) in [
        (POWER_PLANT, "PP", g.power_plants, g.plant_capacity_kw),
        (SOLAR_PANEL, "SP", g.solar_panels, g.solar_capacity_kw),
        (WIND_TURBINE, "WT", g.wind_turbines, g.wind_capacity_kw),
    ] {
        for i in 0..count {
            let key = topo.add_component(
                kind,
                &format!("{prefix}{}", i + 1),
                [("capacity_kw", Value::Float(capacity))],
            )?;
            generators.push(key);
        }
    }

    let stage = [("efficiency", Value::Float(g.line_efficiency))];
    let transmitters = add_many(&mut topo, TRANSMITTER, "T", g.transmitters, &stage)?;
    let substations = add_many(&mut topo, SUBSTATION, "S", g.substations, &stage)?;
    let distributors = add_many(&mut topo, DISTRIBUTOR, "D", g.distributors, &stage)?;

    let household = [
        ("demand_kw", Value::Float(g.prosumer_demand_kw)),
        ("solar_capacity_kw", Value::Float(g.prosumer_solar_kw)),
    ];
    let prosumers = add_many(&mut topo, PROSUMER, "H", g.prosumers, &household)?;
    let meters = add_many(&mut topo, SMART_METER, "M", g.prosumers, &[])?;
    let aggregators = add_many(&mut topo, AGGREGATOR, "A", g.aggregators, &[])?;
    let utility = topo.add_component(UTILITY, "U1", [])?;

    mesh(&mut topo, GENERATOR_TO_TRANSMITTER, &generators, &transmitters)?;
    mesh(&mut topo, TRANSMITTER_TO_SUBSTATION, &transmitters, &substations)?;
    mesh(&mut topo, SUBSTATION_TO_DISTRIBUTOR, &substations, &distributors)?;

    for (d, &dist) in distributors.iter().enumerate() {
        let served: Vec<ComponentKey> = prosumers
            .iter()
            .copied()
            .skip(d)
            .step_by(distributors.len())
            .collect();
        let share = if served.is_empty() { 0.0 } else { 1.0 / served.len() as f64 };
        for home in served {
            topo.connect(DISTRIBUTOR_TO_PROSUMER, dist, home, [("share", Value::Float(share))])?;
        }
    }

    for (&home, &meter) in prosumers.iter().zip(&meters) {
        topo.connect(PROSUMER_TO_SMART_METER, home, meter, [("share", Value::Float(1.0))])?;
    }

    if !aggregators.is_empty() {
        for (i, &meter) in meters.iter().enumerate() {
            let aggregator = aggregators[i % aggregators.len()];
            topo.connect(SMART_METER_TO_AGGREGATOR, meter, aggregator, [])?;
        }
    }

    for &aggregator in &aggregators {
        topo.connect(AGGREGATOR_TO_UTILITY, aggregator, utility, [])?;
    }

    Ok(topo)
}

/// Builds only the handler half of [`build_scenario`].
pub fn build_registry(cfg: &ScenarioConfig) -> SimResult<HandlerRegistry> {
    let s = &cfg.simulation;
    let n = &cfg.network;

    let meter_link = CommunicationChannel::with_seed(
        n.name.clone(),
        n.reliability,
        s.seed.wrapping_add(METER_LINK_SEED_OFFSET),
    )?;
    let utility_link = CommunicationChannel::with_seed(
        format!("{} (utility uplink)", n.name),
        n.utility_reliability,
        s.seed.wrapping_add(UTILITY_LINK_SEED_OFFSET),
    )?;
    let profile = GenerationProfile::new(s.steps_per_day, s.seed.wrapping_add(WIND_SEED_OFFSET));

    HandlerRegistry::builder()
        .register(GENERATOR_TO_TRANSMITTER, PowerFlowHandler::from_generators(profile))
        .register(TRANSMITTER_TO_SUBSTATION, PowerFlowHandler::new())
        .register(SUBSTATION_TO_DISTRIBUTOR, PowerFlowHandler::new())
        .register(DISTRIBUTOR_TO_PROSUMER, SupplyHandler::new(s.steps_per_day))
        .register(PROSUMER_TO_SMART_METER, MeteringHandler::new(s.timestep))
        .register(SMART_METER_TO_AGGREGATOR, TelemetryHandler::meter_to_aggregator(meter_link))
        .register(AGGREGATOR_TO_UTILITY, TelemetryHandler::aggregator_to_utility(utility_link))
        .build()
}

fn add_many(
    topo: &mut Topology,
    kind: &str,
    prefix: &str,
    count: usize,
    attrs: &[(&str, Value)],
) -> SimResult<Vec<ComponentKey>> {
    (1..=count)
        .map(|i| {
            topo.add_component(
                kind,
                &format!("{prefix}{i}"),
                attrs.iter().map(|(name, value)| (*name, value.clone())),
            )
        })
        .collect()
}

/// Connects every source to every target, splitting each source evenly.
fn mesh(
    topo: &mut Topology,
    kind: &str,
    sources: &[ComponentKey],
    targets: &[ComponentKey],
) -> SimResult<()> {
    if targets.is_empty() {
        return Ok(());
    }
    let share = 1.0 / targets.len() as f64;
    for &source in sources {
        for &target in targets {
            topo.connect(kind, source, target, [("share", Value::Float(share))])?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_wires_every_stage() {
        let cfg = ScenarioConfig::baseline();
        let (topo, registry) = build_scenario(&cfg).unwrap();
        let g = &cfg.grid;

        let by_type = topo.connections_by_type();
        let generators = g.power_plants + g.solar_panels + g.wind_turbines;
        assert_eq!(by_type[GENERATOR_TO_TRANSMITTER].len(), generators * g.transmitters);
        assert_eq!(by_type[TRANSMITTER_TO_SUBSTATION].len(), g.transmitters * g.substations);
        assert_eq!(by_type[SUBSTATION_TO_DISTRIBUTOR].len(), g.substations * g.distributors);
        assert_eq!(by_type[DISTRIBUTOR_TO_PROSUMER].len(), g.prosumers);
        assert_eq!(by_type[PROSUMER_TO_SMART_METER].len(), g.prosumers);
        assert_eq!(by_type[SMART_METER_TO_AGGREGATOR].len(), g.prosumers);
        assert_eq!(by_type[AGGREGATOR_TO_UTILITY].len(), g.aggregators);

        let order: Vec<_> = registry.connection_types().collect();
        assert_eq!(order, CONNECTION_TYPES);
    }

    #[test]
    fn distributor_shares_sum_to_one() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.grid.distributors = 3;
        cfg.grid.prosumers = 7;
        let topo = build_topology(&cfg).unwrap();

        for dist in topo.components_by_type()[DISTRIBUTOR].iter().copied() {
            let total: f64 = topo.connections_by_type()[DISTRIBUTOR_TO_PROSUMER]
                .iter()
                .filter(|c| c.source() == dist)
                .map(|c| c.params["share"].as_f64().unwrap_or(0.0))
                .sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn bad_reliability_is_rejected() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.network.reliability = 1.5;
        assert!(build_registry(&cfg).unwrap_err().is_invalid_parameter());
    }
}
