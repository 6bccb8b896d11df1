//! Component and connection type names of the reference pipeline, with their schemas.

use crate::error::SimResult;
use crate::model::{Field, Schema, Topology};

pub const POWER_PLANT: &str = "power_plant";
pub const SOLAR_PANEL: &str = "solar_panel";
pub const WIND_TURBINE: &str = "wind_turbine";
pub const TRANSMITTER: &str = "transmitter";
pub const SUBSTATION: &str = "substation";
pub const DISTRIBUTOR: &str = "distributor";
pub const PROSUMER: &str = "prosumer";
pub const SMART_METER: &str = "smart_meter";
pub const AGGREGATOR: &str = "aggregator";
pub const UTILITY: &str = "utility";

pub const GENERATOR_TO_TRANSMITTER: &str = "generator_to_transmitter";
pub const TRANSMITTER_TO_SUBSTATION: &str = "transmitter_to_substation";
pub const SUBSTATION_TO_DISTRIBUTOR: &str = "substation_to_distributor";
pub const DISTRIBUTOR_TO_PROSUMER: &str = "distributor_to_prosumer";
pub const PROSUMER_TO_SMART_METER: &str = "prosumer_to_smart_meter";
pub const SMART_METER_TO_AGGREGATOR: &str = "smart_meter_to_aggregator";
pub const AGGREGATOR_TO_UTILITY: &str = "aggregator_to_utility";

/// Pipeline order of the seven connection types.
pub const CONNECTION_TYPES: [&str; 7] = [
    GENERATOR_TO_TRANSMITTER,
    TRANSMITTER_TO_SUBSTATION,
    SUBSTATION_TO_DISTRIBUTOR,
    DISTRIBUTOR_TO_PROSUMER,
    PROSUMER_TO_SMART_METER,
    SMART_METER_TO_AGGREGATOR,
    AGGREGATOR_TO_UTILITY,
];

fn generator() -> SimResult<Schema> {
    Schema::new(vec![Field::float("capacity_kw"), Field::float("output_kw")])
}

fn stage() -> SimResult<Schema> {
    Schema::new(vec![
        Field::float("efficiency"),
        Field::float("input_kw"),
        Field::float("output_kw"),
    ])
}

fn prosumer() -> SimResult<Schema> {
    Schema::new(vec![
        Field::float("demand_kw"),
        Field::float("solar_capacity_kw"),
        Field::float("solar_kw"),
        Field::float("supplied_kw"),
        Field::float("net_kw"),
    ])
}

fn smart_meter() -> SimResult<Schema> {
    Schema::new(vec![Field::float("reading_kw"), Field::float("energy_kwh")])
}

fn collector(received: &str, dropped: &str) -> SimResult<Schema> {
    Schema::new(vec![
        Field::int(received),
        Field::int(dropped),
        Field::float("total_kw"),
    ])
}

fn power_link() -> SimResult<Schema> {
    Schema::new(vec![Field::float("share"), Field::float("flow_kw")])
}

fn telemetry_link() -> SimResult<Schema> {
    Schema::new(vec![Field::bool("delivered"), Field::float("payload_kw")])
}

/// Declares all ten component types and seven connection types on `topology`.
///
/// # Errors
///
/// Returns `InvalidParameter` if any of them is already declared.
pub fn declare_all(topology: &mut Topology) -> SimResult<()> {
    for kind in [POWER_PLANT, SOLAR_PANEL, WIND_TURBINE] {
        topology.declare_component_type(kind, generator()?)?;
    }
    for kind in [TRANSMITTER, SUBSTATION, DISTRIBUTOR] {
        topology.declare_component_type(kind, stage()?)?;
    }
    topology.declare_component_type(PROSUMER, prosumer()?)?;
    topology.declare_component_type(SMART_METER, smart_meter()?)?;
    topology.declare_component_type(AGGREGATOR, collector("readings_received", "readings_dropped")?)?;
    topology.declare_component_type(UTILITY, collector("reports_received", "reports_dropped")?)?;

    for kind in [
        GENERATOR_TO_TRANSMITTER,
        TRANSMITTER_TO_SUBSTATION,
        SUBSTATION_TO_DISTRIBUTOR,
        DISTRIBUTOR_TO_PROSUMER,
        PROSUMER_TO_SMART_METER,
    ] {
        topology.declare_connection_type(kind, power_link()?)?;
    }
    for kind in [SMART_METER_TO_AGGREGATOR, AGGREGATOR_TO_UTILITY] {
        topology.declare_connection_type(kind, telemetry_link()?)?;
    }
    Ok(())
}
