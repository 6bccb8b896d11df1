//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run timing, output location and seed.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Telemetry link parameters.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Component counts and ratings.
    #[serde(default)]
    pub grid: GridConfig,
}

/// Run timing, output location and seed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Simulated run length (must be >= 0).
    pub duration: f64,
    /// Step length in the same unit as `duration` (must be > 0).
    pub timestep: f64,
    /// Directory receiving `simlog.txt` and the per-type CSV sinks.
    pub output_dir: PathBuf,
    /// Master random seed.
    pub seed: u64,
    /// Ticks per simulated day, used by the solar profile (must be > 0).
    pub steps_per_day: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration: 24.0,
            timestep: 1.0,
            output_dir: PathBuf::from("output"),
            seed: 42,
            steps_per_day: 24,
        }
    }
}

/// Telemetry link parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Link name shown in summaries.
    pub name: String,
    /// Success probability of the meter to aggregator link, in [0, 1].
    pub reliability: f64,
    /// Success probability of the aggregator to utility link, in [0, 1].
    pub utility_reliability: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "Smart Grid Network".to_string(),
            reliability: 0.99,
            utility_reliability: 0.99,
        }
    }
}

/// Component counts and ratings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    pub power_plants: usize,
    pub solar_panels: usize,
    pub wind_turbines: usize,
    pub transmitters: usize,
    pub substations: usize,
    pub distributors: usize,
    /// Prosumers; each gets its own smart meter.
    pub prosumers: usize,
    pub aggregators: usize,
    /// Power plant rating (kW).
    pub plant_capacity_kw: f64,
    /// Utility-scale solar rating (kW).
    pub solar_capacity_kw: f64,
    /// Wind turbine rating (kW).
    pub wind_capacity_kw: f64,
    /// Efficiency of each transmission and distribution stage, in (0, 1].
    pub line_efficiency: f64,
    /// Prosumer demand (kW).
    pub prosumer_demand_kw: f64,
    /// Prosumer rooftop solar rating (kW).
    pub prosumer_solar_kw: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            power_plants: 1,
            solar_panels: 1,
            wind_turbines: 1,
            transmitters: 1,
            substations: 2,
            distributors: 2,
            prosumers: 4,
            aggregators: 1,
            plant_capacity_kw: 50.0,
            solar_capacity_kw: 20.0,
            wind_capacity_kw: 15.0,
            line_efficiency: 0.97,
            prosumer_demand_kw: 3.0,
            prosumer_solar_kw: 2.0,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"network.reliability"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the lossy-network preset: same grid, unreliable telemetry links.
    pub fn lossy_network() -> Self {
        Self {
            network: NetworkConfig {
                reliability: 0.7,
                utility_reliability: 0.85,
                ..NetworkConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the large-grid preset: more stages and prosumers over two days.
    pub fn large_grid() -> Self {
        Self {
            simulation: SimulationConfig {
                duration: 48.0,
                ..SimulationConfig::default()
            },
            network: NetworkConfig::default(),
            grid: GridConfig {
                power_plants: 2,
                solar_panels: 3,
                wind_turbines: 4,
                transmitters: 2,
                substations: 4,
                distributors: 8,
                prosumers: 40,
                aggregators: 4,
                plant_capacity_kw: 120.0,
                ..GridConfig::default()
            },
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "lossy_network", "large_grid"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "lossy_network" => Ok(Self::lossy_network()),
            "large_grid" => Ok(Self::large_grid()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if !(s.timestep.is_finite() && s.timestep > 0.0) {
            errors.push(ConfigError::new("simulation.timestep", "must be > 0"));
        }
        if !(s.duration.is_finite() && s.duration >= 0.0) {
            errors.push(ConfigError::new("simulation.duration", "must be >= 0"));
        }
        if s.steps_per_day == 0 {
            errors.push(ConfigError::new("simulation.steps_per_day", "must be > 0"));
        }

        let n = &self.network;
        if !(0.0..=1.0).contains(&n.reliability) {
            errors.push(ConfigError::new("network.reliability", "must be in [0.0, 1.0]"));
        }
        if !(0.0..=1.0).contains(&n.utility_reliability) {
            errors.push(ConfigError::new(
                "network.utility_reliability",
                "must be in [0.0, 1.0]",
            ));
        }

        let g = &self.grid;
        let counts = [
            ("grid.transmitters", g.transmitters),
            ("grid.substations", g.substations),
            ("grid.distributors", g.distributors),
            ("grid.prosumers", g.prosumers),
            ("grid.aggregators", g.aggregators),
        ];
        for (field, count) in counts {
            if count == 0 {
                errors.push(ConfigError::new(field, "must be > 0"));
            }
        }
        if g.power_plants + g.solar_panels + g.wind_turbines == 0 {
            errors.push(ConfigError::new(
                "grid.power_plants",
                "at least one generator of any kind is required",
            ));
        }
        if !(g.line_efficiency > 0.0 && g.line_efficiency <= 1.0) {
            errors.push(ConfigError::new("grid.line_efficiency", "must be in (0.0, 1.0]"));
        }
        let ratings = [
            ("grid.plant_capacity_kw", g.plant_capacity_kw),
            ("grid.solar_capacity_kw", g.solar_capacity_kw),
            ("grid.wind_capacity_kw", g.wind_capacity_kw),
            ("grid.prosumer_demand_kw", g.prosumer_demand_kw),
            ("grid.prosumer_solar_kw", g.prosumer_solar_kw),
        ];
        for (field, rating) in ratings {
            if !(rating.is_finite() && rating >= 0.0) {
                errors.push(ConfigError::new(field, "must be >= 0"));
            }
        }

        errors
    }
}
