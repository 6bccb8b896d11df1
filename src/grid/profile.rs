//! Generation profiles driving the reference generators.

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::schemas::{SOLAR_PANEL, WIND_TURBINE};

/// Half-sine daylight shape between sunrise and sunset, `0.0` at night.
///
/// Sunrise and sunset sit at 1/4 and 3/4 of the day.
pub fn daylight_frac(tick: u64, steps_per_day: u64) -> f64 {
    if steps_per_day == 0 {
        return 0.0;
    }
    let pos = (tick % steps_per_day) as f64 / steps_per_day as f64;
    let (sunrise, sunset) = (0.25, 0.75);
    if pos < sunrise || pos >= sunset {
        return 0.0;
    }
    (std::f64::consts::PI * (pos - sunrise) / (sunset - sunrise)).sin()
}

/// Fraction of rated capacity each generator kind delivers at a tick.
///
/// Plants run at capacity, solar follows [`daylight_frac`], wind draws a seeded
/// factor in `[0.2, 0.8)` per call.
#[derive(Debug, Clone)]
pub struct GenerationProfile {
    steps_per_day: u64,
    rng: StdRng,
}

impl GenerationProfile {
    pub fn new(steps_per_day: u64, seed: u64) -> Self {
        Self {
            steps_per_day,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn factor(&mut self, kind: &str, tick: u64) -> f64 {
        match kind {
            SOLAR_PANEL => daylight_frac(tick, self.steps_per_day),
            WIND_TURBINE => 0.2 + 0.6 * self.rng.random::<f64>(),
            _ => 1.0,
        }
    }

    pub fn steps_per_day(&self) -> u64 {
        self.steps_per_day
    }
}
