use crate::error::{SimError, SimResult};

/// One scheduled instant: the integer tick and its simulated time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// `floor(time / timestep)`.
    pub index: u64,
    /// Simulated time, `index * timestep`.
    pub time: f64,
}

/// A fixed-step clock that yields `0, timestep, 2*timestep, ...` while strictly
/// below `duration`.
///
/// Time is derived from an integer counter rather than accumulated, so no tick
/// is skipped or repeated through floating-point drift.
///
/// # Examples
///
/// ```
/// use grid_sim::sim::clock::Clock;
///
/// let mut clock = Clock::new(10.0, 5.0).unwrap();
/// let mut times = Vec::new();
///
/// clock.run(|tick| times.push(tick.time));
/// assert_eq!(times, vec![0.0, 5.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Clock {
    /// Index of the next tick to hand out
    next: u64,
    /// Run length in simulated time units
    duration: f64,
    /// Step length in simulated time units
    timestep: f64,
}

impl Clock {
    /// Creates a clock for a run of `duration` split into `timestep` steps.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `timestep` is not a positive finite number
    /// or `duration` is negative or not finite.
    pub fn new(duration: f64, timestep: f64) -> SimResult<Self> {
        if !(timestep.is_finite() && timestep > 0.0) {
            return Err(SimError::invalid(
                "timestep",
                format!("must be a finite number > 0, got {timestep}"),
            ));
        }
        if !(duration.is_finite() && duration >= 0.0) {
            return Err(SimError::invalid(
                "duration",
                format!("must be a finite number >= 0, got {duration}"),
            ));
        }
        Ok(Self {
            next: 0,
            duration,
            timestep,
        })
    }

    /// Returns the next tick, or `None` once simulated time reaches `duration`.
    pub fn tick(&mut self) -> Option<Tick> {
        let time = self.next as f64 * self.timestep;
        if time < self.duration {
            let tick = Tick {
                index: self.next,
                time,
            };
            self.next += 1;
            Some(tick)
        } else {
            None
        }
    }

    /// Number of ticks the full run yields, `ceil(duration / timestep)`.
    pub fn total_ticks(&self) -> u64 {
        let mut counter = Self {
            next: 0,
            ..self.clone()
        };
        let mut count = 0;
        while counter.tick().is_some() {
            count += 1;
        }
        count
    }

    /// Runs `f` for each remaining tick.
    pub fn run(&mut self, mut f: impl FnMut(Tick)) {
        while let Some(tick) = self.tick() {
            f(tick);
        }
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}
