//! Lossy telemetry link between meters, aggregators and the utility.

use std::fmt;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::error::{SimError, SimResult};

/// A communication link with a fixed per-call success probability.
///
/// Every `transmit` and `receive` call is an independent Bernoulli trial;
/// a failed call drops the payload without logging, retrying or queueing it.
/// The random source is owned by the channel so outcomes are reproducible
/// under a fixed seed.
///
/// # Examples
///
/// ```
/// use grid_sim::channel::CommunicationChannel;
///
/// let mut link = CommunicationChannel::with_seed("Smart Grid Network", 1.0, 7).unwrap();
/// assert!(link.transmit("reading"));
/// assert_eq!(link.transmitted(), &["reading"]);
/// ```
#[derive(Debug, Clone)]
pub struct CommunicationChannel<T, R = StdRng> {
    name: String,
    reliability: f64,
    transmitted: Vec<T>,
    received: Vec<T>,
    rng: R,
}

impl<T> CommunicationChannel<T, StdRng> {
    /// Creates a channel whose random source is seeded with `seed`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `reliability` is outside `[0, 1]`.
    pub fn with_seed(name: impl Into<String>, reliability: f64, seed: u64) -> SimResult<Self> {
        Self::new(name, reliability, StdRng::seed_from_u64(seed))
    }
}

impl<T, R: Rng> CommunicationChannel<T, R> {
    /// Creates a channel drawing its outcomes from `rng`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `reliability` is outside `[0, 1]` or NaN.
    pub fn new(name: impl Into<String>, reliability: f64, rng: R) -> SimResult<Self> {
        if !(0.0..=1.0).contains(&reliability) {
            return Err(SimError::invalid(
                "reliability",
                format!("must be in [0, 1], got {reliability}"),
            ));
        }
        Ok(Self {
            name: name.into(),
            reliability,
            transmitted: Vec::new(),
            received: Vec::new(),
            rng,
        })
    }

    /// Attempts to transmit `data`; on success it is appended to the transmitted log.
    pub fn transmit(&mut self, data: T) -> bool {
        let delivered = self.trial();
        if delivered {
            self.transmitted.push(data);
        }
        delivered
    }

    /// Attempts to receive `data`; on success it is appended to the received log.
    ///
    /// Independent of any earlier `transmit` outcome for the same payload.
    pub fn receive(&mut self, data: T) -> bool {
        let delivered = self.trial();
        if delivered {
            self.received.push(data);
        }
        delivered
    }

    fn trial(&mut self) -> bool {
        // random::<f64>() samples [0, 1), so reliability 0.0 only passes on an exact 0.0 draw.
        let r: f64 = self.rng.random();
        r <= self.reliability && self.reliability > 0.0
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reliability(&self) -> f64 {
        self.reliability
    }

    /// Payloads accepted by `transmit`, in call order.
    pub fn transmitted(&self) -> &[T] {
        &self.transmitted
    }

    /// Payloads accepted by `receive`, in call order.
    pub fn received(&self) -> &[T] {
        &self.received
    }
}

impl<T, R> fmt::Display for CommunicationChannel<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Reliability: {}%, Transmitted Data Count: {}, Received Data Count: {})",
            self.name,
            self.reliability * 100.0,
            self.transmitted.len(),
            self.received.len()
        )
    }
}
