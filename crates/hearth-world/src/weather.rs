//! Seeded weather drift.
//!
//! Weather changes slowly over ticks, deterministically for a given seed.
//! The observer's `set_weather` command always wins over drift. Drift is
//! the only randomness the engine consults after initialisation, and it
//! never touches action resolution.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use hearth_types::Weather;

/// Deterministic weather generator.
#[derive(Debug, Clone)]
pub struct WeatherSystem {
    rng: StdRng,
    drift_interval: u64,
}

impl WeatherSystem {
    /// A system that considers drifting every `drift_interval` ticks.
    /// An interval of zero disables drift entirely.
    pub fn new(seed: u64, drift_interval: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            drift_interval,
        }
    }

    /// The weather for `tick`, or `None` when nothing changes. Only ticks
    /// on the drift interval may change the weather, and a drift that
    /// lands on the current weather is reported as no change.
    pub fn drift(&mut self, tick: u64, current: Weather) -> Option<Weather> {
        if self.drift_interval == 0 || tick == 0 || tick % self.drift_interval != 0 {
            return None;
        }
        let next = match self.rng.random_range(0..4u8) {
            0 => Weather::Clear,
            1 => Weather::Cloudy,
            2 => Weather::Rainy,
            _ => Weather::Foggy,
        };
        if next == current { None } else { Some(next) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_never_drifts() {
        let mut system = WeatherSystem::new(1, 0);
        for tick in 0..50 {
            assert_eq!(system.drift(tick, Weather::Clear), None);
        }
    }

    #[test]
    fn drift_only_on_interval_ticks() {
        let mut system = WeatherSystem::new(1, 10);
        assert_eq!(system.drift(3, Weather::Clear), None);
        assert_eq!(system.drift(11, Weather::Clear), None);
        // Tick 10 may or may not change the weather, but the sequence is
        // deterministic for the seed.
        let mut a = WeatherSystem::new(7, 10);
        let mut b = WeatherSystem::new(7, 10);
        for tick in 0..100 {
            assert_eq!(a.drift(tick, Weather::Clear), b.drift(tick, Weather::Clear));
        }
    }
}
