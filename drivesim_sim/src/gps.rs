//! Noisy GPS fixes for exercising ambient location handling.
//!
//! Fixes scatter around a true position with Gaussian noise. The noise is
//! drawn from a seeded ChaCha8 stream, so the same seed always produces the
//! same fixes.

use drivesim_env::{Coordinate, LocationProvider};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Metres per degree of latitude (mean earth radius).
const METERS_PER_DEGREE: f64 = 111_195.0;

/// A finite burst of noisy fixes around `origin`.
///
/// Each subscription receives the next `count` fixes of the shared noise
/// stream and then ends.
pub struct NoisyLocationFeed {
    origin: Coordinate,
    count: usize,
    noise: Option<Normal<f64>>,
    rng: Mutex<ChaCha8Rng>,
}

impl NoisyLocationFeed {
    /// Creates a feed with `noise_meters` standard deviation per axis.
    ///
    /// A non-positive or non-finite deviation produces exact fixes.
    pub fn new(origin: Coordinate, noise_meters: f64, count: usize, seed: u64) -> Self {
        Self {
            origin,
            count,
            noise: Normal::new(0.0, noise_meters).ok().filter(|_| noise_meters > 0.0),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Draws the next fix.
    pub fn next_fix(&self) -> Coordinate {
        let Some(noise) = self.noise else {
            return self.origin;
        };
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        let north_m = noise.sample(&mut *rng);
        let east_m = noise.sample(&mut *rng);
        let lat_scale = self.origin.latitude.to_radians().cos().max(1e-6);

        Coordinate::new(
            self.origin.latitude + north_m / METERS_PER_DEGREE,
            self.origin.longitude + east_m / (METERS_PER_DEGREE * lat_scale),
        )
    }
}

impl LocationProvider for NoisyLocationFeed {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<Coordinate> {
        let (tx, rx) = mpsc::unbounded_channel();
        for _ in 0..self.count {
            let _ = tx.send(self.next_fix());
        }
        rx
    }
}
