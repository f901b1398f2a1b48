//! Stand-ins for the phone's NFC reader and accelerometer.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use saferound_core::error::HardwareError;
use saferound_core::sobriety::{MotionSensor, SensorSample, SensorSubscription};
use saferound_core::TagHardware;
use tracing::debug;

/// A tag emulated by a file holding its raw bytes.
///
/// Reading needs the file to exist; writing needs its directory to.
pub struct FileTag {
    path: PathBuf,
}

impl FileTag {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, err: std::io::Error) -> HardwareError {
        HardwareError::TagIo(format!("{}: {err}", self.path.display()))
    }
}

impl TagHardware for FileTag {
    async fn request_session(&mut self) -> Result<(), HardwareError> {
        let parent_exists = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.is_dir(),
            _ => true,
        };
        if !parent_exists {
            return Err(HardwareError::SessionUnavailable(format!(
                "no tag reader at {}",
                self.path.display()
            )));
        }
        debug!(path = %self.path.display(), "tag session opened");
        Ok(())
    }

    async fn read_payload(&mut self) -> Result<Vec<u8>, HardwareError> {
        std::fs::read(&self.path).map_err(|e| self.io_error(e))
    }

    async fn write_payload(&mut self, payload: &[u8]) -> Result<(), HardwareError> {
        std::fs::write(&self.path, payload).map_err(|e| self.io_error(e))
    }

    fn release_session(&mut self) {
        debug!(path = %self.path.display(), "tag session closed");
    }
}

pub struct SimulatedSubscription {
    active: Arc<AtomicBool>,
}

impl SensorSubscription for SimulatedSubscription {
    fn close(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        debug!("simulated accelerometer stopped");
    }
}

/// Accelerometer producing small random jitter around 1 g on the z axis.
pub struct SimulatedSensor {
    active: Arc<AtomicBool>,
    rng: StdRng,
    amplitude: f64,
}

impl SimulatedSensor {
    /// `amplitude` must be finite; a non-finite value yields a still sensor.
    pub fn new(seed: Option<u64>, amplitude: f64) -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
            rng: seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
            amplitude: if amplitude.is_finite() { amplitude.abs() } else { 0.0 },
        }
    }

    /// Next reading, or `None` when nobody is subscribed.
    pub fn sample(&mut self) -> Option<SensorSample> {
        if !self.active.load(Ordering::SeqCst) {
            return None;
        }
        let a = self.amplitude;
        Some(SensorSample {
            x: self.rng.gen_range(-a..=a),
            y: self.rng.gen_range(-a..=a),
            z: 1.0 + self.rng.gen_range(-a..=a),
        })
    }
}

impl MotionSensor for SimulatedSensor {
    type Subscription = SimulatedSubscription;

    fn subscribe(&mut self, period: Duration) -> Result<SimulatedSubscription, HardwareError> {
        debug!(period_ms = period.as_millis() as u64, "simulated accelerometer started");
        self.active.store(true, Ordering::SeqCst);
        Ok(SimulatedSubscription {
            active: self.active.clone(),
        })
    }
}
