//! Stage 1: hold the phone steady while the accelerometer is sampled.

use chrono::{DateTime, Utc};

use super::evidence::{EvidenceBundle, SensorSample};
use super::sensor::SubscriptionGuard;

#[derive(Debug)]
pub struct SteadinessStage {
    pub(crate) bundle: EvidenceBundle,
    subscription: SubscriptionGuard,
    samples_received: u64,
    sample_period_ms: u64,
    duration_ms: u64,
    started_at: DateTime<Utc>,
}

impl SteadinessStage {
    pub(crate) fn new(
        bundle: EvidenceBundle,
        subscription: SubscriptionGuard,
        sample_period_ms: u64,
        duration_ms: u64,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            bundle,
            subscription,
            samples_received: 0,
            sample_period_ms,
            duration_ms,
            started_at,
        }
    }

    /// Store a sample. Returns `true` once the test duration is covered,
    /// at which point the sensor has already been released.
    pub(crate) fn record(&mut self, sample: SensorSample) -> bool {
        self.bundle.push_sample(sample);
        self.samples_received += 1;
        if self.is_complete() {
            self.subscription.release();
            return true;
        }
        false
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed_ms() >= self.duration_ms
    }

    /// Test time covered so far, measured in sample ticks.
    pub fn elapsed_ms(&self) -> u64 {
        self.samples_received.saturating_mul(self.sample_period_ms)
    }

    /// Whole seconds left, rounded up, for the countdown display.
    pub fn remaining_secs(&self) -> u64 {
        self.duration_ms.saturating_sub(self.elapsed_ms()).div_ceil(1000)
    }

    pub fn samples_received(&self) -> u64 {
        self.samples_received
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn sensor_active(&self) -> bool {
        self.subscription.is_active()
    }

    pub(crate) fn into_bundle(self) -> EvidenceBundle {
        self.bundle
    }
}
