//! Stage 2: tap a target that jumps to a new spot after every tap.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::evidence::EvidenceBundle;

// Keeps the target clear of the screen edges and the header/footer chrome.
const MARGIN_X: f64 = 40.0;
const INSET_X: f64 = 120.0;
const MARGIN_Y: f64 = 120.0;
const INSET_Y: f64 = 280.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetPosition {
    pub x: f64,
    pub y: f64,
}

impl Viewport {
    pub fn random_target<R: Rng + ?Sized>(&self, rng: &mut R) -> TargetPosition {
        TargetPosition {
            x: MARGIN_X + rng.gen::<f64>() * (self.width - INSET_X).max(0.0),
            y: MARGIN_Y + rng.gen::<f64>() * (self.height - INSET_Y).max(0.0),
        }
    }
}

#[derive(Debug)]
pub struct ReactionStage {
    pub(crate) bundle: EvidenceBundle,
    target: TargetPosition,
    presented_at: DateTime<Utc>,
    acknowledgements: usize,
    required: usize,
    latencies: Vec<u64>,
}

impl ReactionStage {
    pub(crate) fn new(
        bundle: EvidenceBundle,
        target: TargetPosition,
        presented_at: DateTime<Utc>,
        required: usize,
    ) -> Self {
        Self {
            bundle,
            target,
            presented_at,
            acknowledgements: 0,
            required,
            latencies: Vec::with_capacity(required.saturating_sub(1)),
        }
    }

    /// Register a tap at `now` and move the target to `next`.
    ///
    /// The first tap has nothing to be measured against; every later tap
    /// records the time since the previous one. Returns `true` when the
    /// required number of taps is reached.
    pub(crate) fn acknowledge(&mut self, now: DateTime<Utc>, next: TargetPosition) -> bool {
        if self.acknowledgements > 0 {
            let latency = (now - self.presented_at).num_milliseconds().max(0) as u64;
            self.latencies.push(latency);
        }
        self.acknowledgements += 1;
        self.presented_at = now;
        self.target = next;
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.acknowledgements >= self.required
    }

    pub fn target(&self) -> TargetPosition {
        self.target
    }

    pub fn acknowledgements(&self) -> usize {
        self.acknowledgements
    }

    pub fn remaining(&self) -> usize {
        self.required.saturating_sub(self.acknowledgements)
    }

    pub fn latencies(&self) -> &[u64] {
        &self.latencies
    }

    pub(crate) fn into_bundle(self) -> EvidenceBundle {
        let mut bundle = self.bundle;
        bundle.set_reaction_latencies(self.latencies);
        bundle
    }
}
