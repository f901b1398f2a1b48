//! Evidence carried through the sobriety pipeline and the assessment wire types.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

pub const UNREACHABLE_RECOMMENDATION: &str = "Could not reach server.";

/// One accelerometer reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TypingMetrics {
    pub typo_count: usize,
    pub speed_wpm: f64,
    pub text_entered: String,
}

/// Everything measured so far in one pipeline run.
///
/// Owned by whichever stage is active and moved to the next one; consumed
/// by [`EvidenceBundle::into_request`].
#[derive(Debug, Clone, Default)]
pub struct EvidenceBundle {
    steadiness: VecDeque<SensorSample>,
    window: usize,
    reaction_latencies: Vec<u64>,
    typing: TypingMetrics,
}

impl EvidenceBundle {
    /// Empty bundle keeping at most `window` steadiness samples.
    pub fn new(window: usize) -> Self {
        Self {
            steadiness: VecDeque::with_capacity(window),
            window,
            reaction_latencies: Vec::new(),
            typing: TypingMetrics::default(),
        }
    }

    pub(crate) fn push_sample(&mut self, sample: SensorSample) {
        if self.window == 0 {
            return;
        }
        if self.steadiness.len() == self.window {
            self.steadiness.pop_front();
        }
        self.steadiness.push_back(sample);
    }

    pub(crate) fn set_reaction_latencies(&mut self, latencies: Vec<u64>) {
        self.reaction_latencies = latencies;
    }

    pub(crate) fn set_typing(&mut self, typing: TypingMetrics) {
        self.typing = typing;
    }

    pub fn steadiness(&self) -> impl ExactSizeIterator<Item = &SensorSample> {
        self.steadiness.iter()
    }

    pub fn reaction_latencies(&self) -> &[u64] {
        &self.reaction_latencies
    }

    pub fn typing(&self) -> &TypingMetrics {
        &self.typing
    }

    pub fn into_request(self) -> AssessmentRequest {
        AssessmentRequest {
            straight_line_jitter: self.steadiness.into(),
            reaction_latencies_ms: self.reaction_latencies,
            typing_test: self.typing,
        }
    }
}

/// Body of `POST /sobriety/assess`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRequest {
    pub straight_line_jitter: Vec<SensorSample>,
    pub reaction_latencies_ms: Vec<u64>,
    pub typing_test: TypingMetrics,
}

/// The remote verdict, or its synthetic stand-in when the server was unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SobrietyAssessment {
    pub score: u8,
    pub recommendation: String,
    pub is_emergency: bool,
}

impl SobrietyAssessment {
    pub fn unreachable() -> Self {
        Self {
            score: 0,
            recommendation: UNREACHABLE_RECOMMENDATION.to_string(),
            is_emergency: false,
        }
    }
}
