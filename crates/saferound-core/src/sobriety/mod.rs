//! Three-stage sobriety test: steadiness, reaction, typing, then a remote
//! assessment of the collected evidence.

pub mod evidence;
pub mod pipeline;
pub mod reaction;
pub mod sensor;
pub mod steadiness;
pub mod typing;

use serde::{Deserialize, Serialize};

pub use evidence::{
    AssessmentRequest, EvidenceBundle, SensorSample, SobrietyAssessment, TypingMetrics,
    UNREACHABLE_RECOMMENDATION,
};
pub use pipeline::{PipelineState, SobrietyPipeline};
pub use reaction::{TargetPosition, Viewport};
pub use sensor::{MotionSensor, SensorSubscription, SubscriptionGuard};
pub use typing::{speed_wpm, typo_count};

/// Where a pipeline run currently is, without the stage's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    NotStarted,
    Steadiness,
    Reaction,
    Typing,
    Submitted,
    Scored,
    SubmissionFailed,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::NotStarted => "not_started",
            PipelineStage::Steadiness => "steadiness",
            PipelineStage::Reaction => "reaction",
            PipelineStage::Typing => "typing",
            PipelineStage::Submitted => "submitted",
            PipelineStage::Scored => "scored",
            PipelineStage::SubmissionFailed => "submission_failed",
        }
    }

    /// Stages the user can cancel out of.
    pub fn is_active_test(self) -> bool {
        matches!(
            self,
            PipelineStage::Steadiness | PipelineStage::Reaction | PipelineStage::Typing
        )
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
