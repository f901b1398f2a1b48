use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ValidationOutcome;
use crate::checkin::CheckInLevel;
use crate::sobriety::{PipelineStage, SobrietyAssessment};

/// Every observable state change produces an Event.
/// The CLI prints them as JSON; a UI would render them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Writer role stored a fresh drink record on a tag.
    TagWritten {
        drink_id: String,
        alcohol_grams: f64,
        at: DateTime<Utc>,
    },
    /// Reader role finished a scan.
    DrinkValidated {
        drink_id: String,
        degraded: bool,
        outcome: ValidationOutcome,
        at: DateTime<Utc>,
    },
    /// The scanned tag held nothing usable.
    TagEmpty { at: DateTime<Utc> },
    /// Tag session or read failed; the user should try again.
    ScanFailed { message: String, at: DateTime<Utc> },
    /// Pipeline moved into a new stage.
    SobrietyStageEntered {
        stage: PipelineStage,
        at: DateTime<Utc>,
    },
    /// User abandoned the pipeline; collected evidence was discarded.
    SobrietyCancelled {
        from_stage: PipelineStage,
        at: DateTime<Utc>,
    },
    /// Assessment received from the server.
    SobrietyScored {
        assessment: SobrietyAssessment,
        at: DateTime<Utc>,
    },
    /// Assessment could not be obtained; a synthetic result is shown.
    SobrietySubmissionFailed {
        assessment: SobrietyAssessment,
        at: DateTime<Utc>,
    },
    /// Explicit check-in: level back to OK.
    CheckedIn { at: DateTime<Utc> },
    /// Dead-man's switch escalated.
    CheckInLevelChanged {
        from: CheckInLevel,
        to: CheckInLevel,
        elapsed_secs: Option<i64>,
        at: DateTime<Utc>,
    },
    /// LOCATE reached and the external notification was attempted.
    LocateSignalled {
        delivered: bool,
        at: DateTime<Utc>,
    },
}
