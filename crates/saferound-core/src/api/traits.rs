use crate::error::ApiError;
use crate::profile::UserId;
use crate::sobriety::{AssessmentRequest, SobrietyAssessment};
use crate::tag::DrinkEvent;

use super::validation::ValidationOutcome;

/// The pacing-policy collaborator consulted on every scan.
///
/// Implementations must be total: every call resolves to exactly one
/// outcome, failures included.
#[allow(async_fn_in_trait)]
pub trait DrinkValidator {
    async fn validate(&self, event: &DrinkEvent, user: &UserId) -> ValidationOutcome;
}

/// The remote scorer for a completed evidence bundle.
#[allow(async_fn_in_trait)]
pub trait AssessmentService {
    async fn assess(&self, request: &AssessmentRequest) -> Result<SobrietyAssessment, ApiError>;
}
