//! `POST /sobriety/assess` -- scores a completed evidence bundle.

use serde::Deserialize;
use tracing::info;

use super::client::ApiClient;
use super::traits::AssessmentService;
use crate::error::ApiError;
use crate::sobriety::{AssessmentRequest, SobrietyAssessment};

#[derive(Debug, Deserialize)]
struct AssessResponse {
    #[serde(default)]
    sobriety_score: Option<f64>,
    #[serde(default)]
    recommendation: Option<String>,
    #[serde(default)]
    is_emergency: Option<bool>,
}

impl From<AssessResponse> for SobrietyAssessment {
    fn from(resp: AssessResponse) -> Self {
        let score = resp
            .sobriety_score
            .filter(|s| s.is_finite())
            .map(|s| s.round().clamp(0.0, 100.0) as u8)
            .unwrap_or(0);
        SobrietyAssessment {
            score,
            recommendation: resp.recommendation.unwrap_or_default(),
            is_emergency: resp.is_emergency.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssessmentClient {
    api: ApiClient,
}

impl AssessmentClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl AssessmentService for AssessmentClient {
    async fn assess(&self, request: &AssessmentRequest) -> Result<SobrietyAssessment, ApiError> {
        let resp: AssessResponse = self.api.post_json("sobriety/assess", request).await?;
        let assessment = SobrietyAssessment::from(resp);
        info!(
            score = assessment.score,
            is_emergency = assessment.is_emergency,
            "sobriety assessed"
        );
        Ok(assessment)
    }
}
