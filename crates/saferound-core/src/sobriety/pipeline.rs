//! Sobriety test pipeline.
//!
//! A linear state machine owned by one controller. Like the check-in
//! monitor it has no internal thread: the caller feeds sensor samples,
//! taps and keystrokes in, passing the current time with each.
//!
//! ## State Transitions
//!
//! ```text
//! NotStarted -> Steadiness -> Reaction -> Typing -> Submitted -> (Scored | SubmissionFailed)
//!      ^____________|____________|__________|__________|  (cancel: evidence discarded)
//! ```
//!
//! `Submitted` is only observable between [`SobrietyPipeline::submit`]
//! calls when a submission future was dropped before it resolved; cancel
//! and reset both recover from it.
//!
//! The evidence bundle lives inside the active stage and is moved into the
//! next one on every transition, so there is never more than one owner and
//! a cancel drops it along with the stage.

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use tracing::{debug, info, warn};

use super::evidence::{AssessmentRequest, EvidenceBundle, SensorSample, SobrietyAssessment};
use super::reaction::{ReactionStage, TargetPosition, Viewport};
use super::sensor::{MotionSensor, SubscriptionGuard};
use super::steadiness::SteadinessStage;
use super::typing::TypingStage;
use super::PipelineStage;
use crate::api::AssessmentService;
use crate::error::{ApiError, PipelineError};
use crate::events::Event;
use crate::storage::config::SobrietyConfig;

#[derive(Debug)]
pub enum PipelineState {
    NotStarted,
    Steadiness(SteadinessStage),
    Reaction(ReactionStage),
    Typing(TypingStage),
    /// Bundle handed to the assessment request; awaiting the result.
    Submitted,
    Scored(SobrietyAssessment),
    SubmissionFailed(SobrietyAssessment),
}

impl PipelineState {
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineState::NotStarted => PipelineStage::NotStarted,
            PipelineState::Steadiness(_) => PipelineStage::Steadiness,
            PipelineState::Reaction(_) => PipelineStage::Reaction,
            PipelineState::Typing(_) => PipelineStage::Typing,
            PipelineState::Submitted => PipelineStage::Submitted,
            PipelineState::Scored(_) => PipelineStage::Scored,
            PipelineState::SubmissionFailed(_) => PipelineStage::SubmissionFailed,
        }
    }
}

pub struct SobrietyPipeline {
    config: SobrietyConfig,
    state: PipelineState,
    rng: Pcg64,
}

impl SobrietyPipeline {
    pub fn new(config: SobrietyConfig) -> Self {
        Self {
            config,
            state: PipelineState::NotStarted,
            rng: Pcg64::from_entropy(),
        }
    }

    /// Deterministic target placement, for tests and replays.
    pub fn with_seed(config: SobrietyConfig, seed: u64) -> Self {
        Self {
            config,
            state: PipelineState::NotStarted,
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn stage(&self) -> PipelineStage {
        self.state.stage()
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn config(&self) -> &SobrietyConfig {
        &self.config
    }

    /// Where the reaction target currently is.
    pub fn target(&self) -> Option<TargetPosition> {
        match &self.state {
            PipelineState::Reaction(stage) => Some(stage.target()),
            _ => None,
        }
    }

    pub fn can_submit(&self) -> bool {
        matches!(&self.state, PipelineState::Typing(stage) if stage.can_submit())
    }

    /// Final assessment once scored or failed.
    pub fn result(&self) -> Option<&SobrietyAssessment> {
        match &self.state {
            PipelineState::Scored(a) | PipelineState::SubmissionFailed(a) => Some(a),
            _ => None,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a run: subscribe to the motion sensor and enter Steadiness.
    ///
    /// If the sensor refuses, the pipeline stays in `NotStarted`.
    pub fn start<S: MotionSensor>(
        &mut self,
        sensor: &mut S,
        now: DateTime<Utc>,
    ) -> Result<Event, PipelineError> {
        if !matches!(self.state, PipelineState::NotStarted) {
            return Err(invalid(&self.state, "start"));
        }

        let period = std::time::Duration::from_millis(self.config.sample_period_ms);
        let subscription = sensor.subscribe(period).map_err(|e| {
            warn!(%e, "motion sensor subscription failed");
            PipelineError::Hardware(e)
        })?;

        self.state = PipelineState::Steadiness(SteadinessStage::new(
            EvidenceBundle::new(self.config.steadiness_window),
            SubscriptionGuard::new(subscription),
            self.config.sample_period_ms,
            self.config.steadiness_duration_ms,
            now,
        ));
        Ok(self.entered(now))
    }

    /// Feed one accelerometer sample. Returns the stage-entered event when
    /// this sample completes the steadiness test.
    pub fn record_motion(
        &mut self,
        sample: SensorSample,
        now: DateTime<Utc>,
    ) -> Result<Option<Event>, PipelineError> {
        let completed = match &mut self.state {
            PipelineState::Steadiness(stage) => stage.record(sample),
            other => return Err(invalid(other, "record motion")),
        };
        if !completed {
            return Ok(None);
        }

        let PipelineState::Steadiness(stage) =
            std::mem::replace(&mut self.state, PipelineState::NotStarted)
        else {
            unreachable!("state checked above");
        };
        debug!(samples = stage.samples_received(), "steadiness complete");

        let viewport = self.viewport();
        let target = viewport.random_target(&mut self.rng);
        self.state = PipelineState::Reaction(ReactionStage::new(
            stage.into_bundle(),
            target,
            now,
            self.config.reaction_taps,
        ));
        Ok(Some(self.entered(now)))
    }

    /// Register a tap on the reaction target. Recording the latency and
    /// moving the target happen in this one call.
    pub fn acknowledge_target(&mut self, now: DateTime<Utc>) -> Result<Option<Event>, PipelineError> {
        let viewport = self.viewport();
        let next = viewport.random_target(&mut self.rng);
        let completed = match &mut self.state {
            PipelineState::Reaction(stage) => stage.acknowledge(now, next),
            other => return Err(invalid(other, "acknowledge target")),
        };
        if !completed {
            return Ok(None);
        }

        let PipelineState::Reaction(stage) =
            std::mem::replace(&mut self.state, PipelineState::NotStarted)
        else {
            unreachable!("state checked above");
        };
        debug!(latencies = ?stage.latencies(), "reaction complete");

        self.state = PipelineState::Typing(TypingStage::new(
            stage.into_bundle(),
            self.config.reference_sentence.clone(),
            now,
        ));
        Ok(Some(self.entered(now)))
    }

    /// Replace the transcribed text with the current input contents.
    pub fn set_typed_text(&mut self, text: &str) -> Result<(), PipelineError> {
        match &mut self.state {
            PipelineState::Typing(stage) => {
                stage.set_entered(text);
                Ok(())
            }
            other => Err(invalid(other, "type")),
        }
    }

    /// Close the typing stage and hand the whole bundle over for submission.
    pub fn begin_submission(&mut self, now: DateTime<Utc>) -> Result<AssessmentRequest, PipelineError> {
        match &self.state {
            PipelineState::Typing(stage) if !stage.can_submit() => {
                return Err(PipelineError::TypingIncomplete {
                    entered: stage.entered_chars(),
                    required: stage.required_chars(),
                });
            }
            PipelineState::Typing(_) => {}
            other => return Err(invalid(other, "submit")),
        }

        let PipelineState::Typing(stage) = std::mem::replace(&mut self.state, PipelineState::Submitted)
        else {
            unreachable!("state checked above");
        };
        Ok(stage.into_bundle(now).into_request())
    }

    /// Record the assessment call's result. Failures become the synthetic
    /// zero-score assessment; nothing is retried.
    pub fn complete_submission(
        &mut self,
        result: Result<SobrietyAssessment, ApiError>,
        now: DateTime<Utc>,
    ) -> Result<Event, PipelineError> {
        if !matches!(self.state, PipelineState::Submitted) {
            return Err(invalid(&self.state, "complete submission"));
        }
        let event = match result {
            Ok(assessment) => {
                info!(score = assessment.score, "sobriety pipeline scored");
                self.state = PipelineState::Scored(assessment.clone());
                Event::SobrietyScored { assessment, at: now }
            }
            Err(err) => {
                warn!(%err, "sobriety assessment failed");
                let assessment = SobrietyAssessment::unreachable();
                self.state = PipelineState::SubmissionFailed(assessment.clone());
                Event::SobrietySubmissionFailed { assessment, at: now }
            }
        };
        Ok(event)
    }

    /// Submit the completed bundle to `service` and record the result.
    pub async fn submit<A: AssessmentService>(
        &mut self,
        service: &A,
        now: DateTime<Utc>,
    ) -> Result<Event, PipelineError> {
        let request = self.begin_submission(now)?;
        let result = service.assess(&request).await;
        self.complete_submission(result, now)
    }

    /// Abandon the run from any test stage or a stranded submission. The
    /// bundle and any sensor subscription are dropped. Returns `None` when
    /// nothing was in flight.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let from_stage = self.stage();
        if !from_stage.is_active_test() && from_stage != PipelineStage::Submitted {
            return None;
        }
        self.state = PipelineState::NotStarted;
        info!(%from_stage, "sobriety pipeline cancelled");
        Some(Event::SobrietyCancelled { from_stage, at: now })
    }

    /// Clear a finished result, or a submission whose future was dropped,
    /// so another run can start.
    pub fn reset(&mut self) -> Result<(), PipelineError> {
        match self.state {
            PipelineState::NotStarted
            | PipelineState::Submitted
            | PipelineState::Scored(_)
            | PipelineState::SubmissionFailed(_) => {
                self.state = PipelineState::NotStarted;
                Ok(())
            }
            _ => Err(invalid(&self.state, "reset")),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn viewport(&self) -> Viewport {
        Viewport {
            width: self.config.viewport_width,
            height: self.config.viewport_height,
        }
    }

    fn entered(&self, now: DateTime<Utc>) -> Event {
        let stage = self.stage();
        debug!(?stage, "sobriety stage entered");
        Event::SobrietyStageEntered { stage, at: now }
    }
}

fn invalid(state: &PipelineState, action: &'static str) -> PipelineError {
    PipelineError::InvalidTransition {
        stage: state.stage().as_str(),
        action,
    }
}

impl std::fmt::Debug for SobrietyPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SobrietyPipeline")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HardwareError;
    use crate::sobriety::SensorSubscription;
    use chrono::Duration;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct FakeSubscription(Arc<AtomicBool>);

    impl SensorSubscription for FakeSubscription {
        fn close(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct FakeSensor {
        closed: Arc<AtomicBool>,
        refuse: bool,
    }

    impl MotionSensor for FakeSensor {
        type Subscription = FakeSubscription;

        fn subscribe(&mut self, _period: std::time::Duration) -> Result<FakeSubscription, HardwareError> {
            if self.refuse {
                return Err(HardwareError::SensorUnavailable("permission denied".into()));
            }
            Ok(FakeSubscription(self.closed.clone()))
        }
    }

    fn small_config() -> SobrietyConfig {
        SobrietyConfig {
            steadiness_duration_ms: 500,
            reference_sentence: "abc".into(),
            ..SobrietyConfig::default()
        }
    }

    fn sample() -> SensorSample {
        SensorSample {
            x: 0.01,
            y: -0.02,
            z: 0.98,
        }
    }

    #[test]
    fn steadiness_completes_after_duration_and_releases_sensor() {
        let mut sensor = FakeSensor::default();
        let mut pipeline = SobrietyPipeline::with_seed(small_config(), 3);
        let t0 = Utc::now();
        pipeline.start(&mut sensor, t0).unwrap();

        for i in 0..4 {
            assert!(pipeline.record_motion(sample(), t0 + Duration::milliseconds(i * 100)).unwrap().is_none());
        }
        assert!(!sensor.closed.load(Ordering::SeqCst));

        let event = pipeline.record_motion(sample(), t0 + Duration::milliseconds(500)).unwrap();
        assert!(matches!(
            event,
            Some(Event::SobrietyStageEntered { stage: PipelineStage::Reaction, .. })
        ));
        assert!(sensor.closed.load(Ordering::SeqCst));
        assert!(pipeline.target().is_some());
    }

    #[test]
    fn refused_sensor_keeps_not_started() {
        let mut sensor = FakeSensor {
            refuse: true,
            ..FakeSensor::default()
        };
        let mut pipeline = SobrietyPipeline::new(small_config());
        let err = pipeline.start(&mut sensor, Utc::now()).unwrap_err();
        assert!(matches!(err, PipelineError::Hardware(_)));
        assert_eq!(pipeline.stage(), PipelineStage::NotStarted);
    }

    #[test]
    fn out_of_order_operations_are_rejected() {
        let mut pipeline = SobrietyPipeline::new(small_config());
        let now = Utc::now();
        assert!(matches!(
            pipeline.acknowledge_target(now),
            Err(PipelineError::InvalidTransition { stage: "not_started", .. })
        ));
        assert!(pipeline.record_motion(sample(), now).is_err());
        assert!(pipeline.set_typed_text("x").is_err());
        assert!(pipeline.begin_submission(now).is_err());
        assert!(pipeline.cancel(now).is_none());
        assert_eq!(pipeline.stage(), PipelineStage::NotStarted);
    }

    #[test]
    fn cancel_mid_reaction_discards_everything() {
        let mut sensor = FakeSensor::default();
        let mut pipeline = SobrietyPipeline::with_seed(small_config(), 9);
        let t0 = Utc::now();
        pipeline.start(&mut sensor, t0).unwrap();
        for _ in 0..5 {
            pipeline.record_motion(sample(), t0).unwrap();
        }
        pipeline.acknowledge_target(t0 + Duration::seconds(1)).unwrap();

        let event = pipeline.cancel(t0 + Duration::seconds(2));
        assert!(matches!(
            event,
            Some(Event::SobrietyCancelled { from_stage: PipelineStage::Reaction, .. })
        ));
        assert_eq!(pipeline.stage(), PipelineStage::NotStarted);
        assert!(pipeline.target().is_none());
    }

    #[test]
    fn typing_gate_blocks_short_input() {
        let mut sensor = FakeSensor::default();
        let mut pipeline = SobrietyPipeline::with_seed(small_config(), 1);
        let t0 = Utc::now();
        pipeline.start(&mut sensor, t0).unwrap();
        for _ in 0..5 {
            pipeline.record_motion(sample(), t0).unwrap();
        }
        for i in 0..5 {
            pipeline.acknowledge_target(t0 + Duration::milliseconds(300 * i)).unwrap();
        }
        assert_eq!(pipeline.stage(), PipelineStage::Typing);

        pipeline.set_typed_text("ab").unwrap();
        assert!(!pipeline.can_submit());
        assert!(matches!(
            pipeline.begin_submission(t0),
            Err(PipelineError::TypingIncomplete { entered: 2, required: 3 })
        ));

        pipeline.set_typed_text("abd").unwrap();
        assert!(pipeline.can_submit());
        let request = pipeline.begin_submission(t0 + Duration::seconds(3)).unwrap();
        assert_eq!(request.reaction_latencies_ms, vec![300, 300, 300, 300]);
        assert_eq!(request.typing_test.typo_count, 1);
        assert_eq!(request.straight_line_jitter.len(), 5);
        assert_eq!(pipeline.stage(), PipelineStage::Submitted);
    }

    struct NeverAnswers;

    impl AssessmentService for NeverAnswers {
        async fn assess(&self, _request: &AssessmentRequest) -> Result<SobrietyAssessment, ApiError> {
            std::future::pending().await
        }
    }

    fn ready_to_submit(sensor: &mut FakeSensor) -> SobrietyPipeline {
        let mut pipeline = SobrietyPipeline::with_seed(small_config(), 5);
        let t0 = Utc::now();
        pipeline.start(sensor, t0).unwrap();
        for _ in 0..5 {
            pipeline.record_motion(sample(), t0).unwrap();
        }
        for i in 0..5 {
            pipeline.acknowledge_target(t0 + Duration::milliseconds(250 * i)).unwrap();
        }
        pipeline.set_typed_text("abc").unwrap();
        pipeline
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_submission_can_be_cancelled() {
        let mut sensor = FakeSensor::default();
        let mut pipeline = ready_to_submit(&mut sensor);

        let timed_out = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            pipeline.submit(&NeverAnswers, Utc::now()),
        )
        .await;
        assert!(timed_out.is_err());
        assert_eq!(pipeline.stage(), PipelineStage::Submitted);

        let event = pipeline.cancel(Utc::now());
        assert!(matches!(
            event,
            Some(Event::SobrietyCancelled { from_stage: PipelineStage::Submitted, .. })
        ));
        assert_eq!(pipeline.stage(), PipelineStage::NotStarted);
        assert!(pipeline.start(&mut sensor, Utc::now()).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_submission_can_be_reset() {
        let mut sensor = FakeSensor::default();
        let mut pipeline = ready_to_submit(&mut sensor);

        let _ = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            pipeline.submit(&NeverAnswers, Utc::now()),
        )
        .await;
        pipeline.reset().unwrap();
        assert_eq!(pipeline.stage(), PipelineStage::NotStarted);
        assert!(pipeline.result().is_none());
    }

    #[test]
    fn reset_only_from_terminal_states() {
        let mut pipeline = SobrietyPipeline::new(small_config());
        let mut sensor = FakeSensor::default();
        pipeline.start(&mut sensor, Utc::now()).unwrap();
        assert!(pipeline.reset().is_err());
    }
}
