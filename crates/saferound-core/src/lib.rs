//! # SafeRound Core Library
//!
//! This library provides the core logic of SafeRound, a personal-safety
//! companion for a night out. The CLI drives everything through it; a mobile
//! front end would be a thin layer over the same calls.
//!
//! ## Architecture
//!
//! - **Tag**: Drink records on NFC tags. The bar writes one per drink; the
//!   patron scans it and the backend decides whether it may be served
//! - **API**: HTTP clients for drink validation, sobriety assessment and groups
//! - **Sobriety**: Steadiness, reaction and typing tests feeding one evidence
//!   bundle into a remote assessment
//! - **Check-in**: A dead-man's switch that escalates OK, DUE, LOCATE and hands
//!   off to a location app
//!
//! Everything time-dependent takes `now` explicitly; nothing reads the clock
//! on its own except the check-in driver, which asks an injected [`Clock`].
//!
//! ## Key Components
//!
//! - [`TagCodec`]: Drink record encode/decode with total fallback decoding
//! - [`ValidationClient`]: Pacing policy check, folded into a [`ValidationOutcome`]
//! - [`SobrietyPipeline`]: Linear test state machine
//! - [`CheckInMonitor`]: Check-in escalation state machine
//! - [`Config`]: Application configuration management

pub mod api;
pub mod checkin;
pub mod clock;
pub mod error;
pub mod events;
pub mod profile;
pub mod sobriety;
pub mod storage;
pub mod tag;

pub use api::{
    ApiClient, AssessmentClient, AssessmentService, DrinkValidator, GroupClient, JoinCode,
    ValidationClient, ValidationOutcome, ValidationReason,
};
pub use checkin::{CheckInHandle, CheckInLevel, CheckInMonitor, CheckInState, CheckInThresholds};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ApiError, ConfigError, CoreError, HardwareError, PipelineError, ValidationError};
pub use events::Event;
pub use profile::{UserId, UserProfile};
pub use sobriety::{PipelineStage, SobrietyAssessment, SobrietyPipeline};
pub use storage::Config;
pub use tag::{DecodedTag, DrinkEvent, ScanOutcome, TagCodec, TagHardware};
