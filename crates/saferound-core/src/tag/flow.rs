//! Reader and writer roles over a tag.
//!
//! The reader opens a session, reads, releases the session, decodes and
//! only then asks the validator, so the hardware is never held across the
//! network round trip.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{info, warn};

use super::codec::{DecodedTag, DrinkEvent, TagCodec};
use super::session::{TagHardware, TagSession};
use crate::api::{DrinkValidator, ValidationOutcome};
use crate::error::{HardwareError, Result};
use crate::events::Event;
use crate::profile::UserId;

pub const NO_DRINK_DATA_MESSAGE: &str = "No drink data on tag.";

/// Terminal result of one scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// The validator decided on the drink read from the tag.
    Validated {
        event: DrinkEvent,
        degraded: bool,
        outcome: ValidationOutcome,
    },
    /// Tag was blank; nothing was sent to the validator.
    NoDrinkData,
    /// Session or read failed; the user should try again.
    HardwareFailure { message: String },
}

impl ScanOutcome {
    pub fn to_event(&self, at: DateTime<Utc>) -> Event {
        match self {
            ScanOutcome::Validated {
                event,
                degraded,
                outcome,
            } => Event::DrinkValidated {
                drink_id: event.drink_id.clone(),
                degraded: *degraded,
                outcome: outcome.clone(),
                at,
            },
            ScanOutcome::NoDrinkData => Event::TagEmpty { at },
            ScanOutcome::HardwareFailure { message } => Event::ScanFailed {
                message: message.clone(),
                at,
            },
        }
    }
}

/// Read a tag and validate the drink on it for `user`.
pub async fn scan_and_validate<H, V>(
    hardware: &mut H,
    codec: &TagCodec,
    validator: &V,
    user: &UserId,
    now: DateTime<Utc>,
) -> ScanOutcome
where
    H: TagHardware,
    V: DrinkValidator,
{
    let raw = match read_tag(hardware).await {
        Ok(raw) => raw,
        Err(err) => {
            warn!(%err, "tag read failed");
            return ScanOutcome::HardwareFailure {
                message: format!("{err}. Try again."),
            };
        }
    };

    let (event, degraded) = match codec.decode_record(&raw, now) {
        DecodedTag::Structured(event) => (event, false),
        DecodedTag::Degraded(event) => (event, true),
        DecodedTag::NoData => {
            info!("scanned tag holds no drink data");
            return ScanOutcome::NoDrinkData;
        }
    };

    let outcome = validator.validate(&event, user).await;
    info!(
        drink_id = %event.drink_id,
        allowed = outcome.allowed,
        reason = %outcome.reason,
        "scan validated"
    );
    ScanOutcome::Validated {
        event,
        degraded,
        outcome,
    }
}

/// Issue a fresh drink record and write it to the tag.
pub async fn write_drink_tag<H, R>(
    hardware: &mut H,
    alcohol_grams: f64,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<DrinkEvent>
where
    H: TagHardware,
    R: Rng + ?Sized,
{
    let event = DrinkEvent::issue(alcohol_grams, now, rng)?;
    let payload = TagCodec::encode_record(&event)?;

    let mut session = TagSession::open(hardware).await?;
    session.write(&payload).await?;
    session.close();

    info!(drink_id = %event.drink_id, alcohol_grams, "drink tag written");
    Ok(event)
}

async fn read_tag<H: TagHardware>(hardware: &mut H) -> Result<Vec<u8>, HardwareError> {
    let mut session = TagSession::open(hardware).await?;
    let raw = session.read().await?;
    session.close();
    Ok(raw)
}
