//! Drink validation against the remote pacing policy.
//!
//! `POST /validate-drink` decides whether the drink on a scanned tag may be
//! served. The mapping to [`ValidationOutcome`] is total: an allowed drink,
//! a denial carrying the server's reason code verbatim, or a client-side
//! `ERROR` for anything that went wrong on the way.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{info, warn};

use super::client::ApiClient;
use super::traits::DrinkValidator;
use crate::profile::UserId;
use crate::tag::DrinkEvent;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error.";
pub const UNEXPECTED_RESPONSE_MESSAGE: &str = "Unexpected response from server.";

/// Why a drink was (not) allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    None,
    /// Pacing violation: wait before the next drink.
    Cooldown,
    /// Cut off for the rest of the session.
    ServiceDenied,
    /// Client-side failure; the server never decided.
    Error,
    /// Any other code the server sent, kept as-is.
    Other(String),
}

impl ValidationReason {
    pub fn from_code(code: &str) -> Self {
        match code {
            "NONE" => Self::None,
            "COOLDOWN" => Self::Cooldown,
            "SERVICE_DENIED" => Self::ServiceDenied,
            "ERROR" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::None => "NONE",
            Self::Cooldown => "COOLDOWN",
            Self::ServiceDenied => "SERVICE_DENIED",
            Self::Error => "ERROR",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for ValidationReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for ValidationReason {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Self::from_code(&code))
    }
}

/// Terminal result of one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub allowed: bool,
    pub reason: ValidationReason,
    pub message: String,
}

impl ValidationOutcome {
    pub fn accepted(message: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: ValidationReason::None,
            message: message.into(),
        }
    }

    pub fn denied(reason: ValidationReason, message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::denied(ValidationReason::Error, message)
    }

    /// How a refusal must be presented; `None` for an accepted drink.
    pub fn rejection_notice(&self) -> Option<RejectionNotice> {
        if self.allowed {
            return None;
        }
        let (headline, detail) = match &self.reason {
            ValidationReason::ServiceDenied => ("SERVICE DENIED", "You are cut off.".to_string()),
            ValidationReason::Error => ("TRY AGAIN", self.message.clone()),
            _ => ("REJECTED", "Wait 2 minutes between drinks.".to_string()),
        };
        Some(RejectionNotice {
            headline: headline.to_string(),
            detail,
            requires_acknowledgement: true,
        })
    }
}

/// Escalated presentation of a denied drink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionNotice {
    pub headline: String,
    pub detail: String,
    pub requires_acknowledgement: bool,
}

#[derive(Debug, Serialize)]
struct ValidateDrinkRequest<'a> {
    drink_id: &'a str,
    user_id: &'a str,
    alcohol_grams: f64,
}

#[derive(Debug, Deserialize)]
struct ValidateDrinkResponse {
    allowed: bool,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for `POST /validate-drink`.
#[derive(Debug, Clone)]
pub struct ValidationClient {
    api: ApiClient,
}

impl ValidationClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn map_response(resp: ValidateDrinkResponse) -> ValidationOutcome {
        let message = resp.message.unwrap_or_default();
        if resp.allowed {
            return ValidationOutcome::accepted(message);
        }
        match resp.reason.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                ValidationOutcome::denied(ValidationReason::from_code(code), message)
            }
            _ => ValidationOutcome::error(UNEXPECTED_RESPONSE_MESSAGE),
        }
    }
}

impl DrinkValidator for ValidationClient {
    async fn validate(&self, event: &DrinkEvent, user: &UserId) -> ValidationOutcome {
        let body = ValidateDrinkRequest {
            drink_id: &event.drink_id,
            user_id: user.as_str(),
            alcohol_grams: event.alcohol_grams,
        };

        let outcome = match self
            .api
            .post_json::<_, ValidateDrinkResponse>("validate-drink", &body)
            .await
        {
            Ok(resp) => Self::map_response(resp),
            Err(err) => {
                warn!(drink_id = %event.drink_id, %err, "drink validation failed");
                ValidationOutcome::error(NETWORK_ERROR_MESSAGE)
            }
        };

        info!(
            drink_id = %event.drink_id,
            allowed = outcome.allowed,
            reason = %outcome.reason,
            "drink validated"
        );
        outcome
    }
}
