//! The local user, passed explicitly to every flow that needs an identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::storage::config::ProfileConfig;

pub const MAX_EMERGENCY_CONTACTS: usize = 2;

/// Opaque user identifier as known by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "user_id".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub emergency_contacts: Vec<String>,
}

impl UserProfile {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            first_name: None,
            last_name: None,
            phone: None,
            emergency_contacts: Vec::new(),
        }
    }

    pub fn from_config(config: &ProfileConfig) -> Result<Self, ValidationError> {
        if config.emergency_contacts.len() > MAX_EMERGENCY_CONTACTS {
            return Err(ValidationError::TooMany {
                collection: "emergency contacts".into(),
                len: config.emergency_contacts.len(),
                max: MAX_EMERGENCY_CONTACTS,
            });
        }
        Ok(Self {
            user_id: UserId::new(config.user_id.clone())?,
            first_name: non_blank(&config.first_name),
            last_name: non_blank(&config.last_name),
            phone: non_blank(&config.phone),
            emergency_contacts: config
                .emergency_contacts
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        })
    }

    /// "First Last", whichever parts are known, or "Me".
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            "Me".to_string()
        } else {
            name
        }
    }

    pub fn primary_contact(&self) -> Option<&str> {
        self.emergency_contacts.first().map(String::as_str)
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
