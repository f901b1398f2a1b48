//! Group membership endpoints: create, join by code, list members.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use super::client::ApiClient;
use crate::error::{ApiError, ValidationError};
use crate::profile::UserId;

pub const JOIN_CODE_LEN: usize = 6;

/// A six-digit group join code, validated before it is ever sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct JoinCode(String);

impl JoinCode {
    /// Keep the digits of `input`, take the first six, require exactly six.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let digits: String = input
            .chars()
            .filter(char::is_ascii_digit)
            .take(JOIN_CODE_LEN)
            .collect();
        if digits.len() != JOIN_CODE_LEN {
            return Err(ValidationError::InvalidJoinCode {
                digits: digits.len(),
            });
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(deserialize_with = "string_or_number")]
    pub group_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Whatever else the server attaches (status, last seen, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Member {
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.user_id.clone()
        } else {
            name
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateGroupRequest<'a> {
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct JoinGroupRequest<'a> {
    code: &'a str,
    user_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct JoinGroupResponse {
    #[serde(deserialize_with = "string_or_number")]
    group_id: String,
}

#[derive(Debug, Deserialize)]
struct MembersResponse {
    #[serde(default)]
    members: Vec<Member>,
}

/// Client for the `/groups` endpoints.
#[derive(Debug, Clone)]
pub struct GroupClient {
    api: ApiClient,
}

impl GroupClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn create_group(&self, user: &UserId, name: Option<&str>) -> Result<Group, ApiError> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        let group: Group = self
            .api
            .post_json(
                "groups",
                &CreateGroupRequest {
                    user_id: user.as_str(),
                    name,
                },
            )
            .await?;
        info!(group_id = %group.group_id, "group created");
        Ok(group)
    }

    /// Returns the joined group's id.
    pub async fn join_group(&self, code: &JoinCode, user: &UserId) -> Result<String, ApiError> {
        let resp: JoinGroupResponse = self
            .api
            .post_json(
                "groups/join",
                &JoinGroupRequest {
                    code: code.as_str(),
                    user_id: user.as_str(),
                },
            )
            .await?;
        info!(group_id = %resp.group_id, "joined group");
        Ok(resp.group_id)
    }

    /// Create a group, then join it as its first member.
    pub async fn create_and_join(&self, user: &UserId, name: Option<&str>) -> Result<Group, ApiError> {
        let group = self.create_group(user, name).await?;
        let code = JoinCode::parse(&group.code).map_err(|e| {
            ApiError::Malformed(format!("server issued unusable join code '{}': {e}", group.code))
        })?;
        self.join_group(&code, user).await?;
        Ok(group)
    }

    pub async fn members(&self, group_id: &str) -> Result<Vec<Member>, ApiError> {
        let path = format!("groups/{}/members", urlencoding::encode(group_id));
        let resp: MembersResponse = self.api.get_json(&path).await?;
        Ok(resp.members)
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}
