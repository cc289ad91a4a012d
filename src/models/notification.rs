//! Notification dispatch models.
//!
//! A *send* is one broadcast request and its metadata; a *delivery* is one
//! recipient's materialized inbox entry for it.

use serde::{Deserialize, Serialize};

use super::Role;

/// Coarse recipient category before filter narrowing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AudienceType {
    All,
    Students,
    Drivers,
}

impl AudienceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudienceType::All => "all",
            AudienceType::Students => "students",
            AudienceType::Drivers => "drivers",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "all" => Some(AudienceType::All),
            "students" => Some(AudienceType::Students),
            "drivers" => Some(AudienceType::Drivers),
            _ => None,
        }
    }
}

/// Broadcast priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "normal" => Some(Priority::Normal),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

fn default_kind() -> String {
    "notice".to_string()
}

fn default_sender_role() -> Role {
    Role::Admin
}

/// Request body for dispatching a broadcast.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    #[serde(default = "default_sender_role")]
    pub sender_role: Role,
    #[serde(default)]
    pub sender_id: Option<String>,
    pub audience_type: AudienceType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Optional narrowing to specific route ids
    #[serde(default)]
    pub routes: Vec<String>,
    /// Optional narrowing to specific driver ids
    #[serde(default)]
    pub drivers: Vec<String>,
}

/// Outcome of a dispatch: the persisted send and its audience size.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReceipt {
    pub send_id: String,
    pub recipient_count: usize,
}

/// One row in a profile's inbox.
///
/// Every send is listed; `delivery_id` is absent when this profile's
/// delivery row has not materialized, with `kind`/`read` defaulted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<String>,
    pub send_id: String,
    pub title: String,
    pub message: String,
    pub sender_role: Role,
    pub audience_type: AudienceType,
    pub priority: Priority,
    pub kind: String,
    pub read: bool,
    pub created_at: String,
}

/// One send in the broadcast history, with delivery aggregates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSummary {
    pub id: String,
    pub sender_role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    pub audience_type: AudienceType,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub routes: Vec<String>,
    pub drivers: Vec<String>,
    pub total_recipients: i64,
    pub read_count: i64,
    pub created_at: String,
}

/// Query parameters for the history listing.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: i64,
}

fn default_history_limit() -> i64 {
    50
}
