//! Student-to-route subscription models.

use serde::{Deserialize, Serialize};

/// Subscription lifecycle state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "cancelled" => Some(SubscriptionStatus::Cancelled),
            _ => None,
        }
    }
}

/// A student's enrollment link to a route.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub student_id: String,
    pub route_id: String,
    pub status: SubscriptionStatus,
    pub created_at: String,
}

/// Request body for enrolling a student in a route.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub route_id: String,
}

/// Query parameters for unenrolling.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnenrollQuery {
    pub student_id: String,
    pub route_id: String,
}

/// Student summary shown on a route's enrollment list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSubscriber {
    pub id: String,
    pub full_name: String,
    pub school: String,
    pub class: String,
    pub enrollment_number: String,
}
