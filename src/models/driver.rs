//! Driver account models.

use serde::{Deserialize, Serialize};

/// A registered bus driver.
///
/// `route_ref` is a weak reference: it carries the assigned route's *name*
/// as a lookup key, not an enforced foreign key. Renaming a route breaks
/// the association; fixing that is a schema migration, not handled here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: String,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_expiry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bus_plate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bus_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_ref: Option<String>,
    pub profile_id: String,
    pub active: bool,
    pub created_at: String,
}

/// Request body for registering a driver.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDriverRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Optional; falls back to a default onboarding password when absent
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub license_expiry: Option<String>,
    #[serde(default)]
    pub bus_plate: Option<String>,
    #[serde(default)]
    pub bus_model: Option<String>,
    #[serde(default)]
    pub route_ref: Option<String>,
}

/// Request body for a partial driver update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDriverRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Re-hashed when present; current hash kept otherwise
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub license_expiry: Option<String>,
    #[serde(default)]
    pub bus_plate: Option<String>,
    #[serde(default)]
    pub bus_model: Option<String>,
    #[serde(default)]
    pub route_ref: Option<String>,
    /// Flips the linked profile's active flag
    #[serde(default)]
    pub active: Option<bool>,
}
