//! Per-account calendar metadata.

use serde::{Deserialize, Serialize};

/// Colour pair attached to a calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarColor {
    pub background: String,
    pub foreground: String,
}

/// Persisted calendar metadata for one linked account.
///
/// Session-local visibility is deliberately NOT a field here; it lives in
/// the aggregation layer's visibility map and is merged into the view as a
/// projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarInfo {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<CalendarColor>,
}

impl CalendarInfo {
    /// Minimal metadata for a freshly registered account: the primary
    /// calendar's identifier is the account email itself.
    pub fn for_email(email: &str) -> Self {
        CalendarInfo {
            id: email.to_string(),
            email: email.to_string(),
            display_name: None,
            color: None,
        }
    }
}

/// Field-level patch for colour / display-name edits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarInfoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<CalendarColor>,
}

impl CalendarInfoPatch {
    /// Apply the patch to existing metadata, leaving unset fields alone.
    pub fn apply_to(&self, info: &mut CalendarInfo) {
        if let Some(display_name) = &self.display_name {
            info.display_name = Some(display_name.clone());
        }
        if let Some(color) = &self.color {
            info.color = Some(color.clone());
        }
    }
}
