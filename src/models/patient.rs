use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Gender;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub contact: String,
    pub diagnosis: String,
    pub assigned_doctor_id: Option<Uuid>,
    pub report_image_url: Option<String>,
    pub report_image_path: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: i64,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub assigned_doctor_id: Option<Uuid>,
}

/// Patient row plus the display name of the assigned doctor:
/// `None` when unassigned, `"Unknown"` when that doctor is no longer active.
#[derive(Debug, Clone, Serialize)]
pub struct PatientListItem {
    #[serde(flatten)]
    pub patient: Patient,
    pub assigned_doctor_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentPatient {
    pub id: Uuid,
    pub name: String,
    pub diagnosis: String,
    pub created_at: DateTime<Utc>,
}
