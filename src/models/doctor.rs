use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub specialization: String,
    pub email: String,
    pub phone: String,
    /// Years of experience.
    pub experience: u32,
    pub image_url: Option<String>,
    pub image_path: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Doctor {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Editable doctor fields as submitted by the console.
/// `experience` is signed so a negative value reaches validation
/// instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub experience: i64,
}

/// Entry of the doctor-assignment picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorOption {
    pub id: Uuid,
    pub name: String,
}
