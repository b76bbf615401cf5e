// Absence records and the trait the store needs from anything it keeps

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use std::str::FromStr;

/// Core trait that any storable record must implement
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Input a record is built from before the store stamps it
    type Draft;

    /// Build the full record once the store has assigned identity and creation time
    fn from_draft(draft: Self::Draft, id: String, timestamp: i64) -> Self;

    /// Unique identifier for this record
    fn id(&self) -> &str;

    /// Creation time in milliseconds since epoch, used as the sort key
    fn timestamp(&self) -> i64;
}

/// Kind of absence being reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbsenceType {
    #[default]
    #[serde(rename = "Sakit")]
    Sick,
    #[serde(rename = "Izin")]
    Permission,
    #[serde(rename = "Tanpa Keterangan")]
    Unexcused,
}

impl AbsenceType {
    pub const ALL: [AbsenceType; 3] = [AbsenceType::Sick, AbsenceType::Permission, AbsenceType::Unexcused];

    /// Label as shown to users and written to exports
    pub fn label(&self) -> &'static str {
        match self {
            AbsenceType::Sick => "Sakit",
            AbsenceType::Permission => "Izin",
            AbsenceType::Unexcused => "Tanpa Keterangan",
        }
    }
}

impl fmt::Display for AbsenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AbsenceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "sakit" | "sick" => Ok(AbsenceType::Sick),
            "izin" | "permission" => Ok(AbsenceType::Permission),
            "tanpa keterangan" | "unexcused" | "alpha" => Ok(AbsenceType::Unexcused),
            _ => Err(format!(
                "Unknown absence type: {} (expected sakit, izin or tanpa-keterangan)",
                s
            )),
        }
    }
}

/// Approval state of a report. Part of the stored layout, never assigned by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// One reported absence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceRecord {
    pub id: String,
    pub student_name: String,
    pub class_name: String,
    #[serde(rename = "type")]
    pub absence_type: AbsenceType,
    pub reason: String,
    /// The day the absence concerns; independent of `timestamp`
    pub date: DateTime<Utc>,
    /// Inline data-URI image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_image: Option<String>,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ApprovalStatus>,
}

/// A validated absence report that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAbsence {
    pub student_name: String,
    pub class_name: String,
    pub absence_type: AbsenceType,
    pub reason: String,
    pub date: DateTime<Utc>,
    pub proof_image: Option<String>,
}

impl Record for AbsenceRecord {
    type Draft = NewAbsence;

    fn from_draft(draft: NewAbsence, id: String, timestamp: i64) -> Self {
        Self {
            id,
            student_name: draft.student_name,
            class_name: draft.class_name,
            absence_type: draft.absence_type,
            reason: draft.reason,
            date: draft.date,
            proof_image: draft.proof_image,
            timestamp,
            status: None,
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Current time in milliseconds since epoch
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
