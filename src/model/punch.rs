use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One raw time-clock event as stored in `attendance_punches`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RawPunch {
    pub id: u64,
    pub biometric_id: String,
    pub punch_time: NaiveDateTime,
    pub device_serial: Option<String>,
}

/// A punch already mapped to an employee, as the grouper sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Punch {
    pub id: u64,
    pub at: NaiveDateTime,
}

impl From<&RawPunch> for Punch {
    fn from(raw: &RawPunch) -> Self {
        Punch {
            id: raw.id,
            at: raw.punch_time,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PunchUpload {
    #[schema(example = "1001")]
    pub biometric_id: String,
    #[schema(example = "2026-01-05T07:58:12", format = "date-time", value_type = String)]
    pub punch_time: NaiveDateTime,
    #[schema(example = "CQZ7224460246", nullable = true)]
    pub device_serial: Option<String>,
}
