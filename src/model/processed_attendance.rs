use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Who last wrote the time fields of a processed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceSource {
    Sync,
    Import,
    Manual,
    ManualEdit,
}

impl AttendanceSource {
    /// Rows keyed in by a person keep their times across syncs.
    pub fn owns_times(&self) -> bool {
        !matches!(self, AttendanceSource::Sync)
    }
}

/// Stored row of `processed_attendances`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ProcessedAttendance {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub attendance_date: NaiveDate,

    #[schema(example = "08:02:00", value_type = Option<String>)]
    pub time_in: Option<NaiveTime>,
    #[schema(example = "12:01:00", value_type = Option<String>)]
    pub break_out: Option<NaiveTime>,
    #[schema(example = "12:58:00", value_type = Option<String>)]
    pub break_in: Option<NaiveTime>,
    #[schema(example = "17:05:00", value_type = Option<String>)]
    pub time_out: Option<NaiveTime>,
    pub night_shift: bool,
    /// Time-out recorded on the following calendar day
    #[schema(value_type = Option<String>)]
    pub nextday_timeout: Option<NaiveTime>,

    #[schema(example = 8.0)]
    pub worked_hours: f64,
    pub late_hours: f64,
    pub undertime_hours: f64,
    pub overtime_hours: f64,

    /// Rest day worked through an approved cancellation
    pub ct: bool,
    /// Schedule changed for the day
    pub cs: bool,
    pub restday: bool,
    /// Official business
    pub ob: bool,
    pub travel_order: bool,
    #[schema(example = "VL", nullable = true)]
    pub slvl: Option<String>,
    #[schema(example = 1.0)]
    pub holiday_multiplier: f64,
    pub retro_hours: f64,
    pub offset_hours: f64,

    #[schema(example = "sync")]
    pub source: String,
    pub posted: bool,
}

impl ProcessedAttendance {
    pub fn source(&self) -> AttendanceSource {
        self.source.parse().unwrap_or(AttendanceSource::Sync)
    }
}

/// A computed day, before it is written back.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAttendance {
    pub employee_id: u64,
    pub attendance_date: NaiveDate,
    pub time_in: Option<NaiveTime>,
    pub break_out: Option<NaiveTime>,
    pub break_in: Option<NaiveTime>,
    pub time_out: Option<NaiveTime>,
    pub night_shift: bool,
    pub nextday_timeout: Option<NaiveTime>,
    pub worked_hours: f64,
    pub late_hours: f64,
    pub undertime_hours: f64,
    pub overtime_hours: f64,
    pub ct: bool,
    pub cs: bool,
    pub restday: bool,
    pub ob: bool,
    pub travel_order: bool,
    pub slvl: Option<String>,
    pub holiday_multiplier: f64,
    pub retro_hours: f64,
    pub offset_hours: f64,
    pub source: AttendanceSource,
}

impl DailyAttendance {
    pub fn blank(employee_id: u64, attendance_date: NaiveDate, source: AttendanceSource) -> Self {
        Self {
            employee_id,
            attendance_date,
            time_in: None,
            break_out: None,
            break_in: None,
            time_out: None,
            night_shift: false,
            nextday_timeout: None,
            worked_hours: 0.0,
            late_hours: 0.0,
            undertime_hours: 0.0,
            overtime_hours: 0.0,
            ct: false,
            cs: false,
            restday: false,
            ob: false,
            travel_order: false,
            slvl: None,
            holiday_multiplier: 1.0,
            retro_hours: 0.0,
            offset_hours: 0.0,
            source,
        }
    }

    /// Starts from the stored times of `row`; derived fields are reset.
    pub fn from_stored_times(row: &ProcessedAttendance) -> Self {
        Self {
            time_in: row.time_in,
            break_out: row.break_out,
            break_in: row.break_in,
            time_out: row.time_out,
            night_shift: row.night_shift,
            nextday_timeout: row.nextday_timeout,
            ..Self::blank(row.employee_id, row.attendance_date, row.source())
        }
    }

    pub fn has_punches(&self) -> bool {
        self.time_in.is_some() || self.time_out.is_some() || self.nextday_timeout.is_some()
    }
}
