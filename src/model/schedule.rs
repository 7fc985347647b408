use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimeSchedule {
    pub id: u64,
    pub employee_id: u64,
    pub effective_from: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
    /// Comma separated weekday names, e.g. "sat,sun"
    pub rest_days: String,
}

impl TimeSchedule {
    /// Unknown names are skipped rather than failing the whole sync.
    pub fn rest_weekdays(&self) -> Vec<Weekday> {
        parse_weekdays(&self.rest_days)
    }
}

pub fn parse_weekdays(raw: &str) -> Vec<Weekday> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<Weekday>() {
            Ok(day) => Some(day),
            Err(_) => {
                tracing::warn!(value = s, "Ignoring unknown rest day");
                None
            }
        })
        .collect()
}

/// Approved one-day schedule override.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChangeOffSchedule {
    pub id: u64,
    pub employee_id: u64,
    pub schedule_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_restday: bool,
    pub approved_at: Option<NaiveDateTime>,
}
