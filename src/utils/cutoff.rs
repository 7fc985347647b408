use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Semi-monthly pay period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
pub enum Cutoff {
    /// Days 1 to 15
    #[serde(rename = "1st")]
    #[strum(serialize = "1st")]
    First,
    /// Day 16 to the end of the month
    #[serde(rename = "2nd")]
    #[strum(serialize = "2nd")]
    Second,
}

impl Cutoff {
    pub fn for_date(date: NaiveDate) -> Self {
        if date.day() <= 15 {
            Cutoff::First
        } else {
            Cutoff::Second
        }
    }

    /// Inclusive first and last day of this cutoff, or `None` for a bad month.
    pub fn period(&self, year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            Cutoff::First => Some((
                NaiveDate::from_ymd_opt(year, month, 1)?,
                NaiveDate::from_ymd_opt(year, month, 15)?,
            )),
            Cutoff::Second => Some((
                NaiveDate::from_ymd_opt(year, month, 16)?,
                last_day_of_month(year, month)?,
            )),
        }
    }

    /// Period containing `date`.
    pub fn period_of(date: NaiveDate) -> (NaiveDate, NaiveDate) {
        Self::for_date(date)
            .period(date.year(), date.month())
            .unwrap_or((date, date))
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (y, m) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(y, m, 1)?.pred_opt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn fifteenth_is_first_cutoff_sixteenth_is_second() {
        assert_eq!(Cutoff::for_date(d(2026, 1, 15)), Cutoff::First);
        assert_eq!(Cutoff::for_date(d(2026, 1, 16)), Cutoff::Second);
    }

    #[test]
    fn second_cutoff_ends_on_last_day_of_month() {
        assert_eq!(
            Cutoff::Second.period(2024, 2),
            Some((d(2024, 2, 16), d(2024, 2, 29)))
        );
        assert_eq!(
            Cutoff::Second.period(2026, 12),
            Some((d(2026, 12, 16), d(2026, 12, 31)))
        );
        assert_eq!(Cutoff::First.period(2026, 13), None);
    }

    #[test]
    fn parses_ordinal_labels() {
        assert_eq!("1st".parse::<Cutoff>().unwrap(), Cutoff::First);
        assert_eq!(Cutoff::Second.to_string(), "2nd");
        let c: Cutoff = serde_json::from_str("\"2nd\"").unwrap();
        assert_eq!(c, Cutoff::Second);
    }
}
