use chrono::{NaiveDateTime, NaiveTime};

use super::schedule::{ShiftSchedule, next_day};
use crate::config::SyncSettings;
use crate::model::processed_attendance::DailyAttendance;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoursBreakdown {
    pub worked_minutes: i64,
    pub late_minutes: i64,
    pub undertime_minutes: i64,
}

/// Stored times of a row placed back on a real timeline.
#[derive(Debug, Clone, Copy)]
pub struct Timeline {
    pub time_in: Option<NaiveDateTime>,
    pub time_out: Option<NaiveDateTime>,
    pub break_out: Option<NaiveDateTime>,
    pub break_in: Option<NaiveDateTime>,
}

impl Timeline {
    /// A night-shift time-in may fall after midnight. Every other time is
    /// the first occurrence at or after the time-in.
    pub fn of(row: &DailyAttendance, shift: &ShiftSchedule) -> Self {
        let date = row.attendance_date;
        let next = next_day(date);
        let night = row.night_shift || shift.is_night_shift();

        let time_in = row.time_in.map(|t| {
            if shift.is_after_midnight(t) {
                next.and_time(t)
            } else {
                date.and_time(t)
            }
        });

        let anchor = |t: NaiveTime| -> NaiveDateTime {
            let same = date.and_time(t);
            match time_in {
                Some(tin) if night && same < tin => next.and_time(t),
                None if shift.is_after_midnight(t) => next.and_time(t),
                _ => same,
            }
        };

        let time_out = match (row.night_shift, row.nextday_timeout) {
            (true, Some(t)) => Some(next.and_time(t)),
            _ => row.time_out.map(anchor),
        };

        Self {
            time_in,
            time_out,
            break_out: row.break_out.map(anchor),
            break_in: row.break_in.map(anchor),
        }
    }
}

pub fn compute(
    row: &DailyAttendance,
    shift: &ShiftSchedule,
    restday: bool,
    settings: &SyncSettings,
) -> HoursBreakdown {
    let date = row.attendance_date;
    let line = Timeline::of(row, shift);
    let (start, end) = (shift.start_at(date), shift.end_at(date));

    let mut out = HoursBreakdown::default();

    if !restday {
        if let Some(tin) = line.time_in {
            let late = (tin - start).num_minutes();
            if late > settings.grace_minutes {
                out.late_minutes = late.min(shift.scheduled_minutes(date));
            }
        }
    }

    let (Some(tin), Some(tout)) = (line.time_in, line.time_out) else {
        return out;
    };
    if tout <= tin {
        tracing::warn!(employee_id = row.employee_id, %date, "Time-out is not after time-in");
        return out;
    }

    let window = if restday {
        (tin, tout)
    } else {
        (tin.max(start), tout.min(end))
    };

    let breaks = match (line.break_out, line.break_in) {
        (Some(bo), Some(bi)) if bi > bo => overlap_minutes(window, (bo, bi)),
        _ => shift
            .break_window(date)
            .map(|bw| overlap_minutes(window, bw))
            .unwrap_or(0),
    };

    out.worked_minutes = (span_minutes(window) - breaks).max(0);

    if !restday && tout < end {
        out.undertime_minutes = (end - tout)
            .num_minutes()
            .min(shift.scheduled_minutes(date));
    }

    out
}

/// Recomputes worked, late and undertime hours in place.
pub fn apply(row: &mut DailyAttendance, shift: &ShiftSchedule, restday: bool, settings: &SyncSettings) {
    let b = compute(row, shift, restday, settings);
    row.worked_hours = to_hours(b.worked_minutes);
    row.late_hours = to_hours(b.late_minutes);
    row.undertime_hours = to_hours(b.undertime_minutes);
}

/// Minutes worked past the end of the shift; 0 without a time-out.
pub fn minutes_beyond_shift(row: &DailyAttendance, shift: &ShiftSchedule) -> i64 {
    let end = shift.end_at(row.attendance_date);
    Timeline::of(row, shift)
        .time_out
        .map(|tout| (tout - end).num_minutes().max(0))
        .unwrap_or(0)
}

/// Decimal hours rounded to two places.
pub fn to_hours(minutes: i64) -> f64 {
    round2(minutes as f64 / 60.0)
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn span_minutes((a, b): (NaiveDateTime, NaiveDateTime)) -> i64 {
    (b - a).num_minutes().max(0)
}

fn overlap_minutes(a: (NaiveDateTime, NaiveDateTime), b: (NaiveDateTime, NaiveDateTime)) -> i64 {
    span_minutes((a.0.max(b.0), a.1.min(b.1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::processed_attendance::AttendanceSource;
    use chrono::NaiveDate;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn row(tin: Option<NaiveTime>, tout: Option<NaiveTime>) -> DailyAttendance {
        let mut r = DailyAttendance::blank(1, d(5), AttendanceSource::Sync);
        r.time_in = tin;
        r.time_out = tout;
        r
    }

    fn day_shift() -> ShiftSchedule {
        ShiftSchedule::fallback(&SyncSettings::default())
    }

    #[test]
    fn full_day_with_scheduled_break() {
        let b = compute(&row(Some(t(7, 50)), Some(t(17, 10))), &day_shift(), false, &SyncSettings::default());
        assert_eq!(
            b,
            HoursBreakdown {
                worked_minutes: 480,
                late_minutes: 0,
                undertime_minutes: 0
            }
        );
    }

    #[test]
    fn late_within_grace_is_forgiven() {
        let b = compute(&row(Some(t(8, 5)), Some(t(17, 0))), &day_shift(), false, &SyncSettings::default());
        assert_eq!(b.late_minutes, 0);
        assert_eq!(b.worked_minutes, 475);

        let b = compute(&row(Some(t(8, 20)), Some(t(17, 0))), &day_shift(), false, &SyncSettings::default());
        assert_eq!(b.late_minutes, 20);
    }

    #[test]
    fn early_out_is_undertime() {
        let b = compute(&row(Some(t(8, 0)), Some(t(16, 0))), &day_shift(), false, &SyncSettings::default());
        assert_eq!(b.undertime_minutes, 60);
        assert_eq!(b.worked_minutes, 420);
    }

    #[test]
    fn actual_break_replaces_scheduled_break() {
        let mut r = row(Some(t(8, 0)), Some(t(17, 0)));
        r.break_out = Some(t(12, 0));
        r.break_in = Some(t(13, 30));
        let b = compute(&r, &day_shift(), false, &SyncSettings::default());
        assert_eq!(b.worked_minutes, 450);
    }

    #[test]
    fn missing_time_out_counts_no_hours() {
        let b = compute(&row(Some(t(8, 30)), None), &day_shift(), false, &SyncSettings::default());
        assert_eq!(b.worked_minutes, 0);
        assert_eq!(b.late_minutes, 30);
        assert_eq!(b.undertime_minutes, 0);
    }

    #[test]
    fn rest_day_has_no_late_or_shift_clamp() {
        let b = compute(&row(Some(t(10, 0)), Some(t(19, 0))), &day_shift(), true, &SyncSettings::default());
        assert_eq!(b.late_minutes, 0);
        assert_eq!(b.undertime_minutes, 0);
        assert_eq!(b.worked_minutes, 480);
    }

    #[test]
    fn night_shift_uses_next_day_timeout() {
        let shift = ShiftSchedule {
            start: t(22, 0),
            end: t(6, 0),
            break_start: Some(t(2, 0)),
            break_end: Some(t(3, 0)),
        };
        let mut r = row(Some(t(22, 0)), None);
        r.night_shift = true;
        r.nextday_timeout = Some(t(6, 0));
        r.break_out = Some(t(2, 0));
        r.break_in = Some(t(3, 0));

        let mut settled = r.clone();
        apply(&mut settled, &shift, false, &SyncSettings::default());
        assert_eq!(settled.worked_hours, 7.0);
        assert_eq!(settled.late_hours, 0.0);
        assert_eq!(settled.undertime_hours, 0.0);

        r.nextday_timeout = Some(t(8, 0));
        assert_eq!(minutes_beyond_shift(&r, &shift), 120);
    }

    #[test]
    fn hours_round_to_two_places() {
        assert_eq!(to_hours(20), 0.33);
        assert_eq!(to_hours(450), 7.5);
    }

    fn night_shift() -> ShiftSchedule {
        ShiftSchedule {
            start: t(22, 0),
            end: t(6, 0),
            break_start: Some(t(2, 0)),
            break_end: Some(t(3, 0)),
        }
    }

    #[test]
    fn night_time_in_after_midnight_stays_on_the_next_morning() {
        let mut r = row(Some(t(0, 30)), None);
        r.night_shift = true;
        r.nextday_timeout = Some(t(6, 5));

        let line = Timeline::of(&r, &night_shift());
        assert_eq!(line.time_in, Some(d(6).and_time(t(0, 30))));

        let b = compute(&r, &night_shift(), false, &SyncSettings::default());
        assert_eq!(b.late_minutes, 150);
        assert_eq!(b.worked_minutes, 270);
        assert_eq!(b.undertime_minutes, 0);
    }

    #[test]
    fn night_break_follows_a_late_time_in() {
        let mut r = row(Some(t(1, 0)), None);
        r.night_shift = true;
        r.nextday_timeout = Some(t(6, 0));
        r.break_out = Some(t(3, 0));
        r.break_in = Some(t(3, 30));

        let line = Timeline::of(&r, &night_shift());
        assert_eq!(line.break_out, Some(d(6).and_time(t(3, 0))));
        assert_eq!(compute(&r, &night_shift(), false, &SyncSettings::default()).worked_minutes, 270);
    }

    #[test]
    fn lateness_never_exceeds_the_shift() {
        // keyed in after the shift already ended
        let b = compute(&row(Some(t(18, 0)), Some(t(19, 0))), &day_shift(), false, &SyncSettings::default());
        assert_eq!(b.late_minutes, 480);
        assert_eq!(b.worked_minutes, 0);
    }
}
