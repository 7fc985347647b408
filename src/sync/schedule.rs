use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::config::SyncSettings;
use crate::model::approval::{ApprovalSet, winning};
use crate::model::schedule::TimeSchedule;

#[derive(Debug, Clone, PartialEq)]
pub struct ShiftSchedule {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
}

impl ShiftSchedule {
    pub fn fallback(settings: &SyncSettings) -> Self {
        Self {
            start: settings.default_start,
            end: settings.default_end,
            break_start: Some(settings.default_break_start),
            break_end: Some(settings.default_break_end),
        }
    }

    /// A shift whose end is not after its start finishes the next day.
    pub fn is_night_shift(&self) -> bool {
        self.end <= self.start
    }

    pub fn start_at(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.start)
    }

    pub fn end_at(&self, date: NaiveDate) -> NaiveDateTime {
        if self.is_night_shift() {
            next_day(date).and_time(self.end)
        } else {
            date.and_time(self.end)
        }
    }

    pub fn midpoint(&self, date: NaiveDate) -> NaiveDateTime {
        let start = self.start_at(date);
        start + (self.end_at(date) - start) / 2
    }

    /// Scheduled break placed on the shift's timeline.
    pub fn break_window(&self, date: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let (bs, be) = (self.break_start?, self.break_end?);
        let bs_day = if self.is_night_shift() && bs < self.start {
            next_day(date)
        } else {
            date
        };
        let be_day = if be <= bs { next_day(bs_day) } else { bs_day };
        Some((bs_day.and_time(bs), be_day.and_time(be)))
    }

    /// Whether a clock time on a night-shift row belongs to the morning after.
    /// Times before the middle of the off-duty gap do.
    pub fn is_after_midnight(&self, t: NaiveTime) -> bool {
        if !self.is_night_shift() {
            return false;
        }
        let off_duty = self.start - self.end;
        t < self.end + off_duty / 2
    }

    /// Shift length minus the scheduled break.
    pub fn scheduled_minutes(&self, date: NaiveDate) -> i64 {
        let span = (self.end_at(date) - self.start_at(date)).num_minutes();
        let brk = self
            .break_window(date)
            .map(|(s, e)| (e - s).num_minutes())
            .unwrap_or(0);
        (span - brk).max(0)
    }
}

/// The shift in force for one employee on one date, after overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDay {
    pub shift: ShiftSchedule,
    pub restday: bool,
    /// Changed by an approved change-of-schedule
    pub cs: bool,
    /// Rest day cancelled, so worked as a regular day
    pub ct: bool,
}

pub fn resolve_day(
    employee_id: u64,
    schedules: &[TimeSchedule],
    approvals: &ApprovalSet,
    date: NaiveDate,
    settings: &SyncSettings,
) -> ResolvedDay {
    let base = schedules
        .iter()
        .filter(|s| s.employee_id == employee_id && s.effective_from <= date)
        .max_by_key(|s| (s.effective_from, s.id));

    let (mut shift, rest_days) = match base {
        Some(s) => (
            ShiftSchedule {
                start: s.start_time,
                end: s.end_time,
                break_start: s.break_start,
                break_end: s.break_end,
            },
            s.rest_weekdays(),
        ),
        None => (
            ShiftSchedule::fallback(settings),
            vec![Weekday::Sat, Weekday::Sun],
        ),
    };

    let mut restday = rest_days.contains(&date.weekday());
    let mut cs = false;

    if let Some(change) = winning(&approvals.change_schedule, employee_id, date) {
        cs = true;
        restday = change.is_restday;
        if let Some(start) = change.start_time {
            shift.start = start;
        }
        if let Some(end) = change.end_time {
            shift.end = end;
        }
    }

    let mut ct = false;
    if restday && winning(&approvals.cancel_restday, employee_id, date).is_some() {
        restday = false;
        ct = true;
    }

    ResolvedDay {
        shift,
        restday,
        cs,
        ct,
    }
}

pub fn next_day(date: NaiveDate) -> NaiveDate {
    date + Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::approval::CancelRestDay;
    use crate::model::schedule::ChangeOffSchedule;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    // 2026-03-07 is a Saturday
    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn schedule(id: u64, from: NaiveDate, start: NaiveTime, end: NaiveTime) -> TimeSchedule {
        TimeSchedule {
            id,
            employee_id: 1,
            effective_from: from,
            start_time: start,
            end_time: end,
            break_start: None,
            break_end: None,
            rest_days: "sun".into(),
        }
    }

    #[test]
    fn night_shift_ends_next_day() {
        let shift = ShiftSchedule {
            start: t(22, 0),
            end: t(6, 0),
            break_start: Some(t(2, 0)),
            break_end: Some(t(3, 0)),
        };
        assert!(shift.is_night_shift());
        assert_eq!(shift.end_at(d(5)), d(6).and_time(t(6, 0)));
        assert_eq!(
            shift.break_window(d(5)),
            Some((d(6).and_time(t(2, 0)), d(6).and_time(t(3, 0))))
        );
        assert_eq!(shift.scheduled_minutes(d(5)), 7 * 60);
    }

    #[test]
    fn morning_times_belong_to_the_night_before() {
        let night = ShiftSchedule {
            start: t(22, 0),
            end: t(6, 0),
            break_start: None,
            break_end: None,
        };
        assert!(night.is_after_midnight(t(0, 30)));
        assert!(night.is_after_midnight(t(13, 59)));
        assert!(!night.is_after_midnight(t(14, 0)));
        assert!(!night.is_after_midnight(t(21, 55)));

        let day = ShiftSchedule::fallback(&SyncSettings::default());
        assert!(!day.is_after_midnight(t(0, 30)));
    }

    #[test]
    fn fallback_shift_has_eight_paid_hours() {
        let shift = ShiftSchedule::fallback(&SyncSettings::default());
        assert!(!shift.is_night_shift());
        assert_eq!(shift.scheduled_minutes(d(5)), 8 * 60);
    }

    #[test]
    fn latest_effective_schedule_applies() {
        let schedules = vec![
            schedule(1, d(1), t(8, 0), t(17, 0)),
            schedule(2, d(4), t(9, 0), t(18, 0)),
            schedule(3, d(20), t(6, 0), t(15, 0)),
        ];
        let day = resolve_day(1, &schedules, &ApprovalSet::default(), d(5), &SyncSettings::default());
        assert_eq!(day.shift.start, t(9, 0));
        assert!(!day.restday);
    }

    #[test]
    fn change_of_schedule_overrides_times_and_sets_cs() {
        let approvals = ApprovalSet {
            change_schedule: vec![ChangeOffSchedule {
                id: 1,
                employee_id: 1,
                schedule_date: d(5),
                start_time: Some(t(13, 0)),
                end_time: Some(t(22, 0)),
                is_restday: false,
                approved_at: None,
            }],
            ..Default::default()
        };
        let day = resolve_day(1, &[], &approvals, d(5), &SyncSettings::default());
        assert!(day.cs);
        assert_eq!(day.shift.start, t(13, 0));
        assert_eq!(day.shift.end, t(22, 0));
    }

    #[test]
    fn cancelled_rest_day_becomes_work_day() {
        let approvals = ApprovalSet {
            cancel_restday: vec![CancelRestDay {
                id: 1,
                employee_id: 1,
                restday_date: d(7),
                approved_at: None,
            }],
            ..Default::default()
        };
        let settings = SyncSettings::default();
        assert!(resolve_day(1, &[], &ApprovalSet::default(), d(7), &settings).restday);

        let day = resolve_day(1, &[], &approvals, d(7), &settings);
        assert!(!day.restday);
        assert!(day.ct);
    }

    #[test]
    fn cancellation_on_a_work_day_is_ignored() {
        let approvals = ApprovalSet {
            cancel_restday: vec![CancelRestDay {
                id: 1,
                employee_id: 1,
                restday_date: d(5),
                approved_at: None,
            }],
            ..Default::default()
        };
        let day = resolve_day(1, &[], &approvals, d(5), &SyncSettings::default());
        assert!(!day.ct);
    }
}
