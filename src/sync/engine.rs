use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashSet;

use super::approval_merger::merge_approvals;
use super::hours;
use super::punch_grouper::group_punches;
use super::schedule::{ResolvedDay, next_day, resolve_day};
use crate::config::SyncSettings;
use crate::model::approval::ApprovalSet;
use crate::model::holiday::Holiday;
use crate::model::processed_attendance::{AttendanceSource, DailyAttendance, ProcessedAttendance};
use crate::model::punch::Punch;
use crate::model::schedule::TimeSchedule;

/// Everything the engine needs for one employee.
pub struct EmployeeInputs<'a> {
    pub employee_id: u64,
    /// Should span the day before the range through the day after it
    pub punches: &'a [Punch],
    pub schedules: &'a [TimeSchedule],
    pub approvals: &'a ApprovalSet,
    pub holidays: &'a [Holiday],
    pub existing: &'a [ProcessedAttendance],
}

#[derive(Debug, Clone, PartialEq)]
pub enum DayOutcome {
    Upsert(DailyAttendance),
    SkippedPosted(NaiveDate),
    NoData(NaiveDate),
}

/// Reconciles every day of `from..=to` for one employee.
///
/// Pure: the same inputs always produce the same outcomes.
pub fn reconcile_employee(
    inputs: &EmployeeInputs<'_>,
    from: NaiveDate,
    to: NaiveDate,
    settings: &SyncSettings,
) -> Vec<DayOutcome> {
    let mut consumed: HashSet<u64> = HashSet::new();

    // a night shift on the eve of the range owns that morning's punches
    let eve = from - Duration::days(1);
    let eve_day = resolve_day(inputs.employee_id, inputs.schedules, inputs.approvals, eve, settings);
    if eve_day.shift.is_night_shift() {
        let next_start = worked_start(inputs, from, settings);
        let seg = group_punches(inputs.punches, eve, &eve_day.shift, next_start, &consumed, settings);
        consumed.extend(seg.consumed);
    }

    let mut outcomes = Vec::new();
    let mut date = from;
    while date <= to {
        outcomes.push(reconcile_day(inputs, date, &mut consumed, settings));
        date += Duration::days(1);
    }
    outcomes
}

fn reconcile_day(
    inputs: &EmployeeInputs<'_>,
    date: NaiveDate,
    consumed: &mut HashSet<u64>,
    settings: &SyncSettings,
) -> DayOutcome {
    let day = resolve_day(inputs.employee_id, inputs.schedules, inputs.approvals, date, settings);

    // grouping runs even for rows we keep so carry-over stays consistent
    let next_start = worked_start(inputs, next_day(date), settings);
    let segments = group_punches(inputs.punches, date, &day.shift, next_start, consumed, settings);
    consumed.extend(segments.consumed.iter().copied());

    let existing = inputs.existing.iter().find(|r| r.attendance_date == date);

    if existing.is_some_and(|r| r.posted) {
        return DayOutcome::SkippedPosted(date);
    }

    let mut row = match existing {
        Some(stored) if stored.source().owns_times() => DailyAttendance::from_stored_times(stored),
        _ => {
            let mut fresh = DailyAttendance::blank(inputs.employee_id, date, AttendanceSource::Sync);
            segments.apply_to(&mut fresh);
            fresh
        }
    };

    if existing.is_none()
        && !row.has_punches()
        && !inputs.approvals.any_on(inputs.employee_id, date)
    {
        return DayOutcome::NoData(date);
    }

    finish_day(&mut row, &day, inputs.approvals, inputs.holidays, settings);
    DayOutcome::Upsert(row)
}

/// Shift start of `date`, or `None` when it is a rest day.
fn worked_start(
    inputs: &EmployeeInputs<'_>,
    date: NaiveDate,
    settings: &SyncSettings,
) -> Option<NaiveDateTime> {
    let day = resolve_day(inputs.employee_id, inputs.schedules, inputs.approvals, date, settings);
    (!day.restday).then(|| day.shift.start_at(date))
}

/// Hours first, then approvals on top.
fn finish_day(
    row: &mut DailyAttendance,
    day: &ResolvedDay,
    approvals: &ApprovalSet,
    holidays: &[Holiday],
    settings: &SyncSettings,
) {
    hours::apply(row, &day.shift, day.restday, settings);
    merge_approvals(row, day, approvals, holidays);
}

/// Recomputes a single day whose times were keyed in by hand.
pub fn recompute_day(
    mut row: DailyAttendance,
    schedules: &[TimeSchedule],
    approvals: &ApprovalSet,
    holidays: &[Holiday],
    settings: &SyncSettings,
) -> DailyAttendance {
    let day = resolve_day(row.employee_id, schedules, approvals, row.attendance_date, settings);
    finish_day(&mut row, &day, approvals, holidays, settings);
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::approval::{CancelRestDay, TravelOrder};
    use crate::model::schedule::ChangeOffSchedule;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    // 2026-03-02 is a Monday
    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn p(id: u64, day: u32, h: u32, m: u32) -> Punch {
        Punch {
            id,
            at: d(day).and_time(t(h, m)),
        }
    }

    fn night_schedule() -> TimeSchedule {
        TimeSchedule {
            id: 1,
            employee_id: 1,
            effective_from: d(1),
            start_time: t(22, 0),
            end_time: t(6, 0),
            break_start: Some(t(2, 0)),
            break_end: Some(t(3, 0)),
            rest_days: "sat,sun".into(),
        }
    }

    fn stored(row: &DailyAttendance, id: u64) -> ProcessedAttendance {
        ProcessedAttendance {
            id,
            employee_id: row.employee_id,
            attendance_date: row.attendance_date,
            time_in: row.time_in,
            break_out: row.break_out,
            break_in: row.break_in,
            time_out: row.time_out,
            night_shift: row.night_shift,
            nextday_timeout: row.nextday_timeout,
            worked_hours: row.worked_hours,
            late_hours: row.late_hours,
            undertime_hours: row.undertime_hours,
            overtime_hours: row.overtime_hours,
            ct: row.ct,
            cs: row.cs,
            restday: row.restday,
            ob: row.ob,
            travel_order: row.travel_order,
            slvl: row.slvl.clone(),
            holiday_multiplier: row.holiday_multiplier,
            retro_hours: row.retro_hours,
            offset_hours: row.offset_hours,
            source: row.source.to_string(),
            posted: false,
        }
    }

    fn upserts(outcomes: &[DayOutcome]) -> Vec<DailyAttendance> {
        outcomes
            .iter()
            .filter_map(|o| match o {
                DayOutcome::Upsert(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn day_shift_week_is_reconciled() {
        let punches = vec![p(1, 2, 7, 58), p(2, 2, 17, 2), p(3, 3, 8, 40), p(4, 3, 17, 0)];
        let approvals = ApprovalSet::default();
        let inputs = EmployeeInputs {
            employee_id: 1,
            punches: &punches,
            schedules: &[],
            approvals: &approvals,
            holidays: &[],
            existing: &[],
        };

        let outcomes = reconcile_employee(&inputs, d(2), d(4), &SyncSettings::default());
        assert_eq!(outcomes.len(), 3);

        let rows = upserts(&outcomes);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].worked_hours, 8.0);
        assert_eq!(rows[1].late_hours, 0.67);
        assert_eq!(outcomes[2], DayOutcome::NoData(d(4)));
    }

    #[test]
    fn night_shift_eve_punches_are_not_reused() {
        // Sunday night shift; the 06:00 punch on Monday closes it
        let punches = vec![p(1, 2, 6, 1), p(2, 2, 21, 57), p(3, 3, 6, 3)];
        let schedules = vec![night_schedule()];
        let approvals = ApprovalSet::default();
        let inputs = EmployeeInputs {
            employee_id: 1,
            punches: &punches,
            schedules: &schedules,
            approvals: &approvals,
            holidays: &[],
            existing: &[],
        };

        let rows = upserts(&reconcile_employee(&inputs, d(2), d(2), &SyncSettings::default()));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].time_in, Some(t(21, 57)));
        assert!(rows[0].night_shift);
        assert_eq!(rows[0].nextday_timeout, Some(t(6, 3)));
        assert_eq!(rows[0].worked_hours, 7.0);
    }

    #[test]
    fn sync_is_idempotent() {
        let punches = vec![p(1, 2, 8, 15), p(2, 2, 12, 0), p(3, 2, 13, 0), p(4, 2, 16, 45)];
        let approvals = ApprovalSet::default();
        let first_inputs = EmployeeInputs {
            employee_id: 1,
            punches: &punches,
            schedules: &[],
            approvals: &approvals,
            holidays: &[],
            existing: &[],
        };
        let first = upserts(&reconcile_employee(&first_inputs, d(2), d(2), &SyncSettings::default()));

        let existing: Vec<ProcessedAttendance> = first.iter().map(|r| stored(r, 10)).collect();
        let second_inputs = EmployeeInputs {
            existing: &existing,
            ..first_inputs
        };
        let second = upserts(&reconcile_employee(&second_inputs, d(2), d(2), &SyncSettings::default()));

        assert_eq!(first, second);
    }

    #[test]
    fn posted_rows_are_left_alone() {
        let punches = vec![p(1, 2, 8, 0), p(2, 2, 17, 0)];
        let approvals = ApprovalSet::default();
        let mut row = DailyAttendance::blank(1, d(2), AttendanceSource::Sync);
        row.time_in = Some(t(9, 0));
        let mut posted = stored(&row, 3);
        posted.posted = true;
        let existing = vec![posted];

        let inputs = EmployeeInputs {
            employee_id: 1,
            punches: &punches,
            schedules: &[],
            approvals: &approvals,
            holidays: &[],
            existing: &existing,
        };
        let outcomes = reconcile_employee(&inputs, d(2), d(2), &SyncSettings::default());
        assert_eq!(outcomes, vec![DayOutcome::SkippedPosted(d(2))]);
    }

    #[test]
    fn manual_edits_keep_their_times() {
        let punches = vec![p(1, 2, 9, 30), p(2, 2, 17, 0)];
        let approvals = ApprovalSet::default();
        let mut row = DailyAttendance::blank(1, d(2), AttendanceSource::ManualEdit);
        row.time_in = Some(t(8, 0));
        row.time_out = Some(t(17, 0));
        let existing = vec![stored(&row, 4)];

        let inputs = EmployeeInputs {
            employee_id: 1,
            punches: &punches,
            schedules: &[],
            approvals: &approvals,
            holidays: &[],
            existing: &existing,
        };
        let rows = upserts(&reconcile_employee(&inputs, d(2), d(2), &SyncSettings::default()));
        assert_eq!(rows[0].time_in, Some(t(8, 0)));
        assert_eq!(rows[0].source, AttendanceSource::ManualEdit);
        assert_eq!(rows[0].late_hours, 0.0);
        assert_eq!(rows[0].worked_hours, 8.0);
    }

    #[test]
    fn approval_alone_creates_a_row() {
        let approvals = ApprovalSet {
            travel_orders: vec![TravelOrder {
                id: 1,
                employee_id: 1,
                date_from: d(2),
                date_to: d(3),
                official_business: false,
                approved_at: None,
            }],
            ..Default::default()
        };
        let inputs = EmployeeInputs {
            employee_id: 1,
            punches: &[],
            schedules: &[],
            approvals: &approvals,
            holidays: &[],
            existing: &[],
        };
        let rows = upserts(&reconcile_employee(&inputs, d(2), d(3), &SyncSettings::default()));
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.travel_order && r.worked_hours == 8.0));
    }

    #[test]
    fn worked_cancelled_rest_day_is_flagged() {
        // 2026-03-07 is a Saturday
        let punches = vec![p(1, 7, 8, 0), p(2, 7, 17, 0)];
        let approvals = ApprovalSet {
            cancel_restday: vec![CancelRestDay {
                id: 1,
                employee_id: 1,
                restday_date: d(7),
                approved_at: None,
            }],
            ..Default::default()
        };
        let inputs = EmployeeInputs {
            employee_id: 1,
            punches: &punches,
            schedules: &[],
            approvals: &approvals,
            holidays: &[],
            existing: &[],
        };
        let rows = upserts(&reconcile_employee(&inputs, d(7), d(7), &SyncSettings::default()));
        assert!(rows[0].ct);
        assert!(!rows[0].restday);
    }

    #[test]
    fn night_shift_leaves_next_day_time_in_alone() {
        // Monday night 22:00-06:00, Tuesday moved to 08:00-17:00
        let punches = vec![p(1, 2, 21, 55), p(2, 3, 6, 2), p(3, 3, 8, 0), p(4, 3, 17, 0)];
        let schedules = vec![night_schedule()];
        let approvals = ApprovalSet {
            change_schedule: vec![ChangeOffSchedule {
                id: 1,
                employee_id: 1,
                schedule_date: d(3),
                start_time: Some(t(8, 0)),
                end_time: Some(t(17, 0)),
                is_restday: false,
                approved_at: None,
            }],
            ..Default::default()
        };
        let inputs = EmployeeInputs {
            employee_id: 1,
            punches: &punches,
            schedules: &schedules,
            approvals: &approvals,
            holidays: &[],
            existing: &[],
        };

        let rows = upserts(&reconcile_employee(&inputs, d(2), d(3), &SyncSettings::default()));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].nextday_timeout, Some(t(6, 2)));
        assert_eq!(rows[0].worked_hours, 7.0);

        assert!(rows[1].cs);
        assert_eq!(rows[1].time_in, Some(t(8, 0)));
        assert_eq!(rows[1].time_out, Some(t(17, 0)));
        assert_eq!(rows[1].late_hours, 0.0);
        assert_eq!(rows[1].undertime_hours, 0.0);
    }

    #[test]
    fn cancelled_rest_day_without_punches_still_yields_a_row() {
        // Saturday turned into a working day, nobody showed up
        let approvals = ApprovalSet {
            cancel_restday: vec![CancelRestDay {
                id: 1,
                employee_id: 1,
                restday_date: d(7),
                approved_at: None,
            }],
            ..Default::default()
        };
        let inputs = EmployeeInputs {
            employee_id: 1,
            punches: &[],
            schedules: &[],
            approvals: &approvals,
            holidays: &[],
            existing: &[],
        };

        let rows = upserts(&reconcile_employee(&inputs, d(7), d(7), &SyncSettings::default()));
        assert_eq!(rows.len(), 1);
        assert!(rows[0].ct);
        assert!(!rows[0].restday);
        assert_eq!(rows[0].worked_hours, 0.0);
    }

    #[test]
    fn night_shift_time_in_after_midnight() {
        let punches = vec![p(1, 3, 0, 30), p(2, 3, 6, 5)];
        let schedules = vec![night_schedule()];
        let approvals = ApprovalSet::default();
        let inputs = EmployeeInputs {
            employee_id: 1,
            punches: &punches,
            schedules: &schedules,
            approvals: &approvals,
            holidays: &[],
            existing: &[],
        };

        let rows = upserts(&reconcile_employee(&inputs, d(2), d(2), &SyncSettings::default()));
        assert_eq!(rows[0].time_in, Some(t(0, 30)));
        assert_eq!(rows[0].nextday_timeout, Some(t(6, 5)));
        assert_eq!(rows[0].late_hours, 2.5);
        assert_eq!(rows[0].worked_hours, 4.5);
        assert_eq!(rows[0].undertime_hours, 0.0);
    }
}
