use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashSet;

use super::schedule::{ShiftSchedule, next_day};
use crate::config::SyncSettings;
use crate::model::processed_attendance::DailyAttendance;
use crate::model::punch::Punch;

/// Punches of one employee-day split into their roles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PunchSegments {
    pub time_in: Option<NaiveDateTime>,
    pub break_out: Option<NaiveDateTime>,
    pub break_in: Option<NaiveDateTime>,
    pub time_out: Option<NaiveDateTime>,
    /// Every punch this day claimed, duplicates included
    pub consumed: Vec<u64>,
}

impl PunchSegments {
    /// Writes the segments as stored times; a time-out past midnight becomes
    /// the next-day time-out.
    pub fn apply_to(&self, row: &mut DailyAttendance) {
        let date = row.attendance_date;
        row.time_in = self.time_in.map(|t| t.time());
        row.break_out = self.break_out.map(|t| t.time());
        row.break_in = self.break_in.map(|t| t.time());
        row.time_out = None;
        row.nextday_timeout = None;
        row.night_shift = false;

        if let Some(out) = self.time_out {
            if out.date() > date {
                row.night_shift = true;
                row.nextday_timeout = Some(out.time());
            } else {
                row.time_out = Some(out.time());
            }
        }
    }
}

/// Groups the punches belonging to `date`.
///
/// `consumed` holds ids already claimed by the previous day (night-shift
/// carry-over); those are never reused. `next_start` is the start of the
/// following day's shift, if that day is worked: a night shift never reaches
/// past the midpoint between its end and that start.
pub fn group_punches(
    punches: &[Punch],
    date: NaiveDate,
    shift: &ShiftSchedule,
    next_start: Option<NaiveDateTime>,
    consumed: &HashSet<u64>,
    settings: &SyncSettings,
) -> PunchSegments {
    let (window_start, window_end) = if shift.is_night_shift() {
        let slack = Duration::hours(settings.night_window_hours);
        let end = shift.end_at(date);
        let limit = match next_start {
            Some(next) if next < end + slack => end + (next - end) / 2,
            _ => end + slack,
        };
        (shift.start_at(date) - slack, limit.max(end))
    } else {
        (date.and_time(NaiveTime::MIN), next_day(date).and_time(NaiveTime::MIN))
    };

    let mut candidates: Vec<Punch> = punches
        .iter()
        .filter(|p| !consumed.contains(&p.id))
        .filter(|p| p.at >= window_start && p.at < window_end)
        .copied()
        .collect();
    candidates.sort_by_key(|p| (p.at, p.id));

    let mut segments = PunchSegments {
        consumed: candidates.iter().map(|p| p.id).collect(),
        ..Default::default()
    };

    let kept = debounce(&candidates, Duration::minutes(settings.debounce_minutes));

    match kept.as_slice() {
        [] => {}
        [only] => {
            if only.at < shift.midpoint(date) {
                segments.time_in = Some(only.at);
            } else {
                segments.time_out = Some(only.at);
            }
        }
        [first, middle @ .., last] => {
            segments.time_in = Some(first.at);
            segments.time_out = Some(last.at);
            let (out, back) = pick_break(middle, shift.break_window(date));
            segments.break_out = out;
            segments.break_in = back;
        }
    }

    segments
}

fn debounce(sorted: &[Punch], gap: Duration) -> Vec<Punch> {
    let mut kept: Vec<Punch> = Vec::with_capacity(sorted.len());
    for p in sorted {
        match kept.last() {
            Some(prev) if p.at - prev.at < gap => {}
            _ => kept.push(*p),
        }
    }
    kept
}

/// Break-out is the intermediate punch nearest the scheduled break start,
/// break-in the later one nearest the scheduled break end.
fn pick_break(
    middle: &[Punch],
    window: Option<(NaiveDateTime, NaiveDateTime)>,
) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
    let Some((break_start, break_end)) = window else {
        return (middle.first().map(|p| p.at), middle.get(1).map(|p| p.at));
    };

    let Some((out_idx, out)) = middle
        .iter()
        .enumerate()
        .min_by_key(|(_, p)| (p.at - break_start).num_seconds().abs())
    else {
        return (None, None);
    };

    let back = middle[out_idx + 1..]
        .iter()
        .min_by_key(|p| (p.at - break_end).num_seconds().abs())
        .map(|p| p.at);

    (Some(out.at), back)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn p(id: u64, day: u32, h: u32, m: u32) -> Punch {
        Punch {
            id,
            at: d(day).and_time(t(h, m)),
        }
    }

    fn day_shift() -> ShiftSchedule {
        ShiftSchedule::fallback(&SyncSettings::default())
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
    fn four_punches_fill_every_segment() {
        let punches = vec![p(4, 5, 17, 3), p(1, 5, 7, 55), p(2, 5, 12, 2), p(3, 5, 12, 59)];
        let seg = group_punches(&punches, d(5), &day_shift(), None, &HashSet::new(), &SyncSettings::default());

        assert_eq!(seg.time_in, Some(d(5).and_time(t(7, 55))));
        assert_eq!(seg.break_out, Some(d(5).and_time(t(12, 2))));
        assert_eq!(seg.break_in, Some(d(5).and_time(t(12, 59))));
        assert_eq!(seg.time_out, Some(d(5).and_time(t(17, 3))));
        assert_eq!(seg.consumed.len(), 4);
    }

    #[test]
    fn double_tap_is_collapsed() {
        let punches = vec![p(1, 5, 8, 0), p(2, 5, 8, 1), p(3, 5, 17, 0)];
        let seg = group_punches(&punches, d(5), &day_shift(), None, &HashSet::new(), &SyncSettings::default());

        assert_eq!(seg.time_in, Some(d(5).and_time(t(8, 0))));
        assert_eq!(seg.break_out, None);
        assert_eq!(seg.time_out, Some(d(5).and_time(t(17, 0))));
        assert_eq!(seg.consumed, vec![1, 2, 3]);
    }

    #[test]
    fn stray_middle_punch_is_picked_by_time_of_day() {
        // 10:00 is a stray tap; 12:05 and 13:00 frame the break
        let punches = vec![p(1, 5, 8, 0), p(2, 5, 10, 0), p(3, 5, 12, 5), p(4, 5, 13, 0), p(5, 5, 17, 0)];
        let seg = group_punches(&punches, d(5), &day_shift(), None, &HashSet::new(), &SyncSettings::default());

        assert_eq!(seg.break_out, Some(d(5).and_time(t(12, 5))));
        assert_eq!(seg.break_in, Some(d(5).and_time(t(13, 0))));
    }

    #[test]
    fn single_punch_is_in_or_out_by_midpoint() {
        let settings = SyncSettings::default();
        let morning = group_punches(&[p(1, 5, 8, 10)], d(5), &day_shift(), None, &HashSet::new(), &settings);
        assert!(morning.time_in.is_some() && morning.time_out.is_none());

        let evening = group_punches(&[p(1, 5, 17, 10)], d(5), &day_shift(), None, &HashSet::new(), &settings);
        assert!(evening.time_in.is_none() && evening.time_out.is_some());
    }

    #[test]
    fn night_shift_carries_time_out_into_next_day() {
        let punches = vec![p(1, 5, 21, 50), p(2, 6, 2, 0), p(3, 6, 3, 0), p(4, 6, 6, 5)];
        let seg = group_punches(&punches, d(5), &night_shift(), None, &HashSet::new(), &SyncSettings::default());

        assert_eq!(seg.time_in, Some(d(5).and_time(t(21, 50))));
        assert_eq!(seg.time_out, Some(d(6).and_time(t(6, 5))));

        let mut row = DailyAttendance::blank(1, d(5), crate::model::processed_attendance::AttendanceSource::Sync);
        seg.apply_to(&mut row);
        assert!(row.night_shift);
        assert_eq!(row.time_out, None);
        assert_eq!(row.nextday_timeout, Some(t(6, 5)));
    }

    #[test]
    fn consumed_punches_are_not_reused() {
        let punches = vec![p(1, 5, 21, 50), p(2, 6, 6, 5), p(3, 6, 21, 55)];
        let settings = SyncSettings::default();

        let first = group_punches(&punches, d(5), &night_shift(), None, &HashSet::new(), &settings);
        let consumed: HashSet<u64> = first.consumed.iter().copied().collect();
        let second = group_punches(&punches, d(6), &night_shift(), None, &consumed, &settings);

        assert_eq!(second.time_in, Some(d(6).and_time(t(21, 55))));
        assert_eq!(second.time_out, None);
    }

    #[test]
    fn no_punches_gives_empty_segments() {
        let seg = group_punches(&[], d(5), &day_shift(), None, &HashSet::new(), &SyncSettings::default());
        assert_eq!(seg, PunchSegments::default());
    }

    #[test]
    fn night_window_stops_short_of_next_day_shift() {
        // Tuesday starts at 08:00, so the 07:58 tap is Tuesday's time-in
        let punches = vec![p(1, 2, 21, 55), p(2, 3, 6, 5), p(3, 3, 7, 58)];
        let tuesday_start = d(3).and_time(t(8, 0));

        let seg = group_punches(
            &punches,
            d(2),
            &night_shift(),
            Some(tuesday_start),
            &HashSet::new(),
            &SyncSettings::default(),
        );
        assert_eq!(seg.time_out, Some(d(3).and_time(t(6, 5))));
        assert_eq!(seg.consumed, vec![1, 2]);

        // with no shift following, the full window applies
        let open = group_punches(&punches, d(2), &night_shift(), None, &HashSet::new(), &SyncSettings::default());
        assert_eq!(open.time_out, Some(d(3).and_time(t(7, 58))));
    }
}
