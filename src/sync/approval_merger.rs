use super::hours::{self, round2, to_hours};
use super::schedule::ResolvedDay;
use crate::model::approval::{ApprovalSet, LeaveType, winning};
use crate::model::holiday::{Holiday, multiplier_for};
use crate::model::processed_attendance::DailyAttendance;

/// Overwrites the approval-derived fields of a row whose hours are already
/// computed.
///
/// Precedence when records overlap: leave, then travel order, then
/// overtime, offset, retro and holiday, each of which only touches its own
/// fields. A paid leave shadows a travel order on the same day; an unpaid
/// one is recorded alongside it.
pub fn merge_approvals(
    row: &mut DailyAttendance,
    day: &ResolvedDay,
    approvals: &ApprovalSet,
    holidays: &[Holiday],
) {
    let (employee_id, date) = (row.employee_id, row.attendance_date);
    let scheduled_hours = to_hours(day.shift.scheduled_minutes(date));

    row.restday = day.restday;
    row.cs = day.cs;
    row.ct = day.ct;
    row.slvl = None;
    row.ob = false;
    row.travel_order = false;

    let leave = winning(&approvals.slvl, employee_id, date);
    if let Some(leave) = leave {
        row.slvl = Some(match leave.leave_type.parse::<LeaveType>() {
            Ok(kind) => kind.to_string(),
            Err(_) => leave.leave_type.clone(),
        });

        if leave.with_pay && !day.restday {
            if leave.half_day {
                let credit = round2(scheduled_hours / 2.0);
                row.worked_hours = round2((row.worked_hours + credit).min(scheduled_hours));
                absorb(row, credit);
            } else {
                credit_full_day(row, scheduled_hours);
            }
        }
    }

    let paid_leave = leave.is_some_and(|l| l.with_pay);
    if let Some(order) = winning(&approvals.travel_orders, employee_id, date).filter(|_| !paid_leave) {
        if order.official_business {
            row.ob = true;
        } else {
            row.travel_order = true;
        }
        if !day.restday {
            credit_full_day(row, scheduled_hours);
        }
    }

    row.overtime_hours = match winning(&approvals.overtime, employee_id, date) {
        Some(ot) => {
            let actual = if day.restday {
                row.worked_hours
            } else {
                to_hours(hours::minutes_beyond_shift(row, &day.shift))
            };
            round2(ot.hours.min(actual).max(0.0))
        }
        None => 0.0,
    };

    row.offset_hours = match winning(&approvals.offsets, employee_id, date) {
        Some(offset) => {
            absorb(row, offset.hours);
            offset.hours
        }
        None => 0.0,
    };

    row.retro_hours = winning(&approvals.retro, employee_id, date)
        .map(|r| r.hours)
        .unwrap_or(0.0);

    row.holiday_multiplier = multiplier_for(holidays, date);
}

fn credit_full_day(row: &mut DailyAttendance, scheduled_hours: f64) {
    row.worked_hours = scheduled_hours;
    row.late_hours = 0.0;
    row.undertime_hours = 0.0;
}

/// Credited hours cover lateness first, then undertime.
fn absorb(row: &mut DailyAttendance, credit: f64) {
    let from_late = credit.min(row.late_hours).max(0.0);
    row.late_hours = round2(row.late_hours - from_late);
    let rest = credit - from_late;
    row.undertime_hours = round2((row.undertime_hours - rest).max(0.0));
}
