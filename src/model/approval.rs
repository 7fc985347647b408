//! Approved records that the sync job merges into processed attendance.
//!
//! Only rows with `status = 'approved'` are ever loaded, so the structs carry
//! no status column.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use super::schedule::ChangeOffSchedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Common view over every approval table.
pub trait DatedApproval {
    fn employee_id(&self) -> u64;
    fn covers(&self, date: NaiveDate) -> bool;
    fn id(&self) -> u64;
    fn approved_at(&self) -> Option<NaiveDateTime>;
}

/// The record that wins for `date`: latest `approved_at`, then highest id.
pub fn winning<T: DatedApproval>(records: &[T], employee_id: u64, date: NaiveDate) -> Option<&T> {
    records
        .iter()
        .filter(|r| r.employee_id() == employee_id && r.covers(date))
        .max_by_key(|r| (r.approved_at(), r.id()))
}

macro_rules! dated_approval {
    ($ty:ty, range: $from:ident .. $to:ident) => {
        impl DatedApproval for $ty {
            fn employee_id(&self) -> u64 {
                self.employee_id
            }
            fn covers(&self, date: NaiveDate) -> bool {
                self.$from <= date && date <= self.$to
            }
            fn id(&self) -> u64 {
                self.id
            }
            fn approved_at(&self) -> Option<NaiveDateTime> {
                self.approved_at
            }
        }
    };
    ($ty:ty, on: $day:ident) => {
        impl DatedApproval for $ty {
            fn employee_id(&self) -> u64 {
                self.employee_id
            }
            fn covers(&self, date: NaiveDate) -> bool {
                self.$day == date
            }
            fn id(&self) -> u64 {
                self.id
            }
            fn approved_at(&self) -> Option<NaiveDateTime> {
                self.approved_at
            }
        }
    };
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TravelOrder {
    pub id: u64,
    pub employee_id: u64,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub official_business: bool,
    pub approved_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
pub enum LeaveType {
    #[strum(serialize = "SL")]
    Sick,
    #[strum(serialize = "VL")]
    Vacation,
}

/// Sick / vacation leave.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Slvl {
    pub id: u64,
    pub employee_id: u64,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    /// "SL" or "VL"
    pub leave_type: String,
    pub with_pay: bool,
    pub half_day: bool,
    pub approved_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Overtime {
    pub id: u64,
    pub employee_id: u64,
    pub overtime_date: NaiveDate,
    pub hours: f64,
    pub approved_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CancelRestDay {
    pub id: u64,
    pub employee_id: u64,
    pub restday_date: NaiveDate,
    pub approved_at: Option<NaiveDateTime>,
}

/// Retroactive pay adjustment for one day.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Retro {
    pub id: u64,
    pub employee_id: u64,
    pub retro_date: NaiveDate,
    pub hours: f64,
    pub approved_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Offset {
    pub id: u64,
    pub employee_id: u64,
    pub offset_date: NaiveDate,
    pub hours: f64,
    pub approved_at: Option<NaiveDateTime>,
}

dated_approval!(TravelOrder, range: date_from..date_to);
dated_approval!(Slvl, range: date_from..date_to);
dated_approval!(Overtime, on: overtime_date);
dated_approval!(CancelRestDay, on: restday_date);
dated_approval!(Retro, on: retro_date);
dated_approval!(Offset, on: offset_date);
dated_approval!(ChangeOffSchedule, on: schedule_date);

/// Every approved record relevant to a sync window.
#[derive(Debug, Clone, Default)]
pub struct ApprovalSet {
    pub travel_orders: Vec<TravelOrder>,
    pub slvl: Vec<Slvl>,
    pub overtime: Vec<Overtime>,
    pub cancel_restday: Vec<CancelRestDay>,
    pub retro: Vec<Retro>,
    pub offsets: Vec<Offset>,
    pub change_schedule: Vec<ChangeOffSchedule>,
}

impl ApprovalSet {
    /// Whether any record touches `date` for the employee.
    pub fn any_on(&self, employee_id: u64, date: NaiveDate) -> bool {
        winning(&self.travel_orders, employee_id, date).is_some()
            || winning(&self.slvl, employee_id, date).is_some()
            || winning(&self.overtime, employee_id, date).is_some()
            || winning(&self.retro, employee_id, date).is_some()
            || winning(&self.offsets, employee_id, date).is_some()
            || winning(&self.cancel_restday, employee_id, date).is_some()
            || winning(&self.change_schedule, employee_id, date).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn at(day: u32, h: u32) -> Option<NaiveDateTime> {
        d(day).and_hms_opt(h, 0, 0)
    }

    fn ot(id: u64, hours: f64, approved_at: Option<NaiveDateTime>) -> Overtime {
        Overtime {
            id,
            employee_id: 7,
            overtime_date: d(10),
            hours,
            approved_at,
        }
    }

    #[test]
    fn latest_approval_wins() {
        let records = vec![ot(1, 2.0, at(9, 10)), ot(2, 3.0, at(9, 8))];
        assert_eq!(winning(&records, 7, d(10)).unwrap().id, 1);
    }

    #[test]
    fn same_approval_time_falls_back_to_highest_id() {
        let records = vec![ot(5, 2.0, at(9, 10)), ot(4, 3.0, at(9, 10))];
        assert_eq!(winning(&records, 7, d(10)).unwrap().id, 5);
    }

    #[test]
    fn range_records_cover_inclusive_bounds() {
        let leave = Slvl {
            id: 1,
            employee_id: 7,
            date_from: d(10),
            date_to: d(12),
            leave_type: "VL".into(),
            with_pay: true,
            half_day: false,
            approved_at: None,
        };
        assert!(leave.covers(d(10)));
        assert!(leave.covers(d(12)));
        assert!(!leave.covers(d(13)));
        assert!(winning(&[leave], 8, d(10)).is_none());
    }

    #[test]
    fn leave_type_codes() {
        assert_eq!("SL".parse::<LeaveType>().unwrap(), LeaveType::Sick);
        assert_eq!(LeaveType::Vacation.as_ref(), "VL");
        assert_eq!(ApprovalStatus::Approved.as_ref(), "approved");
    }

    #[test]
    fn schedule_forms_count_as_approvals_on_their_day() {
        let cancelled = ApprovalSet {
            cancel_restday: vec![CancelRestDay {
                id: 1,
                employee_id: 7,
                restday_date: d(14),
                approved_at: None,
            }],
            ..Default::default()
        };
        assert!(cancelled.any_on(7, d(14)));
        assert!(!cancelled.any_on(7, d(15)));
        assert!(!ApprovalSet::default().any_on(7, d(14)));
    }
}

