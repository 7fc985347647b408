//! Attendance reconciliation: raw punches and approvals in, one
//! `processed_attendances` row per employee-day out.

pub mod approval_merger;
pub mod engine;
pub mod hours;
pub mod job;
pub mod punch_grouper;
pub mod repository;
pub mod schedule;
