pub mod approval;
pub mod employee;
pub mod holiday;
pub mod pay_item;
pub mod processed_attendance;
pub mod punch;
pub mod role;
pub mod schedule;
