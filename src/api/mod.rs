pub mod attendance;
pub mod pay_items;
