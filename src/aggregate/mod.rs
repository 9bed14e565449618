//! Presence aggregation: daily records, monthly rollups and navigation.

pub mod daily;
pub mod monthly;
pub mod navigation;

pub use daily::{compute_daily, validate_sessions};
pub use monthly::{
    build_month_details, compute_employee_monthly_detail, compute_monthly, summarize_month, trim_active_range,
};
pub use navigation::{navigate_day, navigate_month};
