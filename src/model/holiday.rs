use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Holiday {
    pub holiday_date: NaiveDate,
    pub name: String,
    /// "regular" or "special"
    pub kind: String,
}

impl Holiday {
    pub fn multiplier(&self) -> f64 {
        match self.kind.to_ascii_lowercase().as_str() {
            "regular" => 2.0,
            "special" => 1.3,
            _ => 1.0,
        }
    }
}

/// Highest multiplier among the holidays falling on `date`.
pub fn multiplier_for(holidays: &[Holiday], date: NaiveDate) -> f64 {
    holidays
        .iter()
        .filter(|h| h.holiday_date == date)
        .map(Holiday::multiplier)
        .fold(1.0, f64::max)
}
