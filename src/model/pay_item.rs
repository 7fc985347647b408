use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Benefits and deductions share one shape and one posting lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayItemKind {
    Benefits,
    Deductions,
}

impl PayItemKind {
    pub fn table(&self) -> &'static str {
        match self {
            PayItemKind::Benefits => "benefits",
            PayItemKind::Deductions => "deductions",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PayItemKind::Benefits => "Benefit",
            PayItemKind::Deductions => "Deduction",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PayItem {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub cutoff_start: NaiveDate,
    #[schema(example = "2026-01-15", format = "date", value_type = String)]
    pub cutoff_end: NaiveDate,
    #[schema(example = "Rice allowance")]
    pub description: String,
    #[schema(example = 1500.0)]
    pub amount: f64,
    pub is_default: bool,
    pub posted: bool,
}
