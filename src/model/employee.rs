use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "Juan",
        "last_name": "Dela Cruz",
        "department_id": 10,
        "job_status": "regular",
        "biometric_id": "1001"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "Juan")]
    pub first_name: String,

    #[schema(example = "Dela Cruz")]
    pub last_name: String,

    #[schema(example = 10)]
    pub department_id: u64,

    #[schema(example = "regular")]
    pub job_status: String,

    /// Enrollment number the time clock reports for this employee
    #[schema(example = "1001", nullable = true)]
    pub biometric_id: Option<String>,
}

impl Employee {
    pub const SEPARATED: &'static str = "separated";
}
