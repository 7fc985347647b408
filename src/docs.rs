use crate::api::attendance::{
    AffectedResponse, ManualEdit, PeriodBody, ProcessedListResponse, PunchUploadResponse,
};
use crate::api::pay_items::{CutoffBody, UpdatePayItem};
use crate::model::pay_item::PayItem;
use crate::model::processed_attendance::ProcessedAttendance;
use crate::model::punch::PunchUpload;
use crate::models::{LoginReqDto, TokenPair};
use crate::sync::job::SyncSummary;
use crate::utils::cutoff::Cutoff;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Attendance API",
        version = "1.0.0",
        description = r#"
## Attendance reconciliation and payroll posting

Turns raw biometric punches, work schedules and approved forms into one
processed attendance row per employee per day.

### Key Features
- **Biometric ingestion**: batch upload of device punches, duplicates ignored
- **Sync**: reconcile a date range or a payroll cutoff (1st: days 1-15, 2nd: 16-end)
- **Manual edits**: correct times by hand; hours are recomputed from the schedule
- **Posting**: lock attendance, benefits and deductions for payroll

### Security
Every `/api` endpoint needs a JWT access token.
Sync, edits and posting need an **HR**, **Payroll** or **Admin** role;
un-posting is **Admin** only.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::attendance::sync,
        crate::api::attendance::list_processed,
        crate::api::attendance::edit_processed,
        crate::api::attendance::post_processed,
        crate::api::attendance::unpost_processed,
        crate::api::attendance::upload_punches,

        crate::api::pay_items::update_pay_item,
        crate::api::pay_items::post_pay_items,
        crate::api::pay_items::unpost_pay_items
    ),
    components(
        schemas(
            LoginReqDto,
            TokenPair,
            PeriodBody,
            Cutoff,
            SyncSummary,
            ProcessedAttendance,
            ProcessedListResponse,
            ManualEdit,
            AffectedResponse,
            PunchUpload,
            PunchUploadResponse,
            PayItem,
            UpdatePayItem,
            CutoffBody
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token rotation"),
        (name = "Attendance", description = "Punch ingestion, sync and processed attendance"),
        (name = "Payroll", description = "Benefits and deductions posting"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
