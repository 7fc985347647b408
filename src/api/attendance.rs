use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::{MySql, MySqlPool, QueryBuilder};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::AppError;
use crate::model::processed_attendance::{AttendanceSource, DailyAttendance, ProcessedAttendance};
use crate::model::punch::PunchUpload;
use crate::sync::engine::recompute_day;
use crate::sync::job::{self, SyncRequest, SyncSummary};
use crate::sync::repository::{self, PROCESSED_COLUMNS};
use crate::utils::cutoff::Cutoff;
use crate::utils::schedule_cache;

const MAX_PUNCH_BATCH: usize = 10_000;

/// A date range, given either directly or as a payroll cutoff.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PeriodBody {
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub date_from: Option<NaiveDate>,
    #[schema(example = "2026-01-15", format = "date", value_type = Option<String>)]
    pub date_to: Option<NaiveDate>,

    #[schema(example = 2026)]
    pub year: Option<i32>,
    #[schema(example = 1)]
    pub month: Option<u32>,
    pub cutoff: Option<Cutoff>,

    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
}

impl PeriodBody {
    pub fn resolve(&self) -> Result<(NaiveDate, NaiveDate), AppError> {
        match (self.date_from, self.date_to, self.year, self.month, self.cutoff) {
            (Some(from), Some(to), _, _, _) => {
                if from > to {
                    return Err(AppError::BadRequest("date_from cannot be after date_to".into()));
                }
                Ok((from, to))
            }
            (None, None, Some(year), Some(month), Some(cutoff)) => cutoff
                .period(year, month)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid month {year}-{month}"))),
            _ => Err(AppError::BadRequest(
                "Provide date_from and date_to, or year, month and cutoff".into(),
            )),
        }
    }

    fn sync_request(&self) -> Result<SyncRequest, AppError> {
        let (date_from, date_to) = self.resolve()?;
        Ok(SyncRequest {
            date_from,
            date_to,
            employee_id: self.employee_id,
        })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProcessedQuery {
    #[param(example = 1)]
    pub page: Option<u32>,
    #[param(example = 50)]
    pub per_page: Option<u32>,
    /// Ignored for employee accounts
    #[param(example = 1000)]
    pub employee_id: Option<u64>,
    #[param(value_type = Option<String>, format = Date, example = "2026-01-01")]
    pub date_from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date, example = "2026-01-15")]
    pub date_to: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct ProcessedListResponse {
    pub data: Vec<ProcessedAttendance>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Hand-entered times for one day. Omitted fields are cleared.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ManualEdit {
    #[schema(example = "08:02:00", value_type = Option<String>)]
    pub time_in: Option<NaiveTime>,
    #[schema(example = "12:01:00", value_type = Option<String>)]
    pub break_out: Option<NaiveTime>,
    #[schema(example = "12:58:00", value_type = Option<String>)]
    pub break_in: Option<NaiveTime>,
    #[schema(example = "17:05:00", value_type = Option<String>)]
    pub time_out: Option<NaiveTime>,
    /// Time-out on the following calendar day; marks the row as a night shift
    #[schema(example = json!(null), value_type = Option<String>)]
    pub nextday_timeout: Option<NaiveTime>,
}

impl ManualEdit {
    fn validate(&self) -> Result<(), AppError> {
        if self.break_out.is_some() != self.break_in.is_some() {
            return Err(AppError::BadRequest(
                "break_out and break_in must be given together".into(),
            ));
        }
        if self.time_out.is_some() && self.nextday_timeout.is_some() {
            return Err(AppError::BadRequest(
                "Use either time_out or nextday_timeout, not both".into(),
            ));
        }
        if let (Some(i), Some(o)) = (self.time_in, self.time_out) {
            if o < i {
                return Err(AppError::BadRequest(
                    "time_out before time_in; use nextday_timeout for night shifts".into(),
                ));
            }
        }
        Ok(())
    }

    fn into_row(self, stored: &ProcessedAttendance) -> DailyAttendance {
        DailyAttendance {
            time_in: self.time_in,
            break_out: self.break_out,
            break_in: self.break_in,
            time_out: self.time_out,
            night_shift: self.nextday_timeout.is_some(),
            nextday_timeout: self.nextday_timeout,
            ..DailyAttendance::blank(
                stored.employee_id,
                stored.attendance_date,
                AttendanceSource::ManualEdit,
            )
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AffectedResponse {
    #[schema(example = 42)]
    pub affected: u64,
}

#[derive(Serialize, ToSchema)]
pub struct PunchUploadResponse {
    #[schema(example = 120)]
    pub received: usize,
    /// Punches not already on file
    #[schema(example = 118)]
    pub accepted: u64,
}

#[utoipa::path(
    post,
    path = "/api/attendance/sync",
    request_body = PeriodBody,
    responses(
        (status = 200, description = "Sync finished", body = SyncSummary),
        (status = 400, description = "Bad range"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn sync(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    body: web::Json<PeriodBody>,
) -> Result<HttpResponse, AppError> {
    auth.require_attendance_manager()?;

    let req = body.sync_request()?;
    info!(user_id = auth.user_id, from = %req.date_from, to = %req.date_to, "Sync requested");

    let summary = job::run_sync(pool.get_ref(), &config.sync, &req).await?;
    Ok(HttpResponse::Ok().json(summary))
}

fn push_filters(qb: &mut QueryBuilder<'_, MySql>, employee_id: Option<u64>, q: &ProcessedQuery) {
    qb.push(" WHERE 1 = 1");
    if let Some(id) = employee_id {
        qb.push(" AND employee_id = ").push_bind(id);
    }
    if let Some(from) = q.date_from {
        qb.push(" AND attendance_date >= ").push_bind(from);
    }
    if let Some(to) = q.date_to {
        qb.push(" AND attendance_date <= ").push_bind(to);
    }
}

/// Page, page size and row offset. The offset is widened so large pages
/// cannot overflow.
fn page_window(query: &ProcessedQuery) -> (u32, u32, u64) {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(50).clamp(1, 500);
    (page, per_page, u64::from(page - 1) * u64::from(per_page))
}

#[utoipa::path(
    get,
    path = "/api/attendance/processed",
    params(ProcessedQuery),
    responses(
        (status = 200, body = ProcessedListResponse),
        (status = 403, description = "Employee account without a profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_processed(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ProcessedQuery>,
) -> Result<HttpResponse, AppError> {
    let (page, per_page, offset) = page_window(&query);

    // employees only ever see their own days
    let employee_id = if auth.role.manages_attendance() {
        query.employee_id
    } else {
        Some(
            auth.employee_id
                .ok_or_else(|| AppError::Forbidden("No employee profile".into()))?,
        )
    };

    let mut count_qb = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM processed_attendances");
    push_filters(&mut count_qb, employee_id, &query);
    let total: i64 = count_qb
        .build_query_scalar()
        .fetch_one(pool.get_ref())
        .await?;

    let mut qb = QueryBuilder::<MySql>::new(format!(
        "SELECT {PROCESSED_COLUMNS} FROM processed_attendances"
    ));
    push_filters(&mut qb, employee_id, &query);
    qb.push(" ORDER BY attendance_date DESC, employee_id LIMIT ")
        .push_bind(per_page)
        .push(" OFFSET ")
        .push_bind(offset);

    let data = qb
        .build_query_as::<ProcessedAttendance>()
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(ProcessedListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    put,
    path = "/api/attendance/processed/{id}",
    request_body = ManualEdit,
    params(("id", description = "Processed attendance ID")),
    responses(
        (status = 200, description = "Row recomputed", body = ProcessedAttendance),
        (status = 400, description = "Invalid times"),
        (status = 404, description = "Row not found"),
        (status = 409, description = "Row is posted")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(name = "attendance_manual_edit", skip(auth, pool, config, body), fields(user_id = auth.user_id))]
pub async fn edit_processed(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    body: web::Json<ManualEdit>,
) -> Result<HttpResponse, AppError> {
    auth.require_attendance_manager()?;
    body.validate()?;

    let id = path.into_inner();
    let mut tx = pool.begin().await?;

    let stored = repository::find_row_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attendance row not found".into()))?;
    if stored.posted {
        return Err(AppError::Conflict("Attendance row is posted".into()));
    }

    // schedules may have changed since the last sync
    schedule_cache::invalidate(stored.employee_id).await;
    let schedules = schedule_cache::schedules_for(pool.get_ref(), stored.employee_id).await?;
    let (approvals, holidays) =
        job::load_day_context(pool.get_ref(), stored.employee_id, stored.attendance_date).await?;

    let row = recompute_day(
        body.into_inner().into_row(&stored),
        &schedules,
        &approvals,
        &holidays,
        &config.sync,
    );
    repository::update_row(&mut *tx, id, &row).await?;
    tx.commit().await?;

    info!(
        id,
        employee_id = row.employee_id,
        date = %row.attendance_date,
        worked_hours = row.worked_hours,
        "Attendance row edited"
    );

    let updated = repository::find_row(pool.get_ref(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attendance row not found".into()))?;
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    post,
    path = "/api/attendance/processed/post",
    request_body = PeriodBody,
    responses(
        (status = 200, description = "Rows posted", body = AffectedResponse),
        (status = 400, description = "Bad range"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn post_processed(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<PeriodBody>,
) -> Result<HttpResponse, AppError> {
    auth.require_attendance_manager()?;
    let (from, to) = body.resolve()?;

    let affected = repository::set_posted(pool.get_ref(), from, to, body.employee_id, true).await?;
    info!(user_id = auth.user_id, %from, %to, affected, "Attendance posted");

    Ok(HttpResponse::Ok().json(AffectedResponse { affected }))
}

#[utoipa::path(
    post,
    path = "/api/attendance/processed/unpost",
    request_body = PeriodBody,
    responses(
        (status = 200, description = "Rows unlocked", body = AffectedResponse),
        (status = 400, description = "Bad range"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn unpost_processed(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<PeriodBody>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let (from, to) = body.resolve()?;

    let affected = repository::set_posted(pool.get_ref(), from, to, body.employee_id, false).await?;
    info!(user_id = auth.user_id, %from, %to, affected, "Attendance unposted");

    Ok(HttpResponse::Ok().json(AffectedResponse { affected }))
}

#[utoipa::path(
    post,
    path = "/api/attendance/punches",
    request_body = Vec<PunchUpload>,
    responses(
        (status = 200, description = "Punches stored", body = PunchUploadResponse),
        (status = 400, description = "Empty or oversized batch"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn upload_punches(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<Vec<PunchUpload>>,
) -> Result<HttpResponse, AppError> {
    auth.require_attendance_manager()?;

    let punches = body.into_inner();
    if punches.is_empty() {
        return Err(AppError::BadRequest("No punches supplied".into()));
    }
    if punches.len() > MAX_PUNCH_BATCH {
        return Err(AppError::BadRequest(format!(
            "At most {MAX_PUNCH_BATCH} punches per request"
        )));
    }
    if punches.iter().any(|p| p.biometric_id.trim().is_empty()) {
        return Err(AppError::BadRequest("biometric_id cannot be empty".into()));
    }

    let accepted = repository::insert_punches(pool.get_ref(), &punches).await?;
    info!(received = punches.len(), accepted, "Punches uploaded");

    Ok(HttpResponse::Ok().json(PunchUploadResponse {
        received: punches.len(),
        accepted,
    }))
}
