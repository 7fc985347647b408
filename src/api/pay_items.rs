//! Benefits and deductions: amount edits and the per-cutoff post lock.

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use tracing::info;
use utoipa::ToSchema;

use crate::api::attendance::AffectedResponse;
use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::pay_item::{PayItem, PayItemKind};
use crate::utils::cutoff::Cutoff;

const PAY_ITEM_COLUMNS: &str =
    "id, employee_id, cutoff_start, cutoff_end, description, amount, is_default, posted";

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePayItem {
    #[schema(example = 1500.0)]
    pub amount: f64,
    #[schema(example = "Rice allowance", nullable = true)]
    pub description: Option<String>,
}

impl UpdatePayItem {
    fn validate(&self) -> Result<(), AppError> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(AppError::BadRequest("amount must be a non-negative number".into()));
        }
        if self.description.as_deref().is_some_and(|d| d.trim().is_empty()) {
            return Err(AppError::BadRequest("description cannot be blank".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CutoffBody {
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 1)]
    pub month: u32,
    pub cutoff: Cutoff,
    #[schema(example = 1000, nullable = true)]
    pub employee_id: Option<u64>,
}

async fn set_posted(
    pool: &MySqlPool,
    kind: PayItemKind,
    body: &CutoffBody,
    posted: bool,
) -> Result<u64, AppError> {
    let (start, end) = body.cutoff.period(body.year, body.month).ok_or_else(|| {
        AppError::BadRequest(format!("Invalid month {}-{}", body.year, body.month))
    })?;

    let mut qb = QueryBuilder::<MySql>::new(format!("UPDATE {} SET posted = ", kind.table()));
    qb.push_bind(posted)
        .push(" WHERE cutoff_start = ")
        .push_bind(start)
        .push(" AND cutoff_end = ")
        .push_bind(end)
        .push(" AND posted <> ")
        .push_bind(posted);
    if let Some(id) = body.employee_id {
        qb.push(" AND employee_id = ").push_bind(id);
    }

    Ok(qb.build().execute(pool).await?.rows_affected())
}

#[utoipa::path(
    put,
    path = "/api/{kind}/{id}",
    request_body = UpdatePayItem,
    params(
        ("kind" = String, Path, description = "benefits or deductions"),
        ("id" = u64, Path, description = "Row ID")
    ),
    responses(
        (status = 200, description = "Row updated", body = PayItem),
        (status = 404, description = "Row not found"),
        (status = 409, description = "Row is posted")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn update_pay_item(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<(PayItemKind, u64)>,
    body: web::Json<UpdatePayItem>,
) -> Result<HttpResponse, AppError> {
    auth.require_attendance_manager()?;
    body.validate()?;

    let (kind, id) = path.into_inner();
    let select = format!("SELECT {PAY_ITEM_COLUMNS} FROM {} WHERE id = ?", kind.table());

    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, PayItem>(&format!("{select} FOR UPDATE"))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", kind.label())))?;

    if current.posted {
        return Err(AppError::Conflict(format!("{} is posted", kind.label())));
    }

    let description = body
        .description
        .as_deref()
        .map(str::trim)
        .unwrap_or(current.description.as_str());

    sqlx::query(&format!(
        "UPDATE {} SET amount = ?, description = ? WHERE id = ?",
        kind.table()
    ))
    .bind(body.amount)
    .bind(description)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let updated = sqlx::query_as::<_, PayItem>(&select)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(
        user_id = auth.user_id,
        table = kind.table(),
        id,
        old_amount = current.amount,
        new_amount = updated.amount,
        "Pay item updated"
    );
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    post,
    path = "/api/{kind}/post",
    request_body = CutoffBody,
    params(("kind" = String, Path, description = "benefits or deductions")),
    responses(
        (status = 200, description = "Rows posted", body = AffectedResponse),
        (status = 400, description = "Invalid month"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn post_pay_items(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<PayItemKind>,
    body: web::Json<CutoffBody>,
) -> Result<HttpResponse, AppError> {
    auth.require_attendance_manager()?;
    let kind = path.into_inner();

    let affected = set_posted(pool.get_ref(), kind, &body, true).await?;
    info!(
        user_id = auth.user_id,
        table = kind.table(),
        year = body.year,
        month = body.month,
        cutoff = %body.cutoff,
        affected,
        "Pay items posted"
    );

    Ok(HttpResponse::Ok().json(AffectedResponse { affected }))
}

#[utoipa::path(
    post,
    path = "/api/{kind}/unpost",
    request_body = CutoffBody,
    params(("kind" = String, Path, description = "benefits or deductions")),
    responses(
        (status = 200, description = "Rows unlocked", body = AffectedResponse),
        (status = 400, description = "Invalid month"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn unpost_pay_items(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<PayItemKind>,
    body: web::Json<CutoffBody>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let kind = path.into_inner();

    let affected = set_posted(pool.get_ref(), kind, &body, false).await?;
    info!(
        user_id = auth.user_id,
        table = kind.table(),
        year = body.year,
        month = body.month,
        cutoff = %body.cutoff,
        affected,
        "Pay items unposted"
    );

    Ok(HttpResponse::Ok().json(AffectedResponse { affected }))
}
