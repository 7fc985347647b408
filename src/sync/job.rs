use chrono::{Duration, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use std::collections::HashMap;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use super::engine::{DayOutcome, EmployeeInputs, reconcile_employee};
use super::repository;
use crate::config::SyncSettings;
use crate::error::AppError;
use crate::model::approval::ApprovalSet;
use crate::model::holiday::Holiday;
use crate::model::processed_attendance::ProcessedAttendance;
use crate::model::punch::Punch;
use crate::model::schedule::TimeSchedule;
use crate::utils::cutoff::Cutoff;
use crate::utils::schedule_cache;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SyncRequest {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date_from: NaiveDate,
    #[schema(example = "2026-01-15", format = "date", value_type = String)]
    pub date_to: NaiveDate,
    /// Restrict the run to one employee
    #[schema(example = 1000, nullable = true)]
    pub employee_id: Option<u64>,
}

impl SyncRequest {
    pub fn validate(&self, settings: &SyncSettings) -> Result<(), AppError> {
        if self.date_from > self.date_to {
            return Err(AppError::BadRequest(
                "date_from cannot be after date_to".into(),
            ));
        }
        let days = (self.date_to - self.date_from).num_days() + 1;
        if days > settings.max_sync_days {
            return Err(AppError::BadRequest(format!(
                "Sync range of {days} days exceeds the limit of {}",
                settings.max_sync_days
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct SyncSummary {
    #[schema(example = 120)]
    pub employees: usize,
    #[schema(example = 1500)]
    pub upserted: usize,
    #[schema(example = 0)]
    pub skipped_posted: usize,
    #[schema(example = 300)]
    pub days_without_data: usize,
}

impl SyncSummary {
    fn record(&mut self, outcome: &DayOutcome) {
        match outcome {
            DayOutcome::Upsert(_) => self.upserted += 1,
            DayOutcome::SkippedPosted(_) => self.skipped_posted += 1,
            DayOutcome::NoData(_) => self.days_without_data += 1,
        }
    }
}

/// Loads, reconciles and writes back one date range.
#[instrument(
    name = "attendance_sync",
    skip(pool, settings, req),
    fields(from = %req.date_from, to = %req.date_to, employee_id = ?req.employee_id)
)]
pub async fn run_sync(
    pool: &MySqlPool,
    settings: &SyncSettings,
    req: &SyncRequest,
) -> Result<SyncSummary, AppError> {
    req.validate(settings)?;
    info!("Sync started");

    let (from, to) = (req.date_from, req.date_to);

    let employees = repository::load_employees(pool, req.employee_id).await?;
    if req.employee_id.is_some() && employees.is_empty() {
        return Err(AppError::NotFound("Employee not found or separated".into()));
    }

    // one day either side for night-shift carry-over
    let punches = repository::load_punches(
        pool,
        (from - Duration::days(1)).and_time(NaiveTime::MIN),
        (to + Duration::days(2)).and_time(NaiveTime::MIN),
    )
    .await?;
    let schedules = group_by_employee(repository::load_schedules(pool, req.employee_id).await?);
    let approvals = repository::load_approvals(pool, from - Duration::days(1), to, req.employee_id).await?;
    let holidays = repository::load_holidays(pool, from, to).await?;
    debug!(employees = employees.len(), "Inputs loaded");

    for (employee_id, list) in &schedules {
        schedule_cache::prime(*employee_id, list.clone()).await;
    }

    let mut tx = pool.begin().await?;
    let existing = group_rows(repository::lock_existing(&mut *tx, from, to, req.employee_id).await?);

    let mut summary = SyncSummary {
        employees: employees.len(),
        ..Default::default()
    };
    let mut rows = Vec::new();
    let empty_schedules: Vec<TimeSchedule> = Vec::new();
    let empty_rows: Vec<ProcessedAttendance> = Vec::new();

    for employee in &employees {
        let employee_punches: &[Punch] = match employee.biometric_id.as_deref() {
            Some(bio) => punches.get(bio).map(Vec::as_slice).unwrap_or(&[]),
            None => {
                debug!(employee_id = employee.id, "No biometric id, approvals only");
                &[]
            }
        };

        let inputs = EmployeeInputs {
            employee_id: employee.id,
            punches: employee_punches,
            schedules: schedules.get(&employee.id).unwrap_or(&empty_schedules),
            approvals: &approvals,
            holidays: &holidays,
            existing: existing.get(&employee.id).unwrap_or(&empty_rows),
        };

        for outcome in reconcile_employee(&inputs, from, to, settings) {
            summary.record(&outcome);
            if let DayOutcome::Upsert(row) = outcome {
                rows.push(row);
            }
        }
    }

    let affected = repository::upsert_rows(&mut *tx, &rows).await?;
    tx.commit().await?;

    info!(
        upserted = summary.upserted,
        skipped_posted = summary.skipped_posted,
        affected,
        "Sync finished"
    );
    Ok(summary)
}

/// Loads approvals etc. for one employee-day. Used by manual edits.
pub async fn load_day_context(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
) -> Result<(ApprovalSet, Vec<Holiday>), AppError> {
    let approvals = repository::load_approvals(pool, date, date, Some(employee_id)).await?;
    let holidays = repository::load_holidays(pool, date, date).await?;
    Ok((approvals, holidays))
}

/// Re-syncs the running cutoff every `interval_secs`.
pub fn spawn_periodic(pool: MySqlPool, settings: SyncSettings, interval_secs: u64) {
    if interval_secs == 0 {
        info!("Periodic sync disabled");
        return;
    }

    actix_web::rt::spawn(async move {
        let mut ticker = actix_web::rt::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;

            let today = Local::now().date_naive();
            let (cutoff_start, _) = Cutoff::period_of(today);
            let req = SyncRequest {
                date_from: cutoff_start,
                date_to: today,
                employee_id: None,
            };

            match run_sync(&pool, &settings, &req).await {
                Ok(summary) => debug!(?summary, "Periodic sync done"),
                Err(e) => error!(error = %e, "Periodic sync failed"),
            }
        }
    });

    info!(interval_secs, "Periodic sync scheduled");
}

fn group_by_employee(schedules: Vec<TimeSchedule>) -> HashMap<u64, Vec<TimeSchedule>> {
    let mut map: HashMap<u64, Vec<TimeSchedule>> = HashMap::new();
    for s in schedules {
        map.entry(s.employee_id).or_default().push(s);
    }
    map
}

fn group_rows(rows: Vec<ProcessedAttendance>) -> HashMap<u64, Vec<ProcessedAttendance>> {
    let mut map: HashMap<u64, Vec<ProcessedAttendance>> = HashMap::new();
    for r in rows {
        map.entry(r.employee_id).or_default().push(r);
    }
    map
}
