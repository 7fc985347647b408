//! SQL access for reconciliation and the attendance endpoints.
//! Runtime-checked queries only.

use chrono::{NaiveDate, NaiveDateTime};
use futures_util::TryStreamExt;
use sqlx::mysql::MySqlRow;
use sqlx::{FromRow, MySql, MySqlConnection, MySqlPool, QueryBuilder};
use std::collections::HashMap;

use crate::model::approval::{ApprovalSet, ApprovalStatus};
use crate::model::employee::Employee;
use crate::model::holiday::Holiday;
use crate::model::processed_attendance::{DailyAttendance, ProcessedAttendance};
use crate::model::punch::{Punch, PunchUpload, RawPunch};
use crate::model::schedule::TimeSchedule;

pub const PROCESSED_COLUMNS: &str = "id, employee_id, attendance_date, time_in, break_out, break_in, \
     time_out, night_shift, nextday_timeout, worked_hours, late_hours, undertime_hours, \
     overtime_hours, ct, cs, restday, ob, travel_order, slvl, holiday_multiplier, \
     retro_hours, offset_hours, source, posted";

const UPSERT_CHUNK: usize = 500;

pub async fn load_employees(
    pool: &MySqlPool,
    employee_id: Option<u64>,
) -> Result<Vec<Employee>, sqlx::Error> {
    let mut qb = QueryBuilder::<MySql>::new(
        "SELECT id, employee_code, first_name, last_name, department_id, job_status, biometric_id \
         FROM employees WHERE job_status <> ",
    );
    qb.push_bind(Employee::SEPARATED);
    if let Some(id) = employee_id {
        qb.push(" AND id = ").push_bind(id);
    }
    qb.push(" ORDER BY id");

    qb.build_query_as::<Employee>().fetch_all(pool).await
}

/// Punches in `[from, to)` keyed by biometric id, streamed to keep memory flat.
pub async fn load_punches(
    pool: &MySqlPool,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Result<HashMap<String, Vec<Punch>>, sqlx::Error> {
    let mut stream = sqlx::query_as::<_, RawPunch>(
        r#"
        SELECT id, biometric_id, punch_time, device_serial
        FROM attendance_punches
        WHERE punch_time >= ? AND punch_time < ?
        ORDER BY punch_time, id
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch(pool);

    let mut by_device_id: HashMap<String, Vec<Punch>> = HashMap::new();
    let mut total = 0usize;
    while let Some(raw) = stream.try_next().await? {
        total += 1;
        by_device_id
            .entry(raw.biometric_id.clone())
            .or_default()
            .push(Punch::from(&raw));
    }

    tracing::debug!(total, employees = by_device_id.len(), "Loaded punches");
    Ok(by_device_id)
}

pub async fn load_schedules(
    pool: &MySqlPool,
    employee_id: Option<u64>,
) -> Result<Vec<TimeSchedule>, sqlx::Error> {
    let mut qb = QueryBuilder::<MySql>::new(
        "SELECT id, employee_id, effective_from, start_time, end_time, break_start, break_end, rest_days \
         FROM time_schedules",
    );
    if let Some(id) = employee_id {
        qb.push(" WHERE employee_id = ").push_bind(id);
    }
    qb.push(" ORDER BY employee_id, effective_from");

    qb.build_query_as::<TimeSchedule>().fetch_all(pool).await
}

enum DateFilter {
    /// Record spans `from_col..=to_col`
    Range(&'static str, &'static str),
    /// Record sits on one date column
    Day(&'static str),
}

async fn fetch_approved<T>(
    pool: &MySqlPool,
    table: &str,
    columns: &str,
    filter: DateFilter,
    from: NaiveDate,
    to: NaiveDate,
    employee_id: Option<u64>,
) -> Result<Vec<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    let mut qb = QueryBuilder::<MySql>::new(format!("SELECT {columns} FROM {table} WHERE status = "));
    qb.push_bind(ApprovalStatus::Approved.as_ref());

    match filter {
        DateFilter::Range(from_col, to_col) => {
            qb.push(format!(" AND {from_col} <= ")).push_bind(to);
            qb.push(format!(" AND {to_col} >= ")).push_bind(from);
        }
        DateFilter::Day(col) => {
            qb.push(format!(" AND {col} BETWEEN "))
                .push_bind(from)
                .push(" AND ")
                .push_bind(to);
        }
    }

    if let Some(id) = employee_id {
        qb.push(" AND employee_id = ").push_bind(id);
    }

    qb.build_query_as::<T>().fetch_all(pool).await
}

/// All approved records touching `from..=to`.
pub async fn load_approvals(
    pool: &MySqlPool,
    from: NaiveDate,
    to: NaiveDate,
    employee_id: Option<u64>,
) -> Result<ApprovalSet, sqlx::Error> {
    Ok(ApprovalSet {
        travel_orders: fetch_approved(
            pool,
            "travel_orders",
            "id, employee_id, date_from, date_to, official_business, approved_at",
            DateFilter::Range("date_from", "date_to"),
            from,
            to,
            employee_id,
        )
        .await?,
        slvl: fetch_approved(
            pool,
            "slvls",
            "id, employee_id, date_from, date_to, leave_type, with_pay, half_day, approved_at",
            DateFilter::Range("date_from", "date_to"),
            from,
            to,
            employee_id,
        )
        .await?,
        overtime: fetch_approved(
            pool,
            "overtimes",
            "id, employee_id, overtime_date, hours, approved_at",
            DateFilter::Day("overtime_date"),
            from,
            to,
            employee_id,
        )
        .await?,
        cancel_restday: fetch_approved(
            pool,
            "cancel_rest_days",
            "id, employee_id, restday_date, approved_at",
            DateFilter::Day("restday_date"),
            from,
            to,
            employee_id,
        )
        .await?,
        retro: fetch_approved(
            pool,
            "retros",
            "id, employee_id, retro_date, hours, approved_at",
            DateFilter::Day("retro_date"),
            from,
            to,
            employee_id,
        )
        .await?,
        offsets: fetch_approved(
            pool,
            "offsets",
            "id, employee_id, offset_date, hours, approved_at",
            DateFilter::Day("offset_date"),
            from,
            to,
            employee_id,
        )
        .await?,
        change_schedule: fetch_approved(
            pool,
            "change_off_schedules",
            "id, employee_id, schedule_date, start_time, end_time, is_restday, approved_at",
            DateFilter::Day("schedule_date"),
            from,
            to,
            employee_id,
        )
        .await?,
    })
}

pub async fn load_holidays(
    pool: &MySqlPool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Holiday>, sqlx::Error> {
    sqlx::query_as::<_, Holiday>(
        r#"
        SELECT holiday_date, name, kind
        FROM holidays
        WHERE holiday_date BETWEEN ? AND ?
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

/// Existing rows of the range, locked until the surrounding transaction ends.
pub async fn lock_existing(
    conn: &mut MySqlConnection,
    from: NaiveDate,
    to: NaiveDate,
    employee_id: Option<u64>,
) -> Result<Vec<ProcessedAttendance>, sqlx::Error> {
    let mut qb = QueryBuilder::<MySql>::new(format!(
        "SELECT {PROCESSED_COLUMNS} FROM processed_attendances WHERE attendance_date BETWEEN "
    ));
    qb.push_bind(from).push(" AND ").push_bind(to);
    if let Some(id) = employee_id {
        qb.push(" AND employee_id = ").push_bind(id);
    }
    qb.push(" FOR UPDATE");

    qb.build_query_as::<ProcessedAttendance>().fetch_all(conn).await
}

/// Inserts or overwrites rows keyed on (employee_id, attendance_date).
pub async fn upsert_rows(
    conn: &mut MySqlConnection,
    rows: &[DailyAttendance],
) -> Result<u64, sqlx::Error> {
    let mut affected = 0;

    for chunk in rows.chunks(UPSERT_CHUNK) {
        let mut qb = QueryBuilder::<MySql>::new(
            "INSERT INTO processed_attendances (employee_id, attendance_date, time_in, break_out, \
             break_in, time_out, night_shift, nextday_timeout, worked_hours, late_hours, \
             undertime_hours, overtime_hours, ct, cs, restday, ob, travel_order, slvl, \
             holiday_multiplier, retro_hours, offset_hours, source) ",
        );

        qb.push_values(chunk, |mut b, r| {
            b.push_bind(r.employee_id)
                .push_bind(r.attendance_date)
                .push_bind(r.time_in)
                .push_bind(r.break_out)
                .push_bind(r.break_in)
                .push_bind(r.time_out)
                .push_bind(r.night_shift)
                .push_bind(r.nextday_timeout)
                .push_bind(r.worked_hours)
                .push_bind(r.late_hours)
                .push_bind(r.undertime_hours)
                .push_bind(r.overtime_hours)
                .push_bind(r.ct)
                .push_bind(r.cs)
                .push_bind(r.restday)
                .push_bind(r.ob)
                .push_bind(r.travel_order)
                .push_bind(r.slvl.clone())
                .push_bind(r.holiday_multiplier)
                .push_bind(r.retro_hours)
                .push_bind(r.offset_hours)
                .push_bind(r.source.as_ref().to_string());
        });

        qb.push(
            " ON DUPLICATE KEY UPDATE \
             time_in = VALUES(time_in), break_out = VALUES(break_out), \
             break_in = VALUES(break_in), time_out = VALUES(time_out), \
             night_shift = VALUES(night_shift), nextday_timeout = VALUES(nextday_timeout), \
             worked_hours = VALUES(worked_hours), late_hours = VALUES(late_hours), \
             undertime_hours = VALUES(undertime_hours), overtime_hours = VALUES(overtime_hours), \
             ct = VALUES(ct), cs = VALUES(cs), restday = VALUES(restday), ob = VALUES(ob), \
             travel_order = VALUES(travel_order), slvl = VALUES(slvl), \
             holiday_multiplier = VALUES(holiday_multiplier), retro_hours = VALUES(retro_hours), \
             offset_hours = VALUES(offset_hours), source = VALUES(source)",
        );

        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(affected)
}

pub async fn find_row_for_update(
    conn: &mut MySqlConnection,
    id: u64,
) -> Result<Option<ProcessedAttendance>, sqlx::Error> {
    sqlx::query_as::<_, ProcessedAttendance>(&format!(
        "SELECT {PROCESSED_COLUMNS} FROM processed_attendances WHERE id = ? FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn find_row(
    pool: &MySqlPool,
    id: u64,
) -> Result<Option<ProcessedAttendance>, sqlx::Error> {
    sqlx::query_as::<_, ProcessedAttendance>(&format!(
        "SELECT {PROCESSED_COLUMNS} FROM processed_attendances WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Overwrites every time and derived column of one unposted row.
pub async fn update_row(
    conn: &mut MySqlConnection,
    id: u64,
    r: &DailyAttendance,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE processed_attendances
        SET time_in = ?, break_out = ?, break_in = ?, time_out = ?,
            night_shift = ?, nextday_timeout = ?,
            worked_hours = ?, late_hours = ?, undertime_hours = ?, overtime_hours = ?,
            ct = ?, cs = ?, restday = ?, ob = ?, travel_order = ?, slvl = ?,
            holiday_multiplier = ?, retro_hours = ?, offset_hours = ?, source = ?
        WHERE id = ? AND posted = 0
        "#,
    )
    .bind(r.time_in)
    .bind(r.break_out)
    .bind(r.break_in)
    .bind(r.time_out)
    .bind(r.night_shift)
    .bind(r.nextday_timeout)
    .bind(r.worked_hours)
    .bind(r.late_hours)
    .bind(r.undertime_hours)
    .bind(r.overtime_hours)
    .bind(r.ct)
    .bind(r.cs)
    .bind(r.restday)
    .bind(r.ob)
    .bind(r.travel_order)
    .bind(r.slvl.as_deref())
    .bind(r.holiday_multiplier)
    .bind(r.retro_hours)
    .bind(r.offset_hours)
    .bind(r.source.as_ref())
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Flips `posted` on every row of the range whose flag differs.
pub async fn set_posted(
    pool: &MySqlPool,
    from: NaiveDate,
    to: NaiveDate,
    employee_id: Option<u64>,
    posted: bool,
) -> Result<u64, sqlx::Error> {
    let mut qb = QueryBuilder::<MySql>::new("UPDATE processed_attendances SET posted = ");
    qb.push_bind(posted)
        .push(" WHERE attendance_date BETWEEN ")
        .push_bind(from)
        .push(" AND ")
        .push_bind(to)
        .push(" AND posted <> ")
        .push_bind(posted);
    if let Some(id) = employee_id {
        qb.push(" AND employee_id = ").push_bind(id);
    }

    Ok(qb.build().execute(pool).await?.rows_affected())
}

/// Stores device punches; exact duplicates are skipped by the unique key.
pub async fn insert_punches(pool: &MySqlPool, punches: &[PunchUpload]) -> Result<u64, sqlx::Error> {
    let mut accepted = 0;

    for chunk in punches.chunks(UPSERT_CHUNK) {
        let mut qb = QueryBuilder::<MySql>::new(
            "INSERT IGNORE INTO attendance_punches (biometric_id, punch_time, device_serial) ",
        );
        qb.push_values(chunk, |mut b, p| {
            b.push_bind(p.biometric_id.trim().to_string())
                .push_bind(p.punch_time)
                .push_bind(p.device_serial.clone());
        });
        accepted += qb.build().execute(pool).await?.rows_affected();
    }

    Ok(accepted)
}
