use anyhow::Result;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppError;
use crate::model::schedule::TimeSchedule;
use crate::sync::repository;

/// employee id => schedule history, oldest first
pub static SCHEDULE_CACHE: Lazy<Cache<u64, Arc<Vec<TimeSchedule>>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(3600)) // 1h TTL
        .build()
});

/// Replace one employee's entry with freshly loaded schedules
pub async fn prime(employee_id: u64, schedules: Vec<TimeSchedule>) {
    SCHEDULE_CACHE.insert(employee_id, Arc::new(schedules)).await;
}

pub async fn invalidate(employee_id: u64) {
    SCHEDULE_CACHE.invalidate(&employee_id).await;
}

/// Cached schedules for one employee, loading them on a miss
pub async fn schedules_for(
    pool: &MySqlPool,
    employee_id: u64,
) -> Result<Arc<Vec<TimeSchedule>>, AppError> {
    SCHEDULE_CACHE
        .try_get_with(employee_id, async {
            repository::load_schedules(pool, Some(employee_id))
                .await
                .map(Arc::new)
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to load schedules: {e}")))
}

/// Load every schedule into the cache at startup
pub async fn warmup_schedule_cache(pool: &MySqlPool) -> Result<()> {
    let all = repository::load_schedules(pool, None).await?;
    let total = all.len();

    let mut current: Option<u64> = None;
    let mut batch: Vec<TimeSchedule> = Vec::new();
    for s in all {
        if let Some(id) = current.filter(|id| *id != s.employee_id) {
            prime(id, std::mem::take(&mut batch)).await;
        }
        current = Some(s.employee_id);
        batch.push(s);
    }
    if let Some(id) = current {
        prime(id, batch).await;
    }

    tracing::info!(total, "Schedule cache warmup complete");
    Ok(())
}
