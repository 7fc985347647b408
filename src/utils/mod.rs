pub mod cutoff;
pub mod schedule_cache;
