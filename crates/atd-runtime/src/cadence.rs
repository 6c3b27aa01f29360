use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Whether a session whose last tick ran at `last_tick_at` may tick at `now`.
///
/// Never ticked (null, or the epoch) always qualifies. Otherwise at least
/// `cadence_seconds` must have elapsed; exactly `cadence_seconds` is enough.
pub fn is_tick_due(
    last_tick_at: Option<DateTime<Utc>>,
    cadence_seconds: i64,
    now: DateTime<Utc>,
) -> bool {
    match last_tick_at {
        None => true,
        Some(t) if t.timestamp() <= 0 => true,
        Some(t) => (now - t).num_seconds() >= cadence_seconds,
    }
}

/// Cadence bucket `now` falls in. Two invocations in the same bucket are the
/// same tick.
pub fn tick_slot(now: DateTime<Utc>, cadence_seconds: i64) -> i64 {
    now.timestamp().div_euclid(cadence_seconds.max(1))
}

/// Deterministic decision id for one (session, tick slot). A retried or
/// duplicated invocation derives the same id and finds the persisted rows.
pub fn decision_id_for(session_id: Uuid, now: DateTime<Utc>, cadence_seconds: i64) -> Uuid {
    let slot = tick_slot(now, cadence_seconds);
    Uuid::new_v5(&session_id, format!("tick:{slot}").as_bytes())
}
