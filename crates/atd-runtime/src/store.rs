//! Persistence seam for the orchestrator.

use std::sync::Arc;

use anyhow::Result;
use atd_execution::KillSwitch;
use atd_schemas::{
    DecisionRecord, OrderRecord, SessionRecord, SessionStatus, TradeRecord, TrailingMark,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

/// Everything a tick reads or writes durably.
///
/// # Contract
/// - `try_acquire_tick_lock` is acquire-or-skip: it returns `false` when
///   another holder has an unexpired lock OR fewer than `cadence_seconds`
///   have passed since `last_tick_at`. It never blocks.
/// - `insert_decision` and `insert_order` are idempotent on `decision_id`
///   and report whether a new row was written.
#[async_trait::async_trait]
pub trait TickStore: Send + Sync {
    async fn load_session(&self, session_id: Uuid) -> Result<Option<SessionRecord>>;

    async fn session_status(&self, session_id: Uuid) -> Result<Option<SessionStatus>>;

    async fn try_acquire_tick_lock(
        &self,
        session_id: Uuid,
        now: DateTime<Utc>,
        ttl_secs: i64,
    ) -> Result<bool>;

    async fn release_tick_lock(&self, session_id: Uuid) -> Result<()>;

    async fn touch_last_tick(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    async fn insert_decision(&self, rec: &DecisionRecord) -> Result<bool>;

    async fn fetch_decision(&self, decision_id: Uuid) -> Result<Option<DecisionRecord>>;

    async fn mark_decision_executed(&self, decision_id: Uuid) -> Result<()>;

    async fn insert_order(&self, rec: &OrderRecord) -> Result<bool>;

    async fn fetch_order_for_decision(&self, decision_id: Uuid) -> Result<Option<OrderRecord>>;

    async fn recent_trades(
        &self,
        session_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<TradeRecord>>;

    async fn load_trailing_mark(
        &self,
        session_id: Uuid,
        market: &str,
    ) -> Result<Option<TrailingMark>>;

    async fn save_trailing_mark(&self, session_id: Uuid, mark: &TrailingMark) -> Result<()>;

    async fn clear_trailing_mark(&self, session_id: Uuid, market: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgTickStore {
    pool: PgPool,
}

impl PgTickStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl TickStore for PgTickStore {
    async fn load_session(&self, session_id: Uuid) -> Result<Option<SessionRecord>> {
        atd_db::fetch_session(&self.pool, session_id).await
    }

    async fn session_status(&self, session_id: Uuid) -> Result<Option<SessionStatus>> {
        atd_db::session_status(&self.pool, session_id).await
    }

    async fn try_acquire_tick_lock(
        &self,
        session_id: Uuid,
        now: DateTime<Utc>,
        ttl_secs: i64,
    ) -> Result<bool> {
        atd_db::try_acquire_tick_lock(&self.pool, session_id, now, ttl_secs).await
    }

    async fn release_tick_lock(&self, session_id: Uuid) -> Result<()> {
        atd_db::release_tick_lock(&self.pool, session_id).await
    }

    async fn touch_last_tick(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        atd_db::touch_last_tick(&self.pool, session_id, at).await
    }

    async fn insert_decision(&self, rec: &DecisionRecord) -> Result<bool> {
        atd_db::insert_decision(&self.pool, rec).await
    }

    async fn fetch_decision(&self, decision_id: Uuid) -> Result<Option<DecisionRecord>> {
        atd_db::fetch_decision(&self.pool, decision_id).await
    }

    async fn mark_decision_executed(&self, decision_id: Uuid) -> Result<()> {
        atd_db::mark_decision_executed(&self.pool, decision_id).await
    }

    async fn insert_order(&self, rec: &OrderRecord) -> Result<bool> {
        atd_db::insert_order(&self.pool, rec).await
    }

    async fn fetch_order_for_decision(&self, decision_id: Uuid) -> Result<Option<OrderRecord>> {
        atd_db::fetch_order_for_decision(&self.pool, decision_id).await
    }

    async fn recent_trades(
        &self,
        session_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<TradeRecord>> {
        atd_db::recent_trades(&self.pool, session_id, since).await
    }

    async fn load_trailing_mark(
        &self,
        session_id: Uuid,
        market: &str,
    ) -> Result<Option<TrailingMark>> {
        atd_db::load_trailing_mark(&self.pool, session_id, market).await
    }

    async fn save_trailing_mark(&self, session_id: Uuid, mark: &TrailingMark) -> Result<()> {
        atd_db::save_trailing_mark(&self.pool, session_id, mark).await
    }

    async fn clear_trailing_mark(&self, session_id: Uuid, market: &str) -> Result<()> {
        atd_db::clear_trailing_mark(&self.pool, session_id, market).await
    }
}

// ---------------------------------------------------------------------------
// Kill switch
// ---------------------------------------------------------------------------

/// Kill switch that re-reads session status from the store on every call.
/// A failed read disarms.
pub struct StoreKillSwitch<S: TickStore> {
    store: Arc<S>,
}

impl<S: TickStore> StoreKillSwitch<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl<S: TickStore> KillSwitch for StoreKillSwitch<S> {
    async fn is_armed(&self, session_id: Uuid) -> bool {
        match self.store.session_status(session_id).await {
            Ok(Some(SessionStatus::Running)) => true,
            Ok(_) => false,
            Err(e) => {
                warn!(%session_id, error = %e, "kill switch read failed; treating as disarmed");
                false
            }
        }
    }
}
