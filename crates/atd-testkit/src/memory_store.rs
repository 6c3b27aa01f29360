use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use atd_runtime::{is_tick_due, TickStore};
use atd_schemas::{
    DecisionRecord, OrderRecord, SessionRecord, SessionStatus, TradeRecord, TrailingMark,
};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    sessions: HashMap<Uuid, SessionRecord>,
    locks: HashMap<Uuid, DateTime<Utc>>,
    decisions: BTreeMap<Uuid, DecisionRecord>,
    /// Keyed by decision id: one order per decision.
    orders: BTreeMap<Uuid, OrderRecord>,
    marks: HashMap<(Uuid, String), TrailingMark>,
}

/// `TickStore` over plain maps, with the same idempotency and lock semantics
/// as the Postgres store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| anyhow!("memory store mutex poisoned"))
    }

    pub fn put_session(&self, s: SessionRecord) -> Result<()> {
        self.tables()?.sessions.insert(s.session_id, s);
        Ok(())
    }

    pub fn set_status(&self, session_id: Uuid, status: SessionStatus) -> Result<()> {
        let mut t = self.tables()?;
        let s = t
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| anyhow!("session not found: {session_id}"))?;
        s.status = status;
        Ok(())
    }

    pub fn session(&self, session_id: Uuid) -> Option<SessionRecord> {
        self.tables().ok()?.sessions.get(&session_id).cloned()
    }

    pub fn decisions(&self) -> Vec<DecisionRecord> {
        self.tables()
            .map(|t| t.decisions.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn orders(&self) -> Vec<OrderRecord> {
        self.tables()
            .map(|t| t.orders.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn lock_held(&self, session_id: Uuid) -> bool {
        self.tables()
            .map(|t| t.locks.contains_key(&session_id))
            .unwrap_or(false)
    }

    pub fn trailing_mark(&self, session_id: Uuid, market: &str) -> Option<TrailingMark> {
        self.tables()
            .ok()?
            .marks
            .get(&(session_id, market.to_string()))
            .cloned()
    }
}

#[async_trait::async_trait]
impl TickStore for MemoryStore {
    async fn load_session(&self, session_id: Uuid) -> Result<Option<SessionRecord>> {
        Ok(self.tables()?.sessions.get(&session_id).cloned())
    }

    async fn session_status(&self, session_id: Uuid) -> Result<Option<SessionStatus>> {
        Ok(self.tables()?.sessions.get(&session_id).map(|s| s.status))
    }

    async fn try_acquire_tick_lock(
        &self,
        session_id: Uuid,
        now: DateTime<Utc>,
        ttl_secs: i64,
    ) -> Result<bool> {
        let mut t = self.tables()?;
        let Some(s) = t.sessions.get(&session_id) else {
            return Ok(false);
        };
        if !is_tick_due(s.last_tick_at, s.cadence_seconds, now) {
            return Ok(false);
        }
        if let Some(until) = t.locks.get(&session_id) {
            if *until > now {
                return Ok(false);
            }
        }
        t.locks.insert(session_id, now + Duration::seconds(ttl_secs));
        Ok(true)
    }

    async fn release_tick_lock(&self, session_id: Uuid) -> Result<()> {
        self.tables()?.locks.remove(&session_id);
        Ok(())
    }

    async fn touch_last_tick(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        if let Some(s) = self.tables()?.sessions.get_mut(&session_id) {
            s.last_tick_at = Some(at);
        }
        Ok(())
    }

    async fn insert_decision(&self, rec: &DecisionRecord) -> Result<bool> {
        let mut t = self.tables()?;
        if t.decisions.contains_key(&rec.decision_id) {
            return Ok(false);
        }
        t.decisions.insert(rec.decision_id, rec.clone());
        Ok(true)
    }

    async fn fetch_decision(&self, decision_id: Uuid) -> Result<Option<DecisionRecord>> {
        Ok(self.tables()?.decisions.get(&decision_id).cloned())
    }

    async fn mark_decision_executed(&self, decision_id: Uuid) -> Result<()> {
        if let Some(d) = self.tables()?.decisions.get_mut(&decision_id) {
            d.executed = true;
        }
        Ok(())
    }

    async fn insert_order(&self, rec: &OrderRecord) -> Result<bool> {
        let mut t = self.tables()?;
        if t.orders.contains_key(&rec.decision_id) {
            return Ok(false);
        }
        t.orders.insert(rec.decision_id, rec.clone());
        Ok(true)
    }

    async fn fetch_order_for_decision(&self, decision_id: Uuid) -> Result<Option<OrderRecord>> {
        Ok(self.tables()?.orders.get(&decision_id).cloned())
    }

    async fn recent_trades(
        &self,
        session_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<TradeRecord>> {
        let t = self.tables()?;
        let mut out: Vec<TradeRecord> = t
            .orders
            .values()
            .filter(|o| o.session_id == session_id && o.created_at >= since)
            .filter(|o| o.status.is_executed())
            .filter_map(|o| {
                Some(TradeRecord {
                    market: o.market.clone(),
                    side: o.side?,
                    kind: o.kind?,
                    at: o.created_at,
                })
            })
            .collect();
        out.sort_by_key(|r| r.at);
        Ok(out)
    }

    async fn load_trailing_mark(
        &self,
        session_id: Uuid,
        market: &str,
    ) -> Result<Option<TrailingMark>> {
        Ok(self
            .tables()?
            .marks
            .get(&(session_id, market.to_string()))
            .cloned())
    }

    async fn save_trailing_mark(&self, session_id: Uuid, mark: &TrailingMark) -> Result<()> {
        self.tables()?
            .marks
            .insert((session_id, mark.market.clone()), mark.clone());
        Ok(())
    }

    async fn clear_trailing_mark(&self, session_id: Uuid, market: &str) -> Result<()> {
        self.tables()?.marks.remove(&(session_id, market.to_string()));
        Ok(())
    }
}
