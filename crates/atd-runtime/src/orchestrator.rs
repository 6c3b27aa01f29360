//! Tick orchestrator.
//!
//! One call to [`Orchestrator::run_tick`] is one tick for one session. Every
//! path resolves into a [`TickOutcome`]; nothing escapes as an error.
//!
//! Write ordering:
//! - nothing is written before the decision row
//! - the decision row is durable before any placement attempt
//! - the order row follows the placement result; a decision has exactly one
//! - `last_tick_at` moves only after the order row is written

use std::sync::Arc;

use anyhow::{bail, Context};
use atd_config::{RuntimeConfig, StrategyConfig};
use atd_execution::{
    client_order_id, Broker, BrokerContext, OrderGateway, OrderRequest, PlaceOrderResult,
    GATE_REFUSED_PREFIX,
};
use atd_schemas::{
    DecisionAction, DecisionRecord, MarketSnapshot, OrderRecord, OrderStatus, SessionRecord,
    SessionStatus,
};
use atd_strategy::{decide, reference_price, track_extremes, TickInput};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cadence::{decision_id_for, is_tick_due};
use crate::collaborators::{IntentProvider, MarketFeed};
use crate::store::{StoreKillSwitch, TickStore};

/// Structured result of one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickOutcome {
    /// The tick ran to completion and nothing was refused or failed.
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<DecisionAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_status: Option<OrderStatus>,
    /// The order already existed; no venue call was made.
    #[serde(default)]
    pub replayed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TickOutcome {
    fn failed(decision_id: Option<Uuid>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            decision_id,
            action: None,
            order_id: None,
            order_status: None,
            replayed: false,
            error: Some(error.into()),
        }
    }

    /// Built from the stored row alone, so a replay reports exactly what the
    /// original tick reported. A gateway refusal is stored as `skipped` with
    /// the refusal text and counts as a failure.
    fn for_order(order: &OrderRecord, action: Option<DecisionAction>, replayed: bool) -> Self {
        let refused = order.status == OrderStatus::Skipped
            && order
                .error
                .as_deref()
                .is_some_and(|e| e.starts_with(GATE_REFUSED_PREFIX));
        let failed = order.status == OrderStatus::Failed || refused;
        Self {
            success: !failed,
            decision_id: Some(order.decision_id),
            action,
            order_id: Some(order.order_id),
            order_status: Some(order.status),
            replayed,
            error: if failed { order.error.clone() } else { None },
        }
    }
}

/// A tick that stopped early. Carries the decision id once one is durable.
struct Abort {
    decision_id: Option<Uuid>,
    reason: String,
}

impl Abort {
    fn new(decision_id: Option<Uuid>, reason: impl Into<String>) -> Self {
        Self {
            decision_id,
            reason: reason.into(),
        }
    }
}

fn abort<E: std::fmt::Display>(
    decision_id: Option<Uuid>,
    what: &'static str,
) -> impl FnOnce(E) -> Abort {
    move |e| Abort::new(decision_id, format!("{what}: {e:#}"))
}

pub struct Orchestrator<S, B, F, I>
where
    S: TickStore,
    B: Broker,
    F: MarketFeed,
    I: IntentProvider,
{
    store: Arc<S>,
    gateway: OrderGateway<B, StoreKillSwitch<S>>,
    feed: F,
    intents: I,
    runtime: RuntimeConfig,
}

impl<S, B, F, I> Orchestrator<S, B, F, I>
where
    S: TickStore,
    B: Broker,
    F: MarketFeed,
    I: IntentProvider,
{
    /// The broker is chosen here, once. Everything downstream is mode-agnostic
    /// except the gateway's live-only kill-switch re-check.
    pub fn new(store: Arc<S>, broker: B, feed: F, intents: I, runtime: RuntimeConfig) -> Self {
        let kill_switch = StoreKillSwitch::new(Arc::clone(&store));
        let gateway = OrderGateway::new(broker, kill_switch, runtime.absolute_max_notional_usd);
        Self {
            store,
            gateway,
            feed,
            intents,
            runtime,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn gateway(&self) -> &OrderGateway<B, StoreKillSwitch<S>> {
        &self.gateway
    }

    pub async fn run_tick(&self, session_id: Uuid, now: DateTime<Utc>) -> TickOutcome {
        match self.tick(session_id, now).await {
            Ok(outcome) => outcome,
            Err(a) => {
                warn!(
                    %session_id,
                    decision_id = ?a.decision_id,
                    reason = %a.reason,
                    "tick aborted"
                );
                TickOutcome::failed(a.decision_id, a.reason)
            }
        }
    }

    async fn tick(&self, session_id: Uuid, now: DateTime<Utc>) -> Result<TickOutcome, Abort> {
        // LoadState
        let session = self
            .store
            .load_session(session_id)
            .await
            .map_err(abort(None, "load session failed"))?
            .ok_or_else(|| Abort::new(None, format!("CONFIG: session not found: {session_id}")))?;

        if session.status != SessionStatus::Running {
            info!(%session_id, status = session.status.as_str(), "session not running; tick skipped");
            return Ok(TickOutcome::failed(
                None,
                format!("SESSION_NOT_RUNNING: status={}", session.status.as_str()),
            ));
        }

        let config = StrategyConfig::from_json(&session.strategy).map_err(abort(None, "CONFIG"))?;

        let venue = self.gateway.venue();
        if !venue.name.eq_ignore_ascii_case(&session.venue) {
            return Err(Abort::new(
                None,
                format!(
                    "CONFIG: session venue '{}' does not match broker venue '{}'",
                    session.venue, venue.name
                ),
            ));
        }

        let decision_id = decision_id_for(session_id, now, session.cadence_seconds);

        if let Some(existing) = self
            .store
            .fetch_order_for_decision(decision_id)
            .await
            .map_err(abort(None, "idempotency lookup failed"))?
        {
            info!(
                %session_id,
                %decision_id,
                order_id = %existing.order_id,
                status = existing.status.as_str(),
                "order already recorded for this tick; no venue call"
            );
            return Ok(TickOutcome::for_order(&existing, None, true));
        }

        if !is_tick_due(session.last_tick_at, session.cadence_seconds, now) {
            // A retry that crossed into the next slot still belongs to the
            // tick that ran at `last_tick_at`.
            if let Some(last) = session.last_tick_at {
                let prev_id = decision_id_for(session_id, last, session.cadence_seconds);
                if let Some(existing) = self
                    .store
                    .fetch_order_for_decision(prev_id)
                    .await
                    .map_err(abort(None, "idempotency lookup failed"))?
                {
                    info!(
                        %session_id,
                        decision_id = %prev_id,
                        order_id = %existing.order_id,
                        "retry inside cadence window; returning last tick's order"
                    );
                    return Ok(TickOutcome::for_order(&existing, None, true));
                }
            }
            debug!(%session_id, "cadence not elapsed");
            return Ok(TickOutcome::failed(None, "TICK_SKIPPED: cadence not elapsed"));
        }

        let acquired = self
            .store
            .try_acquire_tick_lock(session_id, now, self.runtime.tick_lock_ttl_secs)
            .await
            .map_err(abort(None, "tick lock failed"))?;
        if !acquired {
            debug!(%session_id, "tick lock held or cadence not elapsed");
            return Ok(TickOutcome::failed(
                None,
                "TICK_SKIPPED: tick lock held or cadence not elapsed",
            ));
        }

        let result = self.locked_tick(&session, &config, decision_id, now).await;

        if let Err(e) = self.store.release_tick_lock(session_id).await {
            warn!(%session_id, error = %format!("{e:#}"), "tick lock release failed; it expires after ttl");
        }
        result
    }

    async fn locked_tick(
        &self,
        session: &SessionRecord,
        config: &StrategyConfig,
        decision_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<TickOutcome, Abort> {
        let session_id = session.session_id;

        // FetchMarket
        let market = self
            .fetch_market(&session.market)
            .await
            .map_err(abort(None, "market data unavailable"))?;

        let ctx = BrokerContext {
            session_id,
            now,
            market: market.clone(),
        };
        self.gateway
            .on_tick(&ctx)
            .await
            .map_err(abort(None, "broker mark-to-market failed"))?;
        let account = self
            .gateway
            .account_state(&ctx)
            .await
            .map_err(abort(None, "CONFIG: account unavailable"))?;

        // ObtainIntent
        let intent = self
            .intents
            .intent_for(session, &market)
            .await
            .map_err(abort(None, "AI intent unavailable"))?
            .ok_or_else(|| Abort::new(None, "CONFIG: no AI intent configured for session"))?;

        // Decide
        let position = account.position_for(&session.market).cloned();
        let prev_mark = self
            .store
            .load_trailing_mark(session_id, &session.market)
            .await
            .map_err(abort(None, "load trailing mark failed"))?;
        let mark = position
            .as_ref()
            .map(|p| track_extremes(prev_mark.as_ref(), p, reference_price(&market)));

        let cooldown = i64::from(config.trade_control.cooldown_minutes.unwrap_or(0));
        let lookback = Duration::days(1).max(Duration::minutes(cooldown));
        let recent_trades = self
            .store
            .recent_trades(session_id, now - lookback)
            .await
            .map_err(abort(None, "load recent trades failed"))?;

        let input = TickInput {
            now,
            market: market.clone(),
            position,
            account: account.snapshot(),
            intent,
            config: config.clone(),
            venue: self.gateway.venue().clone(),
            recent_trades,
            trailing: mark.clone(),
            default_max_position_usd: self.runtime.default_max_position_usd,
        };
        let decision = decide(&input);

        info!(
            %session_id,
            %decision_id,
            action = decision.action.as_str(),
            summary = %decision.action_summary,
            "decision"
        );

        // PersistDecision
        let record = DecisionRecord::new(decision_id, session_id, now, decision);
        let inserted = self
            .store
            .insert_decision(&record)
            .await
            .map_err(abort(None, "persist decision failed"))?;
        let record = if inserted {
            record
        } else {
            // An earlier attempt for this slot got as far as the decision row.
            // Execute what it decided, not a fresh decision.
            self.store
                .fetch_decision(decision_id)
                .await
                .map_err(abort(Some(decision_id), "reload decision failed"))?
                .ok_or_else(|| {
                    Abort::new(Some(decision_id), "decision vanished after conflict")
                })?
        };
        let did = Some(decision_id);

        // ExecuteOrSkip
        let coid = client_order_id(decision_id);
        let intent = record
            .decision
            .orders
            .first()
            .filter(|_| record.decision.is_execute())
            .cloned();
        let result = match &intent {
            Some(order) => {
                let req = OrderRequest {
                    client_order_id: coid.clone(),
                    intent: order.clone(),
                };
                match self.gateway.place(&ctx, &req).await {
                    Ok(r) => r,
                    Err(r) => PlaceOrderResult::skipped(r.to_string()),
                }
            }
            None => PlaceOrderResult::skipped(record.decision.action_summary.clone()),
        };

        // PersistOrder
        let order = OrderRecord {
            order_id: Uuid::new_v5(&decision_id, b"order"),
            decision_id,
            session_id,
            client_order_id: coid,
            market: session.market.clone(),
            side: intent.as_ref().map(|o| o.side),
            kind: intent.as_ref().map(|o| o.kind),
            notional_usd: intent.as_ref().map_or(0.0, |o| o.notional_usd),
            status: result.status,
            filled_price: result.filled_price,
            filled_size: result.filled_size,
            venue_order_id: result.venue_order_id,
            error: result.error,
            created_at: now,
        };
        let inserted = self
            .store
            .insert_order(&order)
            .await
            .map_err(abort(did, "persist order failed"))?;
        let order = if inserted {
            order
        } else {
            self.store
                .fetch_order_for_decision(decision_id)
                .await
                .map_err(abort(did, "reload order failed"))?
                .ok_or_else(|| Abort::new(did, "order vanished after conflict"))?
        };

        if order.status.is_executed() {
            self.store
                .mark_decision_executed(decision_id)
                .await
                .map_err(abort(did, "mark decision executed failed"))?;
        }

        match (&mark, &prev_mark) {
            (Some(m), _) => self
                .store
                .save_trailing_mark(session_id, m)
                .await
                .map_err(abort(did, "save trailing mark failed"))?,
            (None, Some(_)) => self
                .store
                .clear_trailing_mark(session_id, &session.market)
                .await
                .map_err(abort(did, "clear trailing mark failed"))?,
            (None, None) => {}
        }

        // UpdateTimestamp
        self.store
            .touch_last_tick(session_id, now)
            .await
            .map_err(abort(did, "update last_tick_at failed"))?;

        info!(
            %session_id,
            %decision_id,
            order_id = %order.order_id,
            status = order.status.as_str(),
            "tick complete"
        );

        Ok(TickOutcome::for_order(&order, Some(record.action), false))
    }

    async fn fetch_market(&self, symbol: &str) -> anyhow::Result<MarketSnapshot> {
        let top = self
            .feed
            .get_orderbook_top(symbol)
            .await
            .context("get_orderbook_top failed")?;
        let mark = self
            .feed
            .get_mark_price(symbol)
            .await
            .context("get_mark_price failed")?;
        let candles = self
            .feed
            .get_candles(symbol)
            .await
            .context("get_candles failed")?;

        if !(mark.price > 0.0 || top.mid > 0.0) {
            bail!("no usable price for {symbol}");
        }

        Ok(MarketSnapshot {
            symbol: symbol.to_string(),
            last_price: mark.price,
            bid: top.bid,
            ask: top.ask,
            timestamp: mark.timestamp,
            candles,
            orderbook: Some(top),
        })
    }
}
