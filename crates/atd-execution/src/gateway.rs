//! Order gateway: the single path from the orchestrator to a broker.
//!
//! Every `place` call runs, in order:
//!
//! 1. the absolute notional fuse (entry orders only; exits reduce exposure)
//! 2. for `Live` brokers only, a fresh kill-switch read for the session
//!
//! and refuses with `GateRefusal` before the broker is touched if either
//! fails. Account reads and `on_tick` pass straight through.

use atd_schemas::{EngineAccountState, OrderKind, VenueDescriptor};
use tracing::warn;
use uuid::Uuid;

use crate::broker::{
    Broker, BrokerContext, BrokerError, ExecutionMode, OrderRequest, PlaceOrderResult,
};

// ---------------------------------------------------------------------------
// Gate evaluator trait
// ---------------------------------------------------------------------------

/// Reads whether a session may still trade.
///
/// # Contract
/// Returns `true` only when the session is `running` at the moment of the
/// call. A failed read must return `false`.
#[async_trait::async_trait]
pub trait KillSwitch: Send + Sync {
    async fn is_armed(&self, session_id: Uuid) -> bool;
}

// ---------------------------------------------------------------------------
// GateRefusal
// ---------------------------------------------------------------------------

/// Every `GateRefusal` renders with this prefix, so a stored refusal can be
/// told apart from an ordinary skip reason.
pub const GATE_REFUSED_PREFIX: &str = "GATE_REFUSED:";

/// The reason an order was refused at the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum GateRefusal {
    NotionalFuse { notional_usd: f64, cap_usd: f64 },
    SessionNotRunning,
}

impl std::fmt::Display for GateRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateRefusal::NotionalFuse {
                notional_usd,
                cap_usd,
            } => write!(
                f,
                "GATE_REFUSED: notional ${notional_usd:.2} exceeds absolute cap ${cap_usd:.2}"
            ),
            GateRefusal::SessionNotRunning => {
                write!(f, "GATE_REFUSED: session is no longer running")
            }
        }
    }
}

impl std::error::Error for GateRefusal {}

// ---------------------------------------------------------------------------
// OrderGateway
// ---------------------------------------------------------------------------

pub struct OrderGateway<B, K>
where
    B: Broker,
    K: KillSwitch,
{
    broker: B,
    kill_switch: K,
    absolute_max_notional_usd: f64,
}

impl<B, K> OrderGateway<B, K>
where
    B: Broker,
    K: KillSwitch,
{
    pub fn new(broker: B, kill_switch: K, absolute_max_notional_usd: f64) -> Self {
        Self {
            broker,
            kill_switch,
            absolute_max_notional_usd,
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.broker.mode()
    }

    pub fn venue(&self) -> &VenueDescriptor {
        self.broker.venue()
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn absolute_max_notional_usd(&self) -> f64 {
        self.absolute_max_notional_usd
    }

    fn enforce_fuse(&self, req: &OrderRequest) -> Result<(), GateRefusal> {
        if req.intent.kind != OrderKind::Entry {
            return Ok(());
        }
        let n = req.intent.notional_usd;
        // NaN fails closed.
        if !(n <= self.absolute_max_notional_usd) {
            return Err(GateRefusal::NotionalFuse {
                notional_usd: n,
                cap_usd: self.absolute_max_notional_usd,
            });
        }
        Ok(())
    }

    /// Run the gates, then place the order.
    pub async fn place(
        &self,
        ctx: &BrokerContext,
        req: &OrderRequest,
    ) -> Result<PlaceOrderResult, GateRefusal> {
        if let Err(refusal) = self.enforce_fuse(req) {
            warn!(
                session_id = %ctx.session_id,
                client_order_id = %req.client_order_id,
                "{refusal}"
            );
            return Err(refusal);
        }

        if self.broker.mode() == ExecutionMode::Live
            && !self.kill_switch.is_armed(ctx.session_id).await
        {
            warn!(
                session_id = %ctx.session_id,
                client_order_id = %req.client_order_id,
                "kill switch flipped before placement"
            );
            return Err(GateRefusal::SessionNotRunning);
        }

        Ok(self.broker.place_order(ctx, req).await)
    }

    pub async fn account_state(
        &self,
        ctx: &BrokerContext,
    ) -> Result<EngineAccountState, BrokerError> {
        self.broker.get_account_state(ctx).await
    }

    pub async fn on_tick(&self, ctx: &BrokerContext) -> Result<(), BrokerError> {
        self.broker.on_tick(ctx).await
    }
}

// ---------------------------------------------------------------------------
// Idempotency derivation
// ---------------------------------------------------------------------------

/// Stable venue-facing order id for a decision. A retried tick derives the
/// same id, so a venue that de-dupes on client ids never sees two orders.
pub fn client_order_id(decision_id: Uuid) -> String {
    format!("atd-{}", decision_id.simple())
}
