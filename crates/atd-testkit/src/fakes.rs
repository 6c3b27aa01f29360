use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use atd_broker_live::{ExchangeAck, ExchangeClient, ExchangeError, ExchangeOrder};
use atd_broker_paper::{FillOutcome, VirtualAccount};
use atd_execution::{
    Broker, BrokerContext, BrokerError, ExecutionMode, OrderRequest, PlaceOrderResult,
};
use atd_runtime::{IntentProvider, MarkPrice, MarketFeed};
use atd_schemas::{
    AiIntent, EngineAccountState, MarketSnapshot, OrderIntent, OrderKind, OrderbookTop,
    SessionRecord, VenueDescriptor,
};
use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Market feed
// ---------------------------------------------------------------------------

/// Feed quoting one settable price with a fixed spread.
pub struct StaticFeed {
    state: Mutex<FeedState>,
}

struct FeedState {
    price: f64,
    half_spread: f64,
    at: DateTime<Utc>,
    down: bool,
}

impl StaticFeed {
    pub fn new(price: f64, at: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(FeedState {
                price,
                half_spread: 0.0,
                at,
                down: false,
            }),
        }
    }

    pub fn with_spread(self, half_spread: f64) -> Self {
        if let Ok(mut s) = self.state.lock() {
            s.half_spread = half_spread;
        }
        self
    }

    pub fn set_price(&self, price: f64, at: DateTime<Utc>) {
        if let Ok(mut s) = self.state.lock() {
            s.price = price;
            s.at = at;
        }
    }

    /// Make every call fail until cleared.
    pub fn set_down(&self, down: bool) {
        if let Ok(mut s) = self.state.lock() {
            s.down = down;
        }
    }

    fn read(&self) -> Result<(f64, f64, DateTime<Utc>)> {
        let s = self
            .state
            .lock()
            .map_err(|_| anyhow!("feed mutex poisoned"))?;
        if s.down {
            bail!("feed unavailable");
        }
        Ok((s.price, s.half_spread, s.at))
    }
}

#[async_trait::async_trait]
impl MarketFeed for StaticFeed {
    async fn get_orderbook_top(&self, _market: &str) -> Result<OrderbookTop> {
        let (price, half, _) = self.read()?;
        Ok(OrderbookTop::new(price - half, price + half))
    }

    async fn get_mark_price(&self, _market: &str) -> Result<MarkPrice> {
        let (price, _, timestamp) = self.read()?;
        Ok(MarkPrice { price, timestamp })
    }
}

// ---------------------------------------------------------------------------
// AI intent
// ---------------------------------------------------------------------------

/// Returns whatever intent was last scripted. `None` means "no model
/// configured".
#[derive(Default)]
pub struct ScriptedIntents {
    next: Mutex<Option<AiIntent>>,
    calls: AtomicUsize,
}

impl ScriptedIntents {
    pub fn new(intent: AiIntent) -> Self {
        Self {
            next: Mutex::new(Some(intent)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn set(&self, intent: AiIntent) {
        if let Ok(mut n) = self.next.lock() {
            *n = Some(intent);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IntentProvider for ScriptedIntents {
    async fn intent_for(
        &self,
        _session: &SessionRecord,
        _market: &MarketSnapshot,
    ) -> Result<Option<AiIntent>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let n = self
            .next
            .lock()
            .map_err(|_| anyhow!("intent mutex poisoned"))?;
        Ok(n.clone())
    }
}

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

/// An `ExchangeClient` that fills against a simulated account, so a
/// `LiveBroker` can be driven end to end without a venue.
pub struct PaperExchange {
    venue: VenueDescriptor,
    state: Mutex<ExchangeState>,
    submits: AtomicUsize,
}

struct ExchangeState {
    account: VirtualAccount,
    market: Option<MarketSnapshot>,
    reject_with: Option<String>,
    now: DateTime<Utc>,
}

impl PaperExchange {
    pub fn new(venue: VenueDescriptor, account: VirtualAccount) -> Self {
        Self {
            venue,
            state: Mutex::new(ExchangeState {
                account,
                market: None,
                reject_with: None,
                now: DateTime::<Utc>::UNIX_EPOCH,
            }),
            submits: AtomicUsize::new(0),
        }
    }

    /// Quote used for fills and marks.
    pub fn set_market(&self, market: MarketSnapshot, now: DateTime<Utc>) {
        if let Ok(mut s) = self.state.lock() {
            s.account.mark(&market);
            s.market = Some(market);
            s.now = now;
        }
    }

    /// Reject every order with `msg` until cleared with `None`.
    pub fn reject_orders(&self, msg: Option<&str>) {
        if let Ok(mut s) = self.state.lock() {
            s.reject_with = msg.map(str::to_string);
        }
    }

    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ExchangeClient for PaperExchange {
    async fn submit_market_order(
        &self,
        order: &ExchangeOrder,
    ) -> Result<ExchangeAck, ExchangeError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        let mut s = self
            .state
            .lock()
            .map_err(|_| ExchangeError::Transport("exchange mutex poisoned".to_string()))?;
        if let Some(msg) = &s.reject_with {
            return Err(ExchangeError::Rejected(msg.clone()));
        }
        let market = s
            .market
            .clone()
            .ok_or_else(|| ExchangeError::Transport("no quote".to_string()))?;

        let intent = OrderIntent {
            market: order.market.clone(),
            side: order.side,
            notional_usd: order.notional_usd,
            kind: if order.reduce_only {
                OrderKind::Exit
            } else {
                OrderKind::Entry
            },
            reason: String::new(),
        };
        let now = s.now;
        let venue = self.venue.clone();
        match s.account.apply(&intent, &market, &venue, now) {
            FillOutcome::Filled { price, size, .. } => Ok(ExchangeAck::Filled {
                venue_order_id: format!("px-{}", order.client_order_id),
                price,
                size,
            }),
            FillOutcome::Rejected(msg) => Err(ExchangeError::Rejected(msg)),
        }
    }

    async fn fetch_account(&self) -> Result<EngineAccountState, ExchangeError> {
        let s = self
            .state
            .lock()
            .map_err(|_| ExchangeError::Transport("exchange mutex poisoned".to_string()))?;
        Ok(s.account.state(&self.venue))
    }
}

// ---------------------------------------------------------------------------
// Counting wrapper
// ---------------------------------------------------------------------------

/// Wraps a broker and counts `place_order` calls.
pub struct CountingBroker<B: Broker> {
    inner: B,
    placed: AtomicUsize,
}

impl<B: Broker> CountingBroker<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            placed: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn placed(&self) -> usize {
        self.placed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl<B: Broker> Broker for CountingBroker<B> {
    fn mode(&self) -> ExecutionMode {
        self.inner.mode()
    }

    fn venue(&self) -> &VenueDescriptor {
        self.inner.venue()
    }

    async fn place_order(&self, ctx: &BrokerContext, req: &OrderRequest) -> PlaceOrderResult {
        self.placed.fetch_add(1, Ordering::SeqCst);
        self.inner.place_order(ctx, req).await
    }

    async fn get_account_state(
        &self,
        ctx: &BrokerContext,
    ) -> Result<EngineAccountState, BrokerError> {
        self.inner.get_account_state(ctx).await
    }

    async fn on_tick(&self, ctx: &BrokerContext) -> Result<(), BrokerError> {
        self.inner.on_tick(ctx).await
    }
}
