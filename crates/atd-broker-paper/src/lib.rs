//! Deterministic in-memory "virtual" broker.
//!
//! Design decisions (kept simple/deterministic):
//! - Market orders fill immediately and completely at the touch (ask for
//!   buys, bid for sells, last price when the book side is missing).
//! - `venue_order_id` is `"virtual:{client_order_id}"`. No randomness.
//! - Placing the same `client_order_id` twice returns the first result and
//!   does not touch the account again. Only the most recent
//!   `DEFAULT_DEDUPE_CAPACITY` results are remembered; older client ids come
//!   from ticks the orchestrator has long since recorded.
//! - Exit orders close the whole position.
//! - Shorts on a venue that forbids them are refused here too, even though
//!   the entry rules already block them.

use std::collections::{BTreeMap, VecDeque};

use atd_execution::{
    Broker, BrokerContext, BrokerError, ExecutionMode, OrderRequest, PlaceOrderResult,
};
use atd_schemas::{EngineAccountState, VenueDescriptor};
use tokio::sync::Mutex;
use tracing::{debug, warn};

mod account;

pub use account::{FillOutcome, VirtualAccount};

/// Placement results remembered for client-id de-duplication.
pub const DEFAULT_DEDUPE_CAPACITY: usize = 1_024;

/// Bounded memory of placement results, evicting the oldest first.
#[derive(Debug)]
struct PlacedOrders {
    capacity: usize,
    results: BTreeMap<String, PlaceOrderResult>,
    order: VecDeque<String>,
}

impl PlacedOrders {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            results: BTreeMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, client_order_id: &str) -> Option<&PlaceOrderResult> {
        self.results.get(client_order_id)
    }

    fn insert(&mut self, client_order_id: String, result: PlaceOrderResult) {
        if self.results.insert(client_order_id.clone(), result).is_none() {
            self.order.push_back(client_order_id);
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.results.remove(&oldest);
            }
        }
    }

    fn len(&self) -> usize {
        self.results.len()
    }
}

#[derive(Debug)]
struct Book {
    account: Option<VirtualAccount>,
    placed: PlacedOrders,
}

pub struct VirtualBroker {
    venue: VenueDescriptor,
    book: Mutex<Book>,
}

impl VirtualBroker {
    pub fn new(venue: VenueDescriptor, account: VirtualAccount) -> Self {
        Self::with_dedupe_capacity(venue, account, DEFAULT_DEDUPE_CAPACITY)
    }

    pub fn with_dedupe_capacity(
        venue: VenueDescriptor,
        account: VirtualAccount,
        capacity: usize,
    ) -> Self {
        Self {
            venue,
            book: Mutex::new(Book {
                account: Some(account),
                placed: PlacedOrders::new(capacity),
            }),
        }
    }

    /// A broker with no account behind it. Every account read fails.
    pub fn without_account(venue: VenueDescriptor) -> Self {
        Self {
            venue,
            book: Mutex::new(Book {
                account: None,
                placed: PlacedOrders::new(DEFAULT_DEDUPE_CAPACITY),
            }),
        }
    }

    /// Client order ids currently remembered for de-duplication.
    pub async fn remembered_orders(&self) -> usize {
        self.book.lock().await.placed.len()
    }

    /// Copy of the simulated account, for the owner to persist.
    pub async fn account(&self) -> Option<VirtualAccount> {
        self.book.lock().await.account.clone()
    }
}

#[async_trait::async_trait]
impl Broker for VirtualBroker {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Virtual
    }

    fn venue(&self) -> &VenueDescriptor {
        &self.venue
    }

    async fn place_order(&self, ctx: &BrokerContext, req: &OrderRequest) -> PlaceOrderResult {
        let mut book = self.book.lock().await;

        if let Some(existing) = book.placed.get(&req.client_order_id) {
            debug!(client_order_id = %req.client_order_id, "duplicate placement, returning first result");
            return existing.clone();
        }

        let Some(account) = book.account.as_mut() else {
            return PlaceOrderResult::failed("no virtual account for session");
        };

        let result = match account.apply(&req.intent, &ctx.market, &self.venue, ctx.now) {
            FillOutcome::Filled { price, size, fee } => {
                debug!(
                    session_id = %ctx.session_id,
                    client_order_id = %req.client_order_id,
                    price,
                    size,
                    fee,
                    "virtual fill"
                );
                PlaceOrderResult::filled(price, size, format!("virtual:{}", req.client_order_id))
            }
            FillOutcome::Rejected(reason) => {
                warn!(
                    session_id = %ctx.session_id,
                    client_order_id = %req.client_order_id,
                    %reason,
                    "virtual order rejected"
                );
                PlaceOrderResult::failed(reason)
            }
        };

        book.placed
            .insert(req.client_order_id.clone(), result.clone());
        result
    }

    async fn get_account_state(
        &self,
        ctx: &BrokerContext,
    ) -> Result<EngineAccountState, BrokerError> {
        let book = self.book.lock().await;
        book.account
            .as_ref()
            .map(|a| a.state(&self.venue))
            .ok_or_else(|| BrokerError::AccountNotFound(ctx.session_id.to_string()))
    }

    async fn on_tick(&self, ctx: &BrokerContext) -> Result<(), BrokerError> {
        let mut book = self.book.lock().await;
        match book.account.as_mut() {
            Some(a) => {
                a.mark(&ctx.market);
                Ok(())
            }
            None => Err(BrokerError::AccountNotFound(ctx.session_id.to_string())),
        }
    }
}
