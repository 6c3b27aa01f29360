use std::collections::BTreeMap;

use atd_schemas::{
    EngineAccountState, MarketSnapshot, OrderIntent, OrderKind, PositionSide, PositionSnapshot,
    Side, VenueDescriptor,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of applying one market order to the simulated account.
#[derive(Clone, Debug, PartialEq)]
pub enum FillOutcome {
    Filled { price: f64, size: f64, fee: f64 },
    Rejected(String),
}

/// Simulated account for one session.
///
/// Cash is signed-exposure accounting: buying spends cash, selling short adds
/// the proceeds, and `equity = cash + Σ sign × size × mark`. Serializable so
/// the owner can persist it between ticks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VirtualAccount {
    pub cash: f64,
    pub starting_equity: f64,
    /// Taker fee charged on every fill, in basis points of notional.
    #[serde(default)]
    pub fee_bps: f64,
    /// Keyed by market. At most one position per market.
    #[serde(default)]
    pub positions: BTreeMap<String, PositionSnapshot>,
    /// Last mark per market, from `mark`.
    #[serde(default)]
    pub marks: BTreeMap<String, f64>,
}

impl VirtualAccount {
    pub fn new(starting_equity: f64, fee_bps: f64) -> Self {
        Self {
            cash: starting_equity,
            starting_equity,
            fee_bps,
            positions: BTreeMap::new(),
            marks: BTreeMap::new(),
        }
    }

    fn mark_for(&self, p: &PositionSnapshot) -> f64 {
        self.marks
            .get(&p.market)
            .copied()
            .unwrap_or(p.avg_entry_price)
    }

    fn fee(&self, notional: f64) -> f64 {
        notional * self.fee_bps / 10_000.0
    }

    /// Record the current price and re-mark the open position, if any.
    /// Uses the same reference price the engine judges exits at.
    pub fn mark(&mut self, market: &MarketSnapshot) {
        let price = market.reference_price();
        if !(price > 0.0) {
            return;
        }
        self.marks.insert(market.symbol.clone(), price);
        if let Some(p) = self.positions.get_mut(&market.symbol) {
            *p = p.marked_at(price);
        }
    }

    pub fn equity(&self) -> f64 {
        self.cash
            + self
                .positions
                .values()
                .map(|p| p.side.sign() * p.size * self.mark_for(p))
                .sum::<f64>()
    }

    /// Fill a market order at the touch: ask for buys, bid for sells, last
    /// price when the book side is missing.
    pub fn apply(
        &mut self,
        order: &OrderIntent,
        market: &MarketSnapshot,
        venue: &VenueDescriptor,
        now: DateTime<Utc>,
    ) -> FillOutcome {
        let price = match order.side {
            Side::Buy => market.buy_price(),
            Side::Sell => market.sell_price(),
        };
        if !(price > 0.0) {
            return FillOutcome::Rejected(format!("no usable price for {}", market.symbol));
        }

        match order.kind {
            OrderKind::Entry => self.open(order, price, venue, now),
            OrderKind::Exit => self.close(order, price),
        }
    }

    fn open(
        &mut self,
        order: &OrderIntent,
        price: f64,
        venue: &VenueDescriptor,
        now: DateTime<Utc>,
    ) -> FillOutcome {
        if self.positions.contains_key(&order.market) {
            return FillOutcome::Rejected(format!("position already open on {}", order.market));
        }
        if !(order.notional_usd > 0.0) {
            return FillOutcome::Rejected("order notional must be positive".to_string());
        }

        let side = match order.side {
            Side::Buy => PositionSide::Long,
            Side::Sell => PositionSide::Short,
        };
        if side == PositionSide::Short && !venue.allows_short {
            return FillOutcome::Rejected(format!(
                "venue {} does not support short selling",
                venue.name
            ));
        }

        let notional = order.notional_usd;
        let fee = self.fee(notional);
        if side == PositionSide::Long
            && !venue.supports_leverage
            && self.cash < notional + fee
        {
            return FillOutcome::Rejected(format!(
                "insufficient cash: need ${:.2}, have ${:.2}",
                notional + fee,
                self.cash
            ));
        }

        let size = notional / price;
        self.cash -= side.sign() * notional + fee;
        self.marks.insert(order.market.clone(), price);
        self.positions.insert(
            order.market.clone(),
            PositionSnapshot {
                market: order.market.clone(),
                side,
                size,
                avg_entry_price: price,
                unrealized_pnl: 0.0,
                opened_at: now,
            },
        );

        FillOutcome::Filled { price, size, fee }
    }

    /// Exits always close the whole position, whatever notional was asked.
    fn close(&mut self, order: &OrderIntent, price: f64) -> FillOutcome {
        let Some(pos) = self.positions.get(&order.market) else {
            return FillOutcome::Rejected(format!("no open position on {}", order.market));
        };
        if pos.side.exit_side() != order.side {
            return FillOutcome::Rejected(format!(
                "exit side {} does not close a {} position",
                order.side,
                match pos.side {
                    PositionSide::Long => "long",
                    PositionSide::Short => "short",
                }
            ));
        }

        let size = pos.size;
        let proceeds = size * price;
        let fee = self.fee(proceeds);
        self.cash += pos.side.sign() * proceeds - fee;
        self.marks.insert(order.market.clone(), price);
        self.positions.remove(&order.market);

        FillOutcome::Filled { price, size, fee }
    }

    /// Engine-facing view, positions marked at the last known price.
    pub fn state(&self, venue: &VenueDescriptor) -> EngineAccountState {
        let positions: Vec<PositionSnapshot> = self
            .positions
            .values()
            .map(|p| p.marked_at(self.mark_for(p)))
            .collect();

        let gross = positions
            .iter()
            .map(|p| p.size * self.mark_for(p))
            .sum::<f64>();
        let net = positions
            .iter()
            .map(|p| p.side.sign() * p.size * self.mark_for(p))
            .sum::<f64>();

        let spot_balances = (!venue.supports_leverage).then(|| {
            let mut b = BTreeMap::new();
            b.insert(venue.quote_asset.clone(), self.cash);
            for p in &positions {
                let base = p.market.split(['-', '/']).next().unwrap_or(&p.market);
                b.insert(base.to_string(), p.side.sign() * p.size);
            }
            b
        });

        EngineAccountState {
            equity: self.equity(),
            cash: self.cash,
            starting_equity: self.starting_equity,
            net_exposure: net,
            gross_exposure: gross,
            spot_balances,
            positions,
        }
    }
}
