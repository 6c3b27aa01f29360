use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::order::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Side of the order that opens a position on this side.
    pub fn entry_side(self) -> Side {
        match self {
            PositionSide::Long => Side::Buy,
            PositionSide::Short => Side::Sell,
        }
    }

    /// Side of the order that closes a position on this side.
    pub fn exit_side(self) -> Side {
        match self {
            PositionSide::Long => Side::Sell,
            PositionSide::Short => Side::Buy,
        }
    }

    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }
}

/// Open position for one (session, market). Owned by the account layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub market: String,
    pub side: PositionSide,
    /// Base-asset units, always positive.
    pub size: f64,
    pub avg_entry_price: f64,
    pub unrealized_pnl: f64,
    pub opened_at: DateTime<Utc>,
}

impl PositionSnapshot {
    /// Notional at entry: `avg_entry_price * size`.
    pub fn entry_notional(&self) -> f64 {
        self.avg_entry_price * self.size
    }

    /// Unrealized PnL as a percentage of entry notional. Zero when the
    /// entry notional is zero.
    pub fn unrealized_pnl_pct(&self) -> f64 {
        let basis = self.entry_notional();
        if basis == 0.0 {
            return 0.0;
        }
        self.unrealized_pnl / basis * 100.0
    }

    /// Copy of this position with `unrealized_pnl` recomputed at `price`.
    pub fn marked_at(&self, price: f64) -> Self {
        let mut p = self.clone();
        p.unrealized_pnl = (price - self.avg_entry_price) * self.size * self.side.sign();
        p
    }
}

/// Engine-facing account view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub equity: f64,
    pub cash: f64,
    /// Baseline for daily-loss and return calculations.
    pub starting_equity: f64,
    pub gross_exposure: f64,
    pub net_exposure: f64,
}

impl AccountSnapshot {
    /// Fresh, flat account holding `equity` in cash.
    pub fn flat(equity: f64) -> Self {
        Self {
            equity,
            cash: equity,
            starting_equity: equity,
            gross_exposure: 0.0,
            net_exposure: 0.0,
        }
    }
}

/// Account state as reported by a broker. Read by the orchestrator for risk
/// inputs; the engine never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineAccountState {
    pub equity: f64,
    pub cash: f64,
    pub starting_equity: f64,
    pub net_exposure: f64,
    pub gross_exposure: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot_balances: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub positions: Vec<PositionSnapshot>,
}

impl EngineAccountState {
    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            equity: self.equity,
            cash: self.cash,
            starting_equity: self.starting_equity,
            gross_exposure: self.gross_exposure,
            net_exposure: self.net_exposure,
        }
    }

    pub fn position_for(&self, market: &str) -> Option<&PositionSnapshot> {
        self.positions.iter().find(|p| p.market == market)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long(entry: f64, size: f64, pnl: f64) -> PositionSnapshot {
        PositionSnapshot {
            market: "BTC-USD".to_string(),
            side: PositionSide::Long,
            size,
            avg_entry_price: entry,
            unrealized_pnl: pnl,
            opened_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn pnl_pct_guards_zero_basis() {
        assert_eq!(long(0.0, 1.0, 50.0).unrealized_pnl_pct(), 0.0);
        assert_eq!(long(100.0, 0.0, 50.0).unrealized_pnl_pct(), 0.0);
    }

    #[test]
    fn marked_at_uses_side_sign() {
        let p = long(100.0, 2.0, 0.0).marked_at(110.0);
        assert_eq!(p.unrealized_pnl, 20.0);

        let mut s = long(100.0, 2.0, 0.0);
        s.side = PositionSide::Short;
        assert_eq!(s.marked_at(110.0).unrealized_pnl, -20.0);
    }
}
