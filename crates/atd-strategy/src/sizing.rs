use atd_config::RiskLimits;
use atd_schemas::{AccountSnapshot, VenueDescriptor};
use serde::{Deserialize, Serialize};

/// Fraction of the leverage ceiling actually used, so rounding cannot push
/// the post-trade position over the limit.
pub const LEVERAGE_HEADROOM: f64 = 0.99;

/// Sized entry plus the numbers it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSize {
    pub notional_usd: f64,
    pub max_position_usd: f64,
    pub remaining_room_usd: f64,
    pub effective_max_leverage: f64,
}

/// Size an approved entry.
///
/// `notional = min(cap, max(0, equity * lev * 0.99 - gross))`, scaled by
/// confidence (clamped to `[0, 1]`) when `confidence_scaling` is on.
pub fn size_entry(
    account: &AccountSnapshot,
    limits: &RiskLimits,
    venue: &VenueDescriptor,
    default_max_position_usd: f64,
    confidence: f64,
    confidence_scaling: bool,
) -> PositionSize {
    let effective_max_leverage = venue.effective_leverage(limits.max_leverage);
    let max_position_usd = limits.max_position_usd.unwrap_or(default_max_position_usd);

    let remaining_room_usd = (account.equity * effective_max_leverage * LEVERAGE_HEADROOM
        - account.gross_exposure)
        .max(0.0);

    let mut notional_usd = max_position_usd.min(remaining_room_usd);
    if confidence_scaling {
        notional_usd *= confidence.clamp(0.0, 1.0);
    }

    PositionSize {
        notional_usd,
        max_position_usd,
        remaining_room_usd,
        effective_max_leverage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leverage_room_binds_before_cap() {
        let acct = AccountSnapshot {
            equity: 1_000.0,
            cash: 100.0,
            starting_equity: 1_000.0,
            gross_exposure: 950.0,
            net_exposure: 950.0,
        };
        let limits = RiskLimits {
            max_position_usd: Some(500.0),
            ..RiskLimits::default()
        };
        let s = size_entry(&acct, &limits, &VenueDescriptor::spot("coinbase"), 100.0, 1.0, false);
        assert!((s.notional_usd - 40.0).abs() < 1e-9);
    }

    #[test]
    fn exhausted_room_sizes_to_zero() {
        let acct = AccountSnapshot {
            equity: 1_000.0,
            cash: 0.0,
            starting_equity: 1_000.0,
            gross_exposure: 1_200.0,
            net_exposure: 1_200.0,
        };
        let s = size_entry(
            &acct,
            &RiskLimits::default(),
            &VenueDescriptor::spot("coinbase"),
            100.0,
            0.9,
            true,
        );
        assert_eq!(s.notional_usd, 0.0);
        assert_eq!(s.remaining_room_usd, 0.0);
    }
}
