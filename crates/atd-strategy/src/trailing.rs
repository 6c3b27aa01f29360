use atd_schemas::{PositionSnapshot, TrailingMark};

/// Fold `price` into the running extremes for `position`.
///
/// A mark left over from a different position (other market, or a different
/// `opened_at`) is discarded and tracking restarts from the entry price.
pub fn track_extremes(
    prev: Option<&TrailingMark>,
    position: &PositionSnapshot,
    price: f64,
) -> TrailingMark {
    let (peak, trough) = match prev.filter(|m| belongs_to(m, position)) {
        Some(m) => (m.peak, m.trough),
        None => (position.avg_entry_price, position.avg_entry_price),
    };

    TrailingMark {
        market: position.market.clone(),
        position_opened_at: position.opened_at,
        peak: peak.max(price),
        trough: trough.min(price),
    }
}

/// `(peak, trough)` to hand the exit evaluator, including `price`.
pub fn extremes_for(
    prev: Option<&TrailingMark>,
    position: &PositionSnapshot,
    price: f64,
) -> (f64, f64) {
    let m = track_extremes(prev, position, price);
    (m.peak, m.trough)
}

fn belongs_to(mark: &TrailingMark, position: &PositionSnapshot) -> bool {
    mark.market == position.market && mark.position_opened_at == position.opened_at
}
