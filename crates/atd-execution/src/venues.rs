use atd_schemas::VenueDescriptor;

/// Venue names with a fixed capability entry.
pub const KNOWN_VENUES: &[&str] = &["coinbase", "kraken", "hyperliquid", "binance-futures"];

/// Capability entry for a known venue, by case-insensitive name.
pub fn known_venue(name: &str) -> Option<VenueDescriptor> {
    match name.to_ascii_lowercase().as_str() {
        "coinbase" => Some(VenueDescriptor::spot("coinbase")),
        "kraken" => Some(VenueDescriptor::spot("kraken")),
        "hyperliquid" => Some(VenueDescriptor::margin("hyperliquid", 50.0)),
        "binance-futures" => Some(VenueDescriptor::margin("binance-futures", 125.0)),
        _ => None,
    }
}

/// Permissive descriptor for simulated accounts with no real venue behind
/// them: shorts allowed, leverage up to 10x.
pub fn simulated_venue() -> VenueDescriptor {
    VenueDescriptor::margin("simulated", 10.0)
}
