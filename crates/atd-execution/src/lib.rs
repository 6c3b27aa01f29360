//! atd-execution
//!
//! The boundary between the decision engine and anything that can fill an
//! order.
//!
//! - `Broker` is the capability trait implemented once per venue/mode
//!   (virtual simulation, live exchange). The engine never sees it.
//! - `OrderGateway` is the only path from the orchestrator to a broker. It
//!   enforces the absolute notional fuse on entries and, for live brokers,
//!   re-checks the session kill switch immediately before placement.
//! - `venues` holds the static venue capability table.

mod broker;
mod gateway;
mod venues;

pub use broker::{
    Broker, BrokerContext, BrokerError, ExecutionMode, OrderRequest, PlaceOrderResult,
};
pub use gateway::{client_order_id, GateRefusal, KillSwitch, OrderGateway, GATE_REFUSED_PREFIX};
pub use venues::{known_venue, simulated_venue, KNOWN_VENUES};
