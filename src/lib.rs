//! Price negotiation between a buyer and an agent on a property listing.
//!
//! [`negotiation`] holds the counter / accept / cancel / sold rules,
//! [`query`] and [`progress`] derive what the offer screens show, and
//! [`service`] persists deals with optimistic concurrency.

pub mod config;
pub mod deal;
pub mod error;
pub mod money;
pub mod negotiation;
pub mod progress;
pub mod query;
pub mod service;
pub mod telemetry;
pub mod utils;

pub use deal::{Deal, DealId, DealStatus, ListingId, PartyId, Role};
pub use error::{NegotiationError, ServiceError};
pub use money::{Amount, parse_amount};
pub use negotiation::{accept_offer, cancel_offer, mark_sold, submit_counter};
pub use progress::project_progress;
