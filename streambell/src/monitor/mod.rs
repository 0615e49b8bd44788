//! Subscription monitoring: the durable notified-state store and the
//! poll-cycle tracker built on top of it.

mod store;
mod tracker;

pub use store::StatusStore;
pub use tracker::SubscriptionTracker;
