//! One-to-many delivery: the broadcast hub, subscription handles, and the
//! text wire framing used by streaming connection handlers.

pub mod frame;
pub mod hub;

pub use frame::WireFrame;
pub use hub::{BroadcastHub, HubError, SubscriberToken, Subscription};
