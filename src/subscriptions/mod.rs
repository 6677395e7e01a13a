//! Subscription registry.
//!
//! Every emitter owns one registry holding its live handlers in registration
//! order. Callers receive a [`Subscription`] handle whose only capability is
//! removing the registration again.
//!
//! Subscriptions are identified by a [`SubscriptionId`](crate::SubscriptionId)
//! drawn from a monotonic counter, so removal stays correct no matter which
//! entries were removed before.
//!
//! # Example
//!
//! ```ignore
//! let emitter = Emitter::<String>::new();
//! let subscription = emitter.register(|_, message| println!("got {message}"));
//!
//! emitter.emit("hello".to_string());
//! subscription.close();
//! ```

mod registry;
mod types;

pub(crate) use registry::Registry;
pub(crate) use types::Entry;
pub use types::{Handler, Subscription};
