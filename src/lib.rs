//! # Herald
//!
//! A thread-safe, in-process publish/subscribe emitter meant to serve as the
//! notification backbone of a larger application.
//!
//! ## Core Concepts
//!
//! - **Subscriptions**: handlers registered on an emitter, revocable through
//!   their handle
//! - **Fan-out**: one payload delivered to a snapshot of live handlers, each
//!   invocation on its own unit of concurrency
//! - **TTL suppression**: bursts of emissions sharing a key collapse into one
//!   delivery per window
//!
//! ## Example
//!
//! ```ignore
//! use herald::Emitter;
//! use std::time::Duration;
//!
//! let emitter = Emitter::<String>::new();
//! let subscription = emitter.register(|_, message| println!("got {message}"));
//!
//! // Waits for every handler.
//! emitter.emit("ready".to_string());
//!
//! // Returns immediately.
//! emitter.emit_async("working".to_string());
//!
//! // Delivered once, the second call falls inside the window.
//! emitter.emit_ttl("disk full".to_string(), "disk", Duration::from_secs(30));
//! emitter.emit_ttl("disk full".to_string(), "disk", Duration::from_secs(30));
//!
//! subscription.close();
//! ```

pub mod collections;
mod dedup;
mod dispatch;
pub mod emitter;
pub mod error;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use collections::{Set, Stack};
pub use emitter::{Emitter, EmitterConfig, WeakEmitter};
pub use error::{EmitterError, Result};
pub use subscriptions::{Handler, Subscription};
pub use types::{EmitterStats, SubscriptionId};
