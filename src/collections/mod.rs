//! Small generic containers.
//!
//! - [`Set`]: a concurrent hash set, used by the deduplicator to track keys
//!   inside their TTL window
//! - [`Stack`]: a plain LIFO stack

mod set;
mod stack;

pub use set::Set;
pub use stack::Stack;
