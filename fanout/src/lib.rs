//! Side-effect delivery for payment-concept mutations: cache invalidation
//! scheduling and recipient notification fan-out, both running through a
//! shared deferred task queue.

pub mod cache;
pub mod invalidation;
pub mod jitter;
pub mod message;
pub mod notifier;
pub mod queue;
pub mod runner;

pub use cache::{CacheBackend, CacheError, MemoryCache};
pub use invalidation::{Coordinator, InvalidationWorker};
pub use jitter::{FixedJitter, Jitter, RandomJitter};
pub use notifier::{DeliveryError, NotificationDelivery, Notifier};
pub use queue::TokioTaskQueue;
pub use runner::FanoutRunner;
