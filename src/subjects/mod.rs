//! Per-key reactive subscriptions.
//!
//! This module provides the observable half of the store:
//! - [`Subject`]: a replay-latest multicast value holder for one
//!   (key, kind) pair
//! - [`Subscription`]: a single subscriber's receiving end
//! - [`ObservableRegistry`]: lazy subject creation plus fan-out from the
//!   backend's change-notification channel
//!
//! # Example
//!
//! ```ignore
//! let registry = ObservableRegistry::new(backend);
//!
//! let count = registry.observe::<i32>("count", 0)?;
//! let sub = count.subscribe();
//!
//! // The current value arrives immediately, then every change.
//! assert_eq!(sub.recv()?, 0);
//! ```

mod registry;
mod subject;

pub use registry::ObservableRegistry;
pub use subject::{Subject, Subscription};
