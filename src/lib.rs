//! # rxcore: the core of a push-based reactive stream library
//!
//! Lazy observables, subscription lifetimes with at-most-once termination,
//! exhaustive teardown with aggregated failures, a `from` adapter for foreign
//! data sources, and a bridge from push to pull-based async iteration.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxcore::prelude::*;
//!
//! let subscriber = Observable::new(|subscriber: &Subscriber<i32>| {
//!   for v in 0..10 {
//!     subscriber.next(v)?;
//!   }
//!   subscriber.complete()
//! })
//! .subscribe(|v| println!("Value: {}", v))
//! .unwrap();
//!
//! assert!(subscriber.is_closed());
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | A lazy push source, run once per `subscribe` |
//! | [`Observer`] | Consumes `next`, `error`, and `complete` events |
//! | [`Subscriber`] | Drives an observer and guards its termination |
//! | [`Subscription`] | Handle to cancel an active subscription |
//! | [`from`] | Adapts arrays, iterables, futures and streams |
//! | [`AsyncIter`] | Pull-based view over an observable |
//!
//! Everything is single-threaded. The async adapters run as local tokio
//! tasks, so they have to be subscribed inside a
//! [`tokio::task::LocalSet`].
//!
//! [`Observable`]: observable::Observable
//! [`Observer`]: observer::Observer
//! [`Subscriber`]: subscriber::Subscriber
//! [`Subscription`]: subscription::Subscription
//! [`from`]: observable::from
//! [`AsyncIter`]: ops::AsyncIter

pub mod error;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod rc;
pub mod shape;
pub mod subscriber;
pub mod subscription;

// Re-export the prelude module
pub use prelude::*;

