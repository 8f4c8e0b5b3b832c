//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Errors
pub use crate::error::{RxError, UnsubscriptionError};
// Observable, the `from` adapter and its input description
pub use crate::observable::{self, from, Observable, ObservableInput, Operation, SourceKind};
// Observer trait and the partial observer
pub use crate::observer::{ConsumerObserver, Observer};
// Async iteration bridge
pub use crate::ops::{AsyncIter, Pull};
// Source shapes
pub use crate::shape::{
  ArrayLike, AsyncIterable, InteropObservable, Iterable, PromiseLike, ReadableStreamLike,
  StreamReader, Subscribable,
};
// Subscriber
pub use crate::subscriber::{IntoSubscriber, Subscriber};
// Subscription
pub use crate::subscription::{Subscription, SubscriptionGuard, SubscriptionLike, TeardownLogic};
