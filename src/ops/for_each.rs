//! ForEach operator implementation
//!
//! Subscribes to an observable and exposes its termination as a `Future`.
//!
//! ## Behavior
//!
//! - **Complete**: the future resolves with `Ok(())`
//! - **Error from observable**: the future resolves with `Err(error)`
//! - **Error from the handler**: the subscription is cancelled and the future
//!   resolves with the handler's error
//! - **Subscription torn down without terminating**: the future resolves with
//!   `Err(RxError::Dropped)`
//! - **Future dropped**: the subscription is cancelled

use std::{cell::Cell, future::Future, rc::Rc};

use futures::channel::oneshot;
use tracing::warn;

use crate::{
  error::RxError,
  observable::Observable,
  observer::ConsumerObserver,
  subscriber::Subscriber,
  subscription::{Subscription, SubscriptionLike},
};

type Settle = Rc<Cell<Option<oneshot::Sender<Result<(), RxError>>>>>;

fn settle(slot: &Settle, outcome: Result<(), RxError>) {
  if let Some(tx) = slot.take() {
    // The future may already be gone; nobody is left to tell.
    let _ = tx.send(outcome);
  }
}

impl<Item: 'static> Observable<Item> {
  /// Runs `next` for every value and resolves once the observable
  /// terminates.
  ///
  /// The subscription is made right away, exactly once per call, whether or
  /// not the returned future is polled. Dropping the future cancels it.
  ///
  /// ```rust
  /// use std::{cell::Cell, rc::Rc};
  ///
  /// use rxcore::prelude::*;
  ///
  /// # futures::executor::block_on(async {
  /// let sum = Rc::new(Cell::new(0));
  /// let c_sum = sum.clone();
  /// from(vec![1, 2, 3])
  ///   .unwrap()
  ///   .for_each(move |v| {
  ///     c_sum.set(c_sum.get() + v);
  ///     Ok(())
  ///   })
  ///   .await
  ///   .unwrap();
  /// assert_eq!(sum.get(), 6);
  /// # });
  /// ```
  pub fn for_each(
    &self,
    mut next: impl FnMut(Item) -> Result<(), RxError> + 'static,
  ) -> impl Future<Output = Result<(), RxError>> {
    let (tx, rx) = oneshot::channel();
    let slot: Settle = Rc::new(Cell::new(Some(tx)));
    let cancel = Subscription::default();

    let (n_slot, e_slot, c_slot) = (slot.clone(), slot.clone(), slot);
    let c_cancel = cancel.clone();
    let observer = ConsumerObserver::new()
      .on_next(move |value| {
        if let Err(err) = next(value) {
          settle(&n_slot, Err(err));
          if let Err(teardown) = c_cancel.unsubscribe() {
            warn!(error = %teardown, "for_each cancellation failed");
          }
        }
      })
      .on_error(move |err| settle(&e_slot, Err(err)))
      .on_complete(move || settle(&c_slot, Ok(())));

    let subscriber = Subscriber::new(observer);
    // `cancel` is fresh and open, so this cannot run anything.
    let _ = cancel.add(subscriber.clone());
    let subscribed = self.subscribe(subscriber).map(|_| ());
    let guard = cancel.unsubscribe_when_dropped();

    async move {
      let _guard = guard;
      let outcome = rx.await.unwrap_or(Err(RxError::Dropped));
      subscribed.and(outcome)
    }
  }
}
