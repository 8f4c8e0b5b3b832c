use std::{
  future::Future,
  panic::{self, AssertUnwindSafe},
  rc::Rc,
};

use tracing::error;

use crate::{
  error::RxError,
  observable::Observable,
  observer::Observer,
  shape::PromiseLike,
  subscriber::Subscriber,
  subscription::{SubscriptionLike, TeardownLogic},
};

/// Converts a settled-once value to an observable sequence: `Ok(v)` is
/// emitted as a value followed by completion, `Err(e)` as an error.
///
/// The outcome is awaited on a local task, so the observable must be
/// subscribed inside a [`tokio::task::LocalSet`]; anywhere else the
/// subscription errors with [`RxError::NoLocalSet`]. Unsubscribing drops the
/// pending wait; a promise settling after the subscriber is closed emits
/// nothing.
///
/// An error raised by the observer while the outcome is delivered is a fault
/// of the adapter, not a stream error: it is logged, the subscriber is torn
/// down and the error becomes the result of the driving task.
///
/// ```rust
/// use std::rc::Rc;
///
/// use futures::FutureExt;
/// use rxcore::prelude::*;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let local = tokio::task::LocalSet::new();
/// local
///   .run_until(async {
///     let promise = futures::future::ready(Ok::<_, RxError>(1)).shared();
///     observable::from_promise(Rc::new(promise))
///       .subscribe(|v| println!("{v}"))
///       .unwrap();
///   })
///   .await;
/// local.await;
/// # }
/// ```
pub fn from_promise<Item: 'static>(promise: Rc<dyn PromiseLike<Item>>) -> Observable<Item> {
  Observable::new(move |subscriber: &Subscriber<Item>| {
    let outcome = promise.to_future();
    let subscriber = subscriber.clone();
    spawn_driver(async move {
      let delivered = match outcome.await {
        Ok(_) if subscriber.is_closed() => Ok(()),
        Ok(value) => subscriber.next(value).and_then(|()| subscriber.complete()),
        Err(err) => subscriber.error(err),
      };
      if let Err(err) = &delivered {
        error!(error = %err, "promise outcome could not be delivered");
        subscriber.abandon();
      }
      delivered
    })
  })
}

/// Spawns `driver` on the current `LocalSet` and returns the teardown that
/// aborts it.
pub(super) fn spawn_driver<F>(driver: F) -> Result<TeardownLogic, RxError>
where
  F: Future + 'static,
  F::Output: 'static,
{
  // tokio offers no fallible `spawn_local`: outside a `LocalSet` it panics.
  let task = panic::catch_unwind(AssertUnwindSafe(|| tokio::task::spawn_local(driver)))
    .map_err(|_| RxError::NoLocalSet)?;
  Ok(TeardownLogic::action(move || task.abort()))
}
