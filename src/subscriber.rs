use std::{
  cell::{Cell, RefCell},
  fmt::{Debug, Formatter},
  rc::Rc,
};

use tracing::{trace, warn};

use crate::{
  error::{RxError, UnsubscriptionError},
  observer::{ConsumerObserver, Observer},
  subscription::{Subscription, SubscriptionLike, TeardownLogic},
};

struct Inner<Item> {
  subscription: Subscription,
  stopped: Cell<bool>,
  raised: Cell<bool>,
  destination: RefCell<Option<Rc<dyn Observer<Item>>>>,
  finalize: Cell<Option<Box<dyn FnOnce()>>>,
}

/// A [`Subscription`] that also forwards notifications to a destination
/// observer, delivering at most one terminal notification.
///
/// Lifecycle: `ACTIVE -> (ERRORED | COMPLETED) -> CLOSED`. The subscriber is
/// marked stopped *before* the destination's terminal handler runs, and it is
/// always unsubscribed after that handler returns, whether or not it raised.
///
/// Clones share all state, which is what makes the subscriber usable as the
/// cancellation handle returned by `subscribe`.
pub struct Subscriber<Item>(Rc<Inner<Item>>);

impl<Item> Clone for Subscriber<Item> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<Item> Debug for Subscriber<Item> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscriber")
      .field("is_stopped", &self.0.stopped.get())
      .field("subscription", &self.0.subscription)
      .finish()
  }
}

impl<Item: 'static> Subscriber<Item> {
  /// Creates a subscriber delivering to `observer`.
  pub fn new(observer: impl Observer<Item> + 'static) -> Self {
    Subscriber(Rc::new(Inner {
      subscription: Subscription::default(),
      stopped: Cell::new(false),
      raised: Cell::new(false),
      destination: RefCell::new(Some(Rc::new(observer))),
      finalize: Cell::new(None),
    }))
  }

  /// Creates a subscriber that forwards to an existing one and is registered
  /// as its child, so cancelling `destination` also cancels the new
  /// subscriber.
  pub fn chained(destination: &Subscriber<Item>) -> Self {
    let subscriber = Self::new(destination.clone());
    // A fresh subscriber has nothing to tear down yet.
    if let Err(err) = destination.add(subscriber.clone()) {
      warn!(error = %err, "chained subscriber registered on a closed destination");
    }
    subscriber
  }

  /// Runs `f` once, after this subscriber's own teardown has completed.
  pub fn with_finalize(self, f: impl FnOnce() + 'static) -> Self {
    self.0.finalize.set(Some(Box::new(f)));
    self
  }
}

impl<Item> Subscriber<Item> {
  /// Registers `teardown` to run when this subscriber is unsubscribed. See
  /// [`Subscription::add`].
  pub fn add(&self, teardown: impl Into<TeardownLogic>) -> Result<(), UnsubscriptionError> {
    let teardown = teardown.into();
    if matches!(&teardown, TeardownLogic::Subscription(s) if s.handle_ptr() == self.handle_ptr()) {
      return Ok(());
    }
    self.0.subscription.add(teardown)
  }

  /// Whether a terminal notification was delivered or the subscriber was
  /// unsubscribed.
  #[inline]
  pub fn is_stopped(&self) -> bool { self.0.stopped.get() }

  /// Whether a consumer handler raised since the last reset.
  pub(crate) fn has_raised(&self) -> bool { self.0.raised.get() }

  pub(crate) fn reset_raised(&self) { self.0.raised.set(false) }

  /// Tears the subscriber down after its consumer raised. The consumer is
  /// not notified; a teardown failure can only be logged.
  pub(crate) fn abandon(&self) {
    if let Err(teardown) = self.unsubscribe() {
      warn!(error = %teardown, "teardown failed after the consumer raised");
    }
  }

  fn destination(&self) -> Option<Rc<dyn Observer<Item>>> { self.0.destination.borrow().clone() }

  fn raise(&self, result: Result<(), RxError>) -> Result<(), RxError> {
    if result.is_err() {
      self.0.raised.set(true);
    }
    result
  }

  fn terminate(&self, handled: Result<(), RxError>) -> Result<(), RxError> {
    let result = match (handled, self.unsubscribe()) {
      (handled, Ok(())) => handled,
      (Ok(()), Err(teardown)) => Err(teardown.into()),
      (Err(raised), Err(teardown)) => {
        warn!(error = %raised, "terminal handler error superseded by teardown failure");
        Err(teardown.into())
      }
    };
    self.raise(result)
  }
}

impl<Item> Observer<Item> for Subscriber<Item> {
  fn next(&self, value: Item) -> Result<(), RxError> {
    if self.is_stopped() {
      return Ok(());
    }
    match self.destination() {
      Some(destination) => self.raise(destination.next(value)),
      None => Ok(()),
    }
  }

  fn error(&self, err: RxError) -> Result<(), RxError> {
    if self.0.stopped.replace(true) {
      return Ok(());
    }
    let handled = match self.destination() {
      Some(destination) => destination.error(err),
      None => Err(err),
    };
    self.terminate(handled)
  }

  fn complete(&self) -> Result<(), RxError> {
    if self.0.stopped.replace(true) {
      return Ok(());
    }
    let handled = self.destination().map_or(Ok(()), |destination| destination.complete());
    self.terminate(handled)
  }
}

impl<Item> SubscriptionLike for Subscriber<Item> {
  fn unsubscribe(&self) -> Result<(), UnsubscriptionError> {
    self.0.stopped.set(true);
    let result = self.0.subscription.unsubscribe();
    let released = self.0.destination.borrow_mut().take();
    if released.is_some() {
      trace!("subscriber released its destination");
    }
    drop(released);
    if let Some(finalize) = self.0.finalize.take() {
      finalize();
    }
    result
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.subscription.is_closed() }

  #[inline]
  fn handle_ptr(&self) -> *const () { Rc::as_ptr(&self.0).cast() }
}

impl<Item: 'static> From<Subscriber<Item>> for TeardownLogic {
  fn from(subscriber: Subscriber<Item>) -> Self { TeardownLogic::subscription(subscriber) }
}

// ============================================================================
// IntoSubscriber
// ============================================================================

/// Anything `Observable::subscribe` accepts: an existing [`Subscriber`]
/// (used as-is), a [`ConsumerObserver`], a bare `next` closure, or `()` for
/// an observer without handlers.
pub trait IntoSubscriber<Item> {
  fn into_subscriber(self) -> Subscriber<Item>;
}

impl<Item> IntoSubscriber<Item> for Subscriber<Item> {
  #[inline]
  fn into_subscriber(self) -> Subscriber<Item> { self }
}

impl<Item: 'static> IntoSubscriber<Item> for ConsumerObserver<Item> {
  fn into_subscriber(self) -> Subscriber<Item> { Subscriber::new(self) }
}

impl<Item: 'static> IntoSubscriber<Item> for () {
  fn into_subscriber(self) -> Subscriber<Item> { Subscriber::new(ConsumerObserver::new()) }
}

impl<Item, F> IntoSubscriber<Item> for F
where
  Item: 'static,
  F: FnMut(Item) + 'static,
{
  fn into_subscriber(self) -> Subscriber<Item> { Subscriber::new(ConsumerObserver::new().on_next(self)) }
}
