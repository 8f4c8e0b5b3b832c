use std::fmt::{Debug, Formatter};

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::{
  error::{RxError, UnsubscriptionError},
  rc::MutRc,
};

/// A handle to pending teardown work, cancellable exactly once.
///
/// Handles are cheap to clone and every clone refers to the same underlying
/// subscription, so all methods take `&self`.
pub trait SubscriptionLike {
  /// Tears the subscription down. Calling it again is a no-op.
  fn unsubscribe(&self) -> Result<(), UnsubscriptionError>;

  fn is_closed(&self) -> bool;

  /// Identity of the shared handle. Two handles compare equal here exactly
  /// when they refer to the same subscription.
  fn handle_ptr(&self) -> *const ();

  /// Activates "RAII" behavior for this subscription. That means
  /// `unsubscribe()` will be called automatically as soon as the returned
  /// value goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `unsubscribe()` is called immediately, which is probably not what you
  /// want!
  fn unsubscribe_when_dropped(self) -> SubscriptionGuard<Self>
  where
    Self: Sized,
  {
    SubscriptionGuard(self)
  }
}

impl Debug for Box<dyn SubscriptionLike> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Box<dyn SubscriptionLike>")
      .field("is_closed", &self.is_closed())
      .finish()
  }
}

type TeardownFn = Box<dyn FnOnce() -> Result<(), RxError>>;

/// Something to run when a subscription is torn down.
#[derive(Default)]
pub enum TeardownLogic {
  /// Nothing to do.
  #[default]
  None,
  /// A cleanup action that may fail.
  Action(TeardownFn),
  /// A child subscription, unsubscribed together with its parent.
  Subscription(Box<dyn SubscriptionLike>),
}

impl TeardownLogic {
  /// Wraps an infallible cleanup action.
  pub fn action(f: impl FnOnce() + 'static) -> Self {
    TeardownLogic::Action(Box::new(move || {
      f();
      Ok(())
    }))
  }

  /// Wraps a cleanup action whose failure is reported by the teardown sweep.
  pub fn fallible(f: impl FnOnce() -> Result<(), RxError> + 'static) -> Self {
    TeardownLogic::Action(Box::new(f))
  }

  pub fn subscription(subscription: impl SubscriptionLike + 'static) -> Self {
    TeardownLogic::Subscription(Box::new(subscription))
  }

  fn handle_ptr(&self) -> Option<*const ()> {
    match self {
      TeardownLogic::Subscription(s) => Some(s.handle_ptr()),
      _ => None,
    }
  }

  fn is_closed_child(&self) -> bool {
    matches!(self, TeardownLogic::Subscription(s) if s.is_closed())
  }

  pub(crate) fn execute(self) -> Result<(), RxError> {
    match self {
      TeardownLogic::None => Ok(()),
      TeardownLogic::Action(f) => f(),
      TeardownLogic::Subscription(s) => s.unsubscribe().map_err(RxError::from),
    }
  }
}

impl Debug for TeardownLogic {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      TeardownLogic::None => f.write_str("TeardownLogic::None"),
      TeardownLogic::Action(_) => f.write_str("TeardownLogic::Action"),
      TeardownLogic::Subscription(s) => f.debug_tuple("TeardownLogic::Subscription").field(s).finish(),
    }
  }
}

impl From<()> for TeardownLogic {
  fn from(_: ()) -> Self { TeardownLogic::None }
}

impl From<Subscription> for TeardownLogic {
  fn from(subscription: Subscription) -> Self { TeardownLogic::subscription(subscription) }
}

#[derive(Default)]
struct Inner {
  closed: bool,
  initial_teardown: Option<TeardownFn>,
  finalizers: SmallVec<[TeardownLogic; 2]>,
}

impl Debug for Inner {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Inner")
      .field("closed", &self.closed)
      .field("teardown_count", &self.finalizers.len())
      .finish()
  }
}

thread_local! {
  static EMPTY: Subscription = Subscription(MutRc::own(Inner { closed: true, ..Inner::default() }));
}

/// A cancellable resource handle: an optional initial teardown plus an
/// insertion-ordered set of finalizers, all run by the first
/// [`unsubscribe`](SubscriptionLike::unsubscribe).
///
/// ```rust
/// use std::{cell::Cell, rc::Rc};
///
/// use rxcore::prelude::*;
///
/// let ran = Rc::new(Cell::new(0));
/// let subscription = Subscription::default();
/// let c_ran = ran.clone();
/// subscription.add(TeardownLogic::action(move || c_ran.set(c_ran.get() + 1))).unwrap();
///
/// subscription.unsubscribe().unwrap();
/// subscription.unsubscribe().unwrap();
/// assert_eq!(ran.get(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Subscription(MutRc<Inner>);

impl Subscription {
  /// Creates an open subscription that runs `teardown` first when it is
  /// unsubscribed.
  pub fn new(teardown: impl FnOnce() -> Result<(), RxError> + 'static) -> Self {
    Subscription(MutRc::own(Inner { initial_teardown: Some(Box::new(teardown)), ..Inner::default() }))
  }

  /// The shared, already-closed subscription. Anything added to it runs
  /// immediately.
  pub fn empty() -> Self { EMPTY.with(Clone::clone) }

  /// Registers `teardown` to run when this subscription is unsubscribed.
  ///
  /// If the subscription is already closed the teardown runs right away and
  /// its failure is returned. Adding the subscription to itself, or adding a
  /// child that is already registered, does nothing.
  pub fn add(&self, teardown: impl Into<TeardownLogic>) -> Result<(), UnsubscriptionError> {
    let teardown = teardown.into();
    if matches!(teardown, TeardownLogic::None) || teardown.handle_ptr() == Some(self.0.as_ptr()) {
      return Ok(());
    }

    if self.is_closed() {
      return teardown.execute().map_err(|e| UnsubscriptionError::new([e]));
    }

    let mut inner = self.0.rc_deref_mut();
    let ptr = teardown.handle_ptr();
    if ptr.is_some() && inner.finalizers.iter().any(|f| f.handle_ptr() == ptr) {
      return Ok(());
    }
    inner.finalizers.retain(|f| !f.is_closed_child());
    inner.finalizers.push(teardown);
    Ok(())
  }

  /// Removes a previously added child subscription without running it.
  /// Returns whether the child was registered.
  pub fn remove(&self, child: &dyn SubscriptionLike) -> bool {
    let ptr = Some(child.handle_ptr());
    let mut inner = self.0.rc_deref_mut();
    let before = inner.finalizers.len();
    inner.finalizers.retain(|f| f.handle_ptr() != ptr);
    inner.finalizers.len() != before
  }

  #[cfg(test)]
  pub(crate) fn teardown_size(&self) -> usize { self.0.rc_deref().finalizers.len() }
}

impl SubscriptionLike for Subscription {
  fn unsubscribe(&self) -> Result<(), UnsubscriptionError> {
    let (initial, finalizers) = {
      let mut inner = self.0.rc_deref_mut();
      if inner.closed {
        return Ok(());
      }
      inner.closed = true;
      (inner.initial_teardown.take(), std::mem::take(&mut inner.finalizers))
    };

    // No borrow is held from here on: teardowns may re-enter this handle.
    let mut errors = Vec::new();
    if let Some(Err(e)) = initial.map(|teardown| teardown()) {
      e.flatten_into(&mut errors);
    }
    for finalizer in finalizers {
      if let Err(e) = finalizer.execute() {
        e.flatten_into(&mut errors);
      }
    }

    if errors.is_empty() {
      Ok(())
    } else {
      debug!(failures = errors.len(), "subscription torn down with failures");
      Err(UnsubscriptionError::new(errors))
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.rc_deref().closed }

  #[inline]
  fn handle_ptr(&self) -> *const () { self.0.as_ptr() }
}

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard<T: SubscriptionLike>(T);

impl<T: SubscriptionLike> SubscriptionGuard<T> {
  /// Wraps an existing subscription with a guard to enable RAII behavior for
  /// it.
  pub fn new(subscription: T) -> SubscriptionGuard<T> { SubscriptionGuard(subscription) }

  pub fn get(&self) -> &T { &self.0 }
}

impl<T: SubscriptionLike> Drop for SubscriptionGuard<T> {
  fn drop(&mut self) {
    if let Err(err) = self.0.unsubscribe() {
      warn!(error = %err, "teardown failed while dropping a subscription guard");
    }
  }
}
