//! Observer trait and the partial-observer adapter
//!
//! The Observer trait defines the consumer of data in the reactive pattern.
//! It provides three methods: next (for values), error (for errors), and
//! complete (for stream completion).

use std::cell::RefCell;

use crate::error::RxError;

// ============================================================================
// Observer Trait
// ============================================================================

/// Observer trait: The consumer of data in reactive programming
///
/// An Observer receives values, errors, and completion notifications from
/// an Observable. Every method returns the error raised by the consumer, if
/// any; it is handed back to whoever emitted the notification and is never
/// turned into a new `error` notification.
pub trait Observer<Item> {
  /// Receive the next value from the observable
  fn next(&self, value: Item) -> Result<(), RxError>;

  /// Handle an error from the observable
  fn error(&self, err: RxError) -> Result<(), RxError>;

  /// Handle completion of the observable
  fn complete(&self) -> Result<(), RxError>;
}

type NextFn<Item> = Box<dyn FnMut(Item) -> Result<(), RxError>>;
type ErrorFn = Box<dyn FnMut(RxError) -> Result<(), RxError>>;
type CompleteFn = Box<dyn FnMut() -> Result<(), RxError>>;

// ============================================================================
// ConsumerObserver - partial observer adapter
// ============================================================================

/// Turns any subset of `next` / `error` / `complete` handlers into a full
/// [`Observer`].
///
/// - a missing `next` or `complete` handler ignores the notification;
/// - a missing `error` handler re-raises the error to the caller, so errors
///   are never dropped silently.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let observer = ConsumerObserver::new().on_next(|v: i32| println!("{v}"));
/// assert!(observer.next(1).is_ok());
/// assert!(observer.complete().is_ok());
/// assert!(observer.error(RxError::msg("unhandled")).is_err());
/// ```
pub struct ConsumerObserver<Item> {
  next: RefCell<Option<NextFn<Item>>>,
  error: RefCell<Option<ErrorFn>>,
  complete: RefCell<Option<CompleteFn>>,
}

impl<Item> Default for ConsumerObserver<Item> {
  fn default() -> Self {
    Self { next: RefCell::new(None), error: RefCell::new(None), complete: RefCell::new(None) }
  }
}

impl<Item> ConsumerObserver<Item> {
  /// An observer with no handlers at all.
  pub fn new() -> Self { Self::default() }

  pub fn on_next(self, mut f: impl FnMut(Item) + 'static) -> Self {
    self.try_on_next(move |v| {
      f(v);
      Ok(())
    })
  }

  pub fn on_error(self, mut f: impl FnMut(RxError) + 'static) -> Self {
    self.try_on_error(move |e| {
      f(e);
      Ok(())
    })
  }

  pub fn on_complete(self, mut f: impl FnMut() + 'static) -> Self {
    self.try_on_complete(move || {
      f();
      Ok(())
    })
  }

  /// Sets a `next` handler that may raise.
  pub fn try_on_next(self, f: impl FnMut(Item) -> Result<(), RxError> + 'static) -> Self {
    *self.next.borrow_mut() = Some(Box::new(f));
    self
  }

  /// Sets an `error` handler that may raise.
  pub fn try_on_error(self, f: impl FnMut(RxError) -> Result<(), RxError> + 'static) -> Self {
    *self.error.borrow_mut() = Some(Box::new(f));
    self
  }

  /// Sets a `complete` handler that may raise.
  pub fn try_on_complete(self, f: impl FnMut() -> Result<(), RxError> + 'static) -> Self {
    *self.complete.borrow_mut() = Some(Box::new(f));
    self
  }
}

impl<Item> Observer<Item> for ConsumerObserver<Item> {
  fn next(&self, value: Item) -> Result<(), RxError> {
    let mut handler = self.next.try_borrow_mut().map_err(|_| RxError::Reentrant { handler: "next" })?;
    match handler.as_mut() {
      Some(f) => f(value),
      None => Ok(()),
    }
  }

  fn error(&self, err: RxError) -> Result<(), RxError> {
    let mut handler =
      self.error.try_borrow_mut().map_err(|_| RxError::Reentrant { handler: "error" })?;
    match handler.as_mut() {
      Some(f) => f(err),
      None => Err(err),
    }
  }

  fn complete(&self) -> Result<(), RxError> {
    let mut handler =
      self.complete.try_borrow_mut().map_err(|_| RxError::Reentrant { handler: "complete" })?;
    match handler.as_mut() {
      Some(f) => f(),
      None => Ok(()),
    }
  }
}

// ============================================================================
// Tests
// ============================================================================
