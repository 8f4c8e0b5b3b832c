use std::rc::Rc;

use tracing::trace;

use crate::{
  error::RxError,
  observer::Observer,
  shape::{InteropObservable, Subscribable},
  subscriber::{IntoSubscriber, Subscriber},
  subscription::TeardownLogic,
};

mod from;
mod from_future;
mod from_iter;
mod from_stream;
pub use from::*;
pub use from_future::from_promise;
pub use from_iter::{from_array_like, from_iterable};
pub use from_stream::{from_async_iterable, from_readable_stream};

type SubscribeFn<Item> = dyn Fn(&Subscriber<Item>) -> Result<TeardownLogic, RxError>;

/// An operation usable with [`Observable::pipe_all`].
pub type Operation<Item> = Box<dyn FnOnce(Observable<Item>) -> Observable<Item>>;

/// A representation of any set of values over any amount of time: a lazy push
/// source.
///
/// An observable only holds its subscribe function; every call to
/// [`subscribe`](Observable::subscribe) runs that function again with a new
/// [`Subscriber`], so one instance can be subscribed any number of times.
/// Clones share the same function.
///
/// ```rust
/// use std::{cell::RefCell, rc::Rc};
///
/// use rxcore::prelude::*;
///
/// let seen = Rc::new(RefCell::new(vec![]));
/// let c_seen = seen.clone();
/// Observable::new(|subscriber: &Subscriber<i32>| {
///   subscriber.next(1)?;
///   subscriber.next(2)?;
///   subscriber.complete()?;
///   Ok(())
/// })
/// .subscribe(move |v| c_seen.borrow_mut().push(v))
/// .unwrap();
///
/// assert_eq!(*seen.borrow(), vec![1, 2]);
/// ```
pub struct Observable<Item>(Rc<SubscribeFn<Item>>);

impl<Item> Clone for Observable<Item> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<Item: 'static> Observable<Item> {
  /// param `subscribe`: the function that is called when the Observable is
  /// subscribed to. It is given a Subscriber, to which new values can be
  /// `next`ed, or an `error` method can be called to raise an error, or
  /// `complete` can be called to notify of a successful completion.
  ///
  /// Whatever teardown it returns runs when the subscriber is torn down. An
  /// `Err` it returns is delivered as an `error` notification.
  pub fn new<F, T>(subscribe: F) -> Self
  where
    F: Fn(&Subscriber<Item>) -> Result<T, RxError> + 'static,
    T: Into<TeardownLogic>,
  {
    Observable(Rc::new(move |subscriber: &Subscriber<Item>| -> Result<TeardownLogic, RxError> {
      subscribe(subscriber).map(Into::into)
    }))
  }

  /// Subscribes `observer` and returns the subscriber driving it, which is
  /// also the handle to cancel the subscription.
  ///
  /// A [`Subscriber`] is used as-is; anything else is wrapped in a new one.
  ///
  /// # Errors
  ///
  /// An error raised by one of the observer's own handlers during the
  /// synchronous part of the subscription is returned here, as is an error
  /// the observer left unhandled or a teardown failure. A raising observer is
  /// unsubscribed before its error is returned.
  pub fn subscribe(&self, observer: impl IntoSubscriber<Item>) -> Result<Subscriber<Item>, RxError> {
    let subscriber = observer.into_subscriber();
    subscriber.reset_raised();
    trace!("observable subscribed");
    match (self.0)(&subscriber) {
      Ok(teardown) => subscriber.add(teardown)?,
      Err(err) if subscriber.has_raised() => {
        subscriber.abandon();
        return Err(err);
      }
      Err(err) => subscriber.error(err)?,
    }
    Ok(subscriber)
  }

  /// Applies one operation to this observable.
  pub fn pipe<R>(self, op: impl FnOnce(Self) -> R) -> R { op(self) }

  /// Applies `ops` left to right: `[f, g]` yields `g(f(self))`. With no
  /// operations the observable itself is returned.
  pub fn pipe_all(self, ops: impl IntoIterator<Item = Operation<Item>>) -> Self {
    ops.into_iter().fold(self, |source, op| op(source))
  }
}

impl<Item> Observable<Item> {
  /// Whether both handles share the same subscribe function.
  pub fn ptr_eq(&self, other: &Self) -> bool { std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0)) }
}

impl<Item: 'static> Subscribable<Item> for Observable<Item> {
  fn subscribe_with(&self, subscriber: Subscriber<Item>) -> Result<TeardownLogic, RxError> {
    Ok(self.subscribe(subscriber)?.into())
  }
}

/// The interop tag: an observable hands out itself.
impl<Item: 'static> InteropObservable<Item> for Observable<Item> {
  fn interop_observable(&self) -> Option<Rc<dyn Subscribable<Item>>> { Some(Rc::new(self.clone())) }
}
