//! IntoAsyncIter Operator
//!
//! Bridges the push-based `Observable` to pull-based async iteration.
//!
//! Values pushed by the source while nobody is pulling are buffered without
//! bound; pulls made while the buffer is empty are parked until the source
//! pushes, completes or errors. The source is only subscribed on the first
//! pull.
//!
//! # Example
//!
//! ```rust
//! use rxcore::prelude::*;
//!
//! # futures::executor::block_on(async {
//! let mut iter = from(vec!['a', 'b']).unwrap().into_async_iter();
//!
//! while let Some(value) = iter.next().await.unwrap() {
//!   println!("Received: {}", value);
//! }
//! # });
//! ```

use std::{
  collections::VecDeque,
  future::Future,
  pin::Pin,
  task::{Context as AsyncContext, Poll},
};

use futures::{channel::oneshot, Stream};
use tracing::warn;

use crate::{
  error::RxError,
  observable::Observable,
  observer::Observer,
  rc::MutRc,
  subscriber::Subscriber,
  subscription::SubscriptionLike,
};

type Step<Item> = Result<Option<Item>, RxError>;

/// Per-iterator bridge state. Nothing outside one [`AsyncIter`] shares it.
struct BridgeState<Item> {
  /// Values pushed before anyone pulled them.
  values: VecDeque<Item>,
  /// Pulls waiting for the next value, oldest first.
  deferreds: VecDeque<oneshot::Sender<Step<Item>>>,
  completed: bool,
  error: Option<RxError>,
}

impl<Item> Default for BridgeState<Item> {
  fn default() -> Self {
    Self { values: VecDeque::new(), deferreds: VecDeque::new(), completed: false, error: None }
  }
}

impl<Item> BridgeState<Item> {
  fn push(&mut self, value: Item) {
    while let Some(deferred) = self.deferreds.pop_front() {
      // A parked pull whose future was dropped cannot take the value.
      if !deferred.is_canceled() {
        let _ = deferred.send(Ok(Some(value)));
        return;
      }
    }
    self.values.push_back(value);
  }

  fn complete(&mut self) {
    self.completed = true;
    for deferred in self.deferreds.drain(..) {
      let _ = deferred.send(Ok(None));
    }
  }

  fn fail(&mut self, err: RxError) {
    for deferred in self.deferreds.drain(..) {
      let _ = deferred.send(Err(err.clone()));
    }
    self.error = Some(err);
  }

  fn is_settled(&self) -> bool { self.completed || self.error.is_some() }

  fn pull(&mut self) -> Pull<Item> {
    if let Some(value) = self.values.pop_front() {
      return Pull::ready(Ok(Some(value)));
    }
    if self.completed {
      return Pull::ready(Ok(None));
    }
    if let Some(err) = &self.error {
      return Pull::ready(Err(err.clone()));
    }
    let (tx, rx) = oneshot::channel();
    self.deferreds.push_back(tx);
    Pull(PullState::Waiting(rx))
  }
}

struct BridgeObserver<Item>(MutRc<BridgeState<Item>>);

impl<Item> Observer<Item> for BridgeObserver<Item> {
  fn next(&self, value: Item) -> Result<(), RxError> {
    self.0.rc_deref_mut().push(value);
    Ok(())
  }

  fn error(&self, err: RxError) -> Result<(), RxError> {
    self.0.rc_deref_mut().fail(err);
    Ok(())
  }

  fn complete(&self) -> Result<(), RxError> {
    self.0.rc_deref_mut().complete();
    Ok(())
  }
}

enum PullState<Item> {
  Ready(Option<Step<Item>>),
  Waiting(oneshot::Receiver<Step<Item>>),
}

/// One pending step of an [`AsyncIter`].
///
/// Resolves to `Ok(Some(value))` for a value, `Ok(None)` once the source is
/// done, or `Err` if it errored.
pub struct Pull<Item>(PullState<Item>);

impl<Item> Pull<Item> {
  fn ready(step: Step<Item>) -> Self { Pull(PullState::Ready(Some(step))) }
}

impl<Item> Unpin for Pull<Item> {}

impl<Item> Future for Pull<Item> {
  type Output = Step<Item>;

  fn poll(self: Pin<&mut Self>, cx: &mut AsyncContext<'_>) -> Poll<Self::Output> {
    match &mut self.get_mut().0 {
      PullState::Ready(step) => Poll::Ready(step.take().unwrap_or(Ok(None))),
      // The bridge went away with the iterator: nothing more will come.
      PullState::Waiting(rx) => Pin::new(rx).poll(cx).map(|step| step.unwrap_or(Ok(None))),
    }
  }
}

/// An async iterator over the values of an [`Observable`].
///
/// Created with [`Observable::into_async_iter`]. It can be driven step by
/// step with [`next`](AsyncIter::next), stopped with
/// [`close`](AsyncIter::close) or [`throw`](AsyncIter::throw), or consumed as
/// a `futures::Stream` of `Result<Item, RxError>`, which ends after the first
/// error.
///
/// Dropping the iterator unsubscribes from the source.
pub struct AsyncIter<Item> {
  source: Observable<Item>,
  state: MutRc<BridgeState<Item>>,
  subscription: Option<Subscriber<Item>>,
  pending: Option<Pull<Item>>,
  done: bool,
}

impl<Item: 'static> AsyncIter<Item> {
  fn new(source: Observable<Item>) -> Self {
    AsyncIter {
      source,
      state: MutRc::own(BridgeState::default()),
      subscription: None,
      pending: None,
      done: false,
    }
  }

  /// Pulls the next step, subscribing to the source on the first call.
  pub fn next(&mut self) -> Pull<Item> {
    self.subscribe_once();
    self.state.rc_deref_mut().pull()
  }

  /// Unsubscribes from the source, settles the iterator as errored with
  /// `err`, and resolves to `err`.
  pub fn throw(&mut self, err: RxError) -> Pull<Item> {
    let torn_down = self.unsubscribe();
    self.state.rc_deref_mut().fail(err.clone());
    Pull::ready(torn_down.and(Err(err)))
  }

  /// Unsubscribes from the source, settles the iterator as done, and
  /// resolves to `Ok(None)` unless the teardown failed.
  pub fn close(&mut self) -> Pull<Item> {
    let torn_down = self.unsubscribe();
    self.state.rc_deref_mut().complete();
    Pull::ready(torn_down.map(|()| None))
  }

  fn subscribe_once(&mut self) {
    if self.subscription.is_some() || self.state.rc_deref().is_settled() {
      return;
    }
    let observer = BridgeObserver(self.state.clone());
    match self.source.subscribe(Subscriber::new(observer)) {
      Ok(subscriber) => self.subscription = Some(subscriber),
      Err(err) => {
        let mut state = self.state.rc_deref_mut();
        if !state.is_settled() {
          state.fail(err);
        }
      }
    }
  }

  fn unsubscribe(&mut self) -> Result<(), RxError> {
    match self.subscription.take() {
      Some(subscriber) => subscriber.unsubscribe().map_err(RxError::from),
      None => Ok(()),
    }
  }
}

impl<Item: 'static> Stream for AsyncIter<Item> {
  type Item = Result<Item, RxError>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut AsyncContext<'_>) -> Poll<Option<Self::Item>> {
    let this = self.get_mut();
    if this.done {
      return Poll::Ready(None);
    }

    let mut pull = match this.pending.take() {
      Some(pull) => pull,
      None => this.next(),
    };
    match Pin::new(&mut pull).poll(cx) {
      Poll::Pending => {
        this.pending = Some(pull);
        Poll::Pending
      }
      Poll::Ready(Ok(Some(value))) => Poll::Ready(Some(Ok(value))),
      Poll::Ready(Ok(None)) => {
        this.done = true;
        Poll::Ready(None)
      }
      Poll::Ready(Err(err)) => {
        this.done = true;
        Poll::Ready(Some(Err(err)))
      }
    }
  }
}

impl<Item> Drop for AsyncIter<Item> {
  fn drop(&mut self) {
    if let Some(subscriber) = self.subscription.take() {
      if let Err(err) = subscriber.unsubscribe() {
        warn!(error = %err, "async iterator dropped with a failing teardown");
      }
    }
  }
}

impl<Item: 'static> Observable<Item> {
  /// Converts this observable into an [`AsyncIter`]. Nothing is subscribed
  /// until the first pull.
  pub fn into_async_iter(self) -> AsyncIter<Item> { AsyncIter::new(self) }
}
