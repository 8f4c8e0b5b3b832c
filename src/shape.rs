//! Capability traits describing the shapes of data sources `from` accepts.
//!
//! Each trait stands for one kind of foreign source: something indexable,
//! something iterable (synchronously or asynchronously), a settled-once
//! future, a lock-based readable stream, or another reactive implementation.
//! [`ObservableInput`](crate::observable::ObservableInput) records which of
//! these capabilities an input exposes.

use std::{collections::VecDeque, future::Future, rc::Rc};

use futures::{
  future::{LocalBoxFuture, Shared},
  stream::LocalBoxStream,
  FutureExt, Stream, StreamExt,
};

use crate::{error::RxError, subscriber::Subscriber, subscription::TeardownLogic};

/// Indexable, sized collection. Elements are emitted in index order.
///
/// The method names stay clear of the inherent `len` / `get` of the standard
/// collections, so the trait can sit in scope next to them.
pub trait ArrayLike<Item> {
  fn length(&self) -> usize;

  /// The element at `index`. Every index below `length()` must yield one;
  /// a `None` there is reported as a stream error.
  fn at(&self, index: usize) -> Option<Item>;
}

impl<T: Clone> ArrayLike<T> for Vec<T> {
  fn length(&self) -> usize { self.len() }
  fn at(&self, index: usize) -> Option<T> { self.as_slice().get(index).cloned() }
}

impl<T: Clone, const N: usize> ArrayLike<T> for [T; N] {
  fn length(&self) -> usize { N }
  fn at(&self, index: usize) -> Option<T> { self.as_slice().get(index).cloned() }
}

impl<T: Clone> ArrayLike<T> for VecDeque<T> {
  fn length(&self) -> usize { self.len() }
  fn at(&self, index: usize) -> Option<T> { self.get(index).cloned() }
}

impl<T: Clone> ArrayLike<T> for Rc<[T]> {
  fn length(&self) -> usize { self.as_ref().len() }
  fn at(&self, index: usize) -> Option<T> { self.as_ref().get(index).cloned() }
}

/// A synchronous source that can be iterated once per subscription.
pub trait Iterable<Item> {
  fn to_iter(&self) -> Box<dyn Iterator<Item = Item>>;
}

impl<I> Iterable<I::Item> for I
where
  I: IntoIterator + Clone,
  I::IntoIter: 'static,
{
  fn to_iter(&self) -> Box<dyn Iterator<Item = I::Item>> { Box::new(self.clone().into_iter()) }
}

/// An asynchronous source producing a fresh stream per subscription. An `Err`
/// item ends the stream with that error.
pub trait AsyncIterable<Item> {
  fn async_iter(&self) -> LocalBoxStream<'static, Result<Item, RxError>>;
}

impl<F, S, Item> AsyncIterable<Item> for F
where
  F: Fn() -> S,
  S: Stream<Item = Result<Item, RxError>> + 'static,
{
  fn async_iter(&self) -> LocalBoxStream<'static, Result<Item, RxError>> { self().boxed_local() }
}

/// A value that settles once; every consumer observes the same outcome.
pub trait PromiseLike<Item> {
  fn to_future(&self) -> LocalBoxFuture<'static, Result<Item, RxError>>;
}

impl<F, Item> PromiseLike<Item> for Shared<F>
where
  F: Future<Output = Result<Item, RxError>> + 'static,
  Item: Clone + 'static,
{
  fn to_future(&self) -> LocalBoxFuture<'static, Result<Item, RxError>> { self.clone().boxed_local() }
}

/// The reader half of a [`ReadableStreamLike`]. `read` yields `Ok(None)` once
/// the stream is exhausted.
pub trait StreamReader<Item> {
  fn read(&mut self) -> LocalBoxFuture<'_, Result<Option<Item>, RxError>>;

  /// Gives the lock acquired by `get_reader` back to the stream.
  fn release_lock(&mut self);
}

/// A lock-based stream: values are read through an exclusive reader.
pub trait ReadableStreamLike<Item> {
  fn get_reader(&self) -> Box<dyn StreamReader<Item>>;
}

/// Anything that can be subscribed with a [`Subscriber`].
pub trait Subscribable<Item> {
  fn subscribe_with(&self, subscriber: Subscriber<Item>) -> Result<TeardownLogic, RxError>;
}

/// A foreign reactive implementation. The trait itself is the well-known
/// registration token: implementing it is what marks a value as an interop
/// observable.
///
/// `None` means the value claims to be observable but offers nothing to
/// subscribe to.
pub trait InteropObservable<Item> {
  fn interop_observable(&self) -> Option<Rc<dyn Subscribable<Item>>>;
}
