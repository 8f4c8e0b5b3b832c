use std::{future::Future, rc::Rc};

use futures::FutureExt;
use smallvec::SmallVec;
use tracing::debug;

use crate::{
  error::RxError,
  observable::{
    from_array_like, from_async_iterable, from_iterable, from_promise, from_readable_stream,
    Observable,
  },
  shape::{ArrayLike, AsyncIterable, InteropObservable, Iterable, PromiseLike, ReadableStreamLike},
  subscriber::Subscriber,
};

/// The kinds of source [`from`] knows how to adapt.
///
/// The declaration order is the classification priority: when an input
/// exposes several shapes, the smallest kind wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
  Own = 1,
  InteropObservable,
  ArrayLike,
  Promise,
  AsyncIterable,
  Iterable,
  ReadableStreamLike,
}

enum Shape<Item> {
  Own(Observable<Item>),
  Interop(Rc<dyn InteropObservable<Item>>),
  ArrayLike(Rc<dyn ArrayLike<Item>>),
  Promise(Rc<dyn PromiseLike<Item>>),
  AsyncIterable(Rc<dyn AsyncIterable<Item>>),
  Iterable(Rc<dyn Iterable<Item>>),
  ReadableStream(Rc<dyn ReadableStreamLike<Item>>),
}

impl<Item> Shape<Item> {
  fn kind(&self) -> SourceKind {
    match self {
      Shape::Own(_) => SourceKind::Own,
      Shape::Interop(_) => SourceKind::InteropObservable,
      Shape::ArrayLike(_) => SourceKind::ArrayLike,
      Shape::Promise(_) => SourceKind::Promise,
      Shape::AsyncIterable(_) => SourceKind::AsyncIterable,
      Shape::Iterable(_) => SourceKind::Iterable,
      Shape::ReadableStream(_) => SourceKind::ReadableStreamLike,
    }
  }
}

/// A value handed to [`from`], described by every capability it exposes.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let input = ObservableInput::new().with_iterable(1..4).with_array_like(vec![1, 2, 3]);
/// assert_eq!(input.classify(), Some(SourceKind::ArrayLike));
/// ```
pub struct ObservableInput<Item> {
  shapes: SmallVec<[Shape<Item>; 2]>,
  received: Option<String>,
}

impl<Item> Default for ObservableInput<Item> {
  fn default() -> Self { Self { shapes: SmallVec::new(), received: None } }
}

impl<Item: 'static> ObservableInput<Item> {
  /// An input exposing no shape at all; [`from`] rejects it.
  pub fn new() -> Self { Self::default() }

  pub fn with_observable(self, observable: Observable<Item>) -> Self {
    self.with(Shape::Own(observable))
  }

  pub fn with_interop(self, interop: impl InteropObservable<Item> + 'static) -> Self {
    self.with(Shape::Interop(Rc::new(interop)))
  }

  pub fn with_array_like(self, array: impl ArrayLike<Item> + 'static) -> Self {
    self.with(Shape::ArrayLike(Rc::new(array)))
  }

  pub fn with_promise(self, promise: impl PromiseLike<Item> + 'static) -> Self {
    self.with(Shape::Promise(Rc::new(promise)))
  }

  /// Shares `future` so that every subscription observes its single outcome.
  pub fn with_future(self, future: impl Future<Output = Result<Item, RxError>> + 'static) -> Self
  where
    Item: Clone,
  {
    self.with_promise(future.boxed_local().shared())
  }

  pub fn with_async_iterable(self, iterable: impl AsyncIterable<Item> + 'static) -> Self {
    self.with(Shape::AsyncIterable(Rc::new(iterable)))
  }

  pub fn with_iterable(self, iterable: impl Iterable<Item> + 'static) -> Self {
    self.with(Shape::Iterable(Rc::new(iterable)))
  }

  pub fn with_readable_stream(self, readable: impl ReadableStreamLike<Item> + 'static) -> Self {
    self.with(Shape::ReadableStream(Rc::new(readable)))
  }

  /// Names the input in the error reported when it matches no shape.
  pub fn describe(mut self, received: impl AsRef<str>) -> Self {
    self.received = Some(format!("'{}'", received.as_ref()));
    self
  }

  /// The kind [`from`] would adapt this input as, or `None` if it matches no
  /// shape.
  pub fn classify(&self) -> Option<SourceKind> { self.shapes.iter().map(Shape::kind).min() }

  fn with(mut self, shape: Shape<Item>) -> Self {
    self.shapes.push(shape);
    self
  }
}

impl<Item: 'static> From<Observable<Item>> for ObservableInput<Item> {
  fn from(observable: Observable<Item>) -> Self { Self::new().with_observable(observable) }
}

impl<Item: Clone + 'static> From<Vec<Item>> for ObservableInput<Item> {
  fn from(values: Vec<Item>) -> Self {
    Self::new().with_array_like(values.clone()).with_iterable(values)
  }
}

impl<Item: Clone + 'static, const N: usize> From<[Item; N]> for ObservableInput<Item> {
  fn from(values: [Item; N]) -> Self {
    Self::new().with_array_like(values.clone()).with_iterable(values)
  }
}

/// Creates an Observable from an Array, an array-like object, a Promise, an
/// iterable object, an async iterable, a readable stream or an
/// Observable-like object.
///
/// The input is classified once, by [`SourceKind`] priority, and wrapped by
/// the matching adapter. An [`Observable`] is returned unchanged.
///
/// # Errors
///
/// [`RxError::InvalidSource`] if the input exposes no supported shape.
///
/// ```rust
/// use std::{cell::RefCell, rc::Rc};
///
/// use rxcore::prelude::*;
///
/// let seen = Rc::new(RefCell::new(vec![]));
/// let c_seen = seen.clone();
/// from(vec![1, 2, 3])
///   .unwrap()
///   .subscribe(move |v| c_seen.borrow_mut().push(v))
///   .unwrap();
/// assert_eq!(*seen.borrow(), [1, 2, 3]);
/// ```
pub fn from<Item: 'static>(
  input: impl Into<ObservableInput<Item>>,
) -> Result<Observable<Item>, RxError> {
  let ObservableInput { shapes, received } = input.into();
  let Some(shape) = shapes.into_iter().min_by_key(Shape::kind) else {
    let received = received.unwrap_or_else(|| "an invalid object".to_owned());
    return Err(RxError::InvalidSource { received });
  };
  debug!(kind = ?shape.kind(), "observable input classified");

  let observable = match shape {
    Shape::Own(observable) => observable,
    Shape::Interop(interop) => from_interop(interop),
    Shape::ArrayLike(array) => from_array_like(array),
    Shape::Promise(promise) => from_promise(promise),
    Shape::AsyncIterable(iterable) => from_async_iterable(iterable),
    Shape::Iterable(iterable) => from_iterable(iterable),
    Shape::ReadableStream(readable) => from_readable_stream(readable),
  };
  Ok(observable)
}

/// Subscribes through the object a foreign implementation hands out.
///
/// The subscription fails with [`RxError::NotSubscribable`] if there is
/// nothing to subscribe to.
pub fn from_interop<Item: 'static>(interop: Rc<dyn InteropObservable<Item>>) -> Observable<Item> {
  Observable::new(move |subscriber: &Subscriber<Item>| {
    let target = interop.interop_observable().ok_or(RxError::NotSubscribable)?;
    target.subscribe_with(subscriber.clone())
  })
}
