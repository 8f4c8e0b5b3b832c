use std::rc::Rc;

use crate::{
  error::RxError,
  observable::Observable,
  observer::Observer,
  shape::{ArrayLike, Iterable},
  subscriber::Subscriber,
  subscription::SubscriptionLike,
};

/// Creates an observable that emits the elements of an array-like value in
/// index order, then completes.
///
/// Emission stops early as soon as the subscriber is closed. An index below
/// `length()` for which `at` yields nothing errors the stream with
/// [`RxError::Hole`].
///
/// ```
/// use std::rc::Rc;
///
/// use rxcore::prelude::*;
///
/// observable::from_array_like(Rc::new(vec![0, 1, 2, 3]))
///   .subscribe(|v| println!("{},", v))
///   .unwrap();
/// ```
pub fn from_array_like<Item: 'static>(array: Rc<dyn ArrayLike<Item>>) -> Observable<Item> {
  Observable::new(move |subscriber: &Subscriber<Item>| {
    let length = array.length();
    for index in 0..length {
      if subscriber.is_closed() {
        return Ok(());
      }
      let value = array.at(index).ok_or(RxError::Hole { index, length })?;
      subscriber.next(value)?;
    }
    subscriber.complete()
  })
}

/// Creates an observable that produces values from an iterable. Every
/// subscription iterates afresh.
///
/// Completes when all elements have been emitted; stops without completing
/// if the subscriber is closed while handling a value.
///
/// ```
/// use std::rc::Rc;
///
/// use rxcore::prelude::*;
///
/// observable::from_iterable(Rc::new(0..10))
///   .subscribe(|v| println!("{},", v))
///   .unwrap();
/// ```
pub fn from_iterable<Item: 'static>(iterable: Rc<dyn Iterable<Item>>) -> Observable<Item> {
  Observable::new(move |subscriber: &Subscriber<Item>| {
    for value in iterable.to_iter() {
      subscriber.next(value)?;
      if subscriber.is_closed() {
        return Ok(());
      }
    }
    subscriber.complete()
  })
}
