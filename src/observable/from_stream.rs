use std::rc::Rc;

use futures::{
  stream::{self, LocalBoxStream},
  Stream, StreamExt,
};
use tracing::{error, trace};

use crate::{
  error::RxError,
  observable::Observable,
  observer::Observer,
  shape::{AsyncIterable, ReadableStreamLike, StreamReader},
  subscriber::Subscriber,
  subscription::SubscriptionLike,
};

use super::from_future::spawn_driver;

/// Converts an async iterable to an observable sequence.
///
/// Every subscription asks the iterable for a fresh stream and drives it on a
/// local task, so the observable must be subscribed inside a
/// [`tokio::task::LocalSet`]; anywhere else the subscription errors with
/// [`RxError::NoLocalSet`]. Each value is emitted as it arrives; exhaustion
/// completes the observable and an `Err` item errors it.
///
/// The loop stops as soon as the subscriber is closed, including when the
/// consumer closes it while handling a value. Unsubscribing also drops the
/// stream at its current await point.
pub fn from_async_iterable<Item: 'static>(iterable: Rc<dyn AsyncIterable<Item>>) -> Observable<Item> {
  Observable::new(move |subscriber: &Subscriber<Item>| {
    spawn_driver(drive(iterable.async_iter(), subscriber.clone()))
  })
}

/// Converts a lock-based readable stream to an observable sequence.
///
/// Each subscription acquires its own reader and reads until the stream is
/// done. The reader's lock is released however the loop ends: exhaustion, a
/// read error or cancellation.
pub fn from_readable_stream<Item: 'static>(
  readable: Rc<dyn ReadableStreamLike<Item>>,
) -> Observable<Item> {
  from_async_iterable(Rc::new(move || reader_stream(readable.get_reader())))
}

async fn drive<Item>(
  values: LocalBoxStream<'static, Result<Item, RxError>>,
  subscriber: Subscriber<Item>,
) -> Result<(), RxError> {
  let driven = pump(values, &subscriber).await;
  if let Err(err) = &driven {
    error!(error = %err, "async iteration stopped by its consumer");
    subscriber.abandon();
  }
  driven
}

async fn pump<Item>(
  mut values: LocalBoxStream<'static, Result<Item, RxError>>,
  subscriber: &Subscriber<Item>,
) -> Result<(), RxError> {
  while !subscriber.is_closed() {
    match values.next().await {
      Some(Ok(value)) => subscriber.next(value)?,
      Some(Err(err)) => return subscriber.error(err),
      None => return subscriber.complete(),
    }
  }
  Ok(())
}

struct ReaderGuard<Item>(Box<dyn StreamReader<Item>>);

impl<Item> Drop for ReaderGuard<Item> {
  fn drop(&mut self) {
    self.0.release_lock();
    trace!("stream reader released");
  }
}

fn reader_stream<Item: 'static>(
  reader: Box<dyn StreamReader<Item>>,
) -> impl Stream<Item = Result<Item, RxError>> {
  stream::unfold(Some(ReaderGuard(reader)), |guard| async move {
    let mut guard = guard?;
    let read = guard.0.read().await;
    match read {
      Ok(Some(value)) => Some((Ok(value), Some(guard))),
      Ok(None) => None,
      // The error ends the stream; the reader is released right away.
      Err(err) => Some((Err(err), None)),
    }
  })
}

#[cfg(test)]
mod tests {
  use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
  };

  use futures::{channel::oneshot, future::LocalBoxFuture, FutureExt, StreamExt};

  use crate::prelude::*;

  async fn settle() {
    for _ in 0..16 {
      tokio::task::yield_now().await;
    }
  }

  fn recorder(log: &Rc<RefCell<Vec<String>>>) -> ConsumerObserver<i32> {
    let (n, e, c) = (log.clone(), log.clone(), log.clone());
    ConsumerObserver::new()
      .on_next(move |v| n.borrow_mut().push(format!("next({v})")))
      .on_error(move |err| e.borrow_mut().push(format!("error({err})")))
      .on_complete(move || c.borrow_mut().push("complete".to_owned()))
  }

  #[derive(Default)]
  struct LockState {
    locked: Cell<bool>,
    releases: Cell<usize>,
  }

  struct FakeReader {
    values: VecDeque<Result<i32, RxError>>,
    state: Rc<LockState>,
  }

  impl StreamReader<i32> for FakeReader {
    fn read(&mut self) -> LocalBoxFuture<'_, Result<Option<i32>, RxError>> {
      let next = self.values.pop_front().transpose();
      async move {
        tokio::task::yield_now().await;
        next
      }
      .boxed_local()
    }

    fn release_lock(&mut self) {
      self.state.locked.set(false);
      self.state.releases.set(self.state.releases.get() + 1);
    }
  }

  struct FakeReadable {
    values: Vec<Result<i32, RxError>>,
    state: Rc<LockState>,
  }

  impl ReadableStreamLike<i32> for FakeReadable {
    fn get_reader(&self) -> Box<dyn StreamReader<i32>> {
      self.state.locked.set(true);
      Box::new(FakeReader { values: self.values.iter().cloned().collect(), state: self.state.clone() })
    }
  }

  #[rxcore_macro::test]
  async fn async_iterable_emits_then_completes() {
    let log = Rc::new(RefCell::new(vec![]));
    let iterable = || futures::stream::iter([Ok::<i32, RxError>(1), Ok(2), Ok(3)]);
    observable::from_async_iterable(Rc::new(iterable)).subscribe(recorder(&log)).unwrap();

    assert!(log.borrow().is_empty());
    settle().await;
    assert_eq!(*log.borrow(), ["next(1)", "next(2)", "next(3)", "complete"]);
  }

  #[rxcore_macro::test]
  async fn async_iterable_error_item_errors_the_stream() {
    let log = Rc::new(RefCell::new(vec![]));
    let iterable = || futures::stream::iter([Ok(1), Err(RxError::msg("broken")), Ok(2)]);
    observable::from_async_iterable(Rc::new(iterable)).subscribe(recorder(&log)).unwrap();

    settle().await;
    assert_eq!(*log.borrow(), ["next(1)", "error(broken)"]);
  }

  #[rxcore_macro::test]
  async fn async_iterable_stops_when_consumer_unsubscribes() {
    let pulled = Rc::new(Cell::new(0));
    let c_pulled = pulled.clone();
    let iterable = move || {
      let c_pulled = c_pulled.clone();
      futures::stream::iter(1..=4).map(move |v| {
        c_pulled.set(c_pulled.get() + 1);
        Ok::<i32, RxError>(v)
      })
    };

    let values = Rc::new(RefCell::new(vec![]));
    let slot: Rc<RefCell<Option<Subscriber<i32>>>> = Rc::default();
    let (c_values, c_slot) = (values.clone(), slot.clone());
    let subscriber = Subscriber::new(ConsumerObserver::new().on_next(move |v: i32| {
      c_values.borrow_mut().push(v);
      if v == 2 {
        if let Some(me) = c_slot.borrow().as_ref() {
          me.unsubscribe().unwrap();
        }
      }
    }));
    *slot.borrow_mut() = Some(subscriber.clone());

    observable::from_async_iterable(Rc::new(iterable)).subscribe(subscriber).unwrap();
    settle().await;

    assert_eq!(*values.borrow(), [1, 2]);
    assert_eq!(pulled.get(), 2);
    slot.borrow_mut().take();
  }

  #[rxcore_macro::test]
  async fn raising_consumer_closes_the_subscriber() {
    let state = Rc::new(LockState::default());
    let readable = FakeReadable { values: vec![Ok(1), Ok(2)], state: state.clone() };
    let subscriber = from(ObservableInput::new().with_readable_stream(readable))
      .unwrap()
      .subscribe(ConsumerObserver::new().try_on_next(|_| Err(RxError::msg("no"))))
      .unwrap();

    settle().await;
    assert!(subscriber.is_closed());
    assert_eq!(state.releases.get(), 1);
  }

  #[rxcore_macro::test]
  fn async_iterable_without_a_local_set_is_an_error() {
    let iterable = || futures::stream::iter([Ok::<i32, RxError>(1)]);
    let err = observable::from_async_iterable(Rc::new(iterable)).subscribe(|_| {}).unwrap_err();
    assert!(matches!(err, RxError::NoLocalSet));
  }

  #[rxcore_macro::test]
  async fn readable_stream_reads_until_done_and_releases() {
    let state = Rc::new(LockState::default());
    let readable = FakeReadable { values: vec![Ok(1), Ok(2)], state: state.clone() };
    let log = Rc::new(RefCell::new(vec![]));
    let (tx, rx) = oneshot::channel::<()>();
    let tx = RefCell::new(Some(tx));
    let c_log = log.clone();
    let observer = recorder(&log).on_complete(move || {
      c_log.borrow_mut().push("complete".to_owned());
      if let Some(tx) = tx.borrow_mut().take() {
        let _ = tx.send(());
      }
    });

    from(ObservableInput::new().with_readable_stream(readable)).unwrap().subscribe(observer).unwrap();
    assert!(state.locked.get());
    rx.await.unwrap();

    assert_eq!(*log.borrow(), ["next(1)", "next(2)", "complete"]);
    assert!(!state.locked.get());
    assert_eq!(state.releases.get(), 1);
  }

  #[rxcore_macro::test]
  async fn readable_stream_read_error_releases_the_reader() {
    let state = Rc::new(LockState::default());
    let readable =
      FakeReadable { values: vec![Ok(1), Err(RxError::msg("read failed")), Ok(2)], state: state.clone() };
    let log = Rc::new(RefCell::new(vec![]));
    from(ObservableInput::new().with_readable_stream(readable)).unwrap().subscribe(recorder(&log)).unwrap();

    settle().await;
    assert_eq!(*log.borrow(), ["next(1)", "error(read failed)"]);
    assert_eq!(state.releases.get(), 1);
  }

  #[rxcore_macro::test]
  async fn readable_stream_released_on_early_cancel() {
    let state = Rc::new(LockState::default());
    let readable = FakeReadable { values: vec![Ok(1), Ok(2), Ok(3)], state: state.clone() };
    let log = Rc::new(RefCell::new(vec![]));
    let subscriber = from(ObservableInput::new().with_readable_stream(readable))
      .unwrap()
      .subscribe(recorder(&log))
      .unwrap();

    subscriber.unsubscribe().unwrap();
    settle().await;

    assert!(log.borrow().is_empty());
    assert!(!state.locked.get());
    assert_eq!(state.releases.get(), 1);
  }
}
