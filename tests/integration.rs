//! Integration tests for rxcore
//!
//! Exercise the public surface end to end: subscription lifetime, teardown
//! aggregation, the `from` adapters and the push/pull bridge.

use std::{cell::RefCell, rc::Rc};

use futures::{channel::oneshot, StreamExt};
use rxcore::prelude::*;

fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

type Log = Rc<RefCell<Vec<String>>>;

fn recorder(log: &Log) -> ConsumerObserver<i32> {
  let (n, e, c) = (log.clone(), log.clone(), log.clone());
  ConsumerObserver::new()
    .on_next(move |v| n.borrow_mut().push(format!("next({v})")))
    .on_error(move |err| e.borrow_mut().push(format!("error({err})")))
    .on_complete(move || c.borrow_mut().push("complete".to_owned()))
}

#[rxcore_macro::test]
fn terminal_notification_is_final() {
  init_tracing();
  let log: Log = Rc::default();
  let handle: Rc<RefCell<Option<Subscriber<i32>>>> = Rc::default();
  let c_handle = handle.clone();
  Observable::new(move |subscriber: &Subscriber<i32>| {
    *c_handle.borrow_mut() = Some(subscriber.clone());
    subscriber.next(1)?;
    subscriber.error(RxError::msg("first"))
  })
  .subscribe(recorder(&log))
  .unwrap();

  let subscriber = handle.borrow_mut().take().unwrap();
  subscriber.next(2).unwrap();
  subscriber.complete().unwrap();
  subscriber.error(RxError::msg("second")).unwrap();

  assert_eq!(*log.borrow(), ["next(1)", "error(first)"]);
}

#[rxcore_macro::test]
fn unsubscribe_is_idempotent() {
  let log: Log = Rc::default();
  let c_log = log.clone();
  let subscriber = Observable::new(move |_: &Subscriber<i32>| {
    let log = c_log.clone();
    Ok(TeardownLogic::action(move || log.borrow_mut().push("teardown".to_owned())))
  })
  .subscribe(())
  .unwrap();

  for _ in 0..3 {
    subscriber.unsubscribe().unwrap();
  }
  assert!(subscriber.is_closed());
  assert_eq!(*log.borrow(), ["teardown"]);
}

#[rxcore_macro::test]
fn teardown_is_exhaustive_and_aggregated() {
  init_tracing();
  let ran: Log = Rc::default();
  let subscription = Subscription::default();
  let (r1, r2, r3) = (ran.clone(), ran.clone(), ran.clone());
  subscription
    .add(TeardownLogic::fallible(move || {
      r1.borrow_mut().push("f1".to_owned());
      Err(RxError::msg("f1 failed"))
    }))
    .unwrap();
  subscription.add(TeardownLogic::action(move || r2.borrow_mut().push("f2".to_owned()))).unwrap();
  subscription
    .add(TeardownLogic::fallible(move || {
      r3.borrow_mut().push("f3".to_owned());
      Err(RxError::msg("f3 failed"))
    }))
    .unwrap();

  let err = subscription.unsubscribe().unwrap_err();
  assert_eq!(*ran.borrow(), ["f1", "f2", "f3"]);
  let causes: Vec<_> = err.errors().iter().map(ToString::to_string).collect();
  assert_eq!(causes, ["f1 failed", "f3 failed"]);
  assert_eq!(
    err.to_string(),
    "2 errors occurred during unsubscription:\n1) f1 failed\n  2) f3 failed"
  );
}

#[rxcore_macro::test]
fn nested_child_failures_are_flattened() {
  let parent = Subscription::default();
  let child = Subscription::new(|| Err(RxError::msg("child")));
  child.add(TeardownLogic::fallible(|| Err(RxError::msg("grandchild")))).unwrap();
  parent.add(child).unwrap();
  parent.add(TeardownLogic::fallible(|| Err(RxError::msg("sibling")))).unwrap();

  let err = parent.unsubscribe().unwrap_err();
  let causes: Vec<_> = err.errors().iter().map(ToString::to_string).collect();
  assert_eq!(causes, ["child", "grandchild", "sibling"]);
}

#[rxcore_macro::test]
fn from_array_emits_synchronously() {
  let log: Log = Rc::default();
  from([1, 2, 3]).unwrap().subscribe(recorder(&log)).unwrap();
  assert_eq!(*log.borrow(), ["next(1)", "next(2)", "next(3)", "complete"]);
}

#[rxcore_macro::test]
fn cancel_mid_iteration() {
  let log: Log = Rc::default();
  let handle: Rc<RefCell<Option<Subscriber<i32>>>> = Rc::default();
  let (c_log, c_handle) = (log.clone(), handle.clone());
  let subscriber = Subscriber::new(ConsumerObserver::new().on_next(move |v: i32| {
    c_log.borrow_mut().push(format!("next({v})"));
    if v == 2 {
      if let Some(me) = c_handle.borrow().as_ref() {
        me.unsubscribe().unwrap();
      }
    }
  }));
  *handle.borrow_mut() = Some(subscriber.clone());

  from(ObservableInput::new().with_iterable(vec![1, 2, 3, 4]))
    .unwrap()
    .subscribe(subscriber)
    .unwrap();

  assert_eq!(*log.borrow(), ["next(1)", "next(2)"]);
  handle.borrow_mut().take();
}

#[rxcore_macro::test]
async fn rejected_promise_errors_once() {
  init_tracing();
  let log: Log = Rc::default();
  let (tx, rx) = oneshot::channel::<()>();
  let tx = RefCell::new(Some(tx));
  let c_log = log.clone();
  let observer = recorder(&log).on_error(move |err| {
    c_log.borrow_mut().push(format!("error({err})"));
    if let Some(tx) = tx.borrow_mut().take() {
      let _ = tx.send(());
    }
  });

  let input = ObservableInput::new().with_future(async { Err::<i32, _>(RxError::msg("x")) });
  assert_eq!(input.classify(), Some(SourceKind::Promise));
  from(input).unwrap().subscribe(observer).unwrap();

  rx.await.unwrap();
  for _ in 0..4 {
    tokio::task::yield_now().await;
  }
  assert_eq!(*log.borrow(), ["error(x)"]);
}

fn pushed_by_hand() -> (Observable<char>, Rc<RefCell<Option<Subscriber<char>>>>) {
  let slot: Rc<RefCell<Option<Subscriber<char>>>> = Rc::default();
  let c_slot = slot.clone();
  let source = Observable::new(move |subscriber: &Subscriber<char>| {
    *c_slot.borrow_mut() = Some(subscriber.clone());
    Ok(())
  });
  (source, slot)
}

fn push_a_b_complete(slot: &Rc<RefCell<Option<Subscriber<char>>>>) {
  let subscriber = slot.borrow().clone().unwrap();
  subscriber.next('a').unwrap();
  subscriber.next('b').unwrap();
  subscriber.complete().unwrap();
}

#[rxcore_macro::test]
async fn bridge_pull_after_push() {
  let (source, slot) = pushed_by_hand();
  let mut iter = source.into_async_iter();
  // The first pull subscribes; the source then pushes everything at once.
  let first = iter.next();
  push_a_b_complete(&slot);

  assert_eq!(first.await.unwrap(), Some('a'));
  assert_eq!(iter.next().await.unwrap(), Some('b'));
  assert_eq!(iter.next().await.unwrap(), None);
}

#[rxcore_macro::test]
async fn bridge_pull_before_push() {
  let (source, slot) = pushed_by_hand();
  let mut iter = source.into_async_iter();
  let pulls = [iter.next(), iter.next(), iter.next()];
  push_a_b_complete(&slot);

  let mut results = vec![];
  for pull in pulls {
    results.push(pull.await.unwrap());
  }
  assert_eq!(results, [Some('a'), Some('b'), None]);
}

#[rxcore_macro::test]
async fn bridge_as_stream() {
  let items: Vec<_> = from(vec![1, 2, 3]).unwrap().into_async_iter().collect().await;
  let values: Vec<i32> = items.into_iter().collect::<Result<_, _>>().unwrap();
  assert_eq!(values, [1, 2, 3]);
}

#[rxcore_macro::test]
async fn for_each_over_an_async_iterable() {
  let sum = Rc::new(RefCell::new(0));
  let c_sum = sum.clone();
  let o = from(
    ObservableInput::new()
      .with_async_iterable(|| futures::stream::iter((1..=4).map(Ok::<i32, RxError>))),
  )
  .unwrap();

  o.for_each(move |v| {
    *c_sum.borrow_mut() += v;
    Ok(())
  })
  .await
  .unwrap();
  assert_eq!(*sum.borrow(), 10);
}

#[rxcore_macro::test]
fn pipe_composes() {
  let source = from(vec![1, 2]).unwrap();
  assert!(source.clone().pipe_all([]).ptr_eq(&source));

  let trail: Log = Rc::default();
  let (f_trail, g_trail) = (trail.clone(), trail.clone());
  let f: Operation<i32> = Box::new(move |o| {
    f_trail.borrow_mut().push("f".to_owned());
    o
  });
  let g: Operation<i32> = Box::new(move |o| {
    g_trail.borrow_mut().push("g".to_owned());
    o
  });
  let piped = source.clone().pipe_all([f, g]);
  assert_eq!(*trail.borrow(), ["f", "g"]);
  assert!(piped.ptr_eq(&source));
}

#[rxcore_macro::test]
fn invalid_input_is_rejected() {
  let err = from(ObservableInput::<i32>::new().describe("null")).err().unwrap();
  assert_eq!(
    err.to_string(),
    "You provided 'null' where a stream was expected. You can provide an Observable, Promise, \
     ReadableStream, Array, AsyncIterable, or Iterable."
  );
}

#[rxcore_macro::test]
fn guard_unsubscribes_on_drop() {
  let log: Log = Rc::default();
  let c_log = log.clone();
  let o = Observable::new(move |_: &Subscriber<i32>| {
    let log = c_log.clone();
    Ok(TeardownLogic::action(move || log.borrow_mut().push("teardown".to_owned())))
  });
  {
    let _guard = o.subscribe(()).unwrap().unsubscribe_when_dropped();
    assert!(log.borrow().is_empty());
  }
  assert_eq!(*log.borrow(), ["teardown"]);
}
