//! Error types shared by every part of the stream core.
//!
//! [`RxError`] is the single error type carried through `error`
//! notifications and returned when a consumer handler raises.
//! [`UnsubscriptionError`] aggregates every failure seen during one
//! teardown sweep.

use std::{error::Error as StdError, fmt, sync::Arc};

use thiserror::Error;

/// Errors flowing through observables, observers and subscriptions.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum RxError {
  /// The input handed to [`from`](crate::observable::from) matched no
  /// supported source shape.
  #[error(
    "You provided {received} where a stream was expected. You can provide an Observable, \
     Promise, ReadableStream, Array, AsyncIterable, or Iterable."
  )]
  InvalidSource {
    /// Description of the value that was received.
    received: String,
  },

  /// An interop observable did not hand out anything with a `subscribe`.
  #[error("interop observable did not provide a subscribable object")]
  NotSubscribable,

  /// One or more teardowns failed while unsubscribing.
  #[error(transparent)]
  Unsubscription(#[from] UnsubscriptionError),

  /// A handler was invoked again while it was still running.
  #[error("`{handler}` handler re-entered while it was still running")]
  Reentrant {
    /// Name of the re-entered handler (`next`, `error` or `complete`).
    handler: &'static str,
  },

  /// An array-like value reported no element at an index below its length.
  #[error("array-like value has no element at index {index} (length {length})")]
  Hole {
    /// The missing index.
    index: usize,
    /// The length the value reported.
    length: usize,
  },

  /// An async source was subscribed outside a `tokio::task::LocalSet`.
  #[error("async sources must be subscribed inside a tokio LocalSet")]
  NoLocalSet,

  /// The subscription went away before delivering a terminal notification.
  #[error("the source was dropped before it terminated")]
  Dropped,

  /// Plain message error raised by a source or a consumer.
  #[error("{0}")]
  Message(String),

  /// Any other error raised by a source or a consumer.
  #[error(transparent)]
  Other(Arc<dyn StdError + Send + Sync>),
}

impl RxError {
  /// Builds a [`RxError::Message`].
  pub fn msg(message: impl Into<String>) -> Self { RxError::Message(message.into()) }

  /// Wraps an arbitrary error.
  pub fn other<E>(err: E) -> Self
  where
    E: StdError + Send + Sync + 'static,
  {
    RxError::Other(Arc::new(err))
  }

  /// Returns a short stable label (snake_case) for logs.
  pub fn as_label(&self) -> &'static str {
    match self {
      RxError::InvalidSource { .. } => "invalid_source",
      RxError::NotSubscribable => "not_subscribable",
      RxError::Unsubscription(_) => "unsubscription",
      RxError::Reentrant { .. } => "reentrant",
      RxError::Hole { .. } => "hole",
      RxError::NoLocalSet => "no_local_set",
      RxError::Dropped => "dropped",
      RxError::Message(_) => "message",
      RxError::Other(_) => "other",
    }
  }

  /// Flattens `self` into `causes`, unwrapping a nested aggregate so the
  /// resulting list never contains an [`RxError::Unsubscription`].
  pub(crate) fn flatten_into(self, causes: &mut Vec<RxError>) {
    match self {
      RxError::Unsubscription(inner) => causes.extend(inner.errors),
      other => causes.push(other),
    }
  }
}

impl From<&str> for RxError {
  fn from(message: &str) -> Self { RxError::msg(message) }
}

impl From<String> for RxError {
  fn from(message: String) -> Self { RxError::Message(message) }
}

/// Every error raised during a single `unsubscribe()` sweep, in the order the
/// failing teardowns ran. The list is always flat.
#[derive(Error, Debug, Clone)]
pub struct UnsubscriptionError {
  errors: Vec<RxError>,
}

impl UnsubscriptionError {
  /// Aggregates `errors`, unwrapping any nested aggregate into its causes.
  pub fn new(errors: impl IntoIterator<Item = RxError>) -> Self {
    let mut flat = Vec::new();
    for err in errors {
      err.flatten_into(&mut flat);
    }
    Self { errors: flat }
  }

  /// The underlying causes.
  pub fn errors(&self) -> &[RxError] { &self.errors }

  /// Consumes the aggregate and returns its causes.
  pub fn into_errors(self) -> Vec<RxError> { self.errors }
}

impl fmt::Display for UnsubscriptionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} errors occurred during unsubscription:", self.errors.len())?;
    for (i, err) in self.errors.iter().enumerate() {
      let sep = if i == 0 { "\n" } else { "\n  " };
      write!(f, "{sep}{}) {err}", i + 1)?;
    }
    Ok(())
  }
}
