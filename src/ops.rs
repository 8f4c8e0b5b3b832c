//! Operations on an [`Observable`](crate::observable::Observable) that
//! bridge it to the async/await world.

pub mod for_each;
pub mod into_async_iter;

pub use into_async_iter::{AsyncIter, Pull};
