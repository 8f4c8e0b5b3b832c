use std::{
  cell::{Ref, RefCell, RefMut},
  fmt::{Debug, Formatter},
  rc::Rc,
};

/// Shared, interior-mutable cell backing every handle type in this crate.
///
/// Everything here is single-threaded, so this is a thin `Rc<RefCell<T>>`
/// with a pointer identity used to detect self-registration.
#[derive(Default)]
pub struct MutRc<T>(Rc<RefCell<T>>);

impl<T> MutRc<T> {
  pub fn own(t: T) -> Self { Self(Rc::new(RefCell::new(t))) }

  #[inline]
  pub fn rc_deref(&self) -> Ref<'_, T> { self.0.borrow() }

  #[inline]
  pub fn rc_deref_mut(&self) -> RefMut<'_, T> { self.0.borrow_mut() }

  /// Address of the shared allocation; equal for all clones of one handle.
  #[inline]
  pub fn as_ptr(&self) -> *const () { Rc::as_ptr(&self.0).cast() }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

impl<T> From<T> for MutRc<T> {
  fn from(t: T) -> Self { Self::own(t) }
}

impl<T: Debug> Debug for MutRc<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.0.try_borrow() {
      Ok(inner) => f.debug_tuple("MutRc").field(&*inner).finish(),
      Err(_) => f.write_str("MutRc(<borrowed>)"),
    }
  }
}

impl<T> Clone for MutRc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxcore_macro::test]
  fn clones_share_identity() {
    let a = MutRc::own(1);
    let b = a.clone();
    let c = MutRc::own(1);
    assert!(a.ptr_eq(&b));
    assert_eq!(a.as_ptr(), b.as_ptr());
    assert!(!a.ptr_eq(&c));

    *b.rc_deref_mut() += 1;
    assert_eq!(*a.rc_deref(), 2);
  }
}
