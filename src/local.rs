//! Non-owning scope-local handles.

use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::internal::Internal;
use crate::root::Root;

/// A non-owning snapshot of another handle's payload pointer.
///
/// `Local` is for transient access within a scope: it never touches the
/// reference counts, so passing one around is free. The snapshot is taken at
/// construction; a local built from an [`Internal`] handle captures whatever
/// [`Internal::get`] observes at that moment.
///
/// A local does not keep its target alive. It must not outlive the scope in
/// which the source handle was known to be valid; in particular, dropping
/// roots or re-linking internal handles can destroy the target while a local
/// still points at it.
pub struct Local<T> {
    ptr: Option<NonNull<T>>,
    _marker: PhantomData<*const T>,
}

impl<T> Local<T> {
    /// Creates a null local handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ptr: None,
            _marker: PhantomData,
        }
    }

    /// Returns the snapshotted payload.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.ptr.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    /// Returns the snapshotted pointer, null when unset.
    #[must_use]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.map_or(core::ptr::null(), |ptr| ptr.as_ptr().cast_const())
    }

    /// Clears the snapshot.
    pub fn reset(&mut self) {
        self.ptr = None;
    }

    /// True when no payload is snapshotted.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }
}

impl<T> From<&Root<T>> for Local<T> {
    fn from(source: &Root<T>) -> Self {
        Self {
            ptr: NonNull::new(source.as_ptr().cast_mut()),
            _marker: PhantomData,
        }
    }
}

impl<T> From<&Internal<T>> for Local<T> {
    fn from(source: &Internal<T>) -> Self {
        Self {
            ptr: source.get().map(NonNull::from),
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for Local<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Local<T> {}

impl<T> Default for Local<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Local<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Local").field("ptr", &self.as_ptr()).finish()
    }
}
