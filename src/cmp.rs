//! Equality across handle kinds.
//!
//! Handles compare by the payload pointer each kind observes through `get`:
//! a root compares by its stored pointer, an internal handle by its target
//! unless that target is already unreachable (it then compares as null), and
//! a local by its snapshot.

use core::ptr;

use crate::internal::Internal;
use crate::local::Local;
use crate::root::Root;

fn observed_internal<T>(handle: &Internal<T>) -> *const T {
    handle.get().map_or(ptr::null(), |payload| payload as *const T)
}

impl<T> PartialEq for Root<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_ptr() == other.as_ptr()
    }
}

impl<T> Eq for Root<T> {}

impl<T> PartialEq for Internal<T> {
    fn eq(&self, other: &Self) -> bool {
        observed_internal(self) == observed_internal(other)
    }
}

impl<T> Eq for Internal<T> {}

impl<T> PartialEq for Local<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_ptr() == other.as_ptr()
    }
}

impl<T> Eq for Local<T> {}

impl<T> PartialEq<Internal<T>> for Root<T> {
    fn eq(&self, other: &Internal<T>) -> bool {
        self.as_ptr() == observed_internal(other)
    }
}

impl<T> PartialEq<Root<T>> for Internal<T> {
    fn eq(&self, other: &Root<T>) -> bool {
        observed_internal(self) == other.as_ptr()
    }
}

impl<T> PartialEq<Local<T>> for Root<T> {
    fn eq(&self, other: &Local<T>) -> bool {
        self.as_ptr() == other.as_ptr()
    }
}

impl<T> PartialEq<Root<T>> for Local<T> {
    fn eq(&self, other: &Root<T>) -> bool {
        self.as_ptr() == other.as_ptr()
    }
}

impl<T> PartialEq<Local<T>> for Internal<T> {
    fn eq(&self, other: &Local<T>) -> bool {
        observed_internal(self) == other.as_ptr()
    }
}

impl<T> PartialEq<Internal<T>> for Local<T> {
    fn eq(&self, other: &Internal<T>) -> bool {
        self.as_ptr() == observed_internal(other)
    }
}

impl<T> PartialEq<*const T> for Root<T> {
    fn eq(&self, other: &*const T) -> bool {
        self.as_ptr() == *other
    }
}

impl<T> PartialEq<*mut T> for Root<T> {
    fn eq(&self, other: &*mut T) -> bool {
        self.as_ptr() == other.cast_const()
    }
}

impl<T> PartialEq<*const T> for Internal<T> {
    fn eq(&self, other: &*const T) -> bool {
        observed_internal(self) == *other
    }
}

impl<T> PartialEq<*mut T> for Internal<T> {
    fn eq(&self, other: &*mut T) -> bool {
        observed_internal(self) == other.cast_const()
    }
}

impl<T> PartialEq<*const T> for Local<T> {
    fn eq(&self, other: &*const T) -> bool {
        self.as_ptr() == *other
    }
}

impl<T> PartialEq<*mut T> for Local<T> {
    fn eq(&self, other: &*mut T) -> bool {
        self.as_ptr() == other.cast_const()
    }
}
