//! External owning handles.

use alloc::boxed::Box;
use core::fmt;
use core::marker::PhantomData;
use core::ops::Deref;
use core::ptr::NonNull;

use crate::anchor::{Edge, Participant};
use crate::arena::{self, HeaderId};
use crate::header::{self, Header, PayloadVtable, ReleaseFn};
use crate::internal::Internal;

/// An external owning handle to a managed object.
///
/// A `Root` is what keeps an object graph alive: an object is destroyed
/// exactly when no chain of [`Internal`] handles from any `Root` reaches it
/// anymore, cycles included. Cloning a root adds an owner; dropping the last
/// root to an object triggers collection of the object and of everything
/// only it kept alive.
///
/// An empty root holds no payload and no header. [`get`] returns `None`,
/// [`use_count`] returns 0, and [`Deref`] panics.
///
/// [`get`]: Root::get
/// [`use_count`]: Root::use_count
pub struct Root<T> {
    ptr: Option<NonNull<T>>,
    header: Option<HeaderId>,
    _marker: PhantomData<T>,
}

/// Allocates a combined block for `value` and binds the first root handle to
/// it.
///
/// The payload is destroyed in place during collection; its storage is
/// released with the header once the last handle of any kind lets go.
///
/// ```
/// use rhizome::{make_root, Participant};
///
/// struct Config(u32);
///
/// impl Participant for Config {}
///
/// let config = make_root(Config(7));
/// assert_eq!(config.use_count(), 1);
/// assert_eq!(config.get().map(|c| c.0), Some(7));
/// ```
#[must_use]
pub fn make_root<T: Participant>(value: T) -> Root<T> {
    let ptr = NonNull::from(Box::leak(Box::new(value)));
    Root::bind(ptr, header::combined_vtable::<T>(), None)
}

impl<T> Root<T> {
    /// Creates an empty root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ptr: None,
            header: None,
            _marker: PhantomData,
        }
    }

    /// Allocate a header for `ptr` and bind the first owner.
    fn bind(ptr: NonNull<T>, vtable: &'static PayloadVtable, release: Option<ReleaseFn>) -> Self {
        let payload = ptr.cast::<()>();
        let id = arena::with(|arena| arena.insert(Header::new(payload, vtable, release)));
        header::set_owner(id, payload, vtable);
        Self {
            ptr: Some(ptr),
            header: Some(id),
            _marker: PhantomData,
        }
    }

    /// Adopts a raw payload allocated by [`Box::into_raw`], using the default
    /// release action of dropping the box.
    ///
    /// # Safety
    ///
    /// `ptr` must have come from `Box::into_raw` and must not be owned by
    /// anything else.
    pub unsafe fn from_raw(ptr: NonNull<T>) -> Self
    where
        T: Participant,
    {
        Self::bind(ptr, header::separate_vtable::<T>(), None)
    }

    /// Adopts a raw payload with a custom release action, invoked in place of
    /// the payload destructor when the object is collected.
    ///
    /// # Safety
    ///
    /// `ptr` must stay valid until `release` runs, and `release` must fully
    /// dispose of the payload.
    pub unsafe fn from_raw_with<F>(ptr: NonNull<T>, release: F) -> Self
    where
        T: Participant,
        F: FnOnce(NonNull<T>) + 'static,
    {
        let release: ReleaseFn = Box::new(move |payload| release(payload.cast::<T>()));
        Self::bind(ptr, header::separate_vtable::<T>(), Some(release))
    }

    /// Promotes an internal handle to a root.
    ///
    /// Returns an empty root when the target is already unreachable: a stale
    /// handle inside a collected cycle cannot resurrect its target.
    #[must_use]
    pub fn from_internal(source: &Internal<T>) -> Self {
        match source.edge() {
            Some(edge) if header::owner_from_internal(edge.header) => Self {
                ptr: Some(edge.ptr.cast::<T>()),
                header: Some(edge.header),
                _marker: PhantomData,
            },
            _ => Self::new(),
        }
    }

    /// Shares `other`'s header while exposing a caller-chosen payload
    /// pointer, for cast-style views that must share one lifetime.
    ///
    /// This adds a plain owner to the existing header; it never re-runs owner
    /// binding, so the participant wiring of the original payload is
    /// untouched.
    ///
    /// # Safety
    ///
    /// `ptr` must point into the payload owned by `other`'s header (or to a
    /// base/field view of it) and must stay valid for the payload's lifetime.
    #[must_use]
    pub unsafe fn alias<U>(other: &Root<U>, ptr: NonNull<T>) -> Self {
        if let Some(id) = other.header {
            header::add_owner(id);
        }
        Self {
            ptr: Some(ptr),
            header: other.header,
            _marker: PhantomData,
        }
    }

    /// Returns the payload, or `None` for an empty root.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.ptr.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    /// Returns the payload pointer this root exposes, null when empty.
    #[must_use]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.map_or(core::ptr::null(), |ptr| ptr.as_ptr().cast_const())
    }

    /// Releases this root's ownership, leaving it empty.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Re-seats this root on a fresh boxed payload.
    pub fn reset_to(&mut self, value: Box<T>)
    where
        T: Participant,
    {
        *self = Self::from(value);
    }

    /// Exchanges the contents of two roots.
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(&mut self.ptr, &mut other.ptr);
        core::mem::swap(&mut self.header, &mut other.header);
    }

    /// Number of owning handles on the target, zero for an empty root or once
    /// collection of the target has begun.
    #[must_use]
    pub fn use_count(&self) -> u32 {
        self.header.map_or(0, header::use_count)
    }

    /// True when this root is the only owning handle on its target.
    #[must_use]
    pub fn unique(&self) -> bool {
        self.use_count() == 1
    }

    /// True when this root holds no payload pointer.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    pub(crate) fn edge(&self) -> Option<Edge> {
        match (self.header, self.ptr) {
            (Some(header), Some(ptr)) => Some(Edge {
                header,
                ptr: ptr.cast::<()>(),
            }),
            _ => None,
        }
    }
}

impl<T: Participant> From<Box<T>> for Root<T> {
    /// Adopts a uniquely owned payload as a separate block. The default
    /// release action drops the box.
    fn from(value: Box<T>) -> Self {
        let ptr = NonNull::from(Box::leak(value));
        Self::bind(ptr, header::separate_vtable::<T>(), None)
    }
}

impl<T> Clone for Root<T> {
    /// Adds an owner to the shared header.
    fn clone(&self) -> Self {
        if let Some(id) = self.header {
            header::add_owner(id);
        }
        Self {
            ptr: self.ptr,
            header: self.header,
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Root<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Root<T> {
    fn drop(&mut self) {
        if let Some(id) = self.header {
            header::remove_owner(id);
        }
    }
}

impl<T> Deref for Root<T> {
    type Target = T;

    /// # Panics
    ///
    /// Panics when the root is empty.
    fn deref(&self) -> &Self::Target {
        self.get().expect("dereferenced an empty Root")
    }
}

impl<T> fmt::Debug for Root<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root").field("ptr", &self.as_ptr()).finish()
    }
}

impl<T> fmt::Pointer for Root<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.as_ptr(), f)
    }
}
