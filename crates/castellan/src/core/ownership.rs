//! # Owning and handle semantics
//!
//! Every wrapped native resource comes in two flavours built from one generic type:
//!
//! - **owning** (`BasicWindow<Owning>`, alias `Window`): never null, frees the native
//!   resource exactly once when dropped, move-only
//! - **handle** (`BasicWindow<Handle<'a>>`, alias `WindowHandle<'a>`): may be null,
//!   never frees anything, `Copy`
//!
//! The flavour is picked by the [`Ownership`] marker. The marker selects the storage
//! slot through a generic associated type, so the owning slot carries a `Drop` impl
//! while the handle slot stays `Copy`, with no runtime tag and no dynamic dispatch.
//!
//! ```text
//! PointerManager<Owning, T, D>   ──► OwnedPtr<T, D>   (Drop runs D::delete once)
//! PointerManager<Handle<'a>, T, D> ─► BorrowedPtr<'a, T> (Copy, never frees)
//! ```
//!
//! Handles derived from an owner borrow it, so the borrow checker keeps them from
//! outliving the resource. Handles built from raw pointers go through an `unsafe`
//! constructor and inherit the caller's promise instead.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use log::trace;

use crate::core::error::{Error, Result};

mod sealed {
    pub trait Sealed {}
}

/// Frees a native resource of type `T`.
pub trait Deleter<T> {
    /// Releases the resource behind `ptr`.
    ///
    /// # Safety
    /// `ptr` must be live and must not be used again afterwards.
    unsafe fn delete(ptr: NonNull<T>);
}

/// Storage behaviour shared by both ownership slots.
pub trait PointerSlot<T> {
    /// The stored pointer, possibly null.
    fn get(&self) -> *mut T;
}

/// Compile time selector between owning and handle semantics.
///
/// Sealed: the only implementors are [`Owning`] and [`Handle`].
pub trait Ownership: sealed::Sealed {
    /// `true` for [`Owning`].
    const IS_OWNING: bool;

    /// Pointer storage used by this flavour.
    type Slot<T, D: Deleter<T>>: PointerSlot<T>;
}

/// Marker for resources that free their native pointer when dropped.
#[derive(Debug)]
pub enum Owning {}

/// Marker for non-owning aliases valid for `'a`.
#[derive(Debug)]
pub struct Handle<'a>(PhantomData<&'a ()>);

impl sealed::Sealed for Owning {}
impl sealed::Sealed for Handle<'_> {}

impl Ownership for Owning {
    const IS_OWNING: bool = true;
    type Slot<T, D: Deleter<T>> = OwnedPtr<T, D>;
}

impl<'a> Ownership for Handle<'a> {
    const IS_OWNING: bool = false;
    type Slot<T, D: Deleter<T>> = BorrowedPtr<'a, T>;
}

/// Owning storage; frees the pointer through `D` on drop.
pub struct OwnedPtr<T, D: Deleter<T>> {
    ptr: *mut T,
    _deleter: PhantomData<D>,
}

impl<T, D: Deleter<T>> OwnedPtr<T, D> {
    fn delete_current(&mut self) {
        if let Some(ptr) = NonNull::new(self.ptr) {
            trace!("Deleting native resource {ptr:p}");
            // SAFETY: the slot is the only owner of a non-null pointer, and it is
            // nulled right after so the deleter cannot run twice for it.
            unsafe { D::delete(ptr) };
            self.ptr = ptr::null_mut();
        }
    }
}

impl<T, D: Deleter<T>> PointerSlot<T> for OwnedPtr<T, D> {
    fn get(&self) -> *mut T {
        self.ptr
    }
}

impl<T, D: Deleter<T>> Drop for OwnedPtr<T, D> {
    fn drop(&mut self) {
        self.delete_current();
    }
}

/// Handle storage; a plain copyable pointer.
pub struct BorrowedPtr<'a, T> {
    ptr: *mut T,
    _lifetime: PhantomData<&'a ()>,
}

impl<T> Clone for BorrowedPtr<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BorrowedPtr<'_, T> {}

impl<T> PointerSlot<T> for BorrowedPtr<'_, T> {
    fn get(&self) -> *mut T {
        self.ptr
    }
}

/// Holds one native resource pointer with owning or handle semantics.
///
/// `O` selects the semantics, `T` is the native resource and `D` the deleter used
/// by the owning flavour.
pub struct PointerManager<O: Ownership, T, D: Deleter<T>> {
    slot: O::Slot<T, D>,
}

impl<T, D: Deleter<T>> PointerManager<Owning, T, D> {
    /// Takes ownership of `ptr`.
    ///
    /// Fails with [`Error::NullPointer`] naming `kind` if `ptr` is null; the deleter
    /// is not invoked in that case.
    ///
    /// # Safety
    /// `ptr` must be null or a live resource that nothing else will free.
    pub unsafe fn new(ptr: *mut T, kind: &'static str) -> Result<Self> {
        if ptr.is_null() {
            return Err(Error::NullPointer(kind));
        }
        Ok(Self {
            slot: OwnedPtr {
                ptr,
                _deleter: PhantomData,
            },
        })
    }

    /// Frees the current pointer (if any) and takes ownership of `ptr`.
    ///
    /// Resetting to the pointer already held is a no-op.
    ///
    /// # Safety
    /// `ptr` must be null or a live resource that nothing else will free.
    pub unsafe fn reset(&mut self, ptr: *mut T) {
        if ptr != self.slot.ptr {
            self.slot.delete_current();
            self.slot.ptr = ptr;
        }
    }

    /// Gives up ownership without freeing, leaving the manager null.
    #[must_use = "the released pointer must be freed by the caller"]
    pub fn release(&mut self) -> *mut T {
        std::mem::replace(&mut self.slot.ptr, ptr::null_mut())
    }
}

impl<'a, T, D: Deleter<T>> PointerManager<Handle<'a>, T, D> {
    /// Aliases `ptr`, which may be null. Never fails.
    ///
    /// # Safety
    /// `ptr` must be null or stay live for `'a`.
    pub unsafe fn new(ptr: *mut T) -> Self {
        Self {
            slot: BorrowedPtr {
                ptr,
                _lifetime: PhantomData,
            },
        }
    }

    /// Aliases the pointer held by `owner` for as long as `owner` is borrowed.
    pub fn from_owner(owner: &'a PointerManager<Owning, T, D>) -> Self {
        // SAFETY: the borrow of `owner` keeps the resource alive for `'a`.
        unsafe { Self::new(owner.get()) }
    }
}

impl<O: Ownership, T, D: Deleter<T>> PointerManager<O, T, D> {
    /// The stored pointer; ownership is not transferred.
    pub fn get(&self) -> *mut T {
        self.slot.get()
    }

    /// Whether no pointer is stored.
    pub fn is_null(&self) -> bool {
        self.get().is_null()
    }

    /// Whether this manager frees its pointer.
    pub const fn is_owning(&self) -> bool {
        O::IS_OWNING
    }
}

impl<T, D: Deleter<T>> Clone for PointerManager<Handle<'_>, T, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, D: Deleter<T>> Copy for PointerManager<Handle<'_>, T, D> {}

impl<O: Ownership, T, D: Deleter<T>> PartialEq for PointerManager<O, T, D> {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl<O: Ownership, T, D: Deleter<T>> Eq for PointerManager<O, T, D> {}

impl<O: Ownership, T, D: Deleter<T>> fmt::Debug for PointerManager<O, T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerManager")
            .field("ptr", &self.get())
            .field("owning", &O::IS_OWNING)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    thread_local! {
        static DELETED: Cell<usize> = const { Cell::new(0) };
    }

    struct Resource(u32);

    struct CountingDeleter;

    impl Deleter<Resource> for CountingDeleter {
        unsafe fn delete(ptr: NonNull<Resource>) {
            DELETED.with(|deleted| deleted.set(deleted.get() + 1));
            drop(unsafe { Box::from_raw(ptr.as_ptr()) });
        }
    }

    type Owner = PointerManager<Owning, Resource, CountingDeleter>;
    type Alias<'a> = PointerManager<Handle<'a>, Resource, CountingDeleter>;

    fn deleted() -> usize {
        DELETED.with(Cell::get)
    }

    fn resource(value: u32) -> *mut Resource {
        Box::into_raw(Box::new(Resource(value)))
    }

    #[test]
    fn test_owner_rejects_null_without_deleting() {
        let before = deleted();
        let result = unsafe { Owner::new(ptr::null_mut(), "resource") };
        assert!(matches!(result, Err(Error::NullPointer("resource"))));
        assert_eq!(deleted(), before);
    }

    #[test]
    fn test_handle_accepts_null() {
        let handle = unsafe { Alias::new(ptr::null_mut()) };
        assert!(handle.is_null());
        assert!(!handle.is_owning());
    }

    #[test]
    fn test_drop_deletes_exactly_once() {
        let before = deleted();
        {
            let owner = unsafe { Owner::new(resource(1), "resource") }.unwrap();
            assert!(owner.is_owning());
            let moved = owner;
            assert_eq!(deleted(), before);
            assert!(!moved.is_null());
        }
        assert_eq!(deleted(), before + 1);
    }

    #[test]
    fn test_handle_shares_pointer_and_never_deletes() {
        let before = deleted();
        let owner = unsafe { Owner::new(resource(7), "resource") }.unwrap();
        {
            let handle = Alias::from_owner(&owner);
            let copy = handle;
            assert_eq!(handle.get(), owner.get());
            assert_eq!(copy, handle);
            assert_eq!(unsafe { (*copy.get()).0 }, 7);
        }
        assert_eq!(deleted(), before);
        drop(owner);
        assert_eq!(deleted(), before + 1);
    }

    #[test]
    fn test_reset_frees_previous_pointer() {
        let before = deleted();
        let mut owner = unsafe { Owner::new(resource(1), "resource") }.unwrap();
        let second = resource(2);
        unsafe { owner.reset(second) };
        assert_eq!(deleted(), before + 1);
        unsafe { owner.reset(second) };
        assert_eq!(deleted(), before + 1);
        drop(owner);
        assert_eq!(deleted(), before + 2);
    }

    #[test]
    fn test_release_hands_back_pointer() {
        let before = deleted();
        let mut owner = unsafe { Owner::new(resource(3), "resource") }.unwrap();
        let raw = owner.release();
        assert!(owner.is_null());
        drop(owner);
        assert_eq!(deleted(), before);
        unsafe { CountingDeleter::delete(NonNull::new(raw).unwrap()) };
        assert_eq!(deleted(), before + 1);
    }
}
