//! Owned foreign objects
//!
//! [`ForeignObject`] wraps a non-null pointer into the foreign runtime's
//! reference-counted object graph and claims release responsibility for
//! exactly one strong reference. The graph itself stays foreign property:
//! retain and release are delegated to the runtime's entry points, never
//! reimplemented natively.
//!
//! Construction is checked ([`ForeignObject::from_raw_checked`] translates
//! the null-means-error convention into a typed result), release happens
//! exactly once on drop, and [`ForeignObject::into_raw`] is the explicit
//! hand-off that moves release responsibility back to the foreign runtime.

use crate::abi::layout::RawObject;
use crate::audit::AuditEvent;
use crate::error::ForeignError;
use crate::handle::RuntimeHandle;
use crate::table::EntryPointTable;
use std::ptr::NonNull;

/// A foreign object with unique release responsibility.
///
/// Borrows the table it was created through so release can re-acquire the
/// execution context at drop time; an object may therefore outlive any
/// handle scope, but never the runtime binding itself.
pub struct ForeignObject<'rt> {
    ptr: NonNull<RawObject>,
    table: &'rt EntryPointTable,
}

impl<'rt> ForeignObject<'rt> {
    /// Claim a pointer returned by a foreign call.
    ///
    /// Null is the foreign error sentinel and maps to [`ForeignError`]; the
    /// caller may then inspect the runtime's pending error state through the
    /// handle. On success this wrapper owns the strong reference the foreign
    /// call produced.
    pub fn from_raw_checked(
        table: &'rt EntryPointTable,
        _handle: RuntimeHandle<'_>,
        ptr: *mut RawObject,
    ) -> Result<Self, ForeignError> {
        match NonNull::new(ptr) {
            Some(ptr) => Ok(Self { ptr, table }),
            None => Err(ForeignError),
        }
    }

    /// Wrap a pointer known to be non-null.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live foreign object, and the caller must be
    /// transferring exactly one strong reference to the wrapper.
    pub unsafe fn from_owned_ptr(
        table: &'rt EntryPointTable,
        _handle: RuntimeHandle<'_>,
        ptr: NonNull<RawObject>,
    ) -> Self {
        Self { ptr, table }
    }

    /// The raw pointer, still owned by this wrapper.
    pub fn as_ptr(&self) -> *mut RawObject {
        self.ptr.as_ptr()
    }

    /// Hand release responsibility back to the foreign runtime.
    ///
    /// The explicit ownership hand-off: the returned pointer carries the
    /// strong reference this wrapper held, and drop will not run. Distinct
    /// from drop, which releases.
    pub fn into_raw(self) -> *mut RawObject {
        let ptr = self.ptr.as_ptr();
        self.table.audit().record(AuditEvent::ObjectHandedOff);
        std::mem::forget(self);
        ptr
    }

    /// Take an additional strong reference, delegated to the foreign
    /// runtime's retain entry point.
    pub fn clone_ref(&self, handle: RuntimeHandle<'_>) -> Self {
        unsafe { (self.table.entry_points().retain)(self.ptr.as_ptr()) };
        handle.record(AuditEvent::ObjectRetained);
        Self {
            ptr: self.ptr,
            table: self.table,
        }
    }

    /// The foreign reference count, read from the object header.
    pub fn refcount(&self, _handle: RuntimeHandle<'_>) -> isize {
        unsafe { (*self.ptr.as_ptr()).refcount }
    }

    /// Is this a foreign date? Answered by the runtime's own type predicate,
    /// never by native structural inference.
    pub fn is_date(&self, _handle: RuntimeHandle<'_>) -> bool {
        unsafe { (self.table.entry_points().date_check)(self.ptr.as_ptr()) != 0 }
    }

    /// Is this a foreign time?
    pub fn is_time(&self, _handle: RuntimeHandle<'_>) -> bool {
        unsafe { (self.table.entry_points().time_check)(self.ptr.as_ptr()) != 0 }
    }

    /// Is this a foreign integer?
    pub fn is_int(&self, _handle: RuntimeHandle<'_>) -> bool {
        unsafe { (self.table.entry_points().int_check)(self.ptr.as_ptr()) != 0 }
    }

    /// Is this a foreign list?
    pub fn is_list(&self, _handle: RuntimeHandle<'_>) -> bool {
        unsafe { (self.table.entry_points().list_check)(self.ptr.as_ptr()) != 0 }
    }

    /// Read this object as a foreign integer.
    ///
    /// The entry point returns -1 with an error pending on failure; a
    /// legitimate -1 is disambiguated through the error-state query.
    pub fn read_long(&self, handle: RuntimeHandle<'_>) -> Result<i64, ForeignError> {
        let value = unsafe { (self.table.entry_points().int_as_long)(self.ptr.as_ptr()) };
        if value == -1 && handle.err_pending() {
            return Err(ForeignError);
        }
        Ok(value)
    }

    pub(crate) fn table(&self) -> &'rt EntryPointTable {
        self.table
    }
}

impl Clone for ForeignObject<'_> {
    /// Delegates to [`clone_ref`](Self::clone_ref) under a fresh context
    /// scope. Reference counts are foreign state, so even a clone crosses
    /// the boundary.
    fn clone(&self) -> Self {
        self.table.with_runtime(|handle| self.clone_ref(handle))
    }
}

impl Drop for ForeignObject<'_> {
    /// Release the strong reference exactly once.
    ///
    /// Re-acquires the execution context: an object dropped outside any
    /// handle scope still needs the capability its release call requires,
    /// and the context's per-thread reentrancy makes the re-acquisition safe
    /// even when the drop happens inside an outer scope.
    fn drop(&mut self) {
        let ptr = self.ptr.as_ptr();
        self.table.with_runtime(|handle| {
            unsafe { (self.table.entry_points().release)(ptr) };
            handle.record(AuditEvent::ObjectReleased);
        });
    }
}
