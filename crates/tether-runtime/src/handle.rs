//! Scoped runtime handle
//!
//! [`RuntimeHandle`] is a zero-sized proof that the calling thread currently
//! holds the foreign runtime's execution context. It is only ever constructed
//! inside [`EntryPointTable::with_runtime`], cannot be sent to another
//! thread, and the higher-ranked closure bound on `with_runtime` keeps it
//! from being stored past the scope that proved the context was held.
//!
//! Every operation that touches the foreign object graph takes a handle by
//! value; "call without context" is therefore unrepresentable rather than a
//! runtime assertion.

use crate::audit::AuditEvent;
use crate::table::{EntryPointTable, EntryPoints};
use std::ffi::{CStr, CString};
use std::marker::PhantomData;

/// Proof that the foreign execution context is held by this thread.
///
/// `Copy` like a borrow: handing a handle to a callee does not release the
/// context, and all copies die with the scope.
#[derive(Clone, Copy)]
pub struct RuntimeHandle<'rt> {
    table: &'rt EntryPointTable,
    /// Raw-pointer marker: the context is thread-bound, so the proof must
    /// be neither Send nor Sync.
    _not_send: PhantomData<*mut ()>,
}

impl<'rt> RuntimeHandle<'rt> {
    pub(crate) fn new(table: &'rt EntryPointTable) -> Self {
        Self {
            table,
            _not_send: PhantomData,
        }
    }

    /// The table this handle was acquired from.
    pub fn table(&self) -> &'rt EntryPointTable {
        self.table
    }

    /// Is an error pending in the foreign runtime?
    pub fn err_pending(&self) -> bool {
        unsafe { (self.entry_points().err_occurred)() != 0 }
    }

    /// Clear the foreign runtime's pending error state.
    pub fn err_clear(&self) {
        unsafe { (self.entry_points().err_clear)() };
    }

    /// Set the foreign runtime's error state to a message.
    ///
    /// Used by adapters to surface native failures through the embedder's
    /// standard error convention.
    pub fn err_set_message(&self, msg: &str) {
        const FALLBACK: &CStr = c"error message contained an interior NUL byte";
        match CString::new(msg) {
            Ok(c) => unsafe { (self.entry_points().err_set)(c.as_ptr()) },
            Err(_) => unsafe { (self.entry_points().err_set)(FALLBACK.as_ptr()) },
        }
    }

    pub(crate) fn entry_points(&self) -> &'rt EntryPoints {
        self.table.entry_points()
    }

    pub(crate) fn record(&self, event: AuditEvent) {
        self.table.audit().record(event);
    }
}
