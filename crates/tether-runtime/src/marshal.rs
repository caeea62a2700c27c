//! Native ⇄ foreign value marshaling
//!
//! Each conversion is one audited mapping: range-checked on the native side,
//! type-checked through the foreign runtime's own predicates, and built on
//! the checked-construction and hand-off rules of [`ForeignObject`].

use crate::audit::AuditEvent;
use crate::error::{BindError, MarshalError};
use crate::handle::RuntimeHandle;
use crate::object::ForeignObject;
use crate::table::EntryPointTable;
use std::os::raw::c_long;
use std::ptr::NonNull;

/// Read a foreign object as a native `usize`.
///
/// Type-checked through the runtime's integer predicate first, so a
/// mismatch is reported natively without burning a foreign error round
/// trip.
pub fn usize_arg(
    handle: RuntimeHandle<'_>,
    obj: &ForeignObject<'_>,
) -> Result<usize, BindError> {
    if !obj.is_int(handle) {
        return Err(MarshalError::TypeMismatch { expected: "int" }.into());
    }
    let value = obj.read_long(handle)?;
    if value < 0 {
        return Err(MarshalError::OutOfRange {
            value: value as i128,
            target: "usize",
        }
        .into());
    }
    Ok(value as usize)
}

/// Build a foreign integer from a native `u64`.
pub fn int_from_u64<'rt>(
    table: &'rt EntryPointTable,
    handle: RuntimeHandle<'_>,
    value: u64,
) -> Result<ForeignObject<'rt>, BindError> {
    if value > c_long::MAX as u64 {
        return Err(MarshalError::OutOfRange {
            value: value as i128,
            target: "c_long",
        }
        .into());
    }
    let ptr = unsafe { (table.entry_points().int_from_long)(value as c_long) };
    Ok(ForeignObject::from_raw_checked(table, handle, ptr)?)
}

/// Build a foreign list of integers from a native slice.
///
/// Each item is handed off to the list through `list_set_item`, which steals
/// the reference on success. On failure the item's ownership stays native
/// and is released here, so a partially built list leaks nothing.
pub fn list_from_u64s<'rt>(
    table: &'rt EntryPointTable,
    handle: RuntimeHandle<'_>,
    values: &[u64],
) -> Result<ForeignObject<'rt>, BindError> {
    let ptr = unsafe { (table.entry_points().list_new)(values.len() as isize) };
    let list = ForeignObject::from_raw_checked(table, handle, ptr)?;

    for (index, &value) in values.iter().enumerate() {
        let item = int_from_u64(table, handle, value)?;
        let raw = item.into_raw();
        let rc =
            unsafe { (table.entry_points().list_set_item)(list.as_ptr(), index as isize, raw) };
        if rc != 0 {
            // The hand-off was declined; reclaim our reference and release it.
            let reclaimed = unsafe {
                ForeignObject::from_owned_ptr(table, handle, NonNull::new_unchecked(raw))
            };
            drop(reclaimed);
            return Err(BindError::Foreign(crate::error::ForeignError));
        }
        handle.record(AuditEvent::EntryCall {
            name: "list_set_item",
        });
    }

    Ok(list)
}

// Every conversion needs a live table; coverage lives in tests/binding.rs
// against the mock runtime.
