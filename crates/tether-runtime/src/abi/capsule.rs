//! The foreign runtime's exported capsule
//!
//! The runtime publishes its API as a single `#[repr(C)]` struct of function
//! pointers, resolved by symbol name at initialization. Slots are declared as
//! `Option<unsafe extern "C" fn ...>` so a null slot arrives as `None` and
//! can be rejected during validation instead of crashing at call time.
//!
//! Calling conventions, per the v1 ABI:
//! - object-returning entry points return null when an error is pending
//! - int-returning entry points return -1 with an error pending (query
//!   `err_occurred` to distinguish a legitimate -1)
//! - `list_set_item` steals the item reference on success and leaves
//!   ownership with the caller on failure
//! - `seq_get_item` returns a new reference
//! - the execution context is global-exclusive and reentrant within the
//!   holding thread; every other entry point requires it to be held

use crate::abi::layout::RawObject;
use std::os::raw::{c_char, c_int, c_long};

/// Capsule ABI version this layer is built against.
pub const CAPSULE_ABI_VERSION: u32 = 1;

/// Symbol exported by the foreign runtime that yields the capsule.
pub const CAPSULE_SYMBOL: &str = "tether_capsule_v1";

/// Signature of the capsule-yielding symbol.
pub type CapsuleFn = unsafe extern "C" fn() -> *const RawCapsule;

/// The v1 capsule: version marker, published struct sizes, entry points.
///
/// Field order is the binary contract; reordering is an ABI break and
/// requires a new version marker and symbol.
#[repr(C)]
pub struct RawCapsule {
    /// ABI version marker; must equal [`CAPSULE_ABI_VERSION`]
    pub abi_version: u32,
    /// Published `sizeof` of the object header
    pub sizeof_object: u32,
    /// Published `sizeof` of the date struct
    pub sizeof_date: u32,
    /// Published `sizeof` of the time struct
    pub sizeof_time: u32,

    // Execution context
    pub context_acquire: Option<unsafe extern "C" fn()>,
    pub context_release: Option<unsafe extern "C" fn()>,

    // Reference counting
    pub retain: Option<unsafe extern "C" fn(*mut RawObject)>,
    pub release: Option<unsafe extern "C" fn(*mut RawObject)>,

    // Error state
    pub err_occurred: Option<unsafe extern "C" fn() -> c_int>,
    pub err_clear: Option<unsafe extern "C" fn()>,
    pub err_set: Option<unsafe extern "C" fn(*const c_char)>,

    // Type predicates
    pub date_check: Option<unsafe extern "C" fn(*mut RawObject) -> c_int>,
    pub time_check: Option<unsafe extern "C" fn(*mut RawObject) -> c_int>,
    pub int_check: Option<unsafe extern "C" fn(*mut RawObject) -> c_int>,
    pub list_check: Option<unsafe extern "C" fn(*mut RawObject) -> c_int>,

    // Constructors
    pub date_new: Option<unsafe extern "C" fn(c_int, c_int, c_int) -> *mut RawObject>,
    pub time_new: Option<unsafe extern "C" fn(c_int, c_int, c_int, c_int) -> *mut RawObject>,
    pub int_from_long: Option<unsafe extern "C" fn(c_long) -> *mut RawObject>,

    // Accessors
    pub date_year: Option<unsafe extern "C" fn(*mut RawObject) -> c_int>,
    pub date_month: Option<unsafe extern "C" fn(*mut RawObject) -> c_int>,
    pub date_day: Option<unsafe extern "C" fn(*mut RawObject) -> c_int>,
    pub time_hour: Option<unsafe extern "C" fn(*mut RawObject) -> c_int>,
    pub time_minute: Option<unsafe extern "C" fn(*mut RawObject) -> c_int>,
    pub time_second: Option<unsafe extern "C" fn(*mut RawObject) -> c_int>,
    pub time_microsecond: Option<unsafe extern "C" fn(*mut RawObject) -> c_int>,
    pub int_as_long: Option<unsafe extern "C" fn(*mut RawObject) -> c_long>,

    // Sequences
    pub list_new: Option<unsafe extern "C" fn(isize) -> *mut RawObject>,
    pub list_set_item: Option<unsafe extern "C" fn(*mut RawObject, isize, *mut RawObject) -> c_int>,
    pub seq_len: Option<unsafe extern "C" fn(*mut RawObject) -> isize>,
    pub seq_get_item: Option<unsafe extern "C" fn(*mut RawObject, isize) -> *mut RawObject>,
}
