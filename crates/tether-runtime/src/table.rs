//! Validated entry-point table
//!
//! [`EntryPointTable::from_capsule`] turns the foreign runtime's raw capsule
//! into a table of non-null function pointers, rejecting version mismatches,
//! null slots, and layout disagreements up front. After validation every
//! lookup is a plain field read: pure, panic-free, and requiring no
//! synchronization.
//!
//! A process binds at most one runtime. [`install_global`] publishes a table
//! behind a `OnceLock` (a one-time happens-before barrier); the table is
//! immutable afterwards and re-installation is a checked error.

use crate::abi::capsule::{RawCapsule, CAPSULE_ABI_VERSION};
use crate::abi::layout::{self, LayoutMismatch, RawDate, RawObject, RawTime};
use crate::audit::{AuditEvent, AuditLogger, NullAuditLogger};
use crate::error::InitError;
use crate::handle::RuntimeHandle;
use std::mem::size_of;
use std::os::raw::{c_char, c_int, c_long};
use std::sync::{Arc, OnceLock};

/// Validated, non-null entry points copied out of the capsule.
///
/// Crate-internal: callers go through [`RuntimeHandle`] and the object
/// wrappers, which prove the execution context is held.
#[derive(Clone, Copy)]
pub(crate) struct EntryPoints {
    pub context_acquire: unsafe extern "C" fn(),
    pub context_release: unsafe extern "C" fn(),
    pub retain: unsafe extern "C" fn(*mut RawObject),
    pub release: unsafe extern "C" fn(*mut RawObject),
    pub err_occurred: unsafe extern "C" fn() -> c_int,
    pub err_clear: unsafe extern "C" fn(),
    pub err_set: unsafe extern "C" fn(*const c_char),
    pub date_check: unsafe extern "C" fn(*mut RawObject) -> c_int,
    pub time_check: unsafe extern "C" fn(*mut RawObject) -> c_int,
    pub int_check: unsafe extern "C" fn(*mut RawObject) -> c_int,
    pub list_check: unsafe extern "C" fn(*mut RawObject) -> c_int,
    pub date_new: unsafe extern "C" fn(c_int, c_int, c_int) -> *mut RawObject,
    pub time_new: unsafe extern "C" fn(c_int, c_int, c_int, c_int) -> *mut RawObject,
    pub int_from_long: unsafe extern "C" fn(c_long) -> *mut RawObject,
    pub date_year: unsafe extern "C" fn(*mut RawObject) -> c_int,
    pub date_month: unsafe extern "C" fn(*mut RawObject) -> c_int,
    pub date_day: unsafe extern "C" fn(*mut RawObject) -> c_int,
    pub time_hour: unsafe extern "C" fn(*mut RawObject) -> c_int,
    pub time_minute: unsafe extern "C" fn(*mut RawObject) -> c_int,
    pub time_second: unsafe extern "C" fn(*mut RawObject) -> c_int,
    pub time_microsecond: unsafe extern "C" fn(*mut RawObject) -> c_int,
    pub int_as_long: unsafe extern "C" fn(*mut RawObject) -> c_long,
    pub list_new: unsafe extern "C" fn(isize) -> *mut RawObject,
    pub list_set_item: unsafe extern "C" fn(*mut RawObject, isize, *mut RawObject) -> c_int,
    pub seq_len: unsafe extern "C" fn(*mut RawObject) -> isize,
    pub seq_get_item: unsafe extern "C" fn(*mut RawObject, isize) -> *mut RawObject,
}

fn required<T>(slot: Option<T>, name: &'static str) -> Result<T, InitError> {
    slot.ok_or(InitError::NullEntryPoint(name))
}

fn check_published_size(
    name: &'static str,
    native: usize,
    published: u32,
) -> Result<(), LayoutMismatch> {
    if native != published as usize {
        return Err(LayoutMismatch::Size {
            name,
            native,
            published: published as usize,
        });
    }
    Ok(())
}

/// The binding layer's view of one foreign runtime.
pub struct EntryPointTable {
    entry_points: EntryPoints,
    audit: Arc<dyn AuditLogger>,
}

impl EntryPointTable {
    /// Validate a capsule and build a table from it.
    ///
    /// Fails fast on a null capsule, an ABI version this layer was not built
    /// against, any null entry-point slot, or any disagreement between the
    /// native struct layouts and the sizes the capsule publishes. The capsule
    /// is copied; it need not outlive this call.
    pub fn from_capsule(capsule: *const RawCapsule) -> Result<Self, InitError> {
        if capsule.is_null() {
            return Err(InitError::NullCapsule);
        }
        // Validity of the pointed-to struct is the embedder's side of the
        // symbol contract.
        let raw = unsafe { &*capsule };

        if raw.abi_version != CAPSULE_ABI_VERSION {
            return Err(InitError::VersionMismatch {
                expected: CAPSULE_ABI_VERSION,
                found: raw.abi_version,
            });
        }

        layout::verify_abi()?;
        check_published_size("RawObject", size_of::<RawObject>(), raw.sizeof_object)?;
        check_published_size("RawDate", size_of::<RawDate>(), raw.sizeof_date)?;
        check_published_size("RawTime", size_of::<RawTime>(), raw.sizeof_time)?;

        let entry_points = EntryPoints {
            context_acquire: required(raw.context_acquire, "context_acquire")?,
            context_release: required(raw.context_release, "context_release")?,
            retain: required(raw.retain, "retain")?,
            release: required(raw.release, "release")?,
            err_occurred: required(raw.err_occurred, "err_occurred")?,
            err_clear: required(raw.err_clear, "err_clear")?,
            err_set: required(raw.err_set, "err_set")?,
            date_check: required(raw.date_check, "date_check")?,
            time_check: required(raw.time_check, "time_check")?,
            int_check: required(raw.int_check, "int_check")?,
            list_check: required(raw.list_check, "list_check")?,
            date_new: required(raw.date_new, "date_new")?,
            time_new: required(raw.time_new, "time_new")?,
            int_from_long: required(raw.int_from_long, "int_from_long")?,
            date_year: required(raw.date_year, "date_year")?,
            date_month: required(raw.date_month, "date_month")?,
            date_day: required(raw.date_day, "date_day")?,
            time_hour: required(raw.time_hour, "time_hour")?,
            time_minute: required(raw.time_minute, "time_minute")?,
            time_second: required(raw.time_second, "time_second")?,
            time_microsecond: required(raw.time_microsecond, "time_microsecond")?,
            int_as_long: required(raw.int_as_long, "int_as_long")?,
            list_new: required(raw.list_new, "list_new")?,
            list_set_item: required(raw.list_set_item, "list_set_item")?,
            seq_len: required(raw.seq_len, "seq_len")?,
            seq_get_item: required(raw.seq_get_item, "seq_get_item")?,
        };

        Ok(Self {
            entry_points,
            audit: Arc::new(NullAuditLogger),
        })
    }

    /// Attach an audit logger for boundary events.
    pub fn with_audit(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// Run `f` with the foreign execution context held.
    ///
    /// Acquires the context, hands `f` a [`RuntimeHandle`] proving it is
    /// held, and releases on every exit path, unwinding included. The
    /// higher-ranked closure bound keeps the handle from escaping the scope.
    ///
    /// The context is reentrant for the holding thread, so nesting this call
    /// (including from [`Drop`](crate::object::ForeignObject) of an object
    /// that outlived its original scope) does not deadlock; each nesting
    /// level pairs its own acquire with its own release.
    pub fn with_runtime<R>(&self, f: impl for<'a> FnOnce(RuntimeHandle<'a>) -> R) -> R {
        unsafe { (self.entry_points.context_acquire)() };
        self.audit.record(AuditEvent::ContextAcquired);
        let _scope = ContextScope { table: self };
        f(RuntimeHandle::new(self))
    }

    pub(crate) fn entry_points(&self) -> &EntryPoints {
        &self.entry_points
    }

    pub(crate) fn audit(&self) -> &dyn AuditLogger {
        &*self.audit
    }
}

/// Releases the execution context when the scope ends, error paths included.
struct ContextScope<'rt> {
    table: &'rt EntryPointTable,
}

impl Drop for ContextScope<'_> {
    fn drop(&mut self) {
        unsafe { (self.table.entry_points.context_release)() };
        self.table.audit.record(AuditEvent::ContextReleased);
    }
}

static GLOBAL: OnceLock<EntryPointTable> = OnceLock::new();

/// Install the process-wide entry-point table.
///
/// May be called exactly once; a second call is a checked
/// [`InitError::AlreadyInitialized`], never a silent re-initialization.
pub fn install_global(table: EntryPointTable) -> Result<&'static EntryPointTable, InitError> {
    if GLOBAL.set(table).is_err() {
        return Err(InitError::AlreadyInitialized);
    }
    match GLOBAL.get() {
        Some(table) => Ok(table),
        // set() succeeded on this thread
        None => unreachable!(),
    }
}

/// The process-wide table, if one has been installed.
pub fn global() -> Option<&'static EntryPointTable> {
    GLOBAL.get()
}

/// Validate a capsule and install it as the process-wide table.
pub fn initialize(capsule: *const RawCapsule) -> Result<&'static EntryPointTable, InitError> {
    install_global(EntryPointTable::from_capsule(capsule)?)
}
