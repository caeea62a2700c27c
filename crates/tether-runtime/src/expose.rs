//! Exposing native functions to the foreign runtime
//!
//! The inverse direction of the binding: the foreign runtime calls into
//! native code through entries matching its extension-function ABI. An
//! exposed entry receives a context object and an argument sequence, both
//! foreign-owned, and returns either a new reference the runtime takes over
//! or null with an error pending.
//!
//! [`dispatch`] is the bridge every entry goes through: marshal in, run the
//! native function, marshal out, hand off. Native failures surface through
//! the runtime's standard error convention (`err_set` + null); a pending
//! foreign error is propagated untouched. Panics are caught at the
//! boundary, since unwinding into foreign frames is undefined behavior.

use crate::abi::capsule::RawCapsule;
use crate::abi::layout::RawObject;
use crate::error::{BindError, ForeignError, MarshalError};
use crate::handle::RuntimeHandle;
use crate::marshal;
use crate::object::ForeignObject;
use crate::pascal::pascal_row;
use crate::table::{self, EntryPointTable};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

/// Extension-function signature the embedding runtime expects.
///
/// Arguments: context object (module or receiver), argument sequence.
/// Returns a new reference, or null with an error pending.
pub type RawExtensionFn =
    unsafe extern "C" fn(*mut RawObject, *mut RawObject) -> *mut RawObject;

/// One entry in the module's method table.
#[repr(C)]
pub struct MethodDef {
    pub name: *const c_char,
    pub func: RawExtensionFn,
    pub doc: *const c_char,
}

// The pointers reference 'static string literals.
unsafe impl Sync for MethodDef {}

/// The registration table handed to the embedder.
#[repr(C)]
pub struct ModuleDef {
    pub name: *const c_char,
    pub method_count: usize,
    pub methods: *const MethodDef,
}

unsafe impl Sync for ModuleDef {}

/// Borrowed view of the foreign argument sequence.
///
/// The sequence stays foreign property: no release on drop. Items are
/// fetched as new references and wrapped as owned objects.
pub struct Arguments<'rt> {
    table: &'rt EntryPointTable,
    ptr: *mut RawObject,
}

impl<'rt> Arguments<'rt> {
    /// Wrap the argument sequence pointer an extension entry received.
    ///
    /// # Safety
    ///
    /// `ptr` must be the live, caller-owned sequence the foreign runtime
    /// passed in; the view must not outlive that call.
    pub unsafe fn borrowed(
        table: &'rt EntryPointTable,
        ptr: *mut RawObject,
    ) -> Result<Self, MarshalError> {
        if ptr.is_null() {
            return Err(MarshalError::NullPointer);
        }
        Ok(Self { table, ptr })
    }

    /// Number of arguments.
    pub fn len(&self, _handle: RuntimeHandle<'_>) -> Result<usize, ForeignError> {
        let len = unsafe { (self.table.entry_points().seq_len)(self.ptr) };
        if len < 0 {
            return Err(ForeignError);
        }
        Ok(len as usize)
    }

    pub fn is_empty(&self, handle: RuntimeHandle<'_>) -> Result<bool, ForeignError> {
        Ok(self.len(handle)? == 0)
    }

    /// Fetch argument `index` as a new reference.
    pub fn get(
        &self,
        handle: RuntimeHandle<'_>,
        index: usize,
    ) -> Result<ForeignObject<'rt>, BindError> {
        let ptr = unsafe { (self.table.entry_points().seq_get_item)(self.ptr, index as isize) };
        Ok(ForeignObject::from_raw_checked(self.table, handle, ptr)?)
    }

    /// Fetch argument `index` and marshal it to a native `usize`.
    pub fn get_usize(
        &self,
        handle: RuntimeHandle<'_>,
        index: usize,
    ) -> Result<usize, BindError> {
        let obj = self.get(handle, index)?;
        marshal::usize_arg(handle, &obj)
    }

    /// Fail unless exactly `expected` arguments were passed.
    pub fn expect_arity(
        &self,
        handle: RuntimeHandle<'_>,
        expected: usize,
    ) -> Result<(), BindError> {
        let got = self.len(handle)?;
        if got != expected {
            return Err(MarshalError::Arity { expected, got }.into());
        }
        Ok(())
    }
}

/// Bridge one extension-function invocation across the boundary.
///
/// Runs `f` with the execution context held (the embedder already holds it
/// when it invokes extension code; acquisition here nests reentrantly) and
/// translates the outcome into the foreign convention:
/// - success: the result object is handed off, its reference now the
///   foreign caller's to manage and never released natively again
/// - [`ForeignError`]: null, the already-pending foreign error untouched
/// - any other failure: `err_set` with the native message, then null
/// - panic: caught, reported as an error, never unwound into foreign frames
///
/// Returns null without an error set only if no table is installed, which
/// the embedder's registration contract rules out.
pub fn dispatch<F>(args: *mut RawObject, f: F) -> *mut RawObject
where
    F: FnOnce(
        &'static EntryPointTable,
        RuntimeHandle<'_>,
        &Arguments<'static>,
    ) -> Result<ForeignObject<'static>, BindError>,
{
    let Some(table) = table::global() else {
        return ptr::null_mut();
    };

    table.with_runtime(|handle| {
        let args = match unsafe { Arguments::borrowed(table, args) } {
            Ok(args) => args,
            Err(err) => {
                handle.err_set_message(&err.to_string());
                return ptr::null_mut();
            }
        };

        match catch_unwind(AssertUnwindSafe(|| f(table, handle, &args))) {
            Ok(Ok(result)) => result.into_raw(),
            Ok(Err(BindError::Foreign(_))) => ptr::null_mut(),
            Ok(Err(err)) => {
                handle.err_set_message(&err.to_string());
                ptr::null_mut()
            }
            Err(_) => {
                handle.err_set_message("native extension function panicked");
                ptr::null_mut()
            }
        }
    })
}

/// `pascal_row(n)`: one integer argument, returns row `n` of Pascal's
/// triangle as a foreign list of integers.
///
/// # Safety
///
/// Must be invoked by the embedding runtime through the extension-function
/// ABI, after module initialization.
pub unsafe extern "C" fn pascal_row_entry(
    _ctx: *mut RawObject,
    args: *mut RawObject,
) -> *mut RawObject {
    dispatch(args, |table, handle, args| {
        args.expect_arity(handle, 1)?;
        let n = args.get_usize(handle, 0)?;
        let row = pascal_row(n);
        marshal::list_from_u64s(table, handle, &row)
    })
}

/// Exported module name.
pub const MODULE_NAME: &CStr = c"tether_ext";

static METHODS: [MethodDef; 1] = [MethodDef {
    name: c"pascal_row".as_ptr(),
    func: pascal_row_entry,
    doc: c"pascal_row(n) -> list: row n of Pascal's triangle".as_ptr(),
}];

/// The module registration table.
pub static MODULE: ModuleDef = ModuleDef {
    name: MODULE_NAME.as_ptr(),
    method_count: METHODS.len(),
    methods: METHODS.as_ptr(),
};

/// Module entry point resolved by the embedding runtime.
///
/// Validates the capsule, installs the process-wide entry-point table, and
/// returns the method registration table. A repeat call reuses the
/// already-installed table. Returns null if the capsule fails validation;
/// the embedder treats that as a failed import.
///
/// # Safety
///
/// `capsule` must be the pointer produced by the runtime's capsule symbol
/// for the ABI version this library was built against.
#[no_mangle]
pub unsafe extern "C" fn tether_module_init(capsule: *const RawCapsule) -> *const ModuleDef {
    let table = match EntryPointTable::from_capsule(capsule) {
        Ok(table) => table,
        Err(_) => return ptr::null(),
    };
    match table::install_global(table) {
        Ok(_) => &MODULE,
        Err(crate::error::InitError::AlreadyInitialized) => &MODULE,
        Err(_) => ptr::null(),
    }
}
