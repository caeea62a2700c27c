//! Tether Runtime - memory-safe binding layer over a C-ABI interpreter runtime
//!
//! The foreign runtime owns a reference-counted object graph and exposes its
//! API as a versioned capsule of C function pointers, guarded by a global,
//! per-thread-reentrant execution context. This crate turns that surface
//! into checked Rust:
//! - `abi`: raw structs and the capsule, layout-verified at initialization
//! - `table`: the validated, immutable, process-wide entry-point table
//! - `handle`: the scoped capability token gating every raw call
//! - `object`: owned foreign objects with release-on-drop and explicit
//!   ownership hand-off
//! - `datetime`, `marshal`: per-entry-point safe constructors and
//!   conversions
//! - `expose`: native functions made callable by the embedding runtime
//!
//! # Safety
//!
//! All unsafe code is isolated behind these wrappers. Each foreign entry
//! point gets one hand-written, audited mapping; nothing is generated or
//! inferred from the foreign side at runtime.
//!
//! # Example
//!
//! ```no_run
//! use tether_runtime::datetime::Date;
//! use tether_runtime::table;
//!
//! let table = table::global().expect("runtime not bound");
//! let date = table.with_runtime(|handle| Date::new(table, handle, 2024, 2, 29))?;
//! table.with_runtime(|handle| {
//!     assert_eq!(date.year(handle), 2024);
//! });
//! # Ok::<(), tether_runtime::error::BindError>(())
//! ```

/// Tether runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod abi;
pub mod audit;
pub mod datetime;
pub mod error;
pub mod expose;
pub mod handle;
pub mod loader;
pub mod marshal;
pub mod object;
pub mod pascal;
pub mod table;

// Re-export commonly used types
pub use abi::capsule::{RawCapsule, CAPSULE_ABI_VERSION, CAPSULE_SYMBOL};
pub use abi::layout::{LayoutMismatch, RawObject};
pub use audit::{AuditEvent, AuditLogger, MemoryAuditLogger, NullAuditLogger};
pub use datetime::{Date, Time};
pub use error::{BindError, ForeignError, InitError, MarshalError, RangeError};
pub use expose::{tether_module_init, ModuleDef, RawExtensionFn};
pub use handle::RuntimeHandle;
pub use loader::{LoadError, RuntimeLoader};
pub use object::ForeignObject;
pub use pascal::pascal_row;
pub use table::EntryPointTable;
