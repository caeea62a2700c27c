//! Raw ABI surface of the foreign runtime
//!
//! Everything in this module mirrors what the foreign runtime publishes in
//! its C headers:
//! - `layout`: object header structs and layout descriptors, verified against
//!   the published layout at initialization
//! - `capsule`: the versioned table of C function pointers the runtime
//!   exports as its API
//!
//! Nothing here performs reference counting or error translation; the safe
//! wrappers live a level up (`table`, `handle`, `object`).

pub mod capsule;
pub mod layout;

pub use capsule::{RawCapsule, CAPSULE_ABI_VERSION, CAPSULE_SYMBOL};
pub use layout::{FieldLayout, LayoutMismatch, RawDate, RawObject, RawTime, StructLayout};
