//! Layout descriptors for the foreign runtime's object structs
//!
//! The foreign ABI documents its object layouts in words: every header field
//! is word-sized, payloads are fixed byte arrays, structs are word-aligned.
//! The `#[repr(C)]` structs below are the native renditions; `verify_layout`
//! proves, field by field, that the native layout and the published layout
//! agree. Any disagreement is undefined behavior at the boundary, so a
//! mismatch must abort initialization rather than run.
//!
//! Payload bytes are opaque to native code. Only the foreign accessor entry
//! points may interpret them.

use std::ffi::c_void;
use std::mem::{align_of, offset_of, size_of};
use thiserror::Error;

/// Packed date payload width (year:2, month:1, day:1)
pub const DATE_PAYLOAD_LEN: usize = 4;

/// Packed time payload width (hour:1, minute:1, second:1, microsecond:3)
pub const TIME_PAYLOAD_LEN: usize = 6;

/// Common object header: reference count plus type tag.
///
/// The refcount is manipulated only through the capsule's retain/release
/// entry points; the type tag only through its type-check predicates.
#[repr(C)]
pub struct RawObject {
    pub refcount: isize,
    pub type_tag: *const c_void,
}

/// Date object: header, cached hash, packed calendar payload.
#[repr(C)]
pub struct RawDate {
    pub base: RawObject,
    pub hashcode: isize,
    pub payload: [u8; DATE_PAYLOAD_LEN],
}

/// Time object: header, cached hash, packed clock payload.
#[repr(C)]
pub struct RawTime {
    pub base: RawObject,
    pub hashcode: isize,
    pub payload: [u8; TIME_PAYLOAD_LEN],
}

/// One field of a described struct layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: &'static str,
    pub offset: usize,
    pub size: usize,
}

/// Described layout of one ABI struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructLayout {
    pub name: &'static str,
    pub size: usize,
    pub align: usize,
    pub fields: &'static [FieldLayout],
}

/// Layout disagreement between the native structs and the published ABI.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutMismatch {
    #[error("{name}: native size {native} does not match published size {published}")]
    Size {
        name: &'static str,
        native: usize,
        published: usize,
    },

    #[error("{name}: native alignment {native} does not match published alignment {published}")]
    Align {
        name: &'static str,
        native: usize,
        published: usize,
    },

    #[error("{name}: native field count {native} does not match published field count {published}")]
    FieldCount {
        name: &'static str,
        native: usize,
        published: usize,
    },

    #[error("{name}.{field}: native offset {native} does not match published offset {published}")]
    FieldOffset {
        name: &'static str,
        field: &'static str,
        native: usize,
        published: usize,
    },

    #[error("{name}.{field}: native size {native} does not match published size {published}")]
    FieldSize {
        name: &'static str,
        field: &'static str,
        native: usize,
        published: usize,
    },

    #[error("{name}: native field '{native}' where published layout has '{published}'")]
    FieldName {
        name: &'static str,
        native: &'static str,
        published: &'static str,
    },
}

const WORD: usize = size_of::<usize>();

const fn align_up(n: usize, align: usize) -> usize {
    (n + align - 1) / align * align
}

/// Native layout of [`RawObject`], as compiled.
pub const OBJECT_LAYOUT: StructLayout = StructLayout {
    name: "RawObject",
    size: size_of::<RawObject>(),
    align: align_of::<RawObject>(),
    fields: &[
        FieldLayout {
            name: "refcount",
            offset: offset_of!(RawObject, refcount),
            size: size_of::<isize>(),
        },
        FieldLayout {
            name: "type_tag",
            offset: offset_of!(RawObject, type_tag),
            size: size_of::<*const c_void>(),
        },
    ],
};

/// Native layout of [`RawDate`], as compiled.
pub const DATE_LAYOUT: StructLayout = StructLayout {
    name: "RawDate",
    size: size_of::<RawDate>(),
    align: align_of::<RawDate>(),
    fields: &[
        FieldLayout {
            name: "base",
            offset: offset_of!(RawDate, base),
            size: size_of::<RawObject>(),
        },
        FieldLayout {
            name: "hashcode",
            offset: offset_of!(RawDate, hashcode),
            size: size_of::<isize>(),
        },
        FieldLayout {
            name: "payload",
            offset: offset_of!(RawDate, payload),
            size: DATE_PAYLOAD_LEN,
        },
    ],
};

/// Native layout of [`RawTime`], as compiled.
pub const TIME_LAYOUT: StructLayout = StructLayout {
    name: "RawTime",
    size: size_of::<RawTime>(),
    align: align_of::<RawTime>(),
    fields: &[
        FieldLayout {
            name: "base",
            offset: offset_of!(RawTime, base),
            size: size_of::<RawObject>(),
        },
        FieldLayout {
            name: "hashcode",
            offset: offset_of!(RawTime, hashcode),
            size: size_of::<isize>(),
        },
        FieldLayout {
            name: "payload",
            offset: offset_of!(RawTime, payload),
            size: TIME_PAYLOAD_LEN,
        },
    ],
};

/// Layout of the object header as published by the v1 ABI documentation:
/// two word-sized fields, word alignment.
pub const PUBLISHED_OBJECT_LAYOUT: StructLayout = StructLayout {
    name: "RawObject",
    size: 2 * WORD,
    align: WORD,
    fields: &[
        FieldLayout {
            name: "refcount",
            offset: 0,
            size: WORD,
        },
        FieldLayout {
            name: "type_tag",
            offset: WORD,
            size: WORD,
        },
    ],
};

/// Date layout as published: header, word-sized hash, 4-byte payload,
/// tail-padded to word alignment.
pub const PUBLISHED_DATE_LAYOUT: StructLayout = StructLayout {
    name: "RawDate",
    size: align_up(3 * WORD + DATE_PAYLOAD_LEN, WORD),
    align: WORD,
    fields: &[
        FieldLayout {
            name: "base",
            offset: 0,
            size: 2 * WORD,
        },
        FieldLayout {
            name: "hashcode",
            offset: 2 * WORD,
            size: WORD,
        },
        FieldLayout {
            name: "payload",
            offset: 3 * WORD,
            size: DATE_PAYLOAD_LEN,
        },
    ],
};

/// Time layout as published: header, word-sized hash, 6-byte payload,
/// tail-padded to word alignment.
pub const PUBLISHED_TIME_LAYOUT: StructLayout = StructLayout {
    name: "RawTime",
    size: align_up(3 * WORD + TIME_PAYLOAD_LEN, WORD),
    align: WORD,
    fields: &[
        FieldLayout {
            name: "base",
            offset: 0,
            size: 2 * WORD,
        },
        FieldLayout {
            name: "hashcode",
            offset: 2 * WORD,
            size: WORD,
        },
        FieldLayout {
            name: "payload",
            offset: 3 * WORD,
            size: TIME_PAYLOAD_LEN,
        },
    ],
};

/// Compare a native struct layout against its published counterpart.
///
/// Checks total size, alignment, field count, then every field's name,
/// offset, and size in order. The first disagreement is returned.
pub fn verify_layout(
    native: &StructLayout,
    published: &StructLayout,
) -> Result<(), LayoutMismatch> {
    if native.size != published.size {
        return Err(LayoutMismatch::Size {
            name: native.name,
            native: native.size,
            published: published.size,
        });
    }
    if native.align != published.align {
        return Err(LayoutMismatch::Align {
            name: native.name,
            native: native.align,
            published: published.align,
        });
    }
    if native.fields.len() != published.fields.len() {
        return Err(LayoutMismatch::FieldCount {
            name: native.name,
            native: native.fields.len(),
            published: published.fields.len(),
        });
    }
    for (n, p) in native.fields.iter().zip(published.fields.iter()) {
        if n.name != p.name {
            return Err(LayoutMismatch::FieldName {
                name: native.name,
                native: n.name,
                published: p.name,
            });
        }
        if n.offset != p.offset {
            return Err(LayoutMismatch::FieldOffset {
                name: native.name,
                field: n.name,
                native: n.offset,
                published: p.offset,
            });
        }
        if n.size != p.size {
            return Err(LayoutMismatch::FieldSize {
                name: native.name,
                field: n.name,
                native: n.size,
                published: p.size,
            });
        }
    }
    Ok(())
}

/// Verify every native struct against the published v1 layouts.
pub fn verify_abi() -> Result<(), LayoutMismatch> {
    verify_layout(&OBJECT_LAYOUT, &PUBLISHED_OBJECT_LAYOUT)?;
    verify_layout(&DATE_LAYOUT, &PUBLISHED_DATE_LAYOUT)?;
    verify_layout(&TIME_LAYOUT, &PUBLISHED_TIME_LAYOUT)?;
    Ok(())
}
