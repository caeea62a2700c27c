//! In-process mock of the foreign runtime
//!
//! A complete C-ABI capsule backed by thread-local state: reference-counted
//! heap objects (dates, times, ints, lists), a reentrant per-thread
//! execution context, a pending-error slot, and counters for every boundary
//! crossing. Each test thread gets an isolated runtime.
//!
//! Entry points assert the execution context is held, so any binding-layer
//! path that calls without the capability fails the test immediately.
//!
//! Counter discipline: `release_calls` counts invocations of the release
//! entry point (the native side of the boundary); references the runtime
//! drops internally (list teardown, slot replacement) do not count.

#![allow(dead_code)]

use std::cell::RefCell;
use std::ffi::{c_void, CStr, CString};
use std::mem::size_of;
use std::os::raw::{c_char, c_int, c_long};
use tether_runtime::abi::capsule::{RawCapsule, CAPSULE_ABI_VERSION};
use tether_runtime::abi::layout::{RawDate, RawObject, RawTime};
use tether_runtime::table::EntryPointTable;

/// Boundary counters for one test thread.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    pub context_depth: usize,
    pub context_acquires: u64,
    pub context_releases: u64,
    pub retain_calls: u64,
    pub release_calls: u64,
    pub allocations: u64,
    pub destroyed: u64,
    pub live_objects: i64,
}

#[derive(Default)]
struct MockState {
    stats: Stats,
    error: Option<CString>,
    /// Number of object-producing calls to allow before injecting a failure
    fail_countdown: Option<u32>,
}

thread_local! {
    static STATE: RefCell<MockState> = RefCell::new(MockState::default());
}

fn with_state<R>(f: impl FnOnce(&mut MockState) -> R) -> R {
    STATE.with(|s| f(&mut s.borrow_mut()))
}

/// Reset this thread's runtime to a pristine state.
pub fn reset() {
    with_state(|s| *s = MockState::default());
}

/// Snapshot this thread's boundary counters.
pub fn stats() -> Stats {
    with_state(|s| s.stats.clone())
}

/// The pending error message, if any.
pub fn pending_error() -> Option<String> {
    with_state(|s| {
        s.error
            .as_ref()
            .map(|e| e.to_string_lossy().into_owned())
    })
}

/// Make the next object-producing entry point fail with a pending error.
pub fn fail_next_object_call() {
    with_state(|s| s.fail_countdown = Some(0));
}

/// Let `n` object-producing entry points succeed, then fail the next one.
pub fn fail_object_call_after(n: u32) {
    with_state(|s| s.fail_countdown = Some(n));
}

// ===== Type tags =====

static DATE_TAG: u8 = 0;
static TIME_TAG: u8 = 0;
static INT_TAG: u8 = 0;
static LIST_TAG: u8 = 0;

fn date_tag() -> *const c_void {
    &DATE_TAG as *const u8 as *const c_void
}
fn time_tag() -> *const c_void {
    &TIME_TAG as *const u8 as *const c_void
}
fn int_tag() -> *const c_void {
    &INT_TAG as *const u8 as *const c_void
}
fn list_tag() -> *const c_void {
    &LIST_TAG as *const u8 as *const c_void
}

// ===== Object bodies =====

#[repr(C)]
struct MockInt {
    base: RawObject,
    value: c_long,
}

#[repr(C)]
struct MockList {
    base: RawObject,
    items: Vec<*mut RawObject>,
}

fn assert_context() {
    let depth = with_state(|s| s.stats.context_depth);
    assert!(depth > 0, "entry point called without the execution context");
}

fn set_error(msg: &str) {
    with_state(|s| s.error = Some(CString::new(msg).expect("mock error message")));
}

fn track_allocation() {
    with_state(|s| {
        s.stats.allocations += 1;
        s.stats.live_objects += 1;
    });
}

fn take_fail_flag() -> bool {
    with_state(|s| match s.fail_countdown {
        Some(0) => {
            s.fail_countdown = None;
            true
        }
        Some(ref mut n) => {
            *n -= 1;
            false
        }
        None => false,
    })
}

fn header(tag: *const c_void) -> RawObject {
    RawObject {
        refcount: 1,
        type_tag: tag,
    }
}

fn alloc_date(year: i32, month: u8, day: u8) -> *mut RawObject {
    track_allocation();
    let payload = [(year >> 8) as u8, (year & 0xff) as u8, month, day];
    Box::into_raw(Box::new(RawDate {
        base: header(date_tag()),
        hashcode: -1,
        payload,
    })) as *mut RawObject
}

fn alloc_time(hour: u8, minute: u8, second: u8, microsecond: u32) -> *mut RawObject {
    track_allocation();
    let payload = [
        hour,
        minute,
        second,
        (microsecond >> 16) as u8,
        (microsecond >> 8) as u8,
        (microsecond & 0xff) as u8,
    ];
    Box::into_raw(Box::new(RawTime {
        base: header(time_tag()),
        hashcode: -1,
        payload,
    })) as *mut RawObject
}

fn alloc_int(value: c_long) -> *mut RawObject {
    track_allocation();
    Box::into_raw(Box::new(MockInt {
        base: header(int_tag()),
        value,
    })) as *mut RawObject
}

fn alloc_list(len: usize) -> *mut RawObject {
    track_allocation();
    Box::into_raw(Box::new(MockList {
        base: header(list_tag()),
        items: vec![std::ptr::null_mut(); len],
    })) as *mut RawObject
}

/// Drop one strong reference without counting it as a boundary release.
unsafe fn release_ref(ptr: *mut RawObject) {
    if ptr.is_null() {
        return;
    }
    (*ptr).refcount -= 1;
    assert!((*ptr).refcount >= 0, "refcount underflow");
    if (*ptr).refcount == 0 {
        destroy(ptr);
    }
}

unsafe fn destroy(ptr: *mut RawObject) {
    with_state(|s| {
        s.stats.destroyed += 1;
        s.stats.live_objects -= 1;
    });
    let tag = (*ptr).type_tag;
    if tag == list_tag() {
        let list = Box::from_raw(ptr as *mut MockList);
        for item in &list.items {
            release_ref(*item);
        }
    } else if tag == date_tag() {
        drop(Box::from_raw(ptr as *mut RawDate));
    } else if tag == time_tag() {
        drop(Box::from_raw(ptr as *mut RawTime));
    } else if tag == int_tag() {
        drop(Box::from_raw(ptr as *mut MockInt));
    } else {
        panic!("destroying object with unknown type tag");
    }
}

// ===== Entry points =====

unsafe extern "C" fn mock_context_acquire() {
    with_state(|s| {
        s.stats.context_depth += 1;
        s.stats.context_acquires += 1;
    });
}

unsafe extern "C" fn mock_context_release() {
    with_state(|s| {
        assert!(s.stats.context_depth > 0, "context released more than acquired");
        s.stats.context_depth -= 1;
        s.stats.context_releases += 1;
    });
}

unsafe extern "C" fn mock_retain(ptr: *mut RawObject) {
    assert_context();
    with_state(|s| s.stats.retain_calls += 1);
    assert!(!ptr.is_null(), "retain of null object");
    (*ptr).refcount += 1;
}

unsafe extern "C" fn mock_release(ptr: *mut RawObject) {
    assert_context();
    with_state(|s| s.stats.release_calls += 1);
    release_ref(ptr);
}

unsafe extern "C" fn mock_err_occurred() -> c_int {
    with_state(|s| s.error.is_some()) as c_int
}

unsafe extern "C" fn mock_err_clear() {
    with_state(|s| s.error = None);
}

unsafe extern "C" fn mock_err_set(msg: *const c_char) {
    assert!(!msg.is_null(), "err_set with null message");
    let owned = CStr::from_ptr(msg).to_owned();
    with_state(|s| s.error = Some(owned));
}

unsafe extern "C" fn mock_date_check(ptr: *mut RawObject) -> c_int {
    (!ptr.is_null() && (*ptr).type_tag == date_tag()) as c_int
}

unsafe extern "C" fn mock_time_check(ptr: *mut RawObject) -> c_int {
    (!ptr.is_null() && (*ptr).type_tag == time_tag()) as c_int
}

unsafe extern "C" fn mock_int_check(ptr: *mut RawObject) -> c_int {
    (!ptr.is_null() && (*ptr).type_tag == int_tag()) as c_int
}

unsafe extern "C" fn mock_list_check(ptr: *mut RawObject) -> c_int {
    (!ptr.is_null() && (*ptr).type_tag == list_tag()) as c_int
}

unsafe extern "C" fn mock_date_new(year: c_int, month: c_int, day: c_int) -> *mut RawObject {
    assert_context();
    if take_fail_flag() {
        set_error("injected failure: date_new");
        return std::ptr::null_mut();
    }
    let valid = (1..=9999).contains(&year)
        && (1..=12).contains(&month)
        && day >= 1
        && chrono::NaiveDate::from_ymd_opt(year, month as u32, day as u32).is_some();
    if !valid {
        set_error("date fields out of range");
        return std::ptr::null_mut();
    }
    alloc_date(year, month as u8, day as u8)
}

unsafe extern "C" fn mock_time_new(
    hour: c_int,
    minute: c_int,
    second: c_int,
    microsecond: c_int,
) -> *mut RawObject {
    assert_context();
    if take_fail_flag() {
        set_error("injected failure: time_new");
        return std::ptr::null_mut();
    }
    let valid = (0..=23).contains(&hour)
        && (0..=59).contains(&minute)
        && (0..=59).contains(&second)
        && (0..=999_999).contains(&microsecond);
    if !valid {
        set_error("time fields out of range");
        return std::ptr::null_mut();
    }
    alloc_time(hour as u8, minute as u8, second as u8, microsecond as u32)
}

unsafe extern "C" fn mock_int_from_long(value: c_long) -> *mut RawObject {
    assert_context();
    if take_fail_flag() {
        set_error("injected failure: int_from_long");
        return std::ptr::null_mut();
    }
    alloc_int(value)
}

unsafe extern "C" fn mock_date_year(ptr: *mut RawObject) -> c_int {
    assert_context();
    if mock_date_check(ptr) == 0 {
        set_error("date accessor on non-date");
        return -1;
    }
    let date = &*(ptr as *const RawDate);
    (c_int::from(date.payload[0]) << 8) | c_int::from(date.payload[1])
}

unsafe extern "C" fn mock_date_month(ptr: *mut RawObject) -> c_int {
    assert_context();
    if mock_date_check(ptr) == 0 {
        set_error("date accessor on non-date");
        return -1;
    }
    c_int::from((*(ptr as *const RawDate)).payload[2])
}

unsafe extern "C" fn mock_date_day(ptr: *mut RawObject) -> c_int {
    assert_context();
    if mock_date_check(ptr) == 0 {
        set_error("date accessor on non-date");
        return -1;
    }
    c_int::from((*(ptr as *const RawDate)).payload[3])
}

unsafe extern "C" fn mock_time_hour(ptr: *mut RawObject) -> c_int {
    assert_context();
    if mock_time_check(ptr) == 0 {
        set_error("time accessor on non-time");
        return -1;
    }
    c_int::from((*(ptr as *const RawTime)).payload[0])
}

unsafe extern "C" fn mock_time_minute(ptr: *mut RawObject) -> c_int {
    assert_context();
    if mock_time_check(ptr) == 0 {
        set_error("time accessor on non-time");
        return -1;
    }
    c_int::from((*(ptr as *const RawTime)).payload[1])
}

unsafe extern "C" fn mock_time_second(ptr: *mut RawObject) -> c_int {
    assert_context();
    if mock_time_check(ptr) == 0 {
        set_error("time accessor on non-time");
        return -1;
    }
    c_int::from((*(ptr as *const RawTime)).payload[2])
}

unsafe extern "C" fn mock_time_microsecond(ptr: *mut RawObject) -> c_int {
    assert_context();
    if mock_time_check(ptr) == 0 {
        set_error("time accessor on non-time");
        return -1;
    }
    let time = &*(ptr as *const RawTime);
    (c_int::from(time.payload[3]) << 16)
        | (c_int::from(time.payload[4]) << 8)
        | c_int::from(time.payload[5])
}

unsafe extern "C" fn mock_int_as_long(ptr: *mut RawObject) -> c_long {
    assert_context();
    if mock_int_check(ptr) == 0 {
        set_error("int accessor on non-int");
        return -1;
    }
    (*(ptr as *const MockInt)).value
}

unsafe extern "C" fn mock_list_new(len: isize) -> *mut RawObject {
    assert_context();
    if take_fail_flag() {
        set_error("injected failure: list_new");
        return std::ptr::null_mut();
    }
    if len < 0 {
        set_error("negative list length");
        return std::ptr::null_mut();
    }
    alloc_list(len as usize)
}

unsafe extern "C" fn mock_list_set_item(
    list: *mut RawObject,
    index: isize,
    item: *mut RawObject,
) -> c_int {
    assert_context();
    if mock_list_check(list) == 0 {
        set_error("list_set_item on non-list");
        return -1;
    }
    let list = &mut *(list as *mut MockList);
    if index < 0 || index as usize >= list.items.len() {
        set_error("list index out of range");
        return -1;
    }
    // Steals the item reference; a replaced slot drops its old reference.
    let old = std::mem::replace(&mut list.items[index as usize], item);
    release_ref(old);
    0
}

unsafe extern "C" fn mock_seq_len(ptr: *mut RawObject) -> isize {
    assert_context();
    if mock_list_check(ptr) == 0 {
        set_error("seq_len on non-sequence");
        return -1;
    }
    (*(ptr as *const MockList)).items.len() as isize
}

unsafe extern "C" fn mock_seq_get_item(ptr: *mut RawObject, index: isize) -> *mut RawObject {
    assert_context();
    if mock_list_check(ptr) == 0 {
        set_error("seq_get_item on non-sequence");
        return std::ptr::null_mut();
    }
    let list = &*(ptr as *const MockList);
    if index < 0 || index as usize >= list.items.len() {
        set_error("sequence index out of range");
        return std::ptr::null_mut();
    }
    let item = list.items[index as usize];
    if item.is_null() {
        set_error("sequence slot is empty");
        return std::ptr::null_mut();
    }
    // New reference
    (*item).refcount += 1;
    item
}

// ===== Capsule and test helpers =====

/// A well-formed v1 capsule over this thread's mock runtime.
pub fn mock_capsule() -> RawCapsule {
    RawCapsule {
        abi_version: CAPSULE_ABI_VERSION,
        sizeof_object: size_of::<RawObject>() as u32,
        sizeof_date: size_of::<RawDate>() as u32,
        sizeof_time: size_of::<RawTime>() as u32,
        context_acquire: Some(mock_context_acquire),
        context_release: Some(mock_context_release),
        retain: Some(mock_retain),
        release: Some(mock_release),
        err_occurred: Some(mock_err_occurred),
        err_clear: Some(mock_err_clear),
        err_set: Some(mock_err_set),
        date_check: Some(mock_date_check),
        time_check: Some(mock_time_check),
        int_check: Some(mock_int_check),
        list_check: Some(mock_list_check),
        date_new: Some(mock_date_new),
        time_new: Some(mock_time_new),
        int_from_long: Some(mock_int_from_long),
        date_year: Some(mock_date_year),
        date_month: Some(mock_date_month),
        date_day: Some(mock_date_day),
        time_hour: Some(mock_time_hour),
        time_minute: Some(mock_time_minute),
        time_second: Some(mock_time_second),
        time_microsecond: Some(mock_time_microsecond),
        int_as_long: Some(mock_int_as_long),
        list_new: Some(mock_list_new),
        list_set_item: Some(mock_list_set_item),
        seq_len: Some(mock_seq_len),
        seq_get_item: Some(mock_seq_get_item),
    }
}

/// A validated table over this thread's mock runtime.
pub fn new_table() -> EntryPointTable {
    let capsule = mock_capsule();
    EntryPointTable::from_capsule(&capsule).expect("mock capsule must validate")
}

/// Build a foreign int directly, bypassing the binding layer.
/// The caller owns the returned reference.
pub fn int_object(value: i64) -> *mut RawObject {
    alloc_int(value as c_long)
}

/// Build a foreign date directly, bypassing the binding layer.
pub fn date_object(year: i32, month: u8, day: u8) -> *mut RawObject {
    alloc_date(year, month, day)
}

/// Build a foreign list directly, stealing the item references.
pub fn list_object(items: Vec<*mut RawObject>) -> *mut RawObject {
    track_allocation();
    Box::into_raw(Box::new(MockList {
        base: header(list_tag()),
        items,
    })) as *mut RawObject
}

/// Drop a strong reference held by test code.
pub fn drop_object(ptr: *mut RawObject) {
    unsafe { release_ref(ptr) };
}

/// Read a foreign list of ints back into native values.
pub fn read_int_list(ptr: *mut RawObject) -> Vec<i64> {
    unsafe {
        assert!(!ptr.is_null(), "reading a null list");
        assert_eq!((*ptr).type_tag, list_tag(), "reading a non-list");
        let list = &*(ptr as *const MockList);
        list.items
            .iter()
            .map(|item| {
                assert!(!item.is_null(), "list slot is empty");
                assert_eq!((*(*item)).type_tag, int_tag(), "list item is not an int");
                (*((*item) as *const MockInt)).value as i64
            })
            .collect()
    }
}

/// The current reference count of an object.
pub fn refcount_of(ptr: *mut RawObject) -> isize {
    unsafe { (*ptr).refcount }
}
