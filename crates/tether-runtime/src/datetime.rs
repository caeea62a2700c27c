//! Safe constructors for the foreign runtime's date and time objects
//!
//! One function per foreign entry point. Arguments are range-checked
//! natively before the call (a pre-check that saves the foreign error round
//! trip; the runtime's own validation stays authoritative) and widened to
//! the exact C argument widths the entry points declare.

use crate::error::{BindError, MarshalError, RangeError};
use crate::handle::RuntimeHandle;
use crate::object::ForeignObject;
use crate::table::EntryPointTable;
use chrono::NaiveDate;
use std::os::raw::c_int;

/// Calendar range supported by the foreign runtime's date type.
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

/// A foreign date object.
#[derive(Clone)]
pub struct Date<'rt>(ForeignObject<'rt>);

/// A foreign time object.
#[derive(Clone)]
pub struct Time<'rt>(ForeignObject<'rt>);

fn days_in_month(year: i32, month: u8) -> i64 {
    let month = u32::from(month);
    // Both constructions succeed for any pre-validated year/month pair.
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (first, next) {
        (Some(first), Some(next)) => (next - first).num_days(),
        _ => 31,
    }
}

fn check_date_fields(year: i32, month: u8, day: u8) -> Result<(), RangeError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(RangeError {
            field: "year",
            value: i64::from(year),
            min: i64::from(MIN_YEAR),
            max: i64::from(MAX_YEAR),
        });
    }
    if !(1..=12).contains(&month) {
        return Err(RangeError {
            field: "month",
            value: i64::from(month),
            min: 1,
            max: 12,
        });
    }
    let max_day = days_in_month(year, month);
    if i64::from(day) < 1 || i64::from(day) > max_day {
        return Err(RangeError {
            field: "day",
            value: i64::from(day),
            min: 1,
            max: max_day,
        });
    }
    Ok(())
}

fn check_time_fields(hour: u8, minute: u8, second: u8, microsecond: u32) -> Result<(), RangeError> {
    let check = |field: &'static str, value: i64, max: i64| -> Result<(), RangeError> {
        if value > max {
            return Err(RangeError {
                field,
                value,
                min: 0,
                max,
            });
        }
        Ok(())
    };
    check("hour", i64::from(hour), 23)?;
    check("minute", i64::from(minute), 59)?;
    check("second", i64::from(second), 59)?;
    check("microsecond", i64::from(microsecond), 999_999)?;
    Ok(())
}

impl<'rt> Date<'rt> {
    /// Construct a foreign date from native year/month/day.
    ///
    /// Pre-validates against the calendar's own validity rule, widens the
    /// narrow native fields to the `c_int` arguments the entry point
    /// declares, and claims the returned reference through checked
    /// construction.
    pub fn new(
        table: &'rt EntryPointTable,
        handle: RuntimeHandle<'_>,
        year: i32,
        month: u8,
        day: u8,
    ) -> Result<Self, BindError> {
        check_date_fields(year, month, day)?;
        let ptr = unsafe {
            (table.entry_points().date_new)(
                year as c_int,
                c_int::from(month),
                c_int::from(day),
            )
        };
        let obj = ForeignObject::from_raw_checked(table, handle, ptr)?;
        Ok(Date(obj))
    }

    /// Downcast a foreign object to a date, consulting the runtime's own
    /// type predicate. The object is consumed; on mismatch it is released.
    pub fn downcast(
        handle: RuntimeHandle<'_>,
        obj: ForeignObject<'rt>,
    ) -> Result<Self, BindError> {
        if !obj.is_date(handle) {
            return Err(MarshalError::TypeMismatch { expected: "date" }.into());
        }
        Ok(Date(obj))
    }

    pub fn year(&self, _handle: RuntimeHandle<'_>) -> i32 {
        unsafe { (self.0.table().entry_points().date_year)(self.0.as_ptr()) }
    }

    pub fn month(&self, _handle: RuntimeHandle<'_>) -> u8 {
        unsafe { (self.0.table().entry_points().date_month)(self.0.as_ptr()) as u8 }
    }

    pub fn day(&self, _handle: RuntimeHandle<'_>) -> u8 {
        unsafe { (self.0.table().entry_points().date_day)(self.0.as_ptr()) as u8 }
    }

    /// View as the untyped object wrapper.
    pub fn as_object(&self) -> &ForeignObject<'rt> {
        &self.0
    }

    /// Unwrap into the untyped object wrapper.
    pub fn into_object(self) -> ForeignObject<'rt> {
        self.0
    }
}

impl<'rt> Time<'rt> {
    /// Construct a foreign time from native clock fields.
    pub fn new(
        table: &'rt EntryPointTable,
        handle: RuntimeHandle<'_>,
        hour: u8,
        minute: u8,
        second: u8,
        microsecond: u32,
    ) -> Result<Self, BindError> {
        check_time_fields(hour, minute, second, microsecond)?;
        let ptr = unsafe {
            (table.entry_points().time_new)(
                c_int::from(hour),
                c_int::from(minute),
                c_int::from(second),
                microsecond as c_int,
            )
        };
        let obj = ForeignObject::from_raw_checked(table, handle, ptr)?;
        Ok(Time(obj))
    }

    /// Downcast a foreign object to a time via the runtime's predicate.
    pub fn downcast(
        handle: RuntimeHandle<'_>,
        obj: ForeignObject<'rt>,
    ) -> Result<Self, BindError> {
        if !obj.is_time(handle) {
            return Err(MarshalError::TypeMismatch { expected: "time" }.into());
        }
        Ok(Time(obj))
    }

    pub fn hour(&self, _handle: RuntimeHandle<'_>) -> u8 {
        unsafe { (self.0.table().entry_points().time_hour)(self.0.as_ptr()) as u8 }
    }

    pub fn minute(&self, _handle: RuntimeHandle<'_>) -> u8 {
        unsafe { (self.0.table().entry_points().time_minute)(self.0.as_ptr()) as u8 }
    }

    pub fn second(&self, _handle: RuntimeHandle<'_>) -> u8 {
        unsafe { (self.0.table().entry_points().time_second)(self.0.as_ptr()) as u8 }
    }

    pub fn microsecond(&self, _handle: RuntimeHandle<'_>) -> u32 {
        unsafe { (self.0.table().entry_points().time_microsecond)(self.0.as_ptr()) as u32 }
    }

    pub fn as_object(&self) -> &ForeignObject<'rt> {
        &self.0
    }

    pub fn into_object(self) -> ForeignObject<'rt> {
        self.0
    }
}
