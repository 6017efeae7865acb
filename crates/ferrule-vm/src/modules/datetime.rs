//! The `datetime` module: calendar timestamps and durations.
//!
//! Two instantiable types backed by chrono:
//! - `datetime(year, month, day[, hour, minute, second])` with
//!   `isoformat()` and `strftime(fmt)`
//! - `timedelta(...)` built from keyword components, normalized so that
//!   `0 <= seconds < 86400` with the sign carried by `days`

use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::call::CallArgs;
use crate::error::VmError;
use crate::object::{
    alloc, alloc_float, alloc_str, int_value, module_new, module_set, type_name, MethodDef,
    ObjPtr, Payload, TimeDeltaData, TypeDef,
};

pub(crate) static DATETIME_TYPE: TypeDef = TypeDef {
    name: "datetime",
    construct: datetime_new,
    methods: &[
        MethodDef {
            name: "isoformat",
            func: datetime_isoformat,
        },
        MethodDef {
            name: "strftime",
            func: datetime_strftime,
        },
    ],
};

pub(crate) static TIMEDELTA_TYPE: TypeDef = TypeDef {
    name: "timedelta",
    construct: timedelta_new,
    methods: &[MethodDef {
        name: "total_seconds",
        func: timedelta_total_seconds,
    }],
};

pub(crate) fn build() -> ObjPtr {
    let module = module_new("datetime");
    unsafe {
        module_set(module, "datetime", alloc(Payload::Type(&DATETIME_TYPE)));
        module_set(module, "timedelta", alloc(Payload::Type(&TIMEDELTA_TYPE)));
    }
    module
}

fn int_arg(who: &str, name: &str, value: ObjPtr) -> Result<i64, VmError> {
    unsafe { int_value(value) }.ok_or_else(|| {
        VmError::type_error(format!(
            "{who}() component '{name}' must be an integer, got {}",
            unsafe { type_name(value) }
        ))
    })
}

/// `datetime(year, month, day[, hour, minute, second])`, components also
/// accepted by keyword. A component given both ways is an error.
fn datetime_new(args: &CallArgs<'_>) -> Result<ObjPtr, VmError> {
    const NAMES: [&str; 6] = ["year", "month", "day", "hour", "minute", "second"];
    let mut slots: [Option<i64>; 6] = [None; 6];

    if args.positional.len() > NAMES.len() {
        return Err(VmError::type_error(format!(
            "datetime() takes at most {} arguments ({} given)",
            NAMES.len(),
            args.positional.len()
        )));
    }
    for (i, value) in args.positional.iter().enumerate() {
        slots[i] = Some(int_arg("datetime", NAMES[i], *value)?);
    }
    for (key, value) in args.keywords {
        let Some(i) = NAMES.iter().position(|n| n == key) else {
            return Err(VmError::type_error(format!(
                "datetime() got an unexpected keyword argument '{key}'"
            )));
        };
        if slots[i].is_some() {
            return Err(VmError::type_error(format!(
                "datetime() got multiple values for argument '{key}'"
            )));
        }
        slots[i] = Some(int_arg("datetime", key, *value)?);
    }

    let [year, month, day, hour, minute, second] = slots;
    let (Some(year), Some(month), Some(day)) = (year, month, day) else {
        return Err(VmError::type_error(
            "datetime() requires year, month and day",
        ));
    };
    let hour = hour.unwrap_or(0);
    let minute = minute.unwrap_or(0);
    let second = second.unwrap_or(0);

    if !(1..=12).contains(&month) {
        return Err(VmError::value(format!("month must be in 1..12, got {month}")));
    }
    if !(1..=31).contains(&day) {
        return Err(VmError::value(format!("day must be in 1..31, got {day}")));
    }
    if !(0..=23).contains(&hour) {
        return Err(VmError::value(format!("hour must be in 0..23, got {hour}")));
    }
    if !(0..=59).contains(&minute) {
        return Err(VmError::value(format!(
            "minute must be in 0..59, got {minute}"
        )));
    }
    if !(0..=59).contains(&second) {
        return Err(VmError::value(format!(
            "second must be in 0..59, got {second}"
        )));
    }

    // The year must fit the calendar type exactly; a wrapping cast would
    // turn an out-of-range value into a plausible date.
    let year = i32::try_from(year)
        .map_err(|_| VmError::value(format!("year {year} is out of range")))?;
    let dt = NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .and_then(|d| d.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| {
            VmError::value(format!("day is out of range for month: {year}-{month}-{day}"))
        })?;
    Ok(alloc(Payload::DateTime(dt)))
}

fn datetime_value(who: &str, recv: ObjPtr) -> Result<chrono::NaiveDateTime, VmError> {
    unsafe {
        match &(*recv).payload {
            Payload::DateTime(dt) => Ok(*dt),
            _ => Err(VmError::type_error(format!(
                "{who}() receiver must be a datetime, got {}",
                type_name(recv)
            ))),
        }
    }
}

fn datetime_isoformat(recv: ObjPtr, args: &CallArgs<'_>) -> Result<ObjPtr, VmError> {
    args.expect_positional("isoformat", 0)?;
    let dt = datetime_value("isoformat", recv)?;
    Ok(alloc_str(&dt.format("%Y-%m-%dT%H:%M:%S").to_string()))
}

fn datetime_strftime(recv: ObjPtr, args: &CallArgs<'_>) -> Result<ObjPtr, VmError> {
    args.expect_positional("strftime", 1)?;
    let dt = datetime_value("strftime", recv)?;
    let fmt = unsafe { crate::object::str_value(args.positional[0]) }.ok_or_else(|| {
        VmError::type_error("strftime() format must be a string")
    })?;
    // chrono surfaces unknown specifiers as a formatting error when the
    // delayed format is written out; never let that panic through Display.
    let mut out = String::new();
    write!(out, "{}", dt.format(&fmt))
        .map_err(|_| VmError::value(format!("invalid format string: {fmt:?}")))?;
    Ok(alloc_str(&out))
}

/// `timedelta(days, seconds)` positionally, with `weeks`, `days`, `hours`,
/// `minutes` and `seconds` accepted by keyword. Components must be
/// integers; the result is normalized the usual way.
fn timedelta_new(args: &CallArgs<'_>) -> Result<ObjPtr, VmError> {
    const NAMES: [&str; 5] = ["days", "seconds", "minutes", "hours", "weeks"];
    const SCALE: [i64; 5] = [86_400, 1, 60, 3_600, 604_800];
    let mut slots: [Option<i64>; 5] = [None; 5];

    if args.positional.len() > 2 {
        return Err(VmError::type_error(format!(
            "timedelta() takes at most 2 positional arguments ({} given)",
            args.positional.len()
        )));
    }
    for (i, value) in args.positional.iter().enumerate() {
        slots[i] = Some(int_arg("timedelta", NAMES[i], *value)?);
    }
    for (key, value) in args.keywords {
        let Some(i) = NAMES.iter().position(|n| n == key) else {
            return Err(VmError::type_error(format!(
                "timedelta() got an unexpected keyword argument '{key}'"
            )));
        };
        if slots[i].is_some() && args.positional.len() > i {
            return Err(VmError::type_error(format!(
                "timedelta() got multiple values for argument '{key}'"
            )));
        }
        // Repeated keyword: last write wins, matching mapping assignment.
        slots[i] = Some(int_arg("timedelta", key, *value)?);
    }

    let mut total: i64 = 0;
    for (i, slot) in slots.iter().enumerate() {
        if let Some(v) = slot {
            total = v
                .checked_mul(SCALE[i])
                .and_then(|scaled| total.checked_add(scaled))
                .ok_or_else(|| VmError::value("timedelta() component overflow"))?;
        }
    }

    Ok(alloc(Payload::TimeDelta(TimeDeltaData {
        days: total.div_euclid(86_400),
        seconds: total.rem_euclid(86_400),
    })))
}

fn timedelta_total_seconds(recv: ObjPtr, args: &CallArgs<'_>) -> Result<ObjPtr, VmError> {
    args.expect_positional("total_seconds", 0)?;
    unsafe {
        match &(*recv).payload {
            Payload::TimeDelta(delta) => Ok(alloc_float(
                (delta.days * 86_400 + delta.seconds) as f64,
            )),
            _ => Err(VmError::type_error(format!(
                "total_seconds() receiver must be a timedelta, got {}",
                type_name(recv)
            ))),
        }
    }
}
