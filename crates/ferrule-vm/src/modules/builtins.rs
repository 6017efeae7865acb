//! Top-level builtin functions, reachable without any module prefix.

use crate::call::CallArgs;
use crate::error::VmError;
use crate::object::{
    alloc_int, alloc_str, display_string, type_name, BuiltinDef, ObjPtr, Payload,
};

static BUILTINS: &[BuiltinDef] = &[
    BuiltinDef {
        name: "hex",
        func: hex,
    },
    BuiltinDef {
        name: "len",
        func: len,
    },
    BuiltinDef {
        name: "str",
        func: str_,
    },
    BuiltinDef {
        name: "abs",
        func: abs_,
    },
];

pub(crate) fn lookup(name: &str) -> Option<&'static BuiltinDef> {
    BUILTINS.iter().find(|def| def.name == name)
}

/// Hexadecimal formatting. The two integer kinds deliberately format
/// differently: the wide kind carries a trailing `L` tag, so a caller can
/// tell which kind crossed the boundary.
fn hex(args: &CallArgs<'_>) -> Result<ObjPtr, VmError> {
    args.expect_positional("hex", 1)?;
    let arg = args.positional[0];
    let (value, suffix) = unsafe {
        match &(*arg).payload {
            Payload::Int(v) => (*v, ""),
            Payload::Long(v) => (*v, "L"),
            _ => {
                return Err(VmError::type_error(format!(
                    "hex() argument can't be converted to hex: got {}",
                    type_name(arg)
                )))
            }
        }
    };
    let text = if value < 0 {
        format!("-0x{:x}{suffix}", value.unsigned_abs())
    } else {
        format!("0x{value:x}{suffix}")
    };
    Ok(alloc_str(&text))
}

fn len(args: &CallArgs<'_>) -> Result<ObjPtr, VmError> {
    args.expect_positional("len", 1)?;
    let arg = args.positional[0];
    let n = unsafe {
        match &(*arg).payload {
            Payload::Str(s) => s.chars().count(),
            Payload::List(items) => items.borrow().len(),
            Payload::Tuple(items) => items.len(),
            Payload::Dict(entries) => entries.borrow().len(),
            _ => {
                return Err(VmError::type_error(format!(
                    "object of type '{}' has no len()",
                    type_name(arg)
                )))
            }
        }
    };
    Ok(alloc_int(n as i64))
}

fn str_(args: &CallArgs<'_>) -> Result<ObjPtr, VmError> {
    args.expect_positional("str", 1)?;
    let text = unsafe { display_string(args.positional[0]) };
    Ok(alloc_str(&text))
}

fn abs_(args: &CallArgs<'_>) -> Result<ObjPtr, VmError> {
    args.expect_positional("abs", 1)?;
    let arg = args.positional[0];
    unsafe {
        match &(*arg).payload {
            Payload::Int(v) => Ok(alloc_int(v.abs())),
            Payload::Long(v) => Ok(crate::object::alloc_long(v.abs())),
            Payload::Float(v) => Ok(crate::object::alloc_float(v.abs())),
            _ => Err(VmError::type_error(format!(
                "bad operand type for abs(): '{}'",
                type_name(arg)
            ))),
        }
    }
}
