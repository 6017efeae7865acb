//! Heap object representation and reference counting.
//!
//! Every runtime value lives in a heap `ObjCell` reached through a raw
//! `*mut ObjCell`. The count is a plain `Cell<usize>`: cheap, nonatomic,
//! and therefore strictly single-threaded. A new object starts at count 1
//! (one "new reference" owned by whoever allocated it); container
//! constructors take their own reference on every element they store and
//! release it again when the container is freed.
//!
//! Conventions, kept deliberately close to a C embedding API:
//! - functions returning `ObjPtr` return a NEW reference unless documented
//!   as borrowed
//! - fallible functions return null and park a [`VmError`] in the ambient
//!   flag (see [`crate::state`])

use std::cell::{Cell, RefCell};
use std::ffi::c_void;
use std::fmt::Write as _;

use chrono::NaiveDateTime;

use crate::call::CallArgs;
use crate::error::VmError;
use crate::state;

/// Raw pointer to a runtime object. Null means "no object".
pub type ObjPtr = *mut ObjCell;

/// Entry point through which the runtime invokes a registered native
/// function: `(registration data, positional tuple, keyword dict)`.
/// Returns a new reference, or null with the ambient flag set.
pub type TrampolineFn = fn(data: ObjPtr, args: ObjPtr, kwargs: ObjPtr) -> ObjPtr;

/// Free function callable from the runtime (module function or builtin).
pub type BuiltinFn = fn(args: &CallArgs<'_>) -> Result<ObjPtr, VmError>;

/// Method callable against an instance receiver.
pub type MethodFn = fn(recv: ObjPtr, args: &CallArgs<'_>) -> Result<ObjPtr, VmError>;

/// Static description of a free function.
pub struct BuiltinDef {
    pub name: &'static str,
    pub func: BuiltinFn,
}

/// Static description of an instance method.
pub struct MethodDef {
    pub name: &'static str,
    pub func: MethodFn,
}

/// Static description of an instantiable type: the constructor plus the
/// method table consulted by attribute lookup.
pub struct TypeDef {
    pub name: &'static str,
    pub construct: BuiltinFn,
    pub methods: &'static [MethodDef],
}

pub(crate) struct ModuleData {
    pub(crate) name: &'static str,
    pub(crate) attrs: RefCell<Vec<(String, ObjPtr)>>,
}

/// Normalized duration: `0 <= seconds < 86400`, sign carried by `days`.
pub(crate) struct TimeDeltaData {
    pub(crate) days: i64,
    pub(crate) seconds: i64,
}

/// Snapshot iterator over a sequence. Holds one reference per element for
/// its whole lifetime so the sequence may be mutated or dropped mid-loop.
pub(crate) struct SeqIterData {
    pub(crate) items: Vec<ObjPtr>,
    pub(crate) next: Cell<usize>,
}

pub(crate) enum Payload {
    None,
    Bool(bool),
    /// Narrow integer kind.
    Int(i64),
    /// Wide integer kind. Same value range as `Int` in this runtime, but a
    /// distinct tag: formatting and type checks must not collapse the two.
    Long(i64),
    Float(f64),
    Str(String),
    List(RefCell<Vec<ObjPtr>>),
    Tuple(Box<[ObjPtr]>),
    /// Insertion-ordered string-keyed mapping, last write wins.
    Dict(RefCell<Vec<(String, ObjPtr)>>),
    Module(ModuleData),
    Type(&'static TypeDef),
    Builtin(&'static BuiltinDef),
    UnboundMethod {
        ty: &'static TypeDef,
        method: &'static MethodDef,
    },
    BoundMethod {
        recv: ObjPtr,
        method: &'static MethodDef,
    },
    DateTime(NaiveDateTime),
    TimeDelta(TimeDeltaData),
    SeqIter(SeqIterData),
    /// Opaque registration data for native callbacks. `desc` is not owned.
    Capsule {
        addr: usize,
        desc: *mut c_void,
    },
    /// A native function made callable from the runtime side.
    NativeHook {
        entry: TrampolineFn,
        data: ObjPtr,
    },
}

/// One heap-allocated runtime object.
pub struct ObjCell {
    refs: Cell<usize>,
    pub(crate) payload: Payload,
}

pub(crate) fn alloc(payload: Payload) -> ObjPtr {
    Box::into_raw(Box::new(ObjCell {
        refs: Cell::new(1),
        payload,
    }))
}

/// Bump the reference count. No-op on null.
///
/// # Safety
///
/// `p` must be null or point to a live object on the current thread.
pub unsafe fn incref(p: ObjPtr) {
    if let Some(cell) = p.as_ref() {
        cell.refs.set(cell.refs.get() + 1);
    }
}

/// Drop one reference, freeing the object (and releasing the references it
/// holds on children) when the count reaches zero. No-op on null.
///
/// # Safety
///
/// `p` must be null or point to a live object on the current thread, and
/// the caller must own the reference being dropped.
pub unsafe fn decref(p: ObjPtr) {
    let Some(cell) = p.as_ref() else { return };
    let n = cell.refs.get();
    debug_assert!(n > 0, "decref on a dead object");
    if n == 1 {
        free(p);
    } else {
        cell.refs.set(n - 1);
    }
}

unsafe fn free(p: ObjPtr) {
    let cell = Box::from_raw(p);
    match cell.payload {
        Payload::List(items) => {
            for item in items.into_inner() {
                decref(item);
            }
        }
        Payload::Tuple(items) => {
            for item in items.iter() {
                decref(*item);
            }
        }
        Payload::Dict(entries) => {
            for (_, value) in entries.into_inner() {
                decref(value);
            }
        }
        Payload::Module(module) => {
            for (_, value) in module.attrs.into_inner() {
                decref(value);
            }
        }
        Payload::BoundMethod { recv, .. } => decref(recv),
        Payload::SeqIter(iter) => {
            for item in iter.items {
                decref(item);
            }
        }
        Payload::NativeHook { data, .. } => decref(data),
        _ => {}
    }
}

/// Current reference count, 0 for null.
///
/// # Safety
///
/// `p` must be null or point to a live object on the current thread.
pub unsafe fn ref_count(p: ObjPtr) -> usize {
    p.as_ref().map_or(0, |cell| cell.refs.get())
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

/// New narrow integer.
pub fn alloc_int(value: i64) -> ObjPtr {
    alloc(Payload::Int(value))
}

/// New wide integer.
pub fn alloc_long(value: i64) -> ObjPtr {
    alloc(Payload::Long(value))
}

pub fn alloc_float(value: f64) -> ObjPtr {
    alloc(Payload::Float(value))
}

pub fn alloc_str(value: &str) -> ObjPtr {
    alloc(Payload::Str(value.to_string()))
}

/// New list holding its own reference on every element.
///
/// # Safety
///
/// Every element must point to a live object on the current thread.
pub unsafe fn new_list(items: &[ObjPtr]) -> ObjPtr {
    for item in items {
        incref(*item);
    }
    alloc(Payload::List(RefCell::new(items.to_vec())))
}

/// New tuple holding its own reference on every element.
///
/// # Safety
///
/// Every element must point to a live object on the current thread.
pub unsafe fn new_tuple(items: &[ObjPtr]) -> ObjPtr {
    for item in items {
        incref(*item);
    }
    alloc(Payload::Tuple(items.to_vec().into_boxed_slice()))
}

/// New empty mapping.
pub fn new_dict() -> ObjPtr {
    alloc(Payload::Dict(RefCell::new(Vec::new())))
}

/// Insert into a mapping, taking a fresh reference on `value`. A repeated
/// key overwrites the earlier value in place (last write wins, original
/// insertion position preserved).
///
/// # Safety
///
/// `dict` must be a live mapping object and `value` a live object, both on
/// the current thread.
pub unsafe fn dict_set(dict: ObjPtr, key: &str, value: ObjPtr) {
    let Payload::Dict(entries) = &(*dict).payload else {
        panic!("dict_set on a non-dict object");
    };
    incref(value);
    let mut entries = entries.borrow_mut();
    if let Some(slot) = entries.iter_mut().find(|(k, _)| k == key) {
        let old = slot.1;
        slot.1 = value;
        drop(entries);
        decref(old);
    } else {
        entries.push((key.to_string(), value));
    }
}

/// Prepend to a list, stealing the caller's reference on `item`.
pub(crate) unsafe fn list_prepend(list: ObjPtr, item: ObjPtr) {
    let Payload::List(items) = &(*list).payload else {
        panic!("list_prepend on a non-list object");
    };
    items.borrow_mut().insert(0, item);
}

pub(crate) fn module_new(name: &'static str) -> ObjPtr {
    alloc(Payload::Module(ModuleData {
        name,
        attrs: RefCell::new(Vec::new()),
    }))
}

/// Attach a module attribute, stealing the caller's reference on `value`.
pub(crate) unsafe fn module_set(module: ObjPtr, name: &str, value: ObjPtr) {
    let Payload::Module(data) = &(*module).payload else {
        panic!("module_set on a non-module object");
    };
    data.attrs.borrow_mut().push((name.to_string(), value));
}

/// New capsule wrapping an opaque native address plus an optional
/// descriptor pointer. Neither is owned or interpreted by the runtime.
pub fn new_capsule(addr: usize, desc: *mut c_void) -> ObjPtr {
    alloc(Payload::Capsule { addr, desc })
}

/// New runtime-callable wrapper around a native trampoline entry point.
/// Steals the caller's reference on `data`.
///
/// # Safety
///
/// `data` must point to a live object on the current thread.
pub unsafe fn new_native_hook(entry: TrampolineFn, data: ObjPtr) -> ObjPtr {
    alloc(Payload::NativeHook { entry, data })
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

/// Integer value of either integer kind.
///
/// # Safety
///
/// `p` must be null or point to a live object on the current thread.
pub unsafe fn int_value(p: ObjPtr) -> Option<i64> {
    match &p.as_ref()?.payload {
        Payload::Int(v) | Payload::Long(v) => Some(*v),
        _ => None,
    }
}

/// Float value; both integer kinds coerce.
///
/// # Safety
///
/// `p` must be null or point to a live object on the current thread.
pub unsafe fn float_value(p: ObjPtr) -> Option<f64> {
    match &p.as_ref()?.payload {
        Payload::Float(v) => Some(*v),
        Payload::Int(v) | Payload::Long(v) => Some(*v as f64),
        _ => None,
    }
}

/// Owned copy of a string object's contents.
///
/// # Safety
///
/// `p` must be null or point to a live object on the current thread.
pub unsafe fn str_value(p: ObjPtr) -> Option<String> {
    match &p.as_ref()?.payload {
        Payload::Str(s) => Some(s.clone()),
        _ => None,
    }
}

/// Borrowed element pointers of a tuple, or `None` if not a tuple.
///
/// # Safety
///
/// `p` must be null or point to a live object on the current thread.
pub unsafe fn tuple_items(p: ObjPtr) -> Option<Vec<ObjPtr>> {
    match &p.as_ref()?.payload {
        Payload::Tuple(items) => Some(items.to_vec()),
        _ => None,
    }
}

/// Borrowed `(key, value)` pairs of a mapping, in insertion order, or
/// `None` if not a mapping.
///
/// # Safety
///
/// `p` must be null or point to a live object on the current thread.
pub unsafe fn dict_items(p: ObjPtr) -> Option<Vec<(String, ObjPtr)>> {
    match &p.as_ref()?.payload {
        Payload::Dict(entries) => Some(entries.borrow().clone()),
        _ => None,
    }
}

/// The `(addr, desc)` pair of a capsule, or `None` for anything else.
///
/// # Safety
///
/// `p` must be null or point to a live object on the current thread.
pub unsafe fn capsule_parts(p: ObjPtr) -> Option<(usize, *mut c_void)> {
    match &p.as_ref()?.payload {
        Payload::Capsule { addr, desc } => Some((*addr, *desc)),
        _ => None,
    }
}

/// Runtime type name of the referenced object, `"null"` for null.
///
/// # Safety
///
/// `p` must be null or point to a live object on the current thread.
pub unsafe fn type_name(p: ObjPtr) -> &'static str {
    let Some(cell) = p.as_ref() else {
        return "null";
    };
    match &cell.payload {
        Payload::None => "NoneType",
        Payload::Bool(_) => "bool",
        Payload::Int(_) => "int",
        Payload::Long(_) => "long",
        Payload::Float(_) => "float",
        Payload::Str(_) => "str",
        Payload::List(_) => "list",
        Payload::Tuple(_) => "tuple",
        Payload::Dict(_) => "dict",
        Payload::Module(_) => "module",
        Payload::Type(_) => "type",
        Payload::Builtin(_) => "builtin",
        Payload::UnboundMethod { .. } | Payload::BoundMethod { .. } => "method",
        Payload::DateTime(_) => "datetime",
        Payload::TimeDelta(_) => "timedelta",
        Payload::SeqIter(_) => "iterator",
        Payload::Capsule { .. } => "capsule",
        Payload::NativeHook { .. } => "native function",
    }
}

/// Whether the object can be the target of a call.
///
/// # Safety
///
/// `p` must be null or point to a live object on the current thread.
pub unsafe fn is_callable(p: ObjPtr) -> bool {
    matches!(
        p.as_ref().map(|cell| &cell.payload),
        Some(
            Payload::Type(_)
                | Payload::Builtin(_)
                | Payload::UnboundMethod { .. }
                | Payload::BoundMethod { .. }
                | Payload::NativeHook { .. }
        )
    )
}

/// Instance type for values that belong to a registered [`TypeDef`].
pub(crate) unsafe fn instance_type(p: ObjPtr) -> Option<&'static TypeDef> {
    match &p.as_ref()?.payload {
        Payload::DateTime(_) => Some(&crate::modules::datetime::DATETIME_TYPE),
        Payload::TimeDelta(_) => Some(&crate::modules::datetime::TIMEDELTA_TYPE),
        _ => None,
    }
}

/// Display form used by the `str` builtin and error messages.
pub(crate) unsafe fn display_string(p: ObjPtr) -> String {
    let Some(cell) = p.as_ref() else {
        return "<null>".to_string();
    };
    match &cell.payload {
        Payload::None => "None".to_string(),
        Payload::Bool(true) => "True".to_string(),
        Payload::Bool(false) => "False".to_string(),
        Payload::Int(v) | Payload::Long(v) => v.to_string(),
        Payload::Float(v) => {
            if v.fract() == 0.0 && v.is_finite() {
                format!("{v:.1}")
            } else {
                v.to_string()
            }
        }
        Payload::Str(s) => s.clone(),
        Payload::List(items) => {
            let mut out = String::from("[");
            for (i, item) in items.borrow().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{}", display_string(*item));
            }
            out.push(']');
            out
        }
        Payload::Tuple(items) => {
            let mut out = String::from("(");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{}", display_string(*item));
            }
            out.push(')');
            out
        }
        Payload::Module(data) => format!("<module '{}'>", data.name),
        Payload::Type(ty) => format!("<type '{}'>", ty.name),
        Payload::Builtin(def) => format!("<builtin '{}'>", def.name),
        Payload::UnboundMethod { ty, method } => {
            format!("<unbound method {}.{}>", ty.name, method.name)
        }
        Payload::BoundMethod { method, .. } => format!("<bound method {}>", method.name),
        other => format!("<{}>", type_name_of(other)),
    }
}

fn type_name_of(payload: &Payload) -> &'static str {
    match payload {
        Payload::Dict(_) => "dict",
        Payload::DateTime(_) => "datetime",
        Payload::TimeDelta(_) => "timedelta",
        Payload::SeqIter(_) => "iterator",
        Payload::Capsule { .. } => "capsule",
        Payload::NativeHook { .. } => "native function",
        _ => "object",
    }
}

// ---------------------------------------------------------------------------
// Attribute lookup
// ---------------------------------------------------------------------------

/// Look up a named attribute. Returns a new reference, or null with an
/// `AttributeError` parked in the ambient flag.
///
/// # Safety
///
/// `obj` must be null or point to a live object on the current thread.
pub unsafe fn getattr(obj: ObjPtr, name: &str) -> ObjPtr {
    let Some(cell) = obj.as_ref() else {
        return state::fail(VmError::attribute(format!(
            "attribute '{name}' requested on a null object"
        )));
    };

    match &cell.payload {
        Payload::Module(data) => {
            let attrs = data.attrs.borrow();
            if let Some((_, value)) = attrs.iter().find(|(k, _)| k == name) {
                incref(*value);
                return *value;
            }
            state::fail(VmError::attribute(format!(
                "module '{}' has no attribute '{name}'",
                data.name
            )))
        }
        Payload::Type(ty) => {
            if let Some(method) = ty.methods.iter().find(|m| m.name == name) {
                return alloc(Payload::UnboundMethod { ty, method });
            }
            state::fail(VmError::attribute(format!(
                "type '{}' has no attribute '{name}'",
                ty.name
            )))
        }
        Payload::TimeDelta(delta) => match name {
            "days" => alloc_int(delta.days),
            "seconds" => alloc_int(delta.seconds),
            _ => instance_attr(obj, name),
        },
        _ => instance_attr(obj, name),
    }
}

unsafe fn instance_attr(obj: ObjPtr, name: &str) -> ObjPtr {
    if let Some(ty) = instance_type(obj) {
        if let Some(method) = ty.methods.iter().find(|m| m.name == name) {
            incref(obj);
            return alloc(Payload::BoundMethod { recv: obj, method });
        }
    }
    state::fail(VmError::attribute(format!(
        "'{}' object has no attribute '{name}'",
        type_name(obj)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_object_starts_at_one_reference() {
        unsafe {
            let p = alloc_int(7);
            assert_eq!(ref_count(p), 1);
            decref(p);
        }
    }

    #[test]
    fn incref_decref_balance() {
        unsafe {
            let p = alloc_str("x");
            incref(p);
            incref(p);
            assert_eq!(ref_count(p), 3);
            decref(p);
            decref(p);
            assert_eq!(ref_count(p), 1);
            decref(p);
        }
    }

    #[test]
    fn containers_hold_their_own_element_references() {
        unsafe {
            let item = alloc_int(1);
            let tuple = new_tuple(&[item, item]);
            assert_eq!(ref_count(item), 3);
            decref(tuple);
            assert_eq!(ref_count(item), 1);
            decref(item);
        }
    }

    #[test]
    fn dict_last_write_wins_keeps_position() {
        unsafe {
            let d = new_dict();
            let a = alloc_int(1);
            let b = alloc_int(2);
            let c = alloc_int(3);
            dict_set(d, "x", a);
            dict_set(d, "y", b);
            dict_set(d, "x", c);
            let items = dict_items(d).unwrap();
            assert_eq!(items.len(), 2);
            assert_eq!(items[0].0, "x");
            assert_eq!(int_value(items[0].1), Some(3));
            assert_eq!(ref_count(a), 1); // overwritten value released
            decref(d);
            decref(a);
            decref(b);
            decref(c);
        }
    }

    #[test]
    fn null_accessors_are_total() {
        unsafe {
            assert_eq!(ref_count(std::ptr::null_mut()), 0);
            assert_eq!(type_name(std::ptr::null_mut()), "null");
            assert!(int_value(std::ptr::null_mut()).is_none());
            assert!(!is_callable(std::ptr::null_mut()));
        }
    }

    #[test]
    fn int_and_long_share_value_but_not_tag() {
        unsafe {
            let narrow = alloc_int(255);
            let wide = alloc_long(255);
            assert_eq!(int_value(narrow), int_value(wide));
            assert_eq!(type_name(narrow), "int");
            assert_eq!(type_name(wide), "long");
            decref(narrow);
            decref(wide);
        }
    }
}
