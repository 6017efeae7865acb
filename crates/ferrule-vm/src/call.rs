//! Call dispatch: how a callable object is invoked with a positional tuple
//! and a keyword dict, plus the minimal iterator protocol.
//!
//! `call_object` mirrors the embedding convention the bridge layer codes
//! against: it returns a new reference on success, or null with the
//! ambient flag set. Failures inside builtins travel as `Result` up to
//! this boundary and are parked in the flag here, exactly once.

use crate::error::VmError;
use crate::object::{self, incref, instance_type, type_name, ObjPtr, Payload, SeqIterData};
use crate::state;
use std::cell::Cell;

/// Borrowed view of a call's arguments, in caller order. The pointers are
/// borrowed for the duration of the call; the caller's containers keep
/// them alive.
pub struct CallArgs<'a> {
    pub positional: &'a [ObjPtr],
    pub keywords: &'a [(String, ObjPtr)],
}

impl CallArgs<'_> {
    /// Exactly `n` positional arguments and no keywords, or a `TypeError`.
    pub fn expect_positional(&self, who: &str, n: usize) -> Result<(), VmError> {
        if self.positional.len() != n {
            return Err(VmError::type_error(format!(
                "{who}() takes exactly {n} argument(s) ({} given)",
                self.positional.len()
            )));
        }
        if !self.keywords.is_empty() {
            return Err(VmError::type_error(format!(
                "{who}() takes no keyword arguments"
            )));
        }
        Ok(())
    }
}

/// Invoke `callable` with a positional tuple and a keyword dict.
/// Returns a new reference, or null with the ambient flag set.
///
/// # Safety
///
/// All three pointers must be null or point to live objects on the current
/// thread; `args` must be a tuple and `kwargs` a dict when non-null.
pub unsafe fn call_object(callable: ObjPtr, args: ObjPtr, kwargs: ObjPtr) -> ObjPtr {
    let Some(cell) = callable.as_ref() else {
        return state::fail(VmError::type_error("call target is a null object"));
    };

    // The native hook path hands the raw containers straight to the
    // trampoline, which owns validation of their shape.
    if let Payload::NativeHook { entry, data } = &cell.payload {
        return entry(*data, args, kwargs);
    }

    let positional = match object::tuple_items(args) {
        Some(items) => items,
        None => {
            return state::fail(VmError::type_error(
                "positional argument container must be a tuple",
            ))
        }
    };
    let keywords = match object::dict_items(kwargs) {
        Some(entries) => entries,
        None => {
            return state::fail(VmError::type_error(
                "keyword argument container must be a dict",
            ))
        }
    };

    let outcome = match &cell.payload {
        Payload::Builtin(def) => (def.func)(&CallArgs {
            positional: &positional,
            keywords: &keywords,
        }),
        Payload::Type(ty) => (ty.construct)(&CallArgs {
            positional: &positional,
            keywords: &keywords,
        }),
        Payload::UnboundMethod { ty, method } => {
            let Some((recv, rest)) = positional.split_first() else {
                return state::fail(VmError::type_error(format!(
                    "unbound method {}.{}() requires a '{}' instance as first argument",
                    ty.name, method.name, ty.name
                )));
            };
            if instance_type(*recv).map(|t| t.name) != Some(ty.name) {
                return state::fail(VmError::type_error(format!(
                    "unbound method {}.{}() requires a '{}' instance as first argument, got {}",
                    ty.name,
                    method.name,
                    ty.name,
                    type_name(*recv)
                )));
            }
            (method.func)(
                *recv,
                &CallArgs {
                    positional: rest,
                    keywords: &keywords,
                },
            )
        }
        Payload::BoundMethod { recv, method } => (method.func)(
            *recv,
            &CallArgs {
                positional: &positional,
                keywords: &keywords,
            },
        ),
        other => {
            return state::fail(VmError::type_error(format!(
                "'{}' object is not callable",
                payload_name(other)
            )))
        }
    };

    match outcome {
        Ok(result) => result,
        Err(err) => state::fail(err),
    }
}

fn payload_name(payload: &Payload) -> String {
    // Cheap re-derivation; only used to word an error.
    match payload {
        Payload::None => "NoneType".to_string(),
        Payload::Str(_) => "str".to_string(),
        Payload::Int(_) => "int".to_string(),
        Payload::Long(_) => "long".to_string(),
        Payload::Float(_) => "float".to_string(),
        Payload::List(_) => "list".to_string(),
        Payload::Tuple(_) => "tuple".to_string(),
        Payload::Dict(_) => "dict".to_string(),
        Payload::Module(m) => format!("module '{}'", m.name),
        _ => "object".to_string(),
    }
}

/// Obtain a snapshot iterator over a sequence. Returns a new reference, or
/// null with a `TypeError` parked for non-iterable objects.
///
/// # Safety
///
/// `obj` must be null or point to a live object on the current thread.
pub unsafe fn get_iter(obj: ObjPtr) -> ObjPtr {
    let Some(cell) = obj.as_ref() else {
        return state::fail(VmError::type_error("null object is not iterable"));
    };
    let items: Vec<ObjPtr> = match &cell.payload {
        Payload::List(items) => items.borrow().clone(),
        Payload::Tuple(items) => items.to_vec(),
        _ => {
            return state::fail(VmError::type_error(format!(
                "'{}' object is not iterable",
                type_name(obj)
            )))
        }
    };
    for item in &items {
        incref(*item);
    }
    object::alloc(Payload::SeqIter(SeqIterData {
        items,
        next: Cell::new(0),
    }))
}

/// Advance an iterator. Returns a new reference to the next element; null
/// without a flag means exhausted, null with a flag means failure.
///
/// # Safety
///
/// `iter` must be null or point to a live object on the current thread.
pub unsafe fn iter_next(iter: ObjPtr) -> ObjPtr {
    let Some(cell) = iter.as_ref() else {
        return state::fail(VmError::type_error("iter_next on a null object"));
    };
    let Payload::SeqIter(data) = &cell.payload else {
        return state::fail(VmError::type_error(format!(
            "'{}' object is not an iterator",
            type_name(iter)
        )));
    };
    let idx = data.next.get();
    if idx >= data.items.len() {
        return std::ptr::null_mut();
    }
    data.next.set(idx + 1);
    let item = data.items[idx];
    incref(item);
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{alloc_int, decref, int_value, new_list, new_tuple, ref_count};
    use crate::state::{empty_dict, empty_tuple, err_clear, err_take};
    use pretty_assertions::assert_eq;

    #[test]
    fn calling_a_non_callable_parks_type_error() {
        unsafe {
            err_clear();
            let target = alloc_int(3);
            let result = call_object(target, empty_tuple(), empty_dict());
            assert!(result.is_null());
            assert_eq!(err_take().unwrap().kind, crate::ExcKind::Type);
            decref(target);
        }
    }

    #[test]
    fn iteration_walks_a_list_in_order_and_then_stops_clean() {
        unsafe {
            err_clear();
            let items: Vec<ObjPtr> = (0..3).map(alloc_int).collect();
            let list = new_list(&items);
            let it = get_iter(list);
            for expected in 0..3 {
                let item = iter_next(it);
                assert_eq!(int_value(item), Some(expected));
                decref(item);
            }
            let done = iter_next(it);
            assert!(done.is_null());
            assert!(err_take().is_none());
            decref(it);
            decref(list);
            for item in items {
                assert_eq!(ref_count(item), 1);
                decref(item);
            }
        }
    }

    #[test]
    fn iterator_snapshot_survives_source_drop() {
        unsafe {
            let items: Vec<ObjPtr> = (0..2).map(alloc_int).collect();
            let tuple = new_tuple(&items);
            for item in &items {
                decref(*item);
            }
            let it = get_iter(tuple);
            decref(tuple); // the iterator keeps the elements alive
            let first = iter_next(it);
            assert_eq!(int_value(first), Some(0));
            decref(first);
            decref(it);
        }
    }
}
