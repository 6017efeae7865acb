//! Call dispatch against a resolved runtime object.
//!
//! Argument handles are packed into the runtime's positional tuple and
//! keyword dict, the call is made, and the runtime's pending-error flag is
//! checked and cleared afterwards. A null result with no pending error is
//! itself an error: the runtime broke its own convention.

use ferrule_vm as vm;
use ferrule_vm::{ExcKind, VmError};

use crate::error::{Error, Result};
use crate::handle::Handle;

pub(crate) fn call_object_with_args(
    target: &str,
    callable: &Handle,
    positional: &[Handle],
    keywords: &[(String, Handle)],
) -> Result<Handle> {
    if !callable.is_callable() {
        return Err(Error::NotCallable {
            target: target.to_string(),
        });
    }

    // The runtime keeps interned empty containers; only build fresh ones
    // when there is something to put in them.
    let args = if positional.is_empty() {
        unsafe { Handle::from_borrowed(vm::empty_tuple()) }
    } else {
        let ptrs: Vec<vm::ObjPtr> = positional.iter().map(Handle::get).collect();
        unsafe { Handle::from_owned(vm::new_tuple(&ptrs)) }
    };
    let kwargs = if keywords.is_empty() {
        unsafe { Handle::from_borrowed(vm::empty_dict()) }
    } else {
        let dict = vm::new_dict();
        for (name, value) in keywords {
            unsafe { vm::dict_set(dict, name, value.get()) };
        }
        unsafe { Handle::from_owned(dict) }
    };

    let result = unsafe { vm::call_object(callable.get(), args.get(), kwargs.get()) };

    // Check-and-clear even when a result came back; a stale flag must not
    // leak into the next call.
    if let Some(err) = vm::err_take() {
        unsafe { vm::decref(result) };
        return Err(convert_vm_error(target, err));
    }
    if result.is_null() {
        return Err(Error::CallFailed {
            target: target.to_string(),
            detail: "no result and no exception".to_string(),
        });
    }
    Ok(unsafe { Handle::from_owned(result) })
}

fn convert_vm_error(target: &str, err: VmError) -> Error {
    match err.kind {
        ExcKind::Marshal => Error::Marshal(err.message),
        _ => Error::CallFailed {
            target: target.to_string(),
            detail: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ToObject;
    use crate::resolver::load;
    use pretty_assertions::assert_eq;

    #[test]
    fn non_callable_target_is_rejected_before_dispatch() {
        vm::initialize();
        let module = load("datetime").unwrap();
        let err = call_object_with_args("datetime", &module, &[], &[]).unwrap_err();
        assert_eq!(
            err,
            Error::NotCallable {
                target: "datetime".to_string()
            }
        );
    }

    #[test]
    fn runtime_exception_is_captured_into_the_detail() {
        vm::initialize();
        let hex = load("hex").unwrap();
        let bad = 1.5f64.to_object();
        let err = call_object_with_args("hex", &hex, &[bad], &[]).unwrap_err();
        match err {
            Error::CallFailed { target, detail } => {
                assert_eq!(target, "hex");
                assert!(detail.starts_with("TypeError"), "detail: {detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!vm::err_occurred());
    }

    #[test]
    fn argument_handles_survive_the_call() {
        vm::initialize();
        let hex = load("hex").unwrap();
        let n = 255i32.to_object();
        let positional = [n.clone()];
        let out = call_object_with_args("hex", &hex, &positional, &[]).unwrap();
        assert_eq!(out.text().unwrap(), "0xff");
        assert_eq!(n.ref_count(), 2); // local + the element of `positional`
    }
}
