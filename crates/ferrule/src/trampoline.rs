//! Native callbacks: making a plain Rust function callable from the
//! runtime side.
//!
//! The function pointer is stored as an address inside a runtime capsule;
//! the capsule travels with the runtime-callable hook object and comes back
//! at invocation time, where the address is transmuted back into the typed
//! function pointer. That transmute is the single point where this crate
//! reinterprets raw memory, and it is only reachable through capsules this
//! module created.
//!
//! Two failure modes at the boundary are kept sharply distinct:
//! - a registration object that is not a capsule means the process state is
//!   corrupted, and the trampoline panics rather than guess
//! - argument containers of the wrong shape are a runtime-side bug that is
//!   reported back as a marshalling error

use std::collections::BTreeMap;
use std::ffi::c_void;

use ferrule_vm as vm;
use ferrule_vm::{ObjPtr, VmError};

use crate::handle::Handle;

/// Native function callable from the runtime: positional handles plus
/// keyword handles in, one handle out.
pub type NativeFn = fn(&[Handle], &BTreeMap<String, Handle>) -> Handle;

/// Like [`NativeFn`] but carrying an opaque context pointer fixed at
/// registration time. The pointer is never dereferenced by this crate.
pub type NativeFnWithData = fn(*mut c_void, &[Handle], &BTreeMap<String, Handle>) -> Handle;

pub(crate) fn wrap(f: NativeFn) -> Handle {
    let capsule = vm::new_capsule(f as usize, std::ptr::null_mut());
    unsafe { Handle::from_owned(vm::new_native_hook(plain_entry, capsule)) }
}

pub(crate) fn wrap_with_data(f: NativeFnWithData, data: *mut c_void) -> Handle {
    let capsule = vm::new_capsule(f as usize, data);
    unsafe { Handle::from_owned(vm::new_native_hook(data_entry, capsule)) }
}

fn capsule_or_die(data: ObjPtr) -> (usize, *mut c_void) {
    match unsafe { vm::capsule_parts(data) } {
        Some(parts) => parts,
        None => panic!(
            "native callback registration corrupted: expected a capsule, found '{}'",
            unsafe { vm::type_name(data) }
        ),
    }
}

fn plain_entry(data: ObjPtr, args: ObjPtr, kwargs: ObjPtr) -> ObjPtr {
    let (addr, _) = capsule_or_die(data);
    // Reverses the `f as usize` done at registration; the capsule's address
    // always originates from a `NativeFn`.
    let f: NativeFn = unsafe { std::mem::transmute(addr) };
    match unpack(args, kwargs) {
        Ok((positional, keywords)) => f(&positional, &keywords).release(),
        Err(err) => {
            vm::err_set(err);
            std::ptr::null_mut()
        }
    }
}

fn data_entry(data: ObjPtr, args: ObjPtr, kwargs: ObjPtr) -> ObjPtr {
    let (addr, context) = capsule_or_die(data);
    let f: NativeFnWithData = unsafe { std::mem::transmute(addr) };
    match unpack(args, kwargs) {
        Ok((positional, keywords)) => f(context, &positional, &keywords).release(),
        Err(err) => {
            vm::err_set(err);
            std::ptr::null_mut()
        }
    }
}

type Unpacked = (Vec<Handle>, BTreeMap<String, Handle>);

fn unpack(args: ObjPtr, kwargs: ObjPtr) -> Result<Unpacked, VmError> {
    let items = unsafe { vm::tuple_items(args) }.ok_or_else(|| {
        VmError::marshal(format!(
            "positional container is '{}', expected a tuple",
            unsafe { vm::type_name(args) }
        ))
    })?;
    let positional = items
        .into_iter()
        .map(|p| unsafe { Handle::from_borrowed(p) })
        .collect();
    let entries = unsafe { vm::dict_items(kwargs) }.ok_or_else(|| {
        VmError::marshal(format!(
            "keyword container is '{}', expected a dict",
            unsafe { vm::type_name(kwargs) }
        ))
    })?;
    let keywords = entries
        .into_iter()
        .map(|(name, value)| (name, unsafe { Handle::from_borrowed(value) }))
        .collect();
    Ok((positional, keywords))
}
