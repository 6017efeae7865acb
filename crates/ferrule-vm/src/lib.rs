//! Miniature dynamically typed object runtime embedded by `ferrule`.
//!
//! This crate plays the role of the foreign managed runtime: a heap of
//! opaque, reference-counted objects reachable only through raw pointers,
//! driven through a small C-API-flavored surface:
//!
//! - objects are `*mut ObjCell` with a nonatomic reference count;
//!   `incref`/`decref` are the caller's responsibility
//! - fallible entry points return a null pointer and record the failure in
//!   a thread-ambient error flag (`err_occurred`/`err_take`/`err_clear`)
//!   instead of encoding it in the return value
//! - modules are imported by name through a registry (`random`, `datetime`,
//!   `sys`) and a flat builtin table (`hex`, `len`, `str`, `abs`)
//!
//! # Safety
//!
//! Reference counts are stored in a plain `Cell<usize>` and mutated without
//! any locking, so every object is single-threaded by construction. All
//! pointer-taking entry points are `unsafe`; the embedding layer is expected
//! to wrap them in an RAII handle and never leak raw pointers across
//! threads.

pub mod call;
pub mod error;
pub mod modules;
pub mod object;
pub mod state;

pub use call::{call_object, get_iter, iter_next, CallArgs};
pub use error::{ExcKind, VmError};
pub use object::{
    alloc_float, alloc_int, alloc_long, alloc_str, capsule_parts, decref, dict_items, dict_set,
    float_value, getattr, incref, int_value, is_callable, new_capsule, new_dict, new_list,
    new_native_hook, new_tuple, ref_count, str_value, tuple_items, type_name, ObjCell, ObjPtr,
    TrampolineFn,
};
pub use state::{
    bool_obj, context_enter, context_exit, empty_dict, empty_tuple, err_clear, err_occurred,
    err_set, err_take, finalize, import_module, initialize, is_initialized, lookup_builtin, none,
    path_prepend,
};
