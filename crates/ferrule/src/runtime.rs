//! The embedding context: runtime lifecycle plus the public call surface.

use std::ffi::c_void;
use std::marker::PhantomData;

use ferrule_vm as vm;

use crate::call::{split_args, Arg};
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::trampoline::{self, NativeFn, NativeFnWithData};
use crate::{invoke, resolver};

/// Live embedded runtime for the current thread.
///
/// Construction brings the runtime up; dropping the last live context on
/// the thread tears down the module cache and singleton graph (objects the
/// embedder still holds handles to stay alive until those handles drop).
/// Overlapping contexts share one runtime state, so an inner context's
/// drop leaves the outer one's search path, module cache, and generator
/// state untouched. The context is
/// deliberately neither `Send` nor `Sync`: the runtime's reference counts
/// are nonatomic, so every object must stay on the thread that created it.
pub struct Runtime {
    _not_send: PhantomData<*mut ()>,
}

impl Runtime {
    /// Bring up the runtime for this thread. Idempotent: a second context
    /// on the same thread shares the same runtime state, which stays alive
    /// until the last context drops.
    pub fn initialize() -> Runtime {
        vm::context_enter();
        Runtime {
            _not_send: PhantomData,
        }
    }

    /// The runtime's `None` singleton.
    pub fn none(&self) -> Handle {
        unsafe { Handle::from_borrowed(vm::none()) }
    }

    pub fn bool_true(&self) -> Handle {
        unsafe { Handle::from_borrowed(vm::bool_obj(true)) }
    }

    pub fn bool_false(&self) -> Handle {
        unsafe { Handle::from_borrowed(vm::bool_obj(false)) }
    }

    /// Prepend an entry to the runtime's module search path.
    pub fn add_module_search_path(&self, path: &str) -> Result<()> {
        if vm::path_prepend(path) {
            return Ok(());
        }
        let detail = vm::err_take()
            .map(|err| err.to_string())
            .unwrap_or_else(|| "rejected without explanation".to_string());
        Err(Error::Path(detail))
    }

    /// Resolve a dotted name to a handle without calling it.
    pub fn load(&self, name: &str) -> Result<Handle> {
        resolver::load(name)
    }

    /// Resolve a dotted name and call it with a mixed argument list.
    pub fn call(&self, name: &str, args: Vec<Arg>) -> Result<Handle> {
        let (positional, keywords) = split_args(args);
        self.call_with_args(name, &positional, &keywords)
    }

    /// Resolve a dotted name and call it with pre-split arguments.
    pub fn call_with_args(
        &self,
        name: &str,
        positional: &[Handle],
        keywords: &[(String, Handle)],
    ) -> Result<Handle> {
        let callable = resolver::load(name)?;
        invoke::call_object_with_args(name, &callable, positional, keywords)
    }

    /// Call a named method on an object with a mixed argument list.
    pub fn call_method(&self, recv: &Handle, name: &str, args: Vec<Arg>) -> Result<Handle> {
        let (positional, keywords) = split_args(args);
        self.call_method_with_args(recv, name, &positional, &keywords)
    }

    /// Call a named method on an object with pre-split arguments. `name`
    /// may be a dotted attribute chain; a leading dot is accepted.
    pub fn call_method_with_args(
        &self,
        recv: &Handle,
        name: &str,
        positional: &[Handle],
        keywords: &[(String, Handle)],
    ) -> Result<Handle> {
        let method = resolver::walk(recv.clone(), name)?;
        invoke::call_object_with_args(name, &method, positional, keywords)
    }

    /// Call an already-resolved object.
    pub fn call_object(&self, callable: &Handle, args: Vec<Arg>) -> Result<Handle> {
        let (positional, keywords) = split_args(args);
        invoke::call_object_with_args(callable.type_name(), callable, &positional, &keywords)
    }

    /// Call an already-resolved object with pre-split arguments.
    pub fn call_object_with_args(
        &self,
        callable: &Handle,
        positional: &[Handle],
        keywords: &[(String, Handle)],
    ) -> Result<Handle> {
        invoke::call_object_with_args(callable.type_name(), callable, positional, keywords)
    }

    /// Wrap a native function so the runtime can call it.
    pub fn wrap_function(&self, f: NativeFn) -> Handle {
        trampoline::wrap(f)
    }

    /// Wrap a native function together with an opaque context pointer that
    /// is handed back on every invocation.
    ///
    /// # Safety
    ///
    /// `data` must stay valid for as long as the returned handle (or any
    /// runtime-side reference to it) can be invoked.
    pub unsafe fn wrap_function_with_data(&self, f: NativeFnWithData, data: *mut c_void) -> Handle {
        trampoline::wrap_with_data(f, data)
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        vm::context_exit();
    }
}
