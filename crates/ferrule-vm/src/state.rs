//! Thread-ambient runtime state: the error flag, the module cache, the
//! module search path, the singletons, and the shared random generator.
//!
//! The state is process-lifetime in intent and thread-local in mechanism:
//! reference counts are nonatomic, so the whole object graph is confined to
//! one thread and the "process-wide" singletons live alongside it. State is
//! created lazily on first use and torn down when the thread exits
//! (releasing the cached module graph); [`initialize`] forces creation up
//! front and [`finalize`] tears down early.
//!
//! Errors follow the out-of-band convention: fallible entry points return
//! null and park a [`VmError`] here. The embedder is expected to check and
//! consume the flag immediately after every call so a stale failure can
//! never be attributed to a later, unrelated operation.

use std::cell::{Cell, RefCell};

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use crate::error::VmError;
use crate::modules;
use crate::object::{self, alloc_str, decref, incref, ObjPtr, Payload};

struct VmState {
    pending: Option<VmError>,
    /// Imported modules, one cached reference each.
    modules: Vec<(&'static str, ObjPtr)>,
    /// The live search-path list, exposed as `sys.path`.
    search_path: ObjPtr,
    none: ObjPtr,
    true_: ObjPtr,
    false_: ObjPtr,
    empty_tuple: ObjPtr,
    empty_dict: ObjPtr,
    rng: StdRng,
}

impl VmState {
    fn new() -> Self {
        VmState {
            pending: None,
            modules: Vec::new(),
            search_path: object::alloc(Payload::List(RefCell::new(Vec::new()))),
            none: object::alloc(Payload::None),
            true_: object::alloc(Payload::Bool(true)),
            false_: object::alloc(Payload::Bool(false)),
            empty_tuple: object::alloc(Payload::Tuple(Box::new([]))),
            empty_dict: object::new_dict(),
            rng: StdRng::seed_from_u64(rand::rng().random()),
        }
    }
}

impl Drop for VmState {
    fn drop(&mut self) {
        unsafe {
            for (_, module) in self.modules.drain(..) {
                decref(module);
            }
            decref(self.search_path);
            decref(self.none);
            decref(self.true_);
            decref(self.false_);
            decref(self.empty_tuple);
            decref(self.empty_dict);
        }
    }
}

thread_local! {
    static STATE: RefCell<Option<VmState>> = const { RefCell::new(None) };
    static CONTEXTS: Cell<usize> = const { Cell::new(0) };
}

/// Run `f` with the state, creating it on first use. The borrow is released
/// before `f`'s result escapes, so callbacks must never re-enter from
/// inside `f` itself; all public entry points keep their borrows short.
fn with_state<R>(f: impl FnOnce(&mut VmState) -> R) -> R {
    STATE.with(|slot| {
        let mut slot = slot.borrow_mut();
        f(slot.get_or_insert_with(VmState::new))
    })
}

/// Force creation of the ambient state for the current thread. Idempotent.
pub fn initialize() {
    with_state(|_| {});
}

pub fn is_initialized() -> bool {
    STATE.with(|slot| slot.borrow().is_some())
}

/// Tear down the ambient state early, releasing the module cache and the
/// singleton graph. Objects still referenced by the embedder stay alive.
pub fn finalize() {
    STATE.with(|slot| {
        slot.borrow_mut().take();
    });
}

/// Open one embedding context: bring the state up and count the context.
/// Contexts on the same thread share one runtime state.
pub fn context_enter() {
    initialize();
    CONTEXTS.with(|count| count.set(count.get() + 1));
}

/// Close one embedding context. The state is torn down only when the last
/// open context on this thread exits; an inner context leaving must not
/// pull the module cache, search path, or RNG out from under an outer one.
pub fn context_exit() {
    CONTEXTS.with(|count| {
        let n = count.get();
        debug_assert!(n > 0, "context_exit without a matching context_enter");
        count.set(n.saturating_sub(1));
        if n <= 1 {
            finalize();
        }
    });
}

// ---------------------------------------------------------------------------
// Ambient error flag
// ---------------------------------------------------------------------------

/// Park an error in the ambient flag, replacing any earlier one.
pub fn err_set(err: VmError) {
    with_state(|st| st.pending = Some(err));
}

/// Whether a failure is currently parked.
pub fn err_occurred() -> bool {
    with_state(|st| st.pending.is_some())
}

/// Fetch and clear the parked failure.
pub fn err_take() -> Option<VmError> {
    with_state(|st| st.pending.take())
}

/// Clear the parked failure without looking at it.
pub fn err_clear() {
    with_state(|st| st.pending = None);
}

/// Convenience for fallible entry points: park `err`, return null.
pub(crate) fn fail(err: VmError) -> ObjPtr {
    err_set(err);
    std::ptr::null_mut()
}

// ---------------------------------------------------------------------------
// Singletons (borrowed references)
// ---------------------------------------------------------------------------

/// The `None` singleton. Borrowed reference.
pub fn none() -> ObjPtr {
    with_state(|st| st.none)
}

/// The `True`/`False` singleton for `value`. Borrowed reference.
pub fn bool_obj(value: bool) -> ObjPtr {
    with_state(|st| if value { st.true_ } else { st.false_ })
}

/// The cached empty positional container. Borrowed reference.
pub fn empty_tuple() -> ObjPtr {
    with_state(|st| st.empty_tuple)
}

/// The cached empty keyword container. Borrowed reference.
pub fn empty_dict() -> ObjPtr {
    with_state(|st| st.empty_dict)
}

// ---------------------------------------------------------------------------
// Import machinery and search path
// ---------------------------------------------------------------------------

/// Import a module by exact name. Returns a new reference, or null with an
/// `ImportError` parked. Dotted names fail here; prefix stripping is the
/// resolver's business, not the importer's.
pub fn import_module(name: &str) -> ObjPtr {
    if let Some(cached) = with_state(|st| {
        st.modules
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, p)| *p)
    }) {
        unsafe { incref(cached) };
        return cached;
    }

    // Built outside the state borrow: module builders allocate objects and
    // may consult the state themselves.
    let (key, module): (&'static str, ObjPtr) = match name {
        "random" => ("random", modules::random::build()),
        "datetime" => ("datetime", modules::datetime::build()),
        "sys" => ("sys", build_sys()),
        _ => return fail(VmError::import(format!("no module named '{name}'"))),
    };

    with_state(|st| st.modules.push((key, module)));
    unsafe { incref(module) };
    module
}

fn build_sys() -> ObjPtr {
    let module = object::module_new("sys");
    let path = with_state(|st| st.search_path);
    unsafe {
        incref(path);
        object::module_set(module, "path", path);
    }
    module
}

/// Look up a top-level builtin. Returns a new reference, or null if there
/// is no builtin of that name; the ambient flag is not touched.
pub fn lookup_builtin(name: &str) -> ObjPtr {
    match modules::builtins::lookup(name) {
        Some(def) => object::alloc(Payload::Builtin(def)),
        None => std::ptr::null_mut(),
    }
}

/// Prepend an entry to the module search path. Returns false with a
/// `ValueError` parked if the path cannot be represented as a runtime
/// string (embedded NUL).
pub fn path_prepend(path: &str) -> bool {
    if path.contains('\0') {
        err_set(VmError::value(
            "search path entries must not contain NUL bytes",
        ));
        return false;
    }
    let entry = alloc_str(path);
    let list = with_state(|st| st.search_path);
    unsafe { object::list_prepend(list, entry) };
    true
}

// ---------------------------------------------------------------------------
// Random generator shared by the `random` module
// ---------------------------------------------------------------------------

pub(crate) fn rng_seed(seed: u64) {
    with_state(|st| st.rng = StdRng::seed_from_u64(seed));
}

pub(crate) fn rng_reseed_entropy() {
    let seed = rand::rng().random();
    with_state(|st| st.rng = StdRng::seed_from_u64(seed));
}

pub(crate) fn rng_next_f64() -> f64 {
    with_state(|st| st.rng.random())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ref_count, str_value, type_name};
    use pretty_assertions::assert_eq;

    #[test]
    fn error_flag_round_trip() {
        err_clear();
        assert!(!err_occurred());
        err_set(VmError::value("bad"));
        assert!(err_occurred());
        let taken = err_take().unwrap();
        assert_eq!(taken.message, "bad");
        assert!(!err_occurred());
    }

    #[test]
    fn singletons_are_stable_across_lookups() {
        assert_eq!(none(), none());
        assert_eq!(bool_obj(true), bool_obj(true));
        assert_ne!(bool_obj(true), bool_obj(false));
    }

    #[test]
    fn import_caches_and_hands_out_fresh_references() {
        unsafe {
            let a = import_module("random");
            let base = ref_count(a);
            let b = import_module("random");
            assert_eq!(a, b);
            assert_eq!(ref_count(a), base + 1);
            decref(a);
            decref(b);
        }
    }

    #[test]
    fn unknown_module_parks_import_error() {
        err_clear();
        let p = import_module("definitely_not_a_module");
        assert!(p.is_null());
        let err = err_take().unwrap();
        assert_eq!(err.kind, crate::ExcKind::Import);
    }

    #[test]
    fn path_prepend_is_visible_through_sys() {
        unsafe {
            assert!(path_prepend("/opt/first"));
            assert!(path_prepend("/opt/second"));
            let sys = import_module("sys");
            let path = crate::object::getattr(sys, "path");
            assert_eq!(type_name(path), "list");
            let it = crate::call::get_iter(path);
            let head = crate::call::iter_next(it);
            assert_eq!(str_value(head), Some("/opt/second".to_string()));
            for p in [head, it, path, sys] {
                decref(p);
            }
        }
    }

    #[test]
    fn nul_byte_in_path_is_rejected() {
        err_clear();
        assert!(!path_prepend("bad\0path"));
        assert_eq!(err_take().unwrap().kind, crate::ExcKind::Value);
    }

    #[test]
    fn inner_context_exit_keeps_the_state_alive() {
        context_enter();
        assert!(path_prepend("/opt/outer"));
        context_enter();
        context_exit();
        // The outer context's state survives the inner exit.
        assert!(is_initialized());
        unsafe {
            let sys = import_module("sys");
            let path = crate::object::getattr(sys, "path");
            let it = crate::call::get_iter(path);
            let head = crate::call::iter_next(it);
            assert_eq!(str_value(head), Some("/opt/outer".to_string()));
            for p in [head, it, path, sys] {
                decref(p);
            }
        }
        context_exit();
        assert!(!is_initialized());
    }
}
