//! RAII ownership of one runtime reference.
//!
//! A [`Handle`] owns exactly one reference to a runtime object (or none, for
//! the null handle). Cloning takes one more reference, dropping releases
//! one; the count can never go negative through this type. Raw pointers
//! only cross the boundary through [`Handle::release`] and the crate-private
//! constructors.

use std::fmt;

use ferrule_vm as vm;
use ferrule_vm::ObjPtr;

use crate::error::{Error, Result};
use crate::iter::HandleIter;

pub struct Handle {
    ptr: ObjPtr,
}

impl Handle {
    /// Handle owning no object.
    pub fn null() -> Handle {
        Handle {
            ptr: std::ptr::null_mut(),
        }
    }

    /// Adopt a NEW reference: the caller's reference is transferred to the
    /// handle and released on drop.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live object on the current thread, and the
    /// caller must own the reference being transferred.
    pub(crate) unsafe fn from_owned(ptr: ObjPtr) -> Handle {
        Handle { ptr }
    }

    /// Wrap a BORROWED reference: the handle takes its own reference and
    /// leaves the caller's untouched.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live object on the current thread.
    pub(crate) unsafe fn from_borrowed(ptr: ObjPtr) -> Handle {
        vm::incref(ptr);
        Handle { ptr }
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Borrow the raw pointer. The handle keeps owning its reference.
    pub(crate) fn get(&self) -> ObjPtr {
        self.ptr
    }

    /// Give up ownership: the handle's reference is transferred to the
    /// caller and the drop is skipped.
    pub(crate) fn release(self) -> ObjPtr {
        let ptr = self.ptr;
        std::mem::forget(self);
        ptr
    }

    /// Current reference count of the underlying object, 0 for null.
    pub fn ref_count(&self) -> usize {
        unsafe { vm::ref_count(self.ptr) }
    }

    /// Runtime type name, `"null"` for the null handle.
    pub fn type_name(&self) -> &'static str {
        unsafe { vm::type_name(self.ptr) }
    }

    pub fn is_callable(&self) -> bool {
        unsafe { vm::is_callable(self.ptr) }
    }

    /// Named attribute of the object, as a new handle.
    pub fn attr(&self, name: &str) -> Result<Handle> {
        let value = unsafe { vm::getattr(self.ptr, name) };
        if value.is_null() {
            vm::err_clear();
            return Err(Error::ResolutionFailed {
                name: self.type_name().to_string(),
                prefix: None,
                suffix: Some(name.to_string()),
            });
        }
        Ok(unsafe { Handle::from_owned(value) })
    }

    /// Integer value of the object (either integer kind).
    pub fn num(&self) -> Result<i64> {
        unsafe { vm::int_value(self.ptr) }.ok_or_else(|| Error::TypeMismatch {
            expected: "an integer",
            got: self.type_name().to_string(),
        })
    }

    /// Float value of the object; integers coerce.
    pub fn floating(&self) -> Result<f64> {
        unsafe { vm::float_value(self.ptr) }.ok_or_else(|| Error::TypeMismatch {
            expected: "a float",
            got: self.type_name().to_string(),
        })
    }

    /// String contents of the object.
    pub fn text(&self) -> Result<String> {
        unsafe { vm::str_value(self.ptr) }.ok_or_else(|| Error::TypeMismatch {
            expected: "a string",
            got: self.type_name().to_string(),
        })
    }

    /// Iterate over the object's elements. The iterator holds a snapshot,
    /// so the source may be dropped mid-loop.
    pub fn try_iter(&self) -> Result<HandleIter> {
        let iter = unsafe { vm::get_iter(self.ptr) };
        if iter.is_null() {
            vm::err_clear();
            return Err(Error::TypeMismatch {
                expected: "an iterable",
                got: self.type_name().to_string(),
            });
        }
        Ok(HandleIter::new(unsafe { Handle::from_owned(iter) }))
    }
}

impl Default for Handle {
    fn default() -> Handle {
        Handle::null()
    }
}

impl Clone for Handle {
    fn clone(&self) -> Handle {
        unsafe { Handle::from_borrowed(self.ptr) }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        unsafe { vm::decref(self.ptr) };
    }
}

/// Identity comparison: two handles are equal when they reference the same
/// runtime object.
impl PartialEq for Handle {
    fn eq(&self, other: &Handle) -> bool {
        self.ptr == other.ptr
    }
}

impl Eq for Handle {}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("type", &self.type_name())
            .field("refs", &self.ref_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn clone_and_drop_balance_the_count() {
        let h = unsafe { Handle::from_owned(vm::alloc_int(5)) };
        assert_eq!(h.ref_count(), 1);
        let h2 = h.clone();
        assert_eq!(h.ref_count(), 2);
        drop(h2);
        assert_eq!(h.ref_count(), 1);
    }

    #[test]
    fn release_transfers_ownership() {
        let h = unsafe { Handle::from_owned(vm::alloc_str("x")) };
        let raw = h.release();
        unsafe {
            assert_eq!(vm::ref_count(raw), 1);
            vm::decref(raw);
        }
    }

    #[test]
    fn null_handle_is_inert() {
        let h = Handle::null();
        assert!(h.is_null());
        assert_eq!(h.ref_count(), 0);
        assert_eq!(h.type_name(), "null");
        assert!(h.num().is_err());
        drop(h.clone());
    }

    #[test]
    fn extraction_mismatch_names_both_types() {
        let h = unsafe { Handle::from_owned(vm::alloc_str("abc")) };
        let err = h.num().unwrap_err();
        assert_eq!(
            err,
            Error::TypeMismatch {
                expected: "an integer",
                got: "str".to_string()
            }
        );
        assert_eq!(h.text().unwrap(), "abc");
    }

    #[test]
    fn integers_coerce_to_float_but_not_back() {
        let h = unsafe { Handle::from_owned(vm::alloc_int(4)) };
        assert_eq!(h.floating().unwrap(), 4.0);
        let f = unsafe { Handle::from_owned(vm::alloc_float(4.5)) };
        assert!(f.num().is_err());
    }
}
