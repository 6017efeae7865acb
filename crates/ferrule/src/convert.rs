//! Conversions from native values into runtime objects.
//!
//! `i32` maps onto the runtime's narrow integer kind and `i64` onto the
//! wide kind; the two format differently (`hex`) even though they share a
//! value range here, so the distinction is preserved rather than collapsed.

use ferrule_vm as vm;

use crate::handle::Handle;

/// A native value that can be turned into a runtime object.
pub trait ToObject {
    fn to_object(&self) -> Handle;
}

impl ToObject for i32 {
    fn to_object(&self) -> Handle {
        unsafe { Handle::from_owned(vm::alloc_int(i64::from(*self))) }
    }
}

impl ToObject for i64 {
    fn to_object(&self) -> Handle {
        unsafe { Handle::from_owned(vm::alloc_long(*self)) }
    }
}

impl ToObject for f64 {
    fn to_object(&self) -> Handle {
        unsafe { Handle::from_owned(vm::alloc_float(*self)) }
    }
}

impl ToObject for bool {
    fn to_object(&self) -> Handle {
        unsafe { Handle::from_borrowed(vm::bool_obj(*self)) }
    }
}

impl ToObject for &str {
    fn to_object(&self) -> Handle {
        unsafe { Handle::from_owned(vm::alloc_str(self)) }
    }
}

impl ToObject for String {
    fn to_object(&self) -> Handle {
        unsafe { Handle::from_owned(vm::alloc_str(self)) }
    }
}

impl ToObject for Handle {
    fn to_object(&self) -> Handle {
        self.clone()
    }
}

impl ToObject for &Handle {
    fn to_object(&self) -> Handle {
        (*self).clone()
    }
}

/// A slice of handles becomes a runtime list holding its own references.
impl ToObject for &[Handle] {
    fn to_object(&self) -> Handle {
        let ptrs: Vec<vm::ObjPtr> = self.iter().map(Handle::get).collect();
        unsafe { Handle::from_owned(vm::new_list(&ptrs)) }
    }
}

impl ToObject for Vec<Handle> {
    fn to_object(&self) -> Handle {
        self.as_slice().to_object()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn integer_widths_map_to_distinct_kinds() {
        assert_eq!(255i32.to_object().type_name(), "int");
        assert_eq!(255i64.to_object().type_name(), "long");
    }

    #[test]
    fn strings_round_trip() {
        let h = "hello".to_object();
        assert_eq!(h.text().unwrap(), "hello");
    }

    #[test]
    fn list_conversion_keeps_elements_alive() {
        let a = 1i32.to_object();
        let b = 2i32.to_object();
        let elements = vec![a.clone(), b.clone()];
        let list = elements.to_object();
        assert_eq!(a.ref_count(), 3); // local, vec element, list
        drop(elements);
        drop(list);
        assert_eq!(a.ref_count(), 1);
        drop(b);
    }
}
