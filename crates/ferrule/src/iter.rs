//! Iteration over runtime sequences.

use ferrule_vm as vm;

use crate::error::{Error, Result};
use crate::handle::Handle;

/// Iterator over the elements of a runtime sequence. Yields a new handle
/// per element; a runtime-side failure mid-iteration surfaces as an `Err`
/// item and ends the stream.
pub struct HandleIter {
    iter: Handle,
    done: bool,
}

impl HandleIter {
    pub(crate) fn new(iter: Handle) -> HandleIter {
        HandleIter { iter, done: false }
    }
}

impl Iterator for HandleIter {
    type Item = Result<Handle>;

    fn next(&mut self) -> Option<Result<Handle>> {
        if self.done {
            return None;
        }
        let item = unsafe { vm::iter_next(self.iter.get()) };
        if !item.is_null() {
            return Some(Ok(unsafe { Handle::from_owned(item) }));
        }
        self.done = true;
        // Null with no pending error is the clean end of the sequence.
        vm::err_take().map(|err| {
            Err(Error::CallFailed {
                target: "<iteration>".to_string(),
                detail: err.to_string(),
            })
        })
    }
}
