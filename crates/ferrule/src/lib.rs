//! Embedding layer for invoking functions and objects inside a
//! reference-counted dynamic runtime from native code.
//!
//! The runtime exposes a raw-pointer surface with manual reference counts
//! and a thread-ambient error flag; this crate wraps that surface so that
//! native code never touches a raw pointer or the flag:
//!
//! - [`Handle`] owns exactly one runtime reference, released on drop
//! - [`Runtime`] resolves dotted names (`"datetime.datetime"`), dispatches
//!   calls, and registers native callbacks
//! - [`args!`] builds mixed positional/keyword argument lists at call sites
//! - every runtime-side exception is captured into an [`Error`] variant
//!   and the flag is cleared before control returns
//!
//! ```
//! use ferrule::{args, Runtime};
//!
//! # fn main() -> ferrule::Result<()> {
//! let rt = Runtime::initialize();
//! let text = rt.call("hex", args![255])?.text()?;
//! assert_eq!(text, "0xff");
//!
//! let dt = rt.call("datetime.datetime", args![2003, 8, 4, 12, 30, 45])?;
//! assert_eq!(rt.call_method(&dt, "isoformat", args![])?.text()?, "2003-08-04T12:30:45");
//! # Ok(())
//! # }
//! ```
//!
//! Everything here is single-threaded by construction: the runtime's
//! reference counts are nonatomic, so handles and the context itself are
//! neither `Send` nor `Sync`.

mod call;
mod convert;
mod error;
mod handle;
mod invoke;
mod iter;
mod resolver;
mod runtime;
mod trampoline;

pub use call::Arg;
pub use convert::ToObject;
pub use error::{Error, Result};
pub use handle::Handle;
pub use iter::HandleIter;
pub use runtime::Runtime;
pub use trampoline::{NativeFn, NativeFnWithData};
