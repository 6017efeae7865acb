//! Variadic call front-end: the [`Arg`] wrapper and the [`args!`] macro.
//!
//! A call site builds a `Vec<Arg>` mixing positional values and `name =
//! value` keywords; the runtime entry points split it back into the two
//! containers the dispatch layer wants. Keyword order is preserved, and a
//! repeated keyword keeps the last value.

use crate::convert::ToObject;
use crate::handle::Handle;

/// One argument at a variadic call site.
pub enum Arg {
    Positional(Handle),
    Keyword(String, Handle),
}

impl Arg {
    pub fn pos(value: impl ToObject) -> Arg {
        Arg::Positional(value.to_object())
    }

    pub fn kw(name: &str, value: impl ToObject) -> Arg {
        Arg::Keyword(name.to_string(), value.to_object())
    }
}

/// Split a mixed argument list into positional and keyword parts, in
/// original order.
pub(crate) fn split_args(args: Vec<Arg>) -> (Vec<Handle>, Vec<(String, Handle)>) {
    let mut positional = Vec::new();
    let mut keywords = Vec::new();
    for arg in args {
        match arg {
            Arg::Positional(h) => positional.push(h),
            Arg::Keyword(name, h) => keywords.push((name, h)),
        }
    }
    (positional, keywords)
}

/// Build a `Vec<Arg>` from a mixed list of values and `name = value`
/// keywords:
///
/// ```
/// # use ferrule::args;
/// let a = args![2003, 8, 4];
/// let b = args![255i64, hours = 1];
/// ```
#[macro_export]
macro_rules! args {
    () => { ::std::vec::Vec::<$crate::Arg>::new() };
    ($($rest:tt)+) => {{
        let mut list = ::std::vec::Vec::<$crate::Arg>::new();
        $crate::__args_push!(list; $($rest)+);
        list
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __args_push {
    ($list:ident;) => {};
    ($list:ident; $name:ident = $value:expr, $($rest:tt)*) => {
        $list.push($crate::Arg::kw(stringify!($name), $value));
        $crate::__args_push!($list; $($rest)*);
    };
    ($list:ident; $name:ident = $value:expr) => {
        $list.push($crate::Arg::kw(stringify!($name), $value));
    };
    ($list:ident; $value:expr, $($rest:tt)*) => {
        $list.push($crate::Arg::pos($value));
        $crate::__args_push!($list; $($rest)*);
    };
    ($list:ident; $value:expr) => {
        $list.push($crate::Arg::pos($value));
    };
}
