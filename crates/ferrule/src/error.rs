//! Error taxonomy of the embedding layer.
//!
//! Every fallible operation returns one of these; runtime-side exceptions
//! are captured into the relevant variant's detail text rather than printed
//! or left pending on the runtime side.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A dotted name could not be turned into a runtime object. When
    /// `prefix` is set, some leading portion imported as a module but the
    /// remaining attribute path (`suffix`) did not resolve against it.
    ResolutionFailed {
        name: String,
        prefix: Option<String>,
        suffix: Option<String>,
    },
    /// The resolved object cannot be the target of a call.
    NotCallable { target: String },
    /// The call was dispatched and the runtime reported a failure, or
    /// returned nothing at all.
    CallFailed { target: String, detail: String },
    /// A value extraction (`num`, `floating`, `text`, iteration) found an
    /// object of the wrong runtime type.
    TypeMismatch {
        expected: &'static str,
        got: String,
    },
    /// Data crossing the native-callback boundary had an unexpected shape.
    Marshal(String),
    /// A module search path entry was rejected by the runtime.
    Path(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ResolutionFailed {
                name,
                prefix,
                suffix,
            } => match (prefix, suffix) {
                (Some(p), Some(s)) => write!(
                    f,
                    "cannot resolve '{name}': imported '{p}' but '{s}' is not reachable from it"
                ),
                (None, Some(s)) => write!(f, "cannot resolve attribute '{s}' of {name}"),
                _ => write!(
                    f,
                    "cannot resolve '{name}': no importable prefix and no matching builtin"
                ),
            },
            Error::NotCallable { target } => write!(f, "'{target}' is not callable"),
            Error::CallFailed { target, detail } => {
                write!(f, "call to '{target}' failed: {detail}")
            }
            Error::TypeMismatch { expected, got } => {
                write!(f, "expected {expected}, got {got}")
            }
            Error::Marshal(detail) => write!(f, "callback marshalling failed: {detail}"),
            Error::Path(detail) => write!(f, "module search path rejected: {detail}"),
        }
    }
}

impl std::error::Error for Error {}
