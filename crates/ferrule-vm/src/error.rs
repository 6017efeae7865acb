//! Runtime error values and the exception kinds they carry.
//!
//! A `VmError` is what gets parked in the thread-ambient error flag when an
//! entry point fails. The kind tags mirror the exception classes a managed
//! runtime would raise; the embedding layer maps them onto its own taxonomy.

use std::fmt;
use thiserror::Error;

/// Exception kind recorded alongside an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcKind {
    /// Module lookup failed.
    Import,
    /// Attribute lookup failed.
    Attribute,
    /// Operand or argument of the wrong type.
    Type,
    /// Right type, unacceptable value.
    Value,
    /// Iterator exhausted.
    Stop,
    /// Anything else that went wrong during a call.
    Runtime,
    /// Data crossing the callback boundary had an unexpected shape.
    Marshal,
}

impl fmt::Display for ExcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExcKind::Import => "ImportError",
            ExcKind::Attribute => "AttributeError",
            ExcKind::Type => "TypeError",
            ExcKind::Value => "ValueError",
            ExcKind::Stop => "StopIteration",
            ExcKind::Runtime => "RuntimeError",
            ExcKind::Marshal => "MarshalError",
        };
        f.write_str(name)
    }
}

/// Error raised by a runtime entry point and parked in the ambient flag.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct VmError {
    pub kind: ExcKind,
    pub message: String,
}

impl VmError {
    pub fn new(kind: ExcKind, message: impl Into<String>) -> Self {
        VmError {
            kind,
            message: message.into(),
        }
    }

    pub fn import(message: impl Into<String>) -> Self {
        Self::new(ExcKind::Import, message)
    }

    pub fn attribute(message: impl Into<String>) -> Self {
        Self::new(ExcKind::Attribute, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ExcKind::Type, message)
    }

    pub fn value(message: impl Into<String>) -> Self {
        Self::new(ExcKind::Value, message)
    }

    pub fn marshal(message: impl Into<String>) -> Self {
        Self::new(ExcKind::Marshal, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_kind_and_message() {
        let err = VmError::type_error("hex() requires an integer");
        assert_eq!(err.to_string(), "TypeError: hex() requires an integer");
    }

    #[test]
    fn kind_names_match_exception_classes() {
        assert_eq!(ExcKind::Import.to_string(), "ImportError");
        assert_eq!(ExcKind::Stop.to_string(), "StopIteration");
    }
}
