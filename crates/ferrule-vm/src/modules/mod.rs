//! Built-in modules and the top-level builtin function table.

pub mod builtins;
pub mod datetime;
pub mod random;
