pub use pretty_assertions::assert_eq;
