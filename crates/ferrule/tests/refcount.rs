//! Property tests for reference ownership and value round-trips.

use ferrule::{args, Runtime, ToObject};
use proptest::prelude::*;

proptest! {
    #[test]
    fn integers_round_trip(value in any::<i64>()) {
        let h = value.to_object();
        prop_assert_eq!(h.num().unwrap(), value);
    }

    #[test]
    fn finite_floats_round_trip(value in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
        let h = value.to_object();
        prop_assert_eq!(h.floating().unwrap(), value);
    }

    #[test]
    fn strings_round_trip(value in ".*") {
        let h = value.clone().to_object();
        prop_assert_eq!(h.text().unwrap(), value);
    }

    #[test]
    fn clones_keep_the_count_balanced(value in any::<i32>(), clones in 1usize..8) {
        let h = value.to_object();
        let copies: Vec<_> = (0..clones).map(|_| h.clone()).collect();
        prop_assert_eq!(h.ref_count(), clones + 1);
        drop(copies);
        prop_assert_eq!(h.ref_count(), 1);
    }

    #[test]
    fn call_arguments_are_always_returned_to_the_caller(value in any::<u16>()) {
        let rt = Runtime::initialize();
        let n = i64::from(value).to_object();
        let positional = [n.clone()];
        let out = rt.call_with_args("hex", &positional, &[]).unwrap();
        prop_assert_eq!(out.text().unwrap(), format!("0x{:x}L", value));
        drop(positional);
        prop_assert_eq!(n.ref_count(), 1);
    }

    #[test]
    fn hex_matches_native_formatting(value in 0i32..i32::MAX) {
        let rt = Runtime::initialize();
        let text = rt.call("hex", args![value]).unwrap().text().unwrap();
        prop_assert_eq!(text, format!("0x{:x}", value));
    }
}
