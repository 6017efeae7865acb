//! Native functions registered with the runtime and invoked back through
//! the call surface.

mod common;
use common::assert_eq;

use std::cell::Cell;
use std::collections::BTreeMap;
use std::ffi::c_void;

use ferrule::{args, Error, Handle, Runtime, ToObject};

fn add_all(positional: &[Handle], keywords: &BTreeMap<String, Handle>) -> Handle {
    let mut total = 0i64;
    for arg in positional {
        total += arg.num().unwrap_or(0);
    }
    if let Some(extra) = keywords.get("extra") {
        total += extra.num().unwrap_or(0);
    }
    total.to_object()
}

fn return_nothing(_positional: &[Handle], _keywords: &BTreeMap<String, Handle>) -> Handle {
    Handle::null()
}

fn count_up(data: *mut c_void, _positional: &[Handle], _keywords: &BTreeMap<String, Handle>) -> Handle {
    let counter = unsafe { &*(data as *const Cell<i64>) };
    counter.set(counter.get() + 1);
    counter.get().to_object()
}

#[test]
fn wrapped_function_receives_positional_and_keyword_arguments() {
    let rt = Runtime::initialize();
    let hook = rt.wrap_function(add_all);
    let result = rt.call_object(&hook, args![1, 2, extra = 10]).unwrap();
    assert_eq!(result.num().unwrap(), 13);
}

#[test]
fn callback_result_flows_back_through_extraction() {
    let rt = Runtime::initialize();
    let hook = rt.wrap_function(add_all);
    let result = rt.call_object(&hook, args![40i64, 2i64]).unwrap();
    assert_eq!(result.num().unwrap(), 42);
    assert_eq!(result.type_name(), "long");
}

#[test]
fn callback_returning_nothing_is_a_call_failure() {
    let rt = Runtime::initialize();
    let hook = rt.wrap_function(return_nothing);
    let err = rt.call_object(&hook, args![]).unwrap_err();
    match err {
        Error::CallFailed { detail, .. } => {
            assert_eq!(detail, "no result and no exception");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn context_pointer_comes_back_on_every_invocation() {
    let rt = Runtime::initialize();
    let counter = Box::new(Cell::new(0i64));
    let data = Box::into_raw(counter) as *mut c_void;
    let hook = unsafe { rt.wrap_function_with_data(count_up, data) };

    assert_eq!(rt.call_object(&hook, args![]).unwrap().num().unwrap(), 1);
    assert_eq!(rt.call_object(&hook, args![]).unwrap().num().unwrap(), 2);

    drop(hook);
    let counter = unsafe { Box::from_raw(data as *mut Cell<i64>) };
    assert_eq!(counter.get(), 2);
}

#[test]
fn hook_handle_can_be_stored_inside_the_runtime() {
    let rt = Runtime::initialize();
    let hook = rt.wrap_function(add_all);
    // Round-trip the hook through a runtime container and call it from
    // the handle that comes back out.
    let list = vec![hook.clone()].to_object();
    let fetched = list.try_iter().unwrap().next().unwrap().unwrap();
    assert_eq!(fetched, hook);
    let result = rt.call_object(&fetched, args![3, 4]).unwrap();
    assert_eq!(result.num().unwrap(), 7);
}
