//! The `random` module: a seedable pseudo-random generator.
//!
//! The generator lives in the ambient state so that `seed(n)` followed by
//! `random()` is repeatable — seeding with the same value twice must yield
//! the same stream both times.

use crate::call::CallArgs;
use crate::error::VmError;
use crate::object::{
    alloc, alloc_float, module_new, module_set, type_name, BuiltinDef, ObjPtr, Payload,
};
use crate::state;

static SEED: BuiltinDef = BuiltinDef {
    name: "seed",
    func: seed,
};

static RANDOM: BuiltinDef = BuiltinDef {
    name: "random",
    func: random,
};

pub(crate) fn build() -> ObjPtr {
    let module = module_new("random");
    unsafe {
        module_set(module, "seed", alloc(Payload::Builtin(&SEED)));
        module_set(module, "random", alloc(Payload::Builtin(&RANDOM)));
    }
    module
}

/// `seed(n)` reseeds deterministically; `seed()` reseeds from entropy.
fn seed(args: &CallArgs<'_>) -> Result<ObjPtr, VmError> {
    if !args.keywords.is_empty() {
        return Err(VmError::type_error("seed() takes no keyword arguments"));
    }
    match args.positional {
        [] => {
            state::rng_reseed_entropy();
        }
        [value] => {
            let n = unsafe { crate::object::int_value(*value) }.ok_or_else(|| {
                VmError::type_error(format!(
                    "seed() requires an integer, got {}",
                    unsafe { type_name(*value) }
                ))
            })?;
            state::rng_seed(n as u64);
        }
        _ => {
            return Err(VmError::type_error(format!(
                "seed() takes at most 1 argument ({} given)",
                args.positional.len()
            )))
        }
    }
    unsafe {
        crate::object::incref(state::none());
    }
    Ok(state::none())
}

/// `random()` — next float in `[0, 1)`.
fn random(args: &CallArgs<'_>) -> Result<ObjPtr, VmError> {
    args.expect_positional("random", 0)?;
    Ok(alloc_float(state::rng_next_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{decref, float_value};

    fn no_args() -> CallArgs<'static> {
        CallArgs {
            positional: &[],
            keywords: &[],
        }
    }

    #[test]
    fn fixed_seed_repeats_the_stream() {
        unsafe {
            let s = crate::object::alloc_int(0);
            let seed_args = [s];
            let args = CallArgs {
                positional: &seed_args,
                keywords: &[],
            };

            decref(seed(&args).unwrap());
            let first = random(&no_args()).unwrap();
            decref(seed(&args).unwrap());
            let second = random(&no_args()).unwrap();

            assert_eq!(float_value(first), float_value(second));
            decref(first);
            decref(second);
            decref(s);
        }
    }

    #[test]
    fn random_is_in_unit_interval() {
        unsafe {
            let v = random(&no_args()).unwrap();
            let f = float_value(v).unwrap();
            assert!((0.0..1.0).contains(&f));
            decref(v);
        }
    }
}
