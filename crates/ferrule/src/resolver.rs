//! Dotted-name resolution.
//!
//! `load("a.b.c")` first tries to import the entire string as a module,
//! then progressively shorter prefixes; the part left over after the
//! longest importable prefix is walked as an attribute chain. Only when no
//! prefix imports at all does the whole name get a chance to be a builtin,
//! so a dotted name can never reach the builtin table. The two paths are
//! deliberately asymmetric: once any prefix imports, builtins are out of
//! the picture.

use ferrule_vm as vm;

use crate::error::{Error, Result};
use crate::handle::Handle;

pub(crate) fn load(name: &str) -> Result<Handle> {
    let mut prefix = name;
    loop {
        let module = vm::import_module(prefix);
        if !module.is_null() {
            let base = unsafe { Handle::from_owned(module) };
            let suffix = &name[prefix.len()..];
            if suffix.is_empty() {
                return Ok(base);
            }
            return walk(base, suffix).map_err(|_| Error::ResolutionFailed {
                name: name.to_string(),
                prefix: Some(prefix.to_string()),
                suffix: Some(suffix.trim_start_matches('.').to_string()),
            });
        }
        vm::err_clear();
        match prefix.rfind('.') {
            Some(i) => prefix = &prefix[..i],
            None => break,
        }
    }

    // The whole name, dots and all, gets one shot at the builtin table;
    // dotted names simply miss it.
    let builtin = vm::lookup_builtin(name);
    if !builtin.is_null() {
        return Ok(unsafe { Handle::from_owned(builtin) });
    }

    Err(Error::ResolutionFailed {
        name: name.to_string(),
        prefix: None,
        suffix: None,
    })
}

/// Walk a `.`-separated attribute chain from `base`. A leading dot is
/// accepted so callers can pass the raw remainder of a split name.
pub(crate) fn walk(base: Handle, chain: &str) -> Result<Handle> {
    let mut current = base;
    for part in chain.split('.').filter(|p| !p.is_empty()) {
        current = current.attr(part)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("datetime", "module")]
    #[case("datetime.datetime", "type")]
    #[case("datetime.datetime.isoformat", "method")]
    #[case("random.seed", "builtin")]
    #[case("hex", "builtin")]
    fn resolves_to_the_expected_kind(#[case] name: &str, #[case] kind: &str) {
        vm::initialize();
        assert_eq!(load(name).unwrap().type_name(), kind);
    }

    #[test]
    fn unknown_name_reports_no_prefix() {
        vm::initialize();
        assert_eq!(
            load("asdf").unwrap_err(),
            Error::ResolutionFailed {
                name: "asdf".to_string(),
                prefix: None,
                suffix: None,
            }
        );
    }

    #[test]
    fn dotted_name_never_reaches_the_builtin_table() {
        vm::initialize();
        assert_eq!(
            load("hex.x").unwrap_err(),
            Error::ResolutionFailed {
                name: "hex.x".to_string(),
                prefix: None,
                suffix: None,
            }
        );
    }

    #[test]
    fn bad_attribute_reports_the_imported_prefix() {
        vm::initialize();
        let err = load("datetime.nosuch").unwrap_err();
        assert_eq!(
            err,
            Error::ResolutionFailed {
                name: "datetime.nosuch".to_string(),
                prefix: Some("datetime".to_string()),
                suffix: Some("nosuch".to_string()),
            }
        );
    }

    #[test]
    fn failed_import_probes_leave_no_pending_error() {
        vm::initialize();
        let _ = load("datetime.datetime");
        assert!(!vm::err_occurred());
    }

    #[test]
    fn walk_accepts_a_leading_dot() {
        vm::initialize();
        let module = load("datetime").unwrap();
        let ty = walk(module, ".datetime").unwrap();
        assert_eq!(ty.type_name(), "type");
    }
}
