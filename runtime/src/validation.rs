//! WASM module validation — plugin ABI compatibility checks.
//!
//! Validates that a compiled module meets the gangplank ABI before the
//! sandbox will instantiate it. Checks:
//!
//! 1. Required exports present with correct signatures
//! 2. Guest function exports (`__gp_fn_*`) use handle-only signatures
//! 3. All imports come from the `gangplank_host` module
//! 4. No WASI imports
//! 5. Memory export present
//!
//! Absence of a *required* export is fatal at instantiation time; absence
//! of an optional `__gp_fn_*` export merely means the capability is not
//! offered.

use wasmtime::{ExternType, Module, ValType};

use crate::error::RuntimeError;

/// Name of the guest's exported linear memory.
pub const MEMORY_EXPORT: &str = "memory";
/// Name of the guest's exported allocator: `(len: i32) -> fat_ptr: i64`.
pub const MALLOC_EXPORT: &str = "__gp_malloc";
/// Name of the guest's exported deallocator: `(fat_ptr: i64)`.
pub const FREE_EXPORT: &str = "__gp_free";
/// Name of the guest's resolution entry point:
/// `(placeholder: i64, result_or_null: i64)`.
pub const RESOLVE_EXPORT: &str = "__gp_resolve_async";
/// Prefix of invocable guest function exports: `(i64...) -> i64`.
pub const FN_PREFIX: &str = "__gp_fn_";
/// The only import module a plugin may use.
pub const IMPORT_MODULE: &str = "gangplank_host";

/// WASM value slot in an ABI signature.
#[derive(Debug, Clone, Copy)]
enum Slot {
    I32,
    I64,
}

fn slot_matches(vt: &ValType, slot: Slot) -> bool {
    match slot {
        Slot::I32 => matches!(vt, ValType::I32),
        Slot::I64 => matches!(vt, ValType::I64),
    }
}

fn is_i64(vt: &ValType) -> bool {
    matches!(vt, ValType::I64)
}

/// Required function exports: (name, params, results).
const REQUIRED_EXPORTS: &[(&str, &[Slot], &[Slot])] = &[
    (MALLOC_EXPORT, &[Slot::I32], &[Slot::I64]),
    (FREE_EXPORT, &[Slot::I64], &[]),
    (RESOLVE_EXPORT, &[Slot::I64, Slot::I64], &[]),
];

/// Validate that a WASM module meets the gangplank ABI.
pub fn validate_module(module: &Module) -> Result<(), RuntimeError> {
    validate_exports(module)?;
    validate_imports(module)?;
    Ok(())
}

/// Check memory, required exports, and `__gp_fn_*` signatures.
fn validate_exports(module: &Module) -> Result<(), RuntimeError> {
    let has_memory = module
        .exports()
        .any(|e| e.name() == MEMORY_EXPORT && matches!(e.ty(), ExternType::Memory(_)));
    if !has_memory {
        return Err(RuntimeError::ValidationError(format!(
            "module must export '{}'",
            MEMORY_EXPORT
        )));
    }

    for &(name, expected_params, expected_results) in REQUIRED_EXPORTS {
        let export = module.exports().find(|e| e.name() == name).ok_or_else(|| {
            RuntimeError::ValidationError(format!("missing required export: {}", name))
        })?;

        let func_ty = match export.ty() {
            ExternType::Func(ft) => ft,
            _ => {
                return Err(RuntimeError::ValidationError(format!(
                    "export '{}' must be a function",
                    name
                )));
            }
        };

        let params: Vec<ValType> = func_ty.params().collect();
        let results: Vec<ValType> = func_ty.results().collect();

        let params_ok = params.len() == expected_params.len()
            && params.iter().zip(expected_params).all(|(vt, &s)| slot_matches(vt, s));
        let results_ok = results.len() == expected_results.len()
            && results.iter().zip(expected_results).all(|(vt, &s)| slot_matches(vt, s));

        if !params_ok || !results_ok {
            return Err(RuntimeError::ValidationError(format!(
                "export '{}' has wrong signature: got {} params, {} results",
                name,
                params.len(),
                results.len()
            )));
        }
    }

    // Guest functions carry handles only: any number of i64 params, one
    // i64 result (the placeholder).
    for export in module.exports() {
        if !export.name().starts_with(FN_PREFIX) {
            continue;
        }
        let func_ty = match export.ty() {
            ExternType::Func(ft) => ft,
            _ => {
                return Err(RuntimeError::ValidationError(format!(
                    "export '{}' must be a function",
                    export.name()
                )));
            }
        };
        let params: Vec<ValType> = func_ty.params().collect();
        let results: Vec<ValType> = func_ty.results().collect();
        if !params.iter().all(is_i64) || results.len() != 1 || !is_i64(&results[0]) {
            return Err(RuntimeError::ValidationError(format!(
                "guest function '{}' must take i64 handles and return one i64 placeholder",
                export.name()
            )));
        }
    }

    Ok(())
}

/// Check that all imports are functions from `gangplank_host`, none WASI.
fn validate_imports(module: &Module) -> Result<(), RuntimeError> {
    for import in module.imports() {
        let module_name = import.module();

        if module_name.starts_with("wasi") {
            return Err(RuntimeError::ValidationError(format!(
                "WASI import not allowed: {}::{}",
                module_name,
                import.name()
            )));
        }

        if module_name != IMPORT_MODULE {
            return Err(RuntimeError::ValidationError(format!(
                "import from unknown module '{}' (only '{}' allowed): {}",
                module_name,
                IMPORT_MODULE,
                import.name()
            )));
        }

        if !matches!(import.ty(), ExternType::Func(_)) {
            return Err(RuntimeError::ValidationError(format!(
                "non-function import not allowed: {}::{}",
                module_name,
                import.name()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmtime::Engine;

    fn compile(wat: &str) -> Module {
        Module::new(&Engine::default(), wat).unwrap()
    }

    const MINIMAL_VALID: &str = r#"
        (module
            (memory (export "memory") 1)
            (func (export "__gp_malloc") (param i32) (result i64)
                i64.const 0)
            (func (export "__gp_free") (param i64))
            (func (export "__gp_resolve_async") (param i64 i64))
        )
    "#;

    #[test]
    fn test_validate_minimal_valid_module() {
        validate_module(&compile(MINIMAL_VALID)).unwrap();
    }

    #[test]
    fn test_reject_missing_allocator() {
        let wat = r#"
            (module
                (memory (export "memory") 1)
                (func (export "__gp_free") (param i64))
                (func (export "__gp_resolve_async") (param i64 i64))
            )
        "#;
        let err = validate_module(&compile(wat)).unwrap_err();
        assert!(matches!(err, RuntimeError::ValidationError(_)));
    }

    #[test]
    fn test_reject_missing_memory() {
        let wat = r#"
            (module
                (func (export "__gp_malloc") (param i32) (result i64)
                    i64.const 0)
                (func (export "__gp_free") (param i64))
                (func (export "__gp_resolve_async") (param i64 i64))
            )
        "#;
        let err = validate_module(&compile(wat)).unwrap_err();
        assert!(matches!(err, RuntimeError::ValidationError(_)));
    }

    #[test]
    fn test_reject_wrong_allocator_signature() {
        // Allocator returning i32 instead of a packed i64 handle.
        let wat = r#"
            (module
                (memory (export "memory") 1)
                (func (export "__gp_malloc") (param i32) (result i32)
                    i32.const 0)
                (func (export "__gp_free") (param i64))
                (func (export "__gp_resolve_async") (param i64 i64))
            )
        "#;
        let err = validate_module(&compile(wat)).unwrap_err();
        assert!(matches!(err, RuntimeError::ValidationError(_)));
    }

    #[test]
    fn test_reject_bad_guest_function_signature() {
        let wat = r#"
            (module
                (memory (export "memory") 1)
                (func (export "__gp_malloc") (param i32) (result i64)
                    i64.const 0)
                (func (export "__gp_free") (param i64))
                (func (export "__gp_resolve_async") (param i64 i64))
                (func (export "__gp_fn_bad") (param i32) (result i64)
                    i64.const 0)
            )
        "#;
        let err = validate_module(&compile(wat)).unwrap_err();
        assert!(matches!(err, RuntimeError::ValidationError(_)));
    }

    #[test]
    fn test_accept_gangplank_host_import() {
        let wat = r#"
            (module
                (import "gangplank_host" "now" (func (result i64)))
                (memory (export "memory") 1)
                (func (export "__gp_malloc") (param i32) (result i64)
                    i64.const 0)
                (func (export "__gp_free") (param i64))
                (func (export "__gp_resolve_async") (param i64 i64))
            )
        "#;
        validate_module(&compile(wat)).unwrap();
    }

    #[test]
    fn test_reject_wasi_import() {
        let wat = r#"
            (module
                (import "wasi_snapshot_preview1" "fd_write"
                    (func (param i32 i32 i32 i32) (result i32)))
                (memory (export "memory") 1)
                (func (export "__gp_malloc") (param i32) (result i64)
                    i64.const 0)
                (func (export "__gp_free") (param i64))
                (func (export "__gp_resolve_async") (param i64 i64))
            )
        "#;
        let err = validate_module(&compile(wat)).unwrap_err();
        assert!(matches!(err, RuntimeError::ValidationError(_)));
    }

    #[test]
    fn test_reject_unknown_module_import() {
        let wat = r#"
            (module
                (import "env" "some_func" (func (result i32)))
                (memory (export "memory") 1)
                (func (export "__gp_malloc") (param i32) (result i64)
                    i64.const 0)
                (func (export "__gp_free") (param i64))
                (func (export "__gp_resolve_async") (param i64 i64))
            )
        "#;
        let err = validate_module(&compile(wat)).unwrap_err();
        assert!(matches!(err, RuntimeError::ValidationError(_)));
    }
}
