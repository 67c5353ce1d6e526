//! midl compiler library
//!
//! Compiles `.midl` schema files into Rust serialization and dispatch
//! code over `midl_runtime`. The pipeline: parse the root schema (and,
//! recursively, anything it references) into the symbol database, order
//! the symbols so dependencies precede their dependents, then stream the
//! generated source to two sinks: `<prefix>.decl` with the type
//! declarations of every sequenced symbol, and `<prefix>.impl` with the
//! codec implementations of the symbols the root file declares.
//! Concatenating the two files yields one self-contained module.
//!
//! ```rust,ignore
//! midlc::compile_file("proto.midl", None)?; // writes proto.decl + proto.impl
//! ```

pub mod codegen;
pub mod database;
pub mod diag;
pub mod interface;
pub mod lexer;
pub mod parser;
pub mod sequencer;
pub mod structure;
pub mod symbol;

pub use database::{FileState, SymbolDb, parse_file_if_needed};
pub use diag::{Diagnostics, Severity};
pub use parser::Parser;

use crate::codegen::Gen;
use crate::symbol::{BaseType, Fundamental, Symbol, SymbolKind};
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};

/// Default output prefix: the input basename, with directory components
/// stripped on both Unix and Windows separators.
pub fn default_output_prefix(input: &str) -> String {
    let tail = input.rsplit('/').next().unwrap_or(input);
    let tail = tail.rsplit('\\').next().unwrap_or(tail);
    tail.to_string()
}

fn is_emitted(sym: &Symbol) -> bool {
    matches!(sym.kind, SymbolKind::Struct(_) | SymbolKind::Interface(_))
}

fn uses_msg_base(sym: &Symbol) -> bool {
    let is_msg = |vars: &crate::symbol::VarList| {
        vars.vars
            .iter()
            .any(|v| matches!(v.ty.base, BaseType::Fundamental(Fundamental::Msg)))
    };
    match &sym.kind {
        SymbolKind::Struct(st) => is_msg(&st.fields),
        SymbolKind::Interface(iface) => iface
            .fns
            .iter()
            .any(|f| is_msg(&f.args_in) || is_msg(&f.args_out)),
        _ => false,
    }
}

/// Runs the whole pipeline and returns the two generated sinks as
/// strings: `(declarations, implementations)`. Diagnostics stream to
/// `log`.
pub fn compile_to_strings(
    input: &str,
    log: &mut dyn Write,
) -> Result<(String, String), String> {
    let mut db = SymbolDb::new();
    if parse_file_if_needed(&mut db, log, input).is_err() {
        return Err(format!("parsing failed for {input}"));
    }

    let order = sequencer::sequence(&db, input);
    let root_symbols = db.file_symbols(input);
    let root_has_code = root_symbols.iter().any(|s| is_emitted(s));
    let root_has_iface = root_symbols
        .iter()
        .any(|s| matches!(s.kind, SymbolKind::Interface(_)));
    let decl_uses_msg = order
        .iter()
        .filter_map(|name| db.global(name))
        .any(uses_msg_base);

    let emit = |text: std::fmt::Result| text.map_err(|e| format!("emission failed: {e}"));
    let cg = Gen::new(&db);

    // Declarations for every sequenced symbol.
    let mut decl = String::new();
    let _ = writeln!(decl, "// Generated by midlc. Do not edit.");
    let _ = writeln!(
        decl,
        "// Concatenate with the matching .impl output to form one module."
    );
    let _ = writeln!(decl);
    if root_has_code {
        let _ = writeln!(
            decl,
            "use midl_runtime::{{DLen, DecodeError, Msg, MsgIter, Segment}};"
        );
    } else if decl_uses_msg {
        let _ = writeln!(decl, "use midl_runtime::Msg;");
    }
    if root_has_iface {
        let _ = writeln!(
            decl,
            "use midl_runtime::servant::{{self, MethodStub, Skeleton}};"
        );
        let _ = writeln!(decl, "use std::any::Any;");
    }
    if root_has_code || decl_uses_msg {
        let _ = writeln!(decl);
    }
    for name in &order {
        let sym = db.global(name).expect("sequenced symbol is indexed");
        match &sym.kind {
            SymbolKind::Struct(st) => emit(structure::struct_decl(&mut decl, &cg, name, st))?,
            SymbolKind::Interface(iface) => {
                emit(interface::iface_decl(&mut decl, &cg, &db, name, iface))?
            }
            _ => {}
        }
    }

    // Implementations only for symbols the root file declares.
    let mut imp = String::new();
    let _ = writeln!(imp, "// Generated by midlc. Do not edit.");
    let _ = writeln!(
        imp,
        "// Implementation half; include after the matching .decl output."
    );
    let _ = writeln!(imp);
    for sym in &root_symbols {
        match &sym.kind {
            SymbolKind::Struct(st) => emit(structure::struct_impl(&mut imp, &cg, &sym.name, st))?,
            SymbolKind::Interface(iface) => {
                emit(interface::iface_impl(&mut imp, &cg, &db, &sym.name, iface))?
            }
            _ => {}
        }
    }

    Ok((decl, imp))
}

/// Compiles a schema file to `<prefix>.decl` and `<prefix>.impl`.
/// Diagnostics go to stderr.
pub fn compile_file(input: &str, output_prefix: Option<&str>) -> Result<(), String> {
    let prefix = match output_prefix {
        Some(p) => p.to_string(),
        None => default_output_prefix(input),
    };

    let mut stderr = io::stderr();
    let (decl, imp) = compile_to_strings(input, &mut stderr)?;

    let decl_path = format!("{prefix}.decl");
    fs::write(&decl_path, decl).map_err(|e| format!("cannot open {decl_path}: {e}"))?;
    let impl_path = format!("{prefix}.impl");
    fs::write(&impl_path, imp).map_err(|e| format!("cannot open {impl_path}: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_output_prefix() {
        assert_eq!(default_output_prefix("proto.midl"), "proto.midl");
        assert_eq!(default_output_prefix("a/b/proto.midl"), "proto.midl");
        assert_eq!(default_output_prefix("a\\b\\proto.midl"), "proto.midl");
        assert_eq!(default_output_prefix("a/b\\proto.midl"), "proto.midl");
    }

    #[test]
    fn test_compile_to_strings_end_to_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("demo.midl");
        fs::write(
            &path,
            "struct Point { u32 x; u32 y; }\ninterface Calc { increment(i32 in) : (i32 out); }\n",
        )
        .unwrap();

        let mut log = Vec::new();
        let (decl, imp) =
            compile_to_strings(path.to_str().unwrap(), &mut log).expect("compiles");

        assert!(decl.contains("pub struct Point {"));
        assert!(decl.contains("pub const CALC_INCREMENT_ID: u8 = 0;"));
        assert!(decl.contains("use midl_runtime::{DLen, DecodeError, Msg, MsgIter, Segment};"));
        assert!(decl.contains("use std::any::Any;"));

        assert!(imp.contains("impl Point {"));
        assert!(imp.contains("pub static CALC_SKELETON: Skeleton"));
        assert!(imp.contains("pub fn create_msg(&self) -> Msg {"));
    }

    #[test]
    fn test_imported_symbols_declared_but_not_implemented() {
        let dir = TempDir::new().unwrap();
        let shared = dir.path().join("shared.midl");
        fs::write(&shared, "struct Shared { u8 tag; }\n").unwrap();
        let root = dir.path().join("root.midl");
        fs::write(
            &root,
            format!(
                "ref \"{}\";\nstruct Uses {{ Shared inner; }}\n",
                shared.to_str().unwrap()
            ),
        )
        .unwrap();

        let mut log = Vec::new();
        let (decl, imp) =
            compile_to_strings(root.to_str().unwrap(), &mut log).expect("compiles");

        // The imported type is declared (it is a dependency of Uses) but
        // its codec belongs to its own generated pair.
        assert!(decl.contains("pub struct Shared {"));
        assert!(decl.contains("pub struct Uses {"));
        assert!(imp.contains("impl Uses {"));
        assert!(!imp.contains("impl Shared {"));
        // Dependencies precede dependents in the decl sink.
        assert!(decl.find("pub struct Shared").unwrap() < decl.find("pub struct Uses").unwrap());
    }

    #[test]
    fn test_compile_failure_reports() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.midl");
        fs::write(&path, "struct Broken { Missing m; }\n").unwrap();

        let mut log = Vec::new();
        let err = compile_to_strings(path.to_str().unwrap(), &mut log).unwrap_err();
        assert!(err.contains("parsing failed"));
        let text = String::from_utf8(log).unwrap();
        assert!(text.contains("Missing not defined in current scope"));
        assert!(text.contains("1 errors"));
    }

    #[test]
    fn test_compile_file_writes_both_sinks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("demo.midl");
        fs::write(&path, "struct P { u8 v; }\n").unwrap();
        let prefix = dir.path().join("out");
        let prefix = prefix.to_str().unwrap();

        compile_file(path.to_str().unwrap(), Some(prefix)).expect("compiles");
        let decl = fs::read_to_string(format!("{prefix}.decl")).unwrap();
        let imp = fs::read_to_string(format!("{prefix}.impl")).unwrap();
        assert!(decl.contains("pub struct P {"));
        assert!(imp.contains("impl P {"));
    }
}
