//! Declaration ordering for single-pass emission
//!
//! Produces the order in which a file's structs and interfaces must be
//! emitted so that every user-defined type (and parent interface) a
//! symbol depends on is emitted before it: a depth-first post-order walk
//! over the file's declaration list, guarded by a visited set keyed on
//! symbol name. Constants are traversed but produce no output.
//!
//! There is nothing to do about dependency cycles here: the parser only
//! resolves references backward, so the dependency graph is acyclic by
//! construction.

use crate::database::SymbolDb;
use crate::symbol::{BaseType, Symbol, SymbolKind, VarList};
use std::collections::HashSet;

/// Orders the symbols of a parsed file for emission. Returns symbol
/// names; look them up in the database's global index.
pub fn sequence(db: &SymbolDb, path: &str) -> Vec<String> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut order: Vec<String> = Vec::new();
    for sym in db.file_symbols(path) {
        process_symbol(db, sym, &mut visited, &mut order);
    }
    order
}

fn process_varlist(
    db: &SymbolDb,
    list: &VarList,
    visited: &mut HashSet<String>,
    order: &mut Vec<String>,
) {
    for var in &list.vars {
        if let BaseType::User(name) = &var.ty.base {
            let sym = db.global(name).expect("resolved reference is indexed");
            process_symbol(db, sym, visited, order);
        }
    }
}

fn process_symbol(
    db: &SymbolDb,
    sym: &Symbol,
    visited: &mut HashSet<String>,
    order: &mut Vec<String>,
) {
    if visited.contains(&sym.name) {
        return;
    }

    match &sym.kind {
        SymbolKind::IntConst(_) | SymbolKind::StrConst(_) => {}
        SymbolKind::Struct(st) => {
            process_varlist(db, &st.fields, visited, order);
        }
        SymbolKind::Interface(iface) => {
            if let Some(parent) = &iface.parent {
                let parent_sym = db.global(parent).expect("resolved parent is indexed");
                process_symbol(db, parent_sym, visited, order);
            }
            for f in &iface.fns {
                process_varlist(db, &f.args_in, visited, order);
                process_varlist(db, &f.args_out, visited, order);
            }
        }
    }

    visited.insert(sym.name.clone());
    if matches!(sym.kind, SymbolKind::Struct(_) | SymbolKind::Interface(_)) {
        order.push(sym.name.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::parse_file_if_needed;
    use std::fs;
    use tempfile::TempDir;

    fn sequence_source(body: &str) -> Vec<String> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.midl");
        fs::write(&path, body).unwrap();
        let path = path.to_str().unwrap();

        let mut db = SymbolDb::new();
        let mut log = Vec::new();
        parse_file_if_needed(&mut db, &mut log, path)
            .unwrap_or_else(|_| panic!("{}", String::from_utf8_lossy(&log)));
        sequence(&db, path)
    }

    #[test]
    fn test_dependencies_precede_dependents() {
        let order = sequence_source(
            "struct A { u8 x; }\nstruct B { A a; }\nstruct C { B b; A a; }\n",
        );
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_interface_argument_types_precede() {
        let order = sequence_source(
            "struct Req { u8 x; }\nstruct Rsp { u8 y; }\ninterface I { call(Req r) : (Rsp s); }\n",
        );
        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(pos("Req") < pos("I"));
        assert!(pos("Rsp") < pos("I"));
    }

    #[test]
    fn test_parent_interface_precedes_child() {
        let order = sequence_source(
            "interface Base { ping() : (); }\ninterface Child : Base { pong() : (); }\n",
        );
        assert_eq!(order, vec!["Base", "Child"]);
    }

    #[test]
    fn test_constants_are_traversed_but_not_emitted() {
        let order = sequence_source("limit = 16;\nname = \"x\";\nstruct S { u8 v; }\n");
        assert_eq!(order, vec!["S"]);
    }

    #[test]
    fn test_ordering_invariant_holds_transitively() {
        let order = sequence_source(
            "struct Leaf { u8 x; }\nstruct Mid { Leaf l; }\nstruct Top { Mid m; }\ninterface I { get(Top t) : (Leaf l); }\n",
        );
        assert_eq!(order, vec!["Leaf", "Mid", "Top", "I"]);
    }
}
