//! The symbol database
//!
//! One record per schema file, moving through `Parsing → Parsed | Bad`,
//! plus the global symbol index. The global index is populated only when
//! a file reaches `Parsed`; a duplicate global name at that point is a
//! compiler invariant violation (the parser rejects clashes first), so it
//! panics rather than reporting.
//!
//! Recursive references between files are driven through
//! [`parse_file_if_needed`]; hitting a file that is still `Parsing`
//! is how reference cycles are detected.

use crate::diag::Diagnostics;
use crate::lexer;
use crate::parser::Parser;
use crate::symbol::{InterfaceDef, Symbol, SymbolKind};
use bumpalo::Bump;
use midl_runtime::DLen;
use std::collections::HashMap;
use std::fs;
use std::io::Write;

/// Lifecycle state of a schema file. Absence from the database means the
/// file has not been seen yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Parsing,
    Parsed,
    Bad,
}

struct FileRecord {
    state: FileState,
    /// Names of the file's symbols in declaration order; filled when the
    /// file reaches `Parsed` and stable from then on.
    symbols: Vec<String>,
}

/// File records and the global symbol index. Owned by the driver; file
/// records own their symbols for the lifetime of the database.
#[derive(Default)]
pub struct SymbolDb {
    files: HashMap<String, FileRecord>,
    index: HashMap<String, Symbol>,
}

impl SymbolDb {
    pub fn new() -> SymbolDb {
        SymbolDb::default()
    }

    pub fn file_state(&self, path: &str) -> Option<FileState> {
        self.files.get(path).map(|f| f.state)
    }

    /// Looks a symbol up in the global index.
    pub fn global(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name)
    }

    /// Declaration-ordered symbol names of a parsed file.
    ///
    /// Panics when the file is not `Parsed`; callers only reach here
    /// after a successful parse.
    pub fn file_symbol_names(&self, path: &str) -> &[String] {
        match self.files.get(path) {
            Some(record) if record.state == FileState::Parsed => &record.symbols,
            _ => panic!("file {path:?} is not parsed"),
        }
    }

    /// Declaration-ordered symbols of a parsed file.
    pub fn file_symbols(&self, path: &str) -> Vec<&Symbol> {
        self.file_symbol_names(path)
            .iter()
            .map(|name| {
                self.index
                    .get(name)
                    .expect("parsed file symbol is in the global index")
            })
            .collect()
    }

    /// Cached `(base_size, const_size)` of a struct's field list.
    ///
    /// Panics on a missing or non-struct name; the parser has already
    /// resolved every base type reference by the time sizes are asked
    /// for.
    pub fn struct_layout(&self, name: &str) -> (DLen, bool) {
        match self.index.get(name).map(|s| &s.kind) {
            Some(SymbolKind::Struct(st)) => (st.fields.base_size, st.fields.const_size),
            _ => panic!("{name:?} is not a resolved struct"),
        }
    }

    /// Method-id base of an interface: the total function count of its
    /// parent chain.
    pub fn interface_id_base(&self, iface: &InterfaceDef) -> usize {
        let mut base = 0;
        let mut parent = iface.parent.as_deref();
        while let Some(name) = parent {
            match self.index.get(name).map(|s| &s.kind) {
                Some(SymbolKind::Interface(p)) => {
                    base += p.fns.len();
                    parent = p.parent.as_deref();
                }
                _ => panic!("{name:?} is not a resolved interface"),
            }
        }
        base
    }

    /// Total function count of an interface, ancestors included.
    pub fn interface_total_fns(&self, iface: &InterfaceDef) -> usize {
        self.interface_id_base(iface) + iface.fns.len()
    }

    pub fn mark_parsing(&mut self, path: &str) {
        let prev = self.files.insert(
            path.to_string(),
            FileRecord {
                state: FileState::Parsing,
                symbols: Vec::new(),
            },
        );
        assert!(prev.is_none(), "file {path:?} registered twice");
    }

    pub fn mark_bad(&mut self, path: &str) {
        let record = self
            .files
            .get_mut(path)
            .expect("only a parsing file can go bad");
        assert_eq!(record.state, FileState::Parsing);
        record.state = FileState::Bad;
    }

    /// Transitions a parsing file to `Parsed`, taking ownership of its
    /// symbols and merging them into the global index.
    pub fn commit_parsed(&mut self, path: &str, symbols: Vec<Symbol>) {
        let record = self
            .files
            .get_mut(path)
            .expect("only a parsing file can be committed");
        assert_eq!(record.state, FileState::Parsing);
        record.state = FileState::Parsed;
        record.symbols = symbols.iter().map(|s| s.name.clone()).collect();
        for sym in symbols {
            let name = sym.name.clone();
            if self.index.insert(name.clone(), sym).is_some() {
                panic!("duplicate symbol {name:?} in global index");
            }
        }
    }
}

/// Parses `path` unless the database already knows it.
///
/// - Unknown files are lexed and parsed; errors mark them `Bad`.
/// - A file currently `Parsing` is a reference cycle.
/// - `Parsed` files are a no-op; `Bad` files fail with a note.
pub fn parse_file_if_needed(
    db: &mut SymbolDb,
    out: &mut dyn Write,
    path: &str,
) -> Result<(), ()> {
    match db.file_state(path) {
        Some(FileState::Parsed) => return Ok(()),
        Some(FileState::Parsing) => {
            Diagnostics::new(path, out).error("cyclic reference detected");
            return Err(());
        }
        Some(FileState::Bad) => {
            Diagnostics::new(path, out).message("parsing has already failed before");
            return Err(());
        }
        None => {}
    }

    db.mark_parsing(path);

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            Diagnostics::new(path, out).error(&format!("cannot open file: {err}"));
            db.mark_bad(path);
            return Err(());
        }
    };

    let scratch = Bump::new();
    let mut diags = Diagnostics::new(path, out);
    let tokens = lexer::tokenize(&source, &scratch, &mut diags);
    let mut parser = Parser::new(db, &mut diags, &scratch, tokens);
    let symbols = parser.run();
    drop(parser);
    diags.summarize();

    if diags.error_count() > 0 {
        db.mark_bad(path);
        Err(())
    } else {
        db.commit_parsed(path, symbols);
        Ok(())
    }
}
