//! Recursive-descent parser for midl schemas
//!
//! Grammar:
//!
//! ```text
//! file        := decl*
//! decl        := const-decl | ref-decl | struct-decl | iface-decl
//! const-decl  := IDENT '=' (INT | STR) ';'
//! ref-decl    := 'ref' STR ';'
//! struct-decl := 'struct' IDENT '{' (type IDENT ';')* '}'
//! type        := ('array' '(' INT ')' | 'seq' | 'optional')? base
//! base        := fundamental-keyword | IDENT
//! iface-decl  := 'interface' IDENT (':' IDENT)? '{' fn-decl* '}'
//! fn-decl     := IDENT '(' varlist? ')' ':' '(' varlist? ')' ';'
//! varlist     := type IDENT (',' type IDENT)*
//! ```
//!
//! Semantic actions build symbols as declarations complete, so a type
//! reference can only resolve to something declared (or imported) before
//! it, which is also what makes size computation total: by the time a
//! struct commits, every struct it references already carries its cached
//! size pair.
//!
//! Errors are logged and parsing resynchronizes at the next declaration,
//! collecting as many diagnostics per run as possible. A run succeeds
//! iff no error was logged.

use crate::database::{SymbolDb, parse_file_if_needed};
use crate::diag::Diagnostics;
use crate::lexer::{Token, TokenKind};
use crate::symbol::{
    BaseType, Complexity, FnDef, InterfaceDef, StructDef, Symbol, SymbolKind, Type, Var, VarList,
};
use bumpalo::Bump;
use bumpalo::collections::String as BumpString;
use midl_runtime::DLen;
use std::collections::{HashMap, HashSet};
use std::mem;

fn digit_val(ch: u8) -> u32 {
    match ch {
        b'0'..=b'9' => (ch - b'0') as u32,
        b'a'..=b'f' => (ch - b'a' + 10) as u32,
        b'A'..=b'F' => (ch - b'A' + 10) as u32,
        _ => u32::MAX,
    }
}

pub struct Parser<'a, 'w, 'b> {
    db: &'a mut SymbolDb,
    diags: &'a mut Diagnostics<'w>,
    scratch: &'b Bump,
    tokens: Vec<Token<'b>>,
    pos: usize,
    /// Symbols committed so far, in declaration order.
    symbols: Vec<Symbol>,
    /// Name → index into `symbols`.
    local: HashMap<String, usize>,
    /// Names imported through `ref` declarations; resolved via the
    /// database's global index.
    imports: HashSet<String>,
}

impl<'a, 'w, 'b> Parser<'a, 'w, 'b> {
    pub fn new(
        db: &'a mut SymbolDb,
        diags: &'a mut Diagnostics<'w>,
        scratch: &'b Bump,
        tokens: Vec<Token<'b>>,
    ) -> Parser<'a, 'w, 'b> {
        Parser {
            db,
            diags,
            scratch,
            tokens,
            pos: 0,
            symbols: Vec::new(),
            local: HashMap::new(),
            imports: HashSet::new(),
        }
    }

    /// Parses the whole token stream and returns the committed symbols.
    /// Success is judged by the caller from the diagnostics error count.
    pub fn run(&mut self) -> Vec<Symbol> {
        while let Some(tok) = self.peek() {
            let result = match tok.kind {
                TokenKind::KwStruct => self.parse_struct(),
                TokenKind::KwInterface => self.parse_interface(),
                TokenKind::KwRef => self.parse_ref(),
                TokenKind::Ident => self.parse_constant(),
                TokenKind::Fundamental(_) => {
                    self.error(&format!(
                        "line {}: {} is a reserved type name",
                        tok.line, tok.text
                    ));
                    Err(())
                }
                _ => {
                    self.error(&format!(
                        "line {}: expected a declaration, found {:?}",
                        tok.line, tok.text
                    ));
                    Err(())
                }
            };
            if result.is_err() {
                self.synchronize();
            }
        }
        mem::take(&mut self.symbols)
    }

    // ----- token plumbing -----

    fn peek(&self) -> Option<Token<'b>> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token<'b>> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.peek().is_some_and(|t| t.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token<'b>, ()> {
        match self.peek() {
            Some(tok) if tok.kind == kind => {
                self.pos += 1;
                Ok(tok)
            }
            Some(tok) => {
                self.error(&format!(
                    "line {}: expected {}, found {:?}",
                    tok.line, what, tok.text
                ));
                Err(())
            }
            None => {
                self.error(&format!("unexpected end of file, expected {what}"));
                Err(())
            }
        }
    }

    fn error(&mut self, text: &str) {
        self.diags.error(text);
    }

    /// Skips forward to the next plausible declaration start: a
    /// declaration keyword at brace depth zero, or just past a top-level
    /// `;` or the closing `}` of the declaration being abandoned.
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        while let Some(tok) = self.peek() {
            match tok.kind {
                TokenKind::LBrace => {
                    depth += 1;
                    self.pos += 1;
                }
                TokenKind::RBrace => {
                    self.pos += 1;
                    if depth <= 1 {
                        return;
                    }
                    depth -= 1;
                }
                TokenKind::Semicolon if depth == 0 => {
                    self.pos += 1;
                    return;
                }
                kind if kind.starts_decl() && depth == 0 => return,
                _ => self.pos += 1,
            }
        }
    }

    /// Skips a malformed member declaration inside a `{ }` body: past the
    /// next `;`, stopping short of the closing brace.
    fn recover_in_body(&mut self) {
        while let Some(tok) = self.peek() {
            match tok.kind {
                TokenKind::Semicolon => {
                    self.pos += 1;
                    return;
                }
                TokenKind::RBrace => return,
                _ => self.pos += 1,
            }
        }
    }

    // ----- symbol index -----

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        if let Some(&idx) = self.local.get(name) {
            return Some(&self.symbols[idx]);
        }
        if self.imports.contains(name) {
            return self.db.global(name);
        }
        None
    }

    /// Looks a name up and checks its kind, reporting the kind found and
    /// the kind expected on a mismatch.
    fn lookup_expecting(&mut self, name: &str, expected: &str) -> Result<(), ()> {
        match self.lookup(name).map(Symbol::kind_name) {
            None => {
                self.error(&format!("{name} not defined in current scope"));
                Err(())
            }
            Some(found) if found != expected => {
                self.error(&format!("{name} is a {found}, expected a {expected}"));
                Err(())
            }
            Some(_) => Ok(()),
        }
    }

    fn resolve_struct_layout(&self, name: &str) -> (DLen, bool) {
        match self.lookup(name).map(|s| &s.kind) {
            Some(SymbolKind::Struct(st)) => (st.fields.base_size, st.fields.const_size),
            _ => panic!("{name:?} is not a resolved struct"),
        }
    }

    fn build_varlist(&self, vars: Vec<Var>) -> VarList {
        VarList::build(vars, &|name| self.resolve_struct_layout(name))
    }

    /// Commits a completed symbol, rejecting name clashes with the local
    /// scope, with imports, and with anything else in the global index.
    fn commit_symbol(&mut self, name: &str, kind: SymbolKind) {
        if self.local.contains_key(name) {
            self.error(&format!("name clash with {name}"));
            return;
        }
        if self.imports.contains(name) {
            self.error(&format!("name clash with imported symbol {name}"));
            return;
        }
        if self.db.global(name).is_some() {
            self.error(&format!("name clash with {name} outside current scope"));
            return;
        }
        self.local.insert(name.to_string(), self.symbols.len());
        self.symbols.push(Symbol {
            name: name.to_string(),
            kind,
        });
    }

    fn check_unique(
        &mut self,
        vars: &[Var],
        what: &str,
        owner_kind: &str,
        owner: &str,
    ) -> Result<(), ()> {
        let mut seen: HashSet<&str> = HashSet::new();
        for var in vars {
            if !seen.insert(var.name.as_str()) {
                self.error(&format!(
                    "name clash for {what} {} in {owner_kind} {owner}",
                    var.name
                ));
                return Err(());
            }
        }
        Ok(())
    }

    // ----- literal decoding -----

    /// Decodes an integer literal: decimal, `0x` hex, `0b` binary, or
    /// leading-`0` octal, with `_` separators ignored after the base
    /// prefix.
    fn read_int(&mut self, text: &str) -> Result<i64, ()> {
        let bytes = text.as_bytes();
        let (base, start) =
            if bytes.len() >= 2 && bytes[0] == b'0' && (bytes[1] == b'x' || bytes[1] == b'X') {
                (16u32, 2)
            } else if bytes.len() >= 2 && bytes[0] == b'0' && (bytes[1] == b'b' || bytes[1] == b'B')
            {
                (2, 2)
            } else if bytes.len() > 1 && bytes[0] == b'0' {
                (8, 1)
            } else {
                (10, 0)
            };

        let mut value: i64 = 0;
        let mut any_digit = false;
        for &ch in &bytes[start..] {
            if ch == b'_' {
                continue;
            }
            let digit = digit_val(ch);
            if digit >= base {
                self.error(&format!(
                    "unrecognized character {} in integer literal {text}",
                    ch as char
                ));
                return Err(());
            }
            value = match value
                .checked_mul(i64::from(base))
                .and_then(|v| v.checked_add(i64::from(digit)))
            {
                Some(v) => v,
                None => {
                    self.error(&format!("integer literal {text} overflows"));
                    return Err(());
                }
            };
            any_digit = true;
        }
        if !any_digit {
            self.error(&format!("malformed integer literal {text}"));
            return Err(());
        }
        Ok(value)
    }

    /// Decodes a raw string literal (quotes included) into the scratch
    /// arena, processing escape sequences. NUL is rejected wherever it
    /// comes from.
    fn read_string(&mut self, raw: &str) -> Result<&'b str, ()> {
        let inner = &raw[1..raw.len() - 1];
        let bytes = inner.as_bytes();
        let mut out = BumpString::new_in(self.scratch);
        let mut i = 0usize;

        while i < bytes.len() {
            if bytes[i] != b'\\' {
                // Copy the run up to the next escape as-is.
                let start = i;
                while i < bytes.len() && bytes[i] != b'\\' {
                    i += 1;
                }
                out.push_str(&inner[start..i]);
                continue;
            }

            i += 1;
            if i >= bytes.len() {
                self.error("lexical error in string literal");
                return Err(());
            }
            let esc = bytes[i];
            match esc {
                // Backslash-newline is elided.
                b'\n' => i += 1,
                b'\\' | b'?' | b'\'' | b'"' => {
                    out.push(esc as char);
                    i += 1;
                }
                b'a' => {
                    out.push('\u{07}');
                    i += 1;
                }
                b'b' => {
                    out.push('\u{08}');
                    i += 1;
                }
                b'f' => {
                    out.push('\u{0c}');
                    i += 1;
                }
                b'n' => {
                    out.push('\n');
                    i += 1;
                }
                b'r' => {
                    out.push('\r');
                    i += 1;
                }
                b't' => {
                    out.push('\t');
                    i += 1;
                }
                b'v' => {
                    out.push('\u{0b}');
                    i += 1;
                }
                b'0'..=b'7' => {
                    let mut value = 0u32;
                    let mut taken = 0;
                    while taken < 3 && i < bytes.len() && digit_val(bytes[i]) < 8 {
                        let next = value * 8 + digit_val(bytes[i]);
                        if next > 255 {
                            break;
                        }
                        value = next;
                        i += 1;
                        taken += 1;
                    }
                    if value == 0 {
                        self.error("null characters not allowed in strings");
                        return Err(());
                    }
                    out.push(char::from(value as u8));
                }
                b'x' | b'X' => {
                    i += 1;
                    let mut value = 0u32;
                    let mut taken = 0;
                    while taken < 2 && i < bytes.len() && digit_val(bytes[i]) < 16 {
                        value = value * 16 + digit_val(bytes[i]);
                        i += 1;
                        taken += 1;
                    }
                    if taken == 0 {
                        self.error("lexical error in string literal");
                        return Err(());
                    }
                    if value == 0 {
                        self.error("null characters not allowed in strings");
                        return Err(());
                    }
                    out.push(char::from(value as u8));
                }
                _ => {
                    self.error(&format!("invalid escape sequence \\{}", esc as char));
                    return Err(());
                }
            }
        }

        if out.contains('\0') {
            self.error("null characters not allowed in strings");
            return Err(());
        }
        Ok(out.into_bump_str())
    }

    // ----- declarations -----

    /// A declaration name: an identifier that is not a reserved
    /// fundamental type keyword.
    fn expect_decl_name(&mut self, what: &str) -> Result<&'b str, ()> {
        match self.peek() {
            Some(tok) if tok.kind == TokenKind::Ident => {
                self.pos += 1;
                Ok(tok.text)
            }
            Some(tok) if matches!(tok.kind, TokenKind::Fundamental(_)) => {
                self.error(&format!(
                    "line {}: {} is a reserved fundamental type name",
                    tok.line, tok.text
                ));
                Err(())
            }
            Some(tok) => {
                self.error(&format!(
                    "line {}: expected {}, found {:?}",
                    tok.line, what, tok.text
                ));
                Err(())
            }
            None => {
                self.error(&format!("unexpected end of file, expected {what}"));
                Err(())
            }
        }
    }

    fn parse_type(&mut self) -> Result<Type, ()> {
        let complexity = if self.consume(TokenKind::KwArray) {
            self.expect(TokenKind::LParen, "'(' after 'array'")?;
            let tok = self.expect(TokenKind::Int, "array length")?;
            let n = self.read_int(tok.text)?;
            self.expect(TokenKind::RParen, "')' after array length")?;
            if n <= 0 || n > i64::from(u32::MAX) {
                self.error(&format!("array length {n} out of range"));
                return Err(());
            }
            Complexity::Array(n as u32)
        } else if self.consume(TokenKind::KwSeq) {
            Complexity::Seq
        } else if self.consume(TokenKind::KwOptional) {
            Complexity::Optional
        } else {
            Complexity::Scalar
        };

        match self.peek() {
            Some(Token {
                kind: TokenKind::Fundamental(f),
                ..
            }) => {
                self.pos += 1;
                Ok(Type {
                    base: BaseType::Fundamental(f),
                    complexity,
                })
            }
            Some(tok) if tok.kind == TokenKind::Ident => {
                self.pos += 1;
                self.lookup_expecting(tok.text, "struct")?;
                Ok(Type {
                    base: BaseType::User(tok.text.to_string()),
                    complexity,
                })
            }
            Some(tok) => {
                self.error(&format!(
                    "line {}: expected a type, found {:?}",
                    tok.line, tok.text
                ));
                Err(())
            }
            None => {
                self.error("unexpected end of file, expected a type");
                Err(())
            }
        }
    }

    fn parse_field(&mut self) -> Result<Var, ()> {
        let ty = self.parse_type()?;
        let name = self.expect_decl_name("a field name")?;
        self.expect(TokenKind::Semicolon, "';' after field")?;
        Ok(Var {
            name: name.to_string(),
            ty,
        })
    }

    fn parse_struct(&mut self) -> Result<(), ()> {
        self.pos += 1; // struct
        let name = self.expect_decl_name("a struct name")?;
        self.expect(TokenKind::LBrace, "'{' after struct name")?;

        let mut vars = Vec::new();
        let mut body_ok = true;
        loop {
            if self.consume(TokenKind::RBrace) {
                break;
            }
            if self.peek().is_none() {
                self.error(&format!("unexpected end of file in struct {name}"));
                return Err(());
            }
            match self.parse_field() {
                Ok(var) => vars.push(var),
                Err(()) => {
                    body_ok = false;
                    self.recover_in_body();
                }
            }
        }
        if !body_ok {
            // Errors are already logged; drop the declaration.
            return Ok(());
        }

        self.add_struct(name, vars);
        Ok(())
    }

    fn add_struct(&mut self, name: &str, vars: Vec<Var>) {
        if self.check_unique(&vars, "field", "struct", name).is_err() {
            return;
        }
        let fields = self.build_varlist(vars);
        self.commit_symbol(name, SymbolKind::Struct(StructDef { fields }));
    }

    fn parse_varlist(&mut self) -> Result<Vec<Var>, ()> {
        let mut vars = Vec::new();
        if self.peek().is_some_and(|t| t.kind == TokenKind::RParen) {
            return Ok(vars);
        }
        loop {
            let ty = self.parse_type()?;
            let name = self.expect_decl_name("an argument name")?;
            vars.push(Var {
                name: name.to_string(),
                ty,
            });
            if !self.consume(TokenKind::Comma) {
                return Ok(vars);
            }
        }
    }

    fn parse_fn(&mut self) -> Result<FnDef, ()> {
        let name = self.expect_decl_name("a function name")?;
        self.expect(TokenKind::LParen, "'(' after function name")?;
        let args_in = self.parse_varlist()?;
        self.expect(TokenKind::RParen, "')' after in-arguments")?;
        self.expect(TokenKind::Colon, "':' between argument lists")?;
        self.expect(TokenKind::LParen, "'(' before out-arguments")?;
        let args_out = self.parse_varlist()?;
        self.expect(TokenKind::RParen, "')' after out-arguments")?;
        self.expect(TokenKind::Semicolon, "';' after function")?;

        self.check_unique(&args_in, "argument", "function", name)?;
        self.check_unique(&args_out, "out-argument", "function", name)?;

        Ok(FnDef {
            name: name.to_string(),
            args_in: self.build_varlist(args_in),
            args_out: self.build_varlist(args_out),
        })
    }

    fn parse_interface(&mut self) -> Result<(), ()> {
        self.pos += 1; // interface
        let name = self.expect_decl_name("an interface name")?;

        let parent = if self.consume(TokenKind::Colon) {
            let tok = self.expect(TokenKind::Ident, "a parent interface name")?;
            self.lookup_expecting(tok.text, "interface")?;
            Some(tok.text.to_string())
        } else {
            None
        };

        self.expect(TokenKind::LBrace, "'{' after interface name")?;

        let mut fns = Vec::new();
        let mut body_ok = true;
        loop {
            if self.consume(TokenKind::RBrace) {
                break;
            }
            if self.peek().is_none() {
                self.error(&format!("unexpected end of file in interface {name}"));
                return Err(());
            }
            match self.parse_fn() {
                Ok(f) => fns.push(f),
                Err(()) => {
                    body_ok = false;
                    self.recover_in_body();
                }
            }
        }
        if !body_ok {
            return Ok(());
        }

        self.add_interface(name, parent, fns);
        Ok(())
    }

    fn add_interface(&mut self, name: &str, parent: Option<String>, fns: Vec<FnDef>) {
        let mut clash = None;
        let mut seen: HashSet<&str> = HashSet::new();
        for f in &fns {
            if !seen.insert(f.name.as_str()) {
                clash = Some(f.name.clone());
                break;
            }
        }
        drop(seen);
        if let Some(fn_name) = clash {
            self.error(&format!(
                "name clash for function {fn_name} in interface {name}"
            ));
            return;
        }
        self.commit_symbol(name, SymbolKind::Interface(InterfaceDef { parent, fns }));
    }

    fn parse_constant(&mut self) -> Result<(), ()> {
        let name_tok = self.advance().expect("caller saw an identifier");
        let name = name_tok.text;
        self.expect(TokenKind::Assign, "'=' after constant name")?;

        match self.peek() {
            Some(tok) if tok.kind == TokenKind::Int => {
                self.pos += 1;
                let value = self.read_int(tok.text)?;
                self.expect(TokenKind::Semicolon, "';' after constant")?;
                self.commit_symbol(name, SymbolKind::IntConst(value));
                Ok(())
            }
            Some(tok) if tok.kind == TokenKind::Str => {
                self.pos += 1;
                let value = self.read_string(tok.text)?;
                self.expect(TokenKind::Semicolon, "';' after constant")?;
                self.commit_symbol(name, SymbolKind::StrConst(value.to_string()));
                Ok(())
            }
            Some(tok) => {
                self.error(&format!(
                    "line {}: expected a constant value, found {:?}",
                    tok.line, tok.text
                ));
                Err(())
            }
            None => {
                self.error("unexpected end of file, expected a constant value");
                Err(())
            }
        }
    }

    fn parse_ref(&mut self) -> Result<(), ()> {
        self.pos += 1; // ref
        let tok = self.expect(TokenKind::Str, "a file path after 'ref'")?;
        let path = self.read_string(tok.text)?;
        self.expect(TokenKind::Semicolon, "';' after reference")?;
        self.exec_ref(path)
    }

    /// Parses the referenced file if needed and imports every one of its
    /// symbols into this parser's scope. Imports are not transitive.
    fn exec_ref(&mut self, path: &str) -> Result<(), ()> {
        if parse_file_if_needed(self.db, self.diags.sink(), path).is_err() {
            self.error(&format!("could not refer to file {path}"));
            return Err(());
        }
        let names: Vec<String> = self.db.file_symbol_names(path).to_vec();
        self.imports.extend(names);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::symbol::Fundamental;

    struct Run {
        symbols: Vec<Symbol>,
        errors: usize,
        log: String,
    }

    fn parse(source: &str) -> Run {
        let mut db = SymbolDb::new();
        let mut sink = Vec::new();
        let mut diags = Diagnostics::new("test.midl", &mut sink);
        let scratch = Bump::new();
        let tokens = tokenize(source, &scratch, &mut diags);
        let mut parser = Parser::new(&mut db, &mut diags, &scratch, tokens);
        let symbols = parser.run();
        drop(parser);
        let errors = diags.error_count();
        drop(diags);
        Run {
            symbols,
            errors,
            log: String::from_utf8(sink).unwrap(),
        }
    }

    fn expect_struct(run: &Run, name: &str) -> StructDef {
        match &run
            .symbols
            .iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("no symbol {name}"))
            .kind
        {
            SymbolKind::Struct(st) => st.clone(),
            other => panic!("{name} is not a struct: {other:?}"),
        }
    }

    #[test]
    fn test_struct_with_every_complexity() {
        let run = parse(
            "struct Everything\n{\n    u8 a;\n    array(4) u16 b;\n    seq i32 c;\n    optional str d;\n    msg m;\n}\n",
        );
        assert_eq!(run.errors, 0, "{}", run.log);
        let st = expect_struct(&run, "Everything");
        assert_eq!(st.fields.vars.len(), 5);
        assert_eq!(st.fields.base_size, DLen::new(1 + 8 + 4 + 1, 1));
        assert!(!st.fields.const_size);
        assert_eq!(st.fields.vars[1].ty.complexity, Complexity::Array(4));
    }

    #[test]
    fn test_const_size_struct() {
        let run = parse("struct P { u32 x; u32 y; }");
        assert_eq!(run.errors, 0, "{}", run.log);
        let st = expect_struct(&run, "P");
        assert_eq!(st.fields.base_size, DLen::new(8, 0));
        assert!(st.fields.const_size);
    }

    #[test]
    fn test_nested_struct_sizes() {
        let run =
            parse("struct Inner { u16 a; }\nstruct Outer { Inner one; array(3) Inner many; }");
        assert_eq!(run.errors, 0, "{}", run.log);
        let outer = expect_struct(&run, "Outer");
        assert_eq!(outer.fields.base_size, DLen::new(2 + 6, 0));
        assert!(outer.fields.const_size);
    }

    #[test]
    fn test_unknown_type_reference() {
        let run = parse("struct S { Missing m; }");
        assert_eq!(run.errors, 1);
        assert!(run.log.contains("Missing not defined in current scope"));
        assert!(run.symbols.is_empty());
    }

    #[test]
    fn test_forward_reference_is_rejected() {
        // Declarations resolve backward only; S cannot use T before T is
        // declared.
        let run = parse("struct S { T t; }\nstruct T { u8 x; }");
        assert_eq!(run.errors, 1);
        assert!(run.symbols.iter().any(|s| s.name == "T"));
        assert!(!run.symbols.iter().any(|s| s.name == "S"));
    }

    #[test]
    fn test_self_reference_is_rejected() {
        // A struct's own name is not visible to its field types, so a
        // scalar size cycle cannot be declared at all.
        let run = parse("struct S { S inner; }");
        assert_eq!(run.errors, 1);
        assert!(run.log.contains("S not defined in current scope"));
    }

    #[test]
    fn test_wrong_kind_reference() {
        let run = parse("interface I { f() : (); }\nstruct S { I bad; }");
        assert_eq!(run.errors, 1);
        assert!(run.log.contains("I is a interface, expected a struct"));
    }

    #[test]
    fn test_field_name_clash() {
        let run = parse("struct S { u8 x; u16 x; }");
        assert_eq!(run.errors, 1);
        assert!(run.log.contains("name clash for field x in struct S"));
    }

    #[test]
    fn test_symbol_name_clash() {
        let run = parse("struct S { u8 x; }\nstruct S { u16 y; }");
        assert_eq!(run.errors, 1);
        assert!(run.log.contains("name clash with S"));
        assert_eq!(run.symbols.len(), 1);
    }

    #[test]
    fn test_reserved_name() {
        let run = parse("struct u32 { u8 x; }");
        assert!(run.errors >= 1);
        assert!(run.log.contains("reserved fundamental type name"));
    }

    #[test]
    fn test_interface_and_inheritance() {
        let run = parse(
            "interface Base { ping() : (); }\ninterface Child : Base { add(i32 a, i32 b) : (i32 sum); }",
        );
        assert_eq!(run.errors, 0, "{}", run.log);
        let child = run.symbols.iter().find(|s| s.name == "Child").unwrap();
        let SymbolKind::Interface(iface) = &child.kind else {
            panic!("not an interface");
        };
        assert_eq!(iface.parent.as_deref(), Some("Base"));
        assert_eq!(iface.fns.len(), 1);
        assert_eq!(iface.fns[0].args_in.vars.len(), 2);
        assert_eq!(iface.fns[0].args_in.base_size, DLen::new(8, 0));
        assert_eq!(iface.fns[0].args_out.base_size, DLen::new(4, 0));
    }

    #[test]
    fn test_unknown_parent_interface() {
        let run = parse("interface Child : Nowhere { f() : (); }");
        assert_eq!(run.errors, 1);
        assert!(run.log.contains("Nowhere not defined in current scope"));
    }

    #[test]
    fn test_argument_name_clash() {
        let run = parse("interface I { f(u8 a, u16 a) : (); }");
        assert_eq!(run.errors, 1);
        assert!(run.log.contains("name clash for argument a in function f"));
    }

    #[test]
    fn test_constants() {
        let run = parse(
            "answer = 42;\nversion = 0x2A;\nbits = 0b101_010;\noct = 052;\ngreeting = \"hi\\n\";",
        );
        assert_eq!(run.errors, 0, "{}", run.log);
        let values: Vec<_> = run
            .symbols
            .iter()
            .map(|s| match &s.kind {
                SymbolKind::IntConst(v) => format!("{}={v}", s.name),
                SymbolKind::StrConst(v) => format!("{}={v:?}", s.name),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            values,
            vec![
                "answer=42",
                "version=42",
                "bits=42",
                "oct=42",
                "greeting=\"hi\\n\"",
            ]
        );
    }

    #[test]
    fn test_bad_integer_digit() {
        let run = parse("x = 0b102;");
        assert_eq!(run.errors, 1);
        assert!(run.log.contains("unrecognized character 2"));
    }

    #[test]
    fn test_string_escapes() {
        let run = parse(r#"s = "tab\there \x41 \101 \\ \" end";"#);
        assert_eq!(run.errors, 0, "{}", run.log);
        let SymbolKind::StrConst(v) = &run.symbols[0].kind else {
            panic!("not a string constant");
        };
        assert_eq!(v, "tab\there A A \\ \" end");
    }

    #[test]
    fn test_string_escape_errors() {
        assert!(parse(r#"s = "\q";"#).log.contains("invalid escape sequence"));
        assert!(
            parse(r#"s = "\x0";"#)
                .log
                .contains("null characters not allowed")
        );
        assert!(
            parse(r#"s = "\0";"#)
                .log
                .contains("null characters not allowed")
        );
    }

    #[test]
    fn test_recovery_collects_multiple_errors() {
        let run = parse("struct A { u8 }\nstruct B { Missing m; }\nstruct C { u8 ok; }");
        assert!(run.errors >= 2);
        // C still parses after two bad declarations.
        assert!(run.symbols.iter().any(|s| s.name == "C"));
    }

    #[test]
    fn test_fundamental_keywords_cover_ordinals() {
        for (word, ordinal) in [("u8", 1), ("i64", 8), ("f32", 9), ("msg", 12)] {
            assert_eq!(Fundamental::from_keyword(word).unwrap().ordinal(), ordinal);
        }
    }
}
