//! Shared code-generation machinery
//!
//! The emitter produces Rust source that depends only on `midl_runtime`.
//! This module holds what the struct and interface generators share: the
//! mapping from schema types to generated Rust types, identifier
//! mangling, and the per-variable emission of count, write, and read
//! code. The declaration/implementation split lives in
//! [`crate::structure`] and [`crate::interface`].
//!
//! Generated readers accumulate into a `Default`-initialized value and
//! bail out with `?` at each failure point; fields read so far are
//! released by drop, in reverse declaration order, when the partial
//! value goes out of scope.

use crate::database::SymbolDb;
use crate::symbol::{BaseType, Complexity, Fundamental, Type, Var, VarList};
use midl_runtime::DLen;
use std::fmt::Write;

/// Rust keywords a schema identifier may collide with. `self` and
/// friends cannot be raw identifiers and get a trailing underscore
/// instead.
const RAW_FORBIDDEN: [&str; 4] = ["self", "Self", "super", "crate"];

const KEYWORDS: [&str; 38] = [
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "static", "struct", "trait", "true", "try", "type", "union",
    "unsafe", "use", "where", "while", "yield",
];

/// Emits a schema identifier as a valid Rust identifier.
pub fn field_ident(name: &str) -> String {
    if RAW_FORBIDDEN.contains(&name) {
        return format!("{name}_");
    }
    if KEYWORDS.contains(&name) {
        return format!("r#{name}");
    }
    name.to_string()
}

/// `do_thing` → `DoThing`; used to derive generated type names from
/// method names.
pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for part in name.split('_') {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.extend(chars);
        }
    }
    out
}

/// `TestIface` → `TEST_IFACE`; used for method-id constants and
/// skeleton statics.
pub fn screaming_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        out.extend(c.to_uppercase());
    }
    out
}

/// `n * expr` with the trivial factors folded away.
fn scaled(factor: usize, len_expr: &str) -> String {
    match factor {
        0 => "0".to_string(),
        1 => len_expr.to_string(),
        n => format!("{n} * {len_expr}"),
    }
}

/// How generated code reaches the value being encoded: a place
/// expression (`self.f`) or an already-borrowed binding (`item`,
/// `value`).
enum Access<'s> {
    Place(&'s str),
    Borrowed(&'s str),
}

impl Access<'_> {
    fn expr(&self) -> &str {
        match self {
            Access::Place(e) | Access::Borrowed(e) => e,
        }
    }

    /// The value as an operand to a by-value primitive write.
    fn by_value(&self) -> String {
        match self {
            Access::Place(e) => (*e).to_string(),
            Access::Borrowed(e) => format!("*{e}"),
        }
    }

    /// The value as a `&`-operand.
    fn by_ref(&self) -> String {
        match self {
            Access::Place(e) => format!("&{e}"),
            Access::Borrowed(e) => (*e).to_string(),
        }
    }
}

/// Shared emitter state: the symbol database for size resolution.
pub struct Gen<'d> {
    db: &'d SymbolDb,
}

impl<'d> Gen<'d> {
    pub fn new(db: &'d SymbolDb) -> Gen<'d> {
        Gen { db }
    }

    fn base_dlen(&self, ty: &Type) -> DLen {
        ty.base_base_size(&|name| self.db.struct_layout(name))
    }

    fn base_const(&self, ty: &Type) -> bool {
        ty.base_const_size(&|name| self.db.struct_layout(name))
    }

    /// The generated Rust type for a base, ignoring complexity.
    pub fn rust_base_type(&self, ty: &Type) -> String {
        match &ty.base {
            BaseType::Fundamental(f) => match f {
                Fundamental::Str => "String".to_string(),
                Fundamental::Msg => "Msg".to_string(),
                other => other.keyword().to_string(),
            },
            BaseType::User(name) => name.clone(),
        }
    }

    /// The generated Rust type for a field or argument.
    pub fn rust_field_type(&self, ty: &Type) -> String {
        let base = self.rust_base_type(ty);
        match ty.complexity {
            Complexity::Scalar => base,
            Complexity::Array(n) => format!("[{base}; {n}]"),
            Complexity::Seq => format!("Vec<{base}>"),
            Complexity::Optional => format!("Option<{base}>"),
        }
    }

    /// Whether generated codecs for this list touch the message iterator
    /// (child segments or nested struct codecs).
    pub fn needs_iter(&self, list: &VarList) -> bool {
        list.vars.iter().any(|var| {
            matches!(var.ty.complexity, Complexity::Seq | Complexity::Optional)
                || matches!(var.ty.base, BaseType::User(_))
        })
    }

    // ----- base value codecs -----

    fn base_write_stmt(&self, ty: &Type, access: &Access<'_>, seg: &str) -> String {
        let seg_arg = if seg == "seg" { "seg" } else { "&mut sub" };
        match &ty.base {
            BaseType::Fundamental(Fundamental::Str) => {
                format!("{seg}.write_str({});", access.by_ref())
            }
            BaseType::Fundamental(Fundamental::Msg) => {
                format!("{seg}.write_msg({}.clone());", access.expr())
            }
            BaseType::Fundamental(f) => {
                format!("{seg}.write_{}({});", f.keyword(), access.by_value())
            }
            BaseType::User(_) => format!("{}.write({seg_arg}, iter);", access.expr()),
        }
    }

    fn base_read_expr(&self, ty: &Type, seg: &str) -> String {
        let seg_arg = if seg == "seg" { "seg" } else { "&mut sub" };
        match &ty.base {
            BaseType::Fundamental(Fundamental::Str) => format!("{seg}.read_str()?"),
            BaseType::Fundamental(Fundamental::Msg) => format!("{seg}.read_msg()"),
            BaseType::Fundamental(f) => format!("{seg}.read_{}()", f.keyword()),
            BaseType::User(name) => format!("{name}::read({seg_arg}, iter)?"),
        }
    }

    /// Whether this variable contributes lines to the generated `count`.
    fn has_count_code(&self, ty: &Type) -> bool {
        match ty.complexity {
            Complexity::Scalar | Complexity::Array(_) => {
                matches!(ty.base, BaseType::User(_)) && !self.base_const(ty)
            }
            Complexity::Seq | Complexity::Optional => true,
        }
    }

    // ----- per-variable emission -----

    /// Count code for one variable, or an empty string when the variable
    /// contributes nothing dynamic. `size` is in scope at the call site.
    pub fn var_count_lines(&self, var: &Var, ind: &str) -> String {
        if !self.has_count_code(&var.ty) {
            return String::new();
        }
        let f = format!("self.{}", field_ident(&var.name));
        let nested = matches!(var.ty.base, BaseType::User(_)) && !self.base_const(&var.ty);
        let mut out = String::new();

        match var.ty.complexity {
            Complexity::Scalar => {
                let _ = writeln!(out, "{ind}size += {f}.count();");
            }
            Complexity::Array(_) => {
                let _ = writeln!(out, "{ind}for item in &{f} {{");
                let _ = writeln!(out, "{ind}    size += item.count();");
                let _ = writeln!(out, "{ind}}}");
            }
            Complexity::Seq => {
                let base = self.base_dlen(&var.ty);
                let len = format!("{f}.len()");
                if base.bytes > 0 {
                    let _ = writeln!(out, "{ind}size.bytes += {};", scaled(base.bytes, &len));
                }
                if base.submsgs > 0 {
                    let _ = writeln!(out, "{ind}size.submsgs += {};", scaled(base.submsgs, &len));
                }
                if nested {
                    let _ = writeln!(out, "{ind}for item in &{f} {{");
                    let _ = writeln!(out, "{ind}    size += item.count();");
                    let _ = writeln!(out, "{ind}}}");
                }
            }
            Complexity::Optional => {
                let base = self.base_dlen(&var.ty);
                let mut body = String::new();
                if base.bytes > 0 {
                    let _ = writeln!(body, "{ind}    size.bytes += {};", base.bytes);
                }
                if base.submsgs > 0 {
                    let _ = writeln!(body, "{ind}    size.submsgs += {};", base.submsgs);
                }
                if nested {
                    let _ = writeln!(body, "{ind}    size += value.count();");
                }
                if body.is_empty() {
                    return String::new();
                }
                if nested {
                    let _ = writeln!(out, "{ind}if let Some(value) = &{f} {{");
                } else {
                    let _ = writeln!(out, "{ind}if {f}.is_some() {{");
                }
                out.push_str(&body);
                let _ = writeln!(out, "{ind}}}");
            }
        }
        out
    }

    /// Write code for one variable.
    pub fn var_write_lines(&self, var: &Var, ind: &str) -> String {
        let f = format!("self.{}", field_ident(&var.name));
        let mut out = String::new();

        match var.ty.complexity {
            Complexity::Scalar => {
                let stmt = self.base_write_stmt(&var.ty, &Access::Place(&f), "seg");
                let _ = writeln!(out, "{ind}{stmt}");
            }
            Complexity::Array(_) => {
                let stmt = self.base_write_stmt(&var.ty, &Access::Borrowed("item"), "seg");
                let _ = writeln!(out, "{ind}for item in &{f} {{");
                let _ = writeln!(out, "{ind}    {stmt}");
                let _ = writeln!(out, "{ind}}}");
            }
            Complexity::Seq => {
                let base = self.base_dlen(&var.ty);
                let len = format!("{f}.len()");
                let stmt = self.base_write_stmt(&var.ty, &Access::Borrowed("item"), "sub");
                let _ = writeln!(out, "{ind}{{");
                let _ = writeln!(out, "{ind}    seg.write_u32({len} as u32);");
                let _ = writeln!(
                    out,
                    "{ind}    let mut sub = iter",
                );
                let _ = writeln!(
                    out,
                    "{ind}        .get_segment({}, {})",
                    scaled(base.bytes, &len),
                    scaled(base.submsgs, &len)
                );
                let _ = writeln!(out, "{ind}        .expect(\"message sized by count\");");
                let _ = writeln!(out, "{ind}    for item in &{f} {{");
                let _ = writeln!(out, "{ind}        {stmt}");
                let _ = writeln!(out, "{ind}    }}");
                let _ = writeln!(out, "{ind}}}");
            }
            Complexity::Optional => {
                let base = self.base_dlen(&var.ty);
                let stmt = self.base_write_stmt(&var.ty, &Access::Borrowed("value"), "sub");
                let _ = writeln!(out, "{ind}match &{f} {{");
                let _ = writeln!(out, "{ind}    Some(value) => {{");
                let _ = writeln!(out, "{ind}        seg.write_u8(1);");
                let _ = writeln!(
                    out,
                    "{ind}        let mut sub = iter.get_segment({}, {}).expect(\"message sized by count\");",
                    base.bytes, base.submsgs
                );
                let _ = writeln!(out, "{ind}        {stmt}");
                let _ = writeln!(out, "{ind}    }}");
                let _ = writeln!(out, "{ind}    None => seg.write_u8(0),");
                let _ = writeln!(out, "{ind}}}");
            }
        }
        out
    }

    /// Read code for one variable, assigning into a `Default`-initialized
    /// local named `value`.
    pub fn var_read_lines(&self, var: &Var, ind: &str) -> String {
        let f = format!("value.{}", field_ident(&var.name));
        let mut out = String::new();

        match var.ty.complexity {
            Complexity::Scalar => {
                let expr = self.base_read_expr(&var.ty, "seg");
                let _ = writeln!(out, "{ind}{f} = {expr};");
            }
            Complexity::Array(n) => {
                let expr = self.base_read_expr(&var.ty, "seg");
                let _ = writeln!(out, "{ind}{{");
                let _ = writeln!(out, "{ind}    let mut items = Vec::with_capacity({n});");
                let _ = writeln!(out, "{ind}    for _ in 0..{n} {{");
                let _ = writeln!(out, "{ind}        items.push({expr});");
                let _ = writeln!(out, "{ind}    }}");
                let _ = writeln!(out, "{ind}    {f} = match items.try_into() {{");
                let _ = writeln!(out, "{ind}        Ok(items) => items,");
                let _ = writeln!(
                    out,
                    "{ind}        Err(_) => unreachable!(\"loop pushed exactly {n}\"),"
                );
                let _ = writeln!(out, "{ind}    }};");
                let _ = writeln!(out, "{ind}}}");
            }
            Complexity::Seq => {
                let base = self.base_dlen(&var.ty);
                let expr = self.base_read_expr(&var.ty, "sub");
                let _ = writeln!(out, "{ind}{{");
                let _ = writeln!(out, "{ind}    let len = seg.read_u32() as usize;");
                let _ = writeln!(
                    out,
                    "{ind}    let mut sub = iter.get_segment({}, {})?;",
                    scaled(base.bytes, "len"),
                    scaled(base.submsgs, "len")
                );
                let _ = writeln!(out, "{ind}    let mut items = Vec::with_capacity(len);");
                let _ = writeln!(out, "{ind}    for _ in 0..len {{");
                let _ = writeln!(out, "{ind}        items.push({expr});");
                let _ = writeln!(out, "{ind}    }}");
                let _ = writeln!(out, "{ind}    {f} = items;");
                let _ = writeln!(out, "{ind}}}");
            }
            Complexity::Optional => {
                let base = self.base_dlen(&var.ty);
                let expr = self.base_read_expr(&var.ty, "sub");
                let _ = writeln!(out, "{ind}if seg.read_u8() != 0 {{");
                let _ = writeln!(
                    out,
                    "{ind}    let mut sub = iter.get_segment({}, {})?;",
                    base.bytes, base.submsgs
                );
                let _ = writeln!(out, "{ind}    {f} = Some({expr});");
                let _ = writeln!(out, "{ind}}}");
            }
        }
        out
    }

    /// Count lines for a whole list, each variable prefixed with a
    /// separator comment.
    pub fn varlist_count_lines(&self, list: &VarList, ind: &str) -> String {
        let mut out = String::new();
        for var in &list.vars {
            let lines = self.var_count_lines(var, ind);
            if !lines.is_empty() {
                let _ = writeln!(out, "{ind}// {}", var.name);
                out.push_str(&lines);
            }
        }
        out
    }

    pub fn varlist_write_lines(&self, list: &VarList, ind: &str) -> String {
        let mut out = String::new();
        for var in &list.vars {
            let _ = writeln!(out, "{ind}// {}", var.name);
            out.push_str(&self.var_write_lines(var, ind));
        }
        out
    }

    pub fn varlist_read_lines(&self, list: &VarList, ind: &str) -> String {
        let mut out = String::new();
        for var in &list.vars {
            let _ = writeln!(out, "{ind}// {}", var.name);
            out.push_str(&self.var_read_lines(var, ind));
        }
        out
    }

    /// Field declarations of a generated record.
    pub fn record_decl(&self, name: &str, list: &VarList) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "#[derive(Debug, Clone, Default, PartialEq)]");
        let _ = writeln!(out, "pub struct {name} {{");
        for var in &list.vars {
            let _ = writeln!(
                out,
                "    pub {}: {},",
                field_ident(&var.name),
                self.rust_field_type(&var.ty)
            );
        }
        let _ = writeln!(out, "}}");
        out
    }
}
