//! Emission for interface declarations
//!
//! An interface turns into:
//!
//! - one `u8` method-id constant per function, numbered from the parent
//!   chain's total function count so ids partition `[0, total)` across
//!   the inheritance chain;
//! - an in-args record and an out-args record per function, each with a
//!   serializer and a deserializer. The in-args message opens with the
//!   1-byte method id in its root segment; replies open with the OK
//!   status byte, which is what keeps the canonical `[0x01]` error
//!   reply distinguishable;
//! - a skeleton: a static stub table indexed by method id across the
//!   whole chain, through which the servant runtime decodes and
//!   replies.

use crate::codegen::{Gen, camel_case, screaming_snake};
use crate::database::SymbolDb;
use crate::symbol::{InterfaceDef, SymbolKind, VarList};
use std::fmt::{self, Write};

/// One method of the flattened inheritance chain, in method-id order.
struct ChainMethod {
    /// Interface the method was declared on.
    owner: String,
    fn_name: String,
    has_in_args: bool,
}

/// Flattens an interface's inheritance chain into method-id order:
/// oldest ancestor's functions first.
fn chain_methods(db: &SymbolDb, name: &str, iface: &InterfaceDef) -> Vec<ChainMethod> {
    let mut lineage: Vec<(&str, &InterfaceDef)> = vec![(name, iface)];
    let mut parent = iface.parent.as_deref();
    while let Some(pname) = parent {
        match db.global(pname).map(|s| &s.kind) {
            Some(SymbolKind::Interface(p)) => {
                lineage.push((pname, p));
                parent = p.parent.as_deref();
            }
            _ => panic!("{pname:?} is not a resolved interface"),
        }
    }

    let mut methods = Vec::new();
    for (owner, def) in lineage.into_iter().rev() {
        for f in &def.fns {
            methods.push(ChainMethod {
                owner: owner.to_string(),
                fn_name: f.name.clone(),
                has_in_args: !f.args_in.is_empty(),
            });
        }
    }
    methods
}

fn args_type_name(owner: &str, fn_name: &str, dir: &str) -> String {
    format!("{owner}{}{dir}", camel_case(fn_name))
}

fn method_id_const(owner: &str, fn_name: &str) -> String {
    format!(
        "{}_{}_ID",
        screaming_snake(owner),
        screaming_snake(fn_name)
    )
}

/// Writes the decl-sink text: method-id constants and the in/out args
/// record types.
pub fn iface_decl(
    out: &mut String,
    cg: &Gen<'_>,
    db: &SymbolDb,
    name: &str,
    iface: &InterfaceDef,
) -> fmt::Result {
    writeln!(out, "// Interface {name}")?;
    writeln!(out)?;

    let id_base = db.interface_id_base(iface);
    for (i, f) in iface.fns.iter().enumerate() {
        writeln!(
            out,
            "pub const {}: u8 = {};",
            method_id_const(name, &f.name),
            id_base + i
        )?;
    }
    if !iface.fns.is_empty() {
        writeln!(out)?;
    }

    for f in iface.fns.iter() {
        out.push_str(&cg.record_decl(&args_type_name(name, &f.name, "In"), &f.args_in));
        writeln!(out)?;
        out.push_str(&cg.record_decl(&args_type_name(name, &f.name, "Out"), &f.args_out));
        writeln!(out)?;
    }
    Ok(())
}

/// Writes one args record's codec impl. `prefix_expr` is the method-id
/// constant for in-args, or the OK status for out-args.
fn arglist_impl(
    out: &mut String,
    cg: &Gen<'_>,
    type_name: &str,
    list: &VarList,
    prefix_expr: &str,
    create_fn: &str,
    read_fn: &str,
) -> fmt::Result {
    let base = list.base_size;

    writeln!(out, "impl {type_name} {{")?;

    // Serializer: the prefix byte shares the root segment with the
    // args' base footprint.
    writeln!(out, "    pub fn {create_fn}(&self) -> Msg {{")?;
    if list.const_size {
        writeln!(
            out,
            "        let size = DLen {{ bytes: 1 + {}, submsgs: {} }};",
            base.bytes, base.submsgs
        )?;
    } else {
        writeln!(
            out,
            "        let mut size = DLen {{ bytes: 1 + {}, submsgs: {} }};",
            base.bytes, base.submsgs
        )?;
        out.push_str(&cg.varlist_count_lines(list, "        "));
    }
    writeln!(out, "        let mut msg = Msg::new(size.bytes, size.submsgs);")?;
    writeln!(out, "        {{")?;
    writeln!(out, "            let mut iter = MsgIter::new(&mut msg);")?;
    writeln!(
        out,
        "            let mut seg = iter.get_segment(1 + {}, {}).expect(\"message sized by count\");",
        base.bytes, base.submsgs
    )?;
    writeln!(out, "            seg.write_u8({prefix_expr});")?;
    let write_lines = cg.varlist_write_lines(list, "            ");
    if !write_lines.is_empty() {
        out.push_str(&write_lines);
    }
    writeln!(out, "        }}")?;
    writeln!(out, "        msg")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;

    // Deserializer: prefix check, then the base segment, then a fully
    // consumed iterator.
    writeln!(
        out,
        "    pub fn {read_fn}(msg: &mut Msg) -> Result<{type_name}, DecodeError> {{"
    )?;
    writeln!(out, "        let mut iter = MsgIter::new(msg);")?;
    writeln!(out, "        let mut seg = iter.get_segment(1, 0)?;")?;
    writeln!(out, "        if seg.read_u8() != {prefix_expr} {{")?;
    writeln!(out, "            return Err(DecodeError::BadPrefix);")?;
    writeln!(out, "        }}")?;
    if list.is_empty() {
        writeln!(out, "        let value = {type_name}::default();")?;
    } else {
        writeln!(
            out,
            "        let mut seg = iter.get_segment({}, {})?;",
            base.bytes, base.submsgs
        )?;
        writeln!(out, "        let mut value = {type_name}::default();")?;
        out.push_str(&cg.varlist_read_lines(list, "        "));
    }
    writeln!(out, "        if !iter.at_end() {{")?;
    writeln!(out, "            return Err(DecodeError::TrailingData);")?;
    writeln!(out, "        }}")?;
    writeln!(out, "        Ok(value)")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)
}

/// Writes the impl-sink text: the skeleton table plus each function's
/// args codecs.
pub fn iface_impl(
    out: &mut String,
    cg: &Gen<'_>,
    db: &SymbolDb,
    name: &str,
    iface: &InterfaceDef,
) -> fmt::Result {
    writeln!(out, "// Interface {name}")?;
    writeln!(out)?;

    let methods = chain_methods(db, name, iface);
    let scream = screaming_snake(name);

    // Skeleton: one stub per method id, ancestors included.
    writeln!(
        out,
        "static {scream}_STUBS: [MethodStub; {}] = [",
        methods.len()
    )?;
    for m in &methods {
        let in_ty = args_type_name(&m.owner, &m.fn_name, "In");
        let out_ty = args_type_name(&m.owner, &m.fn_name, "Out");
        writeln!(out, "    MethodStub {{")?;
        if m.has_in_args {
            writeln!(
                out,
                "        read_msg: Some(|msg| {in_ty}::read_msg(msg).map(|args| Box::new(args) as Box<dyn Any>)),"
            )?;
        } else {
            writeln!(out, "        read_msg: None,")?;
        }
        writeln!(out, "        create_reply: |out_args| {{")?;
        writeln!(out, "            out_args")?;
        writeln!(out, "                .downcast_ref::<{out_ty}>()")?;
        writeln!(out, "                .expect(\"out-args type\")")?;
        writeln!(out, "                .create_reply()")?;
        writeln!(out, "        }},")?;
        writeln!(out, "    }},")?;
    }
    writeln!(out, "];")?;
    writeln!(out, "pub static {scream}_SKELETON: Skeleton = Skeleton {{")?;
    writeln!(out, "    stubs: &{scream}_STUBS,")?;
    writeln!(out, "}};")?;
    writeln!(out)?;

    // Codecs for the functions declared here; inherited ones are emitted
    // with their declaring interface.
    for f in &iface.fns {
        writeln!(out, "// {name}::{}", f.name)?;
        arglist_impl(
            out,
            cg,
            &args_type_name(name, &f.name, "In"),
            &f.args_in,
            &method_id_const(name, &f.name),
            "create_msg",
            "read_msg",
        )?;
        arglist_impl(
            out,
            cg,
            &args_type_name(name, &f.name, "Out"),
            &f.args_out,
            "servant::REPLY_OK_PREFIX",
            "create_reply",
            "read_reply",
        )?;
    }
    Ok(())
}
