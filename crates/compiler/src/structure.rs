//! Emission for struct declarations
//!
//! For each struct the decl sink gets the record type; the impl sink
//! gets the codec: `count` (only when the field list is not constant
//! size), `write`, `read`, `serialize`, and `deserialize`, all written
//! against `midl_runtime`.

use crate::codegen::Gen;
use crate::symbol::StructDef;
use std::fmt::{self, Write};

/// Writes the record type for the decl sink.
pub fn struct_decl(out: &mut String, cg: &Gen<'_>, name: &str, st: &StructDef) -> fmt::Result {
    writeln!(out, "// {name}")?;
    out.push_str(&cg.record_decl(name, &st.fields));
    writeln!(out)
}

/// Writes the codec impl block for the impl sink.
pub fn struct_impl(out: &mut String, cg: &Gen<'_>, name: &str, st: &StructDef) -> fmt::Result {
    let fields = &st.fields;
    let base = fields.base_size;
    let needs_iter = cg.needs_iter(fields);
    let seg_param = if fields.is_empty() { "_seg" } else { "seg" };
    let iter_param = if needs_iter { "iter" } else { "_iter" };

    writeln!(out, "// {name}")?;
    writeln!(out, "impl {name} {{")?;

    // Dynamic size, only for non-constant layouts.
    if !fields.const_size {
        let count_lines = cg.varlist_count_lines(fields, "        ");
        writeln!(out, "    pub fn count(&self) -> DLen {{")?;
        if count_lines.is_empty() {
            writeln!(out, "        DLen::ZERO")?;
        } else {
            writeln!(out, "        let mut size = DLen::ZERO;")?;
            out.push_str(&count_lines);
            writeln!(out, "        size")?;
        }
        writeln!(out, "    }}")?;
        writeln!(out)?;
    }

    // write
    writeln!(
        out,
        "    pub fn write(&self, {seg_param}: &mut Segment<'_>, {iter_param}: &mut MsgIter<'_>) {{"
    )?;
    out.push_str(&cg.varlist_write_lines(fields, "        "));
    writeln!(out, "    }}")?;
    writeln!(out)?;

    // read
    writeln!(
        out,
        "    pub fn read({seg_param}: &mut Segment<'_>, {iter_param}: &mut MsgIter<'_>) -> Result<{name}, DecodeError> {{"
    )?;
    if fields.is_empty() {
        writeln!(out, "        Ok({name}::default())")?;
    } else {
        writeln!(out, "        let mut value = {name}::default();")?;
        out.push_str(&cg.varlist_read_lines(fields, "        "));
        writeln!(out, "        Ok(value)")?;
    }
    writeln!(out, "    }}")?;
    writeln!(out)?;

    // serialize
    writeln!(out, "    pub fn serialize(&self) -> Msg {{")?;
    if fields.const_size {
        writeln!(
            out,
            "        let size = DLen {{ bytes: {}, submsgs: {} }};",
            base.bytes, base.submsgs
        )?;
    } else {
        writeln!(
            out,
            "        let mut size = DLen {{ bytes: {}, submsgs: {} }};",
            base.bytes, base.submsgs
        )?;
        writeln!(out, "        size += self.count();")?;
    }
    writeln!(out, "        let mut msg = Msg::new(size.bytes, size.submsgs);")?;
    writeln!(out, "        {{")?;
    writeln!(out, "            let mut iter = MsgIter::new(&mut msg);")?;
    writeln!(
        out,
        "            let mut seg = iter.get_segment({}, {}).expect(\"message sized by count\");",
        base.bytes, base.submsgs
    )?;
    writeln!(out, "            self.write(&mut seg, &mut iter);")?;
    writeln!(out, "        }}")?;
    writeln!(out, "        msg")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;

    // deserialize
    writeln!(
        out,
        "    pub fn deserialize(msg: &mut Msg) -> Result<{name}, DecodeError> {{"
    )?;
    writeln!(out, "        let mut iter = MsgIter::new(msg);")?;
    writeln!(
        out,
        "        let mut seg = iter.get_segment({}, {})?;",
        base.bytes, base.submsgs
    )?;
    writeln!(
        out,
        "        let value = {name}::read(&mut seg, &mut iter)?;"
    )?;
    writeln!(out, "        if !iter.at_end() {{")?;
    writeln!(out, "            return Err(DecodeError::TrailingData);")?;
    writeln!(out, "        }}")?;
    writeln!(out, "        Ok(value)")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)
}
