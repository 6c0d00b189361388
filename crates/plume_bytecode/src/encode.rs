//! Encoder for the bytecode wire format. The inverse of [`decode`](crate::decode).

use std::io::Write;

use plume_foundation::Result;

use crate::program::{Constant, Program};

/// Encodes a program to bytes.
#[must_use]
pub fn encode(program: &Program) -> Vec<u8> {
    let mut out = Vec::new();

    put_len(&mut out, program.constants.len());
    for constant in &program.constants {
        out.push(constant.tag());
        match constant {
            Constant::Integer(n) => out.extend_from_slice(&n.to_le_bytes()),
            Constant::Float(f) => out.extend_from_slice(&f.to_le_bytes()),
            Constant::String(s) => put_str(&mut out, s),
        }
    }

    put_len(&mut out, program.libraries.len());
    for library in &program.libraries {
        out.push(u8::from(library.standard));
        put_str(&mut out, &library.name);
        put_len(&mut out, library.function_count);
    }

    put_len(&mut out, program.instructions.len());
    for instruction in &program.instructions {
        out.push(instruction.opcode.byte());
        for operand in instruction.operands {
            out.extend_from_slice(&operand.to_le_bytes());
        }
    }

    out
}

/// Encodes a program into a writer.
pub fn write_to(program: &Program, mut writer: impl Write) -> Result<()> {
    writer.write_all(&encode(program))?;
    Ok(())
}

fn put_len(out: &mut Vec<u8>, len: usize) {
    let len = i32::try_from(len).unwrap_or(i32::MAX);
    out.extend_from_slice(&len.to_le_bytes());
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    put_len(out, s.len());
    out.extend_from_slice(s.as_bytes());
}
