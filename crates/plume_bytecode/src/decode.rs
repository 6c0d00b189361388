//! Decoder for the little-endian bytecode wire format.
//!
//! ```text
//! constants:    i32 count, then per constant: u8 tag (0 integer, 1 float, 2 string)
//!               integer: i32 | float: f64 | string: i32 length + UTF-8 bytes
//! libraries:    i32 count, then per library: u8 standard flag,
//!               i32 length + name bytes, i32 function count
//! instructions: i32 count, then per instruction: u8 opcode, 3 x i32 operands
//! ```

use std::path::Path;

use plume_foundation::{Error, ErrorKind, Result};

use crate::opcode::Opcode;
use crate::program::{Constant, Instruction, LibraryEntry, Program};

/// Smallest encoded instruction, used to bound preallocation.
const INSTRUCTION_SIZE: usize = 1 + 3 * 4;

/// Decodes a complete program.
///
/// Trailing bytes after the instruction section are an error.
pub fn decode(bytes: &[u8]) -> Result<Program> {
    if cfg!(target_endian = "big") {
        return Err(Error::new(ErrorKind::UnsupportedEndianness));
    }

    let mut reader = Reader::new(bytes);
    let constants = reader.constants()?;
    let libraries = reader.libraries()?;
    let instructions = reader.instructions()?;

    if reader.remaining() > 0 {
        return Err(Error::decode(
            reader.offset,
            format!("{} trailing bytes after instructions", reader.remaining()),
        ));
    }

    tracing::debug!(
        constants = constants.len(),
        libraries = libraries.len(),
        instructions = instructions.len(),
        "decoded program"
    );

    Ok(Program {
        constants,
        libraries,
        instructions,
    })
}

/// Reads and decodes a bytecode file.
pub fn read_file(path: impl AsRef<Path>) -> Result<Program> {
    let bytes = std::fs::read(path.as_ref())?;
    decode(&bytes)
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::decode(
                self.offset,
                format!("truncated {what}: need {n} bytes, {} left", self.remaining()),
            ));
        }
        let slice = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.array::<1>(what)?[0])
    }

    fn i32(&mut self, what: &str) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array(what)?))
    }

    fn f64(&mut self, what: &str) -> Result<f64> {
        Ok(f64::from_le_bytes(self.array(what)?))
    }

    /// Reads a non-negative i32 count or length.
    fn count(&mut self, what: &str) -> Result<usize> {
        let at = self.offset;
        let n = self.i32(what)?;
        usize::try_from(n).map_err(|_| Error::decode(at, format!("negative {what}: {n}")))
    }

    fn string(&mut self, what: &str) -> Result<String> {
        let len = self.count(what)?;
        let at = self.offset;
        let bytes = self.take(len, what)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::decode(at, format!("invalid UTF-8 in {what}: {e}")))
    }

    fn constants(&mut self) -> Result<Vec<Constant>> {
        let count = self.count("constant count")?;
        let mut constants = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            let at = self.offset;
            let constant = match self.u8("constant tag")? {
                0 => Constant::Integer(self.i32("integer constant")?),
                1 => Constant::Float(self.f64("float constant")?),
                2 => Constant::String(self.string("string constant")?),
                tag => {
                    return Err(Error::decode(at, format!("unknown constant tag {tag}")));
                }
            };
            constants.push(constant);
        }
        Ok(constants)
    }

    fn libraries(&mut self) -> Result<Vec<LibraryEntry>> {
        let count = self.count("library count")?;
        let mut libraries = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            let standard = self.u8("library flag")? != 0;
            let name = self.string("library name")?;
            let function_count = self.count("library function count")?;
            libraries.push(LibraryEntry {
                standard,
                name,
                function_count,
            });
        }
        Ok(libraries)
    }

    fn instructions(&mut self) -> Result<Vec<Instruction>> {
        let count = self.count("instruction count")?;
        let mut instructions = Vec::with_capacity(count.min(self.remaining() / INSTRUCTION_SIZE));
        for _ in 0..count {
            let at = self.offset;
            let byte = self.u8("opcode")?;
            let opcode = Opcode::try_from(byte)
                .map_err(|_| Error::decode(at, format!("unknown opcode {byte}")))?;
            let operands = [
                self.i32("operand")?,
                self.i32("operand")?,
                self.i32("operand")?,
            ];
            instructions.push(Instruction { opcode, operands });
        }
        Ok(instructions)
    }
}
