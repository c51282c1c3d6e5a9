//! Disassembler.
use crate::{
    compile::{marker, Opcode, Segment},
    encoding::{read_graal_short, read_u16_be, read_u32_be},
};
use std::{
    convert::TryFrom,
    fmt::{self, Write as FmtWrite},
};

/// Operand following an opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Int(u32),
    /// Index into the string pool.
    Pool(u32),
    /// Float literal text.
    Float(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Opcode index, as used by jump targets.
    pub index: usize,
    /// Byte offset within the instruction segment.
    pub offset: usize,
    pub op: Opcode,
    pub operand: Option<Operand>,
}

/// Bytecode image split into its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image<'a> {
    /// Header prologue text without the length and key bytes.
    pub header: Option<&'a [u8]>,
    pub functions: Vec<(u32, &'a str)>,
    pub strings: Vec<&'a str>,
    pub code: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisasmError {
    Truncated { offset: usize },
    UnknownSegment(u32),
    UnknownOpcode { byte: u8, offset: usize },
    InvalidText { offset: usize },
    Fmt(fmt::Error),
}

impl fmt::Display for DisasmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { offset } => write!(f, "image truncated at byte {}", offset),
            Self::UnknownSegment(id) => write!(f, "unknown segment {}", id),
            Self::UnknownOpcode { byte, offset } => write!(f, "unknown opcode {} at byte {}", byte, offset),
            Self::InvalidText { offset } => write!(f, "invalid text at byte {}", offset),
            Self::Fmt(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for DisasmError {}

impl From<fmt::Error> for DisasmError {
    fn from(err: fmt::Error) -> Self {
        DisasmError::Fmt(err)
    }
}

pub struct Disassembler<'a> {
    bytecode: &'a [u8],
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self { bytecode }
    }

    pub fn print_bytecode(&self) -> Result<(), DisasmError> {
        let mut s = String::new();
        self.disassemble(&mut s)?;
        print!("{}", s);
        Ok(())
    }

    /// Split the image into header and segments.
    pub fn image(&self) -> Result<Image<'a>, DisasmError> {
        let mut image = Image::default();
        let mut cursor = self.header_len();
        if cursor > 0 {
            // Length and the trailing key bytes aren't text.
            image.header = self.bytecode.get(2..cursor.saturating_sub(10));
        }

        while cursor + 8 <= self.bytecode.len() {
            let id = read_u32_be(&self.bytecode[cursor..]).ok_or(DisasmError::Truncated { offset: cursor })?;
            let len = read_u32_be(&self.bytecode[cursor + 4..]).ok_or(DisasmError::Truncated { offset: cursor })?;
            let start = cursor + 8;
            let end = start + len as usize;
            let payload = self
                .bytecode
                .get(start..end)
                .ok_or(DisasmError::Truncated { offset: start })?;

            match Segment::from_u32(id).ok_or(DisasmError::UnknownSegment(id))? {
                Segment::Gs1Flags => {}
                Segment::FunctionNames => image.functions = read_functions(payload, start)?,
                Segment::Strings => image.strings = read_strings(payload, start)?,
                Segment::Bytecode => image.code = payload,
            }
            cursor = end;
        }

        Ok(image)
    }

    /// Decode the instruction segment.
    pub fn instructions(&self) -> Result<Vec<Instruction>, DisasmError> {
        decode(self.image()?.code)
    }

    /// Write a listing of the whole image.
    pub fn disassemble<W: FmtWrite>(&self, w: &mut W) -> Result<(), DisasmError> {
        let image = self.image()?;

        if let Some(header) = image.header {
            writeln!(w, "header: {}", String::from_utf8_lossy(header))?;
        }

        writeln!(w, "functions:")?;
        for (op_index, name) in &image.functions {
            writeln!(w, "  {:5} {}", op_index, name)?;
        }

        writeln!(w, "strings:")?;
        for (id, text) in image.strings.iter().enumerate() {
            writeln!(w, "  {:5} {:?}", id, text)?;
        }

        writeln!(w, "code:")?;
        for instr in decode(image.code)? {
            write!(w, "  {:5} {:04X}: {}", instr.index, instr.offset, instr.op)?;
            match &instr.operand {
                Some(Operand::Int(value)) => write!(w, " {}", value)?,
                Some(Operand::Float(text)) => write!(w, " {}", text)?,
                Some(Operand::Pool(id)) => match image.strings.get(*id as usize) {
                    Some(text) => write!(w, " #{} {:?}", id, text)?,
                    None => write!(w, " #{} ?", id)?,
                },
                None => {}
            }
            writeln!(w)?;
        }

        Ok(())
    }

    /// Images without header start with the first segment id.
    fn header_len(&self) -> usize {
        if read_u32_be(self.bytecode) == Some(Segment::Gs1Flags as u32) {
            return 0;
        }
        read_graal_short(self.bytecode).map_or(0, |len| 2 + len as usize)
    }
}

fn read_functions(payload: &[u8], base: usize) -> Result<Vec<(u32, &str)>, DisasmError> {
    let mut functions = vec![];
    let mut cursor = 0;
    while cursor < payload.len() {
        let op_index = read_u32_be(&payload[cursor..]).ok_or(DisasmError::Truncated { offset: base + cursor })?;
        let (name, next) = read_cstr(payload, cursor + 4, base)?;
        functions.push((op_index, name));
        cursor = next;
    }
    Ok(functions)
}

fn read_strings(payload: &[u8], base: usize) -> Result<Vec<&str>, DisasmError> {
    let mut strings = vec![];
    let mut cursor = 0;
    while cursor < payload.len() {
        let (text, next) = read_cstr(payload, cursor, base)?;
        strings.push(text);
        cursor = next;
    }
    Ok(strings)
}

/// Nul terminated text starting at `start`, and the position after the nul.
fn read_cstr(bytes: &[u8], start: usize, base: usize) -> Result<(&str, usize), DisasmError> {
    let rest = bytes.get(start..).ok_or(DisasmError::Truncated { offset: base + start })?;
    let len = rest
        .iter()
        .position(|b| *b == 0)
        .ok_or(DisasmError::Truncated { offset: base + start })?;
    let text = std::str::from_utf8(&rest[..len]).map_err(|_| DisasmError::InvalidText { offset: base + start })?;
    Ok((text, start + len + 1))
}

fn decode(code: &[u8]) -> Result<Vec<Instruction>, DisasmError> {
    let mut instructions = vec![];
    let mut cursor = 0;

    while let Some(byte) = code.get(cursor).copied() {
        let offset = cursor;
        let op = Opcode::try_from(byte).map_err(|byte| DisasmError::UnknownOpcode { byte, offset })?;
        cursor += 1;

        let operand = match code.get(cursor).copied() {
            Some(m @ marker::POOL_U8..=marker::INT_U32) => {
                let width = match (m - marker::POOL_U8) % 3 {
                    0 => 1,
                    1 => 2,
                    _ => 4,
                };
                let bytes = code
                    .get(cursor + 1..cursor + 1 + width)
                    .ok_or(DisasmError::Truncated { offset: cursor })?;
                let value = match width {
                    1 => u32::from(bytes[0]),
                    2 => u32::from(read_u16_be(bytes).unwrap_or_default()),
                    _ => read_u32_be(bytes).unwrap_or_default(),
                };
                cursor += 1 + width;
                Some(if m < marker::INT_U8 {
                    Operand::Pool(value)
                } else {
                    Operand::Int(value)
                })
            }
            Some(marker::FLOAT) => {
                let (text, next) = read_cstr(code, cursor + 1, 0)?;
                cursor = next;
                Some(Operand::Float(text.to_string()))
            }
            _ => None,
        };

        instructions.push(Instruction {
            index: instructions.len(),
            offset,
            op,
            operand,
        });
    }

    Ok(instructions)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compile_str;

    #[test]
    fn test_instructions() {
        let image = compile_str("x = 1.5;").unwrap();
        let instructions = Disassembler::new(&image).instructions().unwrap();

        let ops: Vec<_> = instructions.iter().map(|instr| instr.op).collect();
        assert_eq!(ops, vec![Opcode::TypeVar, Opcode::TypeNumber, Opcode::Assign]);
        assert_eq!(instructions[0].operand, Some(Operand::Pool(0)));
        assert_eq!(instructions[1].operand, Some(Operand::Float("1.5".to_string())));
        assert_eq!(instructions[2].offset, 9);
    }

    #[test]
    fn test_listing() {
        let image = compile_str("function onCreated() { echo(\"hi\"); }").unwrap();
        let mut listing = String::new();
        Disassembler::new(&image).disassemble(&mut listing).unwrap();

        assert!(listing.contains("    1 onCreated"));
        assert!(listing.contains("TYPE_STRING #0 \"hi\""));
        assert!(listing.contains("FUNC_PARAMS_END"));
    }
}
