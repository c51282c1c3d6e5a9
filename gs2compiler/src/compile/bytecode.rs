//! Bytecode image assembly.
use super::{opcode::Opcode, CodegenError};
use crate::encoding::{write_u16_be, write_u32_be};
use std::{collections::HashMap, convert::TryFrom};

/// Segment identifiers of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Segment {
    Gs1Flags = 1,
    FunctionNames = 2,
    Strings = 3,
    Bytecode = 4,
}

impl Segment {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Gs1Flags),
            2 => Some(Self::FunctionNames),
            3 => Some(Self::Strings),
            4 => Some(Self::Bytecode),
            _ => None,
        }
    }
}

/// Operand markers.
pub mod marker {
    pub const POOL_U8: u8 = 0xF0;
    pub const POOL_U16: u8 = 0xF1;
    pub const POOL_U32: u8 = 0xF2;
    pub const INT_U8: u8 = 0xF3;
    pub const INT_U16: u8 = 0xF4;
    pub const INT_U32: u8 = 0xF5;
    pub const FLOAT: u8 = 0xF6;
}

/// Position of a jump operand waiting for its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Label(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    pub name: String,
    /// Opcode index of the function's first instruction.
    pub op_index: u32,
}

/// Growable instruction buffer with its string pool and function table.
#[derive(Debug, Default)]
pub struct BytecodeBuilder {
    code: Vec<u8>,
    /// Number of opcodes emitted so far.
    op_count: usize,
    last_op: Option<Opcode>,
    strings: Vec<String>,
    string_ids: HashMap<String, u32>,
    functions: Vec<FunctionEntry>,
}

impl BytecodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next emitted opcode will have.
    #[inline]
    pub fn op_index(&self) -> usize {
        self.op_count
    }

    #[inline]
    pub fn last_op(&self) -> Option<Opcode> {
        self.last_op
    }

    #[inline]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    #[inline]
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    #[inline]
    pub fn functions(&self) -> &[FunctionEntry] {
        &self.functions
    }

    pub fn emit(&mut self, op: Opcode) {
        log::trace!("{:5} {:5} {}", self.code.len(), self.op_count, op);
        self.code.push(op as u8);
        self.last_op = Some(op);
        self.op_count += 1;
    }

    /// Emit an integer operand in the narrowest form.
    pub fn emit_int(&mut self, value: u32) {
        self.emit_sized(marker::INT_U8, value);
    }

    /// Emit a float operand as its literal text.
    pub fn emit_float(&mut self, text: &str) {
        self.code.push(marker::FLOAT);
        self.code.extend_from_slice(text.as_bytes());
        self.code.push(0);
    }

    /// Emit a reference into the string pool, adding the string if needed.
    pub fn emit_pool_ref(&mut self, text: &str) {
        let id = self.string_const(text);
        self.emit_sized(marker::POOL_U8, id);
    }

    fn emit_sized(&mut self, base: u8, value: u32) {
        if let Ok(byte) = u8::try_from(value) {
            self.code.push(base);
            self.code.push(byte);
        } else if let Ok(short) = u16::try_from(value) {
            self.code.push(base + 1);
            write_u16_be(&mut self.code, short);
        } else {
            self.code.push(base + 2);
            write_u32_be(&mut self.code, value);
        }
    }

    /// Emit a jump opcode with a placeholder target.
    pub fn emit_jump(&mut self, op: Opcode) -> Label {
        self.emit(op);
        self.code.push(marker::INT_U16);
        let label = Label(self.code.len());
        write_u16_be(&mut self.code, 0);
        label
    }

    /// Point a previously emitted jump at the given opcode index.
    pub fn patch_jump(&mut self, label: Label, target: usize) -> Result<(), CodegenError> {
        let target = u16::try_from(target).map_err(|_| CodegenError::JumpOutOfRange { target })?;
        let Label(pos) = label;
        match self.code.get_mut(pos..pos + 2) {
            Some(slot) => {
                slot.copy_from_slice(&target.to_be_bytes());
                Ok(())
            }
            None => Err(CodegenError::DanglingLabel { pos }),
        }
    }

    /// Point a jump at the next opcode to be emitted.
    #[inline]
    pub fn patch_here(&mut self, label: Label) -> Result<(), CodegenError> {
        let target = self.op_index();
        self.patch_jump(label, target)
    }

    /// Index of the string in the pool. Identical strings share an entry.
    pub fn string_const(&mut self, text: &str) -> u32 {
        if let Some(id) = self.string_ids.get(text) {
            return *id;
        }

        let id = self.strings.len() as u32;
        self.strings.push(text.to_string());
        self.string_ids.insert(text.to_string(), id);
        id
    }

    pub fn add_function(&mut self, name: String, op_index: usize) -> Result<(), CodegenError> {
        if self.functions.iter().any(|func| func.name == name) {
            return Err(CodegenError::DuplicateFunction(name));
        }

        let op_index = u32::try_from(op_index).map_err(|_| CodegenError::ImageTooLarge)?;
        self.functions.push(FunctionEntry { name, op_index });
        Ok(())
    }

    /// Lay out the segments after the given prologue.
    pub fn finish(self, prologue: &[u8]) -> Result<Vec<u8>, CodegenError> {
        let mut gs1_flags = vec![];
        write_u32_be(&mut gs1_flags, 0);

        let mut function_names = vec![];
        for func in &self.functions {
            write_u32_be(&mut function_names, func.op_index);
            function_names.extend_from_slice(func.name.as_bytes());
            function_names.push(0);
        }

        let mut strings = vec![];
        for text in &self.strings {
            strings.extend_from_slice(text.as_bytes());
            strings.push(0);
        }

        let mut image = Vec::with_capacity(
            prologue.len() + 32 + gs1_flags.len() + function_names.len() + strings.len() + self.code.len() + 1,
        );
        image.extend_from_slice(prologue);
        write_segment(&mut image, Segment::Gs1Flags, &gs1_flags)?;
        write_segment(&mut image, Segment::FunctionNames, &function_names)?;
        write_segment(&mut image, Segment::Strings, &strings)?;
        write_segment(&mut image, Segment::Bytecode, &self.code)?;
        image.push(b'\n');

        Ok(image)
    }
}

fn write_segment(image: &mut Vec<u8>, segment: Segment, payload: &[u8]) -> Result<(), CodegenError> {
    let len = u32::try_from(payload.len()).map_err(|_| CodegenError::ImageTooLarge)?;
    write_u32_be(image, segment as u32);
    write_u32_be(image, len);
    image.extend_from_slice(payload);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_operand_widths() {
        let mut builder = BytecodeBuilder::new();
        builder.emit(Opcode::TypeNumber);
        builder.emit_int(7);
        builder.emit(Opcode::TypeNumber);
        builder.emit_int(300);
        builder.emit(Opcode::TypeNumber);
        builder.emit_int(70_000);
        builder.emit(Opcode::TypeNumber);
        builder.emit_float("1.5");

        #[rustfmt::skip]
        assert_eq!(builder.code(), &[
            20, 0xF3, 7,
            20, 0xF4, 0x01, 0x2C,
            20, 0xF5, 0x00, 0x01, 0x11, 0x70,
            20, 0xF6, b'1', b'.', b'5', 0,
        ]);
        assert_eq!(builder.op_index(), 4);
    }

    #[test]
    fn test_string_pool_dedup() {
        let mut builder = BytecodeBuilder::new();
        builder.emit(Opcode::TypeString);
        builder.emit_pool_ref("hello");
        builder.emit(Opcode::TypeVar);
        builder.emit_pool_ref("x");
        builder.emit(Opcode::TypeString);
        builder.emit_pool_ref("hello");

        assert_eq!(builder.strings(), &["hello".to_string(), "x".to_string()]);
        assert_eq!(builder.code(), &[21, 0xF0, 0, 22, 0xF0, 1, 21, 0xF0, 0]);
    }

    #[test]
    fn test_jump_patch() {
        let mut builder = BytecodeBuilder::new();
        let label = builder.emit_jump(Opcode::If);
        builder.emit(Opcode::TypeTrue);
        builder.patch_here(label).unwrap();

        assert_eq!(builder.code(), &[4, 0xF4, 0, 2, 24]);
        assert_eq!(
            builder.patch_jump(Label(0), 70_000),
            Err(CodegenError::JumpOutOfRange { target: 70_000 })
        );
    }

    #[test]
    fn test_segment_layout() {
        let mut builder = BytecodeBuilder::new();
        builder.add_function("onCreated".to_string(), 1).unwrap();
        builder.emit(Opcode::Ret);
        let image = builder.finish(&[]).unwrap();

        #[rustfmt::skip]
        let expected: Vec<u8> = [
            &[0, 0, 0, 1, 0, 0, 0, 4, 0, 0, 0, 0][..],
            &[0, 0, 0, 2, 0, 0, 0, 14, 0, 0, 0, 1],
            b"onCreated\0",
            &[0, 0, 0, 3, 0, 0, 0, 0],
            &[0, 0, 0, 4, 0, 0, 0, 1, 7],
            b"\n",
        ]
        .concat();
        assert_eq!(image, expected);
    }
}
