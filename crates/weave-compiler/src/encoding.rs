//! Instruction word layout.
//!
//! An instruction is a header word followed by up to [`MAX_OPERANDS`]
//! operand words:
//!
//! ```text
//!  31        11 10  9 8 7        0
//! +------------+-----+-+----------+
//! |   unused   |count|M|  opcode  |
//! +------------+-----+-+----------+
//! ```
//!
//! `M` is set for machine ops. Operands that index the constant pool carry
//! [`CONSTANT_TAG`]; primitives use the two low bits as a tag (see
//! [`encode_primitive`]).

use crate::constants::{Constant, ConstantPool};
use crate::opcode::Opcode;

pub const OPCODE_MASK: u32 = 0xFF;
pub const MACHINE_MASK: u32 = 1 << 8;
pub const ARG_SHIFT: u32 = 9;
pub const ARG_MASK: u32 = 0b11 << ARG_SHIFT;
pub const MAX_OPERANDS: usize = 3;

/// Marks an operand as a constant pool index.
pub const CONSTANT_TAG: u32 = 1 << 30;

/// Encode an instruction header.
pub fn encode_header(opcode: Opcode, operands: usize) -> u32 {
    debug_assert!(operands <= MAX_OPERANDS);
    let mut word = u32::from(u8::from(opcode));
    if opcode.is_machine() {
        word |= MACHINE_MASK;
    }
    word | ((operands as u32) << ARG_SHIFT)
}

/// Opcode byte, machine flag and operand count of a header word.
pub fn decode_header(word: u32) -> (u8, bool, usize) {
    let opcode = (word & OPCODE_MASK) as u8;
    let machine = word & MACHINE_MASK != 0;
    let count = ((word & ARG_MASK) >> ARG_SHIFT) as usize;
    (opcode, machine, count)
}

pub fn constant_operand(index: u32) -> u32 {
    CONSTANT_TAG | index
}

/// The pool index of a tagged operand, if it is one.
pub fn constant_index(operand: u32) -> Option<u32> {
    (operand & CONSTANT_TAG != 0).then_some(operand & !CONSTANT_TAG)
}

// ============================================================================
// Primitives
// ============================================================================

/// Low-bit tags of a primitive operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PrimitiveTag {
    /// A small non-negative integer stored inline.
    Number = 0,
    /// `false`, `true`, `null` or `undefined`.
    Immediate = 1,
    /// Anything else, stored in the constant pool.
    Constant = 2,
}

const PRIMITIVE_TAG_BITS: u32 = 2;
const PRIMITIVE_TAG_MASK: u32 = 0b11;
const MAX_INLINE_NUMBER: f64 = (1u32 << 28) as f64;

/// A value that can be pushed by `Primitive`.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
    Undefined,
}

/// Immediate values, in tag order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Immediate {
    False = 0,
    True = 1,
    Null = 2,
    Undefined = 3,
}

/// Encode a primitive, interning it in `pool` when it cannot be inlined.
pub fn encode_primitive(value: &PrimitiveValue, pool: &mut ConstantPool) -> u32 {
    let immediate =
        |imm: Immediate| ((imm as u32) << PRIMITIVE_TAG_BITS) | PrimitiveTag::Immediate as u32;
    let constant = |index: u32| (index << PRIMITIVE_TAG_BITS) | PrimitiveTag::Constant as u32;

    match value {
        PrimitiveValue::Boolean(false) => immediate(Immediate::False),
        PrimitiveValue::Boolean(true) => immediate(Immediate::True),
        PrimitiveValue::Null => immediate(Immediate::Null),
        PrimitiveValue::Undefined => immediate(Immediate::Undefined),
        PrimitiveValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n < MAX_INLINE_NUMBER => {
            ((*n as u32) << PRIMITIVE_TAG_BITS) | PrimitiveTag::Number as u32
        }
        PrimitiveValue::Number(n) => constant(pool.add(Constant::Number(*n))),
        PrimitiveValue::String(s) => constant(pool.add_string(s)),
    }
}

/// Split a primitive operand into its tag and payload.
pub fn decode_primitive(operand: u32) -> (PrimitiveTag, u32) {
    let tag = match operand & PRIMITIVE_TAG_MASK {
        0 => PrimitiveTag::Number,
        1 => PrimitiveTag::Immediate,
        _ => PrimitiveTag::Constant,
    };
    (tag, operand >> PRIMITIVE_TAG_BITS)
}

// ============================================================================
// Decoding
// ============================================================================

/// A decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Heap address of the header word.
    pub offset: u32,
    pub opcode: Opcode,
    pub operands: Vec<u32>,
}

impl Instruction {
    /// Absolute address targeted by the label operand at `index`.
    pub fn target(&self, index: usize) -> u32 {
        self.offset.wrapping_add(self.operands[index])
    }
}

/// Iterator over the instructions of a heap region.
pub struct Instructions<'h> {
    words: &'h [u32],
    base: u32,
    pos: usize,
}

impl<'h> Instructions<'h> {
    /// Decode `words`, which start at heap address `base`.
    pub fn new(words: &'h [u32], base: u32) -> Self {
        Self { words, base, pos: 0 }
    }
}

impl Iterator for Instructions<'_> {
    type Item = Instruction;

    fn next(&mut self) -> Option<Instruction> {
        let header = *self.words.get(self.pos)?;
        let (byte, _, count) = decode_header(header);
        let opcode = Opcode::from_u8(byte)?;
        let operands = self.words.get(self.pos + 1..self.pos + 1 + count)?.to_vec();
        let offset = self.base + self.pos as u32;
        self.pos += 1 + count;
        Some(Instruction {
            offset,
            opcode,
            operands,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let word = encode_header(Opcode::PushArgs, 3);
        assert_eq!(decode_header(word), (Opcode::PushArgs as u8, false, 3));

        let word = encode_header(Opcode::Jump, 1);
        assert_eq!(word & MACHINE_MASK, MACHINE_MASK);
        assert_eq!(decode_header(word), (Opcode::Jump as u8, true, 1));
    }

    #[test]
    fn constant_tagging() {
        let operand = constant_operand(7);
        assert_eq!(constant_index(operand), Some(7));
        assert_eq!(constant_index(7), None);
    }

    #[test]
    fn immediates_are_inline() {
        let mut pool = ConstantPool::new();
        let encoded = encode_primitive(&PrimitiveValue::Null, &mut pool);
        assert_eq!(decode_primitive(encoded), (PrimitiveTag::Immediate, Immediate::Null as u32));
        let encoded = encode_primitive(&PrimitiveValue::Boolean(true), &mut pool);
        assert_eq!(decode_primitive(encoded), (PrimitiveTag::Immediate, 1));
        assert!(pool.is_empty());
    }

    #[test]
    fn small_integers_are_inline() {
        let mut pool = ConstantPool::new();
        let encoded = encode_primitive(&PrimitiveValue::Number(42.0), &mut pool);
        assert_eq!(decode_primitive(encoded), (PrimitiveTag::Number, 42));
        assert!(pool.is_empty());
    }

    #[test]
    fn other_primitives_go_to_the_pool() {
        let mut pool = ConstantPool::new();
        let fraction = encode_primitive(&PrimitiveValue::Number(1.5), &mut pool);
        let negative = encode_primitive(&PrimitiveValue::Number(-3.0), &mut pool);
        let string = encode_primitive(&PrimitiveValue::String("hi".into()), &mut pool);

        assert_eq!(decode_primitive(fraction), (PrimitiveTag::Constant, 0));
        assert_eq!(decode_primitive(negative), (PrimitiveTag::Constant, 1));
        assert_eq!(decode_primitive(string), (PrimitiveTag::Constant, 2));
        assert_eq!(pool.get(2), Some(&Constant::String("hi".into())));
    }

    #[test]
    fn decode_instruction_stream() {
        let words = [
            encode_header(Opcode::PushFrame, 0),
            encode_header(Opcode::Pop, 1),
            2,
            encode_header(Opcode::Return, 0),
        ];
        let decoded: Vec<_> = Instructions::new(&words, 10).collect();
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[1].opcode, Opcode::Pop);
        assert_eq!(decoded[1].offset, 11);
        assert_eq!(decoded[1].operands, vec![2]);
        assert_eq!(decoded[2].offset, 13);
    }

    #[test]
    fn label_targets_are_relative_to_the_header() {
        let instruction = Instruction {
            offset: 20,
            opcode: Opcode::Jump,
            operands: vec![5],
        };
        assert_eq!(instruction.target(0), 25);
        let backwards = Instruction {
            offset: 20,
            opcode: Opcode::Jump,
            operands: vec![(-4i32) as u32],
        };
        assert_eq!(backwards.target(0), 16);
    }
}
