//! Constant initializer expressions.
//!
//! Globals, element offsets, and data offsets carry a short, restricted
//! instruction sequence that produces a single value. Only the operators in
//! that restricted set are decoded here; full function bodies are kept as
//! raw bytes for an instruction-level consumer.

use fhex::ToHex;
use std::fmt;

use super::encoding;
use super::error::ParseError;
use super::reader::Reader;

/// An operator legal inside a constant initializer expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstOp {
    I32Const(i32),
    I64Const(i64),
    F32Const(f32),
    F64Const(f64),
    GlobalGet(u32),
    End,
}

impl ConstOp {
    pub fn decode(reader: &mut Reader) -> Result<ConstOp, ParseError> {
        let opcode = reader.read_byte()?;
        match opcode {
            encoding::OP_I32_CONST => Ok(ConstOp::I32Const(reader.read_vs32()?)),
            encoding::OP_I64_CONST => Ok(ConstOp::I64Const(reader.read_vs64()?)),
            encoding::OP_F32_CONST => Ok(ConstOp::F32Const(reader.read_f32()?)),
            encoding::OP_F64_CONST => Ok(ConstOp::F64Const(reader.read_f64()?)),
            encoding::OP_GLOBAL_GET => Ok(ConstOp::GlobalGet(reader.read_vu32()?)),
            encoding::OP_END => Ok(ConstOp::End),
            _ => Err(ParseError::InvalidOpcode(opcode)),
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            ConstOp::I32Const(_) => "i32.const",
            ConstOp::I64Const(_) => "i64.const",
            ConstOp::F32Const(_) => "f32.const",
            ConstOp::F64Const(_) => "f64.const",
            ConstOp::GlobalGet(_) => "global.get",
            ConstOp::End => "end",
        }
    }
}

impl fmt::Display for ConstOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())?;
        match self {
            ConstOp::I32Const(value) => write!(f, " {}", *value as u32),
            ConstOp::I64Const(value) => write!(f, " {}", *value as u64),
            ConstOp::F32Const(value) => write!(f, " {}", value.to_hex()),
            ConstOp::F64Const(value) => write!(f, " {}", value.to_hex()),
            ConstOp::GlobalGet(index) => write!(f, " {}", index),
            ConstOp::End => Ok(()),
        }
    }
}

/// Decode a constant initializer expression, consuming through its `end`
/// terminator. Any opcode outside the constant set is fatal.
pub fn read_const_expr(reader: &mut Reader) -> Result<Vec<ConstOp>, ParseError> {
    let mut ops = Vec::new();
    loop {
        let op = ConstOp::decode(reader)?;
        let done = matches!(op, ConstOp::End);
        ops.push(op);
        if done {
            return Ok(ops);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_i32_const_expr() {
        let mut reader = Reader::new(&[0x41, 0x2a, 0x0b]);
        let expr = read_const_expr(&mut reader).unwrap();
        assert_eq!(expr, vec![ConstOp::I32Const(42), ConstOp::End]);
        assert!(reader.at_end());
    }

    #[test]
    fn decode_negative_i64_const() {
        let mut reader = Reader::new(&[0x42, 0x7f, 0x0b]);
        let expr = read_const_expr(&mut reader).unwrap();
        assert_eq!(expr, vec![ConstOp::I64Const(-1), ConstOp::End]);
    }

    #[test]
    fn decode_f32_const_bit_exact() {
        // f32.const with the quiet NaN pattern survives bit-for-bit
        let mut reader = Reader::new(&[0x43, 0x00, 0x00, 0xc0, 0x7f, 0x0b]);
        let expr = read_const_expr(&mut reader).unwrap();
        match &expr[0] {
            ConstOp::F32Const(v) => assert_eq!(v.to_bits(), 0x7fc00000),
            op => panic!("unexpected operator: {}", op),
        }
    }

    #[test]
    fn decode_global_get() {
        let mut reader = Reader::new(&[0x23, 0x03, 0x0b]);
        let expr = read_const_expr(&mut reader).unwrap();
        assert_eq!(expr, vec![ConstOp::GlobalGet(3), ConstOp::End]);
    }

    #[test]
    fn reject_non_constant_opcode() {
        // i32.add is not legal in an initializer
        let mut reader = Reader::new(&[0x41, 0x01, 0x41, 0x02, 0x6a, 0x0b]);
        assert_eq!(
            read_const_expr(&mut reader),
            Err(ParseError::InvalidOpcode(0x6a))
        );
    }

    #[test]
    fn truncated_expression() {
        let mut reader = Reader::new(&[0x41, 0x2a]);
        assert_eq!(
            read_const_expr(&mut reader),
            Err(ParseError::UnexpectedEnd(2))
        );
    }
}
