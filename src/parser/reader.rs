//! Bounds-checked cursor over a binary module's bytes.
//!
//! [`Reader`] is the only component that touches raw input. It decodes the
//! primitive grammar of the binary format: fixed-width little-endian
//! integers, LEB128 variable-length integers with strict width caps, IEEE
//! 754 bit patterns, and length-prefixed UTF-8 names. Section decoders are
//! confined to a bounded window over the parent buffer via [`Reader::sub_reader`].

use byteorder::{ByteOrder, LittleEndian};

use super::error::ParseError;

pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Reader<'a> {
        Reader { bytes, pos: 0 }
    }

    // Basic operations --------------------------------------------------------

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos == self.bytes.len()
    }

    pub fn has_at_least(&self, count: usize) -> bool {
        self.remaining() >= count
    }

    /// Next byte without advancing the cursor.
    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    pub fn read_byte(&mut self) -> Result<u8, ParseError> {
        match self.bytes.get(self.pos) {
            Some(byte) => {
                self.pos += 1;
                Ok(*byte)
            }
            None => Err(ParseError::UnexpectedEnd(self.pos)),
        }
    }

    /// Borrow the next `len` bytes. Never partial: a short buffer fails
    /// without moving the cursor.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ParseError> {
        if !self.has_at_least(len) {
            return Err(ParseError::UnexpectedEnd(self.bytes.len()));
        }
        let bytes = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Split off a bounded window over the next `len` bytes, advancing this
    /// reader past it. Reads in the window fail at its own boundary, so a
    /// section decoder cannot stray into the following section.
    pub fn sub_reader(&mut self, len: usize) -> Result<Reader<'a>, ParseError> {
        Ok(Reader::new(self.read_bytes(len)?))
    }

    // Read and interpret types ------------------------------------------------

    pub fn read_u32(&mut self) -> Result<u32, ParseError> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64, ParseError> {
        Ok(LittleEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_f32(&mut self) -> Result<f32, ParseError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, ParseError> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    fn read_vu(&mut self, width: u32) -> Result<u64, ParseError> {
        let mut result: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let b = self.read_byte()?;
            if shift + 7 > width {
                // Final permitted byte: must terminate, and must not carry
                // bits above the remaining width.
                let rem = width - shift;
                if b & 0x80 != 0 || u64::from(b) >> rem != 0 {
                    return Err(ParseError::VarIntTooLarge(width));
                }
            }
            result |= u64::from(b & 0x7f) << shift;
            if b & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    pub fn read_vu32(&mut self) -> Result<u32, ParseError> {
        self.read_vu(32).map(|v| v as u32)
    }

    pub fn read_vu64(&mut self) -> Result<u64, ParseError> {
        self.read_vu(64)
    }

    fn read_vs(&mut self, width: u32) -> Result<i64, ParseError> {
        let mut result: i64 = 0;
        let mut shift: u32 = 0;
        loop {
            let b = self.read_byte()?;
            if shift + 7 > width {
                // Final permitted byte: unused high bits must be a sign fill.
                let rem = width - shift;
                let top = (b & 0x7f) >> (rem - 1);
                if b & 0x80 != 0 || (top != 0 && top != 0x7f >> (rem - 1)) {
                    return Err(ParseError::VarIntTooLarge(width));
                }
            }
            result |= i64::from(b & 0x7f) << shift;
            shift += 7;
            if b & 0x80 == 0 {
                if shift < width && b & 0x40 != 0 {
                    result |= -1i64 << shift;
                }
                return Ok(result);
            }
        }
    }

    pub fn read_vs32(&mut self) -> Result<i32, ParseError> {
        self.read_vs(32).map(|v| v as i32)
    }

    /// Signed 33-bit LEB128, used by the block type encoding where negative
    /// sentinels share the byte space with non-negative type indices.
    pub fn read_vs33(&mut self) -> Result<i64, ParseError> {
        self.read_vs(33)
    }

    pub fn read_vs64(&mut self) -> Result<i64, ParseError> {
        self.read_vs(64)
    }

    /// Length-prefixed UTF-8 name.
    pub fn read_string(&mut self) -> Result<String, ParseError> {
        let len = self.read_vu32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ParseError::InvalidUtf8)
    }
}

#[test]
fn test_read_byte() {
    let mut reader = Reader::new(&[0x01, 0xff]);
    assert_eq!(reader.read_byte().unwrap(), 1);
    assert_eq!(reader.read_byte().unwrap(), 255);
    assert_eq!(reader.read_byte(), Err(ParseError::UnexpectedEnd(2)));
}

#[test]
fn test_read_bytes_never_partial() {
    let mut reader = Reader::new(&[1, 2, 3]);
    assert_eq!(reader.read_bytes(4), Err(ParseError::UnexpectedEnd(3)));
    assert_eq!(reader.pos(), 0);
    assert_eq!(reader.read_bytes(3).unwrap(), &[1, 2, 3]);
    assert!(reader.at_end());
}

#[test]
fn test_read_u32() {
    let read = |v: &[u8]| Reader::new(v).read_u32().expect("failed to read u32");

    assert_eq!(read(&[0, 0, 0, 0]), 0);
    assert_eq!(read(&[1, 0, 0, 0]), 1);
    assert_eq!(read(&[0, 1, 0, 0]), 256);
    assert_eq!(read(&[0x80, 0x80, 0x80, 0x00]), 8421504);
    assert_eq!(read(&[0, 0, 0, 0x80]), 2147483648);
    assert_eq!(read(&[0xff, 0xff, 0xff, 0xff]), 4294967295);
}

#[test]
fn test_read_vu32() {
    let read = |v: &[u8]| Reader::new(v).read_vu32().expect("failed to read vu32");

    assert_eq!(read(&[0]), 0);
    assert_eq!(read(&[1]), 1);
    assert_eq!(read(&[0b11100101, 0b10001110, 0b00100110]), 624485);
    assert_eq!(read(&[0x7f]), 127);
    assert_eq!(read(&[0x80, 0x7f]), 16256);
    assert_eq!(read(&[0xb4, 0x07]), 0x3b4);
    assert_eq!(read(&[0x8c, 0x08]), 0x40c);
    assert_eq!(read(&[0xff, 0xff, 0xff, 0xff, 0xf]), 0xffffffff);
    assert_eq!(read(&[128, 128, 128, 128, 8]), 0x80000000);
}

#[test]
fn test_read_vu32_too_large() {
    // six bytes of continuation
    let mut reader = Reader::new(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
    assert_eq!(reader.read_vu32(), Err(ParseError::VarIntTooLarge(32)));

    // terminator carries bits above the remaining four
    let mut reader = Reader::new(&[0xff, 0xff, 0xff, 0xff, 0x10]);
    assert_eq!(reader.read_vu32(), Err(ParseError::VarIntTooLarge(32)));
}

#[test]
fn test_read_vu32_truncated() {
    let mut reader = Reader::new(&[0x80, 0x80]);
    assert_eq!(reader.read_vu32(), Err(ParseError::UnexpectedEnd(2)));
}

#[test]
fn test_read_vu64() {
    let read = |v: &[u8]| Reader::new(v).read_vu64().expect("failed to read vu64");

    assert_eq!(read(&[0]), 0);
    assert_eq!(read(&[0b11100101, 0b10001110, 0b00100110]), 624485);
    assert_eq!(read(&[0xff, 0xff, 0xff, 0xff, 0xf]), 0xffffffff);
    assert_eq!(
        read(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]),
        u64::MAX
    );

    let mut reader = Reader::new(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02]);
    assert_eq!(reader.read_vu64(), Err(ParseError::VarIntTooLarge(64)));
}

#[test]
fn test_read_vs32() {
    let read = |v: &[u8]| Reader::new(v).read_vs32().expect("failed to read vs32");

    assert_eq!(read(&[0]), 0);
    assert_eq!(read(&[1]), 1);
    assert_eq!(read(&[0b11100101, 0b10001110, 0b00100110]), 624485);
    assert_eq!(read(&[0xb4, 0x07]), 0x3b4);
    assert_eq!(read(&[0x7f]), -1);
    assert_eq!(read(&[0x80, 0x7f]), -128);
    assert_eq!(read(&[0b10011011, 0b11110001, 0b01011001]), -624485);
    // this is different as a 32 than a 64
    assert_eq!(read(&[128, 128, 128, 128, 120]), i32::MIN);
    assert_eq!(read(&[0xff, 0xff, 0xff, 0xff, 0x07]), i32::MAX);
}

#[test]
fn test_read_vs32_bad_sign_fill() {
    // final byte's unused bits are neither all-zero nor all-one
    let mut reader = Reader::new(&[0x80, 0x80, 0x80, 0x80, 0x4f]);
    assert_eq!(reader.read_vs32(), Err(ParseError::VarIntTooLarge(32)));
}

#[test]
fn test_read_vs64() {
    let read = |v: &[u8]| Reader::new(v).read_vs64().expect("failed to read vs64");

    assert_eq!(read(&[0x7f]), -1);
    assert_eq!(read(&[0x80, 0x7f]), -128);
    assert_eq!(
        read(&[128, 128, 128, 128, 128, 128, 128, 252, 255, 0]),
        0x7ff8000000000000
    );
    assert_eq!(
        read(&[128, 128, 128, 128, 128, 128, 128, 128, 128, 127]),
        i64::MIN
    );
}

#[test]
fn test_read_vs33() {
    let read = |v: &[u8]| Reader::new(v).read_vs33().expect("failed to read vs33");

    assert_eq!(read(&[0x00]), 0);
    assert_eq!(read(&[0x40]), -64);
    assert_eq!(read(&[0x7f]), -1);
    assert_eq!(read(&[0xff, 0xff, 0xff, 0xff, 0x0f]), 0xffffffff);
}

#[test]
fn test_read_f32() {
    let read = |v: &[u8]| Reader::new(v).read_f32().expect("failed to read f32");

    assert!(read(&[0, 0, 192, 127]).is_nan());
    assert!(read(&[0, 0, 192, 255]).is_nan()); // -nan
    assert_eq!(read(&[0, 0, 0, 0]), 0.0);
    assert_eq!(read(&[0, 0, 0, 128]), 0.0); // -0.0
    assert_eq!(read(&[219, 15, 201, 64]), 6.28318548202514648);
    assert_eq!(read(&[1, 0, 0, 0]), 1.4013e-45);
    assert_eq!(read(&[255, 255, 127, 127]), 3.4028234e+38);
    assert_eq!(read(&[249, 2, 21, 80]), 1.0e10);
}

#[test]
fn test_read_f64() {
    let read = |v: &[u8]| Reader::new(v).read_f64().expect("failed to read f64");

    assert!(read(&[0, 0, 0, 0, 0, 0, 248, 127]).is_nan());
    assert_eq!(read(&[0, 0, 0, 0, 0, 0, 0, 0]), 0.0);
    assert_eq!(read(&[24, 45, 68, 84, 251, 33, 25, 64]), 6.28318530717958623);
    assert_eq!(read(&[1, 0, 0, 0, 0, 0, 0, 0]), 4.94066e-324);
    assert_eq!(
        read(&[255, 255, 255, 255, 255, 255, 239, 127]),
        1.7976931348623157e+308
    );
    assert_eq!(read(&[125, 195, 148, 37, 173, 73, 178, 84]), 1.0e100);
}

#[test]
fn test_read_string() {
    let mut reader = Reader::new(&[0x03, 0x61, 0x64, 0x64]);
    assert_eq!(reader.read_string().unwrap(), "add");
    assert!(reader.at_end());

    let mut reader = Reader::new(&[0x02, 0xc3, 0x28]);
    assert_eq!(reader.read_string(), Err(ParseError::InvalidUtf8));
}

#[test]
fn test_sub_reader() {
    let mut reader = Reader::new(&[1, 2, 3, 4, 5]);
    let mut sub = reader.sub_reader(3).unwrap();
    assert_eq!(reader.pos(), 3);
    assert_eq!(sub.read_byte().unwrap(), 1);
    assert_eq!(sub.read_bytes(2).unwrap(), &[2, 3]);
    // the window is exhausted even though the parent has bytes left
    assert_eq!(sub.read_byte(), Err(ParseError::UnexpectedEnd(3)));
    assert_eq!(reader.read_byte().unwrap(), 4);
}

#[test]
fn test_sub_reader_short() {
    let mut reader = Reader::new(&[1, 2]);
    assert!(reader.sub_reader(3).is_err());
}

#[test]
fn test_leb128_round_trip() {
    use super::encoding;

    for v in [0u32, 1, 127, 128, 624485, 0x3b4, u32::MAX / 7, u32::MAX] {
        let mut buf = Vec::new();
        encoding::write_vu32(&mut buf, v);
        assert_eq!(Reader::new(&buf).read_vu32().unwrap(), v);
    }

    for v in [0i32, 1, -1, 63, 64, -64, -65, 624485, -624485, i32::MIN, i32::MAX] {
        let mut buf = Vec::new();
        encoding::write_vs32(&mut buf, v);
        assert_eq!(Reader::new(&buf).read_vs32().unwrap(), v);
    }

    for v in [0u64, 1 << 32, u64::MAX] {
        let mut buf = Vec::new();
        encoding::write_vu64(&mut buf, v);
        assert_eq!(Reader::new(&buf).read_vu64().unwrap(), v);
    }

    for v in [0i64, -1, i64::MIN, i64::MAX, 0x7ff8000000000000] {
        let mut buf = Vec::new();
        encoding::write_vs64(&mut buf, v);
        assert_eq!(Reader::new(&buf).read_vs64().unwrap(), v);
    }
}

#[test]
fn test_float_bit_round_trip() {
    use super::encoding;

    for bits in [0u32, 0x80000000, 0x7fc00000, 0xffc00000, 0x3f800000, u32::MAX] {
        let mut buf = Vec::new();
        encoding::write_f32(&mut buf, f32::from_bits(bits));
        assert_eq!(Reader::new(&buf).read_f32().unwrap().to_bits(), bits);
    }

    for bits in [0u64, 1, 0x7ff8000000000000, 0xfff8000000000000, u64::MAX] {
        let mut buf = Vec::new();
        encoding::write_f64(&mut buf, f64::from_bits(bits));
        assert_eq!(Reader::new(&buf).read_f64().unwrap().to_bits(), bits);
    }
}

#[test]
fn test_string_round_trip() {
    use super::encoding;

    for s in ["", "a", "add", "memory", "\u{1F980} says hi", "名前"] {
        let mut buf = Vec::new();
        encoding::write_string(&mut buf, s);
        assert_eq!(Reader::new(&buf).read_string().unwrap(), s);
    }
}
