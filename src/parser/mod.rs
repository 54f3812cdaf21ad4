//! Binary format decoder.
//!
//! [`Parser`] drives the top-level module grammar and exposes the result as
//! a lazy, single-pass event stream: one [`Payload`] per section, bookended
//! by `Version` and `End`. Nothing is decoded until the consumer pulls the
//! next event, and a whole-module tree is never built.

pub mod encoding;
pub mod error;
pub mod instruction;
pub mod limits;
pub mod module;
pub mod reader;
pub mod validate;

pub use error::ParseError;
pub use module::Payload;

use module::{Data, Element, Export, FunctionBody, FunctionType, Import, MemoryType, SectionId, TableType};
use reader::Reader;

enum State {
    Header,
    Sections,
    Done,
}

/// Pull-driven parser over a module's bytes.
///
/// Each `next()` call consumes exactly one unit of input: the 8-byte header
/// or one section frame. Events arrive in input order. The first fault ends
/// the stream; after yielding it (or the `End` bookend) the iterator is
/// fused. Dropping the parser mid-stream leaves no state behind beyond the
/// bytes already consumed.
pub struct Parser<'a> {
    reader: Reader<'a>,
    state: State,
}

impl<'a> Parser<'a> {
    pub fn new(bytes: &'a [u8]) -> Parser<'a> {
        Parser {
            reader: Reader::new(bytes),
            state: State::Header,
        }
    }

    fn read_header(&mut self) -> Result<(), ParseError> {
        let magic = self.reader.read_u32()?;
        if magic != encoding::MAGIC {
            return Err(ParseError::InvalidMagic(magic));
        }
        let version = self.reader.read_u32()?;
        if version != encoding::VERSION {
            return Err(ParseError::UnsupportedVersion(version));
        }
        Ok(())
    }

    /// Decode one section frame: id byte, length, then the body under a
    /// bounded sub-reader that must be consumed exactly.
    fn read_section(&mut self) -> Result<Payload, ParseError> {
        let id_byte = self.reader.read_byte()?;
        let id = SectionId::decode(id_byte)?;
        let declared = self.reader.read_vu32()? as usize;
        let mut body = self.reader.sub_reader(declared)?;

        let payload = match id {
            SectionId::Custom => read_custom_section(&mut body)?,
            SectionId::Type => Payload::TypeSection(read_vec(&mut body, FunctionType::decode)?),
            SectionId::Import => Payload::ImportSection(read_vec(&mut body, Import::decode)?),
            SectionId::Function => {
                Payload::FunctionSection(read_vec(&mut body, |r| r.read_vu32())?)
            }
            SectionId::Table => Payload::TableSection(read_vec(&mut body, TableType::decode)?),
            SectionId::Memory => Payload::MemorySection(read_vec(&mut body, MemoryType::decode)?),
            SectionId::Global => Payload::GlobalSection(read_vec(&mut body, module::Global::decode)?),
            SectionId::Export => Payload::ExportSection(read_vec(&mut body, Export::decode)?),
            SectionId::Start => Payload::StartSection(body.read_vu32()?),
            SectionId::Element => Payload::ElementSection(read_vec(&mut body, Element::decode)?),
            SectionId::Code => Payload::CodeSection(read_vec(&mut body, FunctionBody::decode)?),
            SectionId::Data => Payload::DataSection(read_vec(&mut body, Data::decode)?),
            SectionId::DataCount => Payload::DataCountSection(body.read_vu32()?),
        };

        if !body.at_end() {
            return Err(ParseError::SectionSizeMismatch {
                id: id_byte,
                declared,
                consumed: declared - body.remaining(),
            });
        }

        Ok(payload)
    }
}

impl<'a> Iterator for Parser<'a> {
    type Item = Result<Payload, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            State::Header => match self.read_header() {
                Ok(()) => {
                    self.state = State::Sections;
                    Some(Ok(Payload::Version))
                }
                Err(e) => {
                    self.state = State::Done;
                    Some(Err(e))
                }
            },
            State::Sections => {
                if self.reader.at_end() {
                    self.state = State::Done;
                    return Some(Ok(Payload::End));
                }
                match self.read_section() {
                    Ok(payload) => Some(Ok(payload)),
                    Err(e) => {
                        self.state = State::Done;
                        Some(Err(e))
                    }
                }
            }
            State::Done => None,
        }
    }
}

/// Eagerly drain the event stream of `bytes` into a vector, stopping at the
/// first fault.
pub fn parse(bytes: &[u8]) -> Result<Vec<Payload>, ParseError> {
    Parser::new(bytes).collect()
}

/// A vector-of-T section body: var-u32 count, then `count` elements.
///
/// Capacity is bounded by the bytes actually remaining so a forged count
/// cannot force a huge allocation before decoding fails.
fn read_vec<'a, T, F>(reader: &mut Reader<'a>, mut decode: F) -> Result<Vec<T>, ParseError>
where
    F: FnMut(&mut Reader<'a>) -> Result<T, ParseError>,
{
    let count = reader.read_vu32()?;
    let mut items = Vec::with_capacity((count as usize).min(reader.remaining()));
    for _ in 0..count {
        items.push(decode(reader)?);
    }
    Ok(items)
}

fn read_custom_section(body: &mut Reader) -> Result<Payload, ParseError> {
    let name = body.read_string()?;
    let payload = body.read_bytes(body.remaining())?.to_vec();
    Ok(Payload::CustomSection { name, payload })
}
