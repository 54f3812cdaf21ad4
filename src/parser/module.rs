//! Module-level entities of the binary format and the section event type.
//!
//! Every type here is a pure value: decoded once from a [`Reader`], owned by
//! the [`Payload`] event that carries it, and handed to the consumer when the
//! event is yielded. Composite grammar fragments decode through constructors
//! on their types (`ValueType::decode`, `Limits::decode`, ...) so each type
//! is the single authority on its own encoding.

use std::fmt;

use super::encoding;
use super::error::ParseError;
use super::instruction::{read_const_expr, ConstOp};
use super::reader::Reader;

/// A value type token.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum ValueType {
    // Number types
    I32,
    I64,
    F32,
    F64,
    // Vector types
    V128,
    // Reference types
    FuncRef,
    ExternRef,
}

impl ValueType {
    pub fn is_value_type_byte(byte: u8) -> bool {
        byte == 0x7f
            || byte == 0x7e
            || byte == 0x7d
            || byte == 0x7c
            || byte == 0x7b
            || byte == 0x70
            || byte == 0x6f
    }

    pub fn decode(byte: u8) -> Result<Self, ParseError> {
        match byte {
            0x7f => Ok(ValueType::I32),
            0x7e => Ok(ValueType::I64),
            0x7d => Ok(ValueType::F32),
            0x7c => Ok(ValueType::F64),
            0x7b => Ok(ValueType::V128),
            0x70 => Ok(ValueType::FuncRef),
            0x6f => Ok(ValueType::ExternRef),
            _ => Err(ParseError::InvalidValType(byte)),
        }
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, ValueType::FuncRef | ValueType::ExternRef)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ValueType::I32 => "i32",
                ValueType::I64 => "i64",
                ValueType::F32 => "f32",
                ValueType::F64 => "f64",
                ValueType::V128 => "v128",
                ValueType::FuncRef => "funcref",
                ValueType::ExternRef => "externref",
            }
        )
    }
}

/// Size bounds of a memory or table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: u32,
    pub max: Option<u32>,
}

impl Limits {
    /// Decode a limits record. Flag bits above bit 0 are reserved and
    /// rejected.
    pub fn decode(reader: &mut Reader) -> Result<Limits, ParseError> {
        let flags = reader.read_vu32()?;
        if flags > 1 {
            return Err(ParseError::InvalidLimits(flags));
        }
        let min = reader.read_vu32()?;
        let max = if flags & 1 != 0 {
            Some(reader.read_vu32()?)
        } else {
            None
        };
        Ok(Limits { min, max })
    }
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "min = {}, max = {}", self.min, max),
            None => write!(f, "min = {}", self.min),
        }
    }
}

/// A function signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub parameters: Vec<ValueType>,
    pub results: Vec<ValueType>,
}

fn read_value_types(reader: &mut Reader) -> Result<Vec<ValueType>, ParseError> {
    let count = reader.read_vu32()?;
    let mut types = Vec::with_capacity((count as usize).min(reader.remaining()));
    for _ in 0..count {
        types.push(ValueType::decode(reader.read_byte()?)?);
    }
    Ok(types)
}

impl FunctionType {
    pub fn decode(reader: &mut Reader) -> Result<FunctionType, ParseError> {
        let tag = reader.read_byte()?;
        if tag != encoding::TYPE_FUNC {
            return Err(ParseError::InvalidFuncTypeTag(tag));
        }
        let parameters = read_value_types(reader)?;
        let results = read_value_types(reader)?;
        Ok(FunctionType { parameters, results })
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}) -> {}",
            self.parameters
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<String>>()
                .join(", "),
            if self.results.is_empty() {
                "nil".to_string()
            } else {
                self.results
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<String>>()
                    .join(", ")
            }
        )
    }
}

/// Element type and bounds of a table.
///
/// The decoder accepts any value type here; the validator flags element
/// types that are not reference types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    pub element: ValueType,
    pub limits: Limits,
}

impl TableType {
    pub fn decode(reader: &mut Reader) -> Result<TableType, ParseError> {
        let element = ValueType::decode(reader.read_byte()?)?;
        let limits = Limits::decode(reader)?;
        Ok(TableType { element, limits })
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.element, self.limits)
    }
}

/// Bounds of a linear memory, in 64 KiB pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    pub limits: Limits,
}

impl MemoryType {
    pub fn decode(reader: &mut Reader) -> Result<MemoryType, ParseError> {
        Ok(MemoryType {
            limits: Limits::decode(reader)?,
        })
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pages {}", self.limits)
    }
}

/// Content type and mutability of a global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub value_type: ValueType,
    pub mutable: bool,
}

impl GlobalType {
    pub fn decode(reader: &mut Reader) -> Result<GlobalType, ParseError> {
        let value_type = ValueType::decode(reader.read_byte()?)?;
        let mutable = reader.read_byte()? != 0;
        Ok(GlobalType { value_type, mutable })
    }
}

impl fmt::Display for GlobalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.value_type,
            if self.mutable { "var" } else { "const" }
        )
    }
}

/// Type signature of a structured control instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// No parameters or results.
    Empty,
    /// A single result value type.
    Value(ValueType),
    /// Index into the type section for multi-value blocks.
    TypeIndex(u32),
}

impl BlockType {
    /// Decode a block type. The encoding is ambiguous at the byte level:
    /// `0x40` and the value type bytes are negative sentinels in the signed
    /// 33-bit index space, so anything else re-reads as a var-s33.
    pub fn decode(reader: &mut Reader) -> Result<BlockType, ParseError> {
        let b = match reader.peek() {
            Some(b) => b,
            None => return Err(ParseError::UnexpectedEnd(reader.pos())),
        };
        if b == encoding::BLOCK_TYPE_EMPTY {
            reader.read_byte()?;
            Ok(BlockType::Empty)
        } else if ValueType::is_value_type_byte(b) {
            Ok(BlockType::Value(ValueType::decode(reader.read_byte()?)?))
        } else {
            let index = reader.read_vs33()?;
            if index < 0 {
                return Err(ParseError::InvalidBlockType(b));
            }
            Ok(BlockType::TypeIndex(index as u32))
        }
    }
}

/// Alignment and offset immediate of a memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemArg {
    /// Alignment, as a power of two.
    pub align: u32,
    pub offset: u32,
}

impl MemArg {
    pub fn decode(reader: &mut Reader) -> Result<MemArg, ParseError> {
        let align = reader.read_vu32()?;
        let offset = reader.read_vu32()?;
        Ok(MemArg { align, offset })
    }
}

/// What kind of entity an import or export refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalKind {
    Function,
    Table,
    Memory,
    Global,
}

impl ExternalKind {
    pub fn decode(byte: u8) -> Result<ExternalKind, ParseError> {
        match byte {
            encoding::DESC_FUNC => Ok(ExternalKind::Function),
            encoding::DESC_TABLE => Ok(ExternalKind::Table),
            encoding::DESC_MEMORY => Ok(ExternalKind::Memory),
            encoding::DESC_GLOBAL => Ok(ExternalKind::Global),
            _ => Err(ParseError::InvalidExternalKind(byte)),
        }
    }
}

impl fmt::Display for ExternalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ExternalKind::Function => "func",
                ExternalKind::Table => "table",
                ExternalKind::Memory => "memory",
                ExternalKind::Global => "global",
            }
        )
    }
}

/// Kind-specific payload of an import.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportDesc {
    Function(u32),
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
}

impl ImportDesc {
    pub fn kind(&self) -> ExternalKind {
        match self {
            ImportDesc::Function(_) => ExternalKind::Function,
            ImportDesc::Table(_) => ExternalKind::Table,
            ImportDesc::Memory(_) => ExternalKind::Memory,
            ImportDesc::Global(_) => ExternalKind::Global,
        }
    }
}

/// A single import entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module: String,
    pub name: String,
    pub desc: ImportDesc,
}

impl Import {
    /// Decode an import. The descriptor shape depends on the kind byte, so
    /// decoding dispatches on it rather than assuming an index.
    pub fn decode(reader: &mut Reader) -> Result<Import, ParseError> {
        let module = reader.read_string()?;
        let name = reader.read_string()?;
        let desc = match ExternalKind::decode(reader.read_byte()?)? {
            ExternalKind::Function => ImportDesc::Function(reader.read_vu32()?),
            ExternalKind::Table => ImportDesc::Table(TableType::decode(reader)?),
            ExternalKind::Memory => ImportDesc::Memory(MemoryType::decode(reader)?),
            ExternalKind::Global => ImportDesc::Global(GlobalType::decode(reader)?),
        };
        Ok(Import { module, name, desc })
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{} kind = {}", self.module, self.name, self.desc.kind())
    }
}

/// A single export entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub name: String,
    pub kind: ExternalKind,
    pub index: u32,
}

impl Export {
    pub fn decode(reader: &mut Reader) -> Result<Export, ParseError> {
        let name = reader.read_string()?;
        let kind = ExternalKind::decode(reader.read_byte()?)?;
        let index = reader.read_vu32()?;
        Ok(Export { name, kind, index })
    }
}

impl fmt::Display for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}] -> \"{}\"", self.kind, self.index, self.name)
    }
}

/// A global definition: its type plus the constant initializer.
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub global_type: GlobalType,
    pub init: Vec<ConstOp>,
}

impl Global {
    pub fn decode(reader: &mut Reader) -> Result<Global, ParseError> {
        let global_type = GlobalType::decode(reader)?;
        let init = read_const_expr(reader)?;
        Ok(Global { global_type, init })
    }
}

impl fmt::Display for Global {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} init = [", self.global_type)?;
        for op in &self.init {
            write!(f, "{} ", op)?;
        }
        write!(f, "]")
    }
}

/// An element segment in the MVP encoding: an active segment naming its
/// table, an offset expression, and the function indices to place.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub table_index: u32,
    pub offset: Vec<ConstOp>,
    pub functions: Vec<u32>,
}

impl Element {
    pub fn decode(reader: &mut Reader) -> Result<Element, ParseError> {
        let table_index = reader.read_vu32()?;
        let offset = read_const_expr(reader)?;
        let count = reader.read_vu32()?;
        let mut functions = Vec::with_capacity((count as usize).min(reader.remaining()));
        for _ in 0..count {
            functions.push(reader.read_vu32()?);
        }
        Ok(Element {
            table_index,
            offset,
            functions,
        })
    }
}

/// A data segment: an active segment naming its memory, an offset
/// expression, and the raw bytes to place.
#[derive(Debug, Clone, PartialEq)]
pub struct Data {
    pub memory_index: u32,
    pub offset: Vec<ConstOp>,
    pub init: Vec<u8>,
}

impl Data {
    pub fn decode(reader: &mut Reader) -> Result<Data, ParseError> {
        let memory_index = reader.read_vu32()?;
        let offset = read_const_expr(reader)?;
        let len = reader.read_vu32()? as usize;
        let init = reader.read_bytes(len)?.to_vec();
        Ok(Data {
            memory_index,
            offset,
            init,
        })
    }
}

/// A run-length local declaration inside a function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalEntry {
    pub count: u32,
    pub value_type: ValueType,
}

/// A function body: local declarations plus the body's code bytes, kept
/// verbatim so an instruction-level consumer can decode them later.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBody {
    pub locals: Vec<LocalEntry>,
    pub code: Vec<u8>,
}

impl FunctionBody {
    /// Decode one body. The body carries its own byte length; locals are
    /// decoded under that window and whatever remains is the code.
    pub fn decode(reader: &mut Reader) -> Result<FunctionBody, ParseError> {
        let size = reader.read_vu32()? as usize;
        let mut body = reader.sub_reader(size)?;

        let entries = body.read_vu32()?;
        let mut locals = Vec::with_capacity((entries as usize).min(body.remaining()));
        for _ in 0..entries {
            let count = body.read_vu32()?;
            let value_type = ValueType::decode(body.read_byte()?)?;
            locals.push(LocalEntry { count, value_type });
        }

        let code = body.read_bytes(body.remaining())?.to_vec();
        Ok(FunctionBody { locals, code })
    }
}

/// Identity of a section, in the order the ids are assigned by the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionId {
    Custom = 0,
    Type,
    Import,
    Function,
    Table,
    Memory,
    Global,
    Export,
    Start,
    Element,
    Code,
    Data,
    DataCount,
}

/// Number of distinct section ids, for validator bookkeeping.
pub const SECTION_COUNT: usize = 13;

impl SectionId {
    pub fn decode(byte: u8) -> Result<SectionId, ParseError> {
        match byte {
            encoding::SECTION_CUSTOM => Ok(SectionId::Custom),
            encoding::SECTION_TYPE => Ok(SectionId::Type),
            encoding::SECTION_IMPORT => Ok(SectionId::Import),
            encoding::SECTION_FUNCTION => Ok(SectionId::Function),
            encoding::SECTION_TABLE => Ok(SectionId::Table),
            encoding::SECTION_MEMORY => Ok(SectionId::Memory),
            encoding::SECTION_GLOBAL => Ok(SectionId::Global),
            encoding::SECTION_EXPORT => Ok(SectionId::Export),
            encoding::SECTION_START => Ok(SectionId::Start),
            encoding::SECTION_ELEMENT => Ok(SectionId::Element),
            encoding::SECTION_CODE => Ok(SectionId::Code),
            encoding::SECTION_DATA => Ok(SectionId::Data),
            encoding::SECTION_DATA_COUNT => Ok(SectionId::DataCount),
            _ => Err(ParseError::UnknownSection(byte)),
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SectionId::Custom => "custom",
                SectionId::Type => "type",
                SectionId::Import => "import",
                SectionId::Function => "function",
                SectionId::Table => "table",
                SectionId::Memory => "memory",
                SectionId::Global => "global",
                SectionId::Export => "export",
                SectionId::Start => "start",
                SectionId::Element => "element",
                SectionId::Code => "code",
                SectionId::Data => "data",
                SectionId::DataCount => "data count",
            }
        )
    }
}

/// One unit of the parser's output stream.
///
/// The header yields [`Payload::Version`], each section yields one event in
/// input order, and a cleanly exhausted input yields [`Payload::End`]. The
/// variant set is closed so consumers get exhaustiveness checking.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Version,
    TypeSection(Vec<FunctionType>),
    ImportSection(Vec<Import>),
    FunctionSection(Vec<u32>),
    TableSection(Vec<TableType>),
    MemorySection(Vec<MemoryType>),
    GlobalSection(Vec<Global>),
    ExportSection(Vec<Export>),
    StartSection(u32),
    ElementSection(Vec<Element>),
    CodeSection(Vec<FunctionBody>),
    DataSection(Vec<Data>),
    DataCountSection(u32),
    CustomSection { name: String, payload: Vec<u8> },
    End,
}

impl Payload {
    /// The section this event came from, or `None` for the bookends.
    pub fn section_id(&self) -> Option<SectionId> {
        match self {
            Payload::Version | Payload::End => None,
            Payload::TypeSection(_) => Some(SectionId::Type),
            Payload::ImportSection(_) => Some(SectionId::Import),
            Payload::FunctionSection(_) => Some(SectionId::Function),
            Payload::TableSection(_) => Some(SectionId::Table),
            Payload::MemorySection(_) => Some(SectionId::Memory),
            Payload::GlobalSection(_) => Some(SectionId::Global),
            Payload::ExportSection(_) => Some(SectionId::Export),
            Payload::StartSection(_) => Some(SectionId::Start),
            Payload::ElementSection(_) => Some(SectionId::Element),
            Payload::CodeSection(_) => Some(SectionId::Code),
            Payload::DataSection(_) => Some(SectionId::Data),
            Payload::DataCountSection(_) => Some(SectionId::DataCount),
            Payload::CustomSection { .. } => Some(SectionId::Custom),
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Version => write!(f, "version {}", encoding::VERSION),
            Payload::TypeSection(types) => {
                writeln!(f, "Type[{}]:", types.len())?;
                for (i, t) in types.iter().enumerate() {
                    writeln!(f, " - type[{}] {}", i, t)?;
                }
                Ok(())
            }
            Payload::ImportSection(imports) => {
                writeln!(f, "Import[{}]:", imports.len())?;
                for (i, import) in imports.iter().enumerate() {
                    writeln!(f, " - import[{}] {}", i, import)?;
                }
                Ok(())
            }
            Payload::FunctionSection(indices) => {
                writeln!(f, "Function[{}]:", indices.len())?;
                for (i, index) in indices.iter().enumerate() {
                    writeln!(f, " - func[{}] sig={}", i, index)?;
                }
                Ok(())
            }
            Payload::TableSection(tables) => {
                writeln!(f, "Table[{}]:", tables.len())?;
                for (i, table) in tables.iter().enumerate() {
                    writeln!(f, " - table[{}] {}", i, table)?;
                }
                Ok(())
            }
            Payload::MemorySection(memories) => {
                writeln!(f, "Memory[{}]:", memories.len())?;
                for (i, memory) in memories.iter().enumerate() {
                    writeln!(f, " - memory[{}] {}", i, memory)?;
                }
                Ok(())
            }
            Payload::GlobalSection(globals) => {
                writeln!(f, "Global[{}]:", globals.len())?;
                for (i, global) in globals.iter().enumerate() {
                    writeln!(f, " - global[{}] {}", i, global)?;
                }
                Ok(())
            }
            Payload::ExportSection(exports) => {
                writeln!(f, "Export[{}]:", exports.len())?;
                for export in exports {
                    writeln!(f, " - {}", export)?;
                }
                Ok(())
            }
            Payload::StartSection(index) => write!(f, "Start: func[{}]", index),
            Payload::ElementSection(elements) => {
                writeln!(f, "Element[{}]:", elements.len())?;
                for (i, element) in elements.iter().enumerate() {
                    writeln!(
                        f,
                        " - elem[{}] table={} funcs={:?}",
                        i, element.table_index, element.functions
                    )?;
                }
                Ok(())
            }
            Payload::CodeSection(bodies) => {
                writeln!(f, "Code[{}]:", bodies.len())?;
                for (i, body) in bodies.iter().enumerate() {
                    writeln!(f, " - func[{}] size={}", i, body.code.len())?;
                }
                Ok(())
            }
            Payload::DataSection(segments) => {
                writeln!(f, "Data[{}]:", segments.len())?;
                for (i, segment) in segments.iter().enumerate() {
                    writeln!(
                        f,
                        " - data[{}] memory={} size={}",
                        i,
                        segment.memory_index,
                        segment.init.len()
                    )?;
                }
                Ok(())
            }
            Payload::DataCountSection(count) => write!(f, "DataCount: {}", count),
            Payload::CustomSection { name, payload } => {
                write!(f, "Custom \"{}\" size={}", name, payload.len())
            }
            Payload::End => write!(f, "end"),
        }
    }
}
