//! Module-level structural validation.
//!
//! The validator is a thin consumer of the parser's event stream: one fold,
//! no re-decoding of bytes, no instruction-level type checking. It enforces
//! the structural invariants a module must satisfy before any section
//! content can be trusted — singleton sections appear at most once, export
//! names are unique, memory and table limits are sane, and every declared
//! function has exactly one code body.

use std::collections::HashSet;

use thiserror::Error;

use super::limits;
use super::module::{Limits, Payload, SectionId, ValueType, SECTION_COUNT};
use super::Parser;

/// A structural defect found in an otherwise decodable module, or the
/// parser fault that ended the fold early.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("duplicate {0} section")]
    DuplicateSection(SectionId),

    #[error("type {index}: parameter count {count} exceeds the limit of {max}", max = limits::MAX_FUNCTION_PARAMS)]
    TooManyParams { index: u32, count: u32 },

    #[error("type {index}: result count {count} exceeds the limit of {max}", max = limits::MAX_FUNCTION_RETURNS)]
    TooManyResults { index: u32, count: u32 },

    #[error("duplicate export name \"{0}\"")]
    DuplicateExport(String),

    #[error("{kind} {index}: minimum {min} exceeds maximum {max}")]
    LimitsMinExceedsMax {
        kind: &'static str,
        index: u32,
        min: u32,
        max: u32,
    },

    #[error("{kind} {index}: limit {value} exceeds the cap of {cap}", cap = limits::MAX_MEMORY_PAGES_32)]
    LimitsOutOfRange {
        kind: &'static str,
        index: u32,
        value: u32,
    },

    #[error("table {index}: element type {found} is not a reference type")]
    TableElementNotRef { index: u32, found: ValueType },

    #[error("function count {functions} does not match code body count {bodies}")]
    FunctionCodeCountMismatch { functions: u32, bodies: u32 },

    #[error("module declares {0} functions but has no code section")]
    MissingCodeSection(u32),

    #[error("module has {0} code bodies but no function section")]
    MissingFunctionSection(u32),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Outcome of validating a module: the ordered list of defects found.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    errors: Vec<ValidationError>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// The defects rendered as human-readable strings, in the order found.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Folding state of a validation pass.
pub struct Validator {
    seen: [bool; SECTION_COUNT],
    function_count: Option<u32>,
    body_count: Option<u32>,
    export_names: HashSet<String>,
    errors: Vec<ValidationError>,
    parse_failed: bool,
}

impl Validator {
    pub fn new() -> Validator {
        Validator {
            seen: [false; SECTION_COUNT],
            function_count: None,
            body_count: None,
            export_names: HashSet::new(),
            errors: Vec::new(),
            parse_failed: false,
        }
    }

    /// Fold one event into the validation state.
    pub fn process(&mut self, payload: &Payload) {
        if let Some(id) = payload.section_id() {
            // custom sections may repeat anywhere
            if id != SectionId::Custom {
                let slot = id as usize;
                if self.seen[slot] {
                    self.errors.push(ValidationError::DuplicateSection(id));
                } else {
                    self.seen[slot] = true;
                }
            }
        }

        match payload {
            Payload::TypeSection(types) => {
                for (i, ftype) in types.iter().enumerate() {
                    if ftype.parameters.len() as u32 > limits::MAX_FUNCTION_PARAMS {
                        self.errors.push(ValidationError::TooManyParams {
                            index: i as u32,
                            count: ftype.parameters.len() as u32,
                        });
                    }
                    if ftype.results.len() as u32 > limits::MAX_FUNCTION_RETURNS {
                        self.errors.push(ValidationError::TooManyResults {
                            index: i as u32,
                            count: ftype.results.len() as u32,
                        });
                    }
                }
            }
            Payload::FunctionSection(indices) => {
                self.function_count = Some(indices.len() as u32);
            }
            Payload::TableSection(tables) => {
                for (i, table) in tables.iter().enumerate() {
                    if !table.element.is_ref() {
                        self.errors.push(ValidationError::TableElementNotRef {
                            index: i as u32,
                            found: table.element,
                        });
                    }
                    self.check_limits("table", i as u32, &table.limits, limits::MAX_TABLE_ENTRIES);
                }
            }
            Payload::MemorySection(memories) => {
                for (i, memory) in memories.iter().enumerate() {
                    self.check_limits(
                        "memory",
                        i as u32,
                        &memory.limits,
                        limits::MAX_MEMORY_PAGES_32,
                    );
                }
            }
            Payload::ExportSection(exports) => {
                for export in exports {
                    if !self.export_names.insert(export.name.clone()) {
                        self.errors
                            .push(ValidationError::DuplicateExport(export.name.clone()));
                    }
                }
            }
            Payload::CodeSection(bodies) => {
                self.body_count = Some(bodies.len() as u32);
            }
            _ => {}
        }
    }

    /// Record the parser fault that ended the stream.
    pub fn record_fault(&mut self, message: String) {
        self.errors.push(ValidationError::Parse(message));
        self.parse_failed = true;
    }

    fn check_limits(&mut self, kind: &'static str, index: u32, limits: &Limits, cap: u32) {
        if limits.min > cap {
            self.errors.push(ValidationError::LimitsOutOfRange {
                kind,
                index,
                value: limits.min,
            });
        }
        if let Some(max) = limits.max {
            if max < limits.min {
                self.errors.push(ValidationError::LimitsMinExceedsMax {
                    kind,
                    index,
                    min: limits.min,
                    max,
                });
            }
            if max > cap {
                self.errors.push(ValidationError::LimitsOutOfRange {
                    kind,
                    index,
                    value: max,
                });
            }
        }
    }

    /// Close the fold and produce the outcome. Function/code parity is only
    /// judged when the whole stream was seen; after a parser fault the tail
    /// of the module is unknown.
    pub fn finish(mut self) -> Validation {
        if !self.parse_failed {
            match (self.function_count, self.body_count) {
                (Some(functions), Some(bodies)) if functions != bodies => {
                    self.errors.push(ValidationError::FunctionCodeCountMismatch {
                        functions,
                        bodies,
                    });
                }
                (Some(functions), None) if functions > 0 => {
                    self.errors.push(ValidationError::MissingCodeSection(functions));
                }
                (None, Some(bodies)) if bodies > 0 => {
                    self.errors.push(ValidationError::MissingFunctionSection(bodies));
                }
                _ => {}
            }
        }
        Validation { errors: self.errors }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse and validate a module in one pass.
pub fn validate(bytes: &[u8]) -> Validation {
    let mut validator = Validator::new();
    for event in Parser::new(bytes) {
        match event {
            Ok(payload) => validator.process(&payload),
            Err(e) => {
                validator.record_fault(e.to_string());
                break;
            }
        }
    }
    validator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: [u8; 8] = [0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];

    fn module_with(sections: &[u8]) -> Vec<u8> {
        let mut bytes = HEADER.to_vec();
        bytes.extend_from_slice(sections);
        bytes
    }

    #[test]
    fn empty_module_is_valid() {
        let result = validate(&HEADER);
        assert!(result.is_valid());
        assert!(result.messages().is_empty());
    }

    #[test]
    fn bad_magic_reported_as_parse_error() {
        let result = validate(&[0x00, 0x62, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00]);
        assert!(!result.is_valid());
        assert!(result.messages()[0].contains("magic"));
    }

    #[test]
    fn duplicate_type_section() {
        let bytes = module_with(&[
            0x01, 0x04, 0x01, 0x60, 0x00, 0x00, //
            0x01, 0x04, 0x01, 0x60, 0x00, 0x00,
        ]);
        let result = validate(&bytes);
        assert_eq!(
            result.errors(),
            &[ValidationError::DuplicateSection(SectionId::Type)]
        );
    }

    #[test]
    fn repeated_custom_sections_allowed() {
        let custom = [0x00, 0x03, 0x01, 0x61, 0xff];
        let mut sections = custom.to_vec();
        sections.extend_from_slice(&custom);
        assert!(validate(&module_with(&sections)).is_valid());
    }

    #[test]
    fn duplicate_export_name() {
        // two exports both named "a"
        let bytes = module_with(&[
            0x01, 0x04, 0x01, 0x60, 0x00, 0x00, //
            0x07, 0x09, 0x02, 0x01, 0x61, 0x00, 0x00, 0x01, 0x61, 0x00, 0x00,
        ]);
        let result = validate(&bytes);
        assert_eq!(
            result.errors(),
            &[ValidationError::DuplicateExport("a".to_string())]
        );
        assert!(result.messages()[0].contains("\"a\""));
    }

    #[test]
    fn function_code_count_mismatch() {
        let bytes = module_with(&[
            0x01, 0x04, 0x01, 0x60, 0x00, 0x00, // one empty type
            0x03, 0x03, 0x02, 0x00, 0x00, // two functions
            0x0a, 0x04, 0x01, 0x02, 0x00, 0x0b, // one body
        ]);
        let result = validate(&bytes);
        assert_eq!(
            result.errors(),
            &[ValidationError::FunctionCodeCountMismatch {
                functions: 2,
                bodies: 1,
            }]
        );
        let message = &result.messages()[0];
        assert!(message.contains('2') && message.contains('1'));
    }

    #[test]
    fn functions_without_code_section() {
        let bytes = module_with(&[
            0x01, 0x04, 0x01, 0x60, 0x00, 0x00, //
            0x03, 0x02, 0x01, 0x00,
        ]);
        let result = validate(&bytes);
        assert_eq!(result.errors(), &[ValidationError::MissingCodeSection(1)]);
    }

    #[test]
    fn code_without_function_section() {
        let bytes = module_with(&[0x0a, 0x04, 0x01, 0x02, 0x00, 0x0b]);
        let result = validate(&bytes);
        assert_eq!(result.errors(), &[ValidationError::MissingFunctionSection(1)]);
    }

    #[test]
    fn empty_function_and_code_sections_match() {
        let bytes = module_with(&[0x03, 0x01, 0x00, 0x0a, 0x01, 0x00]);
        assert!(validate(&bytes).is_valid());
    }

    #[test]
    fn memory_limits_min_exceeds_max() {
        // memory with min=2, max=1
        let bytes = module_with(&[0x05, 0x04, 0x01, 0x01, 0x02, 0x01]);
        let result = validate(&bytes);
        assert_eq!(
            result.errors(),
            &[ValidationError::LimitsMinExceedsMax {
                kind: "memory",
                index: 0,
                min: 2,
                max: 1,
            }]
        );
    }

    #[test]
    fn memory_limits_over_page_cap() {
        // min = 65537 pages
        let bytes = module_with(&[0x05, 0x05, 0x01, 0x00, 0x81, 0x80, 0x04]);
        let result = validate(&bytes);
        assert_eq!(
            result.errors(),
            &[ValidationError::LimitsOutOfRange {
                kind: "memory",
                index: 0,
                value: 65537,
            }]
        );
    }

    #[test]
    fn table_element_must_be_ref() {
        // table with element type i32
        let bytes = module_with(&[0x04, 0x04, 0x01, 0x7f, 0x00, 0x01]);
        let result = validate(&bytes);
        assert_eq!(
            result.errors(),
            &[ValidationError::TableElementNotRef {
                index: 0,
                found: ValueType::I32,
            }]
        );
    }

    #[test]
    fn funcref_table_is_valid() {
        let bytes = module_with(&[0x04, 0x05, 0x01, 0x70, 0x01, 0x01, 0x10]);
        assert!(validate(&bytes).is_valid());
    }

    #[test]
    fn parity_not_judged_after_parse_fault() {
        // a function section followed by a truncated code section: the only
        // error is the parse fault, not a missing-code complaint
        let bytes = module_with(&[
            0x01, 0x04, 0x01, 0x60, 0x00, 0x00, //
            0x03, 0x02, 0x01, 0x00, //
            0x0a, 0x04, 0x01, // code section cut short
        ]);
        let result = validate(&bytes);
        assert_eq!(result.errors().len(), 1);
        assert!(matches!(result.errors()[0], ValidationError::Parse(_)));
    }

    #[test]
    fn validation_is_idempotent() {
        let bytes = module_with(&[
            0x01, 0x04, 0x01, 0x60, 0x00, 0x00, //
            0x03, 0x03, 0x02, 0x00, 0x00, //
            0x0a, 0x04, 0x01, 0x02, 0x00, 0x0b,
        ]);
        assert_eq!(validate(&bytes), validate(&bytes));
    }

    #[test]
    fn custom_section_does_not_change_status() {
        let valid = module_with(&[0x03, 0x01, 0x00, 0x0a, 0x01, 0x00]);
        assert!(validate(&valid).is_valid());

        // splice a custom section between the two
        let with_custom = module_with(&[
            0x03, 0x01, 0x00, //
            0x00, 0x03, 0x01, 0x61, 0xff, //
            0x0a, 0x01, 0x00,
        ]);
        assert!(validate(&with_custom).is_valid());
    }
}
