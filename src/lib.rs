//! An event-driven parser and structural validator for the WebAssembly 1.0
//! binary module format.
//!
//! wasmstream decodes a `.wasm` byte buffer into a lazy, single-pass stream
//! of typed section events rather than a whole-module tree. Consumers pull
//! one [`parser::Payload`] at a time — analysis, validation, and
//! transformation tools each fold the same stream their own way.
//!
//! # Modules
//!
//! - [`parser`] -- Binary format decoder: the bounds-checked [`parser::reader::Reader`],
//!   the section-by-section [`parser::Parser`], and the constant expression
//!   sub-parser.
//! - [`parser::validate`] -- Module-level structural validation over the
//!   event stream.
//! - [`parser::encoding`] -- Binary format constants and encoding
//!   primitives, the inverses of the reader.
//!
//! # Example
//!
//! Parse the smallest possible module and walk its events:
//!
//! ```
//! use wasmstream::parser::{Parser, Payload};
//!
//! let bytes = [0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
//! let events: Result<Vec<Payload>, _> = Parser::new(&bytes).collect();
//! assert_eq!(events.unwrap(), vec![Payload::Version, Payload::End]);
//!
//! let result = wasmstream::parser::validate::validate(&bytes);
//! assert!(result.is_valid());
//! ```

pub mod parser;
