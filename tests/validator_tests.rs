use rstest::rstest;
use wasmstream::parser::encoding;
use wasmstream::parser::validate::{validate, ValidationError};

const HEADER_HEX: &str = "0061736d01000000";

fn from_hex(s: &str) -> Vec<u8> {
    hex::decode(s).expect("bad hex in test")
}

fn module(section_hex: &str) -> Vec<u8> {
    from_hex(&format!("{}{}", HEADER_HEX, section_hex))
}

#[test]
fn minimal_module_is_valid() {
    let result = validate(&module(""));
    assert!(result.is_valid());
    assert!(result.errors().is_empty());
}

#[test]
fn bad_magic_mentions_magic() {
    let result = validate(&from_hex("0062736d01000000"));
    assert!(!result.is_valid());
    assert_eq!(result.errors().len(), 1);
    assert!(result.messages()[0].contains("magic"));
}

#[test]
fn function_code_mismatch_names_both_counts() {
    let result = validate(&module("01040160000003030200000a040102000b"));
    assert!(!result.is_valid());
    let message = &result.messages()[0];
    assert!(message.contains('2'), "message should name the function count: {message}");
    assert!(message.contains('1'), "message should name the body count: {message}");
}

#[test]
fn duplicate_export_names_the_export() {
    let result = validate(&module("0104016000000709020161000001610000"));
    assert!(!result.is_valid());
    assert_eq!(
        result.errors(),
        &[ValidationError::DuplicateExport("a".to_string())]
    );
}

#[rstest]
#[case::empty("")]
#[case::type_only("010401600000")]
#[case::full_function("010401600000030201000a040102000b")]
#[case::mismatched("0104016000000303020000" /* functions without code */)]
#[case::truncated_section("01ff")]
fn validation_is_idempotent(#[case] section_hex: &str) {
    let bytes = module(section_hex);
    let first = validate(&bytes);
    let second = validate(&bytes);
    assert_eq!(first, second);
}

#[rstest]
#[case::front(0)]
#[case::middle(1)]
#[case::back(3)]
fn custom_section_anywhere_keeps_status(#[case] after_sections: usize) {
    // a valid three-section module: () -> nil type, one function, one body
    let sections: [&[u8]; 3] = [
        &[0x01, 0x04, 0x01, 0x60, 0x00, 0x00],
        &[0x03, 0x02, 0x01, 0x00],
        &[0x0a, 0x04, 0x01, 0x02, 0x00, 0x0b],
    ];

    let mut plain = Vec::new();
    encoding::write_header(&mut plain);
    for section in sections {
        plain.extend_from_slice(section);
    }
    assert!(validate(&plain).is_valid());

    let mut spliced = Vec::new();
    encoding::write_header(&mut spliced);
    for (i, section) in sections.iter().enumerate() {
        if i == after_sections {
            encoding::write_section(&mut spliced, encoding::SECTION_CUSTOM, &[0x04, 0x6e, 0x61, 0x6d, 0x65]);
        }
        spliced.extend_from_slice(section);
    }
    if after_sections >= sections.len() {
        encoding::write_section(&mut spliced, encoding::SECTION_CUSTOM, &[0x04, 0x6e, 0x61, 0x6d, 0x65]);
    }

    assert!(validate(&spliced).is_valid());
}

#[test]
fn errors_arrive_in_input_order() {
    // duplicate export inside the export section, then a count mismatch
    // discovered at the end of the fold
    let result = validate(&module(
        "010401600000\
         0303020000\
         0709020161000001610000\
         0a040102000b",
    ));
    assert_eq!(result.errors().len(), 2);
    assert!(matches!(result.errors()[0], ValidationError::DuplicateExport(_)));
    assert!(matches!(
        result.errors()[1],
        ValidationError::FunctionCodeCountMismatch { .. }
    ));
}
