use criterion::{black_box, criterion_group, criterion_main, Criterion};

use wasmstream::parser::{encoding, validate::validate, Parser};

/// Assemble a synthetic module with `functions` identical exported
/// functions, a memory, and a data segment.
fn build_module(functions: u32) -> Vec<u8> {
    let mut type_body = Vec::new();
    encoding::write_vu32(&mut type_body, 1);
    type_body.push(encoding::TYPE_FUNC);
    type_body.extend_from_slice(&[0x02, 0x7f, 0x7f, 0x01, 0x7f]);

    let mut function_body = Vec::new();
    encoding::write_vu32(&mut function_body, functions);
    for _ in 0..functions {
        encoding::write_vu32(&mut function_body, 0);
    }

    let mut memory_body = Vec::new();
    encoding::write_vu32(&mut memory_body, 1);
    memory_body.extend_from_slice(&[0x00, 0x01]);

    let mut export_body = Vec::new();
    encoding::write_vu32(&mut export_body, functions);
    for i in 0..functions {
        encoding::write_string(&mut export_body, &format!("f{}", i));
        export_body.push(encoding::DESC_FUNC);
        encoding::write_vu32(&mut export_body, i);
    }

    let code = [0x20, 0x00, 0x20, 0x01, 0x6a, 0x0b];
    let mut code_body = Vec::new();
    encoding::write_vu32(&mut code_body, functions);
    for _ in 0..functions {
        encoding::write_vu32(&mut code_body, code.len() as u32 + 1);
        encoding::write_vu32(&mut code_body, 0);
        code_body.extend_from_slice(&code);
    }

    let mut data_body = Vec::new();
    encoding::write_vu32(&mut data_body, 1);
    encoding::write_vu32(&mut data_body, 0);
    data_body.extend_from_slice(&[0x41, 0x00, 0x0b]);
    encoding::write_vu32(&mut data_body, 16);
    data_body.extend_from_slice(&[0xaa; 16]);

    let mut bytes = Vec::new();
    encoding::write_header(&mut bytes);
    encoding::write_section(&mut bytes, encoding::SECTION_TYPE, &type_body);
    encoding::write_section(&mut bytes, encoding::SECTION_FUNCTION, &function_body);
    encoding::write_section(&mut bytes, encoding::SECTION_MEMORY, &memory_body);
    encoding::write_section(&mut bytes, encoding::SECTION_EXPORT, &export_body);
    encoding::write_section(&mut bytes, encoding::SECTION_CODE, &code_body);
    encoding::write_section(&mut bytes, encoding::SECTION_DATA, &data_body);
    bytes
}

fn bench_parse(c: &mut Criterion) {
    let small = build_module(4);
    let large = build_module(512);

    c.bench_function("parse_small", |b| {
        b.iter(|| {
            for event in Parser::new(black_box(&small)) {
                black_box(event.unwrap());
            }
        })
    });

    c.bench_function("parse_large", |b| {
        b.iter(|| {
            for event in Parser::new(black_box(&large)) {
                black_box(event.unwrap());
            }
        })
    });

    c.bench_function("validate_large", |b| {
        b.iter(|| black_box(validate(black_box(&large))))
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
