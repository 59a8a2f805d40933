//! Benchmarks for unit encoding and decoding

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use molt_classfile::{access, CompiledClass, Field, Instruction, Method};

fn build_class(method_count: usize) -> CompiledClass {
    let mut class = CompiledClass::new(
        "com/example/Widget".to_string(),
        Some("java/lang/Object".to_string()),
        access::PUBLIC,
    );
    class.fields.push(Field {
        name: "state".to_string(),
        desc: "I".to_string(),
        access: access::PRIVATE,
    });
    for i in 0..method_count {
        class.methods.push(Method {
            name: format!("method{i}"),
            desc: "(ILjava/lang/String;)I".to_string(),
            access: access::PUBLIC,
            exceptions: vec![],
            max_locals: 3,
            code: vec![
                Instruction::LoadLocal(0),
                Instruction::FieldRead {
                    owner: "com/example/Widget".to_string(),
                    name: "state".to_string(),
                    desc: "I".to_string(),
                },
                Instruction::Other(vec![0x1b, 0x60]),
                Instruction::Other(vec![0xac]),
            ],
        });
    }
    class
}

fn bench_encode(c: &mut Criterion) {
    let class = build_class(64);
    c.bench_function("encode_class_64_methods", |b| {
        b.iter(|| black_box(&class).encode())
    });
}

fn bench_decode(c: &mut Criterion) {
    let bytes = build_class(64).encode();
    c.bench_function("decode_class_64_methods", |b| {
        b.iter(|| CompiledClass::decode(black_box(&bytes)).unwrap())
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
