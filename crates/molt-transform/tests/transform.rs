//! End-to-end transformation tests
//!
//! Builds small class models by hand, runs them through the transformer
//! and asserts on the emitted override unit, its dispatch table and its
//! persisted binary form.

use molt_classfile::{access, CompiledClass, Field, Instruction, Method, TypeDesc};
use molt_transform::{TransformError, TransformOptions, Transformer};

fn field(name: &str, desc: &str, access: u32) -> Field {
    Field {
        name: name.to_string(),
        desc: desc.to_string(),
        access,
    }
}

fn method(name: &str, desc: &str, access: u32, max_locals: u16, code: Vec<Instruction>) -> Method {
    Method {
        name: name.to_string(),
        desc: desc.to_string(),
        access,
        exceptions: vec![],
        max_locals,
        code,
    }
}

/// Opaque single-byte instruction, as a loader would carry it
fn raw(byte: u8) -> Instruction {
    Instruction::Other(vec![byte])
}

/// `class Foo { private int count; public void increment() { count = count + 1; } }`
fn counter_class() -> CompiledClass {
    let mut class = CompiledClass::new(
        "com/example/Foo".to_string(),
        Some("java/lang/Object".to_string()),
        access::PUBLIC,
    );
    class.fields.push(field("count", "I", access::PRIVATE));
    class.methods.push(method(
        "increment",
        "()V",
        access::PUBLIC,
        1,
        vec![
            Instruction::LoadLocal(0),
            Instruction::LoadLocal(0),
            Instruction::FieldRead {
                owner: "com/example/Foo".to_string(),
                name: "count".to_string(),
                desc: "I".to_string(),
            },
            raw(0x04), // iconst_1
            raw(0x60), // iadd
            Instruction::FieldWrite {
                owner: "com/example/Foo".to_string(),
                name: "count".to_string(),
                desc: "I".to_string(),
            },
            Instruction::ReturnVoid,
        ],
    ));
    class
}

/// `class Bar extends Base { private int x; Bar(int x) { super(x); this.x = x; } }`
fn bar_class() -> CompiledClass {
    let mut class = CompiledClass::new(
        "com/example/Bar".to_string(),
        Some("com/example/Base".to_string()),
        access::PUBLIC,
    );
    class.fields.push(field("x", "I", access::PRIVATE));
    class.methods.push(method(
        "<init>",
        "(I)V",
        access::PUBLIC,
        2,
        vec![
            Instruction::LoadLocal(0),
            Instruction::LoadLocal(1),
            Instruction::SpecialCall {
                owner: "com/example/Base".to_string(),
                name: "<init>".to_string(),
                desc: "(I)V".to_string(),
                iface: false,
            },
            Instruction::LoadLocal(0),
            Instruction::LoadLocal(1),
            Instruction::FieldWrite {
                owner: "com/example/Bar".to_string(),
                name: "x".to_string(),
                desc: "I".to_string(),
            },
            Instruction::ReturnVoid,
        ],
    ));
    class
}

fn base_class() -> CompiledClass {
    let mut class = CompiledClass::new(
        "com/example/Base".to_string(),
        Some("java/lang/Object".to_string()),
        access::PUBLIC,
    );
    class.methods.push(method(
        "<init>",
        "(I)V",
        access::PUBLIC,
        2,
        vec![
            Instruction::SpecialCall {
                owner: "java/lang/Object".to_string(),
                name: "<init>".to_string(),
                desc: "()V".to_string(),
                iface: false,
            },
            Instruction::ReturnVoid,
        ],
    ));
    class
}

#[test]
fn counter_increment_bridges_both_accesses() {
    let unit = Transformer::default()
        .transform(&counter_class(), &[])
        .unwrap();

    let body = &unit
        .class
        .method_by("increment", "(Lcom/example/Foo;)V")
        .unwrap()
        .code;

    assert_eq!(
        *body,
        vec![
            Instruction::LoadLocal(0),
            Instruction::LoadLocal(0),
            // count read via the reflection bridge, narrowed back to int
            Instruction::PushString("count".to_string()),
            Instruction::StaticCall {
                owner: "molt/runtime/SwapRuntime".to_string(),
                name: "getPrivateField".to_string(),
                desc: "(Ljava/lang/Object;Ljava/lang/String;)Ljava/lang/Object;".to_string(),
                iface: false,
            },
            Instruction::CheckCast(TypeDesc::Object("java/lang/Number".to_string())),
            Instruction::VirtualCall {
                owner: "java/lang/Number".to_string(),
                name: "intValue".to_string(),
                desc: "()I".to_string(),
                iface: false,
            },
            raw(0x04),
            raw(0x60),
            // count write: box, push the name, store through the bridge
            Instruction::StaticCall {
                owner: "java/lang/Integer".to_string(),
                name: "valueOf".to_string(),
                desc: "(I)Ljava/lang/Integer;".to_string(),
                iface: false,
            },
            Instruction::PushString("count".to_string()),
            Instruction::StaticCall {
                owner: "molt/runtime/SwapRuntime".to_string(),
                name: "setPrivateField".to_string(),
                desc: "(Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/String;)V".to_string(),
                iface: false,
            },
            Instruction::ReturnVoid,
        ]
    );

    assert_eq!(unit.signatures, vec!["increment.()V".to_string()]);
}

#[test]
fn bar_constructor_truncates_and_trampolines() {
    let ancestors = vec![base_class()];
    let unit = Transformer::new(TransformOptions {
        process_parents: true,
    })
    .transform(&bar_class(), &ancestors)
    .unwrap();

    let body = &unit
        .class
        .method_by("init$override", "(Lcom/example/Bar;I)V")
        .unwrap()
        .code;

    // The body begins at the rewritten delegation: boxing super(x)'s
    // argument array comes first, nothing of the suppressed prefix remains
    assert_eq!(body[0], Instruction::PushInt(1));
    assert_eq!(
        body[1],
        Instruction::NewArray(TypeDesc::Object("java/lang/Object".to_string()))
    );

    let trampoline_at = body
        .iter()
        .position(|i| matches!(i, Instruction::StaticCall { name, .. } if name == "access$super"))
        .unwrap();
    assert_eq!(
        body[trampoline_at],
        Instruction::StaticCall {
            owner: "com/example/Bar".to_string(),
            name: "access$super".to_string(),
            desc: "(Lcom/example/Bar;Ljava/lang/String;[Ljava/lang/Object;)Ljava/lang/Object;"
                .to_string(),
            iface: false,
        }
    );
    assert_eq!(
        body[trampoline_at - 2],
        Instruction::PushString("<init>.(I)V".to_string())
    );
    // void delegation discards the trampoline's boxed result
    assert_eq!(body[trampoline_at + 1], Instruction::Pop);

    // `this.x = x` resumes afterwards, rewritten as a bridge store
    let tail = &body[trampoline_at + 2..];
    assert_eq!(tail[0], Instruction::LoadLocal(0));
    assert_eq!(tail[1], Instruction::LoadLocal(1));
    assert!(matches!(
        tail[2],
        Instruction::StaticCall { ref owner, ref name, .. }
            if owner == "java/lang/Integer" && name == "valueOf"
    ));
    assert_eq!(tail[3], Instruction::PushString("x".to_string()));
    assert!(matches!(
        tail[4],
        Instruction::StaticCall { ref name, .. } if name == "setPrivateField"
    ));
    assert_eq!(tail[5], Instruction::ReturnVoid);

    // Dispatch key keeps the original constructor name
    assert_eq!(unit.signatures, vec!["<init>.(I)V".to_string()]);
}

#[test]
fn missing_parent_record_is_a_contract_violation() {
    let err = Transformer::new(TransformOptions {
        process_parents: true,
    })
    .transform(&bar_class(), &[])
    .unwrap_err();
    assert!(matches!(err, TransformError::AncestorUnresolved { .. }));
}

#[test]
fn unverified_mode_rewrites_without_ancestors() {
    let unit = Transformer::default().transform(&bar_class(), &[]).unwrap();
    assert!(unit
        .class
        .method_by("init$override", "(Lcom/example/Bar;I)V")
        .is_some());
}

#[test]
fn failed_method_aborts_whole_class() {
    let mut class = counter_class();
    class.methods.push(method(
        "broken",
        "()V",
        access::PUBLIC,
        1,
        vec![Instruction::FieldRead {
            owner: "com/example/Foo".to_string(),
            name: "ghost".to_string(),
            desc: "I".to_string(),
        }],
    ));

    let err = Transformer::default().transform(&class, &[]).unwrap_err();
    assert!(matches!(err, TransformError::UnknownField { ref name, .. } if name == "ghost"));
}

#[test]
fn dispatch_chain_covers_every_method() {
    let mut class = counter_class();
    class.methods.push(method(
        "total",
        "(J)J",
        access::PUBLIC,
        3,
        vec![raw(0x1f), raw(0xad)], // lload_1, lreturn
    ));

    let unit = Transformer::default().transform(&class, &[]).unwrap();
    assert_eq!(
        unit.signatures,
        vec!["increment.()V".to_string(), "total.(J)J".to_string()]
    );

    let dispatch = unit.class.methods.last().unwrap();
    assert_eq!(dispatch.name, "access$dispatch");
    for signature in &unit.signatures {
        assert!(dispatch
            .code
            .contains(&Instruction::PushString(signature.clone())));
    }
    // The chain falls through into the stale-swap throw
    assert_eq!(*dispatch.code.last().unwrap(), Instruction::Throw);
    assert!(dispatch
        .code
        .contains(&Instruction::New("molt/runtime/StaleSwapException".to_string())));
}

#[test]
fn emitted_unit_survives_persistence() {
    let unit = Transformer::default()
        .transform(&counter_class(), &[])
        .unwrap();

    let bytes = unit.class.encode();
    let decoded = CompiledClass::decode(&bytes).unwrap();
    assert_eq!(decoded, unit.class);
    assert_eq!(decoded.name, "com/example/Foo$override");
}

#[test]
fn class_model_loads_from_json() {
    // The loader-facing interchange format round-trips through the
    // transformer input unchanged
    let json = counter_class().to_json().unwrap();
    let class = CompiledClass::from_json(&json).unwrap();

    let unit = Transformer::default().transform(&class, &[]).unwrap();
    assert_eq!(unit.class.name, "com/example/Foo$override");
}

#[test]
fn transform_is_deterministic() {
    let first = Transformer::default()
        .transform(&counter_class(), &[])
        .unwrap();
    let second = Transformer::default()
        .transform(&counter_class(), &[])
        .unwrap();
    assert_eq!(first.class, second.class);
    assert_eq!(first.source_fingerprint, second.source_fingerprint);
}
