//! Dispatch entry point generation
//!
//! Emits the single `access$dispatch(String, Object[])` method of an
//! override unit: a linear chain of exact signature-equality tests, each
//! branch unboxing its positional arguments, invoking the matching
//! rewritten static method and boxing the result. Chain order follows the
//! original declaration order; it affects lookup cost, never semantics.

use molt_classfile::{access, Instruction, LabelId, Method, MethodDesc};
use tracing::debug;

use crate::boxing::{emit_box, emit_unbox};
use crate::error::TransformResult;
use crate::runtime;

/// One `(signature, rewritten method)` pair routed by the entry point
#[derive(Debug, Clone)]
pub struct DispatchEntry {
    /// Lookup key: original `name + "." + descriptor`
    pub signature: String,
    /// Emitted method name in the override unit
    pub target_name: String,
    /// Emitted (receiver-explicit) method descriptor
    pub target_desc: String,
}

// Local slot layout of the generated entry point: slot 0 holds the unit
// instance, slot 1 the signature string, slot 2 the boxed argument array.
const SIG_SLOT: u16 = 1;
const ARGS_SLOT: u16 = 2;

/// Generate the dispatch entry point for `class_name` from its table
pub(crate) fn generate(class_name: &str, table: &[DispatchEntry]) -> TransformResult<Method> {
    debug!(
        class = class_name,
        entries = table.len(),
        "generating dispatch entry point"
    );

    let mut code = Vec::new();
    let mut next_label = 0u32;

    for entry in table {
        let miss = LabelId(next_label);
        next_label += 1;

        code.push(Instruction::LoadLocal(SIG_SLOT));
        code.push(Instruction::PushString(entry.signature.clone()));
        code.push(Instruction::VirtualCall {
            owner: runtime::STRING.to_string(),
            name: "equals".to_string(),
            desc: "(Ljava/lang/Object;)Z".to_string(),
            iface: false,
        });
        code.push(Instruction::JumpIfFalse(miss));

        let md = MethodDesc::parse(&entry.target_desc)?;
        for (i, param) in md.params.iter().enumerate() {
            code.push(Instruction::LoadLocal(ARGS_SLOT));
            code.push(Instruction::PushInt(i as i32));
            code.push(Instruction::ArrayLoad);
            emit_unbox(&mut code, param);
        }
        code.push(Instruction::StaticCall {
            owner: format!("{}{}", class_name, runtime::OVERRIDE_SUFFIX),
            name: entry.target_name.clone(),
            desc: entry.target_desc.clone(),
            iface: false,
        });
        if md.ret.is_void() {
            code.push(Instruction::ConstNull);
        } else {
            emit_box(&mut code, &md.ret);
        }
        code.push(Instruction::Return);
        code.push(Instruction::Label(miss));
    }

    emit_miss(&mut code, class_name);

    Ok(Method {
        name: runtime::DISPATCH_NAME.to_string(),
        desc: runtime::DISPATCH_DESC.to_string(),
        access: access::PUBLIC | access::VARARGS,
        exceptions: vec![],
        max_locals: 3,
        code,
    })
}

/// Fall-through for a signature no entry matched: assemble a message
/// carrying the requested signature and the class name, then throw the
/// stale-swap failure. The artifact and the dispatch request are out of
/// sync; only a restart recovers.
fn emit_miss(code: &mut Vec<Instruction>, class_name: &str) {
    code.push(Instruction::New(runtime::STRING_BUILDER.to_string()));
    code.push(Instruction::Dup);
    code.push(Instruction::SpecialCall {
        owner: runtime::STRING_BUILDER.to_string(),
        name: "<init>".to_string(),
        desc: "()V".to_string(),
        iface: false,
    });
    append_literal(code, "Unresolved hot-swap method ");
    code.push(Instruction::LoadLocal(SIG_SLOT));
    append(code);
    append_literal(
        code,
        &format!(" in class {class_name}; restart the application"),
    );
    code.push(Instruction::VirtualCall {
        owner: runtime::STRING_BUILDER.to_string(),
        name: "toString".to_string(),
        desc: "()Ljava/lang/String;".to_string(),
        iface: false,
    });

    code.push(Instruction::New(runtime::STALE_SWAP_EXCEPTION.to_string()));
    code.push(Instruction::DupX1);
    code.push(Instruction::Swap);
    code.push(Instruction::SpecialCall {
        owner: runtime::STALE_SWAP_EXCEPTION.to_string(),
        name: "<init>".to_string(),
        desc: "(Ljava/lang/String;)V".to_string(),
        iface: false,
    });
    code.push(Instruction::Throw);
}

fn append_literal(code: &mut Vec<Instruction>, text: &str) {
    code.push(Instruction::PushString(text.to_string()));
    append(code);
}

fn append(code: &mut Vec<Instruction>) {
    code.push(Instruction::VirtualCall {
        owner: runtime::STRING_BUILDER.to_string(),
        name: "append".to_string(),
        desc: "(Ljava/lang/String;)Ljava/lang/StringBuilder;".to_string(),
        iface: false,
    });
}
