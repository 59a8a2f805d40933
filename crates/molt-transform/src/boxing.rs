//! Boxing and unboxing emission
//!
//! Rewritten bodies and the dispatch entry point exchange values with the
//! runtime support library exclusively as `Object`s. The helpers here emit
//! the wrapper conversions: `valueOf` calls when boxing primitives, and
//! cast-plus-accessor sequences when narrowing back to a declared type.

use molt_classfile::{Instruction, TypeDesc};

use crate::runtime;

/// The wrapper class boxing the given primitive, if it is one
pub fn wrapper_owner(ty: &TypeDesc) -> Option<&'static str> {
    match ty {
        TypeDesc::Boolean => Some("java/lang/Boolean"),
        TypeDesc::Byte => Some("java/lang/Byte"),
        TypeDesc::Char => Some("java/lang/Character"),
        TypeDesc::Short => Some("java/lang/Short"),
        TypeDesc::Int => Some("java/lang/Integer"),
        TypeDesc::Long => Some("java/lang/Long"),
        TypeDesc::Float => Some("java/lang/Float"),
        TypeDesc::Double => Some("java/lang/Double"),
        _ => None,
    }
}

/// Box the top of stack from `ty` to its wrapper
///
/// Reference types and `void` need no conversion and emit nothing.
pub fn emit_box(code: &mut Vec<Instruction>, ty: &TypeDesc) {
    if let Some(owner) = wrapper_owner(ty) {
        code.push(Instruction::StaticCall {
            owner: owner.to_string(),
            name: "valueOf".to_string(),
            desc: format!("({ty})L{owner};"),
            iface: false,
        });
    }
}

/// Narrow the top of stack from `Object` to `ty`
///
/// Numeric primitives unbox through `java/lang/Number`, so a swapped body
/// tolerates a boxed value of a different numeric width.
pub fn emit_unbox(code: &mut Vec<Instruction>, ty: &TypeDesc) {
    match ty {
        TypeDesc::Boolean => unbox_via(code, "java/lang/Boolean", "booleanValue", "()Z"),
        TypeDesc::Char => unbox_via(code, "java/lang/Character", "charValue", "()C"),
        TypeDesc::Byte => unbox_via(code, "java/lang/Number", "byteValue", "()B"),
        TypeDesc::Short => unbox_via(code, "java/lang/Number", "shortValue", "()S"),
        TypeDesc::Int => unbox_via(code, "java/lang/Number", "intValue", "()I"),
        TypeDesc::Long => unbox_via(code, "java/lang/Number", "longValue", "()J"),
        TypeDesc::Float => unbox_via(code, "java/lang/Number", "floatValue", "()F"),
        TypeDesc::Double => unbox_via(code, "java/lang/Number", "doubleValue", "()D"),
        TypeDesc::Object(name) if name == runtime::OBJECT => {}
        TypeDesc::Object(_) | TypeDesc::Array(_) => {
            code.push(Instruction::CheckCast(ty.clone()));
        }
        TypeDesc::Void => {}
    }
}

fn unbox_via(code: &mut Vec<Instruction>, owner: &str, name: &str, desc: &str) {
    code.push(Instruction::CheckCast(TypeDesc::Object(owner.to_string())));
    code.push(Instruction::VirtualCall {
        owner: owner.to_string(),
        name: name.to_string(),
        desc: desc.to_string(),
        iface: false,
    });
}

/// Pop the arguments described by `params` off the stack into a freshly
/// allocated `Object[]`, boxing each one
///
/// Allocates the array local from `next_local` and returns its slot. The
/// stores run in reverse parameter order: the value on top of the stack is
/// the last argument, so filling from the highest index downward consumes
/// the operands without disturbing anything computed beneath them.
pub fn emit_args_array(
    code: &mut Vec<Instruction>,
    params: &[TypeDesc],
    next_local: &mut u16,
) -> u16 {
    let slot = *next_local;
    *next_local += 1;

    code.push(Instruction::PushInt(params.len() as i32));
    code.push(Instruction::NewArray(TypeDesc::Object(
        runtime::OBJECT.to_string(),
    )));
    code.push(Instruction::StoreLocal(slot));

    for (i, param) in params.iter().enumerate().rev() {
        code.push(Instruction::LoadLocal(slot));
        code.push(Instruction::Swap);
        code.push(Instruction::PushInt(i as i32));
        code.push(Instruction::Swap);
        emit_box(code, param);
        code.push(Instruction::ArrayStore);
    }
    slot
}
