//! Method body rewriting
//!
//! One flat pass over a method's instruction stream. The receiver of a
//! non-static method is modeled as local slot 0 and is never itself
//! rewritten; only member accesses and invocations that touch the class
//! being rewritten (or its immediate parent) are substituted, everything
//! else is copied through verbatim.

use molt_classfile::{with_receiver, Instruction, Method, MethodDesc, TypeDesc};
use tracing::{debug, trace};

use crate::boxing::{emit_args_array, emit_box, emit_unbox};
use crate::context::RewriteContext;
use crate::emitter::override_method_name;
use crate::error::{TransformError, TransformResult};
use crate::runtime;

/// How a body should be rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Plain method body: every instruction is rewritten
    Normal,
    /// Constructor body: instructions before the delegation call are
    /// suppressed, since early-construction code cannot be replayed inside
    /// a static override method
    Constructor,
}

/// A rewritten body and its local-slot requirement
#[derive(Debug)]
pub struct RewrittenBody {
    /// The rewritten instruction stream
    pub code: Vec<Instruction>,
    /// Local slots used, including any the rewrite allocated
    pub max_locals: u16,
}

/// Rewrite one method body
pub fn rewrite_method(
    ctx: &RewriteContext<'_>,
    method: &Method,
    kind: MethodKind,
) -> TransformResult<RewrittenBody> {
    debug!(
        class = ctx.class_name,
        method = method.name.as_str(),
        ?kind,
        "rewriting method body"
    );

    let start = match kind {
        MethodKind::Normal => 0,
        MethodKind::Constructor => delegation_index(ctx, method)?,
    };

    let mut code = Vec::with_capacity(method.code.len());
    let mut next_local = method.max_locals;
    for insn in &method.code[start..] {
        rewrite_insn(ctx, insn, &mut code, &mut next_local)?;
    }

    Ok(RewrittenBody {
        code,
        max_locals: next_local,
    })
}

/// Locate the first constructor-delegation call: a direct `<init>`
/// invocation on the super class or on the class itself
fn delegation_index(ctx: &RewriteContext<'_>, method: &Method) -> TransformResult<usize> {
    method
        .code
        .iter()
        .position(|insn| match insn {
            Instruction::SpecialCall { owner, name, .. } => {
                name == "<init>"
                    && (Some(owner.as_str()) == ctx.super_name || owner == ctx.class_name)
            }
            _ => false,
        })
        .ok_or_else(|| TransformError::MissingDelegation {
            class: ctx.class_name.to_string(),
            desc: method.desc.clone(),
        })
}

fn rewrite_insn(
    ctx: &RewriteContext<'_>,
    insn: &Instruction,
    code: &mut Vec<Instruction>,
    next_local: &mut u16,
) -> TransformResult<()> {
    match insn {
        Instruction::FieldRead { owner, name, desc } if owner == ctx.class_name => {
            rewrite_field_access(ctx, insn, name, desc, FieldOp::Read, code)
        }
        Instruction::FieldWrite { owner, name, desc } if owner == ctx.class_name => {
            rewrite_field_access(ctx, insn, name, desc, FieldOp::Write, code)
        }
        Instruction::SpecialCall {
            owner,
            name,
            desc,
            iface,
        } => {
            if Some(owner.as_str()) == ctx.super_name {
                rewrite_super_call(ctx, owner, name, desc, code, next_local)
            } else if owner == ctx.class_name {
                rewrite_self_special(ctx, name, desc, *iface, code);
                Ok(())
            } else {
                code.push(insn.clone());
                Ok(())
            }
        }
        Instruction::VirtualCall { owner, name, desc, .. } if owner == ctx.class_name => {
            rewrite_self_virtual(ctx, insn, name, desc, code, next_local)
        }
        // Static calls always pass through: the target may legitimately
        // live on an ancestor with no override unit of its own, and
        // redirecting it safely needs information this pass does not have.
        Instruction::StaticCall { .. } => {
            code.push(insn.clone());
            Ok(())
        }
        _ => {
            code.push(insn.clone());
            Ok(())
        }
    }
}

enum FieldOp {
    Read,
    Write,
}

/// Rewrite an access to a field of the class being rewritten
///
/// Public fields pass through; everything else detours through the
/// reflection bridge with the field name as a string argument.
fn rewrite_field_access(
    ctx: &RewriteContext<'_>,
    original: &Instruction,
    name: &str,
    desc: &str,
    op: FieldOp,
    code: &mut Vec<Instruction>,
) -> TransformResult<()> {
    let field = ctx
        .field(name)
        .ok_or_else(|| TransformError::UnknownField {
            class: ctx.class_name.to_string(),
            name: name.to_string(),
        })?;

    if field.is_public() {
        trace!(field = name, "public field access left untouched");
        code.push(original.clone());
        return Ok(());
    }

    let field_ty = TypeDesc::parse(desc)?;
    debug!(
        field = name,
        static_field = field.is_static(),
        "bridging non-public field access"
    );

    // A static field has no receiver on the stack, but the bridge still
    // takes one; a null placeholder goes in its place. The runtime layer is
    // known to resolve fields through the receiver, so this path is
    // unreliable for static fields.
    if field.is_static() {
        code.push(Instruction::ConstNull);
    }

    match op {
        FieldOp::Read => {
            code.push(Instruction::PushString(name.to_string()));
            code.push(Instruction::StaticCall {
                owner: runtime::RUNTIME_OWNER.to_string(),
                name: runtime::GET_PRIVATE_FIELD.to_string(),
                desc: runtime::GET_PRIVATE_FIELD_DESC.to_string(),
                iface: false,
            });
            emit_unbox(code, &field_ty);
        }
        FieldOp::Write => {
            emit_box(code, &field_ty);
            code.push(Instruction::PushString(name.to_string()));
            code.push(Instruction::StaticCall {
                owner: runtime::RUNTIME_OWNER.to_string(),
                name: runtime::SET_PRIVATE_FIELD.to_string(),
                desc: runtime::SET_PRIVATE_FIELD_DESC.to_string(),
                iface: false,
            });
        }
    }
    Ok(())
}

/// Rewrite a super-directed call into the `access$super` trampoline on the
/// instrumented original class
fn rewrite_super_call(
    ctx: &RewriteContext<'_>,
    parent: &str,
    name: &str,
    desc: &str,
    code: &mut Vec<Instruction>,
    next_local: &mut u16,
) -> TransformResult<()> {
    if ctx.options.process_parents {
        if ctx.ancestor(parent).is_none() {
            return Err(TransformError::AncestorUnresolved {
                class: ctx.class_name.to_string(),
                parent: parent.to_string(),
            });
        }
        if !ctx.resolves_in_ancestors(name, desc) {
            return Err(TransformError::UnknownMethod {
                class: ctx.class_name.to_string(),
                name: name.to_string(),
                desc: desc.to_string(),
            });
        }
    }

    debug!(method = name, desc, "redirecting super call through the trampoline");

    let md = MethodDesc::parse(desc)?;
    let args = emit_args_array(code, &md.params, next_local);
    code.push(Instruction::PushString(format!("{name}.{desc}")));
    code.push(Instruction::LoadLocal(args));
    code.push(Instruction::StaticCall {
        owner: ctx.class_name.to_string(),
        name: runtime::SUPER_TRAMPOLINE.to_string(),
        desc: runtime::super_trampoline_desc(ctx.class_name),
        iface: false,
    });
    if md.ret.is_void() {
        code.push(Instruction::Pop);
    } else {
        emit_unbox(code, &md.ret);
    }
    Ok(())
}

/// Rewrite a direct self call (constructor or private dispatch) into a
/// static call on the override unit itself
///
/// No boxing is needed: the override unit's methods are reachable directly
/// under the explicit-receiver convention.
fn rewrite_self_special(
    ctx: &RewriteContext<'_>,
    name: &str,
    desc: &str,
    iface: bool,
    code: &mut Vec<Instruction>,
) {
    debug!(method = name, desc, "redirecting self special call to the override unit");
    code.push(Instruction::StaticCall {
        owner: format!("{}{}", ctx.class_name, runtime::OVERRIDE_SUFFIX),
        name: override_method_name(name),
        desc: with_receiver(ctx.class_name, desc),
        iface,
    });
}

/// Rewrite a virtual call whose static target is the class being rewritten
///
/// Public targets keep their polymorphic dispatch through the instrumented
/// original class. Non-public or unresolved targets detour through the
/// reflection bridge, carrying a parallel array of parameter type names.
fn rewrite_self_virtual(
    ctx: &RewriteContext<'_>,
    original: &Instruction,
    name: &str,
    desc: &str,
    code: &mut Vec<Instruction>,
    next_local: &mut u16,
) -> TransformResult<()> {
    let is_public = ctx.method(name, desc).is_some_and(|m| m.is_public());
    if is_public {
        trace!(method = name, "public virtual call left untouched");
        code.push(original.clone());
        return Ok(());
    }

    debug!(method = name, desc, "bridging non-public virtual call through reflection");

    let md = MethodDesc::parse(desc)?;
    let args = emit_args_array(code, &md.params, next_local);

    code.push(Instruction::PushString(name.to_string()));
    code.push(Instruction::PushInt(md.params.len() as i32));
    code.push(Instruction::NewArray(TypeDesc::Object(
        runtime::STRING.to_string(),
    )));
    for (i, param) in md.params.iter().enumerate() {
        code.push(Instruction::Dup);
        code.push(Instruction::PushInt(i as i32));
        code.push(Instruction::PushString(param.class_name()));
        code.push(Instruction::ArrayStore);
    }
    code.push(Instruction::LoadLocal(args));
    code.push(Instruction::StaticCall {
        owner: runtime::RUNTIME_OWNER.to_string(),
        name: runtime::INVOKE_PROTECTED.to_string(),
        desc: runtime::INVOKE_PROTECTED_DESC.to_string(),
        iface: false,
    });
    if md.ret.is_void() {
        code.push(Instruction::Pop);
    } else {
        emit_unbox(code, &md.ret);
    }
    Ok(())
}
