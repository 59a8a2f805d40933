//! Override class emission
//!
//! Drives the whole transformation of one class: synthesizes the
//! `<Class>$override` shell, rewrites every method body into a public
//! static form, accumulates the dispatch table and hands it to the
//! dispatch generator.

use molt_classfile::{access, with_receiver, CompiledClass, Instruction, Method};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::context::RewriteContext;
use crate::dispatch::{self, DispatchEntry};
use crate::error::TransformResult;
use crate::rewrite::{rewrite_method, MethodKind};
use crate::runtime;
use crate::TransformOptions;

/// The emitted companion unit for one source class
#[derive(Debug)]
pub struct OverrideUnit {
    /// The synthesized `<Class>$override` class
    pub class: CompiledClass,
    /// Dispatch signatures, in original declaration order
    pub signatures: Vec<String>,
    /// Hex SHA-256 over the encoded source class, recorded so a runtime
    /// dispatch miss can be traced back to a stale artifact
    pub source_fingerprint: String,
}

/// The name a method carries in the override unit
///
/// Constructors are renamed because the target representation reserves
/// `<init>` for real constructors; every other name passes through. Dispatch
/// lookups still use the original name.
pub fn override_method_name(name: &str) -> String {
    if name == "<init>" {
        "init$override".to_string()
    } else {
        name.to_string()
    }
}

/// Generator for override units
#[derive(Debug, Default)]
pub struct Transformer {
    options: TransformOptions,
}

impl Transformer {
    /// Create a transformer with the given options
    pub fn new(options: TransformOptions) -> Self {
        Self { options }
    }

    /// Transform one class into its override unit
    ///
    /// `ancestors` is the class's resolved ancestor chain, ordered root to
    /// immediate parent. It must cover the immediate parent when
    /// `process_parents` is set and the class makes super-directed calls;
    /// supplying less is a caller contract violation and fails the whole
    /// transformation.
    pub fn transform(
        &self,
        class: &CompiledClass,
        ancestors: &[CompiledClass],
    ) -> TransformResult<OverrideUnit> {
        let ctx = RewriteContext::new(class, ancestors, self.options);

        debug!(class = class.name.as_str(), "emitting override unit");

        // The unit extends the root type, not the original parent: actual
        // construction keeps running in the instrumented original class.
        let mut unit = CompiledClass::new(
            format!("{}{}", class.name, runtime::OVERRIDE_SUFFIX),
            Some(runtime::OBJECT.to_string()),
            access::PUBLIC,
        );
        unit.interfaces.push(runtime::MARKER_INTERFACE.to_string());
        unit.methods.push(empty_constructor());

        let mut table = Vec::new();
        for method in &class.methods {
            // Static initializers are never hot-swappable; the instrumented
            // original keeps running its own.
            if method.name == "<clinit>" {
                continue;
            }

            let new_desc = if method.is_static() {
                method.desc.clone()
            } else {
                with_receiver(&class.name, &method.desc)
            };
            let kind = if method.name == "<init>" {
                MethodKind::Constructor
            } else {
                MethodKind::Normal
            };
            let body = rewrite_method(&ctx, method, kind)?;
            let emitted_name = override_method_name(&method.name);

            // The original access level and any synchronization flag are
            // deliberately not carried over.
            unit.methods.push(Method {
                name: emitted_name.clone(),
                desc: new_desc.clone(),
                access: access::PUBLIC | access::STATIC,
                exceptions: method.exceptions.clone(),
                max_locals: body.max_locals,
                code: body.code,
            });

            table.push(DispatchEntry {
                signature: format!("{}.{}", method.name, method.desc),
                target_name: emitted_name,
                target_desc: new_desc,
            });
        }

        unit.methods.push(dispatch::generate(&class.name, &table)?);

        let signatures = table.into_iter().map(|e| e.signature).collect();
        let source_fingerprint = hex::encode(Sha256::digest(class.encode()));

        Ok(OverrideUnit {
            class: unit,
            signatures,
            source_fingerprint,
        })
    }
}

/// The unit's trivial no-argument constructor: delegate to the root
/// constructor and return. It carries no original construction logic.
fn empty_constructor() -> Method {
    Method {
        name: "<init>".to_string(),
        desc: "()V".to_string(),
        access: access::PUBLIC,
        exceptions: vec![],
        max_locals: 1,
        code: vec![
            Instruction::LoadLocal(0),
            Instruction::SpecialCall {
                owner: runtime::OBJECT.to_string(),
                name: "<init>".to_string(),
                desc: "()V".to_string(),
                iface: false,
            },
            Instruction::ReturnVoid,
        ],
    }
}
