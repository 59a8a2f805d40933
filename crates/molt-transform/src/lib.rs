//! Molt Transformer - override class generation for hot-swapping
//!
//! Given the structural model of a compiled class, this crate emits its
//! companion `<Class>$override` unit: one public static method per original
//! method (the implicit receiver made explicit as a leading parameter),
//! with non-public member accesses bridged through the runtime support
//! library, plus a single `access$dispatch` entry point that routes
//! `(signature, boxed arguments)` calls to the matching rewritten body.
//!
//! The instrumented original class and the runtime support library are
//! external collaborators; this crate only emits calls against their
//! contract (see the `runtime` module).

pub mod boxing;
pub mod context;
pub mod dispatch;
pub mod emitter;
pub mod error;
pub mod rewrite;
pub mod runtime;

pub use context::RewriteContext;
pub use dispatch::DispatchEntry;
pub use emitter::{override_method_name, OverrideUnit, Transformer};
pub use error::{TransformError, TransformResult};
pub use rewrite::{rewrite_method, MethodKind, RewrittenBody};

/// Options controlling one transformation
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformOptions {
    /// Verify super-call targets against the supplied ancestor chain.
    /// When set, rewriting a super-directed call without a record for the
    /// parent class is a caller contract violation.
    pub process_parents: bool,
}
