//! Transformation errors

use molt_classfile::DescriptorError;
use thiserror::Error;

/// Result alias for transformation operations
pub type TransformResult<T> = Result<T, TransformError>;

/// Errors aborting a class transformation
///
/// Every variant is fatal for the class being transformed: the class model
/// is assumed closed and fully resolved, so a failed lookup means the model
/// is out of sync with the bytecode it was loaded from. No partial unit is
/// ever produced.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A field referenced in a body is not declared by the class
    #[error("Unknown field access {name} in class {class}")]
    UnknownField {
        /// Internal name of the class being rewritten
        class: String,
        /// The unresolved field name
        name: String,
    },

    /// A super-directed call target does not resolve in the ancestor chain
    #[error("Super method {name}{desc} not found in the ancestor chain of {class}")]
    UnknownMethod {
        /// Internal name of the class being rewritten
        class: String,
        /// The unresolved method name
        name: String,
        /// The unresolved method descriptor
        desc: String,
    },

    /// A constructor body contains no delegation call
    #[error("Constructor {desc} of {class} never delegates to another constructor")]
    MissingDelegation {
        /// Internal name of the class being rewritten
        class: String,
        /// Descriptor of the offending constructor
        desc: String,
    },

    /// Ancestor-aware rewriting was requested without the parent record
    #[error("Cannot resolve super calls from {class}: no record supplied for parent {parent}")]
    AncestorUnresolved {
        /// Internal name of the class being rewritten
        class: String,
        /// Internal name of the missing parent
        parent: String,
    },

    /// A descriptor in the class model failed to parse
    #[error("Malformed descriptor: {0}")]
    Descriptor(#[from] DescriptorError),
}
