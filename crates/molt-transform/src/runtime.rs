//! The runtime support contract
//!
//! Every name the transformer emits but does not define lives here: the
//! reflection bridge the rewritten bodies call into, the marker interface
//! the runtime uses to recognize override units, the failure type the
//! dispatch entry point throws, and the trampoline the instrumented
//! original class is expected to carry. None of these are implemented in
//! this crate.

/// Internal name of the reflection bridge class
pub const RUNTIME_OWNER: &str = "molt/runtime/SwapRuntime";

/// Marker interface implemented by every override unit
pub const MARKER_INTERFACE: &str = "molt/runtime/SwapUnit";

/// Exception thrown by the dispatch entry point for an unknown signature
pub const STALE_SWAP_EXCEPTION: &str = "molt/runtime/StaleSwapException";

/// Suffix appended to the source class name to form the override unit name
pub const OVERRIDE_SUFFIX: &str = "$override";

/// Name of the dispatch entry point
pub const DISPATCH_NAME: &str = "access$dispatch";

/// Descriptor of the dispatch entry point
pub const DISPATCH_DESC: &str = "(Ljava/lang/String;[Ljava/lang/Object;)Ljava/lang/Object;";

/// Name of the super-call trampoline on the instrumented original class
pub const SUPER_TRAMPOLINE: &str = "access$super";

/// `getPrivateField(Object receiverOrNull, String fieldName) -> Object`
pub const GET_PRIVATE_FIELD: &str = "getPrivateField";

/// Descriptor of [`GET_PRIVATE_FIELD`]
pub const GET_PRIVATE_FIELD_DESC: &str =
    "(Ljava/lang/Object;Ljava/lang/String;)Ljava/lang/Object;";

/// `setPrivateField(Object receiverOrNull, Object boxedValue, String fieldName)`
pub const SET_PRIVATE_FIELD: &str = "setPrivateField";

/// Descriptor of [`SET_PRIVATE_FIELD`]
pub const SET_PRIVATE_FIELD_DESC: &str =
    "(Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/String;)V";

/// `invokeProtectedMethod(Object receiver, String name, String[] paramTypes,
/// Object[] boxedArgs) -> Object`
pub const INVOKE_PROTECTED: &str = "invokeProtectedMethod";

/// Descriptor of [`INVOKE_PROTECTED`]
pub const INVOKE_PROTECTED_DESC: &str =
    "(Ljava/lang/Object;Ljava/lang/String;[Ljava/lang/String;[Ljava/lang/Object;)Ljava/lang/Object;";

/// Universal root type
pub const OBJECT: &str = "java/lang/Object";

/// String type
pub const STRING: &str = "java/lang/String";

/// Builder type used to assemble the dispatch-miss message
pub const STRING_BUILDER: &str = "java/lang/StringBuilder";

/// Descriptor of the trampoline as declared on `class_name`
///
/// `access$super(<Class> receiver, String signature, Object[] boxedArgs)`
pub fn super_trampoline_desc(class_name: &str) -> String {
    format!("(L{class_name};Ljava/lang/String;[Ljava/lang/Object;)Ljava/lang/Object;")
}
