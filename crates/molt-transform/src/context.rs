//! Per-class rewrite context

use molt_classfile::{CompiledClass, Field, Method};
use rustc_hash::FxHashMap;

use crate::TransformOptions;

/// Resolved lookup tables for the class being rewritten
///
/// Built once per transformation and passed by reference into every stage,
/// so no stage carries hidden "currently visited class" state.
pub struct RewriteContext<'a> {
    /// Internal name of the class being rewritten
    pub class_name: &'a str,
    /// Internal name of its immediate superclass, if any
    pub super_name: Option<&'a str>,
    /// Options the caller requested
    pub options: TransformOptions,
    fields: FxHashMap<&'a str, &'a Field>,
    methods: FxHashMap<(&'a str, &'a str), &'a Method>,
    ancestors: &'a [CompiledClass],
}

impl<'a> RewriteContext<'a> {
    /// Build the context for one class
    ///
    /// `ancestors` is the resolved ancestor chain, ordered root to
    /// immediate parent. It may be empty when the caller does not request
    /// ancestor-aware rewriting.
    pub fn new(
        class: &'a CompiledClass,
        ancestors: &'a [CompiledClass],
        options: TransformOptions,
    ) -> Self {
        let mut fields = FxHashMap::default();
        for field in &class.fields {
            fields.insert(field.name.as_str(), field);
        }
        let mut methods = FxHashMap::default();
        for method in &class.methods {
            methods.insert((method.name.as_str(), method.desc.as_str()), method);
        }
        Self {
            class_name: &class.name,
            super_name: class.super_name.as_deref(),
            options,
            fields,
            methods,
            ancestors,
        }
    }

    /// Look up a declared field by name
    pub fn field(&self, name: &str) -> Option<&'a Field> {
        self.fields.get(name).copied()
    }

    /// Look up a declared method by name and descriptor
    pub fn method(&self, name: &str, desc: &str) -> Option<&'a Method> {
        self.methods.get(&(name, desc)).copied()
    }

    /// Look up an ancestor record by internal name
    pub fn ancestor(&self, name: &str) -> Option<&'a CompiledClass> {
        self.ancestors.iter().find(|c| c.name == name)
    }

    /// Whether `name` + `desc` resolves anywhere in the ancestor chain,
    /// searched from the immediate parent up to the root
    pub fn resolves_in_ancestors(&self, name: &str, desc: &str) -> bool {
        self.ancestors
            .iter()
            .rev()
            .any(|c| c.method_by(name, desc).is_some())
    }
}
