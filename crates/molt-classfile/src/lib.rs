//! Molt class model and binary unit format
//!
//! This crate provides the structural representation of a compiled class
//! (fields, methods, instruction streams, type descriptors) consumed and
//! produced by the molt hot-swap transformer, together with the binary
//! format used to persist an emitted override unit.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod class;
pub mod descriptor;
pub mod encoder;
pub mod insn;

pub use class::{access, CompiledClass, Field, Method, UnitError};
pub use descriptor::{with_receiver, DescriptorError, MethodDesc, TypeDesc};
pub use encoder::{DecodeError, UnitReader, UnitWriter};
pub use insn::{Instruction, LabelId};
