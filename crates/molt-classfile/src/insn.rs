//! Instruction stream representation
//!
//! Method bodies are modeled as ordered streams of tagged instructions.
//! The transformer recognizes and rewrites the member-access and
//! invocation kinds; everything else it either synthesizes itself or
//! copies through verbatim as an opaque [`Instruction::Other`] payload.

use serde::{Deserialize, Serialize};

use crate::descriptor::TypeDesc;
use crate::encoder::{DecodeError, UnitReader, UnitWriter};

/// A symbolic jump target within one method body
///
/// Labels stay symbolic in the unit format; the runtime loader resolves
/// them to concrete offsets when materializing a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelId(pub u32);

/// A single instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ===== Member access & invocation (the rewritable kinds) =====
    /// Read a field: pops the receiver (instance fields), pushes the value
    FieldRead {
        /// Internal name of the declaring class
        owner: String,
        /// Field name
        name: String,
        /// Field type descriptor
        desc: String,
    },
    /// Write a field: pops the value and the receiver (instance fields)
    FieldWrite {
        /// Internal name of the declaring class
        owner: String,
        /// Field name
        name: String,
        /// Field type descriptor
        desc: String,
    },
    /// Virtually dispatched call: pops arguments and receiver
    VirtualCall {
        /// Internal name of the static target class
        owner: String,
        /// Method name
        name: String,
        /// Method descriptor
        desc: String,
        /// Whether the owner is an interface
        iface: bool,
    },
    /// Direct (constructor/private/super) call: pops arguments and receiver
    SpecialCall {
        /// Internal name of the static target class
        owner: String,
        /// Method name
        name: String,
        /// Method descriptor
        desc: String,
        /// Whether the owner is an interface
        iface: bool,
    },
    /// Static call: pops arguments only
    StaticCall {
        /// Internal name of the declaring class
        owner: String,
        /// Method name
        name: String,
        /// Method descriptor
        desc: String,
        /// Whether the owner is an interface
        iface: bool,
    },

    // ===== Constants =====
    /// Push a string constant
    PushString(String),
    /// Push a 32-bit integer constant
    PushInt(i32),
    /// Push the null reference
    ConstNull,

    // ===== Stack manipulation =====
    /// Discard the top value
    Pop,
    /// Duplicate the top value
    Dup,
    /// Duplicate the top value beneath the value under it
    DupX1,
    /// Swap the top two values
    Swap,

    // ===== Local variables =====
    /// Load a local variable slot onto the stack
    LoadLocal(u16),
    /// Store the top of stack into a local variable slot
    StoreLocal(u16),

    // ===== Arrays =====
    /// Allocate a reference array: pops the length, pushes the array
    NewArray(TypeDesc),
    /// Load an element: pops index and array, pushes the element
    ArrayLoad,
    /// Store an element: pops value, index and array
    ArrayStore,

    // ===== Objects =====
    /// Allocate an uninitialized instance of the named class
    New(String),
    /// Narrow the top reference to the given type
    CheckCast(TypeDesc),

    // ===== Control flow =====
    /// Mark a jump target
    Label(LabelId),
    /// Pop a boolean; jump to the label when it is false
    JumpIfFalse(LabelId),
    /// Return the top reference value
    Return,
    /// Return from a void method
    ReturnVoid,
    /// Throw the top reference as an exception
    Throw,

    // ===== Opaque =====
    /// An instruction the transformer does not interpret, carried verbatim
    Other(Vec<u8>),
}

/// Instruction tags in the binary unit format
mod tag {
    pub const FIELD_READ: u8 = 0x01;
    pub const FIELD_WRITE: u8 = 0x02;
    pub const VIRTUAL_CALL: u8 = 0x03;
    pub const SPECIAL_CALL: u8 = 0x04;
    pub const STATIC_CALL: u8 = 0x05;

    pub const PUSH_STRING: u8 = 0x10;
    pub const PUSH_INT: u8 = 0x11;
    pub const CONST_NULL: u8 = 0x12;

    pub const POP: u8 = 0x20;
    pub const DUP: u8 = 0x21;
    pub const DUP_X1: u8 = 0x22;
    pub const SWAP: u8 = 0x23;

    pub const LOAD_LOCAL: u8 = 0x30;
    pub const STORE_LOCAL: u8 = 0x31;

    pub const NEW_ARRAY: u8 = 0x40;
    pub const ARRAY_LOAD: u8 = 0x41;
    pub const ARRAY_STORE: u8 = 0x42;

    pub const NEW: u8 = 0x50;
    pub const CHECK_CAST: u8 = 0x51;

    pub const LABEL: u8 = 0x60;
    pub const JUMP_IF_FALSE: u8 = 0x61;
    pub const RETURN: u8 = 0x62;
    pub const RETURN_VOID: u8 = 0x63;
    pub const THROW: u8 = 0x64;

    pub const OTHER: u8 = 0x70;
}

impl Instruction {
    /// Encode this instruction into the unit format
    pub(crate) fn encode(&self, writer: &mut UnitWriter) {
        match self {
            Instruction::FieldRead { owner, name, desc } => {
                writer.emit_u8(tag::FIELD_READ);
                writer.emit_string(owner);
                writer.emit_string(name);
                writer.emit_string(desc);
            }
            Instruction::FieldWrite { owner, name, desc } => {
                writer.emit_u8(tag::FIELD_WRITE);
                writer.emit_string(owner);
                writer.emit_string(name);
                writer.emit_string(desc);
            }
            Instruction::VirtualCall {
                owner,
                name,
                desc,
                iface,
            } => {
                writer.emit_u8(tag::VIRTUAL_CALL);
                Self::encode_call(writer, owner, name, desc, *iface);
            }
            Instruction::SpecialCall {
                owner,
                name,
                desc,
                iface,
            } => {
                writer.emit_u8(tag::SPECIAL_CALL);
                Self::encode_call(writer, owner, name, desc, *iface);
            }
            Instruction::StaticCall {
                owner,
                name,
                desc,
                iface,
            } => {
                writer.emit_u8(tag::STATIC_CALL);
                Self::encode_call(writer, owner, name, desc, *iface);
            }
            Instruction::PushString(value) => {
                writer.emit_u8(tag::PUSH_STRING);
                writer.emit_string(value);
            }
            Instruction::PushInt(value) => {
                writer.emit_u8(tag::PUSH_INT);
                writer.emit_i32(*value);
            }
            Instruction::ConstNull => writer.emit_u8(tag::CONST_NULL),
            Instruction::Pop => writer.emit_u8(tag::POP),
            Instruction::Dup => writer.emit_u8(tag::DUP),
            Instruction::DupX1 => writer.emit_u8(tag::DUP_X1),
            Instruction::Swap => writer.emit_u8(tag::SWAP),
            Instruction::LoadLocal(index) => {
                writer.emit_u8(tag::LOAD_LOCAL);
                writer.emit_u16(*index);
            }
            Instruction::StoreLocal(index) => {
                writer.emit_u8(tag::STORE_LOCAL);
                writer.emit_u16(*index);
            }
            Instruction::NewArray(elem) => {
                writer.emit_u8(tag::NEW_ARRAY);
                writer.emit_string(&elem.to_string());
            }
            Instruction::ArrayLoad => writer.emit_u8(tag::ARRAY_LOAD),
            Instruction::ArrayStore => writer.emit_u8(tag::ARRAY_STORE),
            Instruction::New(owner) => {
                writer.emit_u8(tag::NEW);
                writer.emit_string(owner);
            }
            Instruction::CheckCast(ty) => {
                writer.emit_u8(tag::CHECK_CAST);
                writer.emit_string(&ty.to_string());
            }
            Instruction::Label(label) => {
                writer.emit_u8(tag::LABEL);
                writer.emit_u32(label.0);
            }
            Instruction::JumpIfFalse(label) => {
                writer.emit_u8(tag::JUMP_IF_FALSE);
                writer.emit_u32(label.0);
            }
            Instruction::Return => writer.emit_u8(tag::RETURN),
            Instruction::ReturnVoid => writer.emit_u8(tag::RETURN_VOID),
            Instruction::Throw => writer.emit_u8(tag::THROW),
            Instruction::Other(bytes) => {
                writer.emit_u8(tag::OTHER);
                writer.emit_bytes(bytes);
            }
        }
    }

    fn encode_call(writer: &mut UnitWriter, owner: &str, name: &str, desc: &str, iface: bool) {
        writer.emit_string(owner);
        writer.emit_string(name);
        writer.emit_string(desc);
        writer.emit_u8(iface as u8);
    }

    /// Decode one instruction from the unit format
    pub(crate) fn decode(reader: &mut UnitReader<'_>) -> Result<Self, DecodeError> {
        let start = reader.position();
        let tag = reader.read_u8()?;
        match tag {
            tag::FIELD_READ => Ok(Instruction::FieldRead {
                owner: reader.read_string()?,
                name: reader.read_string()?,
                desc: reader.read_string()?,
            }),
            tag::FIELD_WRITE => Ok(Instruction::FieldWrite {
                owner: reader.read_string()?,
                name: reader.read_string()?,
                desc: reader.read_string()?,
            }),
            tag::VIRTUAL_CALL => {
                let (owner, name, desc, iface) = Self::decode_call(reader)?;
                Ok(Instruction::VirtualCall {
                    owner,
                    name,
                    desc,
                    iface,
                })
            }
            tag::SPECIAL_CALL => {
                let (owner, name, desc, iface) = Self::decode_call(reader)?;
                Ok(Instruction::SpecialCall {
                    owner,
                    name,
                    desc,
                    iface,
                })
            }
            tag::STATIC_CALL => {
                let (owner, name, desc, iface) = Self::decode_call(reader)?;
                Ok(Instruction::StaticCall {
                    owner,
                    name,
                    desc,
                    iface,
                })
            }
            tag::PUSH_STRING => Ok(Instruction::PushString(reader.read_string()?)),
            tag::PUSH_INT => Ok(Instruction::PushInt(reader.read_i32()?)),
            tag::CONST_NULL => Ok(Instruction::ConstNull),
            tag::POP => Ok(Instruction::Pop),
            tag::DUP => Ok(Instruction::Dup),
            tag::DUP_X1 => Ok(Instruction::DupX1),
            tag::SWAP => Ok(Instruction::Swap),
            tag::LOAD_LOCAL => Ok(Instruction::LoadLocal(reader.read_u16()?)),
            tag::STORE_LOCAL => Ok(Instruction::StoreLocal(reader.read_u16()?)),
            tag::NEW_ARRAY => {
                let desc = reader.read_string()?;
                let elem = TypeDesc::parse(&desc)
                    .map_err(|_| DecodeError::InvalidDescriptor(start))?;
                Ok(Instruction::NewArray(elem))
            }
            tag::ARRAY_LOAD => Ok(Instruction::ArrayLoad),
            tag::ARRAY_STORE => Ok(Instruction::ArrayStore),
            tag::NEW => Ok(Instruction::New(reader.read_string()?)),
            tag::CHECK_CAST => {
                let desc = reader.read_string()?;
                let ty = TypeDesc::parse(&desc)
                    .map_err(|_| DecodeError::InvalidDescriptor(start))?;
                Ok(Instruction::CheckCast(ty))
            }
            tag::LABEL => Ok(Instruction::Label(LabelId(reader.read_u32()?))),
            tag::JUMP_IF_FALSE => Ok(Instruction::JumpIfFalse(LabelId(reader.read_u32()?))),
            tag::RETURN => Ok(Instruction::Return),
            tag::RETURN_VOID => Ok(Instruction::ReturnVoid),
            tag::THROW => Ok(Instruction::Throw),
            tag::OTHER => Ok(Instruction::Other(reader.read_len_bytes()?)),
            _ => Err(DecodeError::InvalidTag(tag, start)),
        }
    }

    fn decode_call(
        reader: &mut UnitReader<'_>,
    ) -> Result<(String, String, String, bool), DecodeError> {
        let owner = reader.read_string()?;
        let name = reader.read_string()?;
        let desc = reader.read_string()?;
        let iface = reader.read_u8()? != 0;
        Ok((owner, name, desc, iface))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(insn: Instruction) -> Instruction {
        let mut writer = UnitWriter::new();
        insn.encode(&mut writer);
        let mut reader = UnitReader::new(writer.buffer());
        let decoded = Instruction::decode(&mut reader).unwrap();
        assert!(!reader.has_more());
        decoded
    }

    #[test]
    fn test_call_roundtrip() {
        let insn = Instruction::StaticCall {
            owner: "com/example/Foo$override".to_string(),
            name: "init$override".to_string(),
            desc: "(Lcom/example/Foo;I)V".to_string(),
            iface: false,
        };
        assert_eq!(roundtrip(insn.clone()), insn);
    }

    #[test]
    fn test_field_roundtrip() {
        let insn = Instruction::FieldWrite {
            owner: "com/example/Foo".to_string(),
            name: "count".to_string(),
            desc: "I".to_string(),
        };
        assert_eq!(roundtrip(insn.clone()), insn);
    }

    #[test]
    fn test_typed_operand_roundtrip() {
        let insn = Instruction::NewArray(TypeDesc::Object("java/lang/Object".to_string()));
        assert_eq!(roundtrip(insn.clone()), insn);

        let insn = Instruction::CheckCast(TypeDesc::Array(Box::new(TypeDesc::Int)));
        assert_eq!(roundtrip(insn.clone()), insn);
    }

    #[test]
    fn test_label_roundtrip() {
        let insn = Instruction::JumpIfFalse(LabelId(7));
        assert_eq!(roundtrip(insn.clone()), insn);
    }

    #[test]
    fn test_opaque_roundtrip() {
        let insn = Instruction::Other(vec![0x2a, 0x60, 0xb1]);
        assert_eq!(roundtrip(insn.clone()), insn);
    }

    #[test]
    fn test_invalid_tag() {
        let bytes = vec![0xEE];
        let mut reader = UnitReader::new(&bytes);
        assert!(matches!(
            Instruction::decode(&mut reader),
            Err(DecodeError::InvalidTag(0xEE, 0))
        ));
    }
}
