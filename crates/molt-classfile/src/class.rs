//! Compiled class model and unit container format

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoder::{DecodeError, UnitReader, UnitWriter};
use crate::insn::Instruction;

/// Magic number for molt unit files: "MOLT"
pub const MAGIC: [u8; 4] = *b"MOLT";

/// Current unit format version
pub const VERSION: u32 = 1;

/// Unit encoding/decoding errors
#[derive(Debug, Error)]
pub enum UnitError {
    /// Decode error
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Invalid magic number
    #[error("Invalid magic number: expected MOLT, got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Unsupported version
    #[error("Unsupported version: {0} (current: {VERSION})")]
    UnsupportedVersion(u32),

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// Checksum stored in the header
        expected: u32,
        /// Checksum computed over the payload
        actual: u32,
    },
}

/// Access and property flags
///
/// The bit values follow the class-file convention so a loader can carry
/// flag words through unchanged.
pub mod access {
    /// Declared public
    pub const PUBLIC: u32 = 0x0001;
    /// Declared private
    pub const PRIVATE: u32 = 0x0002;
    /// Declared protected
    pub const PROTECTED: u32 = 0x0004;
    /// Declared static
    pub const STATIC: u32 = 0x0008;
    /// Declared final
    pub const FINAL: u32 = 0x0010;
    /// Declared synchronized (methods)
    pub const SYNCHRONIZED: u32 = 0x0020;
    /// Declared with variable arity (methods)
    pub const VARARGS: u32 = 0x0080;
    /// An interface, not a class
    pub const INTERFACE: u32 = 0x0200;
    /// Declared abstract
    pub const ABSTRACT: u32 = 0x0400;
}

/// A field of a compiled class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Field type descriptor
    pub desc: String,
    /// Access flags
    pub access: u32,
}

impl Field {
    /// Whether the field is static
    pub fn is_static(&self) -> bool {
        self.access & access::STATIC != 0
    }

    /// Whether the field is declared public
    pub fn is_public(&self) -> bool {
        self.access & access::PUBLIC != 0
    }

    /// Whether the field is declared private
    pub fn is_private(&self) -> bool {
        self.access & access::PRIVATE != 0
    }

    /// Whether the field is declared protected
    pub fn is_protected(&self) -> bool {
        self.access & access::PROTECTED != 0
    }

    /// Whether the field has default (package-private) access
    pub fn is_package_private(&self) -> bool {
        self.access & (access::PUBLIC | access::PRIVATE | access::PROTECTED) == 0
    }

    fn encode(&self, writer: &mut UnitWriter) {
        writer.emit_string(&self.name);
        writer.emit_string(&self.desc);
        writer.emit_u32(self.access);
    }

    fn decode(reader: &mut UnitReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            name: reader.read_string()?,
            desc: reader.read_string()?,
            access: reader.read_u32()?,
        })
    }
}

/// A method of a compiled class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    /// Method name (`<init>` for constructors, `<clinit>` for the static
    /// initializer)
    pub name: String,
    /// Method descriptor
    pub desc: String,
    /// Access flags
    pub access: u32,
    /// Internal names of declared thrown exception types
    pub exceptions: Vec<String>,
    /// Number of local variable slots the body uses
    pub max_locals: u16,
    /// Instruction stream
    pub code: Vec<Instruction>,
}

impl Method {
    /// Whether the method is static
    pub fn is_static(&self) -> bool {
        self.access & access::STATIC != 0
    }

    /// Whether the method is declared public
    pub fn is_public(&self) -> bool {
        self.access & access::PUBLIC != 0
    }

    fn encode(&self, writer: &mut UnitWriter) {
        writer.emit_string(&self.name);
        writer.emit_string(&self.desc);
        writer.emit_u32(self.access);

        writer.emit_u32(self.exceptions.len() as u32);
        for exception in &self.exceptions {
            writer.emit_string(exception);
        }

        writer.emit_u16(self.max_locals);

        writer.emit_u32(self.code.len() as u32);
        for insn in &self.code {
            insn.encode(writer);
        }
    }

    fn decode(reader: &mut UnitReader<'_>) -> Result<Self, DecodeError> {
        let name = reader.read_string()?;
        let desc = reader.read_string()?;
        let access = reader.read_u32()?;

        let exception_count = reader.read_u32()? as usize;
        let mut exceptions = Vec::with_capacity(exception_count);
        for _ in 0..exception_count {
            exceptions.push(reader.read_string()?);
        }

        let max_locals = reader.read_u16()?;

        let insn_count = reader.read_u32()? as usize;
        let mut code = Vec::with_capacity(insn_count);
        for _ in 0..insn_count {
            code.push(Instruction::decode(reader)?);
        }

        Ok(Self {
            name,
            desc,
            access,
            exceptions,
            max_locals,
            code,
        })
    }
}

/// A compiled class
///
/// The structural representation an external loader produces from a binary
/// class file, and the shape of the override unit the transformer emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledClass {
    /// Internal class name (`com/example/Foo`)
    pub name: String,
    /// Internal name of the superclass; absent for the root object type
    pub super_name: Option<String>,
    /// Access flags
    pub access: u32,
    /// Internal names of implemented interfaces
    pub interfaces: Vec<String>,
    /// Declared fields, in declaration order
    pub fields: Vec<Field>,
    /// Declared methods, in declaration order
    pub methods: Vec<Method>,
}

impl CompiledClass {
    /// Create a new empty class
    pub fn new(name: String, super_name: Option<String>, access: u32) -> Self {
        Self {
            name,
            super_name,
            access,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Look up a field by name
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a method by name and descriptor
    pub fn method_by(&self, name: &str, desc: &str) -> Option<&Method> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.desc == desc)
    }

    /// Serialize to the JSON interchange form used by external loaders
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from the JSON interchange form
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Encode the class to the binary unit format
    ///
    /// Layout: magic (4 bytes) + version (u32) + checksum (u32), followed
    /// by the checksummed payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = UnitWriter::with_capacity(256);

        writer.buffer.extend_from_slice(&MAGIC);
        writer.emit_u32(VERSION);
        let checksum_offset = writer.reserve_u32();
        let payload_start = writer.offset();

        writer.emit_string(&self.name);
        match &self.super_name {
            Some(name) => {
                writer.emit_u8(1);
                writer.emit_string(name);
            }
            None => writer.emit_u8(0),
        }
        writer.emit_u32(self.access);

        writer.emit_u32(self.interfaces.len() as u32);
        for interface in &self.interfaces {
            writer.emit_string(interface);
        }

        writer.emit_u32(self.fields.len() as u32);
        for field in &self.fields {
            field.encode(&mut writer);
        }

        writer.emit_u32(self.methods.len() as u32);
        for method in &self.methods {
            method.encode(&mut writer);
        }

        let checksum = crc32fast::hash(&writer.buffer()[payload_start..]);
        writer.patch_u32(checksum_offset, checksum);

        writer.into_bytes()
    }

    /// Decode a class from the binary unit format
    pub fn decode(data: &[u8]) -> Result<Self, UnitError> {
        let mut reader = UnitReader::new(data);

        let magic = reader.read_bytes(4)?;
        let magic: [u8; 4] = magic.try_into().expect("read_bytes returned 4 bytes");
        if magic != MAGIC {
            return Err(UnitError::InvalidMagic(magic));
        }

        let version = reader.read_u32()?;
        if version != VERSION {
            return Err(UnitError::UnsupportedVersion(version));
        }

        let stored_checksum = reader.read_u32()?;
        let payload = &data[reader.position()..];
        let actual_checksum = crc32fast::hash(payload);
        if stored_checksum != actual_checksum {
            return Err(UnitError::ChecksumMismatch {
                expected: stored_checksum,
                actual: actual_checksum,
            });
        }

        let name = reader.read_string()?;
        let super_name = if reader.read_u8()? != 0 {
            Some(reader.read_string()?)
        } else {
            None
        };
        let access = reader.read_u32()?;

        let interface_count = reader.read_u32()? as usize;
        let mut interfaces = Vec::with_capacity(interface_count);
        for _ in 0..interface_count {
            interfaces.push(reader.read_string()?);
        }

        let field_count = reader.read_u32()? as usize;
        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            fields.push(Field::decode(&mut reader)?);
        }

        let method_count = reader.read_u32()? as usize;
        let mut methods = Vec::with_capacity(method_count);
        for _ in 0..method_count {
            methods.push(Method::decode(&mut reader)?);
        }

        Ok(Self {
            name,
            super_name,
            access,
            interfaces,
            fields,
            methods,
        })
    }
}
