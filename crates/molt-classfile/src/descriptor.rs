//! Type and method descriptors
//!
//! Descriptors use the compact class-file notation: single letters for
//! primitives (`I`, `J`, `Z`, ...), `Lpkg/Name;` for object types, a `[`
//! prefix per array dimension, and `(params)ret` for methods.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing a descriptor
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// Descriptor ended before a complete type was read
    #[error("Unexpected end of descriptor `{0}`")]
    UnexpectedEnd(String),

    /// A character that does not start a type
    #[error("Unexpected character `{ch}` at offset {offset} in descriptor `{desc}`")]
    UnexpectedChar {
        /// The full descriptor being parsed
        desc: String,
        /// The offending character
        ch: char,
        /// Byte offset of the offending character
        offset: usize,
    },

    /// Input continued past a complete type
    #[error("Trailing characters after type in descriptor `{0}`")]
    TrailingChars(String),

    /// A method descriptor that does not open with `(`
    #[error("Method descriptor `{0}` does not start with `(`")]
    MissingParams(String),
}

/// A single field or value type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDesc {
    /// `V`
    Void,
    /// `Z`
    Boolean,
    /// `B`
    Byte,
    /// `C`
    Char,
    /// `S`
    Short,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `F`
    Float,
    /// `D`
    Double,
    /// `Lname;` — carries the internal name (`java/lang/String`)
    Object(String),
    /// `[elem`
    Array(Box<TypeDesc>),
}

impl TypeDesc {
    /// Parse a complete descriptor, rejecting trailing input
    pub fn parse(desc: &str) -> Result<Self, DescriptorError> {
        let mut pos = 0;
        let ty = Self::read(desc, &mut pos)?;
        if pos != desc.len() {
            return Err(DescriptorError::TrailingChars(desc.to_string()));
        }
        Ok(ty)
    }

    /// Read one type starting at `pos`, advancing it past the type
    fn read(desc: &str, pos: &mut usize) -> Result<Self, DescriptorError> {
        let bytes = desc.as_bytes();
        let b = *bytes
            .get(*pos)
            .ok_or_else(|| DescriptorError::UnexpectedEnd(desc.to_string()))?;
        *pos += 1;
        match b {
            b'V' => Ok(TypeDesc::Void),
            b'Z' => Ok(TypeDesc::Boolean),
            b'B' => Ok(TypeDesc::Byte),
            b'C' => Ok(TypeDesc::Char),
            b'S' => Ok(TypeDesc::Short),
            b'I' => Ok(TypeDesc::Int),
            b'J' => Ok(TypeDesc::Long),
            b'F' => Ok(TypeDesc::Float),
            b'D' => Ok(TypeDesc::Double),
            b'[' => Ok(TypeDesc::Array(Box::new(Self::read(desc, pos)?))),
            b'L' => {
                let start = *pos;
                while let Some(&c) = bytes.get(*pos) {
                    if c == b';' {
                        let name = desc[start..*pos].to_string();
                        *pos += 1;
                        return Ok(TypeDesc::Object(name));
                    }
                    *pos += 1;
                }
                Err(DescriptorError::UnexpectedEnd(desc.to_string()))
            }
            _ => Err(DescriptorError::UnexpectedChar {
                desc: desc.to_string(),
                ch: b as char,
                offset: *pos - 1,
            }),
        }
    }

    /// Whether this is a primitive (non-reference, non-void) type
    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            TypeDesc::Void | TypeDesc::Object(_) | TypeDesc::Array(_)
        )
    }

    /// Whether this is `void`
    pub fn is_void(&self) -> bool {
        matches!(self, TypeDesc::Void)
    }

    /// Whether this is an object or array type
    pub fn is_reference(&self) -> bool {
        matches!(self, TypeDesc::Object(_) | TypeDesc::Array(_))
    }

    /// The source-form name of this type: `int`, `java.lang.String`, `int[]`
    pub fn class_name(&self) -> String {
        match self {
            TypeDesc::Void => "void".to_string(),
            TypeDesc::Boolean => "boolean".to_string(),
            TypeDesc::Byte => "byte".to_string(),
            TypeDesc::Char => "char".to_string(),
            TypeDesc::Short => "short".to_string(),
            TypeDesc::Int => "int".to_string(),
            TypeDesc::Long => "long".to_string(),
            TypeDesc::Float => "float".to_string(),
            TypeDesc::Double => "double".to_string(),
            TypeDesc::Object(name) => name.replace('/', "."),
            TypeDesc::Array(elem) => format!("{}[]", elem.class_name()),
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Void => f.write_str("V"),
            TypeDesc::Boolean => f.write_str("Z"),
            TypeDesc::Byte => f.write_str("B"),
            TypeDesc::Char => f.write_str("C"),
            TypeDesc::Short => f.write_str("S"),
            TypeDesc::Int => f.write_str("I"),
            TypeDesc::Long => f.write_str("J"),
            TypeDesc::Float => f.write_str("F"),
            TypeDesc::Double => f.write_str("D"),
            TypeDesc::Object(name) => write!(f, "L{};", name),
            TypeDesc::Array(elem) => write!(f, "[{}", elem),
        }
    }
}

/// A parsed method descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDesc {
    /// Parameter types, in declaration order
    pub params: Vec<TypeDesc>,
    /// Return type
    pub ret: TypeDesc,
}

impl MethodDesc {
    /// Parse a method descriptor of the form `(params)ret`
    pub fn parse(desc: &str) -> Result<Self, DescriptorError> {
        if !desc.starts_with('(') {
            return Err(DescriptorError::MissingParams(desc.to_string()));
        }
        let bytes = desc.as_bytes();
        let mut pos = 1;
        let mut params = Vec::new();
        loop {
            match bytes.get(pos) {
                Some(b')') => {
                    pos += 1;
                    break;
                }
                Some(_) => params.push(TypeDesc::read(desc, &mut pos)?),
                None => return Err(DescriptorError::UnexpectedEnd(desc.to_string())),
            }
        }
        let ret = TypeDesc::read(desc, &mut pos)?;
        if pos != desc.len() {
            return Err(DescriptorError::TrailingChars(desc.to_string()));
        }
        Ok(Self { params, ret })
    }
}

impl fmt::Display for MethodDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for param in &self.params {
            write!(f, "{}", param)?;
        }
        write!(f, "){}", self.ret)
    }
}

/// Prepend an explicit receiver of type `owner` to a method descriptor
///
/// Turns `(I)V` on class `Foo` into `(LFoo;I)V`, modeling the implicit
/// receiver of an instance method as the leading parameter of a static one.
pub fn with_receiver(owner: &str, desc: &str) -> String {
    debug_assert!(desc.starts_with('('), "not a method descriptor: {desc}");
    format!("(L{};{}", owner, &desc[1..])
}
