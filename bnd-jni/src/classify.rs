//! Representation classifier: pure functions from a native type to the
//! shape it crosses the boundary as.

use crate::error::JniError;
use crate::java::JniType;
use crate::model::{TypeKind, TypeNode, TypeRef, TypeShape};

/// Typedef families that are as wide as a pointer.
const POINTER_SIZED: &[&str] = &[
    "size_t",
    "ssize_t",
    "usize_t",
    "intptr_t",
    "uintptr_t",
    "ptrdiff_t",
];

/// A primitive's JNI representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveRepr {
    pub jni: JniType,
    /// The native value is unsigned but travels in a signed Java width.
    pub unsigned: bool,
}

/// A `{u,}int{8,16,32,64}_t` typedef found on a type's sugar chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWidthInt {
    pub bits: u32,
    pub unsigned: bool,
}

/// How a value crosses the boundary, decided by its native type.
#[derive(Debug, Clone, Copy)]
pub enum ValueShape<'a> {
    Primitive,
    /// `char *` in any qualification.
    String,
    /// Pointer to a function prototype.
    FunctionPointer { proto: &'a TypeRef },
    /// Any other pointer; carried as an opaque handle.
    Pointer { pointee: &'a TypeRef },
    Record { name: &'a str },
    Enum { name: &'a str },
}

/// The pointer-sized typedef on `ty`'s sugar chain, if any.
pub fn pointer_sized_integer(ty: &TypeNode) -> Option<&str> {
    ty.sugar_names()
        .into_iter()
        .find(|name| POINTER_SIZED.contains(name))
}

/// The fixed-width integer typedef on `ty`'s sugar chain, if any.
pub fn fixed_width_integer(ty: &TypeNode) -> Option<FixedWidthInt> {
    ty.sugar_names().into_iter().find_map(parse_fixed_width)
}

fn parse_fixed_width(name: &str) -> Option<FixedWidthInt> {
    let (unsigned, rest) = match name.strip_prefix('u') {
        Some(rest) => (true, rest),
        None => (false, name),
    };
    let bits = rest.strip_prefix("int")?.strip_suffix("_t")?;
    let bits = match bits {
        "8" => 8,
        "16" => 16,
        "32" => 32,
        "64" => 64,
        _ => return None,
    };
    Some(FixedWidthInt { bits, unsigned })
}

/// Whether `ty` is carried like a pointer: an actual pointer, or an integer
/// typedef whose width follows the platform pointer width.
pub fn is_pointer_like(ty: &TypeNode) -> bool {
    ty.is_pointer() || pointer_sized_integer(ty).is_some()
}

fn is_unsigned_kind(kind: TypeKind) -> bool {
    matches!(
        kind,
        TypeKind::UChar
            | TypeKind::CharU
            | TypeKind::UInt
            | TypeKind::ULong
            | TypeKind::ULongLong
            | TypeKind::Char32
    )
}

/// Classify a builtin scalar.
///
/// Typedef families win over the builtin kind so that `uint16_t` maps to
/// `jchar` regardless of what `unsigned short` is on the target.
pub fn classify_primitive(ty: &TypeNode) -> Result<PrimitiveRepr, JniError> {
    let kind = ty.desugared().kind();
    let kind_unsigned = is_unsigned_kind(kind);

    if let Some(name) = pointer_sized_integer(ty) {
        return Ok(PrimitiveRepr {
            jni: JniType::JLong,
            unsigned: name.starts_with('u') || kind_unsigned,
        });
    }

    if let Some(fixed) = fixed_width_integer(ty) {
        let jni = match (fixed.bits, fixed.unsigned) {
            (8, _) => JniType::JByte,
            (16, false) => JniType::JShort,
            (16, true) => JniType::JChar,
            (32, _) => JniType::JInt,
            _ => JniType::JLong,
        };
        return Ok(PrimitiveRepr {
            jni,
            unsigned: fixed.unsigned && fixed.bits != 16,
        });
    }

    let jni = match kind {
        TypeKind::Bool => JniType::JBoolean,
        TypeKind::CharS | TypeKind::CharU | TypeKind::SChar | TypeKind::UChar => JniType::JByte,
        TypeKind::Short => JniType::JShort,
        TypeKind::UShort | TypeKind::Char16 => JniType::JChar,
        TypeKind::Int | TypeKind::UInt | TypeKind::Char32 | TypeKind::WChar => JniType::JInt,
        TypeKind::Long | TypeKind::ULong | TypeKind::LongLong | TypeKind::ULongLong => {
            JniType::JLong
        }
        TypeKind::Float => JniType::JFloat,
        TypeKind::Double => JniType::JDouble,
        _ => return Err(JniError::unsupported_type(ty)),
    };
    Ok(PrimitiveRepr {
        jni,
        unsigned: kind_unsigned,
    })
}

/// Decide the value shape of `ty`. First match wins: builtin, `char *`,
/// function pointer, other pointer, record, enum.
pub fn value_shape(ty: &TypeRef) -> Result<ValueShape<'_>, JniError> {
    let node = TypeNode::resolve(ty);
    match node.shape() {
        TypeShape::Builtin if node.kind() != TypeKind::Void => Ok(ValueShape::Primitive),
        TypeShape::Pointer { pointee } => {
            let target = TypeNode::resolve(pointee);
            Ok(match target.kind() {
                TypeKind::CharS | TypeKind::CharU => ValueShape::String,
                TypeKind::FunctionProto => ValueShape::FunctionPointer { proto: target },
                _ => ValueShape::Pointer { pointee },
            })
        }
        TypeShape::Record { name } => Ok(ValueShape::Record { name }),
        TypeShape::Enum { name } => Ok(ValueShape::Enum { name }),
        TypeShape::Builtin
        | TypeShape::FunctionProto { .. }
        | TypeShape::Array { .. }
        | TypeShape::Typedef { .. } => Err(JniError::unsupported_type(ty)),
    }
}

/// Parameter types and return type of a function prototype.
pub fn prototype(proto: &TypeRef) -> Option<(&TypeRef, &[TypeRef])> {
    match TypeNode::resolve(proto).shape() {
        TypeShape::FunctionProto {
            return_type,
            params,
        } => Some((return_type, params)),
        _ => None,
    }
}
