//! Struct layout metadata: the arranger calls that let the Java side
//! compute field offsets and the struct size with the target's C layout
//! rules.

use crate::classify;
use crate::context::GenerationContext;
use crate::error::JniError;
use crate::model::{StructDecl, TypeKind, TypeNode, TypeRef, TypeShape};
use crate::names;

/// One field's offset constant and the call that places it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub field: String,
    /// Name of the `static final long` holding the offset.
    pub offset_field: String,
    /// `$structArranger.addCIntField()` and friends.
    pub arrangement: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayoutMeta {
    pub layout_field: String,
    pub size_field: String,
    pub fields: Vec<FieldLayout>,
}

pub fn layout_meta(decl: &StructDecl, ctx: &GenerationContext) -> Result<StructLayoutMeta, JniError> {
    let namings = ctx.namings();
    let fields = decl
        .fields
        .iter()
        .map(|field| {
            Ok(FieldLayout {
                field: field.name.clone(),
                offset_field: namings.offset_field(&field.name),
                arrangement: arrangement(&field.ty, ctx)?,
            })
        })
        .collect::<Result<_, JniError>>()?;
    Ok(StructLayoutMeta {
        layout_field: namings.struct_layout_field.clone(),
        size_field: namings.struct_size_field.clone(),
        fields,
    })
}

fn arranger(call: &str) -> String {
    format!("{}.{call}", names::STRUCT_ARRANGER)
}

fn arrangement(ty: &TypeRef, ctx: &GenerationContext) -> Result<String, JniError> {
    if classify::is_pointer_like(ty) {
        return Ok(arranger("addCPointerField()"));
    }
    if let Some(fixed) = classify::fixed_width_integer(ty) {
        return Ok(arranger(&format!("addFixedField({})", fixed.bits / 8)));
    }
    let node = TypeNode::resolve(ty);
    let call = match node.shape() {
        TypeShape::Record { name } => {
            let layout = ctx
                .struct_wrapper(name)
                .filter(|w| w.layout_meta)
                .and_then(|w| w.java_type.name());
            return match layout {
                Some(java_name) => Ok(arranger(&format!(
                    "addField({java_name}.{})",
                    ctx.namings().struct_layout_field
                ))),
                None => Err(JniError::scenario(format!(
                    "can't resolve field offsets for struct {name}: it is not generated with layout metadata"
                ))),
            };
        }
        TypeShape::Enum { .. } => "addCIntField()",
        TypeShape::Builtin => match node.kind() {
            TypeKind::Bool => "addCBoolField()",
            TypeKind::CharS | TypeKind::CharU | TypeKind::SChar | TypeKind::UChar => {
                "addCCharField()"
            }
            TypeKind::Short | TypeKind::UShort | TypeKind::Char16 => "addCShortField()",
            TypeKind::Int | TypeKind::UInt | TypeKind::Char32 | TypeKind::WChar => "addCIntField()",
            TypeKind::Long | TypeKind::ULong => "addCLongField()",
            TypeKind::LongLong | TypeKind::ULongLong => "addCLongLongField()",
            TypeKind::Float => "addCFloatField()",
            TypeKind::Double => "addCDoubleField()",
            _ => return Err(JniError::unsupported_type(ty)),
        },
        _ => return Err(JniError::unsupported_type(ty)),
    };
    Ok(arranger(call))
}
