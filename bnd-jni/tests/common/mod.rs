//! Shared type and declaration builders for the integration tests.

#![allow(dead_code)]

use bnd_jni::GenerationContext;
use bnd_jni::model::{
    FieldDecl, FunctionDecl, ParamDecl, StructDecl, TypeKind, TypeNode, TypeRef,
};

pub const PACKAGE: &str = "com.example.geo";

pub fn int() -> TypeRef {
    TypeNode::builtin(TypeKind::Int, "int")
}

pub fn int32_t() -> TypeRef {
    TypeNode::typedef("int32_t", int())
}

pub fn uint32_t() -> TypeRef {
    TypeNode::typedef("uint32_t", TypeNode::builtin(TypeKind::UInt, "unsigned int"))
}

pub fn size_t() -> TypeRef {
    TypeNode::typedef("size_t", TypeNode::builtin(TypeKind::ULong, "unsigned long"))
}

pub fn boolean() -> TypeRef {
    TypeNode::builtin(TypeKind::Bool, "bool")
}

/// `const char *`
pub fn const_char_ptr() -> TypeRef {
    TypeNode::pointer(TypeNode::builtin(TypeKind::CharS, "const char"))
}

pub fn void_ptr() -> TypeRef {
    TypeNode::void_pointer()
}

pub fn point() -> TypeRef {
    TypeNode::record("struct Point")
}

/// `void (*)(int32_t, void *)`
pub fn callback_ptr() -> TypeRef {
    TypeNode::pointer(TypeNode::function(
        TypeNode::void(),
        vec![int32_t(), void_ptr()],
    ))
}

pub fn param(name: &str, ty: TypeRef) -> ParamDecl {
    ParamDecl {
        name: name.to_string(),
        ty,
    }
}

pub fn function(name: &str, return_type: TypeRef, params: Vec<ParamDecl>) -> FunctionDecl {
    FunctionDecl {
        name: name.to_string(),
        return_type,
        params,
    }
}

pub fn field(name: &str, ty: TypeRef) -> FieldDecl {
    FieldDecl {
        name: name.to_string(),
        ty,
    }
}

pub fn structure(name: &str, fields: Vec<FieldDecl>) -> StructDecl {
    StructDecl {
        name: name.to_string(),
        fields,
    }
}

/// `struct Point { int32_t x; int32_t y; }`
pub fn point_decl() -> StructDecl {
    structure("Point", vec![field("x", int32_t()), field("y", int32_t())])
}

pub fn context() -> GenerationContext {
    GenerationContext::new(PACKAGE, "Native")
}
