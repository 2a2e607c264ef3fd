//! Method signatures on each layer of the boundary.

use std::fmt;

use crate::java::{JavaType, JniType};
use crate::model::TypeRef;

/// A named, typed parameter on one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param<T> {
    pub ty: T,
    pub name: String,
}

impl<T> Param<T> {
    pub fn new(ty: T, name: impl Into<String>) -> Self {
        Param {
            ty,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// A Java method declaration.
#[derive(Debug, Clone)]
pub struct JavaMethod {
    pub name: String,
    pub return_type: JavaType,
    pub params: Vec<Param<JavaType>>,
    pub visibility: Visibility,
    pub is_static: bool,
    /// Bodyless `native` method bound to a JNI glue function.
    pub is_native: bool,
}

impl JavaMethod {
    /// JNI method descriptor, e.g. `(IJ)Ljava/lang/String;`.
    pub fn jni_signature(&self) -> String {
        let params: String = self.params.iter().map(|p| p.ty.jni_signature()).collect();
        format!("({params}){}", self.return_type.jni_signature())
    }
}

impl fmt::Display for JavaMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.visibility {
            Visibility::Public => f.write_str("public ")?,
            Visibility::Private => f.write_str("private ")?,
        }
        if self.is_static {
            f.write_str("static ")?;
        }
        if self.is_native {
            f.write_str("native ")?;
        }
        write!(f, "{} {}(", self.return_type, self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", p.ty, p.name)?;
        }
        f.write_str(")")
    }
}

/// An exported `JNIEXPORT` glue function. The JNI environment and the
/// receiver (`jclass` for static natives) precede `params`.
#[derive(Debug, Clone)]
pub struct JniGlueMethod {
    /// Short-name mangled symbol (`Java_pkg_Class_method`).
    pub name: String,
    pub return_type: JniType,
    pub params: Vec<Param<JniType>>,
}

impl fmt::Display for JniGlueMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JNIEXPORT {} JNICALL {}(JNIEnv* {}, jclass",
            self.return_type,
            self.name,
            crate::names::JNI_ENV
        )?;
        for p in &self.params {
            write!(f, ", {} {}", p.ty, p.name)?;
        }
        f.write_str(")")
    }
}

/// A native function or closure signature in raw spellings.
#[derive(Debug, Clone)]
pub struct NativeMethod {
    pub name: String,
    pub return_type: TypeRef,
    pub params: Vec<Param<TypeRef>>,
}

impl fmt::Display for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}(",
            self.return_type.verbatim_spelling(),
            self.name
        )?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", p.ty.verbatim_spelling(), p.name)?;
        }
        f.write_str(")")
    }
}
