//! Java-side and JNI-side type representations.

use std::fmt;

/// Primitive tag of a Java type, `Object` and `Array` for references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JavaTypeKind {
    Void,
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Object,
    Array,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum JavaRepr {
    Builtin(JavaTypeKind),
    Object {
        package: String,
        /// Simple name, nested classes joined with `.` (`Native.Point`).
        name: String,
        generics: Vec<JavaType>,
    },
    Array(Box<JavaType>),
}

/// A Java type with its type-use annotations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JavaType {
    repr: JavaRepr,
    annotations: Vec<String>,
}

impl JavaType {
    pub const VOID: JavaType = JavaType::builtin(JavaTypeKind::Void);
    pub const BOOLEAN: JavaType = JavaType::builtin(JavaTypeKind::Boolean);
    pub const BYTE: JavaType = JavaType::builtin(JavaTypeKind::Byte);
    pub const CHAR: JavaType = JavaType::builtin(JavaTypeKind::Char);
    pub const SHORT: JavaType = JavaType::builtin(JavaTypeKind::Short);
    pub const INT: JavaType = JavaType::builtin(JavaTypeKind::Int);
    pub const LONG: JavaType = JavaType::builtin(JavaTypeKind::Long);
    pub const FLOAT: JavaType = JavaType::builtin(JavaTypeKind::Float);
    pub const DOUBLE: JavaType = JavaType::builtin(JavaTypeKind::Double);

    const fn builtin(kind: JavaTypeKind) -> JavaType {
        JavaType {
            repr: JavaRepr::Builtin(kind),
            annotations: Vec::new(),
        }
    }

    pub fn object(package: impl Into<String>, name: impl Into<String>) -> JavaType {
        Self::generic_object(package, name, Vec::new())
    }

    pub fn generic_object(
        package: impl Into<String>,
        name: impl Into<String>,
        generics: Vec<JavaType>,
    ) -> JavaType {
        JavaType {
            repr: JavaRepr::Object {
                package: package.into(),
                name: name.into(),
                generics,
            },
            annotations: Vec::new(),
        }
    }

    pub fn array(element: JavaType) -> JavaType {
        JavaType {
            repr: JavaRepr::Array(Box::new(element)),
            annotations: Vec::new(),
        }
    }

    pub fn string() -> JavaType {
        Self::object("java.lang", "String")
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> JavaType {
        self.annotations.push(annotation.into());
        self
    }

    pub fn annotations(&self) -> &[String] {
        &self.annotations
    }

    pub fn kind(&self) -> JavaTypeKind {
        match &self.repr {
            JavaRepr::Builtin(kind) => *kind,
            JavaRepr::Object { .. } => JavaTypeKind::Object,
            JavaRepr::Array(_) => JavaTypeKind::Array,
        }
    }

    pub fn is_void(&self) -> bool {
        self.kind() == JavaTypeKind::Void
    }

    /// Simple (possibly nested) name of an object type.
    pub fn name(&self) -> Option<&str> {
        match &self.repr {
            JavaRepr::Object { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn package(&self) -> Option<&str> {
        match &self.repr {
            JavaRepr::Object { package, .. } => Some(package),
            _ => None,
        }
    }

    /// Class name as the JVM sees it: `pkg/path/Outer$Inner`.
    pub fn jni_class_name(&self) -> Option<String> {
        match &self.repr {
            JavaRepr::Object { package, name, .. } => {
                let binary = name.replace('.', "$");
                if package.is_empty() {
                    Some(binary)
                } else {
                    Some(format!("{}/{binary}", package.replace('.', "/")))
                }
            }
            _ => None,
        }
    }

    /// JNI field descriptor (`I`, `J`, `Ljava/lang/String;`, `[B`).
    pub fn jni_signature(&self) -> String {
        match &self.repr {
            JavaRepr::Builtin(kind) => match kind {
                JavaTypeKind::Void => "V",
                JavaTypeKind::Boolean => "Z",
                JavaTypeKind::Byte => "B",
                JavaTypeKind::Char => "C",
                JavaTypeKind::Short => "S",
                JavaTypeKind::Int => "I",
                JavaTypeKind::Long => "J",
                JavaTypeKind::Float => "F",
                JavaTypeKind::Double => "D",
                JavaTypeKind::Object | JavaTypeKind::Array => unreachable!("not a builtin"),
            }
            .to_string(),
            JavaRepr::Object { .. } => {
                format!("L{};", self.jni_class_name().unwrap_or_default())
            }
            JavaRepr::Array(element) => format!("[{}", element.jni_signature()),
        }
    }

    /// The type as written in source, without annotations.
    pub fn plain(&self) -> String {
        match &self.repr {
            JavaRepr::Builtin(kind) => match kind {
                JavaTypeKind::Void => "void",
                JavaTypeKind::Boolean => "boolean",
                JavaTypeKind::Byte => "byte",
                JavaTypeKind::Char => "char",
                JavaTypeKind::Short => "short",
                JavaTypeKind::Int => "int",
                JavaTypeKind::Long => "long",
                JavaTypeKind::Float => "float",
                JavaTypeKind::Double => "double",
                JavaTypeKind::Object | JavaTypeKind::Array => unreachable!("not a builtin"),
            }
            .to_string(),
            JavaRepr::Object {
                package,
                name,
                generics,
            } => {
                let mut out = if package.is_empty() {
                    name.clone()
                } else {
                    format!("{package}.{name}")
                };
                if !generics.is_empty() {
                    let args: Vec<String> = generics.iter().map(|g| g.to_string()).collect();
                    out.push_str(&format!("<{}>", args.join(", ")));
                }
                out
            }
            JavaRepr::Array(element) => format!("{element}[]"),
        }
    }
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for annotation in &self.annotations {
            write!(f, "{annotation} ")?;
        }
        f.write_str(&self.plain())
    }
}

/// A JNI C type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JniType {
    Void,
    JObject,
    JClass,
    JString,
    JThrowable,
    JMethodId,
    JBoolean,
    JByte,
    JChar,
    JShort,
    JInt,
    JLong,
    JFloat,
    JDouble,
    JObjectArray,
    JBooleanArray,
    JByteArray,
    JCharArray,
    JShortArray,
    JIntArray,
    JLongArray,
    JFloatArray,
    JDoubleArray,
}

impl JniType {
    pub fn c_name(self) -> &'static str {
        match self {
            JniType::Void => "void",
            JniType::JObject => "jobject",
            JniType::JClass => "jclass",
            JniType::JString => "jstring",
            JniType::JThrowable => "jthrowable",
            JniType::JMethodId => "jmethodID",
            JniType::JBoolean => "jboolean",
            JniType::JByte => "jbyte",
            JniType::JChar => "jchar",
            JniType::JShort => "jshort",
            JniType::JInt => "jint",
            JniType::JLong => "jlong",
            JniType::JFloat => "jfloat",
            JniType::JDouble => "jdouble",
            JniType::JObjectArray => "jobjectArray",
            JniType::JBooleanArray => "jbooleanArray",
            JniType::JByteArray => "jbyteArray",
            JniType::JCharArray => "jcharArray",
            JniType::JShortArray => "jshortArray",
            JniType::JIntArray => "jintArray",
            JniType::JLongArray => "jlongArray",
            JniType::JFloatArray => "jfloatArray",
            JniType::JDoubleArray => "jdoubleArray",
        }
    }

    /// The Java type a raw `native` method declares for this JNI type.
    ///
    /// Object-like types have no single Java counterpart and yield `None`.
    pub fn as_java(self) -> Option<JavaType> {
        let ty = match self {
            JniType::Void => JavaType::VOID,
            JniType::JBoolean => JavaType::BOOLEAN,
            JniType::JByte => JavaType::BYTE,
            JniType::JChar => JavaType::CHAR,
            JniType::JShort => JavaType::SHORT,
            JniType::JInt => JavaType::INT,
            JniType::JLong => JavaType::LONG,
            JniType::JFloat => JavaType::FLOAT,
            JniType::JDouble => JavaType::DOUBLE,
            JniType::JString => JavaType::string(),
            JniType::JBooleanArray => JavaType::array(JavaType::BOOLEAN),
            JniType::JByteArray => JavaType::array(JavaType::BYTE),
            JniType::JCharArray => JavaType::array(JavaType::CHAR),
            JniType::JShortArray => JavaType::array(JavaType::SHORT),
            JniType::JIntArray => JavaType::array(JavaType::INT),
            JniType::JLongArray => JavaType::array(JavaType::LONG),
            JniType::JFloatArray => JavaType::array(JavaType::FLOAT),
            JniType::JDoubleArray => JavaType::array(JavaType::DOUBLE),
            JniType::JObject
            | JniType::JClass
            | JniType::JThrowable
            | JniType::JMethodId
            | JniType::JObjectArray => return None,
        };
        Some(ty)
    }

    /// Suffix of the `Call<Static><X>Method` family for this return type.
    pub fn call_method_suffix(self) -> &'static str {
        match self {
            JniType::Void => "Void",
            JniType::JBoolean => "Boolean",
            JniType::JByte => "Byte",
            JniType::JChar => "Char",
            JniType::JShort => "Short",
            JniType::JInt => "Int",
            JniType::JLong => "Long",
            JniType::JFloat => "Float",
            JniType::JDouble => "Double",
            _ => "Object",
        }
    }
}

impl fmt::Display for JniType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.c_name())
    }
}
