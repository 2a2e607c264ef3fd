//! Intermediate model: native types and declarations handed to the linker.
//!
//! A [`TypeNode`] describes one native type in canonical form. Nodes are
//! immutable and shared through [`TypeRef`]; the sugared spelling a
//! declaration was written with (typedef names, elaborated tags) is attached
//! in a second pass by [`TypeNode::with_verbatim`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Shared handle to an immutable type node.
pub type TypeRef = Arc<TypeNode>;

/// Native type-kind tag, mirroring the libclang kinds the front-end sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Bool,
    /// Plain `char` on a target where it is signed.
    CharS,
    /// Plain `char` on a target where it is unsigned.
    CharU,
    SChar,
    UChar,
    Char16,
    Char32,
    WChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Int128,
    UInt128,
    Half,
    Float,
    Double,
    LongDouble,
    NullPtr,
    Pointer,
    Record,
    Enum,
    FunctionProto,
    Typedef,
    ConstantArray,
    IncompleteArray,
}

impl TypeKind {
    /// Whether this kind is a builtin scalar (including `void`).
    pub fn is_builtin(self) -> bool {
        !matches!(
            self,
            TypeKind::Pointer
                | TypeKind::Record
                | TypeKind::Enum
                | TypeKind::FunctionProto
                | TypeKind::Typedef
                | TypeKind::ConstantArray
                | TypeKind::IncompleteArray
        )
    }
}

/// Whether a node's verbatim sibling differs from the node itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbatimStatus {
    /// The node is spelled the same way in the source.
    Verbatim,
    /// The source spelled the type differently; see [`TypeNode::verbatim`].
    NonVerbatim,
    /// No verbatim tree was ever paired with this node.
    Undetermined,
}

/// Structural payload of a [`TypeNode`].
#[derive(Debug, Clone)]
pub enum TypeShape {
    Builtin,
    Pointer {
        pointee: TypeRef,
    },
    Record {
        name: String,
    },
    FunctionProto {
        return_type: TypeRef,
        params: Vec<TypeRef>,
    },
    Enum {
        name: String,
    },
    Typedef {
        name: String,
        defined: TypeRef,
    },
    /// Fixed (`len = Some`) or incomplete array; has no boundary representation.
    Array {
        element: TypeRef,
        len: Option<usize>,
    },
}

/// One native type.
///
/// Equality and hashing only look at the spelling and the kind tag, so two
/// separately built nodes for `int32_t *` compare equal.
#[derive(Debug, Clone)]
pub struct TypeNode {
    spelling: String,
    kind: TypeKind,
    shape: TypeShape,
    verbatim: Option<TypeRef>,
    verbatim_status: VerbatimStatus,
}

impl PartialEq for TypeNode {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.spelling == other.spelling
    }
}

impl Eq for TypeNode {}

impl Hash for TypeNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.spelling.hash(state);
        self.kind.hash(state);
    }
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spelling)
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl TypeNode {
    fn new(spelling: impl Into<String>, kind: TypeKind, shape: TypeShape) -> TypeRef {
        Arc::new(TypeNode {
            spelling: spelling.into(),
            kind,
            shape,
            verbatim: None,
            verbatim_status: VerbatimStatus::Undetermined,
        })
    }

    /// A builtin scalar. `spelling` may carry qualifiers (`const char`).
    pub fn builtin(kind: TypeKind, spelling: impl Into<String>) -> TypeRef {
        debug_assert!(kind.is_builtin(), "{kind:?} is not a builtin kind");
        Self::new(spelling, kind, TypeShape::Builtin)
    }

    pub fn void() -> TypeRef {
        Self::builtin(TypeKind::Void, "void")
    }

    /// `void *`, the context slot of the callback protocol.
    pub fn void_pointer() -> TypeRef {
        Self::pointer(Self::void())
    }

    /// Pointer to `pointee`, spelled the way clang prints it (`int *`,
    /// `void (*)(int, void *)`).
    pub fn pointer(pointee: TypeRef) -> TypeRef {
        let spelling = match &pointee.shape {
            TypeShape::FunctionProto {
                return_type,
                params,
            } => format!("{return_type} (*)({})", join_spellings(params)),
            _ => format!("{} *", pointee.spelling),
        };
        Self::new(spelling, TypeKind::Pointer, TypeShape::Pointer { pointee })
    }

    /// Pointer with an explicit spelling (e.g. `const char *const`).
    pub fn pointer_spelled(spelling: impl Into<String>, pointee: TypeRef) -> TypeRef {
        Self::new(spelling, TypeKind::Pointer, TypeShape::Pointer { pointee })
    }

    /// A struct/union. The record name is the spelling without qualifier
    /// and tag keywords.
    pub fn record(spelling: impl Into<String>) -> TypeRef {
        let spelling = spelling.into();
        let name = strip_qualifiers(&spelling);
        Self::new(spelling, TypeKind::Record, TypeShape::Record { name })
    }

    pub fn enumeration(spelling: impl Into<String>) -> TypeRef {
        let spelling = spelling.into();
        let name = strip_qualifiers(&spelling);
        Self::new(spelling, TypeKind::Enum, TypeShape::Enum { name })
    }

    /// Function prototype, spelled `ret (p1, p2)`.
    pub fn function(return_type: TypeRef, params: Vec<TypeRef>) -> TypeRef {
        let spelling = format!("{return_type} ({})", join_spellings(&params));
        Self::new(
            spelling,
            TypeKind::FunctionProto,
            TypeShape::FunctionProto {
                return_type,
                params,
            },
        )
    }

    pub fn typedef(name: impl Into<String>, defined: TypeRef) -> TypeRef {
        let name = name.into();
        Self::new(
            name.clone(),
            TypeKind::Typedef,
            TypeShape::Typedef { name, defined },
        )
    }

    pub fn array(element: TypeRef, len: Option<usize>) -> TypeRef {
        let (spelling, kind) = match len {
            Some(n) => (format!("{element}[{n}]"), TypeKind::ConstantArray),
            None => (format!("{element}[]"), TypeKind::IncompleteArray),
        };
        Self::new(spelling, kind, TypeShape::Array { element, len })
    }

    /// Pair a canonical tree with the sugared tree the source spelled.
    ///
    /// Returns a copy of `canonical` in which every node whose counterpart
    /// could be located carries it as its verbatim sibling. Typedefs on the
    /// verbatim side are looked through so that `FooHandle` (a typedef of
    /// `struct Foo *`) still pairs the pointee `struct Foo` with `Foo`.
    pub fn with_verbatim(canonical: &TypeRef, verbatim: &TypeRef) -> TypeRef {
        let status = if canonical.spelling == verbatim.spelling {
            VerbatimStatus::Verbatim
        } else {
            VerbatimStatus::NonVerbatim
        };
        let sugar_free = verbatim.desugared();
        let shape = match (&canonical.shape, &sugar_free.shape) {
            (TypeShape::Pointer { pointee: c }, TypeShape::Pointer { pointee: v }) => {
                TypeShape::Pointer {
                    pointee: Self::with_verbatim(c, v),
                }
            }
            (
                TypeShape::FunctionProto {
                    return_type: cr,
                    params: cp,
                },
                TypeShape::FunctionProto {
                    return_type: vr,
                    params: vp,
                },
            ) if cp.len() == vp.len() => TypeShape::FunctionProto {
                return_type: Self::with_verbatim(cr, vr),
                params: cp
                    .iter()
                    .zip(vp)
                    .map(|(c, v)| Self::with_verbatim(c, v))
                    .collect(),
            },
            (
                TypeShape::Array {
                    element: ce,
                    len: cl,
                },
                TypeShape::Array { element: ve, .. },
            ) => TypeShape::Array {
                element: Self::with_verbatim(ce, ve),
                len: *cl,
            },
            (shape, _) => shape.clone(),
        };
        Arc::new(TypeNode {
            spelling: canonical.spelling.clone(),
            kind: canonical.kind,
            shape,
            verbatim: (status == VerbatimStatus::NonVerbatim).then(|| verbatim.clone()),
            verbatim_status: status,
        })
    }
}

fn join_spellings(types: &[TypeRef]) -> String {
    types
        .iter()
        .map(|t| t.spelling.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Drop leading qualifier and tag keywords: `"const  struct Foo"` -> `"Foo"`.
pub fn strip_qualifiers(spelling: &str) -> String {
    const SKIPPED: &[&str] = &[
        "const", "volatile", "restrict", "struct", "union", "enum", "class",
    ];
    spelling
        .split_whitespace()
        .skip_while(|word| SKIPPED.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl TypeNode {
    pub fn spelling(&self) -> &str {
        &self.spelling
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    pub fn verbatim(&self) -> Option<&TypeRef> {
        self.verbatim.as_ref()
    }

    pub fn verbatim_status(&self) -> VerbatimStatus {
        self.verbatim_status
    }

    /// The spelling the source used, falling back to the canonical one.
    pub fn verbatim_spelling(&self) -> &str {
        self.verbatim
            .as_ref()
            .map_or(self.spelling.as_str(), |v| v.spelling.as_str())
    }

    /// Follow typedefs down to the first non-typedef node.
    pub fn desugared(&self) -> &TypeNode {
        match &self.shape {
            TypeShape::Typedef { defined, .. } => defined.desugared(),
            _ => self,
        }
    }

    /// Like [`TypeNode::desugared`], but keeps the shared handle.
    pub fn resolve(this: &TypeRef) -> &TypeRef {
        match &this.shape {
            TypeShape::Typedef { defined, .. } => Self::resolve(defined),
            _ => this,
        }
    }

    /// Every typedef name on this node's chain, then on its verbatim
    /// sibling's chain, outermost first.
    pub fn sugar_names(&self) -> Vec<&str> {
        fn push_chain<'a>(mut node: &'a TypeNode, names: &mut Vec<&'a str>) {
            while let TypeShape::Typedef { name, defined } = &node.shape {
                names.push(name.as_str());
                node = defined;
            }
        }
        let mut names = Vec::new();
        push_chain(self, &mut names);
        if let Some(v) = &self.verbatim {
            push_chain(v, &mut names);
        }
        names
    }

    pub fn pointee(&self) -> Option<&TypeRef> {
        match &self.desugared().shape {
            TypeShape::Pointer { pointee } => Some(pointee),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        self.desugared().kind == TypeKind::Void
    }

    /// `void *` with any qualifiers on the pointee. A callback context slot
    /// must be unqualified; see `linker::is_bare_void_pointer`.
    pub fn is_void_pointer(&self) -> bool {
        self.pointee().is_some_and(|p| p.is_void())
    }

    pub fn is_pointer(&self) -> bool {
        self.pointee().is_some()
    }

    pub fn record_name(&self) -> Option<&str> {
        match &self.desugared().shape {
            TypeShape::Record { name } => Some(name),
            _ => None,
        }
    }

    pub fn enum_name(&self) -> Option<&str> {
        match &self.desugared().shape {
            TypeShape::Enum { name } => Some(name),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// Everything the front-end extracted for one run.
#[derive(Debug, Default)]
pub struct Declarations {
    pub functions: Vec<FunctionDecl>,
    pub structs: Vec<StructDecl>,
    pub enums: Vec<EnumDecl>,
}

impl Declarations {
    pub fn extend(&mut self, other: Declarations) {
        self.functions.extend(other.functions);
        self.structs.extend(other.structs);
        self.enums.extend(other.enums);
    }
}

/// A native function declaration.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub return_type: TypeRef,
    pub params: Vec<ParamDecl>,
}

/// A function parameter.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeRef,
}

/// A struct definition with its fields in declaration order.
#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

impl StructDecl {
    /// The record type values of this struct have.
    pub fn record_type(&self) -> TypeRef {
        TypeNode::record(self.name.clone())
    }
}

/// A struct field.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeRef,
}

/// An enum definition.
#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: String,
    pub constants: Vec<EnumConstantDecl>,
}

/// An enum constant. `value` is `None` when the front-end could not
/// evaluate it.
#[derive(Debug, Clone)]
pub struct EnumConstantDecl {
    pub name: String,
    pub value: Option<EnumValue>,
}

/// Evaluated value of an enum constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumValue {
    Signed(i64),
    Unsigned(u64),
}
