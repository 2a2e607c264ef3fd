//! Transition actions: the conversion expressions a value goes through on
//! each edge of the boundary.
//!
//! A downstream value (Java calls native) moves along Java -> JNI -> native;
//! an upstream value (native calls back into Java) moves along
//! native -> JNI -> Java. Each [`TransitionAction`] knows, per edge, how to
//! *transit* an incoming expression and which edges it can *generate* a
//! value on without any input.

use std::fmt;
use std::sync::Arc;

use crate::error::JniError;
use crate::java::JniType;
use crate::names;
use crate::unit::{TransitionSequence, UpstreamMethodUnit};

/// One directed edge between two layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    JavaToJni,
    JniToNative,
    NativeToJni,
    JniToJava,
}

impl TransitionKind {
    pub const ALL: [TransitionKind; 4] = [
        TransitionKind::JavaToJni,
        TransitionKind::JniToNative,
        TransitionKind::NativeToJni,
        TransitionKind::JniToJava,
    ];

    /// Whether the Java layer is one end of the edge.
    pub fn touches_java(self) -> bool {
        matches!(self, TransitionKind::JavaToJni | TransitionKind::JniToJava)
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransitionKind::JavaToJni => "Java -> JNI",
            TransitionKind::JniToNative => "JNI -> native",
            TransitionKind::NativeToJni => "native -> JNI",
            TransitionKind::JniToJava => "JNI -> Java",
        })
    }
}

/// Which way a call crosses the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionDirection {
    /// Java calls into native code.
    Downstream,
    /// Native code calls back into Java.
    Upstream,
}

impl TransitionDirection {
    /// Edge a parameter takes out of the Java layer.
    pub fn java_edge(self) -> TransitionKind {
        match self {
            TransitionDirection::Downstream => TransitionKind::JavaToJni,
            TransitionDirection::Upstream => TransitionKind::JniToJava,
        }
    }

    /// Edge a parameter takes on the native side of the bridge.
    pub fn native_edge(self) -> TransitionKind {
        match self {
            TransitionDirection::Downstream => TransitionKind::JniToNative,
            TransitionDirection::Upstream => TransitionKind::NativeToJni,
        }
    }

    /// The edge a parameter must complete for the call to receive it.
    pub fn final_edge(self) -> TransitionKind {
        match self {
            TransitionDirection::Downstream => TransitionKind::JniToNative,
            TransitionDirection::Upstream => TransitionKind::JniToJava,
        }
    }

    /// Edges a return value takes back: (native side, Java side).
    pub fn return_edges(self) -> (TransitionKind, TransitionKind) {
        match self {
            TransitionDirection::Downstream => {
                (TransitionKind::NativeToJni, TransitionKind::JniToJava)
            }
            TransitionDirection::Upstream => {
                (TransitionKind::JniToNative, TransitionKind::JavaToJni)
            }
        }
    }
}

/// What happens to a value on one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionBehavior {
    #[default]
    None,
    /// Convert the incoming expression with the value's action.
    Transit,
    /// Synthesize the value with no incoming expression.
    Generate,
}

/// Behavior on each of the four edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionBehaviorSet {
    pub java_to_jni: TransitionBehavior,
    pub jni_to_native: TransitionBehavior,
    pub native_to_jni: TransitionBehavior,
    pub jni_to_java: TransitionBehavior,
}

impl TransitionBehaviorSet {
    pub fn get(&self, kind: TransitionKind) -> TransitionBehavior {
        match kind {
            TransitionKind::JavaToJni => self.java_to_jni,
            TransitionKind::JniToNative => self.jni_to_native,
            TransitionKind::NativeToJni => self.native_to_jni,
            TransitionKind::JniToJava => self.jni_to_java,
        }
    }

    pub fn with(mut self, kind: TransitionKind, behavior: TransitionBehavior) -> Self {
        match kind {
            TransitionKind::JavaToJni => self.java_to_jni = behavior,
            TransitionKind::JniToNative => self.jni_to_native = behavior,
            TransitionKind::NativeToJni => self.native_to_jni = behavior,
            TransitionKind::JniToJava => self.jni_to_java = behavior,
        }
        self
    }

    pub fn supports(&self, kind: TransitionKind) -> bool {
        self.get(kind) != TransitionBehavior::None
    }

    /// Transit on every edge of `direction` whose two layers both have a
    /// representation.
    pub fn defaults(direction: TransitionDirection, java_side: bool, native_side: bool) -> Self {
        let transit = |present: bool| {
            if present {
                TransitionBehavior::Transit
            } else {
                TransitionBehavior::None
            }
        };
        TransitionBehaviorSet::default()
            .with(direction.java_edge(), transit(java_side))
            .with(direction.native_edge(), transit(native_side))
    }
}

/// A value produced for one edge.
#[derive(Debug, Clone)]
pub enum GeneratedExpression {
    Literal(String),
    /// A native closure; the emitter writes its body in place.
    Closure(CallbackClosure),
}

impl GeneratedExpression {
    pub fn literal(&self) -> Option<&str> {
        match self {
            GeneratedExpression::Literal(s) => Some(s),
            GeneratedExpression::Closure(_) => None,
        }
    }
}

impl From<String> for GeneratedExpression {
    fn from(s: String) -> Self {
        GeneratedExpression::Literal(s)
    }
}

/// Body of a native lambda that calls an upstream unit.
#[derive(Debug, Clone)]
pub struct CallbackClosure {
    /// `(type spelling, name)` pairs in native order.
    pub params: Vec<(String, String)>,
    pub return_type: String,
    pub body: Box<TransitionSequence>,
}

/// Conversion strategy for one value shape.
#[derive(Debug, Clone)]
pub enum TransitionAction {
    /// Scalars. `native` is the raw native spelling.
    Primitive { native: String, jni: JniType },
    /// Opaque pointer handles; `pointee` is the raw pointee spelling.
    Pointer { pointee: String },
    /// `char *` carried as bytes. `deletion` names the companion flag that
    /// decides whether the native string is released after conversion.
    CharPointerString { deletion: Option<String> },
    /// The companion flag of a string value.
    StringDeletionFlag,
    /// Struct passed by value; Java owns the copy.
    StructCopy {
        native: String,
        java_class: Option<String>,
    },
    /// Struct embedded in another struct; Java borrows the storage.
    NestedStructRef {
        native: String,
        java_class: Option<String>,
    },
    Enum { native: String },
    /// The Java object a callback was registered with.
    CallbackObject,
    /// Native closure dispatching into an upstream unit.
    CallbackCallerLambda { unit: Arc<UpstreamMethodUnit> },
    /// The `this` handle of a struct wrapper.
    CurrentStructHandle { native: String },
}

impl TransitionAction {
    pub fn name(&self) -> &'static str {
        match self {
            TransitionAction::Primitive { .. } => "primitive",
            TransitionAction::Pointer { .. } => "pointer",
            TransitionAction::CharPointerString { .. } => "string",
            TransitionAction::StringDeletionFlag => "string deletion flag",
            TransitionAction::StructCopy { .. } => "struct copy",
            TransitionAction::NestedStructRef { .. } => "nested struct reference",
            TransitionAction::Enum { .. } => "enum",
            TransitionAction::CallbackObject => "callback object",
            TransitionAction::CallbackCallerLambda { .. } => "callback caller lambda",
            TransitionAction::CurrentStructHandle { .. } => "current struct handle",
        }
    }

    /// Returned values of this action must be captured before conversion.
    pub fn needs_intermediate_return_value(&self) -> bool {
        matches!(self, TransitionAction::CharPointerString { .. })
    }

    /// Edges [`transit`](Self::transit) has an expression for.
    pub fn transit_edges(&self, direction: TransitionDirection) -> &'static [TransitionKind] {
        use TransitionKind::*;
        match self {
            TransitionAction::StringDeletionFlag => &[JavaToJni],
            TransitionAction::CallbackObject => match direction {
                TransitionDirection::Downstream => &[JavaToJni, JniToNative],
                TransitionDirection::Upstream => &[NativeToJni, JniToJava],
            },
            TransitionAction::CallbackCallerLambda { .. } => &[],
            TransitionAction::CurrentStructHandle { .. } => &[JniToNative],
            _ => &TransitionKind::ALL,
        }
    }

    /// Edges [`generate`](Self::generate) can synthesize a value on.
    pub fn generate_edges(&self) -> &'static [TransitionKind] {
        match self {
            TransitionAction::CallbackCallerLambda { .. } => &[TransitionKind::JniToNative],
            TransitionAction::CurrentStructHandle { .. } => &[TransitionKind::JavaToJni],
            _ => &[],
        }
    }

    /// Convert `value` across `edge`.
    pub fn transit(
        &self,
        value: &str,
        edge: TransitionKind,
        direction: TransitionDirection,
    ) -> Result<GeneratedExpression, JniError> {
        use TransitionKind::*;
        let unsupported = || JniError::unsupported_edge(self.name(), edge, "transit");
        let expr = match self {
            TransitionAction::Primitive { native, jni } => match edge {
                JavaToJni | JniToJava => value.to_string(),
                JniToNative => format!("static_cast<{native}>({value})"),
                NativeToJni => format!("static_cast<{jni}>({value})"),
            },
            TransitionAction::Pointer { pointee } => match edge {
                JavaToJni | JniToJava => value.to_string(),
                JniToNative => format!("{}<{pointee}>({value})", names::runtime("toNativePointer")),
                NativeToJni => format!("{}({value})", names::runtime("toJavaPointer")),
            },
            TransitionAction::CharPointerString { deletion } => match edge {
                JavaToJni => format!("{value} == null ? null : {value}.getBytes()"),
                JniToNative => format!(
                    "{}({}, {value})",
                    names::runtime("toCppString"),
                    names::jni_env(direction)
                ),
                NativeToJni => format!(
                    "{}({}, {value}, {})",
                    names::runtime("toJavaStringBytes"),
                    names::jni_env(direction),
                    deletion.as_deref().unwrap_or("false")
                ),
                JniToJava => format!("{value} == null ? null : new String({value})"),
            },
            TransitionAction::StringDeletionFlag => match edge {
                JavaToJni => format!("{value}.isDeletingString()"),
                _ => return Err(unsupported()),
            },
            TransitionAction::StructCopy { native, java_class } => match edge {
                JavaToJni => handle_of(value, java_class),
                JniToNative => {
                    format!("*{}<{native}>({value})", names::runtime("toNativePointer"))
                }
                NativeToJni => format!(
                    "{}(new {native}({value}))",
                    names::runtime("toJavaPointer")
                ),
                JniToJava => wrap_handle(value, java_class, "getTrackedAndOwned"),
            },
            TransitionAction::NestedStructRef { native, java_class } => match edge {
                JavaToJni => handle_of(value, java_class),
                JniToNative => format!("{}<{native}>({value})", names::runtime("toNativePointer")),
                NativeToJni => format!("{}(&{value})", names::runtime("toJavaPointer")),
                JniToJava => wrap_handle(value, java_class, "getTrackedAndUnowned"),
            },
            TransitionAction::Enum { native } => match edge {
                JavaToJni | JniToJava => value.to_string(),
                JniToNative => format!("static_cast<{native}>({value})"),
                NativeToJni => format!("static_cast<{}>({value})", JniType::JInt),
            },
            TransitionAction::CallbackObject => match (direction, edge) {
                (TransitionDirection::Downstream, JavaToJni) => format!("{value}.getHandle()"),
                (TransitionDirection::Downstream, JniToNative) => {
                    format!("reinterpret_cast<void*>({value})")
                }
                (TransitionDirection::Upstream, NativeToJni) => {
                    format!("{}->globalObjectRef", names::CALLBACK_CONTEXT)
                }
                (TransitionDirection::Upstream, JniToJava) => value.to_string(),
                _ => return Err(unsupported()),
            },
            TransitionAction::CallbackCallerLambda { .. } => return Err(unsupported()),
            TransitionAction::CurrentStructHandle { native } => match edge {
                JniToNative => format!("{}<{native}>({value})", names::runtime("toNativePointer")),
                _ => return Err(unsupported()),
            },
        };
        Ok(GeneratedExpression::Literal(expr))
    }

    /// Synthesize a value on `edge`.
    pub fn generate(
        &self,
        edge: TransitionKind,
        _direction: TransitionDirection,
    ) -> Result<GeneratedExpression, JniError> {
        match (self, edge) {
            (TransitionAction::CurrentStructHandle { .. }, TransitionKind::JavaToJni) => {
                Ok(GeneratedExpression::Literal("getHandle()".to_string()))
            }
            (TransitionAction::CallbackCallerLambda { unit }, TransitionKind::JniToNative) => {
                Ok(GeneratedExpression::Closure(unit.closure()))
            }
            _ => Err(JniError::unsupported_edge(self.name(), edge, "generate")),
        }
    }
}

fn handle_of(value: &str, java_class: &Option<String>) -> String {
    match java_class {
        Some(_) => format!("{value}.getHandle()"),
        None => value.to_string(),
    }
}

fn wrap_handle(value: &str, java_class: &Option<String>, tracker: &str) -> String {
    match java_class {
        Some(class) => format!("{class}.{tracker}({value})"),
        None => value.to_string(),
    }
}
