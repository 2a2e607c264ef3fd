//! Names shared between generated code and the support runtime.

use crate::java::JavaType;
use crate::transition::TransitionDirection;

/// C++ namespace of the native support runtime.
pub const RUNTIME_NAMESPACE: &str = "bndjni";
/// Java package of the support runtime.
pub const RUNTIME_PACKAGE: &str = "io.github.bnd.jni.runtime";

/// `JNIEnv*` parameter of every glue function.
pub const JNI_ENV: &str = "env";

pub const STRUCT_POINTER: &str = "struct$ptr";
pub const RETURN_VALUE: &str = "returnValue$int";

pub const CALLBACK_CONTEXT: &str = "func$$context";
pub const CALLBACK_CLASS_ID: &str = "func$$classId";
pub const CALLBACK_METHOD_ID: &str = "func$$methodId";
pub const CALLBACK_OBJECT_PARAMETER: &str = "func$callbackObject";
pub const CALLBACK_LAMBDA: &str = "*lambda_function*";

pub const STRUCT_HANDLE_PARAMETER: &str = "handle";
pub const SETTER_VALUE_PARAMETER: &str = "newValue";
pub const RETURN_DELETION_PARAMETER: &str = "returnValueDeletionBehaviour";
pub const OVERWRITE_DELETION_PARAMETER: &str = "overwrittenValueDeletionBehaviour";

/// Receiver of the layout builder calls in struct layout metadata.
pub const STRUCT_ARRANGER: &str = "$structArranger";

pub const MAGIC_CONSTANT_ANNOTATION: &str = "@org.intellij.lang.annotations.MagicConstant";

/// Intermediate variable holding the converted value of `name`.
pub fn intermediate(name: &str) -> String {
    format!("{name}$int")
}

pub fn callback_proxy_parameter(index: usize) -> String {
    format!("proxyParam{index}")
}

/// `bndjni::<helper>`.
pub fn runtime(helper: &str) -> String {
    format!("{RUNTIME_NAMESPACE}::{helper}")
}

/// Expression yielding the `JNIEnv*` on the native side of `direction`.
///
/// Glue functions receive it as a parameter; callback closures fetch it
/// from the function pointer context.
pub fn jni_env(direction: TransitionDirection) -> String {
    match direction {
        TransitionDirection::Downstream => JNI_ENV.to_string(),
        TransitionDirection::Upstream => format!("{CALLBACK_CONTEXT}->getEnv()"),
    }
}

pub fn unsigned_annotation() -> String {
    format!("@{RUNTIME_PACKAGE}.Unsigned")
}

pub fn pointer_annotation(spelling: &str) -> String {
    format!("@{RUNTIME_PACKAGE}.Pointer(\"{spelling}\")")
}

/// `FunctionPointer<Callback>`, the Java handle for a registered callback.
pub fn function_pointer_type(callback: JavaType) -> JavaType {
    JavaType::generic_object(RUNTIME_PACKAGE, "FunctionPointer", vec![callback])
}

pub fn string_deletion_behaviour() -> JavaType {
    JavaType::object(RUNTIME_PACKAGE, "StringDeletionBehaviour")
}
