//! Function pointer parameters and the callback units they spawn.

mod common;

use std::sync::LazyLock;

use bnd_jni::JniError;
use bnd_jni::java::JniType;
use bnd_jni::linker::{self, MethodLinkage, ValuePosition};
use bnd_jni::model::{FunctionDecl, TypeNode, TypeRef};
use bnd_jni::operation::Operation;
use bnd_jni::transition::{GeneratedExpression, TransitionAction, TransitionDirection};
use bnd_jni::unit::{Completion, DownstreamMethodUnit, DownstreamProperties};

use common::*;

/// `void RegisterHandler(void (*cb)(int32_t, void *), void *ctx)`
static REGISTER: LazyLock<FunctionDecl> = LazyLock::new(|| {
    function(
        "RegisterHandler",
        TypeNode::void(),
        vec![param("cb", callback_ptr()), param("ctx", void_ptr())],
    )
});

fn link(decl: &FunctionDecl) -> Result<MethodLinkage, JniError> {
    linker::link(
        Operation::call_native(decl),
        &context(),
        TransitionDirection::Downstream,
    )
}

fn scenario_message(result: Result<MethodLinkage, JniError>) -> String {
    match result {
        Err(JniError::UnsupportedScenario(msg)) => msg,
        Err(other) => panic!("expected an unsupported scenario, got {other}"),
        Ok(_) => panic!("expected linking to fail"),
    }
}

#[test]
fn callback_with_trailing_context_spawns_one_unit() {
    let linkage = link(&REGISTER).expect("RegisterHandler links");

    assert_eq!(linkage.spawned.len(), 1, "exactly one spawned callback");
    assert_eq!(linkage.parameters.len(), 2);

    let cb = &linkage.parameters[0].parameter;
    assert!(matches!(cb.action, TransitionAction::CallbackCallerLambda { .. }));
    assert!(cb.java_type.is_none(), "the lambda never reaches Java");
    assert!(cb.jni_type.is_none());

    let ctx = &linkage.parameters[1].parameter;
    assert!(matches!(ctx.action, TransitionAction::CallbackObject));
    assert_eq!(ctx.jni_type, Some(JniType::JLong));
    assert_eq!(
        ctx.java_type.as_ref().map(|t| t.to_string()).as_deref(),
        Some(
            "io.github.bnd.jni.runtime.FunctionPointer<com.example.geo.Native.Callback_RegisterHandler_cb>"
        )
    );

    let spawned = &linkage.spawned[0];
    assert_eq!(spawned.method_name, "RegisterHandler");
    assert_eq!(spawned.arg_name, "cb");
    assert_eq!(spawned.interface_name, "Callback_RegisterHandler_cb");
    assert_eq!(
        spawned.method.linkage.direction,
        TransitionDirection::Upstream
    );
}

#[test]
fn downstream_unit_passes_a_closure() {
    let ctx = context();
    let props = DownstreamProperties::new("RegisterHandler", ctx.container_type());
    let unit = DownstreamMethodUnit::link(Operation::call_native(&REGISTER), props, &ctx)
        .expect("unit links");

    assert_eq!(
        unit.java_method.to_string(),
        "public static void RegisterHandler(\
         io.github.bnd.jni.runtime.FunctionPointer<com.example.geo.Native.Callback_RegisterHandler_cb> ctx)"
    );
    assert_eq!(
        unit.glue_method.to_string(),
        "JNIEXPORT void JNICALL Java_com_example_geo_Native_RegisterHandlerRaw(JNIEnv* env, jclass, jlong ctx)"
    );
    assert_eq!(
        unit.native_method.to_string(),
        "void RegisterHandler(void (*)(int32_t, void *) cb, void * ctx)"
    );
    assert_eq!(unit.run_expression, "RegisterHandler(cb$int, ctx$int)");

    match unit.glue_body.binding("cb$int") {
        Some(GeneratedExpression::Closure(closure)) => {
            assert_eq!(
                closure.params,
                vec![
                    ("int32_t".to_string(), "proxyParam0".to_string()),
                    ("void *".to_string(), "func$callbackObject".to_string()),
                ]
            );
            assert_eq!(closure.return_type, "void");
            assert_eq!(
                closure
                    .body
                    .binding("func$$context")
                    .and_then(GeneratedExpression::literal),
                Some("static_cast<bndjni::FunctionPointerContext*>(func$callbackObject)"),
                "the closure carries the upstream native sequence"
            );
            let names: Vec<&str> = closure.body.bindings.iter().map(|b| b.name.as_str()).collect();
            assert!(
                names.contains(&"proxyParam0$int") && names.contains(&"func$callbackObject$int"),
                "closure body bindings: {names:?}"
            );
        }
        other => panic!("the function pointer must be generated as a closure, got {other:?}"),
    }
    assert_eq!(
        unit.glue_body
            .binding("ctx$int")
            .and_then(GeneratedExpression::literal),
        Some("reinterpret_cast<void*>(ctx)")
    );
    assert_eq!(
        unit.java_body
            .binding("ctx$int")
            .and_then(GeneratedExpression::literal),
        Some("ctx.getHandle()")
    );
}

#[test]
fn upstream_unit_shape() {
    let linkage = link(&REGISTER).expect("RegisterHandler links");
    let upstream = &linkage.spawned[0].method;

    assert_eq!(
        upstream.callback_method.to_string(),
        "public void execute(int proxyParam0)",
        "the callback object is the receiver, not a parameter"
    );
    assert_eq!(
        upstream.caller_method.to_string(),
        "public static void runCallback(int proxyParam0, \
         com.example.geo.Native.Callback_RegisterHandler_cb func$callbackObject)"
    );
    assert_eq!(
        upstream.caller_method.jni_signature(),
        "(ILcom/example/geo/Native$Callback_RegisterHandler_cb;)V"
    );
    assert_eq!(
        upstream.run_expression,
        "(func$$context->getEnv())->CallStaticVoidMethod(func$$classId, func$$methodId, \
         proxyParam0$int, func$callbackObject$int)"
    );

    let native = &upstream.native_body;
    assert_eq!(
        native.bindings.first().map(|b| b.name.as_str()),
        Some("func$$context"),
        "the context is recovered before any parameter is converted"
    );
    assert_eq!(
        native
            .binding("func$$context")
            .and_then(GeneratedExpression::literal),
        Some("static_cast<bndjni::FunctionPointerContext*>(func$callbackObject)")
    );
    assert_eq!(
        native
            .binding("proxyParam0$int")
            .and_then(GeneratedExpression::literal),
        Some("static_cast<jint>(proxyParam0)")
    );
    assert_eq!(
        native
            .binding("func$callbackObject$int")
            .and_then(GeneratedExpression::literal),
        Some("func$$context->globalObjectRef")
    );
    let method_id = native
        .binding("func$$methodId")
        .and_then(GeneratedExpression::literal)
        .expect("method id binding");
    assert!(
        method_id.starts_with("bndjni::getCachedStaticMethod<"),
        "unexpected method lookup: {method_id}"
    );

    assert!(matches!(
        &upstream.java_body.completion,
        Completion::Statement(run) if run == "func$callbackObject$int.execute(proxyParam0$int)"
    ));
}

#[test]
fn callback_return_values_flow_back_to_native() {
    let proto: TypeRef = TypeNode::pointer(TypeNode::function(
        int32_t(),
        vec![const_char_ptr(), void_ptr()],
    ));
    let decl = function(
        "ForEach",
        TypeNode::void(),
        vec![param("visit", proto), param("user", void_ptr())],
    );
    let linkage = link(&decl).expect("ForEach links");
    let upstream = &linkage.spawned[0].method;

    let ret = upstream.linkage.return_value.as_ref().expect("callback returns");
    assert_eq!(ret.jni_type, JniType::JInt);
    assert!(
        upstream.run_expression.contains("CallStaticIntMethod"),
        "got {}",
        upstream.run_expression
    );
    match &upstream.native_body.completion {
        Completion::Return { capture, value } => {
            assert!(capture.is_none());
            assert_eq!(
                value.literal(),
                Some(
                    "static_cast<int32_t>((func$$context->getEnv())->CallStaticIntMethod(\
                     func$$classId, func$$methodId, proxyParam0$int, func$callbackObject$int))"
                )
            );
        }
        other => panic!("expected a return, got {other:?}"),
    }

    let companions: usize = upstream.linkage.all_parameters().filter(|p| p.exceptional).count();
    assert_eq!(companions, 0, "upstream strings get no deletion flag");
    assert_eq!(
        upstream
            .native_body
            .binding("proxyParam0$int")
            .and_then(GeneratedExpression::literal),
        Some("bndjni::toJavaStringBytes(func$$context->getEnv(), proxyParam0, false)")
    );
}

#[test]
fn missing_trailing_context_fails() {
    let next_is_int = function(
        "Subscribe",
        TypeNode::void(),
        vec![param("cb", callback_ptr()), param("flags", int())],
    );
    let msg = scenario_message(link(&next_is_int));
    assert!(
        msg.contains("'cb' does not have a trailing void* context parameter"),
        "got: {msg}"
    );

    let last = function("Subscribe", TypeNode::void(), vec![param("cb", callback_ptr())]);
    let msg = scenario_message(link(&last));
    assert!(msg.contains("trailing void* context"), "got: {msg}");

    let const_ctx = function(
        "Subscribe",
        TypeNode::void(),
        vec![
            param("cb", callback_ptr()),
            param(
                "ctx",
                TypeNode::pointer(TypeNode::builtin(bnd_jni::model::TypeKind::Void, "const void")),
            ),
        ],
    );
    let msg = scenario_message(link(&const_ctx));
    assert!(
        msg.contains("trailing void* context"),
        "a const void * is not a bare context, got: {msg}"
    );
}

#[test]
fn prototype_without_context_fails_before_lookahead() {
    let no_context = TypeNode::pointer(TypeNode::function(TypeNode::void(), vec![int32_t()]));
    let decl = function(
        "OnTick",
        TypeNode::void(),
        vec![param("cb", no_context), param("ctx", void_ptr())],
    );
    let msg = scenario_message(link(&decl));
    assert!(
        msg.contains("does not have a void* context parameter"),
        "got: {msg}"
    );
}

#[test]
fn function_pointer_returns_are_rejected() {
    let decl = function("GetHandler", callback_ptr(), vec![]);
    let msg = scenario_message(link(&decl));
    assert_eq!(msg, "passing function pointers by return type is not supported");

    let op = Operation::call_native(&decl);
    let err = linker::classify(
        &op,
        &callback_ptr(),
        ValuePosition::ReturnType,
        &context(),
        TransitionDirection::Downstream,
    )
    .unwrap_err();
    assert!(matches!(err, JniError::UnsupportedScenario(_)));
}

#[test]
fn classify_leaves_the_context_pending() {
    let op = Operation::call_native(&REGISTER);
    let value = linker::classify(
        &op,
        &callback_ptr(),
        ValuePosition::Parameter { index: 0 },
        &context(),
        TransitionDirection::Downstream,
    )
    .expect("classifies");
    assert!(matches!(value.action, TransitionAction::CallbackCallerLambda { .. }));
    let pending = value.context_slot.expect("context pending");
    assert!(matches!(pending.action, TransitionAction::CallbackObject));
    assert_eq!(pending.jni_type, Some(JniType::JLong));
}

#[test]
fn classify_rejects_a_parameter_index_outside_the_operation() {
    let decl = function("Add", int32_t(), vec![param("a", int32_t())]);
    let op = Operation::call_native(&decl);
    let result = linker::classify(
        &op,
        &callback_ptr(),
        ValuePosition::Parameter { index: 3 },
        &context(),
        TransitionDirection::Downstream,
    );
    match result {
        Err(JniError::IncompleteLinkage(msg)) => {
            assert!(msg.contains("out of range"), "got: {msg}")
        }
        Err(other) => panic!("expected an incomplete linkage, got {other}"),
        Ok(_) => panic!("index 3 does not exist on Add"),
    }
}

#[test]
fn nested_function_pointers_in_callbacks_are_rejected() {
    let inner = callback_ptr();
    let outer = TypeNode::pointer(TypeNode::function(
        TypeNode::void(),
        vec![inner, void_ptr(), void_ptr()],
    ));
    let decl = function(
        "Chain",
        TypeNode::void(),
        vec![param("cb", outer), param("ctx", void_ptr())],
    );
    assert!(matches!(
        link(&decl),
        Err(JniError::UnsupportedScenario(_))
    ));
}
