//! Linking native function calls (Java calls native).

mod common;

use std::sync::LazyLock;

use bnd_jni::JniError;
use bnd_jni::context::StructRegistration;
use bnd_jni::java::JniType;
use bnd_jni::linker::{self, MethodLinkage};
use bnd_jni::model::{FunctionDecl, TypeKind, TypeNode};
use bnd_jni::operation::Operation;
use bnd_jni::transition::{GeneratedExpression, TransitionAction, TransitionDirection};
use bnd_jni::unit::{Completion, DownstreamMethodUnit, DownstreamProperties};

use common::*;

/// `int32_t Add(int32_t a, int32_t b)`
static ADD: LazyLock<FunctionDecl> = LazyLock::new(|| {
    function(
        "Add",
        int32_t(),
        vec![param("a", int32_t()), param("b", int32_t())],
    )
});

/// `const char *Describe(int32_t id)`
static DESCRIBE: LazyLock<FunctionDecl> =
    LazyLock::new(|| function("Describe", const_char_ptr(), vec![param("id", int32_t())]));

fn link(decl: &FunctionDecl) -> Result<MethodLinkage, JniError> {
    linker::link(
        Operation::call_native(decl),
        &context(),
        TransitionDirection::Downstream,
    )
}

fn unit(decl: &FunctionDecl) -> DownstreamMethodUnit {
    let ctx = context();
    let props = DownstreamProperties::new(decl.name.clone(), ctx.container_type());
    DownstreamMethodUnit::link(Operation::call_native(decl), props, &ctx).expect("link unit")
}

fn param_names(linkage: &MethodLinkage) -> Vec<&str> {
    linkage.all_parameters().map(|p| p.name.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Scenario A: plain primitives
// ---------------------------------------------------------------------------

#[test]
fn add_links_plain_primitives() {
    let linkage = link(&ADD).expect("Add links");

    assert_eq!(linkage.parameters.len(), 2);
    for p in &linkage.parameters {
        assert!(
            matches!(p.parameter.action, TransitionAction::Primitive { jni: JniType::JInt, .. }),
            "{} should be a jint primitive, got {:?}",
            p.parameter.name,
            p.parameter.action
        );
        assert!(p.companions.is_empty(), "{} has companions", p.parameter.name);
    }

    let ret = linkage.return_value.as_ref().expect("Add returns a value");
    assert!(matches!(ret.action, TransitionAction::Primitive { .. }));
    assert!(ret.companions.is_empty());
    assert!(linkage.spawned.is_empty());
    assert_eq!(param_names(&linkage), vec!["a", "b"]);
}

#[test]
fn add_unit_signatures() {
    let unit = unit(&ADD);
    assert_eq!(unit.java_method.to_string(), "public static int Add(int a, int b)");
    assert_eq!(
        unit.raw_method.to_string(),
        "private static native int AddRaw(int a, int b)"
    );
    assert_eq!(unit.glue_method.name, "Java_com_example_geo_Native_AddRaw");
    assert_eq!(
        unit.glue_method.to_string(),
        "JNIEXPORT jint JNICALL Java_com_example_geo_Native_AddRaw(JNIEnv* env, jclass, jint a, jint b)"
    );
    assert_eq!(unit.native_method.to_string(), "int32_t Add(int32_t a, int32_t b)");
    assert_eq!(unit.run_expression, "Add(a$int, b$int)");
}

#[test]
fn add_unit_sequences() {
    let unit = unit(&ADD);

    let glue = &unit.glue_body;
    assert_eq!(
        glue.binding("a$int").and_then(GeneratedExpression::literal),
        Some("static_cast<int32_t>(a)")
    );
    match &glue.completion {
        Completion::Return { capture, value } => {
            assert!(capture.is_none(), "primitives are converted in place");
            assert_eq!(value.literal(), Some("static_cast<jint>(Add(a$int, b$int))"));
        }
        other => panic!("expected a return, got {other:?}"),
    }

    let java = &unit.java_body;
    assert_eq!(java.bindings.len(), 2);
    match &java.completion {
        Completion::Return { value, .. } => {
            assert_eq!(value.literal(), Some("AddRaw(a$int, b$int)"));
        }
        other => panic!("expected a return, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Scenario B: string return with deletion flag
// ---------------------------------------------------------------------------

#[test]
fn describe_string_return_gets_one_deletion_flag() {
    let linkage = link(&DESCRIBE).expect("Describe links");

    assert_eq!(linkage.parameters.len(), 1);
    assert!(linkage.parameters[0].companions.is_empty());

    let ret = linkage.return_value.as_ref().expect("string return");
    assert!(
        ret.action.needs_intermediate_return_value(),
        "string returns are captured before conversion"
    );
    assert_eq!(ret.jni_type, JniType::JByteArray);
    assert_eq!(ret.companions.len(), 1, "exactly one deletion flag");

    let flag = &ret.companions[0];
    assert_eq!(flag.name, "returnValueDeletionBehaviour");
    assert_eq!(flag.jni_type, Some(JniType::JBoolean));
    assert!(matches!(flag.action, TransitionAction::StringDeletionFlag));
    assert!(flag.exceptional);

    assert_eq!(
        param_names(&linkage),
        vec!["id", "returnValueDeletionBehaviour"],
        "the flag follows every source parameter"
    );
}

#[test]
fn describe_unit_captures_the_return_value() {
    let unit = unit(&DESCRIBE);

    assert_eq!(
        unit.java_method.to_string(),
        "public static java.lang.String Describe(int id, \
         io.github.bnd.jni.runtime.StringDeletionBehaviour returnValueDeletionBehaviour)"
    );
    assert_eq!(
        unit.raw_method.to_string(),
        "private static native byte[] DescribeRaw(int id, boolean returnValueDeletionBehaviour)"
    );

    match &unit.glue_body.completion {
        Completion::Return {
            capture: Some(capture),
            value,
        } => {
            assert_eq!(capture.name, "returnValue$int");
            assert_eq!(capture.value.literal(), Some("Describe(id$int)"));
            assert_eq!(
                value.literal(),
                Some("bndjni::toJavaStringBytes(env, returnValue$int, returnValueDeletionBehaviour)")
            );
        }
        other => panic!("expected a captured return, got {other:?}"),
    }

    assert_eq!(
        unit.java_body
            .binding("returnValueDeletionBehaviour$int")
            .and_then(GeneratedExpression::literal),
        Some("returnValueDeletionBehaviour.isDeletingString()")
    );
    match &unit.java_body.completion {
        Completion::Return {
            capture: Some(capture),
            value,
        } => {
            assert_eq!(
                capture.value.literal(),
                Some("DescribeRaw(id$int, returnValueDeletionBehaviour$int)")
            );
            assert_eq!(
                value.literal(),
                Some("returnValue$int == null ? null : new String(returnValue$int)")
            );
        }
        other => panic!("expected a captured return, got {other:?}"),
    }
}

#[test]
fn plain_string_parameter_has_no_companion() {
    let decl = function("Print", TypeNode::void(), vec![param("msg", const_char_ptr())]);
    let linkage = link(&decl).expect("Print links");
    assert!(linkage.return_value.is_none());
    assert!(linkage.parameters[0].companions.is_empty());
    assert_eq!(param_names(&linkage), vec!["msg"]);

    let unit = unit(&decl);
    assert!(matches!(
        &unit.glue_body.completion,
        Completion::Statement(run) if run == "Print(msg$int)"
    ));
    assert_eq!(
        unit.glue_body.binding("msg$int").and_then(GeneratedExpression::literal),
        Some("bndjni::toCppString(env, msg)")
    );
}

// ---------------------------------------------------------------------------
// Other shapes
// ---------------------------------------------------------------------------

#[test]
fn linking_is_deterministic() {
    let first = unit(&DESCRIBE);
    let second = unit(&DESCRIBE);
    assert_eq!(first.java_body.to_string(), second.java_body.to_string());
    assert_eq!(first.glue_body.to_string(), second.glue_body.to_string());
    assert_eq!(first.glue_method.to_string(), second.glue_method.to_string());
    assert_eq!(
        param_names(&first.linkage),
        param_names(&second.linkage)
    );
}

#[test]
fn struct_values_are_copied() {
    let mut ctx = context();
    ctx.register_struct(
        "Point",
        StructRegistration {
            java_type: ctx.nested_type("Point"),
            layout_meta: false,
        },
    );
    let decl = function("Translate", point(), vec![param("p", point())]);
    let linkage = linker::link(
        Operation::call_native(&decl),
        &ctx,
        TransitionDirection::Downstream,
    )
    .expect("Translate links");

    let p = &linkage.parameters[0].parameter;
    assert!(
        matches!(&p.action, TransitionAction::StructCopy { java_class: Some(c), .. } if c == "Native.Point"),
        "by-value struct parameters are copied, got {:?}",
        p.action
    );
    assert_eq!(
        p.java_type.as_ref().map(|t| t.to_string()).as_deref(),
        Some("com.example.geo.Native.Point")
    );

    let ret = linkage.return_value.expect("struct return");
    assert!(matches!(ret.action, TransitionAction::StructCopy { .. }));
    assert_eq!(
        ret.action
            .transit("r", bnd_jni::transition::TransitionKind::JniToJava, TransitionDirection::Downstream)
            .unwrap()
            .literal(),
        Some("Native.Point.getTrackedAndOwned(r)")
    );
}

#[test]
fn unwrapped_struct_falls_back_to_annotated_pointer() {
    let decl = function("Reset", TypeNode::void(), vec![param("p", point())]);
    let linkage = link(&decl).expect("Reset links");
    let ty = linkage.parameters[0].parameter.java_type.clone().expect("java type");
    assert_eq!(
        ty.to_string(),
        "@io.github.bnd.jni.runtime.Pointer(\"Point*\") long"
    );
}

#[test]
fn pointers_are_opaque_handles() {
    let decl = function(
        "Fill",
        TypeNode::void(),
        vec![param("out", TypeNode::pointer(int32_t())), param("len", size_t())],
    );
    let linkage = link(&decl).expect("Fill links");

    let out = &linkage.parameters[0].parameter;
    assert_eq!(
        out.java_type.as_ref().map(|t| t.to_string()).as_deref(),
        Some("@io.github.bnd.jni.runtime.Pointer(\"int32_t *\") long")
    );
    assert_eq!(out.jni_type, Some(JniType::JLong));
    assert_eq!(
        out.transit_or_generate(bnd_jni::transition::TransitionKind::JniToNative)
            .unwrap()
            .and_then(|e| e.literal().map(str::to_string))
            .as_deref(),
        Some("bndjni::toNativePointer<int32_t>(out)")
    );

    let len = &linkage.parameters[1].parameter;
    assert_eq!(
        len.java_type.as_ref().map(|t| t.to_string()).as_deref(),
        Some("@io.github.bnd.jni.runtime.Unsigned long")
    );
}

#[test]
fn enums_are_annotated_only_when_generated() {
    let color = TypeNode::enumeration("enum Color");
    let decl = function("Paint", TypeNode::void(), vec![param("c", color)]);

    let plain = link(&decl).expect("Paint links");
    assert_eq!(
        plain.parameters[0].parameter.java_type.as_ref().map(|t| t.to_string()).as_deref(),
        Some("int")
    );

    let mut ctx = context();
    ctx.register_enum("Color");
    let linkage = linker::link(
        Operation::call_native(&decl),
        &ctx,
        TransitionDirection::Downstream,
    )
    .expect("Paint links");
    let ty = linkage.parameters[0].parameter.java_type.clone().expect("java type");
    assert_eq!(
        ty.to_string(),
        "@org.intellij.lang.annotations.MagicConstant(flagsFromClass = com.example.geo.Color.class) int"
    );
}

#[test]
fn unsupported_parameter_fails_the_whole_call() {
    let decl = function(
        "Sum",
        int(),
        vec![
            param("n", int()),
            param("values", TypeNode::array(int(), Some(4))),
        ],
    );
    assert_eq!(
        link(&decl).unwrap_err(),
        JniError::UnsupportedType {
            ty: "int[4]".to_string()
        }
    );

    let decl = function(
        "Precise",
        TypeNode::builtin(TypeKind::LongDouble, "long double"),
        vec![],
    );
    assert!(matches!(
        link(&decl),
        Err(JniError::UnsupportedType { .. })
    ));
}
