//! Method generation units: the per-layer signatures and ordered
//! transition steps an emitter walks to print boundary code.

use std::sync::Arc;

use crate::config::Namings;
use crate::context::GenerationContext;
use crate::conventions;
use crate::error::JniError;
use crate::java::{JavaType, JniType};
use crate::linker::{self, MethodLinkage, TransitingParameter};
use crate::model::{TypeNode, TypeRef};
use crate::names;
use crate::operation::Operation;
use crate::signature::{JavaMethod, JniGlueMethod, NativeMethod, Param, Visibility};
use crate::transition::{CallbackClosure, GeneratedExpression, TransitionDirection, TransitionKind};

// ---------------------------------------------------------------------------
// Transition sequences
// ---------------------------------------------------------------------------

/// `name = value`, declared with `ty` on the Java layer and `auto&&` on the
/// native one.
#[derive(Debug, Clone)]
pub struct Binding {
    pub ty: Option<JavaType>,
    pub name: String,
    pub value: GeneratedExpression,
}

impl Binding {
    fn native(name: impl Into<String>, value: String) -> Self {
        Binding {
            ty: None,
            name: name.into(),
            value: GeneratedExpression::Literal(value),
        }
    }
}

/// How a method body ends once every binding is in place.
#[derive(Debug, Clone)]
pub enum Completion {
    /// Run the expression as a statement; nothing is returned.
    Statement(String),
    Return {
        /// Raw result captured before conversion.
        capture: Option<Binding>,
        value: GeneratedExpression,
    },
}

/// The body of one generated method in execution order.
#[derive(Debug, Clone)]
pub struct TransitionSequence {
    pub bindings: Vec<Binding>,
    pub completion: Completion,
}

impl TransitionSequence {
    /// The generated value bound to `name`, if any.
    pub fn binding(&self, name: &str) -> Option<&GeneratedExpression> {
        self.bindings
            .iter()
            .find(|b| b.name == name)
            .map(|b| &b.value)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Layer {
    Java,
    Native,
}

struct SequencePlan {
    layer: Layer,
    prologue: Vec<Binding>,
    epilogue: Vec<Binding>,
    run: String,
}

fn parameter_edge(layer: Layer, direction: TransitionDirection) -> TransitionKind {
    match layer {
        Layer::Java => direction.java_edge(),
        Layer::Native => direction.native_edge(),
    }
}

fn return_edge(layer: Layer, direction: TransitionDirection) -> TransitionKind {
    let (native, java) = direction.return_edges();
    match layer {
        Layer::Java => java,
        Layer::Native => native,
    }
}

/// Java type a binding on `edge` is declared with.
fn java_binding_type(p: &TransitingParameter, edge: TransitionKind) -> Option<JavaType> {
    match edge {
        TransitionKind::JavaToJni => p.java_jni_type.clone(),
        TransitionKind::JniToJava => p.java_type.clone(),
        _ => None,
    }
}

fn build_sequence(
    linkage: &MethodLinkage,
    plan: SequencePlan,
) -> Result<TransitionSequence, JniError> {
    let direction = linkage.direction;
    let edge = parameter_edge(plan.layer, direction);
    let mut bindings = plan.prologue;
    for p in linkage.all_parameters() {
        if let Some(value) = p.transit_or_generate(edge)? {
            let ty = match plan.layer {
                Layer::Java => java_binding_type(p, edge),
                Layer::Native => None,
            };
            bindings.push(Binding {
                ty,
                name: p.intermediate_name.clone(),
                value,
            });
        }
    }
    bindings.extend(plan.epilogue);

    let completion = match &linkage.return_value {
        None => Completion::Statement(plan.run),
        Some(ret) => {
            let edge = return_edge(plan.layer, direction);
            if ret.action.needs_intermediate_return_value() {
                let ty = match (plan.layer, direction) {
                    (Layer::Native, _) => None,
                    (Layer::Java, TransitionDirection::Downstream) => {
                        Some(ret.java_jni_type.clone())
                    }
                    (Layer::Java, TransitionDirection::Upstream) => Some(ret.java_type.clone()),
                };
                Completion::Return {
                    capture: Some(Binding {
                        ty,
                        name: names::RETURN_VALUE.to_string(),
                        value: GeneratedExpression::Literal(plan.run),
                    }),
                    value: ret.action.transit(names::RETURN_VALUE, edge, direction)?,
                }
            } else {
                Completion::Return {
                    capture: None,
                    value: ret.action.transit(&plan.run, edge, direction)?,
                }
            }
        }
    };
    Ok(TransitionSequence {
        bindings,
        completion,
    })
}

fn native_params(linkage: &MethodLinkage) -> Vec<Param<TypeRef>> {
    linkage
        .parameters
        .iter()
        .filter_map(|p| p.parameter.as_native_param())
        .collect()
}

// ---------------------------------------------------------------------------
// Downstream: Java calls native
// ---------------------------------------------------------------------------

/// Naming and visibility of a downstream unit.
#[derive(Debug, Clone)]
pub struct DownstreamProperties {
    /// Public Java method name.
    pub java_name: String,
    /// Raw `native` method name, `<java_name>Raw` by convention.
    pub raw_name: String,
    /// Class the raw method is declared on.
    pub owner: JavaType,
    /// Public method is an instance method of a struct wrapper.
    pub instance: bool,
    pub expose_raw: bool,
}

impl DownstreamProperties {
    pub fn new(java_name: impl Into<String>, owner: JavaType) -> Self {
        let java_name = java_name.into();
        DownstreamProperties {
            raw_name: format!("{java_name}Raw"),
            java_name,
            owner,
            instance: false,
            expose_raw: false,
        }
    }
}

/// Java method -> raw native method -> JNI glue -> native operation.
#[derive(Debug, Clone)]
pub struct DownstreamMethodUnit {
    pub linkage: MethodLinkage,
    pub java_method: JavaMethod,
    pub raw_method: JavaMethod,
    pub glue_method: JniGlueMethod,
    pub native_method: NativeMethod,
    pub run_expression: String,
    pub java_body: TransitionSequence,
    pub glue_body: TransitionSequence,
}

impl DownstreamMethodUnit {
    /// Link `operation` and build every layer of the call.
    pub fn link(
        operation: Operation,
        props: DownstreamProperties,
        ctx: &GenerationContext,
    ) -> Result<Self, JniError> {
        let linkage = linker::link(operation, ctx, TransitionDirection::Downstream)?;
        Self::new(linkage, props)
    }

    pub fn new(linkage: MethodLinkage, props: DownstreamProperties) -> Result<Self, JniError> {
        let params: Vec<&TransitingParameter> = linkage.all_parameters().collect();
        let ret = linkage.return_value.as_ref();

        let java_method = JavaMethod {
            name: props.java_name.clone(),
            return_type: ret.map_or(JavaType::VOID, |r| r.java_type.clone()),
            params: params.iter().filter_map(|p| p.as_java_param()).collect(),
            visibility: Visibility::Public,
            is_static: !props.instance,
            is_native: false,
        };
        let raw_method = JavaMethod {
            name: props.raw_name.clone(),
            return_type: ret.map_or(JavaType::VOID, |r| r.java_jni_type.clone()),
            params: params.iter().filter_map(|p| p.as_java_jni_param()).collect(),
            visibility: if props.expose_raw {
                Visibility::Public
            } else {
                Visibility::Private
            },
            is_static: true,
            is_native: true,
        };
        let glue_method = JniGlueMethod {
            name: conventions::jni_proxy_method_name(&props.owner, &props.raw_name),
            return_type: ret.map_or(JniType::Void, |r| r.jni_type),
            params: params.iter().filter_map(|p| p.as_jni_param()).collect(),
        };
        let native_method = NativeMethod {
            name: linkage.operation.name().to_string(),
            return_type: linkage.operation.return_type().clone(),
            params: native_params(&linkage),
        };

        let raw_args: Vec<&str> = params
            .iter()
            .filter(|p| p.java_jni_type.is_some())
            .map(|p| p.java_expression())
            .collect();
        let java_body = build_sequence(
            &linkage,
            SequencePlan {
                layer: Layer::Java,
                prologue: Vec::new(),
                epilogue: Vec::new(),
                run: format!("{}({})", props.raw_name, raw_args.join(", ")),
            },
        )?;

        let run_expression = linkage.operation.run_expression(&linkage)?;
        let glue_body = build_sequence(
            &linkage,
            SequencePlan {
                layer: Layer::Native,
                prologue: Vec::new(),
                epilogue: Vec::new(),
                run: run_expression.clone(),
            },
        )?;

        Ok(DownstreamMethodUnit {
            linkage,
            java_method,
            raw_method,
            glue_method,
            native_method,
            run_expression,
            java_body,
            glue_body,
        })
    }
}

// ---------------------------------------------------------------------------
// Upstream: native calls back into Java
// ---------------------------------------------------------------------------

/// Native closure -> static Java caller -> callback interface method.
#[derive(Debug, Clone)]
pub struct UpstreamMethodUnit {
    pub linkage: MethodLinkage,
    pub callback_type: JavaType,
    /// Signature of the closure handed to native code.
    pub native_lambda: NativeMethod,
    /// Static dispatcher the closure calls through JNI.
    pub caller_method: JavaMethod,
    /// The interface method users implement.
    pub callback_method: JavaMethod,
    pub run_expression: String,
    pub native_body: TransitionSequence,
    pub java_body: TransitionSequence,
}

impl UpstreamMethodUnit {
    pub fn new(
        linkage: MethodLinkage,
        callback_type: JavaType,
        namings: &Namings,
    ) -> Result<Self, JniError> {
        let params: Vec<&TransitingParameter> = linkage.all_parameters().collect();
        let ret = linkage.return_value.as_ref();

        let native_lambda = NativeMethod {
            name: names::CALLBACK_LAMBDA.to_string(),
            return_type: ret.map_or_else(TypeNode::void, |r| r.native_type.clone()),
            params: native_params(&linkage),
        };
        let caller_method = JavaMethod {
            name: namings.callback_caller_method.clone(),
            return_type: ret.map_or(JavaType::VOID, |r| r.java_jni_type.clone()),
            params: params.iter().filter_map(|p| p.as_java_jni_param()).collect(),
            visibility: Visibility::Public,
            is_static: true,
            is_native: false,
        };
        let callback_method = JavaMethod {
            name: namings.callback_interface_method.clone(),
            return_type: ret.map_or(JavaType::VOID, |r| r.java_type.clone()),
            params: params
                .iter()
                .filter(|p| !p.java_receiver)
                .filter_map(|p| p.as_java_param())
                .collect(),
            visibility: Visibility::Public,
            is_static: false,
            is_native: false,
        };

        let receiver = params
            .iter()
            .find(|p| p.java_receiver)
            .ok_or_else(|| JniError::incomplete("callback unit has no callback object"))?;
        let callback_args: Vec<&str> = params
            .iter()
            .filter(|p| !p.java_receiver && p.java_type.is_some())
            .map(|p| p.java_expression())
            .collect();
        let java_body = build_sequence(
            &linkage,
            SequencePlan {
                layer: Layer::Java,
                prologue: Vec::new(),
                epilogue: Vec::new(),
                run: format!(
                    "{}.{}({})",
                    receiver.java_expression(),
                    callback_method.name,
                    callback_args.join(", ")
                ),
            },
        )?;

        let env = names::jni_env(TransitionDirection::Upstream);
        let class_name = callback_type.jni_class_name().unwrap_or_default();
        let class_key = conventions::template_string(&class_name);
        let prologue = vec![Binding::native(
            names::CALLBACK_CONTEXT,
            format!(
                "static_cast<{}*>({})",
                names::runtime("FunctionPointerContext"),
                receiver.name
            ),
        )];
        let epilogue = vec![
            Binding::native(
                names::CALLBACK_CLASS_ID,
                format!("{}<{class_key}>({env})", names::runtime("getCachedClass")),
            ),
            Binding::native(
                names::CALLBACK_METHOD_ID,
                format!(
                    "{}<{class_key}, {}, {}>({env})",
                    names::runtime("getCachedStaticMethod"),
                    conventions::template_string(&caller_method.name),
                    conventions::template_string(&caller_method.jni_signature())
                ),
            ),
        ];
        let run_expression = linkage.operation.run_expression(&linkage)?;
        let native_body = build_sequence(
            &linkage,
            SequencePlan {
                layer: Layer::Native,
                prologue,
                epilogue,
                run: run_expression.clone(),
            },
        )?;

        Ok(UpstreamMethodUnit {
            linkage,
            callback_type,
            native_lambda,
            caller_method,
            callback_method,
            run_expression,
            native_body,
            java_body,
        })
    }

    /// The closure a downstream glue function passes as the function pointer.
    pub fn closure(&self) -> CallbackClosure {
        CallbackClosure {
            params: self
                .native_lambda
                .params
                .iter()
                .map(|p| (p.ty.verbatim_spelling().to_string(), p.name.clone()))
                .collect(),
            return_type: self.native_lambda.return_type.verbatim_spelling().to_string(),
            body: Box::new(self.native_body.clone()),
        }
    }
}

/// The callback interface generated for one function pointer parameter.
#[derive(Debug, Clone)]
pub struct FunctionPointerUnit {
    /// Operation the function pointer is a parameter of.
    pub method_name: String,
    pub arg_name: String,
    pub interface_name: String,
    pub interface_type: JavaType,
    pub method: Arc<UpstreamMethodUnit>,
}

impl FunctionPointerUnit {
    /// Create the interface for parameter `arg_name` of `method_name` and
    /// link its upstream call.
    pub fn new(
        method_name: &str,
        arg_name: &str,
        proto: &TypeRef,
        ctx: &GenerationContext,
    ) -> Result<Self, JniError> {
        let interface_name = format!("Callback_{method_name}_{arg_name}");
        let interface_type = ctx.nested_type(&interface_name);
        let operation = Operation::run_callback(&interface_name, proto, interface_type.clone())?;
        let linkage = linker::link(operation, ctx, TransitionDirection::Upstream)?;
        let method = UpstreamMethodUnit::new(linkage, interface_type.clone(), ctx.namings())?;
        Ok(FunctionPointerUnit {
            method_name: method_name.to_string(),
            arg_name: arg_name.to_string(),
            interface_name,
            interface_type,
            method: Arc::new(method),
        })
    }
}
