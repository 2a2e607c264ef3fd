//! Method/value linker.
//!
//! [`link`] classifies an operation's return value and parameters, picks a
//! [`TransitionAction`] for each and produces a [`MethodLinkage`]: the
//! ordered list of every parameter the generated methods take on each
//! layer. Function pointer parameters additionally spawn an upstream
//! operation that is linked on its own.

use std::sync::Arc;

use tracing::trace;

use crate::classify::{self, ValueShape};
use crate::context::GenerationContext;
use crate::conventions;
use crate::error::JniError;
use crate::java::{JavaType, JniType};
use crate::model::{TypeNode, TypeRef};
use crate::names;
use crate::operation::{Operation, OperationParameter, ParameterRole};
use crate::signature::Param;
use crate::transition::{
    GeneratedExpression, TransitionAction, TransitionBehavior, TransitionBehaviorSet,
    TransitionDirection, TransitionKind,
};
use crate::unit::FunctionPointerUnit;

/// Where a classified value sits in the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuePosition {
    ReturnType,
    Parameter { index: usize },
}

/// The outcome of classifying one native value: its representation on each
/// layer and the action converting between them.
#[derive(Debug, Clone)]
pub struct LinkedValue {
    pub action: TransitionAction,
    pub java_type: Option<JavaType>,
    /// Type of the value in the raw `native` Java method. Derived from
    /// `jni_type` when unset.
    pub java_jni_type: Option<JavaType>,
    pub jni_type: Option<JniType>,
    pub native_type: Option<TypeRef>,
    pub intermediate_name: Option<String>,
    /// Explicit edge behaviors; unset means transit wherever both layers of
    /// an edge have a representation.
    pub behaviors: Option<TransitionBehaviorSet>,
    pub exceptional: bool,
    pub java_receiver: bool,
    /// Parameters that travel alongside this value.
    pub companions: Vec<TransitingParameter>,
    /// A function pointer waiting for its `void *` context: the linkage the
    /// next parameter must take.
    pub context_slot: Option<Box<LinkedValue>>,
}

impl LinkedValue {
    fn new(action: TransitionAction) -> Self {
        LinkedValue {
            action,
            java_type: None,
            java_jni_type: None,
            jni_type: None,
            native_type: None,
            intermediate_name: None,
            behaviors: None,
            exceptional: false,
            java_receiver: false,
            companions: Vec::new(),
            context_slot: None,
        }
    }

    fn typed(
        action: TransitionAction,
        java_type: JavaType,
        jni_type: JniType,
        native_type: TypeRef,
    ) -> Self {
        LinkedValue {
            java_type: Some(java_type),
            jni_type: Some(jni_type),
            native_type: Some(native_type),
            ..LinkedValue::new(action)
        }
    }

    fn into_parameter(
        self,
        name: &str,
        direction: TransitionDirection,
    ) -> Result<ParameterLinkage, JniError> {
        let companions = self.companions.clone();
        let parameter = TransitingParameter::new(name, direction, self)?;
        Ok(ParameterLinkage {
            parameter,
            companions,
        })
    }

    fn into_return_value(self) -> Result<ReturnValueLinkage, JniError> {
        let (Some(java_type), Some(jni_type), Some(native_type)) =
            (self.java_type, self.jni_type, self.native_type)
        else {
            return Err(JniError::incomplete(format!(
                "return value classified as {} lacks a Java, JNI or native type",
                self.action.name()
            )));
        };
        let java_jni_type = match self.java_jni_type.or_else(|| jni_type.as_java()) {
            Some(t) => t,
            None => {
                return Err(JniError::incomplete(format!(
                    "return value of JNI type {jni_type} has no raw Java type"
                )));
            }
        };
        Ok(ReturnValueLinkage {
            java_type,
            java_jni_type,
            jni_type,
            native_type,
            action: self.action,
            companions: self.companions,
        })
    }
}

// ---------------------------------------------------------------------------
// Linkage records
// ---------------------------------------------------------------------------

/// One parameter of the generated methods, on every layer it exists on.
#[derive(Debug, Clone)]
pub struct TransitingParameter {
    pub name: String,
    pub java_type: Option<JavaType>,
    pub java_jni_type: Option<JavaType>,
    pub jni_type: Option<JniType>,
    pub native_type: Option<TypeRef>,
    pub action: TransitionAction,
    pub direction: TransitionDirection,
    pub intermediate_name: String,
    pub behaviors: TransitionBehaviorSet,
    /// Companion parameters are exempt from the final-edge requirement.
    pub exceptional: bool,
    /// The parameter is the receiver of the Java call (callback object).
    pub java_receiver: bool,
}

impl TransitingParameter {
    fn new(
        name: &str,
        direction: TransitionDirection,
        value: LinkedValue,
    ) -> Result<Self, JniError> {
        let java_jni_type = value
            .java_jni_type
            .or_else(|| value.jni_type.and_then(JniType::as_java));
        let java_side = value.java_type.is_some() && value.jni_type.is_some();
        let native_side = value.jni_type.is_some() && value.native_type.is_some();

        let behaviors = match value.behaviors {
            Some(explicit) => {
                if !value.exceptional {
                    for edge in [direction.java_edge(), direction.native_edge()] {
                        let present = if edge.touches_java() {
                            // a generated Java value needs no public Java type
                            value.jni_type.is_some()
                                && (value.java_type.is_some() || java_jni_type.is_some())
                        } else {
                            native_side
                        };
                        if explicit.get(edge) == TransitionBehavior::Transit && !present {
                            return Err(JniError::incomplete(format!(
                                "parameter '{name}' transits on the {edge} edge without types on both layers"
                            )));
                        }
                    }
                }
                explicit
            }
            None => TransitionBehaviorSet::defaults(direction, java_side, native_side),
        };

        let final_edge = direction.final_edge();
        if !value.exceptional && !behaviors.supports(final_edge) {
            return Err(JniError::incomplete(format!(
                "parameter '{name}' ({}) never reaches the {final_edge} edge",
                value.action.name()
            )));
        }

        Ok(TransitingParameter {
            name: name.to_string(),
            java_type: value.java_type,
            java_jni_type,
            jni_type: value.jni_type,
            native_type: value.native_type,
            action: value.action,
            direction,
            intermediate_name: value
                .intermediate_name
                .unwrap_or_else(|| names::intermediate(name)),
            behaviors,
            exceptional: value.exceptional,
            java_receiver: value.java_receiver,
        })
    }

    /// Expression yielding this parameter on `edge`, or `None` if the
    /// parameter does not take that edge.
    pub fn transit_or_generate(
        &self,
        edge: TransitionKind,
    ) -> Result<Option<GeneratedExpression>, JniError> {
        match self.behaviors.get(edge) {
            TransitionBehavior::None => Ok(None),
            TransitionBehavior::Transit => self
                .action
                .transit(&self.name, edge, self.direction)
                .map(Some),
            TransitionBehavior::Generate => self.action.generate(edge, self.direction).map(Some),
        }
    }

    fn converted_on(&self, edge: TransitionKind) -> &str {
        if self.behaviors.supports(edge) {
            &self.intermediate_name
        } else {
            &self.name
        }
    }

    /// How the native call refers to this parameter.
    pub fn native_expression(&self) -> &str {
        self.converted_on(self.direction.native_edge())
    }

    /// How the Java call refers to this parameter.
    pub fn java_expression(&self) -> &str {
        self.converted_on(self.direction.java_edge())
    }

    pub fn as_java_param(&self) -> Option<Param<JavaType>> {
        self.java_type
            .clone()
            .map(|ty| Param::new(ty, conventions::escape_name(&self.name)))
    }

    pub fn as_java_jni_param(&self) -> Option<Param<JavaType>> {
        self.java_jni_type
            .clone()
            .map(|ty| Param::new(ty, conventions::escape_name(&self.name)))
    }

    pub fn as_jni_param(&self) -> Option<Param<JniType>> {
        self.jni_type.map(|ty| Param::new(ty, self.name.clone()))
    }

    pub fn as_native_param(&self) -> Option<Param<TypeRef>> {
        self.native_type
            .clone()
            .map(|ty| Param::new(ty, self.name.clone()))
    }
}

/// A source parameter and the companions generated right after it.
#[derive(Debug, Clone)]
pub struct ParameterLinkage {
    pub parameter: TransitingParameter,
    pub companions: Vec<TransitingParameter>,
}

impl ParameterLinkage {
    pub fn generated(&self) -> impl Iterator<Item = &TransitingParameter> {
        std::iter::once(&self.parameter).chain(&self.companions)
    }
}

/// The classified return value of an operation.
#[derive(Debug, Clone)]
pub struct ReturnValueLinkage {
    pub java_type: JavaType,
    pub java_jni_type: JavaType,
    pub jni_type: JniType,
    pub native_type: TypeRef,
    pub action: TransitionAction,
    /// Generated parameters controlling the return conversion.
    pub companions: Vec<TransitingParameter>,
}

/// Everything [`link`] derived for one operation.
#[derive(Debug, Clone)]
pub struct MethodLinkage {
    pub operation: Operation,
    pub direction: TransitionDirection,
    pub return_value: Option<ReturnValueLinkage>,
    pub parameters: Vec<ParameterLinkage>,
    /// Callback interfaces created for function pointer parameters.
    pub spawned: Vec<Arc<FunctionPointerUnit>>,
}

impl MethodLinkage {
    /// Every generated parameter in order: each source parameter followed
    /// by its companions, then the return value's companions.
    pub fn all_parameters(&self) -> impl Iterator<Item = &TransitingParameter> {
        self.parameters
            .iter()
            .flat_map(ParameterLinkage::generated)
            .chain(self.return_value.iter().flat_map(|r| &r.companions))
    }
}

// ---------------------------------------------------------------------------
// Linking
// ---------------------------------------------------------------------------

/// Lookahead state of the function pointer protocol.
enum LinkState {
    Scanning,
    /// The previous parameter was a function pointer; the next one must be
    /// its bare `void *` context.
    AwaitingContext {
        owner: String,
        pending: LinkedValue,
    },
}

/// Link `operation` for a call crossing the boundary in `direction`.
pub fn link(
    operation: Operation,
    context: &GenerationContext,
    direction: TransitionDirection,
) -> Result<MethodLinkage, JniError> {
    let mut linker = MethodLinker {
        context,
        operation: &operation,
        direction,
        spawned: Vec::new(),
    };

    let return_value = if operation.return_type().is_void() {
        None
    } else {
        let value = linker.classify(operation.return_type(), ValuePosition::ReturnType)?;
        Some(value.into_return_value()?)
    };

    let mut parameters = Vec::with_capacity(operation.parameters().len());
    let mut state = LinkState::Scanning;
    for (index, parameter) in operation.parameters().iter().enumerate() {
        let (linkage, next) = linker.link_parameter(state, index, parameter)?;
        parameters.push(linkage);
        state = next;
    }
    if let LinkState::AwaitingContext { owner, .. } = state {
        return Err(trailing_context_missing(&owner));
    }

    let spawned = linker.spawned;
    Ok(MethodLinkage {
        operation,
        direction,
        return_value,
        parameters,
        spawned,
    })
}

fn trailing_context_missing(owner: &str) -> JniError {
    JniError::scenario(format!(
        "the function pointer parameter '{owner}' does not have a trailing void* context parameter"
    ))
}

/// Classify one native value as it would be inside `operation`.
///
/// Function pointers spawn their callback unit exactly as [`link`] would;
/// the pending context linkage is left in [`LinkedValue::context_slot`].
pub fn classify(
    operation: &Operation,
    ty: &TypeRef,
    position: ValuePosition,
    context: &GenerationContext,
    direction: TransitionDirection,
) -> Result<LinkedValue, JniError> {
    let mut linker = MethodLinker {
        context,
        operation,
        direction,
        spawned: Vec::new(),
    };
    linker.classify(ty, position)
}

/// Per-call linking state. Nothing here outlives one [`link`] call.
struct MethodLinker<'a> {
    context: &'a GenerationContext,
    operation: &'a Operation,
    direction: TransitionDirection,
    spawned: Vec<Arc<FunctionPointerUnit>>,
}

impl MethodLinker<'_> {
    fn link_parameter(
        &mut self,
        state: LinkState,
        index: usize,
        parameter: &OperationParameter,
    ) -> Result<(ParameterLinkage, LinkState), JniError> {
        if let LinkState::AwaitingContext { owner, pending } = state {
            if parameter.role != ParameterRole::Value || !is_bare_void_pointer(&parameter.ty) {
                return Err(trailing_context_missing(&owner));
            }
            trace!(param = %parameter.name, callback = %owner, "bound callback context");
            let linkage = pending.into_parameter(&parameter.name, self.direction)?;
            return Ok((linkage, LinkState::Scanning));
        }

        let mut value = match &parameter.role {
            ParameterRole::StructHandle => self.link_struct_handle(&parameter.ty)?,
            ParameterRole::CallbackObject { callback } => {
                link_callback_object(&parameter.ty, callback.clone())
            }
            ParameterRole::Value => {
                self.classify(&parameter.ty, ValuePosition::Parameter { index })?
            }
        };
        trace!(
            param = %parameter.name,
            ty = %parameter.ty,
            action = value.action.name(),
            "classified parameter"
        );
        let next = match value.context_slot.take() {
            Some(pending) => LinkState::AwaitingContext {
                owner: parameter.name.clone(),
                pending: *pending,
            },
            None => LinkState::Scanning,
        };
        Ok((value.into_parameter(&parameter.name, self.direction)?, next))
    }

    fn classify(
        &mut self,
        ty: &TypeRef,
        position: ValuePosition,
    ) -> Result<LinkedValue, JniError> {
        match classify::value_shape(ty)? {
            ValueShape::Primitive => self.link_primitive(ty),
            ValueShape::String => Ok(self.link_string(ty, position)),
            ValueShape::FunctionPointer { proto } => self.link_function_pointer(ty, proto, position),
            ValueShape::Pointer { pointee } => Ok(link_pointer(ty, pointee)),
            ValueShape::Record { name } => Ok(self.link_struct(ty, name)),
            ValueShape::Enum { name } => Ok(self.link_enum(ty, name)),
        }
    }

    fn link_primitive(&self, ty: &TypeRef) -> Result<LinkedValue, JniError> {
        let repr = classify::classify_primitive(ty)?;
        let mut java_type = repr
            .jni
            .as_java()
            .ok_or_else(|| JniError::unsupported_type(ty))?;
        if repr.unsigned {
            java_type = java_type.with_annotation(names::unsigned_annotation());
        }
        let action = TransitionAction::Primitive {
            native: ty.verbatim_spelling().to_string(),
            jni: repr.jni,
        };
        Ok(LinkedValue::typed(action, java_type, repr.jni, ty.clone()))
    }

    fn link_string(&self, ty: &TypeRef, position: ValuePosition) -> LinkedValue {
        let companion_name = match (self.direction, position) {
            (TransitionDirection::Downstream, ValuePosition::ReturnType) => {
                Some(names::RETURN_DELETION_PARAMETER)
            }
            (TransitionDirection::Downstream, ValuePosition::Parameter { .. })
                if self.operation.is_setter() =>
            {
                Some(names::OVERWRITE_DELETION_PARAMETER)
            }
            _ => None,
        };
        let deletion = (position == ValuePosition::ReturnType)
            .then(|| companion_name.map(str::to_string))
            .flatten();
        let mut value = LinkedValue::typed(
            TransitionAction::CharPointerString { deletion },
            JavaType::string(),
            JniType::JByteArray,
            ty.clone(),
        );
        if let Some(name) = companion_name {
            value.companions.push(deletion_companion(name, self.direction));
        }
        value
    }

    fn link_function_pointer(
        &mut self,
        ty: &TypeRef,
        proto: &TypeRef,
        position: ValuePosition,
    ) -> Result<LinkedValue, JniError> {
        let ValuePosition::Parameter { index } = position else {
            return Err(JniError::scenario(
                "passing function pointers by return type is not supported",
            ));
        };
        if self.direction == TransitionDirection::Upstream {
            return Err(JniError::scenario(format!(
                "the function pointer {ty} cannot be passed into a callback"
            )));
        }
        let has_context = classify::prototype(proto)
            .and_then(|(_, params)| params.last())
            .is_some_and(|last| is_bare_void_pointer(last));
        if !has_context {
            return Err(JniError::scenario(format!(
                "the function pointer {ty} does not have a void* context parameter"
            )));
        }

        let operation = self.operation;
        let arg_name = &operation
            .parameters()
            .get(index)
            .ok_or_else(|| {
                JniError::incomplete(format!(
                    "parameter {index} is out of range for {} ({} parameters)",
                    operation.name(),
                    operation.parameters().len()
                ))
            })?
            .name;
        let next_is_context = operation
            .parameters()
            .get(index + 1)
            .is_some_and(|p| p.role == ParameterRole::Value && is_bare_void_pointer(&p.ty));
        if !next_is_context {
            return Err(trailing_context_missing(arg_name));
        }

        let unit = FunctionPointerUnit::new(operation.name(), arg_name, proto, self.context)?;
        let unit = Arc::new(unit);
        let callback_type = unit.interface_type.clone();
        let lambda = TransitionAction::CallbackCallerLambda {
            unit: unit.method.clone(),
        };
        self.spawned.push(unit);

        let context = LinkedValue::typed(
            TransitionAction::CallbackObject,
            names::function_pointer_type(callback_type),
            JniType::JLong,
            TypeNode::void_pointer(),
        );
        Ok(LinkedValue {
            native_type: Some(ty.clone()),
            behaviors: Some(
                TransitionBehaviorSet::default()
                    .with(TransitionKind::JniToNative, TransitionBehavior::Generate),
            ),
            context_slot: Some(Box::new(context)),
            ..LinkedValue::new(lambda)
        })
    }

    fn link_struct(&self, ty: &TypeRef, name: &str) -> LinkedValue {
        let wrapper = self.context.struct_wrapper(name);
        let java_class = wrapper.and_then(|w| w.java_type.name().map(str::to_string));
        let java_type = match wrapper {
            Some(w) => w.java_type.clone(),
            None => JavaType::LONG.with_annotation(names::pointer_annotation(&format!("{name}*"))),
        };
        let native = name.to_string();
        let action = if self.operation.is_field_access() {
            TransitionAction::NestedStructRef { native, java_class }
        } else {
            TransitionAction::StructCopy { native, java_class }
        };
        LinkedValue::typed(action, java_type, JniType::JLong, ty.clone())
    }

    fn link_enum(&self, ty: &TypeRef, name: &str) -> LinkedValue {
        let mut java_type = JavaType::INT;
        if self.context.is_enum_registered(name) {
            java_type = java_type.with_annotation(format!(
                "{}(flagsFromClass = {}.{}.class)",
                names::MAGIC_CONSTANT_ANNOTATION,
                self.context.package(),
                conventions::escape_name(name)
            ));
        }
        LinkedValue::typed(
            TransitionAction::Enum {
                native: name.to_string(),
            },
            java_type,
            JniType::JInt,
            ty.clone(),
        )
    }

    fn link_struct_handle(&self, ty: &TypeRef) -> Result<LinkedValue, JniError> {
        let native = ty
            .pointee()
            .and_then(|p| p.record_name())
            .ok_or_else(|| JniError::incomplete(format!("struct handle of type {ty} is not a struct pointer")))?
            .to_string();
        Ok(LinkedValue {
            jni_type: Some(JniType::JLong),
            native_type: Some(ty.clone()),
            intermediate_name: Some(names::STRUCT_POINTER.to_string()),
            behaviors: Some(
                TransitionBehaviorSet::default()
                    .with(TransitionKind::JavaToJni, TransitionBehavior::Generate)
                    .with(TransitionKind::JniToNative, TransitionBehavior::Transit),
            ),
            ..LinkedValue::new(TransitionAction::CurrentStructHandle { native })
        })
    }
}

fn link_pointer(ty: &TypeRef, pointee: &TypeRef) -> LinkedValue {
    let java_type = JavaType::LONG.with_annotation(names::pointer_annotation(ty.verbatim_spelling()));
    LinkedValue::typed(
        TransitionAction::Pointer {
            pointee: pointee.verbatim_spelling().to_string(),
        },
        java_type,
        JniType::JLong,
        ty.clone(),
    )
}

fn link_callback_object(ty: &TypeRef, callback: JavaType) -> LinkedValue {
    LinkedValue {
        java_jni_type: Some(callback.clone()),
        java_receiver: true,
        ..LinkedValue::typed(TransitionAction::CallbackObject, callback, JniType::JObject, ty.clone())
    }
}

fn deletion_companion(name: &str, direction: TransitionDirection) -> TransitingParameter {
    TransitingParameter {
        name: name.to_string(),
        java_type: Some(names::string_deletion_behaviour()),
        java_jni_type: Some(JavaType::BOOLEAN),
        jni_type: Some(JniType::JBoolean),
        native_type: None,
        action: TransitionAction::StringDeletionFlag,
        direction,
        intermediate_name: names::intermediate(name),
        behaviors: TransitionBehaviorSet::default()
            .with(TransitionKind::JavaToJni, TransitionBehavior::Transit),
        exceptional: true,
        java_receiver: false,
    }
}

/// `void *` spelled without qualifiers on the pointee.
fn is_bare_void_pointer(ty: &TypeRef) -> bool {
    ty.is_void_pointer()
        && ty
            .pointee()
            .is_some_and(|p| TypeNode::resolve(p).spelling() == "void")
}
