//! Operations: the native-side unit of work a linkage is built around.

use crate::error::JniError;
use crate::java::{JavaType, JniType};
use crate::linker::MethodLinkage;
use crate::model::{FieldDecl, FunctionDecl, TypeNode, TypeRef};
use crate::names;

/// How the linker treats a parameter before looking at its type.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterRole {
    /// Classified from its native type.
    Value,
    /// Implicit receiver of a field accessor; the native type is a pointer
    /// to the struct.
    StructHandle,
    /// Implicit receiver of a callback trampoline, typed as the callback
    /// interface on the Java side.
    CallbackObject { callback: JavaType },
}

#[derive(Debug, Clone)]
pub struct OperationParameter {
    pub name: String,
    pub ty: TypeRef,
    pub role: ParameterRole,
}

impl OperationParameter {
    pub fn value(name: impl Into<String>, ty: TypeRef) -> Self {
        OperationParameter {
            name: name.into(),
            ty,
            role: ParameterRole::Value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    CallNative { function: String },
    GetStructField { field: String },
    SetStructField { field: String },
    RunCallback,
}

/// A native operation: its kind, native return type and parameters.
#[derive(Debug, Clone)]
pub struct Operation {
    kind: OperationKind,
    name: String,
    return_type: TypeRef,
    parameters: Vec<OperationParameter>,
}

impl Operation {
    /// Call a native function.
    pub fn call_native(decl: &FunctionDecl) -> Self {
        Operation {
            kind: OperationKind::CallNative {
                function: decl.name.clone(),
            },
            name: decl.name.clone(),
            return_type: decl.return_type.clone(),
            parameters: decl
                .params
                .iter()
                .map(|p| OperationParameter::value(p.name.clone(), p.ty.clone()))
                .collect(),
        }
    }

    /// Read `field` through a pointer to `record`.
    pub fn get_struct_field(record: &TypeRef, field: &FieldDecl) -> Self {
        Operation {
            kind: OperationKind::GetStructField {
                field: field.name.clone(),
            },
            name: field.name.clone(),
            return_type: field.ty.clone(),
            parameters: vec![struct_handle(record)],
        }
    }

    /// Write `field` through a pointer to `record`.
    pub fn set_struct_field(record: &TypeRef, field: &FieldDecl) -> Self {
        Operation {
            kind: OperationKind::SetStructField {
                field: field.name.clone(),
            },
            name: field.name.clone(),
            return_type: TypeNode::void(),
            parameters: vec![
                struct_handle(record),
                OperationParameter::value(names::SETTER_VALUE_PARAMETER, field.ty.clone()),
            ],
        }
    }

    /// Invoke a Java callback implementing `callback` from native code.
    ///
    /// The prototype's trailing `void *` context becomes the callback
    /// object receiver; the other parameters are forwarded in order.
    pub fn run_callback(
        name: impl Into<String>,
        proto: &TypeRef,
        callback: JavaType,
    ) -> Result<Self, JniError> {
        let (return_type, params) = crate::classify::prototype(proto)
            .ok_or_else(|| JniError::unsupported_type(proto))?;
        let Some((context, forwarded)) = params.split_last() else {
            return Err(JniError::scenario(format!(
                "the function pointer {proto} does not have a void* context parameter"
            )));
        };
        let mut parameters: Vec<OperationParameter> = forwarded
            .iter()
            .enumerate()
            .map(|(i, ty)| OperationParameter::value(names::callback_proxy_parameter(i), ty.clone()))
            .collect();
        parameters.push(OperationParameter {
            name: names::CALLBACK_OBJECT_PARAMETER.to_string(),
            ty: context.clone(),
            role: ParameterRole::CallbackObject { callback },
        });
        Ok(Operation {
            kind: OperationKind::RunCallback,
            name: name.into(),
            return_type: return_type.clone(),
            parameters,
        })
    }

    pub fn kind(&self) -> &OperationKind {
        &self.kind
    }

    /// Function or field name the operation was built from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> &TypeRef {
        &self.return_type
    }

    pub fn parameters(&self) -> &[OperationParameter] {
        &self.parameters
    }

    /// Get or set of a struct field; struct values are borrowed, not copied.
    pub fn is_field_access(&self) -> bool {
        matches!(
            self.kind,
            OperationKind::GetStructField { .. } | OperationKind::SetStructField { .. }
        )
    }

    pub fn is_setter(&self) -> bool {
        matches!(self.kind, OperationKind::SetStructField { .. })
    }

    /// The native statement or expression performing the operation once
    /// every parameter has been converted.
    pub fn run_expression(&self, linkage: &MethodLinkage) -> Result<String, JniError> {
        let args: Vec<&str> = linkage
            .parameters
            .iter()
            .map(|p| p.parameter.native_expression())
            .collect();
        match &self.kind {
            OperationKind::CallNative { function } => Ok(format!("{function}({})", args.join(", "))),
            OperationKind::GetStructField { field } => {
                let receiver = args
                    .first()
                    .ok_or_else(|| JniError::incomplete("field getter has no struct handle"))?;
                Ok(format!("{receiver}->{field}"))
            }
            OperationKind::SetStructField { field } => {
                let [receiver, value] = args.as_slice() else {
                    return Err(JniError::incomplete(
                        "field setter needs a struct handle and a value",
                    ));
                };
                let target = format!("{receiver}->{field}");
                let value = format!("{}({value})", names::runtime("passAsC"));
                let deletion = linkage
                    .parameters
                    .get(1)
                    .and_then(|p| p.companions.first());
                Ok(match deletion {
                    Some(flag) => format!(
                        "{}({target}, {value}, {})",
                        names::runtime("overwriteString"),
                        flag.name
                    ),
                    None => format!("{target} = {value}"),
                })
            }
            OperationKind::RunCallback => {
                let returns = linkage
                    .return_value
                    .as_ref()
                    .map_or(JniType::Void, |r| r.jni_type);
                let mut call_args = vec![names::CALLBACK_CLASS_ID, names::CALLBACK_METHOD_ID];
                call_args.extend(args);
                Ok(format!(
                    "({})->CallStatic{}Method({})",
                    names::jni_env(crate::transition::TransitionDirection::Upstream),
                    returns.call_method_suffix(),
                    call_args.join(", ")
                ))
            }
        }
    }
}

fn struct_handle(record: &TypeRef) -> OperationParameter {
    OperationParameter {
        name: names::STRUCT_HANDLE_PARAMETER.to_string(),
        ty: TypeNode::pointer(record.clone()),
        role: ParameterRole::StructHandle,
    }
}
