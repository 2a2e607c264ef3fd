//! Run driver: turns extracted declarations into generation units.
//!
//! Order matters: enums first, then every struct wrapper is registered
//! before any accessor is linked (so fields may reference structs declared
//! later), then struct accessors, then functions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::context::{GenerationContext, StructRegistration};
use crate::conventions;
use crate::error::JniError;
use crate::java::JavaType;
use crate::layout::{self, StructLayoutMeta};
use crate::model::{Declarations, EnumDecl, EnumValue, FunctionDecl, StructDecl};
use crate::names;
use crate::operation::Operation;
use crate::unit::{DownstreamMethodUnit, DownstreamProperties, FunctionPointerUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Enum,
    Struct,
    Field,
    Function,
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeclarationKind::Enum => "enum",
            DeclarationKind::Struct => "struct",
            DeclarationKind::Field => "field",
            DeclarationKind::Function => "function",
        })
    }
}

/// A declaration left out of the output and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDeclaration {
    pub kind: DeclarationKind,
    pub name: String,
    pub reason: JniError,
}

/// Everything generated in one run.
#[derive(Debug, Default)]
pub struct GenerationOutput {
    pub enums: Vec<EnumUnit>,
    pub structs: Vec<StructUnit>,
    pub functions: Vec<FunctionUnit>,
    pub skipped: Vec<SkippedDeclaration>,
}

impl GenerationOutput {
    /// Callback interfaces spawned by functions and struct accessors.
    pub fn callbacks(&self) -> Vec<&Arc<FunctionPointerUnit>> {
        let accessors = self.structs.iter().flat_map(|s| {
            s.accessors
                .iter()
                .flat_map(|a| [&a.getter, &a.setter])
        });
        self.functions
            .iter()
            .map(|f| &f.method)
            .chain(accessors)
            .flat_map(|m| &m.linkage.spawned)
            .collect()
    }

    pub fn function(&self, native_name: &str) -> Option<&FunctionUnit> {
        self.functions.iter().find(|f| f.native_name == native_name)
    }

    pub fn struct_unit(&self, native_name: &str) -> Option<&StructUnit> {
        self.structs.iter().find(|s| s.native_name == native_name)
    }

    pub fn enum_unit(&self, native_name: &str) -> Option<&EnumUnit> {
        self.enums.iter().find(|e| e.native_name == native_name)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// One `int` constant of an enum class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumField {
    pub name: String,
    pub ty: JavaType,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct EnumUnit {
    pub native_name: String,
    pub java_name: String,
    pub fields: Vec<EnumField>,
}

impl EnumUnit {
    pub fn new(decl: &EnumDecl) -> Result<Self, JniError> {
        let fields = decl
            .constants
            .iter()
            .map(|constant| {
                let (ty, value) = match constant.value {
                    Some(EnumValue::Signed(v)) if i32::try_from(v).is_ok() => {
                        (JavaType::INT, v.to_string())
                    }
                    Some(EnumValue::Unsigned(v)) if u32::try_from(v).is_ok() => (
                        JavaType::INT.with_annotation(names::unsigned_annotation()),
                        format!("0x{v:X}"),
                    ),
                    Some(_) => {
                        return Err(JniError::scenario(format!(
                            "enum constant {}::{} does not fit in a Java int",
                            decl.name, constant.name
                        )));
                    }
                    None => {
                        return Err(JniError::scenario(format!(
                            "enum constant {}::{} has neither a signed nor an unsigned value",
                            decl.name, constant.name
                        )));
                    }
                };
                Ok(EnumField {
                    name: conventions::escape_name(&constant.name),
                    ty,
                    value,
                })
            })
            .collect::<Result<_, JniError>>()?;
        Ok(EnumUnit {
            native_name: decl.name.clone(),
            java_name: conventions::escape_name(&decl.name),
            fields,
        })
    }
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

/// Getter and setter of one struct field.
#[derive(Debug, Clone)]
pub struct FieldAccessors {
    pub field: String,
    pub getter: DownstreamMethodUnit,
    pub setter: DownstreamMethodUnit,
}

/// A struct's Java wrapper class.
#[derive(Debug, Clone)]
pub struct StructUnit {
    pub native_name: String,
    pub java_type: JavaType,
    pub accessors: Vec<FieldAccessors>,
    pub layout: Option<StructLayoutMeta>,
}

impl StructUnit {
    /// Link the accessors of a registered struct. Fields whose type has no
    /// boundary representation are left out and reported in the second
    /// element.
    pub fn new(
        decl: &StructDecl,
        ctx: &GenerationContext,
    ) -> Result<(Self, Vec<SkippedDeclaration>), JniError> {
        let registration = ctx.struct_wrapper(&decl.name).ok_or_else(|| {
            JniError::incomplete(format!("struct {} is not registered", decl.name))
        })?;
        let java_type = registration.java_type.clone();
        let layout = if registration.layout_meta {
            Some(layout::layout_meta(decl, ctx)?)
        } else {
            None
        };

        let record = decl.record_type();
        let mut used_names: HashMap<String, usize> = HashMap::new();
        let mut unique = |base: String| {
            let count = used_names.entry(base.clone()).or_insert(0);
            *count += 1;
            match *count {
                1 => base,
                n => format!("{base}{n}"),
            }
        };

        let mut accessors = Vec::new();
        let mut skipped = Vec::new();
        for field in &decl.fields {
            let getter_name = unique(conventions::getter(
                &field.name,
                field.ty.desugared().spelling(),
            ));
            let setter_name = unique(conventions::setter(&field.name));
            let props = |name: String| DownstreamProperties {
                instance: true,
                ..DownstreamProperties::new(name, java_type.clone())
            };
            let linked = DownstreamMethodUnit::link(
                Operation::get_struct_field(&record, field),
                props(getter_name),
                ctx,
            )
            .and_then(|getter| {
                let setter = DownstreamMethodUnit::link(
                    Operation::set_struct_field(&record, field),
                    props(setter_name),
                    ctx,
                )?;
                Ok((getter, setter))
            });
            match linked {
                Ok((getter, setter)) => accessors.push(FieldAccessors {
                    field: field.name.clone(),
                    getter,
                    setter,
                }),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    let name = format!("{}.{}", decl.name, field.name);
                    warn!(name = %name, err = %e, "skipping field");
                    skipped.push(SkippedDeclaration {
                        kind: DeclarationKind::Field,
                        name,
                        reason: e,
                    });
                }
            }
        }

        Ok((
            StructUnit {
                native_name: decl.name.clone(),
                java_type,
                accessors,
                layout,
            },
            skipped,
        ))
    }
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FunctionUnit {
    pub native_name: String,
    pub method: DownstreamMethodUnit,
}

impl FunctionUnit {
    pub fn new(
        decl: &FunctionDecl,
        java_name: String,
        expose_raw: bool,
        ctx: &GenerationContext,
    ) -> Result<Self, JniError> {
        let props = DownstreamProperties {
            expose_raw,
            ..DownstreamProperties::new(java_name, ctx.container_type())
        };
        let method = DownstreamMethodUnit::link(Operation::call_native(decl), props, ctx)?;
        Ok(FunctionUnit {
            native_name: decl.name.clone(),
            method,
        })
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Record a non-fatal failure, or hand a fatal one back.
fn skip(
    skipped: &mut Vec<SkippedDeclaration>,
    kind: DeclarationKind,
    name: &str,
    err: JniError,
) -> Result<(), JniError> {
    if err.is_fatal() {
        return Err(err);
    }
    warn!(kind = %kind, name = %name, err = %err, "skipping declaration");
    skipped.push(SkippedDeclaration {
        kind,
        name: name.to_string(),
        reason: err,
    });
    Ok(())
}

/// Link every declaration. Declarations that cannot cross the boundary are
/// skipped and listed in [`GenerationOutput::skipped`]; an
/// [`IncompleteLinkage`](JniError::IncompleteLinkage) aborts the run.
pub fn generate(
    decls: &Declarations,
    ctx: &mut GenerationContext,
) -> Result<GenerationOutput, JniError> {
    let mut out = GenerationOutput::default();

    for decl in &decls.enums {
        match EnumUnit::new(decl) {
            Ok(unit) => {
                debug!(name = %decl.name, constants = unit.fields.len(), "linked enum");
                ctx.register_enum(&decl.name);
                out.enums.push(unit);
            }
            Err(e) => skip(&mut out.skipped, DeclarationKind::Enum, &decl.name, e)?,
        }
    }

    let mut candidates: Vec<&StructDecl> = Vec::new();
    for decl in &decls.structs {
        let rule = ctx.struct_rule(&decl.name);
        if !rule.should_generate() {
            debug!(name = %decl.name, "struct excluded by rule");
            continue;
        }
        let java_name = rule
            .name_override
            .clone()
            .unwrap_or_else(|| conventions::escape_name(&decl.name));
        let registration = StructRegistration {
            java_type: ctx.nested_type(&java_name),
            layout_meta: rule.should_generate_layout_meta(),
        };
        ctx.register_struct(&decl.name, registration);
        candidates.push(decl);
    }

    // A struct that fails drops its wrapper, which can in turn break the
    // layout of structs embedding it; relink until nothing else fails.
    let (structs, field_skips) = loop {
        let mut units = Vec::new();
        let mut field_skips = Vec::new();
        let mut failed = Vec::new();
        for decl in &candidates {
            match StructUnit::new(decl, ctx) {
                Ok((unit, skipped)) => {
                    units.push(unit);
                    field_skips.extend(skipped);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => failed.push((decl.name.clone(), e)),
            }
        }
        if failed.is_empty() {
            break (units, field_skips);
        }
        for (name, e) in failed {
            ctx.unregister_struct(&name);
            candidates.retain(|d| d.name != name);
            skip(&mut out.skipped, DeclarationKind::Struct, &name, e)?;
        }
    };
    for unit in &structs {
        debug!(name = %unit.native_name, accessors = unit.accessors.len(), "linked struct");
    }
    out.structs = structs;
    out.skipped.extend(field_skips);

    let container = ctx.container_type();
    let scope = container.plain();
    for decl in &decls.functions {
        let rule = ctx.method_rule(&decl.name);
        if !rule.should_generate() {
            debug!(name = %decl.name, "function excluded by rule");
            continue;
        }
        let base = rule
            .name_override
            .clone()
            .unwrap_or_else(|| conventions::escape_name(&decl.name));
        let java_name = ctx.unique_method_name(&scope, &base);
        match FunctionUnit::new(decl, java_name, rule.should_expose_raw_method(), ctx) {
            Ok(unit) => {
                debug!(
                    name = %decl.name,
                    java = %unit.method.java_method.name,
                    params = unit.method.linkage.parameters.len(),
                    callbacks = unit.method.linkage.spawned.len(),
                    "linked function"
                );
                out.functions.push(unit);
            }
            Err(e) => skip(&mut out.skipped, DeclarationKind::Function, &decl.name, e)?,
        }
    }

    info!(
        enums = out.enums.len(),
        structs = out.structs.len(),
        functions = out.functions.len(),
        callbacks = out.callbacks().len(),
        skipped = out.skipped.len(),
        "generation complete"
    );
    Ok(out)
}
