//! Extraction: clang `Entity`/`Type` → [`Declarations`].
//!
//! Every type is lowered twice: once from its canonical form and once as
//! written, and the two trees are paired with [`TypeNode::with_verbatim`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clang::{
    Entity, EntityKind, Index, Type as ClangType, TypeKind as ClangKind,
    sonar::{self, Declaration},
};
use tracing::{debug, trace, warn};

use crate::config::{self, PartitionConfig};
use crate::model::*;

/// Extract all declarations from a single partition.
pub fn extract_partition(
    index: &Index,
    partition: &PartitionConfig,
    partition_index: usize,
    base_dir: &Path,
    include_paths: &[PathBuf],
    global_args: &[String],
) -> Result<Declarations> {
    let header_path = partition.wrapper_header(partition_index, base_dir, include_paths)?;
    debug!(header = %header_path.display(), "parsing partition");

    let mut all_args: Vec<String> = global_args.to_vec();
    all_args.extend(partition.clang_args.iter().cloned());
    for inc in include_paths {
        let flag = format!("-I{}", inc.display());
        if !all_args.contains(&flag) {
            all_args.push(flag);
        }
    }

    let tu = index
        .parser(header_path.clone())
        .arguments(&all_args)
        .detailed_preprocessing_record(true)
        .parse()
        .map_err(|e| anyhow::anyhow!("failed to parse {}: {:?}", header_path.display(), e))?;

    let resolved_traverse: Vec<PathBuf> = partition
        .traverse_files()
        .iter()
        .map(|t| config::resolve_header(t, base_dir, include_paths))
        .collect();
    let entities = tu.get_entity().get_children();

    let in_scope = |e: &Entity| should_emit(e, &resolved_traverse);

    let decls = Declarations {
        structs: collect_structs(&entities, &in_scope),
        enums: collect_enums(&entities, &in_scope),
        functions: collect_functions(&entities, &in_scope),
    };

    tracing::info!(
        header = %header_path.display(),
        structs = decls.structs.len(),
        enums = decls.enums.len(),
        functions = decls.functions.len(),
        "partition extraction complete"
    );
    Ok(decls)
}

// ---------------------------------------------------------------------------
// Collection helpers, one per declaration kind
// ---------------------------------------------------------------------------

/// Collect structs via sonar, then pick up definitions sonar missed (structs
/// only reachable through a pointer typedef).
fn collect_structs(entities: &[Entity], in_scope: &impl Fn(&Entity) -> bool) -> Vec<StructDecl> {
    let mut structs = Vec::new();
    let mut seen = HashSet::new();

    for decl in sonar::find_structs(entities.to_vec()) {
        if !in_scope(&decl.entity) {
            continue;
        }
        seen.insert(decl.name.clone());
        match extract_struct(&decl.entity, &decl.name) {
            Ok(s) => {
                debug!(name = %s.name, fields = s.fields.len(), "extracted struct");
                structs.push(s);
            }
            Err(e) => warn!(name = %decl.name, err = %e, "skipping struct"),
        }
    }

    for entity in entities {
        if entity.get_kind() != EntityKind::StructDecl || !in_scope(entity) {
            continue;
        }
        let name = match entity.get_name() {
            Some(n) if !n.is_empty() => n,
            _ => continue,
        };
        if seen.contains(&name) || !entity.is_definition() {
            continue;
        }
        seen.insert(name.clone());
        match extract_struct(entity, &name) {
            Ok(s) => {
                debug!(name = %s.name, fields = s.fields.len(), "extracted struct (supplemental)");
                structs.push(s);
            }
            Err(e) => warn!(name = %name, err = %e, "skipping struct"),
        }
    }

    structs
}

fn collect_enums(entities: &[Entity], in_scope: &impl Fn(&Entity) -> bool) -> Vec<EnumDecl> {
    let mut enums = Vec::new();
    for decl in sonar::find_enums(entities.to_vec()) {
        if !in_scope(&decl.entity) {
            continue;
        }
        // clang names anonymous enums "enum (unnamed at ...)"; they have no
        // class to live in.
        if decl.entity.is_anonymous() || decl.name.contains("(unnamed") {
            trace!(name = %decl.name, "skipping anonymous enum");
            continue;
        }
        match extract_enum(&decl) {
            Ok(en) => {
                debug!(name = %en.name, constants = en.constants.len(), "extracted enum");
                enums.push(en);
            }
            Err(e) => warn!(name = %decl.name, err = %e, "skipping enum"),
        }
    }
    enums
}

fn collect_functions(
    entities: &[Entity],
    in_scope: &impl Fn(&Entity) -> bool,
) -> Vec<FunctionDecl> {
    let mut functions = Vec::new();
    let mut seen = HashSet::new();
    for decl in sonar::find_functions(entities.to_vec()) {
        if !in_scope(&decl.entity) {
            continue;
        }
        if decl.entity.is_variadic() {
            warn!(name = %decl.name, "skipping variadic function");
            continue;
        }
        match extract_function(&decl) {
            Ok(f) => {
                // glibc __REDIRECT macros can declare the same function twice
                if !seen.insert(f.name.clone()) {
                    trace!(name = %f.name, "skipping duplicate function");
                    continue;
                }
                debug!(name = %f.name, params = f.params.len(), "extracted function");
                functions.push(f);
            }
            Err(e) => warn!(name = %decl.name, err = %e, "skipping function"),
        }
    }
    functions
}

// ---------------------------------------------------------------------------
// Declaration extraction
// ---------------------------------------------------------------------------

fn extract_struct(entity: &Entity, name: &str) -> Result<StructDecl> {
    let mut fields = Vec::new();
    for child in entity.get_children() {
        if child.get_kind() != EntityKind::FieldDecl {
            continue;
        }
        let field_name = child.get_name().unwrap_or_default();
        let field_type = child.get_type().context("field has no type")?;
        let ty = lower_paired(&field_type)
            .with_context(|| format!("unsupported type for field '{field_name}'"))?;
        fields.push(FieldDecl {
            name: field_name,
            ty,
        });
    }
    Ok(StructDecl {
        name: name.to_string(),
        fields,
    })
}

fn extract_enum(decl: &Declaration) -> Result<EnumDecl> {
    let underlying = decl
        .entity
        .get_enum_underlying_type()
        .context("enum has no underlying type")?;
    let unsigned = matches!(
        underlying.get_canonical_type().get_kind(),
        ClangKind::UChar | ClangKind::UShort | ClangKind::UInt | ClangKind::ULong | ClangKind::ULongLong
    );

    let constants = decl
        .entity
        .get_children()
        .into_iter()
        .filter(|child| child.get_kind() == EntityKind::EnumConstantDecl)
        .map(|child| EnumConstantDecl {
            name: child.get_name().unwrap_or_default(),
            value: child.get_enum_constant_value().map(|(signed, raw)| {
                if unsigned {
                    EnumValue::Unsigned(raw)
                } else {
                    EnumValue::Signed(signed)
                }
            }),
        })
        .collect();

    Ok(EnumDecl {
        name: decl.name.clone(),
        constants,
    })
}

fn extract_function(decl: &Declaration) -> Result<FunctionDecl> {
    let fn_type = decl.entity.get_type().context("function has no type")?;
    let ret_type = fn_type
        .get_result_type()
        .context("function has no return type")?;
    let return_type = lower_paired(&ret_type).context("unsupported return type")?;

    let args = decl.entity.get_arguments().unwrap_or_default();
    let mut params = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        let name = arg.get_name().unwrap_or_else(|| format!("param{i}"));
        let arg_type = arg
            .get_type()
            .with_context(|| format!("parameter '{name}' has no type"))?;
        let ty = lower_paired(&arg_type)
            .with_context(|| format!("unsupported type for parameter '{name}'"))?;
        params.push(ParamDecl { name, ty });
    }

    Ok(FunctionDecl {
        name: decl.name.clone(),
        return_type,
        params,
    })
}

// ---------------------------------------------------------------------------
// Type lowering: clang Type → TypeNode
// ---------------------------------------------------------------------------

/// Lower `ty` canonically and as written, and pair the two trees.
fn lower_paired(ty: &ClangType) -> Result<TypeRef> {
    let canonical = lower(&ty.get_canonical_type())?;
    let verbatim = lower(ty)?;
    Ok(TypeNode::with_verbatim(&canonical, &verbatim))
}

fn lower(ty: &ClangType) -> Result<TypeRef> {
    let spelling = ty.get_display_name();
    let builtin = |kind: TypeKind| -> Result<TypeRef> { Ok(TypeNode::builtin(kind, spelling.clone())) };
    match ty.get_kind() {
        ClangKind::Void => builtin(TypeKind::Void),
        ClangKind::Bool => builtin(TypeKind::Bool),
        ClangKind::CharS => builtin(TypeKind::CharS),
        ClangKind::CharU => builtin(TypeKind::CharU),
        ClangKind::SChar => builtin(TypeKind::SChar),
        ClangKind::UChar => builtin(TypeKind::UChar),
        ClangKind::Char16 => builtin(TypeKind::Char16),
        ClangKind::Char32 => builtin(TypeKind::Char32),
        ClangKind::WChar => builtin(TypeKind::WChar),
        ClangKind::Short => builtin(TypeKind::Short),
        ClangKind::UShort => builtin(TypeKind::UShort),
        ClangKind::Int => builtin(TypeKind::Int),
        ClangKind::UInt => builtin(TypeKind::UInt),
        ClangKind::Long => builtin(TypeKind::Long),
        ClangKind::ULong => builtin(TypeKind::ULong),
        ClangKind::LongLong => builtin(TypeKind::LongLong),
        ClangKind::ULongLong => builtin(TypeKind::ULongLong),
        ClangKind::Int128 => builtin(TypeKind::Int128),
        ClangKind::UInt128 => builtin(TypeKind::UInt128),
        ClangKind::Float => builtin(TypeKind::Float),
        ClangKind::Double => builtin(TypeKind::Double),
        ClangKind::LongDouble => builtin(TypeKind::LongDouble),

        ClangKind::Pointer => {
            let pointee = ty
                .get_pointee_type()
                .context("pointer has no pointee type")?;
            Ok(TypeNode::pointer_spelled(spelling, lower(&pointee)?))
        }

        ClangKind::ConstantArray => {
            let elem = ty.get_element_type().context("array has no element type")?;
            Ok(TypeNode::array(lower(&elem)?, ty.get_size()))
        }

        ClangKind::IncompleteArray => {
            let elem = ty
                .get_element_type()
                .context("incomplete array has no element type")?;
            Ok(TypeNode::array(lower(&elem)?, None))
        }

        ClangKind::Elaborated => {
            let inner = ty
                .get_elaborated_type()
                .context("elaborated type has no inner type")?;
            lower(&inner)
        }

        ClangKind::Typedef => {
            let decl = ty.get_declaration().context("typedef has no declaration")?;
            let name = decl.get_name().unwrap_or_else(|| spelling.clone());
            let underlying = decl
                .get_typedef_underlying_type()
                .context("typedef has no underlying type")?;
            Ok(TypeNode::typedef(name, lower(&underlying)?))
        }

        ClangKind::Record => Ok(TypeNode::record(spelling)),

        ClangKind::Enum => Ok(TypeNode::enumeration(spelling)),

        ClangKind::FunctionPrototype => {
            let ret = ty
                .get_result_type()
                .context("function prototype has no return type")?;
            let params = ty
                .get_argument_types()
                .unwrap_or_default()
                .iter()
                .map(lower)
                .collect::<Result<Vec<_>>>()?;
            Ok(TypeNode::function(lower(&ret)?, params))
        }

        other => anyhow::bail!("unsupported clang TypeKind: {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Scope filtering
// ---------------------------------------------------------------------------

fn should_emit(entity: &Entity, traverse_files: &[PathBuf]) -> bool {
    let Some(location) = entity.get_location() else {
        return false;
    };
    let Some(file) = location.get_file_location().file else {
        return false;
    };
    let file_path = file.get_path();
    traverse_files
        .iter()
        .any(|tf| file_path == *tf || file_path.ends_with(tf))
}
