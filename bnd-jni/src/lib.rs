//! bnd-jni: link C declarations into Java/JNI/native call chains.
//!
//! For every native function, struct field and callback, the linker decides
//! what each value looks like on the Java side, on the JNI bridge and in
//! native code, and which conversion expression moves it from one layer to
//! the next. The result is a set of generation units an emitter prints.
//!
//! # Quick start
//!
//! Link declarations built in memory:
//!
//! ```
//! use bnd_jni::{GenerationContext, generate};
//! use bnd_jni::model::{Declarations, FunctionDecl, ParamDecl, TypeKind, TypeNode};
//!
//! let int32 = TypeNode::typedef("int32_t", TypeNode::builtin(TypeKind::Int, "int"));
//! let decls = Declarations {
//!     functions: vec![FunctionDecl {
//!         name: "Add".into(),
//!         return_type: int32.clone(),
//!         params: vec![
//!             ParamDecl { name: "a".into(), ty: int32.clone() },
//!             ParamDecl { name: "b".into(), ty: int32 },
//!         ],
//!     }],
//!     ..Default::default()
//! };
//! let mut ctx = GenerationContext::new("com.example", "Native");
//! let out = generate(&decls, &mut ctx).unwrap();
//! println!("{out}");
//! ```
//!
//! With the `clang` feature, [`run`] does the whole thing from a
//! `bnd-jni.toml` file (suitable for `build.rs`):
//!
//! ```ignore
//! bnd_jni::run(std::path::Path::new("bnd-jni.toml"), None).unwrap();
//! ```

pub mod classify;
pub mod config;
pub mod context;
pub mod conventions;
pub mod error;
#[cfg(feature = "clang")]
pub mod extract;
pub mod generate;
pub mod java;
pub mod layout;
pub mod linker;
pub mod model;
pub mod names;
pub mod operation;
pub mod plan;
pub mod signature;
pub mod transition;
pub mod unit;

pub use context::GenerationContext;
pub use error::JniError;
pub use generate::{GenerationOutput, generate};

use anyhow::{Context, Result};
use tracing::info;

/// Link already-extracted declarations under an already-loaded
/// [`config::Config`].
pub fn generate_from_declarations(
    cfg: &config::Config,
    decls: &model::Declarations,
) -> Result<GenerationOutput> {
    info!(
        package = %cfg.output.package,
        container = %cfg.output.container_class,
        functions = decls.functions.len(),
        structs = decls.structs.len(),
        enums = decls.enums.len(),
        "linking declarations"
    );
    let mut ctx = GenerationContext::from_config(cfg)?;
    generate(decls, &mut ctx).context("generator defect while linking declarations")
}

#[cfg(feature = "clang")]
mod pipeline {
    use std::path::{Path, PathBuf};

    use anyhow::{Context, Result};
    use tracing::info;

    use crate::{GenerationOutput, config, extract, model};

    /// Run the full pipeline: load config, parse C headers, link, and write
    /// the plan file.
    ///
    /// `config_path` is the path to a `bnd-jni.toml` configuration file.
    /// `output` optionally overrides the output file path from the config.
    ///
    /// Returns the path the plan was written to.
    pub fn run(config_path: &Path, output: Option<&Path>) -> Result<PathBuf> {
        let cfg = config::load_config(config_path)
            .with_context(|| format!("loading config from {}", config_path.display()))?;

        let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

        let out = generate_from_config(&cfg, base_dir)?;
        let plan = out.to_string();

        let output_path = match output {
            Some(p) => p.to_path_buf(),
            None => base_dir.join(&cfg.output.file),
        };
        std::fs::write(&output_path, &plan)
            .with_context(|| format!("writing output to {}", output_path.display()))?;

        info!(
            path = %output_path.display(),
            size = plan.len(),
            "wrote plan"
        );

        Ok(output_path)
    }

    /// Parse a `bnd-jni.toml` config file, extract declarations from the
    /// referenced C headers, and link them without writing anything.
    pub fn plan(config_path: &Path) -> Result<GenerationOutput> {
        let cfg = config::load_config(config_path)
            .with_context(|| format!("loading config from {}", config_path.display()))?;

        let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

        generate_from_config(&cfg, base_dir)
    }

    /// Extract and link everything an already-loaded [`config::Config`]
    /// points at. Header paths resolve relative to `base_dir`.
    pub fn generate_from_config(cfg: &config::Config, base_dir: &Path) -> Result<GenerationOutput> {
        info!(
            package = %cfg.output.package,
            partitions = cfg.partition.len(),
            "loaded configuration"
        );

        let clang = clang::Clang::new()
            .map_err(|e| anyhow::anyhow!("failed to initialize libclang: {e}"))?;
        let index = clang::Index::new(&clang, false, false);

        let mut decls = model::Declarations::default();
        for (i, partition_cfg) in cfg.partition.iter().enumerate() {
            let partition = extract::extract_partition(
                &index,
                partition_cfg,
                i,
                base_dir,
                &cfg.include_paths,
                &cfg.clang_args,
            )?;
            decls.extend(partition);
        }

        crate::generate_from_declarations(cfg, &decls)
    }
}

#[cfg(feature = "clang")]
pub use pipeline::{generate_from_config, plan, run};
