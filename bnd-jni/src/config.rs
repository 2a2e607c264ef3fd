//! Configuration types for `bnd-jni.toml`.

use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub output: OutputConfig,
    /// Additional directories to search when resolving header and traverse
    /// paths.  Each entry is tried in order after `base_dir` (the TOML
    /// file's parent directory).  Also injected as `-I` flags for clang.
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,
    /// Extra clang arguments applied to **all** partitions.  Per-partition
    /// `clang_args` are appended after these.
    #[serde(default)]
    pub clang_args: Vec<String>,
    #[serde(default)]
    pub partition: Vec<PartitionConfig>,
    #[serde(default)]
    pub namings: Namings,
    #[serde(default)]
    pub method_rule: Vec<MethodRule>,
    #[serde(default)]
    pub struct_rule: Vec<StructRule>,
}

/// Output settings.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Java package of the generated classes (e.g. `com.example.zlib`).
    pub package: String,
    /// Outer class that holds native methods and nested wrapper types.
    #[serde(default = "default_container_class")]
    pub container_class: String,
    /// Plan file path (e.g. `zlib.plan`).
    #[serde(default = "default_output_file")]
    pub file: PathBuf,
}

fn default_container_class() -> String {
    "Native".to_string()
}

fn default_output_file() -> PathBuf {
    PathBuf::from("bindings.plan")
}

/// A set of headers parsed as one translation unit.
#[derive(Debug, Deserialize)]
pub struct PartitionConfig {
    /// Headers to include (all are parsed for dependency resolution).
    pub headers: Vec<PathBuf>,
    /// Which files to actually take declarations from.
    /// If empty, uses `headers`.
    #[serde(default)]
    pub traverse: Vec<PathBuf>,
    /// Extra clang arguments (e.g. `-I/usr/include`).
    #[serde(default)]
    pub clang_args: Vec<String>,
}

impl PartitionConfig {
    /// Returns the traverse list, falling back to `headers` if empty.
    pub fn traverse_files(&self) -> &[PathBuf] {
        if self.traverse.is_empty() {
            &self.headers
        } else {
            &self.traverse
        }
    }

    /// Returns the translation unit file to parse.
    ///
    /// A single header is parsed directly.  Several headers get a wrapper
    /// `.c` file in the temp directory that `#include`s all of them;
    /// `index` keeps wrappers of different partitions apart.
    pub fn wrapper_header(
        &self,
        index: usize,
        base_dir: &Path,
        include_paths: &[PathBuf],
    ) -> anyhow::Result<PathBuf> {
        if let [single] = self.headers.as_slice() {
            return Ok(resolve_header(single, base_dir, include_paths));
        }
        let wrapper_dir = std::env::temp_dir().join("bnd_jni_wrappers");
        std::fs::create_dir_all(&wrapper_dir).map_err(|e| {
            anyhow::anyhow!("failed to create wrapper dir {}: {}", wrapper_dir.display(), e)
        })?;
        let wrapper_path = wrapper_dir.join(format!("partition{index}_wrapper.c"));

        let mut content = String::new();
        for h in &self.headers {
            let abs = resolve_header(h, base_dir, include_paths);
            content.push_str(&format!("#include \"{}\"\n", abs.display()));
        }
        std::fs::write(&wrapper_path, &content).map_err(|e| {
            anyhow::anyhow!("failed to write wrapper file {}: {}", wrapper_path.display(), e)
        })?;
        Ok(wrapper_path)
    }
}

/// Resolve a header path by searching `base_dir` first, then each
/// `include_paths` entry.  Absolute paths are returned as-is.  If the
/// file is not found anywhere, falls back to `base_dir.join(path)` so
/// that the caller gets a meaningful error from clang.
pub fn resolve_header(path: &Path, base_dir: &Path, include_paths: &[PathBuf]) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let candidate = base_dir.join(path);
    if candidate.exists() {
        return candidate;
    }
    for inc in include_paths {
        let candidate = inc.join(path);
        if candidate.exists() {
            return candidate;
        }
    }
    base_dir.join(path)
}

// ---------------------------------------------------------------------------
// Namings
// ---------------------------------------------------------------------------

/// Fixed names used in generated code.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Namings {
    /// Method a callback interface declares.
    pub callback_interface_method: String,
    /// Static method native code calls to dispatch into a callback.
    pub callback_caller_method: String,
    /// Format of layout offset fields; `{}` is replaced by the field name
    /// in screaming case.
    pub struct_offset_field: String,
    pub struct_layout_field: String,
    pub struct_size_field: String,
}

impl Default for Namings {
    fn default() -> Self {
        Namings {
            callback_interface_method: "execute".to_string(),
            callback_caller_method: "runCallback".to_string(),
            struct_offset_field: "OFFSET_{}".to_string(),
            struct_layout_field: "LAYOUT".to_string(),
            struct_size_field: "SIZE".to_string(),
        }
    }
}

impl Namings {
    pub fn offset_field(&self, field: &str) -> String {
        self.struct_offset_field
            .replace("{}", &crate::conventions::screaming_case(field))
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Rule for native functions.
///
/// ```toml
/// [[method_rule]]
/// name_pattern = "^deflate"
/// expose_raw_method = true
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MethodRule {
    /// Regex matched against the native name; empty matches every name.
    pub name_pattern: Option<String>,
    pub name_override: Option<String>,
    pub exclude: Option<bool>,
    /// Make the raw `native` Java method public.
    pub expose_raw_method: Option<bool>,
}

impl MethodRule {
    /// `other` on top of `self`: set fields of `other` win.
    pub fn fusion_with(&self, other: &MethodRule) -> MethodRule {
        MethodRule {
            name_pattern: other.name_pattern.clone().or_else(|| self.name_pattern.clone()),
            name_override: other
                .name_override
                .clone()
                .or_else(|| self.name_override.clone()),
            exclude: other.exclude.or(self.exclude),
            expose_raw_method: other.expose_raw_method.or(self.expose_raw_method),
        }
    }

    pub fn should_generate(&self) -> bool {
        !self.exclude.unwrap_or(false)
    }

    pub fn should_expose_raw_method(&self) -> bool {
        self.expose_raw_method.unwrap_or(false)
    }
}

/// Rule for structs.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StructRule {
    pub name_pattern: Option<String>,
    pub name_override: Option<String>,
    pub exclude: Option<bool>,
    /// Emit field offsets, size and a layout descriptor for the wrapper.
    pub generate_layout_meta: Option<bool>,
}

impl StructRule {
    pub fn fusion_with(&self, other: &StructRule) -> StructRule {
        StructRule {
            name_pattern: other.name_pattern.clone().or_else(|| self.name_pattern.clone()),
            name_override: other
                .name_override
                .clone()
                .or_else(|| self.name_override.clone()),
            exclude: other.exclude.or(self.exclude),
            generate_layout_meta: other.generate_layout_meta.or(self.generate_layout_meta),
        }
    }

    pub fn should_generate(&self) -> bool {
        !self.exclude.unwrap_or(false)
    }

    pub fn should_generate_layout_meta(&self) -> bool {
        self.generate_layout_meta.unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
struct Compiled<R> {
    /// `None` matches every name.
    pattern: Option<Regex>,
    rule: R,
}

impl<R> Compiled<R> {
    fn matches(&self, name: &str) -> bool {
        self.pattern.as_ref().is_none_or(|p| p.is_match(name))
    }
}

fn compile(pattern: Option<&str>) -> Result<Option<Regex>, regex::Error> {
    match pattern.map(str::trim) {
        None | Some("") => Ok(None),
        Some(p) => Regex::new(p).map(Some),
    }
}

/// Method and struct rules with their patterns compiled.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    methods: Vec<Compiled<MethodRule>>,
    structs: Vec<Compiled<StructRule>>,
}

impl RuleSet {
    pub fn new(methods: &[MethodRule], structs: &[StructRule]) -> Result<RuleSet, regex::Error> {
        let methods = methods
            .iter()
            .map(|rule| {
                Ok(Compiled {
                    pattern: compile(rule.name_pattern.as_deref())?,
                    rule: rule.clone(),
                })
            })
            .collect::<Result<_, regex::Error>>()?;
        let structs = structs
            .iter()
            .map(|rule| {
                Ok(Compiled {
                    pattern: compile(rule.name_pattern.as_deref())?,
                    rule: rule.clone(),
                })
            })
            .collect::<Result<_, regex::Error>>()?;
        Ok(RuleSet { methods, structs })
    }

    /// All rules matching `name`, fused in declaration order.
    pub fn method_rule(&self, name: &str) -> MethodRule {
        self.methods
            .iter()
            .filter(|c| c.matches(name))
            .fold(MethodRule::default(), |acc, c| acc.fusion_with(&c.rule))
    }

    pub fn struct_rule(&self, name: &str) -> StructRule {
        self.structs
            .iter()
            .filter(|c| c.matches(name))
            .fold(StructRule::default(), |acc, c| acc.fusion_with(&c.rule))
    }
}

/// Load and parse a `bnd-jni.toml` configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {}", path.display(), e))?;
    Ok(config)
}
