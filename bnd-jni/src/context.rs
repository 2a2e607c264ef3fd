//! Per-run generation context.

use std::collections::{HashMap, HashSet};

use crate::config::{Config, MethodRule, Namings, RuleSet, StructRule};
use crate::java::JavaType;

/// A struct that gets a Java wrapper class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructRegistration {
    pub java_type: JavaType,
    pub layout_meta: bool,
}

/// State shared by every declaration of one run: output naming, rules, and
/// the registry of generated wrappers that field and parameter types
/// resolve against.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    package: String,
    container_class: String,
    namings: Namings,
    rules: RuleSet,
    structs: HashMap<String, StructRegistration>,
    enums: HashSet<String>,
    method_names: HashMap<(String, String), usize>,
}

impl GenerationContext {
    pub fn new(package: impl Into<String>, container_class: impl Into<String>) -> Self {
        GenerationContext {
            package: package.into(),
            container_class: container_class.into(),
            namings: Namings::default(),
            rules: RuleSet::default(),
            structs: HashMap::new(),
            enums: HashSet::new(),
            method_names: HashMap::new(),
        }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let rules = RuleSet::new(&cfg.method_rule, &cfg.struct_rule)
            .map_err(|e| anyhow::anyhow!("invalid rule name_pattern: {e}"))?;
        Ok(GenerationContext::new(&cfg.output.package, &cfg.output.container_class)
            .with_namings(cfg.namings.clone())
            .with_rules(rules))
    }

    pub fn with_namings(mut self, namings: Namings) -> Self {
        self.namings = namings;
        self
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn namings(&self) -> &Namings {
        &self.namings
    }

    /// The outer class holding native methods and nested types.
    pub fn container_type(&self) -> JavaType {
        JavaType::object(&self.package, &self.container_class)
    }

    /// `<Container>.<name>` in the output package.
    pub fn nested_type(&self, name: &str) -> JavaType {
        JavaType::object(&self.package, format!("{}.{name}", self.container_class))
    }

    pub fn method_rule(&self, name: &str) -> MethodRule {
        self.rules.method_rule(name)
    }

    pub fn struct_rule(&self, name: &str) -> StructRule {
        self.rules.struct_rule(name)
    }

    pub fn register_struct(&mut self, native_name: impl Into<String>, reg: StructRegistration) {
        self.structs.insert(native_name.into(), reg);
    }

    pub fn unregister_struct(&mut self, native_name: &str) -> Option<StructRegistration> {
        self.structs.remove(native_name)
    }

    pub fn struct_wrapper(&self, native_name: &str) -> Option<&StructRegistration> {
        self.structs.get(native_name)
    }

    pub fn register_enum(&mut self, native_name: impl Into<String>) {
        self.enums.insert(native_name.into());
    }

    pub fn is_enum_registered(&self, native_name: &str) -> bool {
        self.enums.contains(native_name)
    }

    /// `base`, or `base2`, `base3`, ... when `scope` already has a method
    /// of that name.
    pub fn unique_method_name(&mut self, scope: &str, base: &str) -> String {
        let count = self
            .method_names
            .entry((scope.to_string(), base.to_string()))
            .or_insert(0);
        *count += 1;
        match *count {
            1 => base.to_string(),
            n => format!("{base}{n}"),
        }
    }
}
