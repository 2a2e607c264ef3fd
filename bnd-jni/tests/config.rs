//! `bnd-jni.toml` loading and rule fusion.

mod common;

use std::path::{Path, PathBuf};

use bnd_jni::GenerationContext;
use bnd_jni::config::{self, Config, MethodRule, RuleSet, StructRule};
use bnd_jni::model::Declarations;

use common::*;

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("bnd-jni.toml");
    std::fs::write(&path, content).expect("write config");
    path
}

fn parse(content: &str) -> Config {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(dir.path(), content);
    config::load_config(&path).expect("load config")
}

#[test]
fn minimal_config_uses_defaults() {
    let cfg = parse(
        r#"
[output]
package = "com.example.zlib"
"#,
    );
    assert_eq!(cfg.output.package, "com.example.zlib");
    assert_eq!(cfg.output.container_class, "Native");
    assert_eq!(cfg.output.file, PathBuf::from("bindings.plan"));
    assert!(cfg.partition.is_empty());
    assert_eq!(cfg.namings.callback_interface_method, "execute");
    assert_eq!(cfg.namings.callback_caller_method, "runCallback");
    assert_eq!(cfg.namings.offset_field("totalIn"), "OFFSET_TOTAL_IN");
}

#[test]
fn full_config_round_trips_every_section() {
    let cfg = parse(
        r#"
include_paths = ["include"]
clang_args = ["-DZLIB_CONST"]

[output]
package = "com.example.zlib"
container_class = "Zlib"
file = "zlib.plan"

[[partition]]
headers = ["zlib.h", "zconf.h"]
traverse = ["zlib.h"]
clang_args = ["-std=c11"]

[namings]
callback_interface_method = "invoke"
struct_offset_field = "{}_OFFSET"

[[method_rule]]
name_pattern = "^deflate"
expose_raw_method = true

[[struct_rule]]
name_pattern = "^z_stream"
name_override = "ZStream"
generate_layout_meta = true
"#,
    );
    assert_eq!(cfg.include_paths, vec![PathBuf::from("include")]);
    assert_eq!(cfg.clang_args, vec!["-DZLIB_CONST".to_string()]);
    assert_eq!(cfg.output.container_class, "Zlib");

    let partition = &cfg.partition[0];
    assert_eq!(partition.headers.len(), 2);
    assert_eq!(partition.traverse_files(), &[PathBuf::from("zlib.h")]);
    assert_eq!(partition.clang_args, vec!["-std=c11".to_string()]);

    assert_eq!(cfg.namings.callback_interface_method, "invoke");
    assert_eq!(
        cfg.namings.callback_caller_method, "runCallback",
        "unset namings keep their defaults"
    );
    assert_eq!(cfg.namings.offset_field("avail_in"), "AVAIL_IN_OFFSET");

    assert_eq!(
        cfg.method_rule,
        vec![MethodRule {
            name_pattern: Some("^deflate".to_string()),
            expose_raw_method: Some(true),
            ..Default::default()
        }]
    );
    assert_eq!(cfg.struct_rule[0].name_override.as_deref(), Some("ZStream"));

    let ctx = GenerationContext::from_config(&cfg).expect("context");
    assert!(ctx.method_rule("deflateInit").should_expose_raw_method());
    assert!(!ctx.method_rule("inflate").should_expose_raw_method());
    assert!(ctx.struct_rule("z_stream_s").should_generate_layout_meta());
    assert_eq!(ctx.container_type().to_string(), "com.example.zlib.Zlib");
}

#[test]
fn traverse_falls_back_to_headers() {
    let cfg = parse(
        r#"
[output]
package = "p"

[[partition]]
headers = ["a.h"]
"#,
    );
    assert_eq!(cfg.partition[0].traverse_files(), &[PathBuf::from("a.h")]);
}

#[test]
fn missing_file_and_bad_toml_are_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nope.toml");
    let err = config::load_config(&missing).unwrap_err();
    assert!(
        err.to_string().contains("failed to read config file"),
        "got: {err}"
    );

    let path = write_config(dir.path(), "[output]\npackage = 3\n");
    let err = config::load_config(&path).unwrap_err();
    assert!(
        err.to_string().contains("failed to parse config file"),
        "got: {err}"
    );
}

#[test]
fn later_rules_override_and_unset_fields_inherit() {
    let methods = [
        MethodRule {
            name_pattern: None,
            expose_raw_method: Some(true),
            name_override: Some("general".to_string()),
            ..Default::default()
        },
        MethodRule {
            name_pattern: Some("^z".to_string()),
            name_override: Some("specific".to_string()),
            ..Default::default()
        },
        MethodRule {
            name_pattern: Some("^zz".to_string()),
            expose_raw_method: Some(false),
            ..Default::default()
        },
    ];
    let rules = RuleSet::new(&methods, &[]).expect("rules");

    let plain = rules.method_rule("compress");
    assert_eq!(plain.name_override.as_deref(), Some("general"));
    assert!(plain.should_expose_raw_method());

    let z = rules.method_rule("zlibVersion");
    assert_eq!(z.name_override.as_deref(), Some("specific"));
    assert!(z.should_expose_raw_method(), "inherited from the general rule");

    let zz = rules.method_rule("zzTop");
    assert_eq!(zz.name_override.as_deref(), Some("specific"));
    assert!(!zz.should_expose_raw_method(), "overridden by the narrowest rule");

    let unmatched = RuleSet::default().method_rule("anything");
    assert!(unmatched.should_generate());
    assert_eq!(unmatched, MethodRule::default());
}

#[test]
fn empty_pattern_matches_everything() {
    let rules = RuleSet::new(
        &[],
        &[StructRule {
            name_pattern: Some("  ".to_string()),
            exclude: Some(true),
            ..Default::default()
        }],
    )
    .expect("rules");
    assert!(!rules.struct_rule("Point").should_generate());
    assert!(!rules.struct_rule("").should_generate());
}

#[test]
fn invalid_pattern_is_a_config_error() {
    let cfg = parse(
        r#"
[output]
package = "p"

[[method_rule]]
name_pattern = "([unclosed"
"#,
    );
    let err = GenerationContext::from_config(&cfg).unwrap_err();
    assert!(
        err.to_string().contains("invalid rule name_pattern"),
        "got: {err}"
    );
}

#[test]
fn declarations_link_under_a_loaded_config() {
    let cfg = parse(
        r#"
[output]
package = "com.example.geo"
container_class = "Geo"

[[method_rule]]
name_pattern = "^Add$"
name_override = "plus"
"#,
    );
    let decls = Declarations {
        functions: vec![function(
            "Add",
            int32_t(),
            vec![param("a", int32_t()), param("b", int32_t())],
        )],
        ..Default::default()
    };
    let out = bnd_jni::generate_from_declarations(&cfg, &decls).expect("generate");
    let add = out.function("Add").expect("Add");
    assert_eq!(add.method.java_method.name, "plus");
    assert_eq!(add.method.glue_method.name, "Java_com_example_geo_Geo_plusRaw");
}

#[test]
fn wrapper_header_includes_every_header() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("a.h"), "int a(void);\n").expect("write a.h");
    std::fs::write(dir.path().join("b.h"), "int b(void);\n").expect("write b.h");
    let cfg = parse(
        r#"
[output]
package = "p"

[[partition]]
headers = ["a.h", "b.h"]

[[partition]]
headers = ["a.h"]
"#,
    );

    let wrapper = cfg.partition[0]
        .wrapper_header(0, dir.path(), &[])
        .expect("wrapper");
    let content = std::fs::read_to_string(&wrapper).expect("read wrapper");
    assert!(content.contains(&format!("#include \"{}\"", dir.path().join("a.h").display())));
    assert!(content.contains(&format!("#include \"{}\"", dir.path().join("b.h").display())));

    let single = cfg.partition[1]
        .wrapper_header(1, dir.path(), &[])
        .expect("single header");
    assert_eq!(single, dir.path().join("a.h"), "one header is parsed directly");
}
