//! End-to-end: parse geo.h with libclang → link → plan file.

#![cfg(feature = "clang")]

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use bnd_jni::GenerationOutput;
use bnd_jni::generate::DeclarationKind;

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/geo.toml")
}

static GEO: LazyLock<GenerationOutput> =
    LazyLock::new(|| bnd_jni::plan(&fixture()).expect("plan geo.h"));

#[test]
fn functions_extracted_and_linked() {
    let names: Vec<&str> = GEO.functions.iter().map(|f| f.native_name.as_str()).collect();
    for expected in [
        "geo_add",
        "geo_describe",
        "geo_paint",
        "geo_translate",
        "geo_count",
        "geo_for_each",
    ] {
        assert!(names.contains(&expected), "{expected} missing. Found: {names:?}");
    }
    assert!(
        !names.contains(&"geo_printf"),
        "variadic functions are not extracted"
    );
}

#[test]
fn fixed_width_typedefs_survive_extraction() {
    let add = GEO.function("geo_add").expect("geo_add");
    assert_eq!(
        add.method.native_method.to_string(),
        "int32_t geo_add(int32_t a, int32_t b)",
        "native signatures keep the spelling of the header"
    );
    assert_eq!(add.method.java_method.to_string(), "public static int geo_add(int a, int b)");
}

#[test]
fn callback_without_context_is_skipped() {
    let skipped: Vec<(DeclarationKind, &str)> = GEO
        .skipped
        .iter()
        .map(|s| (s.kind, s.name.as_str()))
        .collect();
    assert!(
        skipped.contains(&(DeclarationKind::Function, "geo_subscribe")),
        "geo_subscribe should be skipped. Skipped: {skipped:?}"
    );

    let callbacks = GEO.callbacks();
    assert_eq!(callbacks.len(), 1, "only geo_for_each spawns a callback");
    assert_eq!(callbacks[0].interface_name, "Callback_geo_for_each_visit");
}

#[test]
fn string_return_has_deletion_flag() {
    let describe = GEO.function("geo_describe").expect("geo_describe");
    let ret = describe
        .method
        .linkage
        .return_value
        .as_ref()
        .expect("string return");
    assert_eq!(ret.companions.len(), 1);
    assert_eq!(ret.companions[0].name, "returnValueDeletionBehaviour");
}

#[test]
fn enum_extracted_and_registered() {
    let color = GEO.enum_unit("Color").expect("Color enum");
    let names: Vec<&str> = color.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["COLOR_RED", "COLOR_GREEN", "COLOR_BLUE"]);

    let paint = GEO.function("geo_paint").expect("geo_paint");
    let sig = paint.method.java_method.to_string();
    assert!(sig.contains("MagicConstant"), "enum parameter not annotated: {sig}");
}

#[test]
fn struct_wrappers_and_layout() {
    let point = GEO.struct_unit("Point").expect("Point");
    let layout = point.layout.as_ref().expect("Point has layout metadata");
    let arrangements: Vec<&str> = layout.fields.iter().map(|f| f.arrangement.as_str()).collect();
    assert_eq!(
        arrangements,
        vec![
            "$structArranger.addFixedField(4)",
            "$structArranger.addFixedField(4)"
        ]
    );

    let line = GEO.struct_unit("Line").expect("Line");
    assert!(line.layout.is_none(), "layout is opt-in per struct");
    let getters: Vec<&str> = line
        .accessors
        .iter()
        .map(|a| a.getter.java_method.name.as_str())
        .collect();
    assert_eq!(getters, vec!["getStart", "getEnd", "getLabel", "isVisible"]);
}

#[test]
fn run_writes_the_plan() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("geo.plan");
    let written = bnd_jni::run(&fixture(), Some(&output)).expect("run");
    assert_eq!(written, output);

    let plan = std::fs::read_to_string(&output).expect("read plan");
    assert!(
        plan.contains("Java_com_example_geo_Geo_geo_1addRaw"),
        "plan is missing the geo_add glue:\n{plan}"
    );
}
