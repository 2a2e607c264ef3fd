//! Java naming rules and JNI symbol mangling.

use crate::java::JavaType;
use crate::names;

const JAVA_KEYWORDS: &[&str] = &[
    "abstract",
    "assert",
    "boolean",
    "break",
    "byte",
    "case",
    "catch",
    "char",
    "class",
    "const",
    "continue",
    "default",
    "do",
    "double",
    "else",
    "enum",
    "extends",
    "false",
    "final",
    "finally",
    "float",
    "for",
    "goto",
    "if",
    "implements",
    "import",
    "instanceof",
    "int",
    "interface",
    "long",
    "native",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "short",
    "static",
    "strictfp",
    "super",
    "switch",
    "synchronized",
    "this",
    "throw",
    "throws",
    "transient",
    "true",
    "try",
    "void",
    "volatile",
    "while",
];

/// Make `name` usable as a Java identifier: reserved words get a trailing
/// underscore, a leading `@` is dropped.
pub fn escape_name(name: &str) -> String {
    let name = name.strip_prefix('@').unwrap_or(name);
    if JAVA_KEYWORDS.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Getter name for a field; `is` prefix for boolean-typed fields.
///
/// `type_spelling` may be a native or Java spelling. A getter that would
/// clash with the wrapper's own `getHandle()` is renamed.
pub fn getter(name: &str, type_spelling: &str) -> String {
    let prefix = match type_spelling {
        "bool" | "_Bool" | "jboolean" | "boolean" => "is",
        _ => "get",
    };
    let getter = format!("{prefix}{}", upper_first(name));
    if getter == "getHandle" {
        "getHandleField".to_string()
    } else {
        getter
    }
}

pub fn setter(name: &str) -> String {
    format!("set{}", upper_first(name))
}

/// `fieldName` / `field_name` -> `FIELD_NAME`.
pub fn screaming_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        out.extend(c.to_uppercase());
    }
    out
}

/// `com.example.lib` -> `com_example_lib` (C++ namespace-safe).
pub fn c_package_name(package: &str) -> String {
    package.replace('.', "_")
}

/// `com.example.lib` -> `com/example/lib`.
pub fn jni_package_name(package: &str) -> String {
    package.replace('.', "/")
}

/// Escape one component of a JNI short name.
pub fn mangle_jni_component(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '/' | '.' => out.push('_'),
            '_' => out.push_str("_1"),
            ';' => out.push_str("_2"),
            '[' => out.push_str("_3"),
            c if c.is_ascii_alphanumeric() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("_0{unit:04x}"));
                }
            }
        }
    }
    out
}

/// Exported symbol of the glue function backing `method` on `class`.
pub fn jni_proxy_method_name(class: &JavaType, method: &str) -> String {
    let class_name = class.jni_class_name().unwrap_or_default();
    format!(
        "Java_{}_{}",
        mangle_jni_component(&class_name),
        mangle_jni_component(method)
    )
}

/// Spell a string as a character-pack template argument list, the form
/// the runtime's cached class and method lookups are keyed by.
pub fn template_string(value: &str) -> String {
    let chars: Vec<String> = value
        .chars()
        .map(|c| match c {
            '\'' => "'\\''".to_string(),
            '\\' => "'\\\\'".to_string(),
            c => format!("'{c}'"),
        })
        .collect();
    format!("{}<{}>", names::runtime("TemplateString"), chars.join(", "))
}
