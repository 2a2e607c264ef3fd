//! Human-readable dump of a generation run: every unit's signatures and
//! transition sequences. Used for the plan file and for debugging; this is
//! not Java or C++ source.

use std::fmt::{self, Display, Formatter, Write};

use crate::generate::{EnumUnit, GenerationOutput, StructUnit};
use crate::transition::GeneratedExpression;
use crate::unit::{
    Binding, Completion, DownstreamMethodUnit, FunctionPointerUnit, TransitionSequence,
    UpstreamMethodUnit,
};

const INDENT: &str = "    ";

fn write_expression(f: &mut Formatter<'_>, expr: &GeneratedExpression, depth: usize) -> fmt::Result {
    match expr {
        GeneratedExpression::Literal(s) => f.write_str(s),
        GeneratedExpression::Closure(closure) => {
            let params: Vec<String> = closure
                .params
                .iter()
                .map(|(ty, name)| format!("{ty} {name}"))
                .collect();
            writeln!(f, "[&]({}) -> {} {{", params.join(", "), closure.return_type)?;
            write_sequence(f, &closure.body, depth + 1)?;
            write!(f, "{}}}", INDENT.repeat(depth))
        }
    }
}

fn write_binding(f: &mut Formatter<'_>, binding: &Binding, depth: usize) -> fmt::Result {
    f.write_str(&INDENT.repeat(depth))?;
    match &binding.ty {
        Some(ty) => write!(f, "{ty} {} = ", binding.name)?,
        None => write!(f, "auto&& {} = ", binding.name)?,
    }
    write_expression(f, &binding.value, depth)?;
    f.write_str(";\n")
}

fn write_sequence(f: &mut Formatter<'_>, seq: &TransitionSequence, depth: usize) -> fmt::Result {
    for binding in &seq.bindings {
        write_binding(f, binding, depth)?;
    }
    match &seq.completion {
        Completion::Statement(run) => writeln!(f, "{}{run};", INDENT.repeat(depth)),
        Completion::Return { capture, value } => {
            if let Some(capture) = capture {
                write_binding(f, capture, depth)?;
            }
            write!(f, "{}return ", INDENT.repeat(depth))?;
            write_expression(f, value, depth)?;
            f.write_str(";\n")
        }
    }
}

impl Display for TransitionSequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_sequence(f, self, 1)
    }
}

impl Display for GeneratedExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_expression(f, self, 0)
    }
}

impl Display for DownstreamMethodUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", self.java_method)?;
        write!(f, "{}", self.java_body)?;
        writeln!(f, "}}")?;
        writeln!(f, "{};", self.raw_method)?;
        writeln!(f, "{} {{", self.glue_method)?;
        write!(f, "{}", self.glue_body)?;
        writeln!(f, "}}")
    }
}

impl Display for UpstreamMethodUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{};", self.callback_method)?;
        writeln!(f, "{} {{", self.caller_method)?;
        write!(f, "{}", self.java_body)?;
        writeln!(f, "}}")?;
        writeln!(f, "{} {{", self.native_lambda)?;
        write!(f, "{}", self.native_body)?;
        writeln!(f, "}}")
    }
}

impl Display for FunctionPointerUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "interface {} {{", self.interface_type)?;
        write!(f, "{}", self.method)?;
        writeln!(f, "}}")
    }
}

impl Display for EnumUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "class {} {{ // {}", self.java_name, self.native_name)?;
        for field in &self.fields {
            writeln!(
                f,
                "{INDENT}public static final {} {} = {};",
                field.ty, field.name, field.value
            )?;
        }
        writeln!(f, "}}")
    }
}

impl Display for StructUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "class {} {{ // {}", self.java_type, self.native_name)?;
        if let Some(layout) = &self.layout {
            for field in &layout.fields {
                writeln!(
                    f,
                    "{INDENT}public static final long {}; // {}",
                    field.offset_field, field.arrangement
                )?;
            }
            writeln!(f, "{INDENT}public static final long {};", layout.size_field)?;
            writeln!(f, "{INDENT}public static final Layout {};", layout.layout_field)?;
        }
        for accessor in &self.accessors {
            let mut body = String::new();
            write!(body, "{}{}", accessor.getter, accessor.setter)?;
            for line in body.lines() {
                writeln!(f, "{INDENT}{line}")?;
            }
        }
        writeln!(f, "}}")
    }
}

impl Display for GenerationOutput {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for unit in &self.enums {
            writeln!(f, "{unit}")?;
        }
        for unit in &self.structs {
            writeln!(f, "{unit}")?;
        }
        for callback in self.callbacks() {
            writeln!(f, "{callback}")?;
        }
        for unit in &self.functions {
            writeln!(f, "// {}", unit.native_name)?;
            writeln!(f, "{}", unit.method)?;
        }
        for skipped in &self.skipped {
            writeln!(f, "// skipped {} {}: {}", skipped.kind, skipped.name, skipped.reason)?;
        }
        Ok(())
    }
}
