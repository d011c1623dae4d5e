//! Object graph → JSON, guided by the same rules that bind it.

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use log::trace;

use crate::error::{BindError, BindErrorKind, Result};
use crate::reflect::{Bind, Instance};
use crate::rule::{Emit, RuleSet};
use crate::value::{Number, Value};

/// Turn `root` back into the JSON value tree its rules describe.
///
/// Every rule contributes the member it would have read: field rules the
/// slot's value, construction rules the child object (or `null`, or an array
/// of children for `[]` paths). Rules that reach into an array without
/// constructing its elements cannot be reversed and are left out.
pub fn serialize(root: &dyn Instance, rules: &RuleSet) -> Result<Value<'static>> {
    let target = rules
        .root()
        .ok_or_else(|| BindError::without_span(BindErrorKind::MissingRootRule))?;
    if <dyn Any>::type_id(root.as_any()) != target.type_id() {
        return Err(BindError::without_span(BindErrorKind::RootTypeMismatch {
            requested: root.shape().type_identifier,
            bound: target.type_identifier(),
        }));
    }
    Ok(emit_object(root, "", rules))
}

fn emit_object(instance: &dyn Instance, path: &str, rules: &RuleSet) -> Value<'static> {
    let mut object = Value::Object(Vec::new());
    for emit in rules.emitters(path) {
        match emit {
            Emit::Field { keys, field } => {
                let Some(value) = instance.slot(field).and_then(|slot| slot.to_value()) else {
                    trace!("field `{field}` has no JSON form, skipping");
                    continue;
                };
                place(&mut object, keys, value);
            }
            Emit::Child { keys, field, path } => {
                let Some(slot) = instance.slot(field) else {
                    continue;
                };
                let children = slot.children();
                let value = if slot.kind().is_sequence() {
                    Value::Array(
                        children
                            .into_iter()
                            .map(|child| emit_object(child, path, rules))
                            .collect(),
                    )
                } else {
                    match children.first() {
                        Some(child) => emit_object(*child, path, rules),
                        None => Value::Null,
                    }
                };
                place(&mut object, keys, value);
            }
        }
    }
    object
}

/// Store `value` at `keys` below `target`, creating objects on the way.
/// With no keys the value replaces `target` itself.
fn place(target: &mut Value<'static>, keys: &[String], value: Value<'static>) {
    let Some((key, rest)) = keys.split_first() else {
        *target = value;
        return;
    };
    if !matches!(target, Value::Object(_)) {
        *target = Value::Object(Vec::new());
    }
    let Value::Object(members) = target else {
        return;
    };
    let index = match members.iter().rposition(|(k, _)| k == key) {
        Some(index) => index,
        None => {
            members.push((Cow::Owned(key.clone()), Value::Object(Vec::new())));
            members.len() - 1
        }
    };
    place(&mut members[index].1, rest, value);
}

/// Serializes a bindable value to a JSON string.
pub fn to_string<T: Bind>(value: &T, rules: &RuleSet) -> Result<String> {
    let mut s = Vec::new();
    to_writer(value, rules, &mut s)?;
    Ok(into_string(s))
}

/// Serializes a bindable value to a pretty-printed JSON string.
pub fn to_string_pretty<T: Bind>(value: &T, rules: &RuleSet) -> Result<String> {
    let mut s = Vec::new();
    to_writer_pretty(value, rules, &mut s)?;
    Ok(into_string(s))
}

/// Serializes an instance to JSON and writes it to the given writer.
pub fn to_writer<W: crate::JsonWrite>(
    root: &dyn Instance,
    rules: &RuleSet,
    mut writer: W,
) -> Result<()> {
    let value = serialize(root, rules)?;
    write_value(&value, &mut writer, None, 0);
    Ok(())
}

/// Serializes an instance to pretty-printed JSON and writes it to the given writer.
pub fn to_writer_pretty<W: crate::JsonWrite>(
    root: &dyn Instance,
    rules: &RuleSet,
    mut writer: W,
) -> Result<()> {
    let value = serialize(root, rules)?;
    write_value(&value, &mut writer, Some("  "), 0);
    Ok(())
}

fn into_string(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

/// Write indentation for pretty printing
fn write_indent<W: crate::JsonWrite>(writer: &mut W, indent: Option<&str>, depth: usize) {
    if let Some(indent_str) = indent {
        for _ in 0..depth {
            writer.write(indent_str.as_bytes());
        }
    }
}

/// Write a newline for pretty printing
fn write_newline<W: crate::JsonWrite>(writer: &mut W, indent: Option<&str>) {
    if indent.is_some() {
        writer.write(b"\n");
    }
}

/// Write a space after colon for pretty printing
fn write_colon<W: crate::JsonWrite>(writer: &mut W, indent: Option<&str>) {
    if indent.is_some() {
        writer.write(b": ");
    } else {
        writer.write(b":");
    }
}

fn write_value<W: crate::JsonWrite>(
    value: &Value<'_>,
    writer: &mut W,
    indent: Option<&str>,
    depth: usize,
) {
    match value {
        Value::Null => writer.write(b"null"),
        Value::Bool(true) => writer.write(b"true"),
        Value::Bool(false) => writer.write(b"false"),
        Value::Number(Number::U64(v)) => writer.write(itoa::Buffer::new().format(*v).as_bytes()),
        Value::Number(Number::I64(v)) => writer.write(itoa::Buffer::new().format(*v).as_bytes()),
        Value::Number(Number::F64(v)) if v.is_finite() => {
            writer.write(ryu::Buffer::new().format_finite(*v).as_bytes())
        }
        Value::Number(Number::F64(_)) => writer.write(b"null"),
        Value::String(s) => crate::write_json_string(writer, s),
        Value::Array(items) => {
            writer.write(b"[");
            let mut first = true;
            for item in items {
                if !first {
                    writer.write(b",");
                }
                first = false;
                write_newline(writer, indent);
                write_indent(writer, indent, depth + 1);
                write_value(item, writer, indent, depth + 1);
            }
            if !first {
                write_newline(writer, indent);
                write_indent(writer, indent, depth);
            }
            writer.write(b"]");
        }
        Value::Object(members) => {
            writer.write(b"{");
            let mut first = true;
            for (key, item) in members {
                if !first {
                    writer.write(b",");
                }
                first = false;
                write_newline(writer, indent);
                write_indent(writer, indent, depth + 1);
                crate::write_json_string(writer, key);
                write_colon(writer, indent);
                write_value(item, writer, indent, depth + 1);
            }
            if !first {
                write_newline(writer, indent);
                write_indent(writer, indent, depth);
            }
            writer.write(b"}");
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = Vec::new();
        let indent = if f.alternate() { Some("  ") } else { None };
        write_value(self, &mut s, indent, 0);
        f.write_str(&into_string(s))
    }
}
