//! Attribute tables for the built-in `str`, `list`, `int` and iterator values.
//!
//! Callable members come back already bound to the receiver, so a delegated
//! `upper` behaves exactly like `"hello".upper`.

use crate::core::error::DelegateError;
use crate::core::value::{Args, Function, Value};

pub fn lookup(receiver: &Value, name: &str) -> Option<Value> {
    match receiver {
        Value::Str(_) => str_member(name),
        Value::List(_) => list_member(name),
        Value::Int(n) => {
            if name == "real" {
                return Some(Value::Int(*n));
            }
            int_member(name)
        }
        Value::Iter(_) if name == "__iter__" => native(name, |this, args| {
            args.expect_at_most("__iter__", 0)?;
            Ok(this.clone())
        }),
        _ => None,
    }
    .map(|member| match member {
        Value::Function(func) => Value::Method(func.bind(receiver.clone())),
        other => other,
    })
}

fn native<F>(name: &str, body: F) -> Option<Value>
where
    F: Fn(&Value, Args) -> Result<Value, DelegateError> + 'static,
{
    Some(Value::Function(Function::new(name, body)))
}

fn receiver_str(this: &Value) -> Result<&str, DelegateError> {
    this.as_str()
        .ok_or_else(|| DelegateError::TypeError(format!("expected 'str', got '{}'", this.type_name())))
}

fn str_arg<'a>(args: &'a Args, idx: usize, name: &str) -> Result<&'a str, DelegateError> {
    let value = args.required(idx, name)?;
    value.as_str().ok_or_else(|| {
        DelegateError::TypeError(format!(
            "argument '{name}' must be str, not {}",
            value.type_name()
        ))
    })
}

fn str_member(name: &str) -> Option<Value> {
    match name {
        "upper" => native(name, |this, args| {
            args.expect_at_most("upper", 0)?;
            Ok(Value::str(receiver_str(this)?.to_uppercase()))
        }),
        "lower" => native(name, |this, args| {
            args.expect_at_most("lower", 0)?;
            Ok(Value::str(receiver_str(this)?.to_lowercase()))
        }),
        "strip" => native(name, |this, args| {
            args.expect_at_most("strip", 0)?;
            Ok(Value::str(receiver_str(this)?.trim()))
        }),
        "startswith" => native(name, |this, args| {
            args.expect_at_most("startswith", 1)?;
            let prefix = str_arg(&args, 0, "prefix")?;
            Ok(Value::Bool(receiver_str(this)?.starts_with(prefix)))
        }),
        "endswith" => native(name, |this, args| {
            args.expect_at_most("endswith", 1)?;
            let suffix = str_arg(&args, 0, "suffix")?;
            Ok(Value::Bool(receiver_str(this)?.ends_with(suffix)))
        }),
        "replace" => native(name, |this, args| {
            args.expect_at_most("replace", 2)?;
            let old = str_arg(&args, 0, "old")?;
            let new = str_arg(&args, 1, "new")?;
            Ok(Value::str(receiver_str(this)?.replace(old, new)))
        }),
        "split" => native(name, |this, args| {
            args.expect_at_most("split", 1)?;
            let s = receiver_str(this)?;
            let parts = match args.get(0, "sep") {
                None | Some(Value::None) => s.split_whitespace().map(Value::from).collect(),
                Some(Value::Str(sep)) if sep.is_empty() => {
                    return Err(DelegateError::TypeError("empty separator".to_string()));
                }
                Some(Value::Str(sep)) => s.split(sep.as_str()).map(Value::from).collect(),
                Some(other) => {
                    return Err(DelegateError::TypeError(format!(
                        "must be str or None, not {}",
                        other.type_name()
                    )));
                }
            };
            Ok(Value::list(parts))
        }),
        "__len__" => native(name, |this, args| {
            args.expect_at_most("__len__", 0)?;
            Ok(Value::Int(receiver_str(this)?.chars().count() as i64))
        }),
        "__iter__" => native(name, |this, args| {
            args.expect_at_most("__iter__", 0)?;
            let chars = receiver_str(this)?
                .chars()
                .map(|c| Value::Str(c.to_string()))
                .collect();
            Ok(Value::iterator(chars))
        }),
        "__contains__" => native(name, |this, args| {
            args.expect_at_most("__contains__", 1)?;
            let needle = str_arg(&args, 0, "key")?;
            Ok(Value::Bool(receiver_str(this)?.contains(needle)))
        }),
        _ => None,
    }
}

fn with_list<R>(this: &Value, f: impl FnOnce(&mut Vec<Value>) -> R) -> Result<R, DelegateError> {
    match this {
        Value::List(items) => Ok(f(&mut items.borrow_mut())),
        other => Err(DelegateError::TypeError(format!(
            "expected 'list', got '{}'",
            other.type_name()
        ))),
    }
}

fn read_list<R>(this: &Value, f: impl FnOnce(&[Value]) -> R) -> Result<R, DelegateError> {
    match this {
        Value::List(items) => Ok(f(&items.borrow())),
        other => Err(DelegateError::TypeError(format!(
            "expected 'list', got '{}'",
            other.type_name()
        ))),
    }
}

fn list_member(name: &str) -> Option<Value> {
    match name {
        "append" => native(name, |this, args| {
            args.expect_at_most("append", 1)?;
            let item = args.required(0, "object")?.clone();
            with_list(this, |items| items.push(item))?;
            Ok(Value::None)
        }),
        "pop" => native(name, |this, args| {
            args.expect_at_most("pop", 0)?;
            with_list(this, |items| items.pop())?
                .ok_or_else(|| DelegateError::IndexError("pop from empty list".to_string()))
        }),
        "count" => native(name, |this, args| {
            args.expect_at_most("count", 1)?;
            let item = args.required(0, "value")?;
            let n = read_list(this, |items| items.iter().filter(|v| *v == item).count())?;
            Ok(Value::Int(n as i64))
        }),
        "index" => native(name, |this, args| {
            args.expect_at_most("index", 1)?;
            let item = args.required(0, "value")?;
            read_list(this, |items| items.iter().position(|v| v == item))?
                .map(|idx| Value::Int(idx as i64))
                .ok_or_else(|| DelegateError::ValueError(format!("{item} is not in list")))
        }),
        "__len__" => native(name, |this, args| {
            args.expect_at_most("__len__", 0)?;
            Ok(Value::Int(read_list(this, |items| items.len())? as i64))
        }),
        "__iter__" => native(name, |this, args| {
            args.expect_at_most("__iter__", 0)?;
            Ok(Value::iterator(read_list(this, |items| items.to_vec())?))
        }),
        "__contains__" => native(name, |this, args| {
            args.expect_at_most("__contains__", 1)?;
            let item = args.required(0, "key")?;
            Ok(Value::Bool(read_list(this, |items| items.contains(item))?))
        }),
        _ => None,
    }
}

fn int_member(name: &str) -> Option<Value> {
    match name {
        "bit_length" => native(name, |this, args| {
            args.expect_at_most("bit_length", 0)?;
            let n = this.as_int().unwrap_or_default();
            Ok(Value::Int(i64::from(64 - n.unsigned_abs().leading_zeros())))
        }),
        _ => None,
    }
}
