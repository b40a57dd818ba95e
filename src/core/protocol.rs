//! Implicit protocol dispatch: `len(x)`, `iter(x)`, `item in x`, `x(...)`.
//!
//! Hooks are resolved on the class (see [`Instance::special`]), so a
//! delegator bound as `__len__` or `__iter__` serves the operator just like
//! a method would. Setting `__len__` on an instance has no effect here.

use crate::core::error::DelegateError;
use crate::core::object::Instance;
use crate::core::value::{Args, IterRef, Value};

/// Iterator over a dynamic iterable. Clones of the underlying [`IterRef`]
/// share the cursor.
pub struct ValueIter(IterRef);

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        self.0.0.borrow_mut().next()
    }
}

pub fn len(value: &Value) -> Result<usize, DelegateError> {
    match value {
        Value::Str(s) => Ok(s.chars().count()),
        Value::List(items) => Ok(items.borrow().len()),
        Value::Instance(inst) => {
            let hook = inst.special("__len__")?.ok_or_else(|| no_len(value))?;
            let result = hook.call(Args::new())?;
            let n = result.as_int().ok_or_else(|| {
                DelegateError::TypeError(format!(
                    "'{}' object cannot be interpreted as an integer",
                    result.type_name()
                ))
            })?;
            usize::try_from(n)
                .map_err(|_| DelegateError::TypeError("__len__() should return >= 0".to_string()))
        }
        other => Err(no_len(other)),
    }
}

fn no_len(value: &Value) -> DelegateError {
    DelegateError::TypeError(format!("object of type '{}' has no len()", value.type_name()))
}

pub fn iter(value: &Value) -> Result<ValueIter, DelegateError> {
    match value {
        Value::Iter(it) => Ok(ValueIter(it.clone())),
        Value::Str(_) | Value::List(_) => iter(&value.call_method("__iter__", Args::new())?),
        Value::Instance(inst) => iter_instance(inst),
        other => Err(not_iterable(other)),
    }
}

fn iter_instance(inst: &Instance) -> Result<ValueIter, DelegateError> {
    let hook = inst
        .special("__iter__")?
        .ok_or_else(|| not_iterable(&inst.to_value()))?;
    match hook.call(Args::new())? {
        Value::Iter(it) => Ok(ValueIter(it)),
        other => Err(DelegateError::TypeError(format!(
            "iter() returned non-iterator of type '{}'",
            other.type_name()
        ))),
    }
}

fn not_iterable(value: &Value) -> DelegateError {
    DelegateError::TypeError(format!("'{}' object is not iterable", value.type_name()))
}

/// Membership test. Falls back to iteration when the class has no
/// `__contains__` hook.
pub fn contains(container: &Value, item: &Value) -> Result<bool, DelegateError> {
    match container {
        Value::Str(s) => match item {
            Value::Str(needle) => Ok(s.contains(needle.as_str())),
            other => Err(DelegateError::TypeError(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::List(items) => Ok(items.borrow().contains(item)),
        Value::Instance(inst) => match inst.special("__contains__")? {
            Some(hook) => Ok(hook.call(Args::positional(vec![item.clone()]))?.is_truthy()),
            None if inst.class().has_attr("__iter__") => {
                Ok(iter_instance(inst)?.any(|v| v == *item))
            }
            None => Err(DelegateError::TypeError(format!(
                "argument of type '{}' is not iterable",
                inst.type_name()
            ))),
        },
        Value::Iter(it) => Ok(ValueIter(it.clone()).any(|v| v == *item)),
        other => Err(DelegateError::TypeError(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

pub fn call(callee: &Value, args: Args) -> Result<Value, DelegateError> {
    callee.call(args)
}
