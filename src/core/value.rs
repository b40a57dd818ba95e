//! Dynamic values flowing through the object model.
//!
//! Scalars compare by value, objects (instances, classes, functions,
//! delegators) compare by identity. `Display` renders a repr-style string
//! (`'FOO'`, `[2, 4, 6]`, `<Foo object>`) used by the CLI and by error output.

use crate::core::builtins;
use crate::core::error::DelegateError;
use crate::core::object::{Class, Instance, Property};
use crate::delegation::Delegator;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Native callable body. The first parameter is the receiver (`self`).
pub type NativeFn = dyn Fn(&Value, Args) -> Result<Value, DelegateError>;

#[derive(Clone, Debug)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Rc<RefCell<Vec<Value>>>),
    Iter(IterRef),
    Instance(Instance),
    Class(Class),
    Function(Function),
    Method(BoundMethod),
    Property(Property),
    Delegator(Rc<Delegator>),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    /// Wraps `items` in a one-shot iterator value, the shape `__iter__` hooks return.
    pub fn iterator(items: Vec<Value>) -> Self {
        Value::Iter(IterRef(Rc::new(RefCell::new(items.into_iter()))))
    }

    pub fn type_name(&self) -> String {
        match self {
            Value::None => "NoneType".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Iter(_) => "iterator".to_string(),
            Value::Instance(inst) => inst.type_name().to_string(),
            Value::Class(_) => "type".to_string(),
            Value::Function(_) => "function".to_string(),
            Value::Method(_) => "method".to_string(),
            Value::Property(_) => "property".to_string(),
            Value::Delegator(_) => "Delegator".to_string(),
        }
    }

    pub fn is_callable(&self) -> bool {
        match self {
            Value::Function(_) | Value::Method(_) | Value::Class(_) => true,
            Value::Instance(inst) => inst.class().has_attr("__call__"),
            _ => false,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(inst) => Some(inst),
            _ => None,
        }
    }

    /// Attribute lookup that distinguishes "absent" (`Ok(None)`) from a
    /// failure raised while computing the attribute (`Err`).
    pub fn lookup(&self, name: &str) -> Result<Option<Value>, DelegateError> {
        match self {
            Value::Instance(inst) => inst.lookup(name),
            Value::Class(class) => Ok(class.lookup(name)),
            other => Ok(builtins::lookup(other, name)),
        }
    }

    pub fn getattr(&self, name: &str) -> Result<Value, DelegateError> {
        if let Value::Class(class) = self {
            return class.getattr(name);
        }
        self.lookup(name)?
            .ok_or_else(|| DelegateError::no_attribute(self.type_name(), name))
    }

    pub fn setattr(&self, name: &str, value: Value) -> Result<(), DelegateError> {
        match self {
            Value::Instance(inst) => inst.setattr(name, value),
            Value::Class(class) => {
                class.set_attr(name, value.into());
                Ok(())
            }
            other => match builtins::lookup(other, name) {
                Some(_) => Err(DelegateError::ReadOnly {
                    type_name: other.type_name(),
                    attr: name.to_string(),
                }),
                None => Err(DelegateError::no_attribute(other.type_name(), name)),
            },
        }
    }

    pub fn call(&self, args: Args) -> Result<Value, DelegateError> {
        match self {
            Value::Method(method) => method.call(args),
            Value::Function(func) => {
                let mut args = args;
                if args.positional.is_empty() {
                    return Err(DelegateError::TypeError(format!(
                        "{}() missing required argument: 'self'",
                        func.name()
                    )));
                }
                let receiver = args.positional.remove(0);
                func.invoke(&receiver, args)
            }
            Value::Class(class) => class.instantiate(args),
            Value::Instance(inst) => match inst.special("__call__")? {
                Some(hook) => hook.call(args),
                None => Err(DelegateError::NotCallable {
                    type_name: inst.type_name().to_string(),
                }),
            },
            other => Err(DelegateError::NotCallable {
                type_name: other.type_name(),
            }),
        }
    }

    pub fn call_method(&self, name: &str, args: Args) -> Result<Value, DelegateError> {
        self.getattr(name)?.call(args)
    }
}

type ListPtr = *const RefCell<Vec<Value>>;

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.eq_tracked(other, &mut Vec::new())
    }
}

impl Value {
    /// `active` holds the list pairs currently being compared. Meeting one
    /// again means both sides recurse the same way, so the pair counts as equal.
    fn eq_tracked(&self, other: &Value, active: &mut Vec<(ListPtr, ListPtr)>) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Int(b)) | (Value::Int(b), Value::Bool(a)) => {
                i64::from(*a) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a), Rc::as_ptr(b));
                if active.contains(&pair) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                if a.len() != b.len() {
                    return false;
                }
                active.push(pair);
                let equal = a.iter().zip(b.iter()).all(|(x, y)| x.eq_tracked(y, active));
                active.pop();
                equal
            }
            (Value::Iter(a), Value::Iter(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Instance(a), Value::Instance(b)) => a.ptr_eq(b),
            (Value::Class(a), Value::Class(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Method(a), Value::Method(b)) => {
                a.func.ptr_eq(&b.func) && a.receiver.eq_tracked(&b.receiver, active)
            }
            (Value::Property(a), Value::Property(b)) => a.ptr_eq(b),
            (Value::Delegator(a), Value::Delegator(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Lists already on the `open` path render as `[...]`.
    fn fmt_tracked(&self, f: &mut fmt::Formatter<'_>, open: &mut Vec<ListPtr>) -> fmt::Result {
        match self {
            Value::List(items) => {
                let ptr = Rc::as_ptr(items);
                if open.contains(&ptr) {
                    return write!(f, "[...]");
                }
                open.push(ptr);
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_tracked(f, open)?;
                }
                open.pop();
                write!(f, "]")
            }
            Value::Method(method) => {
                write!(f, "<bound method {} of ", method.func.name())?;
                method.receiver.fmt_tracked(f, open)?;
                write!(f, ">")
            }
            other => write!(f, "{other}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Instance> for Value {
    fn from(inst: Instance) -> Self {
        Value::Instance(inst)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Value::List(_) | Value::Method(_) => self.fmt_tracked(f, &mut Vec::new()),
            Value::Iter(_) => write!(f, "<iterator>"),
            Value::Instance(inst) => write!(f, "<{} object>", inst.type_name()),
            Value::Class(class) => write!(f, "<class '{}'>", class.name()),
            Value::Function(func) => write!(f, "<function {}>", func.name()),
            Value::Property(_) => write!(f, "<property>"),
            Value::Delegator(delegator) => write!(f, "{delegator}"),
        }
    }
}

/// Call arguments. Positional and keyword arguments travel together so a
/// forwarding layer can hand them on without looking inside.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args {
    pub positional: Vec<Value>,
    pub keyword: BTreeMap<String, Value>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(values: Vec<Value>) -> Self {
        Self {
            positional: values,
            keyword: BTreeMap::new(),
        }
    }

    pub fn with_keyword(mut self, name: impl Into<String>, value: Value) -> Self {
        self.keyword.insert(name.into(), value);
        self
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Positional argument `idx`, or the keyword argument `name`.
    pub fn get(&self, idx: usize, name: &str) -> Option<&Value> {
        self.positional.get(idx).or_else(|| self.keyword.get(name))
    }

    pub fn required(&self, idx: usize, name: &str) -> Result<&Value, DelegateError> {
        self.get(idx, name).ok_or_else(|| {
            DelegateError::TypeError(format!("missing required argument: '{name}'"))
        })
    }

    pub(crate) fn expect_at_most(&self, func: &str, max: usize) -> Result<(), DelegateError> {
        if self.len() > max {
            return Err(DelegateError::TypeError(format!(
                "{func}() takes at most {max} argument(s) ({} given)",
                self.len()
            )));
        }
        Ok(())
    }
}

/// A named native function. Unbound until paired with a receiver in a
/// [`BoundMethod`].
#[derive(Clone)]
pub struct Function {
    name: Rc<str>,
    body: Rc<NativeFn>,
}

impl Function {
    pub fn new<F>(name: &str, body: F) -> Self
    where
        F: Fn(&Value, Args) -> Result<Value, DelegateError> + 'static,
    {
        Self {
            name: Rc::from(name),
            body: Rc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke(&self, receiver: &Value, args: Args) -> Result<Value, DelegateError> {
        (self.body)(receiver, args)
    }

    pub fn bind(&self, receiver: Value) -> BoundMethod {
        BoundMethod {
            receiver: Box::new(receiver),
            func: self.clone(),
        }
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

#[derive(Clone, Debug)]
pub struct BoundMethod {
    receiver: Box<Value>,
    func: Function,
}

impl BoundMethod {
    pub fn receiver(&self) -> &Value {
        &self.receiver
    }

    pub fn function(&self) -> &Function {
        &self.func
    }

    pub fn call(&self, args: Args) -> Result<Value, DelegateError> {
        self.func.invoke(&self.receiver, args)
    }
}

/// Shared handle to a one-shot iterator. Clones advance the same cursor.
#[derive(Clone)]
pub struct IterRef(pub(crate) Rc<RefCell<std::vec::IntoIter<Value>>>);

impl fmt::Debug for IterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<iterator>")
    }
}
