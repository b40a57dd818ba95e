//! Classes and instances.
//!
//! A [`Class`] owns an ordered attribute table; an [`Instance`] owns a
//! dictionary and a handle to its class. Lookup on an instance follows the
//! descriptor precedence of the object model being emulated:
//!
//! 1. data descriptors on the class (delegators, properties)
//! 2. the instance dictionary
//! 3. plain class attributes (methods are bound to the instance)
//!
//! Implicit protocol hooks (`__len__`, `__iter__`, ...) go through
//! [`Instance::special`], which consults the class only.

use crate::core::error::DelegateError;
use crate::core::value::{Args, Function, Value};
use crate::delegation::{Decorator, Delegator};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::ptr;
use std::rc::Rc;

/// Entry in a class attribute table.
#[derive(Clone, Debug)]
pub enum ClassAttr {
    Method(Function),
    Property(Property),
    Delegator(Rc<Delegator>),
    Value(Value),
}

impl From<Value> for ClassAttr {
    fn from(value: Value) -> Self {
        match value {
            Value::Function(func) => ClassAttr::Method(func),
            Value::Property(prop) => ClassAttr::Property(prop),
            Value::Delegator(delegator) => ClassAttr::Delegator(delegator),
            other => ClassAttr::Value(other),
        }
    }
}

impl From<Delegator> for ClassAttr {
    fn from(delegator: Delegator) -> Self {
        ClassAttr::Delegator(Rc::new(delegator))
    }
}

/// Getter with an optional setter, evaluated against the receiver.
#[derive(Clone, Debug)]
pub struct Property {
    inner: Rc<PropertyInner>,
}

#[derive(Debug)]
struct PropertyInner {
    getter: Function,
    setter: Option<Function>,
}

impl Property {
    pub fn new(getter: Function, setter: Option<Function>) -> Self {
        Self {
            inner: Rc::new(PropertyInner { getter, setter }),
        }
    }

    pub fn get(&self, receiver: &Value) -> Result<Value, DelegateError> {
        self.inner.getter.invoke(receiver, Args::new())
    }

    pub fn is_settable(&self) -> bool {
        self.inner.setter.is_some()
    }

    /// Runs the setter. `Ok(false)` means the property is read-only.
    pub fn set(&self, receiver: &Value, value: Value) -> Result<bool, DelegateError> {
        match &self.inner.setter {
            Some(setter) => {
                setter.invoke(receiver, Args::positional(vec![value]))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn ptr_eq(&self, other: &Property) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

struct ClassInner {
    name: String,
    attrs: RefCell<Vec<(String, ClassAttr)>>,
}

/// Shared handle to a class. Clones refer to the same class object.
#[derive(Clone)]
pub struct Class {
    inner: Rc<ClassInner>,
}

impl Class {
    pub fn builder(name: &str) -> ClassBuilder {
        ClassBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn ptr_eq(&self, other: &Class) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Binds `name` in the attribute table. Rebinding keeps the original
    /// position, new names are appended.
    pub fn set_attr(&self, name: &str, attr: ClassAttr) {
        let mut attrs = self.inner.attrs.borrow_mut();
        match attrs.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = attr,
            None => attrs.push((name.to_string(), attr)),
        }
    }

    pub fn remove_attr(&self, name: &str) -> Option<ClassAttr> {
        let mut attrs = self.inner.attrs.borrow_mut();
        let idx = attrs.iter().position(|(key, _)| key == name)?;
        Some(attrs.remove(idx).1)
    }

    pub fn class_attr(&self, name: &str) -> Option<ClassAttr> {
        self.inner
            .attrs
            .borrow()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, attr)| attr.clone())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.inner.attrs.borrow().iter().any(|(key, _)| key == name)
    }

    /// Attribute names in declaration order.
    pub fn attr_names(&self) -> Vec<String> {
        self.inner
            .attrs
            .borrow()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// First attribute name bound to this exact delegator object.
    pub fn binding_of(&self, delegator: &Delegator) -> Option<String> {
        self.inner
            .attrs
            .borrow()
            .iter()
            .find(|(_, attr)| {
                matches!(attr, ClassAttr::Delegator(bound) if ptr::eq(bound.as_ref(), delegator))
            })
            .map(|(key, _)| key.clone())
    }

    /// Class-level access. Delegators come back as themselves, unresolved.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let attr = self.class_attr(name)?;
        Some(match attr {
            ClassAttr::Method(func) => Value::Function(func),
            ClassAttr::Property(prop) => Value::Property(prop),
            ClassAttr::Delegator(delegator) => Value::Delegator(delegator),
            ClassAttr::Value(value) => value,
        })
    }

    pub fn getattr(&self, name: &str) -> Result<Value, DelegateError> {
        self.lookup(name)
            .ok_or_else(|| DelegateError::NoClassAttribute {
                class: self.name().to_string(),
                attr: name.to_string(),
            })
    }

    /// Creates an instance and runs `__init__` with `args` when the class has one.
    pub fn instantiate(&self, args: Args) -> Result<Value, DelegateError> {
        let instance = Value::Instance(Instance::new(self));
        if let Some(ClassAttr::Method(init)) = self.class_attr("__init__") {
            init.invoke(&instance, args)?;
        } else if !args.is_empty() {
            return Err(DelegateError::TypeError(format!(
                "{}() takes no arguments",
                self.name()
            )));
        }
        Ok(instance)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.inner.name)
            .field("attrs", &self.attr_names())
            .finish()
    }
}

/// Assembles a class body, then applies queued decorators once the body is
/// complete. The first queued decorator is applied first (innermost).
pub struct ClassBuilder {
    name: String,
    attrs: Vec<(String, ClassAttr)>,
    decorators: Vec<Decorator>,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
            decorators: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, attr: impl Into<ClassAttr>) -> Self {
        let attr = attr.into();
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = attr,
            None => self.attrs.push((name.to_string(), attr)),
        }
        self
    }

    pub fn value(self, name: &str, value: Value) -> Self {
        self.attr(name, ClassAttr::Value(value))
    }

    pub fn method<F>(self, name: &str, body: F) -> Self
    where
        F: Fn(&Value, Args) -> Result<Value, DelegateError> + 'static,
    {
        self.attr(name, ClassAttr::Method(Function::new(name, body)))
    }

    pub fn init<F>(self, body: F) -> Self
    where
        F: Fn(&Value, Args) -> Result<Value, DelegateError> + 'static,
    {
        self.method("__init__", body)
    }

    pub fn property<G>(self, name: &str, getter: G, setter: Option<Function>) -> Self
    where
        G: Fn(&Value, Args) -> Result<Value, DelegateError> + 'static,
    {
        let prop = Property::new(Function::new(name, getter), setter);
        self.attr(name, ClassAttr::Property(prop))
    }

    pub fn delegator(self, name: &str, delegator: Delegator) -> Self {
        self.attr(name, ClassAttr::Delegator(Rc::new(delegator)))
    }

    pub fn decorated_with(mut self, decorator: Decorator) -> Self {
        self.decorators.push(decorator);
        self
    }

    pub fn build(self) -> Class {
        let class = Class {
            inner: Rc::new(ClassInner {
                name: self.name,
                attrs: RefCell::new(self.attrs),
            }),
        };
        for decorator in &self.decorators {
            decorator.apply(&class);
        }
        class
    }
}

struct InstanceInner {
    class: Class,
    dict: RefCell<FxHashMap<String, Value>>,
}

/// Shared handle to an instance. Clones refer to the same object.
#[derive(Clone)]
pub struct Instance {
    inner: Rc<InstanceInner>,
}

impl Instance {
    pub fn new(class: &Class) -> Self {
        Self {
            inner: Rc::new(InstanceInner {
                class: class.clone(),
                dict: RefCell::new(FxHashMap::default()),
            }),
        }
    }

    pub fn class(&self) -> &Class {
        &self.inner.class
    }

    pub fn type_name(&self) -> &str {
        self.inner.class.name()
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Raw read of the instance dictionary, skipping the class.
    pub fn dict_get(&self, name: &str) -> Option<Value> {
        self.inner.dict.borrow().get(name).cloned()
    }

    /// Raw write to the instance dictionary, skipping descriptors.
    pub fn dict_set(&self, name: &str, value: Value) {
        self.inner.dict.borrow_mut().insert(name.to_string(), value);
    }

    pub fn lookup(&self, name: &str) -> Result<Option<Value>, DelegateError> {
        let class_attr = self.class().class_attr(name);
        match &class_attr {
            Some(ClassAttr::Delegator(delegator)) => return delegator.get(self).map(Some),
            Some(ClassAttr::Property(prop)) => return prop.get(&self.to_value()).map(Some),
            _ => {}
        }
        if let Some(value) = self.dict_get(name) {
            return Ok(Some(value));
        }
        Ok(match class_attr {
            Some(ClassAttr::Method(func)) => Some(Value::Method(func.bind(self.to_value()))),
            Some(ClassAttr::Value(value)) => Some(value),
            _ => None,
        })
    }

    pub fn getattr(&self, name: &str) -> Result<Value, DelegateError> {
        self.lookup(name)?
            .ok_or_else(|| DelegateError::no_attribute(self.type_name(), name))
    }

    pub fn setattr(&self, name: &str, value: Value) -> Result<(), DelegateError> {
        match self.class().class_attr(name) {
            Some(ClassAttr::Delegator(delegator)) => delegator.set(self, value),
            Some(ClassAttr::Property(prop)) => {
                if prop.set(&self.to_value(), value)? {
                    Ok(())
                } else {
                    Err(DelegateError::ReadOnly {
                        type_name: self.type_name().to_string(),
                        attr: name.to_string(),
                    })
                }
            }
            _ => {
                self.dict_set(name, value);
                Ok(())
            }
        }
    }

    pub fn call_method(&self, name: &str, args: Args) -> Result<Value, DelegateError> {
        self.getattr(name)?.call(args)
    }

    /// Protocol-hook lookup: the class table only, never the instance dictionary.
    pub fn special(&self, name: &str) -> Result<Option<Value>, DelegateError> {
        Ok(match self.class().class_attr(name) {
            Some(ClassAttr::Delegator(delegator)) => Some(delegator.get(self)?),
            Some(ClassAttr::Method(func)) => Some(Value::Method(func.bind(self.to_value()))),
            Some(ClassAttr::Property(prop)) => Some(prop.get(&self.to_value())?),
            Some(ClassAttr::Value(value)) => Some(value),
            None => None,
        })
    }

    pub fn to_value(&self) -> Value {
        Value::Instance(self.clone())
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.inner.dict.borrow().keys().cloned().collect();
        keys.sort();
        f.debug_struct("Instance")
            .field("class", &self.type_name())
            .field("attrs", &keys)
            .finish()
    }
}
