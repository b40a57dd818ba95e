//! The delegator: a class-level attribute that redirects instance access to
//! a member of another attribute held by the same instance.
//!
//! ```text
//! Foo.upper  = Delegator("v", None)      # foo.upper()  -> foo.v.upper()
//! Foo.up     = Delegator("v", "upper")   # foo.up()     -> foo.v.upper()
//! Foo.foo    = Delegator("self", "bar")  # foo.foo()    -> foo.bar()
//! ```
//!
//! When no member is given the delegator finds out which class attribute it
//! is bound under on first access (pointer identity scan of the class table)
//! and uses that name. The result is cached for the delegator's lifetime.

use crate::core::error::DelegateError;
use crate::core::object::{Class, Instance};
use crate::core::value::Value;
use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Host name meaning "the owning instance itself".
pub const SELF_HOST: &str = "self";

#[derive(Debug)]
pub struct Delegator {
    host: String,
    member: OnceCell<String>,
    owner_attr: OnceCell<String>,
    /// Instances this delegator is currently forwarding for, innermost last.
    active: RefCell<Vec<Instance>>,
}

/// Pops the instance pushed by [`Delegator::enter`].
struct ActiveAccess<'a> {
    active: &'a RefCell<Vec<Instance>>,
}

impl Drop for ActiveAccess<'_> {
    fn drop(&mut self) {
        self.active.borrow_mut().pop();
    }
}

impl Delegator {
    /// `member = None` delegates to the member named like the attribute the
    /// delegator ends up bound under.
    pub fn new(host: &str, member: Option<&str>) -> Result<Self, DelegateError> {
        if host.is_empty() {
            return Err(DelegateError::InvalidDelegator(
                "host attribute name must not be empty".to_string(),
            ));
        }
        if member.is_some_and(str::is_empty) {
            return Err(DelegateError::InvalidDelegator(
                "member name must not be empty".to_string(),
            ));
        }
        if host == SELF_HOST && member.is_none() {
            return Err(DelegateError::InvalidDelegator(
                "Delegator('self') needs an explicit member".to_string(),
            ));
        }
        Ok(Self::unchecked(host, member))
    }

    pub(crate) fn unchecked(host: &str, member: Option<&str>) -> Self {
        Self {
            host: host.to_string(),
            member: member
                .map(|m| OnceCell::from(m.to_string()))
                .unwrap_or_default(),
            owner_attr: OnceCell::new(),
            active: RefCell::new(Vec::new()),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Member name, if given at construction or already discovered.
    pub fn member(&self) -> Option<&str> {
        self.member.get().map(String::as_str)
    }

    /// Class attribute name this delegator was found under, once resolved.
    pub fn resolved_name(&self) -> Option<&str> {
        self.owner_attr.get().map(String::as_str)
    }

    pub fn is_resolved(&self) -> bool {
        self.owner_attr.get().is_some()
    }

    /// Descriptor-style access. Without an instance (class-level access) the
    /// delegator itself comes back and nothing is resolved.
    pub fn access(self: &Rc<Self>, instance: Option<&Instance>) -> Result<Value, DelegateError> {
        match instance {
            None => Ok(Value::Delegator(Rc::clone(self))),
            Some(instance) => self.get(instance),
        }
    }

    /// Resolves `instance.<host>.<member>`. Callable members come back bound
    /// to the target; plain values come back as they are.
    pub fn get(&self, instance: &Instance) -> Result<Value, DelegateError> {
        let member = self.resolve(instance.class())?;
        let _access = self.enter(instance)?;
        let target = self.target(instance)?;
        tracing::trace!(
            class = instance.type_name(),
            host = %self.host,
            member,
            "delegated get"
        );
        target
            .lookup(member)?
            .ok_or_else(|| DelegateError::MissingMember {
                type_name: target.type_name(),
                attr: member.to_string(),
            })
    }

    /// Writes through to `instance.<host>.<member> = value`.
    pub fn set(&self, instance: &Instance, value: Value) -> Result<(), DelegateError> {
        let member = self.resolve(instance.class())?;
        let _access = self.enter(instance)?;
        let target = self.target(instance)?;
        tracing::trace!(
            class = instance.type_name(),
            host = %self.host,
            member,
            "delegated set"
        );
        target.setattr(member, value)
    }

    /// Marks `instance` as being forwarded for. Reaching the same delegator
    /// for the same instance again before that access finishes is a cycle.
    fn enter(&self, instance: &Instance) -> Result<ActiveAccess<'_>, DelegateError> {
        let mut active = self.active.borrow_mut();
        if active.iter().any(|seen| seen.ptr_eq(instance)) {
            return Err(DelegateError::SelfCycle {
                class: instance.type_name().to_string(),
                attr: self.resolved_name().unwrap_or(&self.host).to_string(),
            });
        }
        active.push(instance.clone());
        Ok(ActiveAccess {
            active: &self.active,
        })
    }

    fn target(&self, instance: &Instance) -> Result<Value, DelegateError> {
        if self.host == SELF_HOST {
            return Ok(instance.to_value());
        }
        instance
            .lookup(&self.host)?
            .ok_or_else(|| DelegateError::MissingHostAttribute {
                type_name: instance.type_name().to_string(),
                attr: self.host.clone(),
            })
    }

    /// Returns the member name, running discovery on first use.
    fn resolve(&self, class: &Class) -> Result<&str, DelegateError> {
        let owner_attr = match self.owner_attr.get() {
            Some(name) => name,
            None => {
                let found = class.binding_of(self).ok_or_else(|| DelegateError::Unbound {
                    class: class.name().to_string(),
                    host: self.host.clone(),
                })?;
                let name = self.owner_attr.get_or_init(|| found);
                let member = self.member.get_or_init(|| name.clone());
                tracing::debug!(
                    class = class.name(),
                    attr = %name,
                    host = %self.host,
                    member = %member,
                    "delegator bound"
                );
                name
            }
        };
        let member = self.member.get_or_init(|| owner_attr.clone());
        // A host named like the binding finds this same delegator again.
        if self.host == *owner_attr || (self.host == SELF_HOST && member == owner_attr) {
            return Err(DelegateError::SelfCycle {
                class: class.name().to_string(),
                attr: owner_attr.clone(),
            });
        }
        Ok(member.as_str())
    }
}

impl fmt::Display for Delegator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.member() {
            Some(member) => write!(f, "<delegator to '{}'.{}>", self.host, member),
            None => write!(f, "<delegator to '{}'>", self.host),
        }
    }
}
