use crate::core::error::DelegateError;
use crate::core::object::{Class, ClassAttr};
use crate::delegation::delegator::{Delegator, SELF_HOST};
use std::rc::Rc;

/// Installs one [`Delegator`] per member name on a class.
#[derive(Clone, Debug)]
pub struct Decorator {
    host: String,
    members: Vec<String>,
}

/// `delegate("v", &["upper", "lower"])` makes `upper` and `lower` on the
/// decorated class forward to the same-named members of attribute `v`.
pub fn delegate(host: &str, members: &[&str]) -> Result<Decorator, DelegateError> {
    if host.is_empty() {
        return Err(DelegateError::InvalidDelegator(
            "host attribute name must not be empty".to_string(),
        ));
    }
    if host == SELF_HOST {
        return Err(DelegateError::InvalidDelegator(
            "delegate('self', ..) would bind every member to itself".to_string(),
        ));
    }
    if members.is_empty() {
        return Err(DelegateError::InvalidDelegator(format!(
            "delegate('{host}') needs at least one member"
        )));
    }
    if members.iter().any(|m| m.is_empty()) {
        return Err(DelegateError::InvalidDelegator(
            "member name must not be empty".to_string(),
        ));
    }
    Ok(Decorator {
        host: host.to_string(),
        members: members.iter().map(|m| m.to_string()).collect(),
    })
}

impl Decorator {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Amends `class` in place and hands the same class back. Names already
    /// present are overwritten, so the decorator applied last wins.
    pub fn apply(&self, class: &Class) -> Class {
        for member in &self.members {
            let delegator = Delegator::unchecked(&self.host, Some(member.as_str()));
            class.set_attr(member, ClassAttr::Delegator(Rc::new(delegator)));
        }
        tracing::debug!(
            class = class.name(),
            host = %self.host,
            members = ?self.members,
            "delegation installed"
        );
        class.clone()
    }
}
