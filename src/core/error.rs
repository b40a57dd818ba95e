use thiserror::Error;

#[derive(Error, Debug)]
pub enum DelegateError {
    #[error("delegator to '{host}' is not bound to any class attribute of '{class}'")]
    Unbound { class: String, host: String },
    #[error("delegator bound as '{attr}' on '{class}' refers back to itself")]
    SelfCycle { class: String, attr: String },
    #[error("invalid delegator: {0}")]
    InvalidDelegator(String),
    #[error("'{type_name}' object has no attribute '{attr}'")]
    MissingHostAttribute { type_name: String, attr: String },
    #[error("'{type_name}' object has no attribute '{attr}'")]
    MissingMember { type_name: String, attr: String },
    #[error("'{type_name}' object has no attribute '{attr}'")]
    NoAttribute { type_name: String, attr: String },
    #[error("type object '{class}' has no attribute '{attr}'")]
    NoClassAttribute { class: String, attr: String },
    #[error("'{type_name}' object attribute '{attr}' is read-only")]
    ReadOnly { type_name: String, attr: String },
    #[error("'{type_name}' object is not callable")]
    NotCallable { type_name: String },
    #[error("{0}")]
    TypeError(String),
    #[error("{0}")]
    IndexError(String),
    #[error("{0}")]
    ValueError(String),
    #[error("{failed} of {total} selftest scenarios failed")]
    SelftestFailed { failed: usize, total: usize },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DelegateError {
    /// True for every "object has no attribute" failure, whichever lookup raised it.
    pub fn is_attribute_error(&self) -> bool {
        matches!(
            self,
            DelegateError::MissingHostAttribute { .. }
                | DelegateError::MissingMember { .. }
                | DelegateError::NoAttribute { .. }
                | DelegateError::NoClassAttribute { .. }
        )
    }

    pub(crate) fn no_attribute(type_name: impl Into<String>, attr: impl Into<String>) -> Self {
        DelegateError::NoAttribute {
            type_name: type_name.into(),
            attr: attr.into(),
        }
    }
}
