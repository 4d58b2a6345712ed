use std::fmt;

use thiserror::Error;

use crate::types::DynError;

/// Errors surfaced by [Container](crate::Container) lookups
///
/// All of them abort the current lookup - nothing is retried.
#[derive(Error, Debug)]
pub enum WiringError {
    /// Neither a spec nor a cached instance exists, or a required param is missing
    #[error("{kind} not found in container: {name:?}")]
    NotFound { kind: Lookup, name: String },
    /// A component spec is malformed
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The invoker could not locate or call something
    #[error(transparent)]
    Reflection(#[from] ReflectionError),
    /// A component transitively depends on itself
    #[error("Dependency loop detected: {}", .chain.join(" -> "))]
    DependencyLoop { chain: Vec<String> },
    /// The component exists but is not of the requested type
    #[error("Component '{name}' is a '{actual}', not a '{expected}'")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: String,
    },
}

impl WiringError {
    pub(crate) fn component_not_found(name: &str) -> Self {
        Self::NotFound {
            kind: Lookup::Component,
            name: name.to_string(),
        }
    }

    pub(crate) fn param_not_found(key: &str) -> Self {
        Self::NotFound {
            kind: Lookup::Param,
            name: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    pub fn is_reflection(&self) -> bool {
        matches!(self, Self::Reflection(_))
    }

    pub fn is_dependency_loop(&self) -> bool {
        matches!(self, Self::DependencyLoop { .. })
    }
}

/// What a [WiringError::NotFound] was looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Component,
    Param,
}
impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Component => f.write_str("Component"),
            Lookup::Param => f.write_str("Config param"),
        }
    }
}

/// Structurally invalid component specs
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Component configuration is not a map: {0}")]
    NotAMap(String),
    #[error("Component '{component}' has an invalid '{field}': expected {expected}, got {actual}")]
    InvalidField {
        component: String,
        field: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Factory is not callable: {0}")]
    FactoryNotCallable(String),
    #[error("Missing method in: {0}")]
    MissingMethod(String),
}

/// Failures to locate or invoke something through the [Invoker](crate::Invoker)
#[derive(Error, Debug)]
pub enum ReflectionError {
    #[error("Class not found: {0:?}")]
    ClassNotFound(String),
    #[error("Cannot create instance by reflection: {source}")]
    Construct {
        class: String,
        #[source]
        source: InvocationError,
    },
    #[error("Cannot call factory by reflection: {source}")]
    Factory {
        factory: String,
        #[source]
        source: InvocationError,
    },
    #[error("Cannot call method by reflection: {source}")]
    Method {
        method: String,
        #[source]
        source: InvocationError,
    },
    #[error("Cannot set property by reflection: {source}")]
    Property {
        property: String,
        #[source]
        source: InvocationError,
    },
}

/// Errors reported by an [Invoker](crate::Invoker) implementation
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("unknown class '{0}'")]
    UnknownClass(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("'{class}' has no method '{method}'")]
    UnknownMethod { class: String, method: String },
    #[error("'{class}' has no property '{property}'")]
    UnknownProperty { class: String, property: String },
    #[error("cannot call '{member}' on a {kind} value")]
    NotAnInstance { member: String, kind: &'static str },
    #[error("'{class}' is shared, '{member}' needs exclusive access")]
    SharedInstance { class: String, member: String },
    #[error("missing argument #{index}")]
    MissingArgument { index: usize },
    #[error("argument #{index} must be {expected}, got {actual}")]
    BadArgument {
        index: usize,
        expected: &'static str,
        actual: String,
    },
    #[error("{0}")]
    Failed(DynError),
}

impl InvocationError {
    /// Wraps any error raised by user code
    pub fn failed(error: impl Into<DynError>) -> Self {
        Self::Failed(error.into())
    }
}
