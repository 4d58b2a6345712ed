//! Component specs
//!
//! Specs are kept raw in the container and normalized on every construction.
//! Accepted shapes:
//! - `null` - construct the class named like the component, no arguments
//! - `"Class"` - shorthand for `{"class": "Class"}`
//! - a map with any of `class`, `factory`, `arguments`, `alias`, `scope`,
//!   `properties` and `methods`
//!
//! A `null` field counts as absent, except for `factory`: a present but
//! `null` factory is kept so it fails as not callable.

use crate::{
    errors::ConfigError,
    types::{Value, ValueMap},
};

/// Lifetime of a component's instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scope {
    /// Built once and cached
    #[default]
    Singleton,
    /// Built on every lookup, never cached
    Prototype,
}

impl Scope {
    pub const PROTOTYPE: &'static str = "prototype";
    pub const SINGLETON: &'static str = "singleton";

    /// Anything but `"prototype"` is a singleton
    pub fn from_value(value: &Value) -> Self {
        match value.as_str() {
            Some(Self::PROTOTYPE) => Scope::Prototype,
            _ => Scope::Singleton,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Singleton => Self::SINGLETON,
            Scope::Prototype => Self::PROTOTYPE,
        }
    }
}

/// Normalized component spec
///
/// Also works as a builder for raw specs:
///
/// ```rust
/// use wrapp_wiring::{ComponentSpec, Value};
///
/// let spec: Value = ComponentSpec::class("SmtpTransport")
///     .argument("%smtp.host")
///     .property("logger", "@logger")
///     .call("set_timeout", vec![Value::from(30)])
///     .into();
/// assert!(spec.as_map().is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentSpec {
    pub class: Option<String>,
    pub factory: Option<Value>,
    pub arguments: Vec<Value>,
    pub alias: Option<String>,
    pub scope: Scope,
    pub properties: ValueMap,
    /// Raw `{method, arguments}` entries, validated when they are called
    pub methods: Vec<Value>,
}

impl ComponentSpec {
    pub fn parse(component: &str, raw: &Value) -> Result<Self, ConfigError> {
        let map = match raw {
            Value::Null => return Ok(Self::default()),
            Value::Str(class) => return Ok(Self::class(class.clone())),
            Value::Map(map) => map,
            other => return Err(ConfigError::NotAMap(other.repr())),
        };

        let field = |name: &'static str| map.get(name).filter(|value| !value.is_null());

        let alias = field("alias")
            .map(|value| expect_str(component, "alias", value))
            .transpose()?;
        if alias.is_some() {
            // Pure indirection, construction fields are ignored
            return Ok(Self {
                alias,
                ..Self::default()
            });
        }

        Ok(Self {
            class: field("class")
                .map(|value| expect_str(component, "class", value))
                .transpose()?,
            factory: map.get("factory").cloned(),
            arguments: field("arguments")
                .map(|value| expect_list(component, "arguments", value))
                .transpose()?
                .unwrap_or_default(),
            alias: None,
            scope: field("scope").map(Scope::from_value).unwrap_or_default(),
            properties: field("properties")
                .map(|value| match value {
                    Value::Map(properties) => Ok(properties.clone()),
                    other => Err(invalid(component, "properties", "a map", other)),
                })
                .transpose()?
                .unwrap_or_default(),
            methods: field("methods")
                .map(|value| expect_list(component, "methods", value))
                .transpose()?
                .unwrap_or_default(),
        })
    }

    pub fn is_alias(&self) -> bool {
        self.alias.is_some()
    }

    /// Class to construct when there is no factory
    pub fn class_or<'a>(&'a self, component: &'a str) -> &'a str {
        self.class.as_deref().unwrap_or(component)
    }
}

// Builder
impl ComponentSpec {
    pub fn class(class: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            ..Self::default()
        }
    }

    pub fn factory(factory: impl Into<Value>) -> Self {
        Self {
            factory: Some(factory.into()),
            ..Self::default()
        }
    }

    pub fn alias(target: impl Into<String>) -> Self {
        Self {
            alias: Some(target.into()),
            ..Self::default()
        }
    }

    pub fn argument(mut self, argument: impl Into<Value>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn prototype(self) -> Self {
        self.scope(Scope::Prototype)
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn call(mut self, method: impl Into<String>, arguments: Vec<Value>) -> Self {
        self.methods.push(MethodCall::new(method, arguments).into());
        self
    }

    /// Raw form as stored in the container
    pub fn to_value(&self) -> Value {
        let mut map = ValueMap::new();
        if let Some(alias) = &self.alias {
            map.insert("alias".into(), alias.clone().into());
            return Value::Map(map);
        }
        if let Some(class) = &self.class {
            map.insert("class".into(), class.clone().into());
        }
        if let Some(factory) = &self.factory {
            map.insert("factory".into(), factory.clone());
        }
        if !self.arguments.is_empty() {
            map.insert("arguments".into(), Value::List(self.arguments.clone()));
        }
        if self.scope != Scope::Singleton {
            map.insert("scope".into(), self.scope.as_str().into());
        }
        if !self.properties.is_empty() {
            map.insert("properties".into(), Value::Map(self.properties.clone()));
        }
        if !self.methods.is_empty() {
            map.insert("methods".into(), Value::List(self.methods.clone()));
        }
        Value::Map(map)
    }
}

impl From<ComponentSpec> for Value {
    fn from(spec: ComponentSpec) -> Self {
        spec.to_value()
    }
}

/// A post-construction method call
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub arguments: Vec<Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    pub fn parse(component: &str, raw: &Value) -> Result<Self, ConfigError> {
        let method = raw
            .as_map()
            .and_then(|entry| entry.get("method"))
            .and_then(Value::as_str)
            .ok_or_else(|| ConfigError::MissingMethod(raw.repr()))?;

        let arguments = match raw.as_map().and_then(|entry| entry.get("arguments")) {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => expect_list(component, "arguments", value)?,
        };

        Ok(Self::new(method, arguments))
    }
}

impl From<MethodCall> for Value {
    fn from(call: MethodCall) -> Self {
        let mut map = ValueMap::new();
        map.insert("method".into(), call.method.into());
        if !call.arguments.is_empty() {
            map.insert("arguments".into(), Value::List(call.arguments));
        }
        Value::Map(map)
    }
}

fn expect_str(component: &str, field: &'static str, value: &Value) -> Result<String, ConfigError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(component, field, "a string", value))
}

fn expect_list(component: &str, field: &'static str, value: &Value) -> Result<Vec<Value>, ConfigError> {
    value
        .as_list()
        .map(<[Value]>::to_vec)
        .ok_or_else(|| invalid(component, field, "a list", value))
}

fn invalid(component: &str, field: &'static str, expected: &'static str, value: &Value) -> ConfigError {
    ConfigError::InvalidField {
        component: component.to_string(),
        field,
        expected,
        actual: value.kind(),
    }
}
