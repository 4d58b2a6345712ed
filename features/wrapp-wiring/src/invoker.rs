use std::{fmt, sync::Arc};

use crate::{
    errors::InvocationError,
    types::{Injectable, Instance, Value},
};

/// Capability to construct classes and call functions, methods and property setters by name
///
/// The container only ever talks to this trait - how names map to code is up
/// to the implementation. [Registry](crate::Registry) is the closure based one.
pub trait Invoker: Send + Sync {
    /// Returns true if `class` can be constructed
    fn has_class(&self, class: &str) -> bool;

    /// Returns true if `callable` refers to something that can be called
    fn is_callable(&self, callable: &Callable) -> bool;

    /// Constructs a new instance of `class`
    ///
    /// Classes without a declared constructor are built without arguments,
    /// whatever is passed in `args`.
    fn construct(&self, class: &str, args: Vec<Value>) -> Result<Value, InvocationError>;

    /// Calls a factory function or method
    fn call(&self, callable: &Callable, args: Vec<Value>) -> Result<Value, InvocationError>;

    /// Calls `method` on `target`
    ///
    /// `target` is handed out mutably so freshly built instances can be changed in place.
    fn call_method(
        &self,
        target: &mut Value,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, InvocationError>;

    /// Assigns `property` on `target`
    fn set_property(
        &self,
        target: &mut Value,
        property: &str,
        value: Value,
    ) -> Result<(), InvocationError>;
}

impl<I: Invoker + ?Sized> Invoker for Arc<I> {
    fn has_class(&self, class: &str) -> bool {
        (**self).has_class(class)
    }

    fn is_callable(&self, callable: &Callable) -> bool {
        (**self).is_callable(callable)
    }

    fn construct(&self, class: &str, args: Vec<Value>) -> Result<Value, InvocationError> {
        (**self).construct(class, args)
    }

    fn call(&self, callable: &Callable, args: Vec<Value>) -> Result<Value, InvocationError> {
        (**self).call(callable, args)
    }

    fn call_method(
        &self,
        target: &mut Value,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, InvocationError> {
        (**self).call_method(target, method, args)
    }

    fn set_property(
        &self,
        target: &mut Value,
        property: &str,
        value: Value,
    ) -> Result<(), InvocationError> {
        (**self).set_property(target, property, value)
    }
}

/// Something a `factory` entry can point at
#[derive(Debug, Clone)]
pub enum Callable {
    /// `"make_mailer"`
    Function(String),
    /// `"Mailer::create"` or `["Mailer", "create"]`
    StaticMethod { class: String, method: String },
    /// `[<instance>, "create"]`
    BoundMethod { instance: Instance, method: String },
}

impl Callable {
    /// Reads a factory entry, None if it has no callable shape
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(name) if name.is_empty() => None,
            Value::Str(name) => Some(match name.split_once("::") {
                Some((class, method)) if !class.is_empty() && !method.is_empty() => {
                    Callable::StaticMethod {
                        class: class.to_string(),
                        method: method.to_string(),
                    }
                }
                _ => Callable::Function(name.clone()),
            }),
            Value::List(pair) => match pair.as_slice() {
                [Value::Str(class), Value::Str(method)] => Some(Callable::StaticMethod {
                    class: class.clone(),
                    method: method.clone(),
                }),
                [Value::Instance(instance), Value::Str(method)] => Some(Callable::BoundMethod {
                    instance: instance.clone(),
                    method: method.clone(),
                }),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function(name) => f.write_str(name),
            Callable::StaticMethod { class, method } => write!(f, "{class}::{method}"),
            Callable::BoundMethod { instance, method } => {
                write!(f, "{}->{method}", instance.type_name())
            }
        }
    }
}

/// Positional arguments handed to registered closures
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<Value>,
}

impl Arguments {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.values
    }

    pub fn value(&self, index: usize) -> Result<&Value, InvocationError> {
        self.values
            .get(index)
            .ok_or(InvocationError::MissingArgument { index })
    }

    /// Argument or null when it was not passed
    pub fn value_or_null(&self, index: usize) -> Value {
        self.values.get(index).cloned().unwrap_or_default()
    }

    pub fn str(&self, index: usize) -> Result<&str, InvocationError> {
        let value = self.value(index)?;
        value.as_str().ok_or_else(|| bad(index, "a string", value))
    }

    pub fn string(&self, index: usize) -> Result<String, InvocationError> {
        self.str(index).map(str::to_string)
    }

    pub fn int(&self, index: usize) -> Result<i64, InvocationError> {
        let value = self.value(index)?;
        value.as_int().ok_or_else(|| bad(index, "an int", value))
    }

    pub fn float(&self, index: usize) -> Result<f64, InvocationError> {
        let value = self.value(index)?;
        value.as_float().ok_or_else(|| bad(index, "a number", value))
    }

    pub fn bool(&self, index: usize) -> Result<bool, InvocationError> {
        let value = self.value(index)?;
        value.as_bool().ok_or_else(|| bad(index, "a bool", value))
    }

    pub fn instance<T: Injectable>(&self, index: usize) -> Result<Arc<T>, InvocationError> {
        let value = self.value(index)?;
        value
            .downcast::<T>()
            .ok_or_else(|| bad(index, std::any::type_name::<T>(), value))
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

fn bad(index: usize, expected: &'static str, value: &Value) -> InvocationError {
    InvocationError::BadArgument {
        index,
        expected,
        actual: value.repr(),
    }
}
