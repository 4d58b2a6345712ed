//! Closure based [Invoker]
//!
//! Classes are registered with typed closures which are erased on registration,
//! the same way typed factories are boxed into dynamic ones.
//!
//! ```rust
//! use wrapp_wiring::{Class, Registry, Value};
//!
//! #[derive(Default)]
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! let registry = Registry::new()
//!     .class(
//!         Class::<Greeter>::with_default("Greeter")
//!             .property("greeting", |greeter, value| {
//!                 greeter.greeting = value.as_str().unwrap_or_default().to_string();
//!                 Ok(())
//!             })
//!             .method("greet", |greeter, args| {
//!                 Ok(Value::from(format!("{} {}", greeter.greeting, args.str(0)?)))
//!             }),
//!     )
//!     .function("shout", |args| Ok(Value::from(args.str(0)?.to_uppercase())));
//! # let _ = registry;
//! ```

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    marker::PhantomData,
};

use crate::{
    errors::InvocationError,
    invoker::{Arguments, Callable, Invoker},
    types::{Injectable, Instance, TypeInfo, Value},
};

type ConstructorFn = Box<dyn Fn(Arguments) -> Result<Instance, InvocationError> + Send + Sync>;
type FunctionFn = Box<dyn Fn(Arguments) -> Result<Value, InvocationError> + Send + Sync>;
type SharedMethodFn =
    Box<dyn Fn(&(dyn Any + Send + Sync), Arguments) -> Result<Value, InvocationError> + Send + Sync>;
type ExclusiveMethodFn = Box<
    dyn Fn(&mut (dyn Any + Send + Sync), Arguments) -> Result<Value, InvocationError> + Send + Sync,
>;
type SharedPropertyFn =
    Box<dyn Fn(&(dyn Any + Send + Sync), Value) -> Result<(), InvocationError> + Send + Sync>;
type ExclusivePropertyFn =
    Box<dyn Fn(&mut (dyn Any + Send + Sync), Value) -> Result<(), InvocationError> + Send + Sync>;

enum Constructor {
    /// No declared constructor, arguments are ignored
    Default(Box<dyn Fn() -> Instance + Send + Sync>),
    Declared(ConstructorFn),
}

enum Method {
    /// Works on shared instances
    Shared(SharedMethodFn),
    /// Needs the only handle to the instance
    Exclusive(ExclusiveMethodFn),
}

enum Property {
    Shared(SharedPropertyFn),
    Exclusive(ExclusivePropertyFn),
}

/// Erased registration of a single class
struct ClassEntry {
    info: TypeInfo,
    constructor: Constructor,
    methods: HashMap<String, Method>,
    static_methods: HashMap<String, FunctionFn>,
    properties: HashMap<String, Property>,
}

/// Typed registration of a class, see [Registry::class]
pub struct Class<T> {
    name: String,
    entry: ClassEntry,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> Class<T> {
    /// A class with a declared constructor
    pub fn new<F>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(Arguments) -> Result<T, InvocationError> + Send + Sync + 'static,
    {
        Self::with_constructor(
            name,
            Constructor::Declared(Box::new(move |args| constructor(args).map(Instance::new))),
        )
    }

    fn with_constructor(name: impl Into<String>, constructor: Constructor) -> Self {
        Self {
            name: name.into(),
            entry: ClassEntry {
                info: TypeInfo::of::<T>(),
                constructor,
                methods: HashMap::new(),
                static_methods: HashMap::new(),
                properties: HashMap::new(),
            },
            _marker: PhantomData,
        }
    }

    /// Property setter, runs on the freshly built instance
    pub fn property<F>(mut self, name: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&mut T, Value) -> Result<(), InvocationError> + Send + Sync + 'static,
    {
        let name = name.into();
        let member = name.clone();
        self.entry.properties.insert(
            name,
            Property::Exclusive(Box::new(
                move |target: &mut (dyn Any + Send + Sync), value: Value| {
                    setter(downcast_mut::<T>(target, &member)?, value)
                },
            )),
        );
        self
    }

    /// Property setter for types with interior mutability, works on shared instances
    pub fn property_shared<F>(mut self, name: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&T, Value) -> Result<(), InvocationError> + Send + Sync + 'static,
    {
        let name = name.into();
        let member = name.clone();
        self.entry.properties.insert(
            name,
            Property::Shared(Box::new(
                move |target: &(dyn Any + Send + Sync), value: Value| {
                    setter(downcast_ref::<T>(target, &member)?, value)
                },
            )),
        );
        self
    }

    /// Method callable on shared instances
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&T, Arguments) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        let name = name.into();
        let member = name.clone();
        self.entry.methods.insert(
            name,
            Method::Shared(Box::new(move |target: &(dyn Any + Send + Sync), args: Arguments| {
                method(downcast_ref::<T>(target, &member)?, args)
            })),
        );
        self
    }

    /// Method that changes the instance - only callable while the container holds the sole handle
    pub fn method_mut<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&mut T, Arguments) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        let name = name.into();
        let member = name.clone();
        self.entry.methods.insert(
            name,
            Method::Exclusive(Box::new(
                move |target: &mut (dyn Any + Send + Sync), args: Arguments| {
                    method(downcast_mut::<T>(target, &member)?, args)
                },
            )),
        );
        self
    }

    /// Factory reachable as `"Class::name"` or `["Class", "name"]`
    pub fn static_method<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(Arguments) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        self.entry
            .static_methods
            .insert(name.into(), Box::new(function));
        self
    }
}

impl<T: Injectable + Default> Class<T> {
    /// A class without a declared constructor, built from `T::default()`
    pub fn with_default(name: impl Into<String>) -> Self {
        Self::with_constructor(
            name,
            Constructor::Default(Box::new(|| Instance::new(T::default()))),
        )
    }
}

/// Registry of classes and functions the container can invoke by name
#[derive(Default)]
pub struct Registry {
    classes: HashMap<String, ClassEntry>,
    /// Class names by the type they construct, used to find methods of an instance
    names: HashMap<TypeId, String>,
    functions: HashMap<String, FunctionFn>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class<T: Injectable>(mut self, class: Class<T>) -> Self {
        tracing::debug!("Registered class '{}' for {}", class.name, class.entry.info);
        self.names.insert(class.entry.info.type_id, class.name.clone());
        self.classes.insert(class.name, class.entry);
        self
    }

    pub fn function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(Arguments) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!("Registered function '{name}'");
        self.functions.insert(name, Box::new(function));
        self
    }

    fn entry_of(&self, instance: &Instance) -> Result<&ClassEntry, InvocationError> {
        self.names
            .get(&instance.info().type_id)
            .and_then(|name| self.classes.get(name))
            .ok_or_else(|| InvocationError::UnknownClass(instance.type_name().to_string()))
    }

    fn static_method(&self, class: &str, method: &str) -> Option<&FunctionFn> {
        self.classes.get(class)?.static_methods.get(method)
    }
}

impl Invoker for Registry {
    fn has_class(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    fn is_callable(&self, callable: &Callable) -> bool {
        match callable {
            Callable::Function(name) => self.functions.contains_key(name),
            Callable::StaticMethod { class, method } => self.static_method(class, method).is_some(),
            Callable::BoundMethod { instance, method } => self
                .entry_of(instance)
                .is_ok_and(|entry| entry.methods.contains_key(method)),
        }
    }

    fn construct(&self, class: &str, args: Vec<Value>) -> Result<Value, InvocationError> {
        let entry = self
            .classes
            .get(class)
            .ok_or_else(|| InvocationError::UnknownClass(class.to_string()))?;

        let instance = match &entry.constructor {
            Constructor::Default(build) => build(),
            Constructor::Declared(build) => build(Arguments::new(args))?,
        };
        Ok(Value::Instance(instance))
    }

    fn call(&self, callable: &Callable, args: Vec<Value>) -> Result<Value, InvocationError> {
        let args = Arguments::new(args);
        match callable {
            Callable::Function(name) => {
                let function = self
                    .functions
                    .get(name)
                    .ok_or_else(|| InvocationError::UnknownFunction(name.clone()))?;
                function(args)
            }
            Callable::StaticMethod { class, method } => {
                let function = self.static_method(class, method).ok_or_else(|| {
                    InvocationError::UnknownMethod {
                        class: class.clone(),
                        method: method.clone(),
                    }
                })?;
                function(args)
            }
            Callable::BoundMethod { instance, method } => {
                let entry = self.entry_of(instance)?;
                match entry.methods.get(method) {
                    Some(Method::Shared(call)) => call(instance.as_any(), args),
                    // The factory entry itself holds a handle, so it is never exclusive
                    Some(Method::Exclusive(_)) => Err(InvocationError::SharedInstance {
                        class: instance.type_name().to_string(),
                        member: method.clone(),
                    }),
                    None => Err(InvocationError::UnknownMethod {
                        class: instance.type_name().to_string(),
                        method: method.clone(),
                    }),
                }
            }
        }
    }

    fn call_method(
        &self,
        target: &mut Value,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, InvocationError> {
        let instance = as_instance(target, method)?;
        let entry = self.entry_of(instance)?;
        let class = instance.type_name();
        let args = Arguments::new(args);

        match entry.methods.get(method) {
            Some(Method::Shared(call)) => call(instance.as_any(), args),
            Some(Method::Exclusive(call)) => {
                let target = instance
                    .as_any_mut()
                    .ok_or_else(|| InvocationError::SharedInstance {
                        class: class.to_string(),
                        member: method.to_string(),
                    })?;
                call(target, args)
            }
            None => Err(InvocationError::UnknownMethod {
                class: class.to_string(),
                method: method.to_string(),
            }),
        }
    }

    fn set_property(
        &self,
        target: &mut Value,
        property: &str,
        value: Value,
    ) -> Result<(), InvocationError> {
        let instance = as_instance(target, property)?;
        let entry = self.entry_of(instance)?;
        let class = instance.type_name();

        match entry.properties.get(property) {
            Some(Property::Shared(setter)) => setter(instance.as_any(), value),
            Some(Property::Exclusive(setter)) => {
                let target = instance
                    .as_any_mut()
                    .ok_or_else(|| InvocationError::SharedInstance {
                        class: class.to_string(),
                        member: property.to_string(),
                    })?;
                setter(target, value)
            }
            None => Err(InvocationError::UnknownProperty {
                class: class.to_string(),
                property: property.to_string(),
            }),
        }
    }
}

fn as_instance<'a>(target: &'a mut Value, member: &str) -> Result<&'a mut Instance, InvocationError> {
    let kind = target.kind();
    match target {
        Value::Instance(instance) => Ok(instance),
        _ => Err(InvocationError::NotAnInstance {
            member: member.to_string(),
            kind,
        }),
    }
}

fn downcast_ref<'a, T: 'static>(
    target: &'a (dyn Any + Send + Sync),
    member: &str,
) -> Result<&'a T, InvocationError> {
    target
        .downcast_ref::<T>()
        .ok_or_else(|| InvocationError::UnknownMethod {
            class: std::any::type_name::<T>().to_string(),
            method: member.to_string(),
        })
}

fn downcast_mut<'a, T: 'static>(
    target: &'a mut (dyn Any + Send + Sync),
    member: &str,
) -> Result<&'a mut T, InvocationError> {
    target
        .downcast_mut::<T>()
        .ok_or_else(|| InvocationError::UnknownMethod {
            class: std::any::type_name::<T>().to_string(),
            method: member.to_string(),
        })
}
