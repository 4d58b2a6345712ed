use std::{any::type_name, collections::HashMap, fmt::Debug, sync::Arc};

use crate::{
    builder::ContainerBuilder,
    config::ContainerConfig,
    dependency_graph::{DependencyGraph, DependencyGraphErrors},
    dependency_path::ResolutionPath,
    errors::{ConfigError, ReflectionError, WiringError},
    invoker::{Callable, Invoker},
    reference::{self, Reference},
    spec::{ComponentSpec, MethodCall, Scope},
    types::{Injectable, Value, ValueMap},
};

/// Lazily wiring container
///
/// Holds raw component specs, config params and the cache of built instances.
/// Nothing is built until it is looked up.
///
/// ```rust
/// use std::sync::Arc;
/// use wrapp_wiring::{Class, Container, Registry, Value};
///
/// #[derive(Default)]
/// struct Clock;
///
/// let registry = Registry::new().class(Class::<Clock>::with_default("Clock"));
/// let mut container = Container::builder(Arc::new(registry))
///     .component("clock", "Clock")
///     .build();
///
/// let clock = container.require::<Clock>("clock").unwrap();
/// assert!(Arc::ptr_eq(&clock, &container.require::<Clock>("clock").unwrap()));
/// ```
pub struct Container {
    components: ValueMap,
    params: ValueMap,
    instances: HashMap<String, Value>,
    invoker: Arc<dyn Invoker>,
    config: ContainerConfig,
}

impl Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_struct("Container");
        for name in self.components.keys() {
            let state = if self.instances.contains_key(name) {
                "cached"
            } else {
                "pending"
            };
            map.field(name, &state);
        }
        for name in self.instances.keys() {
            if !self.components.contains_key(name) {
                map.field(name, &"registered");
            }
        }
        map.finish()
    }
}

impl Container {
    pub fn new(invoker: Arc<dyn Invoker>) -> Self {
        Self::with_maps(invoker, ValueMap::new(), ValueMap::new())
    }

    pub fn with_maps(invoker: Arc<dyn Invoker>, components: ValueMap, params: ValueMap) -> Self {
        Self::from_parts(
            invoker,
            components,
            params,
            HashMap::new(),
            ContainerConfig::default(),
        )
    }

    pub fn builder(invoker: Arc<dyn Invoker>) -> ContainerBuilder {
        ContainerBuilder::new(invoker)
    }

    pub(crate) fn from_parts(
        invoker: Arc<dyn Invoker>,
        components: ValueMap,
        params: ValueMap,
        instances: HashMap<String, Value>,
        config: ContainerConfig,
    ) -> Self {
        Self {
            components,
            params,
            instances,
            invoker,
            config,
        }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub(crate) fn cached_names(&self) -> impl Iterator<Item = &str> {
        self.instances.keys().map(String::as_str)
    }
}

// Components
impl Container {
    /// Returns the component `name`, building it if needed
    pub fn get_component(&mut self, name: &str) -> Result<Value, WiringError> {
        let mut path = ResolutionPath::new();
        self.resolve(name, &mut path)
    }

    /// Typed [Container::get_component]
    pub fn require<T: Injectable>(&mut self, name: &str) -> Result<Arc<T>, WiringError> {
        let value = self.get_component(name)?;
        let actual = match &value {
            Value::Instance(instance) => match instance.downcast::<T>() {
                Ok(typed) => return Ok(typed),
                Err(actual) => actual.to_string(),
            },
            other => other.kind().to_string(),
        };

        Err(WiringError::TypeMismatch {
            name: name.to_string(),
            expected: type_name::<T>(),
            actual,
        })
    }

    /// Registers a ready value as a singleton, shadowing any spec of the same name
    pub fn set_component(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        tracing::debug!("Registered instance '{name}'");
        self.instances.insert(name, value.into());
        self
    }

    /// True if there is a spec or a cached instance
    pub fn has_component(&self, name: &str) -> bool {
        self.instances.contains_key(name) || self.components.contains_key(name)
    }

    /// Evicts the cached instance, the spec stays
    pub fn clear_component(&mut self, name: &str) -> &mut Self {
        if self.instances.remove(name).is_some() {
            tracing::debug!("Evicted '{name}'");
        }
        self
    }

    pub fn get_components(&self) -> &ValueMap {
        &self.components
    }

    /// Checks every spec for missing references and loops without building anything
    pub fn validate(&self) -> Result<(), DependencyGraphErrors> {
        DependencyGraph::new(self).check()
    }

    pub fn get(&mut self, name: &str) -> Result<Value, WiringError> {
        self.get_component(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.set_component(name, value)
    }

    pub fn has(&self, name: &str) -> bool {
        self.has_component(name)
    }

    pub fn delete(&mut self, name: &str) -> &mut Self {
        self.clear_component(name)
    }
}

// Params
impl Container {
    pub fn get_config_param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn get_config_param_or(&self, key: &str, default: impl Into<Value>) -> Value {
        match self.params.get(key) {
            Some(value) => value.clone(),
            None => default.into(),
        }
    }

    pub fn set_config_param(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn get_config_params(&self) -> &ValueMap {
        &self.params
    }

    /// Adds specs and params, overwriting existing keys
    ///
    /// Cached instances are kept even if their spec changed.
    pub fn merge(&mut self, components: ValueMap, params: ValueMap) -> &mut Self {
        tracing::debug!(
            "Merging {} components and {} params",
            components.len(),
            params.len()
        );
        self.components.extend(components);
        self.params.extend(params);
        self
    }
}

// References
impl Container {
    /// Replaces `@component` and `%param` references, walking lists and maps
    pub fn dereference(&mut self, value: &Value) -> Result<Value, WiringError> {
        let mut path = ResolutionPath::new();
        self.dereference_in(value, &mut path)
    }

    /// See [reference::escape]
    pub fn escape(value: &Value) -> Value {
        reference::escape(value)
    }

    fn dereference_in(
        &mut self,
        value: &Value,
        path: &mut ResolutionPath,
    ) -> Result<Value, WiringError> {
        match value {
            Value::Str(text) => match Reference::parse(text) {
                Reference::Component(name) => {
                    tracing::trace!("Dereferencing component '{name}'");
                    self.resolve(name, path)
                }
                Reference::Param(key) => {
                    tracing::trace!("Dereferencing param '{key}'");
                    self.param(key)
                }
                Reference::Literal(literal) => Ok(Value::Str(literal.to_string())),
            },
            Value::List(items) => self.dereference_all(items, path).map(Value::List),
            Value::Map(map) => self.dereference_map(map, path).map(Value::Map),
            other => Ok(other.clone()),
        }
    }

    fn dereference_all(
        &mut self,
        items: &[Value],
        path: &mut ResolutionPath,
    ) -> Result<Vec<Value>, WiringError> {
        items
            .iter()
            .map(|item| self.dereference_in(item, path))
            .collect()
    }

    fn dereference_map(
        &mut self,
        map: &ValueMap,
        path: &mut ResolutionPath,
    ) -> Result<ValueMap, WiringError> {
        map.iter()
            .map(|(key, item)| Ok::<_, WiringError>((key.clone(), self.dereference_in(item, path)?)))
            .collect()
    }

    fn param(&self, key: &str) -> Result<Value, WiringError> {
        if let Some(value) = self.params.get(key) {
            return Ok(value.clone());
        }
        if self.config.strict_params {
            return Err(WiringError::param_not_found(key));
        }

        tracing::warn!("Config param '{key}' is missing, using default");
        Ok(self.config.missing_param())
    }
}

// Resolution
impl Container {
    fn resolve(&mut self, name: &str, path: &mut ResolutionPath) -> Result<Value, WiringError> {
        if let Some(cached) = self.instances.get(name) {
            tracing::trace!("Cache hit for '{name}'");
            return Ok(cached.clone());
        }

        let raw = self
            .components
            .get(name)
            .cloned()
            .ok_or_else(|| WiringError::component_not_found(name))?;

        // On error the path is dropped with the lookup, so it is not unwound
        path.enter(name)?;
        let spec = ComponentSpec::parse(name, &raw)?;

        let value = match &spec.alias {
            Some(target) => {
                tracing::trace!("'{name}' is an alias of '{target}'");
                self.resolve(target, path)?
            }
            None => {
                let value = self.build(name, &spec, path)?;
                if spec.scope == Scope::Singleton {
                    self.instances.insert(name.to_string(), value.clone());
                }
                value
            }
        };

        path.leave();
        Ok(value)
    }

    fn build(
        &mut self,
        name: &str,
        spec: &ComponentSpec,
        path: &mut ResolutionPath,
    ) -> Result<Value, WiringError> {
        let invoker = Arc::clone(&self.invoker);

        let mut instance = match &spec.factory {
            Some(factory) => {
                let callable = Callable::from_value(factory)
                    .filter(|callable| invoker.is_callable(callable))
                    .ok_or_else(|| ConfigError::FactoryNotCallable(factory.repr()))?;
                let args = self.dereference_all(&spec.arguments, path)?;

                tracing::debug!("Building '{name}' with factory '{callable}'");
                invoker
                    .call(&callable, args)
                    .map_err(|source| ReflectionError::Factory {
                        factory: callable.to_string(),
                        source,
                    })?
            }
            None => {
                let class = spec.class_or(name);
                if !invoker.has_class(class) {
                    return Err(ReflectionError::ClassNotFound(class.to_string()).into());
                }
                let args = self.dereference_all(&spec.arguments, path)?;

                tracing::debug!("Building '{name}' as '{class}' ({:?})", spec.scope);
                invoker
                    .construct(class, args)
                    .map_err(|source| ReflectionError::Construct {
                        class: class.to_string(),
                        source,
                    })?
            }
        };

        let properties = self.dereference_map(&spec.properties, path)?;
        for (property, value) in properties {
            invoker
                .set_property(&mut instance, &property, value)
                .map_err(|source| ReflectionError::Property { property, source })?;
        }

        for raw in &spec.methods {
            let call = MethodCall::parse(name, raw)?;
            let args = self.dereference_all(&call.arguments, path)?;
            invoker
                .call_method(&mut instance, &call.method, args)
                .map_err(|source| ReflectionError::Method {
                    method: call.method.clone(),
                    source,
                })?;
        }

        Ok(instance)
    }
}
