use std::{collections::HashMap, sync::Arc};

use crate::{
    config::ContainerConfig,
    container::Container,
    invoker::Invoker,
    types::{Value, ValueMap},
};

/// Collects specs, params and ready instances before creating a [Container]
///
/// Nothing is built here, see [Container::validate] to check the result up front.
pub struct ContainerBuilder {
    invoker: Arc<dyn Invoker>,
    /// Raw component specs
    components: ValueMap,
    params: ValueMap,
    /// Registered already created instances
    instances: HashMap<String, Value>,
    config: ContainerConfig,
}

impl ContainerBuilder {
    pub fn new(invoker: Arc<dyn Invoker>) -> Self {
        ContainerBuilder {
            invoker,
            components: ValueMap::new(),
            params: ValueMap::new(),
            instances: HashMap::new(),
            config: ContainerConfig::default(),
        }
    }
}

impl ContainerBuilder {
    pub fn component(mut self, name: impl Into<String>, spec: impl Into<Value>) -> Self {
        self.components.insert(name.into(), spec.into());
        self
    }

    pub fn components(mut self, components: ValueMap) -> Self {
        self.components.extend(components);
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn params(mut self, params: ValueMap) -> Self {
        self.params.extend(params);
        self
    }

    pub fn instance(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.instances.insert(name.into(), value.into());
        self
    }

    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Container {
        tracing::debug!(
            "Building container with {} components, {} params and {} instances",
            self.components.len(),
            self.params.len(),
            self.instances.len()
        );
        Container::from_parts(
            self.invoker,
            self.components,
            self.params,
            self.instances,
            self.config,
        )
    }
}
