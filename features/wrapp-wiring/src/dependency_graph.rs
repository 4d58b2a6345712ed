use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::{
    container::Container,
    errors::ConfigError,
    reference::Reference,
    spec::{ComponentSpec, MethodCall},
    types::Value,
};

/// Static view of which component refers to which
///
/// Lookups only discover problems for the components they touch, this walks
/// every spec up front. Used by [Container::validate].
pub struct DependencyGraph {
    map: BTreeMap<String, DependencyGraphEntry>,
    /// Problems found while reading the specs
    issues: Vec<DependencyGraphError>,
}

impl DependencyGraph {
    pub fn new(container: &Container) -> Self {
        let mut graph = Self {
            map: Default::default(),
            issues: Vec::new(),
        };

        // Cached instances shadow their spec and need nothing
        for name in container.cached_names() {
            graph.map.insert(name.to_string(), DependencyGraphEntry::default());
        }

        for (name, raw) in container.get_components() {
            if graph.map.contains_key(name) {
                continue;
            }
            match graph.read_spec(name, raw) {
                Ok(entry) => {
                    graph.map.insert(name.clone(), entry);
                }
                Err(source) => graph.issues.push(DependencyGraphError::InvalidSpec {
                    component: name.clone(),
                    source,
                }),
            }
        }

        if container.config().strict_params {
            let params = container.get_config_params();
            for (name, entry) in &graph.map {
                for param in entry.params.iter().filter(|param| !params.contains_key(*param)) {
                    graph.issues.push(DependencyGraphError::MissingParam {
                        param: param.clone(),
                        required_by: name.clone(),
                    });
                }
            }
        }

        graph
    }

    fn read_spec(&self, name: &str, raw: &Value) -> Result<DependencyGraphEntry, ConfigError> {
        let spec = ComponentSpec::parse(name, raw)?;
        let mut entry = DependencyGraphEntry::default();

        if let Some(target) = &spec.alias {
            entry.dependencies.push(target.clone());
            return Ok(entry);
        }

        for argument in &spec.arguments {
            entry.collect(argument);
        }
        for value in spec.properties.values() {
            entry.collect(value);
        }
        for raw_call in &spec.methods {
            let call = MethodCall::parse(name, raw_call)?;
            for argument in &call.arguments {
                entry.collect(argument);
            }
        }

        Ok(entry)
    }

    /// Names of the components `name` refers to directly
    pub fn dependencies_of(&self, name: &str) -> Option<&[String]> {
        self.map.get(name).map(|entry| entry.dependencies.as_slice())
    }

    /// Validate the graph
    ///
    /// Returns a list of all issues
    pub fn check(&self) -> Result<(), DependencyGraphErrors> {
        let mut checked = HashSet::new();
        let mut errors = self.issues.clone();
        for name in self.map.keys() {
            let mut dependency_chain = Vec::new();
            check_recurse(self, &mut checked, &mut errors, &mut dependency_chain, name);
        }

        if !errors.is_empty() {
            return Err(DependencyGraphErrors { errors });
        }

        return Ok(());

        fn check_recurse<'a>(
            graph: &'a DependencyGraph,
            checked: &mut HashSet<&'a str>,
            errors: &mut Vec<DependencyGraphError>,
            dependency_chain: &mut Vec<&'a str>,
            name: &'a str,
        ) {
            if let Some(start) = dependency_chain.iter().position(|entry| *entry == name) {
                let mut chain: Vec<String> = dependency_chain[start..]
                    .iter()
                    .map(|entry| entry.to_string())
                    .collect();
                chain.push(name.to_string());

                errors.push(DependencyGraphError::CircularDependency {
                    from: dependency_chain[start].to_string(),
                    to: dependency_chain[dependency_chain.len() - 1].to_string(),
                    chain,
                });
            }

            // Skip other checks if already checked
            if !checked.insert(name) {
                return;
            }
            let Some(entry) = graph.map.get(name) else {
                return;
            };

            dependency_chain.push(name);

            for dependency in &entry.dependencies {
                if !graph.map.contains_key(dependency) {
                    errors.push(DependencyGraphError::MissingDependency {
                        dependency: dependency.clone(),
                        required_by: name.to_string(),
                    });
                    continue;
                }

                check_recurse(graph, checked, errors, dependency_chain, dependency);
            }

            dependency_chain.pop();
        }
    }
}

#[derive(Default)]
struct DependencyGraphEntry {
    dependencies: Vec<String>,
    params: Vec<String>,
}

impl DependencyGraphEntry {
    fn collect(&mut self, value: &Value) {
        match value {
            Value::Str(text) => match Reference::parse(text) {
                Reference::Component(name) => self.dependencies.push(name.to_string()),
                Reference::Param(key) => self.params.push(key.to_string()),
                Reference::Literal(_) => {}
            },
            Value::List(items) => items.iter().for_each(|item| self.collect(item)),
            Value::Map(map) => map.values().for_each(|item| self.collect(item)),
            _ => {}
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum DependencyGraphError {
    #[error("'{component}' has an invalid spec: {source}")]
    InvalidSpec {
        component: String,
        #[source]
        source: ConfigError,
    },
    #[error("'{required_by}' needs '{dependency}' but it is missing")]
    MissingDependency {
        dependency: String,
        required_by: String,
    },
    #[error("'{required_by}' needs config param '{param}' but it is missing")]
    MissingParam { param: String, required_by: String },
    #[error("A Circular Dependency exists between '{from}' and '{to}' through {}", .chain.join(" -> "))]
    CircularDependency {
        from: String,
        to: String,
        chain: Vec<String>,
    },
}
impl std::fmt::Display for DependencyGraphErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut display = Vec::new();
        display.push("The dependency graph had one or more errors:".to_string());
        for error in &self.errors {
            display.push(format!("- {}", error));
        }
        f.write_str(&display.join("\n"))
    }
}

#[derive(Error, Debug, Clone)]
pub struct DependencyGraphErrors {
    pub errors: Vec<DependencyGraphError>,
}
