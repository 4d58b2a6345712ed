//! Lazily wiring dependency container
//!
//! Components are described by raw specs (`class`, `factory`, `arguments`,
//! `properties`, `methods`, `scope`, `alias`) and built on first lookup.
//! Strings inside specs may refer to other components as `@name` and to
//! config params as `%key`.
//!
//! Classes and functions are reached by name through an [Invoker], usually a
//! [Registry] filled by the application.
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use wrapp_wiring::{value_map, Class, Container, Registry, Value};
//!
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! let registry = Registry::new().class(Class::new("Greeter", |args| {
//!     Ok(Greeter {
//!         greeting: args.string(0)?,
//!     })
//! }));
//!
//! let mut container = Container::with_maps(
//!     Arc::new(registry),
//!     value_map(json!({"greeter": {"class": "Greeter", "arguments": ["%greeting"]}})),
//!     value_map(json!({"greeting": "hello"})),
//! );
//!
//! let greeter = container.require::<Greeter>("greeter").unwrap();
//! assert_eq!(greeter.greeting, "hello");
//! ```

mod builder;
mod config;
mod container;
mod dependency_graph;
mod dependency_path;
mod errors;
mod invoker;
mod reference;
mod registry;
mod spec;
mod types;

pub use builder::ContainerBuilder;
pub use config::ContainerConfig;
pub use container::Container;
pub use dependency_graph::{DependencyGraph, DependencyGraphError, DependencyGraphErrors};
pub use errors::{ConfigError, InvocationError, Lookup, ReflectionError, WiringError};
pub use invoker::{Arguments, Callable, Invoker};
pub use reference::{escape, escape_str, Reference, COMPONENT_SIGIL, PARAM_SIGIL};
pub use registry::{Class, Registry};
pub use spec::{ComponentSpec, MethodCall, Scope};
pub use types::{value_map, DynError, Injectable, Instance, TypeInfo, Value, ValueMap};
