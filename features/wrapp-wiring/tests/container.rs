use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use serde_json::json;
use wrapp_wiring::{
    escape, value_map, Class, ComponentSpec, ConfigError, Container, ContainerConfig, Instance,
    InvocationError, Lookup, ReflectionError, Registry, Value, WiringError,
};

#[derive(Debug, Default)]
struct Alpha;

#[derive(Debug, Default)]
struct Beta {
    name: String,
    alpha: Option<Arc<Alpha>>,
}

/// Keeps its text behind a lock so it can be changed through a shared handle
#[derive(Debug, Default)]
struct Label {
    text: Mutex<String>,
}

/// Records the arguments of every call it receives
#[derive(Debug, Default)]
struct Recorder {
    calls: Vec<(String, Vec<Value>)>,
}

struct Fixture {
    built: Arc<AtomicUsize>,
    log: Arc<Mutex<Vec<String>>>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            built: Arc::new(AtomicUsize::new(0)),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn registry(&self) -> Registry {
        let built = self.built.clone();
        let log = self.log.clone();
        let factory_log = self.log.clone();

        Registry::new()
            .class(Class::new("Alpha", move |_| {
                built.fetch_add(1, Ordering::SeqCst);
                Ok(Alpha)
            }))
            .class(
                Class::new("Beta", |args| {
                    Ok(Beta {
                        name: args.value_or_null(0).as_str().unwrap_or("unnamed").to_string(),
                        alpha: None,
                    })
                })
                .property("name", move |beta, value| {
                    log.lock().unwrap().push(format!("name={}", value.repr()));
                    beta.name = value.as_str().unwrap_or_default().to_string();
                    Ok(())
                })
                .property("alpha", |beta, value| {
                    beta.alpha = value.downcast::<Alpha>();
                    Ok(())
                })
                .method("name", |beta, _| Ok(Value::from(beta.name.clone())))
                .static_method("named", |args| {
                    Ok(Value::Instance(Instance::new(Beta {
                        name: args.string(0)?,
                        alpha: None,
                    })))
                }),
            )
            .class(Class::<Recorder>::with_default("Recorder").method_mut(
                "record",
                |recorder, args| {
                    let label = args.string(0)?;
                    let rest = args.into_vec().into_iter().skip(1).collect();
                    recorder.calls.push((label, rest));
                    Ok(Value::Null)
                },
            ))
            .class(Class::<Label>::with_default("Label").property_shared(
                "text",
                |label, value| {
                    *label.text.lock().unwrap() = value.as_str().unwrap_or_default().to_string();
                    Ok(())
                },
            ))
            .function("make_beta", move |args| {
                factory_log.lock().unwrap().push("make_beta".to_string());
                Ok(Value::Instance(Instance::new(Beta {
                    name: args.string(0)?,
                    alpha: args.instance::<Alpha>(1).ok(),
                })))
            })
            .function("identity", |args| Ok(args.value_or_null(0)))
            .function("fail", |_| Err(InvocationError::failed("factory exploded")))
    }

    fn container(&self, components: serde_json::Value, params: serde_json::Value) -> Container {
        Container::with_maps(
            Arc::new(self.registry()),
            value_map(components),
            value_map(params),
        )
    }

    fn built(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }
}

fn instance(value: &Value) -> &Instance {
    value.as_instance().expect("expected an instance")
}

#[test]
fn plain_values_pass_through_dereference_and_escape() {
    let fixture = Fixture::new();
    let mut container = fixture.container(json!({}), json!({}));

    for raw in [
        json!(null),
        json!(true),
        json!(12),
        json!(1.5),
        json!("plain"),
        json!(""),
        json!("mail@example.org"),
    ] {
        let value = Value::from(raw);
        assert_eq!(container.dereference(&value).unwrap(), value);
        assert_eq!(escape(&value), value);
    }

    let owned = Value::Instance(Instance::new(Alpha));
    assert_eq!(container.dereference(&owned).unwrap(), owned);
    assert_eq!(Container::escape(&owned), owned);
}

#[test]
fn escaped_values_dereference_to_the_original() {
    let fixture = Fixture::new();
    let mut container = fixture.container(json!({"X": "Alpha"}), json!({"p": 1}));

    let value = Value::from(json!({
        "component": "@X",
        "param": "%p",
        "already": "@@X",
        "list": ["@X", "%%p", "text", 3],
    }));
    assert_eq!(container.dereference(&escape(&value)).unwrap(), value);
    assert_eq!(fixture.built(), 0);
}

#[test]
fn escape_and_dereference_examples() {
    let fixture = Fixture::new();
    let mut container = fixture.container(json!({"X": "Alpha"}), json!({}));

    assert_eq!(escape(&Value::from("@X")), Value::from("@@X"));
    assert_eq!(escape(&Value::from("%X")), Value::from("%%X"));
    assert_eq!(
        container.dereference(&Value::from("@@X")).unwrap(),
        Value::from("@X")
    );

    let resolved = container.dereference(&Value::from("@X")).unwrap();
    let cached = container.get_component("X").unwrap();
    assert!(instance(&resolved).ptr_eq(instance(&cached)));
}

#[test]
fn nested_structures_are_dereferenced_in_order() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({"alpha": "Alpha"}),
        json!({"db": {"host": "localhost"}, "port": 5432}),
    );

    let value = container
        .dereference(&Value::from(json!({
            "db": "%db",
            "ports": ["%port", "%%port"],
            "service": {"inner": ["@alpha"]},
        })))
        .unwrap();

    let map = value.as_map().unwrap();
    assert_eq!(map.keys().collect::<Vec<_>>(), ["db", "ports", "service"]);
    assert_eq!(map["db"], Value::from(json!({"host": "localhost"})));
    assert_eq!(map["ports"], Value::from(json!([5432, "%port"])));

    let inner = &map["service"].as_map().unwrap()["inner"].as_list().unwrap()[0];
    assert!(inner.downcast::<Alpha>().is_some());
}

#[test]
fn singletons_are_built_once() {
    let fixture = Fixture::new();
    let mut container = fixture.container(json!({"alpha": "Alpha"}), json!({}));

    let first = container.require::<Alpha>("alpha").unwrap();
    let second = container.require::<Alpha>("alpha").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(fixture.built(), 1);
}

#[test]
fn prototypes_are_built_every_time() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({"beta": {"class": "Beta", "arguments": ["proto"], "scope": "prototype"}}),
        json!({}),
    );

    let first = container.require::<Beta>("beta").unwrap();
    let second = container.require::<Beta>("beta").unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.name, second.name);
    assert_eq!(first.name, "proto");
}

#[test]
fn unknown_scope_is_cached() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({"alpha": {"class": "Alpha", "scope": "request"}}),
        json!({}),
    );

    container.get_component("alpha").unwrap();
    container.get_component("alpha").unwrap();
    assert_eq!(fixture.built(), 1);
}

#[test]
fn alias_returns_the_target_instance() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({
            "A": {"alias": "B"},
            "B": {"class": "Alpha"},
            "C": {"alias": "A"},
        }),
        json!({}),
    );

    let through_alias = container.get_component("A").unwrap();
    let direct = container.get_component("B").unwrap();
    let chained = container.get_component("C").unwrap();

    assert!(instance(&through_alias).ptr_eq(instance(&direct)));
    assert!(instance(&chained).ptr_eq(instance(&direct)));
    assert_eq!(fixture.built(), 1);

    // Aliases are never cached under their own name
    container.clear_component("B");
    let rebuilt = container.get_component("A").unwrap();
    assert!(!instance(&rebuilt).ptr_eq(instance(&direct)));
}

#[test]
fn dependency_loop_reports_the_path() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({
            "A": {"class": "Alpha", "arguments": ["@B"]},
            "B": {"class": "Alpha", "arguments": ["@C"]},
            "C": {"class": "Alpha", "arguments": ["@A"]},
        }),
        json!({}),
    );

    let err = container.get_component("A").unwrap_err();
    assert!(err.is_dependency_loop());
    assert_eq!(err.to_string(), "Dependency loop detected: A -> B -> C -> A");
    assert_eq!(fixture.built(), 0);

    // Entering from another component reports the path from there
    let err = container.get_component("B").unwrap_err();
    assert_eq!(err.to_string(), "Dependency loop detected: B -> C -> A -> B");
}

#[test]
fn loops_through_properties_and_methods() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({
            "beta": {"class": "Beta", "properties": {"alpha": "@recorder"}},
            "recorder": {
                "class": "Recorder",
                "methods": [{"method": "record", "arguments": ["x", ["@beta"]]}],
            },
        }),
        json!({}),
    );

    let err = container.get_component("beta").unwrap_err();
    assert!(err.is_dependency_loop());
    assert_eq!(err.to_string(), "Dependency loop detected: beta -> recorder -> beta");

    let err = container.get_component("recorder").unwrap_err();
    assert_eq!(err.to_string(), "Dependency loop detected: recorder -> beta -> recorder");
}

#[test]
fn alias_loops_are_detected() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({"A": {"alias": "B"}, "B": {"alias": "A"}}),
        json!({}),
    );

    let err = container.get_component("A").unwrap_err();
    assert_eq!(err.to_string(), "Dependency loop detected: A -> B -> A");
}

#[test]
fn cached_dependencies_are_not_a_loop() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({
            "alpha": "Alpha",
            "beta": {"class": "Beta", "properties": {"alpha": "@alpha"}},
            "gamma": {"class": "Beta", "arguments": ["@alpha"], "properties": {"alpha": "@alpha"}},
        }),
        json!({}),
    );

    container.get_component("beta").unwrap();
    container.get_component("gamma").unwrap();
    assert_eq!(fixture.built(), 1);
}

#[test]
fn unknown_names_are_not_found() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({"beta": {"class": "Beta", "arguments": ["@ghost"]}}),
        json!({}),
    );

    let err = container.get_component("missing").unwrap_err();
    assert!(matches!(
        &err,
        WiringError::NotFound { kind: Lookup::Component, name } if name == "missing"
    ));
    assert_eq!(err.to_string(), r#"Component not found in container: "missing""#);

    assert!(container.get_component("beta").unwrap_err().is_not_found());
    assert!(!container.has_component("missing"));
}

#[test]
fn non_callable_factory_fails_before_arguments() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({
            "alpha": "Alpha",
            "bad": {"factory": "no_such_function", "arguments": ["@alpha"]},
            "numeric": {"factory": 42, "arguments": ["@alpha"]},
            "static": {"factory": ["Beta", "missing"], "arguments": ["@alpha"]},
        }),
        json!({}),
    );

    let err = container.get_component("bad").unwrap_err();
    assert!(matches!(err, WiringError::Config(ConfigError::FactoryNotCallable(_))));
    assert_eq!(err.to_string(), r#"Factory is not callable: "no_such_function""#);

    let err = container.get_component("numeric").unwrap_err();
    assert_eq!(err.to_string(), "Factory is not callable: 42");

    assert!(container.get_component("static").unwrap_err().is_config());

    assert_eq!(fixture.built(), 0);
    assert!(container.get_components().contains_key("alpha"));
}

#[test]
fn null_factory_is_not_callable() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({
            "alpha": "Alpha",
            "Alpha": {"factory": null, "arguments": ["@alpha"]},
        }),
        json!({}),
    );

    let err = container.get_component("Alpha").unwrap_err();
    assert!(matches!(err, WiringError::Config(ConfigError::FactoryNotCallable(_))));
    assert_eq!(err.to_string(), "Factory is not callable: null");
    assert_eq!(fixture.built(), 0);
}

#[test]
fn factories_build_components() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({
            "alpha": "Alpha",
            "by_function": {"factory": "make_beta", "arguments": ["%name", "@alpha"]},
            "by_static": {"factory": "Beta::named", "arguments": ["static"]},
            "by_pair": {"factory": ["Beta", "named"], "arguments": ["pair"]},
        }),
        json!({"name": "function"}),
    );

    let beta = container.require::<Beta>("by_function").unwrap();
    assert_eq!(beta.name, "function");
    assert!(beta.alpha.is_some());
    assert_eq!(container.require::<Beta>("by_static").unwrap().name, "static");
    assert_eq!(container.require::<Beta>("by_pair").unwrap().name, "pair");
    assert_eq!(*fixture.log.lock().unwrap(), ["make_beta"]);
}

#[test]
fn bound_method_factory() {
    let fixture = Fixture::new();
    let source = Instance::new(Beta {
        name: "source".into(),
        alpha: None,
    });
    let mut container = Container::builder(Arc::new(fixture.registry()))
        .component(
            "copy",
            ComponentSpec::factory(vec![Value::from(source), Value::from("name")]),
        )
        .build();

    assert_eq!(container.get_component("copy").unwrap(), Value::from("source"));
}

#[test]
fn failing_factory_is_a_reflection_error() {
    let fixture = Fixture::new();
    let mut container = fixture.container(json!({"broken": {"factory": "fail"}}), json!({}));

    let err = container.get_component("broken").unwrap_err();
    assert!(matches!(err, WiringError::Reflection(ReflectionError::Factory { .. })));
    assert_eq!(err.to_string(), "Cannot call factory by reflection: factory exploded");
}

#[test]
fn unknown_class_fails_before_arguments() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({
            "alpha": "Alpha",
            "ghost": {"class": "Ghost", "arguments": ["@alpha"]},
            "Unregistered": null,
        }),
        json!({}),
    );

    let err = container.get_component("ghost").unwrap_err();
    assert!(err.is_reflection());
    assert_eq!(err.to_string(), r#"Class not found: "Ghost""#);
    assert_eq!(fixture.built(), 0);

    // Null spec constructs the class named like the component
    assert_eq!(
        container.get_component("Unregistered").unwrap_err().to_string(),
        r#"Class not found: "Unregistered""#
    );
}

#[test]
fn shorthand_specs() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({"Alpha": null, "beta": "Beta", "bad": 1}),
        json!({}),
    );

    assert!(container.require::<Alpha>("Alpha").is_ok());
    assert_eq!(container.require::<Beta>("beta").unwrap().name, "unnamed");

    let err = container.get_component("bad").unwrap_err();
    assert!(matches!(err, WiringError::Config(ConfigError::NotAMap(_))));
    assert_eq!(err.to_string(), "Component configuration is not a map: 1");
}

#[test]
fn properties_are_dereferenced_and_set_in_order() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({
            "alpha": "Alpha",
            "beta": {
                "class": "Beta",
                "properties": {"name": "%beta.name", "alpha": "@alpha"},
            },
            "literal": {"class": "Beta", "properties": {"name": "@@handle"}},
        }),
        json!({"beta.name": "configured"}),
    );

    let beta = container.require::<Beta>("beta").unwrap();
    assert_eq!(beta.name, "configured");
    let alpha = container.require::<Alpha>("alpha").unwrap();
    assert!(Arc::ptr_eq(beta.alpha.as_ref().unwrap(), &alpha));

    assert_eq!(container.require::<Beta>("literal").unwrap().name, "@handle");
    assert_eq!(
        *fixture.log.lock().unwrap(),
        [r#"name="configured""#, r#"name="@handle""#]
    );
}

#[test]
fn unknown_property_is_a_reflection_error() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({"beta": {"class": "Beta", "properties": {"colour": "red"}}}),
        json!({}),
    );

    let err = container.get_component("beta").unwrap_err();
    assert!(err.to_string().ends_with("has no property 'colour'"), "{err}");
    assert!(matches!(err, WiringError::Reflection(ReflectionError::Property { .. })));
}

#[test]
fn methods_are_called_in_order() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({
            "alpha": "Alpha",
            "recorder": {
                "class": "Recorder",
                "methods": [
                    {"method": "record", "arguments": ["first", "%level", "@alpha"]},
                    {"method": "record", "arguments": ["second"]},
                ],
            },
        }),
        json!({"level": 3}),
    );

    let recorder = container.require::<Recorder>("recorder").unwrap();
    assert_eq!(recorder.calls.len(), 2);
    assert_eq!(recorder.calls[0].0, "first");
    assert_eq!(recorder.calls[0].1[0], Value::Int(3));
    assert!(recorder.calls[0].1[1].downcast::<Alpha>().is_some());
    assert_eq!(recorder.calls[1], ("second".to_string(), vec![]));
}

#[test]
fn method_entries_need_a_method() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({"recorder": {"class": "Recorder", "methods": [{"arguments": ["x"]}]}}),
        json!({}),
    );

    let err = container.get_component("recorder").unwrap_err();
    assert!(matches!(err, WiringError::Config(ConfigError::MissingMethod(_))));
    assert_eq!(err.to_string(), r#"Missing method in: {"arguments":["x"]}"#);
}

#[test]
fn exclusive_methods_need_a_fresh_instance() {
    let fixture = Fixture::new();
    let mut container = Container::builder(Arc::new(fixture.registry()))
        .instance("recorder", Instance::new(Recorder::default()))
        .component(
            "shared",
            ComponentSpec::factory("identity")
                .argument("@recorder")
                .call("record", vec![Value::from("x")]),
        )
        .build();

    // The factory hands back the cached handle, it cannot be changed in place
    let err = container.get_component("shared").unwrap_err();
    assert!(matches!(
        err,
        WiringError::Reflection(ReflectionError::Method {
            source: InvocationError::SharedInstance { .. },
            ..
        })
    ));
}

#[test]
fn shared_properties_on_factory_results() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({
            "base": "Label",
            "configured": {
                "factory": "identity",
                "arguments": ["@base"],
                "properties": {"text": "%text"},
            },
        }),
        json!({"text": "configured"}),
    );

    let configured = container.require::<Label>("configured").unwrap();
    let base = container.require::<Label>("base").unwrap();
    assert!(Arc::ptr_eq(&configured, &base));
    assert_eq!(*base.text.lock().unwrap(), "configured");
}

#[test]
fn set_has_clear() {
    let fixture = Fixture::new();
    let mut container = fixture.container(json!({"alpha": "Alpha"}), json!({}));

    assert!(container.has_component("alpha"));
    let built = container.get_component("alpha").unwrap();

    // Registered values shadow specs
    container.set_component("alpha", "override");
    assert_eq!(container.get_component("alpha").unwrap(), Value::from("override"));

    // Clearing drops the cache entry, the spec is still there
    container.clear_component("alpha");
    assert!(container.has_component("alpha"));
    let rebuilt = container.get_component("alpha").unwrap();
    assert!(!instance(&rebuilt).ptr_eq(instance(&built)));
    assert_eq!(fixture.built(), 2);

    // Registered values without a spec are gone once cleared
    container.set_component("extra", 5).clear_component("extra");
    assert!(!container.has_component("extra"));
    container.clear_component("never-there");
}

#[test]
fn property_style_aliases() {
    let fixture = Fixture::new();
    let mut container = fixture.container(json!({}), json!({}));

    container.set("answer", 42);
    assert!(container.has("answer"));
    assert_eq!(container.get("answer").unwrap(), Value::Int(42));
    container.delete("answer");
    assert!(!container.has("answer"));
    assert!(container.get("answer").unwrap_err().is_not_found());
}

#[test]
fn require_reports_type_mismatch() {
    let fixture = Fixture::new();
    let mut container = fixture.container(json!({"alpha": "Alpha"}), json!({}));
    container.set_component("number", 7);

    let err = container.require::<Beta>("alpha").unwrap_err();
    assert!(matches!(err, WiringError::TypeMismatch { .. }));
    assert!(err.to_string().contains("Alpha"), "{err}");

    let err = container.require::<Alpha>("number").unwrap_err();
    assert!(matches!(
        err,
        WiringError::TypeMismatch { actual, .. } if actual == "int"
    ));
}

#[test]
fn config_params() {
    let fixture = Fixture::new();
    let mut container = fixture.container(json!({}), json!({"host": "localhost"}));

    assert_eq!(container.get_config_param("host"), Some(&Value::from("localhost")));
    assert_eq!(container.get_config_param("port"), None);
    assert_eq!(container.get_config_param_or("port", 25), Value::Int(25));

    container.set_config_param("port", 2525);
    assert_eq!(container.get_config_param_or("port", 25), Value::Int(2525));
    assert_eq!(
        container.get_config_params().keys().collect::<Vec<_>>(),
        ["host", "port"]
    );
}

#[test]
fn missing_params_use_the_default() {
    let fixture = Fixture::new();
    let mut lenient = fixture.container(json!({}), json!({}));
    assert_eq!(lenient.dereference(&Value::from("%absent")).unwrap(), Value::Null);

    let mut defaulted = Container::builder(Arc::new(fixture.registry()))
        .config(ContainerConfig::default().with_param_default("n/a"))
        .build();
    assert_eq!(
        defaulted.dereference(&Value::from("%absent")).unwrap(),
        Value::from("n/a")
    );
}

#[test]
fn strict_params_fail_when_missing() {
    let fixture = Fixture::new();
    let mut container = Container::builder(Arc::new(fixture.registry()))
        .component("beta", json!({"class": "Beta", "arguments": ["%absent"]}))
        .param("present", "yes")
        .config(ContainerConfig::strict())
        .build();

    let err = container.get_component("beta").unwrap_err();
    assert!(matches!(
        &err,
        WiringError::NotFound { kind: Lookup::Param, name } if name == "absent"
    ));
    assert_eq!(err.to_string(), r#"Config param not found in container: "absent""#);
    assert_eq!(
        container.dereference(&Value::from("%present")).unwrap(),
        Value::from("yes")
    );
}

#[test]
fn merge_overwrites_by_key() {
    let fixture = Fixture::new();
    let mut container = fixture.container(
        json!({"a": "Alpha", "b": "Alpha"}),
        json!({"x": 1, "y": 2}),
    );

    container.merge(
        value_map(json!({"b": "Beta", "c": "Beta"})),
        value_map(json!({"y": 20, "z": 30})),
    );

    assert_eq!(container.get_components().len(), 3);
    assert_eq!(container.get_components()["b"], Value::from("Beta"));
    assert_eq!(
        container.get_config_params(),
        &value_map(json!({"x": 1, "y": 20, "z": 30}))
    );
    assert!(container.require::<Beta>("b").is_ok());
}

#[test]
fn builder_specs_resolve() {
    let fixture = Fixture::new();
    let mut container = Container::builder(Arc::new(fixture.registry()))
        .component("alpha", ComponentSpec::class("Alpha"))
        .component(
            "beta",
            ComponentSpec::class("Beta")
                .argument("%name")
                .property("alpha", "@alpha")
                .prototype(),
        )
        .component("main", ComponentSpec::alias("beta"))
        .param("name", "built")
        .build();

    container.validate().unwrap();
    let beta = container.require::<Beta>("main").unwrap();
    assert_eq!(beta.name, "built");
    assert!(beta.alpha.is_some());
    assert!(!Arc::ptr_eq(&beta, &container.require::<Beta>("main").unwrap()));
}
