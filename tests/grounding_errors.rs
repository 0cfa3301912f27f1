use fluentsim::ast::{from_json, from_json_file, to_json_pretty, CpfDef, PVariableDecl};
use fluentsim::domains::recon;
use fluentsim::{
    ground, DomainDef, Expr, InstanceDef, InstantiationError, ModelError, SimError, ValueType,
};

fn declarations() -> DomainDef {
    DomainDef::new("toy")
        .with_types(&["t"])
        .with_pvariable(PVariableDecl::non_fluent("W", ValueType::Real, &["t"], 1.0))
        .with_pvariable(PVariableDecl::state("s", ValueType::Bool, &["t"], false))
        .with_pvariable(PVariableDecl::observ("o", ValueType::Bool, &["t"]))
        .with_pvariable(PVariableDecl::action("go", ValueType::Bool, &["t"], false))
}

fn state_cpf() -> CpfDef {
    CpfDef::new("s", &["?x"], Expr::kron_delta(Expr::fluent("go", &["?x"])))
}

fn observ_cpf() -> CpfDef {
    CpfDef::new("o", &["?x"], Expr::kron_delta(Expr::next("s", &["?x"])))
}

fn toy() -> DomainDef {
    declarations().with_cpf(state_cpf()).with_cpf(observ_cpf())
}

fn toy_instance() -> InstanceDef {
    InstanceDef::new("toy_inst", "toy")
        .with_objects("t", &["a", "b"])
        .with_horizon(3)
}

fn model_error(domain: &DomainDef, instance: &InstanceDef) -> ModelError {
    match ground(domain, instance).unwrap_err() {
        SimError::Model(e) => e,
        other => panic!("expected a model error, got {other:?}"),
    }
}

fn instantiation_error(domain: &DomainDef, instance: &InstanceDef) -> InstantiationError {
    match ground(domain, instance).unwrap_err() {
        SimError::Instantiation(e) => e,
        other => panic!("expected an instantiation error, got {other:?}"),
    }
}

#[test]
fn toy_model_grounds() {
    let model = ground(&toy(), &toy_instance()).unwrap();
    assert_eq!(model.domain_name(), "toy");
    assert_eq!(model.instance_name(), "toy_inst");
    assert_eq!(model.horizon(), 3);
    assert_eq!(model.non_fluent("W", &["b"]), Some(fluentsim::Value::Real(1.0)));
    assert_eq!(model.object_domain("t").unwrap().objects(), ["a", "b"]);
}

#[test]
fn unknown_parameter_type() {
    let domain = toy().with_pvariable(PVariableDecl::non_fluent("Q", ValueType::Real, &["ghost"], 0.0));
    assert!(matches!(
        model_error(&domain, &toy_instance()),
        ModelError::UnknownType { type_name, .. } if type_name == "ghost"
    ));
}

#[test]
fn unknown_quantifier_type() {
    let domain = toy().with_reward(Expr::sum(&[("?g", "ghost")], Expr::real(1.0)));
    assert!(matches!(
        model_error(&domain, &toy_instance()),
        ModelError::UnknownType { type_name, context } if type_name == "ghost" && context == "reward"
    ));
}

#[test]
fn object_outside_its_domain() {
    let instance = toy_instance().with_non_fluent("W", &["zz"], 2.0);
    assert!(matches!(
        model_error(&toy(), &instance),
        ModelError::ObjectOutOfDomain { object, .. } if object == "zz"
    ));

    let domain = toy().with_types(&["u"]).with_reward(Expr::fluent("W", &["c"]));
    let instance = toy_instance().with_objects("u", &["c"]);
    assert!(matches!(
        model_error(&domain, &instance),
        ModelError::ObjectOutOfDomain { object, type_name, .. } if object == "c" && type_name == "t"
    ));
}

#[test]
fn wrong_argument_count() {
    let domain = toy().with_reward(Expr::fluent("W", &[]));
    assert!(matches!(
        model_error(&domain, &toy_instance()),
        ModelError::ArityMismatch { expected: 1, actual: 0, .. }
    ));

    let instance = toy_instance().with_init("s", &["a", "b"], true);
    assert!(matches!(
        model_error(&toy(), &instance),
        ModelError::ArityMismatch { expected: 1, actual: 2, .. }
    ));

    let domain = declarations()
        .with_cpf(CpfDef::new("s", &[], Expr::bool(false)))
        .with_cpf(observ_cpf());
    assert!(matches!(
        model_error(&domain, &toy_instance()),
        ModelError::ArityMismatch { expected: 1, actual: 0, .. }
    ));
}

#[test]
fn unbound_variable() {
    let domain = toy().with_reward(Expr::fluent("W", &["?z"]));
    assert!(matches!(
        model_error(&domain, &toy_instance()),
        ModelError::UnboundVariable { .. }
    ));
}

#[test]
fn variable_of_the_wrong_type() {
    let domain = toy()
        .with_types(&["u"])
        .with_reward(Expr::sum(&[("?y", "u")], Expr::fluent("W", &["?y"])));
    let instance = toy_instance().with_objects("u", &["c"]);
    assert!(matches!(
        model_error(&domain, &instance),
        ModelError::VariableTypeMismatch { .. }
    ));
}

#[test]
fn unknown_fluent_in_expression() {
    let domain = toy().with_reward(Expr::fluent("nope", &[]));
    assert!(matches!(
        model_error(&domain, &toy_instance()),
        ModelError::UnknownFluent { name, .. } if name == "nope"
    ));
}

#[test]
fn observations_depending_on_each_other() {
    let domain = declarations()
        .with_pvariable(PVariableDecl::observ("p", ValueType::Bool, &["t"]))
        .with_cpf(state_cpf())
        .with_cpf(CpfDef::new("o", &["?x"], Expr::kron_delta(Expr::fluent("p", &["?x"]))))
        .with_cpf(CpfDef::new("p", &["?x"], Expr::kron_delta(Expr::fluent("o", &["?x"]))));
    let ModelError::CyclicDependency { cycle } = model_error(&domain, &toy_instance()) else {
        panic!("expected a cycle");
    };
    assert!(cycle.contains(&"o".to_string()));
    assert!(cycle.contains(&"p".to_string()));
}

#[test]
fn observation_chain_is_ordered() {
    let domain = declarations()
        .with_pvariable(PVariableDecl::observ("a_seen", ValueType::Bool, &["t"]))
        .with_cpf(state_cpf())
        .with_cpf(CpfDef::new("a_seen", &["?x"], Expr::kron_delta(Expr::fluent("o", &["?x"]))))
        .with_cpf(observ_cpf());
    let model = ground(&domain, &toy_instance()).unwrap();
    let order: Vec<&str> = model
        .observ_cpfs()
        .iter()
        .map(|c| model.pvariables()[c.target()].name())
        .collect();
    assert_eq!(order, vec!["o", "a_seen"]);
}

#[test]
fn illegal_references() {
    // A state CPF reading its own next value.
    let domain = declarations()
        .with_cpf(CpfDef::new("s", &["?x"], Expr::kron_delta(Expr::next("s", &["?x"]))))
        .with_cpf(observ_cpf());
    assert!(matches!(
        model_error(&domain, &toy_instance()),
        ModelError::IllegalReference { fluent, .. } if fluent == "s"
    ));

    // The reward cannot see observations.
    let domain = toy().with_reward(Expr::fluent("o", &["a"]));
    assert!(matches!(
        model_error(&domain, &toy_instance()),
        ModelError::IllegalReference { fluent, context, .. } if fluent == "o" && context == "reward"
    ));

    // Non-fluents have no next value.
    let domain = toy().with_constraint(Expr::next("W", &["a"]));
    assert!(matches!(
        model_error(&domain, &toy_instance()),
        ModelError::IllegalReference { .. }
    ));
}

#[test]
fn every_state_and_observ_fluent_needs_a_cpf() {
    let domain = declarations().with_cpf(observ_cpf());
    assert!(matches!(
        model_error(&domain, &toy_instance()),
        ModelError::MissingCpf { fluent } if fluent == "s"
    ));
}

#[test]
fn cpf_for_a_non_fluent() {
    let domain = toy().with_cpf(CpfDef::new("W", &["?x"], Expr::real(1.0)));
    assert!(matches!(
        model_error(&domain, &toy_instance()),
        ModelError::UnexpectedCpf { fluent } if fluent == "W"
    ));
}

#[test]
fn duplicate_declarations() {
    let domain = toy().with_pvariable(PVariableDecl::state("s", ValueType::Bool, &["t"], false));
    assert!(matches!(
        model_error(&domain, &toy_instance()),
        ModelError::Duplicate { .. }
    ));
}

#[test]
fn default_outside_the_range() {
    let domain = toy().with_pvariable(PVariableDecl::non_fluent("FLAG", ValueType::Bool, &[], 0.5));
    assert!(matches!(
        model_error(&domain, &toy_instance()),
        ModelError::InvalidDefault { fluent, .. } if fluent == "FLAG"
    ));
}

#[test]
fn empty_object_domain() {
    let instance = InstanceDef::new("toy_inst", "toy").with_objects("t", &[]);
    assert!(matches!(
        instantiation_error(&toy(), &instance),
        InstantiationError::EmptyObjectDomain { type_name } if type_name == "t"
    ));
}

#[test]
fn instance_for_another_domain() {
    let instance = InstanceDef::new("toy_inst", "other").with_objects("t", &["a"]);
    assert!(matches!(
        instantiation_error(&toy(), &instance),
        InstantiationError::DomainMismatch { .. }
    ));
}

#[test]
fn episode_parameters() {
    let instance = toy_instance().with_horizon(0);
    assert_eq!(instantiation_error(&toy(), &instance), InstantiationError::InvalidHorizon);

    let instance = toy_instance().with_discount(1.5);
    assert!(matches!(
        instantiation_error(&toy(), &instance),
        InstantiationError::InvalidDiscount { .. }
    ));
}

#[test]
fn bad_object_declarations() {
    let instance = toy_instance().with_objects("ghost", &["g"]);
    assert!(matches!(
        instantiation_error(&toy(), &instance),
        InstantiationError::UnknownObjectType { type_name } if type_name == "ghost"
    ));

    let instance = InstanceDef::new("toy_inst", "toy").with_objects("t", &["a", "a"]);
    assert!(matches!(
        instantiation_error(&toy(), &instance),
        InstantiationError::DuplicateObject { object } if object == "a"
    ));
}

#[test]
fn bad_assignments() {
    let instance = toy_instance().with_init("s", &["a"], 0.5);
    assert!(matches!(
        instantiation_error(&toy(), &instance),
        InstantiationError::ValueTypeMismatch { fluent, .. } if fluent == "s"
    ));

    let instance = toy_instance().with_init("nope", &[], true);
    assert!(matches!(
        instantiation_error(&toy(), &instance),
        InstantiationError::UndeclaredFluent { fluent, .. } if fluent == "nope"
    ));

    let instance = toy_instance().with_init("W", &["a"], 2.0);
    assert!(matches!(
        instantiation_error(&toy(), &instance),
        InstantiationError::WrongFluentKind { fluent, context, .. } if fluent == "W" && context == "init-state"
    ));
}

#[test]
fn json_round_trip_keeps_the_fingerprint() {
    let domain = recon::domain();
    let instance = recon::instance();
    let original = ground(&domain, &instance).unwrap();

    let domain: DomainDef = from_json(&to_json_pretty(&domain).unwrap()).unwrap();
    let instance: InstanceDef = from_json(&to_json_pretty(&instance).unwrap()).unwrap();
    let reloaded = ground(&domain, &instance).unwrap();

    assert_eq!(original.fingerprint(), reloaded.fingerprint());
    assert_eq!(original.initial_state(), reloaded.initial_state());

    let other = ground(&domain, &instance.with_horizon(7)).unwrap();
    assert_ne!(original.fingerprint(), other.fingerprint());
}

#[test]
fn definitions_load_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("toy.json");
    std::fs::write(&path, to_json_pretty(&toy()).unwrap()).unwrap();

    let domain: DomainDef = from_json_file(&path).unwrap();
    assert_eq!(domain, toy());
    ground(&domain, &toy_instance()).unwrap();

    assert!(from_json_file::<DomainDef>(dir.path().join("missing.json")).is_err());
}
