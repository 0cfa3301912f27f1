use fluentsim::domains::elevators;
use fluentsim::{
    ground, Action, ActionError, EngineConfig, FluentKind, InstanceDef, SimError, TransitionEngine, Value,
};

/// One elevator at the ground floor of a three-floor building, no arrivals.
fn quiet() -> InstanceDef {
    InstanceDef::new("elevators_quiet", elevators::DOMAIN_NAME)
        .with_objects("elevator", &["e0"])
        .with_objects("floor", &["f0", "f1", "f2"])
        .with_non_fluent("ADJACENT-UP", &["f0", "f1"], true)
        .with_non_fluent("ADJACENT-UP", &["f1", "f2"], true)
        .with_non_fluent("TOP-FLOOR", &["f2"], true)
        .with_non_fluent("BOTTOM-FLOOR", &["f0"], true)
        .with_init("elevator-at-floor", &["e0", "f0"], true)
        .with_horizon(20)
}

fn engine(instance: &InstanceDef) -> TransitionEngine {
    let model = ground(&elevators::domain(), instance).unwrap();
    TransitionEngine::new(model, &EngineConfig::default().with_seed(4)).unwrap()
}

fn holds(engine: &TransitionEngine, name: &str, args: &[&str]) -> bool {
    engine.state_value(name, args) == Some(Value::Bool(true))
}

fn act(name: &str) -> Action {
    Action::noop().with(name, &["e0"], true)
}

#[test]
fn bundled_instance_grounds() {
    let model = elevators::model().unwrap();
    assert_eq!(model.ground_count(FluentKind::StateFluent), 13);
    assert_eq!(model.ground_count(FluentKind::ActionFluent), 4);
    assert_eq!(model.ground_count(FluentKind::ObservFluent), 0);
    assert_eq!(model.horizon(), 40);
    assert_eq!(model.max_nondef_actions(), None);
}

#[test]
fn elevator_moves_in_its_direction() {
    let mut engine = engine(&quiet());
    assert!(holds(&engine, "elevator-dir-up", &["e0"]));
    assert!(holds(&engine, "elevator-closed", &["e0"]));

    engine.step(&act("move-current-dir")).unwrap();
    assert!(holds(&engine, "elevator-at-floor", &["e0", "f1"]));
    assert!(!holds(&engine, "elevator-at-floor", &["e0", "f0"]));

    engine.step(&act("move-current-dir")).unwrap();
    assert!(holds(&engine, "elevator-at-floor", &["e0", "f2"]));

    // Already at the top: stays put.
    engine.step(&act("move-current-dir")).unwrap();
    assert!(holds(&engine, "elevator-at-floor", &["e0", "f2"]));
}

#[test]
fn open_door_blocks_movement_and_sets_direction() {
    let mut engine = engine(&quiet());

    engine.step(&act("open-door-going-down")).unwrap();
    assert!(!holds(&engine, "elevator-closed", &["e0"]));
    assert!(!holds(&engine, "elevator-dir-up", &["e0"]));

    engine.step(&act("move-current-dir")).unwrap();
    assert!(holds(&engine, "elevator-at-floor", &["e0", "f0"]));

    engine.step(&act("close-door")).unwrap();
    assert!(holds(&engine, "elevator-closed", &["e0"]));
}

#[test]
fn passenger_boards_and_rides() {
    let instance = quiet().with_init("person-waiting-up", &["f0"], true);
    let mut engine = engine(&instance);

    // The door only counts as open from the next step on.
    let t1 = engine.step(&act("open-door-going-up")).unwrap();
    assert_eq!(t1.reward, -1.0);
    assert!(holds(&engine, "person-waiting-up", &["f0"]));

    let t2 = engine.step(&Action::noop()).unwrap();
    assert_eq!(t2.reward, -1.0);
    assert!(holds(&engine, "person-in-elevator-going-up", &["e0"]));
    assert!(!holds(&engine, "person-waiting-up", &["f0"]));

    let t3 = engine.step(&act("close-door")).unwrap();
    assert_eq!(t3.reward, -0.75);

    engine.step(&act("move-current-dir")).unwrap();
    engine.step(&act("move-current-dir")).unwrap();
    assert!(holds(&engine, "elevator-at-floor", &["e0", "f2"]));

    // Riders leave at the top floor.
    engine.step(&Action::noop()).unwrap();
    assert!(!holds(&engine, "person-in-elevator-going-up", &["e0"]));
}

#[test]
fn riders_heading_the_wrong_way_cost_more() {
    let instance = quiet()
        .with_init("person-in-elevator-going-down", &["e0"], true)
        .with_init("elevator-at-floor", &["e0", "f1"], true)
        .with_init("elevator-at-floor", &["e0", "f0"], false);
    let mut engine = engine(&instance);

    let t = engine.step(&Action::noop()).unwrap();
    assert_eq!(t.reward, -3.0);
}

#[test]
fn waiting_passengers_cost_one_each() {
    let instance = quiet()
        .with_init("person-waiting-up", &["f1"], true)
        .with_init("person-waiting-down", &["f2"], true);
    let mut engine = engine(&instance);

    for _ in 0..3 {
        let t = engine.step(&Action::noop()).unwrap();
        assert_eq!(t.reward, -2.0);
    }
}

#[test]
fn certain_arrivals_fill_the_floor() {
    let instance = quiet().with_non_fluent("ARRIVE-PARAM", &["f1"], 1.0);
    let mut engine = engine(&instance);

    engine.step(&Action::noop()).unwrap();
    assert!(holds(&engine, "person-waiting-up", &["f1"]));
    assert!(holds(&engine, "person-waiting-down", &["f1"]));
    assert!(!holds(&engine, "person-waiting-up", &["f0"]));
    assert!(!holds(&engine, "person-waiting-up", &["f2"]));
}

#[test]
fn one_action_per_elevator() {
    let mut engine = engine(&quiet());
    let action = act("move-current-dir").with("close-door", &["e0"], true);

    let err = engine.step(&action).unwrap_err();
    assert_eq!(err, SimError::Action(ActionError::ConstraintViolated { index: 0 }));
    assert_eq!(engine.step_count(), 0);
    assert!(holds(&engine, "elevator-at-floor", &["e0", "f0"]));
}

#[test]
fn constraint_checks_can_be_disabled() {
    let model = ground(&elevators::domain(), &quiet()).unwrap();
    let config = EngineConfig::default().with_constraint_checks(false);
    let mut engine = TransitionEngine::new(model, &config).unwrap();

    engine
        .step(&act("move-current-dir").with("close-door", &["e0"], true))
        .unwrap();
    assert!(holds(&engine, "elevator-at-floor", &["e0", "f1"]));
}
