use std::sync::Arc;

use fluentsim::ast::{CpfDef, PVariableDecl};
use fluentsim::domains::recon;
use fluentsim::{
    ground, Action, ActionError, DomainDef, DomainError, EngineConfig, EnginePhase, Expr, GroundedModel,
    InstanceDef, SimError, TransitionEngine, Value, ValueType,
};

/// Two coins; `b` is tossed with an invalid probability while `bad` is set.
fn coins() -> Arc<GroundedModel> {
    let domain = DomainDef::new("coins")
        .with_pvariable(PVariableDecl::state("a", ValueType::Bool, &[], false))
        .with_pvariable(PVariableDecl::state("b", ValueType::Bool, &[], false))
        .with_pvariable(PVariableDecl::state("n", ValueType::Int, &[], 0))
        .with_pvariable(PVariableDecl::action("bad", ValueType::Bool, &[], false))
        .with_pvariable(PVariableDecl::action("level", ValueType::Int, &[], 0))
        .with_cpf(CpfDef::new("a", &[], Expr::bernoulli(Expr::real(0.5))))
        .with_cpf(CpfDef::new(
            "b",
            &[],
            Expr::bernoulli(Expr::if_then_else(
                Expr::fluent("bad", &[]),
                Expr::real(1.5),
                Expr::real(0.5),
            )),
        ))
        .with_cpf(CpfDef::new(
            "n",
            &[],
            Expr::kron_delta(Expr::fluent("n", &[]) + Expr::int(1)),
        ))
        .with_reward(Expr::fluent("n", &[]) * Expr::real(0.5))
        .with_constraint(Expr::le(Expr::fluent("level", &[]), Expr::int(3)));
    let instance = InstanceDef::new("coins_inst", "coins").with_horizon(5);
    ground(&domain, &instance).unwrap()
}

fn engine(model: Arc<GroundedModel>) -> TransitionEngine {
    TransitionEngine::new(model, &EngineConfig::default().with_seed(17)).unwrap()
}

#[test]
fn new_engine_is_ready() {
    let engine = engine(coins());
    assert_eq!(engine.phase(), EnginePhase::Ready);
    assert_eq!(engine.step_count(), 0);
    assert_eq!(engine.sampler_position(), 0);
    assert_eq!(engine.horizon(), 5);
}

#[test]
fn domain_error_rolls_back_the_step() {
    let mut engine = engine(coins());
    let before = engine.state();

    let err = engine.step(&Action::noop().with("bad", &[], true)).unwrap_err();
    let SimError::Domain(DomainError::ProbabilityOutOfRange { value, context }) = err else {
        panic!("expected ProbabilityOutOfRange, got {err:?}");
    };
    assert_eq!(value, 1.5);
    assert_eq!(context, "b'");

    assert_eq!(engine.phase(), EnginePhase::Ready);
    assert_eq!(engine.step_count(), 0);
    assert_eq!(engine.sampler_position(), 0);
    assert_eq!(engine.state(), before);

    engine.step(&Action::noop()).unwrap();
    assert_eq!(engine.step_count(), 1);
    assert_eq!(engine.sampler_position(), 2);
}

#[test]
fn retried_step_matches_an_untroubled_run() {
    let model = coins();
    let mut troubled = engine(Arc::clone(&model));
    let mut clean = engine(model);

    assert!(troubled.step(&Action::noop().with("bad", &[], true)).is_err());
    for _ in 0..4 {
        let a = troubled.step(&Action::noop()).unwrap();
        let b = clean.step(&Action::noop()).unwrap();
        assert_eq!(a, b);
        assert_eq!(troubled.state(), clean.state());
    }
}

#[test]
fn reward_reads_the_pre_transition_state() {
    let mut engine = engine(coins());

    let first = engine.step(&Action::noop()).unwrap();
    assert_eq!(first.reward, 0.0);
    assert_eq!(engine.state_value("n", &[]), Some(Value::Int(1)));

    let second = engine.step(&Action::noop()).unwrap();
    assert_eq!(second.reward, 0.5);
}

#[test]
fn constraint_violation_is_an_action_error() {
    let mut engine = engine(coins());

    let err = engine.step(&Action::noop().with("level", &[], 4)).unwrap_err();
    assert_eq!(err, SimError::Action(ActionError::ConstraintViolated { index: 0 }));
    assert_eq!(engine.step_count(), 0);
    assert_eq!(engine.phase(), EnginePhase::Ready);

    engine.step(&Action::noop().with("level", &[], 3)).unwrap();
    assert_eq!(engine.step_count(), 1);
}

#[test]
fn disabled_constraint_checks_accept_anything() {
    let config = EngineConfig::default().with_constraint_checks(false);
    let mut engine = TransitionEngine::new(coins(), &config).unwrap();
    engine.step(&Action::noop().with("level", &[], 9)).unwrap();
    assert_eq!(engine.step_count(), 1);
}

fn reject(engine: &mut TransitionEngine, action: &Action) -> ActionError {
    let before = engine.state();
    let position = engine.sampler_position();
    let err = engine.step(action).unwrap_err();
    assert_eq!(engine.state(), before);
    assert_eq!(engine.sampler_position(), position);
    assert_eq!(engine.phase(), EnginePhase::Ready);
    match err {
        SimError::Action(e) => e,
        other => panic!("expected an action error, got {other:?}"),
    }
}

#[test]
fn invalid_actions_leave_state_untouched() {
    let mut engine = TransitionEngine::new(recon::model().unwrap(), &EngineConfig::default()).unwrap();

    assert!(matches!(
        reject(&mut engine, &Action::noop().with("fly", &["a1"], true)),
        ActionError::UnknownFluent { .. }
    ));
    assert!(matches!(
        reject(&mut engine, &Action::noop().with("agentAt", &["a1", "x1", "y1"], true)),
        ActionError::NotAnAction { .. }
    ));
    assert!(matches!(
        reject(&mut engine, &Action::noop().with("up", &[], true)),
        ActionError::ArityMismatch { expected: 1, actual: 0, .. }
    ));
    assert!(matches!(
        reject(&mut engine, &Action::noop().with("up", &["x1"], true)),
        ActionError::UnknownObject { .. }
    ));
    assert!(matches!(
        reject(&mut engine, &Action::noop().with("up", &["a1"], 0.5)),
        ActionError::ValueTypeMismatch { .. }
    ));
    assert!(matches!(
        reject(
            &mut engine,
            &Action::noop().with("up", &["a1"], true).with("up", &["a1"], false)
        ),
        ActionError::DuplicateAssignment { .. }
    ));
    assert!(matches!(
        reject(
            &mut engine,
            &Action::noop().with("up", &["a1"], true).with("right", &["a1"], true)
        ),
        ActionError::TooManyNonDefault { max: 1, actual: 2 }
    ));

    // Explicit defaults do not count against the budget.
    engine
        .step(&Action::noop().with("up", &["a1"], true).with("right", &["a1"], false))
        .unwrap();
    assert_eq!(engine.step_count(), 1);
}

#[test]
fn terminated_engine_refuses_steps_until_reset() {
    let config = EngineConfig::default().with_horizon(1);
    let mut engine = TransitionEngine::new(coins(), &config).unwrap();

    assert!(engine.step(&Action::noop()).unwrap().done);
    assert_eq!(engine.phase(), EnginePhase::Terminated);
    assert!(engine.step(&Action::noop()).unwrap_err().is_episode_ended());

    let observation = engine.reset(17);
    assert!(observation.is_empty());
    assert_eq!(engine.phase(), EnginePhase::Ready);
    assert_eq!(engine.state_value("n", &[]), Some(Value::Int(0)));
}

#[test]
fn invalid_config_is_rejected() {
    let config = EngineConfig {
        discount_override: Some(1.5),
        ..EngineConfig::default()
    };
    let err = TransitionEngine::new(coins(), &config).unwrap_err();
    assert!(matches!(err, SimError::Config(_)));
}
