//! The transition engine: one episode's state machine.
//!
//! A step runs in three phases against the committed snapshot:
//!
//! 1. every state CPF is sampled into the next generation,
//! 2. observ CPFs are evaluated against that next generation,
//! 3. the reward is evaluated against the pre-transition state and action.
//!
//! Only when all three succeed are the generations swapped. A failed step
//! leaves the committed state and the random stream exactly as they were.

mod action;
mod state;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use action::{Action, ActionAssignment};

use crate::ast::FluentKind;
use crate::config::EngineConfig;
use crate::error::{ActionError, DomainError, EpisodeEnded, SimError, SimResult};
use crate::eval::{CompiledExpr, Env, Evaluator};
use crate::grounding::{FluentValues, GroundedModel, PVariable};
use crate::sampler::Sampler;
use crate::value::Value;

use self::state::StateBuffers;

/// Lifecycle phase of a [`TransitionEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnginePhase {
    /// Constructed, state not yet loaded.
    Initialized,
    /// Accepting actions.
    Ready,
    /// A step is in progress.
    Stepping,
    /// The horizon was reached.
    Terminated,
}

/// Result of one committed step.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Observations computed from the post-transition state.
    pub observation: FluentValues,
    /// Undiscounted reward of the step.
    pub reward: f64,
    /// True once the horizon is reached.
    pub done: bool,
}

/// Executes steps of one episode over a shared grounded model.
#[derive(Debug, Clone)]
pub struct TransitionEngine {
    model: Arc<GroundedModel>,
    check_constraints: bool,
    horizon: u32,
    sampler: Sampler,
    state: StateBuffers,
    observation: Vec<Value>,
    slots: Vec<usize>,
    step: u32,
    phase: EnginePhase,
}

impl TransitionEngine {
    /// Creates an engine and loads the initial state, seeded with `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` if `config` is invalid.
    pub fn new(model: Arc<GroundedModel>, config: &EngineConfig) -> SimResult<Self> {
        config.validate()?;
        let horizon = config.horizon_override.unwrap_or_else(|| model.horizon());
        let mut engine = Self {
            state: StateBuffers::new(model.initial_state_table()),
            observation: model.observ_defaults().to_vec(),
            slots: vec![0; model.max_slots()],
            sampler: Sampler::new(config.seed),
            check_constraints: config.check_constraints,
            horizon,
            step: 0,
            phase: EnginePhase::Initialized,
            model,
        };
        engine.reset(config.seed);
        Ok(engine)
    }

    /// Restores the initial state and reseeds the random stream.
    ///
    /// Returns the initial observation (declared observation defaults).
    pub fn reset(&mut self, seed: u64) -> FluentValues {
        self.phase = EnginePhase::Initialized;
        self.state.reset(self.model.initial_state_table());
        self.observation.clear();
        self.observation.extend_from_slice(self.model.observ_defaults());
        self.sampler.reseed(seed);
        self.step = 0;
        self.phase = EnginePhase::Ready;
        tracing::debug!(
            instance = %self.model.instance_name(),
            seed,
            horizon = self.horizon,
            "engine reset"
        );
        self.observation()
    }

    /// Applies `action` and advances one step.
    ///
    /// # Errors
    ///
    /// - `SimError::EpisodeEnded` once the horizon has been reached.
    /// - `SimError::Action` if the action is invalid; nothing changes.
    /// - `SimError::Domain` if evaluation fails; state and random stream are
    ///   restored and the step may be retried.
    pub fn step(&mut self, action: &Action) -> SimResult<Transition> {
        match self.phase {
            EnginePhase::Ready => {}
            EnginePhase::Terminated => {
                return Err(EpisodeEnded::HorizonReached {
                    horizon: self.horizon,
                }
                .into())
            }
            EnginePhase::Initialized => return Err(EpisodeEnded::NotStarted.into()),
            EnginePhase::Stepping => return Err(SimError::internal("step re-entered while stepping")),
        }

        let table = action::resolve(&self.model, action).map_err(|e| {
            tracing::warn!(step = self.step, error = %e, "action rejected");
            SimError::from(e)
        })?;

        let checkpoint = self.sampler.clone();
        self.phase = EnginePhase::Stepping;
        let outcome = self.enforce_constraints(&table).and_then(|()| self.advance(&table));
        match outcome {
            Ok((observation, reward)) => {
                self.state.commit();
                self.observation = observation;
                self.step += 1;
                let done = self.step >= self.horizon;
                self.phase = if done {
                    EnginePhase::Terminated
                } else {
                    EnginePhase::Ready
                };
                tracing::trace!(step = self.step, reward, done, draws = self.sampler.position(), "step committed");
                Ok(Transition {
                    observation: self.observation(),
                    reward,
                    done,
                })
            }
            Err(err) => {
                self.sampler = checkpoint;
                self.phase = EnginePhase::Ready;
                tracing::warn!(step = self.step, error = %err, "step rolled back");
                Err(err)
            }
        }
    }

    fn enforce_constraints(&mut self, action: &[Value]) -> SimResult<()> {
        if !self.check_constraints {
            return Ok(());
        }
        let model = &*self.model;
        let ev = Evaluator::new(
            model,
            Env::current(model.non_fluent_table(), self.state.current(), action),
        );
        for (index, constraint) in model.constraints().iter().enumerate() {
            if !ev.truth(constraint, &mut self.slots, &mut self.sampler)? {
                return Err(ActionError::ConstraintViolated { index }.into());
            }
        }
        Ok(())
    }

    /// Runs the three step phases without committing.
    fn advance(&mut self, action: &[Value]) -> SimResult<(Vec<Value>, f64)> {
        let Self {
            model,
            sampler,
            state,
            slots,
            ..
        } = self;
        let model = &**model;
        let non_fluents = model.non_fluent_table();
        let (current, next) = state.split();

        let ev = Evaluator::new(model, Env::current(non_fluents, current, action));
        for cpf in model.state_cpfs() {
            let pv = &model.pvariables()[cpf.target()];
            for local in 0..pv.ground_count() {
                pv.decode(local, &mut slots[..pv.param_types().len()]);
                let dist = ev.distribution(&cpf.expr, slots, sampler)?;
                next[pv.offset + local] = checked(pv, &cpf.expr, sampler.sample(&dist))?;
            }
        }

        let next: &[Value] = next;
        let mut observation = model.observ_defaults().to_vec();
        for cpf in model.observ_cpfs() {
            let pv = &model.pvariables()[cpf.target()];
            for local in 0..pv.ground_count() {
                pv.decode(local, &mut slots[..pv.param_types().len()]);
                let ev = Evaluator::new(model, Env::observing(non_fluents, next, action, &observation));
                let dist = ev.distribution(&cpf.expr, slots, sampler)?;
                let value = checked(pv, &cpf.expr, sampler.sample(&dist))?;
                observation[pv.offset + local] = value;
            }
        }

        let reward = ev.real(model.reward(), slots, sampler)?;
        Ok((observation, reward))
    }

    /// The grounded model this engine runs.
    #[must_use]
    pub fn model(&self) -> &Arc<GroundedModel> {
        &self.model
    }

    #[must_use]
    pub const fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Number of committed steps since the last reset.
    #[must_use]
    pub const fn step_count(&self) -> u32 {
        self.step
    }

    #[must_use]
    pub const fn horizon(&self) -> u32 {
        self.horizon
    }

    /// Draws consumed from the random stream since the last reset.
    #[must_use]
    pub const fn sampler_position(&self) -> u64 {
        self.sampler.position()
    }

    /// The committed state.
    #[must_use]
    pub fn state(&self) -> FluentValues {
        self.model.describe(FluentKind::StateFluent, self.state.current())
    }

    /// Value of one committed ground state fluent.
    #[must_use]
    pub fn state_value(&self, name: &str, args: &[&str]) -> Option<Value> {
        match self.model.locate(name, args)? {
            (FluentKind::StateFluent, idx) => self.state.current().get(idx).copied(),
            _ => None,
        }
    }

    #[must_use]
    pub fn non_fluents(&self) -> FluentValues {
        self.model.non_fluents()
    }

    /// Observation emitted by the last step (defaults right after reset).
    #[must_use]
    pub fn observation(&self) -> FluentValues {
        self.model.describe(FluentKind::ObservFluent, &self.observation)
    }
}

/// Coerces a sampled value into the fluent's declared range.
fn checked(pv: &PVariable, expr: &CompiledExpr, value: Value) -> Result<Value, DomainError> {
    value.coerce(pv.range()).ok_or_else(|| DomainError::TypeMismatch {
        expected: pv.range().to_string(),
        found: value.type_name().to_string(),
        context: expr.label.clone(),
    })
}
