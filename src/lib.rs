//! # fluentsim - simulation of relational factored POMDPs
//!
//! fluentsim executes planning domains written in a relational, declarative
//! style: parameterized fluents over typed objects, conditional probability
//! functions (CPFs) for every state and observation fluent, and a reward
//! expression. It is the component a planner or Monte-Carlo policy evaluator
//! steps through.
//!
//! ## Core Concepts
//!
//! - **Domain / Instance**: pre-parsed definitions ([`ast`]), either built in
//!   code or loaded from JSON
//! - **Grounding**: expansion over an instance's objects into dense fluent
//!   tables and compiled CPFs ([`ground`])
//! - **Transition engine**: one step = next state, observations, reward, commit
//! - **Episode**: horizon, discounting and seeded reset/step lifecycle
//!
//! ## Usage
//!
//! ```rust
//! use fluentsim::{domains, Action, EngineConfig, Episode};
//!
//! let model = domains::recon::model()?;
//! let mut episode = Episode::new(model, &EngineConfig::default())?;
//! let _initial = episode.reset_with_seed(42);
//!
//! let outcome = episode.step(&Action::noop().with("right", &["a1"], true))?;
//! assert_eq!(outcome.observation.is_true("agentAtObs", &["a1", "x2", "y1"]), Some(true));
//! # Ok::<(), fluentsim::SimError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Definitions and values
pub mod ast;
pub mod config;
pub mod error;
pub mod value;

// Grounding and evaluation
pub mod eval;
pub mod grounding;
pub mod sampler;

// Execution
pub mod engine;
pub mod episode;
pub mod rollout;

pub mod domains;

// Re-export primary types at crate root for convenience
pub use ast::{DomainDef, Expr, FluentKind, InstanceDef};
pub use config::{EngineConfig, RolloutConfig};
pub use engine::{Action, EnginePhase, Transition, TransitionEngine};
pub use episode::{Episode, EpisodeId, StepOutcome, TrajectoryDigest};
pub use error::{
    ActionError, ConfigError, DomainError, EpisodeEnded, InstantiationError, ModelError, SimError, SimResult,
};
pub use grounding::{ground, FluentValues, GroundFluent, GroundedModel};
pub use rollout::{NoopPolicy, Policy, RolloutPool, RolloutSummary};
pub use sampler::Sampler;
pub use value::{Value, ValueType};
