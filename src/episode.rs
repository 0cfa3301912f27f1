//! Episodes: horizon, discounting and the reset/step lifecycle.

use std::fmt;
use std::sync::Arc;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::engine::{Action, EnginePhase, TransitionEngine};
use crate::error::{EpisodeEnded, SimResult};
use crate::grounding::{FluentValues, GroundedModel};

/// Unique identifier for an episode, used in log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeId(uuid::Uuid);

impl EpisodeId {
    /// Creates a new random episode ID.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for EpisodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// blake3 digest of an episode's seed, observations and rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrajectoryDigest([u8; 32]);

impl TrajectoryDigest {
    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TrajectoryDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Result of one episode step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Observations emitted by this step.
    pub observation: FluentValues,
    /// Undiscounted reward.
    pub reward: f64,
    /// `reward * discount^t` for the zero-based step index `t`.
    pub discounted_reward: f64,
    /// Sum of discounted rewards so far.
    pub cumulative_return: f64,
    /// Number of steps taken, this one included.
    pub step: u32,
    /// True once the horizon is reached.
    pub done: bool,
}

/// One episode of a grounded instance.
///
/// `reset` must be called before the first `step`. Each `reset` takes the
/// next seed from a stream derived from `EngineConfig::seed`, so a sequence
/// of episodes is reproducible from one seed; `reset_with_seed` pins it.
///
/// # Examples
///
/// ```
/// use fluentsim::{domains, Action, EngineConfig, Episode};
///
/// let model = domains::recon::model()?;
/// let mut episode = Episode::new(model, &EngineConfig::default())?;
/// episode.reset();
/// let outcome = episode.step(&Action::noop())?;
/// assert_eq!(outcome.step, 1);
/// # Ok::<(), fluentsim::SimError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Episode {
    id: EpisodeId,
    engine: TransitionEngine,
    discount: f64,
    seeds: ChaCha8Rng,
    seed: Option<u64>,
    factor: f64,
    cumulative: f64,
    digest: blake3::Hasher,
}

impl Episode {
    /// Creates an episode. It must be reset before stepping.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` if `config` is invalid.
    pub fn new(model: Arc<GroundedModel>, config: &EngineConfig) -> SimResult<Self> {
        let discount = config.discount_override.unwrap_or_else(|| model.discount());
        let engine = TransitionEngine::new(model, config)?;
        Ok(Self {
            id: EpisodeId::new(),
            engine,
            discount,
            seeds: ChaCha8Rng::seed_from_u64(config.seed),
            seed: None,
            factor: 1.0,
            cumulative: 0.0,
            digest: blake3::Hasher::new(),
        })
    }

    /// Starts a new run with the next seed of the episode seed stream.
    pub fn reset(&mut self) -> FluentValues {
        let seed = self.seeds.next_u64();
        self.reset_with_seed(seed)
    }

    /// Starts a new run with an explicit seed.
    pub fn reset_with_seed(&mut self, seed: u64) -> FluentValues {
        let observation = self.engine.reset(seed);
        self.seed = Some(seed);
        self.factor = 1.0;
        self.cumulative = 0.0;
        self.digest = blake3::Hasher::new();
        self.digest.update(self.engine.model().fingerprint());
        self.digest.update(&seed.to_le_bytes());
        tracing::debug!(episode = %self.id, seed, "episode reset");
        observation
    }

    /// Applies `action` for one step.
    ///
    /// # Errors
    ///
    /// `EpisodeEnded::NotStarted` before the first reset,
    /// `EpisodeEnded::HorizonReached` after the last step, and any engine
    /// error (see [`TransitionEngine::step`]).
    pub fn step(&mut self, action: &Action) -> SimResult<StepOutcome> {
        if self.seed.is_none() {
            return Err(EpisodeEnded::NotStarted.into());
        }
        let transition = self.engine.step(action)?;

        let discounted_reward = transition.reward * self.factor;
        self.factor *= self.discount;
        self.cumulative += discounted_reward;

        let step = self.engine.step_count();
        self.digest.update(&step.to_le_bytes());
        self.digest.update(&transition.reward.to_bits().to_le_bytes());
        for (_, value) in transition.observation.iter() {
            self.digest.update(&value.to_le_bytes());
        }

        if transition.done {
            tracing::debug!(episode = %self.id, steps = step, total = self.cumulative, "episode finished");
        }
        Ok(StepOutcome {
            observation: transition.observation,
            reward: transition.reward,
            discounted_reward,
            cumulative_return: self.cumulative,
            step,
            done: transition.done,
        })
    }

    /// Runs `act` until the horizon, starting from a fresh reset with `seed`.
    ///
    /// Returns the discounted return.
    ///
    /// # Errors
    ///
    /// Propagates the first step error.
    pub fn run(
        &mut self,
        seed: u64,
        mut act: impl FnMut(&FluentValues, u32) -> Action,
    ) -> SimResult<f64> {
        let mut observation = self.reset_with_seed(seed);
        loop {
            let action = act(&observation, self.engine.step_count());
            let outcome = self.step(&action)?;
            if outcome.done {
                return Ok(outcome.cumulative_return);
            }
            observation = outcome.observation;
        }
    }

    #[must_use]
    pub const fn id(&self) -> EpisodeId {
        self.id
    }

    /// Seed of the current run, `None` before the first reset.
    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }

    #[must_use]
    pub const fn discount(&self) -> f64 {
        self.discount
    }

    #[must_use]
    pub const fn cumulative_return(&self) -> f64 {
        self.cumulative
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.engine.phase() == EnginePhase::Terminated
    }

    /// Read-only view of the underlying engine.
    #[must_use]
    pub const fn engine(&self) -> &TransitionEngine {
        &self.engine
    }

    /// Digest of the trajectory so far.
    #[must_use]
    pub fn trajectory_digest(&self) -> TrajectoryDigest {
        TrajectoryDigest(*self.digest.finalize().as_bytes())
    }
}
