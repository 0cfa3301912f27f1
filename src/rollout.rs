//! Batched policy evaluation on a bounded worker pool.
//!
//! Episodes of one grounded model are independent, so a batch fans out over
//! worker threads fed through a bounded crossbeam channel. Each episode is
//! seeded from the base seed and its index alone, which makes the returns
//! independent of the worker count.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, RolloutConfig};
use crate::engine::Action;
use crate::episode::Episode;
use crate::error::{SimError, SimResult};
use crate::grounding::{FluentValues, GroundedModel};

/// Chooses an action from the latest observation.
pub trait Policy: Send {
    /// Returns the action for zero-based step `step`.
    fn act(&mut self, observation: &FluentValues, step: u32) -> Action;
}

/// Always submits the empty action.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPolicy;

impl Policy for NoopPolicy {
    fn act(&mut self, _observation: &FluentValues, _step: u32) -> Action {
        Action::noop()
    }
}

impl<F> Policy for F
where
    F: FnMut(&FluentValues, u32) -> Action + Send,
{
    fn act(&mut self, observation: &FluentValues, step: u32) -> Action {
        self(observation, step)
    }
}

/// Returns of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloutSummary {
    /// Discounted return per episode, by episode index.
    pub returns: Vec<f64>,
    /// Mean of `returns` (0 for an empty batch).
    pub mean: f64,
}

impl RolloutSummary {
    fn from_returns(returns: Vec<f64>) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let mean = if returns.is_empty() {
            0.0
        } else {
            returns.iter().sum::<f64>() / returns.len() as f64
        };
        Self { returns, mean }
    }
}

/// Seed of episode `index` in a batch seeded with `base`.
#[must_use]
pub fn episode_seed(base: u64, index: u64) -> u64 {
    let mut rng = ChaCha8Rng::seed_from_u64(base);
    rng.set_stream(index);
    rng.next_u64()
}

struct Job {
    index: usize,
    seed: u64,
}

/// Runs batches of episodes of one model.
pub struct RolloutPool {
    model: Arc<GroundedModel>,
    engine: EngineConfig,
    config: RolloutConfig,
}

impl RolloutPool {
    /// Creates a pool.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` if either configuration is invalid.
    pub fn new(model: Arc<GroundedModel>, engine: EngineConfig, config: RolloutConfig) -> SimResult<Self> {
        engine.validate()?;
        config.validate()?;
        Ok(Self { model, engine, config })
    }

    /// Runs `episodes` episodes, each under a fresh policy from `make_policy`.
    ///
    /// # Errors
    ///
    /// Returns the error of the lowest-indexed failing episode, or
    /// `SimError::Internal` if a worker panicked before reporting every
    /// episode it took.
    pub fn evaluate<P, F>(&self, episodes: usize, make_policy: F) -> SimResult<RolloutSummary>
    where
        P: Policy + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        let make_policy = Arc::new(make_policy);
        let workers = self.config.workers.min(episodes.max(1));
        let (job_tx, job_rx) = bounded::<Job>(self.config.queue_capacity);
        let (out_tx, out_rx) = bounded::<(usize, SimResult<f64>)>(self.config.queue_capacity);

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(workers);
        for idx in 0..workers {
            let jobs: Receiver<Job> = job_rx.clone();
            let results: Sender<(usize, SimResult<f64>)> = out_tx.clone();
            let model = Arc::clone(&self.model);
            let engine = self.engine;
            let make_policy = Arc::clone(&make_policy);
            let handle = thread::Builder::new()
                .name(format!("fluentsim-rollout-{idx}"))
                .spawn(move || worker(&model, &engine, &jobs, &results, &*make_policy))
                .map_err(|e| SimError::internal(format!("failed to spawn rollout worker: {e}")))?;
            handles.push(handle);
        }
        drop(job_rx);
        drop(out_tx);

        tracing::debug!(episodes, workers, base_seed = self.config.base_seed, "rollout started");

        // Feed from a separate thread so a full result queue cannot stall submission.
        let base_seed = self.config.base_seed;
        let feeder = thread::Builder::new()
            .name("fluentsim-rollout-feed".to_string())
            .spawn(move || {
                for index in 0..episodes {
                    let seed = episode_seed(base_seed, index as u64);
                    if job_tx.send(Job { index, seed }).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| SimError::internal(format!("failed to spawn rollout feeder: {e}")))?;

        let mut returns = vec![0.0; episodes];
        let mut reported = vec![false; episodes];
        let mut first_error: Option<(usize, SimError)> = None;
        for (index, result) in &out_rx {
            reported[index] = true;
            match result {
                Ok(ret) => returns[index] = ret,
                Err(err) => {
                    if first_error.as_ref().map_or(true, |(i, _)| index < *i) {
                        first_error = Some((index, err));
                    }
                }
            }
        }

        let mut panicked = usize::from(feeder.join().is_err());
        for handle in handles {
            if handle.join().is_err() {
                panicked += 1;
            }
        }

        if let Some((index, err)) = first_error {
            tracing::warn!(index, error = %err, "rollout failed");
            return Err(err);
        }
        if panicked > 0 {
            tracing::warn!(panicked, "rollout worker panicked");
            return Err(SimError::internal(format!("{panicked} rollout thread(s) panicked")));
        }
        // Every sender is gone, so a gap means an episode was silently dropped.
        if let Some(index) = reported.iter().position(|r| !r) {
            tracing::warn!(index, "rollout episode produced no result");
            return Err(SimError::internal(format!("episode {index} produced no result")));
        }
        let summary = RolloutSummary::from_returns(returns);
        tracing::debug!(mean = summary.mean, "rollout finished");
        Ok(summary)
    }
}

fn worker<P, F>(
    model: &Arc<GroundedModel>,
    engine: &EngineConfig,
    jobs: &Receiver<Job>,
    results: &Sender<(usize, SimResult<f64>)>,
    make_policy: &F,
) where
    P: Policy,
    F: Fn() -> P,
{
    let mut episode = match Episode::new(Arc::clone(model), engine) {
        Ok(e) => e,
        Err(err) => {
            // Report against every job this worker would have taken.
            for job in jobs {
                let _ = results.send((job.index, Err(err.clone())));
            }
            return;
        }
    };
    for job in jobs {
        let mut policy = make_policy();
        let result = episode.run(job.seed, |obs, step| policy.act(obs, step));
        if results.send((job.index, result)).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_seeds_depend_on_index_only() {
        assert_eq!(episode_seed(7, 3), episode_seed(7, 3));
        assert_ne!(episode_seed(7, 3), episode_seed(7, 4));
        assert_ne!(episode_seed(7, 3), episode_seed(8, 3));
    }

    #[test]
    fn summary_mean() {
        let s = RolloutSummary::from_returns(vec![1.0, 2.0, 3.0]);
        assert!((s.mean - 2.0).abs() < 1e-12);
        assert_eq!(RolloutSummary::from_returns(Vec::new()).mean, 0.0);
    }

    #[test]
    fn noop_policy_is_empty() {
        let mut p = NoopPolicy;
        assert!(p.act(&FluentValues::default(), 0).is_empty());
    }
}
