use rand::Rng;

use crate::error::{HdpError, Result};
use crate::models::Model;

pub mod samplers;

/// Trait for Markov Chain Monte Carlo Samplers.
pub trait Sampler<M>: Sized
where
    M: Model,
{
    /// Step the Sampler.
    fn step<R: Rng>(&mut self, model: M, rng: &mut R) -> Result<M>;

    /// Warm-up the sampler
    fn multi_step<R: Rng>(&mut self, model: M, steps: usize, rng: &mut R) -> Result<M> {
        (0..steps).try_fold(model, |acc, _| self.step(acc, rng))
    }

    /// Step the sampler `steps` times, mapping each visited state through `f`.
    fn trace<T, F, R>(&mut self, model: M, steps: usize, rng: &mut R, f: F) -> Result<(M, Vec<T>)>
    where
        F: Fn(&M) -> T,
        R: Rng,
    {
        let mut trace = Vec::with_capacity(steps);
        let model = (0..steps).try_fold(model, |acc, _| {
            let next = self.step(acc, rng)?;
            trace.push(f(&next));
            Ok::<M, HdpError>(next)
        })?;
        Ok((model, trace))
    }
}
