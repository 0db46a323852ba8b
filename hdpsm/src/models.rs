/// A generic trait for models which have some scoring function.
pub trait Model {
    /// Log posterior probability or any generic log score of the model's current state.
    fn ln_score(&self) -> f64;
}

pub mod franchise;
pub mod hdp;
pub mod topics;
