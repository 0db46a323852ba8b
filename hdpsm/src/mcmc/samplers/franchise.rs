//! Samplers for Chinese Restaurant Franchise models.

pub mod gibbs;
