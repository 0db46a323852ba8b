use rand::Rng;

use super::Model;
use crate::config::Hyperparameters;
use crate::data::corpus::Document;
use crate::error::Result;

/// A model with Chinese Restaurant Franchise bookkeeping: documents seat their
/// words at tables and every table serves one topic shared across documents.
pub trait FranchiseModel: Model {
    fn hyperparameters(&self) -> &Hyperparameters;

    /// Size of the vocabulary every term indexes into.
    fn vocabulary_size(&self) -> usize;

    fn n_documents(&self) -> usize;

    /// Document at position `index` in the current sampling order.
    fn document(&self, index: usize) -> Option<&Document>;

    /// Number of topics, including topics emptied since the last defragmentation.
    fn n_topics(&self) -> usize;

    /// Number of live tables across all documents.
    fn n_tables(&self) -> usize;

    /// Number of live tables serving each topic.
    fn topic_table_counts(&self) -> &[usize];

    /// Write the predictive probability of `term` under every topic into `out`
    /// and return the predictive probability of `term` at a new table.
    fn term_likelihoods(&self, term: usize, out: &mut Vec<f64>) -> f64;

    /// Seat word `word` of document `document` at `table`, serving `topic`.
    ///
    /// `table` may be the next free table slot and `topic` may be `n_topics()`,
    /// creating the table or topic.
    fn seat(&mut self, document: usize, word: usize, table: usize, topic: usize) -> Result<()>;

    /// Remove word `word` of document `document` from its table.
    fn unseat(&mut self, document: usize, word: usize) -> Result<()>;

    /// Remove empty tables and topics, renumbering the survivors densely.
    fn defragment(&mut self) -> Result<()>;

    /// Randomize the order in which documents and words are visited.
    fn shuffle<R: Rng>(&mut self, rng: &mut R);
}
