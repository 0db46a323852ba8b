use crate::error::{HdpError, Result};
use crate::utils::NoPrettyPrint;

/// Sufficient statistics of the global topics (the dishes of the franchise).
#[derive(Clone, PartialEq, Eq)]
pub struct TopicStats {
    vocabulary_size: usize,
    word_counts: Vec<usize>,
    table_counts: Vec<usize>,
    term_counts: Vec<Vec<usize>>,
    n_tables: usize,
}

impl std::fmt::Debug for TopicStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicStats")
            .field("vocabulary_size", &self.vocabulary_size)
            .field("word_counts", &NoPrettyPrint::new(&self.word_counts))
            .field("table_counts", &NoPrettyPrint::new(&self.table_counts))
            .field("n_tables", &self.n_tables)
            .finish_non_exhaustive()
    }
}

impl TopicStats {
    /// Statistics with `n_topics` empty topics.
    #[must_use]
    pub fn new(vocabulary_size: usize, n_topics: usize) -> Self {
        Self {
            vocabulary_size,
            word_counts: vec![0; n_topics],
            table_counts: vec![0; n_topics],
            term_counts: vec![vec![0; vocabulary_size]; n_topics],
            n_tables: 0,
        }
    }

    #[must_use]
    pub const fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }

    #[must_use]
    pub fn n_topics(&self) -> usize {
        self.word_counts.len()
    }

    /// Number of live tables across all documents.
    #[must_use]
    pub const fn n_tables(&self) -> usize {
        self.n_tables
    }

    #[must_use]
    pub fn word_counts(&self) -> &[usize] {
        &self.word_counts
    }

    #[must_use]
    pub fn table_counts(&self) -> &[usize] {
        &self.table_counts
    }

    #[must_use]
    pub fn term_counts(&self) -> &[Vec<usize>] {
        &self.term_counts
    }

    /// Append an empty topic and return its index.
    fn push_topic(&mut self) -> usize {
        self.word_counts.push(0);
        self.table_counts.push(0);
        self.term_counts.push(vec![0; self.vocabulary_size]);
        self.word_counts.len() - 1
    }

    /// Record a word of `term` served by `topic`. `topic` may be one past the
    /// last topic, in which case the topic is created.
    pub(crate) fn observe(&mut self, topic: usize, term: usize, new_table: bool) {
        debug_assert!(topic <= self.n_topics());
        if topic == self.n_topics() {
            self.push_topic();
        }
        self.word_counts[topic] += 1;
        self.term_counts[topic][term] += 1;
        if new_table {
            self.table_counts[topic] += 1;
            self.n_tables += 1;
        }
    }

    /// Forget a word of `term` served by `topic`.
    pub(crate) fn forget(&mut self, topic: usize, term: usize, dead_table: bool) -> Result<()> {
        if topic >= self.n_topics() {
            return Err(HdpError::Invariant(format!(
                "topic {topic} does not exist ({} topics)",
                self.n_topics()
            )));
        }
        if self.term_counts[topic][term] == 0 {
            return Err(HdpError::Invariant(format!(
                "topic {topic} has no occurrences of term {term} to remove"
            )));
        }
        if dead_table && self.table_counts[topic] == 0 {
            return Err(HdpError::Invariant(format!(
                "topic {topic} has no tables to remove"
            )));
        }

        self.word_counts[topic] -= 1;
        self.term_counts[topic][term] -= 1;
        if dead_table {
            self.table_counts[topic] -= 1;
            self.n_tables -= 1;
        }
        Ok(())
    }

    /// Remove topics without words, keeping the relative order of the rest.
    ///
    /// Returns the old to new index map; removed topics map to `None`.
    pub(crate) fn compact(&mut self) -> Vec<Option<usize>> {
        let mut next = 0;
        let remap: Vec<Option<usize>> = self
            .word_counts
            .iter()
            .map(|&n| {
                (n > 0).then(|| {
                    next += 1;
                    next - 1
                })
            })
            .collect();

        retain_mapped(&mut self.word_counts, &remap);
        retain_mapped(&mut self.table_counts, &remap);
        retain_mapped(&mut self.term_counts, &remap);

        remap
    }

    /// Predictive probability of `term` under every topic,
    /// `(n_kv + beta) / (n_k + V beta)`, written into `out`.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn term_likelihoods(&self, term: usize, beta: f64, out: &mut Vec<f64>) {
        let v_beta = self.vocabulary_size as f64 * beta;
        out.clear();
        out.extend(
            self.term_counts
                .iter()
                .zip(self.word_counts.iter())
                .map(|(row, &n)| (row[term] as f64 + beta) / (n as f64 + v_beta)),
        );
    }

    /// Check the internal consistency of the counts.
    pub fn check(&self) -> Result<()> {
        for (k, ((&n, &m), row)) in self
            .word_counts
            .iter()
            .zip(self.table_counts.iter())
            .zip(self.term_counts.iter())
            .enumerate()
        {
            let row_total: usize = row.iter().sum();
            if row_total != n {
                return Err(HdpError::Invariant(format!(
                    "topic {k} counts {n} words but its term counts sum to {row_total}"
                )));
            }
            if (n == 0) != (m == 0) {
                return Err(HdpError::Invariant(format!(
                    "topic {k} has {n} words at {m} tables"
                )));
            }
        }

        let tables: usize = self.table_counts.iter().sum();
        if tables != self.n_tables {
            return Err(HdpError::Invariant(format!(
                "topics hold {tables} tables but the total is {}",
                self.n_tables
            )));
        }
        Ok(())
    }
}

fn retain_mapped<T>(values: &mut Vec<T>, remap: &[Option<usize>]) {
    let mut keep = remap.iter().map(Option::is_some);
    values.retain(|_| keep.next().unwrap_or(false));
}
