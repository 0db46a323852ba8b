use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use itertools::Itertools;

use crate::error::Result;

/// Term strings indexed by term id, one per line of a vocabulary file.
///
/// Lines starting with `##` are comments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Vocabulary {
    words: Vec<String>,
}

impl Vocabulary {
    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let words = reader
            .lines()
            .filter_map_ok(|line| (!line.starts_with("##")).then(|| line.trim().to_string()))
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self { words })
    }

    pub fn read_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read(BufReader::new(File::open(path)?))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    #[must_use]
    pub fn word(&self, term: usize) -> Option<&str> {
        self.words.get(term).map(String::as_str)
    }

    /// Render a bag of terms as `word[count]` pairs in term order.
    ///
    /// Returns `None` if a term has no entry in the vocabulary.
    #[must_use]
    pub fn describe_document(&self, terms: &[usize]) -> Option<String> {
        let counts: BTreeMap<usize, usize> = terms.iter().copied().counts().into_iter().collect();
        counts
            .into_iter()
            .map(|(term, n)| self.word(term).map(|w| format!("{w}[{n}]")))
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join(" "))
    }

    /// The `n` most frequent words of a topic-term count row, most frequent first.
    #[must_use]
    pub fn top_terms(&self, row: &[usize], n: usize) -> Vec<(&str, usize)> {
        top_terms(row, n)
            .into_iter()
            .filter_map(|(term, count)| self.word(term).map(|w| (w, count)))
            .collect()
    }
}

/// Indices and counts of the `n` largest non-zero entries of `row`, ties broken by index.
#[must_use]
pub fn top_terms(row: &[usize], n: usize) -> Vec<(usize, usize)> {
    row.iter()
        .copied()
        .enumerate()
        .filter(|&(_, count)| count > 0)
        .sorted_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)))
        .take(n)
        .collect()
}
