//! Writers for the trained state of a franchise.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::franchise::FranchiseModel;
use crate::models::hdp::{Hdp, WordAssignment};

/// Serializable snapshot of the sufficient statistics of a trained model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdpSummary {
    pub n_documents: usize,
    pub n_words: usize,
    pub vocabulary_size: usize,
    pub n_topics: usize,
    pub n_tables: usize,
    pub topic_word_counts: Vec<usize>,
    pub topic_table_counts: Vec<usize>,
    pub topic_term_counts: Vec<Vec<usize>>,
}

impl From<&Hdp> for HdpSummary {
    fn from(hdp: &Hdp) -> Self {
        let topics = hdp.topics();
        Self {
            n_documents: hdp.n_documents(),
            n_words: hdp.corpus().n_words(),
            vocabulary_size: hdp.vocabulary_size(),
            n_topics: hdp.n_topics(),
            n_tables: hdp.n_tables(),
            topic_word_counts: topics.word_counts().to_vec(),
            topic_table_counts: topics.table_counts().to_vec(),
            topic_term_counts: topics.term_counts().to_vec(),
        }
    }
}

/// Write the topic-term count matrix, one topic per line, every count
/// zero padded to five digits and followed by a space.
pub fn write_topic_term_counts<W: Write>(mut writer: W, counts: &[Vec<usize>]) -> Result<()> {
    for row in counts {
        for count in row {
            write!(writer, "{count:05} ")?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the `d w z t` table: document id, term, topic and table of every word.
pub fn write_assignments<W: Write>(mut writer: W, assignments: &[WordAssignment]) -> Result<()> {
    writeln!(writer, "d w z t")?;
    for a in assignments {
        writeln!(writer, "{} {} {} {}", a.document, a.term, a.topic, a.table)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_summary_json<W: Write>(mut writer: W, summary: &HdpSummary) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Create `path` and hand a buffered writer for it to `f`.
pub fn to_path<P, F>(path: P, f: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(BufWriter<File>) -> Result<()>,
{
    let file = File::create(path)?;
    f(BufWriter::new(file))
}
