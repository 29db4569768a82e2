use tracing::debug;

use crate::error::{Result, WordConfError};

use super::{Span, WordAlignment};

/// One n-best candidate for a sample
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    pub log_likelihood: f64,
    pub spans: Vec<Span>,
}

/// The group of alternative hypotheses produced for one sample
#[derive(Debug, Clone, PartialEq)]
pub struct NBestSet {
    pub sample_id: String,
    pub frame_count: usize,
    pub hypotheses: Vec<Hypothesis>,
}

impl NBestSet {
    fn start(record: WordAlignment) -> Self {
        Self {
            sample_id: record.sample_id,
            frame_count: record.frame_count,
            hypotheses: vec![Hypothesis {
                log_likelihood: record.score,
                spans: record.spans,
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }
}

/// Groups consecutive word alignments sharing a sample id into n-best sets
///
/// A set is handed out when a record with a different sample id arrives, or
/// when the accumulator is finished.
#[derive(Debug, Default)]
pub struct NBestAccumulator {
    current: Option<NBestSet>,
}

impl NBestAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record, returning the previous set if this record starts a new one
    pub fn push(&mut self, record: WordAlignment) -> Result<Option<NBestSet>> {
        check_span_ranges(&record)?;

        match self.current.as_mut() {
            Some(set) if set.sample_id == record.sample_id => {
                if set.frame_count != record.frame_count {
                    return Err(WordConfError::InconsistentFrameCount {
                        sample: record.sample_id,
                        expected: set.frame_count,
                        found: record.frame_count,
                    });
                }
                set.hypotheses.push(Hypothesis {
                    log_likelihood: record.score,
                    spans: record.spans,
                });
                Ok(None)
            }
            _ => {
                let flushed = self.current.replace(NBestSet::start(record));
                if let Some(set) = &flushed {
                    debug!(sample = set.sample_id.as_str(), hypotheses = set.len(), "nbest set complete");
                }
                Ok(flushed)
            }
        }
    }

    /// Take the set still under construction, if any
    pub fn finish(&mut self) -> Option<NBestSet> {
        self.current.take()
    }
}

fn check_span_ranges(record: &WordAlignment) -> Result<()> {
    for span in &record.spans {
        if span.frame_start > span.frame_end || span.frame_end >= record.frame_count {
            return Err(WordConfError::malformed(
                "word alignment",
                format!(
                    "span {} [{}, {}] outside of {} frames in sample {}",
                    span.symbol, span.frame_start, span.frame_end, record.frame_count, record.sample_id
                ),
            ));
        }
    }
    Ok(())
}
