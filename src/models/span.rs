use serde::{Deserialize, Serialize};

/// A word or space unit after merging runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Word text or the space symbol
    pub symbol: String,
    /// First frame of the span
    pub frame_start: usize,
    /// Last frame of the span (inclusive)
    pub frame_end: usize,
    /// Confidence score
    pub score: f64,
}

impl Span {
    pub fn new(symbol: impl Into<String>, frame_start: usize, frame_end: usize, score: f64) -> Self {
        Self {
            symbol: symbol.into(),
            frame_start,
            frame_end,
            score,
        }
    }

    /// Whether this span is the given space symbol
    pub fn is_space(&self, space: &str) -> bool {
        self.symbol == space
    }

    /// Number of frames covered by this span
    pub fn frame_count(&self) -> usize {
        self.frame_end.saturating_sub(self.frame_start) + 1
    }

    /// Same span with a different score
    pub fn with_score(&self, score: f64) -> Self {
        Self {
            score,
            ..self.clone()
        }
    }
}

/// Word alignment of one hypothesis, the unit exchanged between the two tools
///
/// `score` holds the raw log-likelihood when produced by the segmenter and the
/// normalized posterior when produced by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordAlignment {
    /// Sample identifier shared by all hypotheses of an n-best set
    pub sample_id: String,
    /// Total number of frames of the sample
    pub frame_count: usize,
    /// Hypothesis log-likelihood or posterior
    pub score: f64,
    /// Word and space spans in frame order
    pub spans: Vec<Span>,
}

impl WordAlignment {
    /// Count of non-space spans
    pub fn word_count(&self, space: &str) -> usize {
        self.spans.iter().filter(|s| !s.is_space(space)).count()
    }

    /// Word texts joined by single spaces
    pub fn text(&self, space: &str) -> String {
        self.spans
            .iter()
            .filter(|s| !s.is_space(space))
            .map(|s| s.symbol.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_alignment_text() {
        let alignment = WordAlignment {
            sample_id: "s1".to_string(),
            frame_count: 10,
            score: -4.5,
            spans: vec![
                Span::new("_", 0, 1, 1.0),
                Span::new("the", 2, 4, 0.9),
                Span::new("_", 5, 5, 0.7),
                Span::new("cat", 6, 8, 0.8),
                Span::new("_", 9, 9, 1.0),
            ],
        };

        assert_eq!(alignment.word_count("_"), 2);
        assert_eq!(alignment.text("_"), "the cat");
        assert_eq!(alignment.spans[1].frame_count(), 3);
    }
}
