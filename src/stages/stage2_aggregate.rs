use std::collections::HashMap;

use tracing::debug;

use crate::models::{Hypothesis, NBestSet, Span, WordAlignment};

/// Configuration for n-best word scoring
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    /// Symbol that separates words
    pub space_symbol: String,
    /// Weight of the hypothesis' own span score in the blended score
    pub score_factor: f64,
    /// Scale applied to log-likelihoods before normalizing them
    pub log_factor: f64,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            space_symbol: "{space}".to_string(),
            score_factor: 0.1,
            log_factor: 0.02,
        }
    }
}

/// `ln(exp(a) + exp(b))` without overflow
pub fn log_add_exp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let m = a.max(b);
    m + (-(a - b).abs()).exp().ln_1p()
}

/// Normalize scaled log-likelihoods into posteriors summing to one
pub fn normalize_posteriors(log_likelihoods: &[f64], log_factor: f64) -> Vec<f64> {
    let scaled: Vec<f64> = log_likelihoods.iter().map(|l| l * log_factor).collect();
    let Some(total) = scaled.iter().copied().reduce(log_add_exp) else {
        return Vec::new();
    };
    scaled.iter().map(|p| (p - total).exp()).collect()
}

/// Dense column index per distinct symbol of an n-best set, space included
#[derive(Debug, Default)]
struct WordDictionary {
    index: HashMap<String, usize>,
}

impl WordDictionary {
    fn build(set: &NBestSet) -> Self {
        let mut index = HashMap::new();
        for span in set.hypotheses.iter().flat_map(|h| &h.spans) {
            let next = index.len();
            index.entry(span.symbol.clone()).or_insert(next);
        }
        Self { index }
    }

    fn column(&self, symbol: &str) -> Option<usize> {
        self.index.get(symbol).copied()
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}

/// Accumulated hypothesis probability per frame and word
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    frames: usize,
    words: usize,
    mass: Vec<f64>,
}

impl OccupancyGrid {
    pub fn new(frames: usize, words: usize) -> Self {
        Self {
            frames,
            words,
            mass: vec![0.0; frames * words],
        }
    }

    /// Add `prob` to every frame of `[start, end]` in `column`
    pub fn add(&mut self, column: usize, start: usize, end: usize, prob: f64) {
        if self.frames == 0 || column >= self.words {
            return;
        }
        for frame in start..=end.min(self.frames - 1) {
            self.mass[frame * self.words + column] += prob;
        }
    }

    pub fn get(&self, frame: usize, column: usize) -> f64 {
        if frame < self.frames && column < self.words {
            self.mass[frame * self.words + column]
        } else {
            0.0
        }
    }

    /// Flatten each maximal run of positive frames of a column to the run maximum
    pub fn consolidate(&mut self) {
        for column in 0..self.words {
            let mut frame = 0;
            while frame < self.frames {
                if self.get(frame, column) <= 0.0 {
                    frame += 1;
                    continue;
                }
                let start = frame;
                let mut peak = 0.0f64;
                while frame < self.frames && self.get(frame, column) > 0.0 {
                    peak = peak.max(self.get(frame, column));
                    frame += 1;
                }
                for f in start..frame {
                    self.mass[f * self.words + column] = peak;
                }
            }
        }
    }
}

/// Whether a span is an edge space left with no frames of its own
///
/// A leading space whose following word starts at frame 0, or a trailing space
/// whose preceding word ends at the last frame, adds no occupancy.
fn is_empty_edge_space(spans: &[Span], m: usize, frame_count: usize, space: &str) -> bool {
    if !spans[m].is_space(space) || spans.len() < 2 {
        return false;
    }
    (m == 0 && spans[1].frame_start == 0)
        || (m == spans.len() - 1 && spans[m - 1].frame_end + 1 == frame_count)
}

/// Score every word of every hypothesis of an n-best set
///
/// Each hypothesis spreads its posterior over the frames of its spans, the
/// per-word mass is flattened to its local maximum, and every span's score is
/// blended with the mass found at its first frame.
pub fn aggregate_nbest(set: &NBestSet, config: &AggregateConfig) -> Vec<WordAlignment> {
    if set.is_empty() {
        return Vec::new();
    }
    let space = config.space_symbol.as_str();

    let log_likelihoods: Vec<f64> = set.hypotheses.iter().map(|h| h.log_likelihood).collect();
    let posteriors = normalize_posteriors(&log_likelihoods, config.log_factor);

    let dictionary = WordDictionary::build(set);
    let mut occupancy = OccupancyGrid::new(set.frame_count, dictionary.len());

    for (hypothesis, &prob) in set.hypotheses.iter().zip(&posteriors) {
        for (m, span) in hypothesis.spans.iter().enumerate() {
            if is_empty_edge_space(&hypothesis.spans, m, set.frame_count, space) {
                continue;
            }
            if let Some(column) = dictionary.column(&span.symbol) {
                occupancy.add(column, span.frame_start, span.frame_end, prob);
            }
        }
    }
    occupancy.consolidate();

    debug!(
        sample = set.sample_id.as_str(),
        hypotheses = set.len(),
        words = dictionary.len(),
        frames = set.frame_count,
        "aggregated nbest set"
    );

    set.hypotheses
        .iter()
        .zip(&posteriors)
        .map(|(hypothesis, &prob)| WordAlignment {
            sample_id: set.sample_id.clone(),
            frame_count: set.frame_count,
            score: prob,
            spans: blend_scores(hypothesis, &dictionary, &occupancy, config.score_factor),
        })
        .collect()
}

fn blend_scores(
    hypothesis: &Hypothesis,
    dictionary: &WordDictionary,
    occupancy: &OccupancyGrid,
    factor: f64,
) -> Vec<Span> {
    hypothesis
        .spans
        .iter()
        .map(|span| {
            let mass = dictionary
                .column(&span.symbol)
                .map(|c| occupancy.get(span.frame_start, c))
                .unwrap_or(0.0);
            span.with_score(factor * span.score + (1.0 - factor) * mass)
        })
        .collect()
}
