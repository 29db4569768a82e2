use tracing::debug;

use crate::models::{Run, Span};

/// Score of synthesized boundary spaces, which carry no acoustic content
const BOUNDARY_SPACE_SCORE: f64 = 1.0;

/// Configuration for word segmentation
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// Symbol that separates words
    pub space_symbol: String,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            space_symbol: "{space}".to_string(),
        }
    }
}

/// Span under construction while merging runs
struct MergedSpan {
    symbol: String,
    frame_start: usize,
    frame_end: usize,
    score_num: f64,
    score_den: f64,
    is_space: bool,
}

impl MergedSpan {
    fn from_run(run: &Run, is_space: bool) -> Self {
        Self {
            symbol: run.symbol.clone(),
            frame_start: run.frame_start,
            frame_end: run.frame_end,
            score_num: run.score_num,
            score_den: run.score_den,
            is_space,
        }
    }

    /// Absorb the next run; spaces keep a single space symbol, words concatenate
    fn absorb(&mut self, run: &Run) {
        if !self.is_space {
            self.symbol.push_str(&run.symbol);
        }
        self.frame_end = run.frame_end;
        self.score_num += run.score_num;
        self.score_den += run.score_den;
    }

    fn into_span(self) -> Span {
        Span::new(self.symbol, self.frame_start, self.frame_end, self.score_num / self.score_den)
    }
}

/// Turn one sample's runs into alternating word and space spans
///
/// Consecutive character runs are glued into words and consecutive space runs
/// into one space. Spaces then stretch to touch the neighbouring words, and a
/// space is added at either end when the sequence starts or ends with a word.
/// A sample without words gives no spans.
pub fn segment_words(runs: &[Run], frame_count: usize, space: &str) -> Vec<Span> {
    let merged = merge_runs(runs, space);

    if !merged.iter().any(|s| !s.is_space) || frame_count == 0 {
        return Vec::new();
    }
    debug_assert!(
        merged.windows(2).all(|p| !(p[0].is_space && p[1].is_space)),
        "merged spans contain adjacent spaces"
    );

    let last_frame = frame_count - 1;
    let last = merged.len() - 1;

    let mut spans: Vec<Span> = Vec::with_capacity(merged.len() + 2);
    for (n, span) in merged.iter().enumerate() {
        if !span.is_space {
            spans.push(Span::new(
                span.symbol.clone(),
                span.frame_start,
                span.frame_end,
                span.score_num / span.score_den,
            ));
            continue;
        }
        let frame_start = if n == 0 { 0 } else { merged[n - 1].frame_end + 1 };
        let frame_end = if n == last {
            last_frame
        } else {
            merged[n + 1].frame_start.saturating_sub(1)
        };
        spans.push(Span::new(
            span.symbol.clone(),
            frame_start.min(last_frame),
            frame_end,
            span.score_num / span.score_den,
        ));
    }

    if let Some(first) = merged.first().filter(|s| !s.is_space) {
        let leading = Span::new(space, 0, first.frame_start.saturating_sub(1), BOUNDARY_SPACE_SCORE);
        spans.insert(0, leading);
    }
    if let Some(tail) = merged.last().filter(|s| !s.is_space) {
        let trailing = Span::new(space, (tail.frame_end + 1).min(last_frame), last_frame, BOUNDARY_SPACE_SCORE);
        spans.push(trailing);
    }

    debug!(words = spans.iter().filter(|s| !s.is_space(space)).count(), spans = spans.len(), "segmented words");

    spans
}

fn merge_runs(runs: &[Run], space: &str) -> Vec<MergedSpan> {
    let mut merged: Vec<MergedSpan> = Vec::new();
    for run in runs {
        let is_space = run.symbol == space;
        match merged.last_mut() {
            Some(current) if current.is_space == is_space => current.absorb(run),
            _ => merged.push(MergedSpan::from_run(run, is_space)),
        }
    }
    merged
}

/// Merge-only view of the runs, without boundary reconciliation
pub fn merge_into_spans(runs: &[Run], space: &str) -> Vec<Span> {
    merge_runs(runs, space)
        .into_iter()
        .map(MergedSpan::into_span)
        .collect()
}
