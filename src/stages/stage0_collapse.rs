use tracing::debug;

use crate::error::{Result, WordConfError};
use crate::io::{PosteriorMatrix, SymbolTable};
use crate::models::{FrameAlignment, Run};

/// Where the per-frame score of a label comes from
#[derive(Debug, Clone, Copy)]
pub enum FrameScores<'a> {
    /// Every frame scores 1.0
    Constant,
    /// One posterior per frame, given with the alignment
    Inline(&'a [f64]),
    /// Posterior of the label looked up in a frame × symbol matrix
    Matrix(&'a PosteriorMatrix),
}

impl<'a> FrameScores<'a> {
    /// Inline posteriors take precedence over a matrix
    pub fn for_alignment(alignment: &'a FrameAlignment, matrix: Option<&'a PosteriorMatrix>) -> Self {
        match (&alignment.inline_posteriors, matrix) {
            (Some(p), _) => FrameScores::Inline(p),
            (None, Some(m)) => FrameScores::Matrix(m),
            (None, None) => FrameScores::Constant,
        }
    }

    fn check_shape(&self, alignment: &FrameAlignment) -> Result<()> {
        let frames = alignment.frame_count();
        let rows = match self {
            FrameScores::Constant => return Ok(()),
            FrameScores::Inline(p) => p.len(),
            FrameScores::Matrix(m) => m.rows(),
        };
        if rows != frames {
            return Err(WordConfError::shape_mismatch(
                &alignment.sample_id,
                format!("{} rows for {} frames", rows, frames),
            ));
        }
        Ok(())
    }

    fn score(&self, frame: usize, label: usize, sample_id: &str) -> Result<f64> {
        match self {
            FrameScores::Constant => Ok(1.0),
            FrameScores::Inline(p) => Ok(p[frame]),
            FrameScores::Matrix(m) => m.get(frame, label).ok_or_else(|| {
                WordConfError::shape_mismatch(
                    sample_id,
                    format!("no column {} in a matrix of {} columns", label, m.cols()),
                )
            }),
        }
    }
}

/// Collapse a frame alignment into symbol runs
///
/// Blank frames are dropped. A run continues only while the label repeats on
/// directly consecutive frames, so `a <blank> a` gives two runs. The score of
/// a run is the best frame score it covers.
pub fn collapse_runs(
    alignment: &FrameAlignment,
    symbols: &SymbolTable,
    scores: FrameScores<'_>,
) -> Result<Vec<Run>> {
    scores.check_shape(alignment)?;

    let blank = symbols.blank();
    let mut runs: Vec<Run> = Vec::new();
    let mut prev: Option<usize> = None;

    for (frame, &label) in alignment.labels.iter().enumerate() {
        if label != blank {
            let symbol = symbols
                .symbol(label)
                .ok_or(WordConfError::MissingSymbol { index: label })?;
            let score = scores.score(frame, label, &alignment.sample_id)?;

            match runs.last_mut() {
                Some(run) if prev == Some(label) => run.extend(frame, score),
                _ => runs.push(Run::new(symbol, frame, score)),
            }
        }
        prev = Some(label);
    }

    debug!(
        sample = alignment.sample_id.as_str(),
        frames = alignment.frame_count(),
        runs = runs.len(),
        "collapsed frame alignment"
    );

    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SpecialSymbols;

    fn table() -> SymbolTable {
        SymbolTable::parse("{blank} 0\na 1\nb 2\n_ 3\n", &SpecialSymbols::default(), "{blank}")
    }

    fn alignment(labels: &[usize]) -> FrameAlignment {
        FrameAlignment {
            sample_id: "s1".to_string(),
            log_likelihood: -1.0,
            labels: labels.to_vec(),
            inline_posteriors: None,
        }
    }

    fn ranges(runs: &[Run]) -> Vec<(&str, usize, usize)> {
        runs.iter()
            .map(|r| (r.symbol.as_str(), r.frame_start, r.frame_end))
            .collect()
    }

    #[test]
    fn test_single_run_between_blanks() {
        let runs = collapse_runs(&alignment(&[0, 0, 1, 1, 1, 0, 0]), &table(), FrameScores::Constant).unwrap();

        assert_eq!(ranges(&runs), vec![("a", 2, 4)]);
        assert_eq!(runs[0].score(), 1.0);
    }

    #[test]
    fn test_blank_separates_repeated_symbol() {
        let runs = collapse_runs(&alignment(&[1, 0, 1]), &table(), FrameScores::Constant).unwrap();
        assert_eq!(ranges(&runs), vec![("a", 0, 0), ("a", 2, 2)]);
    }

    #[test]
    fn test_adjacent_different_symbols() {
        let runs = collapse_runs(&alignment(&[1, 1, 2, 3, 3, 2]), &table(), FrameScores::Constant).unwrap();
        assert_eq!(
            ranges(&runs),
            vec![("a", 0, 1), ("b", 2, 2), ("_", 3, 4), ("b", 5, 5)]
        );
    }

    #[test]
    fn test_all_blank() {
        let runs = collapse_runs(&alignment(&[0, 0, 0]), &table(), FrameScores::Constant).unwrap();
        assert!(runs.is_empty());
    }

    #[test]
    fn test_runs_cover_exactly_non_blank_frames() {
        let labels = [0, 1, 1, 2, 0, 0, 2, 2, 3, 0, 1, 3, 3, 0];
        let runs = collapse_runs(&alignment(&labels), &table(), FrameScores::Constant).unwrap();

        for pair in runs.windows(2) {
            assert!(pair[0].frame_end < pair[1].frame_start);
        }
        let covered: Vec<usize> = runs.iter().flat_map(|r| r.frame_start..=r.frame_end).collect();
        let non_blank: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l != 0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(covered, non_blank);
    }

    #[test]
    fn test_inline_scores_keep_maximum() {
        let mut ali = alignment(&[1, 1, 1, 0, 2]);
        ali.inline_posteriors = Some(vec![0.5, 0.75, 0.25, 0.99, 0.5]);

        let runs = collapse_runs(&ali, &table(), FrameScores::for_alignment(&ali, None)).unwrap();

        assert_eq!(runs[0].score_num, 0.75);
        assert_eq!(runs[0].score_den, 1.0);
        assert_eq!(runs[1].score(), 0.5);
    }

    #[test]
    fn test_matrix_scores() {
        let matrix = PosteriorMatrix::from_rows(vec![
            vec![0.9, 0.1, 0.0, 0.0],
            vec![0.2, 0.8, 0.0, 0.0],
            vec![0.4, 0.6, 0.0, 0.0],
        ])
        .unwrap();
        let ali = alignment(&[0, 1, 1]);

        let runs = collapse_runs(&ali, &table(), FrameScores::for_alignment(&ali, Some(&matrix))).unwrap();

        assert_eq!(ranges(&runs), vec![("a", 1, 2)]);
        assert_eq!(runs[0].score(), 0.8);
    }

    #[test]
    fn test_matrix_row_mismatch() {
        let matrix = PosteriorMatrix::from_rows(vec![vec![1.0, 0.0], vec![1.0, 0.0]]).unwrap();
        let ali = alignment(&[0, 1, 1]);

        let err = collapse_runs(&ali, &table(), FrameScores::Matrix(&matrix)).unwrap_err();
        assert!(matches!(err, WordConfError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_missing_symbol() {
        let err = collapse_runs(&alignment(&[0, 7, 0]), &table(), FrameScores::Constant).unwrap_err();
        assert!(matches!(err, WordConfError::MissingSymbol { index: 7 }));
    }
}
