use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::io::{PosteriorCache, RecordWriter, SymbolTable, parse_frame_alignment, parse_word_alignment};
use crate::models::{NBestAccumulator, NBestSet, WordAlignment};
use crate::stages::{AggregateConfig, FrameScores, SegmentConfig, aggregate_nbest, collapse_runs, segment_words};

/// Where frame scores for the alignment tool come from
#[derive(Debug)]
pub enum PosteriorSource {
    /// Every frame scores 1.0
    Constant,
    /// Posteriors are given inline as `label:posterior`
    Inline,
    /// Per-sample posterior matrices on disk
    Files(PosteriorCache),
}

impl PosteriorSource {
    fn is_inline(&self) -> bool {
        matches!(self, PosteriorSource::Inline)
    }
}

/// Result of converting frame alignments into word alignments
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AlignResult {
    /// Number of alignment lines processed
    pub hypotheses: usize,
    /// Number of words found over all hypotheses
    pub words: usize,
    /// Hypotheses that contained no word
    pub empty_hypotheses: usize,
}

/// Result of n-best word scoring
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScoreResult {
    /// Number of n-best sets scored
    pub sets: usize,
    /// Number of hypotheses over all sets
    pub hypotheses: usize,
}

/// Convert a stream of frame alignments into word alignments
///
/// Each line is collapsed into runs and segmented into words independently;
/// the first failing line stops the stream.
pub fn align_to_words<R: BufRead, W: Write>(
    input: R,
    writer: &mut RecordWriter<W>,
    symbols: &SymbolTable,
    config: &SegmentConfig,
    posteriors: &mut PosteriorSource,
) -> Result<AlignResult> {
    let mut result = AlignResult::default();
    let inline = posteriors.is_inline();

    for (line_no, line) in input.lines().enumerate() {
        let line = line.context("Failed to read frame alignment")?;
        if line.trim().is_empty() {
            continue;
        }
        let alignment = parse_frame_alignment(&line, inline)
            .with_context(|| format!("Invalid frame alignment on line {}", line_no + 1))?;

        let matrix = match posteriors {
            PosteriorSource::Files(cache) => Some(cache.matrix_for(&alignment.sample_id)?),
            _ => None,
        };
        let scores = FrameScores::for_alignment(&alignment, matrix);
        let runs = collapse_runs(&alignment, symbols, scores)
            .with_context(|| format!("Failed to collapse sample {}", alignment.sample_id))?;
        let spans = segment_words(&runs, alignment.frame_count(), &config.space_symbol);

        let record = WordAlignment {
            sample_id: alignment.sample_id,
            frame_count: alignment.labels.len(),
            score: alignment.log_likelihood,
            spans,
        };
        let words = record.word_count(&config.space_symbol);
        debug!(sample = record.sample_id.as_str(), words, "word alignment");

        result.hypotheses += 1;
        result.words += words;
        if words == 0 {
            result.empty_hypotheses += 1;
        }
        writer.write(&record)?;
    }

    info!(
        "Aligned {} hypotheses: {} words, {} without words",
        result.hypotheses, result.words, result.empty_hypotheses
    );

    Ok(result)
}

/// Score a stream of word alignments grouped into n-best sets by sample id
pub fn score_nbest<R: BufRead, W: Write>(
    input: R,
    writer: &mut RecordWriter<W>,
    config: &AggregateConfig,
) -> Result<ScoreResult> {
    let mut result = ScoreResult::default();
    let mut accumulator = NBestAccumulator::new();

    for (line_no, line) in input.lines().enumerate() {
        let line = line.context("Failed to read word alignment")?;
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_word_alignment(&line)
            .with_context(|| format!("Invalid word alignment on line {}", line_no + 1))?;

        if let Some(set) = accumulator.push(record)? {
            emit_set(&set, writer, config, &mut result)?;
        }
    }
    if let Some(set) = accumulator.finish() {
        emit_set(&set, writer, config, &mut result)?;
    }

    info!(
        "Scored {} nbest sets, {} hypotheses",
        result.sets, result.hypotheses
    );

    Ok(result)
}

fn emit_set<W: Write>(
    set: &NBestSet,
    writer: &mut RecordWriter<W>,
    config: &AggregateConfig,
    result: &mut ScoreResult,
) -> Result<()> {
    for record in aggregate_nbest(set, config) {
        writer.write(&record)?;
    }
    result.sets += 1;
    result.hypotheses += set.len();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WordConfError;
    use crate::io::{MatrixFormat, OutputFormat, SpecialSymbols};

    fn table() -> SymbolTable {
        SymbolTable::parse(
            "{blank} 0\n_ 1\nc 2\na 3\nt 4\n",
            &SpecialSymbols::default(),
            "{blank}",
        )
    }

    fn segment_config() -> SegmentConfig {
        SegmentConfig {
            space_symbol: "_".to_string(),
        }
    }

    fn run_align(input: &str, posteriors: &mut PosteriorSource) -> Result<(AlignResult, String)> {
        let mut writer = RecordWriter::new(Vec::new(), OutputFormat::Tsv);
        let result = align_to_words(input.as_bytes(), &mut writer, &table(), &segment_config(), posteriors)?;
        let text = String::from_utf8(writer.finish()?)?;
        Ok((result, text))
    }

    #[test]
    fn test_align_single_word() {
        let (result, text) = run_align("s1 -4.5 0 0 3 3 3 0 0\n", &mut PosteriorSource::Constant).unwrap();

        assert_eq!(result.hypotheses, 1);
        assert_eq!(result.words, 1);
        assert_eq!(text, "s1\t7\t-4.5\t0 1 _ 1\t2 4 a 1\t5 6 _ 1\n");
    }

    #[test]
    fn test_align_all_blank() {
        let (result, text) = run_align("s1 -1 0 0 0\n", &mut PosteriorSource::Constant).unwrap();

        assert_eq!(result.empty_hypotheses, 1);
        assert_eq!(text, "s1\t3\t-1\n");
    }

    #[test]
    fn test_align_inline_posteriors() {
        let input = "s1 -2 2:0.5 3:0.75 0:0.9 1:0.4 4:1.0\n";
        let (_, text) = run_align(input, &mut PosteriorSource::Inline).unwrap();

        assert_eq!(
            text,
            "s1\t5\t-2\t0 0 _ 1\t0 1 ca 0.625\t2 3 _ 0.4\t4 4 t 1\t4 4 _ 1\n"
        );
    }

    #[test]
    fn test_align_missing_symbol_aborts() {
        let err = run_align("s1 -1 0 2\ns2 -1 9 9\n", &mut PosteriorSource::Constant).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<WordConfError>(),
            Some(WordConfError::MissingSymbol { index: 9 })
        ));
    }

    #[test]
    fn test_align_with_matrix_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("s1.fea"),
            "0.9 0 0 0.1 0\n0.1 0 0 0.9 0\n0.3 0 0 0.7 0\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("s2.fea"), "1 0 0 0 0\n").unwrap();

        let mut source = PosteriorSource::Files(PosteriorCache::new(dir.path(), "fea", MatrixFormat::Text));
        let (_, text) = run_align("s1 -1 0 3 3\ns1 -2 3 3 3\n", &mut source).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "s1\t3\t-1\t0 0 _ 1\t1 2 a 0.9\t2 2 _ 1");
        assert_eq!(lines[1], "s1\t3\t-2\t0 0 _ 1\t0 2 a 0.9\t2 2 _ 1");

        let err = run_align("s2 -1 0 3\n", &mut source).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WordConfError>(),
            Some(WordConfError::ShapeMismatch { .. })
        ));
    }

    fn run_score(input: &str, config: &AggregateConfig) -> Result<(ScoreResult, Vec<WordAlignment>)> {
        let mut writer = RecordWriter::new(Vec::new(), OutputFormat::Tsv);
        let result = score_nbest(input.as_bytes(), &mut writer, config)?;
        let text = String::from_utf8(writer.finish()?)?;
        let records = text
            .lines()
            .map(parse_word_alignment)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok((result, records))
    }

    #[test]
    fn test_score_groups_by_sample() {
        let input = "\
s1\t5\t-1\t0 4 cat 0.9
s1\t5\t-3\t0 4 dog 0.8
s2\t3\t-7\t0 0 _ 1\t0 2 a 0.5\t2 2 _ 1
";
        let config = AggregateConfig {
            space_symbol: "_".to_string(),
            score_factor: 0.1,
            log_factor: 1.0,
        };
        let (result, records) = run_score(input, &config).unwrap();

        assert_eq!(result, ScoreResult { sets: 2, hypotheses: 3 });
        assert_eq!(records.len(), 3);
        assert!((records[0].score - 0.8808).abs() < 1e-3);
        assert!((records[0].spans[0].score - 0.882).abs() < 1e-3);
        assert_eq!(records[2].sample_id, "s2");
        assert!((records[2].score - 1.0).abs() < 1e-12);
        assert!((records[2].spans[1].score - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_score_inconsistent_frames_emits_nothing() {
        let input = "s1\t5\t-1\t0 4 cat 0.9\ns1\t6\t-2\t0 5 cat 0.9\n";
        let mut writer = RecordWriter::new(Vec::new(), OutputFormat::Tsv);

        let err = score_nbest(input.as_bytes(), &mut writer, &AggregateConfig::default()).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<WordConfError>(),
            Some(WordConfError::InconsistentFrameCount { expected: 5, found: 6, .. })
        ));
        assert_eq!(writer.written(), 0);
    }

    #[test]
    fn test_align_then_score() {
        let aligned = run_align(
            "s1 -10 0 2 3 4 0 0 0\ns1 -12 0 2 3 3 0 4 0\n",
            &mut PosteriorSource::Constant,
        )
        .unwrap()
        .1;
        let config = AggregateConfig {
            space_symbol: "_".to_string(),
            ..AggregateConfig::default()
        };
        let (result, records) = run_score(&aligned, &config).unwrap();

        assert_eq!(result.sets, 1);
        let total: f64 = records.iter().map(|r| r.score).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(records[0].text("_"), "cat");
        assert_eq!(records[1].text("_"), "cat");
        for record in &records {
            assert!(record.spans.iter().all(|s| s.score > 0.0 && s.score <= 1.0 + 1e-12));
        }
    }
}
