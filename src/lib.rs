pub mod error;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod stages;

pub use error::WordConfError;
pub use io::{
    MatrixFormat, OutputFormat, PosteriorCache, PosteriorMatrix, RecordWriter, SpecialSymbols,
    SymbolTable, create_output, open_input,
};
pub use models::{FrameAlignment, Hypothesis, NBestAccumulator, NBestSet, Run, Span, WordAlignment};
pub use pipeline::{AlignResult, PosteriorSource, ScoreResult, align_to_words, score_nbest};
pub use stages::{
    AggregateConfig, FrameScores, SegmentConfig, aggregate_nbest, collapse_runs,
    normalize_posteriors, segment_words,
};
