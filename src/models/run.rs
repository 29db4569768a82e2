/// A maximal sequence of consecutive frames collapsed to one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    /// Symbol text from the symbol table
    pub symbol: String,
    /// First frame of the run
    pub frame_start: usize,
    /// Last frame of the run (inclusive)
    pub frame_end: usize,
    /// Accumulated score numerator
    pub score_num: f64,
    /// Accumulated score denominator
    pub score_den: f64,
}

impl Run {
    /// Start a single-frame run
    pub fn new(symbol: impl Into<String>, frame: usize, score: f64) -> Self {
        Self {
            symbol: symbol.into(),
            frame_start: frame,
            frame_end: frame,
            score_num: score,
            score_den: 1.0,
        }
    }

    /// Extend the run to `frame`, keeping the best score seen so far
    pub fn extend(&mut self, frame: usize, score: f64) {
        self.frame_end = frame;
        self.score_num = self.score_num.max(score);
    }

    /// Number of frames covered by this run
    pub fn frame_count(&self) -> usize {
        self.frame_end - self.frame_start + 1
    }

    pub fn score(&self) -> f64 {
        self.score_num / self.score_den
    }
}
