/// Frame-synchronous label sequence of one hypothesis
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAlignment {
    /// Sample identifier
    pub sample_id: String,
    /// Hypothesis log-likelihood as reported by the decoder
    pub log_likelihood: f64,
    /// One symbol index per frame
    pub labels: Vec<usize>,
    /// Per-frame posterior given inline with the labels
    pub inline_posteriors: Option<Vec<f64>>,
}

impl FrameAlignment {
    /// Number of frames in the sample
    pub fn frame_count(&self) -> usize {
        self.labels.len()
    }
}
