use thiserror::Error;

#[derive(Debug, Error)]
pub enum WordConfError {
    #[error("no symbol for index {index}")]
    MissingSymbol { index: usize },
    #[error("posterior matrix for sample {sample} does not fit the alignment: {message}")]
    ShapeMismatch { sample: String, message: String },
    #[error("number of frames differs within nbest set {sample}: expected {expected}, found {found}")]
    InconsistentFrameCount {
        sample: String,
        expected: usize,
        found: usize,
    },
    #[error("malformed {context}: {message}")]
    MalformedRecord {
        context: &'static str,
        message: String,
    },
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error while {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl WordConfError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    pub(crate) fn malformed(context: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            context,
            message: message.into(),
        }
    }

    pub(crate) fn shape_mismatch(sample: &str, message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            sample: sample.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WordConfError>;
