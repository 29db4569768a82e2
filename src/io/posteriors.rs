use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tracing::debug;

use crate::error::{Result, WordConfError};

const HTK_HEADER_BYTES: usize = 12;

/// On-disk encoding of a posterior matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixFormat {
    /// Whitespace-separated floats, one row per frame
    Text,
    /// HTK parameter file: big-endian header followed by big-endian f32 rows
    Htk,
}

/// Dense per-frame class posteriors, one row per frame, one column per symbol index
#[derive(Debug, Clone, PartialEq)]
pub struct PosteriorMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl PosteriorMatrix {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(WordConfError::malformed(
                "posterior matrix",
                format!("row {} has {} columns, expected {}", i, row.len(), cols),
            ));
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// Parse a text matrix; blank lines and `#` comments are ignored
    pub fn parse_text(content: &str) -> Result<Self> {
        let rows = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| {
                line.split_whitespace()
                    .map(|v| {
                        v.parse::<f64>().map_err(|_| {
                            WordConfError::malformed("posterior matrix", format!("invalid value {:?}", v))
                        })
                    })
                    .collect::<Result<Vec<f64>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_rows(rows)
    }

    /// Parse an HTK parameter file
    pub fn parse_htk(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HTK_HEADER_BYTES {
            return Err(WordConfError::malformed("HTK file", "header is truncated"));
        }
        let n_samples = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let samp_size = u16::from_be_bytes([bytes[8], bytes[9]]) as usize;

        let cols = samp_size / 4;
        if cols == 0 {
            return Err(WordConfError::malformed(
                "HTK file",
                format!("sample size of {} bytes holds no values", samp_size),
            ));
        }

        let payload = &bytes[HTK_HEADER_BYTES..];
        if payload.len() % (cols * 4) != 0 {
            return Err(WordConfError::malformed(
                "HTK file",
                format!("{} data bytes do not split into rows of {} values", payload.len(), cols),
            ));
        }

        let data: Vec<f64> = payload
            .chunks_exact(4)
            .map(|b| f32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect();
        let rows = data.len() / cols;
        if rows != n_samples {
            return Err(WordConfError::malformed(
                "HTK file",
                format!("appears to be truncated: {} rows, header says {}", rows, n_samples),
            ));
        }

        Ok(Self { rows, cols, data })
    }

    pub fn load(path: &Path, format: MatrixFormat) -> Result<Self> {
        match format {
            MatrixFormat::Text => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| WordConfError::io("reading posterior matrix", e))?;
                Self::parse_text(&content)
            }
            MatrixFormat::Htk => {
                let bytes =
                    std::fs::read(path).map_err(|e| WordConfError::io("reading posterior matrix", e))?;
                Self::parse_htk(&bytes)
            }
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col).copied()
        } else {
            None
        }
    }
}

/// Loads `DIR/<sample>.EXT` matrices, keeping the most recent one
///
/// Consecutive hypotheses of the same sample reuse the loaded matrix.
#[derive(Debug)]
pub struct PosteriorCache {
    dir: PathBuf,
    extension: String,
    format: MatrixFormat,
    loaded: Option<(String, PosteriorMatrix)>,
}

impl PosteriorCache {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>, format: MatrixFormat) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
            format,
            loaded: None,
        }
    }

    pub fn path_for(&self, sample_id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", sample_id, self.extension))
    }

    pub fn matrix_for(&mut self, sample_id: &str) -> anyhow::Result<&PosteriorMatrix> {
        let stale = self.loaded.as_ref().is_none_or(|(s, _)| s != sample_id);
        if stale {
            let path = self.path_for(sample_id);
            let matrix = PosteriorMatrix::load(&path, self.format)
                .with_context(|| format!("problems reading posterior matrix: {}", path.display()))?;
            debug!(
                sample = sample_id,
                rows = matrix.rows(),
                cols = matrix.cols(),
                "loaded posterior matrix"
            );
            self.loaded = Some((sample_id.to_string(), matrix));
        }
        self.loaded
            .as_ref()
            .map(|(_, m)| m)
            .ok_or_else(|| anyhow!("no posterior matrix loaded for {}", sample_id))
    }
}
