use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::WordConfError;
use crate::models::WordAlignment;

/// Record encoding of the output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Tab-separated `sample frames score` followed by `start end symbol score` fields
    #[default]
    Tsv,
    /// One JSON object per line
    Json,
}

/// Open an output, stdout when no path is given
pub fn create_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            let file = File::create(p).with_context(|| format!("Failed to create file: {:?}", p))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(std::io::stdout()))),
    }
}

/// Format a word alignment as one tab-separated line (without newline)
pub fn format_word_alignment(record: &WordAlignment) -> String {
    let mut line = format!("{}\t{}\t{}", record.sample_id, record.frame_count, record.score);
    for span in &record.spans {
        let _ = write!(
            line,
            "\t{} {} {} {}",
            span.frame_start, span.frame_end, span.symbol, span.score
        );
    }
    line
}

/// Writes word alignments in the configured format
pub struct RecordWriter<W: Write> {
    inner: W,
    format: OutputFormat,
    written: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W, format: OutputFormat) -> Self {
        Self {
            inner,
            format,
            written: 0,
        }
    }

    pub fn write(&mut self, record: &WordAlignment) -> std::result::Result<(), WordConfError> {
        match self.format {
            OutputFormat::Tsv => writeln!(self.inner, "{}", format_word_alignment(record))
                .map_err(|e| WordConfError::io("writing word alignment", e))?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.inner, record)
                    .map_err(|e| WordConfError::json("writing word alignment", e))?;
                writeln!(self.inner).map_err(|e| WordConfError::io("writing word alignment", e))?;
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and return the underlying writer
    pub fn finish(mut self) -> std::result::Result<W, WordConfError> {
        self.inner
            .flush()
            .map_err(|e| WordConfError::io("flushing output", e))?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parse_word_alignment;
    use crate::models::Span;

    fn sample_record() -> WordAlignment {
        WordAlignment {
            sample_id: "s1".to_string(),
            frame_count: 7,
            score: -3.5,
            spans: vec![
                Span::new("_", 0, 1, 1.0),
                Span::new("a", 2, 4, 0.75),
                Span::new("_", 5, 6, 1.0),
            ],
        }
    }

    #[test]
    fn test_format_word_alignment() {
        assert_eq!(
            format_word_alignment(&sample_record()),
            "s1\t7\t-3.5\t0 1 _ 1\t2 4 a 0.75\t5 6 _ 1"
        );
    }

    #[test]
    fn test_format_without_spans() {
        let record = WordAlignment {
            spans: vec![],
            ..sample_record()
        };
        assert_eq!(format_word_alignment(&record), "s1\t7\t-3.5");
    }

    #[test]
    fn test_tsv_output_parses_back() {
        let mut writer = RecordWriter::new(Vec::new(), OutputFormat::Tsv);
        writer.write(&sample_record()).unwrap();
        assert_eq!(writer.written(), 1);

        let bytes = writer.finish().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(parse_word_alignment(&text).unwrap(), sample_record());
    }

    #[test]
    fn test_json_output() {
        let mut writer = RecordWriter::new(Vec::new(), OutputFormat::Json);
        writer.write(&sample_record()).unwrap();
        let text = String::from_utf8(writer.finish().unwrap()).unwrap();

        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["sample_id"], "s1");
        assert_eq!(value["frame_count"], 7);
        assert_eq!(value["spans"][1]["symbol"], "a");
        assert_eq!(value["spans"][1]["score"], 0.75);
    }
}
