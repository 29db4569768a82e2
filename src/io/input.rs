use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::WordConfError;
use crate::models::{FrameAlignment, Span, WordAlignment};

/// Open a line-oriented input, `-` meaning stdin
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(std::io::stdin())));
    }
    let file = File::open(path).with_context(|| format!("Failed to open input: {:?}", path))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Parse a frame alignment line: `sample log_likelihood idx[:posterior] ...`
///
/// With `inline_posteriors` every token must carry its posterior; otherwise a
/// posterior suffix is ignored.
pub fn parse_frame_alignment(
    line: &str,
    inline_posteriors: bool,
) -> std::result::Result<FrameAlignment, WordConfError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let mut parts = line.splitn(3, ' ');
    let (Some(sample_id), Some(logl), Some(tokens)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(WordConfError::malformed(
            "frame alignment",
            format!("expected sample, log-likelihood and labels: {:?}", line),
        ));
    };

    let log_likelihood = logl.parse::<f64>().map_err(|_| {
        WordConfError::malformed("frame alignment", format!("invalid log-likelihood {:?}", logl))
    })?;

    let mut labels = Vec::new();
    let mut posteriors = Vec::new();
    for token in tokens.split_whitespace() {
        let (index, posterior) = match token.split_once(':') {
            Some((i, p)) => (i, Some(p)),
            None => (token, None),
        };
        let index = index.parse::<usize>().map_err(|_| {
            WordConfError::malformed("frame alignment", format!("invalid label {:?} in {}", token, sample_id))
        })?;
        labels.push(index);

        if inline_posteriors {
            let posterior = posterior.and_then(|p| p.parse::<f64>().ok()).ok_or_else(|| {
                WordConfError::malformed(
                    "frame alignment",
                    format!("missing inline posterior in {:?} of {}", token, sample_id),
                )
            })?;
            posteriors.push(posterior);
        }
    }

    Ok(FrameAlignment {
        sample_id: sample_id.to_string(),
        log_likelihood,
        labels,
        inline_posteriors: inline_posteriors.then_some(posteriors),
    })
}

/// Parse a word alignment line as written by the segmenter
pub fn parse_word_alignment(line: &str) -> std::result::Result<WordAlignment, WordConfError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let mut fields = line.split('\t');

    let (Some(sample_id), Some(frames), Some(score)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(WordConfError::malformed(
            "word alignment",
            format!("expected sample, frame count and score: {:?}", line),
        ));
    };

    let frame_count = frames.trim().parse::<usize>().map_err(|_| {
        WordConfError::malformed("word alignment", format!("invalid frame count {:?}", frames))
    })?;
    let score = score.trim().parse::<f64>().map_err(|_| {
        WordConfError::malformed("word alignment", format!("invalid score {:?}", score))
    })?;

    let spans = fields
        .map(|field| parse_span(field, sample_id))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(WordAlignment {
        sample_id: sample_id.to_string(),
        frame_count,
        score,
        spans,
    })
}

fn parse_span(field: &str, sample_id: &str) -> std::result::Result<Span, WordConfError> {
    let malformed = || {
        WordConfError::malformed(
            "word alignment",
            format!("expected `start end symbol score` in {}: {:?}", sample_id, field),
        )
    };

    let parts: Vec<&str> = field.split_whitespace().collect();
    let [start, end, symbol, score] = parts.as_slice() else {
        return Err(malformed());
    };

    Ok(Span {
        symbol: symbol.to_string(),
        frame_start: start.parse().map_err(|_| malformed())?,
        frame_end: end.parse().map_err(|_| malformed())?,
        score: score.parse().map_err(|_| malformed())?,
    })
}
