use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wordconf::{
    AggregateConfig, MatrixFormat, OutputFormat, PosteriorCache, PosteriorSource, RecordWriter,
    SegmentConfig, SymbolTable, align_to_words, create_output, open_input, score_nbest,
};

#[derive(Parser)]
#[command(name = "wordconf")]
#[command(author, version, about = "Frame alignment to word alignment and n-best word confidence", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Tsv,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Tsv => OutputFormat::Tsv,
            Format::Json => OutputFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a frame alignment into a word alignment
    Align {
        /// File with frame alignments, one hypothesis per line (`-` for stdin)
        alignments: PathBuf,

        /// File with the symbol list (`symbol index` per line)
        symbols: PathBuf,

        /// Symbol for space
        #[arg(short, long, default_value = "{space}")]
        space: String,

        /// Symbol for blank
        #[arg(short, long, default_value = "{blank}")]
        blank: String,

        /// List of special symbols (`canonical original` per line)
        #[arg(short = 'S', long)]
        special: Option<PathBuf>,

        /// Posteriors for scoring, given as directory and file extension
        #[arg(short, long, num_args = 2, value_names = ["DIR", "EXT"])]
        postprob: Option<Vec<String>>,

        /// Read posterior matrices in HTK format
        #[arg(short = 'k', long)]
        htk: bool,

        /// Posteriors are given inline as `index:posterior`
        #[arg(short, long)]
        inline_posteriors: bool,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output record format
        #[arg(long, value_enum, default_value = "tsv")]
        format: Format,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Compute n-best word scores for word alignments
    Score {
        /// File with word alignments grouped by sample (`-` for stdin)
        alignments: PathBuf,

        /// Symbol for space
        #[arg(short, long, default_value = "{space}")]
        space: String,

        /// Factor for combining the provided score with the computed one
        #[arg(short = 'f', long, default_value = "0.1")]
        score_factor: f64,

        /// Log base factor for spreading probabilities
        #[arg(short = 'b', long, default_value = "0.02")]
        log_factor: f64,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output record format
        #[arg(long, value_enum, default_value = "tsv")]
        format: Format,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Align {
            alignments,
            symbols,
            space,
            blank,
            special,
            postprob,
            htk,
            inline_posteriors,
            output,
            format,
            verbose,
        } => {
            setup_logging(verbose);
            let posteriors = posterior_source(postprob, htk, inline_posteriors);
            run_align(
                alignments,
                symbols,
                special,
                SegmentConfig { space_symbol: space },
                &blank,
                posteriors,
                output,
                format.into(),
            )
        }
        Commands::Score {
            alignments,
            space,
            score_factor,
            log_factor,
            output,
            format,
            verbose,
        } => {
            setup_logging(verbose);
            let config = AggregateConfig {
                space_symbol: space,
                score_factor,
                log_factor,
            };
            run_score(alignments, config, output, format.into())
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn posterior_source(postprob: Option<Vec<String>>, htk: bool, inline: bool) -> PosteriorSource {
    if inline {
        if postprob.is_some() {
            warn!("Inline posteriors given, ignoring --postprob");
        }
        return PosteriorSource::Inline;
    }
    match postprob.as_deref() {
        Some([dir, ext]) => {
            let format = if htk { MatrixFormat::Htk } else { MatrixFormat::Text };
            PosteriorSource::Files(PosteriorCache::new(dir, ext.as_str(), format))
        }
        _ => PosteriorSource::Constant,
    }
}

#[allow(clippy::too_many_arguments)]
fn run_align(
    alignments: PathBuf,
    symbols: PathBuf,
    special: Option<PathBuf>,
    config: SegmentConfig,
    blank: &str,
    mut posteriors: PosteriorSource,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    info!("Loading symbol table from {:?}", symbols);
    let table = SymbolTable::load(&symbols, special.as_deref(), blank)
        .context("Failed to load symbol table")?;
    info!("Loaded {} symbols, blank index {}", table.len(), table.blank());

    let input = open_input(&alignments)?;
    let mut writer = RecordWriter::new(create_output(output.as_deref())?, format);

    align_to_words(input, &mut writer, &table, &config, &mut posteriors)
        .with_context(|| format!("Failed to align {:?}", alignments))?;
    writer.finish()?;

    Ok(())
}

fn run_score(
    alignments: PathBuf,
    config: AggregateConfig,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    info!(
        "Scoring n-best sets from {:?} (score factor {}, log factor {})",
        alignments, config.score_factor, config.log_factor
    );

    let input = open_input(&alignments)?;
    let mut writer = RecordWriter::new(create_output(output.as_deref())?, format);

    score_nbest(input, &mut writer, &config)
        .with_context(|| format!("Failed to score {:?}", alignments))?;
    writer.finish()?;

    Ok(())
}
