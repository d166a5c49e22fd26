use std::collections::HashSet;
use std::fs;
use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use review_index::config::{Bm25Params, Config, ProcessorConfig, ScoringFormatTag};
use review_index::error::IndexerError;
use review_index::evaluate::{self, RelevanceJudgments};
use review_index::query::DEFAULT_TOP_K;
use review_index::{create_index, QuerySession};

#[derive(Parser, Debug)]
#[command(
    name = "review-index",
    about = "A memory-bounded inverted index and ranked retrieval engine for product reviews",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Also append progress messages to this file, alongside stderr
    #[arg(short = 'l', long = "log")]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build an index from a review corpus
    Index(IndexArgs),
    /// Query an existing index
    Search(SearchArgs),
    /// Run a batch of queries against relevance judgments and report precision/recall
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug, Clone)]
struct ProcessorArgs {
    /// Tokens shorter than this are discarded
    #[arg(long = "min-token-length", default_value_t = 3, value_parser = parse_min_token_length)]
    min_token_length: usize,

    /// Disable Porter2 stemming
    #[arg(long = "no-stemmer")]
    no_stemmer: bool,

    /// Newline-delimited custom stopword list
    #[arg(long = "stopwords-file")]
    stopwords_file: Option<PathBuf>,

    /// Load the built-in English stopword list
    #[arg(long = "use-stopwords")]
    use_stopwords: bool,
}

#[derive(Args, Debug, Clone)]
struct ScoringArgs {
    /// Weighting scheme: 'tf_idf' or 'bm25'
    #[arg(long = "scoring", default_value = "tf_idf", value_parser = parse_scoring_format)]
    scoring_format: ScoringFormatTag,

    /// BM25 term-frequency saturation
    #[arg(long = "k1", default_value_t = 1.2)]
    k1: f64,

    /// BM25 length normalization, between 0.0 and 1.0
    #[arg(long = "b", default_value_t = 0.75, value_parser = parse_unit_interval)]
    b: f64,
}

#[derive(Args, Debug)]
struct IndexArgs {
    /// Path to the review corpus (.csv/.tsv, or tab-separated "id\ttext" lines)
    #[arg(short = 'c', long = "corpus")]
    corpus: PathBuf,

    /// Directory to write the index into
    #[arg(short = 'o', long = "output")]
    index: PathBuf,

    /// Fraction of resident memory that triggers a block flush
    #[arg(long = "memory-threshold", default_value_t = 0.5, value_parser = parse_unit_interval)]
    memory_threshold: f64,

    /// Delete an existing index at the output path first
    #[arg(long = "overwrite")]
    overwrite: bool,

    /// Retain intermediate block files under blocks/ after merging
    #[arg(long = "keep-blocks")]
    keep_blocks: bool,

    #[command(flatten)]
    processor: ProcessorArgs,

    #[command(flatten)]
    scoring: ScoringArgs,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Path to an index built by the `index` subcommand
    #[arg(short = 'i', long = "index")]
    index: PathBuf,

    /// Query text
    #[arg(short = 'q', long = "query")]
    query: String,

    /// Number of ranked results to return
    #[arg(short = 'k', long = "top-k", default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Write results to this file instead of stdout
    #[arg(short = 'o', long = "output")]
    output_file: Option<PathBuf>,

    #[command(flatten)]
    processor: ProcessorArgs,

    #[command(flatten)]
    scoring: ScoringArgs,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Path to an index built by the `index` subcommand
    #[arg(short = 'i', long = "index")]
    index: PathBuf,

    /// Tab-separated "query_id\tquery_text" lines
    #[arg(short = 'q', long = "queries")]
    queries: PathBuf,

    /// TREC-qrels-flavored "query_id review_id relevance" lines
    #[arg(short = 'j', long = "judgments")]
    judgments: PathBuf,

    /// Number of ranked results considered per query
    #[arg(short = 'k', long = "top-k", default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Path to write the precision/recall report to
    #[arg(short = 'o', long = "output")]
    output_file: PathBuf,

    #[command(flatten)]
    processor: ProcessorArgs,

    #[command(flatten)]
    scoring: ScoringArgs,
}

fn parse_unit_interval(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    review_index::config::validate_unit_interval(value).map_err(|e| e.to_string())
}

fn parse_min_token_length(s: &str) -> Result<usize, String> {
    let value: i64 = s.parse().map_err(|_| format!("'{s}' is not an integer"))?;
    review_index::config::validate_min_token_length(value).map_err(|e| e.to_string())
}

fn parse_scoring_format(s: &str) -> Result<ScoringFormatTag, String> {
    s.parse()
}

fn build_processor_config(args: &ProcessorArgs) -> anyhow::Result<ProcessorConfig> {
    let mut stopwords = HashSet::new();

    if args.use_stopwords {
        stopwords.extend(stop_words::get(stop_words::LANGUAGE::English));
    }
    if let Some(path) = &args.stopwords_file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read stopwords file '{}'", path.display()))?;
        stopwords.extend(
            text.lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
        );
    }

    Ok(ProcessorConfig {
        min_token_length: args.min_token_length,
        stopwords,
        use_stemmer: !args.no_stemmer,
    })
}

/// Appends progress messages to an optional log file in addition to stderr,
/// mirroring the CLI's original `--log` behaviour.
struct Logger {
    file: Option<fs::File>,
}

impl Logger {
    fn open(path: Option<&PathBuf>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => Some(
                fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("open log file '{}'", path.display()))?,
            ),
            None => None,
        };
        Ok(Self { file })
    }

    fn log(&mut self, message: &str) {
        eprintln!("{message}");
        if let Some(file) = &mut self.file {
            let _ = writeln!(file, "{message}");
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let mut logger = Logger::open(args.log_file.as_ref())?;

    let result = match args.command {
        Commands::Index(index_args) => run_index(index_args, &mut logger),
        Commands::Search(search_args) => run_search(search_args, &mut logger),
        Commands::Evaluate(evaluate_args) => run_evaluate(evaluate_args, &mut logger),
    };

    if let Err(err) = &result {
        if let Some(indexer_err) = err.downcast_ref::<IndexerError>() {
            std::process::exit(indexer_err.exit_code());
        }
    }
    result
}

fn run_index(args: IndexArgs, logger: &mut Logger) -> anyhow::Result<()> {
    let processor = build_processor_config(&args.processor)?;
    let config = Config {
        corpus_path: args.corpus,
        index_path: args.index,
        processor,
        memory_threshold: args.memory_threshold,
        scoring_format: args.scoring.scoring_format,
        bm25: Bm25Params { k1: args.scoring.k1, b: args.scoring.b },
        overwrite: args.overwrite,
        debug_mode: args.keep_blocks,
    };

    logger.log(&format!(
        "[review-index]: Indexing '{}' into '{}'",
        config.corpus_path.display(),
        config.index_path.display()
    ));

    let stats = create_index(&config).context("build index")?;

    logger.log(&format!(
        "[review-index]: Indexed {} review(s), {} term(s), {} block(s), {:.2}s, {} bytes on disk",
        stats.review_count,
        stats.term_count,
        stats.blocks_used,
        stats.indexing_time.as_secs_f64(),
        stats.index_size_bytes,
    ));

    Ok(())
}

fn run_search(args: SearchArgs, logger: &mut Logger) -> anyhow::Result<()> {
    let processor = build_processor_config(&args.processor)?;
    let config = Config {
        corpus_path: PathBuf::new(),
        index_path: args.index.clone(),
        processor,
        memory_threshold: 0.5,
        scoring_format: args.scoring.scoring_format,
        bm25: Bm25Params { k1: args.scoring.k1, b: args.scoring.b },
        overwrite: false,
        debug_mode: false,
    };

    let session = QuerySession::open(&args.index, &config).context("open index")?;
    logger.log(&format!("[review-index]: Searching for '{}'", args.query));

    let results = session.search(&args.query, &config, args.top_k).context("search")?;

    if results.is_empty() {
        logger.log("[review-index]: No matches");
        return Ok(());
    }

    let rendered = results
        .iter()
        .map(|(review_id, score)| format!("{review_id}\t{score:.6}"))
        .collect::<Vec<_>>()
        .join("\n");

    match args.output_file {
        Some(path) => fs::write(&path, rendered)
            .with_context(|| format!("write results to '{}'", path.display()))?,
        None => println!("{rendered}"),
    }

    Ok(())
}

fn run_evaluate(args: EvaluateArgs, logger: &mut Logger) -> anyhow::Result<()> {
    let processor = build_processor_config(&args.processor)?;
    let config = Config {
        corpus_path: PathBuf::new(),
        index_path: args.index.clone(),
        processor,
        memory_threshold: 0.5,
        scoring_format: args.scoring.scoring_format,
        bm25: Bm25Params { k1: args.scoring.k1, b: args.scoring.b },
        overwrite: false,
        debug_mode: false,
    };

    let session = QuerySession::open(&args.index, &config).context("open index")?;

    let queries_text = fs::read_to_string(&args.queries)
        .with_context(|| format!("read queries file '{}'", args.queries.display()))?;
    let queries: Vec<(String, String)> = queries_text
        .lines()
        .filter_map(|line| line.split_once('\t'))
        .map(|(id, text)| (id.to_string(), text.to_string()))
        .collect();

    let judgments = RelevanceJudgments::read(&args.judgments).context("read relevance judgments")?;

    logger.log(&format!("[review-index]: Evaluating {} quer(y/ies)", queries.len()));

    let report = evaluate::evaluate(
        &queries,
        &judgments,
        &config,
        &session.scoring_format,
        &session.segment_index,
        &session.review_ids,
        session.properties.document_count,
        args.top_k,
    )
    .context("evaluate queries")?;

    evaluate::write_report(&report, &args.output_file).context("write evaluation report")?;

    logger.log(&format!(
        "[review-index]: mean precision@{} = {:.4}, mean recall@{} = {:.4}",
        args.top_k, report.mean_precision_at_k, args.top_k, report.mean_recall_at_k
    ));

    Ok(())
}
