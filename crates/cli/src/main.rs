use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use context_cli::{CacheConfig, CachedAggregator, CliConfig, ContextAggregator};
use context_loader::{walk_files, CandidateFilter, Exclusions};
use context_optimizer::ContentOptimizer;
use context_protocol::{Context, FileSystem, LocalFileSystem, OptimizationStrategy};
use context_relevance::{RelevanceScorer, ScoringCriteria, ScoringWeights, WeightOverrides};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_SCORE_DEPTH: usize = 10;

#[derive(Parser)]
#[command(name = "context")]
#[command(about = "Fit the most relevant parts of a source tree into a token budget", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// TOML file with [loading], [weights] and [optimizer] defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache TTL in seconds
    #[arg(long, global = true, default_value_t = 300)]
    cache_ttl_seconds: u64,

    /// Maximum cached aggregates (0 disables the cache)
    #[arg(long, global = true, default_value_t = 32)]
    cache_capacity: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a project with a strategy and print the aggregate
    Load(LoadArgs),

    /// Rank files by relevance
    Score(ScoreArgs),

    /// Fit a text file into a token budget
    Optimize(OptimizeArgs),

    /// Split a text file into token-bounded chunks
    Chunk(ChunkArgs),

    /// Token breakdown of a text file
    Tokens(TokensArgs),

    /// List registered loading strategies
    Strategies(StrategiesArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OptimizeMode {
    Summarize,
    Selective,
    Compress,
}

impl From<OptimizeMode> for OptimizationStrategy {
    fn from(mode: OptimizeMode) -> Self {
        match mode {
            OptimizeMode::Summarize => Self::Summarize,
            OptimizeMode::Selective => Self::Selective,
            OptimizeMode::Compress => Self::Compress,
        }
    }
}

#[derive(Args)]
struct LoadArgs {
    /// Project directory (defaults to current directory)
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Loading strategy (progressive, focused, breadth-first)
    #[arg(long, short = 's')]
    strategy: Option<String>,

    /// Token budget
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Maximum directory depth to walk
    #[arg(long)]
    max_depth: Option<usize>,

    /// What the context is for
    #[arg(long, short = 'q')]
    query: Option<String>,

    /// Glob of files to favour (repeatable)
    #[arg(long = "include")]
    include: Vec<String>,

    /// Glob of files to skip (repeatable)
    #[arg(long = "exclude")]
    exclude: Vec<String>,

    /// Extension allowlist (repeatable)
    #[arg(long = "file-type")]
    file_types: Vec<String>,

    /// Also produce an optimized copy of the loaded files
    #[arg(long)]
    optimize: bool,

    /// How to optimize (implies --optimize)
    #[arg(long, value_enum)]
    optimization_strategy: Option<OptimizeMode>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ScoreArgs {
    /// Project directory (defaults to current directory)
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Files to rank, relative to the root (defaults to every file found)
    paths: Vec<PathBuf>,

    /// Query terms
    #[arg(long, short = 'q')]
    query: Option<String>,

    /// Drop results scoring below this
    #[arg(long)]
    threshold: Option<f64>,

    /// Maximum number of results
    #[arg(long, short = 'n')]
    limit: Option<usize>,

    /// Maximum directory depth when no paths are given
    #[arg(long, default_value_t = DEFAULT_SCORE_DEPTH)]
    max_depth: usize,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct OptimizeArgs {
    file: PathBuf,

    #[arg(long, value_enum, default_value = "summarize")]
    strategy: OptimizeMode,

    /// Token budget (summarize and selective)
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ChunkArgs {
    file: PathBuf,

    /// Chunk size in estimated tokens
    #[arg(long)]
    max_chunk_size: Option<usize>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct TokensArgs {
    file: PathBuf,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct StrategiesArgs {
    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON parsing
    let json_output = match &cli.command {
        Commands::Load(args) => args.json,
        Commands::Score(args) => args.json,
        Commands::Optimize(args) => args.json,
        Commands::Chunk(args) => args.json,
        Commands::Tokens(args) => args.json,
        Commands::Strategies(args) => args.json,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = CliConfig::load_optional(cli.config.as_deref())?;
    let optimizer = ContentOptimizer::new(config.optimizer.clone())
        .context("Invalid [optimizer] configuration")?;
    let cache = CacheConfig {
        ttl: Duration::from_secs(cli.cache_ttl_seconds),
        capacity: cli.cache_capacity,
    };

    match cli.command {
        Commands::Load(args) => run_load(args, &config, optimizer, cache).await?,
        Commands::Score(args) => run_score(args, &config).await?,
        Commands::Optimize(args) => run_optimize(args, &optimizer)?,
        Commands::Chunk(args) => run_chunk(args, &optimizer)?,
        Commands::Tokens(args) => run_tokens(args, &optimizer)?,
        Commands::Strategies(args) => run_strategies(args, optimizer)?,
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))
}

async fn run_load(
    args: LoadArgs,
    config: &CliConfig,
    optimizer: ContentOptimizer,
    cache: CacheConfig,
) -> Result<()> {
    let mut options = config.loading.clone();
    if let Some(strategy) = args.strategy {
        options.strategy = strategy;
    }
    if let Some(max_tokens) = args.max_tokens {
        options.max_tokens = max_tokens;
    }
    if args.max_depth.is_some() {
        options.max_depth = args.max_depth;
    }
    if args.query.is_some() {
        options.query = args.query;
    }
    options.include_patterns.extend(args.include);
    options.exclude_patterns.extend(args.exclude);
    options.file_types.extend(args.file_types);
    if let Some(mode) = args.optimization_strategy {
        options.optimization_strategy = mode.into();
        options.optimize = true;
    }
    options.optimize |= args.optimize;

    let aggregator =
        CachedAggregator::new(ContextAggregator::local(optimizer, config.weights), cache);
    let context = aggregator
        .aggregate(&args.root, &options)
        .await
        .with_context(|| format!("Failed to load {}", args.root.display()))?;

    if args.json {
        return print_json(&context);
    }
    print_context(&context);
    if let Some(optimized) = &context.optimized {
        println!();
        print_context(optimized);
    }
    Ok(())
}

fn print_context(context: &Context) {
    println!("{}", context.summary);
    for file in &context.files {
        println!("  {} ({} tokens)", file.path, file.tokens);
    }
}

async fn run_score(args: ScoreArgs, config: &CliConfig) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(LocalFileSystem::new());
    let loading = &config.loading;

    let paths: Vec<PathBuf> = if args.paths.is_empty() {
        let filter = CandidateFilter::new(
            Exclusions::new(&loading.exclude_patterns)?,
            &loading.file_types,
        );
        walk_files(fs.as_ref(), &args.root, args.max_depth, &filter)
            .await
            .into_iter()
            .map(PathBuf::from)
            .collect()
    } else {
        args.paths
    };

    let mut criteria = ScoringCriteria::for_root(&args.root)
        .with_weights(config.weights.apply(ScoringWeights::default()))
        .with_file_types(loading.file_types.iter().cloned());
    criteria.query = args.query.or_else(|| loading.query.clone());
    criteria.threshold = args.threshold;
    criteria.include_patterns = loading.include_patterns.clone();
    criteria.exclude_patterns = loading.exclude_patterns.clone();

    let scorer = RelevanceScorer::new(fs);
    let mut ranked = scorer
        .score_files(&paths, &criteria)
        .await
        .context("Scoring failed")?;
    if let Some(limit) = args.limit {
        ranked.truncate(limit);
    }

    if args.json {
        return print_json(&ranked);
    }
    for file in &ranked {
        println!("{:>6.1}  {}  ({})", file.score, file.path, file.reason);
    }
    Ok(())
}

fn run_optimize(args: OptimizeArgs, optimizer: &ContentOptimizer) -> Result<()> {
    let content = read_text(&args.file)?;
    let result = optimizer.optimize_context(&content, args.strategy.into(), args.max_tokens);
    if args.json {
        return print_json(&result);
    }
    log::info!(
        "{}: {} -> {} tokens ({:.1}% reduction)",
        result.strategy,
        result.original_tokens,
        result.optimized_tokens,
        result.reduction_percentage
    );
    println!("{}", result.optimized_content);
    Ok(())
}

fn run_chunk(args: ChunkArgs, optimizer: &ContentOptimizer) -> Result<()> {
    let content = read_text(&args.file)?;
    let chunks = optimizer.chunk_context(&content, args.max_chunk_size)?;
    if args.json {
        return print_json(&chunks);
    }
    for chunk in &chunks {
        println!("--- chunk {} ({} tokens) ---", chunk.index, chunk.token_count);
        println!("{}", chunk.content);
    }
    Ok(())
}

fn run_tokens(args: TokensArgs, optimizer: &ContentOptimizer) -> Result<()> {
    let content = read_text(&args.file)?;
    let info = optimizer.token_info(&content);
    if args.json {
        return print_json(&info);
    }
    let breakdown = &info.breakdown;
    println!("Total: {} tokens", info.total_tokens);
    for (label, share) in [
        ("code", breakdown.code),
        ("comments", breakdown.comments),
        ("documentation", breakdown.documentation),
        ("whitespace", breakdown.whitespace),
        ("other", breakdown.other),
    ] {
        println!("  {label:<14} {:>7} ({:.1}%)", share.tokens, share.percentage);
    }
    println!("Estimated cost: ${:.4}", info.estimated_cost);
    println!("Within limit: {}", info.within_limit);
    Ok(())
}

fn run_strategies(args: StrategiesArgs, optimizer: ContentOptimizer) -> Result<()> {
    let aggregator = ContextAggregator::local(optimizer, WeightOverrides::default());
    let names = aggregator.strategy_names();
    if args.json {
        return print_json(&names);
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}
