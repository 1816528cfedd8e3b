use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{ArgGroup, Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use corpus_fetch::corpus::{self, Corpus};
use corpus_fetch::engine::{DEFAULT_WORKERS, Engine};
use corpus_fetch::error::FetchError;
use corpus_fetch::report::{self, LogObserver};
use corpus_fetch::retry::RetryPolicy;
use corpus_fetch::source::RemoteSource;
use corpus_fetch::store::DiskStore;
use corpus_fetch::tier::Tier;

#[derive(Parser)]
#[command(name = "corpus-fetch")]
#[command(about = "Download large public file corpora for local testing")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "GovDocs1: ~986K government files in 1000 zip shards")]
    Govdocs(GovdocsArgs),
    #[command(about = "SAFEDOCS: ~8M PDFs from Common Crawl")]
    Safedocs(SelectArgs),
    #[command(about = "UNSAFE-DOCS: ~5.3M PDFs plus other files from Common Crawl")]
    Unsafedocs(SelectArgs),
    #[command(about = "Industry-document invoices from the UCSF search API")]
    Invoices(SelectArgs),
    #[command(about = "List the download tiers of every corpus")]
    Tiers,
}

#[derive(Args, Clone)]
#[command(group(ArgGroup::new("ceiling").required(true).args(["tier", "limit"])))]
struct SelectArgs {
    /// Named download tier
    #[arg(long, value_enum)]
    tier: Option<Tier>,

    /// Explicit item ceiling
    #[arg(long)]
    limit: Option<u64>,

    /// Destination directory (default: ~/corpora/<CORPUS>)
    #[arg(long)]
    path: Option<Utf8PathBuf>,

    /// Number of parallel downloads
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    parallel: usize,

    /// Print the final tally as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Clone)]
struct GovdocsArgs {
    #[command(flatten)]
    select: SelectArgs,

    /// First shard to download (resume support)
    #[arg(long, default_value_t = 0)]
    start: u32,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(fetch) = report.downcast_ref::<FetchError>() {
            return ExitCode::from(map_exit_code(fetch));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &FetchError) -> u8 {
    match error {
        FetchError::Usage(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Govdocs(args) => {
            if args.start >= corpus::GOVDOCS_SHARDS {
                return Err(FetchError::Usage(format!(
                    "--start must be below {} (got {})",
                    corpus::GOVDOCS_SHARDS,
                    args.start
                ))
                .into());
            }
            let dest = resolve_dest(&args.select, Corpus::Govdocs)?;
            let source = corpus::govdocs_source(dest, args.start)?;
            run_fetch(&source, &args.select, Corpus::Govdocs)
        }
        Commands::Safedocs(args) => {
            let dest = resolve_dest(&args, Corpus::Safedocs)?;
            let source = corpus::safedocs_source(dest)?;
            run_fetch(&source, &args, Corpus::Safedocs)
        }
        Commands::Unsafedocs(args) => {
            let dest = resolve_dest(&args, Corpus::Unsafedocs)?;
            let source = corpus::unsafedocs_source(dest)?;
            run_fetch(&source, &args, Corpus::Unsafedocs)
        }
        Commands::Invoices(args) => {
            let dest = resolve_dest(&args, Corpus::Invoices)?;
            let source = corpus::invoices_source(dest)?;
            run_fetch(&source, &args, Corpus::Invoices)
        }
        Commands::Tiers => {
            print_tiers();
            Ok(())
        }
    }
}

fn resolve_dest(args: &SelectArgs, corpus: Corpus) -> Result<Utf8PathBuf, FetchError> {
    match &args.path {
        Some(path) => Ok(path.clone()),
        None => corpus::default_dest_root(corpus),
    }
}

fn run_fetch(
    source: &dyn RemoteSource,
    args: &SelectArgs,
    corpus: Corpus,
) -> miette::Result<()> {
    if args.parallel == 0 {
        return Err(FetchError::Usage("--parallel must be at least 1".to_string()).into());
    }
    let ceiling = corpus.tiers().resolve(args.tier, args.limit)?;
    tracing::info!(corpus = corpus.name(), ceiling, workers = args.parallel, "starting run");

    let engine = Engine::new(args.parallel, RetryPolicy::default());
    let store = DiskStore::new();
    let tally = engine.run(source.items(Some(ceiling)), source, &store, &LogObserver);

    // per-item failures are reported, not fatal; the rerun skips what landed
    if args.json {
        report::print_json(&tally).into_diagnostic()?;
    } else {
        report::print_summary(&tally).into_diagnostic()?;
    }
    Ok(())
}

fn print_tiers() {
    for corpus in Corpus::ALL {
        println!("{}", corpus.name().to_uppercase());
        for (tier, ceiling) in corpus.tiers().entries() {
            println!("  {tier:<10} {ceiling} items");
        }
        println!();
    }
}
