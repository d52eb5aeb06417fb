/// Preview — generate sentences from a grammar against a word source.
///
/// Usage: preview [--grammar <file.ron>]... [--words <dir> | --redis [--config <store.toml>]]
///                [--count <n>] [--seed <n>] [--json] [--bank] [--expand <symbol>] [-v]
///
/// Without `--grammar` the built-in English grammar is used. Without
/// `--redis` words come from `<category>.txt` files in `--words`.

use anyhow::{Context, Result};
use clap::Parser;
use sentence_engine::config::StoreConfig;
use sentence_engine::core::service::{SentenceResponse, SentenceService};
use sentence_engine::core::word_bank::WordStore;
use sentence_engine::store::memory::InMemoryWordStore;
use sentence_engine::store::redis::RedisWordStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "preview", about = "Generate sample sentences")]
struct Args {
    /// Grammar file(s); later files override earlier rules
    #[arg(short, long)]
    grammar: Vec<String>,

    /// Directory of `<category>.txt` word lists
    #[arg(short, long, default_value = "word_data")]
    words: PathBuf,

    /// Read words from Redis instead of files
    #[arg(long)]
    redis: bool,

    /// Store configuration file (TOML), used with --redis
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of sentences, clamped to 1..=20 like a request
    #[arg(short = 'n', long, default_value = "5")]
    count: String,

    /// Seed for reproducible rule choices
    #[arg(short, long)]
    seed: Option<u64>,

    /// Print the response body as JSON
    #[arg(long)]
    json: bool,

    /// Print a word bank summary first
    #[arg(long)]
    bank: bool,

    /// Expand a single symbol instead of whole sentences
    #[arg(short, long)]
    expand: Option<String>,

    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let store: Arc<dyn WordStore> = if args.redis {
        let config =
            StoreConfig::load(args.config.as_deref()).context("loading store configuration")?;
        info!(?config, "using redis word store");
        Arc::new(RedisWordStore::new(config)?)
    } else {
        let store = match args.seed {
            Some(seed) => InMemoryWordStore::seeded(seed),
            None => InMemoryWordStore::new(),
        };
        let files = store
            .extend_from_dir(&args.words)
            .with_context(|| format!("loading word lists from '{}'", args.words.display()))?;
        info!(files, dir = %args.words.display(), "using in-memory word store");
        Arc::new(store)
    };

    let mut builder = SentenceService::builder().with_store(store);
    for path in &args.grammar {
        builder = builder.grammar_path(path);
    }
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    let service = builder.build()?;

    if args.bank {
        let bank = service.generator().words().snapshot().await?;
        for category in service.generator().words().list_categories() {
            println!("{:>14}: {} words", category.as_str(), bank.len(*category));
        }
        for category in bank.empty_categories() {
            println!("warning: '{}' is empty; sentences will show {}", category, category.placeholder());
        }
        println!();
    }

    if let Some(symbol) = &args.expand {
        println!("{}", service.generator().expand(symbol).await?);
        return Ok(());
    }

    let response = service.respond(Some(args.count.as_str())).await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&response.to_json())?);
    } else {
        match response {
            SentenceResponse::Ok(batch) => {
                for (i, sentence) in batch.sentences.iter().enumerate() {
                    println!("{:>2}. {}", i + 1, sentence);
                }
            }
            SentenceResponse::Failed(body) => {
                eprintln!("error: {}", body.error);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
