/// Word Loader — uploads word-list files into the Redis word store.
///
/// Usage: word_loader [--input <dir>] [--config <store.toml>] [--replace] [-v]
///
/// Every `<category>.txt` file in the input directory becomes the Redis set
/// `<category>`, one word per line; files naming no category are skipped.
/// Connection settings come from the optional TOML file and `REDIS_*`
/// environment variables.

use anyhow::{Context, Result};
use clap::Parser;
use sentence_engine::config::StoreConfig;
use sentence_engine::store::memory::{read_word_list, word_list_files};
use sentence_engine::store::redis::RedisWordStore;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "word_loader", about = "Upload word lists into the word store")]
struct Args {
    /// Directory of `<category>.txt` word lists
    #[arg(short, long, default_value = "word_data")]
    input: PathBuf,

    /// Store configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Delete each set before uploading
    #[arg(long)]
    replace: bool,

    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = StoreConfig::load(args.config.as_deref()).context("loading store configuration")?;
    info!(?config, "connecting to word store");
    let store = RedisWordStore::new(config)?;

    let files = word_list_files(&args.input)
        .with_context(|| format!("reading '{}'", args.input.display()))?;

    for (category, path) in files {
        let key = category.as_str();
        let words = read_word_list(&path)?;
        if args.replace {
            store.clear(key).await?;
        }
        let added = store.add_words(key, &words).await?;
        println!(
            "Uploaded {} words to category: {} ({} new)",
            words.len(),
            key,
            added
        );
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
