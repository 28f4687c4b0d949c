//! Dictionary lifecycle commands: `init`, `refresh`, `clear-cache`, `has`.

use anyhow::Result;

use crate::config::Config;
use crate::dictionary::{DictionaryManager, LoadOutcome};
use crate::progress::{self, ProgressMode};

/// Open the manager and make the dictionary available, reporting progress
/// on stderr.
pub async fn ready_manager(config: &Config, mode: ProgressMode) -> Result<DictionaryManager> {
    let manager = DictionaryManager::open(config).await?;
    let reporter = mode.reporter();
    progress::drive(manager.subscribe(), reporter.as_ref(), manager.initialize()).await?;
    Ok(manager)
}

pub async fn run_init(config: &Config, mode: ProgressMode) -> Result<()> {
    let manager = DictionaryManager::open(config).await?;
    let reporter = mode.reporter();
    let outcome =
        progress::drive(manager.subscribe(), reporter.as_ref(), manager.initialize()).await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn run_refresh(config: &Config, mode: ProgressMode) -> Result<()> {
    let manager = DictionaryManager::open(config).await?;
    let reporter = mode.reporter();
    let outcome =
        progress::drive(manager.subscribe(), reporter.as_ref(), manager.refresh()).await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn run_clear_cache(config: &Config) -> Result<()> {
    let manager = DictionaryManager::open(config).await?;
    if manager.clear_cache().await {
        println!("Dictionary cache cleared.");
        Ok(())
    } else {
        anyhow::bail!("could not clear dictionary cache at {}", config.cache.path.display())
    }
}

/// Look up each word. Returns `true` only if every word is present.
pub async fn run_has(config: &Config, words: &[String], mode: ProgressMode) -> Result<bool> {
    let manager = ready_manager(config, mode).await?;
    let mut all = true;
    for word in words {
        let found = manager.has_word(word);
        all &= found;
        println!("{}\t{}", word, if found { "yes" } else { "no" });
    }
    Ok(all)
}

fn print_outcome(outcome: &LoadOutcome) {
    match outcome {
        LoadOutcome::AlreadyLoaded { words } => println!("Dictionary ready ({} words).", words),
        LoadOutcome::Cache { words } => {
            println!("Dictionary loaded from cache ({} words).", words)
        }
        LoadOutcome::Network { words, cached } => {
            println!("Dictionary downloaded ({} words).", words);
            if !cached {
                println!("Warning: the dictionary could not be cached and will be downloaded again next time.");
            }
        }
    }
}
