//! Summaries command - inspect the file summary cache

use std::sync::Arc;

use clap::Args;
use confer_core::store::{FileSummaryCache, SummaryStore};
use confer_core::{AppContext, Config};

/// List cached file summaries, newest first
#[derive(Args, Debug)]
pub struct SummariesArgs {
    /// Maximum number of entries to show
    #[arg(short = 'n', long, default_value_t = 20)]
    limit: usize,

    /// Only show the latest summary recorded for this path
    #[arg(long)]
    path: Option<String>,

    /// Print full summaries instead of the first line
    #[arg(long)]
    full: bool,
}

impl SummariesArgs {
    /// Execute the summaries command
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let store: Arc<dyn SummaryStore> = match AppContext::bootstrap(config.clone()).await {
            Ok(context) => context.summaries().clone(),
            Err(e) => {
                tracing::warn!(error = %e, "Falling back to the summary cache directory");
                Arc::new(FileSummaryCache::new(&config.storage.summary_cache_dir))
            }
        };

        if let Some(path) = &self.path {
            match store.get_by_path(path).await? {
                Some(summary) => println!("{}", summary),
                None => println!("No summary recorded for {}", path),
            }
            return Ok(());
        }

        let entries = store.list(Some(self.limit)).await?;
        if entries.is_empty() {
            println!("No cached summaries ({} backend).", store.backend());
            return Ok(());
        }

        println!("Cached summaries ({} backend):", store.backend());
        println!();
        for entry in entries {
            println!(
                "{}  {}  {}",
                &entry.content_hash[..12.min(entry.content_hash.len())],
                entry.updated_at.format("%Y-%m-%d %H:%M"),
                entry.filepath.as_deref().unwrap_or("(unknown path)")
            );
            if self.full {
                for line in entry.summary.lines() {
                    println!("    {}", line);
                }
            } else if let Some(first) = entry.summary.lines().next() {
                println!("    {}", first);
            }
        }

        Ok(())
    }
}
