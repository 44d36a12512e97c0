//! Command-line entry point for the trawl agent.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;
use trawl::config::TrawlConfig;
use trawl::core::{OutboundSegment, ReplyTransport, TransportError};
use trawl::memory::MemoryStore;
use trawl::{LogEventSink, crawl_orchestrator, decision_router, memory_store, response_dispatcher};

/// Command-line options for the trawl agent.
#[derive(Parser)]
#[command(name = "trawl", version)]
struct Cli {
    /// Optional path to a trawl.json5 config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding conversation logs
    #[arg(long, global = true)]
    memory_root: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Handle one message in a conversation and print the reply
    Ask {
        #[arg(long, default_value = "cli")]
        conversation: String,
        /// Message text
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Crawl a site and print the result without touching memory
    Crawl {
        url: String,
        #[arg(long)]
        max_pages: Option<usize>,
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Print the stored log of a conversation
    History {
        #[arg(long, default_value = "cli")]
        conversation: String,
    },
}

/// Prints each segment on stdout.
struct StdoutTransport;

#[async_trait]
impl ReplyTransport for StdoutTransport {
    async fn send(&self, segment: OutboundSegment) -> Result<(), TransportError> {
        println!("{}", segment.text);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    trawl::init_logging();

    let cli = Cli::parse();
    let config = match cli.config.as_ref() {
        Some(path) => TrawlConfig::load_from_path(path).context("failed to load config")?,
        None => {
            let cwd = std::env::current_dir().context("failed to resolve current directory")?;
            let layered =
                TrawlConfig::load_layered(&cwd).context("failed to load layered config")?;
            debug!("layered config loaded (layers={})", layered.layers.len());
            layered.config
        }
    };
    let memory_root = cli
        .memory_root
        .clone()
        .or_else(|| config.memory.root())
        .ok_or_else(|| anyhow!("no memory root configured and no home directory found"))?;
    info!(
        "starting trawl (memory_root={}, config_set={})",
        memory_root.display(),
        cli.config.is_some()
    );

    match cli.command {
        Command::Ask { conversation, text } => {
            let store = Arc::new(
                memory_store(&config, &memory_root).context("failed to open memory store")?,
            );
            let crawler = crawl_orchestrator(&config).context("failed to build crawler")?;
            let router = decision_router(&config, store, crawler, Arc::new(LogEventSink));
            let dispatcher = response_dispatcher(&config, Arc::new(StdoutTransport));
            let text = text.join(" ");
            match router.handle(&text, &conversation).await {
                Ok(reply) => {
                    dispatcher
                        .dispatch(&conversation, &reply.text)
                        .await
                        .context("failed to deliver reply")?;
                }
                Err(err) => {
                    dispatcher
                        .dispatch(&conversation, &err.user_message())
                        .await
                        .context("failed to deliver error")?;
                    return Err(anyhow::Error::new(err).context("turn failed"));
                }
            }
        }
        Command::Crawl {
            url,
            max_pages,
            max_depth,
        } => {
            let crawler = crawl_orchestrator(&config).context("failed to build crawler")?;
            let result = crawler
                .crawl(
                    &url,
                    max_pages.unwrap_or(config.crawl.max_pages),
                    max_depth.unwrap_or(config.crawl.max_depth),
                )
                .await
                .with_context(|| format!("crawl of {url} failed"))?;
            println!("{}", result.render());
        }
        Command::History { conversation } => {
            let store =
                memory_store(&config, &memory_root).context("failed to open memory store")?;
            let records = store
                .scan(&conversation)
                .await
                .context("failed to read conversation")?;
            for record in records {
                println!(
                    "[{}] #{} {} ({}): {}",
                    record.created_at.format("%Y-%m-%d %H:%M:%S"),
                    record.id,
                    record.author,
                    record.kind,
                    record.content
                );
            }
        }
    }
    Ok(())
}
