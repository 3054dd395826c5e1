//! charter command-line entry point.
//!
//! Logging goes to stderr; results go to stdout.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use charter_client::{FetchClient, FetchConfig, resolve_in_origin};
use charter_core::search::Debouncer;
use charter_core::worker::ControlMessage;
use charter_core::{AppConfig, CacheDb, Document, Reader, ReaderEvent, ReaderView, Registration, Request, load_document};
use clap::Parser;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod cli;
mod display;

use cli::{CacheCommands, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    if let Some(path) = cli.document.clone() {
        config.document_file = Some(path);
    }

    match cli.command {
        Commands::Search { ref query, limit } => {
            let reader = open_reader(&config).await?;
            let page = reader.search(query, limit.unwrap_or(config.max_results))?;
            print(cli.json, &page, || display::search_page(&page))?;
        }
        Commands::Show { ref target } => {
            let reader = open_reader(&config).await?;
            match reader.handle(ReaderEvent::Navigate(target.clone()))? {
                ReaderView::Target(view) => print(cli.json, &view, || display::target(&view))?,
                _ => bail!("no such target: {target}"),
            }
        }
        Commands::Watch => {
            let reader = open_reader(&config).await?;
            watch(&reader, &config, cli.json).await?;
        }
        Commands::Cache { ref command } => cache(command, &config, cli.json).await?,
    }

    Ok(())
}

fn print<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text());
    }
    Ok(())
}

async fn open_registration(config: &AppConfig) -> Result<Arc<Registration>> {
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;
    let client = Arc::new(FetchClient::new(FetchConfig::from_app(config))?);
    Ok(Arc::new(Registration::new(db, client)))
}

/// Build the reader from a local file, or from the origin through the
/// offline worker so a previously installed cache keeps working offline.
async fn open_reader(config: &AppConfig) -> Result<Reader> {
    let document = match &config.document_file {
        Some(path) => Document::from_path(path),
        None => {
            let registration = open_registration(config).await?;
            if let Err(e) = registration.restore_or_register(config.worker_config()?).await {
                tracing::warn!("offline worker unavailable: {}", e);
            }
            let document = load_document(registration.as_ref(), &config.document_url()?).await;
            registration.settle().await;
            document
        }
    };
    Ok(Reader::new(document, config.reader_options()))
}

async fn watch(reader: &Reader, config: &AppConfig, json: bool) -> Result<()> {
    let (mut debouncer, mut settled) = Debouncer::new(config.debounce());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => debouncer.push(line),
                None => break,
            },
            Some(query) = settled.recv() => render_event(reader, ReaderEvent::Search(query), json)?,
        }
    }

    if debouncer.is_pending()
        && let Some(query) = settled.recv().await
    {
        render_event(reader, ReaderEvent::Search(query), json)?;
    }
    Ok(())
}

fn render_event(reader: &Reader, event: ReaderEvent, json: bool) -> Result<()> {
    match reader.handle(event)? {
        ReaderView::Results(page) => print(json, &page, || display::search_page(&page)),
        ReaderView::Hidden => Ok(()),
        other => print(json, &other, String::new),
    }
}

async fn cache(command: &CacheCommands, config: &AppConfig, json: bool) -> Result<()> {
    let registration = open_registration(config).await?;
    let db = registration.db();
    let installed = db.has_cache(&config.static_cache_name()).await?;

    match command {
        CacheCommands::Install => {
            let outcome = registration.register(config.worker_config()?).await?;
            print(json, &outcome, || format!("{}\n", serde_json::to_string(&outcome).unwrap_or_default()))?;
        }
        CacheCommands::Status => {
            if !installed {
                println!("not installed ({} missing)", config.static_cache_name());
                return Ok(());
            }
            registration.restore_or_register(config.worker_config()?).await?;
            let reply = registration
                .post_message(&ControlMessage::GetCacheStatus.to_value())
                .await?;
            print(json, &reply, || match &reply {
                Some(reply) => format!("{}\n", serde_json::to_string(reply).unwrap_or_default()),
                None => "no reply\n".to_string(),
            })?;
        }
        CacheCommands::Clear => {
            if installed {
                registration.restore_or_register(config.worker_config()?).await?;
                registration.post_message(&ControlMessage::ClearCache.to_value()).await?;
            } else {
                for name in db.cache_names().await? {
                    db.delete_cache(&name).await?;
                }
            }
            println!("cleared");
        }
        CacheCommands::Fetch { path, navigate } => {
            if let Err(e) = registration.restore_or_register(config.worker_config()?).await {
                tracing::warn!("offline worker unavailable: {}", e);
            }
            let url = resolve_in_origin(&config.origin_url()?, path)?;
            let request = if *navigate { Request::navigate(url) } else { Request::get(url) };
            let (response, source) = registration.dispatch(&request).await?;
            registration.settle().await;

            let source = source.map_or("passthrough", |s| s.as_str());
            println!("{} {} ({})", response.status, response.status_text, source);
            if !json {
                println!("{}", response.text());
            }
        }
        CacheCommands::List => {
            for name in db.cache_names().await? {
                let entries = db.entries(&name).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&entries)?);
                    continue;
                }
                println!("{name} ({} entries)", entries.len());
                for entry in entries {
                    println!("  {} {} {} {}", entry.method, entry.response.status, entry.url, entry.stored_at);
                }
            }
        }
    }
    Ok(())
}
