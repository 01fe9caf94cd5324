use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tracing::info;
use tracing_subscriber::EnvFilter;

use refscope_core::{
    AppConfig, CacheStore, Catalog, DirectoryLibrary, Identifier, MetadataRecord, SqliteKvStore,
    keys,
};
use refscope_science::{
    Confirmation, FixedAnswer, HtmlPageProbe, HttpFetcher, NoPage, PageProbe, Resolver,
};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "refscope",
    about = "Resolve DOI, arXiv and URL identifiers to bibliographic records",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format. Also enabled by setting REFSCOPE_JSON=1.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an identifier through cache, library and remote lookup.
    Resolve {
        input: String,
        /// Identifier kind (doi, arxiv, url); guessed when omitted.
        #[arg(long)]
        kind: Option<String>,
        /// Saved HTML page to read meta tags from during enrichment.
        #[arg(long)]
        page: Option<PathBuf>,
        /// Accept every confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Print the filename a resolved record would be saved under.
    Filename {
        input: String,
        #[arg(long)]
        kind: Option<String>,
    },

    /// Metadata cache maintenance.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Curated library maintenance.
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show the cached record for an identifier.
    Show {
        input: String,
        #[arg(long)]
        kind: Option<String>,
    },
    /// Remove every cached record.
    Clear,
    /// Attach a local file to a cached record.
    SetFile {
        input: String,
        file: PathBuf,
        #[arg(long)]
        kind: Option<String>,
    },
}

#[derive(Subcommand)]
enum LibraryAction {
    /// Rebuild index.json from the library's entries.
    Index,
    /// Copy a cached record into the library.
    Save {
        input: String,
        #[arg(long)]
        kind: Option<String>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Resolve { .. } => "resolve",
            Commands::Filename { .. } => "filename",
            Commands::Cache { .. } => "cache",
            Commands::Library { .. } => "library",
        }
    }
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let start = Instant::now();
    let cli = Cli::parse();
    let json_output = cli.json || std::env::var("REFSCOPE_JSON").as_deref() == Ok("1");
    let config = AppConfig::load().context("loading config")?;

    let command = cli.command.name();

    match cli.command {
        Commands::Resolve {
            input,
            kind,
            page,
            yes,
        } => {
            let id = identifier(kind.as_deref(), &input)?;
            let resolver = build_resolver(&config, open_cache(&config)?, page.as_deref(), yes)?;
            let record = resolver.resolve(&id).await?;
            let filename = resolver.filename_for(&record);

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "id": id.to_string(), "record": record, "filename": filename },
                    "meta": { "duration_ms": start.elapsed().as_millis() }
                }))?;
            } else {
                print_record(&record)?;
                println!("filename: {filename}");
            }
        }

        Commands::Filename { input, kind } => {
            let id = identifier(kind.as_deref(), &input)?;
            let resolver = build_resolver(&config, open_cache(&config)?, None, false)?;
            let record = resolver.resolve(&id).await?;
            let filename = resolver.filename_for(&record);

            if json_output {
                print_json(&serde_json::json!({"status": "ok", "data": { "filename": filename }}))?;
            } else {
                println!("{filename}");
            }
        }

        Commands::Cache { action } => {
            let cache = open_cache(&config)?;
            match action {
                CacheAction::Show { input, kind } => {
                    let id = identifier(kind.as_deref(), &input)?;
                    match cache.get(&id).await? {
                        Some(record) if json_output => {
                            print_json(&serde_json::json!({"status": "ok", "data": record}))?
                        }
                        Some(record) => print_record(&record)?,
                        None if json_output => print_json(&serde_json::json!({
                            "status": "error",
                            "error": format!("{id} is not cached")
                        }))?,
                        None => println!("{id} is not cached"),
                    }
                }
                CacheAction::Clear => {
                    let removed = cache.clear().await?;
                    if json_output {
                        print_json(&serde_json::json!({"status": "ok", "data": { "removed": removed }}))?;
                    } else {
                        println!("Removed {removed} cached record(s).");
                    }
                }
                CacheAction::SetFile { input, file, kind } => {
                    let id = identifier(kind.as_deref(), &input)?;
                    if cache.get(&id).await?.is_none() {
                        bail!("{id} is not cached; resolve it first");
                    }
                    let mut patch = MetadataRecord::new();
                    patch.insert(keys::LOCALFILE, file.to_string_lossy().to_string());
                    let record = cache.merge(&id, patch).await?;

                    if json_output {
                        print_json(&serde_json::json!({"status": "ok", "data": record}))?;
                    } else {
                        println!("{id} → {}", file.display());
                    }
                }
            }
        }

        Commands::Library { action } => {
            let catalog = Catalog::new(config.library_root());
            match action {
                LibraryAction::Index => {
                    let index = catalog.rebuild_index()?;
                    if json_output {
                        print_json(&serde_json::json!({"status": "ok", "data": index}))?;
                    } else {
                        println!(
                            "Indexed {} entries into {}",
                            index.len(),
                            catalog.index_path().display()
                        );
                    }
                }
                LibraryAction::Save { input, kind } => {
                    let id = identifier(kind.as_deref(), &input)?;
                    let cache = open_cache(&config)?;
                    let record = cache
                        .get(&id)
                        .await?
                        .with_context(|| format!("{id} is not cached; resolve it first"))?;
                    let path = catalog.save_entry(&id, &record)?;

                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": { "id": id.to_string(), "path": path }
                        }))?;
                    } else {
                        println!("Saved {id} to {}", path.display());
                    }
                }
            }
        }
    }

    info!(command, duration_ms = start.elapsed().as_millis() as u64, "done");
    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn identifier(kind: Option<&str>, input: &str) -> Result<Identifier> {
    let id = match kind {
        Some(kind) => Identifier::parse(kind, input)?,
        None => Identifier::detect(input)?,
    };
    Ok(id)
}

fn open_cache(config: &AppConfig) -> Result<Arc<CacheStore>> {
    let path = config.cache_path();
    let kv = SqliteKvStore::open(&path)
        .with_context(|| format!("opening cache at {}", path.display()))?;
    Ok(Arc::new(CacheStore::new(Arc::new(kv))))
}

fn build_resolver(
    config: &AppConfig,
    cache: Arc<CacheStore>,
    page: Option<&Path>,
    yes: bool,
) -> Result<Resolver> {
    let fetcher = Arc::new(HttpFetcher::new(&config.network)?);
    let library = Arc::new(DirectoryLibrary::new(config.library_root()));

    let probe: Arc<dyn PageProbe> = match page {
        Some(path) => {
            let html = std::fs::read_to_string(path)
                .with_context(|| format!("reading page {}", path.display()))?;
            Arc::new(HtmlPageProbe::new(html))
        }
        None => Arc::new(NoPage),
    };
    let confirm: Arc<dyn Confirmation> = if yes {
        Arc::new(FixedAnswer(true))
    } else {
        Arc::new(PromptReader::stdin())
    };

    Ok(Resolver::new(cache, library, fetcher, probe, confirm))
}

/// Asks on stderr and reads one answer line per prompt. Anything but y/yes
/// declines, as does end of input.
///
/// The reader lives as long as the confirmation, so answers piped in ahead of
/// time are not lost between prompts.
struct PromptReader<R> {
    input: tokio::sync::Mutex<R>,
}

impl<R> PromptReader<R> {
    fn new(input: R) -> Self {
        Self {
            input: tokio::sync::Mutex::new(input),
        }
    }
}

impl PromptReader<BufReader<Stdin>> {
    fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R> Confirmation for PromptReader<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn confirm(&self, prompt: &str) -> bool {
        let mut stderr = tokio::io::stderr();
        if stderr
            .write_all(format!("{prompt} [y/N] ").as_bytes())
            .await
            .is_err()
        {
            return false;
        }
        let _ = stderr.flush().await;

        let mut input = self.input.lock().await;
        let mut line = String::new();
        match input.read_line(&mut line).await {
            Ok(_) => is_yes(&line),
            Err(_) => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_record(record: &MetadataRecord) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}
