//! CLI entry point for docsense.
//!
//! Provides commands for building the index, searching it, inspecting the
//! embedding cache, and serving the HTTP API.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use serde::Serialize;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use docsense::config::EmbeddingBackend;
use docsense::display::{self, THEME};
use docsense::io::{ExitCode, JsonResponse, OutputFormat};
use docsense::vector::{HashingEncoder, TextEncoder, VectorDimension};
use docsense::{
    EmbeddingCache, EmbeddingGenerator, SearchEngine, SearchError, SearchOptions,
    SearchResult, Settings, SqliteEmbeddingCache, load_corpus,
};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Explainable semantic document search
#[derive(Parser)]
#[command(
    name = "docsense",
    version = env!("CARGO_PKG_VERSION"),
    about = "Explainable semantic search over a folder of text documents",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Quick Start:\n  $ docsense init\n  $ docsense index data/docs\n  $ docsense search \"cat pets\" --limit 3\n  $ docsense serve"
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Do not read or write the on-disk embedding cache
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Set up .docsense directory with default configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Embed the corpus and build the index
    Index {
        /// Directory of *.txt documents (defaults to docs_dir from settings)
        dir: Option<PathBuf>,

        /// Recompute every embedding, ignoring the cache
        #[arg(short, long)]
        force: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Search the corpus
    #[command(
        after_help = "Examples:\n  docsense search \"cat pets\"\n  docsense search \"market news\" --limit 10 --json"
    )]
    Search {
        /// Free-text query
        query: String,

        /// Maximum number of results (defaults to search.default_top_k)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Directory of *.txt documents
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the full text of a document
    Show {
        /// Document id (file name without .txt)
        id: String,

        /// Directory of *.txt documents
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Inspect or reset the embedding cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Display active settings
    Config,

    /// Serve the HTTP API
    Serve {
        /// Address to bind (defaults to server.bind)
        #[arg(long)]
        bind: Option<String>,

        /// Directory of *.txt documents
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show entry count, dimensions and timestamps
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Delete every cached embedding
    Clear,
    /// Dump all cache records as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    results: &'a [SearchResult],
}

#[derive(Debug, Serialize)]
struct DocumentOutput<'a> {
    doc_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct CacheStats {
    path: String,
    entries: usize,
    dimensions: Vec<usize>,
    size_bytes: Option<u64>,
}

/// Entry point with tokio async runtime.
///
/// Handles logging and config initialization, then dispatches the command
/// and exits with its code.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(config_path) => Settings::load_from(config_path).unwrap_or_else(|e| {
            eprintln!(
                "Configuration error loading from {}: {e}",
                config_path.display()
            );
            std::process::exit(ExitCode::NotFound.into());
        }),
        None => Settings::load().unwrap_or_else(|e| {
            eprintln!("{}", THEME.warning_with_icon(&format!("Configuration error: {e}")));
            Settings::default()
        }),
    };

    init_tracing(log_directive(cli.verbose, &settings));

    let code = match run(cli, settings).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", THEME.error_with_icon(&format!("{e:#}")));
            ExitCode::Failure
        }
    };
    std::process::exit(code.into());
}

/// Forced filter directive, if any. `--verbose` and `debug = true` override `RUST_LOG`.
fn log_directive(verbose: bool, settings: &Settings) -> Option<&'static str> {
    (verbose || settings.debug).then_some("docsense=debug")
}

fn init_tracing(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docsense=info"))
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli, settings: Settings) -> anyhow::Result<ExitCode> {
    let no_cache = cli.no_cache;
    match cli.command {
        Commands::Init { force } => run_init(force),
        Commands::Config => {
            println!("{}", THEME.apply(&THEME.header, "Current Configuration:"));
            println!("{}", "=".repeat(50));
            println!("{}", toml::to_string_pretty(&settings)?);
            Ok(ExitCode::Success)
        }
        Commands::Index { dir, force, json } => {
            let dir = dir.unwrap_or_else(|| settings.docs_path());
            run_index(&settings, &dir, force, no_cache, OutputFormat::from_json_flag(json))
        }
        Commands::Search {
            query,
            limit,
            dir,
            json,
        } => {
            let dir = dir.unwrap_or_else(|| settings.docs_path());
            let top_k = limit.unwrap_or(settings.search.default_top_k);
            run_search(
                &settings,
                &dir,
                &query,
                top_k,
                no_cache,
                OutputFormat::from_json_flag(json),
            )
        }
        Commands::Show { id, dir, json } => {
            let dir = dir.unwrap_or_else(|| settings.docs_path());
            run_show(&dir, &id, OutputFormat::from_json_flag(json))
        }
        Commands::Cache { action } => run_cache(&settings, action),
        Commands::Serve { bind, dir } => {
            let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
            let dir = dir.unwrap_or_else(|| settings.docs_path());
            run_serve(&settings, dir, bind, no_cache).await
        }
    }
}

fn run_init(force: bool) -> anyhow::Result<ExitCode> {
    match Settings::init_config_file(force) {
        Ok(path) => {
            println!("{}", THEME.success_with_icon("Created configuration file at:"));
            println!("  {}", THEME.apply(&THEME.path, path.display()));
            println!("Edit this file to customize your settings.");
            Ok(ExitCode::Success)
        }
        Err(e) => {
            eprintln!("{}", THEME.error_with_icon(&e.to_string()));
            Ok(ExitCode::NotFound)
        }
    }
}

fn create_encoder(settings: &Settings) -> anyhow::Result<Arc<dyn TextEncoder>> {
    match settings.embedding.backend {
        EmbeddingBackend::Hashing => {
            let dimension = VectorDimension::new(settings.embedding.dimension)?;
            Ok(Arc::new(HashingEncoder::new(dimension)))
        }
        EmbeddingBackend::Fastembed => create_fastembed_encoder(settings),
    }
}

#[cfg(feature = "fastembed")]
fn create_fastembed_encoder(settings: &Settings) -> anyhow::Result<Arc<dyn TextEncoder>> {
    use docsense::vector::FastEmbedEncoder;

    if settings.embedding.model != "AllMiniLML6V2" {
        warn!(
            "Unsupported model '{}', using AllMiniLML6V2",
            settings.embedding.model
        );
    }
    let encoder = FastEmbedEncoder::new(settings.embedding.models_dir.clone(), true)?;
    Ok(Arc::new(encoder))
}

#[cfg(not(feature = "fastembed"))]
fn create_fastembed_encoder(_settings: &Settings) -> anyhow::Result<Arc<dyn TextEncoder>> {
    anyhow::bail!(
        "The fastembed backend is not compiled in. Rebuild with: cargo build --features fastembed"
    )
}

fn open_cache(settings: &Settings) -> Result<SqliteEmbeddingCache, SearchError> {
    let path = settings.cache_file();
    SqliteEmbeddingCache::open(&path).map_err(SearchError::from)
}

fn create_engine(settings: &Settings, force: bool, no_cache: bool) -> anyhow::Result<SearchEngine> {
    let mut generator = EmbeddingGenerator::new(create_encoder(settings)?)
        .with_batch_size(settings.embedding.batch_size);

    if !no_cache {
        match open_cache(settings) {
            Ok(cache) => {
                debug!("Using embedding cache at {}", settings.cache_file().display());
                generator = generator.with_cache(Arc::new(cache));
            }
            Err(e) => warn!("{e}; continuing without cache"),
        }
    }

    let options = SearchOptions {
        preview_chars: settings.search.preview_chars,
        max_keywords: settings.search.max_keywords,
        force_recompute: force,
    };
    Ok(SearchEngine::with_options(generator, options))
}

/// Prints a search error in the requested format and maps it to an exit code.
fn report_error(error: &SearchError, format: OutputFormat) -> ExitCode {
    if format.is_json() {
        let response = JsonResponse::from_error(error);
        match serde_json::to_string_pretty(&response) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Failed to serialize error: {e}"),
        }
    } else {
        eprintln!("{}", THEME.error_with_icon(&error.to_string()));
        for suggestion in error.recovery_suggestions() {
            eprintln!("  {}", THEME.apply(&THEME.dim, suggestion));
        }
    }
    ExitCode::from_error(error)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_index(
    settings: &Settings,
    dir: &Path,
    force: bool,
    no_cache: bool,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let engine = create_engine(settings, force, no_cache)?;
    let message = format!("Indexing {}", dir.display());
    let report = match display::with_spinner(&message, || engine.build_from_dir(dir)) {
        Ok(report) => report,
        Err(e) => return Ok(report_error(&e, format)),
    };

    if format.is_json() {
        let message = format!("Indexed {} documents", report.documents);
        print_json(&JsonResponse::success(&report).with_message(message))?;
    } else {
        println!(
            "{} {}",
            THEME.success_with_icon(&format!("Indexed {} documents from", report.documents)),
            THEME.apply(&THEME.path, dir.display())
        );
        println!("{}", display::create_build_table(&report));
        if !report.degenerate.is_empty() {
            println!(
                "{}",
                THEME.warning_with_icon(&format!(
                    "{} document(s) have no tokens and will never match a query",
                    report.degenerate.len()
                ))
            );
        }
    }
    Ok(ExitCode::Success)
}

fn run_search(
    settings: &Settings,
    dir: &Path,
    query: &str,
    top_k: usize,
    no_cache: bool,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    if query.trim().is_empty() {
        eprintln!("{}", THEME.error_with_icon("Query cannot be empty"));
        return Ok(ExitCode::NotFound);
    }

    let engine = create_engine(settings, false, no_cache)?;
    let outcome = display::with_spinner("Loading index", || engine.build_from_dir(dir))
        .and_then(|_| engine.search(query, top_k));
    let results = match outcome {
        Ok(results) => results,
        Err(e) => return Ok(report_error(&e, format)),
    };

    if format.is_json() {
        let message = format!("{} result(s)", results.len());
        let response = JsonResponse::success(SearchOutput {
            query,
            results: &results,
        });
        print_json(&response.with_message(message))?;
        return Ok(ExitCode::Success);
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(ExitCode::Success);
    }

    println!("{}", display::create_results_table(&results));
    for (rank, result) in results.iter().enumerate() {
        println!(
            "\n{} {} {}",
            THEME.apply(&THEME.number, format!("{}.", rank + 1)),
            THEME.apply(&THEME.id, result.doc_id.as_str()),
            THEME.apply(&THEME.dim, format!("(score {:.4})", result.score)),
        );
        println!("   {}", result.preview);
    }
    Ok(ExitCode::Success)
}

fn run_show(dir: &Path, id: &str, format: OutputFormat) -> anyhow::Result<ExitCode> {
    let corpus = match load_corpus(dir) {
        Ok(corpus) => corpus,
        Err(e) => return Ok(report_error(&e, format)),
    };

    let text = corpus.get(id);
    let code = ExitCode::from_lookup(&text);
    match (text, format.is_json()) {
        (Some(text), true) => {
            print_json(&JsonResponse::success(DocumentOutput { doc_id: id, text }))?
        }
        (Some(text), false) => println!("{text}"),
        (None, true) => print_json(&JsonResponse::not_found("Document", id))?,
        (None, false) => eprintln!(
            "{} {}",
            THEME.error_with_icon(&format!("Document '{id}' not found in")),
            THEME.apply(&THEME.path, dir.display())
        ),
    }
    Ok(code)
}

fn run_cache(settings: &Settings, action: CacheAction) -> anyhow::Result<ExitCode> {
    let format = match &action {
        CacheAction::Stats { json } => OutputFormat::from_json_flag(*json),
        CacheAction::Clear | CacheAction::Export { .. } => OutputFormat::Text,
    };
    let cache = match open_cache(settings) {
        Ok(cache) => cache,
        Err(e) => return Ok(report_error(&e, format)),
    };
    let path = settings.cache_file();

    match action {
        CacheAction::Stats { json } => {
            let records = match cache.records() {
                Ok(records) => records,
                Err(e) => return Ok(report_error(&SearchError::from(e), format)),
            };
            let size_bytes = std::fs::metadata(&path).ok().map(|m| m.len());

            if json {
                let mut dimensions: Vec<usize> =
                    records.iter().map(|r| r.embedding.len()).collect();
                dimensions.sort_unstable();
                dimensions.dedup();
                print_json(&JsonResponse::success(CacheStats {
                    path: path.display().to_string(),
                    entries: records.len(),
                    dimensions,
                    size_bytes,
                }))?;
            } else {
                println!(
                    "{}",
                    display::create_cache_table(&path.display().to_string(), &records, size_bytes)
                );
            }
        }
        CacheAction::Clear => {
            let removed = cache.len().unwrap_or_default();
            if let Err(e) = cache.clear() {
                return Ok(report_error(&SearchError::from(e), format));
            }
            println!(
                "{}",
                THEME.success_with_icon(&format!("Removed {removed} cached embedding(s)"))
            );
        }
        CacheAction::Export { output } => {
            let records = match cache.records() {
                Ok(records) => records,
                Err(e) => return Ok(report_error(&SearchError::from(e), format)),
            };
            let exported: Vec<serde_json::Value> = records
                .iter()
                .map(|record| {
                    serde_json::json!({
                        "doc_id": record.doc_id,
                        "fingerprint": record.fingerprint.as_str(),
                        "updated_at": record.updated_at,
                        "dimension": record.embedding.len(),
                        "embedding": record.embedding,
                    })
                })
                .collect();
            let body = serde_json::to_string_pretty(&exported)?;
            match output {
                Some(file) => {
                    std::fs::write(&file, body)?;
                    eprintln!(
                        "{} {}",
                        THEME.success_with_icon(&format!(
                            "Exported {} record(s) to",
                            exported.len()
                        )),
                        THEME.apply(&THEME.path, file.display())
                    );
                }
                None => println!("{body}"),
            }
        }
    }
    Ok(ExitCode::Success)
}

#[cfg(feature = "http-server")]
async fn run_serve(
    settings: &Settings,
    dir: PathBuf,
    bind: String,
    no_cache: bool,
) -> anyhow::Result<ExitCode> {
    let engine = Arc::new(create_engine(settings, false, no_cache)?);
    docsense::http::serve_http(engine, dir, bind, settings.search.default_top_k).await?;
    Ok(ExitCode::Success)
}

#[cfg(not(feature = "http-server"))]
async fn run_serve(
    _settings: &Settings,
    _dir: PathBuf,
    _bind: String,
    _no_cache: bool,
) -> anyhow::Result<ExitCode> {
    eprintln!("HTTP server support is not compiled in.");
    eprintln!("Please rebuild with: cargo build --features http-server");
    Ok(ExitCode::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_args_parse() {
        let cli = Cli::parse_from(["docsense", "search", "cat pets", "--limit", "3", "--json"]);
        match cli.command {
            Commands::Search {
                query, limit, json, ..
            } => {
                assert_eq!(query, "cat pets");
                assert_eq!(limit, Some(3));
                assert!(json);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn test_debug_setting_forces_debug_logging() {
        let mut settings = Settings::default();
        assert_eq!(log_directive(false, &settings), None);
        assert_eq!(log_directive(true, &settings), Some("docsense=debug"));

        settings.debug = true;
        assert_eq!(log_directive(false, &settings), Some("docsense=debug"));
    }

    #[test]
    fn test_hashing_backend_builds_engine_without_cache() {
        let settings = Settings::default();
        let engine = create_engine(&settings, false, true).unwrap();
        assert!(engine.generator().cache().is_none());
        assert_eq!(engine.generator().dimension().get(), 384);
    }
}
