//! docmeta CLI - find, download and annotate documents indexed for a domain.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use docmeta::annotate::annotate_report;
use docmeta::downloader::download_all;
use docmeta::exif::ExifTool;
use docmeta::matcher::SUPPORTED_EXTENSIONS;
use docmeta::proxy::ProxyPool;
use docmeta::{
    search_all, seconds, HttpNavigator, Interrupt, Navigator, SearchConfig, SearchEngine,
    SearchSummary,
};

/// docmeta - Discover documents indexed for a domain and extract their metadata
#[derive(Parser)]
#[command(name = "docmeta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search, download, extract metadata and annotate it with source URLs
    Run(RunArgs),

    /// Search only and print the matching document URLs
    Search(SearchArgs),

    /// Add a source URL column to an existing ExifTool CSV report
    Annotate(AnnotateArgs),

    /// List available search engines
    Engines,
}

#[derive(Args)]
struct TargetArgs {
    /// Target domain
    #[arg(short, long, required_unless_present = "domain_list")]
    domain: Option<String>,

    /// File with one target domain per line
    #[arg(long, conflicts_with = "domain")]
    domain_list: Option<PathBuf>,

    /// Search engine to use
    #[arg(short, long, value_enum, default_value = "all")]
    search: EngineChoice,

    /// File types to search for (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    file_type: Option<Vec<String>>,

    /// Search timeout per engine and file type, in seconds
    #[arg(short, long, default_value = "8")]
    timeout: u64,

    /// Per-request connection timeout, in seconds
    #[arg(long, default_value = "3")]
    conn_timeout: u64,

    /// Delay between result pages, in seconds
    #[arg(short, long, default_value = "1")]
    jitter: u64,

    /// Stop after this many results per search (0 = unlimited)
    #[arg(short, long, default_value = "50")]
    max_results: usize,

    /// Proxy URL (repeatable, e.g. socks5://127.0.0.1:1080)
    #[arg(long)]
    proxy: Vec<String>,

    /// File with one proxy URL per line
    #[arg(long)]
    proxy_file: Option<PathBuf>,

    /// Fetch result pages over plain HTTP instead of a headless browser
    #[arg(long)]
    http: bool,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Directory for downloads and reports
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Concurrent downloads
    #[arg(long, default_value = "5")]
    threads: usize,
}

#[derive(Args)]
struct SearchArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Args)]
struct AnnotateArgs {
    /// ExifTool CSV report to rewrite
    report: PathBuf,

    /// File with one source URL per line
    urls: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum EngineChoice {
    Google,
    Bing,
    All,
}

impl EngineChoice {
    fn engines(&self) -> Vec<SearchEngine> {
        match self {
            EngineChoice::Google => vec![SearchEngine::Google],
            EngineChoice::Bing => vec![SearchEngine::Bing],
            EngineChoice::All => SearchEngine::ALL.to_vec(),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One URL per line
    Text,
    /// JSON search summaries
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "docmeta=debug" } else { "docmeta=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Search(args) => search_only(args).await,
        Commands::Annotate(args) => annotate(args).await,
        Commands::Engines => list_engines(),
    }
}

fn list_engines() -> Result<()> {
    println!("Available search engines:\n");
    for engine in SearchEngine::ALL {
        println!("  {}", engine);
    }
    println!("  all      - every engine above, in order");
    println!();
    println!("Supported file types: {}", SUPPORTED_EXTENSIONS.join(", "));
    println!();
    println!("Usage: docmeta run -d example.com -s all -f pdf,docx -o ./out");
    Ok(())
}

async fn run(args: RunArgs) -> Result<()> {
    // Fail before searching if metadata extraction is impossible.
    let exiftool = ExifTool::locate().await?;

    let proxies = load_proxies(&args.target)?;
    let navigator = search_navigator(&args.target, &proxies)?;
    let downloads = HttpNavigator::with_proxies(ProxyPool::from_urls(&proxies)?);
    let interrupt = Interrupt::ctrl_c();

    for domain in load_domains(&args.target)? {
        let configs = session_configs(&args.target, &domain, &proxies);
        let summaries = search_all(configs, Arc::clone(&navigator), &interrupt).await?;
        report_summaries(&domain, &summaries);

        let urls: Vec<String> = summaries.into_iter().flat_map(|s| s.urls).collect();
        if urls.is_empty() {
            eprintln!("[-] No results for {}", domain);
        } else {
            let job = MetadataJob {
                exiftool: &exiftool,
                downloads: &downloads,
                output_dir: &args.output_dir,
                timeout: seconds(args.target.conn_timeout),
                threads: args.threads,
            };
            if !continue_after(&domain, job.run(&domain, &urls, &interrupt).await) {
                break;
            }
        }

        // A search stopped by the user still gets its results processed above.
        if interrupt.is_triggered() {
            break;
        }
    }

    Ok(())
}

/// Whether the run moves on to the next domain after a metadata job.
///
/// Failures are reported and skipped; an interrupt ends the run.
fn continue_after(domain: &str, outcome: Result<bool>) -> bool {
    match outcome {
        Ok(true) => true,
        Ok(false) => {
            eprintln!("[!] Interrupted while processing {}", domain);
            false
        }
        Err(e) => {
            eprintln!("[-] Metadata extraction failed for {}: {:#}", domain, e);
            true
        }
    }
}

/// Download, extraction and annotation settings for one run.
struct MetadataJob<'a> {
    exiftool: &'a ExifTool,
    downloads: &'a dyn Navigator,
    output_dir: &'a Path,
    timeout: Duration,
    threads: usize,
}

impl MetadataJob<'_> {
    /// Downloads `urls`, extracts their metadata and annotates the report.
    ///
    /// Returns `Ok(false)` when the user interrupted after the job started.
    async fn run(&self, domain: &str, urls: &[String], interrupt: &Interrupt) -> Result<bool> {
        let seen = interrupt.presses();
        let dir = self.output_dir.join(format!("{}_meta", domain));
        let written =
            download_all(self.downloads, urls, &dir, self.timeout, self.threads, interrupt)
                .await?;
        if interrupt.presses() > seen {
            return Ok(false);
        }
        eprintln!(
            "[*] Downloaded {} files from {} URLs to {}",
            written.len(),
            urls.len(),
            dir.display()
        );
        if written.is_empty() {
            return Ok(true);
        }

        let report = self.output_dir.join(format!("{}_meta.csv", domain));
        tokio::select! {
            biased;
            _ = interrupt.pressed_after(seen) => return Ok(false),
            extracted = self.exiftool.extract_csv(&dir, &report) => extracted?,
        }

        let summary = annotate_report(&report, urls).await?;
        eprintln!(
            "[*] Metadata for {} files written to {} ({} without source URL)",
            summary.rows,
            report.display(),
            summary.unresolved()
        );
        Ok(interrupt.presses() == seen)
    }
}

async fn search_only(args: SearchArgs) -> Result<()> {
    let proxies = load_proxies(&args.target)?;
    let navigator = search_navigator(&args.target, &proxies)?;
    let interrupt = Interrupt::ctrl_c();

    let mut all = Vec::new();
    for domain in load_domains(&args.target)? {
        let configs = session_configs(&args.target, &domain, &proxies);
        let summaries = search_all(configs, Arc::clone(&navigator), &interrupt).await?;
        report_summaries(&domain, &summaries);
        all.extend(summaries);
        if interrupt.is_triggered() {
            break;
        }
    }

    match args.format {
        OutputFormat::Text => {
            for url in all.iter().flat_map(|s| &s.urls) {
                println!("{}", url);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&all)?),
    }
    Ok(())
}

async fn annotate(args: AnnotateArgs) -> Result<()> {
    let urls = read_lines(&args.urls)?;
    let summary = annotate_report(&args.report, &urls)
        .await
        .with_context(|| format!("Failed to annotate {}", args.report.display()))?;
    eprintln!(
        "[*] Annotated {} rows ({} without source URL)",
        summary.rows,
        summary.unresolved()
    );
    Ok(())
}

/// One session per engine and file type, in that order.
fn session_configs(args: &TargetArgs, domain: &str, proxies: &[String]) -> Vec<SearchConfig> {
    let file_types: Vec<String> = args.file_type.clone().unwrap_or_else(|| {
        SUPPORTED_EXTENSIONS.iter().map(|s| s.to_string()).collect()
    });

    args.search
        .engines()
        .into_iter()
        .flat_map(|engine| {
            file_types.iter().map(move |file_type| {
                SearchConfig::new(engine, domain, file_type)
                    .with_timeout(args.timeout)
                    .with_connection_timeout(args.conn_timeout)
                    .with_jitter(args.jitter)
                    .with_max_results(args.max_results)
                    .with_proxies(proxies.to_vec())
            })
        })
        .collect()
}

fn report_summaries(domain: &str, summaries: &[SearchSummary]) {
    for summary in summaries {
        eprintln!(
            "[*] {} | {:<6} | {:<4} | {} results from {} pages in {}ms ({})",
            domain,
            summary.engine,
            summary.file_type,
            summary.urls.len(),
            summary.pages,
            summary.duration_ms,
            summary.end
        );
    }
}

fn load_domains(args: &TargetArgs) -> Result<Vec<String>> {
    match (&args.domain, &args.domain_list) {
        (Some(domain), _) => Ok(vec![domain.trim().to_string()]),
        (None, Some(path)) => read_lines(path),
        (None, None) => anyhow::bail!("Either --domain or --domain-list is required"),
    }
}

fn load_proxies(args: &TargetArgs) -> Result<Vec<String>> {
    let mut proxies = args.proxy.clone();
    if let Some(path) = &args.proxy_file {
        proxies.extend(read_lines(path)?);
    }
    Ok(proxies)
}

/// Non-empty, non-comment lines of a text file.
fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(feature = "headless")]
fn search_navigator(args: &TargetArgs, proxies: &[String]) -> Result<Arc<dyn Navigator>> {
    use docmeta::{BrowserNavigator, BrowserPool, BrowserPoolConfig};

    let pool = ProxyPool::from_urls(proxies)?;
    if args.http {
        return Ok(Arc::new(HttpNavigator::with_proxies(pool)));
    }

    let config = BrowserPoolConfig {
        max_tabs: 1,
        proxy_url: pool.first().map(|p| p.url()),
        ..Default::default()
    };
    Ok(Arc::new(BrowserNavigator::new(Arc::new(BrowserPool::new(config)))))
}

#[cfg(not(feature = "headless"))]
fn search_navigator(_args: &TargetArgs, proxies: &[String]) -> Result<Arc<dyn Navigator>> {
    Ok(Arc::new(HttpNavigator::with_proxies(ProxyPool::from_urls(proxies)?)))
}
