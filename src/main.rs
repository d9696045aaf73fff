use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use lagscan::{
    analysis::{npm_lag, DebianAnalysis},
    cache::Cache,
    checker::{Catalog, DoneDefectPolicy, SkipReason, VulnerabilityIndex},
    config::Config,
    feed::{
        parse_catalog, parse_defects, parse_security_tracker, FeedLoader, FeedLocation,
        NpmRegistry, Parsed,
    },
    model::AnalysisReport,
    output::{format_report_to_string, print_report, OutputFormat},
    scanner::{release_codename, DpkgScanner, NpmScanner, Scanner},
    version::{compare, Scheme},
};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const EXPOSURES_FOUND: u8 = 2;
}

#[derive(Parser)]
#[command(name = "lagscan")]
#[command(
    author,
    version,
    about = "Measure technical lag and known exposures of installed packages"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a Debian package inventory
    Analyze {
        /// `dpkg -l` output captured from the image
        #[arg(long)]
        dpkg: PathBuf,

        /// Contents of /etc/debian_version from the image
        #[arg(long)]
        debian_version: Option<PathBuf>,

        /// Release catalog CSV (path or URL)
        #[arg(long)]
        catalog: Option<String>,

        /// Security tracker JSON (path or URL)
        #[arg(long)]
        vulnerabilities: Option<String>,

        /// Bug tracker export (path or URL)
        #[arg(long)]
        defects: Option<String>,

        /// How done defects closed before the package date are treated
        /// (exclude-stale, report-stale, version-only)
        #[arg(long)]
        policy: Option<String>,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Write JSON output to file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Exit with code 2 if any vulnerability or defect applies
        #[arg(long)]
        fail_on_exposure: bool,
    },

    /// Measure semantic-version lag of npm packages
    Lag {
        /// `npm ls -g` output (text or --json)
        #[arg(long)]
        npm: PathBuf,

        /// Registry base URL
        #[arg(long)]
        registry: Option<String>,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Write JSON output to file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare two versions
    Compare {
        a: String,
        b: String,

        /// Version scheme (debian, semantic)
        #[arg(long, default_value = "debian")]
        scheme: String,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Clear the cache
    ClearCache,
}

struct AnalyzeArgs {
    dpkg: PathBuf,
    debian_version: Option<PathBuf>,
    catalog: Option<String>,
    vulnerabilities: Option<String>,
    defects: Option<String>,
    policy: Option<String>,
    format: Option<String>,
    output: Option<PathBuf>,
    fail_on_exposure: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli.command).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands) -> Result<u8> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring config file: {:#}", e);
            Config::default()
        }
    };

    match command {
        Commands::Analyze {
            dpkg,
            debian_version,
            catalog,
            vulnerabilities,
            defects,
            policy,
            format,
            output,
            fail_on_exposure,
        } => {
            let args = AnalyzeArgs {
                dpkg,
                debian_version,
                catalog,
                vulnerabilities,
                defects,
                policy,
                format,
                output,
                fail_on_exposure,
            };
            run_analyze(args, &config).await
        }
        Commands::Lag {
            npm,
            registry,
            format,
            output,
        } => run_lag(&npm, registry, format, output, &config).await,
        Commands::Compare { a, b, scheme } => {
            let scheme = Scheme::from_str(&scheme).map_err(|e| anyhow::anyhow!(e))?;
            let symbol = match compare(&a, &b, scheme)? {
                Ordering::Less => "<",
                Ordering::Equal => "=",
                Ordering::Greater => ">",
            };
            println!("{}", symbol);
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::ClearCache => {
            let cache = Cache::new();
            cache.clear()?;
            println!("Cache cleared: {}", cache.dir().display());
            Ok(exit_codes::SUCCESS)
        }
    }
}

fn spinner(enabled: bool, message: &str) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    Some(pb)
}

fn parse_format(format: Option<String>, config: &Config) -> Result<OutputFormat> {
    let format = format.unwrap_or_else(|| config.default_format.clone());
    OutputFormat::from_str(&format).map_err(|e| anyhow::anyhow!(e))
}

async fn load_feed<T>(
    loader: &FeedLoader,
    name: &str,
    location: &str,
    parse: fn(&str) -> Result<Parsed<T>>,
) -> Result<Parsed<T>> {
    let location: FeedLocation = location.parse()?;
    let body = loader.load_text(&location).await?;
    let parsed = parse(&body).with_context(|| format!("Invalid {} feed at {}", name, location))?;
    info!(
        feed = name,
        remote = location.is_remote(),
        records = parsed.records.len(),
        "Loaded feed"
    );
    if parsed.skipped > 0 {
        warn!(feed = name, skipped = parsed.skipped, "Dropped malformed feed rows");
    }
    Ok(parsed)
}

async fn run_analyze(args: AnalyzeArgs, config: &Config) -> Result<u8> {
    let format = parse_format(args.format, config)?;
    let is_interactive = format == OutputFormat::Table && args.output.is_none();

    let policy = match args.policy {
        Some(policy) => DoneDefectPolicy::from_str(&policy).map_err(|e| anyhow::anyhow!(e))?,
        None => config.matching.done_defect_policy,
    };

    let catalog_location = args
        .catalog
        .or_else(|| config.feeds.catalog.clone())
        .context("No catalog feed given. Pass --catalog or set feeds.catalog in the config file")?;
    let vulnerability_location = args
        .vulnerabilities
        .unwrap_or_else(|| config.feeds.vulnerabilities.clone());
    let defect_location = args.defects.or_else(|| config.feeds.defects.clone());

    let installed = DpkgScanner.scan_file(&args.dpkg).await?;
    let release = match &args.debian_version {
        Some(path) => {
            let contents = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Some(release_codename(&contents))
        }
        None => None,
    };
    info!(packages = installed.len(), release = ?release, "Read dpkg inventory");

    let loader = FeedLoader::with_cache(Cache::with_ttl_hours(config.cache_ttl_hours));
    let progress = spinner(is_interactive, "Loading feeds...");

    let defect_feed = async {
        match &defect_location {
            Some(location) => load_feed(&loader, "defects", location, parse_defects)
                .await
                .map(Some),
            None => Ok(None),
        }
    };
    let (catalog, vulnerabilities, defects) = tokio::try_join!(
        load_feed(&loader, "catalog", &catalog_location, parse_catalog),
        load_feed(
            &loader,
            "vulnerabilities",
            &vulnerability_location,
            parse_security_tracker
        ),
        defect_feed,
    )?;

    if let Some(pb) = &progress {
        pb.set_message("Matching packages...");
    }

    let malformed = catalog.skipped
        + vulnerabilities.skipped
        + defects.as_ref().map(|d| d.skipped).unwrap_or(0);

    let mut analysis = DebianAnalysis::new(Catalog::new(catalog.records))
        .with_vulnerabilities(VulnerabilityIndex::new(vulnerabilities.records))
        .with_ignore(config.ignore.clone());
    if let Some(defects) = defects {
        analysis = analysis.with_defects(defects.records, policy);
    }
    if let Some(release) = release {
        analysis = analysis.with_release(release);
    }

    let mut report = analysis.run(&installed);
    report.skipped.add(SkipReason::MalformedRow, malformed);

    if let Some(pb) = progress {
        pb.finish_with_message(format!(
            "Found {} vulnerabilities and {} defects",
            report.vulnerabilities.len(),
            report.defects.len()
        ));
    }

    emit(&report, format, args.output.as_deref())?;

    if args.fail_on_exposure && report.has_exposures() {
        return Ok(exit_codes::EXPOSURES_FOUND);
    }
    Ok(exit_codes::SUCCESS)
}

async fn run_lag(
    npm: &Path,
    registry: Option<String>,
    format: Option<String>,
    output: Option<PathBuf>,
    config: &Config,
) -> Result<u8> {
    let format = parse_format(format, config)?;
    let is_interactive = format == OutputFormat::Table && output.is_none();

    let installed = NpmScanner.scan_file(npm).await?;
    info!(packages = installed.len(), "Read npm inventory");

    let registry = NpmRegistry::with_cache(
        registry.unwrap_or_else(|| config.feeds.npm_registry.clone()),
        Cache::with_ttl_hours(config.cache_ttl_hours),
    );

    let progress = spinner(is_interactive, "Querying registry...");
    let report = npm_lag(&registry, &installed, &config.ignore).await;
    if let Some(pb) = progress {
        pb.finish_with_message(format!("Measured {} packages", report.lag.len()));
    }

    emit(&report, format, output.as_deref())?;
    Ok(exit_codes::SUCCESS)
}

fn emit(report: &AnalysisReport, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, format_report_to_string(report)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if format == OutputFormat::Table {
                println!("Results written to: {}", path.display());
            }
            Ok(())
        }
        None => print_report(report, format),
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'lagscan config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
