use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use tidymark_core::fetch::DEFAULT_USER_AGENT;
use tidymark_core::{ExcludeList, ExtractInput, Extractor, FetchConfig, ReadabilityConfig};
use tracing_subscriber::EnvFilter;

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Turn web pages into clean Markdown with YAML front-matter
#[derive(Parser, Debug)]
#[command(name = "tidymark")]
#[command(author = "Tidymark Contributors")]
#[command(version)]
#[command(about = "Turn web pages into clean Markdown with front-matter", long_about = None)]
struct Args {
    /// Page URL; also selects the cleaning strategy when --input-file is given
    #[arg(value_name = "URL")]
    url: String,

    /// Print the cleaned content as-is, without front-matter or Markdown conversion
    #[arg(long)]
    raw: bool,

    /// Read the page HTML from FILE ("-" for stdin) instead of fetching URL
    #[arg(long, value_name = "FILE")]
    input_file: Option<PathBuf>,

    /// Regex of URLs to pass through uncleaned (repeatable)
    #[arg(long, value_name = "REGEX")]
    exclude: Vec<String>,

    /// File with one exclusion regex per line
    #[arg(long, value_name = "FILE")]
    exclude_file: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Minimum character threshold for readable content
    #[arg(long, default_value = "500", value_name = "NUM")]
    char_threshold: usize,

    /// Strip images from readability output
    #[arg(long)]
    no_images: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_exclude_list(args: &Args) -> anyhow::Result<ExcludeList> {
    let mut exclude = ExcludeList::load_default().context("Failed to load default exclusion list")?;

    if let Some(path) = &args.exclude_file {
        let from_file = ExcludeList::load(path)
            .with_context(|| format!("Failed to load exclusion file: {}", path.display()))?;
        exclude.extend(from_file);
    }

    exclude.extend(ExcludeList::from_patterns(&args.exclude).context("Invalid --exclude pattern")?);
    Ok(exclude)
}

fn read_input_file(path: &PathBuf) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        return Ok(buffer);
    }

    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Completes on Ctrl-C; never completes if the handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    if args.verbose {
        echo::print_banner();
    }

    let exclude = load_exclude_list(&args)?;
    if args.verbose && !exclude.is_empty() {
        echo::print_info(&format!("{} exclusion pattern(s) loaded", exclude.len()));
    }

    let readability = ReadabilityConfig::builder()
        .char_threshold(args.char_threshold)
        .preserve_images(!args.no_images)
        .build();

    let fetch_config = FetchConfig {
        timeout: args.timeout,
        user_agent: args.user_agent.clone().unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
    };

    let extractor = Extractor::builder()
        .fetch_config(fetch_config)
        .exclude(exclude)
        .readability_config(readability)
        .build()
        .context("Failed to build extractor")?;

    let started = Instant::now();
    tracing::debug!(url = %args.url, raw = args.raw, offline = args.input_file.is_some(), "starting extraction");

    let output = match &args.input_file {
        Some(path) => {
            if args.verbose {
                echo::print_step(1, 2, &format!("Reading {}", path.display().bright_white()));
            }
            let html = read_input_file(path)?;
            if args.verbose {
                eprintln!("  {} {}", "Size:".dimmed(), echo::format_size(html.len()).bright_white());
            }

            tokio::select! {
                result = extractor.extract_html(&args.url, &html, args.raw) => result,
                _ = interrupted() => Err(tidymark_core::ExtractError::Cancelled),
            }
        }
        None => {
            if args.verbose {
                echo::print_step(1, 2, &format!("Fetching {}", args.url.bright_white().underline()));
            }
            extractor
                .extract_with_cancel(ExtractInput::new(&args.url).raw(args.raw), interrupted())
                .await
        }
    }
    .with_context(|| format!("Failed to extract {}", args.url))?;

    if args.verbose {
        echo::print_timing("Extraction", started.elapsed());
        echo::print_step(2, 2, "Writing output");
    }

    match &args.output {
        Some(path) => {
            fs::write(path, &output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => {
            println!("{}", output);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(err) = run(args).await {
        echo::print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
}
