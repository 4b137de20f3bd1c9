//! CLI tool for comparing an original deck with its translation.

use anyhow::{Context, Result};
use clap::Parser;
use slidecheck_core::compare::DEFAULT_THRESHOLD;
use slidecheck_core::report::{self, REPORT_FILE_NAME};
use slidecheck_core::{
    compare_presentations, CompareOptions, ComparisonReport, Progress, ProgressSink,
};
use slidecheck_translate::google::DEFAULT_ENDPOINT;
use slidecheck_translate::{CachedTranslator, GoogleConfig, GoogleTranslator, TranslationCache};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Back-translate a translated PowerPoint deck and compare it with the original.
#[derive(Parser, Debug)]
#[command(name = "slidecheck")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Original deck (.pptx)
    source: PathBuf,

    /// Translated deck (.pptx)
    translated: PathBuf,

    /// Output directory (default: reports/<source name>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Minimum similarity (0-1) for a row to be OK
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Language to back-translate into (the original deck's language)
    #[arg(long, default_value = "en")]
    target: String,

    /// Language of the translated deck
    #[arg(long, default_value = "auto")]
    source_lang: String,

    /// Translation cache file (default: <output>/cache.json)
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Do not read or write a translation cache
    #[arg(long, conflicts_with = "cache")]
    no_cache: bool,

    /// Also write a CSV export
    #[arg(long)]
    csv: bool,

    /// Also write a JSON export
    #[arg(long)]
    json: bool,

    /// Translation endpoint
    #[arg(long, env = "TRANSLATE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Exit with status 2 when any row needs review
    #[arg(long)]
    strict: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Prints per-row progress to stderr.
struct ConsoleProgress {
    verbose: bool,
}

impl ProgressSink for ConsoleProgress {
    fn update(&self, progress: &Progress) {
        if self.verbose {
            eprintln!(
                "  [{:>3.0}%] {}",
                progress.fraction() * 100.0,
                progress.message
            );
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let output_dir = get_output_dir(&args);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let report = run_comparison(&args, &output_dir)?;

    let html_path = output_dir.join(REPORT_FILE_NAME);
    report::write_html(&report, &html_path)?;
    println!("Report: {}", html_path.display());

    if args.csv {
        let csv_path = output_dir.join("translation_comparison.csv");
        let file = File::create(&csv_path)
            .with_context(|| format!("Failed to create {}", csv_path.display()))?;
        report::write_csv(&report, BufWriter::new(file))?;
        println!("CSV:    {}", csv_path.display());
    }

    if args.json {
        let json_path = output_dir.join("translation_comparison.json");
        let file = File::create(&json_path)
            .with_context(|| format!("Failed to create {}", json_path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report)
            .with_context(|| format!("Failed to write {}", json_path.display()))?;
        println!("JSON:   {}", json_path.display());
    }

    print_summary(&report);

    if args.strict && report.summary.flagged() > 0 {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

/// Parse both decks and compare them.
fn run_comparison(args: &Args, output_dir: &Path) -> Result<ComparisonReport> {
    if args.verbose {
        eprintln!("Processing: {}", args.source.display());
    }
    let source = slidecheck_pptx::load_presentation(&args.source)
        .with_context(|| format!("Failed to read {}", args.source.display()))?;

    if args.verbose {
        eprintln!("Processing: {}", args.translated.display());
    }
    let translated = slidecheck_pptx::load_presentation(&args.translated)
        .with_context(|| format!("Failed to read {}", args.translated.display()))?;

    if args.verbose {
        eprintln!(
            "  Found {} / {} text blocks",
            source.non_empty_blocks(),
            translated.non_empty_blocks()
        );
    }

    let config = GoogleConfig::default()
        .with_endpoint(args.endpoint.clone())
        .with_source_lang(args.source_lang.clone())
        .with_target_lang(args.target.clone());
    let mut google = GoogleTranslator::new(config)?;

    let options = CompareOptions::default().with_threshold(args.threshold);
    let progress = ConsoleProgress {
        verbose: args.verbose,
    };

    if args.no_cache {
        return Ok(compare_presentations(
            &source,
            &translated,
            &mut google,
            &options,
            &progress,
        ));
    }

    let cache_path = args
        .cache
        .clone()
        .unwrap_or_else(|| output_dir.join("cache.json"));
    log::debug!("Using translation cache {}", cache_path.display());
    let mut translator = CachedTranslator::new(google, TranslationCache::load(cache_path));

    let report = compare_presentations(
        &source,
        &translated,
        &mut translator,
        &options,
        &progress,
    );
    println!(
        "Cache:  {} ({} hits, {} new, {} entries)",
        translator.cache().path().display(),
        translator.hits(),
        translator.misses(),
        translator.cache().len()
    );
    Ok(report)
}

/// Determine the directory reports are written to.
fn get_output_dir(args: &Args) -> PathBuf {
    match &args.output {
        Some(dir) => dir.clone(),
        None => {
            let stem = args
                .source
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("report");
            PathBuf::from("reports").join(stem)
        }
    }
}

fn print_summary(report: &ComparisonReport) {
    let s = &report.summary;
    println!(
        "{} rows: {} OK, {} need review, {} missing, {} extra, {} empty",
        s.total, s.ok, s.needs_review, s.missing, s.extra, s.empty
    );
}
