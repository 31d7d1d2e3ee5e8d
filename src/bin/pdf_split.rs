//! Offline page-range extraction, without the HTTP service.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdf_splitter::split::{RangeExtractor, RangePolicy};

/// Split a range of pages from a PDF.
#[derive(Parser, Debug)]
#[command(name = "pdf-split")]
#[command(author, version, about, allow_negative_numbers = true)]
struct Args {
    /// Path to the input PDF file
    input: PathBuf,

    /// Path to the output PDF file
    output: PathBuf,

    /// Start page number (1-based)
    start: i64,

    /// End page number (inclusive, 1-based); defaults to the last page
    end: Option<i64>,

    /// How out-of-bounds page numbers are handled (strict or skip)
    #[arg(short, long, default_value_t = RangePolicy::Strict)]
    policy: RangePolicy,

    /// Increase output verbosity
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "pdf_splitter=debug" } else { "pdf_splitter=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let extraction = RangeExtractor::new(args.policy)
        .extract_file(&args.input, &args.output, args.start, args.end)
        .with_context(|| format!("Failed to split {}", args.input.display()))?;

    println!(
        "Wrote pages {} ({} of {}) to {}",
        extraction.range,
        extraction.page_count,
        extraction.source_pages,
        args.output.display()
    );
    Ok(())
}
