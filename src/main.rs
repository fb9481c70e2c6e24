use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;

use ferrous_dpalign::core::alignment::scoring::ScoringModel;
use ferrous_dpalign::core::io::candidates::CandidateReader;
use ferrous_dpalign::core::io::reference::ReferenceGenome;
use ferrous_dpalign::core::utils::{Stopwatch, xzcreate, xzopen};
use ferrous_dpalign::defaults;
use ferrous_dpalign::pipelines::candidate::{AlignCliOptions, AlignOpt, AlignSummary, run_alignment};

#[derive(Parser)]
#[command(name = "ferrous-dpalign")]
#[command(about = "FerrousDPAlign - bounded gapped alignment of reads against candidate positions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Align reads to their candidate reference positions
    Align(AlignCliOptions),
}

/// Resolve the requested thread count against the machine.
fn resolve_threads(requested: Option<usize>) -> usize {
    // Default to number of CPU cores if not specified
    let mut num_threads = requested.unwrap_or_else(num_cpus::get);

    if num_threads < 1 {
        log::warn!("Invalid thread count {}, using 1 thread", num_threads);
        num_threads = 1;
    }

    // Reasonable upper bound to prevent accidental resource exhaustion
    let max_threads = (num_cpus::get() * 2).min(defaults::MAX_THREADS);
    if num_threads > max_threads {
        log::warn!(
            "Thread count {} exceeds recommended maximum {}, capping at {}",
            num_threads,
            max_threads,
            max_threads
        );
        num_threads = max_threads;
    }
    num_threads
}

fn configure_thread_pool(num_threads: usize) {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        Ok(_) => {
            log::debug!(
                "Successfully built global Rayon thread pool with {} threads",
                num_threads
            );
        }
        Err(e) => {
            log::warn!(
                "Failed to configure thread pool: {} (may already be initialized)",
                e
            );
        }
    }

    let actual_threads = rayon::current_num_threads();
    if actual_threads != num_threads {
        log::warn!(
            "Rayon thread pool has {} threads but requested {}",
            actual_threads,
            num_threads
        );
    }

    let thread_word = if num_threads == 1 {
        "thread"
    } else {
        "threads"
    };
    log::info!("Using {} {}", num_threads, thread_word);
}

fn run_align(cli: &AlignCliOptions, opt: &AlignOpt) -> Result<AlignSummary> {
    let mut clock = Stopwatch::start();

    let model = match &cli.scoring {
        Some(path) => ScoringModel::from_path(path)
            .map_err(|e| anyhow::anyhow!("Error loading scoring file {}: {}", path.display(), e))?,
        None => ScoringModel::default(),
    };
    let reference = ReferenceGenome::from_fasta(&cli.reference).map_err(|e| {
        anyhow::anyhow!("Error loading reference {}: {}", cli.reference.display(), e)
    })?;
    if opt.timing {
        log::info!("Time loading reference and scores: {:.3} sec", clock.lap());
    }

    if opt.verbosity >= 3 {
        log::info!("Alignment parameters:");
        log::info!("  Alignment mode: {:?}, results: {:?}", opt.alignment_mode, opt.result_mode);
        log::info!("  Space: {:?}, padding: {} bp", opt.space, opt.offset_length);
        log::info!("  Max candidates per end: {}", opt.max_num_matches);
        log::info!(
            "  Gap open: {}, Gap extend: {}",
            model.gap_open(),
            model.gap_extension()
        );
    }

    let input = xzopen(&cli.matches)
        .map_err(|e| anyhow::anyhow!("Error opening candidates {}: {}", cli.matches.display(), e))?;
    let mut reader = CandidateReader::new(input, &reference);

    let mut out = xzcreate(cli.output.as_deref())
        .map_err(|e| anyhow::anyhow!("Error creating output file: {}", e))?;
    let mut unaligned = cli
        .unaligned
        .as_deref()
        .map(|p| xzcreate(Some(p)))
        .transpose()
        .map_err(|e| anyhow::anyhow!("Error creating not-aligned file: {}", e))?;

    let summary = run_alignment(
        &mut reader,
        &reference,
        &model,
        opt,
        &mut out,
        unaligned.as_mut().map(|w| w as &mut dyn Write),
    )?;
    out.finish()
        .map_err(|e| anyhow::anyhow!("Error finishing output file: {}", e))?;
    if let Some(w) = unaligned {
        w.finish()
            .map_err(|e| anyhow::anyhow!("Error finishing not-aligned file: {}", e))?;
    }

    if reader.dropped_candidates() > 0 {
        log::warn!(
            "Dropped {} candidates on contigs missing from the reference",
            reader.dropped_candidates()
        );
    }
    if opt.timing {
        log::info!("Time aligning and writing: {:.3} sec", clock.lap());
    }
    Ok(summary)
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Align(options) => {
            // Map verbosity (1=error, 2=warning, 3=message, 4=debug, 5+=trace)
            // to Rust log levels
            let log_level = match options.verbosity {
                v if v <= 1 => log::LevelFilter::Error,
                2 => log::LevelFilter::Warn,
                3 => log::LevelFilter::Info,
                4 => log::LevelFilter::Debug,
                _ => log::LevelFilter::Trace,
            };

            env_logger::Builder::from_default_env()
                .filter_level(log_level)
                .format_timestamp(None)
                .format_target(false)
                .init();

            let num_threads = resolve_threads(options.threads);
            let opt = match options.to_align_opt(num_threads) {
                Ok(opt) => opt,
                Err(errors) => {
                    for e in &errors {
                        log::error!("{}", e);
                    }
                    std::process::exit(1);
                }
            };
            configure_thread_pool(num_threads);

            log::info!("Aligning candidates from {}", options.matches.display());

            match run_align(&options, &opt) {
                Ok(summary) => {
                    log::info!(
                        "Aligned {} of {} reads ({} not aligned)",
                        summary.aligned,
                        summary.total,
                        summary.not_aligned
                    );
                }
                Err(e) => {
                    log::error!("{}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
