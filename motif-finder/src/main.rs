use clap::Parser;
use log::{debug, warn};
use motif_em_rs::alphabet::Alphabet;
use motif_em_rs::config::{EmConfig, EPSILON, MAX_ITERATIONS};
use motif_em_rs::engine::EmEngine;
use motif_em_rs::error::MotifError;
use motif_em_rs::io::{read_sequences, summary, write_model, write_positions};
use motif_em_rs::posterior::Likelihood;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Motif(#[from] MotifError),
}

#[derive(Parser)]
#[command(
    name = "motif-finder",
    about = "Finds a fixed-width motif that occurs once in every input sequence",
    long_about = "Learns a position weight matrix and the most probable motif location in each \
                  sequence with expectation-maximization under the one-occurrence-per-sequence \
                  (OOPS) model. Every substring of the input is tried as a starting point.",
    version,
    after_help = "Example usage:\n    \
                  motif-finder sequences.txt 14 model.tsv positions.txt\n    \
                  motif-finder promoters.fasta 8 model.tsv positions.txt --log-space -v",
    color = clap::ColorChoice::Always
)]
#[derive(Debug)]
struct Args {
    /// Path to the input sequences: one sequence per line, or FASTA
    #[arg(value_name = "SEQUENCES")]
    sequences_file: String,

    /// Width of the motif to search for
    #[arg(value_name = "WIDTH")]
    width: usize,

    /// Path for the learned model (tab-separated, one row per symbol,
    /// column 0 is the background)
    #[arg(value_name = "MODEL_FILE")]
    model_file: String,

    /// Path for the most probable motif start of every sequence
    #[arg(value_name = "POSITIONS_FILE")]
    positions_file: String,

    /// Sequence alphabet: dna, rna, protein, or the literal symbols
    #[arg(long, default_value = "dna")]
    alphabet: String,

    /// Convergence threshold on the change of the data log-likelihood
    #[arg(long, default_value_t = EPSILON)]
    epsilon: f64,

    /// Maximum number of EM iterations after seeding
    #[arg(long, default_value_t = MAX_ITERATIONS)]
    max_iterations: usize,

    /// Give up after this many seconds
    #[arg(long)]
    max_seconds: Option<u64>,

    /// Evaluate likelihoods in log space (needed for long sequences)
    #[arg(long)]
    log_space: bool,

    /// Seed for the random number generators
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Number of threads
    #[arg(short, long, default_value = "1")]
    threads: usize,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), FinderError> {
    let start_time = std::time::Instant::now();

    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    if let Err(why) = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
    {
        debug!("{:?}", why);
    }

    // Create output directories if they don't exist
    for output in [&args.model_file, &args.positions_file] {
        if let Some(parent) = Path::new(output).parent() {
            fs::create_dir_all(parent)?;
        }
    }

    let alphabet = Alphabet::from_name(&args.alphabet)?;
    let sequences = read_sequences(&args.sequences_file, &alphabet)?;
    println!("{} sequences to search", sequences.len());

    let config = EmConfig {
        epsilon: args.epsilon,
        max_iterations: args.max_iterations,
        max_wall_time: args.max_seconds.map(Duration::from_secs),
        likelihood: if args.log_space {
            Likelihood::LogSpace
        } else {
            Likelihood::Direct
        },
        rng_seed: args.seed,
        ..Default::default()
    };
    let result = EmEngine::new(config).run(&sequences, args.width)?;
    if !result.converged() {
        warn!(
            "EM stopped after {} iterations without converging ({:?})",
            result.iterations, result.status
        );
    }

    let realized = result.realized_motifs(&sequences)?;
    write_model(&result.model, &args.model_file)?;
    write_positions(&realized, &args.positions_file)?;
    println!("\n{}", summary(&result.model, &realized));

    let elapsed = start_time.elapsed();
    println!(
        "Total execution time: {:.4} minutes",
        elapsed.as_secs_f64() / 60.0
    );

    Ok(())
}
